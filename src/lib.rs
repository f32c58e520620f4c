//! Genetic-algorithm engine that evolves arithmetic expressions toward a
//! numeric target.
//!
//! Each candidate is a [`Chromosome`]: a fixed-length string of 5-bit genes.
//! Genes decode to digits and `+ - * /`; the decoder repairs whatever the
//! bits spell into a well-formed expression, which is evaluated with
//! arbitrary-precision [`BigFloat`] arithmetic and scored against the target.
//! A [`Simulation`] breeds generation after generation until some
//! chromosome evaluates exactly to the target.
//!
//! # Key Types
//!
//! - [`SimulationParams`]: configuration (sizes, rates, precision, workers, seed)
//! - [`Simulation`]: population lifecycle, stepping and the run loop
//! - [`Chromosome`]: genes with a memoized [`DecodeResult`]
//! - [`Population`] / [`PopulationMember`]: scored generations
//!
//! # Modules
//!
//! - [`genes`]: the gene ↔ symbol table
//! - [`operators`]: bit-level crossover, mutation and rotation
//! - [`eval`]: the precedence stack machine
//! - [`pool`]: per-simulation scratch-object pools
//!
//! # Example
//!
//! ```no_run
//! use u_genexpr::{Simulation, SimulationParams};
//!
//! let mut sim = Simulation::new(SimulationParams::small()).unwrap();
//! sim.init_from_int(1111);
//! let summary = sim.run(u64::MAX).unwrap();
//! assert!(summary.solved);
//! println!("{}", sim.solutions()[0].verbose_string());
//! ```
//!
//! # Features
//!
//! - `parallel` (default): generation and evaluation worker pools on rayon
//! - `serde`: `Serialize`/`Deserialize` for [`SimulationParams`]

mod chromosome;
mod config;
mod context;
mod decode;
pub mod error;
pub mod eval;
mod fitness;
mod float;
pub mod genes;
pub mod operators;
pub mod pool;
mod selection;
mod simulation;
mod types;

pub use chromosome::Chromosome;
pub use config::SimulationParams;
pub use decode::{DecodeResult, DecodeState, Validity};
pub use error::{EncodingError, Error, EvalError, OperatorError, PoolExhausted, Result};
pub use fitness::FitnessScorer;
pub use float::BigFloat;
pub use selection::Selector;
pub use simulation::{RunSummary, Simulation};
pub use types::{Individual, Population, PopulationMember};
