//! Simulation configuration.
//!
//! [`SimulationParams`] holds every parameter that controls decoding,
//! scoring and the evolutionary loop. It is fixed for a simulation's
//! lifetime.

use crate::error::{Error, Result};

/// Configuration for a [`Simulation`](crate::Simulation).
///
/// # Defaults
///
/// ```
/// use u_genexpr::SimulationParams;
///
/// let params = SimulationParams::default();
/// assert_eq!(params.chromosome_size, 60);
/// assert_eq!(params.population_size, 50);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_genexpr::SimulationParams;
///
/// let params = SimulationParams::default()
///     .with_chromosome_size(20)
///     .with_term_max_digits(3)
///     .with_evaluation_workers(0)
///     .with_generation_workers(0)
///     .with_seed(7);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationParams {
    /// Number of genes in each chromosome.
    pub chromosome_size: usize,

    /// Maximum digits a number term may keep; extra digits are marked
    /// invalid and dropped.
    ///
    /// Values ≤ 0 allow any number of digits.
    pub term_max_digits: i32,

    /// Mantissa width, in bits, of the floats used during evaluation.
    ///
    /// Low values can round a near miss onto the target (or the reverse).
    pub float_precision: u32,

    /// Highest fitness a non-exact result can reach, in (0, 1].
    ///
    /// Fitness is roughly `1 / |target - result|`, so a result one away
    /// from the target would otherwise tie with an exact solution.
    pub imperfect_max_score: f64,

    /// Multiplier applied to the fitness of non-integer results, in [0, 1].
    ///
    /// Only integer results can ever equal an integer target.
    pub non_integer_score_multiplier: f64,

    /// Number of chromosomes in the population. Must be even.
    pub population_size: usize,

    /// Probability that a selected pair is crossed over at a random fulcrum.
    pub crossover_rate: f64,

    /// Scales both the per-bit mutation rate and the chance of a rotation.
    pub base_mutation_rate: f64,

    /// Threads used to decode and score each new generation.
    ///
    /// `Some(0)` evaluates on the calling thread; `None` derives a count
    /// from the population size.
    pub num_evaluation_workers: Option<usize>,

    /// Threads used to build each new generation.
    ///
    /// `Some(0)` generates on the calling thread; `None` derives a count
    /// from the population size.
    pub num_generation_workers: Option<usize>,

    /// Seed for the simulation's random number generators.
    ///
    /// Runs are reproducible only when both worker counts are `Some(0)`.
    /// `None` uses a random seed.
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            chromosome_size: 60,
            term_max_digits: -1,
            float_precision: 128,
            imperfect_max_score: 0.96,
            non_integer_score_multiplier: 0.2,
            population_size: 50,
            crossover_rate: 0.8,
            base_mutation_rate: 0.02,
            num_evaluation_workers: Some(0),
            num_generation_workers: None,
            seed: None,
        }
    }
}

impl SimulationParams {
    /// Sets the number of genes per chromosome.
    pub fn with_chromosome_size(mut self, n: usize) -> Self {
        self.chromosome_size = n;
        self
    }

    /// Sets the maximum digits per term (≤ 0 for unlimited).
    pub fn with_term_max_digits(mut self, n: i32) -> Self {
        self.term_max_digits = n;
        self
    }

    /// Sets the evaluation precision in bits.
    pub fn with_float_precision(mut self, bits: u32) -> Self {
        self.float_precision = bits;
        self
    }

    /// Sets the cap on non-exact scores.
    pub fn with_imperfect_max_score(mut self, score: f64) -> Self {
        self.imperfect_max_score = score;
        self
    }

    /// Sets the non-integer penalty multiplier.
    pub fn with_non_integer_score_multiplier(mut self, multiplier: f64) -> Self {
        self.non_integer_score_multiplier = multiplier.clamp(0.0, 1.0);
        self
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the base mutation rate.
    pub fn with_base_mutation_rate(mut self, rate: f64) -> Self {
        self.base_mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the number of evaluation workers (0 for synchronous).
    pub fn with_evaluation_workers(mut self, n: usize) -> Self {
        self.num_evaluation_workers = Some(n);
        self
    }

    /// Sets the number of generation workers (0 for synchronous).
    pub fn with_generation_workers(mut self, n: usize) -> Self {
        self.num_generation_workers = Some(n);
        self
    }

    /// Lets the simulation size both worker pools from the population.
    pub fn with_auto_workers(mut self) -> Self {
        self.num_evaluation_workers = None;
        self.num_generation_workers = None;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Preset for short expressions: 20 genes, 3-digit terms.
    ///
    /// Solves small targets (up to a few thousand) in seconds.
    pub fn small() -> Self {
        Self {
            chromosome_size: 20,
            term_max_digits: 3,
            ..Self::default()
        }
    }

    /// Preset for very large targets: 80 genes, 4-digit terms, 1024-bit
    /// floats.
    pub fn large() -> Self {
        Self {
            chromosome_size: 80,
            term_max_digits: 4,
            float_precision: 1024,
            ..Self::default()
        }
    }

    /// Worker count a pool is built with, resolving `None` from the
    /// population size.
    pub fn resolve_workers(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or_else(|| (self.population_size / 4).max(1))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chromosome_size == 0 {
            return Err(invalid("chromosome_size must be at least 1"));
        }
        if self.float_precision < crate::float::MIN_PRECISION {
            return Err(invalid("float_precision must be at least 2 bits"));
        }
        if self.population_size < 2 {
            return Err(invalid("population_size must be at least 2"));
        }
        if self.population_size % 2 != 0 {
            return Err(invalid("population_size must be even"));
        }
        if !(self.imperfect_max_score > 0.0 && self.imperfect_max_score <= 1.0) {
            return Err(invalid("imperfect_max_score must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.non_integer_score_multiplier) {
            return Err(invalid("non_integer_score_multiplier must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(invalid("crossover_rate must be in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.base_mutation_rate) {
            return Err(invalid("base_mutation_rate must be in [0, 1]"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidParams(message.into())
}
