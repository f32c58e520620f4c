//! The evolutionary loop.
//!
//! [`Simulation`] owns the population and drives each generation:
//! selection → crossover → mutation → rotation → decode → scoring.
//!
//! # Lifecycle
//!
//! ```text
//! new ──► init(target) ──► step ⇄ step ... ──► solved
//! ```
//!
//! Calling [`step`](Simulation::step) before [`init`](Simulation::init)
//! returns [`Error::NotInitialized`].
//!
//! # Concurrency
//!
//! Generation and evaluation each run on their own worker pool. A width of
//! zero runs that phase on the calling thread. Every worker draws from its
//! own generator, checked out of the simulation's generator pool, so runs
//! are reproducible from [`SimulationParams::seed`] only when both phases
//! are synchronous.

use crate::chromosome::Chromosome;
use crate::config::SimulationParams;
use crate::context::Context;
use crate::error::{EncodingError, Error, Result};
use crate::fitness::FitnessScorer;
use crate::float::BigFloat;
use crate::genes::{self, Gene, GENE_BITS, GENE_MASK, UNKNOWN_GENES};
use crate::operators;
use crate::selection::Selector;
use crate::types::{Population, PopulationMember};
use log::{debug, info};
use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of [`Simulation::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether at least one exact solution was found.
    pub solved: bool,

    /// Number of steps taken by this run.
    pub iterations: u64,

    /// Wall-clock time spent stepping.
    pub elapsed: Duration,
}

/// Where one phase of a step runs.
#[derive(Debug)]
enum Workers {
    Inline,
    #[cfg(feature = "parallel")]
    Threads(rayon::ThreadPool),
}

impl Workers {
    fn build(phase: &'static str, width: usize) -> Result<Self> {
        if width == 0 {
            return Ok(Workers::Inline);
        }

        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(width)
                .thread_name(move |i| format!("genexpr-{phase}-{i}"))
                .build()?;
            Ok(Workers::Threads(pool))
        }

        #[cfg(not(feature = "parallel"))]
        {
            log::warn!("{phase} workers ({width}) need the `parallel` feature; running synchronously");
            Ok(Workers::Inline)
        }
    }

    fn width(&self) -> usize {
        match self {
            Workers::Inline => 0,
            #[cfg(feature = "parallel")]
            Workers::Threads(pool) => pool.current_num_threads(),
        }
    }
}

/// Mutation pressure for one generation.
///
/// The multiplier is 2 at the start of every 100-iteration cycle and decays
/// logarithmically toward 1 by its end.
#[derive(Debug, Clone, Copy)]
struct MutationSchedule {
    multiplier: f64,
    base_mutation_rate: f64,
}

impl MutationSchedule {
    fn at(iteration: u64, base_mutation_rate: f64) -> Self {
        let cycle = (iteration % 100).max(1) as f64;
        Self {
            multiplier: 2.0 - cycle.ln() / 100f64.ln(),
            base_mutation_rate,
        }
    }

    fn scaled(&self) -> f64 {
        self.base_mutation_rate * self.multiplier
    }

    /// Rate shared by both children of a pair.
    fn pair_rate<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.scaled() * (1.0 - rng.random::<f64>())
    }

    /// Rate for one child; fitter parents mutate less.
    fn child_rate<R: Rng + ?Sized>(&self, pair_rate: f64, parent_fitness: &BigFloat, rng: &mut R) -> f64 {
        pair_rate * (1.0 - parent_fitness.to_f64().abs() + rng.random::<f64>() * self.scaled())
    }

    /// Bits a child is rotated by, when it rotates.
    fn rotation(&self) -> usize {
        (self.multiplier * f64::from(GENE_BITS)) as usize
    }
}

/// A genetic-algorithm run toward one numeric target.
///
/// # Examples
///
/// ```
/// use u_genexpr::{Simulation, SimulationParams};
///
/// let params = SimulationParams::small()
///     .with_generation_workers(0)
///     .with_seed(42);
/// let mut sim = Simulation::new(params).unwrap();
/// sim.init_from_int(42);
///
/// let summary = sim.run(200).unwrap();
/// if summary.solved {
///     let solution = &sim.solutions()[0];
///     assert_eq!(solution.evaluate().unwrap().to_string(), "42");
/// }
/// ```
#[derive(Debug)]
pub struct Simulation {
    ctx: Arc<Context>,
    scorer: Option<FitnessScorer>,
    iteration: u64,
    population: Population,
    solutions: Vec<Chromosome>,
    generation_workers: Workers,
    evaluation_workers: Workers,
}

impl Simulation {
    /// Creates a simulation and its worker pools.
    ///
    /// # Errors
    /// - [`Error::InvalidParams`] if `params` fails validation
    /// - [`Error::ThreadPool`] if a worker pool cannot be started
    pub fn new(params: SimulationParams) -> Result<Self> {
        params.validate()?;

        let generation_workers = Workers::build(
            "generation",
            params.resolve_workers(params.num_generation_workers),
        )?;
        let evaluation_workers = Workers::build(
            "evaluation",
            params.resolve_workers(params.num_evaluation_workers),
        )?;
        debug!(
            "simulation: {} x {} genes, {} generation / {} evaluation workers",
            params.population_size,
            params.chromosome_size,
            generation_workers.width(),
            evaluation_workers.width()
        );

        Ok(Self {
            ctx: Arc::new(Context::new(params)),
            scorer: None,
            iteration: 0,
            population: Population::default(),
            solutions: Vec::new(),
            generation_workers,
            evaluation_workers,
        })
    }

    /// Sets the target and creates a random, scored initial population.
    ///
    /// Resets the iteration counter and any solutions found earlier.
    pub fn init(&mut self, target: &BigInt) {
        let scorer = FitnessScorer::new(
            BigFloat::from_bigint(target, self.params().float_precision),
            self.params(),
        );

        let members = (0..self.params().population_size)
            .map(|_| {
                let chromosome = self.random_chromosome();
                let fitness = scorer.score(chromosome.evaluate());
                PopulationMember::new(chromosome, fitness)
            })
            .collect();

        self.population = Population::new(members);
        self.scorer = Some(scorer);
        self.iteration = 0;
        self.solutions.clear();
    }

    pub fn init_from_int(&mut self, target: i64) {
        self.init(&BigInt::from(target));
    }

    pub fn params(&self) -> &SimulationParams {
        &self.ctx.params
    }

    /// Number of completed steps since [`init`](Self::init).
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Exact solutions found so far, in discovery order.
    pub fn solutions(&self) -> &[Chromosome] {
        &self.solutions
    }

    pub fn is_solved(&self) -> bool {
        !self.solutions.is_empty()
    }

    /// The target, once [`init`](Self::init) has been called.
    pub fn target(&self) -> Option<&BigFloat> {
        self.scorer.as_ref().map(FitnessScorer::target)
    }

    pub fn fittest(&self) -> Option<&PopulationMember> {
        self.population.fittest()
    }

    /// Advances one generation and reports whether any solution has been
    /// found so far.
    ///
    /// # Errors
    /// - [`Error::NotInitialized`] before [`init`](Self::init)
    /// - [`Error::Operator`] if a crossover receives invalid input
    /// - [`Error::ResourcePoolExhausted`] if scratch objects were leaked
    pub fn step(&mut self) -> Result<bool> {
        let scorer = self.scorer.as_ref().ok_or(Error::NotInitialized)?;

        let generation = self.next_generation()?;
        let members = self.score_generation(generation, scorer);

        let found: Vec<Chromosome> = members
            .iter()
            .filter(|m| {
                FitnessScorer::is_sentinel(m.fitness())
                    && m.chromosome().evaluate().is_ok_and(|v| scorer.is_exact(v))
            })
            .map(|m| m.chromosome().clone())
            .collect();

        self.population = Population::new(members);
        for solution in &found {
            info!(
                "iteration {}: found solution {}",
                self.iteration,
                solution.decode().expression
            );
        }
        self.solutions.extend(found);
        self.iteration += 1;

        if log::log_enabled!(log::Level::Debug) {
            let best = self
                .population
                .fittest()
                .map(|m| m.fitness().to_f64())
                .unwrap_or_default();
            debug!(
                "iteration {}: best fitness {best:.6}, {} solution(s)",
                self.iteration,
                self.solutions.len()
            );
        }

        Ok(self.is_solved())
    }

    /// Steps until a solution is found or `max_iterations` steps have run.
    ///
    /// Progress and the fittest member are logged every 100 iterations.
    ///
    /// # Errors
    /// Same as [`step`](Self::step).
    pub fn run(&mut self, max_iterations: u64) -> Result<RunSummary> {
        let target = self.target().ok_or(Error::NotInitialized)?.to_string();
        info!("solving for: {target}");

        let started = Instant::now();
        let mut iterations = 0;
        let mut solved = false;
        while iterations < max_iterations {
            iterations += 1;
            if self.step()? {
                solved = true;
                info!("iteration {}: SOLVED {target}", self.iteration);
                break;
            }
            if self.iteration % 100 == 0 {
                if let Some(best) = self.fittest() {
                    info!(
                        "iteration {}: solving for {target}\n{}",
                        self.iteration,
                        best.chromosome().verbose_string()
                    );
                }
            }
        }
        let elapsed = started.elapsed();

        for solution in &self.solutions {
            info!("solution:\n{}", solution.verbose_string());
        }
        if iterations > 0 {
            info!(
                "elapsed {elapsed:?}, {:?} per iteration",
                elapsed / u32::try_from(iterations).unwrap_or(u32::MAX)
            );
        }

        Ok(RunSummary {
            solved,
            iterations,
            elapsed,
        })
    }

    /// Draws `n` members by fitness-proportionate selection without
    /// replacement (fewer if the population is smaller).
    ///
    /// # Errors
    /// Returns [`Error::ResourcePoolExhausted`] if scratch objects were leaked.
    pub fn select(&self, n: usize) -> Result<Vec<&PopulationMember>> {
        let mut rng = self.ctx.rngs.try_checkout()?;
        let mut selector = Selector::new(self.population.sorted_by_fitness(), &self.ctx.floats)?;
        Ok(selector.draw_many(n, &mut *rng))
    }

    /// A chromosome of `chromosome_size` uniformly random genes.
    pub fn random_chromosome(&self) -> Chromosome {
        let mut rng = self.ctx.rngs.checkout();
        let genes = (0..self.params().chromosome_size)
            .map(|_| rng.random::<Gene>() & GENE_MASK)
            .collect();
        Chromosome::with_genes(genes, Arc::clone(&self.ctx))
    }

    /// Encodes `expression` with one gene per symbol.
    ///
    /// # Errors
    /// - [`EncodingError::ExpressionTooLong`] if it has more symbols than
    ///   `chromosome_size`
    /// - [`EncodingError::UnrecognizedSymbol`] for anything other than
    ///   digits and `+ - * /`
    pub fn encode_expression(
        &self,
        expression: &str,
    ) -> std::result::Result<Chromosome, EncodingError> {
        self.encode_chromosome(expression, false)
    }

    /// Like [`encode_expression`](Self::encode_expression), but with
    /// `random_unknown` each unrecognized symbol becomes a random unknown
    /// gene instead of an error.
    ///
    /// The chromosome has one gene per symbol, which may be fewer than
    /// `chromosome_size`.
    pub fn encode_chromosome(
        &self,
        expression: &str,
        random_unknown: bool,
    ) -> std::result::Result<Chromosome, EncodingError> {
        let max = self.params().chromosome_size;
        if expression.chars().count() > max {
            return Err(EncodingError::ExpressionTooLong {
                expression: expression.to_string(),
                max,
            });
        }

        let mut rng = None;
        let mut genes = Vec::with_capacity(expression.len());
        for (position, symbol) in expression.chars().enumerate() {
            let gene = match u8::try_from(symbol).ok().and_then(genes::gene_of) {
                Some(gene) => gene,
                None if random_unknown => {
                    let rng = rng.get_or_insert_with(|| self.ctx.rngs.checkout());
                    UNKNOWN_GENES[rng.random_range(0..UNKNOWN_GENES.len())]
                }
                None => return Err(EncodingError::UnrecognizedSymbol { symbol, position }),
            };
            genes.push(gene);
        }

        Ok(Chromosome::with_genes(genes, Arc::clone(&self.ctx)))
    }

    /// Parses a bit string such as `"10101 01010"`; whitespace is ignored.
    ///
    /// # Errors
    /// - [`EncodingError::InvalidGeneCharacter`] for characters other than
    ///   `0`, `1` and whitespace
    /// - [`EncodingError::IncompleteGene`] if the bit count is not a
    ///   multiple of the gene width
    pub fn chromosome_from_gene_string(
        &self,
        gene_string: &str,
    ) -> std::result::Result<Chromosome, EncodingError> {
        let bits: Vec<(usize, char)> = gene_string
            .chars()
            .enumerate()
            .filter(|(_, c)| !c.is_whitespace())
            .collect();

        let mut genes = Vec::with_capacity(bits.len() / GENE_BITS as usize);
        for chunk in bits.chunks(GENE_BITS as usize) {
            if chunk.len() < GENE_BITS as usize {
                return Err(EncodingError::IncompleteGene {
                    bits: bits.len(),
                    gene_bits: GENE_BITS,
                });
            }
            let mut gene: Gene = 0;
            for &(position, symbol) in chunk {
                gene <<= 1;
                match symbol {
                    '1' => gene |= 1,
                    '0' => {}
                    _ => return Err(EncodingError::InvalidGeneCharacter { symbol, position }),
                }
            }
            genes.push(gene);
        }

        Ok(Chromosome::with_genes(genes, Arc::clone(&self.ctx)))
    }

    // ---- Generation ----

    fn next_generation(&self) -> Result<Vec<Chromosome>> {
        let sorted = self.population.sorted_by_fitness();
        let schedule = MutationSchedule::at(self.iteration, self.params().base_mutation_rate);
        let pairs = self.params().population_size / 2;
        let breed = |rng: &mut StdRng| self.breed_pair(&sorted, &schedule, rng);

        let children: Vec<[Chromosome; 2]> = match &self.generation_workers {
            Workers::Inline => {
                let mut rng = self.ctx.rngs.try_checkout()?;
                (0..pairs)
                    .map(|_| breed(&mut *rng))
                    .collect::<Result<_>>()?
            }
            #[cfg(feature = "parallel")]
            Workers::Threads(pool) => pool.install(|| {
                (0..pairs)
                    .into_par_iter()
                    .map_init(
                        || self.ctx.rngs.try_checkout(),
                        |rng, _| match rng {
                            Ok(rng) => breed(&mut **rng),
                            Err(err) => Err(Error::from(*err)),
                        },
                    )
                    .collect::<Result<_>>()
            })?,
        };

        Ok(children.into_iter().flatten().collect())
    }

    fn breed_pair(
        &self,
        sorted: &[&PopulationMember],
        schedule: &MutationSchedule,
        rng: &mut StdRng,
    ) -> Result<[Chromosome; 2]> {
        let mut selector = Selector::new(sorted.to_vec(), &self.ctx.floats)?;
        let (Some(a), Some(b)) = (selector.draw(rng), selector.draw(rng)) else {
            return Err(Error::InvalidParams(
                "population_size must be at least 2".into(),
            ));
        };
        drop(selector);

        let pair_rate = schedule.pair_rate(rng);
        let a_rate = schedule.child_rate(pair_rate, a.fitness(), rng);
        let b_rate = schedule.child_rate(pair_rate, b.fitness(), rng);

        let crossed;
        let (a_child, b_child) = if rng.random::<f64>() < self.params().crossover_rate {
            crossed = operators::crossover(a.chromosome(), b.chromosome(), rng)?;
            (&crossed.0, &crossed.1)
        } else {
            (a.chromosome(), b.chromosome())
        };

        let mut a_child = a_child.mutate_with_rng(a_rate, rng);
        let mut b_child = b_child.mutate_with_rng(b_rate, rng);

        if rng.random::<f64>() < a_rate {
            a_child = a_child.rotate(schedule.rotation());
        }
        if rng.random::<f64>() < b_rate {
            b_child = b_child.rotate(schedule.rotation());
        }

        Ok([a_child, b_child])
    }

    // ---- Evaluation ----

    fn score_generation(&self, generation: Vec<Chromosome>, scorer: &FitnessScorer) -> Vec<PopulationMember> {
        let fitness: Vec<BigFloat> = match &self.evaluation_workers {
            Workers::Inline => generation.iter().map(|c| scorer.score(c.evaluate())).collect(),
            #[cfg(feature = "parallel")]
            Workers::Threads(pool) => {
                let chunk = generation.len().div_ceil(pool.current_num_threads()).max(1);
                pool.install(|| {
                    generation
                        .par_chunks(chunk)
                        .flat_map_iter(|chunk| chunk.iter().map(|c| scorer.score(c.evaluate())))
                        .collect()
                })
            }
        };

        generation
            .into_iter()
            .zip(fitness)
            .map(|(chromosome, fitness)| PopulationMember::new(chromosome, fitness))
            .collect()
    }
}
