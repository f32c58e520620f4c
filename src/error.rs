//! Error types.
//!
//! Errors are split by where they surface:
//!
//! - [`EvalError`]: local to one chromosome; degrades its fitness to zero.
//! - [`EncodingError`]: returned while constructing a chromosome from text.
//! - [`OperatorError`]: invalid crossover inputs; aborts the current step.
//! - [`PoolExhausted`]: checked-out scratch objects were never returned.
//!
//! [`Error`] wraps all of them for the simulation-level API.

use thiserror::Error;

/// Failure while evaluating a decoded expression.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    /// A `/` operator had a zero right-hand side.
    #[error("division by zero")]
    DivisionByZero,

    /// The expression contained no accepted terms.
    #[error("expression has no terms")]
    NoTerms,

    /// Numbers and operators did not alternate, e.g. `1+-2` or `1+`.
    /// Decoded expressions are always well formed.
    #[error("malformed expression")]
    MalformedExpression,
}

/// Failure while building a chromosome from an expression or gene string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("expression {expression:?} is longer than the chromosome size ({max})")]
    ExpressionTooLong { expression: String, max: usize },

    #[error("unrecognized symbol {symbol:?} at position {position}")]
    UnrecognizedSymbol { symbol: char, position: usize },

    #[error("unrecognized gene string character {symbol:?} at position {position}, expected '1' or '0'")]
    InvalidGeneCharacter { symbol: char, position: usize },

    #[error("gene string has {bits} bits, which is not a multiple of the gene width ({gene_bits})")]
    IncompleteGene { bits: usize, gene_bits: u32 },
}

/// Invalid input to a genetic operator.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorError {
    #[error("fulcrum {fulcrum} must be less than the total number of gene bits ({total_bits})")]
    InvalidFulcrum { fulcrum: usize, total_bits: usize },

    #[error("expected number of genes in both chromosomes to match ({left} != {right})")]
    ChromosomeLengthMismatch { left: usize, right: usize },
}

/// A scratch pool ran past its outstanding-object limit.
///
/// Objects are returned when their guard drops, so this only happens when
/// guards are leaked.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{pool} pool exhausted: {limit} objects already checked out")]
pub struct PoolExhausted {
    pub pool: &'static str,
    pub limit: usize,
}

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("operator error: {0}")]
    Operator(#[from] OperatorError),

    #[error("resource pool exhausted: {0}")]
    ResourcePoolExhausted(#[from] PoolExhausted),

    #[error("invalid simulation parameters: {0}")]
    InvalidParams(String),

    #[error("simulation has no target; call init() first")]
    NotInitialized,

    #[cfg(feature = "parallel")]
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
