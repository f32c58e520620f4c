//! Fitness scoring.
//!
//! Fitness grows as a result approaches the target:
//!
//! | result                            | fitness                             |
//! |-----------------------------------|-------------------------------------|
//! | evaluation error                  | `0`                                 |
//! | exactly the target                | `1` (the sentinel)                  |
//! | `d = trunc(abs(target - value))` is 0 | `imperfect_max_score`           |
//! | otherwise                         | `imperfect_max_score / d`           |
//!
//! Non-integer results are then multiplied by the non-integer multiplier.

use crate::config::SimulationParams;
use crate::error::EvalError;
use crate::float::BigFloat;

/// Scores evaluated expressions against a fixed target.
#[derive(Debug, Clone)]
pub struct FitnessScorer {
    target: BigFloat,
    imperfect_max: BigFloat,
    non_integer_multiplier: BigFloat,
}

impl FitnessScorer {
    pub fn new(target: BigFloat, params: &SimulationParams) -> Self {
        let precision = params.float_precision;
        Self {
            target,
            imperfect_max: BigFloat::from_f64(params.imperfect_max_score, precision),
            non_integer_multiplier: BigFloat::from_f64(params.non_integer_score_multiplier, precision),
        }
    }

    pub fn target(&self) -> &BigFloat {
        &self.target
    }

    /// The fitness of an exact solution.
    pub fn sentinel(&self) -> BigFloat {
        BigFloat::from_i64(1, self.target.precision())
    }

    pub fn is_sentinel(fitness: &BigFloat) -> bool {
        *fitness == BigFloat::from_i64(1, fitness.precision())
    }

    /// Whether `value` equals the target exactly.
    pub fn is_exact(&self, value: &BigFloat) -> bool {
        *value == self.target
    }

    pub fn score(&self, value: Result<&BigFloat, EvalError>) -> BigFloat {
        let precision = self.target.precision();
        let Ok(value) = value else {
            return BigFloat::zero(precision);
        };
        if self.is_exact(value) {
            return self.sentinel();
        }

        let mut distance = &self.target - value;
        distance.abs_assign();
        distance.trunc_assign();

        let mut score = self
            .imperfect_max
            .checked_div(&distance)
            .unwrap_or_else(|| self.imperfect_max.clone());
        if !value.is_int() {
            score *= &self.non_integer_multiplier;
        }
        score
    }
}
