//! Expression evaluation.
//!
//! [`Evaluator`] is an operator-precedence stack machine over a stream of
//! [`Term`]s. The decoder guarantees the stream alternates numbers and
//! operators, with at most one leading `+`/`-` sign.

use crate::error::EvalError;
use crate::float::BigFloat;
use crate::genes::{is_operator, precedence};
use num_bigint::BigUint;

/// One accepted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term<'a> {
    /// ASCII decimal digits.
    Number(&'a [u8]),
    /// One of `+ - * /`.
    Operator(u8),
}

/// Stack machine with reusable stacks.
///
/// The stacks are cleared, not freed, between evaluations.
#[derive(Debug, Default)]
pub struct Evaluator {
    ops: Vec<u8>,
    values: Vec<BigFloat>,
}

impl Evaluator {
    /// An evaluator with empty stacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `terms` with `precision`-bit arithmetic.
    ///
    /// # Errors
    /// - [`EvalError::DivisionByZero`] if a divisor evaluates to zero
    /// - [`EvalError::NoTerms`] if `terms` is empty
    /// - [`EvalError::MalformedExpression`] if numbers and operators do not
    ///   alternate (a single leading `+`/`-` is allowed)
    pub fn evaluate<'a, I>(&mut self, precision: u32, terms: I) -> Result<BigFloat, EvalError>
    where
        I: IntoIterator<Item = Term<'a>>,
    {
        self.clear();
        let result = self.run(precision, terms);
        self.clear();
        result
    }

    /// Empties both stacks, keeping their capacity.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.values.clear();
    }

    fn run<'a, I>(&mut self, precision: u32, terms: I) -> Result<BigFloat, EvalError>
    where
        I: IntoIterator<Item = Term<'a>>,
    {
        let mut after_number = false;
        for term in terms {
            match term {
                Term::Number(digits) => {
                    if after_number {
                        return Err(EvalError::MalformedExpression);
                    }
                    let mut value = parse_digits(digits, precision);

                    // Leading sign.
                    if self.values.is_empty() && self.ops.pop() == Some(b'-') {
                        value = -&value;
                    }
                    self.values.push(value);
                    after_number = true;
                }
                Term::Operator(op) => {
                    let leading_sign =
                        self.values.is_empty() && self.ops.is_empty() && matches!(op, b'+' | b'-');
                    if !after_number && !leading_sign {
                        return Err(EvalError::MalformedExpression);
                    }

                    while let Some(&top) = self.ops.last() {
                        if precedence(top) < precedence(op) {
                            break;
                        }
                        self.apply()?;
                    }
                    self.ops.push(op);
                    after_number = false;
                }
            }
        }

        if !after_number && !self.ops.is_empty() {
            return Err(EvalError::MalformedExpression);
        }
        while !self.ops.is_empty() {
            self.apply()?;
        }
        self.values.pop().ok_or(EvalError::NoTerms)
    }

    fn apply(&mut self) -> Result<(), EvalError> {
        let (Some(op), Some(rhs), Some(lhs)) = (self.ops.pop(), self.values.pop(), self.values.pop())
        else {
            return Err(EvalError::MalformedExpression);
        };

        let result = match op {
            b'+' => &lhs + &rhs,
            b'-' => &lhs - &rhs,
            b'*' => &lhs * &rhs,
            _ => lhs.checked_div(&rhs).ok_or(EvalError::DivisionByZero)?,
        };
        self.values.push(result);
        Ok(())
    }
}

fn parse_digits(digits: &[u8], precision: u32) -> BigFloat {
    let value = BigUint::parse_bytes(digits, 10).unwrap_or_default();
    BigFloat::from_biguint(value, precision)
}

/// Splits a well-formed expression such as `"-12*3+4"` into terms.
///
/// Digits are grouped into numbers; every other byte that is an operator
/// becomes its own term. Other bytes are ignored.
pub fn terms(expression: &str) -> Vec<Term<'_>> {
    let bytes = expression.as_bytes();
    let mut terms = Vec::new();
    let mut start = None;

    for (i, &b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            start.get_or_insert(i);
            continue;
        }
        if let Some(s) = start.take() {
            terms.push(Term::Number(&bytes[s..i]));
        }
        if is_operator(b) {
            terms.push(Term::Operator(b));
        }
    }
    if let Some(s) = start {
        terms.push(Term::Number(&bytes[s..]));
    }
    terms
}

/// Evaluates a cleaned expression, as found in
/// [`DecodeResult::expression`](crate::DecodeResult::expression).
///
/// Bytes other than digits and `+ - * /` are skipped. Input that does not
/// alternate numbers and operators is rejected with
/// [`EvalError::MalformedExpression`] rather than repaired.
///
/// # Examples
///
/// ```
/// use u_genexpr::eval::evaluate_expression;
///
/// let value = evaluate_expression("2+3*4", 64).unwrap();
/// assert_eq!(value.to_string(), "14");
/// ```
pub fn evaluate_expression(expression: &str, precision: u32) -> Result<BigFloat, EvalError> {
    Evaluator::new().evaluate(precision, terms(expression))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> Result<f64, EvalError> {
        evaluate_expression(expr, 128).map(|v| v.to_f64())
    }

    #[test]
    fn test_binary_operators() {
        assert_eq!(eval("1+2"), Ok(3.0));
        assert_eq!(eval("1-2"), Ok(-1.0));
        assert_eq!(eval("1*2"), Ok(2.0));
        assert_eq!(eval("1/2"), Ok(0.5));
    }

    #[test]
    fn test_leading_sign() {
        assert_eq!(eval("+1"), Ok(1.0));
        assert_eq!(eval("-1"), Ok(-1.0));
        assert_eq!(eval("+1+2"), Ok(3.0));
        assert_eq!(eval("-2*3"), Ok(-6.0));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("2+3*4"), Ok(14.0));
        assert_eq!(eval("2*3+4"), Ok(10.0));
        assert_eq!(eval("8/4/2"), Ok(1.0));
        assert_eq!(eval("8-4-2"), Ok(2.0));
        assert_eq!(eval("1-6/4*2"), Ok(-2.0));
    }

    #[test]
    fn test_long_expression_is_exact() {
        let value = evaluate_expression("8-264*38*265*824+966+92*37*891+285", 128).unwrap();
        assert_eq!(value.to_string(), "-2187553297");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1/0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("5+3/0*2"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("4/2-2"), Ok(0.0));
        assert_eq!(eval("1/4-1/4"), Ok(0.0));
    }

    #[test]
    fn test_division_binds_tighter_than_subtraction() {
        // The divisor is 2, not 2-2.
        assert_eq!(eval("1/2-2"), Ok(-1.5));
    }

    #[test]
    fn test_no_terms() {
        assert_eq!(eval(""), Err(EvalError::NoTerms));
    }

    #[test]
    fn test_malformed_input_rejected() {
        for expr in ["1+-2", "1+", "+", "*2", "1**2", "--1"] {
            assert_eq!(eval(expr), Err(EvalError::MalformedExpression), "{expr}");
        }

        let mut evaluator = Evaluator::new();
        let adjacent = [Term::Number(b"1"), Term::Number(b"2")];
        assert_eq!(
            evaluator.evaluate(64, adjacent),
            Err(EvalError::MalformedExpression)
        );
        assert_eq!(evaluator.evaluate(64, terms("-4*2")).unwrap().to_f64(), -8.0);
    }

    #[test]
    fn test_evaluator_reuse() {
        let mut evaluator = Evaluator::new();
        assert!(evaluator.evaluate(64, terms("1/0")).is_err());
        // Stacks left over from the failed run must not leak into the next.
        let value = evaluator.evaluate(64, terms("7")).unwrap();
        assert_eq!(value.to_f64(), 7.0);
    }

    #[test]
    fn test_terms() {
        assert_eq!(
            terms("-12*3"),
            vec![
                Term::Operator(b'-'),
                Term::Number(b"12"),
                Term::Operator(b'*'),
                Term::Number(b"3"),
            ]
        );
    }
}
