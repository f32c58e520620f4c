//! Arbitrary-precision binary floating point.
//!
//! [`BigFloat`] stores `mantissa · 2^exponent` with a `BigInt` mantissa that
//! is rounded to `precision` significant bits (round half to even) after
//! every operation. Integers that fit in `precision` bits are exact, so long
//! digit runs evaluate without the overflow or rounding of `f64`.
//!
//! Values are kept normalized: a zero mantissa has exponent 0, and trailing
//! zero bits are shifted into the exponent. With that invariant a value is
//! an integer exactly when its exponent is non-negative.

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Smallest precision accepted; lower requests are raised to this.
pub const MIN_PRECISION: u32 = 2;

/// A binary floating-point number with a configurable mantissa width.
///
/// Comparison and equality are by value; the precision of the operands does
/// not take part.
///
/// # Examples
///
/// ```
/// use u_genexpr::BigFloat;
///
/// let one = BigFloat::from_i64(1, 128);
/// let three = BigFloat::from_i64(3, 128);
/// let third = one.checked_div(&three).unwrap();
/// assert!(!third.is_int());
/// assert!(three.checked_div(&BigFloat::zero(128)).is_none());
/// ```
#[derive(Debug)]
pub struct BigFloat {
    mantissa: BigInt,
    exponent: i64,
    precision: u32,
}

impl BigFloat {
    /// Zero at the given precision.
    pub fn zero(precision: u32) -> Self {
        Self {
            mantissa: BigInt::zero(),
            exponent: 0,
            precision: precision.max(MIN_PRECISION),
        }
    }

    pub fn from_i64(value: i64, precision: u32) -> Self {
        Self::from_parts(BigInt::from(value), 0, precision)
    }

    pub fn from_bigint(value: &BigInt, precision: u32) -> Self {
        Self::from_parts(value.clone(), 0, precision)
    }

    pub fn from_biguint(value: BigUint, precision: u32) -> Self {
        Self::from_parts(BigInt::from(value), 0, precision)
    }

    /// Converts an `f64` exactly (then rounds to `precision`).
    ///
    /// Non-finite inputs become zero.
    pub fn from_f64(value: f64, precision: u32) -> Self {
        if value == 0.0 || !value.is_finite() {
            return Self::zero(precision);
        }

        let bits = value.to_bits();
        let negative = bits >> 63 == 1;
        let biased = ((bits >> 52) & 0x7ff) as i64;
        let fraction = bits & ((1u64 << 52) - 1);

        // Subnormals have no implicit leading bit.
        let (significand, exponent) = if biased == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), biased - 1075)
        };

        let mut mantissa = BigInt::from(significand);
        if negative {
            mantissa = -mantissa;
        }
        Self::from_parts(mantissa, exponent, precision)
    }

    fn from_parts(mantissa: BigInt, exponent: i64, precision: u32) -> Self {
        let mut value = Self {
            mantissa,
            exponent,
            precision: precision.max(MIN_PRECISION),
        };
        value.normalize();
        value
    }

    /// Rounds the mantissa to `precision` bits and strips trailing zeros,
    /// reusing the mantissa's storage.
    fn normalize(&mut self) {
        if self.mantissa.is_zero() {
            self.exponent = 0;
            return;
        }

        let (sign, mut magnitude) = std::mem::take(&mut self.mantissa).into_parts();

        let bits = magnitude.bits();
        let limit = u64::from(self.precision);
        if bits > limit {
            let shift = bits - limit;
            let round_bit = magnitude.bit(shift - 1);
            let sticky = magnitude
                .trailing_zeros()
                .is_some_and(|zeros| zeros < shift - 1);
            magnitude >>= shift;
            if round_bit && (sticky || magnitude.bit(0)) {
                magnitude += 1u32;
            }
            self.exponent += shift as i64;
        }

        if let Some(zeros) = magnitude.trailing_zeros() {
            if zeros > 0 {
                magnitude >>= zeros;
                self.exponent += zeros as i64;
            }
        }

        self.mantissa = BigInt::from_biguint(sign, magnitude);
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    /// Whether the value has no fractional part.
    pub fn is_int(&self) -> bool {
        self.mantissa.is_zero() || self.exponent >= 0
    }

    /// Resets to zero, keeping the precision and the mantissa's storage.
    pub fn set_zero(&mut self) {
        Zero::set_zero(&mut self.mantissa);
        self.exponent = 0;
    }

    pub fn abs(&self) -> Self {
        let mut value = self.clone();
        value.abs_assign();
        value
    }

    /// In-place [`abs`](Self::abs).
    pub fn abs_assign(&mut self) {
        if self.mantissa.is_negative() {
            self.mantissa = -std::mem::take(&mut self.mantissa);
        }
    }

    /// Rounds toward zero to an integer value.
    pub fn trunc(&self) -> Self {
        let mut value = self.clone();
        value.trunc_assign();
        value
    }

    /// In-place [`trunc`](Self::trunc).
    pub fn trunc_assign(&mut self) {
        if self.is_int() {
            return;
        }
        let (sign, mut magnitude) = std::mem::take(&mut self.mantissa).into_parts();
        magnitude >>= self.exponent.unsigned_abs();
        self.mantissa = BigInt::from_biguint(sign, magnitude);
        self.exponent = 0;
        self.normalize();
    }

    /// The integer part, rounded toward zero.
    pub fn to_bigint(&self) -> BigInt {
        if self.exponent >= 0 {
            return &self.mantissa << (self.exponent as u64);
        }
        let shift = self.exponent.unsigned_abs();
        let magnitude = self.mantissa.magnitude() >> shift;
        BigInt::from_biguint(self.mantissa.sign(), magnitude)
    }

    /// Nearest `f64`, saturating to infinity when out of range.
    pub fn to_f64(&self) -> f64 {
        if self.mantissa.is_zero() {
            return 0.0;
        }

        // Keep 64 significant bits; the rest cannot reach an f64 anyway.
        let bits = self.mantissa.bits();
        let (magnitude, exponent) = if bits > 64 {
            let shift = bits - 64;
            (
                self.mantissa.magnitude() >> shift,
                self.exponent + shift as i64,
            )
        } else {
            (self.mantissa.magnitude().clone(), self.exponent)
        };

        let value = scale_by_power_of_two(magnitude.to_f64().unwrap_or(f64::INFINITY), exponent);
        if self.mantissa.is_negative() {
            -value
        } else {
            value
        }
    }

    /// Division, or `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        if rhs.is_zero() {
            return None;
        }
        let precision = self.precision.max(rhs.precision);
        if self.is_zero() {
            return Some(Self::zero(precision));
        }

        let numerator = self.mantissa.magnitude();
        let denominator = rhs.mantissa.magnitude();

        // Scale the numerator so the quotient carries two bits beyond the
        // precision; a non-zero remainder becomes a sticky low bit.
        let shift = (i64::from(precision) + 2 + denominator.bits() as i64
            - numerator.bits() as i64)
            .max(0) as u64;
        let (mut quotient, remainder) = (numerator << shift).div_rem(denominator);
        let mut exponent = self.exponent - rhs.exponent - shift as i64;
        if !remainder.is_zero() {
            quotient = (quotient << 1u32) + 1u32;
            exponent -= 1;
        }

        let sign = if self.mantissa.sign() == rhs.mantissa.sign() {
            Sign::Plus
        } else {
            Sign::Minus
        };
        Some(Self::from_parts(
            BigInt::from_biguint(sign, quotient),
            exponent,
            precision,
        ))
    }

    /// Adds `rhs` (or subtracts it, with `negate`) into `self` in place.
    fn accumulate(&mut self, rhs: &Self, negate: bool) {
        self.precision = self.precision.max(rhs.precision);
        if rhs.is_zero() {
            return;
        }

        if self.is_zero() {
            self.mantissa.clone_from(&rhs.mantissa);
            if negate {
                self.mantissa = -std::mem::take(&mut self.mantissa);
            }
            self.exponent = rhs.exponent;
            self.normalize();
            return;
        }

        if self.exponent > rhs.exponent {
            self.mantissa <<= (self.exponent - rhs.exponent) as u64;
            self.exponent = rhs.exponent;
        }
        let shift = (rhs.exponent - self.exponent) as u64;
        match (shift, negate) {
            (0, false) => self.mantissa += &rhs.mantissa,
            (0, true) => self.mantissa -= &rhs.mantissa,
            (_, false) => self.mantissa += &rhs.mantissa << shift,
            (_, true) => self.mantissa -= &rhs.mantissa << shift,
        }
        self.normalize();
    }

    /// Mantissas of both operands shifted to their common (lower) exponent.
    fn aligned(&self, rhs: &Self) -> (BigInt, BigInt, i64) {
        let exponent = self.exponent.min(rhs.exponent);
        let lhs = &self.mantissa << ((self.exponent - exponent) as u64);
        let rhs = &rhs.mantissa << ((rhs.exponent - exponent) as u64);
        (lhs, rhs, exponent)
    }
}

fn scale_by_power_of_two(mut value: f64, mut exponent: i64) -> f64 {
    const STEP: i64 = 1000;
    exponent = exponent.clamp(-4 * STEP, 4 * STEP);
    while exponent > STEP {
        value *= 2f64.powi(STEP as i32);
        exponent -= STEP;
    }
    while exponent < -STEP {
        value *= 2f64.powi(-STEP as i32);
        exponent += STEP;
    }
    value * 2f64.powi(exponent as i32)
}

impl Add for &BigFloat {
    type Output = BigFloat;

    fn add(self, rhs: &BigFloat) -> BigFloat {
        let precision = self.precision.max(rhs.precision);
        let (lhs, rhs, exponent) = self.aligned(rhs);
        BigFloat::from_parts(lhs + rhs, exponent, precision)
    }
}

impl Sub for &BigFloat {
    type Output = BigFloat;

    fn sub(self, rhs: &BigFloat) -> BigFloat {
        let precision = self.precision.max(rhs.precision);
        let (lhs, rhs, exponent) = self.aligned(rhs);
        BigFloat::from_parts(lhs - rhs, exponent, precision)
    }
}

impl Mul for &BigFloat {
    type Output = BigFloat;

    fn mul(self, rhs: &BigFloat) -> BigFloat {
        BigFloat::from_parts(
            &self.mantissa * &rhs.mantissa,
            self.exponent + rhs.exponent,
            self.precision.max(rhs.precision),
        )
    }
}

impl Neg for &BigFloat {
    type Output = BigFloat;

    fn neg(self) -> BigFloat {
        BigFloat {
            mantissa: -&self.mantissa,
            exponent: self.exponent,
            precision: self.precision,
        }
    }
}

impl AddAssign<&BigFloat> for BigFloat {
    fn add_assign(&mut self, rhs: &BigFloat) {
        self.accumulate(rhs, false);
    }
}

impl SubAssign<&BigFloat> for BigFloat {
    fn sub_assign(&mut self, rhs: &BigFloat) {
        self.accumulate(rhs, true);
    }
}

impl MulAssign<&BigFloat> for BigFloat {
    fn mul_assign(&mut self, rhs: &BigFloat) {
        self.mantissa *= &rhs.mantissa;
        self.exponent += rhs.exponent;
        self.precision = self.precision.max(rhs.precision);
        self.normalize();
    }
}

impl Clone for BigFloat {
    fn clone(&self) -> Self {
        Self {
            mantissa: self.mantissa.clone(),
            exponent: self.exponent,
            precision: self.precision,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.mantissa.clone_from(&source.mantissa);
        self.exponent = source.exponent;
        self.precision = source.precision;
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BigFloat {}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs_sign, rhs_sign) = (self.mantissa.sign(), other.mantissa.sign());
        if lhs_sign != rhs_sign || lhs_sign == Sign::NoSign {
            return lhs_sign.cmp(&rhs_sign);
        }
        let (lhs, rhs, _) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_int() {
            write!(f, "{}", self.to_bigint())
        } else {
            write!(f, "{}", self.to_f64())
        }
    }
}
