//! `ScaledNumber`: a base-2 scaled-number representation for synthetic
//! execution-frequency values (§4.4).
//!
//! A value is `mantissa * 2^exponent`, with the mantissa normalized to fill
//! the top `MANTISSA_BITS` bits whenever it is non-zero. That keeps the
//! ordering of two values a plain lexicographic comparison of
//! `(exponent, mantissa)`, and gives the type a dynamic range an `f64`
//! cannot match at either tail: a hot loop inlined many levels deep, or a
//! path so cold it would underflow a fixed-point counter.
//!
//! This is deliberately an approximation, not an arbitrary-precision
//! rational type: `reciprocal` and therefore `div` lose low bits of
//! precision, which is fine for a heuristic that feeds threshold selection
//! and never an exactness-sensitive computation.

use std::cmp::Ordering;
use std::fmt;

const MANTISSA_BITS: u32 = 32;

#[derive(Clone, Copy, Debug)]
pub struct ScaledNumber {
    mantissa: u64,
    exponent: i16,
}

impl ScaledNumber {
    pub const ZERO: ScaledNumber = ScaledNumber { mantissa: 0, exponent: 0 };

    /// The largest value this type can represent; used as the cold
    /// threshold's inert default (§4.6) so "no function is ever cold" falls
    /// out of the comparison without a special case.
    pub const MAX: ScaledNumber = ScaledNumber { mantissa: (1u64 << MANTISSA_BITS) - 1, exponent: i16::MAX };

    pub fn from_u64(value: u64) -> Self {
        ScaledNumber { mantissa: value, exponent: 0 }.normalized()
    }

    fn normalized(mut self) -> Self {
        if self.mantissa == 0 {
            return ScaledNumber::ZERO;
        }
        while self.mantissa >= (1u64 << MANTISSA_BITS) {
            self.mantissa >>= 1;
            self.exponent = self.exponent.saturating_add(1);
        }
        while self.mantissa < (1u64 << (MANTISSA_BITS - 1)) && self.exponent > i16::MIN {
            self.mantissa <<= 1;
            self.exponent -= 1;
        }
        self
    }

    pub fn is_zero(self) -> bool {
        self.mantissa == 0
    }

    pub fn add(self, rhs: Self) -> Self {
        if self.mantissa == 0 {
            return rhs;
        }
        if rhs.mantissa == 0 {
            return self;
        }
        let (hi, lo) = if self.exponent >= rhs.exponent { (self, rhs) } else { (rhs, self) };
        let shift = (hi.exponent - lo.exponent) as u32;
        let lo_mantissa = if shift >= 64 { 0 } else { lo.mantissa >> shift };
        ScaledNumber { mantissa: hi.mantissa.saturating_add(lo_mantissa), exponent: hi.exponent }.normalized()
    }

    pub fn mul(self, rhs: Self) -> Self {
        if self.mantissa == 0 || rhs.mantissa == 0 {
            return ScaledNumber::ZERO;
        }
        let mut mantissa = self.mantissa as u128 * rhs.mantissa as u128;
        let mut exponent = self.exponent as i32 + rhs.exponent as i32;
        while mantissa >> MANTISSA_BITS != 0 {
            mantissa >>= 1;
            exponent += 1;
        }
        ScaledNumber {
            mantissa: mantissa as u64,
            exponent: exponent.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        }
        .normalized()
    }

    /// An approximate reciprocal, accurate to `MANTISSA_BITS` bits.
    ///
    /// Asserts on a zero input: every caller in this crate divides by an
    /// entry frequency that must be non-zero whenever a call site exists
    /// (§4.4, §7 class 1), so a zero here is a collaborator contract
    /// violation, not a data condition to special-case.
    pub fn reciprocal(self) -> Self {
        assert!(!self.is_zero(), "ScaledNumber::reciprocal called on zero");
        let numerator: u128 = 1u128 << (2 * MANTISSA_BITS);
        let recip_mantissa = (numerator / self.mantissa as u128) as u64;
        let exponent = -(self.exponent as i32) - 2 * MANTISSA_BITS as i32;
        ScaledNumber {
            mantissa: recip_mantissa,
            exponent: exponent.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        }
        .normalized()
    }

    pub fn div(self, rhs: Self) -> Self {
        self.mul(rhs.reciprocal())
    }

    /// `log10` of this value, or `None` for zero. Used only by the normal
    /// threshold metric (§4.6), which works in log space precisely so a
    /// ~2^32767-wide dynamic range stays inside `f64`'s exponent range.
    pub fn log10(self) -> Option<f64> {
        if self.is_zero() {
            return None;
        }
        Some((self.mantissa as f64).log10() + self.exponent as f64 * std::f64::consts::LOG10_2)
    }
}

impl PartialEq for ScaledNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScaledNumber {}

impl PartialOrd for ScaledNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScaledNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.mantissa == 0, other.mantissa == 0) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.exponent.cmp(&other.exponent).then(self.mantissa.cmp(&other.mantissa)),
        }
    }
}

impl fmt::Display for ScaledNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*2^{}", self.mantissa, self.exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u64_round_trips_small_values() {
        assert_eq!(ScaledNumber::from_u64(10).log10().unwrap(), 10f64.log10());
    }

    #[test]
    fn add_is_commutative_and_monotonic() {
        let a = ScaledNumber::from_u64(3);
        let b = ScaledNumber::from_u64(5);
        assert_eq!(a.add(b), b.add(a));
        assert!(a.add(b) > a);
        assert!(a.add(b) > b);
    }

    #[test]
    fn zero_is_additive_identity() {
        let a = ScaledNumber::from_u64(42);
        assert_eq!(a.add(ScaledNumber::ZERO), a);
    }

    #[test]
    fn mul_div_round_trips_approximately() {
        let a = ScaledNumber::from_u64(100);
        let b = ScaledNumber::from_u64(4);
        let product = a.mul(b);
        let back = product.div(b);
        let ratio = back.log10().unwrap() - a.log10().unwrap();
        assert!(ratio.abs() < 1e-6, "round-trip drifted by {ratio}");
    }

    #[test]
    fn ordering_spans_many_orders_of_magnitude() {
        let small = ScaledNumber::from_u64(1);
        let huge = small.mul(ScaledNumber { mantissa: 1 << 31, exponent: 10_000 });
        assert!(huge > small);
    }

    #[test]
    #[should_panic]
    fn reciprocal_of_zero_panics() {
        let _ = ScaledNumber::ZERO.reciprocal();
    }
}
