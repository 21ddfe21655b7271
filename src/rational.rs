//! Exact fractions for durations and time-spine positions.
//!
//! A thin wrapper over `num_rational::Ratio<i128>`: values are always reduced
//! with a positive denominator, and comparison is exact. Constructors take
//! `i64` parts, so sums of event durations have plenty of headroom. Where a
//! sum can still grow without bound (time spines over a long sequence with
//! coprime denominators), use [`Rational::checked_add`], which reports
//! overflow as an error. Construction with a zero denominator and division
//! by zero are errors too.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

use num_rational::Ratio;
use num_traits::CheckedAdd;

use crate::error::{GuidoError, Result};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational(Ratio<i128>);

impl Rational {
    /// `num/den`, reduced. Fails if `den` is zero.
    pub fn new(num: i64, den: i64) -> Result<Self> {
        if den == 0 {
            return Err(GuidoError::structural(
                None,
                format!("'{}/0' has a zero denominator.", num),
            ));
        }
        Ok(Rational(Ratio::new(i128::from(num), i128::from(den))))
    }

    pub fn from_integer(n: i64) -> Self {
        Rational(Ratio::from_integer(i128::from(n)))
    }

    pub fn zero() -> Self {
        Rational::from_integer(0)
    }

    pub fn numer(&self) -> i128 {
        *self.0.numer()
    }

    pub fn denom(&self) -> i128 {
        *self.0.denom()
    }

    pub fn is_zero(&self) -> bool {
        self.numer() == 0
    }

    /// Floating approximation. Only duration normalization needs this.
    pub fn to_f64(&self) -> f64 {
        self.numer() as f64 / self.denom() as f64
    }

    /// `self + rhs`, or an error if the common denominator overflows.
    pub fn checked_add(self, rhs: Rational) -> Result<Rational> {
        self.0.checked_add(&rhs.0).map(Rational).ok_or_else(|| {
            GuidoError::structural(
                None,
                format!("Adding {} to {} overflows the exact time range.", rhs, self),
            )
        })
    }

    pub fn checked_div(self, rhs: Rational) -> Result<Rational> {
        if rhs.is_zero() {
            return Err(GuidoError::structural(
                None,
                format!("Cannot divide {} by zero.", self),
            ));
        }
        Ok(Rational(self.0 / rhs.0))
    }
}

impl Default for Rational {
    fn default() -> Self {
        Rational::zero()
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Rational::from_integer(n)
    }
}

impl Add for Rational {
    type Output = Rational;
    fn add(self, rhs: Rational) -> Rational {
        Rational(self.0 + rhs.0)
    }
}

impl AddAssign for Rational {
    fn add_assign(&mut self, rhs: Rational) {
        self.0 = self.0 + rhs.0;
    }
}

impl Sub for Rational {
    type Output = Rational;
    fn sub(self, rhs: Rational) -> Rational {
        Rational(self.0 - rhs.0)
    }
}

impl Mul for Rational {
    type Output = Rational;
    fn mul(self, rhs: Rational) -> Rational {
        Rational(self.0 * rhs.0)
    }
}

impl Sum for Rational {
    fn sum<I: Iterator<Item = Rational>>(iter: I) -> Rational {
        iter.fold(Rational::zero(), |acc, r| acc + r)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numer(), self.denom())
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rational({}/{})", self.numer(), self.denom())
    }
}
