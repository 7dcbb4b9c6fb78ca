//! Exact vote arithmetic.
//!
//! Every vote weight is a [`Votes`] value backed by an arbitrary-precision
//! rational. A [`NumericModel`] decides whether products and quotients keep
//! full precision or are truncated to a fixed number of decimal places.
//! Truncation always rounds toward zero, so redistributed totals can never
//! exceed the ballots that produced them.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticError {
    #[error("division by zero: {numerator} / 0")]
    DivisionByZero { numerator: Votes },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid vote value: {0:?}")]
pub struct ParseVotesError(String);

/// A non-negative quantity of votes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Votes(BigRational);

impl Votes {
    pub fn zero() -> Votes {
        Votes(BigRational::zero())
    }

    pub fn one() -> Votes {
        Votes(BigRational::one())
    }

    pub fn from_integer(n: u64) -> Votes {
        Votes(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn from_ratio(numer: u64, denom: u64) -> Votes {
        Votes(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Smallest whole number of votes not below this value.
    pub fn ceil(&self) -> Votes {
        Votes(self.0.ceil())
    }

    /// Plain decimal rendering when the value has a finite decimal expansion.
    pub fn to_decimal_string(&self) -> Option<String> {
        let denom = self.0.denom().clone();
        let two = BigInt::from(2);
        let five = BigInt::from(5);

        let mut rest = denom.clone();
        let mut twos = 0usize;
        while (&rest % &two).is_zero() {
            rest /= &two;
            twos += 1;
        }
        let mut fives = 0usize;
        while (&rest % &five).is_zero() {
            rest /= &five;
            fives += 1;
        }
        if !rest.is_one() {
            return None;
        }

        let places = twos.max(fives);
        let scaled = self.0.numer() * num_traits::pow(BigInt::from(10), places) / denom;
        let mut digits = scaled.abs().to_string();
        if places > 0 {
            if digits.len() <= places {
                digits = format!("{}{}", "0".repeat(places + 1 - digits.len()), digits);
            }
            digits.insert(digits.len() - places, '.');
            let trimmed = digits.trim_end_matches('0').trim_end_matches('.');
            digits = trimmed.to_string();
        }
        if scaled.is_negative() {
            digits.insert(0, '-');
        }
        Some(digits)
    }
}

impl fmt::Display for Votes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_decimal_string() {
            Some(s) => f.write_str(&s),
            None => write!(f, "{}/{}", self.0.numer(), self.0.denom()),
        }
    }
}

impl FromStr for Votes {
    type Err = ParseVotesError;

    fn from_str(s: &str) -> Result<Votes, ParseVotesError> {
        let err = || ParseVotesError(s.to_string());
        let s = s.trim();
        if s.contains('/') {
            return BigRational::from_str(s).map(Votes).map_err(|_| err());
        }

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(err());
        }

        let digits = format!("{}{}", whole, frac);
        let numer = BigInt::from_str(&digits).map_err(|_| err())?;
        let denom = num_traits::pow(BigInt::from(10), frac.len());
        let value = BigRational::new(numer, denom);
        Ok(Votes(if negative { -value } else { value }))
    }
}

impl Add for Votes {
    type Output = Votes;

    fn add(self, rhs: Votes) -> Votes {
        Votes(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Votes> for &'a Votes {
    type Output = Votes;

    fn add(self, rhs: &'a Votes) -> Votes {
        Votes(&self.0 + &rhs.0)
    }
}

impl AddAssign<&Votes> for Votes {
    fn add_assign(&mut self, rhs: &Votes) {
        self.0 += &rhs.0;
    }
}

impl AddAssign for Votes {
    fn add_assign(&mut self, rhs: Votes) {
        self.0 += rhs.0;
    }
}

impl<'a> Sub<&'a Votes> for &'a Votes {
    type Output = Votes;

    fn sub(self, rhs: &'a Votes) -> Votes {
        Votes(&self.0 - &rhs.0)
    }
}

impl Sum for Votes {
    fn sum<I: Iterator<Item = Votes>>(iter: I) -> Votes {
        iter.fold(Votes::zero(), |acc, v| acc + v)
    }
}

impl<'a> Sum<&'a Votes> for Votes {
    fn sum<I: Iterator<Item = &'a Votes>>(iter: I) -> Votes {
        iter.fold(Votes::zero(), |mut acc, v| {
            acc += v;
            acc
        })
    }
}

/// How products and quotients of vote weights are rounded.
///
/// Addition, subtraction and comparison are always exact: sums of values with
/// at most `places` fractional digits never need rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericModel {
    /// Arbitrary-precision fractions; nothing is ever rounded.
    Exact,
    /// Fixed number of fractional decimal digits, truncated after each
    /// multiplication and division.
    FixedPoint { places: u32 },
}

impl NumericModel {
    /// `0` selects exact arithmetic, anything else a fixed-point model.
    pub fn from_decimal_places(places: u32) -> NumericModel {
        if places == 0 {
            NumericModel::Exact
        } else {
            NumericModel::FixedPoint { places }
        }
    }

    pub fn add(&self, a: &Votes, b: &Votes) -> Votes {
        a + b
    }

    pub fn sub(&self, a: &Votes, b: &Votes) -> Votes {
        a - b
    }

    pub fn compare(&self, a: &Votes, b: &Votes) -> Ordering {
        a.cmp(b)
    }

    pub fn mul(&self, a: &Votes, b: &Votes) -> Votes {
        self.truncate(Votes(&a.0 * &b.0))
    }

    pub fn div(&self, a: &Votes, b: &Votes) -> Result<Votes, ArithmeticError> {
        if b.is_zero() {
            return Err(ArithmeticError::DivisionByZero {
                numerator: a.clone(),
            });
        }
        Ok(self.truncate(Votes(&a.0 / &b.0)))
    }

    /// Drop digits beyond the model's precision, rounding toward zero.
    pub fn truncate(&self, value: Votes) -> Votes {
        match *self {
            NumericModel::Exact => value,
            NumericModel::FixedPoint { places } => {
                let scale = BigRational::from_integer(num_traits::pow(
                    BigInt::from(10),
                    places as usize,
                ));
                Votes((value.0 * &scale).trunc() / scale)
            }
        }
    }
}
