use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY: &str = "MYR";
/// Every amount is stored in minor units (sen, cents). 100 minor units make up one major unit.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

//--------------------------------------        Money        ---------------------------------------------------------
/// An exact monetary amount, expressed as a count of currency minor units.
///
/// Aggregates (raised amounts, donor totals, averages) are sums of `Money` values, so they never pick up floating
/// point drift. Serialized as a plain integer.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MoneyConversionError(format!("{value} is too large to convert to Money")))
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses a decimal string in major units, e.g. "1000", "12.5" or "-3.75". At most two decimal places are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut parts = digits.split('.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| MoneyConversionError(format!("'{s}' has no whole part")))?
            .parse::<i64>()
            .map_err(|e| MoneyConversionError(format!("'{s}' is not a valid amount. {e}")))?;
        let minor = match parts.next() {
            None => 0,
            Some(frac) if frac.is_empty() || frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) => {
                return Err(MoneyConversionError(format!("'{s}' must have one or two decimal places")));
            },
            Some(frac) if frac.len() == 1 => frac.parse::<i64>().map(|v| v * 10).unwrap_or_default(),
            Some(frac) => frac.parse::<i64>().unwrap_or_default(),
        };
        if parts.next().is_some() {
            return Err(MoneyConversionError(format!("'{s}' has more than one decimal point")));
        }
        let value = major
            .checked_mul(MINOR_UNITS_PER_MAJOR)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(|| MoneyConversionError(format!("'{s}' is too large")))?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_major = MINOR_UNITS_PER_MAJOR.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / per_major, abs % per_major)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * MINOR_UNITS_PER_MAJOR)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Splits the amount evenly over `count` items, truncating toward zero. Returns `None` when `count` is zero.
    pub fn checked_div(&self, count: i64) -> Option<Self> {
        self.0.checked_div(count).map(Self)
    }
}
