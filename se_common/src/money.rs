use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const CURRENCY_CODE: &str = "USD";
pub const CURRENCY_CODE_LOWER: &str = "usd";

const CENTS_PER_DOLLAR: i64 = 100;

//--------------------------------------       Money       -----------------------------------------------------------
/// A monetary amount in minor units (cents).
///
/// All arithmetic on monetary values is exact, signed 64-bit integer arithmetic. Binary floating point never enters
/// the money path; the zero-sum invariant of the settlement engine depends on this.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
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

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl FromStr for Money {
    type Err = MoneyConversionError;

    /// Parses a decimal currency string, e.g. `"30"`, `"7.50"`, `"-0.05"`. At most two fraction digits are
    /// accepted; anything finer cannot be represented in cents and is rejected rather than rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(MoneyConversionError(format!("'{s}' is not a monetary amount")));
        }
        if frac.len() > 2 {
            return Err(MoneyConversionError(format!("'{s}' has sub-cent precision")));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(MoneyConversionError(format!("'{s}' is not a monetary amount")));
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| MoneyConversionError(format!("'{s}' is not a monetary amount")))?
        };
        let frac: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<2}");
            padded.parse().map_err(|_| MoneyConversionError(format!("'{s}' is not a monetary amount")))?
        };
        Ok(Self(sign * (whole * CENTS_PER_DOLLAR + frac)))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}${}.{:02}", cents / CENTS_PER_DOLLAR, cents % CENTS_PER_DOLLAR)
    }
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * CENTS_PER_DOLLAR)
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_whole_amounts() {
        assert_eq!("30".parse::<Money>().unwrap(), Money::from_dollars(30));
        assert_eq!("-12".parse::<Money>().unwrap(), Money::from_cents(-1200));
    }

    #[test]
    fn parse_fractional_amounts() {
        assert_eq!("7.50".parse::<Money>().unwrap(), Money::from_cents(750));
        assert_eq!("7.5".parse::<Money>().unwrap(), Money::from_cents(750));
        assert_eq!("0.05".parse::<Money>().unwrap(), Money::from_cents(5));
        assert_eq!("-.25".parse::<Money>().unwrap(), Money::from_cents(-25));
    }

    #[test]
    fn sub_cent_precision_is_rejected() {
        assert!("0.005".parse::<Money>().is_err());
        assert!("1.999".parse::<Money>().is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!("".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("ten".parse::<Money>().is_err());
    }

    #[test]
    fn display_formats_cents() {
        assert_eq!(Money::from_cents(1500).to_string(), "$15.00");
        assert_eq!(Money::from_cents(-750).to_string(), "-$7.50");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn arithmetic_is_exact() {
        let total: Money = [Money::from_cents(1), Money::from_cents(2), Money::from_cents(-3)].into_iter().sum();
        assert!(total.is_zero());
        assert_eq!(Money::from_dollars(10) - Money::from_cents(1), Money::from_cents(999));
        assert_eq!(-Money::from_cents(42), Money::from_cents(-42));
        assert_eq!(Money::from_cents(250) * 3, Money::from_cents(750));
    }
}
