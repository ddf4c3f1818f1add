use std::fmt;
use std::ops::RangeInclusive;

use serde_json::Value;

pub const PRICE_RANGE: RangeInclusive<i64> = 1..=30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceViolation {
    Missing,
    NotAnInteger,
    OutOfRange,
}

impl fmt::Display for PriceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceViolation::Missing => write!(f, "price must be provided"),
            PriceViolation::NotAnInteger => write!(f, "price must be an integer"),
            PriceViolation::OutOfRange => write!(
                f,
                "price must be between {} and {}",
                PRICE_RANGE.start(),
                PRICE_RANGE.end()
            ),
        }
    }
}

/// Checks a raw price from a request body.
///
/// JSON `null` counts as missing. Floats, strings and booleans are rejected even
/// when they look numeric.
pub fn validate_price(value: Option<&Value>) -> Result<i32, Vec<PriceViolation>> {
    let value = match value {
        None | Some(Value::Null) => return Err(vec![PriceViolation::Missing]),
        Some(value) => value,
    };

    match value.as_i64() {
        Some(price) if PRICE_RANGE.contains(&price) => {
            i32::try_from(price).map_err(|_| vec![PriceViolation::OutOfRange])
        }
        Some(_) => Err(vec![PriceViolation::OutOfRange]),
        // u64 above i64::MAX is still an integer, just a very large one
        None if value.is_u64() => Err(vec![PriceViolation::OutOfRange]),
        None => Err(vec![PriceViolation::NotAnInteger]),
    }
}
