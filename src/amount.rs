//! Exact conversion of human-entered token amounts into base units.
//!
//! Amounts are kept as decimal text until they are scaled, so `1.5` with six
//! decimals is `1_500_000` and never `1_499_999`. A fractional part finer than
//! the mint's decimals is an error rather than a silent truncation.

use crate::error::{Result, TokenPipelineError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale a decimal amount string by `10^decimals`.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<u64> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(TokenPipelineError::validation("Amount is empty"));
    }
    if amount.starts_with('-') {
        return Err(TokenPipelineError::validation(format!(
            "Amount must be positive, got {}",
            amount
        )));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid(amount));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(amount));
    }

    let scale = 10u64.checked_pow(decimals as u32).ok_or_else(|| {
        TokenPipelineError::validation(format!("Decimals {} overflow a u64 amount", decimals))
    })?;

    // Digits past `decimals` are only tolerated when they are all zero.
    let precision = decimals as usize;
    let (kept, dropped) = if fraction.len() > precision {
        fraction.split_at(precision)
    } else {
        (fraction, "")
    };
    if dropped.bytes().any(|b| b != b'0') {
        return Err(TokenPipelineError::validation(format!(
            "Amount {} has more than {} fractional digits",
            amount, decimals
        )));
    }

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| overflow(amount))?
    };

    let fraction_units = if kept.is_empty() {
        0
    } else {
        let padding = 10u64.pow((precision - kept.len()) as u32);
        kept.parse::<u64>()
            .map_err(|_| overflow(amount))?
            .checked_mul(padding)
            .ok_or_else(|| overflow(amount))?
    };

    let base_units = whole_units
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or_else(|| overflow(amount))?;

    if base_units == 0 {
        return Err(TokenPipelineError::validation(format!(
            "Amount must be positive, got {}",
            amount
        )));
    }

    Ok(base_units)
}

fn invalid(amount: &str) -> TokenPipelineError {
    TokenPipelineError::validation(format!("Invalid amount: {}", amount))
}

fn overflow(amount: &str) -> TokenPipelineError {
    TokenPipelineError::validation(format!("Amount {} does not fit in u64 base units", amount))
}

/// A human-entered amount, kept as decimal text.
///
/// Deserializes from either a string or a JSON number so form values and
/// bigint-as-string payloads are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TokenAmount(String);

impl TokenAmount {
    pub fn new(value: impl Into<String>) -> Self {
        TokenAmount(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_base_units(&self, decimals: u8) -> Result<u64> {
        to_base_units(&self.0, decimals)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenAmount {
    fn from(s: &str) -> Self {
        TokenAmount(s.to_string())
    }
}

impl From<u64> for TokenAmount {
    fn from(v: u64) -> Self {
        TokenAmount(v.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = TokenAmount;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or number representing an amount")
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(TokenAmount(v.to_string()))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(v)
                    .map(|v| TokenAmount(v.to_string()))
                    .map_err(|_| de::Error::custom("negative amount"))
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                if !v.is_finite() || v < 0.0 {
                    return Err(de::Error::custom("amount must be a finite, non-negative number"));
                }
                // f64 Display never uses exponent notation
                Ok(TokenAmount(v.to_string()))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(TokenAmount(v.to_string()))
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}
