//! Stack-style quantity formatting and parsing shared by goal dialogs and
//! breakdown tooltips.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseQuantityError {
    Empty,
    InvalidSuffix(char),
    InvalidNumber(String),
}

impl fmt::Display for ParseQuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "input string is empty"),
            Self::InvalidSuffix(suffix) => write!(f, "invalid suffix: {suffix}"),
            Self::InvalidNumber(raw) => write!(f, "invalid number format: {raw}"),
        }
    }
}

impl Error for ParseQuantityError {}

/// Formats a quantity into a short stack string, e.g. `100K`, `10M`.
pub fn format_quantity(quantity: u64) -> String {
    if quantity >= 10_000_000 {
        return format!("{}M", quantity / 1_000_000);
    }
    if quantity >= 100_000 {
        return format!("{}K", quantity / 1_000);
    }
    quantity.to_string()
}

/// Parses a quantity string with optional `k`/`m`/`b` suffix. Decimal
/// coefficients such as `1.5m` are accepted; results saturate at `u64::MAX`.
pub fn parse_quantity(text: &str) -> Result<u64, ParseQuantityError> {
    let trimmed = text.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(ParseQuantityError::Empty);
    }

    let last = trimmed.chars().next_back().unwrap_or('0');
    let (body, multiplier) = if last.is_alphabetic() {
        let multiplier = match last {
            'k' => 1_000_f64,
            'm' => 1_000_000_f64,
            'b' => 1_000_000_000_f64,
            other => return Err(ParseQuantityError::InvalidSuffix(other)),
        };
        (&trimmed[..trimmed.len() - last.len_utf8()], multiplier)
    } else {
        (trimmed.as_str(), 1_f64)
    };

    let value = body
        .parse::<f64>()
        .map_err(|_| ParseQuantityError::InvalidNumber(body.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ParseQuantityError::InvalidNumber(body.to_string()));
    }

    let scaled = value * multiplier;
    if scaled >= u64::MAX as f64 {
        return Ok(u64::MAX);
    }
    Ok(scaled as u64)
}
