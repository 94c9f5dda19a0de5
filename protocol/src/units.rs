//! # Amounts and Decimal Units
//!
//! An [`Amount`] is a `u128` in the smallest indivisible unit. For the native
//! currency that is wei: `1_000_000_000_000_000_000` means one whole unit.
//! The protocol never divides and never rounds. Decimal strings only exist
//! at the edges, for humans, and these helpers convert them exactly.
//!
//! `u128` rather than `u64` because 18-decimal currencies blow through
//! `u64::MAX` (~18.4 whole units) almost immediately.

use thiserror::Error;

use crate::config::NATIVE_DECIMALS;

/// A quantity in smallest units.
pub type Amount = u128;

/// Errors produced when parsing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    /// Nothing to parse.
    #[error("empty amount")]
    Empty,

    /// A character other than a digit or a single decimal point.
    #[error("invalid character {0:?} in amount")]
    InvalidCharacter(char),

    /// More fractional digits than the unit supports.
    #[error("too many decimal places: {found} given, at most {max} allowed")]
    TooManyDecimals {
        /// Fractional digits in the input.
        found: usize,
        /// Decimals supported by the unit.
        max: u8,
    },

    /// The value does not fit in an [`Amount`].
    #[error("amount overflows u128")]
    Overflow,
}

fn scale(decimals: u8) -> Result<Amount, UnitsError> {
    10u128
        .checked_pow(decimals as u32)
        .ok_or(UnitsError::Overflow)
}

/// Parses a decimal string (`"1.5"`, `"10"`, `".25"`) into smallest units.
///
/// Excess precision is an error rather than a silent truncation.
pub fn parse_units(input: &str, decimals: u8) -> Result<Amount, UnitsError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Empty);
    }
    if let Some(bad) = whole.chars().chain(frac.chars()).find(|c| !c.is_ascii_digit()) {
        return Err(UnitsError::InvalidCharacter(bad));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooManyDecimals {
            found: frac.len(),
            max: decimals,
        });
    }

    let unit = scale(decimals)?;
    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<Amount>().map_err(|_| UnitsError::Overflow)?
    };
    let frac_value = if frac.is_empty() {
        0
    } else {
        let padding = scale(decimals - frac.len() as u8)?;
        frac.parse::<Amount>()
            .map_err(|_| UnitsError::Overflow)?
            .checked_mul(padding)
            .ok_or(UnitsError::Overflow)?
    };

    whole_value
        .checked_mul(unit)
        .and_then(|w| w.checked_add(frac_value))
        .ok_or(UnitsError::Overflow)
}

/// Formats smallest units as a decimal string.
///
/// Trailing fractional zeros are dropped but at least one fractional digit
/// is kept: `10^18` with 18 decimals renders as `"1.0"`.
pub fn format_units(amount: Amount, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let unit = match scale(decimals) {
        Ok(unit) => unit,
        // More than 38 decimals: the whole part is always zero.
        Err(_) => return format!("0.{:0>width$}", amount, width = decimals as usize),
    };
    let whole = amount / unit;
    let frac = amount % unit;
    let frac_str = format!("{:0>width$}", frac, width = decimals as usize);
    let trimmed = frac_str.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, trimmed)
    }
}

/// Parses a decimal native-currency string into wei.
pub fn parse_ether(input: &str) -> Result<Amount, UnitsError> {
    parse_units(input, NATIVE_DECIMALS)
}

/// Formats wei as a decimal native-currency string.
pub fn format_ether(amount: Amount) -> String {
    format_units(amount, NATIVE_DECIMALS)
}
