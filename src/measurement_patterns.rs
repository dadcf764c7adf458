//! # Measurement Patterns Module
//!
//! This module contains the regex used to read quantities typed by a user
//! ("2 kg", "1 1/2 cup", "½ tsp", "3") into a number and a unit.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::measurement_types::MeasurementUnit;
use crate::pantry_errors::PantryError;

// Amount (mixed number, fraction, vulgar fraction, decimal or integer) followed by an optional unit token
pub const QUANTITY_PATTERN: &str = r"^\s*(?P<amount>\d+\s+\d+/\d+|\d+/\d+|\d+\s*[½⅓⅔¼¾⅛]|[½⅓⅔¼¾⅛]|\d*\.\d+|\d+)\s*(?P<unit>[A-Za-z][A-Za-z-]*)?\s*$";

lazy_static! {
    pub static ref QUANTITY_REGEX: Regex =
        Regex::new(QUANTITY_PATTERN).expect("Quantity pattern should be valid");
}

fn vulgar_fraction_value(c: char) -> Option<f64> {
    match c {
        '½' => Some(1.0 / 2.0),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '¼' => Some(1.0 / 4.0),
        '¾' => Some(3.0 / 4.0),
        '⅛' => Some(1.0 / 8.0),
        _ => None,
    }
}

fn parse_fraction(text: &str) -> Result<f64, PantryError> {
    let invalid = || PantryError::InvalidQuantity(text.to_string());
    let (numerator, denominator) = text.split_once('/').ok_or_else(invalid)?;
    let numerator: f64 = numerator.trim().parse().map_err(|_| invalid())?;
    let denominator: f64 = denominator.trim().parse().map_err(|_| invalid())?;
    if denominator == 0.0 {
        return Err(invalid());
    }
    Ok(numerator / denominator)
}

/// Parse the numeric part of a quantity
fn parse_amount(text: &str) -> Result<f64, PantryError> {
    let invalid = || PantryError::InvalidQuantity(text.to_string());

    if let Some(last) = text.chars().last().filter(|c| !c.is_ascii_digit()) {
        let fraction = vulgar_fraction_value(last).ok_or_else(invalid)?;
        let whole = text.trim_end_matches(last).trim();
        let whole: f64 = if whole.is_empty() {
            0.0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        return Ok(whole + fraction);
    }

    if text.contains('/') {
        return match text.split_once(char::is_whitespace) {
            Some((whole, fraction)) => {
                let whole: f64 = whole.parse().map_err(|_| invalid())?;
                Ok(whole + parse_fraction(fraction.trim())?)
            }
            None => parse_fraction(text),
        };
    }

    text.parse().map_err(|_| invalid())
}

/// Parse a quantity typed by a user into an amount and a unit
///
/// A missing unit means a whole count.
///
/// # Errors
///
/// Returns [`PantryError::InvalidQuantity`] when the text is not a quantity,
/// and [`PantryError::UnknownUnit`] when the unit token is not recognized.
///
/// # Examples
///
/// ```rust
/// use pantry::measurement_patterns::parse_quantity;
/// use pantry::measurement_types::MeasurementUnit;
///
/// assert_eq!(parse_quantity("1 1/2 cup")?, (1.5, MeasurementUnit::Cup));
/// assert_eq!(parse_quantity("500g")?, (500.0, MeasurementUnit::Gram));
/// assert_eq!(parse_quantity("3")?, (3.0, MeasurementUnit::Whole));
/// # Ok::<(), pantry::pantry_errors::PantryError>(())
/// ```
pub fn parse_quantity(input: &str) -> Result<(f64, MeasurementUnit), PantryError> {
    let captures = QUANTITY_REGEX
        .captures(input)
        .ok_or_else(|| PantryError::InvalidQuantity(input.trim().to_string()))?;

    let amount_text = captures
        .name("amount")
        .map(|m| m.as_str().trim())
        .unwrap_or_default();
    let amount = parse_amount(amount_text)?;

    let unit = match captures.name("unit") {
        Some(token) => token.as_str().parse::<MeasurementUnit>()?,
        None => MeasurementUnit::Whole,
    };

    debug!("Parsed quantity '{}' as {} '{}'", input.trim(), amount, unit);
    Ok((amount, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_and_decimal() {
        assert_eq!(parse_quantity("2 kg").unwrap(), (2.0, MeasurementUnit::Kilogram));
        assert_eq!(parse_quantity("0.5 l").unwrap(), (0.5, MeasurementUnit::Liter));
        assert_eq!(parse_quantity(".25 cup").unwrap(), (0.25, MeasurementUnit::Cup));
        assert_eq!(parse_quantity("  12  ").unwrap(), (12.0, MeasurementUnit::Whole));
    }

    #[test]
    fn test_unit_without_space() {
        assert_eq!(parse_quantity("500g").unwrap(), (500.0, MeasurementUnit::Gram));
        assert_eq!(parse_quantity("8fl-oz").unwrap(), (8.0, MeasurementUnit::FluidOunce));
    }

    #[test]
    fn test_fractions() {
        assert_eq!(parse_quantity("1/2 tsp").unwrap(), (0.5, MeasurementUnit::Teaspoon));
        assert_eq!(parse_quantity("2 1/4 Tbs").unwrap(), (2.25, MeasurementUnit::Tablespoon));
        assert_eq!(parse_quantity("½ cup").unwrap(), (0.5, MeasurementUnit::Cup));
        assert_eq!(parse_quantity("1½ cup").unwrap(), (1.5, MeasurementUnit::Cup));
        assert_eq!(parse_quantity("2 ¾ qt").unwrap(), (2.75, MeasurementUnit::Quart));
    }

    #[test]
    fn test_zero_denominator_rejected() {
        assert!(matches!(
            parse_quantity("1/0 cup"),
            Err(PantryError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_unknown_unit_rejected() {
        assert_eq!(
            parse_quantity("3 furlong"),
            Err(PantryError::UnknownUnit("furlong".to_string()))
        );
        // Tokens are case-sensitive
        assert!(parse_quantity("1 TBS").is_err());
    }

    #[test]
    fn test_not_a_quantity() {
        assert!(matches!(parse_quantity(""), Err(PantryError::InvalidQuantity(_))));
        assert!(matches!(parse_quantity("some salt"), Err(PantryError::InvalidQuantity(_))));
        assert!(matches!(parse_quantity("2 cups flour"), Err(PantryError::InvalidQuantity(_))));
    }
}
