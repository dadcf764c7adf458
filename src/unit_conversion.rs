//! # Unit Conversion Module
//!
//! Linear conversions between units of the same dimension. Mass factors are
//! expressed in grams and volume factors in millilitres (US customary
//! measures for the spoon, cup, pint, quart and gallon units).

use log::trace;

use crate::measurement_types::{Dimension, MeasurementUnit};
use crate::pantry_errors::PantryError;

/// Common unit every mass quantity is summed in
pub const MASS_TARGET: MeasurementUnit = MeasurementUnit::Gram;

/// Common unit every volume quantity is summed in
pub const VOLUME_TARGET: MeasurementUnit = MeasurementUnit::Cup;

/// Size of one `unit` in its dimension's anchor (grams or millilitres)
///
/// Returns `None` for [`MeasurementUnit::Whole`], which has no anchor.
pub fn anchor_factor(unit: MeasurementUnit) -> Option<f64> {
    let factor = match unit {
        MeasurementUnit::Microgram => 1e-6,
        MeasurementUnit::Milligram => 1e-3,
        MeasurementUnit::Gram => 1.0,
        MeasurementUnit::Kilogram => 1_000.0,
        MeasurementUnit::Ounce => 28.349523125,
        MeasurementUnit::Pound => 453.59237,

        MeasurementUnit::Milliliter => 1.0,
        MeasurementUnit::Liter => 1_000.0,
        MeasurementUnit::Kiloliter => 1_000_000.0,
        MeasurementUnit::Teaspoon => 4.92892159375,
        MeasurementUnit::Tablespoon => 14.78676478125,
        MeasurementUnit::FluidOunce => 29.5735295625,
        MeasurementUnit::Cup => 236.5882365,
        MeasurementUnit::Pint => 473.176473,
        MeasurementUnit::Quart => 946.352946,
        MeasurementUnit::Gallon => 3_785.411784,

        MeasurementUnit::Whole => return None,
    };
    Some(factor)
}

/// Convert a quantity between two typed units of the same dimension
///
/// # Errors
///
/// Returns [`PantryError::IncompatibleUnits`] when the units belong to
/// different dimensions or either of them is the unitless whole count.
pub fn convert_unit(
    qty: f64,
    from: MeasurementUnit,
    to: MeasurementUnit,
) -> Result<f64, PantryError> {
    let incompatible = || PantryError::IncompatibleUnits {
        from: from.token().to_string(),
        to: to.token().to_string(),
    };

    if from.dimension() != to.dimension() || from.dimension() == Dimension::None {
        return Err(incompatible());
    }
    if from == to {
        return Ok(qty);
    }

    let from_factor = anchor_factor(from).ok_or_else(incompatible)?;
    let to_factor = anchor_factor(to).ok_or_else(incompatible)?;
    let converted = qty * from_factor / to_factor;

    trace!("Converted {} {} to {} {}", qty, from, converted, to);
    Ok(converted)
}

/// Convert a quantity between two unit tokens of the same dimension
///
/// # Errors
///
/// Returns [`PantryError::UnknownUnit`] for an unrecognized token and
/// [`PantryError::IncompatibleUnits`] across dimensions.
///
/// # Examples
///
/// ```rust
/// use pantry::unit_conversion::convert;
///
/// assert_eq!(convert(2.0, "kg", "g")?, 2000.0);
/// assert_eq!(convert(16.0, "Tbs", "cup")?, 1.0);
/// assert!(convert(1.0, "g", "cup").is_err());
/// # Ok::<(), pantry::pantry_errors::PantryError>(())
/// ```
pub fn convert(qty: f64, from: &str, to: &str) -> Result<f64, PantryError> {
    convert_unit(qty, from.parse()?, to.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASS: [&str; 6] = ["mcg", "mg", "g", "kg", "oz", "lb"];
    const VOLUME: [&str; 10] = ["ml", "l", "kl", "tsp", "Tbs", "fl-oz", "cup", "pnt", "qt", "gal"];

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = 1e-9 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_mass_conversions() {
        assert_close(convert(2.0, "kg", "g").unwrap(), 2000.0);
        assert_close(convert(1.0, "lb", "oz").unwrap(), 16.0);
        assert_close(convert(1.0, "lb", "g").unwrap(), 453.59237);
        assert_close(convert(1500.0, "mg", "g").unwrap(), 1.5);
        assert_close(convert(1_000_000.0, "mcg", "g").unwrap(), 1.0);
    }

    #[test]
    fn test_volume_conversions() {
        assert_close(convert(3.0, "tsp", "Tbs").unwrap(), 1.0);
        assert_close(convert(8.0, "fl-oz", "cup").unwrap(), 1.0);
        assert_close(convert(2.0, "cup", "pnt").unwrap(), 1.0);
        assert_close(convert(4.0, "qt", "gal").unwrap(), 1.0);
        assert_close(convert(1.0, "l", "ml").unwrap(), 1000.0);
        assert_close(convert(1.0, "kl", "l").unwrap(), 1000.0);
        assert_close(convert(236.5882365, "ml", "cup").unwrap(), 1.0);
    }

    #[test]
    fn test_identity_conversion_is_exact() {
        for token in MASS.iter().chain(VOLUME.iter()) {
            assert_eq!(convert(3.0, token, token).unwrap(), 3.0);
        }
    }

    #[test]
    fn test_round_trip_mass() {
        for from in MASS {
            for to in MASS {
                let there = convert(12.5, from, to).unwrap();
                assert_close(convert(there, to, from).unwrap(), 12.5);
            }
        }
    }

    #[test]
    fn test_round_trip_volume() {
        for from in VOLUME {
            for to in VOLUME {
                let there = convert(0.75, from, to).unwrap();
                assert_close(convert(there, to, from).unwrap(), 0.75);
            }
        }
    }

    #[test]
    fn test_cross_dimension_rejected() {
        assert_eq!(
            convert(1.0, "g", "cup"),
            Err(PantryError::IncompatibleUnits {
                from: "g".to_string(),
                to: "cup".to_string()
            })
        );
        assert!(convert(1.0, "", "g").is_err());
        assert!(convert(1.0, "", "").is_err());
    }

    #[test]
    fn test_unknown_token_rejected() {
        assert_eq!(
            convert(1.0, "furlong", "g"),
            Err(PantryError::UnknownUnit("furlong".to_string()))
        );
    }

    #[test]
    fn test_whole_has_no_anchor() {
        assert_eq!(anchor_factor(MeasurementUnit::Whole), None);
        assert_eq!(anchor_factor(MASS_TARGET), Some(1.0));
        assert!(anchor_factor(VOLUME_TARGET).is_some());
    }
}
