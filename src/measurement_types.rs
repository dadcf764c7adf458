//! # Measurement Types Module
//!
//! This module defines the measurement units a recipe ingredient can be
//! recorded in, and the dimension each unit belongs to.
//!
//! Unit tokens are matched exactly and case-sensitively (`"Tbs"` is a
//! tablespoon, `"tbs"` is not a unit). The empty token means a whole,
//! unitless count such as "3 eggs".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::pantry_errors::PantryError;

/// Category of physically comparable units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Weight units, anchored on grams
    Mass,
    /// Volume units, anchored on millilitres
    Volume,
    /// Unitless whole counts
    None,
}

/// Measurement units accepted for recipe ingredients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MeasurementUnit {
    // Mass units
    #[serde(rename = "mcg")]
    Microgram,
    #[serde(rename = "mg")]
    Milligram,
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "lb")]
    Pound,

    // Volume units
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "kl")]
    Kiloliter,
    #[serde(rename = "tsp")]
    Teaspoon,
    #[serde(rename = "Tbs")]
    Tablespoon,
    #[serde(rename = "fl-oz")]
    FluidOunce,
    #[serde(rename = "cup")]
    Cup,
    #[serde(rename = "pnt")]
    Pint,
    #[serde(rename = "qt")]
    Quart,
    #[serde(rename = "gal")]
    Gallon,

    /// Whole count, written as the empty token
    #[default]
    #[serde(rename = "")]
    Whole,
}

impl MeasurementUnit {
    /// Every unit, mass units first, then volume units, then [`MeasurementUnit::Whole`]
    pub const ALL: [MeasurementUnit; 17] = [
        MeasurementUnit::Microgram,
        MeasurementUnit::Milligram,
        MeasurementUnit::Gram,
        MeasurementUnit::Kilogram,
        MeasurementUnit::Ounce,
        MeasurementUnit::Pound,
        MeasurementUnit::Milliliter,
        MeasurementUnit::Liter,
        MeasurementUnit::Kiloliter,
        MeasurementUnit::Teaspoon,
        MeasurementUnit::Tablespoon,
        MeasurementUnit::FluidOunce,
        MeasurementUnit::Cup,
        MeasurementUnit::Pint,
        MeasurementUnit::Quart,
        MeasurementUnit::Gallon,
        MeasurementUnit::Whole,
    ];

    /// The token this unit is stored and displayed as
    pub fn token(&self) -> &'static str {
        match self {
            MeasurementUnit::Microgram => "mcg",
            MeasurementUnit::Milligram => "mg",
            MeasurementUnit::Gram => "g",
            MeasurementUnit::Kilogram => "kg",
            MeasurementUnit::Ounce => "oz",
            MeasurementUnit::Pound => "lb",
            MeasurementUnit::Milliliter => "ml",
            MeasurementUnit::Liter => "l",
            MeasurementUnit::Kiloliter => "kl",
            MeasurementUnit::Teaspoon => "tsp",
            MeasurementUnit::Tablespoon => "Tbs",
            MeasurementUnit::FluidOunce => "fl-oz",
            MeasurementUnit::Cup => "cup",
            MeasurementUnit::Pint => "pnt",
            MeasurementUnit::Quart => "qt",
            MeasurementUnit::Gallon => "gal",
            MeasurementUnit::Whole => "",
        }
    }

    /// The dimension this unit measures
    pub fn dimension(&self) -> Dimension {
        if self.is_mass() {
            Dimension::Mass
        } else if self.is_volume() {
            Dimension::Volume
        } else {
            Dimension::None
        }
    }

    /// Check if this is a mass unit
    pub fn is_mass(&self) -> bool {
        matches!(
            self,
            MeasurementUnit::Microgram
                | MeasurementUnit::Milligram
                | MeasurementUnit::Gram
                | MeasurementUnit::Kilogram
                | MeasurementUnit::Ounce
                | MeasurementUnit::Pound
        )
    }

    /// Check if this is a volume unit
    pub fn is_volume(&self) -> bool {
        matches!(
            self,
            MeasurementUnit::Milliliter
                | MeasurementUnit::Liter
                | MeasurementUnit::Kiloliter
                | MeasurementUnit::Teaspoon
                | MeasurementUnit::Tablespoon
                | MeasurementUnit::FluidOunce
                | MeasurementUnit::Cup
                | MeasurementUnit::Pint
                | MeasurementUnit::Quart
                | MeasurementUnit::Gallon
        )
    }

    /// Check if this is the unitless whole count
    pub fn is_whole(&self) -> bool {
        matches!(self, MeasurementUnit::Whole)
    }
}

impl FromStr for MeasurementUnit {
    type Err = PantryError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        MeasurementUnit::ALL
            .iter()
            .copied()
            .find(|unit| unit.token() == token)
            .ok_or_else(|| PantryError::UnknownUnit(token.to_string()))
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Classify a unit token into its dimension
///
/// # Errors
///
/// Returns [`PantryError::UnknownUnit`] carrying the token when it is not a
/// mass token, a volume token or the empty string.
///
/// # Examples
///
/// ```rust
/// use pantry::measurement_types::{classify, Dimension};
///
/// assert_eq!(classify("kg")?, Dimension::Mass);
/// assert_eq!(classify("Tbs")?, Dimension::Volume);
/// assert_eq!(classify("")?, Dimension::None);
/// assert!(classify("furlong").is_err());
/// # Ok::<(), pantry::pantry_errors::PantryError>(())
/// ```
pub fn classify(unit: &str) -> Result<Dimension, PantryError> {
    unit.parse::<MeasurementUnit>().map(|u| u.dimension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mass_tokens() {
        for token in ["mcg", "mg", "g", "kg", "oz", "lb"] {
            assert_eq!(classify(token), Ok(Dimension::Mass), "token {token}");
        }
    }

    #[test]
    fn test_classify_volume_tokens() {
        for token in ["ml", "l", "kl", "tsp", "Tbs", "fl-oz", "cup", "pnt", "qt", "gal"] {
            assert_eq!(classify(token), Ok(Dimension::Volume), "token {token}");
        }
    }

    #[test]
    fn test_classify_empty_is_unitless() {
        assert_eq!(classify(""), Ok(Dimension::None));
    }

    #[test]
    fn test_classify_unknown_carries_token() {
        assert_eq!(
            classify("furlong"),
            Err(PantryError::UnknownUnit("furlong".to_string()))
        );
        // Matching is case-sensitive
        assert!(classify("TBS").is_err());
        assert!(classify("Cup").is_err());
        assert!(classify(" g").is_err());
    }

    #[test]
    fn test_token_round_trip() {
        for unit in MeasurementUnit::ALL {
            assert_eq!(unit.token().parse::<MeasurementUnit>(), Ok(unit));
        }
    }

    #[test]
    fn test_serde_uses_tokens() {
        let json = serde_json::to_string(&MeasurementUnit::FluidOunce).unwrap();
        assert_eq!(json, "\"fl-oz\"");
        let json = serde_json::to_string(&MeasurementUnit::Whole).unwrap();
        assert_eq!(json, "\"\"");

        let unit: MeasurementUnit = serde_json::from_str("\"Tbs\"").unwrap();
        assert_eq!(unit, MeasurementUnit::Tablespoon);
    }

    #[test]
    fn test_unit_properties() {
        assert!(MeasurementUnit::Cup.is_volume());
        assert!(!MeasurementUnit::Cup.is_mass());
        assert!(!MeasurementUnit::Cup.is_whole());

        assert!(MeasurementUnit::Pound.is_mass());
        assert!(!MeasurementUnit::Pound.is_volume());

        assert!(MeasurementUnit::Whole.is_whole());
        assert_eq!(MeasurementUnit::Whole.dimension(), Dimension::None);
        assert_eq!(MeasurementUnit::default(), MeasurementUnit::Whole);
    }
}
