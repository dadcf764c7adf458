//! # Shopping List Aggregation
//!
//! Turns the flat rows produced by the storage layer (one per ingredient of
//! a cooking recipe, one per unstocked non-ingredient item) into one line per
//! pantry item with summed quantities.
//!
//! ## Rules
//!
//! - Ingredient quantities are stored per portion and are scaled by the
//!   recipe's portions first.
//! - Unitless quantities are summed into `whole`.
//! - Mass quantities are converted to grams and volume quantities to cups,
//!   each converted row is rounded up, and the result is summed into
//!   `common_unit`.
//! - `unit_type` is the common unit of the most recently processed measured
//!   row. Mass and volume rows of the same item share the `common_unit`
//!   accumulator, and the last dimension seen names the unit.
//! - A single unknown unit fails the whole aggregation.
//!
//! ## Usage
//!
//! ```rust
//! use pantry::shopping_list::{aggregate, ItemRow};
//! use pantry::measurement_types::MeasurementUnit;
//!
//! let rows = vec![
//!     ItemRow::ingredient(1, "flour", "grains", 2.0, "kg", 1),
//!     ItemRow::ingredient(1, "flour", "grains", 500.0, "g", 2),
//! ];
//! let list = aggregate(&rows)?;
//!
//! assert_eq!(list.len(), 1);
//! assert_eq!(list[0].qty.common_unit, 3000.0);
//! assert_eq!(list[0].qty.unit_type, MeasurementUnit::Gram);
//! # Ok::<(), pantry::pantry_errors::PantryError>(())
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::measurement_types::{Dimension, MeasurementUnit};
use crate::pantry_errors::PantryError;
use crate::unit_conversion::{convert_unit, MASS_TARGET, VOLUME_TARGET};

/// Converted values within this distance below an integer are not rounded up
const CEIL_TOLERANCE: f64 = 1e-9;

/// One row of shopping list input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRow {
    pub item_id: i32,
    pub name: String,
    pub isle: String,
    pub stocked: bool,
    /// Legacy passthrough
    pub vegan: Option<bool>,
    /// Per-portion quantity, absent for items that are not part of a recipe
    pub raw_qty: Option<f64>,
    /// Unit token, absent together with `raw_qty`
    pub unit: Option<String>,
    /// Recipe portions, absent for items that are not part of a recipe
    pub portions: Option<i32>,
}

impl ItemRow {
    /// Row for a recipe ingredient
    pub fn ingredient(
        item_id: i32,
        name: &str,
        isle: &str,
        raw_qty: f64,
        unit: &str,
        portions: i32,
    ) -> Self {
        Self {
            item_id,
            name: name.to_string(),
            isle: isle.to_string(),
            stocked: false,
            vegan: None,
            raw_qty: Some(raw_qty),
            unit: Some(unit.to_string()),
            portions: Some(portions),
        }
    }

    /// Row for an item with no recipe context
    pub fn restock(item_id: i32, name: &str, isle: &str, stocked: bool) -> Self {
        Self {
            item_id,
            name: name.to_string(),
            isle: isle.to_string(),
            stocked,
            vegan: None,
            raw_qty: None,
            unit: None,
            portions: None,
        }
    }

    /// Set the stocked flag
    pub fn with_stocked(mut self, stocked: bool) -> Self {
        self.stocked = stocked;
        self
    }

    /// Set the vegan passthrough flag
    pub fn with_vegan(mut self, vegan: bool) -> Self {
        self.vegan = Some(vegan);
        self
    }
}

/// Aggregated quantities of one shopping list line
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQty {
    /// Sum of unitless quantities
    pub whole: f64,
    /// Sum of converted mass or volume quantities
    pub common_unit: f64,
    /// Unit of `common_unit`, [`MeasurementUnit::Whole`] when nothing was measured
    pub unit_type: MeasurementUnit,
}

/// One line of the shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: i32,
    pub name: String,
    pub isle: String,
    pub stocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vegan: Option<bool>,
    pub qty: ListQty,
}

impl ListItem {
    fn from_row(row: &ItemRow) -> Self {
        Self {
            id: row.item_id,
            name: row.name.clone(),
            isle: row.isle.clone(),
            stocked: row.stocked,
            vegan: row.vegan,
            qty: ListQty::default(),
        }
    }

    /// True when no quantity was accumulated, i.e. a plain restock signal
    pub fn is_bare(&self) -> bool {
        self.qty.whole == 0.0 && self.qty.common_unit == 0.0
    }
}

/// Target units the aggregator converts each dimension into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationConfig {
    /// Common unit for mass rows
    pub mass_target: MeasurementUnit,
    /// Common unit for volume rows
    pub volume_target: MeasurementUnit,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            mass_target: MASS_TARGET,
            volume_target: VOLUME_TARGET,
        }
    }
}

impl AggregationConfig {
    /// Common unit for a dimension, `None` for unitless counts
    pub fn target_for(&self, dimension: Dimension) -> Option<MeasurementUnit> {
        match dimension {
            Dimension::Mass => Some(self.mass_target),
            Dimension::Volume => Some(self.volume_target),
            Dimension::None => None,
        }
    }
}

/// Scale a per-portion quantity by a recipe's portions (1 when absent)
pub fn scale(raw_qty: f64, portions: Option<i32>) -> f64 {
    raw_qty * f64::from(portions.unwrap_or(1))
}

fn ceil_with_tolerance(value: f64) -> f64 {
    (value - CEIL_TOLERANCE).ceil()
}

/// Aggregate rows into shopping list lines with the default target units
///
/// # Errors
///
/// Returns [`PantryError::UnknownUnit`] if any row carries an unrecognized
/// unit token; no partial list is produced.
pub fn aggregate(rows: &[ItemRow]) -> Result<Vec<ListItem>, PantryError> {
    aggregate_with(rows, &AggregationConfig::default())
}

/// Aggregate rows into shopping list lines
///
/// Lines are returned in the order their item was first seen.
pub fn aggregate_with(
    rows: &[ItemRow],
    config: &AggregationConfig,
) -> Result<Vec<ListItem>, PantryError> {
    let mut items: Vec<ListItem> = Vec::new();
    let mut index: HashMap<i32, usize> = HashMap::new();

    for row in rows {
        let position = *index.entry(row.item_id).or_insert_with(|| {
            items.push(ListItem::from_row(row));
            items.len() - 1
        });
        let item = &mut items[position];

        let Some(raw_qty) = row.raw_qty else {
            continue;
        };
        let scaled = scale(raw_qty, row.portions);

        let unit: MeasurementUnit = row.unit.as_deref().unwrap_or_default().parse()?;
        match config.target_for(unit.dimension()) {
            None => item.qty.whole += scaled,
            Some(target) => {
                let converted = convert_unit(scaled, unit, target)?;
                item.qty.common_unit += ceil_with_tolerance(converted);
                item.qty.unit_type = target;
            }
        }

        debug!(
            "Item {} ({}): added {} {} -> whole={}, {}={}",
            item.id,
            item.name,
            scaled,
            unit,
            item.qty.whole,
            item.qty.unit_type,
            item.qty.common_unit
        );
    }

    info!(
        "Aggregated {} rows into {} shopping list items",
        rows.len(),
        items.len()
    );
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_defaults_to_one_portion() {
        assert_eq!(scale(2.5, None), 2.5);
        assert_eq!(scale(2.5, Some(4)), 10.0);
    }

    #[test]
    fn test_ceil_with_tolerance() {
        assert_eq!(ceil_with_tolerance(4.2267), 5.0);
        assert_eq!(ceil_with_tolerance(2.0), 2.0);
        assert_eq!(ceil_with_tolerance(1.0000000000000002), 1.0);
        assert_eq!(ceil_with_tolerance(0.0), 0.0);
    }

    #[test]
    fn test_each_row_rounded_up_before_summing() {
        // 1 l is 4.22 cups, rounded to 5 per row
        let rows = vec![
            ItemRow::ingredient(9, "milk", "fridge", 1.0, "l", 1),
            ItemRow::ingredient(9, "milk", "fridge", 1.0, "l", 1),
        ];
        let list = aggregate(&rows).unwrap();
        assert_eq!(list[0].qty.common_unit, 10.0);
        assert_eq!(list[0].qty.unit_type, MeasurementUnit::Cup);
    }

    #[test]
    fn test_exact_conversion_not_rounded_up() {
        let rows = vec![ItemRow::ingredient(4, "oil", "canned goods", 8.0, "Tbs", 2)];
        let list = aggregate(&rows).unwrap();
        assert_eq!(list[0].qty.common_unit, 1.0);
    }

    #[test]
    fn test_missing_unit_counts_as_whole() {
        let mut row = ItemRow::ingredient(5, "lemons", "produce", 2.0, "", 3);
        row.unit = None;
        let list = aggregate(&[row]).unwrap();
        assert_eq!(list[0].qty.whole, 6.0);
        assert_eq!(list[0].qty.unit_type, MeasurementUnit::Whole);
    }

    #[test]
    fn test_custom_targets() {
        let config = AggregationConfig {
            mass_target: MeasurementUnit::Kilogram,
            volume_target: MeasurementUnit::Milliliter,
        };
        let rows = vec![
            ItemRow::ingredient(1, "flour", "grains", 1500.0, "g", 1),
            ItemRow::ingredient(2, "water", "drinks", 1.0, "cup", 1),
        ];
        let list = aggregate_with(&rows, &config).unwrap();
        assert_eq!(list[0].qty.common_unit, 2.0);
        assert_eq!(list[0].qty.unit_type, MeasurementUnit::Kilogram);
        assert_eq!(list[1].qty.common_unit, 237.0);
        assert_eq!(list[1].qty.unit_type, MeasurementUnit::Milliliter);
    }

    #[test]
    fn test_json_wire_format() {
        let rows = vec![ItemRow::ingredient(2, "eggs", "fridge", 3.0, "", 2).with_vegan(false)];
        let list = aggregate(&rows).unwrap();
        let json = serde_json::to_value(&list[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 2,
                "name": "eggs",
                "isle": "fridge",
                "stocked": false,
                "vegan": false,
                "qty": { "whole": 6.0, "commonUnit": 0.0, "unitType": "" }
            })
        );
    }

    #[test]
    fn test_vegan_omitted_when_unknown() {
        let list = aggregate(&[ItemRow::restock(3, "salt", "herbs and spices", false)]).unwrap();
        let json = serde_json::to_value(&list[0]).unwrap();
        assert!(json.get("vegan").is_none());
        assert!(list[0].is_bare());
    }
}
