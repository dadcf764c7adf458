//! # Shopping List Tests
//!
//! End-to-end aggregation scenarios over rows shaped like the storage join.

use pantry::measurement_types::MeasurementUnit;
use pantry::shopping_list::{aggregate, scale, ItemRow};
use pantry::PantryError;

#[test]
fn test_mass_rows_summed_in_grams() {
    let rows = vec![
        ItemRow::ingredient(1, "flour", "grains", 2.0, "kg", 1),
        ItemRow::ingredient(1, "flour", "grains", 500.0, "g", 2),
    ];

    let list = aggregate(&rows).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, 1);
    assert_eq!(list[0].qty.common_unit, 3000.0);
    assert_eq!(list[0].qty.unit_type, MeasurementUnit::Gram);
    assert_eq!(list[0].qty.whole, 0.0);
}

#[test]
fn test_whole_count_scaled_by_portions() {
    let rows = vec![ItemRow::ingredient(2, "eggs", "fridge", 3.0, "", 2)];

    let list = aggregate(&rows).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].qty.whole, 6.0);
    assert_eq!(list[0].qty.common_unit, 0.0);
    assert_eq!(list[0].qty.unit_type, MeasurementUnit::Whole);
    assert_eq!(list[0].qty.unit_type.token(), "");
}

#[test]
fn test_plain_unstocked_item_is_bare() {
    let rows = vec![ItemRow::restock(3, "salt", "herbs and spices", false)];

    let list = aggregate(&rows).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, 3);
    assert!(!list[0].stocked);
    assert_eq!(list[0].qty.whole, 0.0);
    assert_eq!(list[0].qty.common_unit, 0.0);
    assert_eq!(list[0].qty.unit_type, MeasurementUnit::Whole);
    assert!(list[0].is_bare());
}

#[test]
fn test_mixed_dimensions_share_accumulator_and_last_unit_wins() {
    // 100 g, then 2 cups: both land in common_unit, the label follows the last row
    let rows = vec![
        ItemRow::ingredient(4, "sugar", "grains", 100.0, "g", 1),
        ItemRow::ingredient(4, "sugar", "grains", 2.0, "cup", 1),
    ];

    let list = aggregate(&rows).unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].qty.common_unit, 102.0);
    assert_eq!(list[0].qty.unit_type, MeasurementUnit::Cup);

    let reversed: Vec<ItemRow> = rows.into_iter().rev().collect();
    let list = aggregate(&reversed).unwrap();
    assert_eq!(list[0].qty.common_unit, 102.0);
    assert_eq!(list[0].qty.unit_type, MeasurementUnit::Gram);
}

#[test]
fn test_whole_row_keeps_measured_unit_label() {
    let rows = vec![
        ItemRow::ingredient(5, "butter", "fridge", 250.0, "g", 1),
        ItemRow::ingredient(5, "butter", "fridge", 1.0, "", 1),
    ];

    let list = aggregate(&rows).unwrap();

    assert_eq!(list[0].qty.whole, 1.0);
    assert_eq!(list[0].qty.common_unit, 250.0);
    assert_eq!(list[0].qty.unit_type, MeasurementUnit::Gram);
}

#[test]
fn test_unknown_unit_fails_whole_aggregation() {
    let rows = vec![
        ItemRow::ingredient(1, "flour", "grains", 2.0, "kg", 1),
        ItemRow::ingredient(6, "rope", "other", 1.0, "furlong", 1),
        ItemRow::ingredient(7, "eggs", "fridge", 2.0, "", 1),
    ];

    assert_eq!(
        aggregate(&rows),
        Err(PantryError::UnknownUnit("furlong".to_string()))
    );
}

#[test]
fn test_whole_grouping_is_order_independent() {
    let rows = vec![
        ItemRow::ingredient(8, "onions", "produce", 1.0, "", 2),
        ItemRow::ingredient(8, "onions", "produce", 0.5, "", 4),
        ItemRow::ingredient(8, "onions", "produce", 3.0, "", 1),
    ];
    let expected = 1.0 * 2.0 + 0.5 * 4.0 + 3.0;

    let forward = aggregate(&rows).unwrap();
    let backward: Vec<ItemRow> = rows.iter().rev().cloned().collect();
    let backward = aggregate(&backward).unwrap();

    assert_eq!(forward[0].qty.whole, expected);
    assert_eq!(backward[0].qty.whole, expected);
}

#[test]
fn test_scaling_law() {
    for q in [0.25, 1.5, 3.0, 12.5] {
        for (p1, p2) in [(1, 1), (2, 3), (4, 6)] {
            assert_eq!(
                scale(q, Some(p1)) + scale(q, Some(p2)),
                scale(q, Some(p1 + p2))
            );
        }
    }
}

#[test]
fn test_output_in_first_seen_order_with_first_row_passthrough() {
    let rows = vec![
        ItemRow::ingredient(10, "apples", "produce", 2.0, "", 1),
        ItemRow::restock(11, "bin bags", "other", false),
        ItemRow::ingredient(12, "milk", "fridge", 1.0, "cup", 2),
        ItemRow::ingredient(10, "apples (renamed)", "fruit", 1.0, "", 1).with_stocked(true),
    ];

    let list = aggregate(&rows).unwrap();

    let ids: Vec<i32> = list.iter().map(|item| item.id).collect();
    assert_eq!(ids, vec![10, 11, 12]);

    assert_eq!(list[0].name, "apples");
    assert_eq!(list[0].isle, "produce");
    assert!(!list[0].stocked);
    assert_eq!(list[0].qty.whole, 3.0);

    assert_eq!(list[2].qty.common_unit, 2.0);
    assert_eq!(list[2].qty.unit_type, MeasurementUnit::Cup);
}

#[test]
fn test_volume_rows_rounded_per_row() {
    // 1 tsp is about 0.02 cup and rounds up to a whole cup on its own
    let rows = vec![
        ItemRow::ingredient(13, "vanilla", "baking", 1.0, "tsp", 1),
        ItemRow::ingredient(13, "vanilla", "baking", 1.0, "tsp", 1),
    ];

    let list = aggregate(&rows).unwrap();

    assert_eq!(list[0].qty.common_unit, 2.0);
    assert_eq!(list[0].qty.unit_type, MeasurementUnit::Cup);
}

#[test]
fn test_empty_input() {
    assert!(aggregate(&[]).unwrap().is_empty());
}

#[test]
fn test_serialized_list() {
    let rows = vec![
        ItemRow::ingredient(1, "flour", "grains", 2.0, "kg", 1).with_vegan(true),
        ItemRow::restock(3, "salt", "herbs and spices", false),
    ];

    let list = aggregate(&rows).unwrap();
    let json = serde_json::to_value(&list).unwrap();

    assert_eq!(json[0]["qty"]["commonUnit"], 2000.0);
    assert_eq!(json[0]["qty"]["unitType"], "g");
    assert_eq!(json[0]["vegan"], true);
    assert_eq!(json[1]["qty"]["unitType"], "");
    assert_eq!(json[1]["qty"]["whole"], 0.0);
}
