//! # Pantry
//!
//! Household pantry and recipe manager. Items are tracked in a PostgreSQL
//! pantry, recipes can be marked as cooking, and a shopping list is derived
//! by summing the ingredient quantities of every cooking recipe (converted to
//! grams or cups) plus the unstocked items that are not ingredients.

pub mod config;
pub mod db;
pub mod events;
pub mod measurement_patterns;
pub mod measurement_types;
pub mod pantry_errors;
pub mod pantry_model;
pub mod pantry_service;
pub mod shopping_list;
pub mod unit_conversion;

pub use pantry_errors::PantryError;
pub use shopping_list::{aggregate, ItemRow, ListItem};
