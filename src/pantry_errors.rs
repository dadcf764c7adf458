//! # Pantry Error Types Module
//!
//! This module defines the error types shared by unit classification,
//! conversion, shopping list aggregation and the storage boundary.

use thiserror::Error;

/// Custom error types for pantry operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PantryError {
    /// A unit token that is neither a mass, volume nor unitless token
    #[error("Unknown unit: '{0}'")]
    UnknownUnit(String),

    /// Conversion between units of different dimensions
    #[error("Cannot convert from '{from}' to '{to}'")]
    IncompatibleUnits { from: String, to: String },

    /// Recipe portions must be strictly positive
    #[error("Portions must be greater than 0, got {0}")]
    InvalidPortions(i32),

    /// Quantity text or value that cannot be used
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Storage lookup that found nothing
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// Shopping row fetch exceeded the configured bound
    #[error("Shopping list exceeds {limit} rows")]
    TooManyRows { limit: usize },
}

/// Convenience Result type using [`PantryError`]
pub type Result<T> = std::result::Result<T, PantryError>;
