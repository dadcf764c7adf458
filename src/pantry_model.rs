//! # Pantry Data Model
//!
//! Items kept in the pantry, recipes built from them, and the payloads used
//! to create, update and seed them.
//!
//! ## Core Concepts
//!
//! - **Item**: something the household buys (an ingredient, a snack, a drink...)
//! - **Recipe**: a dish with a number of portions that can be marked as cooking
//! - **Recipe ingredient**: an item used by a recipe, stored per portion
//!
//! ## Usage
//!
//! ```rust
//! use pantry::pantry_model::{ItemType, NewItem, NewRecipe};
//!
//! let flour = NewItem::new("Flour", "grains", ItemType::Ingredient);
//! let bread = NewRecipe::new("bread", 2).with_ingredient(1, 500.0, "g");
//!
//! assert_eq!(flour.normalized_name(), "flour");
//! assert_eq!(bread.ingredients.len(), 1);
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::measurement_types::MeasurementUnit;
use crate::pantry_errors::PantryError;

/// Kind of pantry item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemType {
    Ingredient,
    Snack,
    NonPerishable,
    Drink,
    Other,
}

impl ItemType {
    /// Text stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Ingredient => "ingredient",
            ItemType::Snack => "snack",
            ItemType::NonPerishable => "non-perishable",
            ItemType::Drink => "drink",
            ItemType::Other => "other",
        }
    }
}

impl FromStr for ItemType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ingredient" => Ok(ItemType::Ingredient),
            "snack" => Ok(ItemType::Snack),
            "non-perishable" => Ok(ItemType::NonPerishable),
            "drink" => Ok(ItemType::Drink),
            "other" => Ok(ItemType::Other),
            other => Err(anyhow::anyhow!("Unknown item type: {}", other)),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored pantry item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub isle: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub stocked: bool,
    pub vegan: bool,
    pub created_at: DateTime<Utc>,
}

/// A stored item with the number of recipes using it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemWithRecipeCount {
    #[serde(flatten)]
    pub item: Item,
    pub recipe_count: i64,
}

/// Payload for creating an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub isle: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub stocked: bool,
    #[serde(default)]
    pub vegan: bool,
}

impl NewItem {
    /// Create an unstocked, non-vegan item
    pub fn new(name: &str, isle: &str, item_type: ItemType) -> Self {
        Self {
            name: name.to_string(),
            isle: isle.to_string(),
            item_type,
            stocked: false,
            vegan: false,
        }
    }

    /// Set the stocked flag
    pub fn with_stocked(mut self, stocked: bool) -> Self {
        self.stocked = stocked;
        self
    }

    /// Set the vegan flag
    pub fn with_vegan(mut self, vegan: bool) -> Self {
        self.vegan = vegan;
        self
    }

    /// Item names are stored trimmed and lowercased
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

/// Partial update of an item; `None` fields are left unchanged
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isle: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stocked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vegan: Option<bool>,
}

impl ItemUpdate {
    /// Update only the stocked flag of an item
    pub fn stocked(id: i32, stocked: bool) -> Self {
        Self {
            id,
            stocked: Some(stocked),
            ..Default::default()
        }
    }

    /// True when the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.isle.is_none()
            && self.item_type.is_none()
            && self.stocked.is_none()
            && self.vegan.is_none()
    }
}

/// A stored recipe, without its image bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i32,
    pub name: String,
    pub link: Option<String>,
    pub portions: i32,
    pub is_cooking: bool,
    pub img_mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recipe with the names of its ingredients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeWithIngredients {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<String>,
}

/// An ingredient line of a recipe payload, quantity for the whole recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecipeIngredient {
    pub item_id: i32,
    pub qty: f64,
    pub unit: String,
}

/// Payload for creating or replacing a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    /// Existing recipe to replace, a new one is created when absent
    #[serde(default)]
    pub id: Option<i32>,
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
    pub portions: i32,
    #[serde(default, skip_serializing)]
    pub img: Option<Vec<u8>>,
    #[serde(default)]
    pub img_mime_type: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<NewRecipeIngredient>,
}

impl NewRecipe {
    /// Create a recipe payload without ingredients
    pub fn new(name: &str, portions: i32) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            link: None,
            portions,
            img: None,
            img_mime_type: None,
            ingredients: Vec::new(),
        }
    }

    /// Replace an existing recipe
    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the source link
    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    /// Attach an image
    pub fn with_image(mut self, img: Vec<u8>, mime_type: &str) -> Self {
        self.img = Some(img);
        self.img_mime_type = Some(mime_type.to_string());
        self
    }

    /// Add an ingredient with its quantity for the whole recipe
    pub fn with_ingredient(mut self, item_id: i32, qty: f64, unit: &str) -> Self {
        self.ingredients.push(NewRecipeIngredient {
            item_id,
            qty,
            unit: unit.to_string(),
        });
        self
    }

    /// Check portions, quantities and unit tokens before anything is written
    pub fn validate(&self) -> Result<(), PantryError> {
        if self.portions <= 0 {
            return Err(PantryError::InvalidPortions(self.portions));
        }
        for ingredient in &self.ingredients {
            validate_quantity(ingredient.qty)?;
            ingredient.unit.parse::<MeasurementUnit>()?;
        }
        Ok(())
    }

    /// Quantity of an ingredient for a single portion
    pub fn per_portion(&self, qty: f64) -> f64 {
        qty / f64::from(self.portions)
    }
}

/// Quantities must be finite and not negative
pub fn validate_quantity(qty: f64) -> Result<(), PantryError> {
    if !qty.is_finite() || qty < 0.0 {
        return Err(PantryError::InvalidQuantity(qty.to_string()));
    }
    Ok(())
}

/// A recipe row as found in `recipes.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRecipe {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
    pub portions: i32,
    #[serde(default)]
    pub is_cooking: bool,
}

/// A recipe ingredient row as found in `recipe_items.json`, already per portion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRecipeItem {
    pub recipe_id: i32,
    pub item_id: i32,
    pub qty: f64,
    pub unit: String,
}

/// Initial pantry content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeedData {
    pub items: Vec<NewItem>,
    pub recipes: Vec<SeedRecipe>,
    pub recipe_items: Vec<SeedRecipeItem>,
}

impl SeedData {
    /// Load `items.json`, `recipes.json` and `recipe_items.json` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Ok(Self {
            items: read_json(&dir.join("items.json"))?,
            recipes: read_json(&dir.join("recipes.json"))?,
            recipe_items: read_json(&dir.join("recipe_items.json"))?,
        })
    }

    /// Reject seed ingredient rows with unknown units
    pub fn validate(&self) -> Result<(), PantryError> {
        for recipe in &self.recipes {
            if recipe.portions <= 0 {
                return Err(PantryError::InvalidPortions(recipe.portions));
            }
        }
        for row in &self.recipe_items {
            validate_quantity(row.qty)?;
            row.unit.parse::<MeasurementUnit>()?;
        }
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file {}", path.display()))
}
