//! # Pantry Service
//!
//! Ties storage, live events and shopping list aggregation together. Every
//! successful write is followed by the matching notification to connected
//! clients.

use anyhow::Result;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use crate::db;
use crate::events::{ClientRegistry, PantryEvent, RecipeDeleted};
use crate::measurement_patterns::parse_quantity;
use crate::pantry_model::{
    Item, ItemUpdate, ItemWithRecipeCount, NewItem, NewRecipe, Recipe, RecipeWithIngredients,
};
use crate::shopping_list::{aggregate, ListItem};

/// Storage-backed pantry operations with change notifications
#[derive(Debug, Clone)]
pub struct PantryService {
    pool: PgPool,
    clients: Arc<ClientRegistry>,
    max_shopping_rows: usize,
}

impl PantryService {
    pub fn new(pool: PgPool, clients: Arc<ClientRegistry>, max_shopping_rows: usize) -> Self {
        Self {
            pool,
            clients,
            max_shopping_rows,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    /// Build the shopping list from the cooking recipes and unstocked items
    pub async fn shopping_list(&self) -> Result<Vec<ListItem>> {
        let rows = db::fetch_shopping_rows(&self.pool, self.max_shopping_rows).await?;
        match aggregate(&rows) {
            Ok(list) => {
                info!(rows = rows.len(), items = list.len(), "Shopping list built");
                Ok(list)
            }
            Err(e) => {
                error!(error = %e, "Failed to aggregate shopping list");
                Err(e.into())
            }
        }
    }

    pub async fn list_items(&self) -> Result<Vec<ItemWithRecipeCount>> {
        db::list_items_with_recipe_count(&self.pool).await
    }

    pub async fn list_recipes(&self) -> Result<Vec<RecipeWithIngredients>> {
        db::list_recipes(&self.pool).await
    }

    /// Create an item; existing names are left untouched and not announced
    pub async fn create_item(&self, item: NewItem) -> Result<Option<i32>> {
        let id = db::create_item(&self.pool, &item).await?;
        if id.is_some() {
            self.clients.emit(&PantryEvent::ItemAdded(item));
        }
        Ok(id)
    }

    pub async fn update_item(&self, update: ItemUpdate) -> Result<bool> {
        let updated = db::update_item(&self.pool, &update).await?;
        if updated {
            self.clients.emit(&PantryEvent::ItemUpdated(update));
        }
        Ok(updated)
    }

    /// Mark an item as present in the pantry or not
    pub async fn set_item_stocked(&self, item_id: i32, stocked: bool) -> Result<Option<Item>> {
        if !self.update_item(ItemUpdate::stocked(item_id, stocked)).await? {
            return Ok(None);
        }
        db::read_item(&self.pool, item_id).await
    }

    pub async fn delete_item(&self, item_id: i32) -> Result<bool> {
        let deleted = db::delete_item(&self.pool, item_id).await?;
        if deleted {
            self.clients.emit(&PantryEvent::ItemDeleted(item_id));
        }
        Ok(deleted)
    }

    /// Create or replace a recipe and announce which of the two happened
    pub async fn save_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let saved = db::upsert_recipe(&self.pool, recipe).await?;
        let event = if saved.created {
            PantryEvent::RecipeAdded(saved.recipe.clone())
        } else {
            PantryEvent::RecipeUpdated(saved.recipe.clone())
        };
        self.clients.emit(&event);
        Ok(saved.recipe)
    }

    /// Add an ingredient typed as text, e.g. `"1 1/2 cup"`, to a recipe
    pub async fn add_recipe_ingredient(
        &self,
        recipe_id: i32,
        item_id: i32,
        quantity: &str,
    ) -> Result<()> {
        let (qty, unit) = parse_quantity(quantity)?;
        db::add_recipe_ingredient(&self.pool, recipe_id, item_id, qty, unit).await?;
        if let Some(recipe) = db::read_recipe(&self.pool, recipe_id).await? {
            self.clients.emit(&PantryEvent::RecipeUpdated(recipe));
        }
        Ok(())
    }

    pub async fn set_recipe_cooking(&self, recipe_id: i32, is_cooking: bool) -> Result<Option<Recipe>> {
        let recipe = db::set_recipe_cooking(&self.pool, recipe_id, is_cooking).await?;
        if let Some(recipe) = &recipe {
            self.clients.emit(&PantryEvent::RecipeUpdated(recipe.clone()));
        }
        Ok(recipe)
    }

    pub async fn delete_recipe(&self, recipe_id: i32) -> Result<bool> {
        let deleted = db::delete_recipe(&self.pool, recipe_id).await?;
        if deleted {
            self.clients
                .emit(&PantryEvent::RecipeDeleted(RecipeDeleted { recipe_id }));
        }
        Ok(deleted)
    }
}
