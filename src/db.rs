//! # Database Module
//!
//! PostgreSQL storage for items, recipes and recipe ingredients, and the join
//! query that feeds the shopping list.
//!
//! Recipe ingredient quantities are stored per portion: writing a recipe for
//! 4 portions that needs 2 cups of milk stores 0.5 cup.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::measurement_types::MeasurementUnit;
use crate::pantry_errors::PantryError;
use crate::pantry_model::{
    validate_quantity, Item, ItemUpdate, ItemWithRecipeCount, NewItem, NewRecipe, Recipe,
    RecipeWithIngredients, SeedData,
};
use crate::shopping_list::ItemRow;

/// Mime type reported for recipe images stored without one
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpg";

const RECIPE_COLUMNS: &str = "id, name, link, portions, is_cooking, img_mime_type, created_at";

#[derive(Debug, FromRow)]
struct ItemRecord {
    id: i32,
    name: String,
    isle: String,
    item_type: String,
    stocked: bool,
    vegan: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ItemRecord> for Item {
    type Error = anyhow::Error;

    fn try_from(record: ItemRecord) -> Result<Self> {
        Ok(Item {
            id: record.id,
            name: record.name,
            isle: record.isle,
            item_type: record.item_type.parse()?,
            stocked: record.stocked,
            vegan: record.vegan,
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ShoppingRowRecord {
    item_id: i32,
    name: String,
    isle: String,
    stocked: bool,
    vegan: bool,
    raw_qty: Option<f64>,
    unit: Option<String>,
    portions: Option<i32>,
}

impl From<ShoppingRowRecord> for ItemRow {
    fn from(record: ShoppingRowRecord) -> Self {
        ItemRow {
            item_id: record.item_id,
            name: record.name,
            isle: record.isle,
            stocked: record.stocked,
            vegan: Some(record.vegan),
            raw_qty: record.raw_qty,
            unit: record.unit,
            portions: record.portions,
        }
    }
}

/// Result of writing a recipe
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeUpsert {
    pub recipe: Recipe,
    /// True when a new row was inserted, false when an existing one was replaced
    pub created: bool,
}

/// Connect to PostgreSQL, retrying with backoff and jitter
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool> {
    let mut attempt = 0;
    loop {
        let result = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await;

        match result {
            Ok(pool) => {
                info!(attempt = attempt + 1, "Connected to database");
                return Ok(pool);
            }
            Err(e) if attempt < config.recovery.max_retries => {
                let delay = config.recovery.retry_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e).context("Failed to connect to database"),
        }
    }
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS items (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            isle TEXT NOT NULL,
            item_type TEXT NOT NULL,
            stocked BOOLEAN NOT NULL DEFAULT FALSE,
            vegan BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create items table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipes (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            link TEXT,
            portions INTEGER NOT NULL CHECK (portions > 0),
            is_cooking BOOLEAN NOT NULL DEFAULT FALSE,
            img BYTEA,
            img_mime_type TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipes table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipe_items (
            id SERIAL PRIMARY KEY,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            qty DOUBLE PRECISION NOT NULL,
            unit TEXT NOT NULL,
            CONSTRAINT recipe_item_unique UNIQUE (recipe_id, item_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create recipe_items table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recipe_items_item_id ON recipe_items(item_id)")
        .execute(pool)
        .await
        .context("Failed to create recipe_items index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Create a new item, returning `None` when an item with the same name exists
pub async fn create_item(pool: &PgPool, item: &NewItem) -> Result<Option<i32>> {
    let name = item.normalized_name();
    debug!(name = %name, "Creating item");

    let id: Option<i32> = sqlx::query_scalar(
        "INSERT INTO items (name, isle, item_type, stocked, vegan)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (name) DO NOTHING
         RETURNING id",
    )
    .bind(&name)
    .bind(&item.isle)
    .bind(item.item_type.as_str())
    .bind(item.stocked)
    .bind(item.vegan)
    .fetch_optional(pool)
    .await
    .context("Failed to insert item")?;

    match id {
        Some(id) => info!(item_id = id, name = %name, "Item created"),
        None => debug!(name = %name, "Item already exists"),
    }
    Ok(id)
}

/// Read an item by ID
pub async fn read_item(pool: &PgPool, item_id: i32) -> Result<Option<Item>> {
    let record = sqlx::query_as::<_, ItemRecord>(
        "SELECT id, name, isle, item_type, stocked, vegan, created_at FROM items WHERE id = $1",
    )
    .bind(item_id)
    .fetch_optional(pool)
    .await
    .context("Failed to read item")?;

    record.map(Item::try_from).transpose()
}

/// List all items by name with the number of recipes using each
pub async fn list_items_with_recipe_count(pool: &PgPool) -> Result<Vec<ItemWithRecipeCount>> {
    #[derive(FromRow)]
    struct Counted {
        #[sqlx(flatten)]
        item: ItemRecord,
        recipe_count: i64,
    }

    let rows = sqlx::query_as::<_, Counted>(
        "SELECT i.id, i.name, i.isle, i.item_type, i.stocked, i.vegan, i.created_at,
                COUNT(ri.item_id) AS recipe_count
         FROM items i
         LEFT JOIN recipe_items ri ON ri.item_id = i.id
         GROUP BY i.id
         ORDER BY i.name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list items")?;

    rows.into_iter()
        .map(|row| {
            Ok(ItemWithRecipeCount {
                item: Item::try_from(row.item)?,
                recipe_count: row.recipe_count,
            })
        })
        .collect()
}

/// Apply a partial update to an item; returns false when the item does not exist
pub async fn update_item(pool: &PgPool, update: &ItemUpdate) -> Result<bool> {
    if update.is_empty() {
        return Ok(read_item(pool, update.id).await?.is_some());
    }

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE items SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(name) = &update.name {
            set.push("name = ").push_bind_unseparated(name.trim().to_lowercase());
        }
        if let Some(isle) = &update.isle {
            set.push("isle = ").push_bind_unseparated(isle.clone());
        }
        if let Some(item_type) = update.item_type {
            set.push("item_type = ").push_bind_unseparated(item_type.as_str());
        }
        if let Some(stocked) = update.stocked {
            set.push("stocked = ").push_bind_unseparated(stocked);
        }
        if let Some(vegan) = update.vegan {
            set.push("vegan = ").push_bind_unseparated(vegan);
        }
    }
    builder.push(" WHERE id = ").push_bind(update.id);

    let rows_affected = builder
        .build()
        .execute(pool)
        .await
        .context("Failed to update item")?
        .rows_affected();

    debug!(item_id = update.id, rows_affected, "Item update applied");
    Ok(rows_affected > 0)
}

/// Delete an item and every recipe ingredient referring to it
pub async fn delete_item(pool: &PgPool, item_id: i32) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM recipe_items WHERE item_id = $1")
        .bind(item_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete recipe ingredients of item")?;

    let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(item_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete item")?
        .rows_affected();

    tx.commit().await.context("Failed to commit item deletion")?;

    info!(item_id, deleted = rows_affected > 0, "Item deletion");
    Ok(rows_affected > 0)
}

async fn sync_recipe_id_sequence(tx: &mut Transaction<'_, Postgres>) -> Result<()> {
    sqlx::query(
        "SELECT setval(pg_get_serial_sequence('recipes', 'id'),
                       GREATEST((SELECT COALESCE(MAX(id), 0) FROM recipes), 1))",
    )
    .execute(&mut **tx)
    .await
    .context("Failed to sync recipe id sequence")?;
    Ok(())
}

/// Create or replace a recipe together with its ingredients
///
/// Ingredient quantities are given for the whole recipe and stored per
/// portion. Replacing a recipe replaces its ingredients and image, and clears
/// its cooking flag.
pub async fn upsert_recipe(pool: &PgPool, recipe: &NewRecipe) -> Result<RecipeUpsert> {
    recipe.validate()?;

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let upsert_sql = format!(
        "INSERT INTO recipes (id, name, link, portions, is_cooking, img, img_mime_type)
         VALUES (COALESCE($1, nextval(pg_get_serial_sequence('recipes', 'id'))), $2, $3, $4, FALSE, $5, $6)
         ON CONFLICT (id) DO UPDATE SET
             name = EXCLUDED.name,
             link = EXCLUDED.link,
             portions = EXCLUDED.portions,
             is_cooking = EXCLUDED.is_cooking,
             img = EXCLUDED.img,
             img_mime_type = EXCLUDED.img_mime_type
         RETURNING {RECIPE_COLUMNS}, (xmax = 0) AS created"
    );

    #[derive(FromRow)]
    struct Upserted {
        #[sqlx(flatten)]
        recipe: Recipe,
        created: bool,
    }

    let upserted = sqlx::query_as::<_, Upserted>(&upsert_sql)
        .bind(recipe.id)
        .bind(recipe.name.trim().to_lowercase())
        .bind(&recipe.link)
        .bind(recipe.portions)
        .bind(&recipe.img)
        .bind(&recipe.img_mime_type)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to upsert recipe")?;

    if recipe.id.is_some() {
        sync_recipe_id_sequence(&mut tx).await?;
    }

    let recipe_id = upserted.recipe.id;

    sqlx::query("DELETE FROM recipe_items WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete existing recipe ingredients")?;

    for ingredient in &recipe.ingredients {
        sqlx::query(
            "INSERT INTO recipe_items (recipe_id, item_id, qty, unit) VALUES ($1, $2, $3, $4)",
        )
        .bind(recipe_id)
        .bind(ingredient.item_id)
        .bind(recipe.per_portion(ingredient.qty))
        .bind(&ingredient.unit)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert ingredient {} of recipe", ingredient.item_id))?;
    }

    tx.commit().await.context("Failed to commit recipe")?;

    info!(
        recipe_id,
        created = upserted.created,
        ingredients = recipe.ingredients.len(),
        "Recipe saved"
    );
    Ok(RecipeUpsert {
        recipe: upserted.recipe,
        created: upserted.created,
    })
}

/// Add or replace one ingredient of a recipe, quantity given for the whole recipe
pub async fn add_recipe_ingredient(
    pool: &PgPool,
    recipe_id: i32,
    item_id: i32,
    qty: f64,
    unit: MeasurementUnit,
) -> Result<()> {
    validate_quantity(qty)?;

    let portions: Option<i32> = sqlx::query_scalar("SELECT portions FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read recipe portions")?;
    let portions = portions.ok_or(PantryError::NotFound {
        entity: "recipe",
        id: recipe_id,
    })?;

    sqlx::query(
        "INSERT INTO recipe_items (recipe_id, item_id, qty, unit) VALUES ($1, $2, $3, $4)
         ON CONFLICT (recipe_id, item_id) DO UPDATE SET qty = EXCLUDED.qty, unit = EXCLUDED.unit",
    )
    .bind(recipe_id)
    .bind(item_id)
    .bind(qty / f64::from(portions))
    .bind(unit.token())
    .execute(pool)
    .await
    .context("Failed to save recipe ingredient")?;

    debug!(recipe_id, item_id, qty, unit = %unit, "Recipe ingredient saved");
    Ok(())
}

/// Read a recipe by ID
pub async fn read_recipe(pool: &PgPool, recipe_id: i32) -> Result<Option<Recipe>> {
    sqlx::query_as::<_, Recipe>(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"))
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .context("Failed to read recipe")
}

/// Mark a recipe as cooking or not, returning the updated recipe
pub async fn set_recipe_cooking(
    pool: &PgPool,
    recipe_id: i32,
    is_cooking: bool,
) -> Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(&format!(
        "UPDATE recipes SET is_cooking = $1 WHERE id = $2 RETURNING {RECIPE_COLUMNS}"
    ))
    .bind(is_cooking)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await
    .context("Failed to update recipe cooking flag")?;

    debug!(recipe_id, is_cooking, found = recipe.is_some(), "Recipe cooking flag");
    Ok(recipe)
}

/// Delete a recipe and its ingredients
pub async fn delete_recipe(pool: &PgPool, recipe_id: i32) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM recipe_items WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete recipe ingredients")?;

    let rows_affected = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete recipe")?
        .rows_affected();

    tx.commit().await.context("Failed to commit recipe deletion")?;

    info!(recipe_id, deleted = rows_affected > 0, "Recipe deletion");
    Ok(rows_affected > 0)
}

/// List all recipes with the names of their ingredients
pub async fn list_recipes(pool: &PgPool) -> Result<Vec<RecipeWithIngredients>> {
    let recipes = sqlx::query_as::<_, Recipe>(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY name, id"
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list recipes")?;

    let names: Vec<(i32, String)> = sqlx::query_as(
        "SELECT ri.recipe_id, i.name
         FROM recipe_items ri
         JOIN items i ON i.id = ri.item_id
         ORDER BY i.name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list recipe ingredients")?;

    let mut by_recipe: HashMap<i32, Vec<String>> = HashMap::new();
    for (recipe_id, name) in names {
        by_recipe.entry(recipe_id).or_default().push(name);
    }

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeWithIngredients {
            ingredients: by_recipe.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

/// Read a recipe's image and its mime type
pub async fn get_recipe_image(pool: &PgPool, recipe_id: i32) -> Result<Option<(Vec<u8>, String)>> {
    let row: Option<(Option<Vec<u8>>, Option<String>)> =
        sqlx::query_as("SELECT img, img_mime_type FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await
            .context("Failed to read recipe image")?;

    Ok(row.and_then(|(img, mime_type)| {
        img.map(|bytes| {
            (
                bytes,
                mime_type.unwrap_or_else(|| DEFAULT_IMAGE_MIME_TYPE.to_string()),
            )
        })
    }))
}

/// Insert seed items, recipes and recipe ingredients, skipping existing rows
pub async fn seed_data(pool: &PgPool, seed: &SeedData) -> Result<()> {
    seed.validate()?;
    info!(
        items = seed.items.len(),
        recipes = seed.recipes.len(),
        recipe_items = seed.recipe_items.len(),
        "Seeding database"
    );

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for item in &seed.items {
        sqlx::query(
            "INSERT INTO items (name, isle, item_type, stocked, vegan)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(item.normalized_name())
        .bind(&item.isle)
        .bind(item.item_type.as_str())
        .bind(item.stocked)
        .bind(item.vegan)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to seed item {}", item.name))?;
    }

    for recipe in &seed.recipes {
        sqlx::query(
            "INSERT INTO recipes (id, name, link, portions, is_cooking)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(recipe.id)
        .bind(recipe.name.trim().to_lowercase())
        .bind(&recipe.link)
        .bind(recipe.portions)
        .bind(recipe.is_cooking)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to seed recipe {}", recipe.name))?;
    }
    sync_recipe_id_sequence(&mut tx).await?;

    for row in &seed.recipe_items {
        sqlx::query(
            "INSERT INTO recipe_items (recipe_id, item_id, qty, unit)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (recipe_id, item_id) DO NOTHING",
        )
        .bind(row.recipe_id)
        .bind(row.item_id)
        .bind(row.qty)
        .bind(&row.unit)
        .execute(&mut *tx)
        .await
        .with_context(|| {
            format!(
                "Failed to seed ingredient {} of recipe {}",
                row.item_id, row.recipe_id
            )
        })?;
    }

    tx.commit().await.context("Failed to commit seed data")?;
    info!("Database seeded successfully");
    Ok(())
}

/// Fetch the rows the shopping list is aggregated from
///
/// Returns one row per ingredient of every cooking recipe, and one row
/// without quantity per unstocked item that is not an ingredient, ordered by
/// item name.
///
/// # Errors
///
/// Fails with [`PantryError::TooManyRows`] instead of truncating when more
/// than `max_rows` rows match.
pub async fn fetch_shopping_rows(pool: &PgPool, max_rows: usize) -> Result<Vec<ItemRow>> {
    let limit = i64::try_from(max_rows.saturating_add(1)).unwrap_or(i64::MAX);

    let records = sqlx::query_as::<_, ShoppingRowRecord>(
        "SELECT i.id AS item_id, i.name, i.isle, i.stocked, i.vegan,
                ri.qty AS raw_qty, ri.unit AS unit, r.portions AS portions
         FROM recipe_items ri
         JOIN recipes r ON r.id = ri.recipe_id
         JOIN items i ON i.id = ri.item_id
         WHERE r.is_cooking
         UNION ALL
         SELECT i.id, i.name, i.isle, i.stocked, i.vegan,
                NULL::DOUBLE PRECISION, NULL::TEXT, NULL::INTEGER
         FROM items i
         WHERE NOT i.stocked AND i.item_type <> 'ingredient'
         ORDER BY name, item_id
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch shopping rows")?;

    if records.len() > max_rows {
        return Err(PantryError::TooManyRows { limit: max_rows }.into());
    }

    debug!(rows = records.len(), "Fetched shopping rows");
    Ok(records.into_iter().map(ItemRow::from).collect())
}
