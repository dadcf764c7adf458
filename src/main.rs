use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pantry::config::{AppConfig, LogFormat, DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_SHOPPING_ROWS};
use pantry::events::ClientRegistry;
use pantry::pantry_model::SeedData;
use pantry::pantry_service::PantryService;
use pantry::db;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pantry")]
#[command(about = "Pantry and recipe manager with a derived shopping list")]
#[command(version)]
struct Args {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Database pool size
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, env = "PANTRY_MAX_CONNECTIONS")]
    max_connections: u32,

    /// Upper bound on rows aggregated into one shopping list
    #[arg(long, default_value_t = DEFAULT_MAX_SHOPPING_ROWS, env = "PANTRY_MAX_SHOPPING_ROWS")]
    max_shopping_rows: usize,

    /// Log output format (pretty or json)
    #[arg(long, default_value = "pretty", env = "PANTRY_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    Init,
    /// Load items.json, recipes.json and recipe_items.json from a directory
    Seed { dir: PathBuf },
    /// Print the shopping list as JSON
    List,
    /// Mark a recipe as cooking
    Cook {
        recipe_id: i32,
        /// Stop cooking the recipe instead
        #[arg(long)]
        off: bool,
    },
    /// Mark an item as stocked
    Stock {
        item_id: i32,
        /// Mark the item as out of stock instead
        #[arg(long)]
        off: bool,
    },
    /// Add an ingredient to a recipe, e.g. `add-ingredient 1 4 "1 1/2 cup"`
    AddIngredient {
        recipe_id: i32,
        item_id: i32,
        quantity: String,
    },
}

impl Args {
    fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::new(&self.database_url);
        config.database.max_connections = self.max_connections;
        config.max_shopping_rows = self.max_shopping_rows;
        config.log_format = self.log_format;
        config
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = args.app_config();

    init_logging(config.log_format);
    info!("Starting pantry");

    let pool = db::connect_with_retry(&config.database).await?;
    db::init_database_schema(&pool).await?;

    let service = PantryService::new(pool, Arc::new(ClientRegistry::new()), config.max_shopping_rows);

    match args.command {
        Command::Init => info!("Schema ready"),
        Command::Seed { dir } => {
            let seed = SeedData::load_from_dir(&dir)?;
            db::seed_data(service.pool(), &seed).await?;
        }
        Command::List => {
            let list = service.shopping_list().await?;
            let json = serde_json::to_string_pretty(&list).context("Failed to serialize shopping list")?;
            println!("{json}");
        }
        Command::Cook { recipe_id, off } => {
            let recipe = service
                .set_recipe_cooking(recipe_id, !off)
                .await?
                .with_context(|| format!("Recipe {recipe_id} not found"))?;
            info!(recipe_id, is_cooking = recipe.is_cooking, "Recipe updated");
        }
        Command::Stock { item_id, off } => {
            let item = service
                .set_item_stocked(item_id, !off)
                .await?
                .with_context(|| format!("Item {item_id} not found"))?;
            info!(item_id, stocked = item.stocked, "Item updated");
        }
        Command::AddIngredient {
            recipe_id,
            item_id,
            quantity,
        } => {
            service
                .add_recipe_ingredient(recipe_id, item_id, &quantity)
                .await?;
            info!(recipe_id, item_id, quantity = %quantity, "Ingredient added");
        }
    }

    Ok(())
}
