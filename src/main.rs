//! Crafting Calculator
//!
//! Command-line front-end over the recipe database and resolver.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;

use craft_calculator::models::{Classification, MaterialGroup, Recipe, RecipeStore, Resolution};
use craft_calculator::{calculator, db, import};

#[derive(Parser)]
#[command(name = "craft-calculator")]
#[command(about = "Crafting recipe calculator: resolves the full material tree for an item")]
struct Cli {
    /// Path to the SQLite recipe database
    #[arg(short, long, default_value = "recipes.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Import recipes from a JSON document or a directory of documents
    Import {
        /// Document or directory to import
        path: PathBuf,

        /// Replace all existing recipes with the imported ones
        #[arg(long)]
        clear: bool,
    },

    /// Export all recipes as a JSON document
    Export {
        /// Output document
        path: PathBuf,
    },

    /// Add or replace a recipe
    Add {
        /// Recipe name
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Crafting station (defaults to "Manual Crafting")
        #[arg(long)]
        crafted_in: Option<String>,

        /// Classification (e.g. "Weapons", "Semi-finished Product")
        #[arg(long)]
        classification: Option<Classification>,

        /// Required material, e.g. "Iron Ingot x 3"
        #[arg(short, long = "require", value_name = "SPEC")]
        required: Vec<String>,

        /// Extra optional material, e.g. "Salt x 1"
        #[arg(short, long = "optional", value_name = "SPEC")]
        optional: Vec<String>,
    },

    /// List recipes, optionally filtered
    List {
        /// Case-insensitive name search
        #[arg(short, long, default_value = "")]
        search: String,

        /// Only show recipes of this classification
        #[arg(short, long)]
        classification: Option<Classification>,
    },

    /// Show details for a specific recipe
    Show {
        /// Recipe name
        name: String,
    },

    /// Calculate the materials needed to craft an item
    Calc {
        /// Item to craft (e.g., "Iron Sword")
        item: String,

        /// Number of items to craft
        #[arg(short, long, default_value = "1", allow_negative_numbers = true)]
        quantity: i64,

        /// Show detailed material tree
        #[arg(short, long)]
        verbose: bool,
    },

    /// Load sample recipes for testing
    LoadSample,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open database {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import { path, clear } => {
            let (store, stats) = import::import_path(&path)?;
            if clear {
                println!("Replacing existing recipes...");
                db::replace_store(&conn, &store)?;
            } else {
                db::save_store(&conn, &store)?;
            }
            println!("{}", stats);
        }

        Commands::Export { path } => {
            let store = db::load_store(&conn)?;
            import::write_document(&store, &path)?;
            println!("Exported {} recipes to {}", store.len(), path.display());
        }

        Commands::Add {
            name,
            description,
            crafted_in,
            classification,
            required,
            optional,
        } => {
            let mut recipe = Recipe {
                description,
                crafted_in,
                classification,
                ..Recipe::default()
            };
            for spec in &required {
                let (material, amount) = import::parse_material_spec(spec)?;
                recipe = recipe.require(&material, amount);
            }
            for spec in &optional {
                let (material, amount) = import::parse_material_spec(spec)?;
                recipe = recipe.optional(&material, amount);
            }

            let mut store = db::load_store(&conn)?;
            store.add_recipe(&name, recipe)?;
            let name = name.trim();
            if let Some(recipe) = store.get(name) {
                db::upsert_recipe(&conn, name, recipe)?;
            }
            info!(name, "recipe added");
            println!("Recipe added successfully!");
        }

        Commands::List {
            search,
            classification,
        } => {
            let store = db::load_store(&conn)?;
            let names = store.filter(&search, classification);
            if store.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else if names.is_empty() {
                println!("No matching recipes.");
            } else {
                println!("{:<30} {:<20} {:<20}", "Recipe", "Crafted in", "Classification");
                println!("{}", "-".repeat(70));
                for name in names {
                    if let Some(recipe) = store.get(name) {
                        let class = recipe
                            .classification
                            .map_or("", Classification::display_name);
                        println!("{:<30} {:<20} {:<20}", name, recipe.crafted_in(), class);
                    }
                }
            }
        }

        Commands::Show { name } => {
            let store = db::load_store(&conn)?;
            if let Some(recipe) = store.get(&name) {
                println!("Recipe: {}", name);
                println!("  Description: {}", recipe.description());
                println!("  Crafted in: {}", recipe.crafted_in());
                if let Some(class) = recipe.classification {
                    println!("  Classification: {}", class);
                }
                for group in MaterialGroup::ALL {
                    if let Some(materials) = recipe.materials(group) {
                        println!("  {}:", group.heading());
                        for (material, amount) in materials {
                            println!("    {} x {}", material, amount);
                        }
                    }
                }
            } else {
                println!("Recipe '{}' not found", name);
            }
        }

        Commands::Calc {
            item,
            quantity,
            verbose,
        } => {
            let store = db::load_store(&conn)?;
            match calculator::resolve(&store, item.trim(), quantity)? {
                Resolution::NotFound { .. } => println!("Recipe not found!"),
                Resolution::Found(result) => {
                    if verbose {
                        println!("Material tree:\n");
                        println!("{}", calculator::format_tree(&result.tree, 0));
                    }
                    println!("{}", calculator::summarize(&result));
                }
            }
        }

        Commands::LoadSample => {
            let store = sample_store()?;
            let count = db::replace_store(&conn, &store)?;
            println!("Loaded {} sample recipes", count);
        }
    }

    Ok(())
}

/// Sample recipes for testing without a recipe document
fn sample_store() -> Result<RecipeStore> {
    let mut store = RecipeStore::new();

    store.add_recipe(
        "Iron Ingot",
        Recipe::new("Smelting Furnace")
            .with_description("Smelted from iron ore")
            .with_classification(Classification::SemiFinishedProduct)
            .require("Iron Ore", 2)
            .require("Charcoal", 1),
    )?;

    store.add_recipe(
        "Charcoal",
        Recipe::new("Kiln")
            .with_classification(Classification::SemiFinishedProduct)
            .require("Log", 2),
    )?;

    store.add_recipe(
        "Plank",
        Recipe::new("Carpentry Workbench")
            .with_classification(Classification::SemiFinishedProduct)
            .require("Log", 1),
    )?;

    store.add_recipe(
        "Leather Strip",
        Recipe::new("Tanning Rack")
            .with_classification(Classification::SemiFinishedProduct)
            .require("Hide", 1)
            .optional("Salt", 1),
    )?;

    store.add_recipe(
        "Iron Sword",
        Recipe::new("Forge")
            .with_description("A reliable one-handed blade")
            .with_classification(Classification::Weapons)
            .require("Iron Ingot", 3)
            .require("Leather Strip", 1)
            .optional("Plank", 1),
    )?;

    store.add_recipe(
        "Iron Pickaxe",
        Recipe::new("Forge")
            .with_classification(Classification::Tools)
            .require("Iron Ingot", 2)
            .require("Plank", 2),
    )?;

    store.add_recipe(
        "Wooden Chest",
        Recipe::new("Carpentry Workbench")
            .with_classification(Classification::Containers)
            .require("Plank", 6)
            .require("Iron Ingot", 1),
    )?;

    store.add_recipe(
        "Meat Stew",
        Recipe::new("Campfire")
            .with_description("Restores hunger and stamina")
            .with_classification(Classification::Dishes)
            .require("Raw Meat", 2)
            .require("Water", 1)
            .optional("Salt", 1)
            .optional("Herbs", 2),
    )?;

    info!("built {} sample recipes", store.len());
    Ok(store)
}
