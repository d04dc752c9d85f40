//! Database schema and operations

use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::models::{MaterialGroup, Materials, Recipe, RecipeStore};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Recipe definitions; id order is the listing order
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            crafted_in TEXT,
            classification TEXT
        );

        -- Required (optional = 0) and extra optional (optional = 1) materials
        CREATE TABLE IF NOT EXISTS recipe_materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL,
            material TEXT NOT NULL,
            amount INTEGER NOT NULL,
            optional INTEGER NOT NULL DEFAULT 0,
            UNIQUE (recipe_id, material, optional)
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_materials_recipe ON recipe_materials(recipe_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a recipe. A replaced recipe keeps its listing position.
pub fn upsert_recipe(conn: &Connection, name: &str, recipe: &Recipe) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_recipe(&tx, name, recipe)?;
    tx.commit()?;
    Ok(())
}

/// Write every recipe of a store, in store order, in one transaction
pub fn save_store(conn: &Connection, store: &RecipeStore) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    for (name, recipe) in store.iter() {
        write_recipe(&tx, name, recipe)?;
    }
    tx.commit()?;
    Ok(store.len())
}

/// Replace every recipe with the contents of `store`, in one transaction.
/// On error the existing recipes are left untouched.
pub fn replace_store(conn: &Connection, store: &RecipeStore) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    clear_recipes(&tx)?;
    for (name, recipe) in store.iter() {
        write_recipe(&tx, name, recipe)?;
    }
    tx.commit()?;
    Ok(store.len())
}

fn write_recipe(conn: &Connection, name: &str, recipe: &Recipe) -> Result<()> {
    conn.execute(
        "INSERT INTO recipes (name, description, crafted_in, classification)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET
             description = excluded.description,
             crafted_in = excluded.crafted_in,
             classification = excluded.classification",
        (
            name,
            &recipe.description,
            &recipe.crafted_in,
            recipe.classification.map(|c| c.display_name()),
        ),
    )?;

    let recipe_id: i64 = conn.query_row(
        "SELECT id FROM recipes WHERE name = ?1",
        [name],
        |row| row.get(0),
    )?;

    conn.execute(
        "DELETE FROM recipe_materials WHERE recipe_id = ?1",
        [recipe_id],
    )?;

    for group in MaterialGroup::ALL {
        let Some(materials) = recipe.materials(group) else {
            continue;
        };
        for (material, amount) in materials {
            let amount = i64::try_from(*amount)
                .with_context(|| format!("Amount for '{}' in '{}' is too large", material, name))?;
            conn.execute(
                "INSERT INTO recipe_materials (recipe_id, material, amount, optional)
                 VALUES (?1, ?2, ?3, ?4)",
                (recipe_id, material, amount, group == MaterialGroup::Optional),
            )?;
        }
    }

    debug!(name, "stored recipe");
    Ok(())
}

/// Delete a recipe and its materials. Returns false if it did not exist.
pub fn delete_recipe(conn: &Connection, name: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM recipe_materials
         WHERE recipe_id IN (SELECT id FROM recipes WHERE name = ?1)",
        [name],
    )?;
    let deleted = tx.execute("DELETE FROM recipes WHERE name = ?1", [name])?;
    tx.commit()?;
    Ok(deleted > 0)
}

/// Clear all recipes (for re-import)
pub fn clear_recipes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_materials;
        DELETE FROM recipes;
        "#,
    )?;
    Ok(())
}

pub fn count_recipes(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
    Ok(usize::try_from(count)?)
}

/// Load every recipe into an in-memory snapshot, in listing order
pub fn load_store(conn: &Connection) -> Result<RecipeStore> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, crafted_in, classification FROM recipes ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        let classification: Option<String> = row.get(4)?;
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            Recipe {
                description: row.get(2)?,
                crafted_in: row.get(3)?,
                classification: classification.and_then(|c| c.parse().ok()),
                ..Recipe::default()
            },
        ))
    })?;

    let mut recipes = Vec::new();
    let mut index_by_id = HashMap::new();
    for row in rows {
        let (id, name, recipe) = row?;
        index_by_id.insert(id, recipes.len());
        recipes.push((name, recipe));
    }

    let mut stmt = conn.prepare(
        "SELECT recipe_id, material, amount, optional FROM recipe_materials ORDER BY id",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, bool>(3)?,
        ))
    })?;

    for row in rows {
        let (recipe_id, material, amount, optional) = row?;
        let Some(&index) = index_by_id.get(&recipe_id) else {
            debug!(recipe_id, material = %material, "material row without recipe, ignoring");
            continue;
        };
        let (name, recipe) = &mut recipes[index];
        let amount = u64::try_from(amount)
            .with_context(|| format!("Negative amount for '{}' in '{}'", material, name))?;

        let materials = if optional {
            &mut recipe.extra_materials
        } else {
            &mut recipe.materials_required
        };
        materials
            .get_or_insert_with(Materials::new)
            .insert(material, amount);
    }

    Ok(recipes.into_iter().collect())
}
