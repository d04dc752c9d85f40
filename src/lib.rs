//! Crafting recipe calculator
//!
//! Resolves the full set of materials needed to craft an item, expanding
//! craftable ingredients recursively and grouping consumption by crafting
//! station.

pub mod calculator;
pub mod db;
pub mod error;
pub mod import;
pub mod models;

pub use calculator::{format_tree, resolve, summarize, ResolutionSummary};
pub use error::{ImportError, ResolveError, StoreError};
pub use models::{Recipe, RecipeStore, Resolution, ResolutionResult, ResolvedNode};
