//! Error types for resolution, recipe editing and document import

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the resolver.
///
/// A missing root recipe is not an error; see [`crate::models::Resolution`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Quantity must be a non-negative integer, got {0}")]
    InvalidQuantity(i64),
}

/// Errors raised when adding a recipe to a store
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Recipe name cannot be empty!")]
    EmptyName,

    #[error("Resources and Extra optional materials cannot both be empty!")]
    NoMaterials,

    #[error("Amount for '{material}' must be a positive integer")]
    InvalidAmount { material: String },
}

/// Errors raised while reading or writing recipe documents
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse recipe document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid material '{0}', expected '<name> x <amount>'")]
    InvalidMaterialSpec(String),

    #[error("Amount must be an integer! (got '{0}')")]
    InvalidAmount(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}
