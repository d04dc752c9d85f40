//! Recipe document import and export
//!
//! A recipe document is a JSON object mapping recipe names to recipes:
//!
//! ```json
//! {
//!     "Wooden Plank": {
//!         "Description": "Basic building material",
//!         "Crafted in": "Workbench",
//!         "Classification": "Semi-finished Product",
//!         "Materials Required": { "Log": 1 },
//!         "Extra optional materials": null
//!     }
//! }
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ImportError;
use crate::models::RecipeStore;

/// Find all *.json documents below a directory, sorted by path
pub fn find_documents(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

/// Read a recipe document. A missing file reads as an empty store.
pub fn read_document(path: &Path) -> Result<RecipeStore, ImportError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no recipe document, starting empty");
            return Ok(RecipeStore::new());
        }
        Err(source) => {
            return Err(ImportError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| ImportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a recipe document with four-space indentation
pub fn write_document(store: &RecipeStore, path: &Path) -> Result<(), ImportError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    store
        .serialize(&mut serializer)
        .map_err(|source| ImportError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    fs::write(path, buf).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Import a single document or every document below a directory
///
/// Recipes from later documents replace earlier ones with the same name.
/// When scanning a directory, unreadable documents are skipped and counted.
pub fn import_path(path: &Path) -> Result<(RecipeStore, ImportStats), ImportError> {
    let mut stats = ImportStats::default();
    let mut store = RecipeStore::new();

    if !path.exists() {
        return Err(ImportError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(ErrorKind::NotFound),
        });
    }

    if !path.is_dir() {
        let document = read_document(path)?;
        merge(&mut store, document, &mut stats);
        stats.files = 1;
        return Ok((store, stats));
    }

    info!("Scanning {} for recipe documents", path.display());
    let documents = find_documents(path);
    info!("Found {} recipe documents", documents.len());

    for document_path in &documents {
        match read_document(document_path) {
            Ok(document) => {
                info!(
                    "  Read: {} ({} recipes)",
                    document_path.display(),
                    document.len()
                );
                merge(&mut store, document, &mut stats);
                stats.files += 1;
            }
            Err(e) => {
                warn!("  Error reading {}: {}", document_path.display(), e);
                stats.errors += 1;
            }
        }
    }

    Ok((store, stats))
}

fn merge(store: &mut RecipeStore, document: RecipeStore, stats: &mut ImportStats) {
    for (name, recipe) in document.iter() {
        if store.insert(name, recipe.clone()).is_some() {
            stats.replaced += 1;
        } else {
            stats.recipes += 1;
        }
    }
}

/// Parse a material given on the command line
///
/// Accepts `Name x 3`, `Name=3` and `Name:3`.
pub fn parse_material_spec(spec: &str) -> Result<(String, u64), ImportError> {
    let spec_re = Regex::new(r"^\s*(.+?)\s*(?:\s[xX]\s|[=:])\s*(\S+)\s*$")?;

    let cap = spec_re
        .captures(spec)
        .ok_or_else(|| ImportError::InvalidMaterialSpec(spec.to_string()))?;

    let name = cap[1].trim().to_string();
    let amount = cap[2]
        .parse::<u64>()
        .map_err(|_| ImportError::InvalidAmount(cap[2].to_string()))?;

    Ok((name, amount))
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub recipes: usize,
    pub replaced: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} recipes from {} documents ({} replaced). Errors: {}",
            self.recipes, self.files, self.replaced, self.errors
        )
    }
}
