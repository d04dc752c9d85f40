//! Data models for recipes, recipe stores and resolution results

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const DEFAULT_DESCRIPTION: &str = "N/A";
pub const DEFAULT_STATION: &str = "Manual Crafting";

/// Material name -> per-unit amount, in recipe order
pub type Materials = IndexMap<String, u64>;

/// Leaf material -> accumulated quantity
pub type Totals = IndexMap<String, u64>;

/// Crafting station -> (material -> accumulated quantity)
pub type StationTotals = IndexMap<String, IndexMap<String, u64>>;

/// Recipe category, used for filtering listings only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Plants,
    Minerals,
    Animals,
    Weapons,
    Armor,
    Tools,
    Containers,
    Buildings,
    Food,
    Dishes,
    Medicines,
    SemiFinishedProduct,
    Other,
}

impl Classification {
    pub const ALL: [Classification; 13] = [
        Self::Plants,
        Self::Minerals,
        Self::Animals,
        Self::Weapons,
        Self::Armor,
        Self::Tools,
        Self::Containers,
        Self::Buildings,
        Self::Food,
        Self::Dishes,
        Self::Medicines,
        Self::SemiFinishedProduct,
        Self::Other,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Plants => "Plants",
            Self::Minerals => "Minerals",
            Self::Animals => "Animals",
            Self::Weapons => "Weapons",
            Self::Armor => "Armor",
            Self::Tools => "Tools",
            Self::Containers => "Containers",
            Self::Buildings => "Buildings",
            Self::Food => "Food",
            Self::Dishes => "Dishes",
            Self::Medicines => "Medicines",
            Self::SemiFinishedProduct => "Semi-finished Product",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.display_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown classification: {}", wanted))
    }
}

/// Unknown or empty classification strings load as `None` instead of failing
mod classification_field {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Classification;

    pub fn serialize<S: Serializer>(
        value: &Option<Classification>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.map_or("", Classification::display_name))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Classification>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| s.parse().ok()))
    }
}

/// A crafting recipe, keyed by name in a [`RecipeStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Crafted in", default, skip_serializing_if = "Option::is_none")]
    pub crafted_in: Option<String>,

    #[serde(rename = "Classification", default, with = "classification_field")]
    pub classification: Option<Classification>,

    #[serde(rename = "Materials Required", default)]
    pub materials_required: Option<Materials>,

    #[serde(rename = "Extra optional materials", default)]
    pub extra_materials: Option<Materials>,
}

impl Recipe {
    pub fn new(crafted_in: &str) -> Self {
        Self {
            crafted_in: Some(crafted_in.to_string()),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    /// Add a required material (builder style)
    pub fn require(mut self, material: &str, amount: u64) -> Self {
        self.materials_required
            .get_or_insert_with(Materials::new)
            .insert(material.to_string(), amount);
        self
    }

    /// Add an extra optional material (builder style)
    pub fn optional(mut self, material: &str, amount: u64) -> Self {
        self.extra_materials
            .get_or_insert_with(Materials::new)
            .insert(material.to_string(), amount);
        self
    }

    pub fn description(&self) -> &str {
        non_blank(self.description.as_deref()).unwrap_or(DEFAULT_DESCRIPTION)
    }

    /// Crafting station, "Manual Crafting" when missing or blank
    pub fn crafted_in(&self) -> &str {
        non_blank(self.crafted_in.as_deref()).unwrap_or(DEFAULT_STATION)
    }

    /// Materials of one group, `None` when the group is absent or empty
    pub fn materials(&self, group: MaterialGroup) -> Option<&Materials> {
        let materials = match group {
            MaterialGroup::Required => self.materials_required.as_ref(),
            MaterialGroup::Optional => self.extra_materials.as_ref(),
        };
        materials.filter(|m| !m.is_empty())
    }

    pub fn has_materials(&self) -> bool {
        MaterialGroup::ALL
            .into_iter()
            .any(|group| self.materials(group).is_some())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// All known recipes, in insertion order
///
/// Insertion order only drives listings; resolution never depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeStore {
    recipes: IndexMap<String, Recipe>,
}

impl RecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Recipe)> {
        self.recipes.iter().map(|(name, recipe)| (name.as_str(), recipe))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    /// Insert without validation. Replacing an existing name keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, recipe: Recipe) -> Option<Recipe> {
        self.recipes.insert(name.into(), recipe)
    }

    /// Validated insertion used by the add-recipe operation
    pub fn add_recipe(&mut self, name: &str, mut recipe: Recipe) -> Result<(), StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if !recipe.has_materials() {
            return Err(StoreError::NoMaterials);
        }

        for group in MaterialGroup::ALL {
            if let Some((material, _)) = recipe
                .materials(group)
                .and_then(|m| m.iter().find(|(_, amount)| **amount == 0))
            {
                return Err(StoreError::InvalidAmount {
                    material: material.clone(),
                });
            }
        }

        // Empty groups are stored as null, like documents written by hand
        if recipe.materials(MaterialGroup::Required).is_none() {
            recipe.materials_required = None;
        }
        if recipe.materials(MaterialGroup::Optional).is_none() {
            recipe.extra_materials = None;
        }

        self.insert(name, recipe);
        Ok(())
    }

    /// Names matching a case-insensitive search and an optional classification
    pub fn filter(&self, search: &str, classification: Option<Classification>) -> Vec<&str> {
        let search = search.to_lowercase();
        self.iter()
            .filter(|(_, recipe)| {
                classification.is_none_or(|wanted| recipe.classification == Some(wanted))
            })
            .filter(|(name, _)| name.to_lowercase().contains(&search))
            .map(|(name, _)| name)
            .collect()
    }
}

impl FromIterator<(String, Recipe)> for RecipeStore {
    fn from_iter<I: IntoIterator<Item = (String, Recipe)>>(iter: I) -> Self {
        Self {
            recipes: iter.into_iter().collect(),
        }
    }
}

/// The two material lists of a recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialGroup {
    Required,
    Optional,
}

impl MaterialGroup {
    pub const ALL: [MaterialGroup; 2] = [Self::Required, Self::Optional];

    pub fn heading(self) -> &'static str {
        match self {
            Self::Required => "Required Materials",
            Self::Optional => "Extra Optional Materials",
        }
    }
}

/// Whether a node hangs below a required or an optional material arc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Required,
    Optional,
}

impl Provenance {
    /// Provenance after following an arc of `group`; optional is sticky
    pub fn through(self, group: MaterialGroup) -> Provenance {
        match (self, group) {
            (Self::Required, MaterialGroup::Required) => Self::Required,
            _ => Self::Optional,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLabel {
    Group(MaterialGroup),
    Material { name: String, amount: u64 },
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(group) => f.write_str(group.heading()),
            Self::Material { name, amount } => write!(f, "{} x {}", name, amount),
        }
    }
}

/// One node of the resolution tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub label: NodeLabel,
    pub provenance: Provenance,
    pub children: Vec<ResolvedNode>,
}

impl ResolvedNode {
    /// Material name and amount, `None` for grouping headers
    pub fn material(&self) -> Option<(&str, u64)> {
        match &self.label {
            NodeLabel::Material { name, amount } => Some((name.as_str(), *amount)),
            NodeLabel::Group(_) => None,
        }
    }

    pub fn group(&self) -> Option<MaterialGroup> {
        match self.label {
            NodeLabel::Group(group) => Some(group),
            NodeLabel::Material { .. } => None,
        }
    }
}

/// Output of resolving a recipe that exists in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub item: String,
    pub quantity: u64,
    pub description: String,
    pub crafted_in: String,
    pub tree: Vec<ResolvedNode>,
    pub totals: Totals,
    pub station_totals: StationTotals,
}

/// Outcome of a resolve call; a missing recipe is a normal outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolutionResult),
    NotFound { item: String },
}

impl Resolution {
    pub fn found(self) -> Option<ResolutionResult> {
        match self {
            Self::Found(result) => Some(result),
            Self::NotFound { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
