//! Recipe resolution logic
//!
//! Expands a recipe into the tree of materials needed to craft it, and
//! accumulates leaf totals and per-station totals along the way.

use std::collections::HashSet;

use tracing::debug;

use crate::error::ResolveError;
use crate::models::{
    MaterialGroup, NodeLabel, Provenance, RecipeStore, Resolution, ResolutionResult,
    ResolvedNode, StationTotals, Totals,
};

/// Resolve the materials needed to craft `quantity` units of `item`
///
/// Returns [`Resolution::NotFound`] when `item` is not a recipe. Materials
/// that are recipes themselves are expanded recursively; everything else is
/// a leaf and accumulates into the totals.
pub fn resolve(
    store: &RecipeStore,
    item: &str,
    quantity: i64,
) -> Result<Resolution, ResolveError> {
    let quantity =
        u64::try_from(quantity).map_err(|_| ResolveError::InvalidQuantity(quantity))?;

    let Some(recipe) = store.get(item) else {
        debug!(item, "recipe not found");
        return Ok(Resolution::NotFound {
            item: item.to_string(),
        });
    };

    let mut expansion = Expansion::new(store);
    let tree = expansion.expand(item, quantity, Provenance::Required);

    debug!(
        item,
        quantity,
        leaves = expansion.totals.len(),
        stations = expansion.station_totals.len(),
        "resolved recipe"
    );

    Ok(Resolution::Found(ResolutionResult {
        item: item.to_string(),
        quantity,
        description: recipe.description().to_string(),
        crafted_in: recipe.crafted_in().to_string(),
        tree,
        totals: expansion.totals,
        station_totals: expansion.station_totals,
    }))
}

/// Accumulators for a single top-level resolve call
struct Expansion<'a> {
    store: &'a RecipeStore,
    // Shared across all branches: an intermediate reachable through several
    // paths is expanded only on the first one.
    visited: HashSet<String>,
    totals: Totals,
    station_totals: StationTotals,
}

impl<'a> Expansion<'a> {
    fn new(store: &'a RecipeStore) -> Self {
        Self {
            store,
            visited: HashSet::new(),
            totals: Totals::new(),
            station_totals: StationTotals::new(),
        }
    }

    /// Expand one recipe at `multiplier` units and return its grouping nodes
    fn expand(&mut self, item: &str, multiplier: u64, provenance: Provenance) -> Vec<ResolvedNode> {
        let store = self.store;
        let Some(recipe) = store.get(item) else {
            return Vec::new();
        };

        if !self.visited.insert(item.to_string()) {
            debug!(item, "already expanded, not descending again");
            return Vec::new();
        }

        let station = recipe.crafted_in();
        self.station_totals.entry(station.to_string()).or_default();

        let mut groups = Vec::new();
        for group in MaterialGroup::ALL {
            let Some(materials) = recipe.materials(group) else {
                continue;
            };
            let arc = provenance.through(group);

            let mut children = Vec::with_capacity(materials.len());
            for (material, per_unit) in materials {
                let amount = per_unit.saturating_mul(multiplier);

                let consumed = self
                    .station_totals
                    .entry(station.to_string())
                    .or_default()
                    .entry(material.clone())
                    .or_default();
                *consumed = consumed.saturating_add(amount);

                let sub_tree = if store.contains(material) {
                    self.expand(material, amount, arc)
                } else {
                    let total = self.totals.entry(material.clone()).or_default();
                    *total = total.saturating_add(amount);
                    Vec::new()
                };

                children.push(ResolvedNode {
                    label: NodeLabel::Material {
                        name: material.clone(),
                        amount,
                    },
                    provenance: arc,
                    children: sub_tree,
                });
            }

            groups.push(ResolvedNode {
                label: NodeLabel::Group(group),
                provenance: arc,
                children,
            });
        }

        groups
    }
}

/// Format a resolution tree as indented text
pub fn format_tree(nodes: &[ResolvedNode], indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);

    for node in nodes {
        output.push_str(&format!("{}{}\n", prefix, node.label));
        output.push_str(&format_tree(&node.children, indent + 1));
    }

    output
}

/// Printable summary of a resolution
#[derive(Debug)]
pub struct ResolutionSummary {
    pub item: String,
    pub quantity: u64,
    pub description: String,
    pub crafted_in: String,
    pub raw_materials: Vec<(String, u64)>,
    pub stations: Vec<(String, Vec<(String, u64)>)>,
}

/// Generate a summary of a resolution, keeping first-seen order
pub fn summarize(result: &ResolutionResult) -> ResolutionSummary {
    let raw_materials = result
        .totals
        .iter()
        .map(|(name, amount)| (name.clone(), *amount))
        .collect();

    let stations = result
        .station_totals
        .iter()
        .map(|(station, materials)| {
            let materials = materials
                .iter()
                .map(|(name, amount)| (name.clone(), *amount))
                .collect();
            (station.clone(), materials)
        })
        .collect();

    ResolutionSummary {
        item: result.item.clone(),
        quantity: result.quantity,
        description: result.description.clone(),
        crafted_in: result.crafted_in.clone(),
        raw_materials,
        stations,
    }
}

impl std::fmt::Display for ResolutionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Crafting Summary ===")?;
        writeln!(f, "Target: {}x {}", self.quantity, self.item)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Crafting Station: {}", self.crafted_in)?;
        writeln!(f)?;

        writeln!(f, "Raw materials required:")?;
        if self.raw_materials.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for (name, amount) in &self.raw_materials {
            writeln!(f, "  {}: {}", name, amount)?;
        }
        writeln!(f)?;

        writeln!(f, "By crafting station:")?;
        for (station, materials) in &self.stations {
            writeln!(f, "  Crafting Station: {}", station)?;
            for (name, amount) in materials {
                writeln!(f, "    {}: {}", name, amount)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recipe;

    fn found(store: &RecipeStore, item: &str, quantity: i64) -> ResolutionResult {
        resolve(store, item, quantity)
            .unwrap()
            .found()
            .expect("recipe should resolve")
    }

    fn totals(pairs: &[(&str, u64)]) -> Totals {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    /// Forge: A = 2 Wood + 1 B; Workbench: B = 3 Nail
    fn forge_store() -> RecipeStore {
        let mut store = RecipeStore::new();
        store.insert("A", Recipe::new("Forge").require("Wood", 2).require("B", 1));
        store.insert("B", Recipe::new("Workbench").require("Nail", 3));
        store
    }

    #[test]
    fn test_not_found() {
        let store = forge_store();
        let resolution = resolve(&store, "Unicorn Horn", 5).unwrap();
        assert_eq!(
            resolution,
            Resolution::NotFound {
                item: "Unicorn Horn".to_string()
            }
        );
        assert!(resolution.is_not_found());
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let store = forge_store();
        assert_eq!(
            resolve(&store, "A", -1),
            Err(ResolveError::InvalidQuantity(-1))
        );
    }

    #[test]
    fn test_zero_quantity_yields_zero_tree() {
        let store = forge_store();
        let result = found(&store, "A", 0);
        assert_eq!(result.totals, totals(&[("Wood", 0), ("Nail", 0)]));
        let wood = result.tree[0].children[0].material();
        assert_eq!(wood, Some(("Wood", 0)));
    }

    #[test]
    fn test_recipe_without_materials() {
        let mut store = RecipeStore::new();
        store.insert("Pebble", Recipe::new("Ground"));
        store.insert("Twig", Recipe::default());

        let result = found(&store, "Pebble", 3);
        assert!(result.tree.is_empty());
        assert!(result.totals.is_empty());
        assert_eq!(result.station_totals.len(), 1);
        assert!(result.station_totals["Ground"].is_empty());

        let result = found(&store, "Twig", 1);
        assert_eq!(result.crafted_in, "Manual Crafting");
        assert_eq!(result.description, "N/A");
        assert!(result.station_totals["Manual Crafting"].is_empty());
    }

    #[test]
    fn test_station_attribution() {
        let store = forge_store();
        let result = found(&store, "A", 1);

        assert_eq!(result.totals, totals(&[("Wood", 2), ("Nail", 3)]));
        assert_eq!(result.station_totals.len(), 2);
        assert_eq!(result.station_totals["Forge"], totals(&[("Wood", 2), ("B", 1)]));
        assert_eq!(result.station_totals["Workbench"], totals(&[("Nail", 3)]));
        assert_eq!(
            result.station_totals.keys().collect::<Vec<_>>(),
            ["Forge", "Workbench"]
        );
    }

    #[test]
    fn test_scaling_brick() {
        let mut store = RecipeStore::new();
        store.insert("Brick", Recipe::new("Kiln").require("Clay", 2).require("Water", 1));

        let result = found(&store, "Brick", 4);
        assert_eq!(result.totals, totals(&[("Clay", 8), ("Water", 4)]));
        assert_eq!(result.crafted_in, "Kiln");
    }

    #[test]
    fn test_linearity_single_level() {
        let mut store = RecipeStore::new();
        store.insert(
            "Rope",
            Recipe::new("Loom")
                .require("Fiber", 3)
                .require("Resin", 1)
                .optional("Wax", 2),
        );

        let base = found(&store, "Rope", 1).totals;
        for q in [2, 5, 17, 1000] {
            let scaled = found(&store, "Rope", q).totals;
            assert_eq!(scaled.len(), base.len());
            for (material, amount) in &base {
                assert_eq!(scaled[material], amount * q as u64, "{} at {}", material, q);
            }
        }
    }

    #[test]
    fn test_multiplier_propagates_through_levels() {
        let mut store = RecipeStore::new();
        store.insert("Axe", Recipe::new("Workbench").require("Blade", 2).require("Stick", 1));
        store.insert("Blade", Recipe::new("Forge").require("Ingot", 3));
        store.insert("Ingot", Recipe::new("Furnace").require("Ore", 2));

        let result = found(&store, "Axe", 5);
        assert_eq!(result.totals, totals(&[("Ore", 60), ("Stick", 5)]));
        assert_eq!(result.station_totals["Workbench"], totals(&[("Blade", 10), ("Stick", 5)]));
        assert_eq!(result.station_totals["Forge"], totals(&[("Ingot", 30)]));
        assert_eq!(result.station_totals["Furnace"], totals(&[("Ore", 60)]));
    }

    #[test]
    fn test_optional_materials_counted() {
        let mut store = RecipeStore::new();
        store.insert("Stew", Recipe::new("Campfire").require("Water", 1).optional("Salt", 1));

        let result = found(&store, "Stew", 3);
        assert_eq!(result.totals, totals(&[("Water", 3), ("Salt", 3)]));
        assert_eq!(result.station_totals["Campfire"], totals(&[("Water", 3), ("Salt", 3)]));

        assert_eq!(result.tree.len(), 2);
        let required = &result.tree[0];
        let optional = &result.tree[1];
        assert_eq!(required.group(), Some(MaterialGroup::Required));
        assert_eq!(required.children[0].material(), Some(("Water", 3)));
        assert_eq!(optional.group(), Some(MaterialGroup::Optional));
        assert_eq!(optional.provenance, Provenance::Optional);
        assert_eq!(optional.children[0].material(), Some(("Salt", 3)));
        assert_eq!(optional.children[0].provenance, Provenance::Optional);
    }

    #[test]
    fn test_empty_groups_omitted() {
        let mut store = RecipeStore::new();
        let mut recipe = Recipe::new("Altar").optional("Incense", 1);
        recipe.materials_required = Some(Default::default());
        store.insert("Offering", recipe);

        let result = found(&store, "Offering", 1);
        assert_eq!(result.tree.len(), 1);
        assert_eq!(result.tree[0].group(), Some(MaterialGroup::Optional));
    }

    #[test]
    fn test_optional_provenance_is_inherited() {
        let mut store = RecipeStore::new();
        store.insert("Pie", Recipe::new("Oven").require("Flour", 2).optional("Jam", 1));
        store.insert("Jam", Recipe::new("Pot").require("Berry", 4));

        let result = found(&store, "Pie", 1);
        let jam = &result.tree[1].children[0];
        assert_eq!(jam.material(), Some(("Jam", 1)));

        let jam_required = &jam.children[0];
        assert_eq!(jam_required.group(), Some(MaterialGroup::Required));
        assert_eq!(jam_required.provenance, Provenance::Optional);
        assert_eq!(jam_required.children[0].material(), Some(("Berry", 4)));
        assert_eq!(jam_required.children[0].provenance, Provenance::Optional);

        assert_eq!(result.tree[0].children[0].provenance, Provenance::Required);
        assert_eq!(result.totals, totals(&[("Flour", 2), ("Berry", 4)]));
    }

    #[test]
    fn test_two_recipe_cycle_never_expands_root_again() {
        // A shows up under B as a childless leaf-like node; it is never
        // expanded beneath itself.
        let mut store = RecipeStore::new();
        store.insert("A", Recipe::new("Forge").require("B", 1));
        store.insert("B", Recipe::new("Anvil").require("A", 1));

        let result = found(&store, "A", 1);
        let b = &result.tree[0].children[0];
        assert_eq!(b.material(), Some(("B", 1)));
        let a = &b.children[0].children[0];
        assert_eq!(a.material(), Some(("A", 1)));
        assert!(a.children.is_empty());

        assert!(result.totals.is_empty());
        assert_eq!(result.station_totals["Forge"], totals(&[("B", 1)]));
        assert_eq!(result.station_totals["Anvil"], totals(&[("A", 1)]));
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut store = RecipeStore::new();
        store.insert("Seed", Recipe::new("Field").require("Seed", 1).require("Water", 2));

        let result = found(&store, "Seed", 2);
        let seed = &result.tree[0].children[0];
        assert!(seed.children.is_empty());
        assert_eq!(result.totals, totals(&[("Water", 4)]));
        assert_eq!(result.station_totals["Field"], totals(&[("Seed", 2), ("Water", 4)]));
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let mut store = RecipeStore::new();
        store.insert("Wall", Recipe::new("Site").require("Brick", 4).require("Beam", 1));
        store.insert("Beam", Recipe::new("Sawmill").require("Log", 3).require("Nail", 1));
        store.insert("Tower", Recipe::new("Site").require("Wall", 1).require("Nail", 2));

        let result = found(&store, "Wall", i64::MAX);
        assert_eq!(result.totals["Brick"], u64::MAX);
        assert_eq!(result.totals["Log"], u64::MAX);
        assert_eq!(result.totals["Nail"], i64::MAX as u64);
        assert_eq!(result.tree[0].children[0].material(), Some(("Brick", u64::MAX)));

        // Accumulating past the limit stays at u64::MAX instead of wrapping
        let result = found(&store, "Tower", i64::MAX);
        assert_eq!(result.totals["Nail"], u64::MAX);
    }

    #[test]
    fn test_shared_intermediate_expanded_once() {
        // Diamond: Cart -> Wheel, Axle; both need Plank. Only the first path
        // through Plank is expanded.
        let mut store = RecipeStore::new();
        store.insert("Cart", Recipe::new("Workbench").require("Wheel", 1).require("Axle", 1));
        store.insert("Wheel", Recipe::new("Lathe").require("Plank", 2));
        store.insert("Axle", Recipe::new("Lathe").require("Plank", 3));
        store.insert("Plank", Recipe::new("Sawmill").require("Log", 1));

        let result = found(&store, "Cart", 1);
        assert_eq!(result.totals, totals(&[("Log", 2)]));
        assert_eq!(result.station_totals["Lathe"], totals(&[("Plank", 5)]));
        assert_eq!(result.station_totals["Sawmill"], totals(&[("Log", 2)]));

        let axle = &result.tree[0].children[1];
        let plank_under_axle = &axle.children[0].children[0];
        assert_eq!(plank_under_axle.material(), Some(("Plank", 3)));
        assert!(plank_under_axle.children.is_empty());
    }

    #[test]
    fn test_totals_contain_only_leaves() {
        let mut store = forge_store();
        store.insert("C", Recipe::new("Forge").require("A", 2).optional("B", 1).optional("Gem", 1));

        let result = found(&store, "C", 3);
        assert!(!result.totals.is_empty());
        for material in result.totals.keys() {
            assert!(!store.contains(material), "{} is a recipe", material);
        }
    }

    #[test]
    fn test_totals_keep_first_seen_order() {
        let mut store = RecipeStore::new();
        store.insert(
            "Lamp",
            Recipe::new("Workbench")
                .require("Oil", 1)
                .require("Wick", 1)
                .optional("Glass", 1)
                .require("Oil Can", 1),
        );
        store.insert("Oil Can", Recipe::new("Forge").require("Tin", 1).require("Oil", 4));

        let result = found(&store, "Lamp", 1);
        assert_eq!(
            result.totals.keys().collect::<Vec<_>>(),
            ["Oil", "Wick", "Tin", "Glass"]
        );
        assert_eq!(result.totals["Oil"], 5);
    }

    #[test]
    fn test_repeated_resolution_is_independent() {
        let store = forge_store();
        let first = found(&store, "A", 2);
        let second = found(&store, "A", 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_format_tree() {
        let store = forge_store();
        let result = found(&store, "A", 1);
        let expected = "\
Required Materials
  Wood x 2
  B x 1
    Required Materials
      Nail x 3
";
        assert_eq!(format_tree(&result.tree, 0), expected);
    }

    #[test]
    fn test_summary_display() {
        let store = forge_store();
        let summary = summarize(&found(&store, "A", 1));
        assert_eq!(summary.raw_materials, vec![("Wood".to_string(), 2), ("Nail".to_string(), 3)]);

        let text = summary.to_string();
        assert!(text.contains("Target: 1x A"));
        assert!(text.contains("Crafting Station: Forge"));
        assert!(text.contains("  Crafting Station: Workbench\n    Nail: 3"));
        assert!(text.find("Forge").unwrap() < text.find("Workbench").unwrap());
    }
}
