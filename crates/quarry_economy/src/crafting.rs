//! # Crafting System - Assembler Recipe Book
//!
//! **Exact-Multiset Recipes with Cycle Detection**
//!
//! The assembler holds a bag of loaded items. When it is fuelled, the bag is
//! compared against every recipe; a recipe matches only if the bag contains
//! exactly its inputs, no extra kinds and no missing units.
//!
//! ## Guarantees
//!
//! 1. **No Cycles**: The item graph induced by the recipes is a DAG, so no
//!    loop of crafts can generate resources from nothing
//! 2. **Unambiguous**: No two recipes share an input multiset, so a loaded
//!    bag matches at most one recipe
//! 3. **External Configuration**: The built-in table can be replaced by a
//!    `[[recipe]]` TOML table
//!
//! ## Example
//!
//! ```rust
//! use quarry_economy::{ItemKind, RecipeBook};
//!
//! let book = RecipeBook::standard();
//! let loaded = [
//!     ItemKind::CopperIngot,
//!     ItemKind::Metal2Block,
//!     ItemKind::CopperIngot,
//!     ItemKind::Metal2Block,
//!     ItemKind::CopperIngot,
//! ];
//! let recipe = book.match_exact(&loaded).unwrap();
//! assert_eq!(recipe.output, ItemKind::Pickaxe);
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::item::ItemKind;

/// Input item in a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeItem {
    /// The item kind.
    pub item: ItemKind,
    /// Quantity required.
    pub count: u32,
}

impl RecipeItem {
    /// Creates a new recipe item.
    #[inline]
    #[must_use]
    pub const fn new(item: ItemKind, count: u32) -> Self {
        Self { item, count }
    }
}

/// An assembler recipe. Always yields one unit of `output`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Item produced.
    pub output: ItemKind,
    /// Items consumed, as a multiset.
    pub inputs: Vec<RecipeItem>,
}

impl Recipe {
    /// Creates a new recipe with basic validation.
    ///
    /// # Errors
    ///
    /// Returns error if the recipe has no inputs or a zero quantity.
    pub fn new(output: ItemKind, inputs: Vec<RecipeItem>) -> EconomyResult<Self> {
        if inputs.is_empty() {
            return Err(EconomyError::InvalidConfig(format!(
                "recipe for {output} must have at least one input"
            )));
        }
        if let Some(zero) = inputs.iter().find(|i| i.count == 0) {
            return Err(EconomyError::InvalidConfig(format!(
                "recipe for {output} requires zero {}",
                zero.item
            )));
        }
        Ok(Self { output, inputs })
    }

    /// The input multiset, with repeated entries merged.
    #[must_use]
    pub fn multiset(&self) -> BTreeMap<ItemKind, u32> {
        let mut bag = BTreeMap::new();
        for input in &self.inputs {
            let slot = bag.entry(input.item).or_insert(0_u32);
            *slot = slot.saturating_add(input.count);
        }
        bag
    }
}

/// Collapses a list of loaded items into a multiset.
#[must_use]
pub fn multiset_of(items: &[ItemKind]) -> BTreeMap<ItemKind, u32> {
    let mut bag = BTreeMap::new();
    for &item in items {
        *bag.entry(item).or_insert(0) += 1;
    }
    bag
}

#[derive(Deserialize)]
struct RecipeFile {
    #[serde(default)]
    recipe: Vec<Recipe>,
}

/// The recipe book - a validated, ordered set of assembler recipes.
#[derive(Clone, Debug)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
    /// Pre-merged input multisets, parallel to `recipes`.
    bags: Vec<BTreeMap<ItemKind, u32>>,
}

impl RecipeBook {
    /// Builds a book from recipes, validating it.
    ///
    /// # Errors
    ///
    /// - `DuplicateRecipe` if two recipes share an input multiset
    /// - `RecipeCycle` if the recipes form a production loop
    pub fn new(recipes: Vec<Recipe>) -> EconomyResult<Self> {
        let bags: Vec<_> = recipes.iter().map(Recipe::multiset).collect();

        for (i, bag) in bags.iter().enumerate() {
            if bags[..i].contains(bag) {
                return Err(EconomyError::DuplicateRecipe(recipes[i].output));
            }
        }

        let book = Self { recipes, bags };
        if let Some(cycle) = book.find_cycle() {
            return Err(EconomyError::RecipeCycle(cycle));
        }
        Ok(book)
    }

    /// The built-in recipe table.
    #[must_use]
    pub fn standard() -> Self {
        use ItemKind as I;
        let table: [(ItemKind, &[(ItemKind, u32)]); 9] = [
            (I::Pickaxe, &[(I::CopperIngot, 3), (I::Metal2Block, 2)]),
            (I::Furnace, &[(I::Metal2Block, 8), (I::Shard, 1)]),
            (
                I::Teleporter,
                &[(I::Shard, 3), (I::CopperIngot, 2), (I::Metal2Block, 5)],
            ),
            (I::Chest, &[(I::Metal2Block, 4), (I::CopperIngot, 2)]),
            (I::TitaniumBlock, &[(I::TitaniumIngot, 2)]),
            (I::GlassBlock, &[(I::Dust, 4), (I::TitaniumIngot, 1)]),
            (I::ChemLab, &[(I::TitaniumIngot, 3), (I::GlassBlock, 2)]),
            (I::Battery, &[(I::TitaniumIngot, 4), (I::UraniumRod, 1)]),
            (I::Reflector, &[(I::TitaniumIngot, 2), (I::Shard, 2)]),
        ];

        let recipes: Vec<Recipe> = table
            .iter()
            .map(|(output, inputs)| Recipe {
                output: *output,
                inputs: inputs
                    .iter()
                    .map(|&(item, count)| RecipeItem::new(item, count))
                    .collect(),
            })
            .collect();
        let bags = recipes.iter().map(Recipe::multiset).collect();
        Self { recipes, bags }
    }

    /// Parses a `[[recipe]]` TOML table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` on malformed TOML, or any validation error
    /// from [`RecipeBook::new`].
    pub fn from_toml_str(source: &str) -> EconomyResult<Self> {
        let file: RecipeFile =
            toml::from_str(source).map_err(|e| EconomyError::InvalidConfig(e.to_string()))?;
        let recipes = file
            .recipe
            .into_iter()
            .map(|r| Recipe::new(r.output, r.inputs))
            .collect::<EconomyResult<Vec<_>>>()?;
        Self::new(recipes)
    }

    /// Loads a recipe table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as
    /// [`RecipeBook::from_toml_str`].
    pub fn load(path: &Path) -> EconomyResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| EconomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Returns all recipes, in table order.
    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Returns the number of recipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Returns true if the book holds no recipes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Returns the first recipe whose inputs equal `loaded` exactly.
    ///
    /// Order of `loaded` is irrelevant.
    #[must_use]
    pub fn match_exact(&self, loaded: &[ItemKind]) -> Option<&Recipe> {
        if loaded.is_empty() {
            return None;
        }
        let bag = multiset_of(loaded);
        self.bags
            .iter()
            .position(|b| *b == bag)
            .map(|i| &self.recipes[i])
    }

    /// Detects which items are involved in a production cycle.
    ///
    /// Uses Kahn's algorithm over the item graph (input -> output). Items
    /// that are never drained to zero in-degree sit on or behind a cycle.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<ItemKind>> {
        let mut in_degree: BTreeMap<ItemKind, usize> = BTreeMap::new();
        let mut adjacency: BTreeMap<ItemKind, Vec<ItemKind>> = BTreeMap::new();

        for (recipe, bag) in self.recipes.iter().zip(&self.bags) {
            in_degree.entry(recipe.output).or_insert(0);
            for &input in bag.keys() {
                in_degree.entry(input).or_insert(0);
                adjacency.entry(input).or_default().push(recipe.output);
                *in_degree.entry(recipe.output).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<ItemKind> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&item, _)| item)
            .collect();
        let mut drained = BTreeSet::new();

        while let Some(item) = queue.pop_front() {
            drained.insert(item);
            if let Some(next) = adjacency.get(&item) {
                for &neighbor in next {
                    if let Some(deg) = in_degree.get_mut(&neighbor) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push_back(neighbor);
                        }
                    }
                }
            }
        }

        let stuck: Vec<ItemKind> = in_degree
            .keys()
            .filter(|item| !drained.contains(*item))
            .copied()
            .collect();
        if stuck.is_empty() {
            None
        } else {
            Some(stuck)
        }
    }
}

impl Default for RecipeBook {
    fn default() -> Self {
        Self::standard()
    }
}
