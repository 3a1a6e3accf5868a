//! Object placement on spawn-reachable cells.
//!
//! Free cells are computed once by BFS from spawn and shuffled; every
//! placement consumes the next cell, so no two objects ever share one.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::core::catalog::Catalog;
use crate::core::config::PlacementConfig;
use crate::core::grid::{Cell, WalkGrid};
use crate::core::naming::{slugify, word_tokens};
use crate::schema::catalog::{ObjectClass, ObjectDefinition};
use crate::schema::map::{MapGrid, PlacedObject};
use crate::schema::mission::{Action, Objective};

/// A target id some part of the mission points at, with whatever hints
/// the reference gives about what the object should be.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredTarget {
    pub id: String,
    pub action: Option<Action>,
    pub category: Option<String>,
}

impl RequiredTarget {
    pub fn new(id: impl Into<String>, action: Option<Action>) -> Self {
        Self {
            id: id.into(),
            action,
            category: None,
        }
    }
}

/// Ambient decoration count: twice the objectives, kept within 3..=10.
pub fn ambient_count(objective_count: usize) -> usize {
    (2 * objective_count).clamp(3, 10)
}

pub struct ObjectPlacer<'a> {
    catalog: &'a Catalog,
    config: &'a PlacementConfig,
    /// Shuffled free cells; the next placement pops from the back.
    open: Vec<Cell>,
    ids: FxHashSet<String>,
}

impl<'a> ObjectPlacer<'a> {
    /// Collect the free cells reachable from `map.spawn`, excluding the
    /// spawn itself and cells that already hold an object.
    pub fn new(
        map: &MapGrid,
        catalog: &'a Catalog,
        config: &'a PlacementConfig,
        rng: &mut StdRng,
    ) -> Self {
        let walk = WalkGrid::from_map(map, &catalog.walkable_ids());
        let spawn = Cell::from(map.spawn);
        let occupied: FxHashSet<Cell> = map
            .objects
            .iter()
            .map(|o| Cell::new(o.x as usize, o.y as usize))
            .collect();
        let mut open: Vec<Cell> = walk
            .reachable_cells(spawn)
            .into_iter()
            .filter(|cell| *cell != spawn && !occupied.contains(cell))
            .collect();
        open.shuffle(rng);
        open.reverse();
        debug!(free_cells = open.len(), "placement pool ready");

        Self {
            catalog,
            config,
            open,
            ids: map.objects.iter().map(|o| o.id.clone()).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.open.len()
    }

    fn place(&mut self, map: &mut MapGrid, id: &str, def: &ObjectDefinition) -> bool {
        let Some(cell) = self.open.pop() else {
            warn!(id, "no reachable cell left for object");
            return false;
        };
        self.ids.insert(id.to_string());
        map.objects.push(PlacedObject {
            id: id.to_string(),
            kind: def.kind.clone(),
            x: cell.x as u32,
            y: cell.y as u32,
        });
        debug!(id, kind = %def.kind, x = cell.x, y = cell.y, "placed object");
        true
    }

    /// Definitions fit for `action`, narrowed by `category` when that
    /// leaves anything.
    fn pool(&self, action: Option<Action>, category: Option<&str>) -> Vec<&'a ObjectDefinition> {
        let catalog: &'a Catalog = self.catalog;
        let class = match action {
            Some(a) if a.wants_creature() => ObjectClass::Creature,
            _ => ObjectClass::Structure,
        };
        let mut pool = catalog.of_class(class);
        if pool.is_empty() {
            pool = catalog.objects.iter().collect();
        }
        if let Some(category) = category.map(slugify).filter(|c| !c.is_empty()) {
            let narrowed: Vec<&'a ObjectDefinition> = pool
                .iter()
                .copied()
                .filter(|def| matches_category(def, &category))
                .collect();
            if !narrowed.is_empty() {
                return narrowed;
            }
        }
        pool
    }

    /// Place every objective's targets and return the objectives with the
    /// ids that were actually placed written back.
    pub fn place_objectives(
        &mut self,
        map: &mut MapGrid,
        objectives: &[Objective],
        rng: &mut StdRng,
    ) -> Vec<Objective> {
        objectives
            .iter()
            .enumerate()
            .map(|(index, objective)| self.place_objective(map, index + 1, objective, rng))
            .collect()
    }

    fn place_objective(
        &mut self,
        map: &mut MapGrid,
        number: usize,
        objective: &Objective,
        rng: &mut StdRng,
    ) -> Objective {
        let action = objective.action();
        let category = objective.target_category.as_deref();
        let pool = self.pool(action, category);
        let provided = objective.targets();
        let requested = objective
            .target_count
            .filter(|c| *c > 0)
            .map(|c| c as usize)
            .unwrap_or_else(|| provided.len().max(1));
        // Ids already on the map cost no cell; everything else needs one.
        let reused = provided.iter().filter(|id| self.ids.contains(*id)).count();
        let count = requested.min(self.remaining() + reused);
        if count < requested {
            warn!(objective = number, requested, count, "not enough free cells for every target");
        }

        let mut placed = Vec::new();
        for slot in 0..count {
            let id = match provided.get(slot) {
                Some(id) => id.clone(),
                None if count == 1 => format!("objective_{number}"),
                None => format!("objective_{number}_{}", slot + 1),
            };
            if placed.contains(&id) {
                continue;
            }
            if self.ids.contains(&id) {
                placed.push(id);
                continue;
            }
            let Some(def) = pool.choose(rng) else {
                warn!(objective = number, "catalog has no objects to place");
                break;
            };
            if !self.place(map, &id, def) {
                break;
            }
            placed.push(id);
        }

        let mut updated = objective.clone();
        if placed.len() == 1 && category.is_none() {
            updated.target_id = placed.pop();
            updated.target_ids = None;
            updated.target_count = Some(1);
        } else if !placed.is_empty() {
            updated.target_id = None;
            updated.target_count = Some(placed.len() as u32);
            updated.target_ids = Some(placed);
        }
        updated
    }

    /// Scatter cosmetic `ambient_{n}` objects, mostly creatures.
    pub fn scatter_ambient(&mut self, map: &mut MapGrid, objective_count: usize, rng: &mut StdRng) {
        let catalog: &'a Catalog = self.catalog;
        let creatures = catalog.of_class(ObjectClass::Creature);
        let structures = catalog.of_class(ObjectClass::Structure);
        let weight = match self.config.creature_weight {
            w if w.is_finite() => w.clamp(0.0, 1.0),
            _ => PlacementConfig::default().creature_weight,
        };
        let mut number = 0;
        for _ in 0..ambient_count(objective_count) {
            if self.open.is_empty() {
                break;
            }
            let prefer_creature = rng.gen_bool(weight);
            let pool = match (prefer_creature, creatures.is_empty(), structures.is_empty()) {
                (true, false, _) | (false, false, true) => &creatures,
                (_, _, false) => &structures,
                _ => break,
            };
            let Some(def) = pool.choose(rng) else {
                break;
            };
            let id = loop {
                number += 1;
                let candidate = format!("ambient_{number}");
                if !self.ids.contains(&candidate) {
                    break candidate;
                }
            };
            self.place(map, &id, def);
        }
    }

    /// Place an object for every required target that is not on the map
    /// yet. Returns the ids that were added.
    pub fn ensure_required(
        &mut self,
        map: &mut MapGrid,
        required: &[RequiredTarget],
        rng: &mut StdRng,
    ) -> Vec<String> {
        let mut added = Vec::new();
        for target in required {
            if target.id.is_empty() || self.ids.contains(&target.id) {
                continue;
            }
            let Some(def) = self.guess_definition(target, rng) else {
                warn!(id = %target.id, "catalog has no objects; reference left dangling");
                continue;
            };
            if self.place(map, &target.id, def) {
                added.push(target.id.clone());
            }
        }
        if !added.is_empty() {
            debug!(count = added.len(), "placed objects for dangling references");
        }
        added
    }

    /// Pick a plausible definition: the category hint first, then any
    /// word of the id itself (`"owl_friend"` finds an owl), then anything
    /// suited to the action.
    fn guess_definition(
        &self,
        target: &RequiredTarget,
        rng: &mut StdRng,
    ) -> Option<&'a ObjectDefinition> {
        let catalog: &'a Catalog = self.catalog;
        if let Some(category) = target.category.as_deref() {
            let category = slugify(category);
            if let Some(def) = catalog
                .objects
                .iter()
                .find(|def| matches_category(def, &category))
            {
                return Some(def);
            }
        }
        let words = word_tokens(&target.id);
        let by_token = catalog
            .objects
            .iter()
            .find(|def| words.iter().any(|word| matches_category(def, word)));
        if let Some(def) = by_token {
            return Some(def);
        }
        let action = target.action.or(Some(Action::Talk));
        self.pool(action, None).choose(rng).copied()
    }
}

fn matches_category(def: &ObjectDefinition, category: &str) -> bool {
    slugify(&def.kind) == category || def.categories.iter().any(|c| slugify(c) == category)
}
