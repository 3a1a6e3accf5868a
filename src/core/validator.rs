//! Structural, referential and reachability checks over a mission bundle.
//!
//! The checks run over raw JSON so that a bundle which would not even
//! deserialize can still be inspected: a container of the wrong kind is
//! reported once and then treated as empty, and every other section is
//! still checked. Nothing here repairs; every defect lands in one flat
//! list of messages.

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use tracing::{info, warn};

use crate::core::grid::{Cell, WalkGrid};
use crate::core::naming::{push_unique, slugify};
use crate::schema::mission::{Action, MissionBundle, ValidationReport};

static NULL: Value = Value::Null;

const CONDITION_TYPES: [&str; 5] = [
    "flag",
    "first_time",
    "first_time_speaking",
    "first_time_speaking_to",
    "event",
];
const FLAG_OPERATORS: [&str; 7] = ["==", "!=", ">", ">=", "<", "<=", "contains"];
const FLAG_SCOPES: [&str; 2] = ["local", "global"];

/// Largest grid the validator will build a walk mask for.
const MAX_CELLS: i64 = 1 << 20;

/// Check a typed bundle. An empty list means the mission is valid.
pub fn validate(bundle: &MissionBundle) -> Vec<String> {
    match serde_json::to_value(bundle) {
        Ok(value) => validate_value(&value),
        Err(err) => vec![format!("Bundle could not be serialized: {err}")],
    }
}

/// Check a bundle given as JSON. `mission.validation` is ignored, so
/// checking a certified bundle gives the same result as before.
pub fn validate_value(bundle: &Value) -> Vec<String> {
    let mut v = Validator::default();
    if !bundle.is_object() {
        v.push("Bundle must be a JSON object");
    }

    let tiles = v.section(bundle, "tiles", Shape::List, true, "tiles");
    let objects = v.section(bundle, "objects", Shape::List, true, "objects");
    let map = v.section(bundle, "map", Shape::Object, true, "map");
    let mission = v.section(bundle, "mission", Shape::Object, true, "mission");

    v.check_tiles(items(tiles));
    v.check_object_definitions(items(objects));
    v.check_grid(map);
    v.check_spawn(map);
    v.check_placed_objects(map);

    v.check_dialog(mission);
    v.check_objectives(mission);
    v.check_zones(mission);
    v.check_triggers(mission);
    v.check_interactions(mission);
    v.check_objective_interactions();
    v.check_flags(mission);
    v.check_narrative(mission);
    v.check_checkpoints(mission);

    v.check_dialog_reachability();
    v.check_spatial_reachability();

    let status = if v.errors.is_empty() { "ok" } else { "error" };
    info!(status, errors = v.errors.len(), "validated mission");
    v.errors
}

/// Validate and record the result on `mission.validation`.
pub fn certify(bundle: &mut MissionBundle) -> Vec<String> {
    let errors = validate(bundle);
    bundle.mission.validation = Some(ValidationReport::from_errors(errors.clone()));
    errors
}

/// JSON counterpart of [`certify`]. The report is only written when
/// `mission` is an object.
pub fn certify_value(bundle: &mut Value) -> Vec<String> {
    let errors = validate_value(bundle);
    let report = ValidationReport::from_errors(errors.clone());
    match serde_json::to_value(&report) {
        Ok(report) => {
            if let Some(mission) = bundle.get_mut("mission").and_then(Value::as_object_mut) {
                mission.insert("validation".to_string(), report);
            }
        }
        Err(err) => warn!(error = %err, "could not record validation report"),
    }
    errors
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    List,
    Object,
}

impl Shape {
    fn matches(self, value: &Value) -> bool {
        match self {
            Shape::List => value.is_array(),
            Shape::Object => value.is_object(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::List => f.write_str("a list"),
            Shape::Object => f.write_str("an object"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Placed<'v> {
    kind: &'v str,
    cell: Option<(i64, i64)>,
}

#[derive(Debug, Clone, Copy)]
struct ZoneRect {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
}

struct ObjectiveTargets<'v> {
    number: usize,
    action: Option<Action>,
    targets: Vec<&'v str>,
}

#[derive(Default)]
struct Validator<'v> {
    errors: Vec<String>,
    /// Tile id to walkability.
    tiles: FxHashMap<i64, bool>,
    /// Object type to its normalized categories, type included.
    categories: FxHashMap<&'v str, Vec<String>>,
    walk: WalkGrid,
    spawn: Option<Cell>,
    placed: FxHashMap<&'v str, Placed<'v>>,
    nodes: FxHashSet<&'v str>,
    /// Node id to choice targets, in node order.
    edges: Vec<(&'v str, Vec<&'v str>)>,
    entry_points: Vec<&'v str>,
    zones: FxHashSet<&'v str>,
    zone_rects: Vec<(String, ZoneRect)>,
    objectives: Vec<ObjectiveTargets<'v>>,
    interactions: Vec<(&'v str, &'v str)>,
}

impl<'v> Validator<'v> {
    fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// `parent[key]` if it has the right shape. Otherwise reports it (a
    /// missing optional section is fine) and hands back null.
    fn section(
        &mut self,
        parent: &'v Value,
        key: &str,
        shape: Shape,
        required: bool,
        label: &str,
    ) -> &'v Value {
        match parent.get(key) {
            None | Some(Value::Null) if !required => &NULL,
            Some(value) if shape.matches(value) => value,
            _ => {
                self.push(format!("{label} must be {shape}"));
                &NULL
            }
        }
    }

    fn check_tiles(&mut self, tiles: &'v [Value]) {
        for (index, tile) in tiles.iter().enumerate() {
            let number = index + 1;
            if !tile.is_object() {
                self.push(format!("Tile #{number} must be an object"));
                continue;
            }
            let Some(id) = int(tile.get("id")) else {
                self.push(format!("Tile #{number} id must be an integer"));
                continue;
            };
            if self.tiles.contains_key(&id) {
                self.push(format!("Duplicate tile id {id}"));
                continue;
            }
            if text(tile.get("name")).is_none() {
                self.push(format!("Tile {id} is missing a name"));
            }
            let walkable = tile.get("walkable").and_then(Value::as_bool);
            if walkable.is_none() {
                self.push(format!("Tile {id} walkable must be a boolean"));
            }
            self.tiles.insert(id, walkable.unwrap_or(false));
        }
    }

    fn check_object_definitions(&mut self, objects: &'v [Value]) {
        for (index, def) in objects.iter().enumerate() {
            let number = index + 1;
            if !def.is_object() {
                self.push(format!("Object definition #{number} must be an object"));
                continue;
            }
            let Some(kind) = text(def.get("type")) else {
                self.push(format!("Object definition #{number} is missing a type"));
                continue;
            };
            if self.categories.contains_key(kind) {
                self.push(format!("Duplicate object type '{kind}'"));
                continue;
            }
            let mut categories = vec![slugify(kind)];
            for category in items(def.get("categories").unwrap_or(&NULL)) {
                if let Some(category) = category.as_str() {
                    push_unique(&mut categories, &slugify(category));
                }
            }
            self.categories.insert(kind, categories);
        }
    }

    fn check_grid(&mut self, map: &'v Value) {
        let (width, height) = match (int(map.get("width")), int(map.get("height"))) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                self.push("Map width and height must be positive integers");
                (0, 0)
            }
        };
        if width.saturating_mul(height) > MAX_CELLS {
            self.push(format!("Map {width}x{height} is too large"));
            return;
        }
        let cells = items(self.section(map, "tiles", Shape::List, true, "Map tiles"));
        let expected = width * height;
        if width > 0 && cells.len() as i64 != expected {
            self.push(format!(
                "Map has {} tiles but {width}x{height} needs {expected}",
                cells.len()
            ));
        }

        let mut unknown: BTreeMap<String, usize> = BTreeMap::new();
        for cell in cells {
            match int(Some(cell)) {
                Some(id) if self.tiles.contains_key(&id) => {}
                Some(id) => *unknown.entry(id.to_string()).or_default() += 1,
                None => *unknown.entry(cell.to_string()).or_default() += 1,
            }
        }
        for (id, count) in unknown {
            self.push(format!("Map uses unknown tile id {id} in {count} cell(s)"));
        }

        let mask: Vec<bool> = (0..expected as usize)
            .map(|i| {
                cells
                    .get(i)
                    .and_then(|c| int(Some(c)))
                    .and_then(|id| self.tiles.get(&id).copied())
                    .unwrap_or(false)
            })
            .collect();
        self.walk = WalkGrid::from_mask(width as usize, height as usize, mask);
    }

    fn check_spawn(&mut self, map: &'v Value) {
        let spawn = map.get("spawn").unwrap_or(&NULL);
        let (Some(x), Some(y)) = (int(spawn.get("tx")), int(spawn.get("ty"))) else {
            self.push("Spawn must have integer tx and ty");
            return;
        };
        if !self.walk.in_bounds(x, y) {
            self.push(format!("Spawn ({x},{y}) is out of bounds"));
        } else if !self.walk.is_walkable_at(x, y) {
            self.push(format!("Spawn ({x},{y}) is not on a walkable tile"));
        } else {
            self.spawn = Some(Cell::new(x as usize, y as usize));
        }
    }

    fn check_placed_objects(&mut self, map: &'v Value) {
        let objects = items(self.section(map, "objects", Shape::List, false, "Map objects"));
        let mut occupied: FxHashMap<(i64, i64), &'v str> = FxHashMap::default();
        for (index, object) in objects.iter().enumerate() {
            let Some(id) = text(object.get("id")) else {
                self.push(format!("Placed object #{} is missing an id", index + 1));
                continue;
            };
            if self.placed.contains_key(id) {
                self.push(format!("Duplicate placed object id '{id}'"));
                continue;
            }
            let kind = text(object.get("type")).unwrap_or_default();
            if !self.categories.contains_key(kind) {
                self.push(format!("Object '{id}' has unknown type '{kind}'"));
            }
            let cell = match (int(object.get("x")), int(object.get("y"))) {
                (Some(x), Some(y)) => Some((x, y)),
                _ => None,
            };
            self.placed.insert(id, Placed { kind, cell });

            let Some((x, y)) = cell else {
                self.push(format!("Object '{id}' must have integer x and y"));
                continue;
            };
            if !self.walk.in_bounds(x, y) {
                self.push(format!("Object '{id}' at ({x},{y}) is out of bounds"));
            } else if let Some(other) = occupied.get(&(x, y)) {
                self.push(format!("Object '{id}' shares cell ({x},{y}) with '{other}'"));
            } else if !self.walk.is_walkable_at(x, y) {
                self.push(format!("Object '{id}' at ({x},{y}) is not on a walkable tile"));
            }
            occupied.entry((x, y)).or_insert(id);
        }
    }

    fn check_dialog(&mut self, mission: &'v Value) {
        let dialog = self.section(mission, "dialog", Shape::Object, false, "dialog");
        let nodes = items(self.section(dialog, "nodes", Shape::List, false, "dialog.nodes"));

        for (index, node) in nodes.iter().enumerate() {
            match text(node.get("id")) {
                Some(id) => {
                    if !self.nodes.insert(id) {
                        self.push(format!("Duplicate dialog node id '{id}'"));
                    }
                }
                None => self.push(format!("Dialog node #{} is missing an id", index + 1)),
            }
        }

        for (index, node) in nodes.iter().enumerate() {
            let id = text(node.get("id"));
            let name = id.map_or_else(|| format!("#{}", index + 1), |id| format!("'{id}'"));
            if !matches!(node.get("text"), Some(Value::Array(_))) {
                self.push(format!("Dialog node {name} text must be a list"));
            }
            let label = format!("Dialog node {name} choices");
            let choices = items(self.section(node, "choices", Shape::List, false, &label));
            let mut targets = Vec::new();
            for (choice_index, choice) in choices.iter().enumerate() {
                let here = format!("Dialog node {name} choice #{}", choice_index + 1);
                if let Some(to) = self.check_choice(&here, choice) {
                    targets.push(to);
                }
            }
            if let Some(id) = id {
                if !self.edges.iter().any(|(known, _)| *known == id) {
                    self.edges.push((id, targets));
                }
            }
        }

        match dialog.get("entry") {
            None | Some(Value::Null) => {}
            Some(entry) => match entry.as_str() {
                Some(entry) if self.nodes.contains(entry) => self.entry_points.push(entry),
                Some(entry) => self.push(format!("Dialog entry '{entry}' does not match any node")),
                None => self.push("Dialog entry must be a node id"),
            },
        }

        let by_target = self.section(
            dialog,
            "startByTarget",
            Shape::Object,
            false,
            "dialog.startByTarget",
        );
        let Some(by_target) = by_target.as_object() else {
            return;
        };
        for (target, node) in by_target {
            if !self.placed.contains_key(target.as_str()) {
                self.push(format!(
                    "startByTarget key '{target}' does not match any placed object"
                ));
            }
            match node.as_str() {
                Some(node) if self.nodes.contains(node) => self.entry_points.push(node),
                Some(node) => self.push(format!(
                    "startByTarget['{target}'] points to unknown node '{node}'"
                )),
                None => self.push(format!("startByTarget['{target}'] must be a node id")),
            }
        }
    }

    /// Check one choice; returns its resolved `to`.
    fn check_choice(&mut self, here: &str, choice: &'v Value) -> Option<&'v str> {
        if !choice.is_object() {
            self.push(format!("{here} must be an object"));
            return None;
        }
        let label = format!("{here} conditions");
        let conditions = items(self.section(choice, "conditions", Shape::List, false, &label));
        for (index, condition) in conditions.iter().enumerate() {
            self.check_condition(&format!("{here} condition #{}", index + 1), condition);
        }
        for key in ["setFlags", "setGlobalFlags"] {
            let label = format!("{here} {key}");
            let effects = items(self.section(choice, key, Shape::List, false, &label));
            for (index, effect) in effects.iter().enumerate() {
                self.check_flag_effect(&format!("{label} entry #{}", index + 1), effect);
            }
        }

        match choice.get("to") {
            None | Some(Value::Null) => None,
            Some(to) => match to.as_str() {
                Some(to) if self.nodes.contains(to) => Some(to),
                Some(to) => {
                    self.push(format!("{here} points to unknown node '{to}'"));
                    None
                }
                None => {
                    self.push(format!("{here} 'to' must be a node id"));
                    None
                }
            },
        }
    }

    fn check_condition(&mut self, at: &str, condition: &Value) {
        let Some(kind) = text(condition.get("type")) else {
            self.push(format!("{at} is missing a type"));
            return;
        };
        if !CONDITION_TYPES.contains(&kind) {
            self.push(format!("{at} has unknown type '{kind}'"));
            return;
        }
        match kind {
            "flag" => {
                if text(condition.get("flag")).is_none() {
                    self.push(format!("{at} needs a flag"));
                }
                match condition.get("op") {
                    None | Some(Value::Null) => {}
                    Some(op) => match op.as_str() {
                        Some(op) if FLAG_OPERATORS.contains(&op) => {
                            if condition.get("value").is_none() {
                                self.push(format!("{at} needs a value for operator '{op}'"));
                            }
                        }
                        _ => self.push(format!("{at} has invalid operator {}", shown(Some(op)))),
                    },
                }
            }
            "first_time_speaking_to" => {
                if text(condition.get("target")).is_none() {
                    self.push(format!("{at} needs a target"));
                }
            }
            "event" => {
                if text(condition.get("event")).is_none() {
                    self.push(format!("{at} needs an event"));
                }
            }
            _ => {}
        }
    }

    fn check_flag_effect(&mut self, at: &str, effect: &Value) {
        if !effect.is_object() {
            self.push(format!("{at} must be an object"));
            return;
        }
        if text(effect.get("flag")).is_none() {
            self.push(format!("{at} is missing a flag"));
        }
        match effect.get("scope") {
            None | Some(Value::Null) => {}
            Some(scope) => {
                if !scope.as_str().is_some_and(|s| FLAG_SCOPES.contains(&s)) {
                    self.push(format!("{at} has invalid scope {}", shown(Some(scope))));
                }
            }
        }
    }

    fn check_objectives(&mut self, mission: &'v Value) {
        let objectives = items(self.section(mission, "objectives", Shape::List, false, "objectives"));
        for (index, objective) in objectives.iter().enumerate() {
            let number = index + 1;
            let owner = format!("Objective #{number}");
            if !objective.is_object() {
                self.push(format!("{owner} must be an object"));
                continue;
            }

            let kind = objective.get("type");
            let action = text(kind)
                .and_then(|k| k.strip_suffix("_count"))
                .and_then(Action::parse);
            if action.is_none() {
                self.push(format!("{owner} has invalid type {}", shown(kind)));
            }

            let count = match objective.get("targetCount") {
                None | Some(Value::Null) => None,
                Some(raw) => match int(Some(raw)) {
                    Some(c) if c > 0 => Some(c),
                    _ => {
                        self.push(format!("{owner} targetCount must be a positive integer"));
                        None
                    }
                },
            };
            let target_id = match objective.get("targetId") {
                None | Some(Value::Null) => None,
                Some(raw) => match text(Some(raw)) {
                    Some(id) => Some(id),
                    None => {
                        self.push(format!("{owner} targetId must be a non-empty string"));
                        None
                    }
                },
            };
            let target_ids: Option<Vec<&'v str>> = match objective.get("targetIds") {
                None | Some(Value::Null) => None,
                Some(Value::Array(raw)) => {
                    let ids: Vec<&'v str> = raw.iter().filter_map(|v| text(Some(v))).collect();
                    if ids.len() != raw.len() {
                        self.push(format!("{owner} targetIds must contain only non-empty strings"));
                    }
                    Some(ids)
                }
                Some(_) => {
                    self.push(format!("{owner} targetIds must be a list"));
                    None
                }
            };

            if target_id.is_some() && target_ids.is_some() {
                self.push(format!("{owner} sets both targetId and targetIds"));
            }
            if target_id.is_none() && target_ids.as_ref().map_or(true, Vec::is_empty) {
                self.push(format!("{owner} has no targetId or targetIds"));
            }

            if let Some(ids) = &target_ids {
                let mut seen = FxHashSet::default();
                for id in ids {
                    if !seen.insert(*id) {
                        self.push(format!("{owner} lists target '{id}' more than once in targetIds"));
                    }
                }
            }
            let mut targets: Vec<&'v str> = Vec::new();
            for id in target_id.into_iter().chain(target_ids.iter().flatten().copied()) {
                if targets.contains(&id) {
                    continue;
                }
                targets.push(id);
                if !self.placed.contains_key(id) {
                    self.push(format!("{owner} target '{id}' does not match any placed object"));
                }
            }

            if let (Some(count), Some(ids)) = (count, target_ids.as_ref()) {
                if count as usize != ids.len() {
                    self.push(format!(
                        "{owner} targetCount {count} does not match {} targetIds",
                        ids.len()
                    ));
                }
            }
            if let Some(count) = count.filter(|c| *c > 1) {
                if target_ids.is_none() {
                    self.push(format!("{owner} targetCount {count} needs targetIds"));
                }
            }

            match objective.get("targetCategory") {
                None | Some(Value::Null) => {}
                Some(raw) => match text(Some(raw)) {
                    Some(_) if target_ids.is_none() => {
                        self.push(format!("{owner} targetCategory needs targetIds"));
                    }
                    Some(category) => self.check_target_category(&owner, category, &targets),
                    None => self.push(format!("{owner} targetCategory must be a non-empty string")),
                },
            }

            self.objectives.push(ObjectiveTargets {
                number,
                action,
                targets,
            });
        }
    }

    fn check_target_category(&mut self, owner: &str, category: &str, targets: &[&'v str]) {
        let wanted = slugify(category);
        for id in targets {
            let Some(placed) = self.placed.get(id).copied() else {
                continue;
            };
            let matches = match self.categories.get(placed.kind) {
                Some(categories) => categories.contains(&wanted),
                None => slugify(placed.kind) == wanted,
            };
            if !matches {
                self.push(format!(
                    "{owner} target '{id}' does not match targetCategory '{category}'"
                ));
            }
        }
    }

    fn check_zones(&mut self, mission: &'v Value) {
        let zones = items(self.section(mission, "zones", Shape::List, false, "zones"));
        for (index, zone) in zones.iter().enumerate() {
            let id = text(zone.get("id"));
            let name = match id {
                Some(id) => {
                    if !self.zones.insert(id) {
                        self.push(format!("Duplicate zone id '{id}'"));
                    }
                    format!("'{id}'")
                }
                None => {
                    self.push(format!("Zone #{} is missing an id", index + 1));
                    format!("#{}", index + 1)
                }
            };
            let rect = zone.get("rect").unwrap_or(&NULL);
            let fields = ["x", "y", "w", "h"].map(|key| int(rect.get(key)));
            let [Some(x), Some(y), Some(w), Some(h)] = fields else {
                self.push(format!(
                    "Zone {name} rect must have non-negative integer x, y, w and h"
                ));
                continue;
            };
            if x < 0 || y < 0 || w < 0 || h < 0 {
                self.push(format!(
                    "Zone {name} rect must have non-negative integer x, y, w and h"
                ));
                continue;
            }
            let width = self.walk.width() as i64;
            let height = self.walk.height() as i64;
            if x.saturating_add(w) > width || y.saturating_add(h) > height {
                self.push(format!("Zone {name} rect is out of bounds"));
                continue;
            }
            self.zone_rects.push((name, ZoneRect { x, y, w, h }));
        }
    }

    fn check_triggers(&mut self, mission: &'v Value) {
        let triggers = items(self.section(mission, "triggers", Shape::List, false, "triggers"));
        let mut seen = FxHashSet::default();
        for (index, trigger) in triggers.iter().enumerate() {
            let name = match text(trigger.get("id")) {
                Some(id) => {
                    if !seen.insert(id) {
                        self.push(format!("Duplicate trigger id '{id}'"));
                    }
                    format!("'{id}'")
                }
                None => {
                    self.push(format!("Trigger #{} is missing an id", index + 1));
                    format!("#{}", index + 1)
                }
            };
            match text(trigger.get("zoneId")) {
                Some(zone) if self.zones.contains(zone) => {}
                Some(zone) => self.push(format!("Trigger {name} references unknown zone '{zone}'")),
                None => self.push(format!("Trigger {name} is missing a zoneId")),
            }
            self.check_dialog_ref(&format!("Trigger {name}"), trigger.get("dialog"), true);
        }
    }

    fn check_interactions(&mut self, mission: &'v Value) {
        let interactions =
            items(self.section(mission, "interactions", Shape::List, false, "interactions"));
        for (index, interaction) in interactions.iter().enumerate() {
            let owner = format!("Interaction #{}", index + 1);
            if !interaction.is_object() {
                self.push(format!("{owner} must be an object"));
                continue;
            }
            let target = text(interaction.get("targetId"));
            match target {
                Some(target) if self.placed.contains_key(target) => {}
                Some(target) => self.push(format!(
                    "{owner} target '{target}' does not match any placed object"
                )),
                None => self.push(format!("{owner} is missing a targetId")),
            }
            let action = interaction.get("action");
            let verb = text(action).filter(|a| Action::parse(a).is_some());
            if verb.is_none() {
                self.push(format!("{owner} has invalid action {}", shown(action)));
            }
            if let (Some(target), Some(verb)) = (target, verb) {
                self.interactions.push((target, verb));
            }
            self.check_dialog_ref(&owner, interaction.get("dialog"), true);
        }
    }

    /// Every counted target needs an interaction with the counted verb.
    fn check_objective_interactions(&mut self) {
        let mut missing = Vec::new();
        let no_interactions = self.interactions.is_empty();
        for objective in &self.objectives {
            let Some(action) = objective.action else {
                continue;
            };
            let owner = format!("Objective #{}", objective.number);
            if no_interactions {
                missing.push(format!(
                    "{owner} needs a '{action}' interaction but the mission has none"
                ));
                continue;
            }
            for target in &objective.targets {
                let covered = self
                    .interactions
                    .iter()
                    .any(|(t, verb)| t == target && *verb == action.as_str());
                if !covered {
                    missing.push(format!(
                        "{owner} target '{target}' has no '{action}' interaction"
                    ));
                }
            }
        }
        self.errors.extend(missing);
    }

    fn check_flags(&mut self, mission: &'v Value) {
        let flags = self.section(mission, "flags", Shape::Object, false, "flags");
        for scope in FLAG_SCOPES {
            self.section(flags, scope, Shape::Object, false, &format!("flags.{scope}"));
        }
    }

    fn check_narrative(&mut self, mission: &'v Value) {
        let narrative = self.section(mission, "narrative", Shape::Object, false, "narrative");
        for key in ["intro", "outro"] {
            let Some(beat) = narrative.get(key).filter(|b| !b.is_null()) else {
                continue;
            };
            let owner = format!("Narrative {key}");
            if !has_text(Some(beat)) {
                self.push(format!("{owner} has no text"));
            }
            self.check_dialog_ref(&owner, beat.get("dialog"), false);
        }

        let label = "narrative.onEnterZones";
        let beats = items(self.section(narrative, "onEnterZones", Shape::List, false, label));
        for (index, beat) in beats.iter().enumerate() {
            let owner = format!("Narrative onEnterZones #{}", index + 1);
            let zone = beat.get("zoneId");
            if !text(zone).is_some_and(|z| self.zones.contains(z)) {
                self.push(format!("{owner} references unknown zone {}", shown(zone)));
            }
            self.check_beat_body(&owner, beat);
        }

        let label = "narrative.onInteract";
        let beats = items(self.section(narrative, "onInteract", Shape::List, false, label));
        for (index, beat) in beats.iter().enumerate() {
            let owner = format!("Narrative onInteract #{}", index + 1);
            let target = beat.get("targetId");
            if !text(target).is_some_and(|t| self.placed.contains_key(t)) {
                self.push(format!(
                    "{owner} target {} does not match any placed object",
                    shown(target)
                ));
            }
            self.check_beat_body(&owner, beat);
        }
    }

    fn check_beat_body(&mut self, owner: &str, beat: &'v Value) {
        let dialog = beat.get("dialog").filter(|d| !d.is_null());
        if !has_text(beat.get("text")) && dialog.is_none() {
            self.push(format!("{owner} needs text or a dialog"));
        }
        self.check_dialog_ref(owner, dialog, false);
    }

    /// A dialog reference must name a node. Entry-point references also
    /// seed the reachability search.
    fn check_dialog_ref(&mut self, owner: &str, dialog: Option<&'v Value>, entry_point: bool) {
        match dialog {
            None | Some(Value::Null) => {}
            Some(raw) => match raw.as_str() {
                Some(id) if self.nodes.contains(id) => {
                    if entry_point {
                        self.entry_points.push(id);
                    }
                }
                Some(id) => self.push(format!("{owner} references unknown dialog '{id}'")),
                None => self.push(format!("{owner} dialog must be a node id")),
            },
        }
    }

    fn check_checkpoints(&mut self, mission: &'v Value) {
        let checkpoints =
            items(self.section(mission, "checkpoints", Shape::List, false, "checkpoints"));
        let mut seen = FxHashSet::default();
        for (index, checkpoint) in checkpoints.iter().enumerate() {
            let name = match text(checkpoint.get("id")) {
                Some(id) => {
                    if !seen.insert(id) {
                        self.push(format!("Duplicate checkpoint id '{id}'"));
                    }
                    format!("'{id}'")
                }
                None => format!("#{}", index + 1),
            };
            if let Some(target) = text(checkpoint.get("targetId")) {
                if !self.placed.contains_key(target) {
                    self.push(format!(
                        "Checkpoint {name} target '{target}' does not match any placed object"
                    ));
                }
                continue;
            }
            match (int(checkpoint.get("tx")), int(checkpoint.get("ty"))) {
                (Some(x), Some(y)) if !self.walk.in_bounds(x, y) => {
                    self.push(format!("Checkpoint {name} at ({x},{y}) is out of bounds"));
                }
                (Some(x), Some(y)) if !self.walk.is_walkable_at(x, y) => {
                    self.push(format!(
                        "Checkpoint {name} at ({x},{y}) is not on a walkable tile"
                    ));
                }
                (Some(_), Some(_)) => {}
                _ => self.push(format!(
                    "Checkpoint {name} needs a targetId or integer tx and ty"
                )),
            }
        }
    }

    /// BFS over choices from every declared entry point.
    fn check_dialog_reachability(&mut self) {
        if self.edges.is_empty() {
            return;
        }
        if self.entry_points.is_empty() {
            self.push(format!(
                "Dialog has {} node(s) but no entry points",
                self.edges.len()
            ));
            return;
        }
        let adjacency: FxHashMap<&str, &[&str]> = self
            .edges
            .iter()
            .map(|(id, targets)| (*id, targets.as_slice()))
            .collect();
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for entry in &self.entry_points {
            if visited.insert(*entry) {
                queue.push_back(*entry);
            }
        }
        while let Some(id) = queue.pop_front() {
            for next in adjacency.get(id).copied().unwrap_or_default() {
                if visited.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
        let orphans: Vec<String> = self
            .edges
            .iter()
            .filter(|(id, _)| !visited.contains(id))
            .map(|(id, _)| format!("Dialog node '{id}' is unreachable from every entry point"))
            .collect();
        self.errors.extend(orphans);
    }

    /// BFS over walkable tiles from spawn: objective targets and zones
    /// must be reachable.
    fn check_spatial_reachability(&mut self) {
        let Some(spawn) = self.spawn else {
            return;
        };
        let visited = self.walk.reachable_from(spawn);
        let reached = |x: i64, y: i64| {
            self.walk.in_bounds(x, y)
                && self
                    .walk
                    .index(Cell::new(x as usize, y as usize))
                    .is_some_and(|i| visited[i])
        };

        let mut errors = Vec::new();
        for objective in &self.objectives {
            for id in &objective.targets {
                let Some(placed) = self.placed.get(id) else {
                    continue;
                };
                let Some((x, y)) = placed.cell else {
                    continue;
                };
                if !reached(x, y) {
                    errors.push(format!(
                        "Object '{id}' for objective #{} is unreachable from spawn",
                        objective.number
                    ));
                }
            }
        }
        for (name, rect) in &self.zone_rects {
            let overlaps = (rect.y..rect.y + rect.h)
                .any(|y| (rect.x..rect.x + rect.w).any(|x| reached(x, y)));
            if !overlaps {
                errors.push(format!("Zone {name} has no tile reachable from spawn"));
            }
        }
        self.errors.extend(errors);
    }
}

fn items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// Integer value, accepting integral floats.
fn int(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    })
}

/// Non-blank string value.
fn text(value: Option<&Value>) -> Option<&str> {
    value?.as_str().filter(|s| !s.trim().is_empty())
}

/// A line, a list with a non-blank line, or a block whose `text` is one.
fn has_text(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(lines)) => lines
            .iter()
            .any(|l| l.as_str().is_some_and(|s| !s.trim().is_empty())),
        Some(Value::Object(block)) => has_text(block.get("text")),
        _ => false,
    }
}

fn shown(value: Option<&Value>) -> String {
    match value {
        None => "(missing)".to_string(),
        Some(Value::String(s)) => format!("'{s}'"),
        Some(other) => other.to_string(),
    }
}
