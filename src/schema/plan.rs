//! Lenient ingestion of planner output.
//!
//! A plan is untrusted JSON. Each section is decoded on its own: a section
//! that does not fit its schema falls back to its default, and a bad list
//! item is dropped without taking its siblings down with it.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use super::map::Layout;
use super::mission::{
    Checkpoint, DialogGraph, DialogNode, Flags, Interaction, Narrative, Objective, Trigger, Zone,
};

/// Decoded plan. `interactions` and `checkpoints` stay `None` when the
/// planner omitted them, so the assembler can synthesize defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub layout: Layout,
    pub objectives: Vec<Objective>,
    pub interactions: Option<Vec<Interaction>>,
    pub dialog: DialogGraph,
    pub zones: Vec<Zone>,
    pub triggers: Vec<Trigger>,
    pub checkpoints: Option<Vec<Checkpoint>>,
    pub flags: Flags,
    pub narrative: Narrative,
}

impl Plan {
    /// Decode a plan, unwrapping a `{"mission": {...}}` envelope if present.
    pub fn from_value(value: &Value) -> Plan {
        let root = match value.get("mission") {
            Some(inner) if inner.is_object() => inner,
            _ => value,
        };
        let Some(obj) = root.as_object() else {
            warn!("plan is not a JSON object; starting from an empty plan");
            return Plan::default();
        };

        Plan {
            title: text_field(obj, "title"),
            subtitle: text_field(obj, "subtitle"),
            summary: text_field(obj, "summary"),
            layout: section(obj, "layout").unwrap_or_default(),
            objectives: list_section(obj, "objectives").unwrap_or_default(),
            interactions: list_section(obj, "interactions"),
            dialog: dialog_section(obj),
            zones: list_section(obj, "zones").unwrap_or_default(),
            triggers: list_section(obj, "triggers").unwrap_or_default(),
            checkpoints: list_section(obj, "checkpoints"),
            flags: section(obj, "flags").unwrap_or_default(),
            narrative: section(obj, "narrative").unwrap_or_default(),
        }
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn section<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    let raw = obj.get(key).filter(|v| !v.is_null())?;
    match T::deserialize(raw) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(section = key, error = %err, "plan section did not decode; using default");
            None
        }
    }
}

fn list_section<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<Vec<T>> {
    let raw = obj.get(key).filter(|v| !v.is_null())?;
    let Some(items) = raw.as_array() else {
        warn!(section = key, "plan section is not a list; treating it as omitted");
        return None;
    };
    let mut decoded = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match T::deserialize(item) {
            Ok(value) => decoded.push(value),
            Err(err) => warn!(section = key, index, error = %err, "dropping plan item"),
        }
    }
    Some(decoded)
}

fn dialog_section(obj: &Map<String, Value>) -> DialogGraph {
    let Some(dialog) = obj.get("dialog").and_then(Value::as_object) else {
        return DialogGraph::default();
    };
    let nodes: Vec<DialogNode> = list_section(dialog, "nodes").unwrap_or_default();
    let entry = text_field(dialog, "entry");
    let start_by_target: BTreeMap<String, String> = dialog
        .get("startByTarget")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(target, node)| Some((target.clone(), node.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default();
    DialogGraph {
        nodes,
        entry,
        start_by_target,
    }
}
