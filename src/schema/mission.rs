//! The mission document: objectives, dialog, narrative and trigger wiring.
//!
//! Plans arrive as loosely shaped JSON. Fields that the planner emits in
//! several shapes (narrative as string/list/object, flags as map/list,
//! dialog text as string/list) are decoded here, once, into a single
//! canonical shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::catalog::{ObjectDefinition, TileDefinition};
use super::map::{Layout, MapGrid};

/// The verb a player performs on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Talk,
    Interact,
    Heal,
    Magic,
}

impl Action {
    pub fn parse(input: &str) -> Option<Action> {
        match input {
            "talk" => Some(Self::Talk),
            "interact" => Some(Self::Interact),
            "heal" => Some(Self::Heal),
            "magic" => Some(Self::Magic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Talk => "talk",
            Self::Interact => "interact",
            Self::Heal => "heal",
            Self::Magic => "magic",
        }
    }

    /// Talking and healing only make sense on creatures.
    pub fn wants_creature(&self) -> bool {
        matches!(self, Self::Talk | Self::Heal)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A win condition. After assembly exactly one of `target_id` and
/// `target_ids` is populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_category: Option<String>,
}

impl Objective {
    /// The action counted by a `*_count` objective.
    pub fn action(&self) -> Option<Action> {
        self.kind.strip_suffix("_count").and_then(Action::parse)
    }

    /// Target ids in declaration order, whichever field holds them.
    pub fn targets(&self) -> Vec<String> {
        match (&self.target_ids, &self.target_id) {
            (Some(ids), _) if !ids.is_empty() => ids.clone(),
            (_, Some(id)) if !id.is_empty() => vec![id.clone()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Interaction {
    pub fn action_kind(&self) -> Option<Action> {
        Action::parse(&self.action)
    }
}

/// A player choice at the end of a dialog node. Conditions and flag
/// effects are carried opaquely; only the validator inspects them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogChoice {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_flags: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_global_flags: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default, deserialize_with = "text_lines")]
    pub text: Vec<String>,
    #[serde(default)]
    pub choices: Vec<DialogChoice>,
}

impl DialogNode {
    /// Placeholder for a node that is referenced but was never written.
    pub fn stub(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            speaker: None,
            text: vec!["...".to_string()],
            choices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogGraph {
    #[serde(default)]
    pub nodes: Vec<DialogNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    #[serde(default)]
    pub start_by_target: BTreeMap<String, String>,
}

impl DialogGraph {
    pub fn node(&self, id: &str) -> Option<&DialogNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub rect: Rect,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub zone_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
}

/// A progress marker, anchored either to an object or to a tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl Checkpoint {
    pub fn anchor_target(&self) -> Option<&str> {
        self.target_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Mission flags by scope. Accepts either a map or a list of
/// `{flag, value}` entries per scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "FlagsInput")]
pub struct Flags {
    pub local: BTreeMap<String, Value>,
    pub global: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct FlagsInput {
    #[serde(default)]
    local: Option<FlagTable>,
    #[serde(default)]
    global: Option<FlagTable>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagTable {
    Map(BTreeMap<String, Value>),
    List(Vec<FlagEntry>),
}

#[derive(Deserialize)]
struct FlagEntry {
    flag: String,
    #[serde(default)]
    value: Value,
}

impl FlagTable {
    fn into_map(self) -> BTreeMap<String, Value> {
        match self {
            FlagTable::Map(map) => map,
            FlagTable::List(entries) => entries
                .into_iter()
                .filter(|e| !e.flag.is_empty())
                .map(|e| (e.flag, e.value))
                .collect(),
        }
    }
}

impl From<FlagsInput> for Flags {
    fn from(input: FlagsInput) -> Self {
        Flags {
            local: input.local.map(FlagTable::into_map).unwrap_or_default(),
            global: input.global.map(FlagTable::into_map).unwrap_or_default(),
        }
    }
}

/// An intro/outro block: text lines plus an optional dialog to open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BeatInput")]
pub struct NarrativeBeat {
    pub text: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BeatInput {
    Line(String),
    Lines(Vec<String>),
    Block {
        #[serde(default, deserialize_with = "text_lines")]
        text: Vec<String>,
        #[serde(default)]
        dialog: Option<String>,
    },
}

impl From<BeatInput> for NarrativeBeat {
    fn from(input: BeatInput) -> Self {
        match input {
            BeatInput::Line(line) => NarrativeBeat {
                text: non_blank(vec![line]),
                dialog: None,
            },
            BeatInput::Lines(lines) => NarrativeBeat {
                text: non_blank(lines),
                dialog: None,
            },
            BeatInput::Block { text, dialog } => NarrativeBeat { text, dialog },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneBeat {
    #[serde(default)]
    pub zone_id: String,
    #[serde(default, deserialize_with = "text_lines")]
    pub text: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetBeat {
    #[serde(default)]
    pub target_id: String,
    #[serde(default, deserialize_with = "text_lines")]
    pub text: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialog: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<NarrativeBeat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro: Option<NarrativeBeat>,
    #[serde(default)]
    pub on_enter_zones: Vec<ZoneBeat>,
    #[serde(default)]
    pub on_interact: Vec<TargetBeat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<String>) -> Self {
        let status = if errors.is_empty() {
            ValidationStatus::Ok
        } else {
            ValidationStatus::Error
        };
        Self { status, errors }
    }
}

/// The normalized mission document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub dialog: DialogGraph,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default)]
    pub flags: Flags,
    #[serde(default)]
    pub narrative: Narrative,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

/// Everything a client needs to run a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionBundle {
    pub mission: Mission,
    pub map: MapGrid,
    pub tiles: Vec<TileDefinition>,
    pub objects: Vec<ObjectDefinition>,
    #[serde(default)]
    pub plan: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextInput {
    One(String),
    Many(Vec<Value>),
}

/// Accepts `"line"`, `["a", "b"]` or null and yields the non-blank lines.
pub(crate) fn text_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let lines = match Option::<TextInput>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(TextInput::One(line)) => vec![line],
        Some(TextInput::Many(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
    };
    Ok(non_blank(lines))
}

fn non_blank(lines: Vec<String>) -> Vec<String> {
    lines.into_iter().filter(|l| !l.trim().is_empty()).collect()
}
