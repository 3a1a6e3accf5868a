use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A terrain tile the map grid can reference by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    pub id: u32,
    pub name: String,
    pub walkable: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Broad class of a placeable object. Creatures take `talk` and `heal`
/// objectives, structures take the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectClass {
    Creature,
    Structure,
}

impl ObjectClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Creature => "creature",
            Self::Structure => "structure",
        }
    }
}

/// A placeable object kind, keyed by its unique `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub class: ObjectClass,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub asset: String,
}

impl ObjectDefinition {
    /// Returns true if this definition carries the given category.
    /// Both sides are expected to be token-normalized already.
    pub fn has_category(&self, category: &str) -> bool {
        self.kind == category || self.categories.iter().any(|c| c == category)
    }
}

/// Asset manifest as published by the art pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub meta: Value,
    #[serde(default)]
    pub files: Vec<AssetFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFile {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl AssetEntry {
    /// Collection tags from `meta.collection` (string) and `meta.tags` (list).
    pub fn collection_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(collection) = self.meta.get("collection").and_then(Value::as_str) {
            tags.push(collection.to_lowercase());
        }
        if let Some(list) = self.meta.get("tags").and_then(Value::as_array) {
            tags.extend(list.iter().filter_map(Value::as_str).map(str::to_lowercase));
        }
        tags
    }
}
