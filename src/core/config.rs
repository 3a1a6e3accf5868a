//! Engine tuning data, loadable from RON.
//!
//! Every field has a default, so a RON file only needs to name what it
//! overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub map: MapConfig,
    pub catalog: CatalogConfig,
    pub placement: PlacementConfig,
    pub narrative: NarrativeConfig,
}

impl EngineConfig {
    /// Load a config from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string.
    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        Ok(ron::from_str(input)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub min_size: u32,
    pub max_size: u32,
    pub default_width: u32,
    pub default_height: u32,
    /// Chance of a water (or mountain) cell.
    pub water_chance: f64,
    pub forest_chance: f64,
    pub road_chance: f64,
    /// Biome tokens that turn water rolls into mountains.
    pub mountain_biomes: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            min_size: 8,
            max_size: 48,
            default_width: 16,
            default_height: 12,
            water_chance: 0.08,
            forest_chance: 0.10,
            road_chance: 0.06,
            mountain_biomes: strings(&["mountain", "alpine", "highland", "peak", "volcano"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub tile_types: Vec<String>,
    pub sprite_types: Vec<String>,
    /// Accepted collection tags. Empty accepts every entry.
    pub collections: Vec<String>,
    /// Name fragments that make a tile or sprite block movement.
    pub blocking: Vec<String>,
    /// `(name fragment, hex color)` pairs, first match wins.
    pub palette: Vec<(String, String)>,
    pub default_color: String,
    pub animal_tokens: Vec<String>,
    pub character_tokens: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            tile_types: strings(&["tile", "tiles", "tileset", "terrain"]),
            sprite_types: strings(&[
                "sprite",
                "sprites",
                "spritesheet",
                "character",
                "creature",
                "prop",
                "structure",
            ]),
            collections: Vec::new(),
            blocking: strings(&["water", "mountain", "forest", "canopy", "border", "deep"]),
            palette: [
                ("water", "#4aa3df"),
                ("deep", "#2b6cb0"),
                ("sand", "#e9d8a6"),
                ("road", "#c8a27a"),
                ("path", "#c8a27a"),
                ("forest", "#2f7d4a"),
                ("tree", "#2f7d4a"),
                ("mountain", "#8d8a80"),
                ("rock", "#8d8a80"),
                ("snow", "#f4f6f8"),
                ("flower", "#f2a7c3"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            default_color: "#7cc96b".to_string(),
            animal_tokens: strings(&[
                "squirrel", "rabbit", "bunny", "fox", "deer", "bird", "owl", "bear", "frog",
                "duck", "cat", "dog", "puppy", "kitten", "hedgehog", "mouse", "turtle",
                "butterfly", "bee", "fish", "horse", "pony", "goat", "sheep", "cow", "pig",
                "chicken", "dragon", "unicorn",
            ]),
            character_tokens: strings(&[
                "npc", "villager", "kid", "child", "friend", "wizard", "witch", "knight",
                "farmer", "king", "queen", "prince", "princess", "fairy", "elf", "gnome",
                "person", "girl", "boy", "grandma", "grandpa",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Probability that an ambient decoration is a creature.
    pub creature_weight: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            creature_weight: 0.7,
        }
    }
}

/// Fallback copy for narrative blocks. `{title}` is replaced with the
/// mission title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub default_title: String,
    pub intro: String,
    pub outro: String,
    pub beat: String,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            default_title: "A New Adventure".to_string(),
            intro: "Welcome to {title}! Let's explore.".to_string(),
            outro: "Hooray! You finished {title}.".to_string(),
            beat: "Something interesting is here.".to_string(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
