//! Catalog builder: tile and object definitions inferred from an asset
//! manifest.

use rustc_hash::FxHashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::config::CatalogConfig;
use crate::core::naming::{claim_unique, push_unique, slugify, word_tokens};
use crate::schema::catalog::{
    AssetEntry, AssetFile, AssetManifest, ObjectClass, ObjectDefinition, TileDefinition,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AssetManifest {
    /// Load a manifest from a JSON file.
    pub fn load_from_json(path: &Path) -> Result<AssetManifest, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_json(&contents)
    }

    pub fn parse_json(input: &str) -> Result<AssetManifest, CatalogError> {
        Ok(serde_json::from_str(input)?)
    }
}

/// Built-in terrain, used when a manifest carries no tiles.
const DEFAULT_TILES: &[&str] = &["grass", "road", "forest", "water", "mountain", "sand"];

/// Built-in sprites, used when a manifest carries no sprites.
const DEFAULT_SPRITES: &[&str] = &[
    "npc", "squirrel", "rabbit", "bird", "tree", "rock", "flower", "signpost",
];

/// Tile and object definitions available to a generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub tiles: Vec<TileDefinition>,
    pub objects: Vec<ObjectDefinition>,
}

impl Catalog {
    /// Build both catalogs from `manifest`. Either half falls back to the
    /// built-in set when the manifest contributes nothing to it.
    pub fn from_manifest(manifest: &AssetManifest, config: &CatalogConfig) -> Catalog {
        let mut tiles = build_tiles(manifest, config);
        if tiles.is_empty() {
            debug!("manifest has no tiles; using built-in terrain");
            tiles = build_tiles(&builtin_manifest("tileset", DEFAULT_TILES), config);
        }
        let mut objects = build_objects(manifest, config);
        if objects.is_empty() {
            debug!("manifest has no sprites; using built-in sprites");
            objects = build_objects(&builtin_manifest("sprite", DEFAULT_SPRITES), config);
        }
        debug!(tiles = tiles.len(), objects = objects.len(), "catalog built");
        Catalog { tiles, objects }
    }

    /// Tile whose name matches `label`: exact slug first, then any tile
    /// whose name contains the label as a token.
    pub fn tile_named(&self, label: &str) -> Option<&TileDefinition> {
        let label = slugify(label);
        self.tiles
            .iter()
            .find(|t| slugify(&t.name) == label)
            .or_else(|| {
                self.tiles
                    .iter()
                    .find(|t| word_tokens(&t.name).iter().any(|tok| *tok == label))
            })
    }

    pub fn walkable_ids(&self) -> FxHashSet<u32> {
        self.tiles.iter().filter(|t| t.walkable).map(|t| t.id).collect()
    }

    pub fn first_walkable_tile(&self) -> Option<&TileDefinition> {
        self.tiles.iter().find(|t| t.walkable)
    }

    pub fn object(&self, kind: &str) -> Option<&ObjectDefinition> {
        self.objects.iter().find(|o| o.kind == kind)
    }

    pub fn of_class(&self, class: ObjectClass) -> Vec<&ObjectDefinition> {
        self.objects.iter().filter(|o| o.class == class).collect()
    }

    /// Normalized categories of `kind`, including the type itself.
    pub fn categories_of(&self, kind: &str) -> Vec<String> {
        let mut categories = vec![slugify(kind)];
        if let Some(def) = self.object(kind) {
            for category in &def.categories {
                push_unique(&mut categories, &slugify(category));
            }
        }
        categories
    }
}

fn builtin_manifest(kind: &str, names: &[&str]) -> AssetManifest {
    AssetManifest {
        assets: vec![AssetEntry {
            kind: kind.to_string(),
            title: "Built-in".to_string(),
            meta: serde_json::Value::Null,
            files: names
                .iter()
                .map(|name| AssetFile {
                    path: format!("builtin/{kind}/{name}.png"),
                    label: Some(name.to_string()),
                })
                .collect(),
        }],
    }
}

/// Entries of one of `kinds` whose collection tags (if any) are known.
fn accepted_entries<'a>(
    manifest: &'a AssetManifest,
    kinds: &'a [String],
    config: &'a CatalogConfig,
) -> impl Iterator<Item = &'a AssetEntry> + 'a {
    manifest.assets.iter().filter(move |entry| {
        let kind = entry.kind.to_lowercase();
        if !kinds.iter().any(|k| *k == kind) {
            return false;
        }
        let tags = entry.collection_tags();
        config.collections.is_empty()
            || tags.is_empty()
            || tags.iter().any(|t| config.collections.contains(t))
    })
}

/// `(name, asset path)` for every file of an entry, or the entry itself
/// when it lists no files.
fn entry_items(entry: &AssetEntry) -> Vec<(String, String)> {
    if entry.files.is_empty() {
        return vec![(entry.title.clone(), String::new())];
    }
    entry
        .files
        .iter()
        .map(|file| {
            let name = file
                .label
                .clone()
                .filter(|l| !l.trim().is_empty())
                .or_else(|| {
                    Path::new(&file.path)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| entry.title.clone());
            (name, file.path.clone())
        })
        .collect()
}

fn build_tiles(manifest: &AssetManifest, config: &CatalogConfig) -> Vec<TileDefinition> {
    let mut seen = FxHashSet::default();
    let mut tiles = Vec::new();
    for entry in accepted_entries(manifest, &config.tile_types, config) {
        for (name, asset) in entry_items(entry) {
            let slug = slugify(&name);
            if slug.is_empty() || !seen.insert(slug) {
                continue;
            }
            tiles.push(TileDefinition {
                id: tiles.len() as u32,
                walkable: infer_walkable(&name, config),
                color: infer_color(&name, config),
                categories: word_tokens(&name),
                name,
                asset,
            });
        }
    }
    tiles
}

fn build_objects(manifest: &AssetManifest, config: &CatalogConfig) -> Vec<ObjectDefinition> {
    let mut taken = FxHashSet::default();
    let mut objects = Vec::new();
    for entry in accepted_entries(manifest, &config.sprite_types, config) {
        for (name, asset) in entry_items(entry) {
            let slug = slugify(&name);
            if slug.is_empty() {
                continue;
            }
            let kind = claim_unique(&slug, &mut taken);
            let (class, categories) = classify(&name, config);
            objects.push(ObjectDefinition {
                kind,
                name,
                class,
                categories,
                asset,
            });
        }
    }
    objects
}

/// Blocked if the name contains any deny-list fragment.
pub fn infer_walkable(name: &str, config: &CatalogConfig) -> bool {
    let lower = name.to_lowercase();
    !config.blocking.iter().any(|frag| lower.contains(frag.as_str()))
}

pub fn infer_color(name: &str, config: &CatalogConfig) -> String {
    let lower = name.to_lowercase();
    config
        .palette
        .iter()
        .find(|(frag, _)| lower.contains(frag.as_str()))
        .map(|(_, color)| color.clone())
        .unwrap_or_else(|| config.default_color.clone())
}

/// Class plus categories: name tokens, the class name, and the umbrella
/// tag (`animal`, `character` or `prop`).
pub fn classify(name: &str, config: &CatalogConfig) -> (ObjectClass, Vec<String>) {
    let lower = name.to_lowercase();
    let is_animal = config
        .animal_tokens
        .iter()
        .any(|tok| lower.contains(tok.as_str()));
    let is_character = config
        .character_tokens
        .iter()
        .any(|tok| lower.contains(tok.as_str()));

    let mut categories = Vec::new();
    for token in word_tokens(name) {
        push_unique(&mut categories, &token);
    }
    let class = if is_animal || is_character {
        ObjectClass::Creature
    } else {
        ObjectClass::Structure
    };
    push_unique(&mut categories, class.name());
    if is_animal {
        push_unique(&mut categories, "animal");
    }
    if is_character {
        push_unique(&mut categories, "character");
    }
    if class == ObjectClass::Structure {
        push_unique(&mut categories, "prop");
    }
    (class, categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest() -> AssetManifest {
        serde_json::from_value(json!({
            "assets": [
                {"type": "tileset", "title": "Meadow", "meta": {},
                 "files": [
                    {"path": "tiles/grass.png", "label": "Grass"},
                    {"path": "tiles/deep_water.png"},
                    {"path": "tiles/dirt_road.png", "label": "Road"},
                    {"path": "tiles/grass_again.png", "label": "grass"}
                 ]},
                {"type": "sprite", "title": "Friends",
                 "files": [
                    {"path": "sprites/red_squirrel.png", "label": "Red Squirrel"},
                    {"path": "sprites/apple_tree.png", "label": "Apple Tree"},
                    {"path": "sprites/villager.png"}
                 ]},
                {"type": "music", "title": "Theme", "files": [{"path": "theme.ogg"}]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn tiles_get_sequential_ids_and_inferred_walkability() {
        let catalog = Catalog::from_manifest(&manifest(), &CatalogConfig::default());
        let names: Vec<&str> = catalog.tiles.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Grass", "deep_water", "Road"]);
        assert_eq!(
            catalog.tiles.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(catalog.tiles[0].walkable);
        assert!(!catalog.tiles[1].walkable);
        assert_eq!(catalog.tiles[1].color, "#4aa3df");
        assert_eq!(catalog.tiles[0].color, "#7cc96b");
    }

    #[test]
    fn sprites_are_classified() {
        let catalog = Catalog::from_manifest(&manifest(), &CatalogConfig::default());
        let squirrel = catalog.object("red_squirrel").unwrap();
        assert_eq!(squirrel.class, ObjectClass::Creature);
        assert!(squirrel.has_category("squirrel"));
        assert!(squirrel.has_category("animal"));

        let tree = catalog.object("apple_tree").unwrap();
        assert_eq!(tree.class, ObjectClass::Structure);
        assert_eq!(tree.categories, vec!["apple", "tree", "structure", "prop"]);

        let villager = catalog.object("villager").unwrap();
        assert_eq!(villager.class, ObjectClass::Creature);
        assert!(villager.has_category("character"));
        assert!(!villager.has_category("animal"));
    }

    #[test]
    fn empty_manifest_uses_builtins() {
        let catalog = Catalog::from_manifest(&AssetManifest::default(), &CatalogConfig::default());
        assert_eq!(catalog.tiles.len(), DEFAULT_TILES.len());
        assert_eq!(catalog.objects.len(), DEFAULT_SPRITES.len());
        assert!(catalog.tile_named("grass").unwrap().walkable);
        assert!(!catalog.tile_named("water").unwrap().walkable);
        assert!(!catalog.of_class(ObjectClass::Creature).is_empty());
        assert!(!catalog.of_class(ObjectClass::Structure).is_empty());
    }

    #[test]
    fn unknown_collections_are_filtered() {
        let manifest: AssetManifest = serde_json::from_value(json!({
            "assets": [
                {"type": "sprite", "title": "Owl", "meta": {"collection": "spooky"},
                 "files": [{"path": "owl.png"}]},
                {"type": "sprite", "title": "Fox", "meta": {"collection": "meadow"},
                 "files": [{"path": "fox.png"}]}
            ]
        }))
        .unwrap();
        let config = CatalogConfig {
            collections: vec!["meadow".to_string()],
            ..CatalogConfig::default()
        };
        let catalog = Catalog::from_manifest(&manifest, &config);
        let kinds: Vec<&str> = catalog.objects.iter().map(|o| o.kind.as_str()).collect();
        assert_eq!(kinds, vec!["fox"]);
    }

    #[test]
    fn duplicate_sprite_names_get_suffixes() {
        let manifest: AssetManifest = serde_json::from_value(json!({
            "assets": [{"type": "sprite", "title": "Rocks",
                        "files": [{"path": "a/rock.png"}, {"path": "b/rock.png"}]}]
        }))
        .unwrap();
        let catalog = Catalog::from_manifest(&manifest, &CatalogConfig::default());
        let kinds: Vec<&str> = catalog.objects.iter().map(|o| o.kind.as_str()).collect();
        assert_eq!(kinds, vec!["rock", "rock_2"]);
    }

    #[test]
    fn tile_lookup_by_token() {
        let catalog = Catalog::from_manifest(&manifest(), &CatalogConfig::default());
        assert_eq!(catalog.tile_named("water").unwrap().name, "deep_water");
        assert_eq!(catalog.tile_named("road").unwrap().name, "Road");
        assert!(catalog.tile_named("lava").is_none());
    }

    #[test]
    fn categories_include_type() {
        let catalog = Catalog::from_manifest(&manifest(), &CatalogConfig::default());
        let categories = catalog.categories_of("apple_tree");
        assert_eq!(categories[0], "apple_tree");
        assert!(categories.contains(&"prop".to_string()));
        assert_eq!(catalog.categories_of("unknown"), vec!["unknown"]);
    }

    #[test]
    fn parse_manifest_json() {
        let manifest = AssetManifest::parse_json(r#"{"assets": []}"#).unwrap();
        assert!(manifest.assets.is_empty());
        assert!(matches!(
            AssetManifest::parse_json("nope"),
            Err(CatalogError::Json(_))
        ));
    }
}
