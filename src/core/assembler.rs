//! The generation pipeline: plan → catalog → map → placement → repair.
//!
//! Built via `MissionForge::builder()`. Generation itself never fails; the
//! only fallible step is loading configuration and the asset manifest.

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::core::catalog::{Catalog, CatalogError};
use crate::core::config::{ConfigError, EngineConfig};
use crate::core::dialog::{close_dialog_graph, default_entry, normalize_dialog_ids};
use crate::core::grid::WalkGrid;
use crate::core::mapgen::MapGenerator;
use crate::core::normalize::{
    align_categories, backfill_target_ids, default_checkpoints, fill_narrative,
    repair_checkpoints, repair_zones, required_targets, synthesize_interactions,
};
use crate::core::placer::ObjectPlacer;
use crate::core::seed::Seed;
use crate::core::validator;
use crate::schema::catalog::AssetManifest;
use crate::schema::map::{Layout, MapSize};
use crate::schema::mission::{Mission, MissionBundle};
use crate::schema::plan::Plan;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a plan file as JSON.
pub fn load_plan(path: &Path) -> Result<Value, ForgeError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Generate with the default configuration.
pub fn generate(plan: &Value, seed: &Seed, manifest: &AssetManifest) -> MissionBundle {
    MissionForge::new(EngineConfig::default(), manifest).generate(plan, seed)
}

/// A configured generator. Holds the catalog built from the manifest so
/// repeated generations share it.
#[derive(Debug, Clone)]
pub struct MissionForge {
    config: EngineConfig,
    catalog: Catalog,
}

/// Builder for constructing a `MissionForge`.
#[derive(Debug, Default)]
pub struct MissionForgeBuilder {
    config_path: Option<PathBuf>,
    manifest_path: Option<PathBuf>,
    /// Directly provided config (for testing without files).
    config: Option<EngineConfig>,
    /// Directly provided manifest (for testing without files).
    manifest: Option<AssetManifest>,
}

impl MissionForge {
    pub fn builder() -> MissionForgeBuilder {
        MissionForgeBuilder::default()
    }

    pub fn new(config: EngineConfig, manifest: &AssetManifest) -> Self {
        let catalog = Catalog::from_manifest(manifest, &config.catalog);
        Self { config, catalog }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Build a complete bundle from an untrusted plan. The same
    /// `(plan, seed)` always yields the same bundle.
    pub fn generate(&self, plan: &Value, seed: &Seed) -> MissionBundle {
        let parsed = Plan::from_value(plan);
        let mut rng = seed.rng();

        // 1. Terrain and spawn
        let mut map =
            MapGenerator::new(&self.config.map, &self.catalog).generate(&parsed.layout, &mut rng);
        let walk = WalkGrid::from_map(&map, &self.catalog.walkable_ids());

        // 2. Objective targets and ambient decor
        let mut placer = ObjectPlacer::new(&map, &self.catalog, &self.config.placement, &mut rng);
        let objectives = placer.place_objectives(&mut map, &parsed.objectives, &mut rng);
        placer.scatter_ambient(&mut map, objectives.len(), &mut rng);

        let mut mission = Mission {
            title: parsed.title.unwrap_or_default(),
            subtitle: parsed.subtitle.unwrap_or_default(),
            summary: parsed.summary.unwrap_or_default(),
            layout: Layout {
                biome: parsed.layout.biome,
                size: MapSize {
                    w: Some(i64::from(map.width)),
                    h: Some(i64::from(map.height)),
                },
            },
            objectives,
            interactions: parsed.interactions.unwrap_or_default(),
            dialog: parsed.dialog,
            zones: parsed.zones,
            triggers: parsed.triggers,
            checkpoints: Vec::new(),
            flags: parsed.flags,
            narrative: parsed.narrative,
            validation: None,
        };

        // 3. Dialog ids and closure
        normalize_dialog_ids(&mut mission);
        close_dialog_graph(&mut mission);
        default_entry(&mut mission);

        // 4. Objectives and interactions
        align_categories(&mut mission.objectives, &map, &self.catalog);
        backfill_target_ids(&mut mission.objectives);
        synthesize_interactions(&mut mission);

        // 5. Spatial wiring
        mission.checkpoints = match parsed.checkpoints {
            Some(checkpoints) => checkpoints,
            None => default_checkpoints(&mission.objectives, &map),
        };
        repair_checkpoints(&mut mission.checkpoints, &map, &walk);
        repair_zones(&mut mission, &map, &walk);

        // 6. Copy, then close again over anything added since
        fill_narrative(&mut mission, &self.config.narrative);
        close_dialog_graph(&mut mission);
        default_entry(&mut mission);

        // 7. No dangling object references
        let required = required_targets(&mission);
        placer.ensure_required(&mut map, &required, &mut rng);

        info!(
            title = %mission.title,
            seed = ?seed,
            width = map.width,
            height = map.height,
            objectives = mission.objectives.len(),
            objects = map.objects.len(),
            "generated mission"
        );

        MissionBundle {
            mission,
            map,
            tiles: self.catalog.tiles.clone(),
            objects: self.catalog.objects.clone(),
            plan: plan.clone(),
        }
    }

    /// Generate, validate, and record the result on `mission.validation`.
    pub fn generate_certified(&self, plan: &Value, seed: &Seed) -> (MissionBundle, Vec<String>) {
        let mut bundle = self.generate(plan, seed);
        let errors = validator::certify(&mut bundle);
        (bundle, errors)
    }
}

impl MissionForgeBuilder {
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn manifest_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    /// Provide the config directly (for testing without files).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Provide the manifest directly (for testing without files).
    pub fn with_manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Directly provided values win over files; anything missing falls
    /// back to the defaults.
    pub fn build(self) -> Result<MissionForge, ForgeError> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(&path)?,
            (None, None) => EngineConfig::default(),
        };
        let manifest = match (self.manifest, self.manifest_path) {
            (Some(manifest), _) => manifest,
            (None, Some(path)) => AssetManifest::load_from_json(&path)?,
            (None, None) => AssetManifest::default(),
        };
        Ok(MissionForge::new(config, &manifest))
    }
}
