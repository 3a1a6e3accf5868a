//! Procedural tile map generation.
//!
//! Terrain is rolled per cell, smoothed once by neighbor majority, cut by
//! a road between two random points, then resolved to catalog tiles. The
//! spawn is finally moved into the largest walkable region so most of the
//! map is reachable from it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::core::catalog::Catalog;
use crate::core::config::MapConfig;
use crate::core::grid::{Cell, WalkGrid};
use crate::schema::map::{Layout, MapGrid, Spawn};

/// A neighbor label replaces a cell only when it holds at least this many
/// of the 8 surrounding cells.
const SMOOTHING_THRESHOLD: usize = 6;

/// Terrain intent of a cell before it is resolved to a tile id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terrain {
    Grass,
    Water,
    Mountain,
    Forest,
    Road,
}

impl Terrain {
    const ALL: [Terrain; 5] = [
        Terrain::Grass,
        Terrain::Water,
        Terrain::Mountain,
        Terrain::Forest,
        Terrain::Road,
    ];

    /// Tile name this intent resolves to.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Water => "water",
            Self::Mountain => "mountain",
            Self::Forest => "forest",
            Self::Road => "road",
        }
    }
}

pub struct MapGenerator<'a> {
    config: &'a MapConfig,
    catalog: &'a Catalog,
}

impl<'a> MapGenerator<'a> {
    pub fn new(config: &'a MapConfig, catalog: &'a Catalog) -> Self {
        Self { config, catalog }
    }

    /// Clamped `(width, height)` for a layout.
    pub fn dimensions(&self, layout: &Layout) -> (u32, u32) {
        let clamp = |requested: Option<i64>, fallback: u32| -> u32 {
            let lo = i64::from(self.config.min_size.max(1));
            let hi = i64::from(self.config.max_size).max(lo);
            requested
                .unwrap_or(i64::from(fallback))
                .clamp(lo, hi) as u32
        };
        (
            clamp(layout.size.w, self.config.default_width),
            clamp(layout.size.h, self.config.default_height),
        )
    }

    /// Generate a map with a walkable spawn and no objects.
    pub fn generate(&self, layout: &Layout, rng: &mut StdRng) -> MapGrid {
        let (width, height) = self.dimensions(layout);
        let (w, h) = (width as usize, height as usize);

        let mut terrain = self.roll_terrain(w, h, &layout.biome, rng);
        smooth(&mut terrain, w, h);

        let spawn = Cell::new(rng.gen_range(0..w), rng.gen_range(0..h));
        let goal = Cell::new(rng.gen_range(0..w), rng.gen_range(0..h));
        carve_road(&mut terrain, w, spawn, goal);

        let mut tiles = self.resolve_tiles(&terrain);
        let walkable_ids = self.catalog.walkable_ids();
        let mut walk = WalkGrid::from_tiles(w, h, &tiles, &walkable_ids);

        let mut spawn = spawn;
        if !walk.is_walkable(spawn) {
            match walk.walkable_cells().choose(rng) {
                Some(&cell) => {
                    debug!(from = ?spawn, to = ?cell, "spawn on blocked tile; relocating");
                    spawn = cell;
                }
                None => {
                    if let Some(tile) = self.catalog.first_walkable_tile() {
                        warn!(tile = %tile.name, "map has no walkable cells; paving the spawn");
                        tiles[spawn.y * w + spawn.x] = tile.id;
                        walk = WalkGrid::from_tiles(w, h, &tiles, &walkable_ids);
                    } else {
                        warn!("catalog has no walkable tiles; spawn stays blocked");
                    }
                }
            }
        }

        let largest = walk.largest_component();
        if !largest.is_empty() && !largest.contains(&spawn) {
            if let Some(&cell) = largest.choose(rng) {
                debug!(from = ?spawn, to = ?cell, size = largest.len(), "moving spawn into largest region");
                spawn = cell;
            }
        }

        debug!(width, height, biome = %layout.biome, spawn = ?spawn, "map generated");
        MapGrid {
            width,
            height,
            tiles,
            spawn: Spawn {
                tx: spawn.x as u32,
                ty: spawn.y as u32,
            },
            objects: Vec::new(),
        }
    }

    fn is_mountainous(&self, biome: &str) -> bool {
        let biome = biome.to_lowercase();
        self.config
            .mountain_biomes
            .iter()
            .any(|token| biome.contains(token.as_str()))
    }

    fn roll_terrain(&self, w: usize, h: usize, biome: &str, rng: &mut StdRng) -> Vec<Terrain> {
        let obstacle = if self.is_mountainous(biome) {
            Terrain::Mountain
        } else {
            Terrain::Water
        };
        let water = self.config.water_chance;
        let forest = water + self.config.forest_chance;
        let road = forest + self.config.road_chance;
        (0..w * h)
            .map(|_| {
                let roll: f64 = rng.gen();
                if roll < water {
                    obstacle
                } else if roll < forest {
                    Terrain::Forest
                } else if roll < road {
                    Terrain::Road
                } else {
                    Terrain::Grass
                }
            })
            .collect()
    }

    fn resolve_tiles(&self, terrain: &[Terrain]) -> Vec<u32> {
        let fallback = self.catalog.tiles.first().map(|t| t.id).unwrap_or(0);
        let lookup: Vec<(Terrain, u32)> = Terrain::ALL
            .iter()
            .map(|&t| {
                let id = match self.catalog.tile_named(t.label()) {
                    Some(tile) => tile.id,
                    None => {
                        debug!(terrain = t.label(), "no tile with this name; using first tile");
                        fallback
                    }
                };
                (t, id)
            })
            .collect();
        terrain
            .iter()
            .map(|t| {
                lookup
                    .iter()
                    .find(|(kind, _)| kind == t)
                    .map(|(_, id)| *id)
                    .unwrap_or(fallback)
            })
            .collect()
    }
}

/// One majority-vote pass against a snapshot of the grid.
fn smooth(terrain: &mut [Terrain], w: usize, h: usize) {
    let snapshot = terrain.to_vec();
    for y in 0..h {
        for x in 0..w {
            let mut counts = [0usize; Terrain::ALL.len()];
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let neighbor = snapshot[ny as usize * w + nx as usize];
                    if let Some(slot) = Terrain::ALL.iter().position(|t| *t == neighbor) {
                        counts[slot] += 1;
                    }
                }
            }
            if let Some((slot, _)) = counts
                .iter()
                .enumerate()
                .find(|(_, count)| **count >= SMOOTHING_THRESHOLD)
            {
                terrain[y * w + x] = Terrain::ALL[slot];
            }
        }
    }
}

/// Greedy walk from `from` to `to`, one step per axis per iteration,
/// marking every visited cell as road.
fn carve_road(terrain: &mut [Terrain], w: usize, from: Cell, to: Cell) {
    let mut current = from;
    terrain[current.y * w + current.x] = Terrain::Road;
    while current != to {
        if current.x != to.x {
            current.x = if current.x < to.x { current.x + 1 } else { current.x - 1 };
            terrain[current.y * w + current.x] = Terrain::Road;
        }
        if current.y != to.y {
            current.y = if current.y < to.y { current.y + 1 } else { current.y - 1 };
            terrain[current.y * w + current.x] = Terrain::Road;
        }
    }
}
