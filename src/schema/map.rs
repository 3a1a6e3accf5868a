use serde::{Deserialize, Serialize};

/// Requested map shape from the plan. Missing dimensions fall back to
/// the configured defaults at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub biome: String,
    pub size: MapSize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            biome: "meadow".to_string(),
            size: MapSize::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSize {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h: Option<i64>,
}

/// Player start tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spawn {
    pub tx: u32,
    pub ty: u32,
}

/// An object instance on the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: u32,
    pub y: u32,
}

/// Row-major tile grid with spawn point and placed objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapGrid {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<u32>,
    pub spawn: Spawn,
    #[serde(default)]
    pub objects: Vec<PlacedObject>,
}

impl MapGrid {
    pub fn tile_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn object(&self, id: &str) -> Option<&PlacedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn has_object(&self, id: &str) -> bool {
        self.object(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_lookup_is_row_major() {
        let map = MapGrid {
            width: 3,
            height: 2,
            tiles: vec![0, 1, 2, 3, 4, 5],
            ..MapGrid::default()
        };
        assert_eq!(map.tile_at(0, 0), Some(0));
        assert_eq!(map.tile_at(2, 0), Some(2));
        assert_eq!(map.tile_at(1, 1), Some(4));
        assert_eq!(map.tile_at(3, 0), None);
        assert_eq!(map.tile_at(0, 2), None);
    }

    #[test]
    fn layout_defaults_fill_missing_fields() {
        let layout: Layout = serde_json::from_str(r#"{"size": {"w": 20}}"#).unwrap();
        assert_eq!(layout.biome, "meadow");
        assert_eq!(layout.size.w, Some(20));
        assert_eq!(layout.size.h, None);
    }
}
