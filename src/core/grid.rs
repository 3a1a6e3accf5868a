//! Walkability mask and 4-connected breadth-first searches over it.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use crate::schema::map::{MapGrid, Spawn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl From<Spawn> for Cell {
    fn from(spawn: Spawn) -> Self {
        Cell::new(spawn.tx as usize, spawn.ty as usize)
    }
}

/// Dense row-major walkability mask.
#[derive(Debug, Clone, Default)]
pub struct WalkGrid {
    width: usize,
    height: usize,
    walkable: Vec<bool>,
}

impl WalkGrid {
    /// Build from tile ids. Cells whose id is not in `walkable_ids` are
    /// blocked, as are cells missing from a short `tiles` slice.
    pub fn from_tiles(
        width: usize,
        height: usize,
        tiles: &[u32],
        walkable_ids: &FxHashSet<u32>,
    ) -> Self {
        let cells = width.saturating_mul(height);
        let walkable = (0..cells)
            .map(|i| tiles.get(i).is_some_and(|id| walkable_ids.contains(id)))
            .collect();
        Self {
            width,
            height,
            walkable,
        }
    }

    pub fn from_map(map: &MapGrid, walkable_ids: &FxHashSet<u32>) -> Self {
        Self::from_tiles(
            map.width as usize,
            map.height as usize,
            &map.tiles,
            walkable_ids,
        )
    }

    pub fn from_mask(width: usize, height: usize, walkable: Vec<bool>) -> Self {
        debug_assert_eq!(walkable.len(), width * height);
        Self {
            width,
            height,
            walkable,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn index(&self, cell: Cell) -> Option<usize> {
        (cell.x < self.width && cell.y < self.height).then(|| cell.y * self.width + cell.x)
    }

    /// Signed coordinates, for checking untrusted positions.
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u64) < self.width as u64 && (y as u64) < self.height as u64
    }

    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.index(cell).is_some_and(|i| self.walkable[i])
    }

    pub fn is_walkable_at(&self, x: i64, y: i64) -> bool {
        self.in_bounds(x, y) && self.is_walkable(Cell::new(x as usize, y as usize))
    }

    /// Walkable cells in row-major order.
    pub fn walkable_cells(&self) -> Vec<Cell> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Cell::new(x, y)))
            .filter(|&cell| self.is_walkable(cell))
            .collect()
    }

    fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        let Cell { x, y } = cell;
        let left = x.checked_sub(1).map(|nx| Cell::new(nx, y));
        let up = y.checked_sub(1).map(|ny| Cell::new(x, ny));
        let right = (x + 1 < self.width).then(|| Cell::new(x + 1, y));
        let down = (y + 1 < self.height).then(|| Cell::new(x, y + 1));
        [left, up, right, down].into_iter().flatten()
    }

    /// Visited mask of a BFS from `start`. Empty if `start` is blocked.
    pub fn reachable_from(&self, start: Cell) -> Vec<bool> {
        let mut visited = vec![false; self.walkable.len()];
        let Some(start_index) = self.index(start) else {
            return visited;
        };
        if !self.walkable[start_index] {
            return visited;
        }

        visited[start_index] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(cell) = queue.pop_front() {
            for neighbor in self.neighbors(cell) {
                let Some(i) = self.index(neighbor) else {
                    continue;
                };
                if self.walkable[i] && !visited[i] {
                    visited[i] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        visited
    }

    /// Reachable cells from `start` in row-major order.
    pub fn reachable_cells(&self, start: Cell) -> Vec<Cell> {
        let visited = self.reachable_from(start);
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| Cell::new(x, y)))
            .filter(|&cell| self.index(cell).is_some_and(|i| visited[i]))
            .collect()
    }

    /// 4-connected walkable components, each in row-major order, listed
    /// by their first cell.
    pub fn components(&self) -> Vec<Vec<Cell>> {
        let mut seen = vec![false; self.walkable.len()];
        let mut components = Vec::new();
        for start in self.walkable_cells() {
            let Some(start_index) = self.index(start) else {
                continue;
            };
            if seen[start_index] {
                continue;
            }
            let visited = self.reachable_from(start);
            let mut component = Vec::new();
            for (i, reached) in visited.iter().enumerate() {
                if *reached {
                    seen[i] = true;
                    component.push(Cell::new(i % self.width, i / self.width));
                }
            }
            components.push(component);
        }
        components
    }

    /// Largest component; the earliest one wins ties.
    pub fn largest_component(&self) -> Vec<Cell> {
        let mut best: Vec<Cell> = Vec::new();
        for component in self.components() {
            if component.len() > best.len() {
                best = component;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `#` blocked, `.` walkable.
    fn grid(rows: &[&str]) -> WalkGrid {
        let height = rows.len();
        let width = rows[0].len();
        let mask = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| c == '.'))
            .collect();
        WalkGrid::from_mask(width, height, mask)
    }

    #[test]
    fn from_tiles_uses_walkable_ids() {
        let walkable: FxHashSet<u32> = [1].into_iter().collect();
        let g = WalkGrid::from_tiles(2, 2, &[1, 0, 1], &walkable);
        assert!(g.is_walkable(Cell::new(0, 0)));
        assert!(!g.is_walkable(Cell::new(1, 0)));
        assert!(g.is_walkable(Cell::new(0, 1)));
        // Missing trailing tile counts as blocked.
        assert!(!g.is_walkable(Cell::new(1, 1)));
    }

    #[test]
    fn bfs_stops_at_walls() {
        let g = grid(&["..#..", "..#..", "....."]);
        let visited = g.reachable_from(Cell::new(0, 0));
        assert_eq!(visited.iter().filter(|v| **v).count(), 13);

        let walled = grid(&["..#..", "..#..", "..#.."]);
        let cells = walled.reachable_cells(Cell::new(0, 0));
        assert_eq!(cells.len(), 6);
        assert!(!cells.contains(&Cell::new(3, 0)));
    }

    #[test]
    fn reachable_cells_come_back_row_major() {
        let g = grid(&["#..", "...", "..#"]);
        let cells = g.reachable_cells(Cell::new(2, 1));
        let expected: Vec<Cell> = [(1, 0), (2, 0), (0, 1), (1, 1), (2, 1), (0, 2), (1, 2)]
            .into_iter()
            .map(|(x, y)| Cell::new(x, y))
            .collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn bfs_is_four_connected() {
        let g = grid(&[".#", "#."]);
        assert_eq!(g.reachable_cells(Cell::new(0, 0)), vec![Cell::new(0, 0)]);
    }

    #[test]
    fn blocked_start_reaches_nothing() {
        let g = grid(&["#.", ".."]);
        assert!(g.reachable_cells(Cell::new(0, 0)).is_empty());
        assert!(g.reachable_cells(Cell::new(5, 5)).is_empty());
    }

    #[test]
    fn largest_component_wins() {
        let g = grid(&[".#...", "##...", "..#.."]);
        let components = g.components();
        assert_eq!(components.len(), 3);
        let largest = g.largest_component();
        assert_eq!(largest.len(), 8);
        assert!(largest.contains(&Cell::new(4, 2)));
    }

    #[test]
    fn signed_bounds() {
        let g = grid(&["...", "..."]);
        assert!(g.in_bounds(2, 1));
        assert!(!g.in_bounds(3, 1));
        assert!(!g.in_bounds(-1, 0));
        assert!(!g.is_walkable_at(9, 9));
    }
}
