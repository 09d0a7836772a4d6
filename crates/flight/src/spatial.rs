use std::collections::HashMap;

use glam::Vec3;

use crate::arena::Aabb;

/// A 2D cell coordinate (ignoring Y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Uniform XZ grid over static obstacles.
///
/// Each box is registered in every cell its footprint overlaps, so a query
/// only has to look at the cells covering its own radius. Query results
/// are sorted obstacle indices, independent of hash order.
#[derive(Debug, Clone)]
pub struct ObstacleGrid {
    cell_size: f32,
    cells: HashMap<CellCoord, Vec<usize>>,
}

impl ObstacleGrid {
    /// Bucket `obstacles` into cells of `cell_size`. Non-positive sizes fall
    /// back to one unit.
    pub fn new(cell_size: f32, obstacles: &[Aabb]) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let mut grid = Self {
            cell_size,
            cells: HashMap::new(),
        };
        for (index, aabb) in obstacles.iter().enumerate() {
            let lo = grid.position_to_cell(aabb.min);
            let hi = grid.position_to_cell(aabb.max);
            for x in lo.x..=hi.x {
                for z in lo.z..=hi.z {
                    grid.cells.entry(CellCoord::new(x, z)).or_default().push(index);
                }
            }
        }
        grid
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn position_to_cell(&self, pos: Vec3) -> CellCoord {
        CellCoord {
            x: (pos.x / self.cell_size).floor() as i32,
            z: (pos.z / self.cell_size).floor() as i32,
        }
    }

    /// Indices of obstacles registered in cells within `radius` of `pos`.
    ///
    /// This is a broad phase: callers still test the boxes themselves.
    pub fn nearby(&self, pos: Vec3, radius: f32) -> Vec<usize> {
        let r = Vec3::new(radius, 0.0, radius);
        let lo = self.position_to_cell(pos - r);
        let hi = self.position_to_cell(pos + r);
        let mut found = Vec::new();
        for x in lo.x..=hi.x {
            for z in lo.z..=hi.z {
                if let Some(indices) = self.cells.get(&CellCoord::new(x, z)) {
                    found.extend_from_slice(indices);
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total obstacle placements across all cells.
    pub fn total_placements(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }
}
