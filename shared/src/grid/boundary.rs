//! Per-edge boundary mask.
//!
//! Each cell carries one 0/1 value per edge. A 0 blocks flux leaving the
//! cell across that edge; the flux solver multiplies its result by the mask.
//!
//! ## Presets
//! - [`BoundaryMask::open`]: nothing blocked
//! - [`BoundaryMask::closed_border`]: every border cell fully blocked, so the
//!   outer ring acts as a wall and is hidden at the floor when composited
//! - [`BoundaryMask::walled`]: only the edges facing out of the domain blocked

use serde::{Deserialize, Serialize};

use super::{Edge, EdgeValues, Grid};

/// Which preset a simulation builds its mask from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundaryMode {
    Open,
    #[default]
    ClosedBorder,
    Walled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryMask {
    edges: Grid<EdgeValues>,
}

impl BoundaryMask {
    pub fn from_mode(mode: BoundaryMode, resolution: usize) -> Self {
        match mode {
            BoundaryMode::Open => Self::open(resolution),
            BoundaryMode::ClosedBorder => Self::closed_border(resolution),
            BoundaryMode::Walled => Self::walled(resolution),
        }
    }

    pub fn open(resolution: usize) -> Self {
        Self {
            edges: Grid::new(resolution, EdgeValues::ONE),
        }
    }

    pub fn closed_border(resolution: usize) -> Self {
        let mut mask = Self::open(resolution);
        let last = resolution.saturating_sub(1);
        for i in 0..resolution {
            mask.block_cell(i, 0);
            mask.block_cell(i, last);
            mask.block_cell(0, i);
            mask.block_cell(last, i);
        }
        mask
    }

    pub fn walled(resolution: usize) -> Self {
        let mut mask = Self::open(resolution);
        let last = resolution.saturating_sub(1);
        for i in 0..resolution {
            mask.block_edge(i, 0, Edge::Bottom);
            mask.block_edge(i, last, Edge::Top);
            mask.block_edge(0, i, Edge::Left);
            mask.block_edge(last, i, Edge::Right);
        }
        mask
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.edges.resolution()
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> EdgeValues {
        self.edges.get(x, z)
    }

    pub fn grid(&self) -> &Grid<EdgeValues> {
        &self.edges
    }

    /// Turns a cell into a solid obstacle: no flux leaves it in any direction.
    pub fn block_cell(&mut self, x: usize, z: usize) {
        self.edges.set(x, z, EdgeValues::ZERO);
    }

    pub fn block_edge(&mut self, x: usize, z: usize, edge: Edge) {
        let mut values = self.edges.get(x, z);
        values[edge] = 0.0;
        self.edges.set(x, z, values);
    }

    pub fn open_cell(&mut self, x: usize, z: usize) {
        self.edges.set(x, z, EdgeValues::ONE);
    }

    /// 1 when at least one edge of the cell is open, 0 for a fully blocked cell.
    /// Used by compositing and disturbances.
    #[inline]
    pub fn cell_factor(&self, x: usize, z: usize) -> f32 {
        self.edges.get(x, z).max_component().clamp(0.0, 1.0)
    }

    /// True if no flux can leave the domain through its outer edges.
    pub fn is_sealed(&self) -> bool {
        let res = self.resolution();
        if res == 0 {
            return true;
        }
        let last = res - 1;
        (0..res).all(|i| {
            self.get(i, 0)[Edge::Bottom] == 0.0
                && self.get(i, last)[Edge::Top] == 0.0
                && self.get(0, i)[Edge::Left] == 0.0
                && self.get(last, i)[Edge::Right] == 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_border_blocks_whole_ring() {
        let mask = BoundaryMask::closed_border(4);
        assert_eq!(mask.get(0, 2), EdgeValues::ZERO);
        assert_eq!(mask.get(3, 3), EdgeValues::ZERO);
        assert_eq!(mask.get(1, 2), EdgeValues::ONE);
        assert_eq!(mask.cell_factor(0, 0), 0.0);
        assert_eq!(mask.cell_factor(2, 1), 1.0);
        assert!(mask.is_sealed());
    }

    #[test]
    fn test_walled_blocks_only_outward_edges() {
        let mask = BoundaryMask::walled(4);
        let corner = mask.get(0, 0);
        assert_eq!(corner[Edge::Left], 0.0);
        assert_eq!(corner[Edge::Bottom], 0.0);
        assert_eq!(corner[Edge::Right], 1.0);
        assert_eq!(corner[Edge::Top], 1.0);
        assert_eq!(mask.cell_factor(0, 0), 1.0);
        assert!(mask.is_sealed());
    }

    #[test]
    fn test_open_mask_is_not_sealed() {
        let mut mask = BoundaryMask::open(3);
        assert!(!mask.is_sealed());
        mask.block_cell(1, 1);
        assert_eq!(mask.cell_factor(1, 1), 0.0);
        mask.open_cell(1, 1);
        assert_eq!(mask.cell_factor(1, 1), 1.0);
    }
}
