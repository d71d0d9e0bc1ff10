//! Grid buffer store.
//!
//! Every simulated field lives in a square [`Grid`] of cells. Fields that
//! evolve by feedback (water, flux, sculpt delta) are held in a [`PingPong`]
//! pair so a pass always reads one buffer and writes the other.
//!
//! ## Coordinate Convention
//! - Cells are addressed `(x, z)` with `0 <= x, z < resolution`
//! - Storage is row-major: `index = z * resolution + x`
//! - [`Edge::Right`] points to `x + 1`, [`Edge::Top`] points to `z + 1`

pub mod boundary;
pub mod domain;

pub use boundary::BoundaryMask;
pub use domain::Domain;

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A square 2D array of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    resolution: usize,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Creates a `resolution x resolution` grid with every cell set to `fill`.
    pub fn new(resolution: usize, fill: T) -> Self {
        Self {
            resolution,
            cells: vec![fill; resolution * resolution],
        }
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn index_of(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.resolution && z < self.resolution);
        z * self.resolution + x
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> T {
        self.cells[self.index_of(x, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, z: usize, value: T) {
        let idx = self.index_of(x, z);
        self.cells[idx] = value;
    }

    /// Reads a cell with replicated-edge addressing: out-of-range coordinates
    /// are clamped to the nearest border cell, never wrapped.
    #[inline]
    pub fn get_clamped(&self, x: i64, z: i64) -> T {
        let max = self.resolution as i64 - 1;
        self.get(x.clamp(0, max) as usize, z.clamp(0, max) as usize)
    }

    /// Coordinates of the neighbor across `edge`, or `None` outside the grid.
    #[inline]
    pub fn neighbor(&self, x: usize, z: usize, edge: Edge) -> Option<(usize, usize)> {
        let (dx, dz) = edge.offset();
        let nx = x as i64 + dx as i64;
        let nz = z as i64 + dz as i64;
        let res = self.resolution as i64;
        if nx < 0 || nz < 0 || nx >= res || nz >= res {
            None
        } else {
            Some((nx as usize, nz as usize))
        }
    }

    /// Value across `edge` with replicated-edge addressing.
    #[inline]
    pub fn neighbor_clamped(&self, x: usize, z: usize, edge: Edge) -> T {
        let (dx, dz) = edge.offset();
        self.get_clamped(x as i64 + dx as i64, z as i64 + dz as i64)
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    pub fn copy_from(&mut self, other: &Grid<T>) {
        debug_assert_eq!(self.resolution, other.resolution);
        self.cells.copy_from_slice(&other.cells);
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Iterates `(x, z)` in storage order.
    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> {
        let res = self.resolution;
        (0..res).flat_map(move |z| (0..res).map(move |x| (x, z)))
    }
}

impl Grid<f32> {
    pub fn sum(&self) -> f32 {
        self.cells.iter().sum()
    }

    pub fn min_value(&self) -> f32 {
        self.cells.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.cells.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Two same-shape buffers whose "current" and "next" roles swap after each write pass.
///
/// The only way to write is through [`PingPong::split`], which borrows
/// `current` immutably and `next` mutably at the same time, so a pass can
/// never observe its own partial output.
#[derive(Debug, Clone)]
pub struct PingPong<T> {
    buffers: [Grid<T>; 2],
    current: usize,
}

impl<T: Copy> PingPong<T> {
    pub fn new(initial: Grid<T>) -> Self {
        let other = initial.clone();
        Self {
            buffers: [initial, other],
            current: 0,
        }
    }

    #[inline]
    pub fn current(&self) -> &Grid<T> {
        &self.buffers[self.current]
    }

    /// Mutable access to the current buffer, for passes that edit in place
    /// outside a read/write pair (loading, disturbances).
    #[inline]
    pub fn current_mut(&mut self) -> &mut Grid<T> {
        &mut self.buffers[self.current]
    }

    /// Borrows `(current, next)` for one read-current/write-next pass.
    pub fn split(&mut self) -> (&Grid<T>, &mut Grid<T>) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Exchanges roles. O(1), no data is copied.
    #[inline]
    pub fn swap(&mut self) {
        self.current ^= 1;
    }

    /// Resets both buffers to a constant.
    pub fn fill(&mut self, value: T) {
        for buffer in &mut self.buffers {
            buffer.fill(value);
        }
    }

    pub fn resolution(&self) -> usize {
        self.buffers[0].resolution()
    }
}

/// One of the four edges of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// +x
    Right,
    /// -x
    Left,
    /// -z
    Bottom,
    /// +z
    Top,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Right, Edge::Left, Edge::Bottom, Edge::Top];

    /// The same edge seen from the neighboring cell.
    pub fn opposite(&self) -> Edge {
        match self {
            Edge::Right => Edge::Left,
            Edge::Left => Edge::Right,
            Edge::Bottom => Edge::Top,
            Edge::Top => Edge::Bottom,
        }
    }

    /// Offset `(dx, dz)` to the neighbor across this edge.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Edge::Right => (1, 0),
            Edge::Left => (-1, 0),
            Edge::Bottom => (0, -1),
            Edge::Top => (0, 1),
        }
    }

    #[inline]
    fn channel(&self) -> usize {
        match self {
            Edge::Right => 0,
            Edge::Left => 1,
            Edge::Bottom => 2,
            Edge::Top => 3,
        }
    }
}

/// Four per-edge values of a cell: flux magnitudes or boundary mask entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeValues(pub [f32; 4]);

impl EdgeValues {
    pub const ZERO: EdgeValues = EdgeValues([0.0; 4]);
    pub const ONE: EdgeValues = EdgeValues([1.0; 4]);

    pub fn splat(value: f32) -> Self {
        Self([value; 4])
    }

    #[inline]
    pub fn total(&self) -> f32 {
        self.0.iter().sum()
    }

    #[inline]
    pub fn scaled(self, factor: f32) -> Self {
        Self(self.0.map(|v| v * factor))
    }

    #[inline]
    pub fn clamped_non_negative(self) -> Self {
        Self(self.0.map(|v| v.max(0.0)))
    }

    /// Component-wise product, used to apply a boundary mask.
    #[inline]
    pub fn masked(self, mask: &EdgeValues) -> Self {
        Self([
            self.0[0] * mask.0[0],
            self.0[1] * mask.0[1],
            self.0[2] * mask.0[2],
            self.0[3] * mask.0[3],
        ])
    }

    pub fn max_component(&self) -> f32 {
        self.0.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn min_component(&self) -> f32 {
        self.0.iter().copied().fold(f32::INFINITY, f32::min)
    }
}

impl Index<Edge> for EdgeValues {
    type Output = f32;

    #[inline]
    fn index(&self, edge: Edge) -> &f32 {
        &self.0[edge.channel()]
    }
}

impl IndexMut<Edge> for EdgeValues {
    #[inline]
    fn index_mut(&mut self, edge: Edge) -> &mut f32 {
        &mut self.0[edge.channel()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_opposites_round_trip() {
        for edge in Edge::ALL {
            assert_eq!(edge.opposite().opposite(), edge);
            let (dx, dz) = edge.offset();
            let (ox, oz) = edge.opposite().offset();
            assert_eq!((dx + ox, dz + oz), (0, 0));
        }
    }

    #[test]
    fn test_clamped_addressing_replicates_edges() {
        let mut grid = Grid::new(3, 0.0f32);
        grid.set(0, 0, 1.0);
        grid.set(2, 2, 9.0);

        assert_eq!(grid.get_clamped(-5, -1), 1.0);
        assert_eq!(grid.get_clamped(7, 3), 9.0);
        assert_eq!(grid.neighbor_clamped(2, 2, Edge::Right), 9.0);
        assert_eq!(grid.neighbor(2, 2, Edge::Right), None);
        assert_eq!(grid.neighbor(1, 1, Edge::Bottom), Some((1, 0)));
    }

    #[test]
    fn test_ping_pong_swap_exchanges_roles() {
        let mut buffers = PingPong::new(Grid::new(2, 0.0f32));
        {
            let (current, next) = buffers.split();
            assert_eq!(current.get(0, 0), 0.0);
            next.fill(3.0);
        }
        assert_eq!(buffers.current().get(1, 1), 0.0);

        buffers.swap();
        assert_eq!(buffers.current().get(1, 1), 3.0);

        let (current, next) = buffers.split();
        assert_eq!(current.get(0, 1), 3.0);
        assert_eq!(next.get(0, 1), 0.0);
    }

    #[test]
    fn test_ping_pong_fill_resets_both_buffers() {
        let mut buffers = PingPong::new(Grid::new(2, 5.0f32));
        buffers.fill(0.0);
        assert_eq!(buffers.current().sum(), 0.0);
        buffers.swap();
        assert_eq!(buffers.current().sum(), 0.0);
    }

    #[test]
    fn test_edge_values_indexing_and_mask() {
        let mut flux = EdgeValues::ZERO;
        flux[Edge::Top] = 2.0;
        flux[Edge::Left] = -1.0;

        assert_eq!(flux.clamped_non_negative().total(), 2.0);

        let mut mask = EdgeValues::ONE;
        mask[Edge::Top] = 0.0;
        assert_eq!(flux.masked(&mask)[Edge::Top], 0.0);
        assert_eq!(flux.masked(&mask)[Edge::Left], -1.0);
    }
}
