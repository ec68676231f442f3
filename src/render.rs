//! Render Buffer Builder - per-cell depth, color, and vertex positions
//!
//! Buffers are sized for one grid topology. They are rewritten in place each
//! tick and replaced wholesale when the resolution changes.

use crate::aggregate::GridOffset;
use crate::color::energy_color;
use crate::hamiltonian::FieldCell;

/// Depth per unit of H.
pub const DEPTH_SCALE: f32 = 1.5;

/// N×N grid topology, row-major (k = i·N + j).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    resolution: usize,
}

impl Grid {
    pub fn new(resolution: usize) -> Self {
        Self { resolution }
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.resolution * self.resolution
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.resolution + j
    }

    /// Integer grid offset of cell `index`, as reported for peaks.
    #[inline]
    pub fn offset(&self, index: usize) -> GridOffset {
        GridOffset::of_index(index, self.resolution)
    }

    /// Exact vertex (x, y) of cell (i, j), centered on the origin.
    #[inline]
    pub fn vertex(&self, i: usize, j: usize) -> (f32, f32) {
        let half = self.resolution as f32 / 2.0;
        (j as f32 - half, -(i as f32 - half))
    }
}

/// Output arrays handed by reference to the renderer.
#[derive(Clone, Debug)]
pub struct RenderBuffers {
    grid: Grid,
    depth: Vec<f32>,
    color: Vec<f32>,
    positions: Vec<f32>,
}

impl RenderBuffers {
    /// Allocate buffers for `grid`. Depth starts flat, colors start black.
    pub fn new(grid: Grid) -> Self {
        let cells = grid.cell_count();
        let mut positions = Vec::with_capacity(cells * 3);
        for i in 0..grid.resolution() {
            for j in 0..grid.resolution() {
                let (x, y) = grid.vertex(i, j);
                positions.extend_from_slice(&[x, y, 0.0]);
            }
        }

        Self {
            grid,
            depth: vec![0.0; cells],
            color: vec![0.0; cells * 3],
            positions,
        }
    }

    #[inline]
    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// H·1.5 per cell.
    #[inline]
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    /// RGB triples, three floats per cell.
    #[inline]
    pub fn colors(&self) -> &[f32] {
        &self.color
    }

    /// (x, y, z) per cell, z = depth.
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Rewrite every cell from `cells`, which must match the grid.
    pub fn write(&mut self, cells: &[FieldCell]) {
        debug_assert_eq!(cells.len(), self.grid.cell_count());

        for (k, cell) in cells.iter().enumerate() {
            let z = cell.h * DEPTH_SCALE;
            self.depth[k] = z;
            self.positions[k * 3 + 2] = z;
            self.color[k * 3..k * 3 + 3].copy_from_slice(&energy_color(cell.h).to_array());
        }
    }
}
