//! Terrain sculpt engine.
//!
//! The terrain is stored as two layers:
//! - a base layer, derived once from an image's brightness samples
//! - a sculpt delta layer, edited by brush strokes and clearable in one call
//!
//! The displayable terrain is `base + delta`, recombined lazily.
//!
//! ## Design Principles
//! - Mutations are deferred: `sculpt` and `clear` only record a pending
//!   command, `update` applies it once per frame
//! - Only the last stroke recorded before an `update` is applied
//! - The delta layer never goes negative, so removing material can't dig
//!   below the base terrain

pub mod brush;

pub use brush::{smoothstep, Brush, BrushStroke, SculptKind};

use bevy::math::Vec2;
use bevy_ecs::resource::Resource;
use bevy_log::{debug, info};

use crate::constants::{HEIGHT_SAMPLE_MAX, RGBA_CHANNELS};
use crate::error::{SimError, SimResult};
use crate::grid::{Domain, Grid, PingPong};

#[derive(Resource, Debug, Clone)]
pub struct TerrainSculpt {
    domain: Domain,
    base: Grid<f32>,
    delta: PingPong<f32>,
    combined: Grid<f32>,
    proxy: Option<Grid<f32>>,
    brush: Brush,
    pending_stroke: Option<BrushStroke>,
    pending_clear: bool,
    dirty: bool,
    revision: u64,
}

impl TerrainSculpt {
    /// Creates a flat terrain. `proxy_resolution`, when set, enables a
    /// block-averaged preview of the combined heights at that resolution.
    pub fn new(domain: Domain, proxy_resolution: Option<usize>) -> SimResult<Self> {
        let resolution = domain.resolution();
        let proxy = match proxy_resolution {
            Some(0) => {
                return Err(SimError::InvalidConfig(
                    "proxy resolution must be at least 1".to_string(),
                ))
            }
            Some(proxy_res) if proxy_res > resolution => {
                return Err(SimError::InvalidConfig(format!(
                    "proxy resolution {proxy_res} exceeds grid resolution {resolution}"
                )))
            }
            Some(proxy_res) => Some(Grid::new(proxy_res, 0.0)),
            None => None,
        };

        Ok(Self {
            domain,
            base: Grid::new(resolution, 0.0),
            delta: PingPong::new(Grid::new(resolution, 0.0)),
            combined: Grid::new(resolution, 0.0),
            proxy,
            brush: Brush::default(),
            pending_stroke: None,
            pending_clear: false,
            dirty: true,
            revision: 0,
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Replaces the base layer from one brightness sample per cell.
    ///
    /// Each sample maps to `s / 255` (or `|s / 255 - 0.5|` when folding around
    /// mid-grey), is scaled by `height_scale`, and the whole layer is shifted
    /// so its minimum is exactly 0.
    pub fn load_base_heights(
        &mut self,
        samples: &[u8],
        height_scale: f32,
        invert_mid_grey: bool,
    ) -> SimResult<()> {
        let expected = self.domain.cell_count();
        if samples.len() != expected {
            return Err(SimError::InvalidArgument(format!(
                "expected {expected} height samples, got {}",
                samples.len()
            )));
        }
        self.load_base_with_stride(samples, 1, height_scale, invert_mid_grey)
    }

    /// Same as [`TerrainSculpt::load_base_heights`] for 4-byte RGBA image data.
    /// Only the first channel of each pixel is read.
    pub fn load_base_heights_rgba(
        &mut self,
        pixels: &[u8],
        height_scale: f32,
        invert_mid_grey: bool,
    ) -> SimResult<()> {
        let expected = self.domain.cell_count() * RGBA_CHANNELS;
        if pixels.len() != expected {
            return Err(SimError::InvalidArgument(format!(
                "expected {expected} RGBA bytes, got {}",
                pixels.len()
            )));
        }
        self.load_base_with_stride(pixels, RGBA_CHANNELS, height_scale, invert_mid_grey)
    }

    fn load_base_with_stride(
        &mut self,
        samples: &[u8],
        stride: usize,
        height_scale: f32,
        invert_mid_grey: bool,
    ) -> SimResult<()> {
        if !height_scale.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "height scale must be finite, got {height_scale}"
            )));
        }

        for (cell, sample) in self
            .base
            .cells_mut()
            .iter_mut()
            .zip(samples.iter().step_by(stride))
        {
            let normalized = *sample as f32 / HEIGHT_SAMPLE_MAX;
            let normalized = if invert_mid_grey {
                (normalized - 0.5).abs()
            } else {
                normalized
            };
            *cell = normalized * height_scale;
        }

        let min = self.base.min_value();
        for cell in self.base.cells_mut() {
            *cell -= min;
        }

        self.dirty = true;
        info!(
            "Loaded terrain base layer ({}x{}, scale {:.3}, max height {:.3})",
            self.domain.resolution(),
            self.domain.resolution(),
            height_scale,
            self.base.max_value()
        );
        Ok(())
    }

    /// Records a stroke for the next [`TerrainSculpt::update`]. A stroke
    /// already pending is replaced.
    pub fn sculpt(
        &mut self,
        kind: SculptKind,
        center_uv: Vec2,
        amount: f32,
        radius: f32,
    ) -> SimResult<()> {
        let stroke = BrushStroke::new(kind, center_uv, amount, radius)?;
        if self.pending_stroke.replace(stroke).is_some() {
            debug!("Pending sculpt stroke replaced before update");
        }
        Ok(())
    }

    /// Records a stroke using the current brush settings.
    pub fn sculpt_with_brush(&mut self, kind: SculptKind, center_uv: Vec2) -> SimResult<()> {
        self.sculpt(kind, center_uv, self.brush.amount, self.brush.radius)
    }

    /// Records a brush stroke at a world-space `(x, z)` point.
    pub fn sculpt_at_world(&mut self, kind: SculptKind, world_xz: Vec2) -> SimResult<()> {
        let uv = self.domain.world_to_uv(world_xz);
        self.sculpt_with_brush(kind, uv)
    }

    /// Schedules a full reset of the sculpt delta layer.
    pub fn clear(&mut self) {
        self.pending_clear = true;
    }

    /// Sets the brush radius from a world-space size. The UV radius is
    /// `size / (2 * domain size)`.
    pub fn set_brush_size(&mut self, world_size: f32) -> SimResult<()> {
        let radius = world_size / (self.domain.size() * 2.0);
        brush::validate_radius(radius)?;
        self.brush.radius = radius;
        Ok(())
    }

    pub fn set_brush_amount(&mut self, amount: f32) {
        self.brush.amount = amount;
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    /// Applies pending commands and recombines the layers if needed.
    /// Returns true when the combined heights changed.
    pub fn update(&mut self) -> bool {
        if self.pending_clear {
            self.delta.fill(0.0);
            self.pending_clear = false;
            self.dirty = true;
            info!("Sculpt layer cleared");
        }

        if let Some(stroke) = self.pending_stroke.take() {
            self.apply_stroke(&stroke);
            self.dirty = true;
        }

        if !self.dirty {
            return false;
        }

        self.recombine();
        self.dirty = false;
        self.revision += 1;
        true
    }

    fn apply_stroke(&mut self, stroke: &BrushStroke) {
        let domain = self.domain;
        let (current, next) = self.delta.split();
        for (x, z) in current.coords() {
            let delta = current.get(x, z) + stroke.contribution(domain.cell_uv(x, z));
            // base + delta must never drop below base
            next.set(x, z, delta.max(0.0));
        }
        self.delta.swap();
        debug!(
            "Applied {:?} stroke at {} (amount {:.3}, radius {:.3})",
            stroke.kind, stroke.center, stroke.amount, stroke.radius
        );
    }

    fn recombine(&mut self) {
        let delta = self.delta.current();
        for ((out, base), delta) in self
            .combined
            .cells_mut()
            .iter_mut()
            .zip(self.base.cells())
            .zip(delta.cells())
        {
            *out = base + delta;
        }

        if let Some(proxy) = self.proxy.as_mut() {
            downsample_into(&self.combined, proxy);
        }
    }

    /// Combined terrain as of the most recent [`TerrainSculpt::update`].
    pub fn combined_heights(&self) -> &Grid<f32> {
        &self.combined
    }

    pub fn base_heights(&self) -> &Grid<f32> {
        &self.base
    }

    pub fn delta_heights(&self) -> &Grid<f32> {
        self.delta.current()
    }

    pub fn proxy_heights(&self) -> Option<&Grid<f32>> {
        self.proxy.as_ref()
    }

    /// Increments each time the combined heights are rebuilt.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_pending_changes(&self) -> bool {
        self.dirty || self.pending_clear || self.pending_stroke.is_some()
    }
}

/// Block-averages `source` into the smaller `target` grid.
fn downsample_into(source: &Grid<f32>, target: &mut Grid<f32>) {
    let src_res = source.resolution();
    let dst_res = target.resolution();
    for (tx, tz) in target.coords() {
        let x0 = tx * src_res / dst_res;
        let x1 = ((tx + 1) * src_res / dst_res).max(x0 + 1);
        let z0 = tz * src_res / dst_res;
        let z1 = ((tz + 1) * src_res / dst_res).max(z0 + 1);

        let mut sum = 0.0;
        for z in z0..z1 {
            for x in x0..x1 {
                sum += source.get(x, z);
            }
        }
        target.set(tx, tz, sum / ((x1 - x0) * (z1 - z0)) as f32);
    }
}
