//! Disturbances: water added or removed outside the flux/height passes.
//!
//! Sources queue up between frames and are all applied by the next full
//! step. Flood is a single slot, the last call before a step wins.

use bevy::math::Vec2;
use bevy_log::debug;

use crate::grid::{BoundaryMask, Domain, Grid};
use crate::sculpt::brush::smoothstep;

use super::WaterTexel;

/// A one-shot elliptical source. Negative `amount` acts as a sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSource {
    /// Centre in UV space.
    pub center: Vec2,
    /// Height added at the centre.
    pub amount: f32,
    /// Half-extents of the ellipse in UV units.
    pub size: Vec2,
}

impl PointSource {
    #[inline]
    pub fn contribution(&self, uv: Vec2) -> f32 {
        let offset = (uv - self.center) / self.size;
        self.amount * smoothstep(1.0, 0.0, offset.length())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Disturbances {
    sources: Vec<PointSource>,
    /// Height added to every unmasked cell.
    flood: Option<f32>,
}

impl Disturbances {
    pub fn push_source(&mut self, source: PointSource) {
        self.sources.push(source);
    }

    pub fn set_flood(&mut self, height: f32) {
        if let Some(previous) = self.flood.replace(height) {
            debug!("Flood of {previous} replaced before being applied");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.flood.is_none()
    }

    pub fn pending_sources(&self) -> &[PointSource] {
        &self.sources
    }

    pub fn pending_flood(&self) -> Option<f32> {
        self.flood
    }

    /// Applies and drains every pending disturbance. Returns whether anything was applied.
    pub fn apply(
        &mut self,
        domain: &Domain,
        boundary: &BoundaryMask,
        min_water_height: f32,
        water: &mut Grid<WaterTexel>,
    ) -> bool {
        if self.is_empty() {
            return false;
        }
        let flood = self.flood.take().unwrap_or(0.0);
        let sources = std::mem::take(&mut self.sources);
        debug!(
            "Applying {} water source(s), flood {flood}",
            sources.len()
        );

        for (x, z) in water.coords() {
            let factor = boundary.cell_factor(x, z);
            if factor == 0.0 {
                continue;
            }
            let uv = domain.cell_uv(x, z);
            let added = flood + sources.iter().map(|s| s.contribution(uv)).sum::<f32>();
            if added == 0.0 {
                continue;
            }
            let mut texel = water.get(x, z);
            texel.height = (texel.height + added * factor).max(min_water_height);
            water.set(x, z, texel);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain() -> Domain {
        Domain::new(4.0, 4).unwrap()
    }

    #[test]
    fn test_source_falloff() {
        let source = PointSource {
            center: Vec2::splat(0.5),
            amount: 0.2,
            size: Vec2::new(0.2, 0.1),
        };
        assert!((source.contribution(Vec2::splat(0.5)) - 0.2).abs() < 1e-6);
        // outside along z, which is the narrow axis
        assert_eq!(source.contribution(Vec2::new(0.5, 0.65)), 0.0);
        assert!(source.contribution(Vec2::new(0.65, 0.5)) > 0.0);
    }

    #[test]
    fn test_sources_queue_and_flood_last_wins() {
        let mut disturbances = Disturbances::default();
        let source = PointSource {
            center: Vec2::splat(0.5),
            amount: 0.1,
            size: Vec2::splat(0.1),
        };
        disturbances.push_source(source);
        disturbances.push_source(source);
        disturbances.set_flood(1.0);
        disturbances.set_flood(0.25);

        assert_eq!(disturbances.pending_sources().len(), 2);
        assert_eq!(disturbances.pending_flood(), Some(0.25));
    }

    #[test]
    fn test_apply_respects_mask_and_drains() {
        let domain = domain();
        let boundary = BoundaryMask::closed_border(4);
        let mut water = Grid::new(4, WaterTexel::new(1.0));
        let mut disturbances = Disturbances::default();
        disturbances.set_flood(0.5);

        assert!(disturbances.apply(&domain, &boundary, 0.0, &mut water));

        assert_eq!(water.get(0, 0).height, 1.0);
        assert_eq!(water.get(1, 2).height, 1.5);
        assert!(disturbances.is_empty());
        assert!(!disturbances.apply(&domain, &boundary, 0.0, &mut water));
    }

    #[test]
    fn test_sink_is_clamped_to_floor() {
        let domain = domain();
        let boundary = BoundaryMask::open(4);
        let mut water = Grid::new(4, WaterTexel::new(0.1));
        let mut disturbances = Disturbances::default();
        disturbances.set_flood(-1.0);

        disturbances.apply(&domain, &boundary, -0.05, &mut water);

        for texel in water.cells() {
            assert_eq!(texel.height, -0.05);
        }
    }
}
