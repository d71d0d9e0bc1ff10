use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Physical extent of a grid: a square of side `size` centred on the origin,
/// split into `resolution` cells per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    size: f32,
    resolution: usize,
}

impl Domain {
    pub fn new(size: f32, resolution: usize) -> SimResult<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "domain size must be positive, got {size}"
            )));
        }
        if resolution == 0 {
            return Err(SimError::InvalidConfig(
                "grid resolution must be at least 1".to_string(),
            ));
        }
        Ok(Self { size, resolution })
    }

    #[inline]
    pub fn size(&self) -> f32 {
        self.size
    }

    #[inline]
    pub fn half_size(&self) -> f32 {
        self.size * 0.5
    }

    #[inline]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// World length of one cell side (also the virtual pipe length).
    #[inline]
    pub fn cell_pitch(&self) -> f32 {
        self.size / self.resolution as f32
    }

    #[inline]
    pub fn cell_area(&self) -> f32 {
        let pitch = self.cell_pitch();
        pitch * pitch
    }

    /// Area of the whole domain.
    #[inline]
    pub fn area(&self) -> f32 {
        self.size * self.size
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.resolution * self.resolution
    }

    /// UV coordinate of the centre of cell `(x, z)`.
    #[inline]
    pub fn cell_uv(&self, x: usize, z: usize) -> Vec2 {
        let res = self.resolution as f32;
        Vec2::new((x as f32 + 0.5) / res, (z as f32 + 0.5) / res)
    }

    /// Maps a world-space `(x, z)` point to domain UV.
    pub fn world_to_uv(&self, world_xz: Vec2) -> Vec2 {
        (world_xz + Vec2::splat(self.half_size())) / self.size
    }

    pub fn uv_to_world(&self, uv: Vec2) -> Vec2 {
        uv * self.size - Vec2::splat(self.half_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_rejects_degenerate_values() {
        assert!(matches!(Domain::new(0.0, 16), Err(SimError::InvalidConfig(_))));
        assert!(matches!(Domain::new(-1.0, 16), Err(SimError::InvalidConfig(_))));
        assert!(matches!(Domain::new(f32::NAN, 16), Err(SimError::InvalidConfig(_))));
        assert!(matches!(Domain::new(6.0, 0), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_world_uv_conversion() {
        let domain = Domain::new(6.0, 256).unwrap();
        assert_eq!(domain.world_to_uv(Vec2::ZERO), Vec2::splat(0.5));
        assert_eq!(domain.world_to_uv(Vec2::new(-3.0, 3.0)), Vec2::new(0.0, 1.0));

        let back = domain.uv_to_world(domain.world_to_uv(Vec2::new(1.25, -0.5)));
        assert!((back - Vec2::new(1.25, -0.5)).length() < 1e-5);
    }

    #[test]
    fn test_cell_geometry() {
        let domain = Domain::new(4.0, 4).unwrap();
        assert_eq!(domain.cell_pitch(), 1.0);
        assert_eq!(domain.cell_area(), 1.0);
        assert_eq!(domain.area(), 16.0);
        assert_eq!(domain.cell_uv(0, 3), Vec2::new(0.125, 0.875));
    }
}
