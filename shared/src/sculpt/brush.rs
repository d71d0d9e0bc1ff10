use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BRUSH_AMOUNT, DEFAULT_BRUSH_RADIUS_UV};
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SculptKind {
    Add,
    Remove,
}

/// Hermite interpolation between two edges. Edges may be given in reverse
/// order (`smoothstep(radius, 0.0, d)` is 1 at the centre and 0 at `radius`).
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Brush settings applied by strokes that do not carry their own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    /// Radius in UV units.
    pub radius: f32,
    /// Height added (or removed) at the centre of a stroke.
    pub amount: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            radius: DEFAULT_BRUSH_RADIUS_UV,
            amount: DEFAULT_BRUSH_AMOUNT,
        }
    }
}

/// A single brush application, waiting for the next sculpt update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushStroke {
    pub kind: SculptKind,
    pub center: Vec2,
    pub amount: f32,
    pub radius: f32,
}

impl BrushStroke {
    pub fn new(kind: SculptKind, center: Vec2, amount: f32, radius: f32) -> SimResult<Self> {
        validate_radius(radius)?;
        if !amount.is_finite() || !center.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "brush stroke must be finite, got amount {amount} at {center}"
            )));
        }
        Ok(Self {
            kind,
            center,
            amount,
            radius,
        })
    }

    /// Signed height change the stroke applies to a cell centred at `uv`.
    #[inline]
    pub fn contribution(&self, uv: Vec2) -> f32 {
        let falloff = self.amount * smoothstep(self.radius, 0.0, uv.distance(self.center));
        match self.kind {
            SculptKind::Add => falloff,
            SculptKind::Remove => -falloff,
        }
    }
}

pub(crate) fn validate_radius(radius: f32) -> SimResult<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidArgument(format!(
            "brush radius must be positive, got {radius}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_reversed_edges() {
        assert_eq!(smoothstep(0.2, 0.0, 0.0), 1.0);
        assert_eq!(smoothstep(0.2, 0.0, 0.2), 0.0);
        assert_eq!(smoothstep(0.2, 0.0, 0.5), 0.0);
        assert!((smoothstep(0.2, 0.0, 0.1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_stroke_rejects_non_positive_radius() {
        assert!(matches!(
            BrushStroke::new(SculptKind::Add, Vec2::splat(0.5), 1.0, 0.0),
            Err(SimError::InvalidArgument(_))
        ));
        assert!(BrushStroke::new(SculptKind::Add, Vec2::splat(0.5), 1.0, -0.1).is_err());
    }

    #[test]
    fn test_remove_contribution_is_negative() {
        let stroke = BrushStroke::new(SculptKind::Remove, Vec2::splat(0.5), 0.3, 0.2).unwrap();
        assert!((stroke.contribution(Vec2::splat(0.5)) + 0.3).abs() < 1e-6);
        assert_eq!(stroke.contribution(Vec2::new(0.9, 0.9)), 0.0);
    }
}
