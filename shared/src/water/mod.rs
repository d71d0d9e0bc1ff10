//! Pipe-model shallow-water simulation over a sculpted heightfield.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  combined heights  ┌───────────────────────────┐
//! │  TerrainSculpt   │ ─────────────────▶ │      PipeModelWater       │
//! │ (base + delta)   │   (on revision)    │                           │
//! └──────────────────┘                    │  disturb ─▶ flux ─▶ height│
//!                                         │     ▲        └──x N──┘    │
//!                                         │     │  sources / flood     │
//!                                         │     ▼                      │
//!                                         │  composite ─▶ display     │
//!                                         └───────────────────────────┘
//! ```
//!
//! Each pass reads the current half of a [`PingPong`](crate::grid::PingPong)
//! pair and writes the other half, then the pair swaps.

pub mod config;
pub mod disturb;
pub mod flux;
pub mod height;
pub mod plugin;
pub mod simulation;

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

pub use config::{DomainConfig, SimulationSettings, TimestepPolicy, WaterConfig};
pub use disturb::{Disturbances, PointSource};
pub use plugin::{TerrainWaterPlugin, WaterStepEvent};
pub use simulation::{PipeModelWater, StepReport};

/// State of one water cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterTexel {
    /// Water column height above the terrain.
    pub height: f32,
    /// Horizontal velocity `(x, z)`.
    pub velocity: Vec2,
}

impl WaterTexel {
    pub fn new(height: f32) -> Self {
        Self {
            height,
            velocity: Vec2::ZERO,
        }
    }
}
