//! Water simulation configuration.
//!
//! [`WaterConfig`] is fixed for the lifetime of a simulation instance; it is
//! validated once at construction and never re-checked during a step.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DAMPING_FACTOR, DEFAULT_DOMAIN_SIZE, DEFAULT_INITIAL_WATER_HEIGHT,
    DEFAULT_MAX_HORIZONTAL_SPEED, DEFAULT_MIN_WATER_HEIGHT, DEFAULT_PROXY_RESOLUTION,
    DEFAULT_RESOLUTION, DEFAULT_STABILITY_MULTIPLIER, DEFAULT_VELOCITY_HEIGHT_THRESHOLD,
    FIXED_FRAME_DT, GRAVITY,
};
use crate::error::{SimError, SimResult};
use crate::grid::boundary::BoundaryMode;
use crate::grid::Domain;

/// How the frame delta handed to `update` is turned into the simulated delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimestepPolicy {
    /// Ignore the caller's delta and always simulate this much time.
    /// Better to run in slow motion than to explode on a long frame.
    Fixed(f32),
    /// Use the caller's delta, clamped to `[0, max]`.
    Clamped { max: f32 },
}

impl Default for TimestepPolicy {
    fn default() -> Self {
        TimestepPolicy::Fixed(FIXED_FRAME_DT)
    }
}

impl TimestepPolicy {
    pub fn resolve(&self, frame_dt: f32) -> f32 {
        match *self {
            TimestepPolicy::Fixed(dt) => dt,
            TimestepPolicy::Clamped { max } => {
                if frame_dt.is_finite() {
                    frame_dt.clamp(0.0, max)
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    /// Flux kept from one substep to the next, in `(0, 1]`.
    pub damping_factor: f32,
    pub initial_water_height: f32,
    /// Floor every water height is clamped to.
    pub min_water_height: f32,
    pub gravity: f32,
    /// Upper-bound estimate of horizontal speed, used for the CFL bound.
    pub max_horizontal_speed: f32,
    pub stability_multiplier: f32,
    /// Full steps per frame. Each one substeps on its own.
    pub multisteps: u32,
    /// Water shallower than this reports zero velocity.
    pub velocity_height_threshold: f32,
    /// Multiplier on the square pipe cross-section. `None` scales with the
    /// grid resolution (`resolution / 10`).
    pub cross_section_scale: Option<f32>,
    pub timestep: TimestepPolicy,
    pub boundary: BoundaryMode,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            damping_factor: DEFAULT_DAMPING_FACTOR,
            initial_water_height: DEFAULT_INITIAL_WATER_HEIGHT,
            min_water_height: DEFAULT_MIN_WATER_HEIGHT,
            gravity: GRAVITY,
            max_horizontal_speed: DEFAULT_MAX_HORIZONTAL_SPEED,
            stability_multiplier: DEFAULT_STABILITY_MULTIPLIER,
            multisteps: 1,
            velocity_height_threshold: DEFAULT_VELOCITY_HEIGHT_THRESHOLD,
            cross_section_scale: None,
            timestep: TimestepPolicy::default(),
            boundary: BoundaryMode::default(),
        }
    }
}

impl WaterConfig {
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: String| Err(SimError::InvalidConfig(msg));

        if !(self.damping_factor > 0.0 && self.damping_factor <= 1.0) {
            return invalid(format!(
                "damping factor must be in (0, 1], got {}",
                self.damping_factor
            ));
        }
        if !(self.max_horizontal_speed.is_finite() && self.max_horizontal_speed > 0.0) {
            return invalid(format!(
                "max horizontal speed must be positive, got {}",
                self.max_horizontal_speed
            ));
        }
        if !(self.stability_multiplier.is_finite() && self.stability_multiplier > 0.0) {
            return invalid(format!(
                "stability multiplier must be positive, got {}",
                self.stability_multiplier
            ));
        }
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return invalid(format!("gravity must be positive, got {}", self.gravity));
        }
        if self.multisteps == 0 {
            return invalid("multisteps must be at least 1".to_string());
        }
        if !self.min_water_height.is_finite() || !self.initial_water_height.is_finite() {
            return invalid("water heights must be finite".to_string());
        }
        if self.initial_water_height < self.min_water_height {
            return invalid(format!(
                "initial water height {} is below the floor {}",
                self.initial_water_height, self.min_water_height
            ));
        }
        if let Some(scale) = self.cross_section_scale {
            if !(scale.is_finite() && scale > 0.0) {
                return invalid(format!("cross-section scale must be positive, got {scale}"));
            }
        }
        match self.timestep {
            TimestepPolicy::Fixed(dt) if !(dt.is_finite() && dt > 0.0) => {
                invalid(format!("fixed timestep must be positive, got {dt}"))
            }
            TimestepPolicy::Clamped { max } if !(max.is_finite() && max > 0.0) => {
                invalid(format!("timestep clamp must be positive, got {max}"))
            }
            _ => Ok(()),
        }
    }
}

/// Grid layout shared by the sculpt engine and the water simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    pub size: f32,
    pub resolution: usize,
    /// Resolution of the low resolution terrain preview, if wanted.
    pub proxy_resolution: Option<usize>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_DOMAIN_SIZE,
            resolution: DEFAULT_RESOLUTION,
            proxy_resolution: Some(DEFAULT_PROXY_RESOLUTION),
        }
    }
}

impl DomainConfig {
    pub fn to_domain(&self) -> SimResult<Domain> {
        Domain::new(self.size, self.resolution)
    }
}

/// Everything needed to build a terrain + water pair. Loadable from RON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub domain: DomainConfig,
    pub water: WaterConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(WaterConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_max_speed_is_rejected() {
        let config = WaterConfig {
            max_horizontal_speed: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_damping_out_of_range_is_rejected() {
        for damping in [0.0, -0.5, 1.5, f32::NAN] {
            let config = WaterConfig {
                damping_factor: damping,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "damping {damping} accepted");
        }
    }

    #[test]
    fn test_initial_height_below_floor_is_rejected() {
        let config = WaterConfig {
            initial_water_height: -1.0,
            min_water_height: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timestep_policies() {
        assert_eq!(TimestepPolicy::Fixed(0.25).resolve(3.0), 0.25);
        let clamped = TimestepPolicy::Clamped { max: 0.1 };
        assert_eq!(clamped.resolve(0.05), 0.05);
        assert_eq!(clamped.resolve(2.0), 0.1);
        assert_eq!(clamped.resolve(-1.0), 0.0);
        assert_eq!(clamped.resolve(f32::NAN), 0.0);
    }

    #[test]
    fn test_settings_from_partial_ron() {
        let settings: SimulationSettings =
            ron::de::from_str("(domain: (resolution: 32), water: (multisteps: 2))").unwrap();
        assert_eq!(settings.domain.resolution, 32);
        assert_eq!(settings.domain.size, DEFAULT_DOMAIN_SIZE);
        assert_eq!(settings.water.multisteps, 2);
        assert_eq!(settings.water.damping_factor, DEFAULT_DAMPING_FACTOR);
    }
}
