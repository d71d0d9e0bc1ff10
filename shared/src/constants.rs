/// Side length of the simulated square domain, in world units.
pub const DEFAULT_DOMAIN_SIZE: f32 = 6.0;
/// Cells per side of the terrain and water grids.
pub const DEFAULT_RESOLUTION: usize = 256;
/// Cells per side of the low resolution terrain preview.
pub const DEFAULT_PROXY_RESOLUTION: usize = 64;

pub const TICKS_PER_SECOND: u64 = 60;
/// Frame delta the water simulation is pinned to under the fixed timestep policy.
pub const FIXED_FRAME_DT: f32 = 1.0 / TICKS_PER_SECOND as f32;

pub const GRAVITY: f32 = 9.81;
pub const DEFAULT_DAMPING_FACTOR: f32 = 0.995;
pub const DEFAULT_INITIAL_WATER_HEIGHT: f32 = 2.5;
/// Water is allowed to sink slightly below the terrain so dry cells hide under it.
pub const DEFAULT_MIN_WATER_HEIGHT: f32 = -0.05;
/// Upper-bound estimate of horizontal wave speed used by the CFL bound.
pub const DEFAULT_MAX_HORIZONTAL_SPEED: f32 = 10.0;
/// Empirical safety factor on the CFL substep count.
pub const DEFAULT_STABILITY_MULTIPLIER: f32 = 5.0;
/// Below this water height the integrator reports zero velocity.
pub const DEFAULT_VELOCITY_HEIGHT_THRESHOLD: f32 = 0.2;

pub const DEFAULT_BRUSH_RADIUS_UV: f32 = 0.1;
pub const DEFAULT_BRUSH_AMOUNT: f32 = 0.05;

pub const HEIGHT_SAMPLE_MAX: f32 = 255.0;
pub const RGBA_CHANNELS: usize = 4;
