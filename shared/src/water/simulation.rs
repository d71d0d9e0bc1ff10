//! Frame driver for the pipe-model water.
//!
//! One [`PipeModelWater::update`] call:
//! 1. resolves the simulated delta from the [`TimestepPolicy`](super::TimestepPolicy)
//! 2. picks a substep count from the CFL bound
//! 3. runs `multisteps` full steps, each one disturb pass followed by
//!    `substeps` flux + height passes
//! 4. composites terrain and water into the display heights

use bevy::math::Vec2;
use bevy_ecs::resource::Resource;
use bevy_log::{debug, info};

use crate::error::{SimError, SimResult};
use crate::grid::{BoundaryMask, Domain, EdgeValues, Grid, PingPong};

use super::config::WaterConfig;
use super::disturb::{Disturbances, PointSource};
use super::flux::{solve_flux, FluxParams};
use super::height::{integrate_heights, HeightParams};
use super::WaterTexel;

/// What one frame of simulation did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub frame: u64,
    /// Simulated time of each full step.
    pub dt: f32,
    pub substeps: u32,
    pub multisteps: u32,
    /// True if pending sources or flood were applied this frame.
    pub disturbed: bool,
    pub total_volume: f32,
}

#[derive(Resource, Debug, Clone)]
pub struct PipeModelWater {
    domain: Domain,
    config: WaterConfig,
    terrain: Grid<f32>,
    water: PingPong<WaterTexel>,
    flux: PingPong<EdgeValues>,
    boundary: BoundaryMask,
    display: Grid<f32>,
    disturbances: Disturbances,
    frame: u64,
    /// `cross_section_area * gravity / pipe_length`, multiplied by the substep dt per pass.
    height_to_flux: f32,
    max_stable_dt: f32,
}

impl PipeModelWater {
    pub fn new(domain: Domain, config: WaterConfig) -> SimResult<Self> {
        config.validate()?;

        let resolution = domain.resolution();
        let pitch = domain.cell_pitch();
        let cross_section_scale = config
            .cross_section_scale
            .unwrap_or(resolution as f32 / 10.0);
        let cross_section_area = pitch * pitch * cross_section_scale;
        let height_to_flux = cross_section_area * config.gravity / pitch;

        let max_stable_dt = pitch / config.max_horizontal_speed;
        if !(max_stable_dt.is_finite() && max_stable_dt > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "maximum stable timestep must be positive, got {max_stable_dt}"
            )));
        }

        let mut water = Self {
            domain,
            terrain: Grid::new(resolution, 0.0),
            water: PingPong::new(Grid::new(
                resolution,
                WaterTexel::new(config.initial_water_height),
            )),
            flux: PingPong::new(Grid::new(resolution, EdgeValues::ZERO)),
            boundary: BoundaryMask::from_mode(config.boundary, resolution),
            display: Grid::new(resolution, 0.0),
            disturbances: Disturbances::default(),
            frame: 0,
            height_to_flux,
            max_stable_dt,
            config,
        };
        water.composite();

        info!(
            "Water simulation created: {resolution}x{resolution} cells over {} units, {:?} boundary (sealed: {})",
            domain.size(),
            water.config.boundary,
            water.boundary.is_sealed()
        );
        Ok(water)
    }

    /// Number of substeps a full step of `dt` is split into.
    pub fn substeps_for(&self, dt: f32) -> u32 {
        let steps = (self.config.stability_multiplier * dt / self.max_stable_dt).ceil();
        if steps.is_finite() && steps >= 1.0 {
            steps as u32
        } else {
            1
        }
    }

    pub fn update(&mut self, frame_dt: f32) -> StepReport {
        let dt = self.config.timestep.resolve(frame_dt);
        let substeps = self.substeps_for(dt);
        let substep_dt = dt / substeps as f32;
        let multisteps = self.config.multisteps;

        let mut disturbed = false;
        for _ in 0..multisteps {
            disturbed |= self.disturbances.apply(
                &self.domain,
                &self.boundary,
                self.config.min_water_height,
                self.water.current_mut(),
            );
            for _ in 0..substeps {
                self.flux_pass(substep_dt);
                self.height_pass(substep_dt);
            }
        }

        self.composite();
        self.frame += 1;

        let report = StepReport {
            frame: self.frame,
            dt,
            substeps,
            multisteps,
            disturbed,
            total_volume: self.total_volume(),
        };
        debug!(
            "Water frame {}: {} x {} substeps of {:.5}s, volume {:.4}",
            report.frame, multisteps, substeps, substep_dt, report.total_volume
        );
        report
    }

    fn flux_pass(&mut self, dt: f32) {
        let params = FluxParams {
            damping_factor: self.config.damping_factor,
            height_to_flux: self.height_to_flux * dt,
            cell_area: self.domain.cell_area(),
            min_water_height: self.config.min_water_height,
            dt,
        };
        let (flux_in, flux_out) = self.flux.split();
        solve_flux(
            &params,
            &self.terrain,
            self.water.current(),
            &self.boundary,
            flux_in,
            flux_out,
        );
        self.flux.swap();
    }

    fn height_pass(&mut self, dt: f32) {
        let params = HeightParams {
            dt,
            cell_area: self.domain.cell_area(),
            cell_pitch: self.domain.cell_pitch(),
            min_water_height: self.config.min_water_height,
            velocity_height_threshold: self.config.velocity_height_threshold,
        };
        let (water_in, water_out) = self.water.split();
        integrate_heights(&params, water_in, self.flux.current(), water_out);
        self.water.swap();
    }

    fn composite(&mut self) {
        let floor = self.config.min_water_height;
        let water = self.water.current();
        for (x, z) in water.coords() {
            let factor = self.boundary.cell_factor(x, z);
            let surface = self.terrain.get(x, z) + water.get(x, z).height;
            self.display
                .set(x, z, surface * factor + (1.0 - factor) * floor);
        }
    }

    /// Queues a one-shot elliptical source centred at `center_uv`. All sources
    /// queued before the next update are applied by it.
    pub fn source(&mut self, center_uv: Vec2, amount: f32, size_x: f32, size_y: f32) -> SimResult<()> {
        let size = Vec2::new(size_x, size_y);
        if !(size.is_finite() && size.min_element() > 0.0) {
            return Err(SimError::InvalidArgument(format!(
                "source size must be positive, got {size}"
            )));
        }
        if !(amount.is_finite() && center_uv.is_finite()) {
            return Err(SimError::InvalidArgument(format!(
                "source must be finite, got amount {amount} at {center_uv}"
            )));
        }
        self.disturbances.push_source(PointSource {
            center: center_uv,
            amount,
            size,
        });
        Ok(())
    }

    pub fn source_at_world(
        &mut self,
        world_xz: Vec2,
        amount: f32,
        size_x: f32,
        size_y: f32,
    ) -> SimResult<()> {
        let uv = self.domain.world_to_uv(world_xz);
        self.source(uv, amount, size_x, size_y)
    }

    /// Adds `volume_rate / domain area` to every open cell on the next update.
    pub fn flood(&mut self, volume_rate: f32) {
        if volume_rate.is_finite() && volume_rate != 0.0 {
            self.disturbances.set_flood(volume_rate / self.domain.area());
        }
    }

    /// Copies new terrain heights in. Takes effect from the next update.
    pub fn sync_terrain(&mut self, terrain: &Grid<f32>) -> SimResult<()> {
        if terrain.resolution() != self.terrain.resolution() {
            return Err(SimError::InvalidArgument(format!(
                "terrain resolution {} does not match water resolution {}",
                terrain.resolution(),
                self.terrain.resolution()
            )));
        }
        self.terrain.copy_from(terrain);
        Ok(())
    }

    /// Sum of water height times cell area over the whole grid.
    pub fn total_volume(&self) -> f32 {
        let cell_area = self.domain.cell_area();
        self.water
            .current()
            .cells()
            .iter()
            .map(|texel| texel.height as f64)
            .sum::<f64>() as f32
            * cell_area
    }

    pub fn water(&self) -> &Grid<WaterTexel> {
        self.water.current()
    }

    pub fn flux(&self) -> &Grid<EdgeValues> {
        self.flux.current()
    }

    pub fn terrain(&self) -> &Grid<f32> {
        &self.terrain
    }

    /// Terrain plus water, with fully masked cells pinned to the floor.
    pub fn display_heights(&self) -> &Grid<f32> {
        &self.display
    }

    pub fn boundary(&self) -> &BoundaryMask {
        &self.boundary
    }

    /// Mask edits (obstacles) take effect from the next update.
    pub fn boundary_mut(&mut self) -> &mut BoundaryMask {
        &mut self.boundary
    }

    pub fn config(&self) -> &WaterConfig {
        &self.config
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn has_pending_disturbances(&self) -> bool {
        !self.disturbances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FIXED_FRAME_DT;
    use crate::grid::boundary::BoundaryMode;
    use crate::water::config::TimestepPolicy;

    fn pool(initial_height: f32) -> PipeModelWater {
        let domain = Domain::new(1.0, 4).unwrap();
        let config = WaterConfig {
            initial_water_height: initial_height,
            min_water_height: 0.0,
            ..Default::default()
        };
        PipeModelWater::new(domain, config).unwrap()
    }

    fn bumpy_terrain(resolution: usize) -> Grid<f32> {
        let mut terrain = Grid::new(resolution, 0.0);
        for (x, z) in terrain.coords().collect::<Vec<_>>() {
            terrain.set(x, z, ((x * 7 + z * 3) % 5) as f32 * 0.1);
        }
        terrain
    }

    #[test]
    fn test_flat_pool_is_at_rest() {
        let mut water = pool(1.0);
        for _ in 0..100 {
            water.update(FIXED_FRAME_DT);
        }
        for texel in water.water().cells() {
            assert!((texel.height - 1.0).abs() < 1e-4);
            assert!(texel.velocity.length() < 1e-4);
        }
    }

    #[test]
    fn test_closed_domain_conserves_volume() {
        let domain = Domain::new(2.0, 16).unwrap();
        let config = WaterConfig {
            initial_water_height: 0.5,
            boundary: BoundaryMode::Walled,
            ..Default::default()
        };
        let mut water = PipeModelWater::new(domain, config).unwrap();
        assert!(water.boundary().is_sealed());
        water.sync_terrain(&bumpy_terrain(16)).unwrap();

        let initial = water.total_volume();
        for _ in 0..200 {
            water.update(FIXED_FRAME_DT);
        }
        let relative = (water.total_volume() - initial).abs() / initial;
        assert!(relative < 1e-3, "volume drifted by {relative}");
    }

    #[test]
    fn test_heights_stay_above_floor_and_flux_non_negative() {
        let domain = Domain::new(2.0, 12).unwrap();
        let config = WaterConfig {
            initial_water_height: 0.02,
            ..Default::default()
        };
        let floor = config.min_water_height;
        let mut water = PipeModelWater::new(domain, config).unwrap();
        water.sync_terrain(&bumpy_terrain(12)).unwrap();
        water.source(Vec2::splat(0.5), -0.5, 0.3, 0.3).unwrap();

        for _ in 0..50 {
            water.update(FIXED_FRAME_DT);
            for texel in water.water().cells() {
                assert!(texel.height >= floor);
            }
            for edges in water.flux().cells() {
                assert!(edges.min_component() >= 0.0);
            }
        }
    }

    #[test]
    fn test_single_source_adds_bounded_volume() {
        let mut water = pool(0.0);
        let before = water.total_volume();
        water.source(Vec2::splat(0.5), 0.1, 0.2, 0.2).unwrap();

        let report = water.update(FIXED_FRAME_DT);

        assert!(report.disturbed);
        let after = water.total_volume();
        let cell_area = water.domain().cell_area();
        assert!(after > before);
        assert!(after - before <= 0.1 * cell_area * 16.0);
        assert!(!water.has_pending_disturbances());
    }

    #[test]
    fn test_flood_raises_open_cells() {
        let mut water = pool(0.0);
        water.flood(0.5);
        water.update(FIXED_FRAME_DT);

        // only the 2x2 interior is open under the default closed border
        let expected = 0.5 / water.domain().area() * 4.0 * water.domain().cell_area();
        assert!((water.total_volume() - expected).abs() < 1e-5);
    }

    #[test]
    fn test_multisteps_apply_disturbances_once() {
        let domain = Domain::new(1.0, 4).unwrap();
        let config = WaterConfig {
            initial_water_height: 0.0,
            min_water_height: 0.0,
            multisteps: 3,
            ..Default::default()
        };
        let mut water = PipeModelWater::new(domain, config).unwrap();
        water.flood(0.5);
        water.source(Vec2::splat(0.5), 0.1, 0.2, 0.2).unwrap();

        let report = water.update(FIXED_FRAME_DT);

        assert!(report.disturbed);
        assert_eq!(report.multisteps, 3);
        assert!(!water.has_pending_disturbances());

        // flood on the 2x2 open interior plus the source falloff at the four interior cells
        let cell_area = domain.cell_area();
        let source = PointSource {
            center: Vec2::splat(0.5),
            amount: 0.1,
            size: Vec2::splat(0.2),
        };
        let added_height: f32 = [(1, 1), (2, 1), (1, 2), (2, 2)]
            .iter()
            .map(|&(x, z)| 0.5 / domain.area() + source.contribution(domain.cell_uv(x, z)))
            .sum();
        let expected = added_height * cell_area;
        assert!(
            (water.total_volume() - expected).abs() < 1e-5,
            "expected {expected}, got {}",
            water.total_volume()
        );
    }

    #[test]
    fn test_substeps_follow_cfl_bound() {
        let water = pool(1.0);
        // pitch 0.25, max speed 10 -> stable dt 0.025; 5 * (1/60) / 0.025 = 3.33
        assert_eq!(water.substeps_for(FIXED_FRAME_DT), 4);
        assert_eq!(water.substeps_for(0.0), 1);

        let default_sized =
            PipeModelWater::new(Domain::new(6.0, 256).unwrap(), WaterConfig::default()).unwrap();
        assert_eq!(default_sized.substeps_for(FIXED_FRAME_DT), 36);
    }

    #[test]
    fn test_zero_max_speed_is_invalid_config() {
        let config = WaterConfig {
            max_horizontal_speed: 0.0,
            ..Default::default()
        };
        let result = PipeModelWater::new(Domain::new(1.0, 4).unwrap(), config);
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_fixed_policy_ignores_frame_delta() {
        let mut water = pool(1.0);
        let report = water.update(3.0);
        assert_eq!(report.dt, FIXED_FRAME_DT);
        assert_eq!(report.frame, 1);
    }

    #[test]
    fn test_clamped_policy_and_multisteps() {
        let domain = Domain::new(1.0, 4).unwrap();
        let config = WaterConfig {
            timestep: TimestepPolicy::Clamped { max: 0.05 },
            multisteps: 3,
            ..Default::default()
        };
        let mut water = PipeModelWater::new(domain, config).unwrap();

        let report = water.update(1.0);
        assert_eq!(report.dt, 0.05);
        assert_eq!(report.multisteps, 3);
        assert_eq!(report.substeps, 10);
    }

    #[test]
    fn test_sync_terrain_rejects_resolution_mismatch() {
        let mut water = pool(1.0);
        let result = water.sync_terrain(&Grid::new(8, 0.0));
        assert!(matches!(result, Err(SimError::InvalidArgument(_))));
        assert_eq!(water.terrain().sum(), 0.0);
    }

    #[test]
    fn test_source_rejects_degenerate_size() {
        let mut water = pool(1.0);
        assert!(water.source(Vec2::splat(0.5), 0.1, 0.0, 0.2).is_err());
        assert!(!water.has_pending_disturbances());
    }

    #[test]
    fn test_display_pins_masked_cells_to_floor() {
        let mut water = pool(1.0);
        let mut terrain = Grid::new(4, 0.0);
        terrain.fill(0.5);
        water.sync_terrain(&terrain).unwrap();
        water.update(FIXED_FRAME_DT);

        let display = water.display_heights();
        assert_eq!(display.get(0, 0), 0.0);
        assert!((display.get(1, 1) - 1.5).abs() < 1e-4);
    }
}
