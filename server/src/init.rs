use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bevy::{
    diagnostic::{FrameTimeDiagnosticsPlugin, LogDiagnosticsPlugin},
    prelude::*,
};
use bevy_app::ScheduleRunnerPlugin;
use ron::de::from_str;
use shared::{
    PipeModelWater, SimResult, SimulationSettings, TerrainSculpt, TerrainWaterPlugin,
    TICKS_PER_SECOND,
};

use crate::world::{self, scenario::Scenario};

/// Command line options of the host, available to systems as a resource.
#[derive(Resource, Debug, Clone)]
pub struct HostConfig {
    pub scenario_path: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub frames: Option<u64>,
    pub output_dir: PathBuf,
    pub snapshot_every: u64,
    pub stats_every: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            scenario_path: None,
            settings_path: None,
            frames: None,
            output_dir: PathBuf::from("snapshots"),
            snapshot_every: 0,
            stats_every: 60,
        }
    }
}

/// Settings as loaded at startup.
#[derive(Resource, Debug, Clone)]
pub struct ActiveSettings(pub SimulationSettings);

pub fn load_settings(path: Option<&Path>) -> Result<SimulationSettings, Box<dyn Error>> {
    let Some(path) = path else {
        info!("No settings file given, using defaults");
        return Ok(SimulationSettings::default());
    };

    let contents = fs::read_to_string(path)?;
    let settings: SimulationSettings = from_str(&contents)?;
    info!("Loaded simulation settings from {}", path.display());
    Ok(settings)
}

/// Builds the terrain and water resources. Fails on any invalid setting.
pub fn build_simulation(
    settings: &SimulationSettings,
) -> SimResult<(TerrainSculpt, PipeModelWater)> {
    let domain = settings.domain.to_domain()?;
    let sculpt = TerrainSculpt::new(domain, settings.domain.proxy_resolution)?;
    let water = PipeModelWater::new(domain, settings.water.clone())?;
    Ok((sculpt, water))
}

/// Inserts everything the simulation needs into `app`, without any runner.
pub fn setup_simulation(app: &mut App, config: HostConfig) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(config.settings_path.as_deref())?;
    let scenario = match &config.scenario_path {
        Some(path) => world::scenario::load_scenario(path)?,
        None => Scenario::default(),
    };
    let (sculpt, water) = build_simulation(&settings)?;

    app.insert_resource(Time::<Fixed>::from_hz(TICKS_PER_SECOND as f64));
    app.add_plugins(TerrainWaterPlugin);
    app.insert_resource(sculpt);
    app.insert_resource(water);
    app.insert_resource(ActiveSettings(settings));
    app.insert_resource(scenario);
    app.insert_resource(config);

    world::register_systems(app);
    Ok(())
}

pub fn init(config: HostConfig) -> AppExit {
    let mut app = App::new();
    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / TICKS_PER_SECOND as f64,
        ))),
    );

    app.add_plugins(FrameTimeDiagnosticsPlugin::default());
    app.add_plugins(LogDiagnosticsPlugin::default());
    app.add_plugins(bevy::log::LogPlugin::default());

    if let Err(err) = fs::create_dir_all(&config.output_dir) {
        error!(
            "Could not create output directory {} : {}",
            config.output_dir.display(),
            err
        );
        return AppExit::error();
    }

    if let Err(err) = setup_simulation(&mut app, config) {
        error!("Failed to set up the simulation : {}", err);
        return AppExit::error();
    }

    info!("Starting simulation at {} ticks per second", TICKS_PER_SECOND);
    app.run()
}
