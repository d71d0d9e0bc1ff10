//! Bevy plugin driving terrain sculpting and water stepping.

use bevy::prelude::*;
use bevy_log::{debug, error};

use crate::sculpt::TerrainSculpt;
use crate::sets::SimulationFixedUpdateSet;

use super::{PipeModelWater, StepReport};

/// Runs, once per fixed tick and in this order:
/// - the sculpt update (pending strokes and clears)
/// - a terrain copy into the water simulation, only when the sculpt changed
/// - the water step
///
/// [`TerrainSculpt`] and [`PipeModelWater`] are built by the host, since
/// their construction can fail, and inserted before the app runs.
pub struct TerrainWaterPlugin;

impl Plugin for TerrainWaterPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TerrainSyncState>()
            .add_event::<WaterStepEvent>()
            .configure_sets(
                FixedUpdate,
                (
                    SimulationFixedUpdateSet::Interactions,
                    SimulationFixedUpdateSet::Simulation,
                    SimulationFixedUpdateSet::Reporting,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    update_terrain_sculpt.run_if(resource_exists::<TerrainSculpt>),
                    sync_terrain_to_water.run_if(
                        resource_exists::<TerrainSculpt>.and(resource_exists::<PipeModelWater>),
                    ),
                    step_water_simulation.run_if(resource_exists::<PipeModelWater>),
                )
                    .chain()
                    .in_set(SimulationFixedUpdateSet::Simulation),
            );
    }
}

/// Sent after every water step.
#[derive(Event, Debug, Clone, Copy)]
pub struct WaterStepEvent(pub StepReport);

/// Sculpt revision last copied into the water simulation.
#[derive(Resource, Debug, Default)]
pub struct TerrainSyncState {
    pub last_revision: Option<u64>,
}

fn update_terrain_sculpt(mut sculpt: ResMut<TerrainSculpt>) {
    sculpt.update();
}

fn sync_terrain_to_water(
    sculpt: Res<TerrainSculpt>,
    mut water: ResMut<PipeModelWater>,
    mut sync_state: ResMut<TerrainSyncState>,
) {
    let revision = sculpt.revision();
    if sync_state.last_revision == Some(revision) {
        return;
    }
    match water.sync_terrain(sculpt.combined_heights()) {
        Ok(()) => {
            debug!("Terrain revision {revision} synced to water");
            sync_state.last_revision = Some(revision);
        }
        Err(err) => error!("Failed to sync terrain to water: {err}"),
    }
}

fn step_water_simulation(
    mut water: ResMut<PipeModelWater>,
    time: Res<Time<Fixed>>,
    mut step_events: EventWriter<WaterStepEvent>,
) {
    let report = water.update(time.delta_secs());
    step_events.write(WaterStepEvent(report));
}
