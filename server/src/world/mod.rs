pub mod heightmap_loading;
pub mod save;
pub mod scenario;
pub mod stats;

use bevy::prelude::*;
use shared::sets::SimulationFixedUpdateSet;
use shared::{PipeModelWater, SculptKind, TerrainSculpt};

use heightmap_loading::{HeightmapLoadRequestEvent, HeightmapTasks};
use save::SaveRequestEvent;
use scenario::ScenarioState;
use stats::SimulationStats;

/// A brush stroke. Without `amount` and `radius` the current brush is used.
#[derive(Event, Debug, Clone)]
pub struct SculptEvent {
    pub kind: SculptKind,
    pub center_uv: Vec2,
    pub amount: Option<f32>,
    pub radius: Option<f32>,
}

#[derive(Event, Debug, Clone)]
pub struct BrushSettingsEvent {
    /// Brush size in world units.
    pub size: Option<f32>,
    pub amount: Option<f32>,
}

#[derive(Event, Debug, Clone)]
pub struct ClearSculptsEvent;

#[derive(Event, Debug, Clone)]
pub struct WaterSourceEvent {
    pub center_uv: Vec2,
    pub amount: f32,
    pub size: Vec2,
}

/// Volume to spread over the whole domain on the next step.
#[derive(Event, Debug, Clone)]
pub struct FloodEvent {
    pub volume: f32,
}

pub fn handle_sculpt_events(
    mut sculpt: ResMut<TerrainSculpt>,
    mut brush_events: EventReader<BrushSettingsEvent>,
    mut clear_events: EventReader<ClearSculptsEvent>,
    mut sculpt_events: EventReader<SculptEvent>,
) {
    for event in brush_events.read() {
        if let Some(size) = event.size {
            if let Err(err) = sculpt.set_brush_size(size) {
                warn!("Ignoring brush size {size}: {err}");
            }
        }
        if let Some(amount) = event.amount {
            sculpt.set_brush_amount(amount);
        }
        debug!("Brush is now {:?}", sculpt.brush());
    }

    if clear_events.read().count() > 0 {
        sculpt.clear();
    }

    for event in sculpt_events.read() {
        let brush = *sculpt.brush();
        let result = sculpt.sculpt(
            event.kind,
            event.center_uv,
            event.amount.unwrap_or(brush.amount),
            event.radius.unwrap_or(brush.radius),
        );
        if let Err(err) = result {
            warn!("Ignoring sculpt stroke at {}: {err}", event.center_uv);
        }
    }
}

pub fn handle_water_events(
    mut water: ResMut<PipeModelWater>,
    mut source_events: EventReader<WaterSourceEvent>,
    mut flood_events: EventReader<FloodEvent>,
) {
    for event in source_events.read() {
        if let Err(err) = water.source(event.center_uv, event.amount, event.size.x, event.size.y) {
            warn!("Ignoring water source at {}: {err}", event.center_uv);
        }
    }

    for event in flood_events.read() {
        water.flood(event.volume);
    }
}

pub fn register_systems(app: &mut App) {
    app.add_event::<SculptEvent>()
        .add_event::<BrushSettingsEvent>()
        .add_event::<ClearSculptsEvent>()
        .add_event::<WaterSourceEvent>()
        .add_event::<FloodEvent>()
        .add_event::<HeightmapLoadRequestEvent>()
        .add_event::<SaveRequestEvent>();

    app.init_resource::<ScenarioState>()
        .init_resource::<HeightmapTasks>()
        .init_resource::<SimulationStats>();

    app.add_systems(
        FixedUpdate,
        (
            scenario::run_scenario_system,
            heightmap_loading::spawn_heightmap_tasks_system,
            heightmap_loading::apply_loaded_heightmaps_system,
            handle_sculpt_events,
            handle_water_events,
        )
            .chain()
            .in_set(SimulationFixedUpdateSet::Interactions),
    );

    app.add_systems(
        FixedUpdate,
        (
            stats::collect_stats_system,
            save::save_snapshot_system,
            stats::frame_limit_system,
        )
            .chain()
            .in_set(SimulationFixedUpdateSet::Reporting),
    );
}
