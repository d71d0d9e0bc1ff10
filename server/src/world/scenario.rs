//! Scripted interaction scenarios.
//!
//! A scenario is a RON file listing actions keyed by the fixed tick they
//! fire on. Each action is turned into the same events a live input layer
//! would send, so scripted and interactive runs share one code path.
//!
//! ```ron
//! (
//!     actions: [
//!         (frame: 0, action: LoadHeightmap(path: "hm1.png", height_scale: 3.0)),
//!         (frame: 10, action: Sculpt(kind: Add, center: (0.5, 0.5))),
//!         (frame: 30, action: Flood(volume_rate: 2.0)),
//!         (frame: 120, action: Save),
//!     ],
//!     rain: Some((drops_per_frame: 2, amount: 0.05, size: 0.05, seed: Some(7))),
//! )
//! ```

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use bevy_ecs::system::SystemParam;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ron::de::from_str;
use serde::{Deserialize, Serialize};
use shared::SculptKind;

use super::heightmap_loading::HeightmapLoadRequestEvent;
use super::save::SaveRequestEvent;
use super::{BrushSettingsEvent, ClearSculptsEvent, FloodEvent, SculptEvent, WaterSourceEvent};

const DEFAULT_PREBLUR: f32 = 1.0;
const DEFAULT_HEIGHT_SCALE: f32 = 3.0;

fn default_preblur() -> f32 {
    DEFAULT_PREBLUR
}

fn default_height_scale() -> f32 {
    DEFAULT_HEIGHT_SCALE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScenarioAction {
    /// Brush stroke at a UV position. Missing values come from the current brush.
    Sculpt {
        kind: SculptKind,
        center: Vec2,
        #[serde(default)]
        amount: Option<f32>,
        #[serde(default)]
        radius: Option<f32>,
    },
    SetBrush {
        /// World-space brush size.
        #[serde(default)]
        size: Option<f32>,
        #[serde(default)]
        amount: Option<f32>,
    },
    ClearSculpts,
    Source {
        center: Vec2,
        amount: f32,
        size: Vec2,
    },
    /// Volume per second spread over the domain every tick from now on. 0 stops flooding.
    Flood { volume_rate: f32 },
    LoadHeightmap {
        path: PathBuf,
        #[serde(default = "default_height_scale")]
        height_scale: f32,
        #[serde(default)]
        invert_mid_grey: bool,
        /// Gaussian blur sigma applied before sampling, in pixels.
        #[serde(default = "default_preblur")]
        preblur: f32,
    },
    Save,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedAction {
    pub frame: u64,
    pub action: ScenarioAction,
}

/// Random sources dropped every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainSettings {
    pub drops_per_frame: u32,
    pub amount: f32,
    /// UV radius of each drop.
    pub size: f32,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub actions: Vec<TimedAction>,
    pub rain: Option<RainSettings>,
}

impl Scenario {
    pub fn from_ron(contents: &str) -> Result<Self, ron::de::Error> {
        let mut scenario: Scenario = from_str(contents)?;
        scenario.actions.sort_by_key(|timed| timed.frame);
        Ok(scenario)
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let scenario = Scenario::from_ron(&contents)?;
    info!(
        "Loaded scenario {} with {} action(s)",
        path.display(),
        scenario.actions.len()
    );
    Ok(scenario)
}

#[derive(Resource, Debug, Default)]
pub struct ScenarioState {
    pub frame: u64,
    next_action: usize,
    flood_rate: f32,
    rng: Option<StdRng>,
}

impl ScenarioState {
    pub fn flood_rate(&self) -> f32 {
        self.flood_rate
    }
}

#[derive(SystemParam)]
pub struct ScenarioWriters<'w> {
    sculpt: EventWriter<'w, SculptEvent>,
    brush: EventWriter<'w, BrushSettingsEvent>,
    clear: EventWriter<'w, ClearSculptsEvent>,
    source: EventWriter<'w, WaterSourceEvent>,
    flood: EventWriter<'w, FloodEvent>,
    heightmap: EventWriter<'w, HeightmapLoadRequestEvent>,
    save: EventWriter<'w, SaveRequestEvent>,
}

pub fn run_scenario_system(
    scenario: Res<Scenario>,
    mut state: ResMut<ScenarioState>,
    time: Res<Time<Fixed>>,
    mut writers: ScenarioWriters,
) {
    let frame = state.frame;

    while let Some(timed) = scenario.actions.get(state.next_action) {
        if timed.frame > frame {
            break;
        }
        state.next_action += 1;
        debug!("Frame {frame}: running {:?}", timed.action);
        dispatch_action(&timed.action, &mut *state, &mut writers);
    }

    if state.flood_rate != 0.0 {
        writers.flood.write(FloodEvent {
            volume: state.flood_rate * time.delta_secs(),
        });
    }

    if let Some(rain) = &scenario.rain {
        let rng = state.rng.get_or_insert_with(|| match rain.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        });
        for _ in 0..rain.drops_per_frame {
            let center = Vec2::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
            writers.source.write(WaterSourceEvent {
                center_uv: center,
                amount: rain.amount,
                size: Vec2::splat(rain.size),
            });
        }
    }

    state.frame += 1;
}

fn dispatch_action(
    action: &ScenarioAction,
    state: &mut ScenarioState,
    writers: &mut ScenarioWriters,
) {
    match action {
        ScenarioAction::Sculpt {
            kind,
            center,
            amount,
            radius,
        } => {
            writers.sculpt.write(SculptEvent {
                kind: *kind,
                center_uv: *center,
                amount: *amount,
                radius: *radius,
            });
        }
        ScenarioAction::SetBrush { size, amount } => {
            writers.brush.write(BrushSettingsEvent {
                size: *size,
                amount: *amount,
            });
        }
        ScenarioAction::ClearSculpts => {
            writers.clear.write(ClearSculptsEvent);
        }
        ScenarioAction::Source {
            center,
            amount,
            size,
        } => {
            writers.source.write(WaterSourceEvent {
                center_uv: *center,
                amount: *amount,
                size: *size,
            });
        }
        ScenarioAction::Flood { volume_rate } => {
            info!("Flood rate set to {volume_rate}");
            state.flood_rate = *volume_rate;
        }
        ScenarioAction::LoadHeightmap {
            path,
            height_scale,
            invert_mid_grey,
            preblur,
        } => {
            if !path.exists() {
                warn!("Heightmap {} not found, skipping", path.display());
                return;
            }
            writers.heightmap.write(HeightmapLoadRequestEvent {
                path: path.clone(),
                height_scale: *height_scale,
                invert_mid_grey: *invert_mid_grey,
                preblur: *preblur,
            });
        }
        ScenarioAction::Save => {
            writers.save.write(SaveRequestEvent);
        }
    }
}
