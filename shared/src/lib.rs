pub mod constants;
pub mod error;
pub mod grid;
pub mod sculpt;
pub mod sets;
pub mod snapshot;
pub mod water;

pub use constants::*;
pub use error::{SimError, SimResult};
pub use grid::{BoundaryMask, Domain, Edge, EdgeValues, Grid, PingPong};
pub use sculpt::{SculptKind, TerrainSculpt};
pub use snapshot::{payload_to_snapshot, snapshot_to_payload, HeightSnapshot, SnapshotError};
pub use water::{
    PipeModelWater, SimulationSettings, StepReport, TerrainWaterPlugin, WaterConfig,
    WaterStepEvent, WaterTexel,
};
