use bevy::prelude::*;

/// Ordering of the per-tick work in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationFixedUpdateSet {
    /// Host input: scripted actions, loaded heightmaps.
    Interactions,
    /// Sculpt update, terrain sync and water step.
    Simulation,
    /// Statistics and snapshots of the finished tick.
    Reporting,
}
