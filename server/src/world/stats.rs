use bevy::prelude::*;
use bevy_log::info;
use shared::{PipeModelWater, StepReport, TerrainSculpt, WaterStepEvent};

use crate::init::HostConfig;

#[derive(Resource, Debug, Default)]
pub struct SimulationStats {
    pub last_report: Option<StepReport>,
    pub initial_volume: Option<f32>,
    pub max_substeps: u32,
}

impl SimulationStats {
    pub fn record(&mut self, report: StepReport) {
        self.initial_volume.get_or_insert(report.total_volume);
        self.max_substeps = self.max_substeps.max(report.substeps);
        self.last_report = Some(report);
    }

    /// Change in total volume since the first recorded step.
    pub fn volume_change(&self) -> f32 {
        match (self.initial_volume, self.last_report) {
            (Some(initial), Some(report)) => report.total_volume - initial,
            _ => 0.0,
        }
    }
}

pub fn collect_stats_system(
    mut stats: ResMut<SimulationStats>,
    mut step_events: EventReader<WaterStepEvent>,
    config: Res<HostConfig>,
    water: Res<PipeModelWater>,
    sculpt: Res<TerrainSculpt>,
) {
    let mut stepped = false;
    for WaterStepEvent(report) in step_events.read() {
        stats.record(*report);
        stepped = true;
    }
    if !stepped || config.stats_every == 0 || water.frame() % config.stats_every != 0 {
        return;
    }

    let water_heights = water.water().cells().iter().map(|texel| texel.height);
    let (min_height, max_height) = water_heights.fold((f32::MAX, f32::MIN), |(lo, hi), h| {
        (lo.min(h), hi.max(h))
    });
    let substeps = stats.last_report.map_or(0, |report| report.substeps);

    info!(
        "Frame {}: volume {:.4} (change {:+.4}), water height [{:.3}, {:.3}], terrain max {:.3}, {} substeps",
        water.frame(),
        water.total_volume(),
        stats.volume_change(),
        min_height,
        max_height,
        sculpt.combined_heights().max_value(),
        substeps
    );
}

pub fn frame_limit_system(
    config: Res<HostConfig>,
    water: Res<PipeModelWater>,
    mut exit: EventWriter<AppExit>,
) {
    if let Some(frames) = config.frames {
        if water.frame() >= frames {
            info!("Reached frame limit of {frames}, exiting");
            exit.write(AppExit::Success);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(frame: u64, volume: f32, substeps: u32) -> StepReport {
        StepReport {
            frame,
            dt: 1.0 / 60.0,
            substeps,
            multisteps: 1,
            disturbed: false,
            total_volume: volume,
        }
    }

    #[test]
    fn test_stats_track_volume_change() {
        let mut stats = SimulationStats::default();
        assert_eq!(stats.volume_change(), 0.0);

        stats.record(report(1, 10.0, 4));
        stats.record(report(2, 10.5, 6));
        stats.record(report(3, 10.25, 5));

        assert_eq!(stats.initial_volume, Some(10.0));
        assert_eq!(stats.max_substeps, 6);
        assert!((stats.volume_change() - 0.25).abs() < 1e-6);
    }
}
