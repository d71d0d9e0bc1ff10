use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use bevy_log::{error, info};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use shared::{snapshot_to_payload, HeightSnapshot, PipeModelWater, TerrainSculpt};

use crate::init::HostConfig;

#[derive(Event, Debug, Clone)]
pub struct SaveRequestEvent;

/// Human readable summary written next to each snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub frame: u64,
    pub resolution: usize,
    pub size: f32,
    pub total_volume: f32,
    pub terrain_min: f32,
    pub terrain_max: f32,
    pub surface_min: f32,
    pub surface_max: f32,
    pub sculpt_revision: u64,
}

impl SnapshotSummary {
    pub fn new(sculpt: &TerrainSculpt, water: &PipeModelWater) -> Self {
        let terrain = sculpt.combined_heights();
        let surface = water.display_heights();
        Self {
            frame: water.frame(),
            resolution: water.domain().resolution(),
            size: water.domain().size(),
            total_volume: water.total_volume(),
            terrain_min: terrain.min_value(),
            terrain_max: terrain.max_value(),
            surface_min: surface.min_value(),
            surface_max: surface.max_value(),
            sculpt_revision: sculpt.revision(),
        }
    }
}

pub fn save_snapshot_system(
    sculpt: Res<TerrainSculpt>,
    water: Res<PipeModelWater>,
    config: Res<HostConfig>,
    mut events: EventReader<SaveRequestEvent>,
) {
    // Reads all events so a burst of requests only saves once
    let requested = events.read().count() > 0;
    let periodic = config.snapshot_every > 0 && water.frame() % config.snapshot_every == 0;
    if !requested && !periodic {
        return;
    }

    match save_snapshot(&config.output_dir, &sculpt, &water) {
        Ok(path) => info!(
            "Snapshot of frame {} saved to {}",
            water.frame(),
            path.display()
        ),
        Err(err) => error!("Failed to save snapshot of frame {}: {}", water.frame(), err),
    }
}

/// Writes `frame_XXXXXX.bin` and `frame_XXXXXX.ron` into `dir`. Returns the payload path.
pub fn save_snapshot(
    dir: &Path,
    sculpt: &TerrainSculpt,
    water: &PipeModelWater,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;
    let stem = format!("frame_{:06}", water.frame());

    let payload = snapshot_to_payload(&HeightSnapshot::capture(sculpt, water))?;
    let payload_path = dir.join(format!("{stem}.bin"));
    File::create(&payload_path)?.write_all(&payload)?;

    save_summary(&SnapshotSummary::new(sculpt, water), &dir.join(format!("{stem}.ron")))?;
    Ok(payload_path)
}

pub fn save_summary(
    summary: &SnapshotSummary,
    file_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    // RON Serialization config
    let pretty_config = PrettyConfig::new()
        .with_depth_limit(3)
        .with_separate_tuple_members(true)
        .with_enumerate_arrays(true);

    let serialized = ron::ser::to_string_pretty(summary, pretty_config)?;
    let mut file = File::create(file_path)?;
    file.write_all(serialized.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{payload_to_snapshot, Domain, WaterConfig};

    #[test]
    fn test_save_snapshot_writes_payload_and_summary() {
        let dir = std::env::temp_dir().join("terrain_water_save_test");
        let domain = Domain::new(2.0, 8).unwrap();
        let mut sculpt = TerrainSculpt::new(domain, None).unwrap();
        sculpt.update();
        let mut water = PipeModelWater::new(domain, WaterConfig::default()).unwrap();
        water.update(1.0 / 60.0);

        let path = save_snapshot(&dir, &sculpt, &water).unwrap();
        assert!(path.ends_with("frame_000001.bin"));

        let snapshot = payload_to_snapshot(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(snapshot.frame, 1);
        assert_eq!(snapshot.terrain.len(), 64);

        let summary: SnapshotSummary =
            ron::de::from_str(&fs::read_to_string(dir.join("frame_000001.ron")).unwrap())
                .unwrap();
        assert_eq!(summary, SnapshotSummary::new(&sculpt, &water));

        let _ = fs::remove_dir_all(dir);
    }
}
