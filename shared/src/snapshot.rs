//! Compressed snapshots of the exposed height buffers.
//!
//! Payload layout: bincode-encoded [`HeightSnapshot`], then lz4 block
//! compression with the uncompressed size prepended.

use bevy_log::debug;
use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::sculpt::TerrainSculpt;
use crate::water::PipeModelWater;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightSnapshot {
    pub frame: u64,
    pub resolution: usize,
    /// Domain side length in world units.
    pub size: f32,
    /// Combined terrain heights, row-major.
    pub terrain: Vec<f32>,
    /// Composited terrain + water heights, row-major.
    pub water_display: Vec<f32>,
}

impl HeightSnapshot {
    pub fn capture(sculpt: &TerrainSculpt, water: &PipeModelWater) -> Self {
        let domain = water.domain();
        Self {
            frame: water.frame(),
            resolution: domain.resolution(),
            size: domain.size(),
            terrain: sculpt.combined_heights().cells().to_vec(),
            water_display: water.display_heights().cells().to_vec(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] bincode::Error),
    #[error("snapshot compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

pub fn snapshot_to_payload(snapshot: &HeightSnapshot) -> Result<Vec<u8>, SnapshotError> {
    let payload = bincode::options().serialize(snapshot)?;
    let output = lz4::block::compress(&payload, None, true)?;
    debug!(
        "Snapshot of frame {} compressed from {} to {} bytes",
        snapshot.frame,
        payload.len(),
        output.len()
    );
    Ok(output)
}

pub fn payload_to_snapshot(payload: &[u8]) -> Result<HeightSnapshot, SnapshotError> {
    let decompressed_payload = lz4::block::decompress(payload, None)?;
    Ok(bincode::options().deserialize(&decompressed_payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Domain;
    use crate::water::WaterConfig;

    #[test]
    fn test_payload_round_trip() {
        let domain = Domain::new(2.0, 8).unwrap();
        let mut sculpt = TerrainSculpt::new(domain, None).unwrap();
        sculpt.update();
        let mut water = PipeModelWater::new(domain, WaterConfig::default()).unwrap();
        water.update(1.0 / 60.0);

        let snapshot = HeightSnapshot::capture(&sculpt, &water);
        assert_eq!(snapshot.frame, 1);
        assert_eq!(snapshot.water_display.len(), 64);

        let payload = snapshot_to_payload(&snapshot).unwrap();
        assert_eq!(payload_to_snapshot(&payload).unwrap(), snapshot);
    }

    #[test]
    fn test_garbage_payload_is_an_error() {
        assert!(payload_to_snapshot(&[1, 2, 3]).is_err());
    }
}
