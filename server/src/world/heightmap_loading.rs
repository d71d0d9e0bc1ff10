use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;
use image::imageops::FilterType;
use image::ImageResult;
use log::info;
use shared::TerrainSculpt;

const MAX_CONCURRENT_HEIGHTMAP_TASKS: usize = 2;

#[derive(Event, Debug, Clone)]
pub struct HeightmapLoadRequestEvent {
    pub path: PathBuf,
    pub height_scale: f32,
    pub invert_mid_grey: bool,
    /// Gaussian blur sigma in pixels, 0 disables it.
    pub preblur: f32,
}

/// Heightmap decodes running on the async compute pool.
#[derive(Resource, Default)]
pub struct HeightmapTasks {
    pub tasks: Vec<(HeightmapLoadRequestEvent, Task<ImageResult<Vec<u8>>>)>,
    /// Requests waiting for a free task slot.
    pub queued: VecDeque<HeightmapLoadRequestEvent>,
}

/// Decodes an image into one RGBA pixel per cell of a `resolution²` grid.
pub fn decode_heightmap(path: &Path, resolution: u32, preblur: f32) -> ImageResult<Vec<u8>> {
    let image = image::open(path)?;
    let image = image.resize_exact(resolution, resolution, FilterType::Triangle);
    let image = if preblur > 0.0 {
        image.blur(preblur)
    } else {
        image
    };
    Ok(image.to_rgba8().into_raw())
}

pub fn spawn_heightmap_tasks_system(
    sculpt: Res<TerrainSculpt>,
    mut requests: EventReader<HeightmapLoadRequestEvent>,
    mut heightmap_tasks: ResMut<HeightmapTasks>,
) {
    heightmap_tasks.queued.extend(requests.read().cloned());

    let task_pool = AsyncComputeTaskPool::get();
    let resolution = sculpt.domain().resolution() as u32;

    while heightmap_tasks.tasks.len() < MAX_CONCURRENT_HEIGHTMAP_TASKS {
        let Some(request) = heightmap_tasks.queued.pop_front() else {
            break;
        };
        info!("Decoding heightmap {}", request.path.display());

        let path = request.path.clone();
        let preblur = request.preblur;
        let task =
            task_pool.spawn(async move { decode_heightmap(&path, resolution, preblur) });
        heightmap_tasks.tasks.push((request, task));
    }
}

/// Hands finished decodes over to the sculpt engine. Runs before the
/// simulation systems, so a decode never blocks a step.
pub fn apply_loaded_heightmaps_system(
    mut sculpt: ResMut<TerrainSculpt>,
    mut heightmap_tasks: ResMut<HeightmapTasks>,
) {
    let mut completed = Vec::new();
    for (index, (_, task)) in heightmap_tasks.tasks.iter_mut().enumerate() {
        if let Some(result) = future::block_on(future::poll_once(task)) {
            completed.push((index, result));
        }
    }

    // in reverse order so earlier indices stay valid
    for (index, result) in completed.into_iter().rev() {
        let (request, _) = heightmap_tasks.tasks.swap_remove(index);
        match result {
            Ok(pixels) => {
                if let Err(err) = sculpt.load_base_heights_rgba(
                    &pixels,
                    request.height_scale,
                    request.invert_mid_grey,
                ) {
                    error!(
                        "Heightmap {} could not be applied : {}",
                        request.path.display(),
                        err
                    );
                }
            }
            Err(err) => error!(
                "Failed to decode heightmap {} : {}",
                request.path.display(),
                err
            ),
        }
    }
}
