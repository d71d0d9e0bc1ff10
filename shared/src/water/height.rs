//! Height integration pass.
//!
//! Moves the volume described by the freshly solved flux between cells and
//! derives a horizontal velocity from the net flow through each axis.

use bevy::math::Vec2;

use crate::grid::{Edge, EdgeValues, Grid};

use super::WaterTexel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightParams {
    pub dt: f32,
    pub cell_area: f32,
    pub cell_pitch: f32,
    pub min_water_height: f32,
    pub velocity_height_threshold: f32,
}

/// Flux entering `(x, z)` across `edge`: the neighbor's flux on the opposite edge.
/// A neighbor outside the grid sends nothing.
#[inline]
fn inflow(flux: &Grid<EdgeValues>, x: usize, z: usize, edge: Edge) -> f32 {
    flux.neighbor(x, z, edge)
        .map_or(0.0, |(nx, nz)| flux.get(nx, nz)[edge.opposite()])
}

pub fn integrate_heights(
    params: &HeightParams,
    water_in: &Grid<WaterTexel>,
    flux: &Grid<EdgeValues>,
    water_out: &mut Grid<WaterTexel>,
) {
    let res = water_in.resolution();
    for z in 0..res {
        for x in 0..res {
            let height = water_in.get(x, z).height;
            let out = flux.get(x, z);

            let in_right = inflow(flux, x, z, Edge::Right);
            let in_left = inflow(flux, x, z, Edge::Left);
            let in_bottom = inflow(flux, x, z, Edge::Bottom);
            let in_top = inflow(flux, x, z, Edge::Top);

            let total_in = in_right + in_left + in_bottom + in_top;
            let net_volume = params.dt * (total_in - out.total());
            let new_height = (height + net_volume / params.cell_area).max(params.min_water_height);

            let avg_height = 0.5 * (height + new_height);
            let velocity = if avg_height == 0.0 || new_height < params.velocity_height_threshold {
                Vec2::ZERO
            } else {
                let flow_x = 0.5 * (in_left - out[Edge::Left] + out[Edge::Right] - in_right);
                let flow_z = 0.5 * (in_bottom - out[Edge::Bottom] + out[Edge::Top] - in_top);
                Vec2::new(flow_x, flow_z) / (params.cell_pitch * avg_height)
            };

            water_out.set(
                x,
                z,
                WaterTexel {
                    height: new_height,
                    velocity,
                },
            );
        }
    }
}
