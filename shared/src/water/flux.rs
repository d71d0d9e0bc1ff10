//! Pipe-model flux pass.
//!
//! Every cell is connected to its four neighbors by virtual pipes. The flux
//! through a pipe keeps a damped share of its previous value and is
//! accelerated by the difference in total height (terrain + water) across it.
//!
//! ## Algorithm
//! For each cell and each edge `e`:
//! 1. `flux_e = flux_e * damping + k * (H_cell - H_neighbor_e)`
//! 2. `flux_e = max(flux_e, 0)`: direction lives in the channel, not the sign
//! 3. `flux_e *= mask_e`
//! 4. All four channels are scaled down if together they would drain more
//!    than the water standing above the floor within this substep

use crate::grid::{BoundaryMask, Edge, EdgeValues, Grid};

use super::WaterTexel;

/// Constants of one flux pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxParams {
    pub damping_factor: f32,
    /// `cross_section_area * gravity / pipe_length * dt`
    pub height_to_flux: f32,
    pub cell_area: f32,
    pub min_water_height: f32,
    pub dt: f32,
}

/// Reads the previous flux and water state, writes the new flux into `flux_out`.
pub fn solve_flux(
    params: &FluxParams,
    terrain: &Grid<f32>,
    water: &Grid<WaterTexel>,
    boundary: &BoundaryMask,
    flux_in: &Grid<EdgeValues>,
    flux_out: &mut Grid<EdgeValues>,
) {
    let res = water.resolution();
    for z in 0..res {
        for x in 0..res {
            let water_height = water.get(x, z).height;
            let total_height = terrain.get(x, z) + water_height;

            let mut flux = flux_in.get(x, z).scaled(params.damping_factor);
            for edge in Edge::ALL {
                let neighbor_total = terrain.neighbor_clamped(x, z, edge)
                    + water.neighbor_clamped(x, z, edge).height;
                flux[edge] += params.height_to_flux * (total_height - neighbor_total);
            }

            let flux = flux.clamped_non_negative().masked(&boundary.get(x, z));
            flux_out.set(x, z, limit_outflow(params, flux, water_height));
        }
    }
}

/// Scales `flux` so the cell can't send out more than the water it has above the floor.
#[inline]
fn limit_outflow(params: &FluxParams, flux: EdgeValues, water_height: f32) -> EdgeValues {
    let total_outflow = flux.total();
    if total_outflow <= 0.0 {
        return flux;
    }

    let available = ((water_height - params.min_water_height) * params.cell_area).max(0.0);
    let outflow_volume = params.dt * total_outflow;
    if outflow_volume <= 0.0 {
        return flux;
    }

    flux.scaled((available / outflow_volume).min(1.0))
}
