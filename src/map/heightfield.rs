use glam::DVec3;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::color::{Rgb, SequentialScale};
use crate::grid::{is_valid, Grid};

/// Peak displacement of the strongest cell, in scene units.
pub const HEIGHT_SCALE: f64 = 5.0;
/// Country borders float slightly above the base plane.
pub const BORDER_ALTITUDE: f64 = 1.2;
/// The location marker floats well above everything else.
pub const MARKER_ALTITUDE: f64 = 8.0;
/// Default grid decimation for the mesh.
pub const DEFAULT_STRIDE: usize = 2;

#[derive(Debug, Error, PartialEq)]
#[error("grid of {height}x{width} is too small for a stride-{stride} mesh")]
pub struct InsufficientResolutionError {
    pub height: usize,
    pub width: usize,
    pub stride: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: DVec3,
    pub color: Rgb,
}

/// Decimated 3-D relief of a grid, laid out in the lon/lat plane.
///
/// Vertices are row-major over the sampled lattice. Displacement is along
/// negative z (into the plane as seen from the default camera): zero for
/// invalid or zero-valued cells, scaled by the normalized magnitude
/// otherwise. Color always samples the scale at the raw value, so a cell
/// that is flattened to the base plane still shows its data color.
#[derive(Debug)]
pub struct HeightField {
    pub vertices: Vec<Vertex>,
    pub rows: usize,
    pub cols: usize,
}

impl HeightField {
    /// Sample every `stride`-th cell of the grid into a mesh.
    pub fn build(
        grid: &Grid,
        scale: &SequentialScale,
        stride: usize,
    ) -> Result<Self, InsufficientResolutionError> {
        let rows = (grid.height() - 1) / stride + 1;
        let cols = (grid.width() - 1) / stride + 1;
        if rows < 2 || cols < 2 {
            return Err(InsufficientResolutionError {
                height: grid.height(),
                width: grid.width(),
                stride,
            });
        }

        let vertices: Vec<Vertex> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|r| {
                let i = r * stride;
                let lat = grid.lat(i);
                (0..cols).map(move |c| {
                    let j = c * stride;
                    let v = grid.value_at(i, j);
                    let z = if !is_valid(v) || v == 0.0 {
                        0.0
                    } else {
                        -(scale.position(v).max(0.0) as f64) * HEIGHT_SCALE
                    };
                    Vertex {
                        position: DVec3::new(grid.lon(j), lat, z),
                        color: scale.color_of(v),
                    }
                })
            })
            .collect();

        debug!(rows, cols, stride, "height field built");
        Ok(Self { vertices, rows, cols })
    }

    /// Build at the default stride, falling back to full resolution for
    /// grids too small to decimate.
    pub fn build_preferred(
        grid: &Grid,
        scale: &SequentialScale,
    ) -> Result<Self, InsufficientResolutionError> {
        match Self::build(grid, scale, DEFAULT_STRIDE) {
            Ok(mesh) => Ok(mesh),
            Err(_) => Self::build(grid, scale, 1),
        }
    }

    #[inline]
    pub fn vertex(&self, row: usize, col: usize) -> &Vertex {
        &self.vertices[row * self.cols + col]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Domain;
    use crate::grid::SENTINEL;

    fn bytes(vals: &[f32]) -> Vec<u8> {
        vals.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn grid(lats: &[f32], lons: &[f32], vals: &[f32]) -> Grid {
        Grid::from_payloads(&bytes(lats), &bytes(lons), &bytes(vals)).unwrap()
    }

    #[test]
    fn test_invalid_and_zero_cells_are_flat() {
        let g = grid(
            &[-45.0, 0.0, 45.0],
            &[-90.0, 0.0, 90.0],
            &[0.0, SENTINEL, f32::NAN, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        );
        let scale = SequentialScale::new(Domain::from_values(g.values()).unwrap());
        let mesh = HeightField::build(&g, &scale, 1).unwrap();
        assert_eq!(mesh.vertex(0, 0).position.z, 0.0);
        assert_eq!(mesh.vertex(0, 1).position.z, 0.0);
        assert_eq!(mesh.vertex(0, 2).position.z, 0.0);
        assert!(mesh.vertex(2, 2).position.z < 0.0);
    }

    #[test]
    fn test_displacement_scales_with_normalized_value() {
        let g = grid(&[-45.0, 45.0], &[-90.0, 90.0], &[1.0, SENTINEL, 3.0, f32::NAN]);
        let scale = SequentialScale::new(Domain::from_values(g.values()).unwrap());
        let mesh = HeightField::build(&g, &scale, 1).unwrap();
        // Domain is [1, 3]: the minimum normalizes to 0 and stays flat, the
        // maximum displaces the full height.
        assert_eq!(mesh.vertex(0, 0).position.z, 0.0);
        assert!((mesh.vertex(1, 0).position.z + HEIGHT_SCALE).abs() < 1e-9);
        let flat: Vec<f64> = mesh.vertices.iter().map(|v| v.position.z).collect();
        assert_eq!(flat.iter().filter(|z| **z < 0.0).count(), 1);
    }

    #[test]
    fn test_color_tracks_raw_value_even_when_flat() {
        let g = grid(&[-45.0, 45.0], &[-90.0, 90.0], &[1.0, SENTINEL, 3.0, f32::NAN]);
        let scale = SequentialScale::new(Domain::from_values(g.values()).unwrap());
        let mesh = HeightField::build(&g, &scale, 1).unwrap();
        assert_eq!(mesh.vertex(0, 0).color, scale.color_of(1.0));
        assert_eq!(mesh.vertex(1, 0).color, scale.color_of(3.0));
    }

    #[test]
    fn test_insufficient_resolution() {
        let g = grid(&[0.0], &[-90.0, 90.0], &[1.0, 2.0]);
        let scale = SequentialScale::new(Domain { min: 1.0, max: 2.0 });
        let err = HeightField::build(&g, &scale, 2).unwrap_err();
        assert_eq!(err.stride, 2);
    }

    #[test]
    fn test_preferred_falls_back_to_full_resolution() {
        let g = grid(&[-45.0, 45.0], &[-90.0, 90.0], &[1.0, 2.0, 3.0, 4.0]);
        let scale = SequentialScale::new(Domain { min: 1.0, max: 4.0 });
        // Stride 2 would leave a single row; the fallback samples every cell.
        let mesh = HeightField::build_preferred(&g, &scale).unwrap();
        assert_eq!((mesh.rows, mesh.cols), (2, 2));
    }
}
