use std::collections::HashMap;

use tracing::debug;

use crate::canvas::PixelCanvas;
use crate::color::{DivergingScale, Domain, Rgb, SequentialScale, NO_DATA_FILL};
use crate::data::CountryShape;
use crate::grid::{is_valid, Grid};
use crate::map::geometry::fill_rings;
use crate::map::projection::Projector;

/// Outcome of one flux pass, handed to the legend collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintStats {
    pub painted: usize,
    pub skipped: usize,
    /// The domain the pass actually colored with.
    pub domain: Domain,
}

/// Paint every valid grid cell as a single pixel on the native surface.
///
/// The surface is cleared first so a repaint never blends with a previous
/// dataset. Invalid samples (sentinel or NaN) leave their pixel transparent.
/// Projected coordinates are truncated to integers, so at sub-native zoom
/// several cells can collapse onto one pixel; the pass runs in grid order
/// and the last writer wins, which keeps the output deterministic.
pub fn paint_flux(
    surface: &mut PixelCanvas,
    grid: &Grid,
    scale: &SequentialScale,
    projector: &Projector,
) -> PaintStats {
    surface.clear();
    let mut stats = PaintStats {
        painted: 0,
        skipped: 0,
        domain: scale.domain(),
    };
    for i in 0..grid.height() {
        let lat = grid.lat(i);
        for j in 0..grid.width() {
            let v = grid.value_at(i, j);
            if !is_valid(v) {
                stats.skipped += 1;
                continue;
            }
            let (x, y) = projector.project(grid.lon(j), lat);
            surface.set_signed(x as i32, y as i32, scale.color_of(v));
            stats.painted += 1;
        }
    }
    debug!(painted = stats.painted, skipped = stats.skipped, "flux raster pass");
    stats
}

/// Fill every country polygon with its diverging change color.
///
/// Countries absent from the change map get the flat no-data fill. Every
/// resting color is recorded so hover/selection highlighting can restore
/// the exact fill later.
pub fn paint_change(
    surface: &mut PixelCanvas,
    countries: &[CountryShape],
    changes: &HashMap<String, f64>,
    scale: &DivergingScale,
    projector: &Projector,
    country_colors: &mut HashMap<String, Rgb>,
) {
    surface.clear();
    country_colors.clear();
    let mut projected: Vec<Vec<(f64, f64)>> = Vec::new();
    for country in countries {
        let color = match changes.get(&country.name) {
            Some(&pct) => scale.color_of(pct as f32),
            None => NO_DATA_FILL,
        };
        projected.clear();
        projected.extend(country.rings.iter().map(|ring| {
            ring.iter()
                .map(|&(lon, lat)| projector.project(lon, lat))
                .collect::<Vec<_>>()
        }));
        fill_rings(surface, &projected, color);
        country_colors.insert(country.name.clone(), color);
    }
    debug!(countries = countries.len(), "change raster pass");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Domain;
    use crate::grid::SENTINEL;
    use crate::map::projection::{NATIVE_HEIGHT, NATIVE_WIDTH};

    fn bytes(vals: &[f32]) -> Vec<u8> {
        vals.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn small_grid() -> Grid {
        let lat = bytes(&[-45.0, 45.0]);
        let lon = bytes(&[-90.0, 90.0]);
        let vals = bytes(&[1.0, SENTINEL, 3.0, f32::NAN]);
        Grid::from_payloads(&lat, &lon, &vals).unwrap()
    }

    #[test]
    fn test_flux_paints_only_valid_cells() {
        let grid = small_grid();
        let scale = SequentialScale::new(Domain::from_values(grid.values()).unwrap());
        let projector = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        let mut surface = PixelCanvas::new(NATIVE_WIDTH, NATIVE_HEIGHT);
        let stats = paint_flux(&mut surface, &grid, &scale, &projector);
        assert_eq!(stats.painted, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.domain, Domain { min: 1.0, max: 3.0 });
        assert_eq!(surface.painted(), 2);
    }

    #[test]
    fn test_flux_clears_previous_frame() {
        let grid = small_grid();
        let scale = SequentialScale::new(Domain::from_values(grid.values()).unwrap());
        let projector = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        let mut surface = PixelCanvas::new(NATIVE_WIDTH, NATIVE_HEIGHT);
        surface.set(0, 0, Rgb(9, 9, 9));
        paint_flux(&mut surface, &grid, &scale, &projector);
        assert_eq!(surface.get(0, 0), None);
        assert_eq!(surface.painted(), 2);
    }

    #[test]
    fn test_change_records_resting_colors() {
        let countries = vec![
            CountryShape {
                name: "Squareland".into(),
                rings: vec![vec![(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)]],
                bbox: (0.0, 0.0, 20.0, 20.0),
            },
            CountryShape {
                name: "Nowhere".into(),
                rings: vec![vec![(-60.0, -30.0), (-40.0, -30.0), (-40.0, -10.0), (-60.0, -10.0)]],
                bbox: (-60.0, -30.0, -40.0, -10.0),
            },
        ];
        let mut changes = HashMap::new();
        changes.insert("Squareland".to_string(), 5.0);
        let scale = DivergingScale::new(Domain { min: -10.0, max: 10.0 });
        let projector = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        let mut surface = PixelCanvas::new(NATIVE_WIDTH, NATIVE_HEIGHT);
        let mut colors = HashMap::new();
        paint_change(&mut surface, &countries, &changes, &scale, &projector, &mut colors);
        assert_eq!(colors["Squareland"], scale.color_of(5.0));
        assert_eq!(colors["Nowhere"], NO_DATA_FILL);
        // The interior of the mapped square actually got its color.
        let (cx, cy) = projector.project(10.0, 10.0);
        assert_eq!(surface.get(cx as usize, cy as usize), Some(scale.color_of(5.0)));
    }
}
