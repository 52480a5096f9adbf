use std::collections::HashMap;

/// Spatial index for country features using conservative approximation.
/// Each feature's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the downstream point-in-polygon test).
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from feature bounding boxes (min_lon, min_lat, max_lon, max_lat).
    pub fn build(bboxes: impl Iterator<Item = (f64, f64, f64, f64)>, cell_size: f64) -> Self {
        let mut grid = Self {
            cells: HashMap::new(),
            cell_size,
        };
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in bboxes.enumerate() {
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Candidate feature indices whose bbox cell contains the point.
    pub fn query_point(&self, lon: f64, lat: f64) -> &[usize] {
        self.cells
            .get(&self.to_cell(lon, lat))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// Even-odd point-in-polygon test across a set of rings. Holes and
/// disjoint multipolygon parts are handled by the same parity rule.
pub fn point_in_rings(lon: f64, lat: f64, rings: &[Vec<(f64, f64)>]) -> bool {
    let mut inside = false;
    for ring in rings {
        if ring.len() < 3 {
            continue;
        }
        let mut j = ring.len() - 1;
        for i in 0..ring.len() {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];
            if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(cx: f64, cy: f64, half: f64) -> Vec<(f64, f64)> {
        vec![
            (cx - half, cy - half),
            (cx + half, cy - half),
            (cx + half, cy + half),
            (cx - half, cy + half),
        ]
    }

    #[test]
    fn test_point_in_square() {
        let rings = vec![square(0.0, 0.0, 5.0)];
        assert!(point_in_rings(0.0, 0.0, &rings));
        assert!(point_in_rings(4.9, -4.9, &rings));
        assert!(!point_in_rings(6.0, 0.0, &rings));
    }

    #[test]
    fn test_point_in_hole_is_outside() {
        let rings = vec![square(0.0, 0.0, 10.0), square(0.0, 0.0, 2.0)];
        assert!(!point_in_rings(0.0, 0.0, &rings));
        assert!(point_in_rings(5.0, 5.0, &rings));
    }

    #[test]
    fn test_grid_query_finds_feature() {
        let grid = FeatureGrid::build(
            [(-10.0, -10.0, 10.0, 10.0), (100.0, 40.0, 120.0, 55.0)].into_iter(),
            10.0,
        );
        assert!(grid.query_point(5.0, 5.0).contains(&0));
        assert!(grid.query_point(110.0, 50.0).contains(&1));
        assert!(grid.query_point(-170.0, -80.0).is_empty());
    }
}
