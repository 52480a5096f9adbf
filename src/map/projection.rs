use std::f64::consts::{FRAC_PI_2, PI};

use thiserror::Error;

/// Native raster resolution: one grid cell per pixel for a 0.1 degree grid.
pub const NATIVE_WIDTH: usize = 3600;
pub const NATIVE_HEIGHT: usize = 1800;

#[derive(Debug, Error, PartialEq)]
#[error("coordinate ({lon}, {lat}) is outside the sphere's valid range")]
pub struct ProjectionOutOfRangeError {
    pub lon: f64,
    pub lat: f64,
}

/// Natural Earth pseudocylindrical projection fitted to a fixed canvas.
///
/// The polynomial coefficients follow the published Natural Earth I
/// definition. Fit parameters (scale and translation) are computed once
/// from the full-sphere outline; `project` is a pure function of them.
pub struct Projector {
    scale: f64,
    tx: f64,
    ty: f64,
}

/// Forward polynomial in radians, y up.
#[inline]
fn raw(lon: f64, lat: f64) -> (f64, f64) {
    let p2 = lat * lat;
    let p4 = p2 * p2;
    let x = lon * (0.8707 - 0.131979 * p2 + p4 * (-0.013791 + p4 * (0.003971 * p2 - 0.001529 * p4)));
    let y = lat * (1.007226 + p2 * (0.015085 + p4 * (-0.044475 + 0.028874 * p2 - 0.005916 * p4)));
    (x, y)
}

impl Projector {
    /// Fit the full sphere into [0, width] x [0, height], centered.
    pub fn fitted(width: usize, height: usize) -> Self {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        // The projection is pseudocylindrical, so the raw extremes lie on
        // the sphere outline: the antimeridians and the poles.
        let mut grow = |x: f64, y: f64| {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        };
        let steps = 720;
        for i in 0..=steps {
            let lat = -FRAC_PI_2 + PI * i as f64 / steps as f64;
            let (x, y) = raw(PI, lat);
            grow(x, y);
            grow(-x, y);
        }
        for i in 0..=steps {
            let lon = -PI + 2.0 * PI * i as f64 / steps as f64;
            let (x, y) = raw(lon, FRAC_PI_2);
            grow(x, y);
            let (x, y) = raw(lon, -FRAC_PI_2);
            grow(x, y);
        }

        let scale = (width as f64 / (max_x - min_x)).min(height as f64 / (max_y - min_y));
        let tx = (width as f64 - scale * (min_x + max_x)) / 2.0;
        let ty = (height as f64 + scale * (min_y + max_y)) / 2.0;
        Self { scale, tx, ty }
    }

    /// Project (lon, lat) in degrees to canvas pixels, y down. Inputs are
    /// clamped to the sphere's valid range so one bad sample cannot abort
    /// a whole raster pass.
    #[inline]
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let lon = lon.clamp(-180.0, 180.0).to_radians();
        let lat = lat.clamp(-90.0, 90.0).to_radians();
        let (x, y) = raw(lon, lat);
        (self.tx + self.scale * x, self.ty - self.scale * y)
    }

    /// Range-checked projection for callers that want to observe bad
    /// coordinates instead of clamping.
    pub fn try_project(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionOutOfRangeError> {
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(ProjectionOutOfRangeError { lon, lat });
        }
        Ok(self.project(lon, lat))
    }

    /// Invert canvas pixels back to (lon, lat) degrees. Newton iteration on
    /// the latitude polynomial; returns None off the projected sphere.
    pub fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let rx = (x - self.tx) / self.scale;
        let ry = (self.ty - y) / self.scale;

        let mut phi = ry;
        for _ in 0..25 {
            let p2 = phi * phi;
            let p4 = p2 * p2;
            let f = phi
                * (1.007226 + p2 * (0.015085 + p4 * (-0.044475 + 0.028874 * p2 - 0.005916 * p4)))
                - ry;
            let fp = 1.007226
                + p2 * (3.0 * 0.015085
                    + p4 * (7.0 * -0.044475 + 9.0 * 0.028874 * p2 - 11.0 * 0.005916 * p4));
            let delta = f / fp;
            phi -= delta;
            if delta.abs() < 1e-12 {
                break;
            }
        }
        if !phi.is_finite() || phi.abs() > FRAC_PI_2 + 1e-6 {
            return None;
        }
        let phi = phi.clamp(-FRAC_PI_2, FRAC_PI_2);

        let p2 = phi * phi;
        let p4 = p2 * p2;
        let denom =
            0.8707 - 0.131979 * p2 + p4 * (-0.013791 + p4 * (0.003971 * p2 - 0.001529 * p4));
        let lambda = rx / denom;
        if lambda.abs() > PI + 1e-6 {
            return None;
        }
        Some((lambda.to_degrees().clamp(-180.0, 180.0), phi.to_degrees()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_bounds_inside_canvas() {
        let proj = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        let corners = [
            (-180.0, -90.0),
            (-180.0, 90.0),
            (180.0, -90.0),
            (180.0, 90.0),
        ];
        for (lon, lat) in corners {
            let (x, y) = proj.project(lon, lat);
            assert!(x >= 0.0 && x <= NATIVE_WIDTH as f64, "x={x}");
            assert!(y >= 0.0 && y <= NATIVE_HEIGHT as f64, "y={y}");
        }
        // Full outline stays inside too.
        for i in 0..=360 {
            let lat = -90.0 + 180.0 * i as f64 / 360.0;
            for lon in [-180.0, 180.0] {
                let (x, y) = proj.project(lon, lat);
                assert!(x >= 0.0 && x <= NATIVE_WIDTH as f64);
                assert!(y >= 0.0 && y <= NATIVE_HEIGHT as f64);
            }
        }
    }

    #[test]
    fn test_center_maps_to_canvas_center() {
        let proj = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        let (x, y) = proj.project(0.0, 0.0);
        assert!((x - NATIVE_WIDTH as f64 / 2.0).abs() < 1e-6);
        assert!((y - NATIVE_HEIGHT as f64 / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_north_is_up() {
        let proj = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        let (_, y_north) = proj.project(0.0, 60.0);
        let (_, y_south) = proj.project(0.0, -60.0);
        assert!(y_north < y_south);
    }

    #[test]
    fn test_unproject_roundtrip() {
        let proj = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        for &(lon, lat) in &[(0.0, 0.0), (12.5, 48.2), (-122.4, 37.8), (151.2, -33.9)] {
            let (x, y) = proj.project(lon, lat);
            let (lon2, lat2) = proj.unproject(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-6, "{lon} vs {lon2}");
            assert!((lat - lat2).abs() < 1e-6, "{lat} vs {lat2}");
        }
    }

    #[test]
    fn test_unproject_off_sphere() {
        let proj = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        assert_eq!(proj.unproject(-10_000.0, 900.0), None);
    }

    #[test]
    fn test_try_project_rejects_out_of_range() {
        let proj = Projector::fitted(NATIVE_WIDTH, NATIVE_HEIGHT);
        assert!(proj.try_project(200.0, 0.0).is_err());
        assert!(proj.try_project(0.0, 95.0).is_err());
        assert!(proj.try_project(179.9, -89.9).is_ok());
    }
}
