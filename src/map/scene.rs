use glam::{DQuat, DVec3};

use crate::canvas::PixelCanvas;
use crate::color::Rgb;
use crate::map::geometry::{draw_line, draw_marker};
use crate::map::heightfield::{HeightField, BORDER_ALTITUDE, MARKER_ALTITUDE};

const MIN_DISTANCE: f64 = 50.0;
const MAX_DISTANCE: f64 = 500.0;
const INITIAL_DISTANCE: f64 = 150.0;
const DOLLY_STEP: f64 = 1.1;
const ROTATE_SPEED: f64 = 0.01;
const FOV_DEGREES: f64 = 45.0;
const NEAR: f64 = 0.1;

const BORDER_COLOR: Rgb = Rgb(3, 255, 70);
const MARKER_COLOR: Rgb = Rgb(255, 60, 60);

/// Orbit camera around the scene origin, stored as an orthonormal basis.
/// Dragging rotates the basis; the wheel dollies along the view axis
/// within fixed bounds, unlike the 2-D viewport whose zoom is unbounded.
pub struct OrbitCamera {
    right: DVec3,
    up: DVec3,
    forward: DVec3,
    distance: f64,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            right: DVec3::X,
            up: DVec3::Y,
            forward: DVec3::NEG_Z,
            distance: INITIAL_DISTANCE,
        }
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Rotate the basis by a pointer delta: horizontal drag orbits around
    /// the camera's up axis, vertical drag around its right axis.
    pub fn rotate_drag(&mut self, dx: f64, dy: f64) {
        let yaw = DQuat::from_axis_angle(self.up, -dx * ROTATE_SPEED);
        let pitch = DQuat::from_axis_angle(self.right, -dy * ROTATE_SPEED);
        let rot = yaw * pitch;
        self.right = (rot * self.right).normalize();
        self.forward = (rot * self.forward).normalize();
        // Re-derive up so the basis stays orthonormal under drift.
        self.up = self.forward.cross(self.right).normalize();
        self.right = self.up.cross(self.forward).normalize();
    }

    pub fn dolly(&mut self, closer: bool) {
        let next = if closer {
            self.distance / DOLLY_STEP
        } else {
            self.distance * DOLLY_STEP
        };
        self.distance = next.clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    fn eye(&self) -> DVec3 {
        -self.forward * self.distance
    }

    /// World point to (screen x, screen y, camera depth), or None when the
    /// point is behind the near plane.
    fn project(&self, p: DVec3, width: f64, height: f64) -> Option<(f64, f64, f64)> {
        let d = p - self.eye();
        let cz = d.dot(self.forward);
        if cz <= NEAR {
            return None;
        }
        let f = (height / 2.0) / (FOV_DEGREES.to_radians() / 2.0).tan();
        let sx = width / 2.0 + f * d.dot(self.right) / cz;
        let sy = height / 2.0 - f * d.dot(self.up) / cz;
        Some((sx, sy, cz))
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// The relief view: a height-field mesh, border polylines floating above
/// the base plane, and an optional location marker.
pub struct HeightFieldScene {
    pub mesh: HeightField,
    pub camera: OrbitCamera,
    borders: Vec<Vec<DVec3>>,
    marker: Option<DVec3>,
}

impl HeightFieldScene {
    pub fn new(
        mesh: HeightField,
        border_lines: &[Vec<(f64, f64)>],
        marker: Option<(f64, f64)>,
    ) -> Self {
        let borders = border_lines
            .iter()
            .map(|line| {
                line.iter()
                    .map(|&(lon, lat)| DVec3::new(lon, lat, BORDER_ALTITUDE))
                    .collect()
            })
            .collect();
        Self {
            mesh,
            camera: OrbitCamera::new(),
            borders,
            marker: marker.map(|(lon, lat)| DVec3::new(lon, lat, MARKER_ALTITUDE)),
        }
    }

    pub fn set_marker(&mut self, marker: Option<(f64, f64)>) {
        self.marker = marker.map(|(lon, lat)| DVec3::new(lon, lat, MARKER_ALTITUDE));
    }

    /// Software-render the scene into a pixel canvas. The mesh is drawn as
    /// depth-tested points; borders and the marker draw over it.
    pub fn render(&self, canvas: &mut PixelCanvas) {
        canvas.clear();
        let w = canvas.width() as f64;
        let h = canvas.height() as f64;
        if w < 1.0 || h < 1.0 {
            return;
        }

        let mut depth = vec![f64::INFINITY; canvas.width() * canvas.height()];
        for vertex in &self.mesh.vertices {
            let Some((sx, sy, cz)) = self.camera.project(vertex.position, w, h) else {
                continue;
            };
            let (x, y) = (sx as i32, sy as i32);
            if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
                continue;
            }
            let idx = y as usize * canvas.width() + x as usize;
            if cz < depth[idx] {
                depth[idx] = cz;
                canvas.set(x as usize, y as usize, vertex.color);
            }
        }

        for line in &self.borders {
            let mut prev: Option<(f64, f64)> = None;
            for &p in line {
                let projected = self.camera.project(p, w, h).map(|(sx, sy, _)| (sx, sy));
                if let (Some((x0, y0)), Some((x1, y1))) = (prev, projected) {
                    draw_line(canvas, x0 as i32, y0 as i32, x1 as i32, y1 as i32, BORDER_COLOR);
                }
                prev = projected;
            }
        }

        if let Some(marker) = self.marker {
            if let Some((sx, sy, _)) = self.camera.project(marker, w, h) {
                draw_marker(canvas, sx as i32, sy as i32, 3, MARKER_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dolly_clamps_to_bounds() {
        let mut camera = OrbitCamera::new();
        for _ in 0..100 {
            camera.dolly(true);
        }
        assert_eq!(camera.distance(), MIN_DISTANCE);
        for _ in 0..100 {
            camera.dolly(false);
        }
        assert_eq!(camera.distance(), MAX_DISTANCE);
    }

    #[test]
    fn test_origin_projects_to_screen_center() {
        let camera = OrbitCamera::new();
        let (sx, sy, cz) = camera.project(DVec3::ZERO, 200.0, 100.0).unwrap();
        assert!((sx - 100.0).abs() < 1e-9);
        assert!((sy - 50.0).abs() < 1e-9);
        assert!((cz - INITIAL_DISTANCE).abs() < 1e-9);
    }

    #[test]
    fn test_point_behind_camera_is_culled() {
        let camera = OrbitCamera::new();
        assert!(camera.project(DVec3::new(0.0, 0.0, 300.0), 200.0, 100.0).is_none());
    }

    #[test]
    fn test_rotation_keeps_basis_orthonormal() {
        let mut camera = OrbitCamera::new();
        camera.rotate_drag(37.0, -14.0);
        camera.rotate_drag(-5.0, 90.0);
        assert!(camera.right.dot(camera.up).abs() < 1e-9);
        assert!(camera.right.dot(camera.forward).abs() < 1e-9);
        assert!((camera.forward.length() - 1.0).abs() < 1e-9);
    }
}
