/// Multiplicative zoom step per wheel notch.
const SCALE_STEP: f64 = 1.1;
/// Pixel displacement on either axis beyond which a drag counts as a
/// move rather than a click.
const MOVE_THRESHOLD: f64 = 2.0;

struct Drag {
    // Anchor: pointer position minus the offset at pointer-down, so that
    // offset = pointer - anchor keeps the grabbed point under the pointer.
    anchor_x: f64,
    anchor_y: f64,
    down_x: f64,
    down_y: f64,
}

/// Pan/zoom state for the 2-D raster layer.
///
/// The rendered layer's on-screen transform is always exactly
/// `translate(offset) . scale(zoom)`; updates are discrete and immediate,
/// with no smoothing. Zoom is unbounded here (the 3-D camera distance is
/// the one that clamps). The controller is purely presentational and never
/// touches the data pipeline.
pub struct Viewport {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    drag: Option<Drag>,
    moved: bool,
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            drag: None,
            moved: false,
        }
    }

    /// Zoom-to-fit the native layer in a view and center it.
    pub fn fit(&mut self, view_w: f64, view_h: f64, native_w: f64, native_h: f64) {
        self.zoom = (view_w / native_w).min(view_h / native_h);
        self.offset_x = (view_w - native_w * self.zoom) / 2.0;
        self.offset_y = (view_h - native_h * self.zoom) / 2.0;
        self.drag = None;
        self.moved = false;
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.drag = Some(Drag {
            anchor_x: x - self.offset_x,
            anchor_y: y - self.offset_y,
            down_x: x,
            down_y: y,
        });
        self.moved = false;
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if let Some(drag) = &self.drag {
            if (x - drag.down_x).abs() > MOVE_THRESHOLD || (y - drag.down_y).abs() > MOVE_THRESHOLD {
                self.moved = true;
            }
            self.offset_x = x - drag.anchor_x;
            self.offset_y = y - drag.anchor_y;
        }
    }

    /// End the gesture. Returns true when the pointer moved beyond the
    /// click threshold, so a trailing click on the map should be ignored.
    pub fn pointer_up(&mut self) -> bool {
        self.drag = None;
        std::mem::replace(&mut self.moved, false)
    }

    /// Pointer left the view: same as releasing, gesture discarded.
    pub fn pointer_leave(&mut self) {
        self.drag = None;
        self.moved = false;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Rescale around the pointer so the world point under it stays put:
    /// offset' = pointer - (pointer - offset) * (zoom' / zoom).
    pub fn wheel(&mut self, x: f64, y: f64, zoom_in: bool) {
        let new_zoom = if zoom_in {
            self.zoom * SCALE_STEP
        } else {
            self.zoom / SCALE_STEP
        };
        let ratio = new_zoom / self.zoom;
        self.offset_x = x - (x - self.offset_x) * ratio;
        self.offset_y = y - (y - self.offset_y) * ratio;
        self.zoom = new_zoom;
    }

    /// Shift the layer by a screen-space delta (keyboard panning).
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Screen pixel -> native layer pixel under the current transform.
    #[inline]
    pub fn screen_to_native(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.offset_x) / self.zoom, (y - self.offset_y) / self.zoom)
    }

    /// Native layer pixel -> screen pixel.
    #[inline]
    pub fn native_to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.zoom + self.offset_x,
            y * self.zoom + self.offset_y,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}
