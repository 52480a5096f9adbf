use crate::canvas::PixelCanvas;
use crate::color::Rgb;

/// Draw a line using Bresenham's algorithm.
pub fn draw_line(canvas: &mut PixelCanvas, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_signed(x, y, color);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a point marker (small cross).
pub fn draw_marker(canvas: &mut PixelCanvas, x: i32, y: i32, size: i32, color: Rgb) {
    for i in -size..=size {
        canvas.set_signed(x + i, y, color);
        canvas.set_signed(x, y + i, color);
    }
}

/// Scanline-fill a polygon given as one or more rings in canvas
/// coordinates, using the even-odd rule (holes and disjoint parts of a
/// multipolygon fall out of the same pass).
pub fn fill_rings(canvas: &mut PixelCanvas, rings: &[Vec<(f64, f64)>], color: Rgb) {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for ring in rings {
        for &(_, y) in ring {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if !min_y.is_finite() {
        return;
    }
    let y_start = (min_y.floor().max(0.0)) as i64;
    let y_end = (max_y.ceil().min(canvas.height() as f64 - 1.0)) as i64;

    let mut crossings: Vec<f64> = Vec::new();
    for y in y_start..=y_end {
        let scan = y as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            if ring.len() < 2 {
                continue;
            }
            for w in 0..ring.len() {
                let (x0, y0) = ring[w];
                let (x1, y1) = ring[(w + 1) % ring.len()];
                // Half-open interval so shared vertices count once.
                if (y0 <= scan) != (y1 <= scan) {
                    crossings.push(x0 + (scan - y0) / (y1 - y0) * (x1 - x0));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);
        for pair in crossings.chunks_exact(2) {
            let x0 = pair[0].ceil().max(0.0) as i64;
            let x1 = pair[1].floor().min(canvas.width() as f64 - 1.0) as i64;
            for x in x0..=x1 {
                canvas.set(x as usize, y as usize, color);
            }
        }
    }
}
