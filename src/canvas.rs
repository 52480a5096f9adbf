use crate::color::Rgb;

/// RGBA pixel surface. Alpha is binary: a pixel is either painted with an
/// opaque color or transparent, so the background stays visible through
/// unpainted cells.
pub struct PixelCanvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>, // RGBA, row-major
}

impl PixelCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width * height * 4],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    #[inline(always)]
    pub fn set(&mut self, x: usize, y: usize, color: Rgb) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y * self.width + x) * 4;
        self.pixels[i] = color.0;
        self.pixels[i + 1] = color.1;
        self.pixels[i + 2] = color.2;
        self.pixels[i + 3] = 255;
    }

    /// Set a pixel using signed coordinates (ignores negative values).
    #[inline(always)]
    pub fn set_signed(&mut self, x: i32, y: i32, color: Rgb) {
        if x >= 0 && y >= 0 {
            self.set(x as usize, y as usize, color);
        }
    }

    /// Painted color at (x, y), or None for transparent/out-of-bounds.
    #[inline(always)]
    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        if self.pixels[i + 3] == 0 {
            return None;
        }
        Some(Rgb(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]))
    }

    /// Number of painted (opaque) pixels.
    pub fn painted(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|p| p[3] != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_transparent() {
        let canvas = PixelCanvas::new(4, 4);
        assert_eq!(canvas.get(0, 0), None);
        assert_eq!(canvas.painted(), 0);
    }

    #[test]
    fn test_set_get() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.set(1, 2, Rgb(10, 20, 30));
        assert_eq!(canvas.get(1, 2), Some(Rgb(10, 20, 30)));
        assert_eq!(canvas.painted(), 1);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut canvas = PixelCanvas::new(2, 2);
        canvas.set(5, 0, Rgb(1, 1, 1));
        canvas.set_signed(-1, 0, Rgb(1, 1, 1));
        assert_eq!(canvas.painted(), 0);
    }

    #[test]
    fn test_clear() {
        let mut canvas = PixelCanvas::new(2, 2);
        canvas.set(0, 0, Rgb(1, 1, 1));
        canvas.clear();
        assert_eq!(canvas.get(0, 0), None);
    }
}
