//! Windowed pixel statistics over integral images. Both strategies need a
//! sliding-window mean (edge strategy: local-mean deviation mask) or
//! variance (texture strategy); precomputing sum and squared-sum tables
//! keeps each per-pixel query O(1).

use image::GrayImage;

/// Running sum and squared-sum tables, one row/column larger than the
/// source so window queries need no boundary special cases.
pub struct WindowStats {
    width: u32,
    height: u32,
    sums: Vec<u64>,
    squared: Vec<u64>,
}

impl WindowStats {
    pub fn new(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![0u64; stride * (height as usize + 1)];
        let mut squared = vec![0u64; stride * (height as usize + 1)];

        for y in 0..height as usize {
            let mut row_sum = 0u64;
            let mut row_sq = 0u64;
            for x in 0..width as usize {
                let v = u64::from(image.get_pixel(x as u32, y as u32)[0]);
                row_sum += v;
                row_sq += v * v;
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
                squared[(y + 1) * stride + x + 1] = squared[y * stride + x + 1] + row_sq;
            }
        }

        Self {
            width,
            height,
            sums,
            squared,
        }
    }

    /// Sum over the clamped window centered at (x, y) with the given radius,
    /// together with the pixel count of the clamped window.
    fn window(&self, x: u32, y: u32, radius: u32) -> (u64, u64, u32) {
        let stride = self.width as usize + 1;
        let x0 = x.saturating_sub(radius) as usize;
        let y0 = y.saturating_sub(radius) as usize;
        let x1 = (x + radius + 1).min(self.width) as usize;
        let y1 = (y + radius + 1).min(self.height) as usize;

        let sum = self.sums[y1 * stride + x1] + self.sums[y0 * stride + x0]
            - self.sums[y0 * stride + x1]
            - self.sums[y1 * stride + x0];
        let sq = self.squared[y1 * stride + x1] + self.squared[y0 * stride + x0]
            - self.squared[y0 * stride + x1]
            - self.squared[y1 * stride + x0];
        let count = ((x1 - x0) * (y1 - y0)) as u32;
        (sum, sq, count)
    }

    /// Mean intensity of the clamped window centered at (x, y).
    pub fn mean(&self, x: u32, y: u32, radius: u32) -> f32 {
        let (sum, _, count) = self.window(x, y, radius);
        sum as f32 / count as f32
    }

    /// Population variance of the clamped window centered at (x, y).
    pub fn variance(&self, x: u32, y: u32, radius: u32) -> f32 {
        let (sum, sq, count) = self.window(x, y, radius);
        let n = count as f64;
        let mean = sum as f64 / n;
        ((sq as f64 / n) - mean * mean).max(0.0) as f32
    }
}
