//! Canvas surface and brush rasterization.
//!
//! The canvas owns an explicit RGBA pixel buffer covering the whole client
//! area. The top `reserved_top` rows are the toolbar zone: stamps are
//! rejected there and the rows are excluded from display and persistence.
//! The buffer is the single source of truth for pixel data — nothing is
//! read back from the live display surface.

use eframe::egui;
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::brush::{Brush, BrushMode, BrushShape, BACKGROUND};

/// Height in pixels of the reserved toolbar strip in the application window.
pub const TOOLBAR_HEIGHT: u32 = 80;

pub struct Canvas {
    width: u32,
    height: u32,
    reserved_top: u32,
    pixels: RgbaImage,
}

impl Canvas {
    /// Create a white canvas. `reserved_top` rows at the top are off-limits
    /// to drawing (the application passes [`TOOLBAR_HEIGHT`]; tests pass 0).
    pub fn new(width: u32, height: u32, reserved_top: u32) -> Self {
        let bg = Rgba([BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255]);
        Self {
            width,
            height,
            reserved_top: reserved_top.min(height),
            pixels: RgbaImage::from_pixel(width, height, bg),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn reserved_top(&self) -> u32 {
        self.reserved_top
    }

    /// Height of the drawable region below the reserved strip.
    pub fn drawable_height(&self) -> u32 {
        self.height - self.reserved_top
    }

    // ---- pixel access -------------------------------------------------------

    /// Checked read. `None` outside the buffer.
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let p = self.pixels.get_pixel(x as u32, y as u32);
        Some([p[0], p[1], p[2]])
    }

    /// Checked write. Out-of-bounds coordinates are dropped silently.
    pub fn put_pixel(&mut self, x: i32, y: i32, color: [u8; 3]) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        self.pixels
            .put_pixel(x as u32, y as u32, Rgba([color[0], color[1], color[2], 255]));
    }

    /// Restore every pixel to the background color.
    pub fn reset(&mut self) {
        let bg = Rgba([BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255]);
        for p in self.pixels.pixels_mut() {
            *p = bg;
        }
    }

    /// True when `(x, y)` lies inside the reserved strip extended downward by
    /// `margin` rows. The margin keeps a brush of that half-size from
    /// overlapping the toolbar.
    pub fn in_reserved_zone(&self, x: i32, y: i32, margin: i32) -> bool {
        x >= 0 && (x as u32) < self.width && y >= 0 && y < self.reserved_top as i32 + margin
    }

    // ---- stamping -----------------------------------------------------------

    /// Apply the brush once at `(x, y)`. Returns `true` if the stamp landed
    /// (i.e. was not rejected by the reserved zone).
    ///
    /// Grid mode snaps both coordinates to the nearest multiple of the brush
    /// size after the zone check, matching the original event order.
    pub fn stamp(&mut self, brush: &Brush, x: i32, y: i32) -> bool {
        let half = brush.half_size() as i32;

        if self.in_reserved_zone(x, y, half) {
            return false;
        }

        let (x, y) = if brush.mode() == BrushMode::Grid {
            let grid = brush.size() as i32;
            (snap_to_grid(x, grid), snap_to_grid(y, grid))
        } else {
            (x, y)
        };

        let color = brush.color();
        match brush.shape() {
            BrushShape::Square => {
                for i in -half..=half {
                    for j in -half..=half {
                        self.put_pixel(x + i, y + j, color);
                    }
                }
            }
            BrushShape::Circle => {
                for i in -half..=half {
                    for j in -half..=half {
                        if i * i + j * j <= half * half {
                            self.put_pixel(x + i, y + j, color);
                        }
                    }
                }
            }
        }
        true
    }

    /// Draw a thick straight line from `start` to `end` as one offset
    /// Bresenham segment per `(i, j)` in the brush's square neighborhood —
    /// `(2·half+1)²` parallel segments in total.
    ///
    /// A start point inside the reserved zone rejects the whole line; an end
    /// point inside it is clamped to just below the zone boundary instead.
    pub fn draw_line(&mut self, brush: &Brush, start: (i32, i32), end: (i32, i32)) -> bool {
        let half = brush.half_size() as i32;
        let (sx, sy) = start;
        let (mut ex, mut ey) = end;

        if self.in_reserved_zone(sx, sy, half) {
            return false;
        }
        if self.in_reserved_zone(ex, ey, half) {
            ey = (self.reserved_top as i32 - 1) + half;
            ex = ex.clamp(0, self.width as i32 - 1);
        }

        let color = brush.color();
        for i in -half..=half {
            for j in -half..=half {
                self.draw_segment(sx + i, sy + j, ex + i, ey + j, color);
            }
        }
        true
    }

    /// Single-pixel-wide Bresenham segment.
    fn draw_segment(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: [u8; 3]) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.put_pixel(x, y, color);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    // ---- export -------------------------------------------------------------

    /// Convert the drawable region to an egui image for texture upload.
    /// Row conversion is parallelised — this runs on every dirty frame.
    pub fn to_color_image(&self) -> egui::ColorImage {
        let w = self.width as usize;
        let top = self.reserved_top as usize;
        let h = self.height as usize - top;
        let raw = self.pixels.as_raw();

        let mut out = vec![egui::Color32::WHITE; w * h];
        out.par_chunks_mut(w).enumerate().for_each(|(row, dst)| {
            let src_off = (row + top) * w * 4;
            let src = &raw[src_off..src_off + w * 4];
            for (i, px) in dst.iter_mut().enumerate() {
                *px = egui::Color32::from_rgb(src[i * 4], src[i * 4 + 1], src[i * 4 + 2]);
            }
        });

        egui::ColorImage {
            size: [w, h],
            pixels: out,
        }
    }

    /// Copy of the drawable region as a flat image (PNG export in CLI mode).
    pub fn drawable_image(&self) -> RgbaImage {
        let w = self.width;
        let h = self.drawable_height();
        let mut img = RgbaImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let src = self.pixels.get_pixel(x, y + self.reserved_top);
                img.put_pixel(x, y, *src);
            }
        }
        img
    }

    /// Snapshot of the full pixel buffer, for handing to a save worker.
    pub fn snapshot(&self) -> RgbaImage {
        self.pixels.clone()
    }
}

/// Round to the nearest multiple of `grid` (integer arithmetic, halves round
/// up). `grid` of 1 is the identity.
pub fn snap_to_grid(coord: i32, grid: i32) -> i32 {
    ((coord + grid / 2) / grid) * grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_non_background(canvas: &Canvas) -> usize {
        let mut n = 0;
        for y in 0..canvas.height() as i32 {
            for x in 0..canvas.width() as i32 {
                if canvas.get_pixel(x, y) != Some(BACKGROUND) {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn square_stamp_touches_expected_pixel_count() {
        for size in [1u32, 2, 4, 8, 16, 26] {
            let mut canvas = Canvas::new(100, 100, 0);
            let mut brush = Brush::new();
            brush.set_size(size);
            brush.set_color(255, 0, 0);
            assert!(canvas.stamp(&brush, 50, 50));

            let half = (size / 2) as usize;
            let expected = (2 * half + 1) * (2 * half + 1);
            assert_eq!(count_non_background(&canvas), expected, "size {}", size);
        }
    }

    #[test]
    fn circle_stamp_fills_only_the_disc() {
        let mut canvas = Canvas::new(100, 100, 0);
        let mut brush = Brush::new();
        brush.set_size(8);
        brush.set_shape(BrushShape::Circle);
        brush.set_color(0, 0, 255);
        canvas.stamp(&brush, 50, 50);

        let half = 4i32;
        let mut expected = 0;
        for i in -half..=half {
            for j in -half..=half {
                if i * i + j * j <= half * half {
                    expected += 1;
                    assert_eq!(canvas.get_pixel(50 + i, 50 + j), Some([0, 0, 255]));
                }
            }
        }
        assert_eq!(count_non_background(&canvas), expected);
        // The corner of the bounding square stays untouched.
        assert_eq!(canvas.get_pixel(54, 54), Some(BACKGROUND));
    }

    #[test]
    fn grid_mode_snaps_to_brush_size_lattice() {
        let mut canvas = Canvas::new(100, 100, 0);
        let mut brush = Brush::new();
        brush.set_size(4);
        brush.set_mode(BrushMode::Grid);
        brush.set_color(0, 128, 0);
        canvas.stamp(&brush, 9, 9);

        // round(9 / 4) * 4 == 8 on both axes
        assert_eq!(canvas.get_pixel(8, 8), Some([0, 128, 0]));
        assert_eq!(snap_to_grid(9, 4) % 4, 0);
        assert_eq!(snap_to_grid(10, 4), 12);
        assert_eq!(snap_to_grid(7, 1), 7);
    }

    #[test]
    fn stamp_in_reserved_zone_is_a_no_op() {
        let mut canvas = Canvas::new(200, 200, 80);
        let mut brush = Brush::new();
        brush.set_size(4);
        brush.set_color(255, 0, 0);

        // half = 2, so anything with y < 82 is rejected
        assert!(!canvas.stamp(&brush, 100, 40));
        assert!(!canvas.stamp(&brush, 100, 81));
        assert_eq!(count_non_background(&canvas), 0);

        assert!(canvas.stamp(&brush, 100, 82));
        assert!(count_non_background(&canvas) > 0);
    }

    #[test]
    fn line_start_in_reserved_zone_rejects_the_line() {
        let mut canvas = Canvas::new(200, 200, 80);
        let mut brush = Brush::new();
        brush.set_color(0, 0, 0);
        assert!(!canvas.draw_line(&brush, (100, 40), (100, 150)));
        assert_eq!(count_non_background(&canvas), 0);
    }

    #[test]
    fn line_end_in_reserved_zone_is_clamped_not_rejected() {
        let mut canvas = Canvas::new(200, 200, 80);
        let mut brush = Brush::new();
        brush.set_size(2);
        brush.set_color(0, 0, 0);

        assert!(canvas.draw_line(&brush, (100, 150), (100, 10)));
        // The stroke reaches down the visible column...
        assert_eq!(canvas.get_pixel(100, 120), Some([0, 0, 0]));
        // ...and stops at the clamped end (reserved_top - 1 + half = 80).
        assert_eq!(canvas.get_pixel(100, 80), Some([0, 0, 0]));
        assert_eq!(canvas.get_pixel(100, 60), Some(BACKGROUND));
    }

    #[test]
    fn diagonal_line_is_thickened_by_offset_segments() {
        let mut canvas = Canvas::new(100, 100, 0);
        let mut brush = Brush::new();
        brush.set_size(4);
        brush.set_color(10, 20, 30);
        canvas.draw_line(&brush, (10, 10), (60, 60));

        // Both endpoints and the midpoint carry the full (2·half+1) width.
        for off in -2i32..=2 {
            assert_eq!(canvas.get_pixel(10 + off, 10 + off), Some([10, 20, 30]));
            assert_eq!(canvas.get_pixel(35 + off, 35), Some([10, 20, 30]));
        }
    }

    #[test]
    fn reset_restores_background_everywhere() {
        let mut canvas = Canvas::new(50, 50, 0);
        let mut brush = Brush::new();
        brush.set_size(8);
        brush.set_color(1, 2, 3);
        canvas.stamp(&brush, 25, 25);
        assert!(count_non_background(&canvas) > 0);

        canvas.reset();
        assert_eq!(count_non_background(&canvas), 0);
    }

    #[test]
    fn out_of_bounds_writes_are_dropped() {
        let mut canvas = Canvas::new(20, 20, 0);
        canvas.put_pixel(-5, 3, [1, 1, 1]);
        canvas.put_pixel(3, 25, [1, 1, 1]);
        assert_eq!(count_non_background(&canvas), 0);

        // A stamp overlapping the edge keeps only the in-bounds part.
        let mut brush = Brush::new();
        brush.set_size(4);
        brush.set_color(9, 9, 9);
        canvas.stamp(&brush, 0, 10);
        assert_eq!(canvas.get_pixel(0, 10), Some([9, 9, 9]));
        assert!(canvas.get_pixel(-1, 10).is_none());
    }

    #[test]
    fn drawable_image_excludes_reserved_rows() {
        let mut canvas = Canvas::new(100, 100, 20);
        let mut brush = Brush::new();
        brush.set_color(200, 0, 0);
        canvas.stamp(&brush, 50, 30);

        let img = canvas.drawable_image();
        assert_eq!(img.height(), 80);
        assert_eq!(img.get_pixel(50, 10).0, [200, 0, 0, 255]);
    }
}
