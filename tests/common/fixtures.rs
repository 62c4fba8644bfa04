//! Synthetic test scenes. Every fixture is fully deterministic so the
//! determinism tests can compare runs byte for byte.

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

pub const BACKGROUND: Rgb<u8> = Rgb([20, 20, 20]);
pub const PHOTO_FILL: Rgb<u8> = Rgb([235, 225, 210]);

/// A flat single-color image. Contains nothing to detect.
pub fn uniform_scene(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
}

/// Bright axis-aligned "prints" on a dark table.
pub fn scene_with_rects(width: u32, height: u32, rects: &[Rect]) -> DynamicImage {
    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    for rect in rects {
        draw_filled_rect_mut(&mut img, *rect, PHOTO_FILL);
    }
    DynamicImage::ImageRgb8(img)
}

/// One 700x500 print on a 1000x800 table.
pub fn single_photo_scene() -> DynamicImage {
    scene_with_rects(1000, 800, &[Rect::at(150, 150).of_size(700, 500)])
}

/// A low-contrast photograph: its border barely differs from the
/// background, but the interior carries fine deterministic texture. The
/// edge strategy finds nothing here; only the texture fallback does.
pub fn low_contrast_textured_scene() -> DynamicImage {
    let mut img = RgbImage::from_pixel(800, 600, Rgb([128, 128, 128]));
    for y in 150..450 {
        for x in 200..600 {
            let noise = ((x * 7 + y * 13) % 17) as i32 - 8;
            let v = (140 + noise).clamp(0, 255) as u8;
            img.put_pixel(x, y, Rgb([v, v, v]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// The low-contrast scene plus a small dark speck in a corner. The speck
/// hands the edge strategy a raw contour, but one far below the area
/// floor; only the texture fallback can still find the photo.
pub fn textured_scene_with_noise_speck() -> DynamicImage {
    let mut img = low_contrast_textured_scene().to_rgb8();
    draw_filled_rect_mut(&mut img, Rect::at(30, 30).of_size(8, 8), Rgb([30, 30, 30]));
    DynamicImage::ImageRgb8(img)
}

/// A 400x200 print rotated 15 degrees about the scene center.
pub fn rotated_photo_scene() -> DynamicImage {
    let (width, height) = (800u32, 600u32);
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let (cos, sin) = (15.0f32.to_radians().cos(), 15.0f32.to_radians().sin());

    let mut img = RgbImage::from_pixel(width, height, BACKGROUND);
    for (x, y, p) in img.enumerate_pixels_mut() {
        // Inverse-rotate into the print's own frame.
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        if u.abs() <= 200.0 && v.abs() <= 100.0 {
            *p = PHOTO_FILL;
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// Approximate luma of one pixel of an extracted photo.
pub fn luma_at(photo: &RgbImage, x: u32, y: u32) -> f32 {
    let Rgb([r, g, b]) = photo.get_pixel(x, y);
    0.299 * f32::from(*r) + 0.587 * f32::from(*g) + 0.114 * f32::from(*b)
}
