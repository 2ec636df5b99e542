//! Colour filters built from smoothed regions and adaptive-threshold outlines.

use image::RgbImage;

use super::ops;

/// Smoothed colour kept only where the adaptive threshold finds no edge
///
/// `median_sigma` pre-smooths the luma before edge detection; larger values
/// give fewer, bolder outlines.
fn toon_base(image: &RgbImage, median_sigma: f32, block: u32, c: f32) -> RgbImage {
    let luma = ops::blur(&ops::gray(image), median_sigma);
    let edges = ops::adaptive_threshold(&luma, block, c);
    let color = ops::smooth(image, 2.0);
    ops::mask_and(&color, &edges)
}

fn tinted(image: &RgbImage, median_sigma: f32, gains: [f32; 3]) -> RgbImage {
    let mut out = toon_base(image, median_sigma, 9, 2.0);
    ops::channel_gain(&mut out, gains);
    out
}

pub fn cartoon(image: &RgbImage) -> RgbImage {
    toon_base(image, 1.0, 9, 2.0)
}

pub fn color_sketch(image: &RgbImage) -> RgbImage {
    toon_base(image, 1.0, 9, 10.0)
}

pub fn tech_pen(image: &RgbImage) -> RgbImage {
    tinted(image, 1.0, [1.6, 1.0, 1.0])
}

pub fn cartoon_variant(image: &RgbImage) -> RgbImage {
    tinted(image, 7.0, [3.0, 3.0, 1.0])
}

pub fn felt_pen(image: &RgbImage) -> RgbImage {
    tinted(image, 4.5, [2.2, 2.0, 1.0])
}

pub fn monochrome_sketch(image: &RgbImage) -> RgbImage {
    tinted(image, 1.0, [1.0, 1.6, 1.0])
}

pub fn splash_sketch(image: &RgbImage) -> RgbImage {
    tinted(image, 1.0, [1.0, 1.0, 1.6])
}

pub fn comic_book(image: &RgbImage) -> RgbImage {
    tinted(image, 9.5, [1.6, 1.0, 1.45])
}

pub fn anime(image: &RgbImage) -> RgbImage {
    let luma = ops::blur(&ops::gray(image), 1.0);
    let edges = ops::adaptive_threshold(&luma, 9, 9.0);
    let mut color = ops::smooth(image, 4.0);
    ops::posterize(&mut color, 6);
    ops::mask_and(&color, &edges)
}

/// Colour only along the outlines, black elsewhere
pub fn neon(image: &RgbImage) -> RgbImage {
    let luma = ops::blur(&ops::gray(image), 1.0);
    let lines = ops::invert(&ops::adaptive_threshold(&luma, 9, 2.0));
    let color = ops::smooth(image, 3.0);
    ops::modulate(&color, &ops::dilate(&lines, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_cartoon_keeps_flat_colour() {
        let flat = RgbImage::from_pixel(12, 12, Rgb([90, 140, 200]));
        let out = cartoon(&flat);
        // no edges anywhere, so the smoothed colour passes the mask untouched
        let pixel = out.get_pixel(6, 6).0;
        for (got, want) in pixel.iter().zip([90u8, 140, 200]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", pixel);
        }
    }

    #[test]
    fn test_tech_pen_boosts_red() {
        let flat = RgbImage::from_pixel(8, 8, Rgb([100, 100, 100]));
        let [r, g, b] = tech_pen(&flat).get_pixel(4, 4).0;
        assert!(r.abs_diff(160) <= 2);
        assert!(g.abs_diff(100) <= 1 && b.abs_diff(100) <= 1);
    }

    #[test]
    fn test_neon_is_dark_without_edges() {
        let flat = RgbImage::from_pixel(8, 8, Rgb([200, 50, 50]));
        assert!(neon(&flat).pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
