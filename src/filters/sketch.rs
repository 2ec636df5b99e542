//! Monochrome line-art filters: pencil, pen, charcoal and friends.

use image::{GrayImage, Luma, RgbImage};

use super::ops;

/// Seed for the chalk grain, fixed so repeated runs produce identical frames
const CHALK_SEED: u64 = 0x5eed_c4a1;

pub fn grayscale(image: &RgbImage) -> RgbImage {
    ops::gray_to_rgb(&ops::gray(image))
}

/// Colour-dodge of the gray image with its blurred negative
pub fn pencil(image: &RgbImage) -> RgbImage {
    let gray = ops::gray(image);
    let blurred_negative = ops::blur(&ops::invert(&gray), 3.5);
    ops::gray_to_rgb(&ops::dodge(&gray, &blurred_negative, 256.0))
}

pub fn soft_pen(image: &RgbImage) -> RgbImage {
    let gray = ops::gray(image);
    let blurred_negative = ops::blur(&ops::invert(&gray), 4.1);
    let dodged = ops::dodge(&gray, &blurred_negative, 256.0);
    ops::gray_to_rgb(&ops::blur(&dodged, 0.8))
}

pub fn charcoal(image: &RgbImage) -> RgbImage {
    let gray = ops::blur(&ops::gray(image), 1.0);
    let magnitudes = ops::sobel_magnitude(&gray);
    let width = gray.width();
    let strokes = GrayImage::from_fn(width, gray.height(), |x, y| {
        let m = magnitudes[(y * width + x) as usize].min(255.0) as u8;
        Luma([255 - m])
    });
    ops::gray_to_rgb(&ops::threshold(&strokes, 10))
}

/// Thin dark outlines on white
fn outlines(image: &RgbImage, smoothing: f32, edge_threshold: f32, thickness: u32) -> RgbImage {
    let gray = ops::blur(&ops::gray(image), smoothing);
    let mut edges = ops::edge_mask(&gray, edge_threshold);
    if thickness > 0 {
        edges = ops::dilate(&edges, thickness);
    }
    ops::gray_to_rgb(&ops::invert(&edges))
}

pub fn ink_pen(image: &RgbImage) -> RgbImage {
    outlines(image, 1.2, 60.0, 0)
}

pub fn wax(image: &RgbImage) -> RgbImage {
    outlines(image, 2.0, 40.0, 1)
}

pub fn coloring_book(image: &RgbImage) -> RgbImage {
    outlines(image, 1.5, 120.0, 1)
}

pub fn noir(image: &RgbImage) -> RgbImage {
    let contrasted = ops::linear(&ops::gray(image), 2.0, -50.0);
    ops::gray_to_rgb(&ops::threshold(&contrasted, 127))
}

pub fn chalk(image: &RgbImage) -> RgbImage {
    let mut negative = ops::invert(&ops::gray(image));
    ops::add_noise(&mut negative, 50, CHALK_SEED);
    ops::gray_to_rgb(&negative)
}

/// White strokes on a dark sheet
pub fn paper(image: &RgbImage) -> RgbImage {
    let gray = ops::blur(&ops::gray(image), 1.2);
    let lines = ops::invert(&ops::adaptive_threshold(&gray, 9, 2.0));
    ops::gray_to_rgb(&ops::dilate(&lines, 1))
}

/// Dark outlines OR-ed over three bands of gray shading
pub fn storyboard(image: &RgbImage) -> RgbImage {
    let gray = ops::gray(image);
    let outlines = ops::invert(&ops::adaptive_threshold(&ops::blur(&gray, 1.5), 9, 10.0));

    let shaded = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        let mut level: u8 = 0;
        for (cut, value) in [(200u8, 255u8), (120, 180), (60, 120)] {
            if v > cut {
                level = level.saturating_add(value);
            }
        }
        Luma([level | outlines.get_pixel(x, y)[0]])
    });
    ops::gray_to_rgb(&shaded)
}
