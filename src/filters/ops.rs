//! Pixel primitives shared by the catalog filters.
//!
//! Everything here works on whole `image` buffers and never changes their
//! dimensions.

use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use rand::{rngs::SmallRng, Rng, SeedableRng};

pub fn gray(image: &RgbImage) -> GrayImage {
    imageops::grayscale(image)
}

pub fn gray_to_rgb(image: &GrayImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

pub fn invert(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    imageops::invert(&mut out);
    out
}

pub fn blur(image: &GrayImage, sigma: f32) -> GrayImage {
    imageops::blur(image, sigma)
}

/// Colour smoothing; stands in for an edge-preserving bilateral pass
pub fn smooth(image: &RgbImage, sigma: f32) -> RgbImage {
    imageops::blur(image, sigma)
}

/// Colour-dodge blend: `base * scale / (255 - blend)`, saturating at white
pub fn dodge(base: &GrayImage, blend: &GrayImage, scale: f32) -> GrayImage {
    GrayImage::from_fn(base.width(), base.height(), |x, y| {
        let b = base.get_pixel(x, y)[0] as f32;
        let divisor = 255.0 - blend.get_pixel(x, y)[0] as f32;
        let value = if divisor <= 0.0 {
            255.0
        } else {
            (b * scale / divisor).min(255.0)
        };
        Luma([value as u8])
    })
}

/// Mean of the square window of `radius` around every pixel, clamped at the borders
pub fn box_mean(image: &GrayImage, radius: u32) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    // summed-area table with a zero border row/column
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1) * (w + 1) + x + 1] = integral[y * (w + 1) + x + 1] + row_sum;
        }
    }

    let r = radius as usize;
    let mut means = Vec::with_capacity(w * h);
    for y in 0..h {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(r);
            let x1 = (x + r + 1).min(w);
            let sum = integral[y1 * (w + 1) + x1] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + x1]
                - integral[y1 * (w + 1) + x0];
            let area = ((x1 - x0) * (y1 - y0)) as f32;
            means.push(sum as f32 / area);
        }
    }
    means
}

/// Mean-adaptive binary threshold: white where a pixel is brighter than its
/// `block`-sized neighbourhood mean minus `c`, black elsewhere
pub fn adaptive_threshold(image: &GrayImage, block: u32, c: f32) -> GrayImage {
    let means = box_mean(image, block / 2);
    let width = image.width();
    GrayImage::from_fn(width, image.height(), |x, y| {
        let mean = means[(y * width + x) as usize];
        if image.get_pixel(x, y)[0] as f32 > mean - c {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// 3x3 Sobel gradient magnitude, edges replicated
pub fn sobel_magnitude(image: &GrayImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, width as i64 - 1) as u32;
        let cy = y.clamp(0, height as i64 - 1) as u32;
        image.get_pixel(cx, cy)[0] as f32
    };

    let mut magnitudes = Vec::with_capacity((width * height) as usize);
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2.0 * at(x - 1, y)
                - at(x - 1, y + 1);
            let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
                - at(x - 1, y - 1)
                - 2.0 * at(x, y - 1)
                - at(x + 1, y - 1);
            magnitudes.push((gx * gx + gy * gy).sqrt());
        }
    }
    magnitudes
}

/// Binary edge mask (white edges on black) from a gradient magnitude field
pub fn edge_mask(image: &GrayImage, threshold: f32) -> GrayImage {
    let magnitudes = sobel_magnitude(image);
    let width = image.width();
    GrayImage::from_fn(width, image.height(), |x, y| {
        if magnitudes[(y * width + x) as usize] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Per-pixel `value * gain + bias`, saturating
pub fn linear(image: &GrayImage, gain: f32, bias: f32) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y)[0] as f32 * gain + bias;
        Luma([v.clamp(0.0, 255.0) as u8])
    })
}

/// Grow bright regions by `radius` pixels (max filter)
pub fn dilate(image: &GrayImage, radius: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius).min(width - 1);
        let y1 = (y + radius).min(height - 1);
        let mut brightest = 0u8;
        for yy in y0..=y1 {
            for xx in x0..=x1 {
                brightest = brightest.max(image.get_pixel(xx, yy)[0]);
            }
        }
        Luma([brightest])
    })
}

/// Keep colour only where the mask is set (per-channel bitwise AND)
pub fn mask_and(color: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(color.width(), color.height(), |x, y| {
        let m = mask.get_pixel(x, y)[0];
        let c = color.get_pixel(x, y);
        Rgb([c[0] & m, c[1] & m, c[2] & m])
    })
}

/// Scale each channel by its gain, saturating at 255
pub fn channel_gain(image: &mut RgbImage, gains: [f32; 3]) {
    for pixel in image.pixels_mut() {
        for (channel, gain) in pixel.0.iter_mut().zip(gains) {
            *channel = (*channel as f32 * gain).min(255.0) as u8;
        }
    }
}

/// Reduce each channel to `levels` evenly spaced values
pub fn posterize(image: &mut RgbImage, levels: u8) {
    let levels = levels.max(2) as f32;
    let step = 255.0 / (levels - 1.0);
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = ((*channel as f32 / step).round() * step).min(255.0) as u8;
        }
    }
}

/// Multiply colour by a 0-255 mask treated as 0.0-1.0
pub fn modulate(color: &RgbImage, mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(color.width(), color.height(), |x, y| {
        let m = mask.get_pixel(x, y)[0] as f32 / 255.0;
        let c = color.get_pixel(x, y);
        Rgb([
            (c[0] as f32 * m) as u8,
            (c[1] as f32 * m) as u8,
            (c[2] as f32 * m) as u8,
        ])
    })
}

/// Add uniform noise in `0..amplitude`, from a fixed seed so output is repeatable
pub fn add_noise(image: &mut GrayImage, amplitude: u8, seed: u64) {
    if amplitude == 0 {
        return;
    }
    let mut rng = SmallRng::seed_from_u64(seed);
    for pixel in image.pixels_mut() {
        let noise: u8 = rng.gen_range(0..amplitude);
        pixel[0] = pixel[0].saturating_add(noise);
    }
}
