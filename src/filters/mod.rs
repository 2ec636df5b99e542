//! Filter catalog
//!
//! A closed set of still-image transforms, each a pure
//! `fn(&RgbImage) -> RgbImage` that keeps the frame's dimensions. Identifiers
//! are parsed from strings only at the edges (CLI, public API); everything
//! inside the pipeline passes `FilterId` around.

pub mod ops;
mod sketch;
mod toon;

use std::fmt;
use std::str::FromStr;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SketchError};

/// Signature shared by every catalog transform
pub type FrameTransform = fn(&RgbImage) -> RgbImage;

/// Every filter the pipeline can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterId {
    Grayscale,
    Sketch,
    Cartoon,
    Charcoal,
    InkPen,
    ColorSketch,
    TechPen,
    SoftPen,
    NoirSketch,
    CartoonVariant,
    Storyboard,
    Chalk,
    FeltPen,
    MonochromeSketch,
    SplashSketch,
    ColoringBook,
    WaxSketch,
    PaperSketch,
    NeonSketch,
    Anime,
    ComicBook,
}

impl FilterId {
    pub const ALL: [FilterId; 21] = [
        FilterId::Grayscale,
        FilterId::Sketch,
        FilterId::Cartoon,
        FilterId::Charcoal,
        FilterId::InkPen,
        FilterId::ColorSketch,
        FilterId::TechPen,
        FilterId::SoftPen,
        FilterId::NoirSketch,
        FilterId::CartoonVariant,
        FilterId::Storyboard,
        FilterId::Chalk,
        FilterId::FeltPen,
        FilterId::MonochromeSketch,
        FilterId::SplashSketch,
        FilterId::ColoringBook,
        FilterId::WaxSketch,
        FilterId::PaperSketch,
        FilterId::NeonSketch,
        FilterId::Anime,
        FilterId::ComicBook,
    ];

    /// Canonical kebab-case identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Sketch => "sketch",
            Self::Cartoon => "cartoon",
            Self::Charcoal => "charcoal",
            Self::InkPen => "ink-pen",
            Self::ColorSketch => "color-sketch",
            Self::TechPen => "tech-pen",
            Self::SoftPen => "soft-pen",
            Self::NoirSketch => "noir-sketch",
            Self::CartoonVariant => "cartoon-variant",
            Self::Storyboard => "storyboard",
            Self::Chalk => "chalk",
            Self::FeltPen => "felt-pen",
            Self::MonochromeSketch => "monochrome-sketch",
            Self::SplashSketch => "splash-sketch",
            Self::ColoringBook => "coloring-book",
            Self::WaxSketch => "wax-sketch",
            Self::PaperSketch => "paper-sketch",
            Self::NeonSketch => "neon-sketch",
            Self::Anime => "anime",
            Self::ComicBook => "comic-book",
        }
    }

    /// Camel-case name used by the mobile front-ends
    fn alias(&self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Sketch => "sketch",
            Self::Cartoon => "cartoon",
            Self::Charcoal => "charcoalSketch",
            Self::InkPen => "inkPen",
            Self::ColorSketch => "colorSketch",
            Self::TechPen => "techPen",
            Self::SoftPen => "softPen",
            Self::NoirSketch => "noirSketch",
            Self::CartoonVariant => "cartoon2",
            Self::Storyboard => "storyboard",
            Self::Chalk => "chalk",
            Self::FeltPen => "feltPen",
            Self::MonochromeSketch => "monochromeSketch",
            Self::SplashSketch => "splashSketch",
            Self::ColoringBook => "coloringBook",
            Self::WaxSketch => "waxSketch",
            Self::PaperSketch => "paperSketch",
            Self::NeonSketch => "neonSketch",
            Self::Anime => "anime",
            Self::ComicBook => "comicBook",
        }
    }

    /// One-line description shown by `sketch-video filters`
    pub fn description(&self) -> &'static str {
        match self {
            Self::Grayscale => "Luma-weighted grayscale",
            Self::Sketch => "Pencil sketch from a colour-dodge of the blurred negative",
            Self::Cartoon => "Smoothed colour regions with dark outlines",
            Self::Charcoal => "Heavy gradient strokes on white",
            Self::InkPen => "Thin black ink lines",
            Self::ColorSketch => "Soft colour wash under pencil lines",
            Self::TechPen => "Cartoon outlines with a red cast",
            Self::SoftPen => "Light pencil sketch with softened strokes",
            Self::NoirSketch => "High-contrast black and white",
            Self::CartoonVariant => "Flat cartoon with saturated warm tones",
            Self::Storyboard => "Outlines over banded grey shading",
            Self::Chalk => "Grainy negative, like chalk on a board",
            Self::FeltPen => "Bold cartoon strokes with warm tint",
            Self::MonochromeSketch => "Cartoon outlines with a green cast",
            Self::SplashSketch => "Cartoon outlines with a blue cast",
            Self::ColoringBook => "Clean thick outlines to colour in",
            Self::WaxSketch => "Broad waxy line work",
            Self::PaperSketch => "Bright strokes on a dark sheet",
            Self::NeonSketch => "Glowing colour lines on black",
            Self::Anime => "Flat posterized colour with crisp outlines",
            Self::ComicBook => "Punchy comic colours with ink outlines",
        }
    }

    /// The transform implementing this filter
    pub fn transform(self) -> FrameTransform {
        match self {
            Self::Grayscale => sketch::grayscale,
            Self::Sketch => sketch::pencil,
            Self::Cartoon => toon::cartoon,
            Self::Charcoal => sketch::charcoal,
            Self::InkPen => sketch::ink_pen,
            Self::ColorSketch => toon::color_sketch,
            Self::TechPen => toon::tech_pen,
            Self::SoftPen => sketch::soft_pen,
            Self::NoirSketch => sketch::noir,
            Self::CartoonVariant => toon::cartoon_variant,
            Self::Storyboard => sketch::storyboard,
            Self::Chalk => sketch::chalk,
            Self::FeltPen => toon::felt_pen,
            Self::MonochromeSketch => toon::monochrome_sketch,
            Self::SplashSketch => toon::splash_sketch,
            Self::ColoringBook => sketch::coloring_book,
            Self::WaxSketch => sketch::wax,
            Self::PaperSketch => sketch::paper,
            Self::NeonSketch => toon::neon,
            Self::Anime => toon::anime,
            Self::ComicBook => toon::comic_book,
        }
    }

    pub fn apply(self, image: &RgbImage) -> RgbImage {
        (self.transform())(image)
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterId {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        FilterId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == wanted || id.alias() == wanted)
            .ok_or_else(|| SketchError::UnknownFilter { id: s.to_string() })
    }
}

/// Apply the filter named `filter_id` to one image
pub fn apply_named_filter(image: &RgbImage, filter_id: &str) -> Result<RgbImage> {
    let id: FilterId = filter_id.parse()?;
    Ok(id.apply(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::Rgb;

    fn test_card(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = if (x / 4 + y / 4) % 2 == 0 { 40 } else { 210 };
            Rgb([r, g, b])
        })
    }

    #[test]
    fn test_every_filter_preserves_dimensions() {
        let image = test_card(33, 17);
        for id in FilterId::ALL {
            let out = id.apply(&image);
            assert_eq!(out.dimensions(), (33, 17), "{} changed dimensions", id);
        }
    }

    #[test]
    fn test_every_filter_is_deterministic() {
        let image = test_card(24, 24);
        for id in FilterId::ALL {
            assert_eq!(id.apply(&image), id.apply(&image), "{} is not deterministic", id);
        }
    }

    #[test]
    fn test_identifiers_round_trip() {
        for id in FilterId::ALL {
            assert_eq!(id.as_str().parse::<FilterId>().unwrap(), id);
        }
    }

    #[test]
    fn test_camel_case_aliases() {
        assert_eq!("inkPen".parse::<FilterId>().unwrap(), FilterId::InkPen);
        assert_eq!("comicBook".parse::<FilterId>().unwrap(), FilterId::ComicBook);
        assert_eq!("cartoon2".parse::<FilterId>().unwrap(), FilterId::CartoonVariant);
        assert_eq!("charcoalSketch".parse::<FilterId>().unwrap(), FilterId::Charcoal);
    }

    #[test]
    fn test_unknown_filter() {
        let err = apply_named_filter(&test_card(4, 4), "nonexistent").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFilter);
    }

    #[test]
    fn test_grayscale_output_is_gray() {
        let out = apply_named_filter(&test_card(8, 8), "grayscale").unwrap();
        assert!(out.pixels().all(|p| p[0] == p[1] && p[1] == p[2]));
    }

    #[test]
    fn test_single_pixel_frames() {
        let image = test_card(1, 1);
        for id in FilterId::ALL {
            assert_eq!(id.apply(&image).dimensions(), (1, 1));
        }
    }
}
