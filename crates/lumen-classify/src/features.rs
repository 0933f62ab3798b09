//! Image features the classifier decides on.
//!
//! Each analysis is a pure function over an image or a set of text boxes so
//! they can be computed and tested independently.

use std::collections::HashMap;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use lumen_core::defaults::{
    HIGH_CONTRAST_DELTA, LIGHT_BACKGROUND_LUMINANCE, MONOCHROME_TOLERANCE,
    PROFILE_DOMINANT_COLORS, PROFILE_QUANTIZE_STEP, PROFILE_SAMPLE_SIZE,
};
use lumen_core::{BoundingBox, RgbColor};

/// Pixel dimensions and shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageProperties {
    pub width: u32,
    pub height: u32,
    /// `width / height`; 0.0 for a zero-height image.
    pub aspect_ratio: f32,
}

impl ImageProperties {
    pub fn of(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let aspect_ratio = if height == 0 {
            0.0
        } else {
            width as f32 / height as f32
        };
        Self {
            width,
            height,
            aspect_ratio,
        }
    }
}

/// Summary of detected text boxes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub region_count: usize,
    pub has_text: bool,
    /// Sum of box areas; overlapping boxes can push this past 1.0.
    pub density: f32,
    /// Mean box height as a fraction of image height.
    pub average_text_size: f32,
}

impl TextMetrics {
    pub fn from_regions(regions: &[BoundingBox]) -> Self {
        if regions.is_empty() {
            return Self::default();
        }
        let density = regions.iter().map(BoundingBox::area).sum();
        let total_height: f32 = regions.iter().map(|r| r.height).sum();
        Self {
            region_count: regions.len(),
            has_text: true,
            density,
            average_text_size: total_height / regions.len() as f32,
        }
    }
}

/// Color statistics of a downscaled image.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorProfile {
    /// Up to five most frequent colors at 0.1 channel resolution, most frequent first.
    pub dominant_colors: Vec<RgbColor>,
    pub is_monochrome: bool,
    pub has_high_contrast: bool,
    /// Mean of the four corner pixels.
    pub background: RgbColor,
}

impl ColorProfile {
    pub fn of(image: &DynamicImage) -> Self {
        let dominant_colors = profile_colors(image);
        let is_monochrome = dominant_colors
            .iter()
            .all(|c| c.channel_spread() <= MONOCHROME_TOLERANCE);
        let has_high_contrast = match dominant_colors.as_slice() {
            [first, second, ..] => {
                (first.luminance() - second.luminance()).abs() > HIGH_CONTRAST_DELTA
            }
            _ => false,
        };

        Self {
            dominant_colors,
            is_monochrome,
            has_high_contrast,
            background: corner_background(image),
        }
    }

    pub fn has_light_background(&self) -> bool {
        self.background.luminance() > LIGHT_BACKGROUND_LUMINANCE
    }
}

fn profile_colors(image: &DynamicImage) -> Vec<RgbColor> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let sample = if width > PROFILE_SAMPLE_SIZE || height > PROFILE_SAMPLE_SIZE {
        image
            .resize(PROFILE_SAMPLE_SIZE, PROFILE_SAMPLE_SIZE, FilterType::Triangle)
            .to_rgb8()
    } else {
        image.to_rgb8()
    };

    // Channels as whole tenths so colors hash exactly.
    let steps = (1.0 / PROFILE_QUANTIZE_STEP).round();
    let quantize = |c: u8| ((c as f32 / 255.0) * steps).round() as u8;

    let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
    for pixel in sample.pixels() {
        let key = [quantize(pixel[0]), quantize(pixel[1]), quantize(pixel[2])];
        *counts.entry(key).or_default() += 1;
    }

    let mut ranked: Vec<([u8; 3], usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(PROFILE_DOMINANT_COLORS)
        .map(|([r, g, b], _)| {
            RgbColor::new(r as f32 / steps, g as f32 / steps, b as f32 / steps)
        })
        .collect()
}

fn corner_background(image: &DynamicImage) -> RgbColor {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return RgbColor::default();
    }

    let corners = [
        (0, 0),
        (width - 1, 0),
        (0, height - 1),
        (width - 1, height - 1),
    ];
    let (mut r, mut g, mut b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in corners {
        let pixel = image.get_pixel(x, y);
        r += pixel[0] as f32;
        g += pixel[1] as f32;
        b += pixel[2] as f32;
    }
    let scale = 4.0 * 255.0;
    RgbColor::new(r / scale, g / scale, b / scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    #[test]
    fn test_image_properties() {
        let props = ImageProperties::of(&solid(330, 200, [0, 0, 0]));
        assert_eq!((props.width, props.height), (330, 200));
        assert!((props.aspect_ratio - 1.65).abs() < 1e-6);
    }

    #[test]
    fn test_text_metrics_unclamped_density() {
        let regions = vec![
            BoundingBox::new(0.0, 0.0, 1.0, 0.8),
            BoundingBox::new(0.0, 0.1, 1.0, 0.6),
        ];
        let metrics = TextMetrics::from_regions(&regions);
        assert_eq!(metrics.region_count, 2);
        assert!(metrics.has_text);
        assert!((metrics.density - 1.4).abs() < 1e-6);
        assert!((metrics.average_text_size - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_text_metrics_empty() {
        let metrics = TextMetrics::from_regions(&[]);
        assert!(!metrics.has_text);
        assert_eq!(metrics.region_count, 0);
        assert_eq!(metrics.density, 0.0);
    }

    #[test]
    fn test_grey_image_is_monochrome_and_light() {
        let profile = ColorProfile::of(&solid(120, 40, [230, 230, 230]));
        assert_eq!(profile.dominant_colors.len(), 1);
        assert!(profile.is_monochrome);
        assert!(!profile.has_high_contrast);
        assert!(profile.has_light_background());
    }

    #[test]
    fn test_black_on_white_is_high_contrast() {
        // Top 70% white, bottom 30% black.
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(40, 40, |_, y| {
            if y < 28 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        }));
        let profile = ColorProfile::of(&image);
        assert_eq!(profile.dominant_colors[0], RgbColor::new(1.0, 1.0, 1.0));
        assert!(profile.is_monochrome);
        assert!(profile.has_high_contrast);
    }

    #[test]
    fn test_colorful_image_is_not_monochrome() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(90, 30, |x, _| match x / 30 {
            0 => Rgb([220, 40, 40]),
            1 => Rgb([40, 200, 60]),
            _ => Rgb([30, 60, 210]),
        }));
        let profile = ColorProfile::of(&image);
        assert!(!profile.is_monochrome);
        assert!(profile.dominant_colors.len() <= PROFILE_DOMINANT_COLORS);
    }

    #[test]
    fn test_empty_image_profile() {
        let profile = ColorProfile::of(&DynamicImage::new_rgb8(0, 0));
        assert!(profile.dominant_colors.is_empty());
        assert!(!profile.has_high_contrast);
        assert!(!profile.has_light_background());
    }
}
