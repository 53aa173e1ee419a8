//! RGB to HSV conversion in the 8-bit half-range convention
//!
//! Hue is stored as degrees / 2 so that it fits in a byte (0-180);
//! saturation and value are scaled to 0-255. Pure grays have hue 0.

use image::{ImageBuffer, Rgb, RgbImage};
use palette::{FromColor, Hsv, Srgb};

use super::range::HsvColor;
use crate::constants::hsv::HUE_MAX;

/// Image whose three channels hold hue, saturation and value
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Converts RGB pixels and images into the half-range HSV space
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorConverter;

impl ColorConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert one RGB (0-255) pixel to half-range HSV
    pub fn rgb_to_hsv(&self, r: u8, g: u8, b: u8) -> HsvColor {
        let srgb: Srgb<f32> = Srgb::new(r, g, b).into_format();
        let hsv: Hsv = Hsv::from_color(srgb);

        let hue = (hsv.hue.into_positive_degrees() / 2.0).round();
        let hue = hue.clamp(0.0, HUE_MAX as f32) as u8;
        let saturation = (hsv.saturation * 255.0).round().clamp(0.0, 255.0) as u8;
        let value = (hsv.value * 255.0).round().clamp(0.0, 255.0) as u8;

        HsvColor::new(hue, saturation, value)
    }

    /// Convert a whole RGB image, keeping its dimensions
    pub fn to_hsv(&self, image: &RgbImage) -> HsvImage {
        let mut hsv = HsvImage::new(image.width(), image.height());
        for (src, dst) in image.pixels().zip(hsv.pixels_mut()) {
            let c = self.rgb_to_hsv(src[0], src[1], src[2]);
            *dst = Rgb([c.hue, c.saturation, c.value]);
        }
        hsv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_hsv_black() {
        let hsv = ColorConverter::new().rgb_to_hsv(0, 0, 0);
        assert_eq!(hsv, HsvColor::new(0, 0, 0));
    }

    #[test]
    fn test_rgb_to_hsv_white() {
        let hsv = ColorConverter::new().rgb_to_hsv(255, 255, 255);
        assert_eq!(hsv.saturation, 0);
        assert_eq!(hsv.value, 255);
    }

    #[test]
    fn test_primary_hues_are_halved() {
        let converter = ColorConverter::new();
        assert_eq!(converter.rgb_to_hsv(255, 0, 0), HsvColor::new(0, 255, 255));
        assert_eq!(converter.rgb_to_hsv(0, 255, 0), HsvColor::new(60, 255, 255));
        assert_eq!(converter.rgb_to_hsv(0, 0, 255), HsvColor::new(120, 255, 255));
    }

    #[test]
    fn test_half_saturation() {
        let hsv = ColorConverter::new().rgb_to_hsv(200, 100, 100);
        assert_eq!(hsv.hue, 0);
        assert_eq!(hsv.value, 200);
        assert!((hsv.saturation as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_image_conversion_keeps_dimensions() {
        let image = RgbImage::from_pixel(7, 3, Rgb([0, 255, 0]));
        let hsv = ColorConverter::new().to_hsv(&image);
        assert_eq!(hsv.dimensions(), (7, 3));
        assert_eq!(hsv.get_pixel(6, 2).0, [60, 255, 255]);
    }
}
