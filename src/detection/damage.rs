//! Damage classification by HSV thresholding and median denoising
//!
//! Implements a pure classifier that:
//! - Converts the working image to half-range HSV
//! - Keeps pixels inside the operator's color range (inclusive bounds)
//! - Suppresses speckle with a median filter of odd size
//!
//! Identical inputs always produce a bit-identical [`Mask`].

use image::{GrayImage, Luma};
use imageproc::filter::median_filter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{ColorConverter, ColorRange};
use crate::image_loader::Image;

/// Requested strength of the median smoothing pass
///
/// Any non-negative value is accepted; the filter always runs with an odd
/// kernel derived by [`DenoiseParameter::effective_kernel_size`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenoiseParameter(pub u32);

impl DenoiseParameter {
    pub const fn new(requested: u32) -> Self {
        Self(requested)
    }

    pub fn requested(&self) -> u32 {
        self.0
    }

    /// Odd kernel size used by the filter: `floor((1 + d) / 2) * 2 + 1`
    ///
    /// Computed in 64 bits so every `u32` strength maps to a valid size.
    pub fn effective_kernel_size(&self) -> u64 {
        u64::from(self.radius()) * 2 + 1
    }

    /// Filter radius on each side of the center pixel
    pub fn radius(&self) -> u32 {
        ((u64::from(self.0) + 1) / 2) as u32
    }
}

impl From<u32> for DenoiseParameter {
    fn from(requested: u32) -> Self {
        Self(requested)
    }
}

/// Binary classification result (0 = background, 255 = foreground)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pixels: GrayImage,
}

impl Mask {
    /// All-background mask of the given size
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::new(width, height),
        }
    }

    /// Wrap a grayscale buffer; any non-zero pixel counts as foreground
    pub fn from_gray(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y)[0] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let v = if foreground { 255 } else { 0 };
        self.pixels.put_pixel(x, y, Luma([v]));
    }

    /// Number of foreground pixels
    pub fn count_foreground(&self) -> u64 {
        self.pixels.pixels().filter(|p| p[0] != 0).count() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.pixels().all(|p| p[0] == 0)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn into_gray(self) -> GrayImage {
        self.pixels
    }
}

impl From<GrayImage> for Mask {
    fn from(pixels: GrayImage) -> Self {
        Self::from_gray(pixels)
    }
}

/// Stateless damage classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct DamageClassifier {
    converter: ColorConverter,
}

impl DamageClassifier {
    pub fn new() -> Self {
        Self {
            converter: ColorConverter::new(),
        }
    }

    /// Classify damaged pixels
    ///
    /// # Arguments
    ///
    /// * `image` - Working image
    /// * `range` - Inclusive HSV bounds of the damage color
    /// * `denoise` - Median smoothing strength
    ///
    /// # Returns
    ///
    /// Mask with the same dimensions as `image`
    pub fn classify(&self, image: &Image, range: &ColorRange, denoise: DenoiseParameter) -> Mask {
        let hsv = self.converter.to_hsv(image.as_rgb());
        let raw = range.threshold(&hsv);

        // a window wider than the image adds nothing but edge replicas
        let radius = denoise.radius().min(image.width().max(image.height()));
        let smoothed = if radius == 0 {
            raw
        } else {
            median_filter(&raw, radius, radius)
        };

        let mask = Mask::from_gray(smoothed);
        debug!(
            range = %range,
            kernel = denoise.effective_kernel_size(),
            foreground = mask.count_foreground(),
            "classified damage"
        );
        mask
    }
}
