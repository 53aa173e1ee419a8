//! Image loading and the immutable working image
//!
//! The core never decodes files itself; it asks an [`ImageSource`] for an
//! [`Image`] already resized to the working resolution. [`FileImageSource`]
//! is the default implementation backed by the `image` crate.
//!
//! ## Supported Formats
//!
//! JPEG and PNG, selected by file extension (case-insensitive).

use image::imageops::FilterType;
use image::{ImageReader, RgbImage};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::constants::resolution;
use crate::error::{Result, ScanError};

/// Immutable RGB image shared by calibration and every refinement tick
///
/// Cloning is cheap; the pixel buffer is reference counted and never
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct Image {
    pixels: Arc<RgbImage>,
}

impl Image {
    /// Wrap an already decoded RGB buffer
    pub fn new(pixels: RgbImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
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

    /// Total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }
}

impl From<RgbImage> for Image {
    fn from(pixels: RgbImage) -> Self {
        Self::new(pixels)
    }
}

/// Supplier of decoded images at the working resolution
pub trait ImageSource {
    /// Load the image at `path`
    ///
    /// # Errors
    ///
    /// Returns `ScanError::UnreadableImage` if the path does not resolve to
    /// a decodable image of a supported format.
    fn load(&self, path: &Path) -> Result<Image>;
}

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(path: &Path) -> Option<ImageFormat> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    fn as_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// Loads JPEG/PNG files from disk and resizes them to a fixed resolution
#[derive(Debug, Clone, Copy)]
pub struct FileImageSource {
    width: u32,
    height: u32,
}

impl Default for FileImageSource {
    fn default() -> Self {
        Self::new(resolution::WIDTH, resolution::HEIGHT)
    }
}

impl FileImageSource {
    /// Create a source producing `width` x `height` images
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resize a decoded buffer to the working resolution
    pub fn resize(&self, rgb: &RgbImage) -> RgbImage {
        if rgb.dimensions() == (self.width, self.height) {
            return rgb.clone();
        }
        image::imageops::resize(rgb, self.width, self.height, FilterType::Triangle)
    }
}

impl ImageSource for FileImageSource {
    fn load(&self, path: &Path) -> Result<Image> {
        if self.width == 0 || self.height == 0 {
            return Err(ScanError::invalid_parameter(
                "working_resolution",
                format!("{}x{}", self.width, self.height),
            ));
        }

        let format = ImageFormat::from_extension(path).ok_or_else(|| ScanError::UnreadableImage {
            message: format!(
                "Unsupported file type (expected .png or .jpg): {}",
                path.display()
            ),
            source: None,
        })?;

        let mut reader = ImageReader::open(path).map_err(|e| {
            ScanError::unreadable_image(format!("Failed to open image file: {}", path.display()), e)
        })?;
        reader.set_format(format.as_image_format());

        let decoded = reader.decode().map_err(|e| {
            ScanError::unreadable_image(format!("Failed to decode image: {}", path.display()), e)
        })?;

        let rgb = decoded.to_rgb8();
        debug!(
            path = %path.display(),
            width = rgb.width(),
            height = rgb.height(),
            "decoded image"
        );

        Ok(Image::new(self.resize(&rgb)))
    }
}
