//! # AgriScan
//!
//! A Rust crate for estimating the area of damaged crop in field photographs.
//!
//! This library measures damage by:
//! - Calibrating pixel area against a reference marker of known size
//! - Classifying damaged pixels with an HSV color range
//! - Extracting the boundaries of damaged regions
//! - Converting the damaged pixel count into physical area
//! - Letting an operator refine the range interactively and commit results
//!
//! ## Example
//!
//! ```rust,no_run
//! use agriscan::{estimate_damage, load_and_calibrate, ColorRange, DenoiseParameter, ScanConfig};
//! use std::path::Path;
//!
//! let config = ScanConfig::default();
//! let (image, calibration) = load_and_calibrate(Path::new("field.jpg"), &config)?;
//! let range = ColorRange::new([10, 80, 40], [30, 255, 200])?;
//! let result = estimate_damage(&image, &calibration, &range, DenoiseParameter::new(3))?;
//! println!("Damage = {:.2}m^2", result.area);
//! # Ok::<(), agriscan::ScanError>(())
//! ```

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub mod calibration;
pub mod color;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod estimation;
pub mod image_loader;
pub mod refinement;
pub mod render;

pub use calibration::{CalibrationState, MarkerCalibrator, MarkerRegion};
pub use color::{ColorConverter, ColorRange, HsvColor};
pub use config::ScanConfig;
pub use detection::{Contour, DamageClassifier, DenoiseParameter, Mask, RegionExtractor};
pub use error::{Result, ScanError};
pub use estimation::{AreaEstimator, AreaMeasurement};
pub use image_loader::{FileImageSource, Image, ImageSource};
pub use refinement::{
    FileResultSink, LoopState, OperatorAction, RawParameters, RefinementLoop, SessionReport,
    TickOutcome,
};
pub use render::{AnnotatedFrame, FrameRenderer};

/// A committed damage measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageResult {
    /// Foreground pixels of the damage mask
    pub pixel_count: u64,
    /// Damaged area in square metres, two decimal places
    pub area: f64,
    /// HSV range the mask was classified with
    pub color_range: ColorRange,
    /// Denoise strength the mask was classified with
    pub denoise: DenoiseParameter,
    /// When the result was committed
    pub timestamp: DateTime<Local>,
}

impl DamageResult {
    /// Result stamped with the current local time
    pub fn new(measurement: AreaMeasurement, color_range: ColorRange, denoise: DenoiseParameter) -> Self {
        Self {
            pixel_count: measurement.pixel_count,
            area: measurement.area,
            color_range,
            denoise,
            timestamp: Local::now(),
        }
    }
}

/// Load an image and calibrate it against the configured marker
///
/// # Arguments
///
/// * `path` - Path to a `.jpg`, `.jpeg` or `.png` photograph
/// * `config` - Working resolution and marker settings
///
/// # Returns
///
/// The working image and its calibration
///
/// # Errors
///
/// Returns `ScanError` if:
/// - The image cannot be read or decoded
/// - The marker band or reference area is invalid
/// - No marker is visible in the image
pub fn load_and_calibrate(path: &Path, config: &ScanConfig) -> Result<(Image, CalibrationState)> {
    let source = FileImageSource::new(
        config.working_resolution.width,
        config.working_resolution.height,
    );
    let image = source.load(path)?;
    let calibration = MarkerCalibrator::from_config(&config.marker)?.calibrate(&image)?;
    info!(
        path = %path.display(),
        marker_pixels = calibration.reference_pixel_count(),
        "image ready for refinement"
    );
    Ok((image, calibration))
}

/// Measure damage once with fixed parameters, without a refinement session
///
/// # Errors
///
/// Returns `ScanError::CalibrationMissing` if the calibration has no
/// reference pixels.
pub fn estimate_damage(
    image: &Image,
    calibration: &CalibrationState,
    range: &ColorRange,
    denoise: DenoiseParameter,
) -> Result<DamageResult> {
    let mask = DamageClassifier::new().classify(image, range, denoise);
    let measurement = AreaEstimator::new().measure(&mask, calibration)?;
    Ok(DamageResult::new(measurement, *range, denoise))
}
