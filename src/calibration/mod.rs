//! Pixel-to-area calibration module
//!
//! A reference marker of known physical area is located in the image and
//! its pixel count turned into a scale factor. Calibration happens once
//! per loaded image and is never persisted.

pub mod marker;

pub use marker::{CalibrationState, MarkerCalibrator, MarkerRegion};
