//! Conversion of mask pixel counts into physical area

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationState;
use crate::constants::area::DECIMAL_PLACES;
use crate::detection::Mask;
use crate::Result;

/// Pixel count of a mask and the area it represents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaMeasurement {
    pub pixel_count: u64,
    /// Area in calibration units, rounded to two decimal places
    pub area: f64,
}

/// Round to the reported precision
pub fn round_area(area: f64) -> f64 {
    let factor = 10f64.powi(DECIMAL_PLACES);
    (area * factor).round() / factor
}

/// Scales foreground pixel counts by the calibration factor
#[derive(Debug, Clone, Copy, Default)]
pub struct AreaEstimator;

impl AreaEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Physical area covered by the mask's foreground
    ///
    /// # Errors
    ///
    /// Returns `ScanError::CalibrationMissing` if the calibration has no
    /// reference pixels.
    pub fn estimate(&self, mask: &Mask, calibration: &CalibrationState) -> Result<f64> {
        Ok(self.measure(mask, calibration)?.area)
    }

    /// Pixel count and area in one pass
    pub fn measure(&self, mask: &Mask, calibration: &CalibrationState) -> Result<AreaMeasurement> {
        let scale = calibration.scale_factor()?;
        let pixel_count = mask.count_foreground();
        Ok(AreaMeasurement {
            pixel_count,
            area: round_area(pixel_count as f64 * scale),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScanError;
    use image::{GrayImage, Luma};

    fn mask_with(count: u32) -> Mask {
        let mut mask = Mask::empty(100, 100);
        for i in 0..count {
            mask.set(i % 100, i / 100, true);
        }
        mask
    }

    #[test]
    fn test_empty_mask_is_zero_area() {
        let calibration = CalibrationState::new(100, 2.5).unwrap();
        let area = AreaEstimator::new().estimate(&Mask::empty(10, 10), &calibration).unwrap();
        assert_eq!(area, 0.0);
    }

    #[test]
    fn test_area_is_linear_in_pixel_count() {
        let calibration = CalibrationState::new(37, 2.5).unwrap();
        let estimator = AreaEstimator::new();
        let single = estimator.estimate(&mask_with(1200), &calibration).unwrap();
        let double = estimator.estimate(&mask_with(2400), &calibration).unwrap();
        assert!((double - 2.0 * single).abs() <= 0.01 + 1e-9);
    }

    #[test]
    fn test_full_megapixel_scenario() {
        let calibration = CalibrationState::new(100, 2.5).unwrap();
        let mask = Mask::from_gray(GrayImage::from_pixel(1000, 1000, Luma([255])));
        let measurement = AreaEstimator::new().measure(&mask, &calibration).unwrap();
        assert_eq!(measurement.pixel_count, 1_000_000);
        assert!((measurement.area - 25000.00).abs() < 1e-9);
    }

    #[test]
    fn test_rounding_to_two_places() {
        assert_eq!(round_area(1.234), 1.23);
        assert_eq!(round_area(1.236), 1.24);
        assert_eq!(round_area(0.0), 0.0);
    }

    #[test]
    fn test_missing_calibration() {
        let calibration = CalibrationState::new(0, 2.5).unwrap();
        let err = AreaEstimator::new().estimate(&mask_with(5), &calibration).unwrap_err();
        assert!(matches!(err, ScanError::CalibrationMissing));
    }
}
