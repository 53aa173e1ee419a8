//! Reference marker detection and pixel-to-area calibration
//!
//! Implements marker calibration that:
//! - Thresholds the image with the marker's HSV band (near-white by default)
//! - Traces region boundaries and picks the outer contour of largest area
//! - Counts the pixels of the selected region directly from the mask
//! - Derives the physical area represented by one pixel
//!
//! Ties between equally large contours go to the first one extracted.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::color::{ColorConverter, ColorRange, HsvColor};
use crate::config::MarkerConfig;
use crate::constants::marker::{LOWER_BOUND, REFERENCE_AREA_M2, UPPER_BOUND};
use crate::detection::{BoundingRect, Contour, Mask, RegionExtractor};
use crate::image_loader::Image;
use crate::{Result, ScanError};

/// Marker band from the compile-time defaults; a bad edit fails the build
const DEFAULT_MARKER_RANGE: ColorRange = ColorRange::from_const_bounds(
    HsvColor::new(LOWER_BOUND[0], LOWER_BOUND[1], LOWER_BOUND[2]),
    HsvColor::new(UPPER_BOUND[0], UPPER_BOUND[1], UPPER_BOUND[2]),
);

/// Calibration derived once per loaded image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    reference_pixel_count: u64,
    reference_area: f64,
}

impl CalibrationState {
    /// Create a calibration from a measured pixel count and a known area
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidParameter` if `reference_area` is not a
    /// positive finite number.
    pub fn new(reference_pixel_count: u64, reference_area: f64) -> Result<Self> {
        if !(reference_area.is_finite() && reference_area > 0.0) {
            return Err(ScanError::invalid_parameter("reference_area", reference_area));
        }
        Ok(Self {
            reference_pixel_count,
            reference_area,
        })
    }

    pub fn reference_pixel_count(&self) -> u64 {
        self.reference_pixel_count
    }

    pub fn reference_area(&self) -> f64 {
        self.reference_area
    }

    /// Physical area of one pixel
    ///
    /// # Errors
    ///
    /// Returns `ScanError::CalibrationMissing` when no reference pixels were
    /// measured.
    pub fn scale_factor(&self) -> Result<f64> {
        if self.reference_pixel_count == 0 {
            return Err(ScanError::CalibrationMissing);
        }
        Ok(self.reference_area / self.reference_pixel_count as f64)
    }
}

/// Marker region selected during calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRegion {
    /// Pixels belonging to the selected region
    pub pixel_count: u64,
    /// Bounding rectangle of the selected contour
    pub bounds: BoundingRect,
}

/// Locates the reference marker and calibrates pixel area
#[derive(Debug, Clone)]
pub struct MarkerCalibrator {
    range: ColorRange,
    reference_area: f64,
    converter: ColorConverter,
    extractor: RegionExtractor,
}

impl Default for MarkerCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerCalibrator {
    /// Create a calibrator for a near-white marker of the default area
    pub fn new() -> Self {
        Self {
            range: DEFAULT_MARKER_RANGE,
            reference_area: REFERENCE_AREA_M2,
            converter: ColorConverter::new(),
            extractor: RegionExtractor::new(),
        }
    }

    /// Create a calibrator with a custom marker band and area
    pub fn with_params(range: ColorRange, reference_area: f64) -> Self {
        Self {
            range,
            reference_area,
            converter: ColorConverter::new(),
            extractor: RegionExtractor::new(),
        }
    }

    /// Create a calibrator from configuration
    pub fn from_config(config: &MarkerConfig) -> Result<Self> {
        let range = ColorRange::new(config.lower, config.upper)?;
        Ok(Self::with_params(range, config.reference_area))
    }

    pub fn range(&self) -> &ColorRange {
        &self.range
    }

    pub fn reference_area(&self) -> f64 {
        self.reference_area
    }

    /// Calibrate the image against the reference marker
    ///
    /// # Errors
    ///
    /// Returns `ScanError::MarkerNotFound` if no marker-colored region exists
    /// and `ScanError::InvalidParameter` if the configured area is not
    /// positive.
    pub fn calibrate(&self, image: &Image) -> Result<CalibrationState> {
        let region = self.locate(image)?;
        let calibration = CalibrationState::new(region.pixel_count, self.reference_area)?;
        info!(
            pixels = region.pixel_count,
            reference_area = self.reference_area,
            x = region.bounds.x,
            y = region.bounds.y,
            width = region.bounds.width,
            height = region.bounds.height,
            "marker calibrated"
        );
        Ok(calibration)
    }

    /// Find the marker region without building a calibration
    pub fn locate(&self, image: &Image) -> Result<MarkerRegion> {
        let hsv = self.converter.to_hsv(image.as_rgb());
        let mask = Mask::from_gray(self.range.threshold(&hsv));
        let contours = self.extractor.extract(&mask);
        debug!(candidates = contours.len(), "marker candidates");

        let marker = largest_outer_contour(&contours).ok_or_else(|| ScanError::MarkerNotFound {
            reason: format!("no region matches the marker band {}", self.range),
        })?;

        let bounds = marker.bounding_rect().ok_or_else(|| ScanError::MarkerNotFound {
            reason: "selected marker contour has no points".into(),
        })?;

        let pixel_count = region_pixel_count(&mask, marker, &bounds);
        if pixel_count == 0 {
            return Err(ScanError::MarkerNotFound {
                reason: "selected marker region is empty".into(),
            });
        }

        Ok(MarkerRegion {
            pixel_count,
            bounds,
        })
    }
}

/// Outer contour of maximum area; the first one wins on ties
fn largest_outer_contour(contours: &[Contour]) -> Option<&Contour> {
    let mut best: Option<(&Contour, f64)> = None;
    for contour in contours.iter().filter(|c| c.is_outer()) {
        let area = contour.area();
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((contour, area)),
        }
    }
    best.map(|(c, _)| c)
}

/// Count the pixels enclosed by `contour`, interior holes included
///
/// The owning 8-connected component is copied into a scratch buffer with a
/// one-pixel margin. Every other pixel that is 4-connected to the margin
/// lies outside the marker; the rest are counted.
fn region_pixel_count(mask: &Mask, contour: &Contour, bounds: &BoundingRect) -> u64 {
    let Some(start) = contour.points.first() else {
        return 0;
    };

    // outer borders are traced with 8-connectivity
    let labels = connected_components(mask.as_gray(), Connectivity::Eight, Luma([0u8]));
    let label = labels.get_pixel(start.x as u32, start.y as u32)[0];
    if label == 0 {
        return 0;
    }

    let mut scratch = GrayImage::new(bounds.width + 2, bounds.height + 2);
    for y in 0..bounds.height {
        for x in 0..bounds.width {
            let (mx, my) = ((bounds.x as u32) + x, (bounds.y as u32) + y);
            if labels.get_pixel(mx, my)[0] == label {
                scratch.put_pixel(x + 1, y + 1, Luma([255]));
            }
        }
    }

    // marker pixels are background here, so only gaps get labels
    let gaps = connected_components(&scratch, Connectivity::Four, Luma([255u8]));
    let outside = gaps.get_pixel(0, 0)[0];
    gaps.pixels().filter(|p| p[0] != outside).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const FIELD: Rgb<u8> = Rgb([50, 120, 40]);
    const WHITE: Rgb<u8> = Rgb([250, 250, 250]);

    fn fill(rgb: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                rgb.put_pixel(x, y, color);
            }
        }
    }

    #[test]
    fn test_calibrator_defaults() {
        let calibrator = MarkerCalibrator::new();
        assert_eq!(calibrator.reference_area(), REFERENCE_AREA_M2);
        assert_eq!(calibrator.range().lower().value, LOWER_BOUND[2]);
    }

    #[test]
    fn test_rectangular_marker_pixel_count() {
        let mut rgb = RgbImage::from_pixel(60, 40, FIELD);
        fill(&mut rgb, 10, 5, 12, 9, WHITE);
        let calibration = MarkerCalibrator::new().calibrate(&Image::new(rgb)).unwrap();
        assert_eq!(calibration.reference_pixel_count(), 108);
        assert_eq!(calibration.reference_area(), 2.5);
    }

    #[test]
    fn test_non_rectangular_marker_counts_region_pixels() {
        // L-shaped marker: bounding box is 10x10 but only 64 pixels are white
        let mut rgb = RgbImage::from_pixel(40, 40, FIELD);
        fill(&mut rgb, 5, 5, 10, 4, WHITE);
        fill(&mut rgb, 5, 9, 4, 6, WHITE);
        let region = MarkerCalibrator::new().locate(&Image::new(rgb)).unwrap();
        assert_eq!(region.pixel_count, 64);
        assert_eq!(region.bounds, BoundingRect { x: 5, y: 5, width: 10, height: 10 });
    }

    #[test]
    fn test_marker_blemish_counts_toward_area() {
        // 2x2 dark speck in the middle of a 20x20 marker
        let mut rgb = RgbImage::from_pixel(40, 40, FIELD);
        fill(&mut rgb, 10, 10, 20, 20, WHITE);
        fill(&mut rgb, 19, 19, 2, 2, Rgb([20, 20, 20]));
        let region = MarkerCalibrator::new().locate(&Image::new(rgb)).unwrap();
        assert_eq!(region.pixel_count, 400);
        assert_eq!(region.bounds, BoundingRect { x: 10, y: 10, width: 20, height: 20 });
    }

    #[test]
    fn test_marker_ring_counts_enclosed_area() {
        // 12x12 marker with a 4x4 hole touching nothing but the marker
        let mut rgb = RgbImage::from_pixel(30, 30, FIELD);
        fill(&mut rgb, 3, 3, 12, 12, WHITE);
        fill(&mut rgb, 7, 7, 4, 4, FIELD);
        let region = MarkerCalibrator::new().locate(&Image::new(rgb)).unwrap();
        assert_eq!(region.pixel_count, 144);
    }

    #[test]
    fn test_default_marker_band() {
        let range = *MarkerCalibrator::new().range();
        assert_eq!(range, ColorRange::new(LOWER_BOUND, UPPER_BOUND).unwrap());
    }

    #[test]
    fn test_largest_marker_is_selected() {
        let mut rgb = RgbImage::from_pixel(80, 40, FIELD);
        fill(&mut rgb, 2, 2, 4, 4, WHITE);
        fill(&mut rgb, 30, 10, 10, 10, WHITE);
        let calibration = MarkerCalibrator::new().calibrate(&Image::new(rgb)).unwrap();
        assert_eq!(calibration.reference_pixel_count(), 100);
    }

    #[test]
    fn test_equal_markers_first_found_wins() {
        let mut rgb = RgbImage::from_pixel(80, 40, FIELD);
        fill(&mut rgb, 50, 2, 5, 5, WHITE);
        fill(&mut rgb, 5, 20, 5, 5, WHITE);
        let region = MarkerCalibrator::new().locate(&Image::new(rgb)).unwrap();
        assert_eq!(region.bounds.y, 2);
        assert_eq!(region.bounds.x, 50);
    }

    #[test]
    fn test_black_pixels_are_not_a_marker() {
        let mut rgb = RgbImage::from_pixel(30, 30, FIELD);
        fill(&mut rgb, 5, 5, 10, 10, Rgb([0, 0, 0]));
        let err = MarkerCalibrator::new().calibrate(&Image::new(rgb)).unwrap_err();
        assert!(matches!(err, ScanError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_missing_marker_is_reported() {
        let rgb = RgbImage::from_pixel(30, 30, FIELD);
        let err = MarkerCalibrator::new().calibrate(&Image::new(rgb)).unwrap_err();
        assert!(matches!(err, ScanError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_scale_factor() {
        let calibration = CalibrationState::new(100, 2.5).unwrap();
        assert!((calibration.scale_factor().unwrap() - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_zero_pixels_has_no_scale_factor() {
        let calibration = CalibrationState::new(0, 2.5).unwrap();
        assert!(matches!(calibration.scale_factor(), Err(ScanError::CalibrationMissing)));
    }

    #[test]
    fn test_non_positive_area_rejected() {
        assert!(CalibrationState::new(10, 0.0).is_err());
        assert!(CalibrationState::new(10, -1.0).is_err());
        assert!(CalibrationState::new(10, f64::NAN).is_err());
    }
}
