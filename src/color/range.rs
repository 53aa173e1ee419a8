//! HSV color ranges used for marker isolation and damage classification

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::conversion::HsvImage;
use crate::constants::hsv::{HUE_MAX, SATURATION_MAX, VALUE_MAX};
use crate::{Result, ScanError};

/// An 8-bit HSV triple in the half-range hue convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HsvColor {
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

impl HsvColor {
    pub const fn new(hue: u8, saturation: u8, value: u8) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Check the hue against its half-range maximum
    ///
    /// Saturation and value span the whole `u8` range.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.hue > HUE_MAX {
            return Err(ScanError::invalid_parameter(format!("{}.hue", name), self.hue));
        }
        Ok(())
    }
}

impl From<[u8; 3]> for HsvColor {
    fn from(v: [u8; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Inclusive lower/upper HSV bounds
///
/// Invariant: `lower <= upper` component-wise and hue never exceeds 180.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawColorRange")]
pub struct ColorRange {
    lower: HsvColor,
    upper: HsvColor,
}

#[derive(Deserialize)]
struct RawColorRange {
    lower: HsvColor,
    upper: HsvColor,
}

impl TryFrom<RawColorRange> for ColorRange {
    type Error = ScanError;

    fn try_from(raw: RawColorRange) -> Result<Self> {
        ColorRange::new(raw.lower, raw.upper)
    }
}

impl ColorRange {
    /// Create a validated range
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidParameter` if hue exceeds 180 or any lower
    /// component is greater than its upper counterpart.
    pub fn new(lower: impl Into<HsvColor>, upper: impl Into<HsvColor>) -> Result<Self> {
        let lower = lower.into();
        let upper = upper.into();
        lower.validate("lower")?;
        upper.validate("upper")?;

        let pairs = [
            ("hue", lower.hue, upper.hue),
            ("saturation", lower.saturation, upper.saturation),
            ("value", lower.value, upper.value),
        ];
        for (name, lo, hi) in pairs {
            if lo > hi {
                return Err(ScanError::invalid_parameter(
                    format!("{}_min", name),
                    format!("{} (greater than max {})", lo, hi),
                ));
            }
        }

        Ok(Self { lower, upper })
    }

    /// Range from bounds known at compile time
    ///
    /// Intended for `const` items: invalid bounds are rejected during
    /// constant evaluation, so they never reach a running program.
    pub(crate) const fn from_const_bounds(lower: HsvColor, upper: HsvColor) -> Self {
        assert!(upper.hue <= HUE_MAX, "hue exceeds 180");
        assert!(lower.hue <= upper.hue, "hue bounds inverted");
        assert!(lower.saturation <= upper.saturation, "saturation bounds inverted");
        assert!(lower.value <= upper.value, "value bounds inverted");
        Self { lower, upper }
    }

    /// Range that accepts every pixel
    pub const fn full() -> Self {
        Self {
            lower: HsvColor::new(0, 0, 0),
            upper: HsvColor::new(HUE_MAX, SATURATION_MAX, VALUE_MAX),
        }
    }

    pub fn lower(&self) -> HsvColor {
        self.lower
    }

    pub fn upper(&self) -> HsvColor {
        self.upper
    }

    /// Inclusive membership test on all three channels
    #[inline]
    pub fn contains(&self, hsv: HsvColor) -> bool {
        (self.lower.hue..=self.upper.hue).contains(&hsv.hue)
            && (self.lower.saturation..=self.upper.saturation).contains(&hsv.saturation)
            && (self.lower.value..=self.upper.value).contains(&hsv.value)
    }

    /// Binary mask (0 / 255) of the HSV pixels inside this range
    pub fn threshold(&self, hsv: &HsvImage) -> GrayImage {
        let mut mask = GrayImage::new(hsv.width(), hsv.height());
        for (px, out) in hsv.pixels().zip(mask.pixels_mut()) {
            if self.contains(HsvColor::new(px[0], px[1], px[2])) {
                *out = Luma([255]);
            }
        }
        mask
    }

    /// The six bound values as overlay lines (hue, saturation, value)
    pub fn bound_lines(&self) -> [String; 3] {
        [
            format!(" Min-Hue = {}, Max-Hue = {}", self.lower.hue, self.upper.hue),
            format!(
                " Min-Sat = {}, Max-Sat = {}",
                self.lower.saturation, self.upper.saturation
            ),
            format!(" Min-Val = {}, Max-Val = {}", self.lower.value, self.upper.value),
        ]
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::full()
    }
}

impl fmt::Display for ColorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "H[{}-{}] S[{}-{}] V[{}-{}]",
            self.lower.hue,
            self.upper.hue,
            self.lower.saturation,
            self.upper.saturation,
            self.lower.value,
            self.upper.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_contains_extremes() {
        let range = ColorRange::full();
        assert!(range.contains(HsvColor::new(0, 0, 0)));
        assert!(range.contains(HsvColor::new(180, 255, 255)));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let range = ColorRange::new([10, 20, 30], [40, 50, 60]).unwrap();
        assert!(range.contains(HsvColor::new(10, 20, 30)));
        assert!(range.contains(HsvColor::new(40, 50, 60)));
        assert!(!range.contains(HsvColor::new(9, 20, 30)));
        assert!(!range.contains(HsvColor::new(40, 51, 60)));
        assert!(!range.contains(HsvColor::new(40, 50, 61)));
    }

    #[test]
    fn test_hue_above_limit_rejected() {
        let err = ColorRange::new([0, 0, 0], [181, 255, 255]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidParameter { .. }));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = ColorRange::new([50, 0, 0], [40, 255, 255]).unwrap_err();
        match err {
            ScanError::InvalidParameter { parameter, .. } => assert_eq!(parameter, "hue_min"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_threshold_marks_only_matching_pixels() {
        let mut hsv = HsvImage::new(2, 1);
        hsv.put_pixel(0, 0, image::Rgb([30, 100, 100]));
        hsv.put_pixel(1, 0, image::Rgb([90, 100, 100]));
        let range = ColorRange::new([20, 0, 0], [40, 255, 255]).unwrap();
        let mask = range.threshold(&hsv);
        assert_eq!(mask.get_pixel(0, 0).0, [255]);
        assert_eq!(mask.get_pixel(1, 0).0, [0]);
    }

    #[test]
    fn test_bound_lines_format() {
        let range = ColorRange::new([1, 2, 3], [4, 5, 6]).unwrap();
        let lines = range.bound_lines();
        assert_eq!(lines[0], " Min-Hue = 1, Max-Hue = 4");
        assert_eq!(lines[1], " Min-Sat = 2, Max-Sat = 5");
        assert_eq!(lines[2], " Min-Val = 3, Max-Val = 6");
    }

    #[test]
    fn test_deserialize_rejects_inverted_range() {
        let json = r#"{"lower":{"hue":90,"saturation":0,"value":0},"upper":{"hue":10,"saturation":255,"value":255}}"#;
        assert!(serde_json::from_str::<ColorRange>(json).is_err());

        let ok = r#"{"lower":{"hue":10,"saturation":0,"value":0},"upper":{"hue":90,"saturation":255,"value":255}}"#;
        let range: ColorRange = serde_json::from_str(ok).unwrap();
        assert_eq!(range.lower().hue, 10);
    }
}
