//! Compile-time defaults and limits for damage analysis
//!
//! Configuration values in [`crate::config::ScanConfig`] default to the
//! constants defined here.

/// Half-range HSV conventions (8-bit hue stored as degrees / 2)
pub mod hsv {
    /// Largest hue value
    pub const HUE_MAX: u8 = 180;

    /// Largest saturation value
    pub const SATURATION_MAX: u8 = 255;

    /// Largest value (brightness) value
    pub const VALUE_MAX: u8 = 255;
}

/// Reference marker defaults
pub mod marker {
    /// Physical area of the reference marker in square metres
    pub const REFERENCE_AREA_M2: f64 = 2.5;

    /// Lower HSV bound for a near-white marker (hue, saturation, value)
    pub const LOWER_BOUND: [u8; 3] = [0, 0, 200];

    /// Upper HSV bound for a near-white marker (hue, saturation, value)
    pub const UPPER_BOUND: [u8; 3] = [180, 40, 255];
}

/// Median smoothing limits
pub mod denoise {
    /// Largest blur value the operator can request
    pub const MAX_STRENGTH: u32 = 50;
}

/// Overlay rendering defaults
pub mod overlay {
    /// Weight of the base image when compositing contour fills
    pub const ALPHA: f32 = 0.6;

    /// Contour fill color (RGB)
    pub const FILL_COLOR: [u8; 3] = [0, 0, 255];

    /// Annotation text color (RGB)
    pub const TEXT_COLOR: [u8; 3] = [255, 255, 255];

    /// Annotation text height in pixels
    pub const FONT_SCALE: f32 = 32.0;

    /// Left margin for annotation text
    pub const TEXT_X: i32 = 10;

    /// Baselines of the area line and the three bound lines
    pub const AREA_LINE_Y: i32 = 30;
    pub const BOUND_LINES_Y: [i32; 3] = [75, 125, 200];
}

/// Working resolution every loaded image is resized to
pub mod resolution {
    pub const WIDTH: u32 = 640;
    pub const HEIGHT: u32 = 480;
}

/// Area reporting
pub mod area {
    /// Decimal places kept in reported areas
    pub const DECIMAL_PLACES: i32 = 2;

    /// Unit label used in annotations
    pub const UNIT: &str = "m^2";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_band_is_ordered() {
        for i in 0..3 {
            assert!(marker::LOWER_BOUND[i] <= marker::UPPER_BOUND[i]);
        }
        assert!(marker::UPPER_BOUND[0] <= hsv::HUE_MAX);
        assert!(marker::REFERENCE_AREA_M2 > 0.0);
    }

    #[test]
    fn test_overlay_alpha_range() {
        assert!(overlay::ALPHA > 0.0 && overlay::ALPHA < 1.0);
        assert!(overlay::BOUND_LINES_Y.windows(2).all(|w| w[0] < w[1]));
        assert!(overlay::AREA_LINE_Y < overlay::BOUND_LINES_Y[0]);
    }
}
