//! Configuration structures for the agriscan pipeline.
//!
//! This module defines all tunable parameters for a damage analysis
//! session, organized into logical groups for image loading, marker
//! calibration, interactive refinement, overlay rendering and output.
//!
//! # Configuration Loading
//!
//! Configuration can be loaded from JSON files or constructed programmatically:
//!
//! ```no_run
//! use agriscan::ScanConfig;
//! use std::path::Path;
//!
//! // Load from file
//! let config = ScanConfig::from_json_file(Path::new("agriscan.json"))?;
//!
//! // Or use defaults
//! let config = ScanConfig::default();
//! # Ok::<(), agriscan::ScanError>(())
//! ```
//!
//! # Configuration Sections
//!
//! - [`ResolutionConfig`]: working resolution images are resized to
//! - [`MarkerConfig`]: reference marker band and physical area
//! - [`RefinementConfig`]: initial slider positions and limits
//! - [`OverlayConfig`]: contour fill and annotation text
//! - [`OutputConfig`]: where committed results are written

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::color::{ColorRange, HsvColor};
use crate::constants::{denoise, marker, overlay, resolution};
use crate::refinement::RawParameters;
use crate::{Result, ScanError};

/// Complete session configuration.
///
/// Can be serialized to/from JSON so a field survey can reuse one setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Working resolution
    #[serde(default)]
    pub working_resolution: ResolutionConfig,

    /// Reference marker
    #[serde(default)]
    pub marker: MarkerConfig,

    /// Interactive refinement
    #[serde(default)]
    pub refinement: RefinementConfig,

    /// Overlay rendering
    #[serde(default)]
    pub overlay: OverlayConfig,

    /// Result output
    #[serde(default)]
    pub output: OutputConfig,
}

/// Fixed resolution every loaded image is resized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            width: resolution::WIDTH,
            height: resolution::HEIGHT,
        }
    }
}

/// Reference marker parameters.
///
/// The marker band selects the marker's expected appearance in HSV; the
/// area is the marker's known physical size in square metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Physical area of the marker
    pub reference_area: f64,

    /// Lower HSV bound of the marker band
    pub lower: HsvColor,

    /// Upper HSV bound of the marker band
    pub upper: HsvColor,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            reference_area: marker::REFERENCE_AREA_M2,
            lower: marker::LOWER_BOUND.into(),
            upper: marker::UPPER_BOUND.into(),
        }
    }
}

/// Refinement loop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Slider positions when a session starts
    pub initial: RawParameters,

    /// Largest blur value the operator can select
    pub max_denoise: u32,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            initial: RawParameters::default(),
            max_denoise: denoise::MAX_STRENGTH,
        }
    }
}

/// Overlay rendering parameters.
///
/// Contour fills are composited as `alpha * base + (1 - alpha) * fill`.
/// Text is rasterized only when `font_path` points to a TrueType font;
/// annotations are always attached to the frame as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub alpha: f32,
    pub fill_color: [u8; 3],
    pub text_color: [u8; 3],
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    pub font_scale: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            alpha: overlay::ALPHA,
            fill_color: overlay::FILL_COLOR,
            text_color: overlay::TEXT_COLOR,
            font_path: None,
            font_scale: overlay::FONT_SCALE,
        }
    }
}

/// Result output parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving committed frames and their metadata
    pub results_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            working_resolution: ResolutionConfig::default(),
            marker: MarkerConfig::default(),
            refinement: RefinementConfig::default(),
            overlay: OverlayConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let res = self.working_resolution;
        if res.width == 0 || res.height == 0 {
            return Err(ScanError::invalid_parameter(
                "working_resolution",
                format!("{}x{}", res.width, res.height),
            ));
        }

        ColorRange::new(self.marker.lower, self.marker.upper)?;
        if !(self.marker.reference_area.is_finite() && self.marker.reference_area > 0.0) {
            return Err(ScanError::invalid_parameter(
                "marker.reference_area",
                self.marker.reference_area,
            ));
        }

        if !(0.0..=1.0).contains(&self.overlay.alpha) {
            return Err(ScanError::invalid_parameter("overlay.alpha", self.overlay.alpha));
        }
        if self.overlay.font_scale <= 0.0 {
            return Err(ScanError::invalid_parameter(
                "overlay.font_scale",
                self.overlay.font_scale,
            ));
        }

        self.refinement.initial.resolve(self.refinement.max_denoise)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScanError::config(format!("Failed to read {}", path.display()), e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ScanError::config(format!("Failed to parse {}", path.display()), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::config("Failed to serialize configuration", e))?;
        std::fs::write(path, json)
            .map_err(|e| ScanError::config(format!("Failed to write {}", path.display()), e))?;
        Ok(())
    }
}
