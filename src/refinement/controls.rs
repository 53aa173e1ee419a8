//! Collaborator contracts of the refinement loop
//!
//! The loop never touches windows, sliders or files directly. It reads
//! parameters, polls operator actions, shows frames and persists results
//! through the traits defined here.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::color::{ColorRange, HsvColor};
use crate::constants::hsv::{HUE_MAX, SATURATION_MAX, VALUE_MAX};
use crate::detection::{DenoiseParameter, Mask};
use crate::render::AnnotatedFrame;
use crate::{DamageResult, Result, ScanError};

/// Slider positions as read from the operator's controls
///
/// Values are unchecked; [`RawParameters::resolve`] validates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawParameters {
    pub hue_min: i32,
    pub hue_max: i32,
    pub saturation_min: i32,
    pub saturation_max: i32,
    pub value_min: i32,
    pub value_max: i32,
    pub blur: i32,
}

impl Default for RawParameters {
    fn default() -> Self {
        Self {
            hue_min: 0,
            hue_max: HUE_MAX as i32,
            saturation_min: 0,
            saturation_max: SATURATION_MAX as i32,
            value_min: 0,
            value_max: VALUE_MAX as i32,
            blur: 0,
        }
    }
}

impl RawParameters {
    /// Parameters describing a validated range and denoise strength
    pub fn from_range(range: &ColorRange, denoise: DenoiseParameter) -> Self {
        let (lo, hi) = (range.lower(), range.upper());
        Self {
            hue_min: lo.hue as i32,
            hue_max: hi.hue as i32,
            saturation_min: lo.saturation as i32,
            saturation_max: hi.saturation as i32,
            value_min: lo.value as i32,
            value_max: hi.value as i32,
            blur: denoise.requested() as i32,
        }
    }

    /// Validate into a color range and denoise parameter
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidParameter` if any bound is outside its
    /// documented range, a minimum exceeds its maximum, or `blur` is
    /// negative or above `max_denoise`.
    pub fn resolve(&self, max_denoise: u32) -> Result<(ColorRange, DenoiseParameter)> {
        let hue_min = channel("hue_min", self.hue_min, HUE_MAX)?;
        let hue_max = channel("hue_max", self.hue_max, HUE_MAX)?;
        let sat_min = channel("saturation_min", self.saturation_min, SATURATION_MAX)?;
        let sat_max = channel("saturation_max", self.saturation_max, SATURATION_MAX)?;
        let val_min = channel("value_min", self.value_min, VALUE_MAX)?;
        let val_max = channel("value_max", self.value_max, VALUE_MAX)?;

        if self.blur < 0 || self.blur as u32 > max_denoise {
            return Err(ScanError::invalid_parameter("blur", self.blur));
        }

        let range = ColorRange::new(
            HsvColor::new(hue_min, sat_min, val_min),
            HsvColor::new(hue_max, sat_max, val_max),
        )?;
        Ok((range, DenoiseParameter::new(self.blur as u32)))
    }
}

fn channel(name: &str, value: i32, max: u8) -> Result<u8> {
    if (0..=max as i32).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ScanError::invalid_parameter(name, value))
    }
}

/// Operator input observed once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorAction {
    /// Keep refining
    #[default]
    None,
    /// Save the current frame and keep refining
    Commit,
    /// Save the current frame and end the session
    CommitAndExit,
    /// End the session without saving
    Cancel,
}

/// Live-adjustable parameter controls
pub trait ParameterSource {
    /// Current slider positions; must not block
    fn read(&mut self) -> RawParameters;
}

/// Source of operator actions
pub trait ActionPoll {
    /// Next action, waiting at most a small bounded time
    fn poll(&mut self) -> OperatorAction;
}

/// Persistence of committed results
pub trait ResultSink {
    /// Store an annotated frame together with its result
    ///
    /// # Errors
    ///
    /// Failures are reported to the operator and never end the session.
    fn save(&mut self, frame: &AnnotatedFrame, result: &DamageResult) -> Result<()>;
}

/// Presentation of frames and failures to the operator
pub trait Display {
    /// Show the frame rendered for the current tick
    fn render(&mut self, frame: &AnnotatedFrame) -> Result<()>;

    /// Show the raw classification mask of the current tick
    fn render_mask(&mut self, _mask: &Mask) -> Result<()> {
        Ok(())
    }

    /// Tell the operator about a recoverable failure
    fn report(&mut self, error: &ScanError) {
        warn!(error = %error, "{}", error.user_message());
    }
}

impl<T: ParameterSource + ?Sized> ParameterSource for &mut T {
    fn read(&mut self) -> RawParameters {
        (**self).read()
    }
}

impl<T: ActionPoll + ?Sized> ActionPoll for &mut T {
    fn poll(&mut self) -> OperatorAction {
        (**self).poll()
    }
}

impl<T: ResultSink + ?Sized> ResultSink for &mut T {
    fn save(&mut self, frame: &AnnotatedFrame, result: &DamageResult) -> Result<()> {
        (**self).save(frame, result)
    }
}

impl<T: Display + ?Sized> Display for &mut T {
    fn render(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        (**self).render(frame)
    }

    fn render_mask(&mut self, mask: &Mask) -> Result<()> {
        (**self).render_mask(mask)
    }

    fn report(&mut self, error: &ScanError) {
        (**self).report(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_match_everything() {
        let (range, denoise) = RawParameters::default().resolve(50).unwrap();
        assert_eq!(range, ColorRange::full());
        assert_eq!(denoise.effective_kernel_size(), 1);
    }

    #[test]
    fn test_out_of_range_hue_rejected() {
        let params = RawParameters {
            hue_max: 200,
            ..RawParameters::default()
        };
        match params.resolve(50).unwrap_err() {
            ScanError::InvalidParameter { parameter, value } => {
                assert_eq!(parameter, "hue_max");
                assert_eq!(value, "200");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_negative_and_excessive_blur_rejected() {
        let negative = RawParameters {
            blur: -1,
            ..RawParameters::default()
        };
        assert!(negative.resolve(50).is_err());

        let excessive = RawParameters {
            blur: 51,
            ..RawParameters::default()
        };
        assert!(excessive.resolve(50).is_err());
    }

    #[test]
    fn test_min_above_max_rejected() {
        let params = RawParameters {
            value_min: 200,
            value_max: 100,
            ..RawParameters::default()
        };
        assert!(params.resolve(50).is_err());
    }

    #[test]
    fn test_round_trip_through_range() {
        let range = ColorRange::new([10, 20, 30], [40, 50, 60]).unwrap();
        let params = RawParameters::from_range(&range, DenoiseParameter::new(7));
        let (resolved, denoise) = params.resolve(50).unwrap();
        assert_eq!(resolved, range);
        assert_eq!(denoise.requested(), 7);
    }
}
