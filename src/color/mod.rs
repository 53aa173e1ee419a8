//! Color space conversion and HSV range thresholding
//!
//! Damage and marker colors are bounded as contiguous ranges in HSV,
//! which is easier to tune by hand than raw RGB.

pub mod conversion;
pub mod range;

pub use conversion::{ColorConverter, HsvImage};
pub use range::{ColorRange, HsvColor};
