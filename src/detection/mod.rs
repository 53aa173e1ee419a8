//! Damage classification and region extraction
//!
//! This module turns the working image into a binary damage mask and
//! traces the boundaries of the connected regions in that mask.

pub mod damage;
pub mod regions;

pub use damage::{DamageClassifier, DenoiseParameter, Mask};
pub use regions::{BoundaryKind, BoundingRect, Contour, RegionExtractor};
