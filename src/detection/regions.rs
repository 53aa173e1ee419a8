//! Boundary extraction for connected regions of a mask
//!
//! Wraps the Suzuki-Abe border following in `imageproc`, which returns
//! both outer borders and hole borders together with their parent links.
//! The extraction order is the raster-scan order in which borders are
//! first met, and it is stable for a given mask.

use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::damage::Mask;

/// Whether a contour encloses a foreground region or a hole inside one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryKind {
    Outer,
    Hole,
}

/// Axis-aligned bounding rectangle in pixel coordinates (inclusive size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingRect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i32
            && y < self.y + self.height as i32
    }
}

/// Ordered boundary of one connected region
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
    pub kind: BoundaryKind,
    /// Index of the enclosing contour in the same extraction
    pub parent: Option<usize>,
}

impl Contour {
    pub fn is_outer(&self) -> bool {
        self.kind == BoundaryKind::Outer
    }

    /// Enclosed polygon area by the shoelace formula
    ///
    /// Boundary points are pixel centers, so a one-pixel-wide region has
    /// zero area.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    /// Smallest axis-aligned rectangle holding every boundary point
    pub fn bounding_rect(&self) -> Option<BoundingRect> {
        let first = self.points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingRect {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }
}

/// Extracts hierarchical region boundaries from masks
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionExtractor;

impl RegionExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Outer and hole borders of every foreground region, in extraction order
    ///
    /// An empty mask yields an empty vector.
    pub fn extract(&self, mask: &Mask) -> Vec<Contour> {
        if mask.is_empty() {
            return Vec::new();
        }

        let contours: Vec<Contour> = find_contours::<i32>(mask.as_gray())
            .into_iter()
            .map(|c| Contour {
                points: c.points,
                kind: match c.border_type {
                    BorderType::Outer => BoundaryKind::Outer,
                    BorderType::Hole => BoundaryKind::Hole,
                },
                parent: c.parent,
            })
            .collect();

        debug!(
            total = contours.len(),
            outer = contours.iter().filter(|c| c.is_outer()).count(),
            "extracted contours"
        );
        contours
    }
}
