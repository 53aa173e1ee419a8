//! Annotated frame rendering
//!
//! Detected regions are filled on a copy of the working image and blended
//! back over it, so damage stays visible without hiding the crop beneath.
//! Text annotations are kept on the frame as strings and, when a font is
//! configured, rasterized onto the pixels as well.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_polygon_mut, draw_text_mut};
use imageproc::point::Point;
use std::fmt;
use std::path::Path;

use crate::color::ColorRange;
use crate::config::OverlayConfig;
use crate::constants::{area, overlay};
use crate::detection::Contour;
use crate::image_loader::Image;
use crate::{Result, ScanError};

/// One line of text placed on a frame (`y` is the baseline)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

/// Rendered frame plus the text drawn onto it
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedFrame {
    pub image: RgbImage,
    pub annotations: Vec<Annotation>,
}

impl AnnotatedFrame {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.annotations.iter().map(|a| a.text.as_str())
    }
}

/// Area line shown on every frame
pub fn area_label(area: f64) -> String {
    format!("Damage = {:.2}{}", area, area::UNIT)
}

/// Draws contour overlays and annotations
pub struct FrameRenderer {
    alpha: f32,
    fill_color: Rgb<u8>,
    text_color: Rgb<u8>,
    font: Option<FontVec>,
    scale: PxScale,
}

impl fmt::Debug for FrameRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRenderer")
            .field("alpha", &self.alpha)
            .field("fill_color", &self.fill_color)
            .field("text_color", &self.text_color)
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRenderer {
    /// Renderer with default colors, alpha 0.6 and no font
    pub fn new() -> Self {
        Self {
            alpha: overlay::ALPHA,
            fill_color: Rgb(overlay::FILL_COLOR),
            text_color: Rgb(overlay::TEXT_COLOR),
            font: None,
            scale: PxScale::from(overlay::FONT_SCALE),
        }
    }

    /// Renderer from configuration, loading the font if one is set
    pub fn from_config(config: &OverlayConfig) -> Result<Self> {
        let mut renderer = Self {
            alpha: config.alpha.clamp(0.0, 1.0),
            fill_color: Rgb(config.fill_color),
            text_color: Rgb(config.text_color),
            font: None,
            scale: PxScale::from(config.font_scale),
        };
        if let Some(path) = &config.font_path {
            renderer = renderer.with_font_file(path)?;
        }
        Ok(renderer)
    }

    /// Load a TrueType/OpenType font for rasterized annotations
    pub fn with_font_file(mut self, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| ScanError::config(format!("Failed to read font {}", path.display()), e))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| ScanError::config(format!("Invalid font {}", path.display()), e))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Frame for one refinement tick: translucent contour fills and the area line
    pub fn render(&self, base: &Image, contours: &[Contour], area: f64) -> AnnotatedFrame {
        let source = base.as_rgb();
        let mut filled = source.clone();
        for contour in contours {
            fill_contour(&mut filled, contour, self.fill_color);
        }

        let mut frame = AnnotatedFrame {
            image: self.blend(source, &filled),
            annotations: Vec::new(),
        };
        self.annotate(&mut frame, area_label(area), overlay::AREA_LINE_Y);
        frame
    }

    /// Add the six bound values used for a committed result
    pub fn annotate_commit(&self, frame: &mut AnnotatedFrame, range: &ColorRange) {
        for (line, y) in range.bound_lines().into_iter().zip(overlay::BOUND_LINES_Y) {
            self.annotate(frame, line, y);
        }
    }

    fn annotate(&self, frame: &mut AnnotatedFrame, text: String, y: i32) {
        if let Some(font) = &self.font {
            let top = (y - self.scale.y as i32).max(0);
            draw_text_mut(
                &mut frame.image,
                self.text_color,
                overlay::TEXT_X,
                top,
                self.scale,
                font,
                &text,
            );
        }
        frame.annotations.push(Annotation {
            text,
            x: overlay::TEXT_X,
            y,
        });
    }

    /// `alpha * base + (1 - alpha) * filled`, per channel
    fn blend(&self, base: &RgbImage, filled: &RgbImage) -> RgbImage {
        let mut out = base.clone();
        let beta = 1.0 - self.alpha;
        for (dst, src) in out.pixels_mut().zip(filled.pixels()) {
            if *dst == *src {
                continue;
            }
            for c in 0..3 {
                let v = self.alpha * dst[c] as f32 + beta * src[c] as f32;
                dst[c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
        out
    }
}

/// Fill the polygon bounded by a contour, boundary included
fn fill_contour(canvas: &mut RgbImage, contour: &Contour, color: Rgb<u8>) {
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(contour.points.len());
    for p in &contour.points {
        if polygon.last() != Some(p) {
            polygon.push(*p);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() >= 3 {
        draw_polygon_mut(canvas, &polygon, color);
    }

    let (w, h) = canvas.dimensions();
    for p in &contour.points {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < w && (p.y as u32) < h {
            canvas.put_pixel(p.x as u32, p.y as u32, color);
        }
    }
}
