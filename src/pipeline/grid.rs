//! Grid detection: find ruled table lines and trace candidate cell regions.
//!
//! ## Algorithm
//!
//! ```text
//! gray ─▶ threshold_inv(150) ─┬─▶ open(1×15, ×2) ─┐
//!                             └─▶ open(15×1, ×2) ─┴─▶ blend 0.5/0.5 ─▶ contours
//! ```
//!
//! Every traced contour (outer borders and the hole borders nested inside
//! them) becomes a [`Region`]. Nothing here orders, deduplicates or validates
//! the regions: a table yields its outer frame, every cell interior, and
//! whatever noise survives the openings. The area filter is applied by
//! callers through [`passes_area_filter`].

use crate::config::ExtractionConfig;
use crate::error::Pdf2XlsxError;
use crate::pipeline::morphology::{blend_equal, open_rect, threshold_binary_inv};
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const OVERLAY_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);

/// Axis-aligned bounding box in pixels. `width`/`height` count both edge
/// pixels, so a single pixel is 1×1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Bounding box of a non-empty point set.
    fn of_points(points: &[imageproc::point::Point<u32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0 + 1,
            height: y1 - y0 + 1,
        })
    }
}

/// Whether a contour is the outside border of a blob or the border of a hole
/// inside one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContourKind {
    Outer,
    Hole,
}

/// One traced contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub bounds: BoundingBox,
    /// Polygon area enclosed by the traced border (shoelace formula).
    pub area: f64,
    pub kind: ContourKind,
    /// Index of the enclosing contour in the same detection, if any.
    pub parent: Option<usize>,
}

/// Result of [`detect_grid`].
#[derive(Debug, Clone)]
pub struct GridDetection {
    /// Every traced contour, unfiltered, in tracing order.
    pub regions: Vec<Region>,
    pub image_width: u32,
    pub image_height: u32,
    /// Where the debug overlay was written.
    pub overlay_path: PathBuf,
}

/// `true` if a contour of `area` counts as a candidate cell. Strict: a
/// contour of exactly `min_area` is noise.
pub fn passes_area_filter(area: f64, min_area: f64) -> bool {
    area > min_area
}

/// Detect the grid in the image at `image_path` and write the debug overlay
/// to [`ExtractionConfig::debug_overlay_path`].
pub fn detect_grid(
    image_path: &Path,
    config: &ExtractionConfig,
) -> Result<GridDetection, Pdf2XlsxError> {
    let gray = image::open(image_path)
        .map_err(|source| Pdf2XlsxError::ImageLoad {
            path: image_path.to_path_buf(),
            source,
        })?
        .to_luma8();

    let regions = detect_regions(&gray, config);
    let candidates = regions
        .iter()
        .filter(|r| passes_area_filter(r.area, config.min_contour_area))
        .count();
    info!(
        "Traced {} contours, {} above area {}",
        regions.len(),
        candidates,
        config.min_contour_area
    );

    let overlay_path = config.debug_overlay_path();
    draw_overlay(&gray, &regions, config.min_contour_area)
        .save_with_format(&overlay_path, ImageFormat::Png)
        .map_err(|source| Pdf2XlsxError::ImageWrite {
            path: overlay_path.clone(),
            source,
        })?;
    debug!("Saved debug overlay to {}", overlay_path.display());

    Ok(GridDetection {
        regions,
        image_width: gray.width(),
        image_height: gray.height(),
        overlay_path,
    })
}

/// Build the blended line mask for a grayscale page.
pub fn line_mask(gray: &GrayImage, config: &ExtractionConfig) -> GrayImage {
    let binary = threshold_binary_inv(gray, config.threshold);
    let vertical = open_rect(&binary, config.v_kernel, config.morph_iterations);
    let horizontal = open_rect(&binary, config.h_kernel, config.morph_iterations);
    blend_equal(&vertical, &horizontal)
}

/// Trace every contour of the line mask.
pub fn detect_regions(gray: &GrayImage, config: &ExtractionConfig) -> Vec<Region> {
    let mask = line_mask(gray, config);
    let contours: Vec<Contour<u32>> = find_contours(&mask);

    contours
        .iter()
        .filter_map(|c| {
            let bounds = BoundingBox::of_points(&c.points)?;
            Some(Region {
                bounds,
                area: polygon_area(&c.points),
                kind: match c.border_type {
                    BorderType::Outer => ContourKind::Outer,
                    BorderType::Hole => ContourKind::Hole,
                },
                parent: c.parent,
            })
        })
        .collect()
}

/// Colour copy of `gray` with every region above `min_area` outlined in
/// green, two pixels thick, from `(x, y)` to `(x + w, y + h)`.
pub fn draw_overlay(gray: &GrayImage, regions: &[Region], min_area: f64) -> RgbImage {
    let mut canvas = DynamicImage::ImageLuma8(gray.clone()).to_rgb8();
    for r in regions.iter().filter(|r| passes_area_filter(r.area, min_area)) {
        let b = r.bounds;
        let (x, y) = (b.x as i32, b.y as i32);
        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(x, y).of_size(b.width + 1, b.height + 1),
            OVERLAY_COLOUR,
        );
        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(x - 1, y - 1).of_size(b.width + 3, b.height + 3),
            OVERLAY_COLOUR,
        );
    }
    canvas
}

/// Shoelace area of the closed polygon through `points`.
fn polygon_area(points: &[imageproc::point::Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice: i64 = 0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    twice.abs() as f64 / 2.0
}
