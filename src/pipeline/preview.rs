//! Preview table: a fixed-size grid of recognized texts rendered to PNG.
//!
//! The preview is display-only and unrelated to the bucketed workbook: it
//! slices the cells in extractor order into rows of `preview_cols`, pads
//! short rows with empty strings, and drops everything past
//! `preview_rows × preview_cols`.

use crate::config::ExtractionConfig;
use crate::error::Pdf2XlsxError;
use crate::output::Cell;
use ab_glyph::{FontVec, PxScale};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CELL_WIDTH: u32 = 120;
const CELL_HEIGHT: u32 = 36;
const MARGIN: u32 = 24;
const TEXT_PADDING: u32 = 4;
const FONT_PX: f32 = 20.0;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Fonts probed when no preview font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Slice `cells` into a `rows × cols` grid of texts.
///
/// Never fails: missing entries are `""`, extra cells are dropped.
pub fn build_preview_grid(cells: &[Cell], rows: usize, cols: usize) -> Vec<Vec<String>> {
    (0..rows)
        .map(|r| {
            let mut row: Vec<String> = cells
                .iter()
                .skip(r * cols)
                .take(cols)
                .map(|c| c.text.clone())
                .collect();
            row.resize(cols, String::new());
            row
        })
        .collect()
}

/// Draw `grid` as a bordered table. With `font == None` only the borders are
/// drawn.
pub fn render_preview(grid: &[Vec<String>], font: Option<&FontVec>) -> RgbImage {
    let rows = grid.len() as u32;
    let cols = grid.iter().map(Vec::len).max().unwrap_or(0) as u32;
    let mut canvas = RgbImage::from_pixel(
        2 * MARGIN + cols * CELL_WIDTH + 1,
        2 * MARGIN + rows * CELL_HEIGHT + 1,
        WHITE,
    );
    let scale = PxScale::from(FONT_PX);

    for (r, row) in grid.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            let x = MARGIN + c as u32 * CELL_WIDTH;
            let y = MARGIN + r as u32 * CELL_HEIGHT;
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(x as i32, y as i32).of_size(CELL_WIDTH + 1, CELL_HEIGHT + 1),
                BLACK,
            );

            let Some(font) = font else { continue };
            if text.is_empty() {
                continue;
            }
            let line = text.replace(['\n', '\r'], " ");
            let (tw, th) = text_size(scale, font, &line);
            let tx = if tw + 2 * TEXT_PADDING <= CELL_WIDTH {
                x + (CELL_WIDTH - tw) / 2
            } else {
                x + TEXT_PADDING
            };
            let ty = y + CELL_HEIGHT.saturating_sub(th) / 2;
            draw_text_mut(&mut canvas, BLACK, tx as i32, ty as i32, scale, font, &line);
        }
    }
    canvas
}

/// Load the preview font: the configured one (must load), else the first
/// readable well-known system font, else `None`.
pub fn load_font(configured: Option<&Path>) -> Result<Option<FontVec>, Pdf2XlsxError> {
    if let Some(path) = configured {
        return read_font(path).map(Some);
    }
    for candidate in SYSTEM_FONTS {
        let path = PathBuf::from(candidate);
        if !path.exists() {
            continue;
        }
        match read_font(&path) {
            Ok(font) => {
                debug!("Preview font: {}", path.display());
                return Ok(Some(font));
            }
            Err(e) => debug!("Skipping font candidate: {}", e),
        }
    }
    Ok(None)
}

fn read_font(path: &Path) -> Result<FontVec, Pdf2XlsxError> {
    let bytes = std::fs::read(path).map_err(|e| Pdf2XlsxError::FontLoad {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    FontVec::try_from_vec(bytes).map_err(|e| Pdf2XlsxError::FontLoad {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Build, render and save the preview to [`ExtractionConfig::preview_path`].
pub fn write_preview(
    cells: &[Cell],
    config: &ExtractionConfig,
) -> Result<Vec<Vec<String>>, Pdf2XlsxError> {
    let grid = build_preview_grid(cells, config.preview_rows, config.preview_cols);

    let font = load_font(config.preview_font.as_deref())?;
    if font.is_none() {
        warn!("No preview font found; rendering the preview grid without text. Pass --font to fix.");
    }

    let path = config.preview_path();
    render_preview(&grid, font.as_ref())
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|source| Pdf2XlsxError::ImageWrite {
            path: path.clone(),
            source,
        })?;
    info!(
        "Saved {}×{} preview to {}",
        config.preview_rows,
        config.preview_cols,
        path.display()
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<Cell> {
        (0..n).map(|i| Cell::new(i as u32, 0, i.to_string())).collect()
    }

    #[test]
    fn short_input_is_padded() {
        let grid = build_preview_grid(&numbered(5), 7, 20);
        assert_eq!(grid.len(), 7);
        assert!(grid.iter().all(|r| r.len() == 20));
        assert_eq!(&grid[0][..5], ["0", "1", "2", "3", "4"]);
        assert!(grid[0][5..].iter().all(String::is_empty));
        assert!(grid[1..].iter().flatten().all(String::is_empty));
    }

    #[test]
    fn empty_input_is_all_blank() {
        let grid = build_preview_grid(&[], 7, 20);
        assert_eq!(grid, vec![vec![String::new(); 20]; 7]);
    }

    #[test]
    fn cells_past_capacity_are_dropped() {
        let grid = build_preview_grid(&numbered(150), 7, 20);
        assert_eq!(grid[6][19], "139");
        assert!(!grid.iter().flatten().any(|t| t == "140"));
    }

    #[test]
    fn rows_wrap_every_twenty_cells() {
        let grid = build_preview_grid(&numbered(25), 7, 20);
        assert_eq!(grid[1][0], "20");
        assert_eq!(grid[1][4], "24");
        assert_eq!(grid[1][5], "");
    }

    #[test]
    fn grid_keeps_extractor_order() {
        let cells = [Cell::new(300, 80, "late"), Cell::new(0, 0, "early")];
        let grid = build_preview_grid(&cells, 7, 20);
        assert_eq!(&grid[0][..2], ["late", "early"]);
    }

    #[test]
    fn render_without_font_draws_borders() {
        let grid = build_preview_grid(&numbered(3), 7, 20);
        let img = render_preview(&grid, None);
        assert_eq!(
            img.dimensions(),
            (2 * MARGIN + 20 * CELL_WIDTH + 1, 2 * MARGIN + 7 * CELL_HEIGHT + 1)
        );
        assert_eq!(*img.get_pixel(MARGIN, MARGIN), BLACK);
        assert_eq!(*img.get_pixel(MARGIN + CELL_WIDTH / 2, MARGIN + CELL_HEIGHT / 2), WHITE);
        assert_eq!(*img.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn configured_font_must_load() {
        let err = load_font(Some(Path::new("/no/such/font.ttf"))).unwrap_err();
        assert!(matches!(err, Pdf2XlsxError::FontLoad { .. }));

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut garbage, b"not a font").unwrap();
        assert!(load_font(Some(garbage.path())).is_err());
    }

    #[test]
    fn write_preview_saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractionConfig::builder().output_dir(dir.path()).build().unwrap();
        let grid = write_preview(&numbered(4), &config).unwrap();
        assert_eq!(grid[0][3], "3");
        let saved = image::open(config.preview_path()).unwrap();
        assert_eq!(saved.width(), 2 * MARGIN + 20 * CELL_WIDTH + 1);
    }
}
