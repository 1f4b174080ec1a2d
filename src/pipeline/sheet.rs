//! Sheet building: bucket cells into spreadsheet coordinates, merge
//! colliding cells, and write the workbook.
//!
//! ## Bucketing
//!
//! Pixel coordinates are quantized into fixed-size buckets:
//! `row = y / row_divisor + 1`, `col = x / col_divisor + 1` (1-based, like
//! spreadsheet coordinates). Cells are processed in `(y, x)` order and written
//! eagerly, so when several cells land in one bucket the last one wins until
//! the merge pass runs.
//!
//! ## Merging
//!
//! Every bucket that collected more than one cell whose x-coordinates spread
//! less than `merge_x_threshold` pixels becomes a horizontal merge starting at
//! the bucket's column and spanning one column per member. The span counts
//! members rather than looking at where they actually sit, so members that
//! are not x-contiguous can produce a merge wider than the text it holds.
//!
//! [`plan_sheet`] computes the final [`SheetLayout`] without touching the
//! file system; [`write_workbook`] serialises it with `umya-spreadsheet`.

use crate::config::ExtractionConfig;
use crate::error::Pdf2XlsxError;
use crate::output::Cell;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};
use umya_spreadsheet::Border;

/// A 1-based spreadsheet coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u32,
    pub col: u32,
}

/// A horizontal merge within one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRange {
    pub row: u32,
    pub first_col: u32,
    pub last_col: u32,
    /// Member texts joined by single spaces, in insertion order.
    pub text: String,
}

impl MergedRange {
    /// A1-style range, e.g. `"C4:E4"`.
    pub fn range_ref(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letter(self.first_col),
            self.row,
            column_letter(self.last_col),
            self.row
        )
    }

    fn overlaps(&self, other: &MergedRange) -> bool {
        self.row == other.row && self.first_col <= other.last_col && other.first_col <= self.last_col
    }
}

/// One written spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetCell {
    pub row: u32,
    pub col: u32,
    pub value: String,
}

/// Final workbook contents, ready to serialise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    /// Cell values in `(row, col)` order. Cells covered by a merge (other
    /// than its anchor) are absent.
    pub cells: Vec<SheetCell>,
    /// Cells carrying a thin border on all four sides, in `(row, col)` order.
    pub bordered: Vec<Position>,
    /// Merges in the order they were applied.
    pub merges: Vec<MergedRange>,
}

impl SheetLayout {
    /// Value at `(row, col)`, if one was written.
    pub fn value(&self, row: u32, col: u32) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.row == row && c.col == col)
            .map(|c| c.value.as_str())
    }
}

/// Quantize a pixel coordinate into a 1-based spreadsheet position.
pub fn bucket(x: u32, y: u32, row_divisor: u32, col_divisor: u32) -> Position {
    Position {
        row: y / row_divisor + 1,
        col: x / col_divisor + 1,
    }
}

/// Stable sort by `(y, x)`: equal keys keep their input order.
pub fn sort_cells(cells: &[Cell]) -> Vec<Cell> {
    let mut sorted = cells.to_vec();
    sorted.sort_by_key(|c| (c.y, c.x));
    sorted
}

/// Group sorted cells by bucket, in first-seen order.
pub fn group_cells(sorted: &[Cell], config: &ExtractionConfig) -> IndexMap<Position, Vec<Cell>> {
    let mut groups: IndexMap<Position, Vec<Cell>> = IndexMap::new();
    for cell in sorted {
        let pos = bucket(cell.x, cell.y, config.row_divisor, config.col_divisor);
        groups.entry(pos).or_default().push(cell.clone());
    }
    groups
}

/// `true` if a bucket's members should be merged horizontally.
pub fn should_merge(members: &[Cell], merge_x_threshold: u32) -> bool {
    if members.len() < 2 {
        return false;
    }
    let min = members.iter().map(|c| c.x).min().unwrap_or(0);
    let max = members.iter().map(|c| c.x).max().unwrap_or(0);
    max - min < merge_x_threshold
}

/// Compute the workbook contents for `cells` without writing anything.
pub fn plan_sheet(cells: &[Cell], config: &ExtractionConfig) -> SheetLayout {
    let sorted = sort_cells(cells);

    let mut values: BTreeMap<Position, String> = BTreeMap::new();
    let mut bordered: BTreeSet<Position> = BTreeSet::new();
    for cell in &sorted {
        let pos = bucket(cell.x, cell.y, config.row_divisor, config.col_divisor);
        debug!(
            "Placing text '{}' at cell ({}, {})",
            cell.text, pos.row, pos.col
        );
        values.insert(pos, cell.text.clone());
        bordered.insert(pos);
    }

    let mut merges: Vec<MergedRange> = Vec::new();
    for (pos, members) in group_cells(&sorted, config) {
        if !should_merge(&members, config.merge_x_threshold) {
            continue;
        }
        let merge = MergedRange {
            row: pos.row,
            first_col: pos.col,
            last_col: pos.col + members.len() as u32 - 1,
            text: members
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        };
        if let Some(prior) = merges.iter().find(|m| m.overlaps(&merge)) {
            warn!(
                "Skipping merge {} overlapping {}",
                merge.range_ref(),
                prior.range_ref()
            );
            continue;
        }

        info!(
            "Merging cells in row {} from column {} to {}",
            merge.row, merge.first_col, merge.last_col
        );
        for col in merge.first_col + 1..=merge.last_col {
            values.remove(&Position { row: merge.row, col });
        }
        values.insert(pos, merge.text.clone());
        merges.push(merge);
    }

    SheetLayout {
        cells: values
            .into_iter()
            .map(|(p, value)| SheetCell {
                row: p.row,
                col: p.col,
                value,
            })
            .collect(),
        bordered: bordered.into_iter().collect(),
        merges,
    }
}

/// Serialise `layout` as a single-sheet `.xlsx` workbook at `path`.
pub fn write_workbook(layout: &SheetLayout, path: &Path) -> Result<(), Pdf2XlsxError> {
    let write_failed = |detail: String| Pdf2XlsxError::WorkbookWrite {
        path: path.to_path_buf(),
        detail,
    };

    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_mut(&0)
        .ok_or_else(|| write_failed("new workbook has no sheet".to_string()))?;

    for pos in &layout.bordered {
        let borders = sheet.get_style_mut((pos.col, pos.row)).get_borders_mut();
        borders.get_left_mut().set_border_style(Border::BORDER_THIN);
        borders.get_right_mut().set_border_style(Border::BORDER_THIN);
        borders.get_top_mut().set_border_style(Border::BORDER_THIN);
        borders.get_bottom_mut().set_border_style(Border::BORDER_THIN);
    }
    for cell in &layout.cells {
        sheet
            .get_cell_mut((cell.col, cell.row))
            .set_value_string(cell.value.clone());
    }
    for merge in &layout.merges {
        sheet.add_merge_cells(merge.range_ref());
    }

    umya_spreadsheet::writer::xlsx::write(&book, path).map_err(|e| write_failed(e.to_string()))
}

/// Plan the sheet for `cells` and write it to
/// [`ExtractionConfig::workbook_path`].
pub fn build_sheet(cells: &[Cell], config: &ExtractionConfig) -> Result<SheetLayout, Pdf2XlsxError> {
    let layout = plan_sheet(cells, config);
    let path = config.workbook_path();
    write_workbook(&layout, &path)?;
    info!(
        "Wrote {} cells, {} merges to {}",
        layout.cells.len(),
        layout.merges.len(),
        path.display()
    );
    Ok(layout)
}

/// Spreadsheet column letters for a 1-based column index (`1` → `A`,
/// `27` → `AA`).
pub fn column_letter(mut col: u32) -> String {
    let mut letters = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        letters.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    #[test]
    fn bucket_uses_fixed_divisors() {
        assert_eq!(bucket(0, 0, 20, 50), Position { row: 1, col: 1 });
        assert_eq!(bucket(49, 19, 20, 50), Position { row: 1, col: 1 });
        assert_eq!(bucket(50, 20, 20, 50), Position { row: 2, col: 2 });
        assert_eq!(bucket(1234, 567, 20, 50), Position { row: 29, col: 25 });
        for (x, y) in [(7, 3), (510, 999), (0, 40)] {
            assert_eq!(bucket(x, y, 20, 50), bucket(x, y, 20, 50));
            assert_eq!(bucket(x, y, 20, 50), Position { row: y / 20 + 1, col: x / 50 + 1 });
        }
    }

    #[test]
    fn merge_threshold_is_strict() {
        let spread_49 = [Cell::new(100, 0, "a"), Cell::new(149, 0, "b")];
        let spread_50 = [Cell::new(100, 0, "a"), Cell::new(150, 0, "b")];
        assert!(should_merge(&spread_49, 50));
        assert!(!should_merge(&spread_50, 50));
        assert!(!should_merge(&spread_49[..1], 50));
    }

    #[test]
    fn spread_of_fifty_in_one_bucket_does_not_merge() {
        // Wider columns so both cells share a bucket.
        let config = ExtractionConfig::builder().col_divisor(100).build().unwrap();
        let layout = plan_sheet(&[Cell::new(0, 0, "a"), Cell::new(50, 0, "b")], &config);
        assert!(layout.merges.is_empty());
        assert_eq!(layout.value(1, 1), Some("b"));

        let layout = plan_sheet(&[Cell::new(0, 0, "a"), Cell::new(49, 0, "b")], &config);
        assert_eq!(layout.merges.len(), 1);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let cells = [
            Cell::new(10, 10, "first"),
            Cell::new(0, 0, "origin"),
            Cell::new(10, 10, "second"),
            Cell::new(10, 10, "third"),
        ];
        let texts: Vec<_> = sort_cells(&cells).into_iter().map(|c| c.text).collect();
        assert_eq!(texts, ["origin", "first", "second", "third"]);
    }

    #[test]
    fn adjacent_boxes_merge_into_one_cell() {
        let cells = [Cell::new(40, 0, "Total"), Cell::new(0, 0, "Grand")];
        let layout = plan_sheet(&cells, &cfg());

        assert_eq!(
            layout.merges,
            vec![MergedRange {
                row: 1,
                first_col: 1,
                last_col: 2,
                text: "Grand Total".into()
            }]
        );
        assert_eq!(layout.merges[0].range_ref(), "A1:B1");
        assert_eq!(layout.value(1, 1), Some("Grand Total"));
        assert_eq!(layout.value(1, 2), None);
    }

    #[test]
    fn empty_text_participates_in_merge() {
        let cells = [Cell::new(0, 0, ""), Cell::new(30, 5, "Rs.")];
        let layout = plan_sheet(&cells, &cfg());
        assert_eq!(layout.merges.len(), 1);
        assert_eq!(layout.merges[0].text, " Rs.");
        assert_eq!(layout.bordered, vec![Position { row: 1, col: 1 }]);
    }

    #[test]
    fn span_counts_members() {
        let cells = [
            Cell::new(0, 0, "a"),
            Cell::new(10, 0, "b"),
            Cell::new(20, 0, "c"),
        ];
        let layout = plan_sheet(&cells, &cfg());
        assert_eq!(layout.merges[0].range_ref(), "A1:C1");
        assert_eq!(layout.merges[0].text, "a b c");
    }

    #[test]
    fn merged_text_follows_sorted_insertion_order() {
        // y decides before x, so the lower-left cell comes second.
        let cells = [Cell::new(5, 12, "left"), Cell::new(30, 2, "right")];
        let layout = plan_sheet(&cells, &cfg());
        assert_eq!(layout.merges[0].text, "right left");
    }

    #[test]
    fn single_cells_do_not_merge() {
        let cells = [Cell::new(0, 0, "a"), Cell::new(60, 0, "b"), Cell::new(0, 25, "c")];
        let layout = plan_sheet(&cells, &cfg());
        assert!(layout.merges.is_empty());
        assert_eq!(layout.value(1, 1), Some("a"));
        assert_eq!(layout.value(1, 2), Some("b"));
        assert_eq!(layout.value(2, 1), Some("c"));
        assert_eq!(layout.bordered.len(), 3);
    }

    #[test]
    fn merge_clears_covered_cells() {
        let cells = [
            Cell::new(0, 0, "a"),
            Cell::new(10, 0, "b"),
            Cell::new(60, 0, "covered"),
        ];
        let layout = plan_sheet(&cells, &cfg());
        assert_eq!(layout.merges[0].range_ref(), "A1:B1");
        assert_eq!(layout.value(1, 2), None);
        // The covered cell keeps its border.
        assert!(layout.bordered.contains(&Position { row: 1, col: 2 }));
    }

    #[test]
    fn overlapping_merge_is_skipped() {
        let cells = [
            Cell::new(0, 0, "a"),
            Cell::new(10, 0, "b"),
            Cell::new(20, 0, "c"),
            Cell::new(60, 0, "d"),
            Cell::new(70, 0, "e"),
        ];
        let layout = plan_sheet(&cells, &cfg());
        assert_eq!(layout.merges.len(), 1);
        assert_eq!(layout.merges[0].range_ref(), "A1:C1");
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let sorted = sort_cells(&[Cell::new(120, 0, "x"), Cell::new(0, 5, "y")]);
        let groups = group_cells(&sorted, &cfg());
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(
            keys,
            [Position { row: 1, col: 3 }, Position { row: 1, col: 1 }]
        );
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn build_sheet_writes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExtractionConfig::builder().output_dir(dir.path()).build().unwrap();
        let layout = build_sheet(&[Cell::new(0, 0, "a"), Cell::new(40, 0, "b")], &config).unwrap();
        assert_eq!(layout.merges.len(), 1);
        assert!(config.workbook_path().exists());
    }

    #[test]
    fn build_sheet_reports_unwritable_path() {
        let config = ExtractionConfig::builder()
            .output_dir("/definitely/not/a/dir")
            .build()
            .unwrap();
        let err = build_sheet(&[Cell::new(0, 0, "a")], &config).unwrap_err();
        assert!(matches!(err, Pdf2XlsxError::WorkbookWrite { .. }));
    }
}
