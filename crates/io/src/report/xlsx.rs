// Side-by-side XLSX report: source1 columns left, source2 columns right

use std::path::Path;

use dbrecon_recon::{MergedDataset, MergedRecord, Presence, Side, Value};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use super::ReportContext;
use crate::error::ReportError;

pub const SHEET_NAME: &str = "Side by Side Comparison";

const TITLE_FILL: u32 = 0x366092;
const HEADER_FILL: u32 = 0x4472C4;
const DIFF_FILL: u32 = 0xFFEB9C;
const MATCH_FILL: u32 = 0xC6EFCE;
const MISSING_FILL: u32 = 0xFFC7CE;
const KEY_FILL: u32 = 0xFFFFFF;
const DIVIDER_FILL: u32 = 0xD3D3D3;

const DIVIDER: &str = "||";
const MAX_WIDTH: usize = 50;
const EMPTY_WIDTH: f64 = 10.0;
const DIVIDER_WIDTH: f64 = 3.0;

/// How join keys are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// One shared "Keys" section on the far left.
    KeysOnce,
    /// Keys repeated inside each source section under their original names.
    KeysBothSides,
    /// Like `KeysBothSides`, plus the untransformed source column before each renamed key.
    KeysWithOriginals,
}

impl LayoutMode {
    /// Original columns only make sense when keys repeat per side.
    pub fn from_flags(both_sides: bool, show_transformed: bool) -> Self {
        match (both_sides, show_transformed) {
            (false, _) => Self::KeysOnce,
            (true, false) => Self::KeysBothSides,
            (true, true) => Self::KeysWithOriginals,
        }
    }
}

// ---------------------------------------------------------------------------
// Column plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Key,
    /// Position in `MergedDataset::compared_fields`.
    Compared(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedColumn {
    header: String,
    /// Merged column holding the value; `None` renders blank.
    source: Option<usize>,
    kind: CellKind,
}

#[derive(Debug, Default)]
struct Plan {
    keys: Vec<PlannedColumn>,
    left: Vec<PlannedColumn>,
    right: Vec<PlannedColumn>,
}

impl Plan {
    fn build(ctx: &ReportContext<'_>, mode: LayoutMode) -> Self {
        let merged = &ctx.comparison.merged;
        let original = &ctx.comparison.original_keys;
        let key_column = |name: &str, header: &str| PlannedColumn {
            header: header.to_string(),
            source: merged.column_index(name),
            kind: CellKind::Key,
        };

        let mut plan = Plan::default();
        for side in [Side::Source1, Side::Source2] {
            let mut columns = Vec::new();
            for key in &merged.key_columns {
                match mode {
                    LayoutMode::KeysOnce => {
                        if side == Side::Source1 {
                            plan.keys.push(key_column(key, key));
                        }
                    }
                    LayoutMode::KeysBothSides => {
                        columns.push(key_column(key, original.get(side, key)));
                    }
                    LayoutMode::KeysWithOriginals => {
                        let orig = original.get(side, key);
                        if original.is_renamed(side, key) {
                            if let Some(idx) = merged.field_index(orig, side) {
                                columns.push(PlannedColumn {
                                    header: orig.to_string(),
                                    source: Some(idx),
                                    kind: CellKind::Key,
                                });
                            }
                        }
                        columns.push(key_column(key, key));
                    }
                }
            }

            for (pos, field) in merged.compared_fields.iter().enumerate() {
                let header = match side {
                    Side::Source1 => ctx
                        .options
                        .column_mapping
                        .iter()
                        .find(|(_, to)| *to == field)
                        .map_or(field.as_str(), |(from, _)| from.as_str()),
                    Side::Source2 => field.as_str(),
                };
                columns.push(PlannedColumn {
                    header: header.to_string(),
                    source: merged.field_index(field, side),
                    kind: CellKind::Compared(pos),
                });
            }

            match side {
                Side::Source1 => plan.left = columns,
                Side::Source2 => plan.right = columns,
            }
        }
        plan
    }

    fn left_start(&self) -> u16 {
        self.keys.len() as u16
    }

    fn divider_col(&self) -> u16 {
        self.left_start() + self.left.len() as u16
    }

    fn right_start(&self) -> u16 {
        self.divider_col() + 1
    }

    fn status_col(&self) -> u16 {
        self.right_start() + self.right.len() as u16
    }
}

/// Fill for a compared cell on `side`: rows without a counterpart are flagged
/// on the side that has them and left white on the other.
fn compared_fill(presence: Presence, side: Side, matched: bool) -> u32 {
    match presence {
        Presence::InBoth if matched => MATCH_FILL,
        Presence::InBoth => DIFF_FILL,
        p if p.has(side) => MISSING_FILL,
        _ => KEY_FILL,
    }
}

fn status(record: &MergedRecord) -> (&'static str, u32) {
    match record.presence {
        Presence::OnlyInSource1 => ("Only in Source1", MISSING_FILL),
        Presence::OnlyInSource2 => ("Only in Source2", MISSING_FILL),
        Presence::InBoth if record.is_equal => ("Match", MATCH_FILL),
        Presence::InBoth => ("Difference", DIFF_FILL),
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

fn title_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_font_size(12.0)
        .set_background_color(Color::RGB(TITLE_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_font_size(11.0)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
}

fn divider_format(bold: bool) -> Format {
    let format = Format::new()
        .set_background_color(Color::RGB(DIVIDER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    if bold {
        format.set_bold().set_font_size(11.0)
    } else {
        format
    }
}

fn cell_format(fill: u32, align: FormatAlign) -> Format {
    Format::new()
        .set_background_color(Color::RGB(fill))
        .set_align(align)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin)
}

/// Tracks the widest rendered text per column while writing.
struct SheetWriter<'a> {
    sheet: &'a mut Worksheet,
    widths: Vec<usize>,
}

impl<'a> SheetWriter<'a> {
    fn new(sheet: &'a mut Worksheet, columns: usize) -> Self {
        Self {
            sheet,
            widths: vec![0; columns],
        }
    }

    fn track(&mut self, col: u16, text: &str) {
        if let Some(w) = self.widths.get_mut(col as usize) {
            *w = (*w).max(text.chars().count());
        }
    }

    fn text(&mut self, row: u32, col: u16, text: &str, format: &Format) -> Result<(), XlsxError> {
        self.sheet.write_string_with_format(row, col, text, format)?;
        self.track(col, text);
        Ok(())
    }

    /// Section title spanning `width` columns from `first`. Only the anchor counts toward width.
    fn title(&mut self, first: u16, width: usize, text: &str, format: &Format) -> Result<(), XlsxError> {
        match width {
            0 => return Ok(()),
            1 => {
                self.sheet.write_string_with_format(0, first, text, format)?;
            }
            n => {
                let last = first + n as u16 - 1;
                self.sheet.merge_range(0, first, 0, last, text, format)?;
            }
        }
        self.track(first, text);
        Ok(())
    }

    fn value(&mut self, row: u32, col: u16, value: Option<&Value>, format: &Format) -> Result<(), XlsxError> {
        match value {
            None | Some(Value::Null) => {
                self.sheet.write_blank(row, col, format)?;
                return Ok(());
            }
            Some(Value::Int(i)) => {
                self.sheet.write_number_with_format(row, col, *i as f64, format)?;
            }
            Some(Value::Float(f)) => {
                self.sheet.write_number_with_format(row, col, *f, format)?;
            }
            Some(Value::Bool(b)) => {
                self.sheet.write_boolean_with_format(row, col, *b, format)?;
            }
            Some(Value::Text(s)) => {
                self.sheet.write_string_with_format(row, col, s, format)?;
            }
        }
        if let Some(v) = value {
            self.track(col, &v.to_string());
        }
        Ok(())
    }

    fn fit_columns(&mut self, divider: u16) -> Result<(), XlsxError> {
        for (col, &max_len) in self.widths.iter().enumerate() {
            let width = if max_len > 0 {
                (max_len + 2).min(MAX_WIDTH) as f64
            } else {
                EMPTY_WIDTH
            };
            self.sheet.set_column_width(col as u16, width)?;
        }
        self.sheet.set_column_width(divider, DIVIDER_WIDTH)?;
        Ok(())
    }
}

/// Write the side-by-side workbook for one job.
pub fn write_side_by_side(path: &Path, ctx: &ReportContext<'_>, mode: LayoutMode) -> Result<(), ReportError> {
    let xlsx_err = |source| ReportError::Xlsx {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = Workbook::new();
    build_sheet(workbook.add_worksheet(), ctx, mode).map_err(xlsx_err)?;
    workbook.save(path).map_err(xlsx_err)
}

fn build_sheet(sheet: &mut Worksheet, ctx: &ReportContext<'_>, mode: LayoutMode) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_NAME)?;
    let merged: &MergedDataset = &ctx.comparison.merged;
    let plan = Plan::build(ctx, mode);
    let divider = plan.divider_col();
    let status_col = plan.status_col();
    let mut w = SheetWriter::new(sheet, status_col as usize + 1);

    // Row 1: section titles
    let title = title_format();
    w.title(0, plan.keys.len(), "Keys", &title)?;
    w.title(plan.left_start(), plan.left.len(), &ctx.source1.name.to_uppercase(), &title)?;
    w.text(0, divider, DIVIDER, &divider_format(true))?;
    w.title(plan.right_start(), plan.right.len(), &ctx.source2.name.to_uppercase(), &title)?;
    w.text(0, status_col, "Status", &title)?;

    // Row 2: column headers
    let header = header_format();
    let sections = [
        (0, &plan.keys),
        (plan.left_start(), &plan.left),
        (plan.right_start(), &plan.right),
    ];
    for (start, columns) in sections {
        for (i, column) in columns.iter().enumerate() {
            w.text(1, start + i as u16, &column.header, &header)?;
        }
    }
    w.text(1, divider, DIVIDER, &divider_format(true))?;
    w.text(1, status_col, "Match Status", &header)?;

    // Data from row 3
    let key_format = cell_format(KEY_FILL, FormatAlign::Left);
    let data_divider = divider_format(false);
    for (i, record) in merged.records.iter().enumerate() {
        let row = 2 + i as u32;
        let sides = [
            (0, &plan.keys, Side::Source1),
            (plan.left_start(), &plan.left, Side::Source1),
            (plan.right_start(), &plan.right, Side::Source2),
        ];
        for (start, columns, side) in sides {
            for (j, column) in columns.iter().enumerate() {
                let value = column.source.map(|idx| &record.values[idx]);
                let col = start + j as u16;
                match column.kind {
                    CellKind::Key => w.value(row, col, value, &key_format)?,
                    CellKind::Compared(pos) => {
                        let matched = record.field_matches.get(pos).copied().unwrap_or(false);
                        let fill = compared_fill(record.presence, side, matched);
                        w.value(row, col, value, &cell_format(fill, FormatAlign::Left))?;
                    }
                }
            }
        }
        w.text(row, divider, DIVIDER, &data_divider)?;
        let (label, fill) = status(record);
        w.text(row, status_col, label, &cell_format(fill, FormatAlign::Center))?;
    }

    w.fit_columns(divider)?;
    w.sheet.set_freeze_panes(2, 0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbrecon_config::{Backend, ResolvedSource};
    use dbrecon_recon::{compare, CompareOptions, Comparison, Dataset, JoinKeySpec, Transform};

    fn resolved(name: &str) -> ResolvedSource {
        ResolvedSource {
            name: name.into(),
            backend: Backend::Csv {
                path: format!("{name}.csv").into(),
                delimiter: None,
            },
        }
    }

    fn transformed() -> (Comparison, CompareOptions) {
        let s1 = Dataset::from_rows(
            ["legacy_id", "AMT"],
            vec![vec!["1001".into(), 50.into()], vec!["1002".into(), 7.into()]],
        )
        .unwrap();
        let s2 = Dataset::from_rows(
            ["ext_id", "amount"],
            vec![vec!["ext-1001".into(), 51.into()], vec!["ext-1003".into(), 1.into()]],
        )
        .unwrap();
        let key = JoinKeySpec::new("id")
            .source1("legacy_id", Some(Transform::ToInt))
            .source2("ext_id", Some(Transform::RemovePrefixAndInt));
        let mut opts = CompareOptions::new(vec![key]);
        opts.column_mapping.insert("AMT".into(), "amount".into());
        (compare(s1, s2, &opts).unwrap(), opts)
    }

    fn headers(columns: &[PlannedColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.header.as_str()).collect()
    }

    #[test]
    fn keys_once_layout() {
        let (comparison, opts) = transformed();
        let (s1, s2) = (resolved("legacy"), resolved("modern"));
        let ctx = ReportContext { comparison: &comparison, options: &opts, source1: &s1, source2: &s2 };
        let plan = Plan::build(&ctx, LayoutMode::KeysOnce);

        assert_eq!(headers(&plan.keys), ["id"]);
        assert_eq!(headers(&plan.left), ["AMT"]);
        assert_eq!(headers(&plan.right), ["amount"]);
        assert_eq!(plan.divider_col(), 2);
        assert_eq!(plan.status_col(), 4);
    }

    #[test]
    fn keys_both_sides_use_original_names() {
        let (comparison, opts) = transformed();
        let (s1, s2) = (resolved("legacy"), resolved("modern"));
        let ctx = ReportContext { comparison: &comparison, options: &opts, source1: &s1, source2: &s2 };
        let plan = Plan::build(&ctx, LayoutMode::KeysBothSides);

        assert!(plan.keys.is_empty());
        assert_eq!(headers(&plan.left), ["legacy_id", "AMT"]);
        assert_eq!(headers(&plan.right), ["ext_id", "amount"]);
        assert_eq!(plan.left[0].source, comparison.merged.column_index("id"));
    }

    #[test]
    fn originals_precede_transformed_keys() {
        let (comparison, opts) = transformed();
        let (s1, s2) = (resolved("legacy"), resolved("modern"));
        let ctx = ReportContext { comparison: &comparison, options: &opts, source1: &s1, source2: &s2 };
        let plan = Plan::build(&ctx, LayoutMode::KeysWithOriginals);

        assert_eq!(headers(&plan.left), ["legacy_id", "id", "AMT"]);
        assert_eq!(headers(&plan.right), ["ext_id", "id", "amount"]);
        assert_eq!(plan.right[0].source, comparison.merged.field_index("ext_id", Side::Source2));
    }

    #[test]
    fn layout_flags() {
        assert_eq!(LayoutMode::from_flags(false, true), LayoutMode::KeysOnce);
        assert_eq!(LayoutMode::from_flags(true, false), LayoutMode::KeysBothSides);
        assert_eq!(LayoutMode::from_flags(true, true), LayoutMode::KeysWithOriginals);
    }

    #[test]
    fn fills_follow_presence_and_match() {
        assert_eq!(compared_fill(Presence::InBoth, Side::Source1, true), MATCH_FILL);
        assert_eq!(compared_fill(Presence::InBoth, Side::Source2, false), DIFF_FILL);
        assert_eq!(compared_fill(Presence::OnlyInSource1, Side::Source1, false), MISSING_FILL);
        assert_eq!(compared_fill(Presence::OnlyInSource1, Side::Source2, false), KEY_FILL);
        assert_eq!(compared_fill(Presence::OnlyInSource2, Side::Source2, false), MISSING_FILL);
    }
}
