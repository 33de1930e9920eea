//! Copies `data.json` into the dashboard workbook and the inline HTML payload.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info};
use serde_json::Value;
use thiserror::Error;

use crate::config::ProjectLayout;
use crate::data::{Block, DashboardData};
use crate::workbook::{CellRef, CellValue, SheetMut, Workbook, WorkbookError};

pub const OVERVIEW_SHEET: &str = "Overview";

/// Overview rows for each summary card title (1-based).
pub const SUMMARY_ROWS: &[(&str, u32)] = &[("Sweden", 5), ("China", 6)];

/// Rows of a country sheet whose column A holds indicator labels (1-based).
pub const LABEL_ROWS: std::ops::RangeInclusive<u32> = 5..=12;

pub const INLINE_START: &str = r#"<script type="application/json" id="inline-data">"#;
pub const INLINE_END: &str = "</script>";

const COL_A: u16 = 0;
const COL_B: u16 = 1;
const COL_C: u16 = 2;
const COL_D: u16 = 3;
const COL_E: u16 = 4;
const COL_F: u16 = 5;
const COL_G: u16 = 6;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Missing {0}")]
    MissingInput(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dashboard data in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Workbook(#[from] WorkbookError),

    #[error("failed to encode inline data: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("inline data block in {0} has no closing </script> tag")]
    UnterminatedInlineData(PathBuf),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Files touched by a dashboard update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePaths {
    pub data_json: PathBuf,
    pub workbook: PathBuf,
    pub html: PathBuf,
}

impl From<&ProjectLayout> for UpdatePaths {
    fn from(layout: &ProjectLayout) -> Self {
        UpdatePaths {
            data_json: layout.data_json(),
            workbook: layout.workbook(),
            html: layout.index_html(),
        }
    }
}

/// What an update run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub summary_rows: usize,
    pub country_sheets: usize,
    pub indicator_rows: usize,
    pub html_updated: bool,
}

/// Run a full update: workbook first, then the inline HTML payload.
pub fn run(paths: &UpdatePaths, today: NaiveDate) -> Result<UpdateSummary, UpdateError> {
    for required in [&paths.data_json, &paths.workbook] {
        if !required.exists() {
            return Err(UpdateError::MissingInput(required.clone()));
        }
    }

    let document = load_document(&paths.data_json)?;
    let data = DashboardData::from_value(&document).map_err(|source| UpdateError::Json {
        path: paths.data_json.clone(),
        source,
    })?;

    let mut workbook = Workbook::open(&paths.workbook)?;
    let mut summary = apply_to_workbook(&mut workbook, &data, today)?;
    workbook.save(&paths.workbook)?;
    info!("saved workbook {}", paths.workbook.display());

    summary.html_updated = update_html_inline(&paths.html, &document)?;
    Ok(summary)
}

/// Parse the data file, keeping unknown keys in their original order.
pub fn load_document(path: &Path) -> Result<Value, UpdateError> {
    let text = fs::read_to_string(path).map_err(|source| UpdateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| UpdateError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the dashboard fields into their fixed cells.
pub fn apply_to_workbook(
    workbook: &mut Workbook,
    data: &DashboardData,
    today: NaiveDate,
) -> Result<UpdateSummary, WorkbookError> {
    // Non-string stamps are shown as their JSON text.
    let stamp_text = match &data.last_updated {
        None | Some(Value::Null) => today.format("%Y-%m-%d").to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let stamp = data
        .last_updated
        .as_ref()
        .and_then(CellValue::from_json)
        .unwrap_or_else(|| CellValue::Text(stamp_text.clone()));
    let mut summary = UpdateSummary::default();

    let mut overview = workbook.require_sheet_mut(OVERVIEW_SHEET)?;
    overview.set("A2", format!("Last updated: {stamp_text}"))?;

    for card in data.summary() {
        let Some(row) = card.title().and_then(summary_row) else {
            continue;
        };
        let at = |col| CellRef::new(row - 1, col);
        overview.set_at(at(COL_B), json_cell(&card.value));
        overview.set_at(at(COL_C), json_cell(&card.note));
        overview.set_at(at(COL_D), Some("Weekly".into()));
        summary.summary_rows += 1;
    }

    if let Some(risk) = &data.global_risk {
        overview.set_at(CellRef::new(4, COL_G), json_cell(&risk.status));
        overview.set_at(CellRef::new(5, COL_G), json_cell(&risk.note));
    }

    for country in data.countries() {
        let Some(name) = country.name() else {
            continue;
        };
        let Some(mut sheet) = workbook.sheet_mut(name) else {
            continue;
        };

        sheet.set("A3", "Last update")?;
        sheet.set("B3", stamp.clone())?;

        let rows = label_rows(&sheet);
        for block in country.blocks() {
            let Some(row) = block.label().and_then(|label| find_row(&rows, label)) else {
                continue;
            };
            write_block(&mut sheet, row, block);
            summary.indicator_rows += 1;
        }

        debug!("updated sheet {}", sheet.name());
        summary.country_sheets += 1;
    }

    Ok(summary)
}

fn summary_row(title: &str) -> Option<u32> {
    SUMMARY_ROWS
        .iter()
        .find(|(name, _)| *name == title)
        .map(|&(_, row)| row)
}

/// Label → row pairs from column A; on duplicate labels the later row wins.
fn label_rows(sheet: &SheetMut) -> Vec<(String, u32)> {
    let mut rows: Vec<(String, u32)> = Vec::new();
    for row in LABEL_ROWS {
        let Some(CellValue::Text(label)) = sheet.get_at(CellRef::new(row - 1, COL_A)) else {
            continue;
        };
        if let Some(existing) = rows.iter_mut().find(|(l, _)| *l == label) {
            existing.1 = row;
        } else {
            rows.push((label, row));
        }
    }
    rows
}

fn find_row(rows: &[(String, u32)], label: &str) -> Option<u32> {
    rows.iter().find(|(l, _)| l == label).map(|&(_, row)| row)
}

fn write_block(sheet: &mut SheetMut, row: u32, block: &Block) {
    let at = |col| CellRef::new(row - 1, col);
    sheet.set_at(at(COL_B), json_cell(&block.status));
    sheet.set_at(at(COL_C), json_cell(&block.detail));
    sheet.set_at(at(COL_D), None);
    sheet.set_at(at(COL_E), None);
    if let Some(source) = block.first_source() {
        sheet.set_at(at(COL_F), json_cell(&source.url));
    }
}

fn json_cell(value: &Option<Value>) -> Option<CellValue> {
    value.as_ref().and_then(CellValue::from_json)
}

/// Encode the document the way the dashboard page expects it: two-space
/// indentation with every non-ASCII character written as a `\uXXXX` escape.
pub fn to_inline_json(document: &Value) -> Result<String, serde_json::Error> {
    let pretty = serde_json::to_string_pretty(document)?;
    if pretty.is_ascii() {
        return Ok(pretty);
    }

    let mut out = String::with_capacity(pretty.len() + pretty.len() / 4);
    let mut units = [0u16; 2];
    for ch in pretty.chars() {
        if ch.is_ascii() {
            out.push(ch);
            continue;
        }
        for unit in ch.encode_utf16(&mut units) {
            out.push_str(&format!("\\u{unit:04x}"));
        }
    }
    Ok(out)
}

/// Replace the body of the inline-data script block with `payload`.
///
/// Returns `Ok(None)` when the page has no inline-data block and an error
/// when the block is never closed. Everything outside the block is kept
/// byte-for-byte.
pub fn replace_inline_data(
    html: &str,
    payload: &str,
) -> Result<Option<String>, UnterminatedBlock> {
    let Some((before, rest)) = html.split_once(INLINE_START) else {
        return Ok(None);
    };
    let Some((_, after)) = rest.split_once(INLINE_END) else {
        return Err(UnterminatedBlock);
    };

    let mut out = String::with_capacity(before.len() + payload.len() + after.len() + 64);
    out.push_str(before);
    out.push_str(INLINE_START);
    out.push_str(payload);
    out.push_str(INLINE_END);
    out.push_str(after);
    Ok(Some(out))
}

/// The inline-data start marker was found without a closing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnterminatedBlock;

/// Refresh the inline payload of `path`. Returns whether the file changed.
pub fn update_html_inline(path: &Path, document: &Value) -> Result<bool, UpdateError> {
    if !path.exists() {
        debug!("no dashboard page at {}", path.display());
        return Ok(false);
    }

    let html = fs::read_to_string(path).map_err(|source| UpdateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let payload = to_inline_json(document).map_err(UpdateError::Encode)?;

    let updated = match replace_inline_data(&html, &payload) {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            debug!("{} has no inline data block", path.display());
            return Ok(false);
        }
        Err(UnterminatedBlock) => {
            return Err(UpdateError::UnterminatedInlineData(path.to_path_buf()));
        }
    };

    crate::write_atomic(path, updated.as_bytes()).map_err(|source| UpdateError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("refreshed inline data in {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 23).unwrap()
    }

    fn overview_workbook() -> Workbook {
        let mut workbook = Workbook::new();
        workbook.add_sheet(OVERVIEW_SHEET).unwrap();
        workbook
    }

    fn country_sheet(workbook: &mut Workbook, name: &str, labels: &[&str]) {
        let mut sheet = workbook.add_sheet(name).unwrap();
        for (i, label) in labels.iter().enumerate() {
            sheet.set(&format!("A{}", 5 + i), *label).unwrap();
        }
    }

    fn text(workbook: &Workbook, sheet: &str, addr: &str) -> Option<String> {
        match workbook.sheet(sheet)?.get(addr)? {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[test]
    fn writes_summary_rows_and_global_risk() {
        let mut workbook = overview_workbook();
        let data = DashboardData::from_value(&json!({
            "last_updated": "2026-01-20",
            "summary": [
                { "title": "Sweden", "value": "Neutral", "note": "Rate on hold" },
                { "title": "China", "value": 4.5 },
                { "title": "Global", "value": "ignored" }
            ],
            "global_risk": { "status": "Elevated" }
        }))
        .unwrap();

        let summary = apply_to_workbook(&mut workbook, &data, today()).unwrap();
        assert_eq!(summary.summary_rows, 2);

        let text = |addr| text(&workbook, OVERVIEW_SHEET, addr);
        assert_eq!(text("A2").as_deref(), Some("Last updated: 2026-01-20"));
        assert_eq!(text("B5").as_deref(), Some("Neutral"));
        assert_eq!(text("C5").as_deref(), Some("Rate on hold"));
        assert_eq!(text("D5").as_deref(), Some("Weekly"));
        assert_eq!(text("G5").as_deref(), Some("Elevated"));

        let overview = workbook.sheet(OVERVIEW_SHEET).unwrap();
        assert_eq!(overview.get("B6"), Some(CellValue::Number(4.5)));
        assert_eq!(overview.get("C6"), None);
        assert_eq!(overview.get("G6"), None);
        assert_eq!(overview.get("B7"), None);
    }

    #[test]
    fn defaults_last_updated_to_today() {
        let mut workbook = overview_workbook();
        country_sheet(&mut workbook, "Sweden", &[]);
        let data = DashboardData::from_value(&json!({
            "last_updated": null,
            "countries": [{ "name": "Sweden" }]
        }))
        .unwrap();

        apply_to_workbook(&mut workbook, &data, today()).unwrap();
        assert_eq!(
            text(&workbook, OVERVIEW_SHEET, "A2").as_deref(),
            Some("Last updated: 2026-01-23")
        );
        assert_eq!(text(&workbook, "Sweden", "A3").as_deref(), Some("Last update"));
        assert_eq!(text(&workbook, "Sweden", "B3").as_deref(), Some("2026-01-23"));
    }

    #[test]
    fn non_string_fields_are_written_as_json() {
        let mut workbook = overview_workbook();
        country_sheet(&mut workbook, "Sweden", &["Inflation"]);
        let data = DashboardData::from_value(&json!({
            "last_updated": 20260120,
            "summary": [{ "title": "Sweden", "value": "x" }, { "title": 7 }],
            "countries": [
                { "name": "Sweden", "blocks": [{ "label": 5, "status": "Good" }] },
                { "name": null }
            ]
        }))
        .unwrap();

        let summary = apply_to_workbook(&mut workbook, &data, today()).unwrap();
        assert_eq!(summary.summary_rows, 1);
        assert_eq!(summary.country_sheets, 1);
        assert_eq!(summary.indicator_rows, 0);

        assert_eq!(
            text(&workbook, OVERVIEW_SHEET, "A2").as_deref(),
            Some("Last updated: 20260120")
        );
        assert_eq!(text(&workbook, OVERVIEW_SHEET, "B5").as_deref(), Some("x"));
        let sweden = workbook.sheet("Sweden").unwrap();
        assert_eq!(sweden.get("B3"), Some(CellValue::Number(20260120.0)));
        assert_eq!(sweden.get("B5"), None);
    }

    #[test]
    fn writes_blocks_by_label() {
        let mut workbook = overview_workbook();
        country_sheet(
            &mut workbook,
            "China",
            &["Consumption", "Industry", "Property", "Credit"],
        );
        {
            let mut china = workbook.sheet_mut("China").unwrap();
            china.set("D6", "stale").unwrap();
            china.set("E6", "stale").unwrap();
            china.set("F7", "https://old.example").unwrap();
        }

        let data = DashboardData::from_value(&json!({
            "countries": [
                {
                    "name": "China",
                    "blocks": [
                        {
                            "label": "Industry",
                            "status": "Good",
                            "detail": "Output 5.2% y/y",
                            "sources": [
                                { "label": "NBS", "url": "https://stats.example/a" },
                                { "url": "https://stats.example/b" }
                            ]
                        },
                        { "label": "Property", "status": "Weak", "sources": [] },
                        { "label": "Exports", "status": "Good" }
                    ]
                },
                { "name": "Japan", "blocks": [{ "label": "Industry", "status": "Weak" }] }
            ]
        }))
        .unwrap();

        let summary = apply_to_workbook(&mut workbook, &data, today()).unwrap();
        assert_eq!(summary.country_sheets, 1);
        assert_eq!(summary.indicator_rows, 2);

        let text = |addr| text(&workbook, "China", addr);
        assert_eq!(text("B6").as_deref(), Some("Good"));
        assert_eq!(text("C6").as_deref(), Some("Output 5.2% y/y"));
        assert_eq!(text("F6").as_deref(), Some("https://stats.example/a"));
        assert_eq!(text("B7").as_deref(), Some("Weak"));
        assert_eq!(text("F7").as_deref(), Some("https://old.example"));

        let china = workbook.sheet("China").unwrap();
        assert_eq!(china.get("D6"), None);
        assert_eq!(china.get("E6"), None);
        assert_eq!(china.get("B5"), None);
        assert!(!workbook.has_sheet("Japan"));
    }

    #[test]
    fn duplicate_labels_resolve_to_the_last_row() {
        let mut workbook = overview_workbook();
        country_sheet(&mut workbook, "Sweden", &["Inflation", "Labor", "Inflation"]);
        let data = DashboardData::from_value(&json!({
            "countries": [
                { "name": "Sweden", "blocks": [{ "label": "Inflation", "status": "Good" }] }
            ]
        }))
        .unwrap();

        apply_to_workbook(&mut workbook, &data, today()).unwrap();
        assert_eq!(workbook.sheet("Sweden").unwrap().get("B5"), None);
        assert_eq!(text(&workbook, "Sweden", "B7").as_deref(), Some("Good"));
    }

    #[test]
    fn labels_outside_the_label_rows_are_ignored() {
        let mut workbook = overview_workbook();
        let mut sheet = workbook.add_sheet("Sweden").unwrap();
        sheet.set("A4", "Labor").unwrap();
        sheet.set("A13", "Inflation").unwrap();
        let data = DashboardData::from_value(&json!({
            "countries": [{ "name": "Sweden", "blocks": [
                { "label": "Labor", "status": "Weak" },
                { "label": "Inflation", "status": "Good" }
            ] }]
        }))
        .unwrap();

        let summary = apply_to_workbook(&mut workbook, &data, today()).unwrap();
        assert_eq!(summary.indicator_rows, 0);
    }

    #[test]
    fn missing_overview_sheet_is_an_error() {
        let mut workbook = Workbook::new();
        workbook.add_sheet("Sweden").unwrap();
        let err =
            apply_to_workbook(&mut workbook, &DashboardData::default(), today()).unwrap_err();
        assert!(matches!(err, WorkbookError::MissingSheet(name) if name == OVERVIEW_SHEET));
    }

    #[test]
    fn inline_json_escapes_non_ascii() {
        let doc = json!({
            "label": "Bostäder & kredit",
            "emoji": "📈",
            "n": [1, 2.5],
            "empty": []
        });
        let encoded = to_inline_json(&doc).unwrap();
        assert_eq!(
            encoded,
            concat!(
                "{\n  \"label\": \"Bost\\u00e4der & kredit\",\n",
                "  \"emoji\": \"\\ud83d\\udcc8\",\n",
                "  \"n\": [\n    1,\n    2.5\n  ],\n",
                "  \"empty\": []\n}"
            )
        );
        assert_eq!(serde_json::from_str::<Value>(&encoded).unwrap(), doc);
    }

    #[test]
    fn replaces_only_the_inline_block() {
        let html = concat!(
            "<html><head><script src=\"app.js\"></script></head>\n<body>\r\n",
            "<script type=\"application/json\" id=\"inline-data\">{\"old\": true}</script>\n",
            "<script>boot()</script></body></html>"
        );

        let replaced = replace_inline_data(html, "{\"new\": 1}").unwrap().unwrap();
        assert_eq!(
            replaced,
            concat!(
                "<html><head><script src=\"app.js\"></script></head>\n<body>\r\n",
                "<script type=\"application/json\" id=\"inline-data\">{\"new\": 1}</script>\n",
                "<script>boot()</script></body></html>"
            )
        );
    }

    #[test]
    fn page_without_marker_is_left_alone() {
        assert_eq!(replace_inline_data("<html></html>", "{}"), Ok(None));
        assert_eq!(
            replace_inline_data(&format!("<p>{INLINE_START}{{}}"), "{}"),
            Err(UnterminatedBlock)
        );
    }
}
