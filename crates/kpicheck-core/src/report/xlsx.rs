use crate::classify::outcome::AuditOutcome;
use crate::error::KpiError;
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const SUMMARY_SHEET: &str = "摘要";
pub const DETAIL_SHEET: &str = "详细数据";
pub const MISSING_SHEET: &str = "缺少KPI自评的文件";

const NOT_AVAILABLE: &str = "N/A";

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Clone)]
enum Cell {
    Text(String),
    Number(String),
}

impl Cell {
    fn text(s: impl Into<String>) -> Cell {
        Cell::Text(s.into())
    }

    fn number(n: impl ToString) -> Cell {
        Cell::Number(n.to_string())
    }
}

#[derive(Debug)]
struct Sheet {
    name: &'static str,
    rows: Vec<Vec<Cell>>,
}

/// Write the three-sheet workbook to `dir/filename`.
///
/// The archive is assembled in memory and written in one go, so a failure
/// while building it never leaves a truncated workbook behind. The file is
/// created with the same permissions as any other new file.
pub fn write(outcome: &AuditOutcome, dir: &Path, filename: &str) -> Result<PathBuf, KpiError> {
    let path = dir.join(filename);

    let buffer = write_workbook(Cursor::new(Vec::new()), &sheets(outcome))
        .map_err(|e| sink_error(&path, e))?;
    std::fs::create_dir_all(dir).map_err(|e| sink_error(&path, e))?;
    std::fs::write(&path, buffer.into_inner()).map_err(|e| sink_error(&path, e))?;

    Ok(path)
}

fn sink_error(path: &Path, e: impl std::fmt::Display) -> KpiError {
    KpiError::Sink(format!("cannot write {}: {e}", path.display()))
}

fn sheets(outcome: &AuditOutcome) -> Vec<Sheet> {
    let summary = &outcome.summary;

    let summary_rows = vec![
        vec![Cell::text("项目"), Cell::text("值")],
        vec![Cell::text("总文件数"), Cell::number(summary.total)],
        vec![
            Cell::text("包含KPI自评的文件数"),
            Cell::number(summary.with_statement),
        ],
        vec![
            Cell::text("缺少KPI自评的文件数"),
            Cell::number(summary.without_statement),
        ],
        vec![Cell::text("平均分"), Cell::number(summary.average_score)],
    ];

    let mut detail_rows = vec![vec![
        Cell::text("文件名"),
        Cell::text("文件路径"),
        Cell::text("包含KPI自评"),
        Cell::text("KPI自评分数"),
        Cell::text("匹配文本"),
    ]];
    for doc in &outcome.documents {
        let verdict = &doc.verdict;
        detail_rows.push(vec![
            Cell::text(doc.file_name()),
            Cell::text(doc.path.display().to_string()),
            Cell::text(if verdict.is_present() { "是" } else { "否" }),
            verdict
                .score()
                .map(Cell::number)
                .unwrap_or_else(|| Cell::text(NOT_AVAILABLE)),
            Cell::text(verdict.matched_text().unwrap_or(NOT_AVAILABLE)),
        ]);
    }

    let mut missing_rows = vec![vec![Cell::text("文件名"), Cell::text("文件路径")]];
    for doc in outcome.missing() {
        missing_rows.push(vec![
            Cell::text(doc.file_name()),
            Cell::text(doc.path.display().to_string()),
        ]);
    }

    vec![
        Sheet {
            name: SUMMARY_SHEET,
            rows: summary_rows,
        },
        Sheet {
            name: DETAIL_SHEET,
            rows: detail_rows,
        },
        Sheet {
            name: MISSING_SHEET,
            rows: missing_rows,
        },
    ]
}

fn write_workbook<W: Write + std::io::Seek>(
    writer: W,
    sheets: &[Sheet],
) -> Result<W, zip::result::ZipError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types(sheets.len()).as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(
        format!(
            r#"{XML_DECL}<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
        )
        .as_bytes(),
    )?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(workbook(sheets).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(workbook_rels(sheets.len()).as_bytes())?;

    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(worksheet(sheet).as_bytes())?;
    }

    zip.finish()
}

fn content_types(sheet_count: usize) -> String {
    let overrides: String = (1..=sheet_count)
        .map(|i| {
            format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            )
        })
        .collect();
    format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#
    )
}

fn workbook(sheets: &[Sheet]) -> String {
    let entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, sheet)| {
            format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(sheet.name),
                i + 1,
                i + 1
            )
        })
        .collect();
    format!(
        r#"{XML_DECL}<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>{entries}</sheets></workbook>"#
    )
}

fn workbook_rels(sheet_count: usize) -> String {
    let rels: String = (1..=sheet_count)
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{i}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            )
        })
        .collect();
    format!(r#"{XML_DECL}<Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#)
}

fn worksheet(sheet: &Sheet) -> String {
    let mut data = String::new();
    for (r, row) in sheet.rows.iter().enumerate() {
        let row_number = r + 1;
        data.push_str(&format!(r#"<row r="{row_number}">"#));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{row_number}", column_name(c));
            match cell {
                Cell::Text(s) => data.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    escape(s.as_str())
                )),
                Cell::Number(n) => {
                    data.push_str(&format!(r#"<c r="{reference}"><v>{n}</v></c>"#))
                }
            }
        }
        data.push_str("</row>");
    }
    format!(r#"{XML_DECL}<worksheet xmlns="{MAIN_NS}"><sheetData>{data}</sheetData></worksheet>"#)
}

/// Spreadsheet column letters for a zero-based index: 0 -> A, 25 -> Z, 26 -> AA.
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(4), "E");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[cfg(unix)]
    #[test]
    fn test_workbook_has_default_permissions() {
        use crate::classify::summarize;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let outcome = AuditOutcome {
            documents: vec![],
            failures: vec![],
            summary: summarize(std::iter::empty()),
        };
        let path = write(&outcome, dir.path(), "report.xlsx").unwrap();

        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, b"").unwrap();
        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&plain));
    }

    #[test]
    fn test_text_cells_are_escaped() {
        let sheet = Sheet {
            name: SUMMARY_SHEET,
            rows: vec![vec![Cell::text("a<b & c"), Cell::number(3)]],
        };
        let xml = worksheet(&sheet);
        assert!(xml.contains("a&lt;b &amp; c"));
        assert!(xml.contains(r#"<c r="B1"><v>3</v></c>"#));
    }
}
