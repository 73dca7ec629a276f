use crate::classify::outcome::display_name;
use crate::config::schema::FixerConfig;
use crate::document::docx::DOCUMENT_PART;
use crate::error::KpiError;
use chrono::{Datelike, NaiveDate};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Where the template paragraph goes, for previews.
pub const FIX_POSITION: &str = "文档末尾";

/// Year and quarter substituted into the fix template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearQuarter {
    pub year: i32,
    /// 1 to 4.
    pub quarter: u32,
}

impl YearQuarter {
    pub fn from_date(date: NaiveDate) -> YearQuarter {
        YearQuarter {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    /// Year and quarter of the local clock.
    pub fn current() -> YearQuarter {
        Self::from_date(chrono::Local::now().date_naive())
    }

    /// Quarter as written in the statement: 一, 二, 三 or 四.
    pub fn quarter_numeral(&self) -> &'static str {
        match self.quarter {
            1 => "一",
            2 => "二",
            3 => "三",
            _ => "四",
        }
    }
}

/// A successful fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixOutcome {
    pub path: PathBuf,
    pub template_added: String,
    /// Set when a `.bak` copy was made before the document was changed.
    pub backup_path: Option<PathBuf>,
}

/// What a fix would do, without doing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixPreview {
    pub path: PathBuf,
    pub file_name: String,
    pub template_to_add: String,
    pub position: &'static str,
}

/// Appends a placeholder KPI statement to documents that lack one.
#[derive(Debug, Clone)]
pub struct Fixer {
    template: String,
}

impl Fixer {
    pub fn new(template: impl Into<String>) -> Self {
        Fixer {
            template: template.into(),
        }
    }

    pub fn from_config(config: &FixerConfig) -> Self {
        Self::new(config.template.clone())
    }

    /// The template with `{year}` and `{quarter}` filled in.
    pub fn render(&self, period: &YearQuarter) -> String {
        self.template
            .replace("{year}", &period.year.to_string())
            .replace("{quarter}", period.quarter_numeral())
    }

    pub fn preview(&self, path: &Path, period: &YearQuarter) -> Result<FixPreview, KpiError> {
        ensure_exists(path)?;
        Ok(FixPreview {
            path: path.to_path_buf(),
            file_name: display_name(path),
            template_to_add: self.render(period),
            position: FIX_POSITION,
        })
    }

    /// Append the rendered template as the last paragraph of the document.
    ///
    /// With `backup`, the original is first copied to `<path>.bak`,
    /// overwriting any earlier backup.
    pub fn fix_file(
        &self,
        path: &Path,
        period: &YearQuarter,
        backup: bool,
    ) -> Result<FixOutcome, KpiError> {
        ensure_exists(path)?;

        let backup_path = if backup {
            let target = backup_path(path);
            std::fs::copy(path, &target).map_err(|e| fix_error(path, e))?;
            debug!(backup = %target.display(), "backup created");
            Some(target)
        } else {
            None
        };

        let text = self.render(period);
        append_paragraph(path, &text)?;
        info!(path = %path.display(), "KPI template appended");

        Ok(FixOutcome {
            path: path.to_path_buf(),
            template_added: text,
            backup_path,
        })
    }

    /// Fix every document in `paths`. One failure does not stop the rest.
    pub fn fix_many(
        &self,
        paths: &[PathBuf],
        period: &YearQuarter,
        backup: bool,
    ) -> Vec<(PathBuf, Result<FixOutcome, KpiError>)> {
        paths
            .iter()
            .map(|path| {
                let result = self.fix_file(path, period, backup);
                if let Err(ref e) = result {
                    warn!("{e}");
                }
                (path.clone(), result)
            })
            .collect()
    }
}

/// `<path>.bak`, next to the document.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Copy `<path>.bak` back over the document.
pub fn restore_from_backup(path: &Path) -> Result<PathBuf, KpiError> {
    let backup = backup_path(path);
    if !backup.is_file() {
        return Err(KpiError::BackupMissing { path: backup });
    }
    std::fs::copy(&backup, path).map_err(|e| fix_error(path, e))?;
    info!(path = %path.display(), "restored from backup");
    Ok(backup)
}

/// Restore every document in `paths` from its backup.
pub fn restore_many(paths: &[PathBuf]) -> Vec<(PathBuf, Result<PathBuf, KpiError>)> {
    paths
        .iter()
        .map(|path| (path.clone(), restore_from_backup(path)))
        .collect()
}

/// Read a JSON array of document paths.
pub fn load_file_list(path: &Path) -> Result<Vec<PathBuf>, KpiError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| KpiError::FixList(format!("cannot read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| KpiError::FixList(format!("{} is not valid JSON: {e}", path.display())))?;

    let items = value.as_array().ok_or_else(|| {
        KpiError::FixList(format!("{} must contain a JSON array of paths", path.display()))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(PathBuf::from).ok_or_else(|| {
                KpiError::FixList(format!("expected a path string, found {item}"))
            })
        })
        .collect()
}

/// Write document paths as a pretty JSON array.
pub fn save_file_list(path: &Path, files: &[PathBuf]) -> Result<(), KpiError> {
    let names: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
    std::fs::write(path, serde_json::to_string_pretty(&names)?)?;
    Ok(())
}

fn ensure_exists(path: &Path) -> Result<(), KpiError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(KpiError::InputUnavailable {
            path: path.to_path_buf(),
            reason: "file does not exist".into(),
        })
    }
}

fn fix_error(path: &Path, e: impl std::fmt::Display) -> KpiError {
    KpiError::Fix {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Rewrite the archive with one more body paragraph.
///
/// Every other archive member is copied without recompression, and the new
/// archive replaces the old one only once it is complete. The replacement
/// keeps the original file's permissions.
fn append_paragraph(path: &Path, text: &str) -> Result<(), KpiError> {
    let source = File::open(path).map_err(|e| fix_error(path, e))?;
    let permissions = source
        .metadata()
        .map_err(|e| fix_error(path, e))?
        .permissions();
    let mut archive = ZipArchive::new(BufReader::new(source)).map_err(|e| fix_error(path, e))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| fix_error(path, e))?
        .read_to_string(&mut xml)
        .map_err(|e| fix_error(path, e))?;
    let updated = insert_paragraph(&xml, text).map_err(|e| fix_error(path, e))?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fix_error(path, e))?;
    let mut zip = ZipWriter::new(tmp.reopen().map_err(|e| fix_error(path, e))?);

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| fix_error(path, e))?;
        if entry.name() == DOCUMENT_PART {
            drop(entry);
            zip.start_file(DOCUMENT_PART, SimpleFileOptions::default())
                .map_err(|e| fix_error(path, e))?;
            zip.write_all(updated.as_bytes())
                .map_err(|e| fix_error(path, e))?;
        } else {
            zip.raw_copy_file(entry).map_err(|e| fix_error(path, e))?;
        }
    }

    let file = zip.finish().map_err(|e| fix_error(path, e))?;
    file.sync_all().map_err(|e| fix_error(path, e))?;
    drop(archive);
    tmp.as_file()
        .set_permissions(permissions)
        .map_err(|e| fix_error(path, e))?;
    tmp.persist(path).map_err(|e| fix_error(path, e.error))?;
    Ok(())
}

/// Copy `xml` event by event, adding a plain paragraph as the last block of
/// the body: ahead of the body's own `sectPr` when there is one, otherwise
/// just before the body closes. The paragraph uses the body's namespace
/// prefix.
fn insert_paragraph(xml: &str, text: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 128));
    // Element depth, and the body's prefix once inside it.
    let mut depth = 0usize;
    let mut body_prefix: Option<String> = None;
    let mut inserted = false;

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        let body_child = body_prefix.is_some() && depth == 2;

        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let local = e.local_name();
                if depth == 1 && local.as_ref() == b"body" {
                    let prefix = e
                        .name()
                        .prefix()
                        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
                    body_prefix = Some(prefix.unwrap_or_default());
                } else if body_child && !inserted && local.as_ref() == b"sectPr" {
                    write_paragraph(&mut writer, body_prefix.as_deref(), text);
                    inserted = true;
                }
            }
            Event::End(e) => {
                if body_child && e.local_name().as_ref() == b"body" {
                    if !inserted {
                        write_paragraph(&mut writer, body_prefix.as_deref(), text);
                        inserted = true;
                    }
                    body_prefix = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }

        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        writer.write_event(event).map_err(|e| e.to_string())?;
    }

    if !inserted {
        return Err(format!("{DOCUMENT_PART} has no body"));
    }
    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

fn write_paragraph(writer: &mut Writer<Vec<u8>>, prefix: Option<&str>, text: &str) {
    let p = match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:"),
        _ => String::new(),
    };
    let paragraph = format!(
        r#"<{p}p><{p}r><{p}t xml:space="preserve">{}</{p}t></{p}r></{p}p>"#,
        escape(text)
    );
    writer.get_mut().extend_from_slice(paragraph.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

    #[test]
    fn test_year_quarter_from_date() {
        let yq = YearQuarter::from_date(NaiveDate::from_ymd_opt(2024, 11, 5).unwrap());
        assert_eq!(yq, YearQuarter { year: 2024, quarter: 4 });
        assert_eq!(yq.quarter_numeral(), "四");

        let yq = YearQuarter::from_date(NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
        assert_eq!(yq.quarter, 1);
        let yq = YearQuarter::from_date(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(yq.quarter_numeral(), "二");
        let yq = YearQuarter::from_date(NaiveDate::from_ymd_opt(2025, 9, 30).unwrap());
        assert_eq!(yq.quarter_numeral(), "三");
    }

    #[test]
    fn test_render_template() {
        let fixer = Fixer::from_config(&FixerConfig::default());
        let text = fixer.render(&YearQuarter { year: 2024, quarter: 4 });
        assert_eq!(text, "2024年第四季度KPI考核自评__分。");
    }

    #[test]
    fn test_insert_before_body_sect_pr() {
        let xml = format!(
            r#"{HEAD}<w:p><w:r><w:t>正文</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="11906"/></w:sectPr></w:body></w:document>"#
        );
        let out = insert_paragraph(&xml, "模板").unwrap();
        let new_para = out.find("模板").unwrap();
        assert!(new_para > out.find("正文").unwrap());
        assert!(new_para < out.find("<w:sectPr>").unwrap());
        assert!(out.starts_with(HEAD));
    }

    #[test]
    fn test_insert_ignores_paragraph_sect_pr() {
        let xml = format!(
            r#"{HEAD}<w:p><w:pPr><w:sectPr/></w:pPr><w:r><w:t>第一节</w:t></w:r></w:p><w:p><w:r><w:t>第二节</w:t></w:r></w:p></w:body></w:document>"#
        );
        let out = insert_paragraph(&xml, "模板").unwrap();
        assert!(out.find("模板").unwrap() > out.find("第二节").unwrap());
        assert!(out.ends_with("</w:p></w:body></w:document>"));
    }

    #[test]
    fn test_insert_ignores_sect_pr_change() {
        let xml = format!(
            r#"{HEAD}<w:p><w:r><w:t>正文</w:t></w:r></w:p><w:sectPr><w:sectPrChange/></w:sectPr></w:body></w:document>"#
        );
        let out = insert_paragraph(&xml, "模板").unwrap();
        assert_eq!(out.matches("模板").count(), 1);
        assert!(out.find("模板").unwrap() < out.find("<w:sectPr>").unwrap());
    }

    #[test]
    fn test_insert_uses_body_prefix() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><x:document xmlns:x="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><x:body><x:p><x:r><x:t>正文</x:t></x:r></x:p><x:sectPr/></x:body></x:document>"#;
        let out = insert_paragraph(xml, "模板").unwrap();
        assert!(out.contains(
            r#"<x:p><x:r><x:t xml:space="preserve">模板</x:t></x:r></x:p><x:sectPr/>"#
        ));
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
    }

    #[test]
    fn test_insert_escapes_text() {
        let xml = format!("{HEAD}</w:body></w:document>");
        let out = insert_paragraph(&xml, "<a&b>").unwrap();
        assert!(out.contains("&lt;a&amp;b&gt;"));
    }

    #[test]
    fn test_insert_without_body() {
        assert!(insert_paragraph("<w:document/>", "x").is_err());
        assert!(insert_paragraph("<w:document><w:body>", "x").is_err());
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("dir/报告.docx")),
            PathBuf::from("dir/报告.docx.bak")
        );
    }

    #[test]
    fn test_restore_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.docx");
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(
            restore_from_backup(&path),
            Err(KpiError::BackupMissing { .. })
        ));
    }

    #[test]
    fn test_preview_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fixer = Fixer::new("{year}");
        let period = YearQuarter { year: 2024, quarter: 1 };
        assert!(fixer.preview(&dir.path().join("gone.docx"), &period).is_err());
    }

    #[test]
    fn test_file_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("fixed_files.json");
        let files = vec![PathBuf::from("a/一.docx"), PathBuf::from("b.docx")];
        save_file_list(&list, &files).unwrap();
        assert_eq!(load_file_list(&list).unwrap(), files);
    }

    #[test]
    fn test_file_list_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load_file_list(&missing), Err(KpiError::FixList(_))));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[\"a.docx\",").unwrap();
        assert!(matches!(load_file_list(&bad), Err(KpiError::FixList(_))));

        let object = dir.path().join("object.json");
        std::fs::write(&object, r#"{"files": []}"#).unwrap();
        assert!(matches!(load_file_list(&object), Err(KpiError::FixList(_))));

        let numbers = dir.path().join("numbers.json");
        std::fs::write(&numbers, "[1, 2]").unwrap();
        assert!(matches!(load_file_list(&numbers), Err(KpiError::FixList(_))));
    }
}
