use crate::classify::outcome::{display_name, AuditOutcome};
use crate::error::KpiError;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

const RULE_WIDTH: usize = 80;

/// Render the plain-text report.
pub fn render(outcome: &AuditOutcome, generated_at: &NaiveDateTime) -> String {
    let summary = &outcome.summary;
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut lines: Vec<String> = Vec::new();

    lines.push(heavy.clone());
    lines.push("KPI自评检查报告".into());
    lines.push(heavy.clone());
    lines.push(format!("生成时间: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(format!("总文件数: {}", summary.total));
    lines.push(format!("包含KPI自评的文件数: {}", summary.with_statement));
    lines.push(format!("缺少KPI自评的文件数: {}", summary.without_statement));
    lines.push(light.clone());

    if summary.without_statement > 0 {
        lines.push("\n缺少KPI自评的文件:".into());
        lines.push(light.clone());
        for doc in outcome.missing() {
            lines.push(format!("文件: {}", doc.file_name()));
            lines.push(format!("路径: {}", doc.path.display()));
            lines.push(String::new());
        }
    }

    if summary.with_statement > 0 {
        lines.push("\n包含KPI自评的文件及其分数:".into());
        lines.push(light.clone());
        for doc in outcome.compliant() {
            lines.push(format!("文件: {}", doc.file_name()));
            if let Some(score) = doc.verdict.score() {
                lines.push(format!("分数: {score}"));
            }
            if let Some(year) = doc.verdict.year() {
                lines.push(format!("年份: {year}"));
            }
            if let Some(matched) = doc.verdict.matched_text() {
                lines.push(format!("匹配文本: {matched}"));
            }
            lines.push(String::new());
        }
    }

    if !outcome.failures.is_empty() {
        lines.push("\n无法检查的文件:".into());
        lines.push(light.clone());
        for failure in &outcome.failures {
            lines.push(format!("文件: {}", display_name(&failure.path)));
            lines.push(format!("错误: {}", failure.error));
            lines.push(String::new());
        }
    }

    if summary.with_statement > 0 {
        lines.push(format!("\n平均分: {:.2}", summary.average_score));
    }

    lines.join("\n").trim_end().to_string()
}

/// Write the plain-text report to `dir/filename`.
pub fn write(
    outcome: &AuditOutcome,
    dir: &Path,
    filename: &str,
    generated_at: &NaiveDateTime,
) -> Result<PathBuf, KpiError> {
    let path = dir.join(filename);
    std::fs::create_dir_all(dir)
        .and_then(|_| std::fs::write(&path, render(outcome, generated_at)))
        .map_err(|e| KpiError::Sink(format!("cannot write {}: {e}", path.display())))?;
    Ok(path)
}
