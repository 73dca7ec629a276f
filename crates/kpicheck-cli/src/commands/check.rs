use kpicheck_core::config::schema::Config;
use kpicheck_core::error::KpiError;
use kpicheck_core::fixer::{self, Fixer, YearQuarter};
use kpicheck_core::report::{self, ReportFormat, ReportOutput};
use std::path::PathBuf;
use tracing::debug;

use super::fix;

/// Name of the list of fixed documents written to the output directory.
pub const FIXED_FILES_LIST: &str = "fixed_files.json";

pub struct CheckArgs {
    pub dir: PathBuf,
    pub recursive: bool,
    pub output: PathBuf,
    pub format: Option<String>,
    pub config: Option<PathBuf>,
    pub paragraphs: Option<usize>,
    pub fix: bool,
    pub fix_preview: bool,
    pub backup: bool,
}

pub fn run(args: CheckArgs) -> Result<(), KpiError> {
    let mut config = Config::load_or_default(args.config.as_deref());
    if let Some(paragraphs) = args.paragraphs {
        config = config.with_paragraphs(paragraphs);
    }
    debug!(
        paragraphs = config.check_last_paragraphs,
        patterns = config.kpi_patterns.len(),
        "configuration loaded"
    );

    let format: ReportFormat = match args.format.as_deref() {
        Some(f) => f.parse()?,
        None => config.report.default_format,
    };

    println!("正在扫描目录 {}...", args.dir.display());
    let outcome = kpicheck_core::audit_directory(&args.dir, args.recursive, &config)?;

    let found = outcome.documents.len() + outcome.failures.len();
    if found == 0 {
        println!("没有找到.docx文件");
        return Ok(());
    }
    println!("找到 {found} 个.docx文件");

    for failure in &outcome.failures {
        println!("  错误: {}", failure.error);
    }

    let summary = &outcome.summary;
    println!("总文件数: {}", summary.total);
    println!("包含KPI自评的文件: {}", summary.with_statement);
    println!("缺少KPI自评的文件: {}", summary.without_statement);
    if summary.with_statement > 0 {
        println!("平均KPI分数: {:.2}", summary.average_score);
    }

    println!("生成报告...");
    match report::generate(&outcome, format, &args.output, &config.report)? {
        ReportOutput::Console(text) => println!("{text}"),
        ReportOutput::File(path) => println!("报告已保存到: {}", path.display()),
    }

    let fix_enabled = args.fix || config.fixer.enabled;
    if !fix_enabled && !args.fix_preview {
        return Ok(());
    }

    let to_fix: Vec<PathBuf> = outcome.missing().map(|d| d.path.clone()).collect();
    if to_fix.is_empty() {
        println!("没有需要修复的文件");
        return Ok(());
    }
    println!("找到 {} 个需要修复的文件", to_fix.len());

    let fixer = Fixer::from_config(&config.fixer);
    let period = YearQuarter::current();

    if args.fix_preview {
        fix::preview(&fixer, &to_fix, &period);
        return Ok(());
    }

    println!("\n正在修复 {} 个文件...", to_fix.len());
    fix::apply(&fixer, &to_fix, &period, args.backup);

    std::fs::create_dir_all(&args.output)?;
    let list_path = args.output.join(FIXED_FILES_LIST);
    fixer::save_file_list(&list_path, &to_fix)?;
    println!("已保存修复文件列表到: {}", list_path.display());

    Ok(())
}
