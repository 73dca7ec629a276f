use kpicheck_core::config::schema::Config;
use kpicheck_core::error::KpiError;
use kpicheck_core::fixer::{self, Fixer, YearQuarter};
use std::path::{Path, PathBuf};

/// Fix the documents named in a JSON list file.
pub fn fix_list(list: &Path, config: Option<&Path>, backup: bool) -> Result<(), KpiError> {
    let files = fixer::load_file_list(list)?;
    let config = Config::load_or_default(config);
    let fixer = Fixer::from_config(&config.fixer);

    apply(&fixer, &files, &YearQuarter::current(), backup);
    Ok(())
}

/// Restore the documents named in a JSON list file from their backups.
pub fn restore_list(list: &Path) -> Result<(), KpiError> {
    let files = fixer::load_file_list(list)?;
    let results = fixer::restore_many(&files);

    for (_, result) in &results {
        if let Err(e) = result {
            println!("  失败: {e}");
        }
    }
    let restored = results.iter().filter(|(_, r)| r.is_ok()).count();
    println!("恢复完成。成功: {}/{}", restored, files.len());
    Ok(())
}

/// Fix `files` and print a per-file and overall result.
pub fn apply(fixer: &Fixer, files: &[PathBuf], period: &YearQuarter, backup: bool) {
    let results = fixer.fix_many(files, period, backup);

    for (_, result) in &results {
        if let Err(e) = result {
            println!("  失败: {e}");
        }
    }
    let fixed = results.iter().filter(|(_, r)| r.is_ok()).count();
    println!("修复完成。成功: {}/{}", fixed, files.len());
}

pub fn preview(fixer: &Fixer, files: &[PathBuf], period: &YearQuarter) {
    println!("\n修复预览:");
    println!("{}", "-".repeat(80));

    for path in files {
        match fixer.preview(path, period) {
            Ok(p) => {
                println!("文件: {}", p.file_name);
                println!("将添加: {}", p.template_to_add);
                println!("位置: {}", p.position);
                println!();
            }
            Err(e) => println!("  失败: {e}"),
        }
    }
}
