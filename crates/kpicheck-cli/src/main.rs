mod commands;

use clap::builder::PossibleValuesParser;
use clap::Parser;
use kpicheck_core::report::FORMATS;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser)]
#[command(
    name = "kpicheck",
    version,
    about = "Check Word documents for a KPI self-assessment statement"
)]
struct Cli {
    /// Directory to scan for .docx files
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Also scan subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Directory for report files and fixed_files.json
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Report format: console, txt or excel (default: from configuration)
    #[arg(short, long, value_parser = PossibleValuesParser::new(FORMATS.iter().copied()))]
    format: Option<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of trailing paragraphs to check
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    paragraphs: Option<u32>,

    /// Append a KPI template to documents that lack a statement
    #[arg(long)]
    fix: bool,

    /// Show what --fix would add, without changing any file
    #[arg(long)]
    fix_preview: bool,

    /// Fix the documents listed in a JSON array file, without scanning
    #[arg(long, value_name = "FILE")]
    fix_list: Option<PathBuf>,

    /// Restore the documents listed in a JSON array file from their .bak copies
    #[arg(long, value_name = "FILE")]
    restore_list: Option<PathBuf>,

    /// Do not create .bak copies when fixing
    #[arg(long)]
    no_backup: bool,

    /// Show the available document and report backends
    #[arg(long)]
    check_deps: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = if cli.check_deps {
        commands::info::check_deps()
    } else if let Some(list) = cli.fix_list {
        commands::fix::fix_list(&list, cli.config.as_deref(), !cli.no_backup)
    } else if let Some(list) = cli.restore_list {
        commands::fix::restore_list(&list)
    } else {
        commands::check::run(commands::check::CheckArgs {
            dir: cli.dir,
            recursive: cli.recursive,
            output: cli.output,
            format: cli.format,
            config: cli.config,
            paragraphs: cli.paragraphs.map(|p| p as usize),
            fix: cli.fix,
            fix_preview: cli.fix_preview,
            backup: !cli.no_backup,
        })
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["kpicheck"]);
        assert_eq!(cli.dir, PathBuf::from("."));
        assert!(!cli.recursive);
        assert!(cli.format.is_none());
        assert!(!cli.no_backup);
    }

    #[test]
    fn test_rejects_unknown_format_and_zero_paragraphs() {
        assert!(Cli::try_parse_from(["kpicheck", "-f", "pdf"]).is_err());
        assert!(Cli::try_parse_from(["kpicheck", "-p", "0"]).is_err());
        assert!(Cli::try_parse_from(["kpicheck", "-f", "txt", "-p", "5", "-r"]).is_ok());
    }
}
