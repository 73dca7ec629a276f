use kpicheck_core::document::{DocxReader, TextProvider};
use kpicheck_core::error::KpiError;
use kpicheck_core::report::FORMATS;

pub fn check_deps() -> Result<(), KpiError> {
    println!("kpicheck {}\n", env!("CARGO_PKG_VERSION"));
    println!("Document backends:");
    println!("  {:<8} built in", DocxReader::new().backend_name());
    println!();
    println!("Report formats:");
    for format in FORMATS {
        println!("  {format:<8} built in");
    }
    println!();
    println!("All backends are compiled in; nothing else needs to be installed.");
    Ok(())
}
