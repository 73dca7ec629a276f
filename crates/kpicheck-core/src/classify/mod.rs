pub mod engine;
pub mod outcome;
pub mod summary;

pub use engine::Classifier;
pub use outcome::{AuditOutcome, DocumentFailure, DocumentVerdict, KpiStatement, Summary, Verdict};
pub use summary::summarize;
