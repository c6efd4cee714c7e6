//! Per-student GPA and CGPA computation from raw mark records.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod grade;
pub mod models;
pub mod report;
pub mod scope;

pub use engine::{compute_from_records, compute_report, EngineConfig, MarkSource};
pub use error::{FaultClass, GpaError};
pub use models::{OverallReport, ReportRequest, Scope};
