//! Report computation entry point.
//!
//! The engine owns no I/O: records come from a [`MarkSource`], and every
//! aggregate built here lives only for the duration of one call.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::aggregate::{aggregate, CreditPolicy};
use crate::error::{GpaError, Result};
use crate::models::{MarkRecord, OverallReport, ReportRequest, Scope};
use crate::report::build_report;

/// Query interface over stored mark records, pre-joined with course metadata.
#[async_trait]
pub trait MarkSource: Send + Sync {
    async fn fetch_marks(&self, student_id: i64, scope: Scope) -> Result<Vec<MarkRecord>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    pub credit_policy: CreditPolicy,
}

/// Fetches the student's records for the requested scope and grades them.
#[tracing::instrument(
    skip(source, config),
    fields(student_id = request.student_id, scope = %request.scope)
)]
pub async fn compute_report<S>(
    source: &S,
    request: ReportRequest,
    config: &EngineConfig,
) -> Result<OverallReport>
where
    S: MarkSource + ?Sized,
{
    let records = source.fetch_marks(request.student_id, request.scope).await?;
    debug!(records = records.len(), "Mark records fetched");

    let report = compute_from_records(&records, request.scope, config)?;
    info!(
        courses = report.lines.len(),
        average = %report.overall_average,
        label = %report.label,
        "Report computed"
    );
    Ok(report)
}

/// Pure half of [`compute_report`], for callers that already hold the records.
pub fn compute_from_records(
    records: &[MarkRecord],
    scope: Scope,
    config: &EngineConfig,
) -> Result<OverallReport> {
    if records.is_empty() {
        return Err(GpaError::NoResultsFound);
    }

    let courses = aggregate(records, config.credit_policy)?;
    build_report(courses, scope.label())
}

/// [`MarkSource`] over records already loaded in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryMarkSource {
    records: Vec<MarkRecord>,
}

impl MemoryMarkSource {
    pub fn new(records: Vec<MarkRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl MarkSource for MemoryMarkSource {
    async fn fetch_marks(&self, student_id: i64, scope: Scope) -> Result<Vec<MarkRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|record| record.student_id == student_id)
            .filter(|record| match scope {
                Scope::All => true,
                Scope::Semester(id) => record.semester_id == id,
                Scope::Year(id) => record.year_id == id,
            })
            .cloned()
            .collect())
    }
}
