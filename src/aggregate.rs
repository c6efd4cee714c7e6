use std::collections::HashMap;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{GpaError, Result};
use crate::models::{CourseAggregate, MarkRecord};

/// What to do when records for one course declare different credits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreditPolicy {
    /// Keep the last-seen credit and log the disagreement.
    #[default]
    LastWins,
    /// Fail with [`GpaError::CreditMismatch`].
    Strict,
}

impl FromStr for CreditPolicy {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last-wins" | "last_wins" => Ok(CreditPolicy::LastWins),
            "strict" => Ok(CreditPolicy::Strict),
            other => Err(format!("unknown credit policy: {other}")),
        }
    }
}

/// Groups mark records by course code, summing every mark component.
///
/// Credits are a course property, so they are overwritten rather than summed.
pub fn aggregate(
    records: &[MarkRecord],
    policy: CreditPolicy,
) -> Result<HashMap<String, CourseAggregate>> {
    let mut courses: HashMap<String, CourseAggregate> = HashMap::new();

    for record in records {
        let out_of_range = || GpaError::MarksOutOfRange {
            course_code: record.course_code.clone(),
        };
        let record_total = record.total_marks().ok_or_else(out_of_range)?;

        match courses.get_mut(&record.course_code) {
            Some(entry) => {
                if entry.total_credits != record.course_credit {
                    if policy == CreditPolicy::Strict {
                        return Err(GpaError::CreditMismatch {
                            course_code: record.course_code.clone(),
                            previous: entry.total_credits,
                            current: record.course_credit,
                        });
                    }
                    warn!(
                        course = %record.course_code,
                        previous = %entry.total_credits,
                        current = %record.course_credit,
                        "Conflicting credit weights, keeping the last one"
                    );
                }
                entry.total_marks = entry
                    .total_marks
                    .checked_add(record_total)
                    .ok_or_else(out_of_range)?;
                entry.total_credits = record.course_credit;
            }
            None => {
                courses.insert(
                    record.course_code.clone(),
                    CourseAggregate {
                        course_code: record.course_code.clone(),
                        course_title: record.course_title.clone(),
                        total_marks: record_total,
                        total_credits: record.course_credit,
                    },
                );
            }
        }

        debug!(course = %record.course_code, marks = %record_total, "Record aggregated");
    }

    Ok(courses)
}
