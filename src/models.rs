use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

/// One mark entry as returned by the storage layer, pre-joined with its
/// course metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkRecord {
    pub student_id: i64,
    pub course_code: String,
    pub course_title: String,
    pub course_credit: Decimal,
    pub semester_id: i64,
    pub year_id: i64,
    pub final_marks: Decimal,
    pub ct_marks: Decimal,
    pub attend_marks: Decimal,
}

impl MarkRecord {
    /// Sum of the three mark components, `None` on overflow.
    pub fn total_marks(&self) -> Option<Decimal> {
        self.final_marks
            .checked_add(self.ct_marks)?
            .checked_add(self.attend_marks)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseAggregate {
    pub course_code: String,
    pub course_title: String,
    pub total_marks: Decimal,
    pub total_credits: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReportLine {
    pub course_code: String,
    pub course_title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_marks: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_credits: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub gpa_points: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallReport {
    pub lines: Vec<GradeReportLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub overall_average: Decimal,
    pub label: AverageLabel,
}

/// Time window a report is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Semester(i64),
    Year(i64),
}

impl Scope {
    pub fn label(&self) -> AverageLabel {
        match self {
            Scope::Semester(_) => AverageLabel::Gpa,
            Scope::Year(_) | Scope::All => AverageLabel::Cgpa,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "all semesters"),
            Scope::Semester(id) => write!(f, "semester {id}"),
            Scope::Year(id) => write!(f, "year {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AverageLabel {
    #[serde(rename = "GPA")]
    Gpa,
    #[serde(rename = "CGPA")]
    Cgpa,
}

impl AverageLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AverageLabel::Gpa => "GPA",
            AverageLabel::Cgpa => "CGPA",
        }
    }
}

impl fmt::Display for AverageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated report request: who, and over which window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRequest {
    pub student_id: i64,
    pub scope: Scope,
}
