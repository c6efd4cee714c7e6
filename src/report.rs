use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};

use crate::error::{GpaError, Result};
use crate::grade;
use crate::models::{AverageLabel, CourseAggregate, GradeReportLine, OverallReport, ReportRequest};

/// Grades every course and computes the credit-weighted average.
///
/// Lines are ordered by course code. An empty mapping is a
/// [`GpaError::NoResultsFound`], never a zero-course report.
pub fn build_report(
    aggregates: HashMap<String, CourseAggregate>,
    label: AverageLabel,
) -> Result<OverallReport> {
    if aggregates.is_empty() {
        return Err(GpaError::NoResultsFound);
    }

    let mut lines = aggregates
        .into_values()
        .map(|course| {
            let percentage =
                grade::percentage(&course.course_code, course.total_marks, course.total_credits)?;
            Ok(GradeReportLine {
                gpa_points: grade::grade_point(percentage),
                course_code: course.course_code,
                course_title: course.course_title,
                total_marks: course.total_marks,
                total_credits: course.total_credits,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    lines.sort_by(|a, b| a.course_code.cmp(&b.course_code));

    let overall_average = weighted_average(&lines)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);

    Ok(OverallReport {
        lines,
        overall_average,
        label,
    })
}

pub fn weighted_average(lines: &[GradeReportLine]) -> Result<Decimal> {
    let mut total_credits = Decimal::ZERO;
    let mut weighted_sum = Decimal::ZERO;

    for line in lines {
        let out_of_range = || GpaError::MarksOutOfRange {
            course_code: line.course_code.clone(),
        };
        total_credits = total_credits
            .checked_add(line.total_credits)
            .ok_or_else(out_of_range)?;
        weighted_sum = line
            .gpa_points
            .checked_mul(line.total_credits)
            .and_then(|weighted| weighted_sum.checked_add(weighted))
            .ok_or_else(out_of_range)?;
    }

    if total_credits.is_zero() {
        return Ok(Decimal::ZERO);
    }
    // bounded by the top grade point, so this cannot overflow
    Ok(weighted_sum / total_credits)
}

/// Response body keyed by the average's label, e.g. `{"results": [...], "GPA": 3.2}`.
pub fn to_response_json(report: &OverallReport) -> serde_json::Result<Value> {
    let mut body = Map::new();
    body.insert("results".to_string(), serde_json::to_value(&report.lines)?);
    body.insert(
        report.label.as_str().to_string(),
        rust_decimal::serde::float::serialize(
            &report.overall_average,
            serde_json::value::Serializer,
        )?,
    );
    Ok(Value::Object(body))
}

pub fn render_markdown(
    request: &ReportRequest,
    report: &OverallReport,
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Academic Performance Report");
    let _ = writeln!(
        output,
        "Student {} over {} (generated {})",
        request.student_id, request.scope, generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Courses");
    let _ = writeln!(output);
    let _ = writeln!(output, "| Code | Title | Marks | Credits | Points |");
    let _ = writeln!(output, "|------|-------|-------|---------|--------|");

    for line in &report.lines {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {:.2} |",
            line.course_code,
            line.course_title,
            line.total_marks.normalize(),
            line.total_credits.normalize(),
            line.gpa_points
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "**{}: {:.2}** across {} courses",
        report.label,
        report.overall_average,
        report.lines.len()
    );

    output
}
