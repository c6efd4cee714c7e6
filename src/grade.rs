use rust_decimal::Decimal;

use crate::error::{GpaError, Result};

/// Highest attainable mark per credit hour.
pub const MAX_MARKS_PER_CREDIT: i64 = 25;

/// Percentage lower bound (inclusive) and grade point in hundredths,
/// highest band first.
///
/// | Percentage | Points |
/// |------------|--------|
/// | >= 80      | 4.00   |
/// | >= 75      | 3.75   |
/// | >= 70      | 3.50   |
/// | >= 65      | 3.25   |
/// | >= 60      | 3.00   |
/// | >= 55      | 2.75   |
/// | >= 50      | 2.50   |
/// | >= 45      | 2.25   |
/// | >= 40      | 2.00   |
/// | < 40       | 0.00   |
const GRADE_SCALE: &[(i64, i64)] = &[
    (80, 400),
    (75, 375),
    (70, 350),
    (65, 325),
    (60, 300),
    (55, 275),
    (50, 250),
    (45, 225),
    (40, 200),
];

/// Maps a percentage to its grade point. Total over every input; values
/// outside 0..=100 are not clamped, they simply land in the end bands.
pub fn grade_point(percentage: Decimal) -> Decimal {
    GRADE_SCALE
        .iter()
        .find(|(min, _)| percentage >= Decimal::from(*min))
        .map(|(_, points)| Decimal::new(*points, 2))
        .unwrap_or(Decimal::ZERO)
}

/// Share of the attainable marks earned, where a course is worth
/// `credits * 25` marks.
pub fn percentage(course_code: &str, total_marks: Decimal, total_credits: Decimal) -> Result<Decimal> {
    if total_credits <= Decimal::ZERO {
        return Err(GpaError::ZeroCreditCourse {
            course_code: course_code.to_string(),
        });
    }

    total_credits
        .checked_mul(Decimal::from(MAX_MARKS_PER_CREDIT))
        .and_then(|attainable| total_marks.checked_div(attainable))
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| GpaError::MarksOutOfRange {
            course_code: course_code.to_string(),
        })
}
