use crate::error::{GpaError, Result};
use crate::models::{ReportRequest, Scope};

/// Turns raw request parameters into a validated [`ReportRequest`].
///
/// A non-zero semester wins over a year; semester `0` counts as absent.
pub fn resolve_scope(
    student_id: Option<&str>,
    semester_id: Option<&str>,
    year_id: Option<&str>,
) -> Result<ReportRequest> {
    let student_id = present(student_id).ok_or(GpaError::MissingParameter("studentId"))?;
    let student_id = parse_id("studentId", student_id)?;

    let semester_id = present(semester_id)
        .map(|value| parse_id("semesterId", value))
        .transpose()?;
    let year_id = present(year_id)
        .map(|value| parse_id("yearId", value))
        .transpose()?;

    let scope = match (semester_id, year_id) {
        (Some(semester), _) if semester != 0 => Scope::Semester(semester),
        (_, Some(year)) => Scope::Year(year),
        _ => Scope::All,
    };

    Ok(ReportRequest { student_id, scope })
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(name: &'static str, value: &str) -> Result<i64> {
    match value.parse::<i64>() {
        Ok(id) if id >= 0 => Ok(id),
        _ => Err(GpaError::InvalidParameter {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semester_scope_when_nonzero() {
        let request = resolve_scope(Some("42"), Some("3"), None).unwrap();
        assert_eq!(request.student_id, 42);
        assert_eq!(request.scope, Scope::Semester(3));
    }

    #[test]
    fn semester_wins_over_year() {
        let request = resolve_scope(Some("42"), Some("3"), Some("2024")).unwrap();
        assert_eq!(request.scope, Scope::Semester(3));
    }

    #[test]
    fn zero_semester_falls_through_to_year() {
        let request = resolve_scope(Some("42"), Some("0"), Some("7")).unwrap();
        assert_eq!(request.scope, Scope::Year(7));

        let request = resolve_scope(Some("42"), Some("0"), None).unwrap();
        assert_eq!(request.scope, Scope::All);
    }

    #[test]
    fn no_scope_means_all_time() {
        let request = resolve_scope(Some(" 42 "), None, Some("")).unwrap();
        assert_eq!(request.student_id, 42);
        assert_eq!(request.scope, Scope::All);
    }

    #[test]
    fn missing_student_is_rejected() {
        assert!(matches!(
            resolve_scope(None, Some("1"), None),
            Err(GpaError::MissingParameter("studentId"))
        ));
        assert!(matches!(
            resolve_scope(Some("   "), None, None),
            Err(GpaError::MissingParameter(_))
        ));
    }

    #[test]
    fn non_numeric_ids_are_rejected() {
        match resolve_scope(Some("abc"), None, None) {
            Err(GpaError::InvalidParameter { name, value }) => {
                assert_eq!(name, "studentId");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            resolve_scope(Some("1"), Some("spring"), None),
            Err(GpaError::InvalidParameter { name: "semesterId", .. })
        ));
        assert!(matches!(
            resolve_scope(Some("1"), None, Some("-4")),
            Err(GpaError::InvalidParameter { name: "yearId", .. })
        ));
    }
}
