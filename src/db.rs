use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::MarkSource;
use crate::error::{GpaError, Result};
use crate::models::{MarkRecord, Scope};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// One mark entry in the flat CSV layout used by `import` and `report --csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkCsvRow {
    pub student_id: i64,
    pub course_code: String,
    pub course_title: String,
    pub course_credit: Decimal,
    pub semester_id: i64,
    pub year_id: i64,
    pub final_marks: Decimal,
    pub ct_marks: Decimal,
    pub attend_marks: Decimal,
    pub source_key: Option<String>,
}

impl MarkCsvRow {
    pub fn to_record(&self) -> MarkRecord {
        MarkRecord {
            student_id: self.student_id,
            course_code: self.course_code.clone(),
            course_title: self.course_title.clone(),
            course_credit: self.course_credit,
            semester_id: self.semester_id,
            year_id: self.year_id,
            final_marks: self.final_marks,
            ct_marks: self.ct_marks,
            attend_marks: self.attend_marks,
        }
    }
}

pub fn read_mark_csv(csv_path: &Path) -> anyhow::Result<Vec<MarkCsvRow>> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut rows = Vec::new();

    for result in reader.deserialize::<MarkCsvRow>() {
        rows.push(result?);
    }

    Ok(rows)
}

/// Rejects a batch in which one course declares two credits or one semester
/// sits under two years. Stored reference data is never rewritten on import.
pub fn validate_rows(rows: &[MarkCsvRow]) -> Result<()> {
    let mut credits: HashMap<&str, Decimal> = HashMap::new();
    let mut years: HashMap<i64, i64> = HashMap::new();

    for row in rows {
        let credit = credits
            .entry(row.course_code.as_str())
            .or_insert(row.course_credit);
        let year = years.entry(row.semester_id).or_insert(row.year_id);
        check_reference(row, Some(*credit), Some(*year))?;
    }

    Ok(())
}

/// Compares a row against the credit and year already on record for its
/// course and semester.
pub fn check_reference(
    row: &MarkCsvRow,
    stored_credit: Option<Decimal>,
    stored_year: Option<i64>,
) -> Result<()> {
    if let Some(previous) = stored_credit.filter(|credit| *credit != row.course_credit) {
        return Err(GpaError::CreditMismatch {
            course_code: row.course_code.clone(),
            previous,
            current: row.course_credit,
        });
    }

    if let Some(previous) = stored_year.filter(|year| *year != row.year_id) {
        return Err(GpaError::SemesterYearMismatch {
            semester_id: row.semester_id,
            previous,
            current: row.year_id,
        });
    }

    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let entries = vec![
        (1001, "CSE101", "Structured Programming", "3", 1, 2025, "45", "18", "8", "seed-001"),
        (1001, "MAT201", "Discrete Mathematics", "2", 1, 2025, "20", "10", "4", "seed-002"),
        (1001, "ENG105", "Technical Writing", "1.5", 2, 2025, "22", "8", "4.5", "seed-003"),
        (1001, "PHY110", "Physics I", "3", 3, 2026, "30", "12", "6", "seed-004"),
        (1001, "PHY110", "Physics I", "3", 3, 2026, "8", "2", "1", "seed-005"),
        (1002, "CSE101", "Structured Programming", "3", 1, 2025, "28", "10", "5", "seed-006"),
        (1002, "MAT201", "Discrete Mathematics", "2", 2, 2025, "24", "12", "5", "seed-007"),
    ];

    for (student_id, code, title, credit, semester_id, year_id, final_marks, ct, attend, key) in
        entries
    {
        let row = MarkCsvRow {
            student_id,
            course_code: code.to_string(),
            course_title: title.to_string(),
            course_credit: credit.parse()?,
            semester_id,
            year_id,
            final_marks: final_marks.parse()?,
            ct_marks: ct.parse()?,
            attend_marks: attend.parse()?,
            source_key: Some(key.to_string()),
        };
        insert_entry(pool, &row).await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let rows = read_mark_csv(csv_path)?;
    validate_rows(&rows)?;
    let mut inserted = 0usize;

    for row in rows {
        if insert_entry(pool, &row).await? {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "CSV import finished");
    Ok(inserted)
}

/// Inserts the row's year, semester and course if new, then the mark entry.
/// Returns `false` when an entry with the same source key already exists.
async fn insert_entry(pool: &PgPool, row: &MarkCsvRow) -> anyhow::Result<bool> {
    let stored_credit: Option<Decimal> =
        sqlx::query_scalar("SELECT credit FROM gpa.courses WHERE code = $1")
            .bind(&row.course_code)
            .fetch_optional(pool)
            .await?;
    let stored_year: Option<i64> =
        sqlx::query_scalar("SELECT year_id FROM gpa.semesters WHERE id = $1")
            .bind(row.semester_id)
            .fetch_optional(pool)
            .await?;
    check_reference(row, stored_credit, stored_year)?;

    sqlx::query(
        r#"
        INSERT INTO gpa.years (id, label)
        VALUES ($1, $2)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(row.year_id)
    .bind(format!("Year {}", row.year_id))
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO gpa.semesters (id, year_id, label)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(row.semester_id)
    .bind(row.year_id)
    .bind(format!("Semester {}", row.semester_id))
    .execute(pool)
    .await?;

    let course_id: Uuid = sqlx::query(
        r#"
        INSERT INTO gpa.courses (id, code, title, credit)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (code) DO UPDATE
        SET title = EXCLUDED.title
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&row.course_code)
    .bind(&row.course_title)
    .bind(row.course_credit)
    .fetch_one(pool)
    .await?
    .get("id");

    let source_key = row
        .source_key
        .clone()
        .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

    let result = sqlx::query(
        r#"
        INSERT INTO gpa.mark_entries
        (id, student_id, course_id, semester_id, final_marks, ct_marks, attend_marks, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(row.student_id)
    .bind(course_id)
    .bind(row.semester_id)
    .bind(row.final_marks)
    .bind(row.ct_marks)
    .bind(row.attend_marks)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Postgres-backed [`MarkSource`].
#[derive(Debug, Clone)]
pub struct PgMarkSource {
    pool: PgPool,
}

impl PgMarkSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarkSource for PgMarkSource {
    #[tracing::instrument(skip(self), fields(scope = %scope))]
    async fn fetch_marks(&self, student_id: i64, scope: Scope) -> Result<Vec<MarkRecord>> {
        let mut query = String::from(
            "SELECT m.student_id, c.code, c.title, c.credit, m.semester_id, s.year_id, \
             m.final_marks, m.ct_marks, m.attend_marks \
             FROM gpa.mark_entries m \
             JOIN gpa.semesters s ON s.id = m.semester_id \
             JOIN gpa.courses c ON c.id = m.course_id \
             WHERE m.student_id = $1",
        );

        let scope_id = match scope {
            Scope::Semester(id) => {
                query.push_str(" AND m.semester_id = $2");
                Some(id)
            }
            Scope::Year(id) => {
                query.push_str(" AND s.year_id = $2");
                Some(id)
            }
            Scope::All => None,
        };
        query.push_str(" ORDER BY m.created_at, m.id");

        let mut rows = sqlx::query(&query).bind(student_id);
        if let Some(id) = scope_id {
            rows = rows.bind(id);
        }

        let records = rows.fetch_all(&self.pool).await?;
        debug!(rows = records.len(), "Mark rows loaded");

        let mut marks = Vec::with_capacity(records.len());
        for row in records {
            marks.push(MarkRecord {
                student_id: row.try_get("student_id")?,
                course_code: row.try_get("code")?,
                course_title: row.try_get("title")?,
                course_credit: row.try_get("credit")?,
                semester_id: row.try_get("semester_id")?,
                year_id: row.try_get("year_id")?,
                final_marks: row.try_get("final_marks")?,
                ct_marks: row.try_get("ct_marks")?,
                attend_marks: row.try_get("attend_marks")?,
            });
        }

        Ok(marks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "student_id,course_code,course_title,course_credit,semester_id,year_id,final_marks,ct_marks,attend_marks,source_key";

    fn read_lines(lines: &[&str]) -> Vec<MarkCsvRow> {
        let path = std::env::temp_dir().join(format!("marks-{}.csv", Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        drop(file);

        let rows = read_mark_csv(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        rows
    }

    #[test]
    fn reads_mark_rows_from_csv() {
        let rows = read_lines(&[
            "1001,CSE101,Structured Programming,3,1,2025,40,20,10,row-1",
            "1001,CSE101,Structured Programming,3,1,2025,10,5,5.5,",
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source_key.as_deref(), Some("row-1"));
        assert_eq!(rows[1].source_key, None);
        assert!(validate_rows(&rows).is_ok());

        let record = rows[1].to_record();
        assert_eq!(record.total_marks(), Some("20.5".parse::<Decimal>().unwrap()));
        assert_eq!(record.course_credit, Decimal::from(3));
    }

    #[test]
    fn import_rejects_conflicting_credits() {
        let rows = read_lines(&[
            "1001,CSE101,Structured Programming,3,1,2025,40,20,10,row-1",
            "1002,CSE101,Structured Programming,4,1,2025,30,10,5,row-2",
        ]);

        match validate_rows(&rows) {
            Err(GpaError::CreditMismatch {
                course_code,
                previous,
                current,
            }) => {
                assert_eq!(course_code, "CSE101");
                assert_eq!(previous, Decimal::from(3));
                assert_eq!(current, Decimal::from(4));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn import_rejects_semester_under_two_years() {
        let rows = read_lines(&[
            "1001,CSE101,Structured Programming,3,1,2025,40,20,10,row-1",
            "1001,MAT201,Discrete Mathematics,2,1,2026,20,10,4,row-2",
        ]);

        assert!(matches!(
            validate_rows(&rows),
            Err(GpaError::SemesterYearMismatch {
                semester_id: 1,
                previous: 2025,
                current: 2026
            })
        ));
    }

    #[test]
    fn stored_reference_data_is_checked() {
        let rows = read_lines(&["1001,CSE101,Structured Programming,3,1,2025,40,20,10,row-1"]);
        let row = &rows[0];

        assert!(check_reference(row, None, None).is_ok());
        // NUMERIC(5, 2) comes back with two decimal places
        assert!(check_reference(row, Some("3.00".parse().unwrap()), Some(2025)).is_ok());
        assert!(matches!(
            check_reference(row, Some(Decimal::from(4)), Some(2025)),
            Err(GpaError::CreditMismatch { .. })
        ));
        assert!(matches!(
            check_reference(row, Some(Decimal::from(3)), Some(2024)),
            Err(GpaError::SemesterYearMismatch { previous: 2024, .. })
        ));
    }
}
