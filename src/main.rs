use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::error;
use tracing_subscriber::EnvFilter;

use student_gpa_report::aggregate::CreditPolicy;
use student_gpa_report::config::AppConfig;
use student_gpa_report::db::{self, PgMarkSource};
use student_gpa_report::engine::{compute_report, MarkSource, MemoryMarkSource};
use student_gpa_report::{report, scope};

#[derive(Parser)]
#[command(name = "gpa-report")]
#[command(about = "Per-student GPA and CGPA reports from raw mark records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demonstration mark entries
    Seed,
    /// Import mark entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute a GPA (one semester) or CGPA (a year or all time) report
    ///
    /// A non-zero --semester takes precedence over --year.
    Report {
        #[arg(long)]
        student_id: Option<String>,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long)]
        year: Option<String>,
        /// Read marks from a CSV file instead of the database
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Write the report to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Fail when records for one course disagree on its credits
        #[arg(long)]
        strict_credits: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} mark entries from {}.", csv.display());
        }
        Commands::Report {
            student_id,
            semester,
            year,
            csv,
            format,
            out,
            strict_credits,
        } => {
            let request = scope::resolve_scope(
                student_id.as_deref(),
                semester.as_deref(),
                year.as_deref(),
            )
            .inspect_err(|err| error!(status = err.status_code(), "{err}"))?;

            let mut engine = config.engine();
            if strict_credits {
                engine.credit_policy = CreditPolicy::Strict;
            }

            let source: Box<dyn MarkSource> = match csv {
                Some(path) => {
                    let rows = db::read_mark_csv(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    Box::new(MemoryMarkSource::new(
                        rows.iter().map(|row| row.to_record()).collect(),
                    ))
                }
                None => Box::new(PgMarkSource::new(connect(&config).await?)),
            };

            let result = compute_report(source.as_ref(), request, &engine)
                .await
                .inspect_err(|err| {
                    error!(status = err.status_code(), class = ?err.class(), "{err}")
                })?;

            let rendered = match format {
                OutputFormat::Json => {
                    serde_json::to_string_pretty(&report::to_response_json(&result)?)?
                }
                OutputFormat::Markdown => {
                    report::render_markdown(&request, &result, Utc::now().date_naive())
                }
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }

    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use student_gpa_report::Scope;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn zero_semester_with_year_reaches_the_resolver() {
        let cli = Cli::try_parse_from([
            "gpa-report",
            "report",
            "--student-id",
            "1001",
            "--semester",
            "0",
            "--year",
            "2025",
            "--csv",
            "data/sample_marks.csv",
        ])
        .unwrap();

        let Commands::Report {
            student_id,
            semester,
            year,
            ..
        } = cli.command
        else {
            panic!("expected the report subcommand");
        };
        let request =
            scope::resolve_scope(student_id.as_deref(), semester.as_deref(), year.as_deref())
                .unwrap();
        assert_eq!(request.scope, Scope::Year(2025));
    }

    #[test]
    fn semester_and_year_together_pick_the_semester() {
        let cli = Cli::try_parse_from([
            "gpa-report",
            "report",
            "--student-id",
            "1001",
            "--semester",
            "2",
            "--year",
            "2025",
        ])
        .unwrap();

        let Commands::Report { semester, year, .. } = cli.command else {
            panic!("expected the report subcommand");
        };
        let request =
            scope::resolve_scope(Some("1001"), semester.as_deref(), year.as_deref()).unwrap();
        assert_eq!(request.scope, Scope::Semester(2));
    }
}
