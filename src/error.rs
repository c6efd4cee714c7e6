//! Fault taxonomy for report computation.
//!
//! Every fault propagates to the caller; none are swallowed inside the engine.

use rust_decimal::Decimal;
use thiserror::Error;

/// Broad category a fault belongs to, used by the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    CallerError,
    NotFound,
    DataIntegrity,
    Storage,
}

#[derive(Debug, Error)]
pub enum GpaError {
    /// A required request parameter was absent.
    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    /// A request parameter was not a valid identifier.
    #[error("invalid {name}: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("no results found for the specified parameters")]
    NoResultsFound,

    #[error("course {course_code} has no credit weight")]
    ZeroCreditCourse { course_code: String },

    /// Two records for the same course declared different credit weights.
    #[error("course {course_code} declares conflicting credits ({previous} vs {current})")]
    CreditMismatch {
        course_code: String,
        previous: Decimal,
        current: Decimal,
    },

    /// Marks or credits too large to grade without overflowing.
    #[error("course {course_code} has marks or credits out of range")]
    MarksOutOfRange { course_code: String },

    /// A semester was recorded under two different academic years.
    #[error("semester {semester_id} belongs to year {previous}, not {current}")]
    SemesterYearMismatch {
        semester_id: i64,
        previous: i64,
        current: i64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl GpaError {
    pub fn class(&self) -> FaultClass {
        match self {
            GpaError::MissingParameter(_) | GpaError::InvalidParameter { .. } => {
                FaultClass::CallerError
            }
            GpaError::NoResultsFound => FaultClass::NotFound,
            GpaError::ZeroCreditCourse { .. }
            | GpaError::CreditMismatch { .. }
            | GpaError::MarksOutOfRange { .. }
            | GpaError::SemesterYearMismatch { .. } => FaultClass::DataIntegrity,
            GpaError::Storage(_) => FaultClass::Storage,
        }
    }

    /// HTTP-equivalent status for the boundary layer.
    pub fn status_code(&self) -> u16 {
        match self.class() {
            FaultClass::CallerError => 400,
            FaultClass::NotFound => 404,
            FaultClass::DataIntegrity => 500,
            FaultClass::Storage => 503,
        }
    }

    /// Only storage faults may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        self.class() == FaultClass::Storage
    }
}

pub type Result<T> = std::result::Result<T, GpaError>;
