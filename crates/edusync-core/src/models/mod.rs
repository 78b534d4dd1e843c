//! Data models for EduSync entities.
//!
//! This module contains the data structures returned by the EduSync REST API:
//!
//! - `User`: the signed-in learner, also persisted in the credential store
//! - `Program`, `Course`: the catalog a learner is enrolled in
//! - `Material`: downloadable course files and video lectures
//! - `Assignment`, `Exam`: graded work with status tracking
//!
//! Server payloads are decoded leniently: optional fields default, and
//! unrecognized status strings map to an `Unknown` variant.

pub mod assignment;
pub mod course;
pub mod exam;
pub mod material;
pub mod program;
pub mod user;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use assignment::{Assignment, AssignmentStatus, AssignmentSubmission};
pub use course::{Course, CourseStatus};
pub use exam::{Exam, ExamStatus, ExamSubmission};
pub use material::{Material, MaterialDownload};
pub use program::{Program, ProgramStatus};
pub use user::User;

/// Resource identifier. The backend sends numeric ids for catalog entities
/// and string ids for some user records, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(untagged)]
pub enum Id {
    Num(i64),
    Str(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(n) => write!(f, "{}", n),
            Id::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Num(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        s.parse::<i64>()
            .map(Id::Num)
            .unwrap_or_else(|_| Id::Str(s.to_string()))
    }
}

/// Parse a server date that is either RFC 3339 or a bare `YYYY-MM-DD`.
pub(crate) fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
