use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum ExamStatus {
    Upcoming,
    InProgress,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExamStatus::Upcoming => write!(f, "Upcoming"),
            ExamStatus::InProgress => write!(f, "In Progress"),
            ExamStatus::Completed => write!(f, "Completed"),
            ExamStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Exam {
    pub id: Id,
    #[serde(rename = "courseId", default)]
    pub course_id: Option<Id>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ExamStatus,
    /// Minutes
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(rename = "totalQuestions", default)]
    pub total_questions: Option<u32>,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<String>,
    #[serde(rename = "endTime", default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(rename = "maxScore", default)]
    pub max_score: Option<f64>,
}

impl Exam {
    /// Score as a percentage of the maximum, once completed.
    pub fn percentage(&self) -> Option<f64> {
        match (self.score, self.max_score) {
            (Some(score), Some(max)) if max > 0.0 => Some(score * 100.0 / max),
            _ => None,
        }
    }
}

/// Answers posted to `/exams/{id}/submit`, keyed by question id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ExamSubmission {
    pub answers: std::collections::BTreeMap<String, Value>,
}
