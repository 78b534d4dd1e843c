use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_date, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStatus {
    Pending,
    Submitted,
    Graded,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssignmentStatus::Pending => write!(f, "Pending"),
            AssignmentStatus::Submitted => write!(f, "Submitted"),
            AssignmentStatus::Graded => write!(f, "Graded"),
            AssignmentStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Assignment {
    pub id: Id,
    #[serde(rename = "courseId", default)]
    pub course_id: Option<Id>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "dueDate", default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(rename = "maxGrade", alias = "points", default)]
    pub max_grade: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(rename = "submittedAt", default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl Assignment {
    pub fn due(&self) -> Option<DateTime<Utc>> {
        self.due_date.as_deref().and_then(parse_date)
    }

    /// Pending work whose due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == AssignmentStatus::Pending && self.due().map(|d| d < now).unwrap_or(false)
    }

    /// "85/100", or None until graded
    pub fn grade_display(&self) -> Option<String> {
        let grade = self.grade?;
        Some(match self.max_grade {
            Some(max) => format!("{}/{}", grade, max),
            None => format!("{}", grade),
        })
    }
}

/// Body posted to `/assignments/{id}/submit`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AssignmentSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(status: &str, due: &str) -> Assignment {
        let json = format!(
            r#"{{"id":5,"title":"Essay","status":"{}","dueDate":"{}","points":100}}"#,
            status, due
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_overdue_only_when_pending() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(sample("pending", "2024-05-01").is_overdue(now));
        assert!(!sample("submitted", "2024-05-01").is_overdue(now));
        assert!(!sample("pending", "2024-07-01").is_overdue(now));
    }

    #[test]
    fn test_grade_display() {
        let mut a = sample("graded", "2024-05-01");
        assert_eq!(a.max_grade, Some(100.0));
        assert_eq!(a.grade_display(), None);
        a.grade = Some(85.0);
        assert_eq!(a.grade_display().as_deref(), Some("85/100"));
    }
}
