use serde::{Deserialize, Serialize};

use super::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum CourseStatus {
    InProgress,
    Completed,
    NotStarted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CourseStatus::InProgress => write!(f, "In Progress"),
            CourseStatus::Completed => write!(f, "Completed"),
            CourseStatus::NotStarted => write!(f, "Not Started"),
            CourseStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Course {
    pub id: Id,
    #[serde(rename = "programId", default)]
    pub program_id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub credits: Option<u32>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub progress: f64,
}

impl Course {
    /// "CS101 - Intro to Programming", or just the name without a code
    pub fn title(&self) -> String {
        match self.code.as_deref() {
            Some(code) if !code.is_empty() => format!("{} - {}", code, self.name),
            _ => self.name.clone(),
        }
    }
}
