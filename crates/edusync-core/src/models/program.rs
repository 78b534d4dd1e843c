use serde::{Deserialize, Serialize};

use super::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum ProgramStatus {
    Enrolled,
    Available,
    Completed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramStatus::Enrolled => write!(f, "Enrolled"),
            ProgramStatus::Available => write!(f, "Available"),
            ProgramStatus::Completed => write!(f, "Completed"),
            ProgramStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A degree or certificate program grouping several courses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Program {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ProgramStatus,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(rename = "totalCourses", default)]
    pub total_courses: u32,
    #[serde(rename = "completedCourses", default)]
    pub completed_courses: u32,
    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: f64,
    #[serde(rename = "startDate", default)]
    pub start_date: Option<String>,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<String>,
}

impl Program {
    pub fn is_enrolled(&self) -> bool {
        self.status == ProgramStatus::Enrolled
    }

    /// "3/8 courses" style summary
    pub fn course_summary(&self) -> String {
        format!("{}/{} courses", self.completed_courses, self.total_courses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_decodes_with_unknown_status() {
        let json = r#"{"id":1,"name":"Computer Science","code":"BSCS","status":"archived","totalCourses":8,"completedCourses":3,"progress":37.5}"#;
        let program: Program = serde_json::from_str(json).unwrap();
        assert_eq!(program.status, ProgramStatus::Unknown);
        assert_eq!(program.course_summary(), "3/8 courses");
        assert!(!program.is_enrolled());
    }
}
