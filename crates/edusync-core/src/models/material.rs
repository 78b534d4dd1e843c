use serde::{Deserialize, Serialize};

use super::Id;

/// File extensions the video lecture player handles
const VIDEO_TYPES: &[&str] = &["mp4", "avi", "mov"];

/// A course file: lecture notes, slides, or a recorded lecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Material {
    pub id: Id,
    #[serde(rename = "courseId", default)]
    pub course_id: Option<Id>,
    pub name: String,
    /// File extension, e.g. "pdf" or "mp4"
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
    /// Human-readable size as sent by the server, e.g. "2.4 MB"
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "downloadUrl", default)]
    pub download_url: Option<String>,
    #[serde(rename = "uploadedAt", default)]
    pub uploaded_at: Option<String>,
}

impl Material {
    pub fn is_video(&self) -> bool {
        self.file_type
            .as_deref()
            .map(|t| VIDEO_TYPES.iter().any(|v| t.eq_ignore_ascii_case(v)))
            .unwrap_or(false)
    }
}

/// Response of `/materials/{id}/download`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MaterialDownload {
    #[serde(alias = "downloadUrl")]
    pub url: String,
    #[serde(rename = "expiresAt", default)]
    pub expires_at: Option<String>,
}
