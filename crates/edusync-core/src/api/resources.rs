//! Typed wrappers for the EduSync resource endpoints.
//!
//! All of these go through [`ApiClient::send_json`], so they carry the
//! bearer token and the single refresh-and-retry.

use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use super::client::ApiClient;
use super::{endpoints, ApiError};
use crate::models::{
    Assignment, AssignmentSubmission, Course, Exam, ExamSubmission, Id, Material,
    MaterialDownload, Program, User,
};

/// List endpoints answer either with a bare array or with the array wrapped
/// in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "items", alias = "results")]
        data: Vec<T>,
    },
}

impl<T> ListResponse<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Bare(items) | ListResponse::Wrapped { data: items } => items,
        }
    }
}

impl ApiClient {
    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let list: ListResponse<T> = self.get(path).await?;
        let items = list.into_vec();
        debug!(path, count = items.len(), "Fetched list");
        Ok(items)
    }

    // ===== Profile =====

    pub async fn fetch_profile(&self) -> Result<User, ApiError> {
        self.get(endpoints::PROFILE).await
    }

    /// Save the profile and replace the stored user record with the server's
    /// copy (or the submitted one, when the server answers without a body).
    pub async fn update_profile(&self, user: &User) -> Result<User, ApiError> {
        let saved: Option<User> = self.put(endpoints::PROFILE, user).await?;
        let saved = saved.unwrap_or_else(|| user.clone());
        if let Err(e) = self.credentials().update_user(&saved).await {
            warn!(error = %e, "Profile saved but stored user record was not updated");
        }
        Ok(saved)
    }

    // ===== Programs =====

    pub async fn fetch_programs(&self) -> Result<Vec<Program>, ApiError> {
        self.fetch_list(endpoints::PROGRAMS).await
    }

    pub async fn fetch_enrolled_programs(&self) -> Result<Vec<Program>, ApiError> {
        self.fetch_list(endpoints::PROGRAMS_ENROLLED).await
    }

    pub async fn fetch_program(&self, id: &Id) -> Result<Program, ApiError> {
        self.get(&endpoints::program(id)).await
    }

    // ===== Courses =====

    pub async fn fetch_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.fetch_list(endpoints::COURSES).await
    }

    pub async fn fetch_course(&self, id: &Id) -> Result<Course, ApiError> {
        self.get(&endpoints::course(id)).await
    }

    pub async fn fetch_course_materials(&self, id: &Id) -> Result<Vec<Material>, ApiError> {
        self.fetch_list(&endpoints::course_materials(id)).await
    }

    // ===== Materials =====

    pub async fn fetch_materials(&self) -> Result<Vec<Material>, ApiError> {
        self.fetch_list(endpoints::MATERIALS).await
    }

    pub async fn fetch_material_download(&self, id: &Id) -> Result<MaterialDownload, ApiError> {
        self.get(&endpoints::material_download(id)).await
    }

    // ===== Assignments =====

    pub async fn fetch_assignments(&self) -> Result<Vec<Assignment>, ApiError> {
        self.fetch_list(endpoints::ASSIGNMENTS).await
    }

    pub async fn fetch_assignment(&self, id: &Id) -> Result<Assignment, ApiError> {
        self.get(&endpoints::assignment(id)).await
    }

    pub async fn submit_assignment(
        &self,
        id: &Id,
        submission: &AssignmentSubmission,
    ) -> Result<Assignment, ApiError> {
        self.post(&endpoints::assignment_submit(id), submission).await
    }

    // ===== Exams =====

    pub async fn fetch_exams(&self) -> Result<Vec<Exam>, ApiError> {
        self.fetch_list(endpoints::EXAMS).await
    }

    pub async fn fetch_exam(&self, id: &Id) -> Result<Exam, ApiError> {
        self.get(&endpoints::exam(id)).await
    }

    pub async fn start_exam(&self, id: &Id) -> Result<Exam, ApiError> {
        self.post_empty(&endpoints::exam_start(id)).await
    }

    pub async fn submit_exam(&self, id: &Id, submission: &ExamSubmission) -> Result<Exam, ApiError> {
        self.post(&endpoints::exam_submit(id), submission).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentStatus, ExamStatus, ProgramStatus};
    use crate::testutil::signed_in_client;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_lists_accept_bare_and_wrapped_arrays() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/programs")
            .with_status(200)
            .with_body(r#"[{"id":1,"name":"Computer Science","status":"enrolled"}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/programs/enrolled")
            .with_status(200)
            .with_body(r#"{"data":[{"id":1,"name":"Computer Science","status":"enrolled"}],"total":1}"#)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let all = client.fetch_programs().await.unwrap();
        let enrolled = client.fetch_enrolled_programs().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(enrolled.len(), 1);
        assert_eq!(enrolled[0].status, ProgramStatus::Enrolled);
    }

    #[tokio::test]
    async fn test_submit_assignment_posts_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/assignments/5/submit")
            .match_header("authorization", "Bearer access-1")
            .match_body(Matcher::Json(json!({"content": "My essay"})))
            .with_status(200)
            .with_body(r#"{"id":5,"title":"Essay","status":"submitted","submittedAt":"2024-05-01T12:00:00Z"}"#)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let submission = AssignmentSubmission {
            content: Some("My essay".to_string()),
            files: Vec::new(),
        };
        let updated = client.submit_assignment(&Id::Num(5), &submission).await.unwrap();
        mock.assert_async().await;
        assert_eq!(updated.status, AssignmentStatus::Submitted);
    }

    #[tokio::test]
    async fn test_course_materials_uses_course_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/courses/12/materials")
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_body(
                r#"{"items":[{"id":3,"courseId":12,"name":"Lecture 1","type":"mp4","size":"120 MB"}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let materials = client.fetch_course_materials(&Id::Num(12)).await.unwrap();
        mock.assert_async().await;
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].course_id, Some(Id::Num(12)));
        assert!(materials[0].is_video());
    }

    #[tokio::test]
    async fn test_material_download_returns_link() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/materials/m-7/download")
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_body(r#"{"downloadUrl":"https://files.example/m-7.pdf","expiresAt":"2024-05-01T13:00:00Z"}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let link = client
            .fetch_material_download(&Id::from("m-7"))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(link.url, "https://files.example/m-7.pdf");
        assert_eq!(link.expires_at.as_deref(), Some("2024-05-01T13:00:00Z"));
    }

    #[tokio::test]
    async fn test_start_exam_posts_without_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/exams/4/start")
            .match_header("authorization", "Bearer access-1")
            .match_body(Matcher::Exact(String::new()))
            .with_status(200)
            .with_body(r#"{"id":4,"title":"Midterm","status":"in-progress","totalQuestions":20}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let exam = client.start_exam(&Id::Num(4)).await.unwrap();
        mock.assert_async().await;
        assert_eq!(exam.status, ExamStatus::InProgress);
        assert_eq!(exam.total_questions, Some(20));
    }

    #[tokio::test]
    async fn test_submit_exam_posts_answers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/exams/4/submit")
            .match_header("authorization", "Bearer access-1")
            .match_body(Matcher::Json(json!({"answers": {"q1": "b", "q2": ["a", "c"]}})))
            .with_status(200)
            .with_body(r#"{"id":4,"title":"Midterm","status":"completed","score":18,"maxScore":20}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let mut submission = ExamSubmission::default();
        submission.answers.insert("q1".to_string(), json!("b"));
        submission.answers.insert("q2".to_string(), json!(["a", "c"]));

        let exam = client.submit_exam(&Id::Num(4), &submission).await.unwrap();
        mock.assert_async().await;
        assert_eq!(exam.status, ExamStatus::Completed);
        assert_eq!(exam.percentage(), Some(90.0));
    }

    #[tokio::test]
    async fn test_update_profile_replaces_stored_user() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/user/profile")
            .with_status(200)
            .with_body(r#"{"id":1,"name":"Ada King","email":"ada@example.com","role":"student"}"#)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let saved = client
            .update_profile(&User::new("Ada King", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(saved.role.as_deref(), Some("student"));

        let stored = client.credentials().user_json().await.unwrap().unwrap();
        let stored: User = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored.name, "Ada King");
        assert_eq!(
            client.credentials().access_token().await.unwrap().as_deref(),
            Some("access-1")
        );
    }

    #[tokio::test]
    async fn test_update_profile_without_body_keeps_submitted_user() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/user/profile")
            .with_status(204)
            .create_async()
            .await;

        let (client, _) = signed_in_client(&server, "access-1", "refresh-1").await;
        let saved = client
            .update_profile(&User::new("Ada King", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(saved.name, "Ada King");
    }
}
