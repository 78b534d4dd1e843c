//! REST paths, relative to the configured base URL.

use crate::models::Id;

// Auth
pub const LOGIN: &str = "/auth/login";
pub const LOGOUT: &str = "/auth/logout";
pub const REFRESH_TOKEN: &str = "/auth/refresh";

// User
pub const PROFILE: &str = "/user/profile";

// Programs
pub const PROGRAMS: &str = "/programs";
pub const PROGRAMS_ENROLLED: &str = "/programs/enrolled";

// Courses
pub const COURSES: &str = "/courses";

// Materials
pub const MATERIALS: &str = "/materials";

// Assignments
pub const ASSIGNMENTS: &str = "/assignments";

// Exams
pub const EXAMS: &str = "/exams";

pub fn program(id: &Id) -> String {
    format!("{}/{}", PROGRAMS, id)
}

pub fn course(id: &Id) -> String {
    format!("{}/{}", COURSES, id)
}

pub fn course_materials(id: &Id) -> String {
    format!("{}/{}/materials", COURSES, id)
}

pub fn material_download(id: &Id) -> String {
    format!("{}/{}/download", MATERIALS, id)
}

pub fn assignment(id: &Id) -> String {
    format!("{}/{}", ASSIGNMENTS, id)
}

pub fn assignment_submit(id: &Id) -> String {
    format!("{}/{}/submit", ASSIGNMENTS, id)
}

pub fn exam(id: &Id) -> String {
    format!("{}/{}", EXAMS, id)
}

pub fn exam_start(id: &Id) -> String {
    format!("{}/{}/start", EXAMS, id)
}

pub fn exam_submit(id: &Id) -> String {
    format!("{}/{}/submit", EXAMS, id)
}
