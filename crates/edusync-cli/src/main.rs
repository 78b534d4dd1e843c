//! EduSync CLI - command-line access to the EduSync learning platform.
//!
//! Signs a student in, keeps the session in the OS keychain (or a file, see
//! `EDUSYNC_STORAGE`), and lists programs, courses, materials, assignments
//! and exams.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use edusync_core::api::{ApiError, LoginRequest};
use edusync_core::config::{Config, ENV_EMAIL};
use edusync_core::models::{ExamStatus, Id};
use edusync_core::Services;

/// Directory for a daily-rotated log file, in addition to stderr
const ENV_LOG_DIR: &str = "EDUSYNC_LOG_DIR";

const LOG_FILE_PREFIX: &str = "edusync.log";

const USAGE: &str = "\
Usage: edusync <command> [args]

Commands:
  login [email]          Sign in (password is prompted)
  logout                 Sign out and clear stored credentials
  status                 Show whether a session is stored
  whoami                 Fetch and show the signed-in profile
  dashboard              Summary of programs, courses, assignments and exams
  programs [--enrolled]  List programs
  courses                List courses
  materials [course-id]  List materials, optionally for one course
  assignments            List assignments
  exams                  List exams
  help                   Show this message

Environment:
  EDUSYNC_API_URL        API base URL
  EDUSYNC_TIMEOUT_SECS   Request timeout in seconds
  EDUSYNC_STORAGE        keyring | file | memory
  EDUSYNC_EMAIL          Default login email
  EDUSYNC_LOG_DIR        Also write logs to this directory
  RUST_LOG               Log filter (default: warn)";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Login { email: Option<String> },
    Logout,
    Status,
    WhoAmI,
    Dashboard,
    Programs { enrolled_only: bool },
    Courses,
    Materials { course_id: Option<Id> },
    Assignments,
    Exams,
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Command::Help);
        };
        let rest = &args[1..];

        let command = match name.as_str() {
            "login" => Command::Login {
                email: rest.first().cloned(),
            },
            "logout" => Command::Logout,
            "status" => Command::Status,
            "whoami" => Command::WhoAmI,
            "dashboard" => Command::Dashboard,
            "programs" => match rest.first().map(String::as_str) {
                None => Command::Programs { enrolled_only: false },
                Some("--enrolled") => Command::Programs { enrolled_only: true },
                Some(other) => bail!("Unknown option for programs: {}", other),
            },
            "courses" => Command::Courses,
            "materials" => Command::Materials {
                course_id: rest.first().map(|s| Id::from(s.as_str())),
            },
            "assignments" => Command::Assignments,
            "exams" => Command::Exams,
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("Unknown command: {}\n\n{}", other, USAGE),
        };
        Ok(command)
    }

    fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Logout | Command::Status | Command::Help
        )
    }
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(ENV_LOG_DIR).map(PathBuf::from) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::from(2));
        }
    };
    debug!(?command, "Parsed command");

    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load()?;
    let services = Services::from_config(&config)?;

    if command.needs_session() && !services.session.is_logged_in().await {
        eprintln!("Not logged in. Run `edusync login` first.");
        return Ok(ExitCode::FAILURE);
    }

    if let Err(e) = run(command, &services, &config).await {
        report_error(&e);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<ApiError>() {
        Some(api) if api.is_session_invalidated() => {
            eprintln!("Your session has expired. Run `edusync login` to sign in again.");
        }
        Some(api) if api.is_timeout() => {
            eprintln!("The EduSync server did not respond in time. Please try again.");
        }
        _ => eprintln!("Error: {}", error),
    }
}

async fn run(command: Command, services: &Services, config: &Config) -> Result<()> {
    match command {
        Command::Login { email } => login(services, config, email).await,
        Command::Logout => {
            services.session.logout().await?;
            println!("Logged out.");
            Ok(())
        }
        Command::Status => {
            let snapshot = services.session.snapshot().await;
            match (snapshot.logged_in, snapshot.user) {
                (true, Some(user)) if !user.display_name().is_empty() => {
                    println!("Logged in as {} <{}>", user.display_name(), user.email)
                }
                (true, _) => println!("Logged in"),
                (false, _) => println!("Not logged in"),
            }
            Ok(())
        }
        Command::WhoAmI => {
            let user = services.api.fetch_profile().await?;
            if !services.session.update_user(&user).await {
                warn!("Could not refresh the stored user record");
            }
            println!("{}", user.display_name());
            println!("  Email: {}", user.email);
            if let Some(role) = &user.role {
                println!("  Role:  {}", role);
            }
            if let Some(student_id) = &user.student_id {
                println!("  ID:    {}", student_id);
            }
            Ok(())
        }
        Command::Dashboard => dashboard(services).await,
        Command::Programs { enrolled_only } => {
            let programs = if enrolled_only {
                services.api.fetch_enrolled_programs().await?
            } else {
                services.api.fetch_programs().await?
            };
            if programs.is_empty() {
                println!("No programs.");
            }
            for program in &programs {
                println!(
                    "[{}] {} ({}) - {}",
                    program.id,
                    program.name,
                    program.status,
                    program.course_summary()
                );
            }
            Ok(())
        }
        Command::Courses => {
            let courses = services.api.fetch_courses().await?;
            if courses.is_empty() {
                println!("No courses.");
            }
            for course in &courses {
                println!(
                    "[{}] {} ({}) {:.0}%",
                    course.id,
                    course.title(),
                    course.status,
                    course.progress
                );
            }
            Ok(())
        }
        Command::Materials { course_id } => {
            let materials = match &course_id {
                Some(id) => services.api.fetch_course_materials(id).await?,
                None => services.api.fetch_materials().await?,
            };
            if materials.is_empty() {
                println!("No materials.");
            }
            for material in &materials {
                let kind = material.file_type.as_deref().unwrap_or("file");
                let size = material.size.as_deref().unwrap_or("");
                println!("[{}] {} ({}) {}", material.id, material.name, kind, size);
            }
            Ok(())
        }
        Command::Assignments => {
            let assignments = services.api.fetch_assignments().await?;
            let now = Utc::now();
            if assignments.is_empty() {
                println!("No assignments.");
            }
            for assignment in &assignments {
                let due = assignment.due_date.as_deref().unwrap_or("no due date");
                let flag = if assignment.is_overdue(now) { " OVERDUE" } else { "" };
                let grade = assignment
                    .grade_display()
                    .map(|g| format!(" grade {}", g))
                    .unwrap_or_default();
                println!(
                    "[{}] {} - {} (due {}){}{}",
                    assignment.id, assignment.title, assignment.status, due, grade, flag
                );
            }
            Ok(())
        }
        Command::Exams => {
            let exams = services.api.fetch_exams().await?;
            if exams.is_empty() {
                println!("No exams.");
            }
            for exam in &exams {
                let score = exam
                    .percentage()
                    .map(|p| format!(" {:.1}%", p))
                    .unwrap_or_default();
                let start = exam.start_time.as_deref().unwrap_or("unscheduled");
                println!("[{}] {} - {} ({}){}", exam.id, exam.title, exam.status, start, score);
            }
            Ok(())
        }
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn login(services: &Services, config: &Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| std::env::var(ENV_EMAIL).ok()) {
        Some(email) => email,
        None => {
            let remembered = config.last_email.clone().unwrap_or_default();
            let label = if remembered.is_empty() {
                "Email: ".to_string()
            } else {
                format!("Email [{}]: ", remembered)
            };
            let typed = prompt_line(&label)?;
            if typed.is_empty() {
                remembered
            } else {
                typed
            }
        }
    };
    if email.trim().is_empty() {
        bail!("Email is required");
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    println!("Logging in...");
    let outcome = services
        .session
        .login(&LoginRequest::new(email.trim(), password))
        .await?;

    if let Err(e) = Config::remember_email(email.trim()) {
        debug!(error = %e, "Could not remember login email");
    }

    info!("Session stored");
    match outcome.user.first_name() {
        "" => println!("Welcome!"),
        name => println!("Welcome, {}!", name),
    }
    Ok(())
}

async fn dashboard(services: &Services) -> Result<()> {
    let api = &services.api;
    let (programs, courses, assignments, exams) = futures::join!(
        api.fetch_enrolled_programs(),
        api.fetch_courses(),
        api.fetch_assignments(),
        api.fetch_exams(),
    );

    // An invalidated session fails every request the same way.
    let programs = match programs {
        Err(e) if e.is_session_invalidated() => return Err(e.into()),
        other => other,
    };
    let courses = match courses {
        Err(e) if e.is_session_invalidated() => return Err(e.into()),
        other => other,
    };
    let assignments = match assignments {
        Err(e) if e.is_session_invalidated() => return Err(e.into()),
        other => other,
    };
    let exams = match exams {
        Err(e) if e.is_session_invalidated() => return Err(e.into()),
        other => other,
    };

    if let Some(user) = services.session.current_user().await {
        if !user.first_name().is_empty() {
            println!("Hello, {}!\n", user.first_name());
        }
    }

    match programs {
        Ok(programs) => {
            println!("Enrolled programs: {}", programs.len());
            for program in &programs {
                println!("  {} - {}", program.name, program.course_summary());
            }
        }
        Err(e) => println!("Enrolled programs: unavailable ({})", e),
    }

    match courses {
        Ok(courses) => println!("Courses: {}", courses.len()),
        Err(e) => println!("Courses: unavailable ({})", e),
    }

    match assignments {
        Ok(assignments) => {
            let now = Utc::now();
            let overdue: Vec<_> = assignments.iter().filter(|a| a.is_overdue(now)).collect();
            println!("Assignments: {} ({} overdue)", assignments.len(), overdue.len());
            for assignment in overdue {
                println!("  overdue: {}", assignment.title);
            }
        }
        Err(e) => println!("Assignments: unavailable ({})", e),
    }

    match exams {
        Ok(exams) => {
            let upcoming: Vec<_> = exams
                .iter()
                .filter(|e| e.status == ExamStatus::Upcoming)
                .collect();
            println!("Exams: {} ({} upcoming)", exams.len(), upcoming.len());
            for exam in upcoming {
                println!(
                    "  upcoming: {} ({})",
                    exam.title,
                    exam.start_time.as_deref().unwrap_or("unscheduled")
                );
            }
        }
        Err(e) => println!("Exams: unavailable ({})", e),
    }

    Ok(())
}
