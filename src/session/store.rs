use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::ids::IdGenerator;
use crate::error::StoreError;

/// Id prefix for student sessions.
pub const STUDENT_SESSION_ID_PREFIX: &str = "adm_student_session";

/// Lifecycle status of an ADM session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, not yet open to students
    Draft,
    /// Open
    Active,
}

/// Progress of one student within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentSessionStatus {
    NotStarted,
    Validated,
}

/// A session with its student counts.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: String,
    pub label: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub student_count: usize,
    pub validated_count: usize,
}

/// Parameters for creating a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSessionParams {
    pub id: String,
    pub label: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_by_login: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// One student's enrolment in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSession {
    pub id: String,
    pub session_id: String,
    pub student_login: String,
    pub status: StudentSessionStatus,
    pub current_revision: u32,
    pub locked_by_student: bool,
    pub locked_by_admin: bool,
}

/// Storage for sessions and their students.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// All sessions with counts, newest `start_at` first.
    async fn list_summaries(&self) -> Result<Vec<SessionSummary>, StoreError>;

    /// Create a session and enrol `student_logins` in it. Either everything
    /// is stored or nothing is.
    async fn insert_session_with_students(
        &self,
        params: CreateSessionParams,
        student_logins: &[String],
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
struct SessionRecord {
    params: CreateSessionParams,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<String, SessionRecord>,
    students: Vec<StudentSession>,
}

/// Process-local [`SessionStore`].
#[derive(Debug)]
pub struct InMemorySessionStore {
    ids: Arc<IdGenerator>,
    tables: RwLock<Tables>,
}

impl InMemorySessionStore {
    /// Create an empty store minting student-session ids from `ids`.
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self {
            ids,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Student sessions of `session_id`, ordered by login.
    pub async fn students_for(&self, session_id: &str) -> Vec<StudentSession> {
        let tables = self.tables.read().await;
        let mut students: Vec<StudentSession> = tables
            .students
            .iter()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect();
        students.sort_by(|a, b| a.student_login.cmp(&b.student_login));
        students
    }

    /// Change a student session's status. Returns `false` if unknown.
    pub async fn set_student_status(&self, id: &str, status: StudentSessionStatus) -> bool {
        let mut tables = self.tables.write().await;
        match tables.students.iter_mut().find(|s| s.id == id) {
            Some(student) => {
                student.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn list_summaries(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let tables = self.tables.read().await;

        let mut summaries: Vec<SessionSummary> = tables
            .sessions
            .values()
            .map(|record| {
                let students = tables
                    .students
                    .iter()
                    .filter(|s| s.session_id == record.params.id);
                let (student_count, validated_count) =
                    students.fold((0, 0), |(total, validated), s| {
                        let is_validated = s.status == StudentSessionStatus::Validated;
                        (total + 1, validated + usize::from(is_validated))
                    });

                SessionSummary {
                    id: record.params.id.clone(),
                    label: record.params.label.clone(),
                    start_at: record.params.start_at,
                    end_at: record.params.end_at,
                    status: record.params.status,
                    created_at: record.created_at,
                    updated_at: record.updated_at,
                    student_count,
                    validated_count,
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.start_at.cmp(&a.start_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn insert_session_with_students(
        &self,
        params: CreateSessionParams,
        student_logins: &[String],
    ) -> Result<(), StoreError> {
        // Build every row before taking the write lock so a failure leaves
        // the tables untouched.
        let mut students = Vec::with_capacity(student_logins.len());
        for login in student_logins.iter().filter(|l| !l.is_empty()) {
            students.push(StudentSession {
                id: self.ids.generate(STUDENT_SESSION_ID_PREFIX)?,
                session_id: params.id.clone(),
                student_login: login.clone(),
                status: StudentSessionStatus::NotStarted,
                current_revision: 1,
                locked_by_student: false,
                locked_by_admin: false,
            });
        }

        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&params.id) {
            return Err(StoreError::Duplicate(params.id));
        }

        debug!(
            session_id = %params.id,
            students = students.len(),
            "Inserting session"
        );

        let now = Utc::now();
        tables.students.extend(students);
        tables.sessions.insert(
            params.id.clone(),
            SessionRecord {
                params,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }
}
