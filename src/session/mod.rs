//! Session collaborator: storage for ADM sessions and the id generator.
//!
//! The HTTP handlers depend only on the [`SessionStore`] trait;
//! [`InMemorySessionStore`] is the implementation wired in by the binary.

mod ids;
mod store;

pub use ids::IdGenerator;
pub use store::{
    CreateSessionParams, InMemorySessionStore, SessionStatus, SessionStore, SessionSummary,
    StudentSession, StudentSessionStatus, STUDENT_SESSION_ID_PREFIX,
};
