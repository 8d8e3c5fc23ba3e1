//! Prefixed, time-ordered identifiers.
//!
//! Ids look like `adm_session_0192b7c4e1a87c3d9f2e51b0a4c6d8e2`: a prefix,
//! an underscore, and a UUIDv7 in simple hex form. Within one generator ids
//! are strictly increasing, even when several are minted in the same
//! millisecond.

use std::sync::Mutex;

use uuid::{ContextV7, Timestamp, Uuid};

use crate::error::StoreError;

/// Generates ids for one server instance.
///
/// Each generator owns its v7 context, so separate generators (e.g. in
/// tests) never interfere.
pub struct IdGenerator {
    context: Mutex<ContextV7>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

impl IdGenerator {
    /// Create a new generator.
    pub fn new() -> Self {
        Self {
            context: Mutex::new(ContextV7::new()),
        }
    }

    /// Generate `"<prefix>_<uuid>"`.
    pub fn generate(&self, prefix: &str) -> Result<String, StoreError> {
        let uuid = self.next_uuid()?;
        Ok(format!("{}_{}", prefix, uuid.simple()))
    }

    fn next_uuid(&self) -> Result<Uuid, StoreError> {
        let context = self
            .context
            .lock()
            .map_err(|_| StoreError::IdGeneration("id generator lock poisoned".to_string()))?;

        Ok(Uuid::new_v7(Timestamp::now(&*context)))
    }
}
