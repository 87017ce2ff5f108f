//! Application services over a [`PersistenceEngine`].
//!
//! Services borrow the engine for their lifetime, so a boxed engine from
//! [`crate::adapters::factory`] is used through `&mut *engine`.

mod lifecycle;
mod strict;
mod tasks;
mod team;
mod workflow;

pub use lifecycle::{LifecycleError, LifecycleResult, TaskLifecycleService, Transition};
pub use strict::{DOCUMENT_PREVIEW_LIMIT, StrictCheck, StrictGate, StrictViolation, confirmation_code};
pub use tasks::{AttachFileRequest, TaskService, TaskUpdate};
pub use team::{MemberUpdate, ProjectUpdate, SettingsUpdate, TeamError, TeamResult, TeamService};
pub use workflow::{Workflow, WorkflowError, is_absorbing};

use crate::domain::{ProjectId, TaskPriority};
use crate::ports::{PersistenceEngine, PersistenceError};

/// Caller identity and scope used to fill unset fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Assignee for new tasks and listings.
    pub default_assignee: Option<String>,
    /// Project for new tasks and listings.
    pub current_project: Option<ProjectId>,
    /// Priority for new tasks that do not choose one.
    pub default_priority: Option<TaskPriority>,
}

/// Runs `work` inside a transaction.
///
/// Joins the caller's transaction when one is open; otherwise begins one,
/// commits on success and rolls back on failure.
///
/// # Errors
///
/// Returns the error of `work`, or of `begin`/`commit`.
pub fn within_transaction<E, T, Err, F>(engine: &mut E, work: F) -> Result<T, Err>
where
    E: PersistenceEngine + ?Sized,
    Err: From<PersistenceError>,
    F: FnOnce(&mut E) -> Result<T, Err>,
{
    if engine.in_transaction() {
        return work(engine);
    }
    engine.begin()?;
    match work(engine) {
        Ok(value) => {
            engine.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = engine.rollback() {
                tracing::warn!(error = %rollback_err, "rollback after failed write did not complete");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests;
