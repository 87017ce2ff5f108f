//! Status transitions with strict-mode enforcement.

use super::strict::{StrictCheck, StrictGate, StrictViolation};
use super::{Workflow, within_transaction};
use crate::config::StrictModeConfig;
use crate::domain::{DomainError, NewLogEntry, Task, TaskId, TaskStatus};
use crate::ports::{PersistenceEngine, PersistenceError};
use camino::Utf8PathBuf;
use mockable::Clock;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Service-level errors for task operations.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// The task does not exist.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),
    /// The status is not part of the workflow.
    #[error("unknown status {0}")]
    UnknownStatus(String),
    /// Nothing follows the task's current state.
    #[error("task {task_id} cannot advance from {state}")]
    NoNextState {
        /// Task that stayed put.
        task_id: TaskId,
        /// Its current state.
        state: TaskStatus,
    },
    /// The completion gate rejected the transition.
    #[error("strict mode blocked completion: {0}")]
    StrictModeBlocked(StrictViolation),
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Storage failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// File metadata could not be read.
    #[error("cannot read file {path}: {source}")]
    Filesystem {
        /// File that failed.
        path: Utf8PathBuf,
        /// I/O failure.
        source: Arc<io::Error>,
    },
}

/// Result type for task services.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// A completed status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Task that moved.
    pub task_id: TaskId,
    /// State before the move.
    pub old_state: TaskStatus,
    /// State after the move.
    pub new_state: TaskStatus,
}

/// Moves tasks through the workflow.
pub struct TaskLifecycleService<'a, E, C>
where
    E: PersistenceEngine + ?Sized,
    C: Clock,
{
    engine: &'a mut E,
    workflow: Arc<Workflow>,
    strict: Arc<StrictModeConfig>,
    clock: Arc<C>,
}

impl<'a, E, C> TaskLifecycleService<'a, E, C>
where
    E: PersistenceEngine + ?Sized,
    C: Clock,
{
    /// Creates a lifecycle service over `engine`.
    #[must_use]
    pub const fn new(
        engine: &'a mut E,
        workflow: Arc<Workflow>,
        strict: Arc<StrictModeConfig>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            engine,
            workflow,
            strict,
            clock,
        }
    }

    /// Workflow used to resolve states.
    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Moves a task to the state that follows its current one.
    ///
    /// `confirmation` is the document-read code, needed only when the
    /// destination is `DONE` and the task has documents attached.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskNotFound`], [`LifecycleError::NoNextState`],
    /// [`LifecycleError::StrictModeBlocked`] (nothing is written then), or a
    /// storage error.
    pub fn advance_task(&mut self, task_id: &TaskId, confirmation: Option<&str>) -> LifecycleResult<Transition> {
        let task = self.load(task_id)?;
        let target = self
            .workflow
            .next_state(task.status())
            .ok_or_else(|| LifecycleError::NoNextState {
                task_id: task_id.clone(),
                state: task.status().clone(),
            })?;
        self.apply(task, target, confirmation)
    }

    /// Moves a task to an explicitly chosen state.
    ///
    /// Moving a task to the state it is already in writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownStatus`] for a state outside the
    /// workflow, and otherwise the errors of [`Self::advance_task`].
    pub fn change_status(
        &mut self,
        task_id: &TaskId,
        status: &str,
        confirmation: Option<&str>,
    ) -> LifecycleResult<Transition> {
        let target = self
            .workflow
            .parse(status)
            .ok_or_else(|| LifecycleError::UnknownStatus(status.trim().to_owned()))?;
        let task = self.load(task_id)?;
        if task.status() == &target {
            return Ok(Transition {
                task_id: task_id.clone(),
                old_state: target.clone(),
                new_state: target,
            });
        }
        self.apply(task, target, confirmation)
    }

    /// Evaluates the completion gate without moving the task.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskNotFound`] or a storage error.
    pub fn check_strict_requirements(&mut self, task_id: &TaskId, token: Option<&str>) -> LifecycleResult<StrictCheck> {
        let task = self.load(task_id)?;
        Ok(StrictGate::new(&self.strict).evaluate(&mut *self.engine, &task, token)?)
    }

    fn load(&mut self, task_id: &TaskId) -> LifecycleResult<Task> {
        self.engine
            .get_task(task_id)?
            .ok_or_else(|| LifecycleError::TaskNotFound(task_id.clone()))
    }

    fn apply(&mut self, task: Task, target: TaskStatus, confirmation: Option<&str>) -> LifecycleResult<Transition> {
        if target.is_done() {
            let check = StrictGate::new(&self.strict).evaluate(&mut *self.engine, &task, confirmation)?;
            if let Some(violation) = check.violation {
                return Err(LifecycleError::StrictModeBlocked(violation));
            }
        }

        let old_state = task.status().clone();
        let starts_work = self.workflow.starts_work(&old_state, &target);
        let clock = Arc::clone(&self.clock);
        let mut updated = task;
        let transition = Transition {
            task_id: updated.id().clone(),
            old_state,
            new_state: target.clone(),
        };
        within_transaction(&mut *self.engine, |engine| {
            if starts_work && updated.work_started_file_count().is_none() {
                let baseline = engine.count_file_associations(updated.id())?;
                updated.record_work_started(baseline);
            }
            updated.transition_to(target, &*clock);
            if !engine.update_task(&updated)? {
                return Err(LifecycleError::TaskNotFound(updated.id().clone()));
            }
            engine.add_log_entry(&NewLogEntry::status_change(
                &transition.task_id,
                &transition.old_state,
                &transition.new_state,
                clock.utc(),
            ))?;
            Ok(())
        })?;

        tracing::info!(
            task_id = %transition.task_id,
            from = %transition.old_state,
            to = %transition.new_state,
            "task status changed"
        );
        Ok(transition)
    }
}
