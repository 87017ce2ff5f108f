//! Completion gate enforced before a task enters `DONE`.
//!
//! Three checks run in order and the first failure wins:
//!
//! 1. documents attached to the task must be confirmed with a code derived
//!    from the task id;
//! 2. a file must have been attached since work started;
//! 3. a `work` or `user_action` entry must exist since the last reset.

use crate::config::StrictModeConfig;
use crate::domain::{FileAssociation, LogEntry, LogEntryType, StrictFlags, Task, TaskId, TaskStatus};
use crate::ports::{LogQuery, PersistenceEngine, PersistenceResult};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of document paths listed in a [`StrictViolation::DocumentReadRequired`].
pub const DOCUMENT_PREVIEW_LIMIT: usize = 5;

const CODE_LENGTH: usize = 3;

/// Code that confirms the documents of `task_id` were read.
///
/// The first three hex characters of the SHA-256 digest of the id,
/// upper-cased.
#[must_use]
pub fn confirmation_code(task_id: &TaskId) -> String {
    let digest = Sha256::digest(task_id.as_str().as_bytes());
    let hex: String = digest
        .iter()
        .take(CODE_LENGTH.div_ceil(2))
        .map(|byte| format!("{byte:02X}"))
        .collect();
    hex.chars().take(CODE_LENGTH).collect()
}

/// Reason a task may not enter `DONE` yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrictViolation {
    /// Attached documents have not been confirmed.
    #[error("document read confirmation required")]
    DocumentReadRequired {
        /// Code the caller must supply.
        required_code: String,
        /// First document paths.
        documents: Vec<String>,
        /// Documents not listed in `documents`.
        remaining: usize,
    },
    /// No file was attached since work started.
    #[error("a new file reference is required (baseline {baseline}, current {current})")]
    NewFileRequired {
        /// Files attached when work started.
        baseline: u64,
        /// Files attached now.
        current: u64,
    },
    /// The task has no attached files at all.
    #[error("at least one file reference is required")]
    FileReferenceRequired,
    /// No work was logged.
    #[error("a work log entry is required")]
    LogEntryRequired {
        /// Whether only entries after a status reset were considered.
        since_reset: bool,
    },
}

impl StrictViolation {
    /// Instructions for satisfying the check.
    #[must_use]
    pub fn remediation(&self) -> String {
        match self {
            Self::DocumentReadRequired {
                required_code,
                documents,
                remaining,
            } => {
                let mut lines = vec!["Read the attached documents:".to_owned()];
                lines.extend(documents.iter().map(|path| format!("  - {path}")));
                if *remaining > 0 {
                    lines.push(format!("  ... and {remaining} more"));
                }
                lines.push(format!("then confirm with code {required_code}."));
                lines.join("\n")
            }
            Self::NewFileRequired { baseline, current } => format!(
                "Attach a file created or changed for this task. {current} file(s) are attached, \
                 {baseline} were attached when work started."
            ),
            Self::FileReferenceRequired => "Attach at least one file to the task.".to_owned(),
            Self::LogEntryRequired { since_reset: true } => {
                "Record a work or user_action log entry since the task was last reset.".to_owned()
            }
            Self::LogEntryRequired { since_reset: false } => {
                "Record a work or user_action log entry for the task.".to_owned()
            }
        }
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictCheck {
    /// Whether the task may enter `DONE`.
    pub passed: bool,
    /// Confirmation code, when the document check applies to the task.
    pub required_token: Option<String>,
    /// First failing check.
    pub violation: Option<StrictViolation>,
}

impl StrictCheck {
    const fn pass(required_token: Option<String>) -> Self {
        Self {
            passed: true,
            required_token,
            violation: None,
        }
    }

    fn fail(required_token: Option<String>, violation: StrictViolation) -> Self {
        Self {
            passed: false,
            required_token,
            violation: Some(violation),
        }
    }
}

/// Evaluates the strict-mode checks. Never writes.
#[derive(Debug, Clone, Copy)]
pub struct StrictGate<'a> {
    config: &'a StrictModeConfig,
}

impl<'a> StrictGate<'a> {
    /// Creates a gate over the configured overrides.
    #[must_use]
    pub const fn new(config: &'a StrictModeConfig) -> Self {
        Self { config }
    }

    /// Resolves the active checks for `task`.
    ///
    /// Tasks outside a project and a disabled configuration get no checks.
    ///
    /// # Errors
    ///
    /// Returns an error when the project settings cannot be read.
    pub fn flags_for<E>(&self, engine: &mut E, task: &Task) -> PersistenceResult<StrictFlags>
    where
        E: PersistenceEngine + ?Sized,
    {
        let Some(project_id) = task.project_id() else {
            return Ok(StrictFlags::default());
        };
        if self.config.disabled {
            return Ok(StrictFlags::default());
        }
        let stored = engine
            .get_project_settings(project_id)?
            .map_or_else(StrictFlags::default, |settings| settings.strict);
        Ok(self.config.overrides_for(project_id).resolve(stored))
    }

    /// Runs the active checks against `task`.
    ///
    /// # Errors
    ///
    /// Returns an error when associations or log entries cannot be read.
    pub fn evaluate<E>(&self, engine: &mut E, task: &Task, token: Option<&str>) -> PersistenceResult<StrictCheck>
    where
        E: PersistenceEngine + ?Sized,
    {
        let flags = self.flags_for(engine, task)?;
        if !flags.any() {
            return Ok(StrictCheck::pass(None));
        }
        let files = if flags.doc_read || flags.file_ref {
            engine.list_file_associations(task.id())?
        } else {
            Vec::new()
        };

        let mut required_token = None;
        if flags.doc_read {
            let documents: Vec<&FileAssociation> = files.iter().filter(|file| file.is_document()).collect();
            if !documents.is_empty() {
                let code = confirmation_code(task.id());
                required_token = Some(code.clone());
                if token != Some(code.as_str()) {
                    let violation = StrictViolation::DocumentReadRequired {
                        required_code: code,
                        documents: documents
                            .iter()
                            .take(DOCUMENT_PREVIEW_LIMIT)
                            .map(|file| file.file_path.clone())
                            .collect(),
                        remaining: documents.len().saturating_sub(DOCUMENT_PREVIEW_LIMIT),
                    };
                    return Ok(reject(task, required_token, violation));
                }
            }
        }

        if flags.file_ref {
            let current = u64::try_from(files.len()).unwrap_or(u64::MAX);
            let violation = match task.work_started_file_count() {
                Some(baseline) if current <= baseline => Some(StrictViolation::NewFileRequired { baseline, current }),
                None if current == 0 => Some(StrictViolation::FileReferenceRequired),
                _ => None,
            };
            if let Some(found) = violation {
                return Ok(reject(task, required_token, found));
            }
        }

        if flags.log_entry {
            let reset = last_reset(engine, task.id())?;
            let mut query = LogQuery::for_task(task.id().clone()).of_types(LogEntryType::EVIDENCE);
            if let Some(reset_id) = reset {
                query = query.after(reset_id);
            }
            if engine.count_log_entries(&query)? == 0 {
                let violation = StrictViolation::LogEntryRequired {
                    since_reset: reset.is_some(),
                };
                return Ok(reject(task, required_token, violation));
            }
        }

        Ok(StrictCheck::pass(required_token))
    }
}

fn reject(task: &Task, required_token: Option<String>, violation: StrictViolation) -> StrictCheck {
    tracing::debug!(task_id = %task.id(), %violation, "strict mode rejected completion");
    StrictCheck::fail(required_token, violation)
}

/// Identifier of the newest status change that restarted work on the task.
fn last_reset<E>(engine: &mut E, task_id: &TaskId) -> PersistenceResult<Option<i64>>
where
    E: PersistenceEngine + ?Sized,
{
    let changes = engine.list_log_entries(&LogQuery::for_task(task_id.clone()).of_types([LogEntryType::StatusChanged]))?;
    Ok(changes.iter().find(|entry| is_reset(entry)).map(|entry| entry.id))
}

fn is_reset(entry: &LogEntry) -> bool {
    entry.status_change_states().is_some_and(|(old_state, new_state)| {
        new_state.eq_ignore_ascii_case(TaskStatus::TODO)
            || new_state.eq_ignore_ascii_case(TaskStatus::READY)
            || old_state.eq_ignore_ascii_case(TaskStatus::DONE)
    })
}
