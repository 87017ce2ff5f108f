//! Workflow state machine.
//!
//! States are ordered `[TODO, READY, custom…, DONE, PENDING, CANCELED]`.
//! `PENDING` and `CANCELED` absorb: the default progression never enters
//! them.

use crate::config::WorkflowConfig;
use crate::domain::{DomainError, TaskStatus};
use std::collections::HashMap;
use thiserror::Error;

const FIXED_HEAD: [&str; 2] = [TaskStatus::TODO, TaskStatus::READY];
const FIXED_TAIL: [&str; 3] = [TaskStatus::DONE, TaskStatus::PENDING, TaskStatus::CANCELED];

/// Errors raised while building a [`Workflow`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// A state name is blank.
    #[error(transparent)]
    InvalidState(#[from] DomainError),
    /// A custom state reuses a fixed state name.
    #[error("custom state {0} shadows a fixed state")]
    ReservedState(String),
    /// A custom state is listed twice.
    #[error("custom state {0} is listed more than once")]
    DuplicateState(String),
    /// A transition mentions a state the workflow does not have.
    #[error("transition {from} -> {to} refers to an unknown state")]
    UnknownTransitionState {
        /// Source state.
        from: String,
        /// Target state.
        to: String,
    },
    /// A preferred transition moves backwards in the ordering.
    #[error("preferred transition {from} -> {to} does not move forward")]
    BackwardTransition {
        /// Source state.
        from: String,
        /// Target state.
        to: String,
    },
}

/// Ordered workflow states and preferred transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    states: Vec<TaskStatus>,
    custom_count: usize,
    transitions: HashMap<TaskStatus, Vec<TaskStatus>>,
}

impl Default for Workflow {
    fn default() -> Self {
        let states = FIXED_HEAD
            .iter()
            .chain(["DOING", "TESTING"].iter())
            .chain(FIXED_TAIL.iter())
            .filter_map(|name| TaskStatus::new(name).ok())
            .collect();
        Self {
            states,
            custom_count: 2,
            transitions: HashMap::new(),
        }
    }
}

impl Workflow {
    /// Builds and validates a workflow.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] when a custom state is blank, reserved or
    /// duplicated, when a transition names an unknown state, or when a
    /// preferred target lies behind its source.
    pub fn new(config: &WorkflowConfig) -> Result<Self, WorkflowError> {
        let mut custom: Vec<TaskStatus> = Vec::with_capacity(config.custom_states.len());
        for name in &config.custom_states {
            let state = TaskStatus::new(name)?;
            if FIXED_HEAD.contains(&state.as_str()) || FIXED_TAIL.contains(&state.as_str()) {
                return Err(WorkflowError::ReservedState(state.into()));
            }
            if custom.contains(&state) {
                return Err(WorkflowError::DuplicateState(state.into()));
            }
            custom.push(state);
        }

        let custom_count = custom.len();
        let states: Vec<TaskStatus> = FIXED_HEAD
            .iter()
            .filter_map(|name| TaskStatus::new(name).ok())
            .chain(custom)
            .chain(FIXED_TAIL.iter().filter_map(|name| TaskStatus::new(name).ok()))
            .collect();

        let mut workflow = Self {
            states,
            custom_count,
            transitions: HashMap::new(),
        };
        for (from, targets) in &config.transitions {
            let source = workflow.known(from, from, targets.first().map_or("", String::as_str))?;
            let resolved = targets
                .iter()
                .map(|to| workflow.known(to, from, to))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(first) = resolved.first() {
                workflow.ensure_forward(&source, first)?;
            }
            workflow.transitions.insert(source, resolved);
        }
        Ok(workflow)
    }

    fn known(&self, name: &str, from: &str, to: &str) -> Result<TaskStatus, WorkflowError> {
        let state = TaskStatus::new(name)?;
        if self.contains(&state) {
            Ok(state)
        } else {
            Err(WorkflowError::UnknownTransitionState {
                from: from.to_owned(),
                to: to.to_owned(),
            })
        }
    }

    fn ensure_forward(&self, from: &TaskStatus, to: &TaskStatus) -> Result<(), WorkflowError> {
        let moves_forward = match (self.position(from), self.position(to)) {
            (Some(source), Some(target)) => target > source,
            _ => false,
        };
        if moves_forward || is_absorbing(to) {
            Ok(())
        } else {
            Err(WorkflowError::BackwardTransition {
                from: from.as_str().to_owned(),
                to: to.as_str().to_owned(),
            })
        }
    }

    /// Every state in order.
    #[must_use]
    pub fn states(&self) -> &[TaskStatus] {
        &self.states
    }

    /// Configured intermediate states.
    #[must_use]
    pub fn custom_states(&self) -> &[TaskStatus] {
        self.states
            .get(FIXED_HEAD.len()..FIXED_HEAD.len() + self.custom_count)
            .unwrap_or_default()
    }

    /// `READY` followed by the configured intermediate states.
    #[must_use]
    pub fn active_states(&self) -> &[TaskStatus] {
        self.states
            .get(1..FIXED_HEAD.len() + self.custom_count)
            .unwrap_or_default()
    }

    /// Returns `true` when `state` belongs to this workflow.
    #[must_use]
    pub fn contains(&self, state: &TaskStatus) -> bool {
        self.states.contains(state)
    }

    /// Parses and validates a state name.
    ///
    /// Returns `None` for blank or unknown names.
    #[must_use]
    pub fn parse(&self, name: &str) -> Option<TaskStatus> {
        TaskStatus::new(name).ok().filter(|state| self.contains(state))
    }

    /// Index of `state` in the ordering.
    #[must_use]
    pub fn position(&self, state: &TaskStatus) -> Option<usize> {
        self.states.iter().position(|candidate| candidate == state)
    }

    /// Resolves the state that follows `current`.
    ///
    /// A configured transition wins; otherwise the next state in the
    /// ordering that is not absorbing. `None` when nothing follows.
    #[must_use]
    pub fn next_state(&self, current: &TaskStatus) -> Option<TaskStatus> {
        if let Some(preferred) = self.transitions.get(current).and_then(|targets| targets.first()) {
            return Some(preferred.clone());
        }
        let start = self.position(current)?;
        self.states
            .iter()
            .skip(start + 1)
            .find(|state| !is_absorbing(state))
            .cloned()
    }

    /// Returns `true` for a move out of `TODO` into an active state.
    #[must_use]
    pub fn starts_work(&self, from: &TaskStatus, to: &TaskStatus) -> bool {
        from.as_str() == TaskStatus::TODO && self.active_states().contains(to)
    }
}

/// Returns `true` for `PENDING` and `CANCELED`.
#[must_use]
pub fn is_absorbing(state: &TaskStatus) -> bool {
    matches!(state.as_str(), TaskStatus::PENDING | TaskStatus::CANCELED)
}
