//! Shared world state for strict completion gate scenarios.

use mockable::DefaultClock;
use rstest::fixture;
use std::sync::Arc;
use tracline::adapters::sqlite::SqliteEngine;
use tracline::config::StrictModeConfig;
use tracline::domain::TaskId;
use tracline::ports::PersistenceEngine;
use tracline::services::{
    LifecycleResult, SessionContext, TaskLifecycleService, TaskService, TeamService, Transition, Workflow,
};

/// Scenario world for strict-mode behaviour tests.
pub struct StrictModeWorld {
    pub engine: SqliteEngine,
    pub workflow: Arc<Workflow>,
    pub strict: Arc<StrictModeConfig>,
    pub clock: Arc<DefaultClock>,
    pub task_id: Option<TaskId>,
    pub last_move: Option<LifecycleResult<Transition>>,
}

impl StrictModeWorld {
    /// Creates a world over an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        let mut engine = SqliteEngine::in_memory();
        engine.connect().expect("in-memory store should connect");
        Self {
            engine,
            workflow: Arc::new(Workflow::default()),
            strict: Arc::new(StrictModeConfig::default()),
            clock: Arc::new(DefaultClock),
            task_id: None,
            last_move: None,
        }
    }

    /// Task the scenario is about.
    pub fn current_task(&self) -> Result<TaskId, eyre::Report> {
        self.task_id
            .clone()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Task façade acting as the scenario's assignee.
    pub fn tasks(&mut self) -> TaskService<'_, SqliteEngine, DefaultClock> {
        let context = SessionContext {
            default_assignee: Some("alice".to_owned()),
            ..SessionContext::default()
        };
        TaskService::new(&mut self.engine, context, Arc::clone(&self.clock))
    }

    /// Team façade acting as the project administrator.
    pub fn team(&mut self) -> TeamService<'_, SqliteEngine, DefaultClock> {
        TeamService::new(&mut self.engine, Arc::clone(&self.clock)).acting_as("admin")
    }

    /// Lifecycle service with the default workflow.
    pub fn lifecycle(&mut self) -> TaskLifecycleService<'_, SqliteEngine, DefaultClock> {
        TaskLifecycleService::new(
            &mut self.engine,
            Arc::clone(&self.workflow),
            Arc::clone(&self.strict),
            Arc::clone(&self.clock),
        )
    }
}

impl Default for StrictModeWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> StrictModeWorld {
    StrictModeWorld::default()
}
