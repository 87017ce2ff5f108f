//! Configuration file and environment overrides.
//!
//! [`TracLineConfig`] is read from YAML. Every section is optional and
//! falls back to its defaults. Environment variables from a fixed list are
//! applied on top, see [`TracLineConfig::apply_env_overrides`].

use crate::domain::{ProjectId, StrictFlags, TaskPriority};
use crate::services::{SessionContext, Workflow, WorkflowError};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Directory under the home directory holding the default files.
pub const CONFIG_DIR: &str = ".tracline";
/// Default configuration file name.
pub const CONFIG_FILE: &str = "tracline.yaml";
/// Default SQLite database file name.
pub const DATABASE_FILE: &str = "tracline.db";

const TRUTHY: [&str; 4] = ["true", "1", "yes", "on"];

type OverrideSetter = fn(&mut StrictOverrides, bool);

const STRICT_VARIABLES: [(&str, OverrideSetter); 3] = [
    ("TRACLINE_STRICT_DOC_READ", set_doc_read),
    ("TRACLINE_STRICT_FILE_REF", set_file_ref),
    ("TRACLINE_STRICT_LOG_ENTRY", set_log_entry),
];

const fn set_doc_read(overrides: &mut StrictOverrides, value: bool) {
    overrides.doc_read = Some(value);
}

const fn set_file_ref(overrides: &mut StrictOverrides, value: bool) {
    overrides.file_ref = Some(value);
}

const fn set_log_entry(overrides: &mut StrictOverrides, value: bool) {
    overrides.log_entry = Some(value);
}

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("cannot read configuration {path}: {source}")]
    Read {
        /// File that failed.
        path: Utf8PathBuf,
        /// I/O failure.
        source: Arc<io::Error>,
    },
    /// The file is not valid configuration YAML.
    #[error("cannot parse configuration {path}: {source}")]
    Parse {
        /// File that failed.
        path: Utf8PathBuf,
        /// YAML failure.
        source: Arc<serde_yaml::Error>,
    },
    /// The workflow section is inconsistent.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Engine name: `sqlite`/`sqlite3` or `postgresql`/`postgres`.
    #[serde(rename = "type", alias = "engine_type", alias = "engine")]
    pub engine: String,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Login role.
    pub user: String,
    /// Login password.
    pub password: Option<String>,
    /// Connection URL; for SQLite, the database file.
    pub url: Option<String>,
    /// SQLite database file.
    pub path: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: "postgresql".to_owned(),
            host: "localhost".to_owned(),
            port: 5432,
            name: "tracline".to_owned(),
            user: "postgres".to_owned(),
            password: None,
            url: None,
            path: None,
        }
    }
}

impl DatabaseConfig {
    /// SQLite settings for the database file at `path`.
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            engine: "sqlite".to_owned(),
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// `PostgreSQL` settings for a connection URL.
    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self {
            engine: "postgresql".to_owned(),
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Workflow states and transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Intermediate states between `READY` and `DONE`, in order.
    pub custom_states: Vec<String>,
    /// Preferred targets per state; the first entry wins.
    pub transitions: BTreeMap<String, Vec<String>>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            custom_states: vec!["DOING".to_owned(), "TESTING".to_owned()],
            transitions: BTreeMap::new(),
        }
    }
}

/// Defaults applied when a caller leaves a field unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Assignee for new tasks and task listings.
    pub assignee: Option<String>,
    /// Current project.
    pub project: Option<String>,
    /// Priority for new tasks.
    pub priority: i64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            assignee: None,
            project: None,
            priority: 3,
        }
    }
}

/// Per-check strict-mode overrides; `None` defers to the next source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictOverrides {
    /// Document-read confirmation.
    pub doc_read: Option<bool>,
    /// New file reference.
    pub file_ref: Option<bool>,
    /// New log entry.
    pub log_entry: Option<bool>,
}

impl StrictOverrides {
    /// Fills unset checks from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            doc_read: self.doc_read.or(fallback.doc_read),
            file_ref: self.file_ref.or(fallback.file_ref),
            log_entry: self.log_entry.or(fallback.log_entry),
        }
    }

    /// Resolves against stored flags; unset checks take the stored value.
    #[must_use]
    pub fn resolve(self, stored: StrictFlags) -> StrictFlags {
        StrictFlags {
            doc_read: self.doc_read.unwrap_or(stored.doc_read),
            file_ref: self.file_ref.unwrap_or(stored.file_ref),
            log_entry: self.log_entry.unwrap_or(stored.log_entry),
        }
    }
}

/// Strict-mode overrides from configuration and environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictModeConfig {
    /// Turns every check off regardless of other settings.
    pub disabled: bool,
    /// Overrides for every project.
    pub global: StrictOverrides,
    /// Overrides per project id.
    pub projects: BTreeMap<String, StrictOverrides>,
}

impl StrictModeConfig {
    /// Configuration with every check switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// Overrides for `project_id`: project entries first, then global ones.
    ///
    /// Project keys match after [`env_project_key`] normalisation, so
    /// `web-app` and `WEB_APP` name the same project.
    #[must_use]
    pub fn overrides_for(&self, project_id: &ProjectId) -> StrictOverrides {
        let wanted = env_project_key(project_id.as_str());
        self.projects
            .iter()
            .find(|(key, _)| env_project_key(key) == wanted)
            .map_or(self.global, |(_, overrides)| overrides.or(self.global))
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracLineConfig {
    /// Storage.
    pub database: DatabaseConfig,
    /// Lifecycle states.
    pub workflow: WorkflowConfig,
    /// Caller defaults.
    pub defaults: DefaultsConfig,
    /// Completion gate overrides.
    pub strict: StrictModeConfig,
}

impl TracLineConfig {
    /// Parses YAML text; an empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns the YAML error for malformed input.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Reads the file at `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let read_error = |source: io::Error| ConfigError::Read {
            path: path.to_owned(),
            source: Arc::new(source),
        };
        let parent = path
            .parent()
            .filter(|dir| !dir.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let Some(file_name) = path.file_name() else {
            return Err(read_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "configuration path has no file name",
            )));
        };
        let text = match Dir::open_ambient_dir(parent, ambient_authority())
            .and_then(|dir| dir.read_to_string(file_name))
        {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(%path, "configuration file not found, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(read_error(err)),
        };
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source: Arc::new(source),
        })
    }

    /// Loads `TRACLINE_CONFIG` or `~/.tracline/tracline.yaml`, then applies
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("TRACLINE_CONFIG")
            .ok()
            .map(Utf8PathBuf::from)
            .or_else(|| home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE)))
            .unwrap_or_else(|| Utf8PathBuf::from(CONFIG_FILE));
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides(std::env::vars());
        Ok(config)
    }

    /// Applies recognised variables from `variables`.
    ///
    /// Database: `TRACLINE_DB_TYPE`, `TRACLINE_DB_URL`, `TRACLINE_DB_PATH`,
    /// `TRACLINE_DB_PASSWORD`. Defaults: `TRACLINE_ASSIGNEE` (else
    /// `TASK_ASSIGNEE`), `TRACLINE_PROJECT_ID` (else `TRACLINE_PROJECT`).
    /// Strict mode: `TRACLINE_DISABLE_STRICT_MODE`, and
    /// `TRACLINE_STRICT_{DOC_READ,FILE_REF,LOG_ENTRY}` with an optional
    /// `_<PROJECT>` suffix. Flags accept `true`, `1`, `yes` or `on`; any
    /// other value reads as `false`.
    pub fn apply_env_overrides<I, K, V>(&mut self, variables: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = variables
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        let lookup = |name: &str| vars.get(name).cloned();

        if let Some(engine) = lookup("TRACLINE_DB_TYPE") {
            self.database.engine = engine;
        }
        if let Some(url) = lookup("TRACLINE_DB_URL") {
            self.database.url = Some(url);
        }
        if let Some(path) = lookup("TRACLINE_DB_PATH") {
            self.database.path = Some(path);
        }
        if let Some(password) = lookup("TRACLINE_DB_PASSWORD") {
            self.database.password = Some(password);
        }
        if let Some(assignee) = lookup("TRACLINE_ASSIGNEE").or_else(|| lookup("TASK_ASSIGNEE")) {
            self.defaults.assignee = Some(assignee);
        }
        if let Some(project) = lookup("TRACLINE_PROJECT_ID").or_else(|| lookup("TRACLINE_PROJECT")) {
            self.defaults.project = Some(project);
        }
        if let Some(flag) = lookup("TRACLINE_DISABLE_STRICT_MODE") {
            self.strict.disabled = is_truthy(&flag);
        }

        for (prefix, set) in STRICT_VARIABLES {
            for (key, value) in &vars {
                let Some(rest) = key.strip_prefix(prefix) else {
                    continue;
                };
                if rest.is_empty() {
                    set(&mut self.strict.global, is_truthy(value));
                } else if let Some(project) = rest.strip_prefix('_').filter(|name| !name.is_empty()) {
                    let entry = self.strict.projects.entry(project.to_owned()).or_default();
                    set(entry, is_truthy(value));
                }
            }
        }
    }

    /// Builds the lifecycle state machine from the workflow section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Workflow`] when the section is inconsistent.
    pub fn build_workflow(&self) -> Result<Workflow, ConfigError> {
        Ok(Workflow::new(&self.workflow)?)
    }

    /// Caller context from the defaults section.
    ///
    /// A blank default project and an out-of-range priority are ignored.
    #[must_use]
    pub fn session(&self) -> SessionContext {
        SessionContext {
            default_assignee: self.defaults.assignee.clone(),
            current_project: self
                .defaults
                .project
                .as_deref()
                .and_then(|project| ProjectId::new(project).ok()),
            default_priority: TaskPriority::new(self.defaults.priority).ok(),
        }
    }
}

/// Returns `true` for `true`, `1`, `yes` and `on`, ignoring case.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    TRUTHY.contains(&lowered.as_str())
}

/// Normalises a project id the way environment variable suffixes spell it:
/// upper case, with `-` and spaces replaced by `_`.
#[must_use]
pub fn env_project_key(project_id: &str) -> String {
    project_id
        .trim()
        .chars()
        .map(|character| match character {
            '-' | ' ' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Home directory from `HOME`, or `USERPROFILE` on Windows.
#[must_use]
pub fn home_dir() -> Option<Utf8PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .filter(|home| !home.is_empty())
        .map(Utf8PathBuf::from)
}

#[cfg(test)]
mod tests;
