//! Builds an engine from [`DatabaseConfig`].

use super::postgres::PostgresEngine;
use super::sqlite::SqliteEngine;
use crate::config::{CONFIG_DIR, DATABASE_FILE, DatabaseConfig, home_dir};
use crate::ports::{BackendKind, PersistenceEngine, PersistenceError, PersistenceResult};
use camino::Utf8PathBuf;

/// Boxed engine handed to callers that pick the backend at run time.
pub type DynEngine = Box<dyn PersistenceEngine + Send>;

/// Maps a configured engine name onto a backend family.
///
/// # Errors
///
/// Returns [`PersistenceError::UnsupportedEngine`] for any other name.
pub fn backend_kind(engine: &str) -> PersistenceResult<BackendKind> {
    match engine.trim().to_ascii_lowercase().as_str() {
        "sqlite" | "sqlite3" => Ok(BackendKind::Sqlite),
        "postgresql" | "postgres" => Ok(BackendKind::Postgres),
        _ => Err(PersistenceError::UnsupportedEngine(engine.to_owned())),
    }
}

/// Creates an unconnected engine.
///
/// # Errors
///
/// Returns [`PersistenceError::UnsupportedEngine`] for an unknown engine
/// name.
pub fn create_engine(config: &DatabaseConfig) -> PersistenceResult<DynEngine> {
    let engine: DynEngine = match backend_kind(&config.engine)? {
        BackendKind::Sqlite => Box::new(SqliteEngine::open_path(sqlite_path(config))),
        BackendKind::Postgres => Box::new(PostgresEngine::with_url(postgres_url(config))),
    };
    tracing::debug!(backend = %engine.backend(), "created persistence engine");
    Ok(engine)
}

/// Creates an engine and connects it.
///
/// # Errors
///
/// Returns the errors of [`create_engine`] and
/// [`PersistenceEngine::connect`].
pub fn connect_engine(config: &DatabaseConfig) -> PersistenceResult<DynEngine> {
    let mut engine = create_engine(config)?;
    engine.connect()?;
    Ok(engine)
}

/// SQLite database file: `url`, then `path`, then
/// `~/.tracline/tracline.db`. A leading `~/` expands to the home directory.
#[must_use]
pub fn sqlite_path(config: &DatabaseConfig) -> Utf8PathBuf {
    let configured = config
        .url
        .as_deref()
        .or(config.path.as_deref())
        .map(str::trim)
        .filter(|path| !path.is_empty());
    let Some(raw) = configured else {
        return home_dir()
            .unwrap_or_default()
            .join(CONFIG_DIR)
            .join(DATABASE_FILE);
    };
    match (raw.strip_prefix("~/"), home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => Utf8PathBuf::from(raw),
    }
}

/// `PostgreSQL` connection string: `url` verbatim, otherwise a key/value
/// conninfo string built from the individual settings.
#[must_use]
pub fn postgres_url(config: &DatabaseConfig) -> String {
    if let Some(url) = config.url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
        return url.to_owned();
    }
    let mut parts = vec![
        format!("host={}", conninfo_value(&config.host)),
        format!("port={}", config.port),
        format!("dbname={}", conninfo_value(&config.name)),
        format!("user={}", conninfo_value(&config.user)),
    ];
    if let Some(password) = &config.password {
        parts.push(format!("password={}", conninfo_value(password)));
    }
    parts.join(" ")
}

fn conninfo_value(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
