//! Log entry statements.

use super::{SqlBackend, SqlEngine};
use crate::adapters::sql::convert::to_count;
use crate::adapters::sql::rows::{CountRow, IdRow, LOG_COLUMNS, LogRow};
use crate::adapters::sql::{Conditions, SqlValue, Statement};
use crate::domain::{LogEntry, NewLogEntry, TaskId};
use crate::ports::{LogQuery, PersistenceError, PersistenceResult};

fn log_conditions(query: &LogQuery) -> Conditions {
    let mut conditions = Conditions::default();
    if let Some(task_id) = &query.task_id {
        conditions.push_bound("task_id = :task_id", "task_id", SqlValue::text(task_id.as_str()));
    }
    if !query.entry_types.is_empty() {
        let names: Vec<String> = (0..query.entry_types.len())
            .map(|position| format!(":entry_type_{position}"))
            .collect();
        conditions.push(format!("entry_type IN ({})", names.join(", ")));
        for (position, entry_type) in query.entry_types.iter().enumerate() {
            conditions.bind(format!("entry_type_{position}"), SqlValue::text(entry_type.as_str()));
        }
    }
    if let Some(after_id) = query.after_id {
        conditions.push_bound("id > :after_id", "after_id", SqlValue::big_int(after_id));
    }
    conditions
}

impl<B: SqlBackend> SqlEngine<B> {
    pub(super) fn append_log(&mut self, entry: &NewLogEntry) -> PersistenceResult<LogEntry> {
        let statement = Statement::new(
            "INSERT INTO log_entries (\"timestamp\", level, entry_type, message, task_id, \"user\", metadata) \
             VALUES (:timestamp, :level, :entry_type, :message, :task_id, :user, :metadata) \
             RETURNING CAST(id AS BIGINT) AS id",
        )
        .bind("timestamp", SqlValue::timestamp(entry.timestamp))
        .bind("level", SqlValue::text(entry.level.as_str()))
        .bind("entry_type", SqlValue::text(entry.entry_type.as_str()))
        .bind("message", SqlValue::text(entry.message.as_str()))
        .bind("task_id", SqlValue::opt_text(entry.task_id.as_ref().map(TaskId::as_str)))
        .bind("user", SqlValue::opt_text(entry.user.as_deref()))
        .bind("metadata", SqlValue::json_object(&entry.metadata));
        let rows: Vec<IdRow> = self.load("add log entry", &statement)?;
        let id = rows
            .first()
            .map(|row| row.id)
            .ok_or_else(|| PersistenceError::InvalidData("add log entry returned no identifier".to_owned()))?;
        Ok(LogEntry {
            id,
            timestamp: entry.timestamp,
            level: entry.level,
            entry_type: entry.entry_type,
            message: entry.message.clone(),
            task_id: entry.task_id.clone(),
            user: entry.user.clone(),
            metadata: entry.metadata.clone(),
        })
    }

    pub(super) fn query_logs(&mut self, query: &LogQuery) -> PersistenceResult<Vec<LogEntry>> {
        let conditions = log_conditions(query);
        let where_clause = conditions.where_clause();
        let limit = if query.limit.is_some() { " LIMIT :limit" } else { "" };
        let mut statement = conditions.apply(Statement::new(format!(
            "SELECT {LOG_COLUMNS} FROM log_entries{where_clause} ORDER BY id DESC{limit}"
        )));
        if let Some(rows) = query.limit {
            statement = statement.bind("limit", SqlValue::big_int(i64::from(rows)));
        }
        let rows: Vec<LogRow> = self.load("list log entries", &statement)?;
        rows.into_iter().map(LogRow::into_entry).collect()
    }

    pub(super) fn count_logs(&mut self, query: &LogQuery) -> PersistenceResult<u64> {
        let conditions = log_conditions(query);
        let where_clause = conditions.where_clause();
        let statement = conditions.apply(Statement::new(format!(
            "SELECT CAST(COUNT(*) AS BIGINT) AS value FROM log_entries{where_clause}"
        )));
        let rows: Vec<CountRow> = self.load("count log entries", &statement)?;
        Ok(rows.first().map_or(0, |row| to_count(row.value)))
    }
}
