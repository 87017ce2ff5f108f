//! Task statements.

use super::{SqlBackend, SqlEngine};
use crate::adapters::sql::convert::{encode_tags, opt_column};
use crate::adapters::sql::rows::{CountRow, TASK_COLUMNS, TaskRow};
use crate::adapters::sql::{Conditions, SqlValue, Statement, like_contains};
use crate::domain::{ProjectId, Task, TaskId};
use crate::ports::{NextTaskCriteria, PersistenceResult, TaskQuery, TaskSortKey};

const TASK_FIELDS: &str = concat!(
    "title, description, status, assignee, priority, project_id, tags, created_at, updated_at, ",
    "completed_at, due_date, order_num, external_id, external_url, sync_status, ",
    "work_started_file_count"
);

const TASK_VALUES: &str = concat!(
    ":title, :description, :status, :assignee, :priority, :project_id, :tags, :created_at, ",
    ":updated_at, :completed_at, :due_date, :order_num, :external_id, :external_url, ",
    ":sync_status, :work_started_file_count"
);

const TASK_ASSIGNMENTS: &str = concat!(
    "title = :title, description = :description, status = :status, assignee = :assignee, ",
    "priority = :priority, project_id = :project_id, tags = :tags, created_at = :created_at, ",
    "updated_at = :updated_at, completed_at = :completed_at, due_date = :due_date, ",
    "order_num = :order_num, external_id = :external_id, external_url = :external_url, ",
    "sync_status = :sync_status, work_started_file_count = :work_started_file_count"
);

fn bind_task(statement: Statement, task: &Task) -> PersistenceResult<Statement> {
    let external = task.external();
    Ok(statement
        .bind("id", SqlValue::text(task.id().as_str()))
        .bind("title", SqlValue::text(task.title()))
        .bind("description", SqlValue::opt_text(task.description()))
        .bind("status", SqlValue::text(task.status().as_str()))
        .bind("assignee", SqlValue::opt_text(task.assignee()))
        .bind("priority", SqlValue::big_int(i64::from(task.priority().value())))
        .bind("project_id", SqlValue::opt_text(task.project_id().map(ProjectId::as_str)))
        .bind("tags", SqlValue::Text(encode_tags(task.tags())))
        .bind("created_at", SqlValue::timestamp(task.created_at()))
        .bind("updated_at", SqlValue::timestamp(task.updated_at()))
        .bind("completed_at", SqlValue::opt_timestamp(task.completed_at()))
        .bind("due_date", SqlValue::opt_timestamp(task.due_date()))
        .bind("order_num", SqlValue::big_int(task.order_num()))
        .bind("external_id", SqlValue::opt_text(external.external_id.as_deref()))
        .bind("external_url", SqlValue::opt_text(external.external_url.as_deref()))
        .bind("sync_status", SqlValue::opt_text(external.sync_status.as_deref()))
        .bind(
            "work_started_file_count",
            SqlValue::opt_big_int(opt_column(task.work_started_file_count())?),
        ))
}

fn sort_column(key: TaskSortKey) -> &'static str {
    match key {
        TaskSortKey::Id => "{tasks.key}",
        other => other.as_str(),
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> PersistenceResult<Vec<Task>> {
    rows.into_iter().map(TaskRow::into_task).collect()
}

impl<B: SqlBackend> SqlEngine<B> {
    pub(super) fn insert_task(&mut self, task: &Task) -> PersistenceResult<Task> {
        self.atomically(|engine| {
            let next: Vec<CountRow> = engine.load(
                "create task",
                &Statement::new(
                    "SELECT CAST(COALESCE(MAX(order_num), 0) + 1 AS BIGINT) AS value FROM tasks",
                ),
            )?;
            let mut stored = task.clone();
            stored.set_order_num(next.first().map_or(1, |row| row.value));
            let statement = bind_task(
                Statement::new(format!(
                    "INSERT INTO tasks ({{tasks.key}}, {TASK_FIELDS}) VALUES (:id, {TASK_VALUES})"
                )),
                &stored,
            )?;
            engine.execute("create task", &statement)?;
            Ok(stored)
        })
    }

    pub(super) fn find_task(&mut self, id: &TaskId) -> PersistenceResult<Option<Task>> {
        let rows: Vec<TaskRow> = self.load(
            "get task",
            &Statement::new(format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE {{tasks.key}} = :id"
            ))
            .bind("id", SqlValue::text(id.as_str())),
        )?;
        rows.into_iter().next().map(TaskRow::into_task).transpose()
    }

    pub(super) fn save_task(&mut self, task: &Task) -> PersistenceResult<bool> {
        let statement = bind_task(
            Statement::new(format!(
                "UPDATE tasks SET {TASK_ASSIGNMENTS} WHERE {{tasks.key}} = :id"
            )),
            task,
        )?;
        Ok(self.execute("update task", &statement)? > 0)
    }

    pub(super) fn remove_task(&mut self, id: &TaskId) -> PersistenceResult<bool> {
        let key = SqlValue::text(id.as_str());
        self.atomically(|engine| {
            engine.execute(
                "delete task",
                &Statement::new("DELETE FROM file_associations WHERE task_id = :id")
                    .bind("id", key.clone()),
            )?;
            engine.execute(
                "delete task",
                &Statement::new("DELETE FROM {relationships} WHERE parent_id = :id OR child_id = :id")
                    .bind("id", key.clone()),
            )?;
            let removed = engine.execute(
                "delete task",
                &Statement::new("DELETE FROM tasks WHERE {tasks.key} = :id").bind("id", key.clone()),
            )?;
            Ok(removed > 0)
        })
    }

    pub(super) fn query_tasks(&mut self, query: &TaskQuery) -> PersistenceResult<Vec<Task>> {
        let filter = &query.filter;
        let mut conditions = Conditions::default();
        if let Some(status) = &filter.status {
            conditions.push_bound("status = :status", "status", SqlValue::text(status.to_ascii_uppercase()));
        }
        if let Some(assignee) = &filter.assignee {
            conditions.push_bound("assignee = :assignee", "assignee", SqlValue::text(assignee.as_str()));
        }
        if let Some(project_id) = &filter.project_id {
            conditions.push_bound("project_id = :project_id", "project_id", SqlValue::text(project_id.as_str()));
        }
        if let Some(priority) = filter.priority {
            conditions.push_bound(
                "priority = :priority",
                "priority",
                SqlValue::big_int(i64::from(priority.value())),
            );
        }
        if let Some(excluded) = &filter.exclude_status {
            conditions.push_bound(
                "(status IS NULL OR status <> :exclude_status)",
                "exclude_status",
                SqlValue::text(excluded.to_ascii_uppercase()),
            );
        }
        if let Some(tag) = &filter.tag {
            conditions.push_bound("tags LIKE :tag ESCAPE '\\'", "tag", SqlValue::text(like_contains(tag)));
        }

        let column = sort_column(query.sort);
        let direction = if query.descending { "DESC" } else { "ASC" };
        let where_clause = conditions.where_clause();
        let mut sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks{where_clause} \
             ORDER BY ({column} IS NULL), {column} {direction}, {{tasks.key}} ASC"
        );
        if query.limit.is_some() {
            sql.push_str(" LIMIT :limit");
        }
        let mut statement = conditions.apply(Statement::new(sql));
        if let Some(limit) = query.limit {
            statement = statement.bind("limit", SqlValue::big_int(i64::from(limit)));
        }
        into_tasks(self.load("list tasks", &statement)?)
    }

    pub(super) fn find_next_task(&mut self, criteria: &NextTaskCriteria) -> PersistenceResult<Option<Task>> {
        let mut conditions = Conditions::default();
        if let Some(assignee) = &criteria.assignee {
            conditions.push_bound("assignee = :assignee", "assignee", SqlValue::text(assignee.as_str()));
        }
        if let Some(project_id) = &criteria.project_id {
            conditions.push_bound("project_id = :project_id", "project_id", SqlValue::text(project_id.as_str()));
        }
        if !criteria.excluded_states.is_empty() {
            let names: Vec<String> = (0..criteria.excluded_states.len())
                .map(|position| format!(":excluded_{position}"))
                .collect();
            conditions.push(format!("status NOT IN ({})", names.join(", ")));
            for (position, state) in criteria.excluded_states.iter().enumerate() {
                conditions.bind(format!("excluded_{position}"), SqlValue::text(state.to_ascii_uppercase()));
            }
        }
        let where_clause = conditions.where_clause();
        let statement = conditions.apply(Statement::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks{where_clause} \
             ORDER BY COALESCE(priority, 3) DESC, created_at ASC, order_num ASC LIMIT 1"
        )));
        let rows: Vec<TaskRow> = self.load("get next task", &statement)?;
        rows.into_iter().next().map(TaskRow::into_task).transpose()
    }

    pub(super) fn move_task(&mut self, id: &TaskId, position: i64) -> PersistenceResult<bool> {
        let Some(task) = self.find_task(id)? else {
            return Ok(false);
        };
        let current = task.order_num();
        self.atomically(|engine| {
            let last: Vec<CountRow> = engine.load(
                "reorder task",
                &Statement::new("SELECT CAST(COALESCE(MAX(order_num), 0) AS BIGINT) AS value FROM tasks"),
            )?;
            let target = position.min(last.first().map_or(current, |row| row.value)).max(1);
            if target < current {
                engine.execute(
                    "reorder task",
                    &Statement::new(
                        "UPDATE tasks SET order_num = order_num + 1 WHERE order_num >= :target AND order_num < :current",
                    )
                    .bind("target", SqlValue::big_int(target))
                    .bind("current", SqlValue::big_int(current)),
                )?;
            } else if target > current {
                engine.execute(
                    "reorder task",
                    &Statement::new(
                        "UPDATE tasks SET order_num = order_num - 1 WHERE order_num > :current AND order_num <= :target",
                    )
                    .bind("target", SqlValue::big_int(target))
                    .bind("current", SqlValue::big_int(current)),
                )?;
            }
            let moved = engine.execute(
                "reorder task",
                &Statement::new("UPDATE tasks SET order_num = :target WHERE {tasks.key} = :id")
                    .bind("target", SqlValue::big_int(target))
                    .bind("id", SqlValue::text(id.as_str())),
            )?;
            Ok(moved > 0)
        })
    }

    pub(super) fn tasks_referencing(&mut self, path: &str) -> PersistenceResult<Vec<Task>> {
        let statement = Statement::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE {{tasks.key}} IN \
             (SELECT task_id FROM file_associations WHERE file_path = :path) ORDER BY {{tasks.key}} ASC"
        ))
        .bind("path", SqlValue::text(path));
        into_tasks(self.load("list tasks for file", &statement)?)
    }
}
