//! Expected storage layout, shared by both backends.
//!
//! Tables and indexes are declared once with per-dialect column types. The
//! backends use this model to create missing tables, patch missing columns
//! and build indexes whose columns exist.

use super::{Dialect, SqlConnection};
use diesel::result::QueryResult;
use std::collections::{BTreeMap, BTreeSet};

/// One expected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: &'static str,
    /// Type and default on SQLite.
    pub sqlite: &'static str,
    /// Type and default on PostgreSQL.
    pub postgres: &'static str,
    /// `NOT NULL` when the table is created; patched columns are nullable.
    pub required: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, sqlite: &'static str, postgres: &'static str) -> Self {
        Self {
            name,
            sqlite,
            postgres,
            required: false,
        }
    }

    const fn text(name: &'static str) -> Self {
        Self::new(name, "TEXT", "TEXT")
    }

    const fn timestamp(name: &'static str) -> Self {
        Self::new(name, "TEXT", "TIMESTAMPTZ")
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Type and default for `dialect`.
    #[must_use]
    pub const fn definition(&self, dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Sqlite => self.sqlite,
            Dialect::Postgres => self.postgres,
        }
    }
}

/// Primary key shape of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySpec {
    /// The task key, whose physical name depends on the dialect.
    TaskKey,
    /// Storage-assigned integer `id`.
    Serial,
    /// Caller-assigned text key.
    Text(&'static str),
    /// Key declared through a table constraint.
    Constraint,
}

/// One expected table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Name used throughout the crate.
    pub logical: &'static str,
    /// Primary key.
    pub key: KeySpec,
    /// Non-key columns.
    pub columns: &'static [ColumnSpec],
    /// Table constraints appended to `CREATE TABLE`.
    pub constraints: &'static [&'static str],
}

impl TableSpec {
    /// Physical table name on `dialect`.
    #[must_use]
    pub fn physical(&self, dialect: Dialect) -> &'static str {
        if self.logical == "relationships" {
            dialect.relationships_table()
        } else {
            self.logical
        }
    }

    fn key_definition(&self, dialect: Dialect) -> Option<String> {
        match (self.key, dialect) {
            (KeySpec::TaskKey, _) => Some(format!("\"{}\" TEXT PRIMARY KEY", dialect.task_key())),
            (KeySpec::Serial, Dialect::Sqlite) => Some("\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_owned()),
            (KeySpec::Serial, Dialect::Postgres) => Some("\"id\" BIGSERIAL PRIMARY KEY".to_owned()),
            (KeySpec::Text(name), _) => Some(format!("\"{name}\" TEXT PRIMARY KEY")),
            (KeySpec::Constraint, _) => None,
        }
    }

    /// `CREATE TABLE IF NOT EXISTS` for `dialect`.
    #[must_use]
    pub fn create_sql(&self, dialect: Dialect) -> String {
        let parts: Vec<String> = self
            .key_definition(dialect)
            .into_iter()
            .chain(self.columns.iter().map(|column| {
                let null = if column.required { " NOT NULL" } else { "" };
                format!("\"{}\" {}{null}", column.name, column.definition(dialect))
            }))
            .chain(self.constraints.iter().map(|constraint| (*constraint).to_owned()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.physical(dialect),
            parts.join(", ")
        )
    }

    /// Additive `ALTER TABLE` for a missing column.
    #[must_use]
    pub fn add_column_sql(&self, dialect: Dialect, column: &ColumnSpec) -> String {
        let guard = match dialect {
            Dialect::Sqlite => "",
            Dialect::Postgres => "IF NOT EXISTS ",
        };
        format!(
            "ALTER TABLE {} ADD COLUMN {guard}\"{}\" {}",
            self.physical(dialect),
            column.name,
            column.definition(dialect)
        )
    }
}

/// One expected index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    /// Index name.
    pub name: &'static str,
    /// Logical table name.
    pub table: &'static str,
    /// Indexed columns, in order.
    pub columns: &'static [&'static str],
}

const TASK_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text("title").required(),
    ColumnSpec::text("description"),
    ColumnSpec::new("status", "TEXT DEFAULT 'TODO'", "TEXT DEFAULT 'TODO'").required(),
    ColumnSpec::text("assignee"),
    ColumnSpec::new("priority", "INTEGER DEFAULT 3", "INTEGER DEFAULT 3"),
    ColumnSpec::text("project_id"),
    ColumnSpec::text("tags"),
    ColumnSpec::timestamp("created_at").required(),
    ColumnSpec::timestamp("updated_at").required(),
    ColumnSpec::timestamp("completed_at"),
    ColumnSpec::timestamp("due_date"),
    ColumnSpec::new("order_num", "INTEGER DEFAULT 0", "INTEGER DEFAULT 0"),
    ColumnSpec::text("external_id"),
    ColumnSpec::text("external_url"),
    ColumnSpec::text("sync_status"),
    ColumnSpec::new("work_started_file_count", "INTEGER", "INTEGER"),
];

const RELATIONSHIP_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text("parent_id").required(),
    ColumnSpec::text("child_id").required(),
    ColumnSpec::new(
        "relationship_type",
        "TEXT DEFAULT 'parent-child'",
        "TEXT DEFAULT 'parent-child'",
    )
    .required(),
    ColumnSpec::timestamp("created_at").required(),
    ColumnSpec::text("created_by"),
];

const FILE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text("task_id").required(),
    ColumnSpec::text("file_path").required(),
    ColumnSpec::text("relative_path"),
    ColumnSpec::text("file_type"),
    ColumnSpec::text("description"),
    ColumnSpec::timestamp("created_at").required(),
    ColumnSpec::text("created_by"),
    ColumnSpec::timestamp("last_modified"),
    ColumnSpec::new("file_size", "INTEGER", "BIGINT"),
];

const LOG_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::timestamp("timestamp").required(),
    ColumnSpec::new("level", "TEXT DEFAULT 'INFO'", "TEXT DEFAULT 'INFO'"),
    ColumnSpec::text("entry_type").required(),
    ColumnSpec::text("message").required(),
    ColumnSpec::text("task_id"),
    ColumnSpec::text("user"),
    ColumnSpec::new("metadata", "TEXT", "JSONB"),
];

const MEMBER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text("name").required(),
    ColumnSpec::new("role", "TEXT DEFAULT 'ENGINEER'", "TEXT DEFAULT 'ENGINEER'").required(),
    ColumnSpec::new("position", "TEXT DEFAULT 'MEMBER'", "TEXT DEFAULT 'MEMBER'").required(),
    ColumnSpec::new("age", "INTEGER", "INTEGER"),
    ColumnSpec::text("sex"),
    ColumnSpec::text("profile"),
    ColumnSpec::text("leader_id"),
    ColumnSpec::text("profile_image_path"),
    ColumnSpec::timestamp("created_at").required(),
    ColumnSpec::timestamp("updated_at").required(),
];

const PROJECT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text("name").required(),
    ColumnSpec::text("description"),
    ColumnSpec::text("owner_id"),
    ColumnSpec::new("status", "TEXT DEFAULT 'ACTIVE'", "TEXT DEFAULT 'ACTIVE'"),
    ColumnSpec::timestamp("created_at").required(),
    ColumnSpec::timestamp("updated_at"),
];

const MEMBERSHIP_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::text("project_id").required(),
    ColumnSpec::text("member_id").required(),
    ColumnSpec::timestamp("joined_at").required(),
];

const SETTINGS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::new("github_enabled", "BOOLEAN DEFAULT 0", "BOOLEAN DEFAULT FALSE"),
    ColumnSpec::text("github_repo"),
    ColumnSpec::text("github_token"),
    ColumnSpec::text("webhook_url"),
    ColumnSpec::text("webhook_secret"),
    ColumnSpec::new("monitor_enabled", "BOOLEAN DEFAULT 0", "BOOLEAN DEFAULT FALSE"),
    ColumnSpec::text("monitor_path"),
    ColumnSpec::new("monitor_interval", "INTEGER DEFAULT 60", "INTEGER DEFAULT 60"),
    ColumnSpec::text("monitor_extensions"),
    ColumnSpec::new("strict_doc_read", "BOOLEAN DEFAULT 0", "BOOLEAN DEFAULT FALSE"),
    ColumnSpec::new("strict_file_ref", "BOOLEAN DEFAULT 0", "BOOLEAN DEFAULT FALSE"),
    ColumnSpec::new("strict_log_entry", "BOOLEAN DEFAULT 0", "BOOLEAN DEFAULT FALSE"),
    ColumnSpec::text("project_root"),
    ColumnSpec::timestamp("created_at").required(),
    ColumnSpec::timestamp("updated_at").required(),
];

const VERSION_COLUMNS: &[ColumnSpec] = &[ColumnSpec::new("version", "INTEGER", "INTEGER").required()];

/// Every table, in creation order.
pub const TABLES: [TableSpec; 9] = [
    TableSpec {
        logical: "tasks",
        key: KeySpec::TaskKey,
        columns: TASK_COLUMNS,
        constraints: &[],
    },
    TableSpec {
        logical: "relationships",
        key: KeySpec::Serial,
        columns: RELATIONSHIP_COLUMNS,
        constraints: &["UNIQUE (\"parent_id\", \"child_id\")"],
    },
    TableSpec {
        logical: "file_associations",
        key: KeySpec::Serial,
        columns: FILE_COLUMNS,
        constraints: &["UNIQUE (\"task_id\", \"file_path\")"],
    },
    TableSpec {
        logical: "log_entries",
        key: KeySpec::Serial,
        columns: LOG_COLUMNS,
        constraints: &[],
    },
    TableSpec {
        logical: "members",
        key: KeySpec::Text("id"),
        columns: MEMBER_COLUMNS,
        constraints: &[],
    },
    TableSpec {
        logical: "projects",
        key: KeySpec::Text("id"),
        columns: PROJECT_COLUMNS,
        constraints: &[],
    },
    TableSpec {
        logical: "project_memberships",
        key: KeySpec::Constraint,
        columns: MEMBERSHIP_COLUMNS,
        constraints: &["PRIMARY KEY (\"project_id\", \"member_id\")"],
    },
    TableSpec {
        logical: "project_settings",
        key: KeySpec::Text("project_id"),
        columns: SETTINGS_COLUMNS,
        constraints: &[],
    },
    TableSpec {
        logical: "schema_version",
        key: KeySpec::Constraint,
        columns: VERSION_COLUMNS,
        constraints: &[],
    },
];

/// Every index, built only when its columns exist.
pub const INDEXES: [IndexSpec; 10] = [
    IndexSpec {
        name: "idx_tasks_status",
        table: "tasks",
        columns: &["status"],
    },
    IndexSpec {
        name: "idx_tasks_assignee",
        table: "tasks",
        columns: &["assignee"],
    },
    IndexSpec {
        name: "idx_tasks_due_date",
        table: "tasks",
        columns: &["due_date"],
    },
    IndexSpec {
        name: "idx_tasks_project_id",
        table: "tasks",
        columns: &["project_id"],
    },
    IndexSpec {
        name: "idx_members_leader_id",
        table: "members",
        columns: &["leader_id"],
    },
    IndexSpec {
        name: "idx_projects_owner_id",
        table: "projects",
        columns: &["owner_id"],
    },
    IndexSpec {
        name: "idx_projects_status",
        table: "projects",
        columns: &["status"],
    },
    IndexSpec {
        name: "idx_log_entries_task",
        table: "log_entries",
        columns: &["task_id"],
    },
    IndexSpec {
        name: "idx_log_entries_type",
        table: "log_entries",
        columns: &["entry_type"],
    },
    IndexSpec {
        name: "idx_file_associations_path",
        table: "file_associations",
        columns: &["file_path"],
    },
];

/// Looks up a table by logical name.
#[must_use]
pub fn table(logical: &str) -> Option<&'static TableSpec> {
    TABLES.iter().find(|spec| spec.logical == logical)
}

/// Existing columns per physical table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInventory {
    columns: BTreeMap<String, BTreeSet<String>>,
}

impl ColumnInventory {
    /// Builds an inventory from `(table, column)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut columns: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (table_name, column_name) in pairs {
            columns
                .entry(table_name.to_ascii_lowercase())
                .or_default()
                .insert(column_name.to_ascii_lowercase());
        }
        Self { columns }
    }

    /// Returns `true` when `table` has `column`.
    #[must_use]
    pub fn has(&self, table_name: &str, column: &str) -> bool {
        self.columns
            .get(table_name)
            .is_some_and(|existing| existing.contains(column))
    }

    /// Expected columns of `spec` that `table` lacks.
    #[must_use]
    pub fn missing(&self, dialect: Dialect, spec: &TableSpec) -> Vec<&'static ColumnSpec> {
        let physical = spec.physical(dialect);
        spec.columns
            .iter()
            .filter(|column| !self.has(physical, column.name))
            .collect()
    }
}

/// Creates every missing table.
///
/// # Errors
///
/// Returns the first failing statement's error.
pub fn create_tables<C: SqlConnection>(conn: &mut C) -> QueryResult<()> {
    for spec in &TABLES {
        conn.execute_script(&spec.create_sql(C::DIALECT))?;
    }
    Ok(())
}

/// Creates every index whose columns all exist and returns how many were
/// skipped.
///
/// # Errors
///
/// Returns the first failing statement's error.
pub fn create_indexes<C: SqlConnection>(conn: &mut C, inventory: &ColumnInventory) -> QueryResult<usize> {
    let mut skipped = 0;
    for index in &INDEXES {
        let Some(spec) = table(index.table) else {
            continue;
        };
        let physical = spec.physical(C::DIALECT);
        if let Some(missing) = index.columns.iter().find(|column| !inventory.has(physical, column)) {
            tracing::warn!(
                index = index.name,
                table = physical,
                column = *missing,
                "skipping index, column is missing"
            );
            skipped += 1;
            continue;
        }
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|column| format!("\"{column}\""))
            .collect();
        conn.execute_script(&format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            index.name,
            physical,
            columns.join(", ")
        ))?;
    }
    Ok(skipped)
}

/// Adds every expected column the inventory lacks and returns how many
/// were added. Columns are never dropped, renamed or retyped.
///
/// # Errors
///
/// Returns the first failing statement's error.
pub fn add_missing_columns<C: SqlConnection>(conn: &mut C, inventory: &ColumnInventory) -> QueryResult<usize> {
    let mut added = 0;
    for spec in &TABLES {
        for column in inventory.missing(C::DIALECT, spec) {
            conn.execute_script(&spec.add_column_sql(C::DIALECT, column))?;
            tracing::info!(
                table = spec.physical(C::DIALECT),
                column = column.name,
                "added missing column"
            );
            added += 1;
        }
    }
    Ok(added)
}
