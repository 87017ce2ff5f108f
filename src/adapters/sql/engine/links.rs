//! Relationship and file association statements.
//!
//! Creation stamps come from the database clock (`CURRENT_TIMESTAMP`).

use super::{SqlBackend, SqlEngine};
use crate::adapters::sql::convert::{opt_column, to_count};
use crate::adapters::sql::rows::{
    CountRow, FILE_COLUMNS, FileRow, IdRow, RELATIONSHIP_COLUMNS, RelationshipRow,
};
use crate::adapters::sql::{Conditions, SqlValue, Statement};
use crate::domain::{FileAssociation, NewFileAssociation, NewRelationship, TaskId, TaskRelationship};
use crate::ports::{PersistenceError, PersistenceResult, RelationshipQuery};

fn inserted_id(operation: &'static str, rows: &[IdRow]) -> PersistenceResult<i64> {
    rows.first()
        .map(|row| row.id)
        .ok_or_else(|| PersistenceError::InvalidData(format!("{operation} returned no identifier")))
}

impl<B: SqlBackend> SqlEngine<B> {
    pub(super) fn insert_relationship(
        &mut self,
        relationship: &NewRelationship,
    ) -> PersistenceResult<TaskRelationship> {
        let insert = Statement::new(
            "INSERT INTO {relationships} (parent_id, child_id, relationship_type, created_at, created_by) \
             VALUES (:parent_id, :child_id, :kind, CURRENT_TIMESTAMP, :created_by) \
             RETURNING CAST(id AS BIGINT) AS id",
        )
        .bind("parent_id", SqlValue::text(relationship.parent_id().as_str()))
        .bind("child_id", SqlValue::text(relationship.child_id().as_str()))
        .bind("kind", SqlValue::text(relationship.kind().as_str()))
        .bind("created_by", SqlValue::opt_text(relationship.created_by()));
        self.atomically(|engine| {
            let ids: Vec<IdRow> = engine.load("create relationship", &insert)?;
            let id = inserted_id("create relationship", &ids)?;
            let rows: Vec<RelationshipRow> = engine.load(
                "create relationship",
                &Statement::new(format!(
                    "SELECT {RELATIONSHIP_COLUMNS} FROM {{relationships}} WHERE id = :id"
                ))
                .bind("id", SqlValue::big_int(id)),
            )?;
            rows.into_iter()
                .next()
                .map(RelationshipRow::into_relationship)
                .transpose()?
                .ok_or_else(|| PersistenceError::InvalidData(format!("relationship {id} vanished after insert")))
        })
    }

    pub(super) fn query_relationships(
        &mut self,
        query: &RelationshipQuery,
    ) -> PersistenceResult<Vec<TaskRelationship>> {
        let mut conditions = Conditions::default();
        if let Some(task_id) = &query.task_id {
            conditions.push_bound(
                "(parent_id = :task_id OR child_id = :task_id)",
                "task_id",
                SqlValue::text(task_id.as_str()),
            );
        }
        if let Some(kind) = query.kind {
            conditions.push_bound("relationship_type = :kind", "kind", SqlValue::text(kind.as_str()));
        }
        let where_clause = conditions.where_clause();
        let statement = conditions.apply(Statement::new(format!(
            "SELECT {RELATIONSHIP_COLUMNS} FROM {{relationships}}{where_clause} ORDER BY id ASC"
        )));
        let rows: Vec<RelationshipRow> = self.load("list relationships", &statement)?;
        rows.into_iter().map(RelationshipRow::into_relationship).collect()
    }

    pub(super) fn remove_relationship(&mut self, id: i64) -> PersistenceResult<bool> {
        let removed = self.execute(
            "delete relationship",
            &Statement::new("DELETE FROM {relationships} WHERE id = :id").bind("id", SqlValue::big_int(id)),
        )?;
        Ok(removed > 0)
    }

    pub(super) fn remove_relationship_between(
        &mut self,
        parent_id: &TaskId,
        child_id: &TaskId,
    ) -> PersistenceResult<bool> {
        let removed = self.execute(
            "delete relationship",
            &Statement::new("DELETE FROM {relationships} WHERE parent_id = :parent_id AND child_id = :child_id")
                .bind("parent_id", SqlValue::text(parent_id.as_str()))
                .bind("child_id", SqlValue::text(child_id.as_str())),
        )?;
        Ok(removed > 0)
    }

    pub(super) fn insert_file(&mut self, association: &NewFileAssociation) -> PersistenceResult<FileAssociation> {
        let insert = Statement::new(
            "INSERT INTO file_associations (task_id, file_path, relative_path, file_type, description, \
             created_at, created_by, last_modified, file_size) \
             VALUES (:task_id, :file_path, :relative_path, :file_type, :description, CURRENT_TIMESTAMP, \
             :created_by, :last_modified, :file_size) RETURNING CAST(id AS BIGINT) AS id",
        )
        .bind("task_id", SqlValue::text(association.task_id().as_str()))
        .bind("file_path", SqlValue::text(association.file_path()))
        .bind("relative_path", SqlValue::opt_text(association.relative_path()))
        .bind("file_type", SqlValue::opt_text(association.file_type()))
        .bind("description", SqlValue::opt_text(association.description()))
        .bind("created_by", SqlValue::opt_text(association.created_by()))
        .bind("last_modified", SqlValue::opt_timestamp(association.last_modified()))
        .bind("file_size", SqlValue::opt_big_int(opt_column(association.file_size())?));
        self.atomically(|engine| {
            let ids: Vec<IdRow> = engine.load("add file association", &insert)?;
            let id = inserted_id("add file association", &ids)?;
            let rows: Vec<FileRow> = engine.load(
                "add file association",
                &Statement::new(format!("SELECT {FILE_COLUMNS} FROM file_associations fa WHERE fa.id = :id"))
                    .bind("id", SqlValue::big_int(id)),
            )?;
            rows.into_iter()
                .next()
                .map(FileRow::into_association)
                .transpose()?
                .ok_or_else(|| PersistenceError::InvalidData(format!("file association {id} vanished after insert")))
        })
    }

    /// Lists one task's files in attachment order, or every file newest
    /// first.
    pub(super) fn files_of(&mut self, task_id: Option<&TaskId>) -> PersistenceResult<Vec<FileAssociation>> {
        let statement = match task_id {
            Some(id) => Statement::new(format!(
                "SELECT {FILE_COLUMNS} FROM file_associations fa WHERE fa.task_id = :task_id ORDER BY fa.id ASC"
            ))
            .bind("task_id", SqlValue::text(id.as_str())),
            None => Statement::new(format!(
                "SELECT {FILE_COLUMNS} FROM file_associations fa ORDER BY fa.id DESC"
            )),
        };
        let rows: Vec<FileRow> = self.load("list file associations", &statement)?;
        rows.into_iter().map(FileRow::into_association).collect()
    }

    pub(super) fn remove_file(&mut self, task_id: &TaskId, path: &str) -> PersistenceResult<bool> {
        let removed = self.execute(
            "remove file association",
            &Statement::new("DELETE FROM file_associations WHERE task_id = :task_id AND file_path = :file_path")
                .bind("task_id", SqlValue::text(task_id.as_str()))
                .bind("file_path", SqlValue::text(path)),
        )?;
        Ok(removed > 0)
    }

    pub(super) fn count_files(&mut self, task_id: &TaskId) -> PersistenceResult<u64> {
        let rows: Vec<CountRow> = self.load(
            "count file associations",
            &Statement::new(
                "SELECT CAST(COUNT(*) AS BIGINT) AS value FROM file_associations WHERE task_id = :task_id",
            )
            .bind("task_id", SqlValue::text(task_id.as_str())),
        )?;
        Ok(rows.first().map_or(0, |row| to_count(row.value)))
    }
}
