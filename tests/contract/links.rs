//! Relationships and file associations.

use crate::test_helpers::{stored_task, task_id, workspace_file};
use tracline::domain::{NewFileAssociation, NewRelationship, RelationshipKind};
use tracline::ports::{PersistenceEngine, RelationshipQuery};

fn attach(engine: &mut dyn PersistenceEngine, task: &str, path: &str) {
    let association = NewFileAssociation::new(task_id(task), path).expect("valid association");
    engine.add_file_association(&association).expect("file should attach");
}

fn link(engine: &mut dyn PersistenceEngine, parent: &str, child: &str, kind: RelationshipKind) {
    let edge = NewRelationship::new(task_id(parent), task_id(child), kind).expect("valid relationship");
    engine.create_relationship(&edge).expect("link should be stored");
}

pub fn relationships_are_unique_per_pair(engine: &mut dyn PersistenceEngine) {
    stored_task(engine, "EPIC");
    stored_task(engine, "STORY");
    link(engine, "EPIC", "STORY", RelationshipKind::ParentChild);

    let again = NewRelationship::new(task_id("EPIC"), task_id("STORY"), RelationshipKind::Blocks)
        .expect("valid relationship");
    let err = engine.create_relationship(&again).expect_err("pair already linked");

    assert!(err.is_already_exists(), "unexpected error: {err:?}");
}

pub fn relationships_are_found_from_either_end(engine: &mut dyn PersistenceEngine) {
    for id in ["EPIC", "STORY", "BUG"] {
        stored_task(engine, id);
    }
    link(engine, "EPIC", "STORY", RelationshipKind::ParentChild);
    link(engine, "BUG", "STORY", RelationshipKind::Blocks);

    let touching_story = engine
        .list_relationships(&RelationshipQuery {
            task_id: Some(task_id("STORY")),
            ..RelationshipQuery::default()
        })
        .expect("relationships");
    let blocking = engine
        .list_relationships(&RelationshipQuery {
            kind: Some(RelationshipKind::Blocks),
            ..RelationshipQuery::default()
        })
        .expect("relationships");

    assert_eq!(touching_story.len(), 2);
    assert_eq!(blocking.len(), 1);
    assert!(blocking.iter().all(|edge| edge.parent_id.as_str() == "BUG"));

    assert!(engine
        .delete_relationship_between(&task_id("EPIC"), &task_id("STORY"))
        .expect("unlink"));
    let remaining = blocking.first().map(|edge| edge.id).expect("one blocking edge");
    assert!(engine.delete_relationship(remaining).expect("delete by id"));
    assert!(!engine.delete_relationship(remaining).expect("already gone"));
}

pub fn file_associations_derive_type_and_reference_count(engine: &mut dyn PersistenceEngine) {
    stored_task(engine, "T-1");
    stored_task(engine, "T-2");
    let shared = workspace_file("design/Spec.MD");
    let code = workspace_file("src/main.rs");
    attach(engine, "T-1", &shared);
    attach(engine, "T-1", &code);
    attach(engine, "T-2", &shared);

    let files = engine.list_file_associations(&task_id("T-1")).expect("list files");

    assert_eq!(files.len(), 2);
    let document = files.first().expect("first attachment");
    assert_eq!(document.file_type.as_deref(), Some("md"));
    assert_eq!(document.reference_count, 2);
    assert!(document.is_document());
    let source = files.get(1).expect("second attachment");
    assert_eq!(source.file_type.as_deref(), Some("rs"));
    assert_eq!(source.reference_count, 1);
    assert_eq!(engine.count_file_associations(&task_id("T-1")).expect("count"), 2);
    assert_eq!(engine.list_all_file_associations().expect("all files").len(), 3);
}

pub fn duplicate_file_association_is_rejected(engine: &mut dyn PersistenceEngine) {
    stored_task(engine, "T-1");
    let path = workspace_file("README.md");
    attach(engine, "T-1", &path);

    let again = NewFileAssociation::new(task_id("T-1"), path.as_str()).expect("valid association");
    let err = engine.add_file_association(&again).expect_err("already attached");

    assert!(err.is_already_exists(), "unexpected error: {err:?}");
}

pub fn files_trace_back_to_their_tasks(engine: &mut dyn PersistenceEngine) {
    for id in ["T-2", "T-1", "T-3"] {
        stored_task(engine, id);
    }
    let path = workspace_file("schema.sql");
    attach(engine, "T-2", &path);
    attach(engine, "T-1", &path);

    let tracing: Vec<String> = engine
        .tasks_for_file(&path)
        .expect("trace")
        .iter()
        .map(|found| found.id().as_str().to_owned())
        .collect();

    assert_eq!(tracing, ["T-1", "T-2"]);
    assert!(engine.remove_file_association(&task_id("T-2"), &path).expect("detach"));
    assert!(!engine.remove_file_association(&task_id("T-2"), &path).expect("detach twice"));
    assert_eq!(engine.tasks_for_file(&path).expect("trace").len(), 1);
    assert!(engine.tasks_for_file(&workspace_file("unknown.txt")).expect("trace").is_empty());
}
