//! Log entry ordering and filters.

use crate::test_helpers::{stored_task, task_id};
use chrono::Utc;
use serde_json::Value;
use tracline::domain::{LogEntryType, NewLogEntry};
use tracline::ports::{LogQuery, PersistenceEngine};

fn write(engine: &mut dyn PersistenceEngine, task: &str, entry_type: LogEntryType, message: &str) -> i64 {
    let entry = NewLogEntry::new(entry_type, message, Utc::now())
        .for_task(task_id(task))
        .by_user(Some("alice".to_owned()))
        .with_metadata("source", Value::from("contract"));
    engine.add_log_entry(&entry).expect("log should be written").id
}

pub fn entries_are_listed_newest_first(engine: &mut dyn PersistenceEngine) {
    stored_task(engine, "T-1");
    let first = write(engine, "T-1", LogEntryType::Work, "first");
    let second = write(engine, "T-1", LogEntryType::Work, "second");

    let entries = engine
        .list_log_entries(&LogQuery::for_task(task_id("T-1")))
        .expect("list logs");

    assert!(second > first);
    let messages: Vec<&str> = entries.iter().map(|entry| entry.message.as_str()).collect();
    assert_eq!(messages, ["second", "first"]);
    let newest = entries.first().expect("newest entry");
    assert_eq!(newest.user.as_deref(), Some("alice"));
    assert_eq!(newest.metadata.get("source"), Some(&Value::from("contract")));
}

pub fn filters_narrow_by_type_and_identifier(engine: &mut dyn PersistenceEngine) {
    stored_task(engine, "T-1");
    stored_task(engine, "T-2");
    let marker = write(engine, "T-1", LogEntryType::Work, "before");
    write(engine, "T-1", LogEntryType::FileAdded, "file");
    write(engine, "T-1", LogEntryType::UserAction, "after");
    write(engine, "T-2", LogEntryType::Work, "other task");

    let evidence_after = LogQuery::for_task(task_id("T-1"))
        .of_types(LogEntryType::EVIDENCE)
        .after(marker);

    assert_eq!(engine.count_log_entries(&evidence_after).expect("count"), 1);
    assert_eq!(
        engine
            .count_log_entries(&LogQuery::for_task(task_id("T-1")))
            .expect("count"),
        3
    );
    assert_eq!(engine.count_log_entries(&LogQuery::default()).expect("count"), 4);
    assert_eq!(
        engine
            .list_log_entries(&LogQuery::default().with_limit(2))
            .expect("list")
            .len(),
        2
    );
}
