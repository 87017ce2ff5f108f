//! Configuration parsing and environment override tests.

use crate::config::{
    DatabaseConfig, StrictOverrides, TracLineConfig, env_project_key, is_truthy,
};
use crate::domain::{ProjectId, StrictFlags, TaskPriority};
use camino::Utf8PathBuf;
use rstest::rstest;

fn project(id: &str) -> ProjectId {
    ProjectId::new(id).expect("project id")
}

#[rstest]
fn empty_documents_use_defaults() {
    let config = TracLineConfig::from_yaml("  \n").expect("empty yaml");

    assert_eq!(config, TracLineConfig::default());
    assert_eq!(config.workflow.custom_states, vec!["DOING", "TESTING"]);
    assert_eq!(config.database.engine, "postgresql");
    assert_eq!(config.defaults.priority, 3);
}

#[rstest]
fn sections_are_read_and_engine_aliases_accepted() {
    let yaml = "\
database:
  engine_type: sqlite
  path: /tmp/tracline.db
workflow:
  custom_states: [DOING, REVIEW]
  transitions:
    DOING: [REVIEW]
defaults:
  assignee: alice
  project: web-app
strict:
  global:
    doc_read: true
  projects:
    web-app:
      file_ref: true
";
    let config = TracLineConfig::from_yaml(yaml).expect("valid yaml");

    assert_eq!(config.database.engine, "sqlite");
    assert_eq!(config.database.path.as_deref(), Some("/tmp/tracline.db"));
    assert_eq!(config.workflow.transitions.get("DOING"), Some(&vec!["REVIEW".to_owned()]));
    assert_eq!(config.session().default_assignee.as_deref(), Some("alice"));
    assert_eq!(config.session().current_project, Some(project("web-app")));
    assert_eq!(config.session().default_priority, Some(TaskPriority::MEDIUM));
    assert_eq!(
        config.strict.overrides_for(&project("WEB_APP")),
        StrictOverrides {
            doc_read: Some(true),
            file_ref: Some(true),
            log_entry: None,
        }
    );
}

#[rstest]
fn malformed_yaml_is_a_parse_error() {
    assert!(TracLineConfig::from_yaml("database: [unclosed").is_err());
}

#[rstest]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.yaml")).expect("utf-8 path");

    let config = TracLineConfig::from_file(&path).expect("missing file is not an error");

    assert_eq!(config, TracLineConfig::default());
}

#[rstest]
fn file_contents_are_parsed() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("tracline.yaml")).expect("utf-8 path");
    std::fs::write(&path, "defaults:\n  priority: 5\n").expect("write config");

    let config = TracLineConfig::from_file(&path).expect("readable file");

    assert_eq!(config.defaults.priority, 5);
}

#[rstest]
fn environment_overrides_database_and_defaults() {
    let mut config = TracLineConfig::default();
    config.apply_env_overrides([
        ("TRACLINE_DB_TYPE", "sqlite"),
        ("TRACLINE_DB_PATH", "/var/lib/tracline.db"),
        ("TASK_ASSIGNEE", "bob"),
        ("TRACLINE_ASSIGNEE", "alice"),
        ("TRACLINE_PROJECT", "legacy"),
        ("TRACLINE_PROJECT_ID", "web-app"),
        ("UNRELATED", "ignored"),
    ]);

    assert_eq!(config.database, DatabaseConfig::sqlite("/var/lib/tracline.db"));
    assert_eq!(config.defaults.assignee.as_deref(), Some("alice"));
    assert_eq!(config.defaults.project.as_deref(), Some("web-app"));
}

#[rstest]
fn strict_variables_apply_globally_and_per_project() {
    let mut config = TracLineConfig::default();
    config.apply_env_overrides([
        ("TRACLINE_STRICT_DOC_READ", "yes"),
        ("TRACLINE_STRICT_LOG_ENTRY", "on"),
        ("TRACLINE_STRICT_LOG_ENTRY_WEB_APP", "0"),
        ("TRACLINE_STRICT_FILE_REF_WEB_APP", "TRUE"),
    ]);

    let web = config.strict.overrides_for(&project("web-app"));
    let other = config.strict.overrides_for(&project("other"));

    assert_eq!(
        web.resolve(StrictFlags::default()),
        StrictFlags {
            doc_read: true,
            file_ref: true,
            log_entry: false,
        }
    );
    assert_eq!(
        other.resolve(StrictFlags::default()),
        StrictFlags {
            doc_read: true,
            file_ref: false,
            log_entry: true,
        }
    );
}

#[rstest]
fn kill_switch_is_read_from_the_environment() {
    let mut config = TracLineConfig::default();
    config.apply_env_overrides([("TRACLINE_DISABLE_STRICT_MODE", "1")]);
    assert!(config.strict.disabled);
}

#[rstest]
#[case("true", true)]
#[case(" Yes ", true)]
#[case("ON", true)]
#[case("1", true)]
#[case("false", false)]
#[case("enabled", false)]
#[case("", false)]
fn truthy_values(#[case] raw: &str, #[case] expected: bool) {
    assert_eq!(is_truthy(raw), expected);
}

#[rstest]
#[case("web-app", "WEB_APP")]
#[case("My Project", "MY_PROJECT")]
#[case("P1", "P1")]
fn project_keys_follow_variable_spelling(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(env_project_key(raw), expected);
}

#[rstest]
fn default_workflow_builds() {
    let workflow = TracLineConfig::default().build_workflow().expect("default workflow");
    let names: Vec<&str> = workflow.states().iter().map(|state| state.as_str()).collect();
    assert_eq!(names, ["TODO", "READY", "DOING", "TESTING", "DONE", "PENDING", "CANCELED"]);
}
