// tests/integration/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;
use hpcflow::config::load_and_validate;
use hpcflow::errors::WorkflowError;

fn write_workflow(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_cycle_returns_structured_error() {
    let file = write_workflow(
        r#"
[workflow]
name = "cyclic"
sites = ["local"]

[transformation.step]
pfn = "/bin/true"

[task.A]
transformation = "step"
after = ["B"]

[task.B]
transformation = "step"
after = ["A"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    match cfg.build_graph() {
        Err(WorkflowError::Cycle(path)) => {
            assert_eq!(path.len(), 2);
            assert!(path.contains(&"A".to_string()));
            assert!(path.contains(&"B".to_string()));
        }
        Err(e) => panic!("Expected Cycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_transformation_returns_config_error() {
    let file = write_workflow(
        r#"
[workflow]
name = "broken"
sites = ["local"]

[task.train]
transformation = "train_model"
"#,
    );

    match load_and_validate(file.path()) {
        Err(WorkflowError::ConfigError(msg)) => {
            assert!(msg.contains("unknown transformation"));
            assert!(msg.contains("train_model"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_replica_site_returns_config_error() {
    let file = write_workflow(
        r#"
[workflow]
name = "replicas"
sites = ["local"]

[transformation.prep]
pfn = "/bin/true"

[artifact."in.txt"]
location = "/data/in.txt"
site = "tape-archive"

[task.prep]
inputs = ["in.txt"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(WorkflowError::ConfigError(msg)) => {
            assert!(msg.contains("tape-archive"));
            assert!(msg.contains("unknown site"));
        }
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn test_empty_workflow_is_rejected() {
    let file = write_workflow(
        r#"
[workflow]
name = "empty"
sites = ["local"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(WorkflowError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("Expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn test_task_on_unknown_site_fails_graph_build() {
    let file = write_workflow(
        r#"
[workflow]
name = "sites"
sites = ["cpu-site"]

[transformation.train]
pfn = "/bin/true"

[task.train]
site = "gpu-site"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert!(matches!(
        cfg.build_graph(),
        Err(WorkflowError::InvalidSite { .. })
    ));
}

#[test]
fn test_malformed_toml_is_a_toml_error() {
    let file = write_workflow("[workflow\nname = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(WorkflowError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_and_validate(dir.path().join("nope.toml")),
        Err(WorkflowError::IoError(_))
    ));
}
