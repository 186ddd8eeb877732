//! Loading feedback submissions from files

use feedback_agent::{AgentError, Submission};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn load(file: &NamedTempFile) -> feedback_agent::Result<Submission> {
    let json = std::fs::read_to_string(file.path()).unwrap();
    Submission::from_json(&json)
}

#[test]
fn test_single_record_file() {
    let file = write_temp(
        r#"{
            "feedback_id": "fb-100",
            "feedback_text": "The checkout flow is confusing",
            "instructions": "focus on usability",
            "timestamp": "2024-03-01T10:00:00Z"
        }"#,
    );

    let submission = load(&file).unwrap();
    let records = submission.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].instructions(), "focus on usability");
}

#[test]
fn test_batch_file() {
    let file = write_temp(
        r#"{"feedback": [
            {"feedback_id": "fb-1", "feedback_text": "fast delivery"},
            {"feedback_id": "fb-2", "feedback_text": "item arrived damaged"}
        ]}"#,
    );

    let ids: Vec<String> = load(&file)
        .unwrap()
        .records()
        .iter()
        .map(|record| record.feedback_id.clone())
        .collect();
    assert_eq!(ids, vec!["fb-1", "fb-2"]);
}

#[test]
fn test_invalid_files() {
    let malformed = write_temp("{ not json");
    assert!(matches!(load(&malformed), Err(AgentError::InvalidInput(_))));

    let empty_batch = write_temp(r#"{"feedback": []}"#);
    assert!(load(&empty_batch).is_err());

    let blank_entry = write_temp(
        r#"{"feedback": [{"feedback_id": "fb-1", "feedback_text": ""}]}"#,
    );
    let err = load(&blank_entry).unwrap_err();
    assert!(err.to_string().contains("index 0"));
}
