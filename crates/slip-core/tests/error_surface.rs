use slip_core::errors::{EnsembleError, ErrorInfo};
use slip_core::RunNumber;

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("path", "table.txt")
        .with_context("line", "3")
}

#[test]
fn malformed_table_is_fatal() {
    let err = EnsembleError::MalformedTable(sample_info("T001", "ragged row"));
    assert_eq!(err.info().code, "T001");
    assert!(err.info().context.contains_key("line"));
    assert!(err.is_fatal());
}

#[test]
fn log_write_is_fatal() {
    let err = EnsembleError::LogWrite(sample_info("L001", "read only"));
    assert!(err.is_fatal());
}

#[test]
fn preparation_is_recoverable() {
    let err = EnsembleError::preparation(RunNumber::from_raw(4), "surface-write", "disk full");
    assert!(!err.is_fatal());
    assert_eq!(err.info().context_value("run_number"), Some("4"));
}

#[test]
fn invalid_transition_names_both_states() {
    let err = EnsembleError::invalid_transition(RunNumber::from_raw(2), "pending", "submitted");
    assert!(err.is_fatal());
    let rendered = err.to_string();
    assert!(rendered.contains("pending"));
    assert!(rendered.contains("submitted"));
    assert!(rendered.contains("run_number=2"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = EnsembleError::Io(ErrorInfo::new("manifest-write", "denied").with_hint("check permissions"));
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Io");
    assert_eq!(json["detail"]["hint"], "check permissions");
    let back: EnsembleError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, err);
}

#[test]
fn display_lists_code_context_and_hint() {
    let info = ErrorInfo::new("table-dimension", "row has 1 columns, expected 2")
        .with_context("line", "3")
        .with_context("path", "table.txt")
        .with_hint("fix the row");
    assert_eq!(
        info.to_string(),
        "[table-dimension] row has 1 columns, expected 2 (line=3, path=table.txt); hint: fix the row"
    );
    assert_eq!(info.context_value("line"), Some("3"));
    assert_eq!(info.context_value("missing"), None);
}
