/*!
 * Tests for error types and their conversions
 */

use std::path::PathBuf;

use tuforge::errors::{AppError, BridgeError, ConversionError, ExportError};

#[test]
fn test_conversion_error_display_should_name_the_problem() {
    let error = ConversionError::MissingFile(PathBuf::from("page.skl"));
    assert_eq!(error.to_string(), "Missing file: \"page.skl\"");

    let error = ConversionError::Encoding("invalid windows-1252 byte".to_string());
    assert!(error.to_string().starts_with("Encoding error:"));
}

#[test]
fn test_export_error_display_should_name_the_unit() {
    let error = ExportError::UnbalancedMarkup {
        tu: 7,
        detail: "rid 2 has no end".to_string(),
    };
    assert_eq!(error.to_string(), "Unbalanced inline markup in unit 7: rid 2 has no end");
    assert_eq!(ExportError::MissingFormat(3).to_string(), "Format entry 3 not found");
}

#[test]
fn test_bridge_error_should_only_retry_connection_failures() {
    assert!(BridgeError::Connection("refused".to_string()).is_retryable());
    assert!(!BridgeError::Conversion("no output".to_string()).is_retryable());
}

#[test]
fn test_app_error_should_wrap_library_errors() {
    let app: AppError = ConversionError::MalformedInput("bad json".to_string()).into();
    assert!(matches!(app, AppError::Conversion(_)));
    assert_eq!(app.to_string(), "Conversion error: Malformed input: bad json");

    let app: AppError = BridgeError::Connection("down".to_string()).into();
    assert!(matches!(app, AppError::Bridge(_)));

    let app: AppError = ExportError::RecursionLimit(4).into();
    assert!(matches!(app, AppError::Export(ExportError::RecursionLimit(4))));
}

#[test]
fn test_app_error_from_io_and_anyhow() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let app: AppError = io.into();
    assert!(matches!(app, AppError::File(ref message) if message == "gone"));

    let app: AppError = anyhow::anyhow!("something else").into();
    assert_eq!(app.to_string(), "Unknown error: something else");
}

#[test]
fn test_bridge_error_should_survive_anyhow_downcast() {
    let error: anyhow::Error = BridgeError::Connection("down".to_string()).into();
    let error = error.context("Failed to convert memo.docx");
    let bridge = error.downcast_ref::<BridgeError>();
    assert!(bridge.is_some_and(BridgeError::is_retryable));
}
