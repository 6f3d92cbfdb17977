/*!
 * Office documents going through the bridge
 */

use std::fs;
use std::sync::Arc;

use anyhow::Result;

use tuforge::app_controller::Controller;
use tuforge::errors::BridgeError;
use tuforge::interchange::InterchangeDocument;

use crate::common::{self, FakeBridge};

const MEMO: &str = "<html><body><p>Quarterly memo.</p><p>Please review the <b>numbers</b>.</p></body></html>";

#[test]
fn test_office_document_should_round_trip_through_bridge() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "memo.docx", MEMO)?;
    let (controller, bridge) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    assert_eq!(bridge.call_count(), 1);
    assert_eq!(summary.units, 2);

    let document = InterchangeDocument::from_file(&summary.artifacts.interchange)?;
    assert_eq!(document.original, "memo.docx");
    assert_eq!(document.datatype, "docx");

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert_eq!(bridge.call_count(), 2);
    assert_eq!(export.output, temp_dir.path().join("memo.de.docx"));
    assert_eq!(fs::read_to_string(&export.output)?, MEMO);
    Ok(())
}

#[test]
fn test_unreachable_bridge_should_report_retryable_error() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "memo.odt", MEMO)?;
    let bridge = Arc::new(FakeBridge::unreachable());
    let controller = Controller::with_bridge(common::test_config(), bridge.clone())?;

    let err = controller.import_file(&input, temp_dir.path(), false).unwrap_err();
    let bridge_error = err.downcast_ref::<BridgeError>().expect("bridge error");
    assert!(matches!(bridge_error, BridgeError::Connection(_)));
    assert!(bridge_error.is_retryable());
    assert_eq!(bridge.call_count(), 1);
    assert!(!temp_dir.path().join("memo.tu.json").exists());
    Ok(())
}

#[test]
fn test_unknown_file_type_should_not_reach_bridge() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "notes.txt", "plain notes")?;
    let (controller, bridge) = common::test_controller()?;

    assert!(controller.import_file(&input, temp_dir.path(), false).is_err());
    assert_eq!(bridge.call_count(), 0);
    Ok(())
}
