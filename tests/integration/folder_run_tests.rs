/*!
 * Directory runs for import and export
 */

use std::fs;

use anyhow::Result;

use tuforge::app_controller::{Task, FOLDER_LOG_FILE};

use crate::common;

fn import_task(force_overwrite: bool) -> Task {
    Task::Import {
        keep_intermediate: false,
        force_overwrite,
    }
}

#[tokio::test]
async fn test_folder_import_then_export_should_process_every_document() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    let output_dir = common::create_temp_dir()?;
    common::create_test_file(input_dir.path(), "a.html", "<p>First page.</p>")?;
    common::create_test_file(input_dir.path(), "sub/b.html", "<h1>Second page</h1>")?;
    common::create_test_file(input_dir.path(), "notes.txt", "not a document")?;
    let (controller, bridge) = common::test_controller()?;

    let summary = controller
        .run_folder(import_task(false), input_dir.path().to_path_buf(), None)
        .await?;
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert!(input_dir.path().join("a.tu.json").exists());
    assert!(input_dir.path().join("sub/b.skl").exists());
    assert!(input_dir.path().join(FOLDER_LOG_FILE).exists());
    assert_eq!(bridge.call_count(), 0);

    let rerun = controller
        .run_folder(import_task(false), input_dir.path().to_path_buf(), None)
        .await?;
    assert_eq!(rerun.skipped, 2);
    assert_eq!(rerun.processed, 0);

    let export = controller
        .run_folder(
            Task::Export { language: None },
            input_dir.path().to_path_buf(),
            Some(output_dir.path().to_path_buf()),
        )
        .await?;
    assert_eq!(export.processed, 2);
    assert_eq!(fs::read_to_string(output_dir.path().join("a.de.html"))?, "<p>First page.</p>");
    assert_eq!(
        fs::read_to_string(output_dir.path().join("sub/b.de.html"))?,
        "<h1>Second page</h1>"
    );

    let log = fs::read_to_string(input_dir.path().join(FOLDER_LOG_FILE))?;
    assert_eq!(log.lines().count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_folder_run_should_count_failures_and_continue() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    common::create_test_file(input_dir.path(), "good.html", "<p>Fine.</p>")?;
    common::create_test_bytes(input_dir.path(), "bad.html", &[b'<', b'p', b'>', 0xFF, 0xFE, 0x00])?;
    let (controller, _) = common::test_controller()?;

    let summary = controller
        .run_folder(import_task(true), input_dir.path().to_path_buf(), None)
        .await?;
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 1);
    Ok(())
}

#[tokio::test]
async fn test_folder_run_should_fail_without_documents() -> Result<()> {
    let input_dir = common::create_temp_dir()?;
    common::create_test_file(input_dir.path(), "readme.txt", "nothing to do")?;
    let (controller, _) = common::test_controller()?;

    let result = controller
        .run_folder(import_task(false), input_dir.path().to_path_buf(), None)
        .await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_should_dispatch_single_file() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "single.html", "<p>Only one.</p>")?;
    let (controller, _) = common::test_controller()?;

    controller.run(import_task(false), input.clone(), None).await?;
    controller
        .run(Task::Export { language: Some("fr".to_string()) }, temp_dir.path().join("single.tu.json"), None)
        .await?;
    assert_eq!(fs::read_to_string(temp_dir.path().join("single.fr.html"))?, "<p>Only one.</p>");
    Ok(())
}
