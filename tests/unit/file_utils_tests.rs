/*!
 * Tests for file utility functions
 */

use std::fs;
use std::path::Path;

use anyhow::Result;

use tuforge::file_utils::{ArtifactPaths, FileManager, FileType};

use crate::common;

/// Test that file_exists tells files and directories apart
#[test]
fn test_file_exists_should_only_match_files() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "page.html", "<p>x</p>")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(FileManager::dir_exists(temp_dir.path()));
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
    Ok(())
}

/// Test that generate_output_path inserts the language before the extension
#[test]
fn test_generate_output_path_should_add_language() {
    let output_path = FileManager::generate_output_path(
        Path::new("/tmp/input/report.html"),
        Path::new("/tmp/output"),
        "fr",
        "html",
    );
    assert_eq!(output_path, Path::new("/tmp/output/report.fr.html"));

    let from_interchange =
        FileManager::generate_output_path("/tmp/report.tu.json", "/tmp", "de", "docx");
    assert_eq!(from_interchange, Path::new("/tmp/report.de.docx"));
}

/// Test that artifact paths share the document stem
#[test]
fn test_artifact_paths_should_share_document_stem() {
    let artifacts = ArtifactPaths::for_document("/docs/guide.tu.json", "/out");
    assert_eq!(artifacts.interchange, Path::new("/out/guide.tu.json"));
    assert_eq!(artifacts.skeleton, Path::new("/out/guide.skl"));
    assert_eq!(artifacts.formats, Path::new("/out/guide.fmt.json"));
    assert_eq!(artifacts.pseudo_skeleton, Path::new("/out/guide.pskl"));
    assert_eq!(ArtifactPaths::for_document("/docs/guide.html", "/out"), artifacts);
}

/// Test that document discovery keeps markup and office files only
#[test]
fn test_find_documents_should_skip_artifacts_and_unknown_files() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "a.html", "<p>a</p>")?;
    common::create_test_file(temp_dir.path(), "nested/b.DOCX", "binary")?;
    common::create_test_file(temp_dir.path(), "a.tu.json", "{}")?;
    common::create_test_file(temp_dir.path(), "a.fmt.json", "{}")?;
    common::create_test_file(temp_dir.path(), "a.skl", "")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "")?;

    let documents = FileManager::find_documents(temp_dir.path())?;
    assert_eq!(documents.len(), 2);
    assert!(documents[0].ends_with("a.html"));
    assert!(documents[1].ends_with("nested/b.DOCX"));

    let interchange = FileManager::find_interchange_files(temp_dir.path())?;
    assert_eq!(interchange.len(), 1);
    assert!(interchange[0].ends_with("a.tu.json"));
    Ok(())
}

/// Test file type detection by extension
#[test]
fn test_detect_file_type_should_follow_extension() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let html = common::create_test_file(temp_dir.path(), "page.HTM", "")?;
    let sheet = common::create_test_file(temp_dir.path(), "budget.ods", "")?;
    let text = common::create_test_file(temp_dir.path(), "notes.txt", "")?;

    assert_eq!(FileManager::detect_file_type(&html)?, FileType::Markup);
    assert_eq!(FileManager::detect_file_type(&sheet)?, FileType::Office);
    assert_eq!(FileManager::detect_file_type(&text)?, FileType::Unknown);
    assert!(FileManager::detect_file_type(temp_dir.path().join("absent.html")).is_err());
    Ok(())
}

/// Test that writes create missing parent directories
#[test]
fn test_write_and_copy_should_create_parents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let written = temp_dir.path().join("deep/er/file.skl");
    FileManager::write_to_file(&written, "%%%TU:1%%%")?;
    assert_eq!(FileManager::read_to_string(&written)?, "%%%TU:1%%%");

    let copied = temp_dir.path().join("copy/file.skl");
    FileManager::copy_file(&written, &copied)?;
    assert_eq!(fs::read(&copied)?, b"%%%TU:1%%%");
    Ok(())
}

/// Test that log entries are appended with a timestamp
#[test]
fn test_append_to_log_file_should_append_lines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log_path = temp_dir.path().join("logs/tuforge.log");

    FileManager::append_to_log_file(&log_path, "first")?;
    FileManager::append_to_log_file(&log_path, "second")?;

    let content = fs::read_to_string(&log_path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with('[') && lines[0].ends_with("] first"));
    assert!(lines[1].ends_with("] second"));
    Ok(())
}
