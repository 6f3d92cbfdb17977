/*!
 * Tests for loading configuration files
 */

use anyhow::Result;

use tuforge::app_config::{Config, LogLevel};
use tuforge::segment::BoundaryMode;

use crate::common;

#[test]
fn test_from_file_should_read_minimal_config() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "tuforge.json",
        r#"{ "source_language": "ja", "target_language": "en-US" }"#,
    )?;

    let config = Config::from_file(&path)?;
    config.validate()?;
    assert_eq!(config.source_language, "ja");
    assert_eq!(config.segmentation.boundary, BoundaryMode::Sentence);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.merge.tu_break_tags.iter().any(|tag| tag == "p"));
    Ok(())
}

#[test]
fn test_from_file_should_read_every_section() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "custom.json",
        r#"{
            "source_language": "de",
            "target_language": "fr",
            "segmentation": { "boundary": "paragraph", "html_entity_tags": true },
            "markup": { "inline_elements": ["B", "Em"], "translatable_attributes": ["title"] },
            "merge": { "tu_break_tags": ["p", "td"], "stack_window": 2 },
            "bridge": { "program": "/opt/office/soffice" },
            "concurrency": { "max_parallel_documents": 3 },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::from_file(&path)?;
    config.validate()?;
    assert_eq!(config.segmentation.boundary, BoundaryMode::Paragraph);
    assert!(config.preen_options().html_entity_tags);
    assert_eq!(config.merge.stack_window, 2);
    assert_eq!(config.bridge.program, "/opt/office/soffice");
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);

    let options = config.emit_options();
    assert!(options.inline_elements.contains("em"));
    assert_eq!(options.locale, "de");
    Ok(())
}

#[test]
fn test_from_file_should_fail_on_invalid_json() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "broken.json", "{ source_language: ")?;
    assert!(Config::from_file(&path).is_err());
    assert!(Config::from_file(temp_dir.path().join("absent.json")).is_err());
    Ok(())
}

#[test]
fn test_validate_should_reject_unknown_target_language() {
    let mut config = common::test_config();
    config.target_language = "klingonese".to_string();
    assert!(config.validate().is_err());
}
