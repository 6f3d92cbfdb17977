/*!
 * Import followed by an untranslated export must rebuild the document
 */

use std::fs;
use std::sync::Arc;

use anyhow::Result;

use tuforge::app_controller::Controller;
use tuforge::skeleton::PseudoSkeleton;

use crate::common::{self, FakeBridge};

#[test]
fn test_sample_page_should_round_trip_byte_for_byte() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "page.html", common::sample_page())?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    assert!(summary.units >= 6);
    assert!(summary.formats > 0);
    assert!(!summary.artifacts.pseudo_skeleton.exists());

    let skeleton = fs::read_to_string(&summary.artifacts.skeleton)?;
    assert!(skeleton.contains("alt=\"%%%TU:"));
    assert!(!skeleton.contains("Welcome aboard"));

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert_eq!(export.output, temp_dir.path().join("page.de.html"));
    assert!(export.report.fallback_units.is_empty());
    assert!(export.report.missing_units.is_empty());
    assert_eq!(fs::read_to_string(&export.output)?, common::sample_page());
    Ok(())
}

#[test]
fn test_implied_paragraph_end_should_round_trip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "implied.html", "<p>A<p>B</p>")?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    assert_eq!(summary.units, 2);
    assert_eq!(
        fs::read_to_string(&summary.artifacts.skeleton)?,
        "<p>%%%TU:1%%%<p>%%%TU:2%%%</p>"
    );

    let export = controller.export_file(&input, temp_dir.path(), Some("xx"))?;
    assert_eq!(export.output, temp_dir.path().join("implied.xx.html"));
    assert_eq!(fs::read_to_string(&export.output)?, "<p>A<p>B</p>");
    Ok(())
}

#[test]
fn test_windows_1252_page_should_keep_its_encoding() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut bytes = b"<html><head><meta charset=\"windows-1252\"></head><body><p>Caf".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b" cr");
    bytes.push(0xE8);
    bytes.extend_from_slice(b"me.</p></body></html>");
    let input = common::create_test_bytes(temp_dir.path(), "menu.html", &bytes)?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    let document = tuforge::InterchangeDocument::from_file(&summary.artifacts.interchange)?;
    assert_eq!(document.encoding, "windows-1252");
    assert!(document.units.iter().any(|unit| unit.source.contains("Café crème.")));

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert_eq!(fs::read(&export.output)?, bytes);
    Ok(())
}

#[test]
fn test_shift_jis_page_should_use_locale_default() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config();
    config.source_language = "ja".to_string();
    config.target_language = "en".to_string();
    let controller = Controller::with_bridge(config, Arc::new(FakeBridge::default()))?;

    let bytes = [b"<p>".as_slice(), &[0x93, 0xFA, 0x96, 0x7B], b"</p>"].concat();
    let input = common::create_test_bytes(temp_dir.path(), "nihon.html", &bytes)?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    let document = tuforge::InterchangeDocument::from_file(&summary.artifacts.interchange)?;
    assert_eq!(document.encoding, "Shift_JIS");
    assert_eq!(document.units.len(), 1);
    assert!(document.units[0].source.contains("日本"));

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert_eq!(export.output, temp_dir.path().join("nihon.en.html"));
    assert_eq!(fs::read(&export.output)?, bytes);
    Ok(())
}

#[test]
fn test_utf8_bom_should_survive_the_round_trip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let bytes = [[0xEF, 0xBB, 0xBF].as_slice(), b"<p>Hello.</p>"].concat();
    let input = common::create_test_bytes(temp_dir.path(), "bom.html", &bytes)?;
    let plain = common::create_test_file(temp_dir.path(), "plain.html", "<p>Hello.</p>")?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    let document = tuforge::InterchangeDocument::from_file(&summary.artifacts.interchange)?;
    assert!(document.bom);
    assert_eq!(fs::read_to_string(&summary.artifacts.skeleton)?, "<p>%%%TU:1%%%</p>");

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert_eq!(fs::read(&export.output)?, bytes);

    controller.import_file(&plain, temp_dir.path(), false)?;
    let export = controller.export_file(&plain, temp_dir.path(), None)?;
    assert_eq!(fs::read(&export.output)?, b"<p>Hello.</p>".to_vec());
    Ok(())
}

#[test]
fn test_tags_inside_script_strings_should_round_trip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = "<html><body><script>var s = '</p><p>';</script>\n<p>Text here.</p></body></html>";
    let input = common::create_test_file(temp_dir.path(), "script.html", source)?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    assert_eq!(summary.units, 1);
    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert_eq!(fs::read_to_string(&export.output)?, source);
    Ok(())
}

#[test]
fn test_keep_intermediate_should_write_parsable_pseudo_skeleton() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "page.html", common::sample_page())?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), true)?;
    let text = fs::read_to_string(&summary.artifacts.pseudo_skeleton)?;
    let pseudo = PseudoSkeleton::parse(&text)?;
    assert!(!pseudo.is_empty());
    assert_eq!(pseudo.to_string(), text);
    Ok(())
}

#[test]
fn test_artifacts_should_go_to_output_dir_and_be_found_there() -> Result<()> {
    let source_dir = common::create_temp_dir()?;
    let artifact_dir = common::create_temp_dir()?;
    let input = common::create_test_file(source_dir.path(), "page.html", "<p>Hello there.</p>")?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, artifact_dir.path(), false)?;
    assert_eq!(summary.artifacts.interchange, artifact_dir.path().join("page.tu.json"));
    assert_eq!(summary.artifacts.formats, artifact_dir.path().join("page.fmt.json"));
    assert!(!source_dir.path().join("page.tu.json").exists());

    let export = controller.export_file(&input, artifact_dir.path(), None)?;
    assert_eq!(fs::read_to_string(&export.output)?, "<p>Hello there.</p>");
    Ok(())
}

#[test]
fn test_undecodable_bytes_should_fail_import() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut bytes = b"<meta charset=\"utf-8\"><p>broken ".to_vec();
    bytes.extend_from_slice(&[0xC3, 0x28]);
    bytes.extend_from_slice(b"</p>");
    let input = common::create_test_bytes(temp_dir.path(), "broken.html", &bytes)?;
    let (controller, _) = common::test_controller()?;

    let err = controller.import_file(&input, temp_dir.path(), false).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<tuforge::ConversionError>(),
        Some(tuforge::ConversionError::Encoding(_))
    ));
    Ok(())
}
