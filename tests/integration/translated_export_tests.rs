/*!
 * Export of translated interchange files
 */

use std::fs;

use anyhow::Result;

use tuforge::interchange::InterchangeDocument;

use crate::common;

fn german(source: &str) -> String {
    source
        .replace("Hello", "Hallo")
        .replace("world", "Welt")
        .replace("Welcome aboard!", "Willkommen an Bord!")
        .replace("Company logo", "Firmenlogo")
}

#[test]
fn test_translated_units_should_land_in_the_original_layout() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "page.html", common::sample_page())?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    common::translate_interchange(&summary.artifacts.interchange, german)?;

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert!(export.report.fallback_units.is_empty());
    let output = fs::read_to_string(&export.output)?;
    assert!(output.contains("<p>Hallo <b>Welt</b>. This release is <i>faster</i>.</p>"));
    assert!(output.contains(r#"<img src="logo.png" alt="Firmenlogo"> Willkommen an Bord!</p>"#));
    assert!(output.contains("<script>if (a < b) { note.innerHTML = '<p>' + text + '</p>'; }</script>"));
    assert!(output.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
    Ok(())
}

#[test]
fn test_corrupted_unit_should_fall_back_to_plain_text() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "page.html", common::sample_page())?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    let mut document = InterchangeDocument::from_file(&summary.artifacts.interchange)?;
    let corrupted = document
        .units
        .iter_mut()
        .find(|unit| unit.source.contains("Hello"))
        .expect("unit with Hello");
    let corrupted_id = corrupted.id;
    let mut target = corrupted.source.replace("Hello", "Hallo");
    let start = target.find("<ex").expect("end tag in unit");
    let end = start + target[start..].find("/>").expect("closed tag") + 2;
    target.replace_range(start..end, "");
    corrupted.target = Some(target);
    document.save(&summary.artifacts.interchange)?;

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert_eq!(export.report.fallback_units, vec![corrupted_id]);
    let output = fs::read_to_string(&export.output)?;
    assert!(output.contains("<p>Hallo world. This release is <i>faster</i>.</p>"));
    Ok(())
}

#[test]
fn test_unit_missing_from_interchange_should_expand_to_nothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "two.html", "<p>One.</p><p>Two.</p>")?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    let mut document = InterchangeDocument::from_file(&summary.artifacts.interchange)?;
    document.units.retain(|unit| !unit.source.contains("Two"));
    document.save(&summary.artifacts.interchange)?;

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    assert_eq!(export.report.missing_units, vec![2]);
    assert_eq!(fs::read_to_string(&export.output)?, "<p>One.</p><p></p>");
    Ok(())
}

#[test]
fn test_characters_outside_target_encoding_become_references() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut bytes = b"<meta charset=\"windows-1252\"><p>Caf".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b".</p>");
    let input = common::create_test_bytes(temp_dir.path(), "cafe.html", &bytes)?;
    let (controller, _) = common::test_controller()?;

    let summary = controller.import_file(&input, temp_dir.path(), false)?;
    common::translate_interchange(&summary.artifacts.interchange, |source| source.replace("Café", "Кафе"))?;

    let export = controller.export_file(&input, temp_dir.path(), None)?;
    let output = fs::read(&export.output)?;
    let expected = b"<meta charset=\"windows-1252\"><p>&#1050;&#1072;&#1092;&#1077;.</p>".to_vec();
    assert_eq!(output, expected);
    Ok(())
}
