/*!
 * Tests for language utility functions
 */

use tuforge::language_utils::{
    SentenceRules, default_encoding, detect_encoding, get_language_name, primary_language,
    sentence_rules, validate_locale,
};

/// Test that locale tags reduce to their primary language
#[test]
fn test_primary_language_should_normalize_codes() {
    assert_eq!(primary_language("en").unwrap(), "en");
    assert_eq!(primary_language(" EN-gb ").unwrap(), "en");
    assert_eq!(primary_language("deu").unwrap(), "de");
    assert_eq!(primary_language("fre").unwrap(), "fr");
    assert_eq!(primary_language("zh_Hant_TW").unwrap(), "zh");
    assert!(primary_language("e").is_err());
    assert!(validate_locale("123").is_err());
}

/// Test language names for display
#[test]
fn test_get_language_name_should_return_english_name() {
    assert_eq!(get_language_name("ja-JP").unwrap(), "Japanese");
    assert_eq!(get_language_name("spa").unwrap(), "Spanish");
}

/// Test sentence rule selection per writing system
#[test]
fn test_sentence_rules_should_match_script() {
    assert_eq!(sentence_rules("zh-CN"), SentenceRules::Cjk);
    assert_eq!(sentence_rules("ar"), SentenceRules::Arabic);
    assert_eq!(sentence_rules("th"), SentenceRules::Thai);
    assert_eq!(sentence_rules("fr-CA"), SentenceRules::Latin);
    assert!(SentenceRules::Cjk.is_terminator('。'));
    assert!(SentenceRules::is_full_width_terminator('！'));
}

/// Test encoding detection order
#[test]
fn test_detect_encoding_should_prefer_bom_then_utf8_then_declaration() {
    let bom = [0xEF, 0xBB, 0xBF, b'<', b'p', b'>'];
    assert_eq!(detect_encoding(&bom, "ja"), (encoding_rs::UTF_8, 3));

    assert_eq!(detect_encoding("<p>日本</p>".as_bytes(), "ja"), (encoding_rs::UTF_8, 0));

    let declared = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><p>\xE9</p>";
    assert_eq!(detect_encoding(declared, "ja").0, encoding_rs::WINDOWS_1252);

    let undeclared = b"<p>\xC6\xFC\xCB\xDC</p>";
    assert_eq!(detect_encoding(undeclared, "ru").0, default_encoding("ru"));
    assert_eq!(default_encoding("ru"), encoding_rs::WINDOWS_1251);
}
