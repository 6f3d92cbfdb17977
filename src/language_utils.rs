/*!
 * Locale handling and per-language tables.
 *
 * Validates and normalizes ISO 639-1 and ISO 639-2 codes, accepts full
 * locale tags such as `en-US` or `pt_BR`, and owns the immutable
 * per-language lookup tables used by the splitter and the readers.
 */

use std::collections::{HashMap, HashSet};

use anyhow::{Result, anyhow};
use encoding_rs::Encoding;
use isolang::Language;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// ISO 639-2/B codes that differ from their ISO 639-2/T form
static BIBLIOGRAPHIC_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("fre", "fra"),
        ("ger", "deu"),
        ("dut", "nld"),
        ("gre", "ell"),
        ("chi", "zho"),
        ("cze", "ces"),
        ("ice", "isl"),
        ("alb", "sqi"),
        ("arm", "hye"),
        ("baq", "eus"),
        ("bur", "mya"),
        ("per", "fas"),
        ("geo", "kat"),
        ("may", "msa"),
        ("mac", "mkd"),
        ("rum", "ron"),
        ("slo", "slk"),
        ("wel", "cym"),
    ])
});

/// Legacy default encoding per language, for documents that do not declare one
static DEFAULT_ENCODINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("ja", "shift_jis"),
        ("zh", "gbk"),
        ("ko", "euc-kr"),
        ("ru", "windows-1251"),
        ("uk", "windows-1251"),
        ("bg", "windows-1251"),
        ("el", "windows-1253"),
        ("tr", "windows-1254"),
        ("he", "windows-1255"),
        ("ar", "windows-1256"),
        ("th", "windows-874"),
        ("vi", "windows-1258"),
        ("pl", "windows-1250"),
        ("cs", "windows-1250"),
        ("hu", "windows-1250"),
    ])
});

/// Abbreviations that end in a period without ending a sentence
static ABBREVIATIONS: Lazy<HashMap<&'static str, HashSet<&'static str>>> = Lazy::new(|| {
    let table: [(&str, &[&str]); 7] = [
        ("en", &["mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd", "co", "no", "fig", "approx", "dept"]),
        ("de", &["z.b", "bzw", "usw", "ca", "dr", "nr", "str", "vgl", "d.h", "u.a", "evtl", "ggf"]),
        ("fr", &["m", "mme", "mlle", "dr", "etc", "p.ex", "cf", "env", "no"]),
        ("es", &["sr", "sra", "srta", "dr", "dra", "etc", "p.ej", "ud", "uds", "núm"]),
        ("it", &["sig", "sig.ra", "dott", "ecc", "es", "pag", "n"]),
        ("nl", &["dhr", "mevr", "dr", "bijv", "enz", "nr", "o.a"]),
        ("pt", &["sr", "sra", "dr", "dra", "etc", "ex", "pág", "n.º"]),
    ];
    table
        .into_iter()
        .map(|(lang, words)| (lang, words.iter().copied().collect()))
        .collect()
});

/// `charset=` declaration in a document head, XML or HTML
static CHARSET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:charset|encoding)\s*=\s*["']?([A-Za-z0-9_.:\-]+)"#).expect("Invalid charset regex")
});

static NO_ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(HashSet::new);

/// Sentence boundary rule family of a language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceRules {
    /// Terminator followed by whitespace, with abbreviation checks
    Latin,
    /// Full-width terminators end a sentence without following space
    Cjk,
    /// Danda terminators in addition to Latin punctuation
    Devanagari,
    /// Arabic question mark and full stop in addition to Latin punctuation
    Arabic,
    /// No sentence punctuation; only Latin terminators followed by space
    Thai,
}

impl SentenceRules {
    /// Whether `c` ends a sentence under these rules
    pub fn is_terminator(&self, c: char) -> bool {
        let latin = matches!(c, '.' | '!' | '?' | '…' | '‼' | '⁇');
        match self {
            Self::Latin | Self::Thai => latin,
            Self::Cjk => latin || Self::is_full_width_terminator(c),
            Self::Devanagari => latin || matches!(c, '।' | '॥'),
            Self::Arabic => latin || matches!(c, '؟' | '۔'),
        }
    }

    /// Full-width terminators end a sentence even when no space follows
    pub fn is_full_width_terminator(c: char) -> bool {
        matches!(c, '。' | '！' | '？' | '．' | '｡')
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if Language::from_639_1(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
    } else if normalized_code.len() == 3 {
        let part2t = BIBLIOGRAPHIC_CODES
            .get(normalized_code.as_str())
            .copied()
            .unwrap_or(normalized_code.as_str());

        if let Some(lang) = Language::from_639_3(part2t) {
            if let Some(code_639_1) = lang.to_639_1() {
                return Ok(code_639_1.to_string());
            }
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// English name of the language of a code or locale
pub fn get_language_name(code: &str) -> Result<String> {
    let primary = primary_language(code)?;
    let lang = Language::from_639_1(&primary)
        .or_else(|| Language::from_639_3(&primary))
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", primary))?;

    Ok(lang.to_name().to_string())
}

/// Primary language subtag of a locale (`en-US` -> `en`, `fre` -> `fr`)
pub fn primary_language(locale: &str) -> Result<String> {
    let subtag = locale
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default();
    normalize_to_part1_or_part2t(subtag)
        .map_err(|_| anyhow!("Invalid locale: {}", locale))
}

/// Validate a locale tag, returning its primary language
pub fn validate_locale(locale: &str) -> Result<String> {
    primary_language(locale)
}

/// Sentence rule family for a locale; unknown locales use Latin rules
pub fn sentence_rules(locale: &str) -> SentenceRules {
    match primary_language(locale).as_deref() {
        Ok("zh") | Ok("ja") | Ok("ko") => SentenceRules::Cjk,
        Ok("hi") | Ok("mr") | Ok("ne") | Ok("sa") | Ok("bn") => SentenceRules::Devanagari,
        Ok("ar") | Ok("fa") | Ok("ur") => SentenceRules::Arabic,
        Ok("th") | Ok("lo") | Ok("km") => SentenceRules::Thai,
        _ => SentenceRules::Latin,
    }
}

/// Lowercase abbreviations (without the final period) for a locale
pub fn abbreviations(locale: &str) -> &'static HashSet<&'static str> {
    primary_language(locale)
        .ok()
        .and_then(|lang| ABBREVIATIONS.get(lang.as_str()))
        .unwrap_or(&NO_ABBREVIATIONS)
}

/// Default legacy encoding for a locale; UTF-8 when no legacy default exists
pub fn default_encoding(locale: &str) -> &'static Encoding {
    primary_language(locale)
        .ok()
        .and_then(|lang| DEFAULT_ENCODINGS.get(lang.as_str()).copied())
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(encoding_rs::UTF_8)
}

/// Pick the encoding of a document, returning it with the BOM length.
///
/// A BOM wins, then valid UTF-8, then a charset declared in the first
/// kilobyte, then the legacy default of `locale`.
pub fn detect_encoding(bytes: &[u8], locale: &str) -> (&'static Encoding, usize) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return (encoding, bom_len);
    }
    if std::str::from_utf8(bytes).is_ok() {
        return (encoding_rs::UTF_8, 0);
    }
    let head = &bytes[..bytes.len().min(1024)];
    let declared = CHARSET_REGEX
        .captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .filter(|encoding| *encoding != encoding_rs::UTF_8);
    (declared.unwrap_or_else(|| default_encoding(locale)), 0)
}
