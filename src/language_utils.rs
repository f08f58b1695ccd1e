use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::TranslationError;

/// Language utilities for ISO language code handling
///
/// This module validates and normalizes ISO 639-1 (2-letter) and ISO 639-2
/// (3-letter) codes, and maps them into the code namespace of the fallback
/// multilingual model (FLORES-200 codes as used by NLLB-200).
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
    /// Code native to the fallback model (e.g. `deu_Latn`)
    FallbackNative,
}

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
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
];

/// ISO 639-1 code to fallback-model code. Several ISO codes may share a
/// fallback code (`nb`/`no`); the first row wins on reverse lookup.
const FALLBACK_CODES: &[(&str, &str)] = &[
    ("en", "eng_Latn"),
    ("de", "deu_Latn"),
    ("fr", "fra_Latn"),
    ("es", "spa_Latn"),
    ("it", "ita_Latn"),
    ("pt", "por_Latn"),
    ("nl", "nld_Latn"),
    ("pl", "pol_Latn"),
    ("ru", "rus_Cyrl"),
    ("uk", "ukr_Cyrl"),
    ("cs", "ces_Latn"),
    ("sk", "slk_Latn"),
    ("sl", "slv_Latn"),
    ("hr", "hrv_Latn"),
    ("sr", "srp_Cyrl"),
    ("bg", "bul_Cyrl"),
    ("mk", "mkd_Cyrl"),
    ("ro", "ron_Latn"),
    ("hu", "hun_Latn"),
    ("el", "ell_Grek"),
    ("sv", "swe_Latn"),
    ("da", "dan_Latn"),
    ("nb", "nob_Latn"),
    ("no", "nob_Latn"),
    ("fi", "fin_Latn"),
    ("et", "est_Latn"),
    ("lv", "lvs_Latn"),
    ("lt", "lit_Latn"),
    ("is", "isl_Latn"),
    ("ga", "gle_Latn"),
    ("cy", "cym_Latn"),
    ("eu", "eus_Latn"),
    ("ca", "cat_Latn"),
    ("gl", "glg_Latn"),
    ("mt", "mlt_Latn"),
    ("sq", "als_Latn"),
    ("tr", "tur_Latn"),
    ("az", "azj_Latn"),
    ("kk", "kaz_Cyrl"),
    ("ka", "kat_Geor"),
    ("hy", "hye_Armn"),
    ("ar", "arb_Arab"),
    ("he", "heb_Hebr"),
    ("fa", "pes_Arab"),
    ("ur", "urd_Arab"),
    ("hi", "hin_Deva"),
    ("bn", "ben_Beng"),
    ("pa", "pan_Guru"),
    ("gu", "guj_Gujr"),
    ("mr", "mar_Deva"),
    ("ne", "npi_Deva"),
    ("ta", "tam_Taml"),
    ("te", "tel_Telu"),
    ("kn", "kan_Knda"),
    ("ml", "mal_Mlym"),
    ("si", "sin_Sinh"),
    ("ja", "jpn_Jpan"),
    ("ko", "kor_Hang"),
    ("zh", "zho_Hans"),
    ("vi", "vie_Latn"),
    ("th", "tha_Thai"),
    ("lo", "lao_Laoo"),
    ("km", "khm_Khmr"),
    ("my", "mya_Mymr"),
    ("id", "ind_Latn"),
    ("ms", "zsm_Latn"),
    ("tl", "tgl_Latn"),
    ("sw", "swh_Latn"),
    ("am", "amh_Ethi"),
    ("so", "som_Latn"),
    ("ha", "hau_Latn"),
    ("yo", "yor_Latn"),
    ("zu", "zul_Latn"),
    ("af", "afr_Latn"),
    ("eo", "epo_Latn"),
];

/// Shape of a fallback-model native code
static FALLBACK_CODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{3}_[A-Za-z]{4}$").expect("Invalid fallback code regex")
});

/// Resolve an ISO 639-2/B code to its ISO 639-2/T form
fn terminological_code(code: &str) -> &str {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(bibliographic, _)| *bibliographic == code)
        .map(|(_, terminological)| *terminological)
        .unwrap_or(code)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code,
/// or a well-formed fallback-model code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let trimmed = code.trim();
    if FALLBACK_CODE_REGEX.is_match(trimmed) {
        return Ok(LanguageCodeType::FallbackNative);
    }

    let normalized_code = trimmed.to_lowercase();
    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if terminological_code(&normalized_code) != normalized_code => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        let part2t = terminological_code(&normalized_code);
        if Language::from_639_3(part2t).is_some() {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(lang
        .to_639_1()
        .map(|part1| part1.to_string())
        .unwrap_or(part2t))
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let parsed = LanguageCode::parse(code).map_err(|e| anyhow!("{}", e))?;
    let part2t = normalize_to_part2t(parsed.as_str())
        .unwrap_or_else(|_| parsed.as_str().to_string());

    match Language::from_639_3(&part2t) {
        Some(lang) => Ok(lang.to_name().to_string()),
        // Native codes without an ISO equivalent are named by themselves
        None => Ok(parsed.as_str().to_string()),
    }
}

/// Look up the fallback-model code for an ISO 639-1 code
pub fn fallback_code_for(iso_code: &str) -> Option<&'static str> {
    FALLBACK_CODES
        .iter()
        .find(|(iso, _)| *iso == iso_code)
        .map(|(_, native)| *native)
}

/// Look up the ISO 639-1 code for a fallback-model code
pub fn iso_code_for_fallback(native_code: &str) -> Option<&'static str> {
    FALLBACK_CODES
        .iter()
        .find(|(_, native)| *native == native_code)
        .map(|(iso, _)| *iso)
}

/// Canonical form of a fallback-model code: `deu_latn` -> `deu_Latn`
fn canonical_fallback_code(code: &str) -> String {
    let (language, script) = code.split_at(3);
    let mut script_chars = script[1..].chars();
    let script = match script_chars.next() {
        Some(first) => first.to_uppercase().chain(script_chars.flat_map(|c| c.to_lowercase())).collect::<String>(),
        None => String::new(),
    };
    format!("{}_{}", language.to_lowercase(), script)
}

/// A validated language code with its fallback-model equivalent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LanguageCode {
    /// Canonical code: ISO 639-1 when one exists, otherwise ISO 639-2/T or the native code
    code: String,
    /// Code in the fallback model's namespace, if known
    fallback_code: Option<String>,
}

impl LanguageCode {
    /// Parse and normalize a user-supplied language code.
    ///
    /// Accepts ISO 639-1, ISO 639-2/T, ISO 639-2/B, region-qualified tags
    /// (`pt-BR`, only the language part is kept) and fallback-model codes
    /// (`jpn_Jpan`), which are taken verbatim.
    pub fn parse(raw: &str) -> Result<Self, TranslationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TranslationError::UnsupportedLanguage {
                code: raw.to_string(),
                reason: "empty language code".to_string(),
            });
        }

        if FALLBACK_CODE_REGEX.is_match(trimmed) {
            let native = canonical_fallback_code(trimmed);
            let code = iso_code_for_fallback(&native)
                .map(str::to_string)
                .unwrap_or_else(|| native.clone());
            return Ok(Self {
                code,
                fallback_code: Some(native),
            });
        }

        let language_part = trimmed
            .split(['-', '_'])
            .next()
            .unwrap_or(trimmed);

        validate_language_code(language_part).map_err(|e| TranslationError::UnsupportedLanguage {
            code: raw.to_string(),
            reason: e.to_string(),
        })?;

        let code = normalize_to_part1_or_part2t(language_part).map_err(|e| {
            TranslationError::UnsupportedLanguage {
                code: raw.to_string(),
                reason: e.to_string(),
            }
        })?;
        let fallback_code = fallback_code_for(&code).map(str::to_string);

        Ok(Self { code, fallback_code })
    }

    /// The canonical code
    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// The fallback-model code, if the language has one
    pub fn fallback_code(&self) -> Option<&str> {
        self.fallback_code.as_deref()
    }

    /// Whether this is English, the pivot language
    pub fn is_english(&self) -> bool {
        self.code == "en"
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Ordered (source, target) pair of validated language codes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LanguagePair {
    pub source: LanguageCode,
    pub target: LanguageCode,
}

impl LanguagePair {
    /// Parse both sides of a pair
    pub fn new(source: &str, target: &str) -> Result<Self, TranslationError> {
        Ok(Self {
            source: LanguageCode::parse(source)?,
            target: LanguageCode::parse(target)?,
        })
    }
}

impl std::fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}
