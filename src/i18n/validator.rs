//! Write-path validation for translatable fields.
//!
//! Payloads are either a plain string (assigned to the default language) or a
//! mapping of language code to text. Validation is all-or-nothing per field:
//! every violation is collected and reported, and nothing is accepted if any
//! entry is invalid.
//!
//! Translation quality checks (URLs and years carried over from the default
//! text) only ever produce warnings.

use crate::i18n::{Language, LanguageRegistry, TranslatableField};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Length and presence rules of one translatable field.
///
/// Constraints belong to the entity schema, not to the translation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConstraint {
    /// Maximum length in characters, per language entry
    pub max_length: usize,

    /// Minimum length in characters for non-empty entries
    pub min_length: usize,

    /// Whether the field must always carry text, and the default language
    /// entry may never be cleared
    pub required: bool,
}

impl FieldConstraint {
    pub const fn required(max_length: usize) -> Self {
        Self {
            max_length,
            min_length: 0,
            required: true,
        }
    }

    pub const fn optional(max_length: usize) -> Self {
        Self {
            max_length,
            min_length: 0,
            required: false,
        }
    }

    pub const fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }
}

/// A candidate value for a translatable field as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TranslationInput {
    /// Text for the default language only
    Plain(String),
    /// Text for any number of languages
    Mapping(BTreeMap<String, String>),
}

/// Whether a payload creates a field or changes an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The field is new. Any single populated entry is enough.
    Create,
    /// The field exists. The default entry of a required field may not be
    /// cleared.
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    UnsupportedLanguage,
    DuplicateLanguage,
    TooLong { max: usize, actual: usize },
    TooShort { min: usize, actual: usize },
    Required,
    NoContent,
    UnknownField,
}

/// One rejected field or language entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl FieldViolation {
    pub fn new(field: &str, language: Option<&str>, kind: ViolationKind) -> Self {
        Self {
            field: field.to_string(),
            language: language.map(str::to_string),
            kind,
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match &self.language {
            Some(language) => format!("{}[{}]", self.field, language),
            None => self.field.clone(),
        };
        match &self.kind {
            ViolationKind::UnsupportedLanguage => {
                write!(f, "{target}: unsupported language code")
            }
            ViolationKind::DuplicateLanguage => {
                write!(f, "{target}: language given more than once")
            }
            ViolationKind::TooLong { max, actual } => {
                write!(f, "{target}: {actual} characters exceeds the maximum of {max}")
            }
            ViolationKind::TooShort { min, actual } => {
                write!(f, "{target}: {actual} characters is below the minimum of {min}")
            }
            ViolationKind::Required => write!(f, "{target}: a value is required"),
            ViolationKind::NoContent => {
                write!(f, "{target}: at least one language must have text")
            }
            ViolationKind::UnknownField => write!(f, "{target}: not a translatable field"),
        }
    }
}

/// A rejected payload, with every violation found.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("validation failed: {}", summarize(.violations))]
pub struct ValidationError {
    pub violations: Vec<FieldViolation>,
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validation report containing errors and warnings about a payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// Violations that reject the payload
    pub errors: Vec<FieldViolation>,

    /// Non-blocking quality notes
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }

    /// Fail with every collected error, or succeed with `value`.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError {
                violations: self.errors,
            })
        }
    }
}

/// Validator for translatable field payloads.
pub struct TranslationValidator;

static URL_REGEX: OnceLock<Regex> = OnceLock::new();
static YEAR_REGEX: OnceLock<Regex> = OnceLock::new();

impl TranslationValidator {
    /// Validate a payload into a set of normalized entries.
    ///
    /// Codes are rewritten to their registry spelling and values are trimmed.
    /// Presence of content across the whole field is not checked here; see
    /// [`TranslationValidator::validate_new_field`] and
    /// [`TranslationValidator::validate_merge`].
    pub fn validate_input(
        registry: &LanguageRegistry,
        field: &str,
        constraint: &FieldConstraint,
        input: &TranslationInput,
        mode: WriteMode,
    ) -> Result<TranslatableField, ValidationError> {
        let mut report = ValidationReport::new();
        let mut entries = TranslatableField::new();

        let pairs: Vec<(&str, &str)> = match input {
            TranslationInput::Plain(text) => vec![(registry.default_code(), text.as_str())],
            TranslationInput::Mapping(map) => {
                map.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
            }
        };

        // Codes are case-insensitive, so "AR" and "ar" name the same entry
        let mut seen = HashSet::new();
        for (code, text) in pairs {
            if let Ok(language) = Language::from_code(registry, code) {
                if !seen.insert(language.code()) {
                    report.errors.push(FieldViolation::new(
                        field,
                        Some(code.trim()),
                        ViolationKind::DuplicateLanguage,
                    ));
                    continue;
                }
            }

            if let Some((language, text)) =
                Self::check_entry(&mut report, registry, field, constraint, code, text, mode)
            {
                entries.set(language.code(), text);
            }
        }

        report.into_result(entries)
    }

    /// Validate the payload of a field being created with its entity.
    ///
    /// On top of the per-entry rules, the field must carry text in at least
    /// one language.
    pub fn validate_new_field(
        registry: &LanguageRegistry,
        field: &str,
        constraint: &FieldConstraint,
        input: &TranslationInput,
    ) -> Result<TranslatableField, ValidationError> {
        let entries = Self::validate_input(registry, field, constraint, input, WriteMode::Create)?;

        if !entries.has_content() {
            return Err(ValidationError {
                violations: vec![FieldViolation::new(field, None, ViolationKind::NoContent)],
            });
        }

        Ok(entries)
    }

    /// Validate several entries against an existing field and return the
    /// merged result. Keys not in the payload are kept as they are.
    pub fn validate_merge(
        registry: &LanguageRegistry,
        field: &str,
        constraint: &FieldConstraint,
        current: &TranslatableField,
        input: &TranslationInput,
    ) -> Result<TranslatableField, ValidationError> {
        let patch = Self::validate_input(registry, field, constraint, input, WriteMode::Update)?;

        let mut merged = current.clone();
        for (code, text) in patch.into_entries() {
            merged.set(code, text);
        }

        if constraint.required && !merged.has_content() {
            return Err(ValidationError {
                violations: vec![FieldViolation::new(field, None, ViolationKind::NoContent)],
            });
        }

        Ok(merged)
    }

    /// Validate a single language entry for an existing field.
    pub fn validate_entry(
        registry: &LanguageRegistry,
        field: &str,
        constraint: &FieldConstraint,
        code: &str,
        text: &str,
    ) -> Result<(Language, String), ValidationError> {
        let mut report = ValidationReport::new();
        let checked = Self::check_entry(
            &mut report,
            registry,
            field,
            constraint,
            code,
            text,
            WriteMode::Update,
        );

        match checked {
            Some(entry) if !report.has_errors() => Ok(entry),
            _ => Err(ValidationError {
                violations: report.errors,
            }),
        }
    }

    fn check_entry(
        report: &mut ValidationReport,
        registry: &LanguageRegistry,
        field: &str,
        constraint: &FieldConstraint,
        code: &str,
        text: &str,
        mode: WriteMode,
    ) -> Option<(Language, String)> {
        let Ok(language) = Language::from_code(registry, code) else {
            report.errors.push(FieldViolation::new(
                field,
                Some(code.trim()),
                ViolationKind::UnsupportedLanguage,
            ));
            return None;
        };

        let text = text.trim();
        let length = text.chars().count();
        let before = report.errors.len();

        if length > constraint.max_length {
            report.errors.push(FieldViolation::new(
                field,
                Some(language.code()),
                ViolationKind::TooLong {
                    max: constraint.max_length,
                    actual: length,
                },
            ));
        }

        if length > 0 && length < constraint.min_length {
            report.errors.push(FieldViolation::new(
                field,
                Some(language.code()),
                ViolationKind::TooShort {
                    min: constraint.min_length,
                    actual: length,
                },
            ));
        }

        if length == 0
            && mode == WriteMode::Update
            && constraint.required
            && language.is_default(registry)
        {
            report.errors.push(FieldViolation::new(
                field,
                Some(language.code()),
                ViolationKind::Required,
            ));
        }

        (report.errors.len() == before).then(|| (language, text.to_string()))
    }

    /// Compare a translation with the default-language text it was made from.
    ///
    /// Checks that URLs and four-digit years survive translation. Eastern
    /// Arabic digits are read as their ASCII equivalents.
    pub fn compare(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        let orig_urls = Self::extract_urls(original);
        let trans_urls = Self::extract_urls(translated);
        if orig_urls != trans_urls {
            report.warnings.push(format!(
                "URL mismatch: original has {} URLs, translation has {} URLs",
                orig_urls.len(),
                trans_urls.len()
            ));
        }

        let mut orig_years = Self::extract_years(original);
        let mut trans_years = Self::extract_years(translated);
        orig_years.sort();
        trans_years.sort();
        if orig_years != trans_years {
            report.warnings.push(format!(
                "Year mismatch: original has {:?}, translation has {:?}",
                orig_years, trans_years
            ));
        }

        report
    }

    /// Quality warnings for writing `text` into `code` of `field`.
    ///
    /// Only non-default entries are compared, and only when the default entry
    /// has text.
    pub fn quality_warnings(
        registry: &LanguageRegistry,
        field: &TranslatableField,
        code: &str,
        text: &str,
    ) -> Vec<String> {
        let default = registry.default_code();
        if code == default || text.trim().is_empty() {
            return Vec::new();
        }

        match field.text(default) {
            Some(original) => Self::compare(original, text).warnings,
            None => Vec::new(),
        }
    }

    fn extract_urls(text: &str) -> Vec<String> {
        let regex = URL_REGEX.get_or_init(|| {
            Regex::new(r"https?://[^\s)\]]+").expect("URL pattern is valid")
        });

        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn extract_years(text: &str) -> Vec<String> {
        let regex = YEAR_REGEX.get_or_init(|| {
            Regex::new(r"(?:^|[^0-9])(1[0-9]{3}|20[0-9]{2})(?:[^0-9]|$)")
                .expect("year pattern is valid")
        });

        let normalized = normalize_digits(text);
        regex
            .captures_iter(&normalized)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }
}

/// Rewrite Eastern Arabic (U+0660..U+0669) and Persian (U+06F0..U+06F9)
/// digits as ASCII.
fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE: FieldConstraint = FieldConstraint::required(20);
    const SUBTITLE: FieldConstraint = FieldConstraint::optional(20);

    fn registry() -> &'static LanguageRegistry {
        LanguageRegistry::get()
    }

    fn mapping(pairs: &[(&str, &str)]) -> TranslationInput {
        TranslationInput::Mapping(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    // ==================== Input Shape Tests ====================

    #[test]
    fn test_deserialize_plain_and_mapping() {
        let plain: TranslationInput = serde_json::from_str(r#""Titre""#).unwrap();
        assert_eq!(plain, TranslationInput::Plain("Titre".to_string()));

        let map: TranslationInput = serde_json::from_str(r#"{"fr": "Titre"}"#).unwrap();
        assert_eq!(map, mapping(&[("fr", "Titre")]));
    }

    #[test]
    fn test_plain_string_goes_to_default_language() {
        let field = TranslationValidator::validate_new_field(
            registry(),
            "title",
            &TITLE,
            &TranslationInput::Plain("  قصبة  ".to_string()),
        )
        .unwrap();

        assert_eq!(field.len(), 1);
        assert_eq!(field.get("ar"), Some("قصبة"));
    }

    #[test]
    fn test_mapping_codes_are_normalized() {
        let field = TranslationValidator::validate_new_field(
            registry(),
            "title",
            &TITLE,
            &mapping(&[("FR", "Titre"), ("Ber-Arab", "")]),
        )
        .unwrap();

        assert_eq!(field.get("fr"), Some("Titre"));
        assert_eq!(field.get("ber-arab"), Some(""));
    }

    // ==================== Rejection Tests ====================

    #[test]
    fn test_unknown_code_rejects_whole_payload() {
        let err = TranslationValidator::validate_new_field(
            registry(),
            "title",
            &TITLE,
            &mapping(&[("fr", "Titre"), ("es", "Título")]),
        )
        .unwrap_err();

        assert_eq!(
            err.violations,
            vec![FieldViolation::new(
                "title",
                Some("es"),
                ViolationKind::UnsupportedLanguage
            )]
        );
    }

    #[test]
    fn test_same_code_in_two_cases_is_rejected() {
        let err = TranslationValidator::validate_new_field(
            registry(),
            "title",
            &TITLE,
            &mapping(&[("AR", "Festival text"), ("ar", ""), ("fr", "Titre")]),
        )
        .unwrap_err();

        assert_eq!(
            err.violations,
            vec![FieldViolation::new(
                "title",
                Some("ar"),
                ViolationKind::DuplicateLanguage
            )]
        );
    }

    #[test]
    fn test_merge_with_duplicate_code_keeps_current() {
        let current: TranslatableField = [("ar", "قصبة"), ("fr", "Casbah")].into_iter().collect();
        let err = TranslationValidator::validate_merge(
            registry(),
            "title",
            &TITLE,
            &current,
            &mapping(&[("FR", "Kasbah"), ("fr", "")]),
        )
        .unwrap_err();

        assert_eq!(err.violations[0].kind, ViolationKind::DuplicateLanguage);
        assert_eq!(current.get("fr"), Some("Casbah"));
    }

    #[test]
    fn test_all_violations_are_reported() {
        let err = TranslationValidator::validate_input(
            registry(),
            "title",
            &TITLE,
            &mapping(&[("xx", "a"), ("fr", "a title that is far too long")]),
            WriteMode::Create,
        )
        .unwrap_err();

        assert_eq!(err.violations.len(), 2);
        assert!(err.violations.iter().any(|v| v.language.as_deref() == Some("xx")));
        assert!(err.violations.iter().any(|v| matches!(
            v.kind,
            ViolationKind::TooLong { max: 20, actual: 28 }
        )));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 20 Arabic letters are 40 bytes
        let text = "ب".repeat(20);
        let result = TranslationValidator::validate_entry(registry(), "title", &TITLE, "ar", &text);
        assert!(result.is_ok());
    }

    #[test]
    fn test_min_length_ignores_empty_entries() {
        let constraint = FieldConstraint::optional(50).with_min_length(3);

        let short =
            TranslationValidator::validate_entry(registry(), "name", &constraint, "fr", "ab");
        assert!(matches!(
            short.unwrap_err().violations[0].kind,
            ViolationKind::TooShort { min: 3, actual: 2 }
        ));

        let cleared =
            TranslationValidator::validate_entry(registry(), "name", &constraint, "fr", "");
        assert!(cleared.is_ok());
    }

    #[test]
    fn test_new_field_requires_content() {
        let err = TranslationValidator::validate_new_field(
            registry(),
            "title",
            &TITLE,
            &mapping(&[("ar", ""), ("fr", "   ")]),
        )
        .unwrap_err();

        assert_eq!(err.violations[0].kind, ViolationKind::NoContent);
        assert_eq!(err.violations[0].language, None);
    }

    #[test]
    fn test_new_field_without_default_entry_is_accepted() {
        let field = TranslationValidator::validate_new_field(
            registry(),
            "title",
            &TITLE,
            &mapping(&[("fr", "Titre")]),
        )
        .unwrap();

        assert_eq!(field.get("ar"), None);
    }

    // ==================== Entry Tests ====================

    #[test]
    fn test_clearing_default_of_required_field_is_rejected() {
        let err = TranslationValidator::validate_entry(registry(), "title", &TITLE, "ar", " ")
            .unwrap_err();
        assert_eq!(
            err.violations,
            vec![FieldViolation::new("title", Some("ar"), ViolationKind::Required)]
        );
    }

    #[test]
    fn test_clearing_non_default_is_allowed() {
        let (language, text) =
            TranslationValidator::validate_entry(registry(), "title", &TITLE, "fr", "").unwrap();
        assert_eq!(language.code(), "fr");
        assert_eq!(text, "");
    }

    #[test]
    fn test_clearing_default_of_optional_field_is_allowed() {
        let cleared =
            TranslationValidator::validate_entry(registry(), "subtitle", &SUBTITLE, "ar", "");
        assert!(cleared.is_ok());
    }

    #[test]
    fn test_entry_unsupported_code() {
        let err = TranslationValidator::validate_entry(registry(), "title", &TITLE, "es", "Hola")
            .unwrap_err();
        assert_eq!(err.violations[0].kind, ViolationKind::UnsupportedLanguage);
        assert!(err.to_string().contains("title[es]"));
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_merge_keeps_untouched_entries() {
        let current: TranslatableField = [("ar", "قصبة"), ("fr", "Casbah")].into_iter().collect();
        let merged = TranslationValidator::validate_merge(
            registry(),
            "title",
            &TITLE,
            &current,
            &mapping(&[("en", "Casbah"), ("fr", "La Casbah")]),
        )
        .unwrap();

        assert_eq!(merged.get("ar"), Some("قصبة"));
        assert_eq!(merged.get("fr"), Some("La Casbah"));
        assert_eq!(merged.get("en"), Some("Casbah"));
    }

    #[test]
    fn test_merge_cannot_empty_required_field() {
        let current: TranslatableField = [("fr", "Casbah")].into_iter().collect();
        let err = TranslationValidator::validate_merge(
            registry(),
            "title",
            &TITLE,
            &current,
            &mapping(&[("fr", "")]),
        )
        .unwrap_err();

        assert_eq!(err.violations[0].kind, ViolationKind::NoContent);
    }

    // ==================== Quality Warning Tests ====================

    #[test]
    fn test_compare_clean_translation() {
        let report = TranslationValidator::compare(
            "بنيت سنة 1516، انظر https://example.org/casbah",
            "Built in 1516, see https://example.org/casbah",
        );
        assert!(report.is_clean());
    }

    #[test]
    fn test_compare_eastern_arabic_digits() {
        let report = TranslationValidator::compare("بنيت سنة ١٥١٦", "Built in 1516");
        assert!(report.is_clean());
    }

    #[test]
    fn test_compare_missing_year() {
        let report = TranslationValidator::compare("Fondée en 1830", "Founded long ago");
        assert!(report.has_warnings());
        assert!(report.warnings[0].contains("Year mismatch"));
    }

    #[test]
    fn test_compare_missing_url() {
        let report = TranslationValidator::compare("Voir https://example.org", "Voir le site");
        assert!(report.warnings[0].contains("URL mismatch"));
    }

    #[test]
    fn test_quality_warnings_skip_default_and_empty() {
        let field: TranslatableField = [("ar", "سنة 1962")].into_iter().collect();

        assert!(TranslationValidator::quality_warnings(registry(), &field, "ar", "x").is_empty());
        assert!(TranslationValidator::quality_warnings(registry(), &field, "fr", "").is_empty());
        assert_eq!(
            TranslationValidator::quality_warnings(registry(), &field, "fr", "L'année").len(),
            1
        );
    }

    #[test]
    fn test_violation_serializes_flat() {
        let violation = FieldViolation::new(
            "title",
            Some("fr"),
            ViolationKind::TooLong { max: 5, actual: 9 },
        );
        let json = serde_json::to_value(&violation).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "field": "title",
                "language": "fr",
                "kind": "too_long",
                "max": 5,
                "actual": 9
            })
        );
    }
}
