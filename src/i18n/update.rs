//! Granular translation updates: change exactly one language entry of a field.
//!
//! The update is computed here as a pure function of the current mapping; the
//! caller is responsible for running it inside one atomic read-modify-write
//! against storage so that concurrent updates to sibling entries are never
//! lost.

use crate::i18n::{
    FieldConstraint, FieldViolation, Language, LanguageRegistry, TranslatableField,
    TranslationValidator, ValidationError, ViolationKind,
};
use serde::Serialize;

/// State of one language entry within a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Absent,
    Empty,
    Populated,
}

impl EntryState {
    pub fn of(field: &TranslatableField, code: &str) -> Self {
        match field.get(code) {
            None => EntryState::Absent,
            Some(text) if text.trim().is_empty() => EntryState::Empty,
            Some(_) => EntryState::Populated,
        }
    }
}

/// Result of applying one granular update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranularUpdate {
    pub language: Language,
    /// The accepted (trimmed) value
    pub value: String,
    pub from: EntryState,
    pub to: EntryState,
    /// The whole mapping after the update
    pub field: TranslatableField,
    /// Non-blocking translation quality notes
    pub warnings: Vec<String>,
}

impl GranularUpdate {
    /// Whether the stored mapping actually changed.
    pub fn is_change(&self, before: &TranslatableField) -> bool {
        before.get(self.language.code()) != Some(self.value.as_str())
    }
}

/// Set `code` of `current` to `text`, leaving every other entry untouched.
///
/// # Errors
/// Rejects unsupported codes, values breaking `constraint`, clearing the
/// default entry of a required field, and any update that would leave a
/// required field without text in every language.
pub fn apply_granular_update(
    registry: &LanguageRegistry,
    field_name: &str,
    constraint: &FieldConstraint,
    current: &TranslatableField,
    code: &str,
    text: &str,
) -> Result<GranularUpdate, ValidationError> {
    let (language, value) =
        TranslationValidator::validate_entry(registry, field_name, constraint, code, text)?;

    let mut field = current.clone();
    field.set(language.code(), value.clone());

    if constraint.required && !field.has_content() {
        return Err(ValidationError {
            violations: vec![FieldViolation::new(
                field_name,
                Some(language.code()),
                ViolationKind::NoContent,
            )],
        });
    }

    let warnings =
        TranslationValidator::quality_warnings(registry, &field, language.code(), &value);

    Ok(GranularUpdate {
        language,
        from: EntryState::of(current, language.code()),
        to: EntryState::of(&field, language.code()),
        value,
        field,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLE: FieldConstraint = FieldConstraint::required(120);

    fn registry() -> &'static LanguageRegistry {
        LanguageRegistry::get()
    }

    fn field(pairs: &[(&str, &str)]) -> TranslatableField {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_first_translation_absent_to_populated() {
        let current = field(&[("ar", "قصر الداي")]);
        let update =
            apply_granular_update(registry(), "title", &TITLE, &current, "fr", "Palais du Dey")
                .unwrap();

        assert_eq!(update.from, EntryState::Absent);
        assert_eq!(update.to, EntryState::Populated);
        assert_eq!(update.field.get("fr"), Some("Palais du Dey"));
        assert!(update.is_change(&current));
    }

    #[test]
    fn test_siblings_are_preserved() {
        let current = field(&[("ar", "قصر الداي"), ("fr", "Palais du Dey"), ("ber", "")]);
        let update =
            apply_granular_update(registry(), "title", &TITLE, &current, "en", "Dey's Palace")
                .unwrap();

        assert_eq!(update.field.get("ar"), Some("قصر الداي"));
        assert_eq!(update.field.get("fr"), Some("Palais du Dey"));
        assert_eq!(update.field.get("ber"), Some(""));
        assert_eq!(update.field.len(), 4);
    }

    #[test]
    fn test_clearing_non_default_entry() {
        let current = field(&[("ar", "قصر الداي"), ("fr", "Palais du Dey")]);
        let update =
            apply_granular_update(registry(), "title", &TITLE, &current, "fr", "").unwrap();

        assert_eq!(update.from, EntryState::Populated);
        assert_eq!(update.to, EntryState::Empty);
        assert_eq!(update.field.get("fr"), Some(""));
    }

    #[test]
    fn test_clearing_default_entry_of_required_field_is_rejected() {
        let current = field(&[("ar", "قصر الداي"), ("fr", "Palais du Dey")]);
        let err =
            apply_granular_update(registry(), "title", &TITLE, &current, "ar", "").unwrap_err();

        assert_eq!(err.violations[0].kind, ViolationKind::Required);
        assert_eq!(err.violations[0].language.as_deref(), Some("ar"));
    }

    #[test]
    fn test_clearing_last_content_is_rejected() {
        let current = field(&[("fr", "Palais du Dey")]);
        let err =
            apply_granular_update(registry(), "title", &TITLE, &current, "fr", "").unwrap_err();

        assert_eq!(err.violations[0].kind, ViolationKind::NoContent);
    }

    #[test]
    fn test_unsupported_code_is_rejected() {
        let current = field(&[("ar", "قصر الداي")]);
        let err = apply_granular_update(registry(), "title", &TITLE, &current, "es", "Palacio")
            .unwrap_err();

        assert_eq!(err.violations[0].kind, ViolationKind::UnsupportedLanguage);
    }

    #[test]
    fn test_same_value_twice_is_idempotent() {
        let current = field(&[("ar", "قصر الداي")]);
        let once = apply_granular_update(registry(), "title", &TITLE, &current, "fr", "Palais")
            .unwrap();
        let twice = apply_granular_update(registry(), "title", &TITLE, &once.field, "fr", "Palais")
            .unwrap();

        assert_eq!(once.field, twice.field);
        assert!(!twice.is_change(&once.field));
    }

    #[test]
    fn test_update_then_resolve_round_trip() {
        let current = field(&[("ar", "قصر الداي")]);
        let update =
            apply_granular_update(registry(), "title", &TITLE, &current, "ber", "  Tigemmi  ")
                .unwrap();

        assert_eq!(update.value, "Tigemmi");
        assert_eq!(update.field.resolve(registry(), "ber"), "Tigemmi");
    }

    #[test]
    fn test_quality_warnings_are_reported_not_enforced() {
        let current = field(&[("ar", "شيد سنة 1799")]);
        let update =
            apply_granular_update(registry(), "title", &TITLE, &current, "fr", "Construit jadis")
                .unwrap();

        assert_eq!(update.warnings.len(), 1);
        assert_eq!(update.field.get("fr"), Some("Construit jadis"));
    }
}
