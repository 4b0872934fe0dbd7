//! Translatable fields and the read-path resolution engine.
//!
//! A [`TranslatableField`] maps registry codes to text. Resolution turns it
//! into a single display string with a fixed fallback chain:
//!
//! 1. the requested language, if non-empty
//! 2. the registry default, if non-empty
//! 3. the first non-empty entry in registry declaration order
//! 4. the empty string
//!
//! Resolution never fails: a missing translation degrades to another
//! language rather than to a blank field.

use crate::i18n::LanguageRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-language text of one (entity type, entity id, field name).
///
/// Entries may be absent or empty (partial translation). Keys are normally
/// registry codes; the write path guarantees it, and resolution ignores any
/// stray key that is not in the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslatableField {
    entries: BTreeMap<String, String>,
}

/// Which step of the fallback chain produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Requested,
    Default,
    Available,
    Empty,
}

/// A resolved display value. Derived per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue<'a> {
    pub text: &'a str,
    /// Registry code that supplied `text`, `None` when nothing was available.
    pub language: Option<&'static str>,
    pub source: ResolutionSource,
}

impl ResolvedValue<'_> {
    /// Whether the text came from a language other than the requested one.
    pub fn is_fallback(&self) -> bool {
        self.source != ResolutionSource::Requested
    }
}

impl TranslatableField {
    /// An empty field. Only valid as a starting point for validation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a stored mapping as-is.
    ///
    /// Intended for data loaded from storage, which was validated when written.
    pub fn from_entries(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Text stored for `code`, including empty entries.
    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// Non-empty text stored for `code`.
    pub fn text(&self, code: &str) -> Option<&str> {
        self.get(code).filter(|text| !text.trim().is_empty())
    }

    /// Set one entry, leaving every other entry untouched.
    pub fn set(&mut self, code: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(code.into(), text.into());
    }

    /// Whether at least one entry has text.
    pub fn has_content(&self) -> bool {
        self.entries.values().any(|text| !text.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, String> {
        self.entries
    }

    /// Resolve to a display string for `requested`.
    pub fn resolve<'a>(&'a self, registry: &LanguageRegistry, requested: &str) -> &'a str {
        self.resolve_detailed(registry, requested).text
    }

    /// Resolve and report which language and fallback step supplied the text.
    pub fn resolve_detailed<'a>(
        &'a self,
        registry: &LanguageRegistry,
        requested: &str,
    ) -> ResolvedValue<'a> {
        if let Some(config) = registry.get_by_code(requested) {
            if let Some(text) = self.text(config.code) {
                return ResolvedValue {
                    text,
                    language: Some(config.code),
                    source: ResolutionSource::Requested,
                };
            }
        }

        let default = registry.default_code();
        if let Some(text) = self.text(default) {
            return ResolvedValue {
                text,
                language: Some(default),
                source: ResolutionSource::Default,
            };
        }

        registry
            .codes()
            .find_map(|code| {
                self.text(code).map(|text| ResolvedValue {
                    text,
                    language: Some(code),
                    source: ResolutionSource::Available,
                })
            })
            .unwrap_or(ResolvedValue {
                text: "",
                language: None,
                source: ResolutionSource::Empty,
            })
    }
}

impl From<BTreeMap<String, String>> for TranslatableField {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self::from_entries(entries)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TranslatableField {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> &'static LanguageRegistry {
        LanguageRegistry::get()
    }

    fn field(pairs: &[(&str, &str)]) -> TranslatableField {
        pairs.iter().copied().collect()
    }

    // ==================== Fallback Chain Tests ====================

    #[test]
    fn test_resolve_requested_language() {
        let title = field(&[("ar", "العنوان"), ("fr", "Titre"), ("en", "Title")]);
        let resolved = title.resolve_detailed(registry(), "en");

        assert_eq!(resolved.text, "Title");
        assert_eq!(resolved.language, Some("en"));
        assert_eq!(resolved.source, ResolutionSource::Requested);
        assert!(!resolved.is_fallback());
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let title = field(&[("ar", "العنوان"), ("fr", "Titre")]);
        let resolved = title.resolve_detailed(registry(), "en");

        assert_eq!(resolved.text, "العنوان");
        assert_eq!(resolved.source, ResolutionSource::Default);
        assert!(resolved.is_fallback());
    }

    #[test]
    fn test_resolve_empty_requested_is_skipped() {
        let title = field(&[("fr", "Titre"), ("ar", "")]);
        assert_eq!(title.resolve(registry(), "ar"), "Titre");
    }

    #[test]
    fn test_resolve_empty_requested_with_french_default() {
        let registry = LanguageRegistry::get().with_default("fr").unwrap();
        let title = field(&[("fr", "Titre"), ("ar", "")]);
        let resolved = title.resolve_detailed(&registry, "ar");

        assert_eq!(resolved.text, "Titre");
        assert_eq!(resolved.source, ResolutionSource::Default);
    }

    #[test]
    fn test_resolve_any_available_uses_registry_order() {
        // BTreeMap order would pick "ber" first; registry order picks "en"
        let name = field(&[("ber", "Isem"), ("en", "Name"), ("ar", "  ")]);
        let resolved = name.resolve_detailed(registry(), "fr");

        assert_eq!(resolved.text, "Name");
        assert_eq!(resolved.language, Some("en"));
        assert_eq!(resolved.source, ResolutionSource::Available);
    }

    #[test]
    fn test_resolve_no_content_returns_empty() {
        let blank = field(&[("ar", ""), ("fr", "   ")]);
        let resolved = blank.resolve_detailed(registry(), "fr");

        assert_eq!(resolved.text, "");
        assert_eq!(resolved.language, None);
        assert_eq!(resolved.source, ResolutionSource::Empty);

        assert_eq!(TranslatableField::new().resolve(registry(), "ar"), "");
    }

    #[test]
    fn test_resolve_unknown_requested_code() {
        let title = field(&[("ar", "العنوان"), ("fr", "Titre")]);
        assert_eq!(title.resolve(registry(), "es"), "العنوان");
    }

    #[test]
    fn test_resolve_ignores_keys_outside_registry() {
        let title = field(&[("es", "Título")]);
        assert_eq!(title.resolve(registry(), "es"), "");
    }

    #[test]
    fn test_resolve_requested_code_is_case_insensitive() {
        let title = field(&[("ar", "العنوان"), ("fr", "Titre")]);
        assert_eq!(title.resolve(registry(), "FR"), "Titre");
    }

    // ==================== Mapping Tests ====================

    #[test]
    fn test_set_preserves_siblings() {
        let mut title = field(&[("ar", "العنوان"), ("fr", "Titre")]);
        title.set("en", "Title");

        assert_eq!(title.get("ar"), Some("العنوان"));
        assert_eq!(title.get("fr"), Some("Titre"));
        assert_eq!(title.get("en"), Some("Title"));
        assert_eq!(title.len(), 3);
    }

    #[test]
    fn test_has_content() {
        assert!(field(&[("fr", "x")]).has_content());
        assert!(!field(&[("fr", " ")]).has_content());
        assert!(!TranslatableField::new().has_content());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let title = field(&[("fr", "Titre"), ("ar", "")]);
        let json = serde_json::to_value(&title).unwrap();
        assert_eq!(json, serde_json::json!({"ar": "", "fr": "Titre"}));

        let back: TranslatableField = serde_json::from_value(json).unwrap();
        assert_eq!(back, title);
    }
}
