//! Language registry: Single source of truth for all supported content languages.
//!
//! The registry is process-wide, read-only configuration. The built-in set is
//! initialized lazily through a `OnceLock`; a deployment may re-designate the
//! default language once at startup with [`LanguageRegistry::with_default`].

use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;

/// Configuration for a supported content language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfig {
    /// Registry code (e.g., "ar", "fr", "ber-arab")
    pub code: &'static str,

    /// English display label (e.g., "Arabic", "French")
    pub label: &'static str,

    /// Label in the language itself (e.g., "العربية", "Français")
    pub native_label: &'static str,

    /// Whether content in this language renders right-to-left
    #[serde(rename = "isRtl")]
    pub is_rtl: bool,

    /// Whether this is the default language (exactly one must be true)
    pub is_default: bool,
}

/// Errors raised while building a registry. Lookups never fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("language registry must contain at least one language")]
    Empty,

    #[error("language code '{0}' is declared more than once")]
    DuplicateCode(String),

    #[error("no default language declared")]
    NoDefault,

    #[error("multiple default languages declared: {0:?}")]
    MultipleDefaults(Vec<String>),

    #[error("default language '{0}' is not a supported language")]
    UnknownDefault(String),
}

/// The closed set of languages content can be stored and served in.
///
/// Declaration order is significant: it is the order used when resolution has
/// to pick "any available" language.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

/// Built-in registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the built-in language registry.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Build a registry from an explicit language list.
    ///
    /// # Errors
    /// Rejects an empty list, duplicate codes (case-insensitive) and any list
    /// that does not declare exactly one default.
    pub fn new(languages: Vec<LanguageConfig>) -> Result<Self, RegistryError> {
        if languages.is_empty() {
            return Err(RegistryError::Empty);
        }

        for (i, lang) in languages.iter().enumerate() {
            if languages[..i]
                .iter()
                .any(|other| other.code.eq_ignore_ascii_case(lang.code))
            {
                return Err(RegistryError::DuplicateCode(lang.code.to_string()));
            }
        }

        let defaults: Vec<_> = languages
            .iter()
            .filter(|lang| lang.is_default)
            .map(|lang| lang.code.to_string())
            .collect();

        match defaults.len() {
            0 => Err(RegistryError::NoDefault),
            1 => Ok(Self { languages }),
            _ => Err(RegistryError::MultipleDefaults(defaults)),
        }
    }

    /// Return a copy of this registry with `code` designated as the default.
    pub fn with_default(&self, code: &str) -> Result<Self, RegistryError> {
        let target = self
            .get_by_code(code)
            .ok_or_else(|| RegistryError::UnknownDefault(code.to_string()))?
            .code;

        let languages = self
            .languages
            .iter()
            .map(|lang| LanguageConfig {
                is_default: lang.code == target,
                ..lang.clone()
            })
            .collect();

        Self::new(languages)
    }

    /// Get a language configuration by its code (case-insensitive).
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        let code = code.trim();
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code))
    }

    /// Check if a language code is supported.
    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }

    /// Get the default language configuration.
    pub fn default_language(&self) -> &LanguageConfig {
        // `new` guarantees exactly one default, so the fallback is unreachable
        self.languages
            .iter()
            .find(|lang| lang.is_default)
            .unwrap_or(&self.languages[0])
    }

    /// Get the default language code.
    pub fn default_code(&self) -> &'static str {
        self.default_language().code
    }

    /// Whether `code` renders right-to-left. Unknown codes are left-to-right.
    pub fn is_rtl(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.is_rtl)
            .unwrap_or(false)
    }

    /// All languages, in declaration order.
    pub fn list_all(&self) -> &[LanguageConfig] {
        &self.languages
    }

    /// All codes, in declaration order.
    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.languages.iter().map(|lang| lang.code)
    }
}

/// Default language configurations.
///
/// Arabic is the default. Tamazight is carried in two scripts, Latin and
/// Arabic, each stored as its own entry.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "ar",
            label: "Arabic",
            native_label: "العربية",
            is_rtl: true,
            is_default: true,
        },
        LanguageConfig {
            code: "fr",
            label: "French",
            native_label: "Français",
            is_rtl: false,
            is_default: false,
        },
        LanguageConfig {
            code: "en",
            label: "English",
            native_label: "English",
            is_rtl: false,
            is_default: false,
        },
        LanguageConfig {
            code: "ber",
            label: "Tamazight (Latin)",
            native_label: "Tamaziɣt",
            is_rtl: false,
            is_default: false,
        },
        LanguageConfig {
            code: "ber-arab",
            label: "Tamazight (Arabic)",
            native_label: "تمازيغت",
            is_rtl: true,
            is_default: false,
        },
    ]
}
