//! Language type: a code that has been validated against a registry.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Raised when a code is not part of the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported language code: '{0}'")]
pub struct UnsupportedLanguage(pub String);

/// A validated language.
///
/// Only codes present in a [`LanguageRegistry`] can be turned into a
/// `Language`, and the stored code is always the registry's own spelling
/// (so `"FR"` becomes `"fr"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Language {
    code: &'static str,
}

impl Language {
    /// Create a Language from a code string.
    ///
    /// # Errors
    /// Returns [`UnsupportedLanguage`] if the code is not in the registry.
    ///
    /// # Example
    /// ```ignore
    /// let french = Language::from_code(LanguageRegistry::get(), "fr")?;
    /// ```
    pub fn from_code(
        registry: &LanguageRegistry,
        code: &str,
    ) -> Result<Language, UnsupportedLanguage> {
        registry
            .get_by_code(code)
            .map(|config| Language { code: config.code })
            .ok_or_else(|| UnsupportedLanguage(code.trim().to_string()))
    }

    /// The registry's default language.
    pub fn default_for(registry: &LanguageRegistry) -> Language {
        Language {
            code: registry.default_code(),
        }
    }

    /// Get the registry code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the full configuration from the registry this language came from.
    pub fn config<'r>(&self, registry: &'r LanguageRegistry) -> Option<&'r LanguageConfig> {
        registry.get_by_code(self.code)
    }

    /// Whether this is the registry's default language.
    pub fn is_default(&self, registry: &LanguageRegistry) -> bool {
        registry.default_code() == self.code
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}
