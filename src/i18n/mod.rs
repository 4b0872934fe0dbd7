//! Internationalization (i18n) module for multilingual content.
//!
//! All language-related logic lives here, independent of any entity type or
//! storage technology.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for all supported languages and their metadata
//! - `language`: Type-safe Language type validated against a registry
//! - `negotiation`: Picks one language per request from query, cookie, header and `Accept-Language`
//! - `field`: The translatable field value type and its fallback resolution
//! - `validator`: Write-path validation and translation quality warnings
//! - `update`: Granular, sibling-preserving single-entry updates
//! - `metrics`: Resolution and update counters
//!
//! # Example
//!
//! ```rust,ignore
//! use heritage_i18n::i18n::{negotiate, LanguageRegistry, LanguageSignals};
//!
//! let registry = LanguageRegistry::get();
//! let negotiation = negotiate(registry, &LanguageSignals {
//!     accept_language: Some("fr-FR,fr;q=0.9"),
//!     ..Default::default()
//! });
//! let title = field.resolve(registry, negotiation.language.code());
//! ```

mod field;
mod language;
mod metrics;
mod negotiation;
mod registry;
mod update;
mod validator;

pub use field::{ResolutionSource, ResolvedValue, TranslatableField};
pub use language::{Language, UnsupportedLanguage};
pub use metrics::{MetricsReport, TranslationMetrics};
pub use negotiation::{
    match_tag, negotiate, parse_accept_language, AcceptEntry, LanguageSignals, LanguageSource,
    Negotiation,
};
pub use registry::{LanguageConfig, LanguageRegistry, RegistryError};
pub use update::{apply_granular_update, EntryState, GranularUpdate};
pub use validator::{
    FieldConstraint, FieldViolation, TranslationInput, TranslationValidator, ValidationError,
    ValidationReport, ViolationKind, WriteMode,
};
