//! Language negotiation: pick exactly one registry language for a request.
//!
//! Signals are consulted in a fixed precedence order and the first one naming
//! a supported language wins. The query, cookie and header must carry a
//! registry code; only `Accept-Language` goes through tag matching (regional
//! variants, legacy aliases):
//!
//! 1. explicit override (query parameter)
//! 2. persisted preference (cookie)
//! 3. custom request header
//! 4. weighted `Accept-Language`
//! 5. the registry default
//!
//! Negotiation is a pure function of its inputs and never fails.

use crate::i18n::{Language, LanguageRegistry};
use serde::Serialize;
use std::cmp::Ordering;

/// Legacy, regional and script-tagged codes mapped onto registry codes.
///
/// Full tags are tried before primary subtags, so script-tagged entries win
/// over their bare language.
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("ara", "ar"),
    ("fra", "fr"),
    ("fre", "fr"),
    ("eng", "en"),
    ("kab", "ber"),
    ("tzm", "ber"),
    ("zgh", "ber"),
    ("shi", "ber"),
    ("rif", "ber"),
    ("ber-latn", "ber"),
    ("kab-latn", "ber"),
    ("tzm-latn", "ber"),
    ("kab-arab", "ber-arab"),
    ("tzm-arab", "ber-arab"),
    ("zgh-arab", "ber-arab"),
];

/// The raw language signals carried by one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageSignals<'a> {
    pub query: Option<&'a str>,
    pub cookie: Option<&'a str>,
    pub header: Option<&'a str>,
    pub accept_language: Option<&'a str>,
}

/// Which signal produced the negotiated language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageSource {
    Query,
    Cookie,
    Header,
    AcceptLanguage,
    Default,
}

/// Outcome of negotiating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub language: Language,
    pub source: LanguageSource,
    /// The client's top preference, if it expressed one.
    pub requested: Option<String>,
    /// Informational: the client asked for something other than what it got.
    pub is_fallback: bool,
}

/// One entry of an `Accept-Language` header.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptEntry {
    pub tag: String,
    pub weight: f32,
}

/// Negotiate the active language for a request.
pub fn negotiate(registry: &LanguageRegistry, signals: &LanguageSignals<'_>) -> Negotiation {
    let explicit = [
        (signals.query, LanguageSource::Query),
        (signals.cookie, LanguageSource::Cookie),
        (signals.header, LanguageSource::Header),
    ];

    let accepted = signals
        .accept_language
        .map(parse_accept_language)
        .unwrap_or_default();

    // The top preference, and the language it names if it names one
    let (requested, wanted) = match explicit.iter().find_map(|(value, _)| non_empty(*value)) {
        Some(value) => (
            Some(value.to_string()),
            Language::from_code(registry, value).ok(),
        ),
        None => match accepted.iter().find(|entry| entry.tag != "*") {
            Some(entry) => (Some(entry.tag.clone()), match_tag(registry, &entry.tag)),
            None => (None, None),
        },
    };

    let chosen = explicit
        .iter()
        .find_map(|(value, source)| {
            non_empty(*value)
                .and_then(|v| Language::from_code(registry, v).ok())
                .map(|language| (language, *source))
        })
        .or_else(|| {
            accepted
                .iter()
                .find_map(|entry| match_tag(registry, &entry.tag))
                .map(|language| (language, LanguageSource::AcceptLanguage))
        });

    let (language, source) =
        chosen.unwrap_or_else(|| (Language::default_for(registry), LanguageSource::Default));

    let is_fallback = requested.is_some() && wanted != Some(language);

    Negotiation {
        language,
        source,
        requested,
        is_fallback,
    }
}

/// Map a language tag onto a registry language.
///
/// Tries the full tag, then the alias table, then the primary subtag (and its
/// alias). Matching is case-insensitive and accepts `_` as a subtag separator.
pub fn match_tag(registry: &LanguageRegistry, tag: &str) -> Option<Language> {
    let tag = tag.trim().to_ascii_lowercase().replace('_', "-");
    if tag.is_empty() || tag == "*" {
        return None;
    }

    let lookup = |candidate: &str| {
        Language::from_code(registry, candidate).ok().or_else(|| {
            LANGUAGE_ALIASES
                .iter()
                .find(|(alias, _)| *alias == candidate)
                .and_then(|(_, code)| Language::from_code(registry, code).ok())
        })
    };

    lookup(&tag).or_else(|| {
        let primary = tag.split('-').next().unwrap_or(&tag);
        if primary == tag {
            None
        } else {
            lookup(primary)
        }
    })
}

/// Parse an `Accept-Language` header into entries ordered by weight.
///
/// Entries without a `q` parameter weigh 1.0, malformed weights count as 0,
/// and zero-weight entries ("not acceptable") are dropped. Equal weights keep
/// header order.
pub fn parse_accept_language(value: &str) -> Vec<AcceptEntry> {
    let mut entries: Vec<AcceptEntry> = value
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() {
                return None;
            }

            let weight = pieces
                .filter_map(|param| {
                    let (key, value) = param.split_once('=')?;
                    key.trim()
                        .eq_ignore_ascii_case("q")
                        .then(|| value.trim().parse::<f32>().unwrap_or(0.0))
                })
                .next()
                .unwrap_or(1.0);

            if !weight.is_finite() || weight <= 0.0 {
                return None;
            }

            Some(AcceptEntry {
                tag: tag.to_string(),
                weight: weight.min(1.0),
            })
        })
        .collect();

    // sort_by is stable, so ties keep their header order
    entries.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    entries
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
