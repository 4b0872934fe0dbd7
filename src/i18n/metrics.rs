//! Translation metrics and observability module.
//!
//! Tracks how often content is served in the requested language versus a
//! fallback, how often negotiation could not honour a client's preference,
//! and how translation updates fare.

use crate::i18n::ResolutionSource;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Translation counters. One process-wide instance is reachable through
/// [`TranslationMetrics::global`].
#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Values served in the requested language
    resolved_requested: AtomicUsize,

    /// Values served from the default language
    resolved_default: AtomicUsize,

    /// Values served from some other available language
    resolved_available: AtomicUsize,

    /// Values with no content in any language
    resolved_empty: AtomicUsize,

    /// Requests whose preferred language was not available
    negotiation_fallbacks: AtomicUsize,

    updates_applied: AtomicUsize,
    updates_rejected: AtomicUsize,
}

/// Global metrics instance (initialized lazily)
static METRICS: OnceLock<TranslationMetrics> = OnceLock::new();

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the global translation metrics instance.
    pub fn global() -> &'static TranslationMetrics {
        METRICS.get_or_init(TranslationMetrics::new)
    }

    /// Record which fallback step served a resolved value.
    pub fn record_resolution(&self, source: ResolutionSource) {
        let counter = match source {
            ResolutionSource::Requested => &self.resolved_requested,
            ResolutionSource::Default => &self.resolved_default,
            ResolutionSource::Available => &self.resolved_available,
            ResolutionSource::Empty => &self.resolved_empty,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request whose preferred language could not be honoured.
    pub fn record_negotiation_fallback(&self) {
        self.negotiation_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update_applied(&self) {
        self.updates_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update_rejected(&self) {
        self.updates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let requested = self.resolved_requested.load(Ordering::Relaxed);
        let default = self.resolved_default.load(Ordering::Relaxed);
        let available = self.resolved_available.load(Ordering::Relaxed);
        let empty = self.resolved_empty.load(Ordering::Relaxed);

        let total = requested + default + available + empty;
        let requested_hit_rate = if total > 0 {
            (requested as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            resolved_requested: requested,
            resolved_default: default,
            resolved_available: available,
            resolved_empty: empty,
            requested_hit_rate,
            negotiation_fallbacks: self.negotiation_fallbacks.load(Ordering::Relaxed),
            updates_applied: self.updates_applied.load(Ordering::Relaxed),
            updates_rejected: self.updates_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the translation counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub resolved_requested: usize,
    pub resolved_default: usize,
    pub resolved_available: usize,
    pub resolved_empty: usize,

    /// Share of resolutions served in the requested language (0-100)
    pub requested_hit_rate: f64,

    pub negotiation_fallbacks: usize,
    pub updates_applied: usize,
    pub updates_rejected: usize,
}
