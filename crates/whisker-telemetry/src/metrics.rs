//! Prometheus-backed metrics registry and snapshot helpers.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Prometheus-backed metrics registry shared by the engine and the CLI.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    status_fetches_total: IntCounterVec,
    seedbox_updates_total: IntCounterVec,
    bursts_started_total: IntCounter,
    race_discards_total: IntCounter,
    countdown_seconds: IntGauge,
}

/// Snapshot of the scalar gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Seconds remaining until the next scheduled check.
    pub countdown_seconds: i64,
    /// Total fast-polling windows entered.
    pub bursts_started_total: u64,
    /// Total completions dropped because their session epoch was stale.
    pub race_discards_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built
    /// or registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let status_fetches_total = counter_vec(
            "status_fetches_total",
            "Status fetches by outcome",
            &["outcome"],
        )?;
        let seedbox_updates_total = counter_vec(
            "seedbox_updates_total",
            "Seedbox updates by outcome",
            &["outcome"],
        )?;
        let bursts_started_total = counter(
            "bursts_started_total",
            "Fast-polling windows entered near a check deadline",
        )?;
        let race_discards_total = counter(
            "race_discards_total",
            "Completions dropped under a stale session epoch",
        )?;
        let countdown_seconds = gauge(
            "countdown_seconds",
            "Seconds remaining until the next scheduled check",
        )?;

        register(&registry, "status_fetches_total", &status_fetches_total)?;
        register(&registry, "seedbox_updates_total", &seedbox_updates_total)?;
        register(&registry, "bursts_started_total", &bursts_started_total)?;
        register(&registry, "race_discards_total", &race_discards_total)?;
        register(&registry, "countdown_seconds", &countdown_seconds)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                status_fetches_total,
                seedbox_updates_total,
                bursts_started_total,
                race_discards_total,
                countdown_seconds,
            }),
        })
    }

    /// Increment the fetch counter for the given outcome label.
    pub fn inc_status_fetch(&self, outcome: &str) {
        self.inner
            .status_fetches_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the seedbox update counter for the given outcome label.
    pub fn inc_seedbox_update(&self, outcome: &str) {
        self.inner
            .seedbox_updates_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the burst counter.
    pub fn inc_burst_started(&self) {
        self.inner.bursts_started_total.inc();
    }

    /// Increment the stale-completion discard counter.
    pub fn inc_race_discard(&self) {
        self.inner.race_discards_total.inc();
    }

    /// Set the countdown gauge.
    pub fn set_countdown_seconds(&self, seconds: u64) {
        self.inner.countdown_seconds.set(saturating_i64(seconds));
    }

    /// Encode every registered collector in the text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error when encoding fails or produces invalid UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|source| TelemetryError::Exposition { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::ExpositionUtf8 { source })
    }

    /// Take a point-in-time snapshot of the scalar gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            countdown_seconds: self.inner.countdown_seconds.get(),
            bursts_started_total: self.inner.bursts_started_total.get(),
            race_discards_total: self.inner.race_discards_total.get(),
        }
    }
}

fn counter(name: &'static str, help: &str) -> TelemetryResult<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::Collector { name, source })
}

fn counter_vec(
    name: &'static str,
    help: &str,
    labels: &[&str],
) -> TelemetryResult<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::Collector { name, source })
}

fn gauge(name: &'static str, help: &str) -> TelemetryResult<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::Collector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> TelemetryResult<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Register { name, source })
}

/// Convert a counter value to a gauge value saturating at `i64::MAX`.
fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_conversion_caps_large_values() {
        assert_eq!(saturating_i64(42), 42);
        assert_eq!(saturating_i64(u64::MAX), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> TelemetryResult<()> {
        let metrics = Metrics::new()?;
        metrics.inc_status_fetch("healthy");
        metrics.inc_status_fetch("failed");
        metrics.inc_seedbox_update("success");
        metrics.inc_burst_started();
        metrics.inc_race_discard();
        metrics.set_countdown_seconds(90);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.countdown_seconds, 90);
        assert_eq!(snapshot.bursts_started_total, 1);
        assert_eq!(snapshot.race_discards_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("status_fetches_total"));
        assert!(rendered.contains("seedbox_updates_total"));
        assert!(rendered.contains("countdown_seconds"));
        Ok(())
    }
}
