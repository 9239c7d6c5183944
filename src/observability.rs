//! Tracing setup and in-process counters

use crate::config::TelemetryConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(telemetry: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&telemetry.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding binaries).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Counters shared by the repository and the publisher
#[derive(Debug, Default)]
pub struct Metrics {
    resources_written: AtomicU64,
    resources_removed: AtomicU64,
    malformed_skipped: AtomicU64,
    uploads_succeeded: AtomicU64,
    uploads_failed: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resources_written(&self, count: u64) {
        self.resources_written.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "resources_written", count, "Metric incremented");
    }

    pub fn resources_removed(&self, count: u64) {
        self.resources_removed.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "resources_removed", count, "Metric incremented");
    }

    pub fn malformed_skipped(&self) {
        self.malformed_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "malformed_skipped", "Metric incremented");
    }

    pub fn upload_succeeded(&self) {
        self.uploads_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "uploads_succeeded", "Metric incremented");
    }

    pub fn upload_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "uploads_failed", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            resources_written: self.resources_written.load(Ordering::Relaxed),
            resources_removed: self.resources_removed.load(Ordering::Relaxed),
            malformed_skipped: self.malformed_skipped.load(Ordering::Relaxed),
            uploads_succeeded: self.uploads_succeeded.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub resources_written: u64,
    pub resources_removed: u64,
    pub malformed_skipped: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
}
