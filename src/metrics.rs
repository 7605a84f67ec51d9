//! Prometheus counters for the notification pipeline.
//!
//! Exposed on `/metrics` for scraping. Metrics live in the global default
//! registry and are registered once on first use.

use once_cell::sync::Lazy;
use prometheus::{opts, register_counter_vec, CounterVec, Encoder, TextEncoder};

static ACTIVITY_NOTIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "fittrack_activity_notifications_total",
            "Activity notification emissions by event kind and outcome"
        ),
        &["kind", "outcome"]
    )
    .expect("failed to register fittrack_activity_notifications_total")
});

static REMINDERS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "fittrack_reminders_total",
            "Daily reminder outcomes per user processed"
        ),
        &["outcome"]
    )
    .expect("failed to register fittrack_reminders_total")
});

/// `outcome` is one of "created", "suppressed", "failed".
pub fn record_emission(kind: &str, outcome: &str) {
    ACTIVITY_NOTIFICATIONS
        .with_label_values(&[kind, outcome])
        .inc();
}

/// `outcome` is one of "created", "skipped", "failed".
pub fn record_reminders(outcome: &str, count: usize) {
    if count > 0 {
        REMINDERS.with_label_values(&[outcome]).inc_by(count as f64);
    }
}

/// Encode all registered metrics as Prometheus text format.
/// Called by the `/metrics` HTTP handler.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_counters_are_encoded() {
        record_emission("workout", "created");
        record_reminders("created", 2);
        let output = encode_metrics();
        assert!(output.contains("fittrack_activity_notifications_total"));
        assert!(output.contains("fittrack_reminders_total"));
    }

    #[test]
    fn test_zero_count_is_not_recorded() {
        // Must not panic or register a sample for an empty batch.
        record_reminders("failed", 0);
    }
}
