// SPDX-FileCopyrightText: 2026 Dialer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. Without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

pub const INVOCATIONS_TOTAL: &str = "dialer_invocations_total";
pub const DISPATCH_TOTAL: &str = "dialer_dispatch_total";
pub const ACTIVE_CALLS: &str = "dialer_active_calls";
pub const PROVIDER_LATENCY_SECONDS: &str = "dialer_provider_latency_seconds";

/// Register all dialer metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        INVOCATIONS_TOTAL,
        "Dispatcher invocations by outcome (dispatched, at_capacity, no_pending, already_running, error)"
    );
    describe_counter!(
        DISPATCH_TOTAL,
        "Queue items driven by the dispatcher, by outcome (success, failure)"
    );
    describe_gauge!(ACTIVE_CALLS, "Queue items in progress after the last invocation");
    describe_histogram!(
        PROVIDER_LATENCY_SECONDS,
        "Call provider make_call latency in seconds"
    );
}

/// Count one dispatcher invocation.
pub fn record_invocation(outcome: &'static str) {
    metrics::counter!(INVOCATIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Count one driven queue item.
pub fn record_dispatch(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(DISPATCH_TOTAL, "outcome" => outcome).increment(1);
}

pub fn set_active_calls(count: i64) {
    metrics::gauge!(ACTIVE_CALLS).set(count as f64);
}

pub fn record_provider_latency(seconds: f64) {
    metrics::histogram!(PROVIDER_LATENCY_SECONDS).record(seconds);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn helpers_render_in_prometheus_format() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            record_invocation("dispatched");
            record_dispatch(true);
            record_dispatch(true);
            record_dispatch(false);
            set_active_calls(7);
            record_provider_latency(0.25);
        });

        let text = handle.render();
        assert!(
            text.contains(r#"dialer_invocations_total{outcome="dispatched"} 1"#),
            "got: {text}"
        );
        assert!(text.contains(r#"dialer_dispatch_total{outcome="success"} 2"#));
        assert!(text.contains(r#"dialer_dispatch_total{outcome="failure"} 1"#));
        assert!(text.contains("dialer_active_calls 7"));
        assert!(text.contains("dialer_provider_latency_seconds"));
    }

    #[test]
    fn helpers_are_noops_without_recorder() {
        record_invocation("no_pending");
        set_active_calls(0);
    }
}
