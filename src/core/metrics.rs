use std::sync::OnceLock;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

fn describe() {
    describe_counter!("http_requests_total", "HTTP responses by status code");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request latency by status code"
    );
    describe_counter!(
        "session_resolutions_total",
        "Role and profile resolutions by outcome (resolved, stale, role_fallback, profile_fallback)"
    );
    describe_counter!("uploads_total", "Object uploads by bucket and outcome");
    describe_counter!("guard_decisions_total", "Route guard decisions by outcome");
    describe_gauge!("session_contexts_mounted", "Tab session contexts currently mounted");
    describe_counter!("session_expirations_total", "Tab sessions dropped at their expiry margin");
    describe_counter!("session_idle_evictions_total", "Tab contexts unmounted after going idle");
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
