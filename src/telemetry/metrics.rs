//! Prometheus metrics setup and metric definitions

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus
/// output carries HELP/TYPE lines from startup, not just after first use.
pub fn describe_metrics() {
    describe_counter!(
        "clinigate_auth_failures_total",
        "Login attempts rejected for bad credentials or an inactive account"
    );
    describe_counter!(
        "clinigate_account_lockouts_total",
        "Accounts locked after repeated login failures"
    );
    describe_counter!(
        "clinigate_auth_rejected_total",
        "Requests rejected by the authentication pipeline (bad or revoked tokens)"
    );
    describe_counter!(
        "clinigate_rate_limit_throttled_total",
        "Requests refused by the rate governor"
    );

    counter!("clinigate_auth_failures_total").absolute(0);
    counter!("clinigate_account_lockouts_total").absolute(0);
    counter!("clinigate_auth_rejected_total").absolute(0);
    counter!("clinigate_rate_limit_throttled_total").absolute(0);
}
