//! Prometheus metrics.
//!
//! HTTP traffic is recorded by [`metrics_middleware`]; the `track_*`
//! helpers count domain events (logins, token lifecycle, tenant writes,
//! authorization denials). Until [`init_metrics`] installs a recorder every
//! macro call is a no-op.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, describe_counter, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const REQUEST_DURATION: &str = "http_request_duration_seconds";
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

static RECORDING: AtomicBool = AtomicBool::new(false);

fn metrics_enabled() -> bool {
    std::env::var("METRICS_ENABLED")
        .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "off"))
        .unwrap_or(true)
}

/// Installs the Prometheus recorder and its upkeep task.
///
/// Returns `Ok(None)` when `METRICS_ENABLED` is false.
pub fn init_metrics() -> Result<Option<PrometheusHandle>, BuildError> {
    if !metrics_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), LATENCY_BUCKETS)?
        .install_recorder()?;

    describe_histogram!(REQUEST_DURATION, "HTTP request latency by route");
    describe_counter!("user_logins_total", "Login attempts by outcome");
    describe_counter!("session_tokens_total", "Token pairs issued and tokens revoked");
    describe_counter!("reset_tokens_total", "Password reset tokens by lifecycle event");
    describe_counter!("tenant_writes_total", "Schools and enrollments created");
    describe_counter!("cascade_deletes_total", "Cascading deletes by root entity");
    describe_counter!("authorization_denials_total", "Scope Resolver denials by reason");

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            upkeep_handle.run_upkeep();
        }
    });

    RECORDING.store(true, Ordering::Relaxed);
    Ok(Some(handle))
}

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !RECORDING.load(Ordering::Relaxed) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    // Unmatched paths share one label.
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_owned(), |p| p.as_str().to_owned());

    gauge!("http_requests_active").increment(1.0);
    let response = next.run(req).await;
    gauge!("http_requests_active").decrement(1.0);

    let status = response.status().as_u16().to_string();
    counter!("http_requests_total", "method" => method.clone(), "route" => route.clone(), "status" => status)
        .increment(1);
    histogram!(REQUEST_DURATION, "method" => method, "route" => route)
        .record(start.elapsed().as_secs_f64());

    response
}

pub fn track_user_registered(role: &str) {
    counter!("users_registered_total", "role" => role.to_owned()).increment(1);
}

pub fn track_user_login_success(role: &str) {
    counter!("user_logins_total", "outcome" => "success", "role" => role.to_owned()).increment(1);
}

pub fn track_user_login_failure(reason: &str) {
    counter!("user_logins_total", "outcome" => "failure", "reason" => reason.to_owned())
        .increment(1);
}

pub fn track_tokens_issued() {
    counter!("session_tokens_total", "event" => "issued").increment(1);
}

pub fn track_token_revoked(reason: &str) {
    counter!("session_tokens_total", "event" => "revoked", "reason" => reason.to_owned())
        .increment(1);
}

/// `event` is one of `issued`, `consumed`, `expired`.
pub fn track_reset_token(event: &str) {
    counter!("reset_tokens_total", "event" => event.to_owned()).increment(1);
}

pub fn track_school_created() {
    counter!("tenant_writes_total", "entity" => "school").increment(1);
}

pub fn track_enrollment_created() {
    counter!("tenant_writes_total", "entity" => "enrollment").increment(1);
}

pub fn track_cascade_delete(root: &str) {
    counter!("cascade_deletes_total", "root" => root.to_owned()).increment(1);
}

pub fn track_authorization_denied(reason: &str) {
    counter!("authorization_denials_total", "reason" => reason.to_owned()).increment(1);
}
