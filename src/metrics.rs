/// Metrics and telemetry for the Memoria admin service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Admin API request counts and latencies
/// - Login attempts and permission denials
/// - Moderation actions and auto-escalations
/// - Dashboard counters mirrored from the stats aggregator

use crate::admin::DashboardStats;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total admin API requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "admin_http_requests_total",
        "Total number of admin API requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// Admin API request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "admin_http_request_duration_seconds",
        "Admin API request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .unwrap();

    // ========== Access Control Metrics ==========

    /// Login attempts by outcome
    pub static ref AUTH_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "admin_auth_attempts_total",
        "Total number of admin login attempts",
        &["outcome"]
    )
    .unwrap();

    /// Refused operations by missing permission
    pub static ref PERMISSION_DENIALS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "admin_permission_denials_total",
        "Total number of operations refused by the permission gate",
        &["permission"]
    )
    .unwrap();

    // ========== Moderation Metrics ==========

    /// Moderation actions by action and target
    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_actions_total",
        "Total number of moderation actions",
        &["action", "target"]
    )
    .unwrap();

    /// Reports submitted by type
    pub static ref REPORTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reports_submitted_total",
        "Total number of reports submitted",
        &["report_type"]
    )
    .unwrap();

    /// Content flagged by the report threshold
    pub static ref AUTO_FLAGS_TOTAL: IntCounter = register_int_counter!(
        "auto_flags_total",
        "Total number of automatic content escalations"
    )
    .unwrap();

    // ========== Dashboard Metrics ==========

    pub static ref USERS_TOTAL: IntGauge = register_int_gauge!(
        "managed_users_total",
        "Total number of managed users"
    )
    .unwrap();

    pub static ref USERS_ACTIVE: IntGauge = register_int_gauge!(
        "managed_users_active",
        "Number of managed users with active status"
    )
    .unwrap();

    pub static ref MOMENTS_TOTAL: IntGauge = register_int_gauge!(
        "moments_total",
        "Number of moments not removed by moderation"
    )
    .unwrap();

    pub static ref STORIES_TOTAL: IntGauge = register_int_gauge!(
        "stories_total",
        "Number of stories not removed by moderation"
    )
    .unwrap();

    pub static ref REPORTS_PENDING: IntGauge = register_int_gauge!(
        "reports_pending",
        "Number of reports awaiting review"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Record an admin API request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a login attempt. `outcome` is `success`, `failure` or `throttled`.
pub fn record_auth_attempt(outcome: &str) {
    AUTH_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a permission gate refusal
pub fn record_permission_denial(permission: &str) {
    PERMISSION_DENIALS_TOTAL.with_label_values(&[permission]).inc();
}

/// Record a moderation action
pub fn record_moderation_action(action: &str, target: &str) {
    MODERATION_ACTIONS_TOTAL
        .with_label_values(&[action, target])
        .inc();
}

/// Record a report submission
pub fn record_report_submitted(report_type: &str) {
    REPORTS_SUBMITTED_TOTAL
        .with_label_values(&[report_type])
        .inc();
}

pub fn record_auto_flag() {
    AUTO_FLAGS_TOTAL.inc();
}

/// Mirror a dashboard snapshot into the gauges
pub fn set_dashboard_gauges(stats: &DashboardStats) {
    USERS_TOTAL.set(stats.total_users as i64);
    USERS_ACTIVE.set(stats.active_users as i64);
    MOMENTS_TOTAL.set(stats.total_moments as i64);
    STORIES_TOTAL.set(stats.total_stories as i64);
    REPORTS_PENDING.set(stats.pending_reports as i64);
}
