//! Gateway metrics with smsgw_* prefix.
//!
//! Instruments live in `OnceLock`s and are created by [`init`]. Every
//! recording function is a no-op until then, so library users that never
//! install a meter pay nothing.

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;
use std::sync::OnceLock;

// ============================================================================
// DISPATCH METRICS
// ============================================================================

static MESSAGES_SENT_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
static MESSAGES_FAILED_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
static PROVIDER_FAILOVERS_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
static PROVIDER_ERRORS_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
static PROVIDER_REQUEST_DURATION: OnceLock<Histogram<f64>> = OnceLock::new();

// ============================================================================
// POOL METRICS
// ============================================================================

static POOL_ASSIGNMENTS_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
static POOL_EXHAUSTED_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
static POOL_RELEASES_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
static POOL_DAILY_RESETS_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();
static POOL_COOLDOWN_RESTORED_TOTAL: OnceLock<Counter<u64>> = OnceLock::new();

/// Create all instruments from `meter`. Later calls are ignored.
pub fn init(meter: &Meter) {
    let _ = MESSAGES_SENT_TOTAL.set(
        meter
            .u64_counter("smsgw_messages_sent_total")
            .with_description("Messages accepted, by provider")
            .build(),
    );
    let _ = MESSAGES_FAILED_TOTAL.set(
        meter
            .u64_counter("smsgw_messages_failed_total")
            .with_description("Messages no provider accepted")
            .build(),
    );
    let _ = PROVIDER_FAILOVERS_TOTAL.set(
        meter
            .u64_counter("smsgw_provider_failovers_total")
            .with_description("Failover advances, by provider failed over to")
            .build(),
    );
    let _ = PROVIDER_ERRORS_TOTAL.set(
        meter
            .u64_counter("smsgw_provider_errors_total")
            .with_description("Provider faults by provider and kind")
            .build(),
    );
    let _ = PROVIDER_REQUEST_DURATION.set(
        meter
            .f64_histogram("smsgw_provider_request_duration_seconds")
            .with_description("Provider send latency")
            .build(),
    );

    let _ = POOL_ASSIGNMENTS_TOTAL.set(
        meter
            .u64_counter("smsgw_pool_assignments_total")
            .with_description("Numbers assigned, by provider")
            .build(),
    );
    let _ = POOL_EXHAUSTED_TOTAL.set(
        meter
            .u64_counter("smsgw_pool_exhausted_total")
            .with_description("Assignment requests with no number available")
            .build(),
    );
    let _ = POOL_RELEASES_TOTAL.set(
        meter
            .u64_counter("smsgw_pool_releases_total")
            .with_description("Numbers released, by cooldown")
            .build(),
    );
    let _ = POOL_DAILY_RESETS_TOTAL.set(
        meter
            .u64_counter("smsgw_pool_daily_resets_total")
            .with_description("Daily counter resets")
            .build(),
    );
    let _ = POOL_COOLDOWN_RESTORED_TOTAL.set(
        meter
            .u64_counter("smsgw_pool_cooldown_restored_total")
            .with_description("Numbers moved from cooldown to available by a reset")
            .build(),
    );
}

// ============================================================================
// DISPATCH RECORDING
// ============================================================================

pub fn message_sent(provider: &str) {
    if let Some(c) = MESSAGES_SENT_TOTAL.get() {
        c.add(1, &[kv("provider", provider)]);
    }
}

pub fn message_failed() {
    if let Some(c) = MESSAGES_FAILED_TOTAL.get() {
        c.add(1, &[]);
    }
}

pub fn provider_failover(to: &str) {
    if let Some(c) = PROVIDER_FAILOVERS_TOTAL.get() {
        c.add(1, &[kv("provider", to)]);
    }
}

pub fn provider_error(provider: &str, kind: &str) {
    if let Some(c) = PROVIDER_ERRORS_TOTAL.get() {
        c.add(1, &[kv("provider", provider), kv("kind", kind)]);
    }
}

pub fn provider_request_duration(provider: &str, duration_secs: f64) {
    if let Some(h) = PROVIDER_REQUEST_DURATION.get() {
        h.record(duration_secs, &[kv("provider", provider)]);
    }
}

// ============================================================================
// POOL RECORDING
// ============================================================================

pub fn pool_number_assigned(provider: &str) {
    if let Some(c) = POOL_ASSIGNMENTS_TOTAL.get() {
        c.add(1, &[kv("provider", provider)]);
    }
}

pub fn pool_exhausted() {
    if let Some(c) = POOL_EXHAUSTED_TOTAL.get() {
        c.add(1, &[]);
    }
}

pub fn pool_number_released(cooldown: bool) {
    if let Some(c) = POOL_RELEASES_TOTAL.get() {
        c.add(1, &[KeyValue::new("cooldown", cooldown)]);
    }
}

pub fn pool_daily_reset(restored: u64) {
    if let Some(c) = POOL_DAILY_RESETS_TOTAL.get() {
        c.add(1, &[]);
    }
    if let Some(c) = POOL_COOLDOWN_RESTORED_TOTAL.get() {
        c.add(restored, &[]);
    }
}

#[inline]
fn kv(key: &'static str, value: &str) -> KeyValue {
    KeyValue::new(key, value.to_string())
}
