//! Diagnostic counters.
//!
//! Process-wide, relaxed, monotonic. Read them for telemetry or tests; they
//! never influence tracking behaviour.

use std::sync::atomic::{AtomicU64, Ordering};

static HEALS_TOTAL: AtomicU64 = AtomicU64::new(0);
static REWIRES_TOTAL: AtomicU64 = AtomicU64::new(0);
static EVENTS_FORWARDED_TOTAL: AtomicU64 = AtomicU64::new(0);
static EVENTS_IGNORED_TOTAL: AtomicU64 = AtomicU64::new(0);
static CONSISTENCY_VIOLATIONS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Observer chains forced to resubscribe by healing.
#[must_use]
pub fn heals_total() -> u64 {
    HEALS_TOTAL.load(Ordering::Relaxed)
}

/// Observer chains resubscribed after a child reference was replaced.
#[must_use]
pub fn rewires_total() -> u64 {
    REWIRES_TOTAL.load(Ordering::Relaxed)
}

/// Events handled by the leading chain of their source node.
#[must_use]
pub fn events_forwarded_total() -> u64 {
    EVENTS_FORWARDED_TOTAL.load(Ordering::Relaxed)
}

/// Events dropped because another chain leads the source node.
#[must_use]
pub fn events_ignored_total() -> u64 {
    EVENTS_IGNORED_TOTAL.load(Ordering::Relaxed)
}

/// Parent/child consistency mismatches tolerated under the `Log` policy.
#[must_use]
pub fn consistency_violations_total() -> u64 {
    CONSISTENCY_VIOLATIONS_TOTAL.load(Ordering::Relaxed)
}

pub(crate) fn record_heal() {
    HEALS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_rewire() {
    REWIRES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_forwarded() {
    EVENTS_FORWARDED_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_ignored() {
    EVENTS_IGNORED_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_violation() {
    CONSISTENCY_VIOLATIONS_TOTAL.fetch_add(1, Ordering::Relaxed);
}
