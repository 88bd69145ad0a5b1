//! Process-wide request counters
//!
//! Counters only, monotonic, reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry shared by the router and the handlers
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    requests_total: AtomicU64,
    responses_2xx: AtomicU64,
    responses_4xx: AtomicU64,
    responses_5xx: AtomicU64,
    data_service_calls: AtomicU64,
    data_service_errors: AtomicU64,
    prescriptions_created: AtomicU64,
    medical_details_updated: AtomicU64,
    append_conflicts: AtomicU64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub responses_2xx: u64,
    pub responses_4xx: u64,
    pub responses_5xx: u64,
    pub data_service_calls: u64,
    pub data_service_errors: u64,
    pub prescriptions_created: u64,
    pub medical_details_updated: u64,
    pub append_conflicts: u64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request by its status code
    pub fn record_response(&self, status: u16) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let bucket = match status {
            200..=299 => &self.responses_2xx,
            400..=499 => &self.responses_4xx,
            500..=599 => &self.responses_5xx,
            _ => return,
        };
        bucket.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_data_service_calls(&self) {
        self.data_service_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_data_service_errors(&self) {
        self.data_service_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_prescriptions_created(&self) {
        self.prescriptions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_medical_details_updated(&self) {
        self.medical_details_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_append_conflicts(&self) {
        self.append_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            responses_2xx: self.responses_2xx.load(Ordering::Relaxed),
            responses_4xx: self.responses_4xx.load(Ordering::Relaxed),
            responses_5xx: self.responses_5xx.load(Ordering::Relaxed),
            data_service_calls: self.data_service_calls.load(Ordering::Relaxed),
            data_service_errors: self.data_service_errors.load(Ordering::Relaxed),
            prescriptions_created: self.prescriptions_created.load(Ordering::Relaxed),
            medical_details_updated: self.medical_details_updated.load(Ordering::Relaxed),
            append_conflicts: self.append_conflicts.load(Ordering::Relaxed),
        }
    }
}
