//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Operational counters of the find service
///
/// All counters use atomic operations with Relaxed ordering; readers get
/// eventually consistent values.
#[derive(Debug)]
pub struct MetricsRegistry {
    /// When counting began
    started_at: DateTime<Utc>,
    /// Multi-record finds answered successfully
    finds_executed: AtomicU64,
    /// Finds rejected as bad requests
    finds_rejected: AtomicU64,
    /// Finds failed in the store
    finds_failed: AtomicU64,
    /// Requests delegated to single-record lookup
    single_lookups: AtomicU64,
    /// Records returned across all finds
    records_returned: AtomicU64,
    /// Rooms joined by the subscription side effect
    subscriptions_registered: AtomicU64,
    /// Swallowed subscription failures
    subscription_failures: AtomicU64,
    /// Socket connections accepted
    socket_connections: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finds_executed: AtomicU64::new(0),
            finds_rejected: AtomicU64::new(0),
            finds_failed: AtomicU64::new(0),
            single_lookups: AtomicU64::new(0),
            records_returned: AtomicU64::new(0),
            subscriptions_registered: AtomicU64::new(0),
            subscription_failures: AtomicU64::new(0),
            socket_connections: AtomicU64::new(0),
        }
    }

    /// Record a successful multi-record find
    pub fn record_find(&self, records: usize) {
        self.finds_executed.fetch_add(1, Ordering::Relaxed);
        self.records_returned
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn increment_finds_rejected(&self) {
        self.finds_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_finds_failed(&self) {
        self.finds_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_single_lookups(&self) {
        self.single_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_subscriptions(&self, rooms: usize) {
        self.subscriptions_registered
            .fetch_add(rooms as u64, Ordering::Relaxed);
    }

    pub fn increment_subscription_failures(&self) {
        self.subscription_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_socket_connections(&self) {
        self.socket_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started_at: self.started_at,
            finds_executed: self.finds_executed.load(Ordering::Relaxed),
            finds_rejected: self.finds_rejected.load(Ordering::Relaxed),
            finds_failed: self.finds_failed.load(Ordering::Relaxed),
            single_lookups: self.single_lookups.load(Ordering::Relaxed),
            records_returned: self.records_returned.load(Ordering::Relaxed),
            subscriptions_registered: self.subscriptions_registered.load(Ordering::Relaxed),
            subscription_failures: self.subscription_failures.load(Ordering::Relaxed),
            socket_connections: self.socket_connections.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub finds_executed: u64,
    pub finds_rejected: u64,
    pub finds_failed: u64,
    pub single_lookups: u64,
    pub records_returned: u64,
    pub subscriptions_registered: u64,
    pub subscription_failures: u64,
    pub socket_connections: u64,
}
