//! Observable events
//!
//! Every log line names one of these events. Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events of the find service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Fixture records loaded into the store
    FixturesLoaded,
    /// Server bound its listener
    ServerStart,

    // Find action
    /// Find request received
    FindReceived,
    /// Primary key present, delegated to single-record lookup
    FindBypassPrimaryKey,
    /// Request rejected before any query ran
    FindRejected,
    /// Fetch or count failed in the store
    FindStorageFailed,
    /// Response composed
    FindComplete,

    // Subscriptions
    /// Connection subscribed to returned records
    SubscriptionRegistered,
    /// Subscription side effect failed (swallowed)
    SubscriptionFailed,

    // Socket transport
    /// Socket connection opened
    SocketConnected,
    /// Socket connection closed
    SocketClosed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::FixturesLoaded => "FIXTURES_LOADED",
            Event::ServerStart => "SERVER_START",

            Event::FindReceived => "FIND_RECEIVED",
            Event::FindBypassPrimaryKey => "FIND_BYPASS_PK",
            Event::FindRejected => "FIND_REJECTED",
            Event::FindStorageFailed => "FIND_STORAGE_FAILED",
            Event::FindComplete => "FIND_COMPLETE",

            Event::SubscriptionRegistered => "SUBSCRIPTION_REGISTERED",
            Event::SubscriptionFailed => "SUBSCRIPTION_FAILED",

            Event::SocketConnected => "SOCKET_CONNECTED",
            Event::SocketClosed => "SOCKET_CLOSED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::FindStorageFailed => Severity::Error,
            Event::FindRejected | Event::SubscriptionFailed => Severity::Warn,
            Event::FindReceived | Event::SubscriptionRegistered => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
