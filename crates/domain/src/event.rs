use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::service::ServiceIdentity;

/// Lifecycle events emitted by the connection manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConnectionEvent {
    /// A service binding was established
    ServiceBound {
        identity: ServiceIdentity,
        timestamp: DateTime<Utc>,
    },

    /// The service binding was lost
    ServiceLost {
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A rebind attempt was scheduled
    ReconnectScheduled {
        attempt: u32,
        delay_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The retry budget ran out, no further attempts will be made
    ReconnectExhausted {
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// The client detached deliberately
    Detached { timestamp: DateTime<Utc> },
}

impl ConnectionEvent {
    /// Create a ServiceBound event
    pub fn service_bound(identity: ServiceIdentity) -> Self {
        Self::ServiceBound {
            identity,
            timestamp: Utc::now(),
        }
    }

    /// Create a ServiceLost event
    pub fn service_lost(reason: impl Into<String>) -> Self {
        Self::ServiceLost {
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a ReconnectScheduled event
    pub fn reconnect_scheduled(attempt: u32, delay_ms: u64) -> Self {
        Self::ReconnectScheduled {
            attempt,
            delay_ms,
            timestamp: Utc::now(),
        }
    }

    /// Create a ReconnectExhausted event
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted {
            attempts,
            timestamp: Utc::now(),
        }
    }

    /// Create a Detached event
    pub fn detached() -> Self {
        Self::Detached {
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ServiceBound { timestamp, .. } => *timestamp,
            Self::ServiceLost { timestamp, .. } => *timestamp,
            Self::ReconnectScheduled { timestamp, .. } => *timestamp,
            Self::ReconnectExhausted { timestamp, .. } => *timestamp,
            Self::Detached { timestamp } => *timestamp,
        }
    }

    /// Get the event type as string
    pub fn event_type(&self) -> &str {
        match self {
            Self::ServiceBound { .. } => "ServiceBound",
            Self::ServiceLost { .. } => "ServiceLost",
            Self::ReconnectScheduled { .. } => "ReconnectScheduled",
            Self::ReconnectExhausted { .. } => "ReconnectExhausted",
            Self::Detached { .. } => "Detached",
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        event: ConnectionEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
