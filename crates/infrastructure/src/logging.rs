use async_trait::async_trait;
use tracing::info;

use domain::event::{ConnectionEvent, EventPublisher};

/// Event sink that writes connection lifecycle events to the log.
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(
        &self,
        event: ConnectionEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(event = event.event_type(), detail = ?event, "Printer connection event");
        Ok(())
    }
}
