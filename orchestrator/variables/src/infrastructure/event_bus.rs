// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Variable Audit Events
//
// In-memory event streaming over a tokio broadcast channel. The generator
// publishes one record per created (or reused) variable; the orchestrator's
// eventing subsystem subscribes and persists them.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::{AuditError, AuditEventSink, VariableEvent};

/// Event bus for publishing and subscribing to variable audit events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<VariableEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_variable_event(&self, event: VariableEvent) {
        debug!(
            variable = %event.object_name,
            deployment = %event.deployment,
            "Publishing variable event"
        );

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all variable events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the events of one deployment only
    pub fn subscribe_deployment(&self, deployment: impl Into<String>) -> DeploymentEventReceiver {
        DeploymentEventReceiver {
            receiver: self.sender.subscribe(),
            deployment: deployment.into(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl AuditEventSink for EventBus {
    async fn record(&self, event: VariableEvent) -> Result<(), AuditError> {
        self.publish_variable_event(event);
        Ok(())
    }
}

/// Receiver for all variable events
pub struct EventReceiver {
    receiver: broadcast::Receiver<VariableEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<VariableEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<VariableEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to a single deployment
pub struct DeploymentEventReceiver {
    receiver: broadcast::Receiver<VariableEvent>,
    deployment: String,
}

impl DeploymentEventReceiver {
    pub async fn recv(&mut self) -> Result<VariableEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.deployment == self.deployment {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::variable::{RequestContext, UpdateMode, VariableId};

    fn created(deployment: &str, name: &str) -> VariableEvent {
        VariableEvent::variable_created(
            &RequestContext::new("admin"),
            deployment,
            name,
            &VariableId::new("1"),
            UpdateMode::NoOverwrite,
            true,
        )
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        event_bus
            .record(created("orders", "/d1/orders/db_pw"))
            .await
            .unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.object_name, "/d1/orders/db_pw");
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
    }

    #[tokio::test]
    async fn test_deployment_filter() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe_deployment("orders");

        event_bus.publish_variable_event(created("billing", "/d1/billing/pw"));
        event_bus.publish_variable_event(created("orders", "/d1/orders/pw"));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.deployment, "orders");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let event_bus = EventBus::default();
        assert_eq!(event_bus.subscriber_count(), 0);
        event_bus.publish_variable_event(created("orders", "/d1/orders/pw"));
    }
}
