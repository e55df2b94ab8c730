// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::json;
use songbridge_domain::DomainEvent;
use tracing::warn;

/// Event publisher abstraction
pub trait EventPublisher: Send + Sync {
    fn publish<T>(&self, event: &DomainEvent<T>)
    where
        T: Serialize + Send + Sync + 'static;
}

/// Publisher that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventPublisher;

impl EventPublisher for NullEventPublisher {
    fn publish<T>(&self, _event: &DomainEvent<T>)
    where
        T: Serialize + Send + Sync + 'static,
    {
    }
}

/// A minimal in-memory event bus that stores serialized events.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    inner: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve and clear all captured events
    pub fn drain(&self) -> Vec<serde_json::Value> {
        std::mem::take(&mut *self.events())
    }

    /// Captured events with the given name, oldest first. Does not clear.
    pub fn named(&self, name: &str) -> Vec<serde_json::Value> {
        self.events()
            .iter()
            .filter(|event| event["name"] == name)
            .cloned()
            .collect()
    }

    /// Lock the captured events, recovering them if a holder panicked.
    fn events(&self) -> MutexGuard<'_, Vec<serde_json::Value>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(target: "matching", "event bus lock poisoned, recovering captured events");
            poisoned.into_inner()
        })
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish<T>(&self, event: &DomainEvent<T>)
    where
        T: Serialize + Send + Sync + 'static,
    {
        let value = json!({
            "name": event.name,
            "occurred_at": event.occurred_at,
            "payload": event.payload,
        });
        self.events().push(value);
    }
}
