use crate::domain::NewsId;
use crate::interceptor::OperationKind;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Cache mutations published by the interceptor after they are applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Populated(EntryEvent),
    Replaced(EntryEvent),
    Evicted(EntryEvent),
}

impl CacheEvent {
    pub fn key(&self) -> NewsId {
        match self {
            CacheEvent::Populated(e) | CacheEvent::Replaced(e) | CacheEvent::Evicted(e) => e.key,
        }
    }

    pub fn operation(&self) -> OperationKind {
        match self {
            CacheEvent::Populated(e) | CacheEvent::Replaced(e) | CacheEvent::Evicted(e) => {
                e.operation
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryEvent {
    pub key: NewsId,
    pub operation: OperationKind,
    pub timestamp: u64,
}

impl EntryEvent {
    pub fn new(key: NewsId, operation: OperationKind) -> Self {
        Self {
            key,
            operation,
            timestamp: now_timestamp(),
        }
    }
}

/// Helper to get current timestamp in seconds since UNIX epoch
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
