use serde::{Deserialize, Serialize};
use std::fmt;

/// Categories of intercepted news operations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Create,
    Update,
    Archive,
}

/// What happens to the cache once the wrapped service call succeeds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheAction {
    /// `put(key, result)`
    Populate,
    /// `remove_by_key(key)` then `put(key, result)`
    Replace,
    /// `remove_by_key(key)`, no repopulation
    Evict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    /// Serve from the cache before calling the service
    pub lookup_first: bool,
    pub on_success: CacheAction,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Read,
        OperationKind::Create,
        OperationKind::Update,
        OperationKind::Archive,
    ];

    /// Operation-to-cache-action table. A failed service call never touches the cache.
    pub const fn policy(self) -> CachePolicy {
        match self {
            OperationKind::Read => CachePolicy {
                lookup_first: true,
                on_success: CacheAction::Populate,
            },
            OperationKind::Create => CachePolicy {
                lookup_first: false,
                on_success: CacheAction::Populate,
            },
            OperationKind::Update => CachePolicy {
                lookup_first: false,
                on_success: CacheAction::Replace,
            },
            OperationKind::Archive => CachePolicy {
                lookup_first: false,
                on_success: CacheAction::Evict,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Archive => "archive",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
