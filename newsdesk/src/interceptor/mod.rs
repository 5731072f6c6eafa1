pub mod caching_service;
pub mod operation;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use caching_service::CachingNewsService;
pub use operation::{CacheAction, CachePolicy, OperationKind};
pub use stats::CacheStats;
