//! Newsdesk core: the news domain, its ports, and the cache-consistency
//! interceptor that keeps a key-value cache coherent with news mutations.

pub mod domain;
pub mod events;
pub mod interceptor;
pub mod ports;
pub mod service;

pub use domain::{
    News, NewsId, NewsRequest, NewsResponse, Page, PageRequest, User, UserRequest, UserResponse,
};
pub use interceptor::{CacheAction, CachePolicy, CacheStats, CachingNewsService, OperationKind};
pub use ports::{CacheStore, NewsRepository, NewsService, UserRepository};
pub use service::{
    InMemoryNewsRepository, InMemoryUserRepository, NewsServiceImpl, SledNewsRepository,
    SledUserRepository,
};
