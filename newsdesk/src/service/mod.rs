pub mod memory_repository;
pub mod news_service;
pub mod sled_repository;

pub use memory_repository::{InMemoryNewsRepository, InMemoryUserRepository};
pub use news_service::NewsServiceImpl;
pub use sled_repository::{SledNewsRepository, SledUserRepository};
