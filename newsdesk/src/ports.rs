#![deny(clippy::all)]

use crate::domain::{News, NewsId, NewsRequest, NewsResponse, Page, PageRequest, User};
use async_trait::async_trait;
use shared::Result;
use std::sync::Arc;
use uuid::Uuid;

// Ports are the pluggable extension points: cache adapters below the
// interceptor, the resource service it wraps, and the stores behind that.

/// Port for key-value cache storage (e.g., Moka)
///
/// Methods take `&mut self`: the interceptor grants exclusive access under its
/// lock, so implementations are not required to synchronize internally.
pub trait CacheStore<K, V>: Send + 'static {
    /// Returns the entry for `key`, `None` when absent
    fn get(&mut self, key: &K) -> Option<V>;
    /// Unconditional upsert
    fn put(&mut self, key: K, value: V);
    /// No-op when `key` is absent
    fn remove_by_key(&mut self, key: &K);
}

impl<K, V> CacheStore<K, V> for Box<dyn CacheStore<K, V>>
where
    K: 'static,
    V: 'static,
{
    fn get(&mut self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn put(&mut self, key: K, value: V) {
        (**self).put(key, value)
    }

    fn remove_by_key(&mut self, key: &K) {
        (**self).remove_by_key(key)
    }
}

/// Port for the news resource. The caching interceptor implements this same
/// contract so it can be composed in front of any implementation.
#[async_trait]
pub trait NewsService: Send + Sync + 'static {
    /// Active (non-archived) news by id
    async fn get(&self, id: NewsId) -> Result<NewsResponse>;

    /// Archived news by id
    async fn get_from_archive(&self, id: NewsId) -> Result<NewsResponse>;

    async fn get_all(&self, page: PageRequest) -> Result<Page<NewsResponse>>;

    async fn get_all_from_archive(&self, page: PageRequest) -> Result<Page<NewsResponse>>;

    async fn create(&self, request: NewsRequest) -> Result<NewsResponse>;

    async fn update(&self, id: NewsId, request: NewsRequest) -> Result<NewsResponse>;

    /// Soft delete
    async fn archive(&self, id: NewsId) -> Result<()>;
}

/// Port for the durable news store
#[async_trait]
pub trait NewsRepository: Send + Sync + 'static {
    /// Persist new news, assigning its id
    async fn insert(&self, news: News) -> Result<News>;

    async fn find_by_id(&self, id: NewsId) -> Result<Option<News>>;

    /// Overwrite existing news
    async fn save(&self, news: News) -> Result<News>;

    /// Page of news filtered by archive flag, ordered by id
    async fn find_page(&self, archived: bool, page: PageRequest) -> Result<(Vec<News>, usize)>;
}

#[async_trait]
impl<R> NewsRepository for Arc<R>
where
    R: NewsRepository + ?Sized,
{
    async fn insert(&self, news: News) -> Result<News> {
        (**self).insert(news).await
    }

    async fn find_by_id(&self, id: NewsId) -> Result<Option<News>> {
        (**self).find_by_id(id).await
    }

    async fn save(&self, news: News) -> Result<News> {
        (**self).save(news).await
    }

    async fn find_page(&self, archived: bool, page: PageRequest) -> Result<(Vec<News>, usize)> {
        (**self).find_page(archived, page).await
    }
}

/// Port for the author store, keyed by uuid
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<User>>;

    /// Stores `user` unless a user with the same uuid exists.
    /// Returns whichever user is stored afterwards.
    async fn create(&self, user: User) -> Result<User>;
}

#[async_trait]
impl<U> UserRepository for Arc<U>
where
    U: UserRepository + ?Sized,
{
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<User>> {
        (**self).find_by_uuid(uuid).await
    }

    async fn create(&self, user: User) -> Result<User> {
        (**self).create(user).await
    }
}
