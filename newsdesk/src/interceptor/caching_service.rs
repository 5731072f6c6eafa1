use crate::domain::{NewsId, NewsRequest, NewsResponse, Page, PageRequest};
use crate::events::{CacheEvent, EntryEvent};
use crate::interceptor::operation::{CacheAction, OperationKind};
use crate::interceptor::stats::CacheStats;
use crate::ports::{CacheStore, NewsService};
use async_trait::async_trait;
use shared::{Error, Result};
use std::fmt;
use std::future::Future;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, trace, warn};

/// Cache-consistency decorator around a [`NewsService`].
///
/// Every read, create, update and archive runs inside one critical section:
/// the lock is taken before the cache is consulted, held across the wrapped
/// service call, and released when the guard drops on any exit path. The
/// lock owns the cache, so the cache itself needs no internal locking.
///
/// Listing and archive lookups do not touch the cache and go straight to the
/// wrapped service without taking the lock.
pub struct CachingNewsService<S, C>
where
    S: NewsService,
    C: CacheStore<NewsId, NewsResponse>,
{
    inner: S,
    cache: Mutex<C>,
    stats: CacheStats,
    event_broadcaster: Option<broadcast::Sender<CacheEvent>>,
}

impl<S, C> CachingNewsService<S, C>
where
    S: NewsService,
    C: CacheStore<NewsId, NewsResponse>,
{
    pub fn new(inner: S, cache: C) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
            stats: CacheStats::default(),
            event_broadcaster: None,
        }
    }

    pub fn with_event_broadcaster(
        inner: S,
        cache: C,
        broadcaster: broadcast::Sender<CacheEvent>,
    ) -> Self {
        Self {
            event_broadcaster: Some(broadcaster),
            ..Self::new(inner, cache)
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Current cache entry for `id`, taken under the lock. Never calls the
    /// wrapped service and is not counted as a hit or miss.
    pub async fn peek(&self, id: NewsId) -> Option<NewsResponse> {
        self.cache.lock().await.get(&id)
    }

    pub fn into_parts(self) -> (S, C) {
        (self.inner, self.cache.into_inner())
    }

    /// Runs one intercepted operation. `key` is `None` only for create, whose
    /// key comes from the service result.
    async fn intercept<F, Fut>(
        &self,
        kind: OperationKind,
        key: Option<NewsId>,
        call: F,
    ) -> Result<Option<NewsResponse>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Option<NewsResponse>>> + Send,
    {
        let policy = kind.policy();
        let mut cache = self.cache.lock().await;

        if policy.lookup_first {
            if let Some(key) = key {
                if let Some(entry) = cache.get(&key) {
                    self.stats.record_hit();
                    debug!(%key, operation = %kind, "cache hit");
                    return Ok(Some(entry));
                }
                self.stats.record_miss();
                debug!(%key, operation = %kind, "cache miss");
            }
        }

        let outcome = match call().await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(key = ?key, operation = %kind, error = %err, "service call failed, cache untouched");
                return Err(err);
            }
        };

        let key = key.or_else(|| outcome.as_ref().map(NewsResponse::cache_key));
        match key {
            Some(key) => self.apply(policy.on_success, kind, key, outcome.as_ref(), &mut *cache),
            None => warn!(operation = %kind, "no cache key for service result, cache untouched"),
        }

        Ok(outcome)
    }

    fn apply(
        &self,
        action: CacheAction,
        kind: OperationKind,
        key: NewsId,
        entry: Option<&NewsResponse>,
        cache: &mut C,
    ) {
        let event = match (action, entry) {
            (CacheAction::Populate, Some(entry)) => {
                cache.put(key, entry.clone());
                self.stats.record_population();
                CacheEvent::Populated(EntryEvent::new(key, kind))
            }
            (CacheAction::Replace, Some(entry)) => {
                cache.remove_by_key(&key);
                cache.put(key, entry.clone());
                self.stats.record_replacement();
                CacheEvent::Replaced(EntryEvent::new(key, kind))
            }
            (CacheAction::Evict, _) => {
                cache.remove_by_key(&key);
                self.stats.record_eviction();
                CacheEvent::Evicted(EntryEvent::new(key, kind))
            }
            (action, None) => {
                warn!(%key, operation = %kind, ?action, "service returned no entry to cache");
                return;
            }
        };
        debug!(%key, operation = %kind, ?action, "cache updated");
        self.publish(event);
    }

    fn publish(&self, event: CacheEvent) {
        if let Some(ref broadcaster) = self.event_broadcaster {
            match broadcaster.send(event) {
                Ok(subscriber_count) => {
                    trace!("Broadcasted cache event to {} subscriber(s)", subscriber_count);
                }
                Err(err) => {
                    trace!("No subscribers for cache event on key {}", err.0.key());
                }
            }
        }
    }
}

/// Unwraps the entry a successful read, create or update must yield
fn expect_entry(kind: OperationKind, outcome: Option<NewsResponse>) -> Result<NewsResponse> {
    outcome.ok_or_else(|| Error::Internal(format!("{} completed without a news entry", kind)))
}

#[async_trait]
impl<S, C> NewsService for CachingNewsService<S, C>
where
    S: NewsService,
    C: CacheStore<NewsId, NewsResponse>,
{
    async fn get(&self, id: NewsId) -> Result<NewsResponse> {
        let kind = OperationKind::Read;
        let outcome = self
            .intercept(kind, Some(id), || async move { self.inner.get(id).await.map(Some) })
            .await?;
        expect_entry(kind, outcome)
    }

    async fn get_from_archive(&self, id: NewsId) -> Result<NewsResponse> {
        self.inner.get_from_archive(id).await
    }

    async fn get_all(&self, page: PageRequest) -> Result<Page<NewsResponse>> {
        self.inner.get_all(page).await
    }

    async fn get_all_from_archive(&self, page: PageRequest) -> Result<Page<NewsResponse>> {
        self.inner.get_all_from_archive(page).await
    }

    async fn create(&self, request: NewsRequest) -> Result<NewsResponse> {
        let kind = OperationKind::Create;
        let outcome = self
            .intercept(kind, None, || async move { self.inner.create(request).await.map(Some) })
            .await?;
        expect_entry(kind, outcome)
    }

    async fn update(&self, id: NewsId, request: NewsRequest) -> Result<NewsResponse> {
        let kind = OperationKind::Update;
        let outcome = self
            .intercept(kind, Some(id), || async move {
                self.inner.update(id, request).await.map(Some)
            })
            .await?;
        expect_entry(kind, outcome)
    }

    async fn archive(&self, id: NewsId) -> Result<()> {
        self.intercept(OperationKind::Archive, Some(id), || async move {
            self.inner.archive(id).await.map(|()| None)
        })
        .await
        .map(|_| ())
    }
}

impl<S, C> fmt::Debug for CachingNewsService<S, C>
where
    S: NewsService,
    C: CacheStore<NewsId, NewsResponse>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingNewsService")
            .field("stats", &self.stats)
            .field("broadcasting", &self.event_broadcaster.is_some())
            .finish()
    }
}
