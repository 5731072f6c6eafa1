//! Instrumented doubles for interceptor tests.

use crate::domain::{NewsId, NewsRequest, NewsResponse, Page, PageRequest, UserRequest};
use crate::ports::{CacheStore, NewsService};
use crate::service::{InMemoryNewsRepository, InMemoryUserRepository, NewsServiceImpl};
use async_trait::async_trait;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn news_request(title: &str, text: &str) -> NewsRequest {
    NewsRequest::new(title, text, UserRequest::new(Uuid::new_v4(), "reporter"))
}

pub fn counting_service() -> CountingNewsService {
    CountingNewsService::new(Arc::new(InMemoryNewsRepository::new()))
}

/// Plain map cache with no internal synchronization
#[derive(Debug, Default)]
pub struct MapCache {
    entries: HashMap<NewsId, NewsResponse>,
}

impl MapCache {
    pub fn entries(&self) -> &HashMap<NewsId, NewsResponse> {
        &self.entries
    }
}

impl CacheStore<NewsId, NewsResponse> for MapCache {
    fn get(&mut self, key: &NewsId) -> Option<NewsResponse> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: NewsId, value: NewsResponse) {
        self.entries.insert(key, value);
    }

    fn remove_by_key(&mut self, key: &NewsId) {
        self.entries.remove(key);
    }
}

/// Cache mutation as observed by [`CheckedCache`]
#[derive(Clone, Debug, PartialEq)]
pub enum CacheMutation {
    Put(NewsId, NewsResponse),
    Remove(NewsId),
}

/// Map cache that compares every hit and every put against the store.
///
/// It is only touched under the interceptor lock, and every store mutation
/// also happens under that lock, so the store can be read without blocking.
pub struct CheckedCache {
    inner: MapCache,
    store: Arc<InMemoryNewsRepository>,
    log: Arc<Mutex<Vec<CacheMutation>>>,
    stale: Arc<AtomicUsize>,
}

impl CheckedCache {
    pub fn new(store: Arc<InMemoryNewsRepository>) -> Self {
        Self {
            inner: MapCache::default(),
            store,
            log: Arc::new(Mutex::new(Vec::new())),
            stale: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn log(&self) -> Arc<Mutex<Vec<CacheMutation>>> {
        self.log.clone()
    }

    pub fn stale_counter(&self) -> Arc<AtomicUsize> {
        self.stale.clone()
    }

    pub fn entries(&self) -> &HashMap<NewsId, NewsResponse> {
        self.inner.entries()
    }

    fn check_current(&self, key: &NewsId, value: &NewsResponse) {
        let current = self
            .store
            .try_snapshot(*key)
            .filter(|news| !news.archived)
            .map(|news| news.to_response());
        if current.as_ref() != Some(value) {
            self.stale.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl CacheStore<NewsId, NewsResponse> for CheckedCache {
    fn get(&mut self, key: &NewsId) -> Option<NewsResponse> {
        let hit = self.inner.get(key);
        if let Some(ref value) = hit {
            self.check_current(key, value);
        }
        hit
    }

    fn put(&mut self, key: NewsId, value: NewsResponse) {
        self.check_current(&key, &value);
        self.log
            .lock()
            .unwrap()
            .push(CacheMutation::Put(key, value.clone()));
        self.inner.put(key, value);
    }

    fn remove_by_key(&mut self, key: &NewsId) {
        self.log.lock().unwrap().push(CacheMutation::Remove(*key));
        self.inner.remove_by_key(key);
    }
}

/// News service that counts calls per operation, can be told to fail, and
/// tracks how many calls are in flight at once.
pub struct CountingNewsService {
    inner: NewsServiceImpl<Arc<InMemoryNewsRepository>, InMemoryUserRepository>,
    reads: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
    archives: AtomicU64,
    fail_updates: AtomicBool,
    fail_archives: AtomicBool,
    panic_on_update: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingNewsService {
    pub fn new(store: Arc<InMemoryNewsRepository>) -> Self {
        Self {
            inner: NewsServiceImpl::new(store, InMemoryUserRepository::new()),
            reads: AtomicU64::new(0),
            creates: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            archives: AtomicU64::new(0),
            fail_updates: AtomicBool::new(false),
            fail_archives: AtomicBool::new(false),
            panic_on_update: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Creates news directly in the store, bypassing counters
    pub async fn seed(&self, request: NewsRequest) -> NewsResponse {
        self.inner.create(request).await.unwrap()
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> u64 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn archives(&self) -> u64 {
        self.archives.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_archives(&self, fail: bool) {
        self.fail_archives.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_update(&self, panic: bool) {
        self.panic_on_update.store(panic, Ordering::SeqCst);
    }

    /// Marks a call in flight, yielding so overlapping callers would be observed
    async fn enter(&self, counter: &AtomicU64) -> InFlight<'_> {
        counter.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        InFlight(&self.in_flight)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NewsService for CountingNewsService {
    async fn get(&self, id: NewsId) -> Result<NewsResponse> {
        let _guard = self.enter(&self.reads).await;
        self.inner.get(id).await
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
        let _guard = self.enter(&self.creates).await;
        self.inner.create(request).await
    }

    async fn update(&self, id: NewsId, request: NewsRequest) -> Result<NewsResponse> {
        let _guard = self.enter(&self.updates).await;
        if self.panic_on_update.load(Ordering::SeqCst) {
            panic!("update of {} blew up", id);
        }
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Error::Storage("store unreachable".to_string()));
        }
        self.inner.update(id, request).await
    }

    async fn archive(&self, id: NewsId) -> Result<()> {
        let _guard = self.enter(&self.archives).await;
        if self.fail_archives.load(Ordering::SeqCst) {
            return Err(Error::Storage("store unreachable".to_string()));
        }
        self.inner.archive(id).await
    }
}
