//! Concurrent load test for the caching news interceptor.
//!
//! Spawns workers that issue a random mix of reads, updates, creates and
//! archives against one shared `CachingNewsService`, then checks at quiescence
//! that every cached entry matches the store and no archived news is cached.
//! Exits non-zero when a violation is found.

use newsdesk::{
    CacheStore, CachingNewsService, InMemoryNewsRepository, InMemoryUserRepository, NewsId,
    NewsRepository, NewsRequest, NewsResponse, NewsService, NewsServiceImpl, SledNewsRepository,
    UserRepository, UserRequest,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::config::{Config, StoreKind};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use storage_engine::StorageFactory;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

type Repository = Arc<dyn NewsRepository>;
type Users = Arc<dyn UserRepository>;
type Cache = Box<dyn CacheStore<NewsId, NewsResponse>>;
type Service = CachingNewsService<NewsServiceImpl<Repository, Users>, Cache>;

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    updates: AtomicU64,
    creates: AtomicU64,
    archives: AtomicU64,
    not_found: AtomicU64,
    failed: AtomicU64,
    highest_id: AtomicU64,
}

#[derive(Debug)]
struct LoadTestStats {
    total_ops: u64,
    reads: u64,
    updates: u64,
    creates: u64,
    archives: u64,
    not_found: u64,
    failed: u64,
    hits: u64,
    misses: u64,
    hit_ratio: f64,
    duration: Duration,
}

impl LoadTestStats {
    fn print_summary(&self) {
        let secs = self.duration.as_secs_f64().max(f64::EPSILON);
        println!("\n=== Load Test Results ===");
        println!("Duration:          {} ms ({:.2} seconds)", self.duration.as_millis(), secs);
        println!("Total operations:  {}", self.total_ops);
        println!("  Reads:           {}", self.reads);
        println!("  Updates:         {}", self.updates);
        println!("  Creates:         {}", self.creates);
        println!("  Archives:        {}", self.archives);
        println!("Not found:         {}", self.not_found);
        println!("Failed:            {}", self.failed);
        println!("Cache hits:        {}", self.hits);
        println!("Cache misses:      {}", self.misses);
        println!("Hit ratio:         {:.2}%", self.hit_ratio * 100.0);
        println!("Throughput:        {} ops/sec", (self.total_ops as f64 / secs) as u64);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    info!(
        store = ?config.store,
        backend = ?config.cache.backend,
        workers = config.load_test.workers,
        ops_per_worker = config.load_test.ops_per_worker,
        key_space = config.load_test.key_space,
        "Starting newsdesk load test"
    );

    let (repository, users): (Repository, Users) = match config.store {
        StoreKind::Memory => (
            Arc::new(InMemoryNewsRepository::new()) as Repository,
            Arc::new(InMemoryUserRepository::new()) as Users,
        ),
        StoreKind::Sled => {
            let path = Path::new(&config.data_dir).join("news.sled");
            info!(path = %path.display(), "Opening sled store");
            let news = SledNewsRepository::new(path)?;
            let users = news.users();
            (Arc::new(news) as Repository, Arc::new(users) as Users)
        }
    };

    let cache: Cache = StorageFactory.create_from_config(&config.cache);
    let service = Arc::new(CachingNewsService::new(
        NewsServiceImpl::new(repository.clone(), users),
        cache,
    ));

    let counters = Arc::new(Counters::default());
    for i in 0..config.load_test.key_space {
        let created = service
            .create(news_request(&format!("seed {}", i), "seeded story"))
            .await?;
        counters.highest_id.fetch_max(created.id.0, Ordering::SeqCst);
    }
    info!(seeded = config.load_test.key_space, "Store seeded");

    let start = Instant::now();
    let mut tasks = JoinSet::new();
    for worker in 0..config.load_test.workers {
        let service = service.clone();
        let counters = counters.clone();
        let ops = config.load_test.ops_per_worker;
        // Ids past the seeded range exercise not-found paths
        let key_range = config.load_test.key_space + config.load_test.key_space / 4;
        tasks.spawn(async move {
            run_worker(&service, &counters, worker as u64, ops, key_range.max(1)).await
        });
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(err) = result {
            error!(error = %err, "Worker task failed");
            counters.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
    let duration = start.elapsed();

    let stats = LoadTestStats {
        total_ops: (config.load_test.workers * config.load_test.ops_per_worker) as u64,
        reads: counters.reads.load(Ordering::SeqCst),
        updates: counters.updates.load(Ordering::SeqCst),
        creates: counters.creates.load(Ordering::SeqCst),
        archives: counters.archives.load(Ordering::SeqCst),
        not_found: counters.not_found.load(Ordering::SeqCst),
        failed: counters.failed.load(Ordering::SeqCst),
        hits: service.stats().hits(),
        misses: service.stats().misses(),
        hit_ratio: service.stats().hit_ratio(),
        duration,
    };
    stats.print_summary();

    let highest_id = counters.highest_id.load(Ordering::SeqCst);
    let violations = verify_coherence(&service, &repository, highest_id).await?;
    if violations > 0 || stats.failed > 0 {
        error!(violations, failed = stats.failed, "Load test failed");
        std::process::exit(1);
    }

    info!(checked = highest_id, "Cache coherent with store");
    Ok(())
}

fn news_request(title: &str, text: &str) -> NewsRequest {
    NewsRequest::new(title, text, UserRequest::new(Uuid::new_v4(), "loadtest"))
}

async fn run_worker(
    service: &Service,
    counters: &Counters,
    worker: u64,
    ops: usize,
    key_range: u64,
) {
    let mut rng = StdRng::seed_from_u64(worker);
    for op in 0..ops {
        let id = NewsId(rng.random_range(1..=key_range));
        let roll = rng.random_range(0..100);

        let result = if roll < 60 {
            counters.reads.fetch_add(1, Ordering::Relaxed);
            service.get(id).await.map(|_| ())
        } else if roll < 80 {
            counters.updates.fetch_add(1, Ordering::Relaxed);
            let request = news_request(&format!("w{} edit {}", worker, op), "updated story");
            match request.validate() {
                Ok(()) => service.update(id, request).await.map(|_| ()),
                Err(err) => Err(err),
            }
        } else if roll < 90 {
            counters.creates.fetch_add(1, Ordering::Relaxed);
            let request = news_request(&format!("w{} new {}", worker, op), "fresh story");
            match request.validate() {
                Ok(()) => service.create(request).await.map(|created| {
                    counters.highest_id.fetch_max(created.id.0, Ordering::SeqCst);
                }),
                Err(err) => Err(err),
            }
        } else {
            counters.archives.fetch_add(1, Ordering::Relaxed);
            service.archive(id).await
        };

        match result {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                counters.not_found.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!(worker, op, error = %err, "Operation failed");
                counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Compares every cached entry with the store, returning the number of mismatches
async fn verify_coherence(
    service: &Service,
    repository: &Repository,
    highest_id: u64,
) -> shared::Result<u64> {
    let mut violations = 0;
    for raw in 1..=highest_id {
        let id = NewsId(raw);
        let Some(cached) = service.peek(id).await else {
            continue;
        };
        match repository.find_by_id(id).await? {
            Some(news) if news.archived => {
                error!(%id, "Archived news is still cached");
                violations += 1;
            }
            Some(news) if news.to_response() != cached => {
                error!(%id, cached = %cached.title, stored = %news.title, "Cached entry is stale");
                violations += 1;
            }
            Some(_) => {}
            None => {
                error!(%id, "Cached entry has no stored news");
                violations += 1;
            }
        }
    }
    Ok(violations)
}
