use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Durable store backing the news service
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Sled,
}

/// Cache adapter placed underneath the interceptor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Moka,
    InMemory,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub capacity: Option<u64>, // max entries, None = unbounded
    pub ttl: Option<Duration>,
}

#[derive(Clone, Debug)]
pub struct LoadTestConfig {
    pub workers: usize,
    pub ops_per_worker: usize,
    pub key_space: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub data_dir: String,
    pub store: StoreKind,
    pub cache: CacheConfig,
    pub load_test: LoadTestConfig,
}

impl Config {
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
    const DEFAULT_WORKERS: usize = 16;
    const DEFAULT_OPS_PER_WORKER: usize = 500;
    const DEFAULT_KEY_SPACE: u64 = 32;

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("NEWSDESK_STORE").as_deref().map(str::trim) {
            None | Some("memory") => StoreKind::Memory,
            Some("sled") => StoreKind::Sled,
            Some(other) => {
                warn!("Unknown NEWSDESK_STORE '{}', using in-memory store", other);
                StoreKind::Memory
            }
        };

        let backend = match lookup("NEWSDESK_CACHE_BACKEND").as_deref().map(str::trim) {
            None | Some("moka") => CacheBackend::Moka,
            Some("memory") => CacheBackend::InMemory,
            Some(other) => {
                warn!("Unknown NEWSDESK_CACHE_BACKEND '{}', using moka", other);
                CacheBackend::Moka
            }
        };

        let capacity = match parse_or(&lookup, "NEWSDESK_CACHE_CAPACITY", Self::DEFAULT_CACHE_CAPACITY) {
            0 => None,
            n => Some(n),
        };

        let ttl = lookup("NEWSDESK_CACHE_TTL_SECS").and_then(|raw| match raw.trim().parse::<u64>() {
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => {
                warn!("Invalid NEWSDESK_CACHE_TTL_SECS '{}', caching without TTL", raw);
                None
            }
        });

        Self {
            data_dir: lookup("NEWSDESK_DATA_DIR").unwrap_or_else(|| Self::DEFAULT_DATA_DIR.to_string()),
            store,
            cache: CacheConfig {
                backend,
                capacity,
                ttl,
            },
            load_test: LoadTestConfig {
                workers: parse_or(&lookup, "NEWSDESK_LOADTEST_WORKERS", Self::DEFAULT_WORKERS).max(1),
                ops_per_worker: parse_or(&lookup, "NEWSDESK_LOADTEST_OPS", Self::DEFAULT_OPS_PER_WORKER),
                key_space: parse_or(&lookup, "NEWSDESK_LOADTEST_KEYS", Self::DEFAULT_KEY_SPACE).max(1),
            },
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Invalid {} '{}', falling back to {}", name, raw, default);
            default
        }),
        None => default,
    }
}
