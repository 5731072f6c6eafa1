use crate::domain::{News, NewsId, PageRequest, User};
use crate::ports::{NewsRepository, UserRepository};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use sled::Db;
use std::path::Path;
use uuid::Uuid;

const NEWS_TREE: &str = "news";
const USERS_TREE: &str = "users";

/// Sled-backed news store. Keys are big-endian ids so iteration follows id order.
#[derive(Clone)]
pub struct SledNewsRepository {
    db: Db,
}

impl SledNewsRepository {
    /// Opens (or creates) the database, creating the parent directory if needed
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path).map_err(storage_error("Failed to open Sled database"))?;
        Ok(Self { db })
    }

    /// Author store sharing this database
    pub fn users(&self) -> SledUserRepository {
        SledUserRepository {
            db: self.db.clone(),
        }
    }

    fn news_tree(&self) -> Result<sled::Tree> {
        self.db
            .open_tree(NEWS_TREE)
            .map_err(storage_error("Failed to open news tree"))
    }

    fn next_id(&self) -> Result<NewsId> {
        let raw = self
            .db
            .generate_id()
            .map_err(storage_error("Failed to generate id"))?;
        Ok(NewsId(raw + 1))
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn storage_error(context: &'static str) -> impl FnOnce(sled::Error) -> Error {
    move |e| Error::Storage(format!("{}: {}", context, e))
}

fn key_bytes(id: NewsId) -> [u8; 8] {
    id.0.to_be_bytes()
}

#[async_trait]
impl NewsRepository for SledNewsRepository {
    async fn insert(&self, mut news: News) -> Result<News> {
        news.id = self.next_id()?;
        let tree = self.news_tree()?;
        tree.insert(key_bytes(news.id), serde_json::to_vec(&news)?)
            .map_err(storage_error("Failed to insert news"))?;
        tree.flush()
            .map_err(storage_error("Failed to flush database"))?;
        Ok(news)
    }

    async fn find_by_id(&self, id: NewsId) -> Result<Option<News>> {
        let tree = self.news_tree()?;
        match tree
            .get(key_bytes(id))
            .map_err(storage_error("Failed to get news"))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, news: News) -> Result<News> {
        let tree = self.news_tree()?;
        let key = key_bytes(news.id);
        let value = serde_json::to_vec(&news)?;

        // Swap against the value just read so a concurrent removal is never undone
        let mut current = tree
            .get(key)
            .map_err(storage_error("Failed to look up news"))?;
        loop {
            let Some(existing) = current else {
                return Err(Error::not_found("News", news.id));
            };
            match tree
                .compare_and_swap(key, Some(existing), Some(value.clone()))
                .map_err(storage_error("Failed to save news"))?
            {
                Ok(()) => break,
                Err(conflict) => current = conflict.current,
            }
        }
        tree.flush()
            .map_err(storage_error("Failed to flush database"))?;
        Ok(news)
    }

    async fn find_page(&self, archived: bool, page: PageRequest) -> Result<(Vec<News>, usize)> {
        let tree = self.news_tree()?;
        let offset = page.offset();
        let mut total = 0;
        let mut content = Vec::new();

        for item in tree.iter() {
            let (_, bytes) = item.map_err(storage_error("Failed to iterate database"))?;
            let news: News = decode(&bytes)?;
            if news.archived != archived {
                continue;
            }
            if total >= offset && content.len() < page.page_size() {
                content.push(news);
            }
            total += 1;
        }

        Ok((content, total))
    }
}

/// Sled-backed author store keyed by uuid
#[derive(Clone)]
pub struct SledUserRepository {
    db: Db,
}

impl SledUserRepository {
    fn users_tree(&self) -> Result<sled::Tree> {
        self.db
            .open_tree(USERS_TREE)
            .map_err(storage_error("Failed to open users tree"))
    }
}

#[async_trait]
impl UserRepository for SledUserRepository {
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<User>> {
        let tree = self.users_tree()?;
        match tree
            .get(uuid.as_bytes())
            .map_err(storage_error("Failed to get user"))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, user: User) -> Result<User> {
        let tree = self.users_tree()?;
        let value = serde_json::to_vec(&user)?;

        match tree
            .compare_and_swap(user.uuid.as_bytes(), None::<&[u8]>, Some(value))
            .map_err(storage_error("Failed to create user"))?
        {
            Ok(()) => {
                tree.flush()
                    .map_err(storage_error("Failed to flush database"))?;
                Ok(user)
            }
            Err(conflict) => match conflict.current {
                Some(bytes) => decode(&bytes),
                None => Err(Error::Internal(format!(
                    "user {} neither created nor found",
                    user.uuid
                ))),
            },
        }
    }
}
