use crate::domain::{News, NewsId, PageRequest, User};
use crate::ports::{NewsRepository, UserRepository};
use async_trait::async_trait;
use shared::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Volatile news store, ids assigned from 1
#[derive(Debug, Default)]
pub struct InMemoryNewsRepository {
    news: RwLock<BTreeMap<NewsId, News>>,
    last_id: AtomicU64,
}

impl InMemoryNewsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking read for checks made while the interceptor holds its lock
    #[cfg(test)]
    pub(crate) fn try_snapshot(&self, id: NewsId) -> Option<News> {
        self.news.try_read().ok().and_then(|store| store.get(&id).cloned())
    }
}

#[async_trait]
impl NewsRepository for InMemoryNewsRepository {
    async fn insert(&self, mut news: News) -> Result<News> {
        news.id = NewsId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.news.write().await.insert(news.id, news.clone());
        Ok(news)
    }

    async fn find_by_id(&self, id: NewsId) -> Result<Option<News>> {
        Ok(self.news.read().await.get(&id).cloned())
    }

    async fn save(&self, news: News) -> Result<News> {
        let mut store = self.news.write().await;
        match store.get_mut(&news.id) {
            Some(slot) => {
                *slot = news.clone();
                Ok(news)
            }
            None => Err(Error::not_found("News", news.id)),
        }
    }

    async fn find_page(&self, archived: bool, page: PageRequest) -> Result<(Vec<News>, usize)> {
        let store = self.news.read().await;
        let matching = store.values().filter(|n| n.archived == archived);
        let total = matching.clone().count();
        let content = matching
            .skip(page.offset())
            .take(page.page_size())
            .cloned()
            .collect();
        Ok((content, total))
    }
}

/// Volatile author store
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&uuid).cloned())
    }

    async fn create(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        Ok(users.entry(user.uuid).or_insert(user).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewsRequest, UserRequest};

    fn news(title: &str) -> News {
        let request = NewsRequest::new(
            title,
            "text",
            UserRequest::new(Uuid::new_v4(), "reporter"),
        );
        News::from_request(&request, &User::from_request(&request.user))
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = InMemoryNewsRepository::new();
        let first = repo.insert(news("one")).await.unwrap();
        let second = repo.insert(news("two")).await.unwrap();

        assert_eq!(first.id, NewsId(1));
        assert_eq!(second.id, NewsId(2));
        assert_eq!(repo.find_by_id(NewsId(2)).await.unwrap(), Some(second));
        assert!(repo.find_by_id(NewsId(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_requires_existing_news() {
        let repo = InMemoryNewsRepository::new();
        let mut missing = news("ghost");
        missing.id = NewsId(42);

        let err = repo.save(missing).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_page_filters_by_archive_flag() {
        let repo = InMemoryNewsRepository::new();
        for i in 0..5 {
            let mut stored = repo.insert(news(&format!("n{}", i))).await.unwrap();
            if i % 2 == 0 {
                stored.archived = true;
                repo.save(stored).await.unwrap();
            }
        }

        let (active, total) = repo
            .find_page(false, PageRequest::new(10, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(active.len(), 2);

        let (archived, total) = repo
            .find_page(true, PageRequest::new(2, 2).unwrap())
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, NewsId(5));
    }

    #[tokio::test]
    async fn test_far_page_is_empty() {
        let repo = InMemoryNewsRepository::new();
        repo.insert(news("only")).await.unwrap();

        let (content, total) = repo
            .find_page(false, PageRequest::new(2, usize::MAX).unwrap())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn test_user_create_keeps_first_author() {
        let users = InMemoryUserRepository::new();
        let uuid = Uuid::new_v4();

        let first = users
            .create(User::from_request(&UserRequest::new(uuid, "first")))
            .await
            .unwrap();
        let second = users
            .create(User::from_request(&UserRequest::new(uuid, "second")))
            .await
            .unwrap();

        assert_eq!(first.user_name, "first");
        assert_eq!(second, first);
        assert_eq!(users.find_by_uuid(uuid).await.unwrap(), Some(first));
    }
}
