use crate::domain::{News, NewsId, NewsRequest, NewsResponse, Page, PageRequest, User, UserRequest};
use crate::ports::{NewsRepository, NewsService, UserRepository};
use async_trait::async_trait;
use shared::{Error, Result};
use tracing::debug;

const ENTITY: &str = "News";

/// Reference news service: the business rules for active and archived news
/// on top of any [`NewsRepository`], with authors kept in a [`UserRepository`].
pub struct NewsServiceImpl<R: NewsRepository, U: UserRepository> {
    repository: R,
    users: U,
}

impl<R: NewsRepository, U: UserRepository> NewsServiceImpl<R, U> {
    pub fn new(repository: R, users: U) -> Self {
        Self { repository, users }
    }

    /// Stored author for `request`, created on first use of its uuid
    async fn author(&self, request: &UserRequest) -> Result<User> {
        if let Some(user) = self.users.find_by_uuid(request.uuid).await? {
            return Ok(user);
        }
        let user = self.users.create(User::from_request(request)).await?;
        debug!(uuid = %user.uuid, "author created");
        Ok(user)
    }

    /// News that exists and matches the requested archive state
    async fn find(&self, id: NewsId, archived: bool) -> Result<News> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(|news| news.archived == archived)
            .ok_or_else(|| Error::not_found(ENTITY, id))
    }

    async fn page(&self, archived: bool, page: PageRequest) -> Result<Page<NewsResponse>> {
        let (news, total) = self.repository.find_page(archived, page).await?;
        let content = news.iter().map(News::to_response).collect();
        Ok(Page::new(page, total, content))
    }
}

#[async_trait]
impl<R: NewsRepository, U: UserRepository> NewsService for NewsServiceImpl<R, U> {
    async fn get(&self, id: NewsId) -> Result<NewsResponse> {
        Ok(self.find(id, false).await?.to_response())
    }

    async fn get_from_archive(&self, id: NewsId) -> Result<NewsResponse> {
        Ok(self.find(id, true).await?.to_response())
    }

    async fn get_all(&self, page: PageRequest) -> Result<Page<NewsResponse>> {
        self.page(false, page).await
    }

    async fn get_all_from_archive(&self, page: PageRequest) -> Result<Page<NewsResponse>> {
        self.page(true, page).await
    }

    async fn create(&self, request: NewsRequest) -> Result<NewsResponse> {
        let author = self.author(&request.user).await?;
        let news = self
            .repository
            .insert(News::from_request(&request, &author))
            .await?;
        debug!(id = %news.id, "news created");
        Ok(news.to_response())
    }

    async fn update(&self, id: NewsId, request: NewsRequest) -> Result<NewsResponse> {
        let mut news = self.find(id, false).await?;
        news.merge(&request);
        let saved = self.repository.save(news).await?;
        debug!(%id, "news updated");
        Ok(saved.to_response())
    }

    async fn archive(&self, id: NewsId) -> Result<()> {
        let mut news = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(ENTITY, id))?;
        news.archived = true;
        self.repository.save(news).await?;
        debug!(%id, "news archived");
        Ok(())
    }
}
