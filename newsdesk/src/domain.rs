use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::fmt;
use uuid::Uuid;

pub use request::{NewsRequest, PageRequest, UserRequest};
pub use response::{NewsResponse, Page, UserResponse};

/// Identifier of a piece of news; doubles as the cache key
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewsId(pub u64);

impl fmt::Display for NewsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NewsId {
    fn from(id: u64) -> Self {
        NewsId(id)
    }
}

pub mod request {
    use super::*;

    pub const TITLE_MAX_CHARS: usize = 50;
    pub const TEXT_MAX_CHARS: usize = 2000;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserRequest {
        pub uuid: Uuid,
        pub user_name: String,
    }

    impl UserRequest {
        pub fn new(uuid: Uuid, user_name: impl Into<String>) -> Self {
            Self {
                uuid,
                user_name: user_name.into(),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct NewsRequest {
        pub title: String,
        pub text: String,
        pub user: UserRequest,
    }

    impl NewsRequest {
        pub fn new(title: impl Into<String>, text: impl Into<String>, user: UserRequest) -> Self {
            Self {
                title: title.into(),
                text: text.into(),
                user,
            }
        }

        /// Field checks applied by callers before a request reaches the service
        pub fn validate(&self) -> Result<()> {
            check_length("title", &self.title, TITLE_MAX_CHARS)?;
            check_length("text", &self.text, TEXT_MAX_CHARS)?;
            if self.user.user_name.trim().is_empty() {
                return Err(Error::Validation("user_name must not be blank".to_string()));
            }
            Ok(())
        }
    }

    fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
        if value.trim().is_empty() {
            return Err(Error::Validation(format!("{} must not be blank", field)));
        }
        let chars = value.chars().count();
        if chars > max {
            return Err(Error::Validation(format!(
                "{} must be at most {} characters, got {}",
                field, max, chars
            )));
        }
        Ok(())
    }

    /// 1-based page selector for listings. Only built through [`PageRequest::new`],
    /// so both fields are at least 1.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    pub struct PageRequest {
        page_size: usize,
        page_number: usize,
    }

    impl PageRequest {
        pub fn new(page_size: usize, page_number: usize) -> Result<Self> {
            if page_size == 0 || page_number == 0 {
                return Err(Error::Validation(
                    "page_size and page_number must be at least 1".to_string(),
                ));
            }
            Ok(Self {
                page_size,
                page_number,
            })
        }

        pub fn page_size(&self) -> usize {
            self.page_size
        }

        pub fn page_number(&self) -> usize {
            self.page_number
        }

        /// Items to skip; saturates so far-off pages come back empty
        pub fn offset(&self) -> usize {
            (self.page_number - 1).saturating_mul(self.page_size)
        }
    }
}

pub mod response {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserResponse {
        pub uuid: Uuid,
        pub user_name: String,
    }

    /// Snapshot of a piece of news as handed to callers and stored in the cache
    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct NewsResponse {
        pub id: NewsId,
        pub time: DateTime<Utc>,
        pub title: String,
        pub text: String,
        pub user: UserResponse,
    }

    impl NewsResponse {
        pub fn cache_key(&self) -> NewsId {
            self.id
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Page<T> {
        pub page_number: usize,
        pub count_page: usize,
        pub content: Vec<T>,
    }

    impl<T> Page<T> {
        pub fn new(request: PageRequest, total: usize, content: Vec<T>) -> Self {
            Self {
                page_number: request.page_number(),
                count_page: total.div_ceil(request.page_size()),
                content,
            }
        }
    }
}

/// Stored author, one per uuid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: Uuid,
    pub user_name: String,
}

impl User {
    pub fn from_request(request: &UserRequest) -> Self {
        Self {
            uuid: request.uuid,
            user_name: request.user_name.clone(),
        }
    }

    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            uuid: self.uuid,
            user_name: self.user_name.clone(),
        }
    }
}

/// Persistent shape of a piece of news
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub id: NewsId,
    pub time: DateTime<Utc>,
    pub title: String,
    pub text: String,
    pub user: UserResponse,
    pub archived: bool,
}

impl News {
    /// New, not yet persisted news by `author`. The repository assigns the id.
    pub fn from_request(request: &NewsRequest, author: &User) -> Self {
        Self {
            id: NewsId(0),
            time: Utc::now(),
            title: request.title.clone(),
            text: request.text.clone(),
            user: author.to_response(),
            archived: false,
        }
    }

    /// Title and text are replaced; the author is fixed at creation
    pub fn merge(&mut self, request: &NewsRequest) {
        self.title = request.title.clone();
        self.text = request.text.clone();
    }

    pub fn to_response(&self) -> NewsResponse {
        NewsResponse {
            id: self.id,
            time: self.time,
            title: self.title.clone(),
            text: self.text.clone(),
            user: self.user.clone(),
        }
    }
}
