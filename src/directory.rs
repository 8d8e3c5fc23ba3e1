//! User directory collaborator.
//!
//! Session creation enrols every student known to the Pan-Bagnat user
//! directory. The handlers see only the [`UserDirectory`] trait;
//! [`HttpUserDirectory`] talks to the real API:
//!
//! ```text
//! GET {base}/api/v1/admin/users?limit=200[&next_page_token=...]
//! Authorization: <forwarded>
//! Accept: application/json
//!
//! { "users": [{"id": "...", "ft_login": "..."}], "next_page_token": "..." }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use http::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::DirectoryError;

/// Page size requested from the directory.
pub const USERS_PAGE_SIZE: u32 = 200;

/// Timeout for each directory request.
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(15);

/// A directory user; only the fields the backend uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub ft_login: String,
}

#[derive(Debug, Deserialize)]
struct ListUsersResponse {
    #[serde(default)]
    users: Vec<DirectoryUser>,

    #[serde(default)]
    next_page_token: Option<String>,
}

/// Source of the student population.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Every user visible to `authorization`, following pagination. Users
    /// without a login are skipped.
    async fn list_all_users(&self, authorization: &str)
        -> Result<Vec<DirectoryUser>, DirectoryError>;
}

/// HTTP client for the Pan-Bagnat users API.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUserDirectory {
    /// Create a client for `base_url` (e.g. `https://pan-bagnat.local`).
    pub fn new(base_url: &str) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(DIRECTORY_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Whether a base URL is configured.
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn users_endpoint(&self, page_token: Option<&str>) -> Result<Url, DirectoryError> {
        let mut url = Url::parse(&format!("{}/api/v1/admin/users", self.base_url))
            .map_err(|e| DirectoryError::InvalidUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &USERS_PAGE_SIZE.to_string());
            if let Some(token) = page_token {
                query.append_pair("next_page_token", token);
            }
        }

        Ok(url)
    }

    async fn fetch_page(
        &self,
        authorization: &str,
        page_token: Option<&str>,
    ) -> Result<ListUsersResponse, DirectoryError> {
        let url = self.users_endpoint(page_token)?;
        debug!(url = %url, "Fetching directory users");

        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if !authorization.is_empty() {
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(DirectoryError::Status(response.status().to_string()));
        }

        response
            .json::<ListUsersResponse>()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn list_all_users(
        &self,
        authorization: &str,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        if !self.is_configured() {
            return Err(DirectoryError::NotConfigured);
        }

        let mut users = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(authorization, page_token.as_deref()).await?;
            users.extend(page.users.into_iter().filter(|u| !u.ft_login.is_empty()));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = users.len(), "Fetched directory users");
        Ok(users)
    }
}
