//! HTTP transport against the Notion API. Every call runs under the retry
//! policy; pagination is driven here so callers always see complete result
//! sets.

use serde::de::DeserializeOwned;

use crate::error::{Result, SyncError};
use crate::notion::models::{
    Block, BlockChildrenResponse, CreatePageRequest, CreatedPage, Page, QueryDatabaseRequest,
    QueryDatabaseResponse, UpdatePageRequest,
};
use crate::retry::RetryPolicy;

const NOTION_API_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Destination page size for cursor pagination.
const QUERY_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct NotionClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
    retry: RetryPolicy,
}

impl NotionClient {
    pub fn new(token: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            base_url: NOTION_API_URL.into(),
            retry,
        }
    }

    /// Point the client at a different endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    /// Creates a page and returns its id.
    pub async fn create_page(&self, request: &CreatePageRequest) -> Result<CreatedPage> {
        self.retry
            .run(|| async {
                let response = self
                    .client
                    .post(format!("{}/pages", self.base_url))
                    .bearer_auth(&self.token)
                    .header("Notion-Version", NOTION_VERSION)
                    .json(request)
                    .send()
                    .await?;
                Self::parse(response).await
            })
            .await
    }

    /// Patches an existing page's properties in place.
    pub async fn update_page(&self, page_id: &str, request: &UpdatePageRequest) -> Result<()> {
        self.retry
            .run(|| async {
                let response = self
                    .client
                    .patch(format!("{}/pages/{}", self.base_url, page_id))
                    .bearer_auth(&self.token)
                    .header("Notion-Version", NOTION_VERSION)
                    .json(request)
                    .send()
                    .await?;
                Self::parse::<serde_json::Value>(response).await.map(|_| ())
            })
            .await
    }

    /// One query page against a database.
    pub async fn query_database(
        &self,
        database_id: &str,
        request: &QueryDatabaseRequest,
    ) -> Result<QueryDatabaseResponse> {
        self.retry
            .run(|| async {
                let response = self
                    .client
                    .post(format!("{}/databases/{}/query", self.base_url, database_id))
                    .bearer_auth(&self.token)
                    .header("Notion-Version", NOTION_VERSION)
                    .json(request)
                    .send()
                    .await?;
                Self::parse(response).await
            })
            .await
    }

    /// Fetches every page of a database, following the cursor until the
    /// server reports no more results.
    pub async fn query_all(&self, database_id: &str) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let request = QueryDatabaseRequest {
                filter: None,
                start_cursor: cursor.clone(),
                page_size: Some(QUERY_PAGE_SIZE),
            };
            let response = self.query_database(database_id, &request).await?;
            pages.extend(response.results);
            if !response.has_more {
                break;
            }
            cursor = response.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        Ok(pages)
    }

    /// Lists all child blocks of a page or block, following the cursor.
    pub async fn list_children(&self, block_id: &str) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let response: BlockChildrenResponse = self
                .retry
                .run(|| async {
                    let mut request = self
                        .client
                        .get(format!("{}/blocks/{}/children", self.base_url, block_id))
                        .bearer_auth(&self.token)
                        .header("Notion-Version", NOTION_VERSION)
                        .query(&[("page_size", QUERY_PAGE_SIZE.to_string())]);
                    if let Some(cursor) = &cursor {
                        request = request.query(&[("start_cursor", cursor.as_str())]);
                    }
                    Self::parse(request.send().await?).await
                })
                .await?;
            blocks.extend(response.results);
            if !response.has_more {
                break;
            }
            cursor = response.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        Ok(blocks)
    }
}
