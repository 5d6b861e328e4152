//! Client for the private Douban mobile API.
//!
//! The interests endpoint is paginated per watch status in batches of
//! [`PAGE_SIZE`]; a batch is fetched through the [`InterestPager`] trait so
//! the accumulation loop can be exercised without a network.

use async_trait::async_trait;

use crate::config::Settings;
use crate::douban::models::{Interest, InterestsPage, WatchStatus};
use crate::error::{Result, SyncError};
use crate::retry::RetryPolicy;

/// Source batch size. Pagination stops at the first empty batch; the API
/// reports no total.
pub const PAGE_SIZE: u32 = 50;

/// The mobile API only answers requests that look like the WeChat mini
/// program it was built for.
const USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_3 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 \
    MicroMessenger/8.0.16(0x18001023) NetType/WIFI Language/zh_CN";
const REFERER: &str = "https://servicewechat.com/wx2f9b06c1de1ccfca/84/page-frame.html";

/// One page of interests for (user, status) at the given offset.
#[async_trait]
pub trait InterestPager {
    async fn page(
        &self,
        user: &str,
        status: WatchStatus,
        offset: u32,
        count: u32,
    ) -> Result<Vec<Interest>>;
}

#[derive(Debug, Clone)]
pub struct DoubanClient {
    client: reqwest::Client,
    host: String,
    api_key: String,
    auth_token: Option<String>,
    retry: RetryPolicy,
}

impl DoubanClient {
    pub fn new(settings: &Settings, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: settings.douban_host.clone(),
            api_key: settings.douban_api_key.clone(),
            auth_token: settings.douban_auth_token.clone(),
            retry,
        }
    }
}

#[async_trait]
impl InterestPager for DoubanClient {
    async fn page(
        &self,
        user: &str,
        status: WatchStatus,
        offset: u32,
        count: u32,
    ) -> Result<Vec<Interest>> {
        let url = format!("https://{}/api/v2/user/{}/interests", self.host, user);
        let page: InterestsPage = self
            .retry
            .run(|| async {
                let count_param = count.to_string();
                let start_param = offset.to_string();
                let mut request = self
                    .client
                    .get(&url)
                    .header("host", &self.host)
                    .header("user-agent", USER_AGENT)
                    .header("referer", REFERER)
                    .query(&[
                        ("type", "movie"),
                        ("count", count_param.as_str()),
                        ("status", status.code()),
                        ("start", start_param.as_str()),
                        ("apiKey", self.api_key.as_str()),
                    ]);
                if let Some(token) = &self.auth_token {
                    request = request.bearer_auth(token);
                }

                let response = request.send().await?;
                let http_status = response.status();
                if !http_status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(SyncError::Api {
                        status: http_status.as_u16(),
                        message,
                    });
                }
                Ok(response.json().await?)
            })
            .await?;
        Ok(page.interests)
    }
}

/// Fetches every interest for one watch status, advancing the offset by
/// [`PAGE_SIZE`] until the source returns an empty batch.
pub async fn fetch_all_interests<P: InterestPager + ?Sized>(
    pager: &P,
    user: &str,
    status: WatchStatus,
) -> Result<Vec<Interest>> {
    let mut interests = Vec::new();
    let mut offset = 0;
    loop {
        let batch = pager.page(user, status, offset, PAGE_SIZE).await?;
        if batch.is_empty() {
            break;
        }
        interests.extend(batch);
        offset += PAGE_SIZE;
    }
    tracing::info!(
        "Fetched {} interests with status '{}'",
        interests.len(),
        status.display()
    );
    Ok(interests)
}
