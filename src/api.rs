use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::BatchResponse;

pub const DEFAULT_ENDPOINT: &str = "https://api.x.com/2/tweets";

// Text, creation time and attachment keys on the post; URLs and variants on its media.
const TWEET_FIELDS: &str = "attachments,id,text,created_at";
const EXPANSIONS: &str = "attachments.media_keys";
const MEDIA_FIELDS: &str = "url,variants,preview_image_url";

/// Looks up one batch of posts by id.
#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn lookup(&self, ids: &[String]) -> Result<BatchResponse, FetchError>;
}

/// Client for the X API v2 multi-post lookup endpoint.
pub struct XApiClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl XApiClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tweet-harvest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint: endpoint.into(), token: token.into() })
    }
}

pub(crate) fn lookup_query(ids: &[String]) -> [(&'static str, String); 4] {
    [
        ("ids", ids.join(",")),
        ("tweet.fields", TWEET_FIELDS.to_string()),
        ("expansions", EXPANSIONS.to_string()),
        ("media.fields", MEDIA_FIELDS.to_string()),
    ]
}

#[async_trait]
impl PostsApi for XApiClient {
    async fn lookup(&self, ids: &[String]) -> Result<BatchResponse, FetchError> {
        tracing::debug!(endpoint = %self.endpoint, count = ids.len(), "looking up posts");
        let resp = self
            .client
            .get(&self.endpoint)
            .bearer_auth(&self.token)
            .query(&lookup_query(ids))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Api { status: status.as_u16(), message: body });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
