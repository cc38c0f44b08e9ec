use async_trait::async_trait;
use notirelay_core::error::EngineError;
use notirelay_core::schema::{RawDatabase, SchemaSource};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.notion.com/";
pub const NOTION_VERSION: &str = "2022-06-28";

const OBJECT_NOT_FOUND: &str = "object_not_found";

/// Error body returned by the Notion API.
#[derive(Deserialize, Default)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Reads database schemas from the Notion REST API.
pub struct NotionClient {
    client: reqwest::Client,
    base_url: Url,
}

impl NotionClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn database_url(&self, database_id: &str) -> Result<Url, EngineError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::Configuration(format!("bad Notion API url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v1", "databases", database_id]);
        Ok(url)
    }
}

#[async_trait]
impl SchemaSource for NotionClient {
    async fn fetch_schema(
        &self,
        database_id: &str,
        token: &str,
    ) -> Result<Option<RawDatabase>, EngineError> {
        let url = self.database_url(database_id)?;
        debug!(database_id, "Fetching database schema from Notion");

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .map_err(|e| EngineError::TransientExternal(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let database = response
                .json::<RawDatabase>()
                .await
                .map_err(|e| EngineError::Internal(e.into()))?;
            return Ok(Some(database));
        }

        let error = response.json::<ApiError>().await.unwrap_or_default();
        warn!(
            database_id,
            status = status.as_u16(),
            code = %error.code,
            message = %error.message,
            "Notion API request failed"
        );

        if status == StatusCode::NOT_FOUND || error.code == OBJECT_NOT_FOUND {
            return Ok(None);
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EngineError::Access(format!(
                "Notion rejected the integration token: {}",
                error.code
            ))),
            _ => Err(EngineError::TransientExternal(format!(
                "Notion API returned {status}: {}",
                error.message
            ))),
        }
    }
}
