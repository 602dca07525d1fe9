use crate::error::SearchError;
use crate::models::MovieRecord;
use crate::normalize::{self, NormalizeOptions, ResponseShape};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub const RAPIDAPI_BASE: &str = "https://imdb-com.p.rapidapi.com";
pub const RAPIDAPI_HOST: &str = "imdb-com.p.rapidapi.com";
pub const OMDB_BASE: &str = "https://www.omdbapi.com";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait SearchApi: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<MovieRecord>, SearchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// IMDb search via RapidAPI; keyed by the `x-rapidapi-key` header.
    RapidApiImdb { host: String },
    /// OMDb title search; keyed by the `apikey` query parameter.
    Omdb,
}

impl Provider {
    pub fn shape(&self) -> ResponseShape {
        match self {
            Provider::RapidApiImdb { .. } => ResponseShape::MainSearch,
            Provider::Omdb => ResponseShape::Omdb,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::RapidApiImdb { .. } => RAPIDAPI_BASE,
            Provider::Omdb => OMDB_BASE,
        }
    }
}

#[derive(Clone)]
pub struct UpstreamConfig {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: String,
    pub normalize: NormalizeOptions,
    pub timeout: Duration,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("normalize", &self.normalize)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, SearchError> {
        let user_agent = format!("watchdiary/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    /// Raw upstream payload for `query`, before normalization.
    pub async fn fetch_raw(&self, query: &str) -> Result<Value, SearchError> {
        let base = self.config.base_url.trim_end_matches('/');
        let encoded = urlencoding::encode(query);
        let request = match &self.config.provider {
            Provider::RapidApiImdb { host } => self
                .client
                .get(format!("{base}/search?searchTerm={encoded}"))
                .header("x-rapidapi-host", host.as_str())
                .header("x-rapidapi-key", self.config.api_key.as_str()),
            Provider::Omdb => self.client.get(format!(
                "{base}/?s={encoded}&apikey={}",
                urlencoding::encode(&self.config.api_key)
            )),
        };

        let res = request.send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(SearchError::Status { status, body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl SearchApi for UpstreamClient {
    async fn search(&self, query: &str) -> Result<Vec<MovieRecord>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let raw = self.fetch_raw(query).await?;
        debug!(query = %query, payload = %raw, "Upstream search response");
        let records = normalize::normalize(self.config.provider.shape(), &raw, self.config.normalize);
        if records.is_empty() {
            info!("No movies found for '{}'", query);
        } else {
            info!("Search '{}' returned {} movies", query, records.len());
        }
        Ok(records)
    }
}
