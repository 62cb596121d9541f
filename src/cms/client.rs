//! HTTP content source for a Prismic-style REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::document::{ApiResponse, ApiRoot};
use super::query::Query;
use super::source::ContentSource;
use crate::config::CmsConfig;
use crate::error::CmsError;

/// Talks to the CMS over HTTP
#[derive(Clone)]
pub struct HttpContentSource {
    client: Client,
    api_endpoint: String,
    access_token: Option<String>,
}

impl HttpContentSource {
    /// Create a client from the CMS section of the site config
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let endpoint = config.api_endpoint.trim_end_matches('/');
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(CmsError::InvalidUrl(config.api_endpoint.clone()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_endpoint: endpoint.to_string(),
            access_token: config
                .access_token
                .clone()
                .filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T, CmsError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| CmsError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn query(&self, query: &Query) -> Result<ApiResponse, CmsError> {
        let reference = match query.reference {
            Some(ref r) => r.clone(),
            None => self.master_ref().await?,
        };

        let url = format!("{}/documents/search", self.api_endpoint);
        let mut params = query.to_params();
        params.push(("ref", reference));
        if let Some(ref token) = self.access_token {
            params.push(("access_token", token.clone()));
        }

        tracing::debug!("CMS search {} q={}", url, query.q());
        let request = self.client.get(&url).query(&params);
        self.send(request, &url).await
    }

    async fn fetch_page(&self, url: &str) -> Result<ApiResponse, CmsError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CmsError::InvalidUrl(url.to_string()));
        }

        tracing::debug!("CMS fetch page {}", url);
        let request = self.client.get(url);
        self.send(request, url).await
    }

    async fn master_ref(&self) -> Result<String, CmsError> {
        let mut request = self.client.get(&self.api_endpoint);
        if let Some(ref token) = self.access_token {
            request = request.query(&[("access_token", token)]);
        }

        let root: ApiRoot = self.send(request, &self.api_endpoint).await?;
        root.master_ref()
            .map(str::to_string)
            .ok_or(CmsError::MissingMasterRef)
    }
}
