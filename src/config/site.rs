//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable that overrides `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // Date / Time format
    pub date_format: String,
    pub time_format: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Reading time
    pub words_per_minute: usize,

    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub revalidate: RevalidateConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            date_format: "DD MMM YYYY".to_string(),
            time_format: "HH:mm".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            words_per_minute: 200,

            cms: CmsConfig::default(),
            revalidate: RevalidateConfig::default(),
            comments: CommentsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        config.apply_env();
        Ok(config)
    }

    /// Pick up settings that may be supplied through the environment
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                tracing::debug!("Using CMS access token from {}", ACCESS_TOKEN_ENV);
                self.cms.access_token = Some(token);
            }
        }
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    pub api_endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "https://spacetraveling.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 2,
            timeout_secs: 30,
        }
    }
}

/// Regeneration intervals, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    pub listing_secs: u64,
    pub post_secs: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            listing_secs: 60 * 60 * 24,
            post_secs: 60 * 30,
        }
    }
}

/// Utterances comment widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub repo: Option<String>,
    pub issue_term: String,
    pub theme: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repo: None,
            issue_term: "pathname".to_string(),
            theme: "github-dark".to_string(),
        }
    }
}

impl CommentsConfig {
    pub fn enabled(&self) -> bool {
        self.repo.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}
