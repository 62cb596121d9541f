//! spacetraveling: a blog front end for a headless CMS
//!
//! Posts live in a Prismic-style content repository. The crate pages
//! through post summaries, estimates reading time, and renders the listing
//! and post pages either into static files or on request from a local
//! server.

pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod paginator;
pub mod server;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cms::HttpContentSource;

/// A blog site rooted at a directory
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied into the output
    pub static_dir: PathBuf,
}

impl Site {
    /// Create a site from a directory, reading `_config.yml` when present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            let mut config = config::SiteConfig::default();
            config.apply_env();
            config
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a site from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        }
    }

    /// Directory with language files overriding the built-in strings
    pub fn languages_dir(&self) -> PathBuf {
        self.base_dir.join("languages")
    }

    /// HTTP client for the configured CMS
    pub fn content_source(&self) -> Result<HttpContentSource> {
        HttpContentSource::new(&self.config.cms)
            .with_context(|| format!("Invalid CMS endpoint {:?}", self.config.cms.api_endpoint))
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
