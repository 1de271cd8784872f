//! Configuration module for the CRM sync client.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

use crate::models::Settings;

const DEFAULT_REMOTE_URL: &str = "./data/crm.sqlite";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote backend location; for the bundled backend a SQLite path
    pub remote_url: String,
    /// Public key for the remote backend
    pub remote_key: Option<String>,
    /// Key for the AI drafting service. Only drafting is disabled without it.
    pub ai_api_key: Option<String>,
    /// Company name seeded into the default settings
    pub company_name: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Sign-in credentials for the command line client
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let remote_url =
            env::var("CRM_REMOTE_URL").unwrap_or_else(|_| DEFAULT_REMOTE_URL.to_string());

        let log_level = env::var("CRM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            remote_url,
            remote_key: non_empty("CRM_REMOTE_KEY"),
            ai_api_key: non_empty("CRM_AI_API_KEY"),
            company_name: non_empty("CRM_COMPANY_NAME"),
            log_level,
            email: non_empty("CRM_EMAIL"),
            password: non_empty("CRM_PASSWORD"),
        }
    }

    /// Database file behind `remote_url`, with any `sqlite:` scheme stripped.
    pub fn db_path(&self) -> PathBuf {
        let path = self
            .remote_url
            .strip_prefix("sqlite://")
            .or_else(|| self.remote_url.strip_prefix("sqlite:"))
            .unwrap_or(&self.remote_url);
        PathBuf::from(path)
    }

    pub fn drafting_enabled(&self) -> bool {
        self.ai_api_key.is_some()
    }

    /// Initial settings, with the configured company name if there is one.
    pub fn settings(&self) -> Settings {
        match &self.company_name {
            Some(name) => Settings::default().with_company_name(name.clone()),
            None => Settings::default(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
