//! Client configuration.
//!
//! A `ClientConfig` can be built in code, deserialized from any serde format,
//! or read from the environment:
//!
//! - `INBOX_API_KEY` (required)
//! - `INBOX_API_URL` (defaults to [`DEFAULT_API_URL`])
//! - `INBOX_GRANT_ID` (optional; scopes every resource path to one grant)

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.inbox.example.com/v3";

pub const API_KEY_VAR: &str = "INBOX_API_KEY";
pub const API_URL_VAR: &str = "INBOX_API_URL";
pub const GRANT_ID_VAR: &str = "INBOX_GRANT_ID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub grant_id: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: default_api_url(),
            grant_id: None,
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_grant_id(mut self, grant_id: impl Into<String>) -> Self {
        self.grant_id = Some(grant_id.into());
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = get(API_KEY_VAR)
            .ok_or_else(|| Error::Config(format!("{API_KEY_VAR} is not set")))?;
        let mut config = Self::new(api_key);
        if let Some(url) = get(API_URL_VAR) {
            config = config.with_api_url(&url);
        }
        if let Some(grant_id) = get(GRANT_ID_VAR) {
            config = config.with_grant_id(grant_id);
        }
        Ok(config)
    }
}
