pub mod weaviate;
use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use std::fmt;
use std::str::FromStr;
use log::warn;

use crate::error::{ BrowserError, Result };

/// Number of objects fetched when the caller does not ask for a limit.
pub const DEFAULT_OBJECT_LIMIT: usize = 100;

/// Operations the presentation layer needs from a connected database.
#[async_trait]
pub trait CollectionBrowser: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn get_objects(
        &self,
        collection_name: &str,
        limit: usize
    ) -> Result<Vec<DatabaseObject>>;

    async fn get_collection_schema(&self, collection_name: &str) -> Result<Value>;

    async fn delete_collection(&self, collection_name: &str) -> Result<bool>;
}

/// One record of a collection. `properties` only holds user-defined fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseObject {
    pub id: String,
    pub class: String,
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time_unix: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time_unix: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("http"),
            Scheme::Https => f.write_str("https"),
        }
    }
}

impl FromStr for Scheme {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self> {
        get_scheme(s)
    }
}

pub fn get_scheme(scheme_str: &str) -> Result<Scheme> {
    match scheme_str.trim().to_lowercase().as_str() {
        "http" => Ok(Scheme::Http),
        "https" => Ok(Scheme::Https),
        _ => Err(BrowserError::InvalidConfig(format!("Unsupported scheme: {}", scheme_str))),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub scheme: Scheme,
    pub host: String,
    #[serde(default, alias = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl ConnectionConfig {
    pub fn new(scheme: Scheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Builds a config from an endpoint such as `https://cluster.example.net:443/v1`.
    /// A missing scheme means plain `http`.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) => (get_scheme(scheme)?, rest),
            None => (Scheme::Http, url),
        };
        let host = rest.trim_end_matches('/');
        let host = host.strip_suffix("/v1").unwrap_or(host).trim_end_matches('/');
        if host.is_empty() {
            return Err(BrowserError::InvalidConfig(format!("No host in '{}'", url)));
        }
        Ok(Self::new(scheme, host))
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}/v1", self.scheme, self.host.trim().trim_end_matches('/'))
    }

    /// The API key, if one was supplied and is not blank.
    pub fn bearer_token(&self) -> Option<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Some(key),
            Some(_) => {
                warn!("Weaviate API key provided but empty; connecting without authorization.");
                None
            }
            None => None,
        }
    }
}
