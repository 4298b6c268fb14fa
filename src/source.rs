//! Where random articles come from.

use crate::web::PickError;
use axum::body::Bytes;
use reqwest::Client;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Language code → "random article" URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    urls: BTreeMap<String, String>,
}

impl Default for SourceTable {
    fn default() -> Self {
        Self::wikipedia()
    }
}

impl SourceTable {
    pub fn empty() -> Self {
        Self {
            urls: BTreeMap::new(),
        }
    }

    /// The English, French and German Wikipedia random-page endpoints.
    pub fn wikipedia() -> Self {
        Self::empty()
            .with_source("en", "https://en.wikipedia.org/wiki/Special:Random")
            .with_source(
                "fr",
                "https://fr.wikipedia.org/wiki/Sp%C3%A9cial:Page_au_hasard",
            )
            .with_source(
                "de",
                "https://de.wikipedia.org/wiki/Spezial:Zuf%C3%A4llige_Seite",
            )
    }

    pub fn with_source(mut self, language: impl Into<String>, url: impl Into<String>) -> Self {
        self.urls.insert(language.into(), url.into());
        self
    }

    pub fn url(&self, language: &str) -> Option<&str> {
        self.urls.get(language).map(String::as_str)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.urls.keys().map(String::as_str)
    }
}

/// A `code=url` pair as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOverride {
    pub language: String,
    pub url: String,
}

impl FromStr for SourceOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (language, url) = s
            .split_once('=')
            .ok_or_else(|| format!("expected CODE=URL, got {s:?}"))?;
        let language = language.trim();
        let url = url.trim();
        if language.is_empty() || url.is_empty() {
            return Err(format!("expected CODE=URL, got {s:?}"));
        }
        Ok(Self {
            language: language.to_string(),
            url: url.to_string(),
        })
    }
}

/// Downloads a random article for a language.
///
/// There is no timeout or retry: a request waits until the upstream answers or
/// the connection fails.
#[derive(Clone)]
pub struct ArticleFetcher {
    client: Client,
    sources: SourceTable,
}

impl ArticleFetcher {
    pub fn new(sources: SourceTable) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, sources))
    }

    pub fn with_client(client: Client, sources: SourceTable) -> Self {
        Self { client, sources }
    }

    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    /// Fetches the raw article body. Redirects are followed.
    pub async fn fetch(&self, language: &str) -> Result<Bytes, PickError> {
        let url = self
            .sources
            .url(language)
            .ok_or_else(|| PickError::UnknownSource(language.to_string()))?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(language, %status, url, "article source returned non-success status");
        }
        debug!(language, final_url = %response.url(), "fetched random article");
        Ok(response.bytes().await?)
    }
}
