//! Cover lookup over HTTP via `ureq`.
//!
//! The cover API is queried with `?book_title=..&author_name=..` and answers
//! `{"url": "..."}`; the image is then downloaded from that URL.

use std::io::Read;
use std::time::Duration;

use serde::Deserialize;

use super::CoverLookup;
use crate::config::CatalogConfig;
use crate::error::{CoverError, CoverResult};

#[derive(Debug, Deserialize)]
struct CoverReply {
    #[serde(default)]
    url: Option<String>,
}

/// Build the cover API query URL. An empty author is sent as a single space.
pub fn lookup_url(api_url: &str, title: &str, author: &str) -> String {
    let author = if author.is_empty() { " " } else { author };
    let separator = if api_url.contains('?') { '&' } else { '?' };
    format!(
        "{api_url}{separator}book_title={}&author_name={}",
        urlencoding::encode(title),
        urlencoding::encode(author)
    )
}

/// [`CoverLookup`] backed by the external cover API.
#[derive(Debug, Clone)]
pub struct HttpCoverLookup {
    agent: ureq::Agent,
    api_url: String,
    max_bytes: u64,
}

impl HttpCoverLookup {
    pub fn new(api_url: impl Into<String>, timeout: Duration, max_bytes: u64) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            api_url: api_url.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(
            config.cover_api_url.clone(),
            Duration::from_secs(config.cover_timeout_secs),
            config.cover_max_bytes,
        )
    }

    fn resolve_image_url(&self, title: &str, author: &str) -> CoverResult<String> {
        let url = lookup_url(&self.api_url, title, author);
        let not_found = || CoverError::NotFound {
            title: title.to_string(),
            author: author.to_string(),
        };

        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            // The cover API answers a miss with an error status.
            Err(ureq::Error::Status(code, _)) if code == 404 || code >= 500 => {
                tracing::debug!(%url, code, "cover API reported no match");
                return Err(not_found());
            }
            Err(e) => {
                return Err(CoverError::Request {
                    url,
                    message: e.to_string(),
                });
            }
        };

        let reply: CoverReply = response.into_json().map_err(|e| CoverError::Parse {
            message: e.to_string(),
        })?;
        match reply.url.map(|u| u.trim().to_string()) {
            Some(image_url) if !image_url.is_empty() => Ok(image_url),
            _ => Err(not_found()),
        }
    }

    fn download(&self, url: &str) -> CoverResult<Vec<u8>> {
        let response = self.agent.get(url).call().map_err(|e| CoverError::Request {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let mut data = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut data)
            .map_err(|e| CoverError::Request {
                url: url.to_string(),
                message: format!("read body: {e}"),
            })?;

        if data.len() as u64 > self.max_bytes {
            return Err(CoverError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        Ok(data)
    }
}

impl CoverLookup for HttpCoverLookup {
    fn find_cover(&self, title: &str, author: &str) -> CoverResult<Vec<u8>> {
        let image_url = self.resolve_image_url(title, author)?;
        tracing::debug!(%image_url, title, "downloading cover");
        self.download(&image_url)
    }
}
