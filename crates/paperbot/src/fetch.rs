//! HTTP fetch capability consumed by the site extractors.
//!
//! The resolver never talks to `reqwest` directly; it goes through a [`Fetcher`], so that
//! tests can substitute canned pages and count how many requests were made.

use super::*;

/// Default `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("paperbot/", env!("CARGO_PKG_VERSION"));

/// The parts of an HTTP response the extractors care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
  /// HTTP status code
  pub status: u16,
  /// Raw body text
  pub body:   String,
}

impl FetchResponse {
  /// Whether the status is in the 2xx range.
  pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// A single GET request returning status and body.
///
/// No timeout or retry is applied here; callers that need a deadline wrap the whole
/// resolution in one.
#[async_trait]
pub trait Fetcher: Send + Sync {
  /// Fetches `url` and returns its status and body text.
  async fn get(&self, url: &str) -> Result<FetchResponse, PaperbotError>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  /// Internal web client, reused for every request.
  client: reqwest::Client,
}

impl HttpFetcher {
  /// Creates a fetcher using [`DEFAULT_USER_AGENT`].
  pub fn new() -> Self { Self::with_user_agent(DEFAULT_USER_AGENT) }

  /// Creates a fetcher that identifies itself with `user_agent`.
  ///
  /// Falls back to a default client if the builder rejects the configuration.
  pub fn with_user_agent(user_agent: &str) -> Self {
    let client = reqwest::Client::builder().user_agent(user_agent).build().unwrap_or_else(|e| {
      warn!("Failed to build HTTP client with user agent {user_agent:?}: {e}");
      reqwest::Client::new()
    });
    Self { client }
  }
}

impl Default for HttpFetcher {
  fn default() -> Self { Self::new() }
}

#[async_trait]
impl Fetcher for HttpFetcher {
  async fn get(&self, url: &str) -> Result<FetchResponse, PaperbotError> {
    debug!("GET {url}");
    let response = self.client.get(url).send().await?;
    let status = response.status().as_u16();
    trace!("{url} responded with {status}");
    let body = response.text().await?;
    Ok(FetchResponse { status, body })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_is_success() {
    let ok = FetchResponse { status: 200, body: String::new() };
    let moved = FetchResponse { status: 301, body: String::new() };
    let missing = FetchResponse { status: 404, body: String::new() };
    assert!(ok.is_success());
    assert!(!moved.is_success());
    assert!(!missing.is_success());
  }

  #[ignore = "requires network access"]
  #[traced_test]
  #[tokio::test]
  async fn test_http_fetcher_reaches_arxiv() -> anyhow::Result<()> {
    let response = HttpFetcher::new().get("https://arxiv.org/abs/1405.4053").await?;
    assert!(response.is_success());
    assert!(response.body.contains("Distributed Representations"));
    Ok(())
  }
}
