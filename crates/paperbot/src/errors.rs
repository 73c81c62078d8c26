//! Error types for the paperbot library.
//!
//! Every failure raised while resolving a link is a [`PaperbotError`]. Callers that only
//! need to decide what to tell a user should match on [`PaperbotError::kind`], which folds
//! the variants into the handful of outcomes that matter at the boundary:
//! - the link is not one we understand
//! - the upstream site could not be reached
//! - the upstream page no longer looks like we expect
//! - something went wrong locally (store, filesystem, configuration)
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use paperbot::{
//!   cache::MemoryCache, errors::ErrorKind, fetch::HttpFetcher, resolver::Resolver,
//! };
//!
//! # async fn example() {
//! let resolver = Resolver::new(Arc::new(MemoryCache::new()), Arc::new(HttpFetcher::new()));
//! match resolver.resolve("https://example.com/paper").await {
//!   Ok(paper) => println!("{}", paper.title()),
//!   Err(e) if e.kind() == ErrorKind::UnsupportedUrl => println!("Unsupported link"),
//!   Err(e) => println!("Failed: {e}"),
//! }
//! # }
//! ```

use thiserror::Error;

/// Errors that can occur while routing, fetching, parsing or storing papers.
#[derive(Error, Debug)]
pub enum PaperbotError {
  /// The URL matches none of the supported site grammars.
  ///
  /// Raised by the router before any cache or network access, and by the per-site
  /// normalizers when the path does not have the expected shape.
  #[error("Unsupported URL: {0}")]
  UnsupportedUrl(String),

  /// A canonical paper identifier could not be split back into its parts.
  ///
  /// CVF identifiers must be exactly `context/name`; anything else cannot be turned
  /// back into an abstract or PDF URL.
  #[error("Malformed paper identifier: {0}")]
  MalformedPaperId(String),

  /// The upstream site answered with a non-success status.
  #[error("{url} returned HTTP {status}")]
  UpstreamUnavailable {
    /// The URL that was requested
    url:    String,
    /// The HTTP status code received
    status: u16,
  },

  /// The page was fetched but an expected structural element is missing.
  ///
  /// This usually means the site changed its markup and the extractor needs
  /// maintenance, or the page was removed and replaced by a placeholder.
  #[error("Extraction failed: {0}")]
  Extraction(String),

  /// A stored source name doesn't match any known [`Source`](crate::Source).
  #[error("Invalid source type, see `paperbot::paper::Source`")]
  InvalidSource(String),

  /// The configuration file could not be interpreted.
  #[error("Configuration error: {0}")]
  Config(String),

  /// A network request failed before a status was received.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A stored document could not be (de)serialized.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A SQLite operation failed.
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// An async SQLite operation failed.
  #[error(transparent)]
  AsyncSqlite(#[from] tokio_rusqlite::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),
}

/// Caller-facing classification of a [`PaperbotError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The link is not supported, or its canonical identifier is malformed. Terminal.
  UnsupportedUrl,
  /// The site could not be reached or answered with an error status. The user may retry.
  UpstreamUnavailable,
  /// The site answered but its markup could not be parsed.
  Extraction,
  /// Local failure: store, filesystem or configuration.
  Internal,
}

impl PaperbotError {
  /// Classifies this error into one of the caller-facing [`ErrorKind`]s.
  pub fn kind(&self) -> ErrorKind {
    match self {
      PaperbotError::UnsupportedUrl(_) | PaperbotError::MalformedPaperId(_) =>
        ErrorKind::UnsupportedUrl,
      PaperbotError::UpstreamUnavailable { .. } | PaperbotError::Network(_) =>
        ErrorKind::UpstreamUnavailable,
      PaperbotError::Extraction(_) => ErrorKind::Extraction,
      PaperbotError::InvalidSource(_)
      | PaperbotError::Config(_)
      | PaperbotError::Json(_)
      | PaperbotError::Sqlite(_)
      | PaperbotError::AsyncSqlite(_)
      | PaperbotError::Path(_) => ErrorKind::Internal,
    }
  }

  /// Checks if this error was raised because the store already holds the row.
  ///
  /// The paper cache never surfaces this (its conditional write reports `false`
  /// instead), but user creation goes through a plain insert.
  pub fn is_duplicate_error(&self) -> bool {
    matches!(
        self,
        PaperbotError::AsyncSqlite(tokio_rusqlite::Error::Rusqlite(
            rusqlite::Error::SqliteFailure(error, _)
        )) if error.code == rusqlite::ErrorCode::ConstraintViolation
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kind_folds_malformed_id_into_unsupported() {
    assert_eq!(PaperbotError::MalformedPaperId("a/b/c".into()).kind(), ErrorKind::UnsupportedUrl);
    assert_eq!(PaperbotError::UnsupportedUrl("x".into()).kind(), ErrorKind::UnsupportedUrl);
  }

  #[test]
  fn test_kind_separates_upstream_from_extraction() {
    let upstream = PaperbotError::UpstreamUnavailable { url: "u".into(), status: 503 };
    assert_eq!(upstream.kind(), ErrorKind::UpstreamUnavailable);
    assert_eq!(upstream.to_string(), "u returned HTTP 503");
    assert_eq!(PaperbotError::Extraction("no title".into()).kind(), ErrorKind::Extraction);
  }
}
