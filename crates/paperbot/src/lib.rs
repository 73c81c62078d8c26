//! Resolve academic paper links from arXiv, CVF Open Access and OpenReview into
//! normalized [`PaperRecord`]s.
//!
//! Resolution is cache-first: a URL is routed to the [`Site`](clients::Site) that
//! understands it, normalized into a canonical paper identifier, and looked up in a
//! [`PaperCache`](cache::PaperCache). Only on a miss is the abstract page fetched and
//! scraped, after which the record is written back to the cache.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use paperbot::{database::Database, fetch::HttpFetcher, resolver::Resolver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let db = Database::open(Database::default_path()).await?;
//!   let resolver = Resolver::new(Arc::new(db), Arc::new(HttpFetcher::new()));
//!
//!   let paper = resolver.resolve("https://arxiv.org/abs/1405.4053").await?;
//!   println!("Title: {}", paper.title());
//!
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  path::{Path, PathBuf},
  str::FromStr,
  sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod cache;
pub mod clients;
pub mod config;
pub mod database;
pub mod errors;
pub mod fetch;
pub mod format;
pub mod paper;
pub mod resolver;
#[cfg(test)] mod tests;

use cache::PaperCache;
use clients::{route, ExtractedFields, Site};
use errors::PaperbotError;
use fetch::Fetcher;
pub use paper::{PaperLocation, PaperRecord, Source};
