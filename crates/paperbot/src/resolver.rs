//! Cache-first resolution of paper links.
//!
//! A call to [`Resolver::resolve`] moves through these steps:
//!
//! ```text
//! ROUTING -> CACHE_LOOKUP -> hit:  DONE
//!                         -> miss: EXTRACTING -> CACHE_WRITE -> DONE
//! ```
//!
//! Any step may fail, which ends the call with that step's error. Nothing is retried and
//! no partially filled record is ever returned; retry policy belongs to the caller.
//!
//! Concurrent calls for the same uncached paper may both scrape it. The cache's
//! conditional write lets only the first record in, and the losers return the stored
//! record instead of their own copy.

use super::*;

/// Resolves links into [`PaperRecord`]s through a cache and a fetcher.
#[derive(Clone)]
pub struct Resolver {
  /// Record cache consulted before any network access
  cache:   Arc<dyn PaperCache>,
  /// HTTP capability used by the site extractors
  fetcher: Arc<dyn Fetcher>,
}

impl Resolver {
  /// Creates a resolver over the given cache and fetcher.
  pub fn new(cache: Arc<dyn PaperCache>, fetcher: Arc<dyn Fetcher>) -> Self {
    Self { cache, fetcher }
  }

  /// Routes and normalizes `url` without touching the cache or the network.
  pub fn locate(url: &str) -> Result<PaperLocation, PaperbotError> { route(url)?.normalize(url) }

  /// Resolves `url` into a paper record, scraping the site only on a cache miss.
  ///
  /// # Errors
  ///
  /// - [`PaperbotError::UnsupportedUrl`] / [`PaperbotError::MalformedPaperId`] before any I/O
  /// - [`PaperbotError::UpstreamUnavailable`] or [`PaperbotError::Network`] if the site
  ///   cannot be reached
  /// - [`PaperbotError::Extraction`] if the page cannot be parsed
  /// - store errors from the cache
  pub async fn resolve(&self, url: &str) -> Result<PaperRecord, PaperbotError> {
    let location = Self::locate(url)?;

    if let Some(paper) = self.cache.get(&location.paper_id).await? {
      debug!("Paper {} found in cache", location.paper_id);
      return Ok(paper);
    }
    debug!("Paper {} not found in cache, start scraping", location.paper_id);

    let paper = self.scrape(location).await?;
    if self.cache.put(&paper, false).await? {
      return Ok(paper);
    }

    // Lost a race with another writer; the stored record is authoritative.
    debug!("Paper {} was cached concurrently, keeping stored record", paper.paper_id());
    Ok(self.cache.get(paper.paper_id()).await?.unwrap_or(paper))
  }

  /// Re-scrapes `url` and replaces whatever record is cached under its identifier.
  pub async fn refresh(&self, url: &str) -> Result<PaperRecord, PaperbotError> {
    let location = Self::locate(url)?;
    let paper = self.scrape(location).await?;
    self.cache.put(&paper, true).await?;
    debug!("Paper {} refreshed", paper.paper_id());
    Ok(paper)
  }

  /// Extracts the abstract page for `location` and assembles a record.
  async fn scrape(&self, location: PaperLocation) -> Result<PaperRecord, PaperbotError> {
    let site = location.source.site();
    let fields = site.extract(self.fetcher.as_ref(), &location.abstract_url).await?;
    Ok(PaperRecord::new(location, fields))
  }
}
