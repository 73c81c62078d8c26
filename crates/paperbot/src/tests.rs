use std::{
  collections::HashMap,
  sync::atomic::{AtomicUsize, Ordering},
};

use super::*;
use crate::{cache::MemoryCache, database::Database, fetch::FetchResponse, resolver::Resolver};

const ARXIV_PAGE: &str =
  include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/arxiv_abs.html"));
const CVF_PAGE: &str =
  include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/cvf_abs.html"));
const OPENREVIEW_PAGE: &str =
  include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/openreview_forum.html"));

/// Serves canned responses by URL and counts requests.
#[derive(Default)]
struct ScriptedFetcher {
  pages:    HashMap<String, FetchResponse>,
  requests: AtomicUsize,
}

impl ScriptedFetcher {
  fn with_page(mut self, url: &str, status: u16, body: &str) -> Self {
    self.pages.insert(url.to_string(), FetchResponse { status, body: body.to_string() });
    self
  }

  fn requests(&self) -> usize { self.requests.load(Ordering::SeqCst) }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
  async fn get(&self, url: &str) -> Result<FetchResponse, PaperbotError> {
    self.requests.fetch_add(1, Ordering::SeqCst);
    Ok(
      self
        .pages
        .get(url)
        .cloned()
        .unwrap_or(FetchResponse { status: 404, body: "Not Found".to_string() }),
    )
  }
}

fn fixtures() -> ScriptedFetcher {
  ScriptedFetcher::default()
    .with_page("https://arxiv.org/abs/1405.4053", 200, ARXIV_PAGE)
    .with_page(
      "https://openaccess.thecvf.com/content_CVPR_2020/html/Wang_Dual_Super-Resolution_Learning_for_Semantic_Segmentation_CVPR_2020_paper.html",
      200,
      CVF_PAGE,
    )
    .with_page("https://openreview.net/forum?id=SklD9yrFPS", 200, OPENREVIEW_PAGE)
    .with_page("https://arxiv.org/abs/2101.05725", 503, "Service Unavailable")
    .with_page("https://arxiv.org/abs/2101.05709", 200, "<html><body>Redesigned</body></html>")
}

fn setup() -> (Resolver, Arc<MemoryCache>, Arc<ScriptedFetcher>) {
  let cache = Arc::new(MemoryCache::new());
  let fetcher = Arc::new(fixtures());
  let resolver = Resolver::new(cache.clone(), fetcher.clone());
  (resolver, cache, fetcher)
}

#[traced_test]
#[tokio::test]
async fn test_resolve_arxiv_miss_then_hit() -> anyhow::Result<()> {
  let (resolver, cache, fetcher) = setup();

  let paper = resolver.resolve("https://arxiv.org/pdf/1405.4053.pdf").await?;
  assert_eq!(paper.paper_id(), "1405.4053");
  assert_eq!(paper.source(), Source::Arxiv);
  assert_eq!(paper.title(), "Distributed Representations of Sentences and Documents");
  assert_eq!(paper.first_author(), Some("Quoc V. Le"));
  assert_eq!(paper.abstract_url(), "https://arxiv.org/abs/1405.4053");
  assert_eq!(paper.pdf_url(), "https://arxiv.org/pdf/1405.4053.pdf");
  assert_eq!(fetcher.requests(), 1);
  assert!(logs_contain("not found in cache"));

  // The abstract-page form of the same paper is served from the cache.
  let again = resolver.resolve("https://arxiv.org/abs/1405.4053").await?;
  assert_eq!(again, paper);
  assert_eq!(fetcher.requests(), 1);
  assert_eq!(cache.len().await, 1);
  Ok(())
}

#[tokio::test]
async fn test_resolve_cvf_and_openreview() -> anyhow::Result<()> {
  let (resolver, _cache, fetcher) = setup();

  let cvf = resolver
    .resolve("https://openaccess.thecvf.com/content_CVPR_2020/papers/Wang_Dual_Super-Resolution_Learning_for_Semantic_Segmentation_CVPR_2020_paper.pdf")
    .await?;
  assert_eq!(
    cvf.paper_id(),
    "content_CVPR_2020/Wang_Dual_Super-Resolution_Learning_for_Semantic_Segmentation_CVPR_2020_paper"
  );
  assert_eq!(cvf.first_author(), Some("Li Wang"));
  assert!(cvf.bibtex().is_some());

  let openreview = resolver.resolve("https://openreview.net/pdf?id=SklD9yrFPS").await?;
  assert_eq!(openreview.paper_id(), "SklD9yrFPS");
  assert_eq!(openreview.source(), Source::OpenReview);
  assert_eq!(openreview.pdf_url(), "https://openreview.net/pdf?id=SklD9yrFPS");
  assert_eq!(openreview.keywords().len(), 2);

  assert_eq!(fetcher.requests(), 2);
  Ok(())
}

#[tokio::test]
async fn test_unsupported_url_touches_nothing() {
  let (resolver, cache, fetcher) = setup();

  let err = resolver.resolve("https://example.com/paper").await.unwrap_err();
  assert!(matches!(err, PaperbotError::UnsupportedUrl(_)));
  assert_eq!(err.kind(), errors::ErrorKind::UnsupportedUrl);
  assert_eq!(fetcher.requests(), 0);
  assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_links_off_site_or_mistyped_are_unsupported() {
  let (resolver, cache, fetcher) = setup();

  for url in [
    "https://example.com/forum?id=abc&x=openreview.net",
    "https://notarxiv.org/abs/1405.4053",
    "https://openaccess.thecvf.com/content_X/html/Y_paper.pdf",
  ] {
    let err = resolver.resolve(url).await.unwrap_err();
    assert_eq!(err.kind(), errors::ErrorKind::UnsupportedUrl, "{url}");
  }
  assert_eq!(fetcher.requests(), 0);
  assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_malformed_cvf_id_touches_nothing() {
  let (resolver, cache, fetcher) = setup();

  let err = resolver
    .resolve("https://openaccess.thecvf.com/content/CVPR2021/html/Name_CVPR_2021_paper.html")
    .await
    .unwrap_err();
  assert_eq!(err.kind(), errors::ErrorKind::UnsupportedUrl);
  assert_eq!(fetcher.requests(), 0);
  assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_upstream_unavailable_is_not_cached() {
  let (resolver, cache, fetcher) = setup();

  let err = resolver.resolve("https://arxiv.org/abs/2101.05725").await.unwrap_err();
  assert!(matches!(err, PaperbotError::UpstreamUnavailable { status: 503, .. }));
  assert!(cache.is_empty().await);

  // Nothing was cached, so a retry goes upstream again.
  assert!(resolver.resolve("https://arxiv.org/abs/2101.05725").await.is_err());
  assert_eq!(fetcher.requests(), 2);
}

#[tokio::test]
async fn test_changed_markup_is_extraction_error() {
  let (resolver, cache, _fetcher) = setup();

  let err = resolver.resolve("https://arxiv.org/abs/2101.05709").await.unwrap_err();
  assert_eq!(err.kind(), errors::ErrorKind::Extraction);
  assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_cached_record_wins_over_rescrape() -> anyhow::Result<()> {
  let (resolver, cache, fetcher) = setup();
  let curated = cache::tests::record("1405.4053", "Curated Title");
  cache.put(&curated, false).await?;

  assert_eq!(resolver.resolve("https://arxiv.org/abs/1405.4053").await?, curated);
  assert_eq!(fetcher.requests(), 0);

  let refreshed = resolver.refresh("https://arxiv.org/abs/1405.4053").await?;
  assert_eq!(refreshed.title(), "Distributed Representations of Sentences and Documents");
  assert_eq!(cache.get("1405.4053").await?, Some(refreshed));
  assert_eq!(fetcher.requests(), 1);
  Ok(())
}

/// A cache that reports a miss once and then behaves as if another writer got in first.
struct RacingCache {
  inner:  MemoryCache,
  winner: PaperRecord,
}

#[async_trait]
impl PaperCache for RacingCache {
  async fn get(&self, paper_id: &str) -> Result<Option<PaperRecord>, PaperbotError> {
    self.inner.get(paper_id).await
  }

  async fn put(&self, _record: &PaperRecord, _overwrite: bool) -> Result<bool, PaperbotError> {
    self.inner.put(&self.winner, false).await?;
    Ok(false)
  }
}

#[traced_test]
#[tokio::test]
async fn test_lost_write_race_returns_stored_record() -> anyhow::Result<()> {
  let winner = cache::tests::record("1405.4053", "Written By Someone Else");
  let cache = Arc::new(RacingCache { inner: MemoryCache::new(), winner: winner.clone() });
  let resolver = Resolver::new(cache, Arc::new(fixtures()));

  let paper = resolver.resolve("https://arxiv.org/abs/1405.4053").await?;
  assert_eq!(paper, winner);
  assert!(logs_contain("was cached concurrently"));
  Ok(())
}

#[tokio::test]
async fn test_resolve_through_database() -> anyhow::Result<()> {
  let dir = tempfile::tempdir()?;
  let db = Arc::new(Database::open(dir.path().join("papers.db")).await?);
  let fetcher = Arc::new(fixtures());
  let resolver = Resolver::new(db.clone(), fetcher.clone());

  let paper = resolver.resolve("https://openreview.net/forum?id=SklD9yrFPS").await?;
  assert_eq!(db.get("SklD9yrFPS").await?, Some(paper.clone()));
  assert_eq!(resolver.resolve("https://openreview.net/pdf?id=SklD9yrFPS").await?, paper);
  assert_eq!(fetcher.requests(), 1);

  let hits = db.search_papers("tangents").await?;
  assert_eq!(hits.len(), 1);
  Ok(())
}

#[ignore = "requires network access"]
#[traced_test]
#[tokio::test]
async fn test_live_resolve_arxiv() -> anyhow::Result<()> {
  let resolver = Resolver::new(Arc::new(MemoryCache::new()), Arc::new(fetch::HttpFetcher::new()));
  let paper = resolver.resolve("https://arxiv.org/abs/1405.4053").await?;
  assert_eq!(paper.pdf_url(), "https://arxiv.org/pdf/1405.4053.pdf");
  assert!(!paper.authors().is_empty());
  Ok(())
}
