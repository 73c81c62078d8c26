//! Site implementations for the supported paper sources.
//!
//! Each submodule provides one [`Site`]: a URL normalizer that turns any supported link
//! into canonical identifiers, and an extractor that scrapes the abstract page.
//!
//! # Supported Sources
//!
//! - [`arxiv`] - arxiv.org abstract pages and PDFs
//! - [`cvf`] - CVF Open Access (openaccess.thecvf.com) proceedings
//! - [`openreview`] - OpenReview forum pages and PDFs
//!
//! # Examples
//!
//! ```
//! use paperbot::{clients::route, Source};
//!
//! let site = route("https://arxiv.org/pdf/2101.05725.pdf").unwrap();
//! assert_eq!(site.source(), Source::Arxiv);
//!
//! let location = site.normalize("https://arxiv.org/pdf/2101.05725.pdf").unwrap();
//! assert_eq!(location.abstract_url, "https://arxiv.org/abs/2101.05725");
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

pub mod arxiv;
pub mod cvf;
pub mod openreview;

pub use arxiv::Arxiv;
pub use cvf::Cvf;
pub use openreview::OpenReview;

use super::*;

/// Host substrings in routing priority order.
const ROUTES: [(&str, Source); 3] = [
  ("arxiv.org", Source::Arxiv),
  ("openaccess.thecvf.com", Source::Cvf),
  ("openreview.net", Source::OpenReview),
];

/// Raw fields scraped from an abstract page, before they are tied to an identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
  /// Paper title
  pub title:         String,
  /// Authors in listed order; may be empty
  pub authors:       Vec<String>,
  /// Abstract collapsed to a single line
  pub abstract_text: String,
  /// Comments block, when the site has one
  pub comments:      Option<String>,
  /// BibTeX entry, when the site has one
  pub bibtex:        Option<String>,
  /// Keywords, when the site has them
  pub keywords:      Vec<String>,
}

/// The capability set of one supported site.
///
/// Normalization and URL derivation are pure; [`Site::extract`] performs exactly one
/// request through the supplied [`Fetcher`].
#[async_trait]
pub trait Site: Send + Sync {
  /// The source this site produces records for.
  fn source(&self) -> Source;

  /// Parses a raw URL into canonical identifiers.
  ///
  /// Accepts either the abstract-page or the PDF form of a link; both yield the same
  /// `paper_id`.
  fn normalize(&self, url: &str) -> Result<PaperLocation, PaperbotError>;

  /// Derives the abstract page URL from a canonical identifier.
  fn abstract_url(&self, paper_id: &str) -> Result<String, PaperbotError>;

  /// Derives the PDF URL from a canonical identifier.
  fn pdf_url(&self, paper_id: &str) -> Result<String, PaperbotError>;

  /// Parses an abstract page into raw fields.
  fn parse(&self, markup: &str) -> Result<ExtractedFields, PaperbotError>;

  /// Builds a [`PaperLocation`] from an identifier, deriving both URLs.
  fn locate(&self, paper_id: &str) -> Result<PaperLocation, PaperbotError> {
    Ok(PaperLocation {
      paper_id:     paper_id.to_string(),
      abstract_url: self.abstract_url(paper_id)?,
      pdf_url:      self.pdf_url(paper_id)?,
      source:       self.source(),
    })
  }

  /// Fetches the abstract page and parses it.
  ///
  /// # Errors
  ///
  /// - [`PaperbotError::UpstreamUnavailable`] if the status is not a success
  /// - [`PaperbotError::Extraction`] if the page lacks an expected element
  async fn extract(
    &self,
    fetcher: &dyn Fetcher,
    abstract_url: &str,
  ) -> Result<ExtractedFields, PaperbotError> {
    let response = fetcher.get(abstract_url).await?;
    if !response.is_success() {
      warn!("Cannot connect to {abstract_url}: HTTP {}", response.status);
      return Err(PaperbotError::UpstreamUnavailable {
        url:    abstract_url.to_string(),
        status: response.status,
      });
    }
    let fields = self.parse(&response.body)?;
    debug!("{} paper title: {}", self.source(), fields.title);
    Ok(fields)
  }
}

/// Selects the [`Site`] responsible for `url`.
///
/// Checks for `arxiv.org`, `openaccess.thecvf.com` and `openreview.net` in that order; the
/// first match wins.
///
/// # Errors
///
/// Returns [`PaperbotError::UnsupportedUrl`] when no site matches.
pub fn route(url: &str) -> Result<&'static dyn Site, PaperbotError> {
  ROUTES
    .iter()
    .find(|(needle, _)| url.contains(needle))
    .map(|(_, source)| {
      trace!("URL identified as {source}: {url}");
      source.site()
    })
    .ok_or_else(|| PaperbotError::UnsupportedUrl(url.to_string()))
}

/// Parses a user-supplied link, assuming `https://` when no scheme is given.
fn parse_url(raw: &str) -> Result<Url, PaperbotError> {
  let raw = raw.trim();
  let parsed =
    if raw.contains("://") { Url::parse(raw) } else { Url::parse(&format!("https://{raw}")) };
  parsed.map_err(|_| PaperbotError::UnsupportedUrl(raw.to_string()))
}

/// Parses a link that must be served by `host` or one of its subdomains.
fn parse_site_url(raw: &str, host: &str) -> Result<Url, PaperbotError> {
  let parsed = parse_url(raw)?;
  // `Url` lowercases hosts of http(s) links.
  let on_host = parsed
    .host_str()
    .is_some_and(|actual| actual == host || actual.ends_with(&format!(".{host}")));
  if !on_host {
    trace!("{raw} is not served by {host}");
    return Err(PaperbotError::UnsupportedUrl(raw.trim().to_string()));
  }
  Ok(parsed)
}

/// Returns the non-empty path segments of `url`.
fn path_segments(url: &Url) -> Vec<&str> {
  url.path_segments().map(|segments| segments.filter(|s| !s.is_empty()).collect()).unwrap_or_default()
}

/// Returns the first element matching `selector`, or an extraction error naming `what`.
fn require<'a>(
  document: &'a Html,
  selector: &Selector,
  what: &str,
) -> Result<ElementRef<'a>, PaperbotError> {
  document
    .select(selector)
    .next()
    .ok_or_else(|| PaperbotError::Extraction(format!("missing {what} element")))
}

/// Collects the text of an element, collapsed to one line.
fn element_text(element: ElementRef<'_>) -> String {
  format::collapse_lines(&element.text().collect::<String>())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_route_priority() {
    assert_eq!(route("https://arxiv.org/abs/1405.4053").unwrap().source(), Source::Arxiv);
    assert_eq!(
      route("https://openaccess.thecvf.com/content_CVPR_2020/html/X_paper.html").unwrap().source(),
      Source::Cvf
    );
    assert_eq!(route("https://openreview.net/forum?id=abc").unwrap().source(), Source::OpenReview);
    // arxiv.org wins even when another site's host appears later in the string
    assert_eq!(
      route("https://arxiv.org/abs/2101.05709?ref=openreview.net").unwrap().source(),
      Source::Arxiv
    );
  }

  #[test]
  fn test_route_unsupported() {
    let err = route("https://example.com/paper").err().unwrap();
    assert!(matches!(err, PaperbotError::UnsupportedUrl(ref u) if u == "https://example.com/paper"));
    assert!(route("").is_err());
  }

  #[test]
  fn test_parse_url_without_scheme() {
    let url = parse_url("arxiv.org/abs/1405.4053").unwrap();
    assert_eq!(url.host_str(), Some("arxiv.org"));
    assert_eq!(path_segments(&url), vec!["abs", "1405.4053"]);
  }

  #[test]
  fn test_sibling_urls_share_paper_id() {
    let pairs = [
      ("https://arxiv.org/abs/2101.05725", "https://arxiv.org/pdf/2101.05725.pdf"),
      (
        "https://openaccess.thecvf.com/content_CVPR_2020/html/Wang_Dual_Super-Resolution_Learning_for_Semantic_Segmentation_CVPR_2020_paper.html",
        "https://openaccess.thecvf.com/content_CVPR_2020/papers/Wang_Dual_Super-Resolution_Learning_for_Semantic_Segmentation_CVPR_2020_paper.pdf",
      ),
      ("https://openreview.net/forum?id=nlAxjsniDzg", "https://openreview.net/pdf?id=nlAxjsniDzg"),
    ];
    for (abstract_url, pdf_url) in pairs {
      let from_abstract = route(abstract_url).unwrap().normalize(abstract_url).unwrap();
      let from_pdf = route(pdf_url).unwrap().normalize(pdf_url).unwrap();
      assert_eq!(from_abstract, from_pdf);
      assert_eq!(from_abstract.abstract_url, abstract_url);
      assert_eq!(from_abstract.pdf_url, pdf_url);
    }
  }
}
