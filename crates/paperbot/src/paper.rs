//! Paper records and the canonical identifiers they are keyed by.
//!
//! A [`PaperRecord`] is built once, either by scraping a site or by reading it back from
//! a cache, and never mutated afterwards. Re-scraping produces a new record that replaces
//! the old one under the same `paper_id`.
//!
//! # Examples
//!
//! ```
//! use paperbot::paper::Source;
//!
//! let source: Source = "openreview".parse().unwrap();
//! let location = source.site().normalize("https://openreview.net/forum?id=H1lj0nNFwB").unwrap();
//! assert_eq!(location.paper_id, "H1lj0nNFwB");
//! assert_eq!(location.pdf_url, "https://openreview.net/pdf?id=H1lj0nNFwB");
//! ```

use std::fmt;

use super::*;

/// The site a paper was resolved from.
///
/// Each variant maps to exactly one [`Site`] implementation through [`Source::site`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  /// arxiv.org preprints
  Arxiv,
  /// CVF Open Access proceedings (openaccess.thecvf.com)
  Cvf,
  /// OpenReview forums (openreview.net)
  OpenReview,
}

impl Source {
  /// Returns the site capability that normalizes and extracts papers for this source.
  pub fn site(self) -> &'static dyn Site {
    match self {
      Source::Arxiv => &clients::arxiv::Arxiv,
      Source::Cvf => &clients::cvf::Cvf,
      Source::OpenReview => &clients::openreview::OpenReview,
    }
  }
}

impl fmt::Display for Source {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Source::Arxiv => write!(f, "arxiv"),
      Source::Cvf => write!(f, "cvf"),
      Source::OpenReview => write!(f, "openreview"),
    }
  }
}

impl FromStr for Source {
  type Err = PaperbotError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match &s.to_lowercase() as &str {
      "arxiv" => Ok(Source::Arxiv),
      "cvf" => Ok(Source::Cvf),
      "openreview" => Ok(Source::OpenReview),
      s => Err(PaperbotError::InvalidSource(s.to_owned())),
    }
  }
}

/// Canonical identifiers derived from a URL without any I/O.
///
/// Produced by [`Site::normalize`] and consumed immediately by the resolver; never
/// persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperLocation {
  /// Source-scoped identifier, e.g. `1405.4053` or `content_CVPR_2020/Name_paper`
  pub paper_id:     String,
  /// URL of the human-readable abstract page
  pub abstract_url: String,
  /// URL of the PDF
  pub pdf_url:      String,
  /// Site the identifiers belong to
  pub source:       Source,
}

/// A resolved paper with its scraped metadata.
///
/// Fields are private so that a record cannot be edited after construction; build one
/// with [`PaperRecord::new`] and read it through the accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
  /// Unique key, deterministic from the URL
  paper_id:      String,
  /// Site the record was scraped from
  source:        Source,
  /// The paper's title
  title:         String,
  /// Authors in the order the site lists them
  authors:       Vec<String>,
  /// Abstract page URL
  abstract_url:  String,
  /// PDF URL
  pdf_url:       String,
  /// Abstract text with line breaks collapsed
  abstract_text: String,
  /// Free-form comments (arXiv only)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  comments:      Option<String>,
  /// BibTeX entry (CVF and OpenReview)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  bibtex:        Option<String>,
  /// Keywords (OpenReview only)
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  keywords:      Vec<String>,
}

impl PaperRecord {
  /// Assembles a record from canonical identifiers and freshly extracted fields.
  pub fn new(location: PaperLocation, fields: ExtractedFields) -> Self {
    Self {
      paper_id:      location.paper_id,
      source:        location.source,
      title:         fields.title,
      authors:       fields.authors,
      abstract_url:  location.abstract_url,
      pdf_url:       location.pdf_url,
      abstract_text: fields.abstract_text,
      comments:      fields.comments,
      bibtex:        fields.bibtex,
      keywords:      fields.keywords,
    }
  }

  /// The canonical identifier this record is cached under.
  pub fn paper_id(&self) -> &str { &self.paper_id }

  /// The site this record came from.
  pub fn source(&self) -> Source { self.source }

  /// The paper's title.
  pub fn title(&self) -> &str { &self.title }

  /// Authors in listed order.
  pub fn authors(&self) -> &[String] { &self.authors }

  /// The first listed author, if any author is listed at all.
  pub fn first_author(&self) -> Option<&str> { self.authors.first().map(String::as_str) }

  /// URL of the abstract page.
  pub fn abstract_url(&self) -> &str { &self.abstract_url }

  /// URL of the PDF.
  pub fn pdf_url(&self) -> &str { &self.pdf_url }

  /// The abstract as a single line of text.
  pub fn abstract_text(&self) -> &str { &self.abstract_text }

  /// Comments supplied by the site, if any.
  pub fn comments(&self) -> Option<&str> { self.comments.as_deref() }

  /// BibTeX supplied by the site, if any.
  pub fn bibtex(&self) -> Option<&str> { self.bibtex.as_deref() }

  /// Keywords supplied by the site; empty when the site has none.
  pub fn keywords(&self) -> &[String] { &self.keywords }
}
