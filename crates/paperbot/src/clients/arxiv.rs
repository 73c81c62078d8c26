//! arXiv support: `arxiv.org/abs/<id>` and `arxiv.org/pdf/<id>[.pdf]` links.
//!
//! The abstract page is scraped directly. Its blocks are identified by fixed class names:
//! `h1.title`, `div.authors`, `blockquote.abstract` and the optional
//! `td.tablecell.comments`. Each block opens with a `span.descriptor` label ("Title:",
//! "Authors:", ...) that is dropped from the extracted text.
//!
//! # Examples
//!
//! ```
//! use paperbot::clients::{Arxiv, Site};
//!
//! let location = Arxiv.normalize("https://arxiv.org/abs/1405.4053").unwrap();
//! assert_eq!(location.paper_id, "1405.4053");
//! assert_eq!(location.pdf_url, "https://arxiv.org/pdf/1405.4053.pdf");
//! ```

use lazy_static::lazy_static;

use super::*;

/// Host serving abstract pages and PDFs.
const HOST: &str = "arxiv.org";
/// Canonical host used when deriving URLs.
const BASE_URL: &str = "https://arxiv.org";

lazy_static! {
  static ref TITLE: Selector = Selector::parse("h1.title").unwrap();
  static ref AUTHORS: Selector = Selector::parse("div.authors").unwrap();
  static ref AUTHOR_LINKS: Selector = Selector::parse("a").unwrap();
  static ref ABSTRACT: Selector = Selector::parse("blockquote.abstract").unwrap();
  static ref COMMENTS: Selector = Selector::parse("td.tablecell.comments").unwrap();
}

/// The arXiv site.
#[derive(Debug, Clone, Copy, Default)]
pub struct Arxiv;

#[async_trait]
impl Site for Arxiv {
  fn source(&self) -> Source { Source::Arxiv }

  fn normalize(&self, url: &str) -> Result<PaperLocation, PaperbotError> {
    let parsed = parse_site_url(url, HOST)?;

    let segments = path_segments(&parsed);
    let id = match segments.split_first() {
      // Old-style identifiers keep their archive prefix, e.g. `math/0601001`.
      Some((&"abs" | &"pdf", rest)) if !rest.is_empty() => rest.join("/"),
      _ => return Err(PaperbotError::UnsupportedUrl(url.to_string())),
    };
    let id = id.strip_suffix(".pdf").unwrap_or(&id);
    if id.is_empty() {
      return Err(PaperbotError::UnsupportedUrl(url.to_string()));
    }

    self.locate(id)
  }

  fn abstract_url(&self, paper_id: &str) -> Result<String, PaperbotError> {
    Ok(format!("{BASE_URL}/abs/{}", checked_id(paper_id)?))
  }

  fn pdf_url(&self, paper_id: &str) -> Result<String, PaperbotError> {
    Ok(format!("{BASE_URL}/pdf/{}.pdf", checked_id(paper_id)?))
  }

  fn parse(&self, markup: &str) -> Result<ExtractedFields, PaperbotError> {
    let document = Html::parse_document(markup);

    let title = text_after_descriptor(require(&document, &TITLE, "title")?);
    if title.is_empty() {
      return Err(PaperbotError::Extraction("empty title".to_string()));
    }

    let authors_block = require(&document, &AUTHORS, "authors")?;
    let mut authors =
      format::clean_authors(authors_block.select(&AUTHOR_LINKS).map(element_text));
    if authors.is_empty() {
      // Unlinked author lists are plain comma-separated text.
      authors = format::split_author_line(&text_after_descriptor(authors_block));
    }

    let abstract_text = text_after_descriptor(require(&document, &ABSTRACT, "abstract")?);

    let comments =
      format::non_empty(document.select(&COMMENTS).next().map(text_after_descriptor));

    Ok(ExtractedFields { title, authors, abstract_text, comments, ..Default::default() })
  }
}

/// Rejects identifiers that cannot appear in an arXiv path.
fn checked_id(paper_id: &str) -> Result<&str, PaperbotError> {
  if paper_id.is_empty() || paper_id.contains(char::is_whitespace) {
    return Err(PaperbotError::MalformedPaperId(paper_id.to_string()));
  }
  Ok(paper_id)
}

/// Text of a block with its leading `span.descriptor` label removed.
fn text_after_descriptor(element: ElementRef<'_>) -> String {
  let mut text = String::new();
  for child in element.children() {
    if let Some(fragment) = child.value().as_text() {
      text.push_str(fragment);
    } else if let Some(child) = ElementRef::wrap(child) {
      if !child.value().classes().any(|class| class == "descriptor") {
        text.extend(child.text());
      }
    }
  }
  format::collapse_lines(&text)
}
