//! CVF Open Access support (openaccess.thecvf.com).
//!
//! An Open Access link is made of five parts:
//!
//! ```text
//! https://openaccess.thecvf.com/ content_CVPR_2020 / html   / Wang_..._CVPR_2020_paper .html
//! https://openaccess.thecvf.com/ content_CVPR_2020 / papers / Wang_..._CVPR_2020_paper .pdf
//!              host               context           page type   name                    ext
//! ```
//!
//! The canonical identifier is `context/name`; the page type and extension are implied by
//! which sibling URL is wanted. Abstract pages expose their content under fixed element
//! ids: `#papertitle`, `#authors` and `#abstract`, with an optional `.bibref` block.

use lazy_static::lazy_static;
use regex::Regex;

use super::*;

/// Host serving the proceedings.
const HOST: &str = "openaccess.thecvf.com";
/// Canonical host used when deriving URLs.
const BASE_URL: &str = "https://openaccess.thecvf.com";

lazy_static! {
  static ref CONTEXT: Regex = Regex::new(r"^content").unwrap();
  static ref TITLE: Selector = Selector::parse("#papertitle").unwrap();
  static ref AUTHORS: Selector = Selector::parse("#authors").unwrap();
  static ref AUTHOR_NAMES: Selector = Selector::parse("b > i").unwrap();
  static ref ABSTRACT: Selector = Selector::parse("#abstract").unwrap();
  static ref BIBREF: Selector = Selector::parse(".bibref").unwrap();
}

/// Which of the two sibling pages a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageType {
  /// `/html/<name>.html`
  Abstract,
  /// `/papers/<name>.pdf`
  Pdf,
}

impl PageType {
  /// Path segment naming this page type.
  fn segment(self) -> &'static str {
    match self {
      PageType::Abstract => "html",
      PageType::Pdf => "papers",
    }
  }

  /// File extension of this page type, including the dot.
  fn extension(self) -> &'static str {
    match self {
      PageType::Abstract => ".html",
      PageType::Pdf => ".pdf",
    }
  }

  /// Parses a path segment.
  fn from_segment(segment: &str) -> Option<Self> {
    match segment {
      "html" => Some(PageType::Abstract),
      "papers" => Some(PageType::Pdf),
      _ => None,
    }
  }
}

/// The CVF Open Access site.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cvf;

#[async_trait]
impl Site for Cvf {
  fn source(&self) -> Source { Source::Cvf }

  fn normalize(&self, url: &str) -> Result<PaperLocation, PaperbotError> {
    let unsupported = || PaperbotError::UnsupportedUrl(url.to_string());
    let parsed = parse_site_url(url, HOST)?;
    let segments = path_segments(&parsed);

    // Everything before the `content*` segment is host noise; everything from it up to
    // the page type is the context.
    let start = segments.iter().position(|s| CONTEXT.is_match(s)).ok_or_else(unsupported)?;
    let (offset, page_type) = segments[start..]
      .iter()
      .enumerate()
      .find_map(|(i, s)| PageType::from_segment(s).map(|page_type| (i, page_type)))
      .ok_or_else(unsupported)?;
    let page_index = start + offset;

    let file = match &segments[page_index + 1..] {
      [file] => *file,
      _ => return Err(unsupported()),
    };
    // The extension must agree with the page type, or the sibling URLs would not lead back.
    let name = file.strip_suffix(page_type.extension()).ok_or_else(unsupported)?;
    if name.is_empty() || page_index == start {
      return Err(unsupported());
    }

    let context = segments[start..page_index].join("/");
    let paper_id = format!("{context}/{name}");
    trace!("CVF {} page for {paper_id}", page_type.segment());
    self.locate(&paper_id)
  }

  fn abstract_url(&self, paper_id: &str) -> Result<String, PaperbotError> {
    page_url(paper_id, PageType::Abstract)
  }

  fn pdf_url(&self, paper_id: &str) -> Result<String, PaperbotError> {
    page_url(paper_id, PageType::Pdf)
  }

  fn parse(&self, markup: &str) -> Result<ExtractedFields, PaperbotError> {
    let document = Html::parse_document(markup);

    let title = element_text(require(&document, &TITLE, "#papertitle")?);
    if title.is_empty() {
      return Err(PaperbotError::Extraction("empty title".to_string()));
    }

    let authors_block = require(&document, &AUTHORS, "#authors")?;
    let authors = match authors_block.select(&AUTHOR_NAMES).next() {
      Some(names) => format::split_author_line(&element_text(names)),
      // Without the bold/italic wrapper the names run up to the proceedings citation.
      None => {
        let text = element_text(authors_block);
        format::split_author_line(text.split(';').next().unwrap_or_default())
      },
    };

    let abstract_text = element_text(require(&document, &ABSTRACT, "#abstract")?);

    let bibtex = format::non_empty(document.select(&BIBREF).next().map(bibtex_text));

    Ok(ExtractedFields { title, authors, abstract_text, bibtex, ..Default::default() })
  }
}

/// Splits a canonical identifier into its `(context, name)` parts.
///
/// # Errors
///
/// Returns [`PaperbotError::MalformedPaperId`] unless the identifier splits on `/` into
/// exactly two non-empty parts.
pub fn split_paper_id(paper_id: &str) -> Result<(&str, &str), PaperbotError> {
  let parts: Vec<&str> = paper_id.split('/').collect();
  match parts.as_slice() {
    [context, name] if !context.is_empty() && !name.is_empty() => Ok((context, name)),
    _ => Err(PaperbotError::MalformedPaperId(paper_id.to_string())),
  }
}

/// Builds the URL of one sibling page.
fn page_url(paper_id: &str, page_type: PageType) -> Result<String, PaperbotError> {
  let (context, name) = split_paper_id(paper_id)?;
  Ok(format!("{BASE_URL}/{context}/{}/{name}{}", page_type.segment(), page_type.extension()))
}

/// BibTeX text with line structure kept; older pages break lines with `<br>`.
fn bibtex_text(element: ElementRef<'_>) -> String {
  let mut text = String::new();
  for node in element.descendants() {
    if let Some(fragment) = node.value().as_text() {
      text.push_str(fragment);
    } else if node.value().as_element().is_some_and(|e| e.name() == "br") {
      text.push('\n');
    }
  }
  text.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
}
