//! OpenReview support: `openreview.net/forum?id=<id>` and `openreview.net/pdf?id=<id>`.
//!
//! Forum pages are rendered client-side, but the server embeds the note being displayed
//! as a JSON payload in `script#__NEXT_DATA__`. Fields are read from
//! `props.pageProps.forumNote.content`; newer notes wrap every field value in an object of
//! the form `{"value": ...}`, older ones store the value directly.

use lazy_static::lazy_static;
use serde_json::Value;

use super::*;

/// Host serving forum pages and PDFs.
const HOST: &str = "openreview.net";
/// Canonical host used when deriving URLs.
const BASE_URL: &str = "https://openreview.net";

lazy_static! {
  static ref NEXT_DATA: Selector = Selector::parse("script#__NEXT_DATA__").unwrap();
}

/// The OpenReview site.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenReview;

#[async_trait]
impl Site for OpenReview {
  fn source(&self) -> Source { Source::OpenReview }

  fn normalize(&self, url: &str) -> Result<PaperLocation, PaperbotError> {
    let parsed = parse_site_url(url, HOST)?;
    if !matches!(path_segments(&parsed).last(), Some(&"forum" | &"pdf")) {
      return Err(PaperbotError::UnsupportedUrl(url.to_string()));
    }

    let paper_id = parsed
      .query_pairs()
      .find(|(key, _)| key == "id")
      .map(|(_, value)| value.into_owned())
      .filter(|id| !id.is_empty())
      .ok_or_else(|| PaperbotError::UnsupportedUrl(url.to_string()))?;

    self.locate(&paper_id)
  }

  fn abstract_url(&self, paper_id: &str) -> Result<String, PaperbotError> {
    Ok(format!("{BASE_URL}/forum?id={}", checked_id(paper_id)?))
  }

  fn pdf_url(&self, paper_id: &str) -> Result<String, PaperbotError> {
    Ok(format!("{BASE_URL}/pdf?id={}", checked_id(paper_id)?))
  }

  fn parse(&self, markup: &str) -> Result<ExtractedFields, PaperbotError> {
    let payload = {
      let document = Html::parse_document(markup);
      require(&document, &NEXT_DATA, "__NEXT_DATA__ script")?.text().collect::<String>()
    };
    let data: Value = serde_json::from_str(&payload)
      .map_err(|e| PaperbotError::Extraction(format!("invalid __NEXT_DATA__ payload: {e}")))?;

    let content = data
      .pointer("/props/pageProps/forumNote/content")
      .ok_or_else(|| PaperbotError::Extraction("missing forumNote content".to_string()))?;

    let title = field_str(content, "title")
      .map(format::collapse_lines)
      .filter(|t| !t.is_empty())
      .ok_or_else(|| PaperbotError::Extraction("missing title property".to_string()))?;

    let abstract_text = field_str(content, "abstract")
      .map(format::collapse_lines)
      .ok_or_else(|| PaperbotError::Extraction("missing abstract property".to_string()))?;

    // Anonymous submissions hide their author list entirely.
    let authors = format::clean_authors(field_strs(content, "authors"));
    let keywords = field_strs(content, "keywords")
      .into_iter()
      .map(format::collapse_lines)
      .filter(|keyword| !keyword.is_empty())
      .collect();
    let bibtex = format::non_empty(field_str(content, "_bibtex").map(str::to_string));
    let comments = format::non_empty(field_str(content, "TL;DR").map(format::collapse_lines));

    Ok(ExtractedFields { title, authors, abstract_text, comments, bibtex, keywords })
  }
}

/// Rejects identifiers that would change the meaning of the query string.
fn checked_id(paper_id: &str) -> Result<&str, PaperbotError> {
  if paper_id.is_empty() || paper_id.contains(|c: char| c == '&' || c == '#' || c.is_whitespace())
  {
    return Err(PaperbotError::MalformedPaperId(paper_id.to_string()));
  }
  Ok(paper_id)
}

/// Looks up a content property, unwrapping the `{"value": ...}` envelope when present.
fn field<'a>(content: &'a Value, key: &str) -> Option<&'a Value> {
  let value = content.get(key)?;
  match value.get("value") {
    Some(inner) if value.is_object() => Some(inner),
    _ => Some(value),
  }
}

/// A string-valued content property.
fn field_str<'a>(content: &'a Value, key: &str) -> Option<&'a str> { field(content, key)?.as_str() }

/// A list-of-strings content property; absent or mistyped lists are empty.
fn field_strs<'a>(content: &'a Value, key: &str) -> Vec<&'a str> {
  field(content, key)
    .and_then(Value::as_array)
    .map(|items| items.iter().filter_map(Value::as_str).collect())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;

  const FORUM_PAGE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/openreview_forum.html"));

  #[test]
  fn test_normalize_forum_url() {
    let location = OpenReview.normalize("https://openreview.net/forum?id=H1lj0nNFwB").unwrap();
    assert_eq!(location.paper_id, "H1lj0nNFwB");
    assert_eq!(location.abstract_url, "https://openreview.net/forum?id=H1lj0nNFwB");
    assert_eq!(location.pdf_url, "https://openreview.net/pdf?id=H1lj0nNFwB");
    assert_eq!(location.source, Source::OpenReview);
  }

  #[test]
  fn test_normalize_pdf_url_with_extra_params() {
    let location =
      OpenReview.normalize("https://openreview.net/pdf?noteId=x&id=nlAxjsniDzg").unwrap();
    assert_eq!(location.paper_id, "nlAxjsniDzg");
    assert_eq!(location.abstract_url, "https://openreview.net/forum?id=nlAxjsniDzg");
  }

  #[test]
  fn test_normalize_rejects_other_pages() {
    for url in [
      "https://openreview.net/group?id=ICLR.cc/2020/Conference",
      "https://openreview.net/forum",
      "https://openreview.net/forum?id=",
      "https://openreview.net/profile?id=~Some_One1",
      "https://example.com/forum?id=abc&x=openreview.net",
      "https://fakeopenreview.net/forum?id=abc",
    ] {
      assert!(
        matches!(OpenReview.normalize(url), Err(PaperbotError::UnsupportedUrl(_))),
        "{url} should be unsupported"
      );
    }
  }

  #[test]
  fn test_malformed_id() {
    assert!(matches!(OpenReview.pdf_url("a&b"), Err(PaperbotError::MalformedPaperId(_))));
  }

  #[test]
  fn test_parse_forum_page() {
    let fields = OpenReview.parse(FORUM_PAGE).unwrap();
    assert_eq!(fields.title, "Neural Tangents: Fast and Easy Infinite Neural Networks in Python");
    assert_eq!(fields.authors.first().map(String::as_str), Some("Roman Novak"));
    assert_eq!(fields.authors.len(), 3);
    assert!(fields.abstract_text.starts_with("Neural Tangents is a library"));
    assert!(!fields.abstract_text.contains('\n'));
    assert_eq!(fields.keywords, vec!["Infinite Neural Networks", "Gaussian Processes"]);
    assert!(fields.bibtex.as_deref().is_some_and(|b| b.starts_with("@inproceedings{")));
    assert_eq!(fields.comments.as_deref(), Some("Infinitely wide networks, made easy."));
  }

  #[test]
  fn test_parse_value_envelopes() {
    let page = r#"<script id="__NEXT_DATA__" type="application/json">
      {"props":{"pageProps":{"forumNote":{"content":{
        "title":{"value":"Enveloped Title"},
        "abstract":{"value":"Line one\nline two"},
        "keywords":{"value":["a"]}
      }}}}}
    </script>"#;
    let fields = OpenReview.parse(page).unwrap();
    assert_eq!(fields.title, "Enveloped Title");
    assert_eq!(fields.abstract_text, "Line one line two");
    assert!(fields.authors.is_empty());
    assert_eq!(fields.keywords, vec!["a"]);
    assert_eq!(fields.bibtex, None);
  }

  #[test]
  fn test_parse_missing_payload() {
    let err = OpenReview.parse("<html><body>Loading...</body></html>").unwrap_err();
    assert!(matches!(err, PaperbotError::Extraction(_)));

    let err = OpenReview
      .parse(r#"<script id="__NEXT_DATA__">{"props":{"pageProps":{}}}</script>"#)
      .unwrap_err();
    assert!(matches!(err, PaperbotError::Extraction(ref reason) if reason.contains("forumNote")));

    let err = OpenReview.parse(r#"<script id="__NEXT_DATA__">{not json</script>"#).unwrap_err();
    assert!(matches!(err, PaperbotError::Extraction(_)));
  }
}
