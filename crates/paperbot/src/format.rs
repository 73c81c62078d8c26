//! Text clean-up shared by the site extractors.
//!
//! Scraped text arrives with the layout of the page it came from: hard-wrapped
//! abstracts, author names padded with whitespace and separated by stray commas. The
//! helpers here turn that into the single-line, trimmed strings stored on a
//! [`PaperRecord`].
//!
//! # Examples
//!
//! ```
//! use paperbot::format;
//!
//! assert_eq!(format::collapse_lines("  Deep\n  learning\n\n works "), "Deep learning works");
//!
//! let authors = format::clean_authors(["Quoc V. Le", ",", " Tomas Mikolov "]);
//! assert_eq!(authors, vec!["Quoc V. Le", "Tomas Mikolov"]);
//! ```

/// Joins multi-line text into one line.
///
/// Each line is trimmed, blank lines are dropped, and the remainder is joined with single
/// spaces. Runs of spaces inside a line are collapsed as well.
pub fn collapse_lines(text: &str) -> String { text.split_whitespace().collect::<Vec<_>>().join(" ") }

/// Cleans a single author entry.
///
/// Strips surrounding whitespace and separator commas; returns `None` when nothing is
/// left, so bare separators between author links disappear.
pub fn clean_author(raw: &str) -> Option<String> {
  let name = collapse_lines(raw.trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace()));
  if name.is_empty() {
    None
  } else {
    Some(name)
  }
}

/// Cleans a list of author entries, keeping their order.
pub fn clean_authors<I, S>(raw: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>, {
  raw.into_iter().filter_map(|author| clean_author(author.as_ref())).collect()
}

/// Splits a comma-separated author line (as CVF renders it) into cleaned names.
pub fn split_author_line(line: &str) -> Vec<String> { clean_authors(line.split(',')) }

/// Turns an optional scraped block into an optional field: blank text counts as absent.
pub fn non_empty(text: Option<String>) -> Option<String> {
  text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
