//! SQLite-backed storage for paper records and user libraries.
//!
//! The database holds two collections:
//! - `papers`, keyed by `paper_id`, storing each [`PaperRecord`] as a JSON document
//! - `users`, keyed by a user handle, each with the set of papers that user saved
//!
//! [`Database`] implements [`PaperCache`], so it can be handed straight to a
//! [`Resolver`](crate::resolver::Resolver).

use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;

use super::*;

/// Database handle for paperbot
pub struct Database {
  /// Async connection, serializing access on a background thread.
  conn: Connection,
}

/// A chat user that papers can be saved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  /// Unique handle
  pub username:   String,
  /// Given name, possibly empty
  pub first_name: String,
  /// Family name, possibly empty
  pub last_name:  String,
}

impl User {
  /// A user known only by handle.
  pub fn new(username: impl Into<String>) -> Self {
    Self { username: username.into(), first_name: String::new(), last_name: String::new() }
  }
}

/// A paper in a user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPaper {
  /// Key into the `papers` collection
  pub paper_id: String,
  /// When the user saved it
  pub added_at: DateTime<Utc>,
  /// User-assigned labels
  pub labels:   Vec<String>,
  /// User notes
  pub notes:    Vec<String>,
}

impl Database {
  /// Open or create a database at the specified path
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, PaperbotError> {
    if let Some(parent) = path.as_ref().parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }
    let conn = Connection::open(path.as_ref()).await?;

    // Initialize schema
    conn
      .call(|conn| {
        conn.execute_batch(include_str!(concat!(
          env!("CARGO_MANIFEST_DIR"),
          "/migrations/init.sql"
        )))?;
        Ok(())
      })
      .await?;

    debug!("Opened database at {}", path.as_ref().display());
    Ok(Self { conn })
  }

  /// Get default database path in user's data directory
  pub fn default_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("paperbot").join("paperbot.db")
  }

  /// Search papers by title and abstract using full-text search
  ///
  /// `query` is free text: a paper matches if any of its whitespace-separated words
  /// appears in the title or abstract. Punctuation inside a word (`self-driving`, `C++`)
  /// is matched literally rather than read as FTS5 syntax.
  pub async fn search_papers(&self, query: &str) -> Result<Vec<PaperRecord>, PaperbotError> {
    let Some(query) = match_expression(query) else {
      return Ok(Vec::new());
    };
    debug!("Full-text query: {query}");

    let documents = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT p.document
                     FROM papers p
                     JOIN papers_fts f ON p.rowid = f.rowid
                     WHERE papers_fts MATCH ?1
                     ORDER BY rank",
        )?;

        let documents = stmt
          .query_map([query], |row| row.get::<_, String>(0))?
          .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
      })
      .await?;

    documents
      .iter()
      .map(|document| serde_json::from_str(document).map_err(PaperbotError::from))
      .collect()
  }

  /// Create a user profile; returns `false` if the handle is already taken
  pub async fn create_user(&self, user: &User) -> Result<bool, PaperbotError> {
    let user = user.clone();
    let result = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (username, first_name, last_name, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
          params![&user.username, &user.first_name, &user.last_name, Utc::now()],
        )?;
        Ok(())
      })
      .await
      .map_err(PaperbotError::from);

    match result {
      Ok(()) => Ok(true),
      Err(e) if e.is_duplicate_error() => {
        debug!("User already exists");
        Ok(false)
      },
      Err(e) => Err(e),
    }
  }

  /// Associate a paper with a user, creating the user if needed.
  ///
  /// Returns `false` if the paper was already in the user's library.
  pub async fn add_paper_to_user(&self, user: &User, paper_id: &str) -> Result<bool, PaperbotError> {
    let user = user.clone();
    let paper_id = paper_id.to_string();

    let added = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let now = Utc::now();
        tx.execute(
          "INSERT OR IGNORE INTO users (username, first_name, last_name, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
          params![&user.username, &user.first_name, &user.last_name, now],
        )?;
        let changed = tx.execute(
          "INSERT OR IGNORE INTO user_papers (username, paper_id, added_at)
                     VALUES (?1, ?2, ?3)",
          params![&user.username, &paper_id, now],
        )?;
        tx.commit()?;
        Ok(changed == 1)
      })
      .await?;

    if !added {
      warn!("Paper already added in the past");
    }
    Ok(added)
  }

  /// List a user's saved papers, oldest first
  pub async fn user_papers(&self, username: &str) -> Result<Vec<SavedPaper>, PaperbotError> {
    let username = username.to_string();

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT paper_id, added_at, labels, notes
                     FROM user_papers
                     WHERE username = ?1
                     ORDER BY added_at, paper_id",
        )?;
        let rows = stmt
          .query_map([username], |row| {
            Ok((
              row.get::<_, String>(0)?,
              row.get::<_, DateTime<Utc>>(1)?,
              row.get::<_, String>(2)?,
              row.get::<_, String>(3)?,
            ))
          })?
          .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(paper_id, added_at, labels, notes)| -> Result<SavedPaper, PaperbotError> {
        Ok(SavedPaper {
          paper_id,
          added_at,
          labels: serde_json::from_str(&labels)?,
          notes: serde_json::from_str(&notes)?,
        })
      })
      .collect()
  }
}

/// Turns free text into an FTS5 expression that ORs each word as a quoted string.
///
/// Returns `None` for blank input, which FTS5 would reject.
fn match_expression(query: &str) -> Option<String> {
  let terms: Vec<String> =
    query.split_whitespace().map(|term| format!("\"{}\"", term.replace('"', "\"\""))).collect();
  if terms.is_empty() {
    None
  } else {
    Some(terms.join(" OR "))
  }
}

#[async_trait]
impl PaperCache for Database {
  async fn get(&self, paper_id: &str) -> Result<Option<PaperRecord>, PaperbotError> {
    let paper_id = paper_id.to_string();

    let document = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached("SELECT document FROM papers WHERE paper_id = ?1")?;
        let document = stmt.query_row([paper_id], |row| row.get::<_, String>(0)).optional()?;
        Ok(document)
      })
      .await?;

    match document {
      Some(document) => Ok(Some(serde_json::from_str(&document)?)),
      None => Ok(None),
    }
  }

  async fn put(&self, record: &PaperRecord, overwrite: bool) -> Result<bool, PaperbotError> {
    let document = serde_json::to_string(record)?;
    let paper_id = record.paper_id().to_string();
    let source = record.source().to_string();
    let title = record.title().to_string();
    let abstract_text = record.abstract_text().to_string();

    let sql = if overwrite {
      "INSERT INTO papers (paper_id, source, title, abstract_text, document, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (paper_id) DO UPDATE SET
                   source = excluded.source,
                   title = excluded.title,
                   abstract_text = excluded.abstract_text,
                   document = excluded.document,
                   stored_at = excluded.stored_at"
    } else {
      "INSERT INTO papers (paper_id, source, title, abstract_text, document, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (paper_id) DO NOTHING"
    };

    let changed = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(sql)?;
        let changed =
          stmt.execute(params![paper_id, source, title, abstract_text, document, Utc::now()])?;
        Ok(changed)
      })
      .await?;

    trace!("Stored {} row(s) for {}", changed, record.paper_id());
    Ok(changed == 1)
  }
}
