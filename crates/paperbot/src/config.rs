//! Runtime configuration.
//!
//! Configuration is read from a JSON file, by default
//! `<config dir>/paperbot/config.json`. Every field is optional; a missing file yields the
//! defaults. Environment variables take precedence over the file:
//!
//! | Variable            | Field           |
//! |---------------------|-----------------|
//! | `PAPERBOT_DATABASE` | `database_path` |
//! | `PAPERBOT_LOG_DIR`  | `log_dir`       |
//!
//! # Examples
//!
//! ```no_run
//! use paperbot::config::Config;
//!
//! # fn example() -> Result<(), paperbot::errors::PaperbotError> {
//! let config = Config::load(Config::default_path())?;
//! println!("Database: {}", config.database_path.display());
//! # Ok(())
//! # }
//! ```

use super::*;

/// Environment variable overriding [`Config::database_path`].
pub const DATABASE_ENV: &str = "PAPERBOT_DATABASE";
/// Environment variable overriding [`Config::log_dir`].
pub const LOG_DIR_ENV: &str = "PAPERBOT_LOG_DIR";

/// Settings shared by the library and its front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// SQLite database file holding the paper cache and user libraries
  pub database_path: PathBuf,
  /// `User-Agent` sent to upstream sites
  pub user_agent:    String,
  /// Directory for rolling log files; logs go to stderr only when unset
  pub log_dir:       Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_path: database::Database::default_path(),
      user_agent:    fetch::DEFAULT_USER_AGENT.to_string(),
      log_dir:       None,
    }
  }
}

impl Config {
  /// Get default config file path in user's config directory
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("paperbot").join("config.json")
  }

  /// Loads configuration from `path`, then applies environment overrides.
  ///
  /// # Errors
  ///
  /// Returns [`PaperbotError::Config`] if the file exists but is not valid configuration,
  /// and [`PaperbotError::Path`] if it cannot be read.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, PaperbotError> {
    Self::load_with_env(path.as_ref(), |key| std::env::var(key).ok())
  }

  /// Loads `path` and applies overrides looked up through `lookup`.
  fn load_with_env(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, PaperbotError> {
    let config = if path.is_file() {
      debug!("Loading configuration from {}", path.display());
      let text = std::fs::read_to_string(path)?;
      serde_json::from_str(&text)
        .map_err(|e| PaperbotError::Config(format!("{}: {e}", path.display())))?
    } else {
      trace!("No configuration file at {}, using defaults", path.display());
      Config::default()
    };
    Ok(config.with_env_overrides(lookup))
  }

  /// Applies overrides looked up through `lookup`.
  fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(path) = lookup(DATABASE_ENV).filter(|v| !v.is_empty()) {
      self.database_path = PathBuf::from(path);
    }
    if let Some(dir) = lookup(LOG_DIR_ENV).filter(|v| !v.is_empty()) {
      self.log_dir = Some(PathBuf::from(dir));
    }
    self
  }
}
