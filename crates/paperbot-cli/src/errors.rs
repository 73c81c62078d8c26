//! Error types for the paperbot CLI application.
//!
//! Every variant is transparent so the underlying message reaches the user unchanged.

use thiserror::Error;

/// Errors that can occur during CLI operations.
///
/// # Examples
///
/// ```no_run
/// use paperbot_cli::errors::CliError;
///
/// # fn example() -> Result<(), CliError> {
/// let confirmed = dialoguer::Confirm::new().with_prompt("Continue?").interact()?;
/// if confirmed {
///   std::fs::create_dir_all("papers")?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum CliError {
  /// Errors from user interaction dialogs
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// Errors from the underlying paperbot library
  #[error(transparent)]
  Paperbot(#[from] paperbot::errors::PaperbotError),

  /// File system and IO operation errors
  #[error(transparent)]
  IO(#[from] std::io::Error),

  /// Glob pattern matching errors
  #[error(transparent)]
  Glob(#[from] glob::PatternError),

  /// The rolling log file could not be created
  #[error(transparent)]
  LogFile(#[from] tracing_appender::rolling::InitError),
}
