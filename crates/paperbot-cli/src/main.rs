use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use clap::{builder::ArgAction, Parser, Subcommand};
use console::{style, Emoji};
use errors::CliError;
use paperbot::{
  cache::PaperCache,
  config::Config,
  database::{Database, User},
  errors::{ErrorKind, PaperbotError},
  fetch::HttpFetcher,
  resolver::Resolver,
  PaperRecord,
};
use tracing::{debug, trace};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod errors;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

#[derive(Parser)]
#[command(author, version, about = "Resolve arXiv, CVF Open Access and OpenReview paper links")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the database file, overriding the configuration
  #[arg(long, short, global = true)]
  path: Option<PathBuf>,

  /// Path to the configuration file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Skip confirmation prompts and proceed
  #[arg(long, global = true)]
  accept_defaults: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Initialize a new paperbot database
  Init,
  /// Resolve a paper link to its title, first author and PDF
  Resolve {
    /// Link to an arXiv, CVF Open Access or OpenReview paper
    url:     String,
    /// Scrape the paper again and replace the cached record
    #[arg(long)]
    refresh: bool,
  },
  /// Show a cached paper without going to the network
  Get {
    /// Canonical paper identifier, e.g. 1405.4053
    paper_id: String,
  },
  /// Search cached papers
  Search {
    /// Search query
    query: String,
  },
  /// Resolve a paper link and save it to a user's library
  Save {
    /// User handle
    username: String,
    /// Link to the paper
    url:      String,
  },
  /// List the papers a user has saved
  Library {
    /// User handle
    username: String,
  },
  /// Removes the entire database
  Clean,
}

/// Setup logging with the specified verbosity level, adding a daily log file when
/// `log_dir` is set. The returned guard must be held until exit to flush the file.
fn setup_logging(verbosity: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, CliError> {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  let stderr_layer = tracing_subscriber::fmt::layer()
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true);

  let (file_layer, guard) = match log_dir {
    Some(dir) => {
      std::fs::create_dir_all(dir)?;
      let file_appender = rolling::RollingFileAppender::builder()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix("paperbot")
        .filename_suffix("log")
        .build(dir)?;
      let (writer, guard) = tracing_appender::non_blocking(file_appender);
      let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);
      (Some(layer), Some(guard))
    },
    None => (None, None),
  };

  tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).init();
  Ok(guard)
}

/// Asks for confirmation unless `--accept-defaults` was given.
fn confirm(accept_defaults: bool, prompt: &str) -> Result<bool, CliError> {
  if accept_defaults {
    return Ok(true);
  }
  Ok(dialoguer::Confirm::new().with_prompt(prompt).default(false).wait_for_newline(true).interact()?)
}

/// Requires the user to type `word` unless `--accept-defaults` was given.
fn confirm_typed(accept_defaults: bool, word: &str, action: &str) -> Result<bool, CliError> {
  if accept_defaults {
    return Ok(true);
  }
  let input = dialoguer::Input::<String>::new()
    .with_prompt(format!(
      "{} Type {} to confirm {}",
      style("⚠️").red(),
      style(word).red().bold(),
      action
    ))
    .interact_text()?;
  Ok(input == word)
}

/// Suffixes SQLite appends to the database path for its journal and WAL files.
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Removes the database file and its SQLite side files, leaving any other file alone.
fn remove_database_files(path: &Path) -> Result<(), CliError> {
  if path.exists() {
    std::fs::remove_file(path)?;
  }
  for suffix in SIDE_FILE_SUFFIXES {
    let pattern = glob::Pattern::escape(&format!("{}{suffix}", path.display()));
    for file in glob::glob(&pattern)?.flatten() {
      trace!("Removing {}", file.display());
      std::fs::remove_file(file)?;
    }
  }
  Ok(())
}

/// One-line message for a failed resolution, worded for the person who sent the link.
fn describe_failure(error: &PaperbotError) -> String {
  match error.kind() {
    ErrorKind::UnsupportedUrl =>
      "Unsupported link: only arXiv, CVF Open Access and OpenReview papers can be resolved"
        .to_string(),
    ErrorKind::UpstreamUnavailable =>
      "The paper site could not be reached right now, please try again later".to_string(),
    ErrorKind::Extraction => "The paper page was reached but could not be read".to_string(),
    ErrorKind::Internal => format!("Something went wrong on our side: {error}"),
  }
}

/// Prints the failure message and hands the error back for a non-zero exit.
fn report_failure(error: PaperbotError) -> CliError {
  debug!("Resolution failed: {error:?}");
  println!("{} {}", style(WARNING).yellow(), style(describe_failure(&error)).yellow());
  CliError::Paperbot(error)
}

/// The short reply for a resolved link.
fn print_summary(paper: &PaperRecord) {
  println!("   {} {}", style("Title:").green().bold(), style(paper.title()).white());
  if let Some(author) = paper.first_author() {
    let author = if paper.authors().len() > 1 { format!("{author} et al.") } else { author.into() };
    println!("   {} {}", style("Author:").green().bold(), style(author).white());
  }
  println!(
    "   {} {}",
    style("PDF URL:").green().bold(),
    style(paper.pdf_url()).blue().underlined()
  );
}

/// Every stored field of a record.
fn print_details(paper: &PaperRecord) {
  println!(
    "   {} {} {}",
    style("Source:").green().bold(),
    style(paper.source()).cyan(),
    style(paper.paper_id()).yellow()
  );
  println!("   {} {}", style("Title:").green().bold(), style(paper.title()).white());

  let author_display = if paper.authors().is_empty() {
    style("No authors listed").red().italic().to_string()
  } else {
    style(paper.authors().join(", ")).white().to_string()
  };
  println!("   {} {}", style("Authors:").green().bold(), author_display);
  println!("   {} {}", style("Abstract:").green().bold(), style(paper.abstract_text()).white());
  if let Some(comments) = paper.comments() {
    println!("   {} {}", style("Comments:").green().bold(), style(comments).white());
  }
  if !paper.keywords().is_empty() {
    println!("   {} {}", style("Keywords:").green().bold(), style(paper.keywords().join(", ")).white());
  }
  println!(
    "   {} {}",
    style("Abstract URL:").green().bold(),
    style(paper.abstract_url()).blue().underlined()
  );
  println!(
    "   {} {}",
    style("PDF URL:").green().bold(),
    style(paper.pdf_url()).blue().underlined()
  );
  if let Some(bibtex) = paper.bibtex() {
    println!("   {}\n{}", style("BibTeX:").green().bold(), style(bibtex).dim());
  }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
  let cli = Cli::parse();

  let config = Config::load(cli.config.clone().unwrap_or_else(Config::default_path))?;
  let _guard = setup_logging(cli.verbose, config.log_dir.as_deref())?;
  debug!("Using config: {:?}", config);

  let path = cli.path.clone().unwrap_or_else(|| config.database_path.clone());
  trace!("Using database at: {}", path.display());

  match cli.command {
    Commands::Init => {
      if cli.path.is_none() {
        println!(
          "{} Using database path: {}",
          style(BOOKS).cyan(),
          style(path.display()).yellow()
        );
      }

      if path.exists() {
        println!(
          "{} Database already exists at: {}",
          style(WARNING).yellow(),
          style(path.display()).yellow()
        );

        if !confirm(
          cli.accept_defaults,
          "Do you want to reinitialize this database? This will erase all existing data",
        )? {
          println!("{} Keeping existing database", style("ℹ").blue());
          return Ok(());
        }

        if !confirm_typed(cli.accept_defaults, "INIT", "reinitialization")? {
          println!("{} Operation cancelled, keeping existing database", style("ℹ").blue());
          return Ok(());
        }

        println!("{} Removing existing database", style(WARNING).yellow());
        remove_database_files(&path)?;
      }

      if let Some(parent) = path.parent() {
        trace!("Creating parent directories: {}", parent.display());
        std::fs::create_dir_all(parent)?;
      }

      println!(
        "{} Initializing database at: {}",
        style(ROCKET).cyan(),
        style(path.display()).yellow()
      );

      Database::open(&path).await?;

      println!("{} Database initialized successfully!", style(SUCCESS).green());
      Ok(())
    },

    Commands::Resolve { url, refresh } => {
      // Reject unsupported links before opening anything.
      Resolver::locate(&url).map_err(report_failure)?;

      let db = Arc::new(Database::open(&path).await?);
      let resolver =
        Resolver::new(db, Arc::new(HttpFetcher::with_user_agent(&config.user_agent)));

      println!("{} Resolving: {}", style(LOOKING_GLASS).cyan(), style(&url).yellow());

      let result = if refresh { resolver.refresh(&url).await } else { resolver.resolve(&url).await };
      let paper = result.map_err(report_failure)?;
      debug!("Paper details: {:?}", paper);

      println!("\n{} Found paper:", style(SUCCESS).green());
      print_summary(&paper);
      Ok(())
    },

    Commands::Get { paper_id } => {
      let db = Database::open(&path).await?;

      println!("{} Looking up paper {}", style(LOOKING_GLASS).cyan(), style(&paper_id).yellow());

      match db.get(&paper_id).await? {
        Some(paper) => {
          debug!("Found paper: {:?}", paper);
          println!("\n{} Paper details:", style(PAPER).green());
          print_details(&paper);
        },
        None => {
          println!("{} Paper not found in the cache", style(WARNING).yellow());
        },
      }
      Ok(())
    },

    Commands::Search { query } => {
      let db = Database::open(&path).await?;

      println!("{} Searching for: {}", style(LOOKING_GLASS).cyan(), style(&query).yellow());

      let papers = db.search_papers(&query).await?;
      if papers.is_empty() {
        println!(
          "{} No papers found matching: {}",
          style(WARNING).yellow(),
          style(&query).yellow()
        );
        return Ok(());
      }

      println!("\n{} Found {} papers:", style(SUCCESS).green(), style(papers.len()).yellow());
      for (i, paper) in papers.iter().enumerate() {
        println!("\n{}. {}", style(i + 1).yellow(), style(paper.title()).white().bold());
        println!(
          "   {} {} {}",
          style("Source:").green(),
          style(paper.source()).cyan(),
          style(paper.paper_id()).yellow()
        );

        if !paper.abstract_text().is_empty() {
          let preview = paper.abstract_text().chars().take(100).collect::<String>();
          let preview = if paper.abstract_text().chars().count() > 100 {
            format!("{}...", preview)
          } else {
            preview
          };
          println!("   {} {}", style("Abstract:").green(), style(preview).white().italic());
        }
      }

      if papers.len() > 1 {
        println!(
          "\n{} Tip: papers matching any of the words are listed; add fewer words to narrow down",
          style("💡").yellow()
        );
      }
      Ok(())
    },

    Commands::Save { username, url } => {
      Resolver::locate(&url).map_err(report_failure)?;

      let db = Arc::new(Database::open(&path).await?);
      let resolver =
        Resolver::new(db.clone(), Arc::new(HttpFetcher::with_user_agent(&config.user_agent)));

      println!("{} Resolving: {}", style(LOOKING_GLASS).cyan(), style(&url).yellow());
      let paper = resolver.resolve(&url).await.map_err(report_failure)?;
      print_summary(&paper);

      if db.add_paper_to_user(&User::new(&username), paper.paper_id()).await? {
        println!(
          "\n{} Saved to {}'s library",
          style(SAVE).green(),
          style(&username).yellow()
        );
      } else {
        println!("\n{} This paper is already in {}'s library", style("ℹ").blue(), username);
      }
      Ok(())
    },

    Commands::Library { username } => {
      let db = Database::open(&path).await?;

      let saved = db.user_papers(&username).await?;
      if saved.is_empty() {
        println!("{} No papers saved for {}", style(WARNING).yellow(), style(&username).yellow());
        return Ok(());
      }

      println!(
        "{} {} papers saved for {}:",
        style(BOOKS).cyan(),
        style(saved.len()).yellow(),
        style(&username).yellow()
      );
      for (i, entry) in saved.iter().enumerate() {
        let title = match db.get(&entry.paper_id).await? {
          Some(paper) => paper.title().to_string(),
          None => style("(not cached)").red().italic().to_string(),
        };
        println!(
          "\n{}. {} {}",
          style(i + 1).yellow(),
          style(title).white().bold(),
          style(entry.added_at.format("%Y-%m-%d")).dim()
        );
        println!("   {} {}", style("ID:").green(), style(&entry.paper_id).yellow());
      }
      Ok(())
    },

    Commands::Clean => {
      if !path.exists() {
        println!(
          "{} No database found at: {}",
          style(WARNING).yellow(),
          style(path.display()).yellow()
        );
        return Ok(());
      }

      println!("{} Database found at: {}", style(WARNING).yellow(), style(path.display()).yellow());

      if !confirm(cli.accept_defaults, "Are you sure you want to delete this database?")?
        || !confirm_typed(cli.accept_defaults, "DELETE", "deletion")?
      {
        println!("{} Operation cancelled", style("✖").red());
        return Ok(());
      }

      println!("{} Removing database: {}", style(WARNING).yellow(), style(path.display()).yellow());
      remove_database_files(&path)?;
      println!("{} Database files cleaned", style(SUCCESS).green());
      Ok(())
    },
  }
}
