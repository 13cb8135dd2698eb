//! folio-history: inspect and maintain a document history database.
//!
//! Usage:
//!   folio-history log article-1
//!   folio-history show article-1 2
//!   folio-history diff article-1 2 0
//!   folio-history undo article-1
//!   folio-history record article-1 draft.md
//!
//! Cursor moves (`undo`, `redo`, `jump`) are persisted in the database, so
//! successive invocations walk history the same way the editor does.
//!
//! Set `RUST_LOG=folio_history=debug` to trace chain operations.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use folio_diff::visual_diff;
use folio_history::{
    DocumentId, HistoryConfig, HistoryController, HistoryDb, VersionReconstructor, VersionStore,
};

/// Inspect and maintain folio document history.
#[derive(Parser, Debug)]
#[command(name = "folio-history")]
#[command(about = "Inspect and maintain folio document history")]
struct Cli {
    /// History database (default: <data dir>/folio/history.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// RON config file (default: <config dir>/folio/history.ron)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List versions, newest first
    Log { document: String },
    /// Print the text of the version at an index (0 = newest)
    Show { document: String, index: usize },
    /// Line diff between two indices
    Diff {
        document: String,
        from: usize,
        to: usize,
    },
    /// Step the cursor back one version and print its text
    Undo { document: String },
    /// Step the cursor forward one version and print its text
    Redo { document: String },
    /// Move the cursor to a version by id prefix and print its text
    Jump { document: String, version: String },
    /// Show cursor and undo/redo availability
    Status { document: String },
    /// Clear redundant snapshots left by an interrupted write
    Repair { document: String },
    /// Apply the configured retention policy
    Prune { document: String },
    /// Hard-delete tombstoned versions of every document
    Purge,
    /// Record a file's content as a new edit against the current text
    Record { document: String, file: PathBuf },
}

type Controller = HistoryController<HistoryDb, HistoryDb>;

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(HistoryConfig::default_path);
    let config = HistoryConfig::load_or_default(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let db_path = cli.db.clone().unwrap_or_else(HistoryDb::default_path);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let db = HistoryDb::open(&db_path)
        .with_context(|| format!("opening history database {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "opened history database");

    let mut history = HistoryController::with_config(db.clone(), db, config);
    run(&mut history, cli.command)
}

fn run(history: &mut Controller, command: Command) -> Result<()> {
    match command {
        Command::Log { document } => log(history, &document.into()),
        Command::Show { document, index } => {
            let db = history.version_store();
            println!("{}", VersionReconstructor::new(db).reconstruct(&document.into(), index)?);
            Ok(())
        }
        Command::Diff { document, from, to } => {
            let document = DocumentId::from(document);
            let reconstructor = VersionReconstructor::new(history.version_store());
            let old = reconstructor.reconstruct(&document, from)?;
            let new = reconstructor.reconstruct(&document, to)?;
            for line in visual_diff(&old, &new) {
                println!("{}{}", line.kind.sigil(), line.content);
            }
            Ok(())
        }
        Command::Undo { document } => {
            print_move(history.undo(&document.into())?, "nothing to undo")
        }
        Command::Redo { document } => {
            print_move(history.redo(&document.into())?, "nothing to redo")
        }
        Command::Jump { document, version } => {
            let document = DocumentId::from(document);
            let matches: Vec<_> = history
                .version_store()
                .list_versions(&document)?
                .into_iter()
                .filter(|v| v.id.matches_hex_prefix(&version))
                .collect();
            let target = match matches.as_slice() {
                [one] => one.id,
                [] => bail!("no version of {document} matches {version}"),
                _ => bail!("{version} is ambiguous ({} matches)", matches.len()),
            };
            println!("{}", history.jump_to(&document, target)?);
            Ok(())
        }
        Command::Status { document } => {
            let status = history.status(&document.into())?;
            println!("versions: {}", status.version_count);
            println!("cursor:   {}", status.cursor);
            println!("undo:     {}", status.undo_steps);
            println!("redo:     {}", status.redo_steps);
            Ok(())
        }
        Command::Repair { document } => {
            let cleared = history.version_store().repair_snapshots(&document.into())?;
            println!("cleared {cleared} redundant snapshot(s)");
            Ok(())
        }
        Command::Prune { document } => {
            let removed = history.apply_retention(&document.into())?;
            println!("removed {removed} version(s)");
            Ok(())
        }
        Command::Purge => {
            let purged = history.version_store().purge_deleted()?;
            println!("purged {purged} tombstoned version(s)");
            Ok(())
        }
        Command::Record { document, file } => {
            let document = DocumentId::from(document);
            let new_text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let old_text = history.current_text(&document)?.unwrap_or_default();
            match history.record_edit(&document, &old_text, &new_text)? {
                Some(record) => println!("recorded {}", record.id.short()),
                None => println!("no changes"),
            }
            Ok(())
        }
    }
}

fn log(history: &mut Controller, document: &DocumentId) -> Result<()> {
    let current = history.status(document)?.cursor.index();
    let versions = history.version_store().list_versions(document)?;
    if versions.is_empty() {
        bail!("no history for {document}");
    }

    for (index, record) in versions.iter().enumerate() {
        let marker = if index == current { '*' } else { ' ' };
        let stats = match record.diff()? {
            Some(diff) => diff.stats().to_string(),
            None => "base".to_string(),
        };
        let snapshot = if record.has_snapshot() { " [snapshot]" } else { "" };
        println!(
            "{marker} {index:>4}  {}  {:>13}  {stats}{snapshot}",
            record.id.short(),
            record.created_at,
        );
    }
    Ok(())
}

fn print_move(text: Option<String>, unavailable: &str) -> Result<()> {
    match text {
        Some(text) => println!("{text}"),
        None => eprintln!("{unavailable}"),
    }
    Ok(())
}
