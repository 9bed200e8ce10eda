//! Command-line surface of the `hibiscus` binary.

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{
    db::{
        models::{Document, DocumentKind, HighlightColor},
        Database,
    },
    focus::FocusEvent,
    highlights::{BlockKind, RenderedBlock, Segment},
    persistence::Persistence,
    reader::{Reader, ReaderView},
    session::FlushOutcome,
    settings::{SettingsStore, StudySettings},
};

/// Hibiscus: highlight study material and track focused reading time.
#[derive(Debug, Parser)]
#[command(name = "hibiscus", version)]
pub struct Cli {
    /// Directory holding the database and settings file.
    #[arg(long, global = true, default_value = ".hibiscus")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import a UTF-8 text or markdown file as a document.
    Import {
        path: PathBuf,

        /// Defaults to the file name.
        #[arg(long)]
        title: Option<String>,

        /// `text`, `pdf` or `url`; only records where the text came from.
        #[arg(long, default_value = "text")]
        kind: String,
    },

    /// List imported documents, newest first.
    Documents,

    /// Save a highlight on a document.
    Highlight {
        document_id: String,
        text: String,

        /// `yellow`, `green` or `blue`. Falls back to the configured default.
        #[arg(long)]
        color: Option<String>,

        /// Comma-separated labels.
        #[arg(long, default_value = "")]
        tags: String,
    },

    /// List highlights, newest first, optionally for one document.
    Highlights {
        #[arg(long)]
        document: Option<String>,
    },

    /// Delete a single highlight.
    Unhighlight { highlight_id: String },

    /// Render a document with its highlights and time the session until Ctrl-C.
    Read { document_id: String },

    /// Aggregate study numbers.
    Stats,

    /// Delete a document with its highlights and sessions.
    Delete { document_id: String },

    /// Show the study settings, changing any that are given.
    Settings(SettingsArgs),
}

#[derive(Debug, Default, clap::Args)]
pub struct SettingsArgs {
    /// Seconds of study between confusion check-ins; 0 disables them.
    #[arg(long)]
    pub nudge_interval: Option<u64>,

    /// Sessions shorter than this many seconds are not saved.
    #[arg(long)]
    pub min_session: Option<u64>,

    #[arg(long)]
    pub default_color: Option<String>,
}

pub(crate) struct CliContext {
    pub(crate) db: Database,
    pub(crate) settings: SettingsStore,
}

impl CliContext {
    fn study(&self) -> StudySettings {
        self.settings.study().with_env_overrides()
    }
}

pub(crate) async fn dispatch(ctx: CliContext, command: Commands) -> Result<()> {
    match command {
        Commands::Import { path, title, kind } => import(&ctx, path, title, &kind).await,
        Commands::Documents => list_documents(&ctx).await,
        Commands::Highlight {
            document_id,
            text,
            color,
            tags,
        } => highlight(&ctx, &document_id, &text, color.as_deref(), &tags).await,
        Commands::Highlights { document } => list_highlights(&ctx, document.as_deref()).await,
        Commands::Unhighlight { highlight_id } => {
            ctx.db.delete_highlight(&highlight_id).await?;
            println!("Deleted highlight {highlight_id}");
            Ok(())
        }
        Commands::Read { document_id } => read(&ctx, &document_id).await,
        Commands::Stats => stats(&ctx).await,
        Commands::Delete { document_id } => {
            ctx.db.delete_document_cascade(&document_id).await?;
            println!("Deleted document {document_id}");
            Ok(())
        }
        Commands::Settings(args) => {
            let study = update_settings(&ctx.settings, args)?;
            println!("{}", serde_json::to_string_pretty(&study)?);
            Ok(())
        }
    }
}

fn update_settings(store: &SettingsStore, args: SettingsArgs) -> Result<StudySettings> {
    let mut study = store.study();
    let mut changed = false;

    if let Some(secs) = args.nudge_interval {
        study.nudge_interval_secs = secs;
        changed = true;
    }
    if let Some(secs) = args.min_session {
        study.min_session_secs = secs;
        changed = true;
    }
    if let Some(raw) = args.default_color {
        study.default_color = raw.parse().map_err(|err: String| anyhow!(err))?;
        changed = true;
    }

    if changed {
        store.update_study(study.clone())?;
    }
    Ok(study)
}

async fn import(ctx: &CliContext, path: PathBuf, title: Option<String>, kind: &str) -> Result<()> {
    let kind: DocumentKind = kind.parse().map_err(|err: String| anyhow!(err))?;
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {} as UTF-8 text", path.display()))?;

    let title = match title {
        Some(title) if !title.trim().is_empty() => title.trim().to_string(),
        _ => path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("cannot derive a title from {}", path.display()))?,
    };

    let document = Document {
        id: Uuid::new_v4().to_string(),
        title,
        content,
        kind,
        created_at: Utc::now(),
    };
    ctx.db.insert_document(&document).await?;

    println!("{}\t{}", document.id, document.title);
    Ok(())
}

async fn list_documents(ctx: &CliContext) -> Result<()> {
    for document in ctx.db.list_documents().await? {
        println!(
            "{}\t{}\t{}\t{}",
            document.id,
            document.kind,
            document.created_at.format("%Y-%m-%d %H:%M"),
            document.title
        );
    }
    Ok(())
}

async fn highlight(
    ctx: &CliContext,
    document_id: &str,
    text: &str,
    color: Option<&str>,
    tags: &str,
) -> Result<()> {
    let color = color
        .map(|raw| raw.parse::<HighlightColor>().map_err(|err| anyhow!(err)))
        .transpose()?;

    let persistence: Arc<dyn Persistence> = Arc::new(ctx.db.clone());
    let mut reader = Reader::open(document_id, persistence, &ctx.study()).await?;
    let saved = reader.add_highlight(text, color, tags)?.confirmed().await?;

    println!("{}\t{}\t{}", saved.id, saved.color, saved.text);
    Ok(())
}

async fn list_highlights(ctx: &CliContext, document_id: Option<&str>) -> Result<()> {
    let highlights = match document_id {
        Some(document_id) => {
            let mut highlights = ctx.db.get_highlights_for_document(document_id).await?;
            highlights.reverse();
            highlights
        }
        None => ctx.db.list_highlights().await?,
    };

    for highlight in highlights {
        println!(
            "{}\t{}\t{}\t[{}]\t{}",
            highlight.id,
            highlight.document_id,
            highlight.color,
            highlight.tags.to_delimited(),
            highlight.text
        );
    }
    Ok(())
}

fn print_block(block: &RenderedBlock<'_, '_>) {
    let prefix = match block.kind {
        BlockKind::Heading(level) => format!("{} ", "#".repeat(level as usize)),
        BlockKind::ListItem => "* ".to_string(),
        BlockKind::Paragraph => String::new(),
    };

    let body: String = block
        .segments
        .iter()
        .map(|segment| match segment {
            Segment::Plain(text) => (*text).to_string(),
            Segment::Marked { text, .. } => format!("[[{text}]]"),
        })
        .collect();

    println!("{prefix}{body}\n");
}

async fn read(ctx: &CliContext, document_id: &str) -> Result<()> {
    let persistence: Arc<dyn Persistence> = Arc::new(ctx.db.clone());
    let reader = Reader::open(document_id, persistence, &ctx.study()).await?;

    match reader.render() {
        ReaderView::Empty => bail!("document {document_id} has no content"),
        ReaderView::Binary => bail!("document {document_id} was never converted to text"),
        ReaderView::Blocks(blocks) => blocks.iter().for_each(print_block),
    }

    let mut events = reader.tracker().subscribe();
    reader.start()?;
    eprintln!("Reading. Press Ctrl-C to finish the session.");

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(FocusEvent::ConfusionNudge { elapsed_seconds }) => eprintln!(
                    "{} minutes on this page. Stuck? Try simplifying a passage.",
                    elapsed_seconds / 60
                ),
                Ok(FocusEvent::Stopped { .. }) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    let (snapshot, outcome) = reader.close();
    let _ = printer.await;

    match outcome {
        FlushOutcome::Submitted { record, handle } => {
            // The process is about to exit; let the save land first.
            if handle.await.unwrap_or(false) {
                println!(
                    "Session saved: {}s, {} distractions",
                    record.duration_seconds, record.distraction_count
                );
            } else {
                eprintln!("Session could not be saved; see the log for details");
            }
        }
        FlushOutcome::Skipped { elapsed_seconds } => {
            println!("Session too short to save ({elapsed_seconds}s)");
        }
        FlushOutcome::AlreadyFlushed => {}
    }
    log::debug!("final focus snapshot: {snapshot:?}");
    Ok(())
}

async fn stats(ctx: &CliContext) -> Result<()> {
    let stats = ctx.db.study_stats().await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
