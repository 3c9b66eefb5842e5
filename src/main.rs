//! Binary entry point for gugo-engage.
//!
//! Every command prints JSON on stdout; logs go to stderr or the
//! configured log file.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gugo_engage::models::SettingsUpdate;
use gugo_engage::observability::{self, LoggingConfig};
use gugo_engage::services::MemeEdit;
use gugo_engage::{
    AppConfig, ImageProviderKind, ImageService, MemeAnalysisModel, MemeAnalysisService, MemeId,
    MemeLibrary, MemeMatcher, ReplyService, SettingsStore, SqliteStore, TextProviderKind,
    TweetContext,
};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Gugo engage - meme matching and AI replies for tweets.
#[derive(Parser)]
#[command(name = "gugo-engage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "GUGO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Find the best memes for a tweet.
    Match {
        /// Tweet text.
        #[arg(short, long)]
        text: String,

        /// Tweet author handle.
        #[arg(short, long, default_value = "")]
        author: String,

        /// Seed for the random fallback.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Draft reply suggestions for a tweet.
    Reply {
        /// Tweet text.
        #[arg(short, long)]
        text: String,

        /// Tweet author handle.
        #[arg(short, long)]
        author: String,
    },

    /// Generate a composite image.
    Image {
        /// Image prompt.
        #[arg(short, long)]
        prompt: String,

        /// Optional base image.
        #[arg(short, long)]
        base_image: Option<PathBuf>,
    },

    /// Manage the meme library.
    Memes {
        #[command(subcommand)]
        action: MemesAction,
    },

    /// Describe and tag memes with the configured vision backend.
    Analyze {
        /// Meme ID to analyze.
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        id: Option<String>,

        /// Analyze every unanalyzed meme.
        #[arg(long)]
        all: bool,
    },

    /// Show or change provider settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

/// Meme library commands.
#[derive(Subcommand)]
enum MemesAction {
    /// List memes, newest first.
    List,

    /// Copy image files or download image URLs into the library.
    Import {
        /// Image files or http(s) URLs (png, jpg, jpeg, gif, webp).
        #[arg(required = true)]
        sources: Vec<String>,
    },

    /// Edit a meme's description or tags.
    Edit {
        /// Meme ID.
        id: String,

        /// New description (empty to clear).
        #[arg(short, long)]
        description: Option<String>,

        /// Replacement tags (comma-separated).
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// Mark a meme for re-analysis.
    Reset {
        /// Meme ID.
        id: String,
    },

    /// Delete a meme and its file.
    Delete {
        /// Meme ID.
        id: String,
    },
}

/// Settings commands.
#[derive(Subcommand)]
enum SettingsAction {
    /// Print current settings.
    Show,

    /// Change one or more providers.
    Set {
        /// Reply backend: local, deepseek, openai, anthropic.
        #[arg(long, value_parser = TextProviderKind::parse)]
        text_provider: Option<TextProviderKind>,

        /// Image backend: together, openai, stability, replicate.
        #[arg(long, value_parser = ImageProviderKind::parse)]
        image_provider: Option<ImageProviderKind>,

        /// Meme ranking backend: local, deepseek, openai, anthropic.
        #[arg(long, value_parser = TextProviderKind::parse)]
        meme_match_model: Option<TextProviderKind>,

        /// Meme analysis backend: local, openai, deepseek.
        #[arg(long, value_parser = MemeAnalysisModel::parse)]
        meme_analysis_model: Option<MemeAnalysisModel>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&LoggingConfig::from_settings(&config.logging, cli.verbose))
    {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Match { text, author, seed } => cmd_match(config, text, author, seed),
        Commands::Reply { text, author } => {
            let replies = ReplyService::from_config(config)?.generate(&text, &author)?;
            print_json(&replies)
        },
        Commands::Image { prompt, base_image } => {
            let image = ImageService::from_config(config)?.generate(&prompt, base_image.as_deref())?;
            print_json(&image)
        },
        Commands::Memes { action } => cmd_memes(config, action),
        Commands::Analyze { id, all: _ } => cmd_analyze(config, id),
        Commands::Settings { action } => cmd_settings(config, action),
    }
}

fn cmd_match(config: &AppConfig, text: String, author: String, seed: Option<u64>) -> Result<()> {
    let mut matcher = MemeMatcher::from_config(config)?;
    if let Some(seed) = seed {
        matcher = matcher.with_seed(seed);
    }
    let result = matcher.find_matches(&TweetContext::new(text, author))?;
    print_json(&result)
}

fn cmd_memes(config: &AppConfig, action: MemesAction) -> Result<()> {
    let library = MemeLibrary::from_config(config)?;
    match action {
        MemesAction::List => print_json(&library.list()?),
        MemesAction::Import { sources } => {
            let imported = sources
                .iter()
                .map(|source| {
                    let result = if source.starts_with("http://") || source.starts_with("https://") {
                        library.import_url(source)
                    } else {
                        library.import(Path::new(source))
                    };
                    result.with_context(|| format!("importing {source}"))
                })
                .collect::<Result<Vec<_>>>()?;
            print_json(&imported)
        },
        MemesAction::Edit {
            id,
            description,
            tags,
        } => {
            let edit = MemeEdit { description, tags };
            print_json(&library.edit(&MemeId::new(id), &edit)?)
        },
        MemesAction::Reset { id } => print_json(&library.reset(&MemeId::new(id))?),
        MemesAction::Delete { id } => print_json(&library.delete(&MemeId::new(id))?),
    }
}

fn cmd_analyze(config: &AppConfig, id: Option<String>) -> Result<()> {
    let service = MemeAnalysisService::from_config(config)?;
    match id {
        Some(id) => {
            let (meme, analysis) = service.analyze_one(&MemeId::new(id))?;
            print_json(&serde_json::json!({ "meme": meme, "analysis": analysis }))
        },
        None => print_json(&service.analyze_all()?),
    }
}

fn cmd_settings(config: &AppConfig, action: SettingsAction) -> Result<()> {
    let store = SqliteStore::new(config.database_path())?;
    match action {
        SettingsAction::Show => print_json(&store.get_or_create_default()?),
        SettingsAction::Set {
            text_provider,
            image_provider,
            meme_match_model,
            meme_analysis_model,
        } => {
            let update = SettingsUpdate {
                text_provider,
                image_provider,
                meme_match_model,
                meme_analysis_model,
            };
            if update.is_empty() {
                anyhow::bail!("nothing to update; pass at least one provider flag");
            }
            print_json(&store.update_settings(&update)?)
        },
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("writing JSON output")?;
    writeln!(stdout)?;
    Ok(())
}
