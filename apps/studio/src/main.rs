use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{load_settings, SessionStore, Settings, Studio, TransformationClient};
use shared::domain::{Status, STORAGE_NAMESPACE};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "modamatch", about = "Transform catalogue photos with Gemini image editing")]
struct Cli {
    /// Settings file (defaults to ./modamatch.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the stored prompt and original image.
    Status,
    /// Load an image (max 5 MiB) as the new original.
    Upload { path: PathBuf },
    /// Show the prompt, or replace it with TEXT.
    Prompt {
        text: Option<String>,
        #[arg(long, conflicts_with = "text")]
        reset: bool,
    },
    /// Forget the stored original image.
    Clear,
    /// Forget everything stored for this application.
    Reset,
    /// Transform the original image and save the result.
    Generate {
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = resolve_settings(&cli)?;
    let storage = Storage::with_quota(&settings.database_url, settings.storage_quota_bytes)
        .await
        .with_context(|| format!("failed to open storage at '{}'", settings.database_url))?;

    let client = TransformationClient::from_settings(&settings)?;
    let mut studio = Studio::open(SessionStore::new(Arc::new(storage.clone())), client).await;

    match cli.command {
        Command::Status => print_status(&studio, &storage),
        Command::Upload { path } => {
            if let Err(err) = studio.select_file(&path).await {
                eprintln!("{err}");
                return Ok(ExitCode::FAILURE);
            }
            if !studio.original_persisted().await {
                eprintln!(
                    "{} was loaded but could not be stored (limit {} bytes); it will not be available to `generate`.",
                    path.display(),
                    storage.quota_bytes()
                );
                return Ok(ExitCode::FAILURE);
            }
            println!("Loaded {}", path.display());
            print_status(&studio, &storage);
        }
        Command::Prompt { text, reset } => {
            if reset {
                studio.reset_prompt().await;
            } else if let Some(text) = text {
                studio.edit_prompt(text).await;
            }
            println!("{}", studio.session().prompt);
        }
        Command::Clear => {
            studio.clear_image().await;
            println!("Original image cleared.");
        }
        Command::Reset => {
            let removed = storage.clear_prefix(STORAGE_NAMESPACE).await?;
            println!("Cleared {removed} stored value(s).");
        }
        Command::Generate { output_dir } => return generate(&mut studio, &output_dir).await,
    }

    Ok(ExitCode::SUCCESS)
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(url) = &cli.database_url {
        settings.database_url = client_core::config::normalize_database_url(url);
    }
    if let Some(key) = &cli.api_key {
        settings.api_key = Some(key.clone());
    }
    if let Some(model) = &cli.model {
        settings.model = model.clone();
    }
    Ok(settings)
}

async fn generate(studio: &mut Studio, output_dir: &std::path::Path) -> Result<ExitCode> {
    if studio.session().original_image.is_none() {
        eprintln!("No original image loaded; run `modamatch upload <path>` first.");
        return Ok(ExitCode::FAILURE);
    }

    eprintln!("Analizando patrón de ropa y generando nueva imagen...");
    match studio.generate().await {
        Status::Success => {
            let path = studio.export_result(output_dir).await?;
            info!(path = %path.display(), "transformation finished");
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        status => {
            let message = studio
                .session()
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| format!("generation ended in status {status}"));
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_status(studio: &Studio, storage: &Storage) {
    let session = studio.session();
    println!("status: {}", session.status);
    println!("prompt: {}", session.prompt);
    match &session.original_image {
        Some(image) => println!(
            "original: {} ({} encoded bytes)",
            image.media_type(),
            image.as_str().len()
        ),
        None => println!("original: none"),
    }
    println!("model: {}", studio.client().model());
    println!("storage limit: {} bytes", storage.quota_bytes());
    println!(
        "credential: {}",
        if studio.client().has_credential() {
            "configured"
        } else {
            "missing"
        }
    );
}
