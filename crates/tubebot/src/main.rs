use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use tubecore::core::config::{PipelineSettings, Settings};
use tubecore::core::logging::init_logger;
use tubecore::core::utils::bytes_to_mb;
use tubecore::core::validation::parse_video_url;
use tubecore::ytdlp::{YtDlpCatalog, YtDlpRetriever};
use tubecore::{CandidateSelector, DownloadOrchestrator, InteractionFlow, SelectionChoice};

mod cli;
mod telegram;

use cli::{Cli, Commands};
use telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramGateway};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let log_file = std::env::var("LOG_FILE_PATH").ok().filter(|p| !p.trim().is_empty());
    init_logger(log_file.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            // Fail fast: nothing connects before the token is known
            let settings = Settings::from_env()?;
            run_bot(settings).await
        }
        Commands::Info { url, json } => run_info(&url, json).await,
        Commands::Download {
            url,
            format,
            audio,
            output,
        } => run_download(&url, format, audio, &output).await,
    }
}

fn build_orchestrator(settings: &PipelineSettings, shutdown: CancellationToken) -> Result<DownloadOrchestrator> {
    let catalog = Arc::new(YtDlpCatalog::from_settings(settings));
    let retriever = Arc::new(YtDlpRetriever::from_settings(settings));
    Ok(DownloadOrchestrator::new(catalog, retriever, settings.clone())?.with_shutdown(shutdown))
}

async fn run_bot(settings: Settings) -> Result<()> {
    log::info!("Starting bot...");
    let bot = create_bot(&settings)?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to register bot commands: {}", e);
    }

    let shutdown = CancellationToken::new();
    let tasks = TaskTracker::new();
    let orchestrator = build_orchestrator(&settings.pipeline, shutdown.clone())?;
    let gateway = Arc::new(TelegramGateway::new(bot.clone()));
    let flow = Arc::new(InteractionFlow::new(gateway, orchestrator));
    let deps = HandlerDeps::new(flow.clone(), tasks.clone());

    log::info!(
        "Size ceiling {} MB, working directory {}",
        bytes_to_mb(settings.pipeline.max_video_size_bytes),
        settings.pipeline.download_folder.display()
    );

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher stopped, cancelling {} in-flight download(s)", tasks.len());
    shutdown.cancel();
    tasks.close();
    tasks.wait().await;
    flow.orchestrator().sessions().clear().await;
    log::info!("Shutdown complete");
    Ok(())
}

async fn run_info(raw_url: &str, json: bool) -> Result<()> {
    let settings = PipelineSettings::from_env();
    let url = parse_video_url(raw_url).ok_or_else(|| anyhow!("Not a YouTube link: {}", raw_url))?;
    let orchestrator = build_orchestrator(&settings, CancellationToken::new())?;

    let (metadata, candidates) = orchestrator.list_formats(&url).await?;

    if json {
        let out = serde_json::json!({
            "title": metadata.title,
            "author": metadata.author,
            "duration_seconds": metadata.duration_seconds,
            "thumbnail_url": metadata.thumbnail_url,
            "formats": candidates,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} by {} ({}s)", metadata.title, metadata.author, metadata.duration_seconds);
    println!("  audio_only  🎧 Audio Only");
    for candidate in &candidates {
        println!("  {:<20}  {}", candidate.id, CandidateSelector::button_label(candidate));
    }
    Ok(())
}

async fn run_download(raw_url: &str, format: Option<String>, audio: bool, output: &Path) -> Result<()> {
    let settings = PipelineSettings::from_env();
    let url = parse_video_url(raw_url).ok_or_else(|| anyhow!("Not a YouTube link: {}", raw_url))?;

    let shutdown = CancellationToken::new();
    let orchestrator = build_orchestrator(&settings, shutdown.clone())?;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping download");
            shutdown.cancel();
        }
    });

    let (_, candidates) = orchestrator.list_formats(&url).await?;
    let choice = match (audio, format) {
        (true, _) => SelectionChoice::AudioOnly,
        (false, Some(id)) => SelectionChoice::Format(id),
        (false, None) => SelectionChoice::Format(
            candidates
                .first()
                .map(|c| c.id.clone())
                .ok_or_else(|| anyhow!("No video formats with a known size; try --audio"))?,
        ),
    };

    let retrieved = orchestrator.retrieve(&url, &candidates, &choice, "cli").await?;
    let size = retrieved.artifact.size_bytes();
    let saved = retrieved.artifact.persist(output).await?;

    match retrieved.candidate {
        Some(c) => println!(
            "Saved {} ({} MB, format {} after {} attempt(s))",
            saved.display(),
            bytes_to_mb(size),
            c.id,
            retrieved.attempts
        ),
        None => println!("Saved {} ({} MB)", saved.display(), bytes_to_mb(size)),
    }
    Ok(())
}
