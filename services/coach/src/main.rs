use anyhow::{Context, Result};
use clap::Parser;
use mindlink_coach::config::Config;
use mindlink_coach::console::{self, ConsoleInput};
use mindlink_coach::export;
use mindlink_core::SessionEvent;
use mindlink_core::backend::{HttpBackend, PatientBackend};
use mindlink_core::bloom::BloomLevel;
use mindlink_core::session::{SessionController, SkipReason, TurnResult};
use mindlink_core::speech::{ElevenLabsClient, SpeechSynthesizer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;

/// Practice a CBT session with a simulated patient.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Starting Bloom level (overrides BLOOM_START_LEVEL)
    #[arg(long)]
    start_level: Option<BloomLevel>,
    /// Directory for session exports and audio (overrides EXPORT_DIR)
    #[arg(long)]
    export_dir: Option<PathBuf>,
    /// Start with spoken replies turned off
    #[arg(long)]
    no_voice: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Configuration loaded successfully. Starting MindLink coach...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    if let Some(level) = args.start_level {
        config = config.with_start_level(level);
    }
    let export_dir = args.export_dir.unwrap_or_else(|| config.export_dir.clone());

    // --- 4. Initialize API Clients ---
    let backend = HttpBackend::new(&config.backend_url, config.request_timeout)
        .context("Failed to build backend HTTP client")?;
    match backend.health().await {
        Ok(()) => tracing::info!("Connected to backend at {}", backend.base_url()),
        Err(e) => tracing::warn!("Backend health check failed, continuing anyway: {e}"),
    }

    let speech: Option<Arc<dyn SpeechSynthesizer>> = match config.elevenlabs_api_key.take() {
        Some(key) => {
            let client = ElevenLabsClient::new(key, config.request_timeout)
                .context("Failed to build ElevenLabs HTTP client")?;
            Some(Arc::new(client))
        }
        None => None,
    };
    if speech.is_none() {
        tracing::info!("ELEVENLABS_API_KEY not set, patient replies will not be spoken.");
    }

    // --- 5. Session Setup ---
    let (event_tx, event_rx) = tokio::sync::mpsc::channel::<SessionEvent>(64);
    let session = SessionController::new(config.engine, backend, speech, event_tx);
    if args.no_voice {
        session.set_voice_enabled(false);
    }
    let renderer = tokio::spawn(console::render_events(event_rx, export_dir.clone()));

    let opening = session.snapshot().await;
    println!("MindLink: CBT Coach Simulation (type /help for commands)");
    if let Some(seed) = opening.messages().first() {
        println!("Patient: {}", seed.content);
    }
    println!("Hint: {}", opening.hint);

    // --- 6. Input Loop ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down...");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        match console::parse_input(&line) {
            ConsoleInput::Say(text) => match session.submit_turn(&text).await {
                TurnResult::Skipped(SkipReason::Busy) => {
                    println!("Still waiting for the patient, please hold on.")
                }
                TurnResult::Skipped(SkipReason::EmptyInput) => {}
                TurnResult::Processed(report) => {
                    tracing::debug!(?report, "turn processed");
                }
            },
            ConsoleInput::Level(level) => {
                session.select_bloom_level(level).await;
                println!("Bloom level set to {level}.");
            }
            ConsoleInput::Dismiss => session.dismiss_recap().await,
            ConsoleInput::Voice => {
                let enabled = session.set_voice_enabled(!session.voice_enabled());
                println!("Voice {}.", if enabled { "enabled" } else { "disabled" });
            }
            ConsoleInput::Status => println!("{}", console::render_status(&session.snapshot().await)),
            ConsoleInput::Save => match export::write_export(&export_dir, &session.export().await) {
                Ok(path) => println!("Session saved to {}", path.display()),
                Err(e) => tracing::error!("Failed to save session: {e:#}"),
            },
            ConsoleInput::Help => println!("{}", console::HELP),
            ConsoleInput::Quit => break,
            ConsoleInput::Invalid(message) => println!("{message}"),
        }
    }

    // --- 7. Shutdown ---
    let final_export = session.end().await;
    let path = export::write_export(&export_dir, &final_export)
        .context("Failed to write final session export")?;
    println!("Session saved to {}", path.display());

    drop(session);
    if let Err(e) = renderer.await {
        tracing::warn!("Event renderer stopped abnormally: {e}");
    }
    tracing::info!("Shutting down...");
    Ok(())
}
