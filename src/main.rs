//! VoxChat - voice-enabled chat client
//!
//! Main entry point.

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voxchat::chat::{ChatSession, ScriptedBackend};
use voxchat::config::AppConfig;
use voxchat::controller::AppController;
use voxchat::speech::{open_platform, SpeechAdapter};
use voxchat::ui::{Theme, VoxChatApp};

#[derive(Parser, Debug)]
#[command(name = "voxchat", version, about = "Voice-enabled chat client")]
struct Args {
    /// Config file (default: <config dir>/voxchat/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat backend base URL, e.g. http://localhost:3001 (overrides VOXCHAT_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    /// Skip the voice training wizard
    #[arg(long)]
    skip_training: bool,

    /// Answer locally with an echo backend instead of calling the server
    #[arg(long)]
    offline: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxchat=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = args.backend_url {
        config = config.with_backend_url(url);
    }
    if args.skip_training {
        config = config.with_skip_training(true);
    }
    config.validate().context("Invalid configuration")?;

    info!("Starting VoxChat");

    let chat = if args.offline {
        info!("Offline mode: replies are echoed locally");
        ChatSession::new(Arc::new(ScriptedBackend::echo()), &config.backend)
    } else {
        ChatSession::from_config(&config.backend)
    }
    .context("Failed to start chat session")?;

    let speech = SpeechAdapter::new(open_platform(&config.speech));
    let controller = AppController::new(chat, speech, &config);
    let theme = Theme::from_choice(config.ui.theme);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_min_inner_size([420.0, 360.0])
            .with_title("VoxChat"),
        ..Default::default()
    };

    eframe::run_native(
        "VoxChat",
        options,
        Box::new(move |cc| Ok(Box::new(VoxChatApp::new(cc, controller, theme)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}
