use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use pet_core::Config;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "desktop-pet")]
#[command(about = "Chat with an expressive desktop pet powered by Gemini")]
struct Cli {
    /// Read settings from this file instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model setting (*.model3.json) whose expressions the avatar uses
    #[arg(long)]
    model_setting: Option<PathBuf>,

    /// Override the Gemini model name
    #[arg(short, long)]
    model: Option<String>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

fn load_config(cli: &Cli) -> Config {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {e:#}");
        Config::new()
    });

    if let Some(path) = &cli.model_setting {
        config.model_setting = Some(path.clone());
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.debug)?;

    let config = load_config(&cli);
    info!(model = %config.model, key = ?config.key_source(), "Starting desktop-pet");

    let mut app = App::new(&config)?;
    app.session.start();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    app.session.shutdown().await;
    info!("Exited cleanly");
    result
}

async fn run(app: &mut App, terminal: &mut tui::Tui, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
