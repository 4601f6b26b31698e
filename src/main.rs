use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

mod api;
mod app;
mod chat;
mod config;
mod document;
mod error;
mod gateway;
mod handler;
mod logger;
mod server;
mod toolbar;
mod tui;
mod ui;

use api::ApiClient;
use app::App;
use config::Config;
use logger::LogTarget;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "draftpad")]
#[command(version, about = "Terminal document editor with an AI selection toolbar and chat sidebar")]
struct Cli {
    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the editor (default)
    Edit {
        /// Use an already running proxy instead of starting one
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Run the chat/search proxy on its own
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Write a default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level: log::LevelFilter = cli
        .log_level
        .parse()
        .map_err(|_| anyhow!("Unknown log level: {}", cli.log_level))?;
    let config = Config::load().context("Failed to load config")?;
    let log_path = logger::default_log_path()?;

    match cli.command.unwrap_or(Commands::Edit { endpoint: None }) {
        Commands::Edit { endpoint } => {
            logger::setup_logger(level, LogTarget::FileOnly, &log_path)?;
            run_editor(config, endpoint).await
        }
        Commands::Serve { listen } => {
            logger::setup_logger(level, LogTarget::ConsoleAndFile, &log_path)?;
            run_proxy(config, listen).await
        }
        Commands::Init => {
            config.save()?;
            println!("Wrote {}", Config::get_config_path()?.display());
            Ok(())
        }
    }
}

async fn run_proxy(config: Config, listen: Option<SocketAddr>) -> Result<()> {
    let addr = match listen {
        Some(addr) => addr,
        None => config.listen.parse().context("Invalid listen address in config")?,
    };
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    server::serve(listener, config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
        }
        log::info!("Shutdown requested");
    })
    .await
}

async fn run_editor(config: Config, endpoint: Option<String>) -> Result<()> {
    // The embedded proxy lives as long as the editor does
    let base_url = match endpoint.or_else(|| config.endpoint.clone()) {
        Some(url) => url,
        None => {
            let (addr, _handle) = server::spawn_local(config.clone()).await?;
            format!("http://{}", addr)
        }
    };
    log::info!("Editor using proxy at {}", base_url);

    let mut events = EventHandler::new();
    let mut app = App::new(config, ApiClient::new(&base_url), events.sender());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event)?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}
