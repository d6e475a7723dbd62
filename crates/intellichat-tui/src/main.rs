use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use intellichat_core::{Config, HttpReplyFetcher, TurnController};
use tracing::{info, warn};

mod app;
mod handler;
mod observability;
mod tui;
mod ui;

use app::App;
use tui::{AppEvent, EventHandler};

#[derive(Parser)]
#[command(name = "intellichat")]
#[command(version, about = "Terminal client for the IntelliChat assistant")]
struct Cli {
    /// Backend base URL (overrides INTELLICHAT_URL and the config file)
    #[arg(long, global = true)]
    url: Option<String>,
    /// Write diagnostic logs here instead of the default log file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// Your message
        message: String,
    },
    /// Check whether the backend is up
    Health,
    /// Save settings to the config file
    Config {
        /// Backend base URL to use by default
        #[arg(long)]
        server_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = Config::load();

    match cli.command {
        None => {
            let configured_log = loaded.as_ref().ok().and_then(|c| c.log_file.clone());
            let log_path = match cli.log_file.or(configured_log) {
                Some(path) => path,
                None => observability::default_log_path()?,
            };
            observability::init_file(&log_path)?;

            let config = config_or_default(loaded);
            let server_url = config.resolve_server_url(cli.url.as_deref());
            let fetcher = HttpReplyFetcher::with_timeout(&server_url, config.request_timeout())?;
            run_tui(fetcher).await
        }
        Some(command) => {
            observability::init_stderr()?;

            let config = config_or_default(loaded);
            let server_url = config.resolve_server_url(cli.url.as_deref());
            match command {
                Commands::Ask { message } => {
                    let fetcher =
                        HttpReplyFetcher::with_timeout(&server_url, config.request_timeout())?;
                    ask(&fetcher, &message).await
                }
                Commands::Health => {
                    let fetcher =
                        HttpReplyFetcher::with_timeout(&server_url, config.request_timeout())?;
                    health(&fetcher).await
                }
                Commands::Config { server_url: url } => {
                    let path = Config::save_server_url(&url)?;
                    println!("Saved server URL to {}", path.display());
                    Ok(())
                }
            }
        }
    }
}

/// Fall back to defaults when the config file can't be read, but say so
fn config_or_default(loaded: Result<Config>) -> Config {
    loaded.unwrap_or_else(|err| {
        warn!(error = %err, "ignoring unreadable config file, using defaults");
        Config::new()
    })
}

async fn run_tui(fetcher: HttpReplyFetcher) -> Result<()> {
    info!(server = %fetcher.base_url(), "starting chat session");

    let mut events = EventHandler::new();

    // Probe backend health once; the result only drives the header badge
    let probe = fetcher.clone();
    let probe_tx = events.sender();
    tokio::spawn(async move {
        let online = match probe.health().await {
            Ok(status) => status.is_healthy(),
            Err(err) => {
                warn!(error = %err, "health probe failed");
                false
            }
        };
        let _ = probe_tx.send(AppEvent::Health(online));
    });

    let server_url = fetcher.base_url().to_string();
    let mut app = App::new(Arc::new(fetcher), server_url, events.sender());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    info!("chat session ended");
    result
}

async fn ask(fetcher: &HttpReplyFetcher, message: &str) -> Result<()> {
    let mut controller = TurnController::new();

    let reply = controller
        .submit(message, fetcher)
        .await
        .ok_or_else(|| anyhow!("Nothing to send: the message is empty"))?;

    println!("{}", reply.content());
    Ok(())
}

async fn health(fetcher: &HttpReplyFetcher) -> Result<()> {
    let status = fetcher
        .health()
        .await
        .with_context(|| format!("IntelliChat backend at {} is unreachable", fetcher.base_url()))?;

    if !status.is_healthy() {
        return Err(anyhow!(
            "{} at {} reports status {:?}",
            status.service,
            fetcher.base_url(),
            status.status
        ));
    }

    println!("{} at {}: {}", status.service, fetcher.base_url(), status.status);
    Ok(())
}
