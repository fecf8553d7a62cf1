use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use filechat_core::{is_accepted_path, Attachment, Config, SubmissionController, UploadClient};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod markdown;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "filechat")]
#[command(about = "Chat with an assistant service, optionally attaching a CSV or image")]
struct Cli {
    /// Base URL of the assistant service
    #[arg(long, env = "FILECHAT_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Remember --endpoint in the config file
    #[arg(long, requires = "endpoint")]
    save_endpoint: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Ask {
        /// Your message (may be omitted when a file is attached)
        prompt: Option<String>,
        /// CSV or image file to attach
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// File logging, since the terminal belongs to the UI. Filter with FILECHAT_LOG.
fn init_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join("filechat");
    std::fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("filechat.log"))?;

    let filter = EnvFilter::try_from_env("FILECHAT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not load config, using defaults");
        Config::new()
    });
    if cli.save_endpoint {
        if let Some(endpoint) = &cli.endpoint {
            Config::save_endpoint(endpoint)?;
        }
    }

    let endpoint = config.resolve_endpoint(cli.endpoint.as_deref());
    tracing::info!(endpoint = %endpoint, "starting");
    let client = UploadClient::new(&endpoint)?;
    let controller = SubmissionController::new(Arc::new(client));

    match cli.command {
        Some(Commands::Ask { prompt, file }) => ask(controller, prompt, file).await,
        None => run_tui(App::new(controller, endpoint)).await,
    }
}

async fn ask(
    mut controller: SubmissionController,
    prompt: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    if let Some(prompt) = prompt {
        controller.set_text(prompt);
    }
    if let Some(path) = file {
        if !is_accepted_path(&path) {
            bail!("Only CSV or image files can be attached: {}", path.display());
        }
        controller.set_file(Some(Attachment::from_path(&path).await?));
    }

    if let Err(err) = controller.submit().await {
        bail!("{}", err);
    }

    if let Some(reply) = controller.transcript().last() {
        println!("{}", reply.content);
    }
    Ok(())
}

async fn run_tui(mut app: App) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await?,
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.abort_submission();
    tui::restore()?;
    result
}
