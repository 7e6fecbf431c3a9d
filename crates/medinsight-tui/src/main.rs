use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use medinsight_core::auth::firebase::clear_session_file;
use medinsight_core::{
    Author, Config, ExchangeController, FirebaseAuth, InferenceClient, MemorySessionProvider,
    SessionProvider, SubmitOutcome,
};
use std::sync::Arc;
use tracing::{error, info};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "medinsight")]
#[command(version, about = "Terminal chat client for evidence-based medical questions")]
struct Cli {
    /// Inference backend base URL (overrides config and MEDINSIGHT_BACKEND_URL)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Skip the identity provider and use a throwaway local account store
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Check that the inference backend is reachable
    Ping,
    /// Forget the saved sign-in
    Logout,
    /// Show where configuration lives and the values in effect
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = &cli.backend {
        config.backend_url = url.clone();
    }

    let log_path = logging::init(&Config::log_dir()?, config.log_level.as_deref())?;
    info!(backend = %config.backend_url, log = %log_path.display(), "starting");

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(&config, cli.offline).await,
        Commands::Ask { question } => ask_once(&config, cli.offline, &question).await,
        Commands::Ping => ping(&config).await,
        Commands::Logout => logout(),
        Commands::Config => show_config(&config),
    }
}

fn build_session(config: &Config, offline: bool) -> Result<Box<dyn SessionProvider>> {
    if offline {
        return Ok(Box::new(MemorySessionProvider::new()));
    }
    let api_key = config.firebase_api_key.as_deref().ok_or_else(|| {
        anyhow!(
            "No identity provider key configured. Set FIREBASE_API_KEY, add \
             firebase_api_key to {}, or run with --offline",
            Config::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        )
    })?;
    Ok(Box::new(
        FirebaseAuth::new(api_key).with_session_file(Config::session_path()?),
    ))
}

fn build_controller(config: &Config) -> ExchangeController {
    let backend = Arc::new(InferenceClient::new(&config.backend_url));
    ExchangeController::new(backend).with_timeout(config.request_timeout())
}

async fn run_chat(config: &Config, offline: bool) -> Result<()> {
    let session = build_session(config, offline)?;
    let mut app = App::new(session, build_controller(config));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new(tui::TICK_RATE);

    let result: Result<()> = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            // Drawn once with the loading label before the request blocks
            if app.auth_request.is_some() {
                app.run_auth_request().await;
                continue;
            }

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
            app.poll_exchange().await;
        }
        Ok(())
    }
    .await;

    tui::restore()?;
    if let Err(e) = &result {
        error!(error = %e, "chat loop ended with error");
    }
    info!(turns = app.turns().len(), "chat closed");
    result
}

async fn ask_once(config: &Config, offline: bool, question: &str) -> Result<()> {
    if !offline {
        let session = build_session(config, offline)?;
        if session.current_user().is_none() {
            println!(
                "{}",
                "Not signed in. Run `medinsight` to sign in first, or pass --offline.".yellow()
            );
            return Ok(());
        }
    }

    println!("{} {}\n", "Asking".bold().cyan(), config.backend_url.dimmed());

    let mut controller = build_controller(config);
    let outcome = controller.submit(question).await;
    if let SubmitOutcome::Ignored(_) = outcome {
        println!("{}", "Nothing to ask: the question is empty.".yellow());
        return Ok(());
    }

    if let Some(answer) = controller.turns().iter().rev().find(|t| t.author == Author::Assistant) {
        let text = answer.text.replace("**", "");
        match outcome {
            SubmitOutcome::Failed => {
                println!("{}", text.red());
                println!(
                    "Make sure the backend is running: {}",
                    format!("medinsight ping --backend {}", config.backend_url).bold()
                );
            }
            _ => println!("{}", text),
        }
    }
    Ok(())
}

async fn ping(config: &Config) -> Result<()> {
    let client = InferenceClient::new(&config.backend_url);
    match client.health().await {
        Ok(message) => {
            println!("{} {}", "✓".green().bold(), client.base_url());
            if !message.is_empty() {
                println!("  {}", message.dimmed());
            }
        }
        Err(e) => {
            println!("{} {}: {}", "✗".red().bold(), client.base_url(), e);
        }
    }
    Ok(())
}

fn logout() -> Result<()> {
    clear_session_file(&Config::session_path()?)?;
    println!("{}", "Signed out.".green());
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("{} {}", "Config file:".bold(), Config::config_path()?.display());
    println!("{} {}", "Session file:".bold(), Config::session_path()?.display());
    println!("{} {}", "Log directory:".bold(), Config::log_dir()?.display());
    println!();
    println!("  backend_url          {}", config.backend_url);
    println!("  request_timeout_secs {}", config.request_timeout_secs);
    println!(
        "  firebase_api_key     {}",
        if config.firebase_api_key.is_some() { "set" } else { "not set" }
    );
    println!(
        "  log_level            {}",
        config.log_level.as_deref().unwrap_or("info (default)")
    );
    Ok(())
}
