use clap::{Parser, Subcommand};
use colored::*;
use anyhow::{Result, anyhow};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod conversation;
mod handler;
mod normalize;
mod session;
mod tui;
mod ui;
mod webhook;

use app::App;
use config::{Config, WebhookMode};
use conversation::ChatRole;
use session::ChatSession;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "support-chat")]
#[command(about = "Chat with a webhook-driven customer support workflow")]
#[command(version)]
struct Cli {
    /// Full webhook URL (overrides the config file and SUPPORT_CHAT_ENDPOINT)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Session user id sent with every message
    #[arg(short, long, global = true)]
    user_id: Option<String>,

    /// Target the n8n test webhook (/webhook-test/...) instead of production
    #[arg(long, global = true)]
    test_webhook: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Send a single message and print the reply
    Ask {
        /// Message to send
        message: String,
    },
    /// Show the resolved configuration
    Config {
        /// Persist the resolved configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    config.apply_env();
    config.apply_overrides(cli.endpoint, cli.user_id);
    if cli.test_webhook {
        config.mode = WebhookMode::Test;
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            init_file_logging();
            run_chat(&config).await?
        }
        Commands::Ask { message } => {
            init_stderr_logging();
            ask(&config, message).await?
        }
        Commands::Config { save } => show_config(&config, save)?,
    }

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("support_chat=info"))
}

/// Log to a file so output doesn't corrupt the TUI
fn init_file_logging() {
    let Some(dir) = dirs::cache_dir().map(|d| d.join("support-chat")) else {
        return;
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    if let Ok(file) = std::fs::File::create(dir.join("support-chat.log")) {
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_env_filter(env_filter())
            .with_ansi(false)
            .init();
    }
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter())
        .init();
}

async fn run_chat(config: &Config) -> Result<()> {
    let client = config.client()?;
    info!(endpoint = %client.endpoint(), user_id = %client.user_id(), "starting chat");

    let mut app = App::new(client);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = event_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }
    Ok(())
}

async fn ask(config: &Config, message: String) -> Result<()> {
    let client = config.client()?;
    let mut session = ChatSession::new();
    let mut input = message;

    println!("📨 Sending to {}", client.endpoint().cyan());

    if !session.send(&client, &mut input).await {
        return Err(anyhow!("Message is empty"));
    }

    if let Some(reply) = session.conversation().last().filter(|m| m.role == ChatRole::Assistant) {
        if reply.is_error {
            println!("{}", reply.content.red());
        } else {
            println!("\n{}", reply.content);
            if let Some(intent) = &reply.intent {
                println!("\n{} {}", "intent:".dimmed(), intent.magenta());
            }
        }
    }

    if let Some(err) = session.last_error() {
        println!("{}: {}", "Error".red().bold(), err);
        if config.mode == WebhookMode::Test {
            println!("Test webhooks only listen after {} in the n8n editor", "Execute workflow".bold());
        } else {
            println!("Make sure the workflow is {} in n8n", "Active".bold());
        }
        return Err(anyhow!("Exchange failed"));
    }

    Ok(())
}

fn show_config(config: &Config, save: bool) -> Result<()> {
    println!("\n{}", "⚙️  Support Chat Configuration".bold().blue());
    println!("{}", "=".repeat(40).dimmed());

    let mode = match config.mode {
        WebhookMode::Production => "production",
        WebhookMode::Test => "test",
    };
    println!("  {} {}", "endpoint:".bold(), config.endpoint_url().green());
    println!("  {} {}", "user id: ".bold(), config.user_id);
    println!("  {} {}", "mode:    ".bold(), mode);
    if let Some(secs) = config.request_timeout_secs {
        println!("  {} {}s", "timeout: ".bold(), secs);
    }

    if save {
        let path = config.save()?;
        println!("\n✓ Saved to {}", path.display().to_string().dimmed());
    } else {
        println!("\n{} {}", "config file:".dimmed(), Config::get_config_path()?.display());
    }

    Ok(())
}
