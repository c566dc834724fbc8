//! relwatch CLI entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use relwatch::adapters::{install_interrupt_handler, ChatSession, UsageMetrics};
use relwatch::agent::AgentRouter;
use relwatch::github::{GitHubApi, GitHubClient};
use relwatch::{tools, ui, Error};

#[derive(Parser)]
#[command(name = "relwatch")]
#[command(about = "📦 relwatch - ask about GitHub releases, dependency files and release changes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store API credentials in ~/.relwatch/config.json
    Onboard,

    /// Ask a single question
    Ask {
        /// Question, e.g. "What's the latest version of hashicorp/vault?"
        #[arg(short, long)]
        message: String,

        /// Also print the raw tool output
        #[arg(long)]
        raw: bool,
    },

    /// Interactive chat
    Chat,

    /// Show configuration and GitHub quota
    Status,

    /// List the available tools
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            relwatch::config::onboard()?;
            println!("\nNext steps:");
            println!("  Ask: relwatch ask -m \"What's the latest version of hashicorp/vault?\"");
            println!("  Chat: relwatch chat");
        }

        Commands::Ask { message, raw } => {
            let mut session = open_session(raw)?;
            install_interrupt_handler(session.cancel_slot())?;

            match session.run_once(&message).await {
                Ok(answer) => ui::print_answer(&answer, raw),
                Err(Error::Cancelled) => ui::print_warning("Request cancelled"),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Chat => {
            let mut session = open_session(false)?;
            install_interrupt_handler(session.cancel_slot())?;

            ui::print_header("Chat (/raw, /usage, /help, exit; Ctrl+C cancels)");
            session.run_interactive().await?;
            ui::print_dashboard(session.usage(), None);
        }

        Commands::Status => {
            let config = relwatch::config::load()?;
            ui::print_header("Status");
            println!("  Config:      {}", relwatch::config::config_path().display());
            println!("  Model:       {}", config.model);
            println!("  Classifier:  {:?}", config.classifier);
            println!(
                "  Gemini API:  {}",
                if config.gemini_api_key.is_empty() { "not set" } else { "✓" }
            );
            println!(
                "  GitHub:      {}",
                if config.has_github_token() { "token ✓" } else { "anonymous" }
            );

            let github = GitHubClient::new(&config)?;
            match github.rate_limit_status().await {
                Ok(status) => ui::print_dashboard(&UsageMetrics::default(), Some(&status)),
                Err(e) => ui::print_error(&format!("GitHub unreachable: {e}")),
            }
        }

        Commands::Tools => {
            ui::print_header("Tools");
            ui::print_tools(&tools::definitions());
        }
    }

    Ok(())
}

fn open_session(raw: bool) -> Result<ChatSession> {
    let config = relwatch::config::load()?;
    if !config.has_github_token() {
        ui::print_warning("No GITHUB_TOKEN configured; anonymous requests are limited to 60 per hour");
    }

    let router = AgentRouter::from_config(&config)?;
    Ok(ChatSession::new(router, raw))
}
