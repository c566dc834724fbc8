//! CLI adapter — single-question and interactive chat sessions.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::{AgentRouter, Answer, TurnUsage};
use crate::error::Error;
use crate::github::RateLimit;
use crate::ui;
use crate::Result;

/// Per-session counters shown by `/usage`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub turns: u32,
    pub llm_calls: u32,
    pub github_calls: u32,
    pub last_rate_limit: Option<RateLimit>,
}

impl UsageMetrics {
    pub fn record(&mut self, usage: &TurnUsage) {
        self.turns += 1;
        self.llm_calls += usage.llm_calls;
        self.github_calls += usage.github_calls;
        if let Some(rate) = &usage.rate_limit {
            self.last_rate_limit = Some(rate.clone());
        }
    }
}

/// One line of chat input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    Exit,
    ToggleRaw,
    Usage,
    Help,
    Question(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let input = line.trim();
        match input.to_lowercase().as_str() {
            "" => Self::Empty,
            "exit" | "quit" | "q" | "/exit" | "/quit" => Self::Exit,
            "/raw" => Self::ToggleRaw,
            "/usage" => Self::Usage,
            "/help" | "help" => Self::Help,
            _ => Self::Question(input.to_string()),
        }
    }
}

/// Token of the turn currently in flight, shared with the Ctrl+C handler.
pub type CancelSlot = Arc<Mutex<CancellationToken>>;

/// Ctrl+C cancels the turn in flight; a second press within three seconds exits.
pub fn install_interrupt_handler(slot: CancelSlot) -> Result<()> {
    let pressed = Arc::new(AtomicBool::new(false));

    ctrlc::set_handler(move || {
        if pressed.swap(true, Ordering::SeqCst) {
            println!("\n👋 Bye!");
            std::process::exit(0);
        }

        if let Ok(token) = slot.lock() {
            token.cancel();
        }
        println!("\n⚠️  Cancelled. Press Ctrl+C again to exit");

        let reset = pressed.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(3));
            reset.store(false, Ordering::SeqCst);
        });
    })
    .map_err(|e| Error::Other(format!("Failed to install Ctrl+C handler: {e}")))
}

/// A chat session: one router, its own counters, its own cancellation slot.
pub struct ChatSession {
    router: AgentRouter,
    usage: UsageMetrics,
    show_raw: bool,
    current: CancelSlot,
}

impl ChatSession {
    pub fn new(router: AgentRouter, show_raw: bool) -> Self {
        Self {
            router,
            usage: UsageMetrics::default(),
            show_raw,
            current: Arc::new(Mutex::new(CancellationToken::new())),
        }
    }

    pub fn cancel_slot(&self) -> CancelSlot {
        self.current.clone()
    }

    pub fn usage(&self) -> &UsageMetrics {
        &self.usage
    }

    pub fn toggle_raw(&mut self) -> bool {
        self.show_raw = !self.show_raw;
        self.show_raw
    }

    /// Answer one question under a fresh cancellation token.
    pub async fn run_once(&mut self, query: &str) -> Result<Answer> {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.current.lock() {
            *slot = token.clone();
        }

        let answer = self.router.answer(query, &token).await?;
        self.usage.record(&answer.usage);
        debug!("Session usage: {:?}", self.usage);
        Ok(answer)
    }

    /// Run interactive REPL loop.
    pub async fn run_interactive(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("\x1b[1;34mYou\x1b[0m: ");
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            match ChatInput::parse(&line) {
                ChatInput::Empty => continue,
                ChatInput::Exit => {
                    println!("👋 Bye!");
                    break;
                }
                ChatInput::ToggleRaw => {
                    let state = if self.toggle_raw() { "on" } else { "off" };
                    ui::print_step(&format!("Raw tool output {state}"));
                }
                ChatInput::Usage => ui::print_dashboard(&self.usage, None),
                ChatInput::Help => print_help(),
                ChatInput::Question(query) => {
                    let spinner = ProgressBar::new_spinner();
                    spinner.set_message("Checking GitHub");
                    spinner.enable_steady_tick(Duration::from_millis(100));

                    let result = self.run_once(&query).await;
                    spinner.finish_and_clear();

                    match result {
                        Ok(answer) => ui::print_answer(&answer, self.show_raw),
                        Err(Error::Cancelled) => ui::print_warning("Request cancelled"),
                        Err(e) => ui::print_error(&e.to_string()),
                    }
                }
            }
        }

        Ok(())
    }
}

fn print_help() {
    ui::print_step("Ask about a repository, e.g. \"What's the latest version of hashicorp/vault?\"");
    ui::print_step("/raw    toggle raw tool output");
    ui::print_step("/usage  show call counters and GitHub quota");
    ui::print_step("exit    leave the chat");
}
