use chrono::Utc;
use colored::*;
use terminal_size::{terminal_size, Height, Width};

use crate::adapters::UsageMetrics;
use crate::agent::Answer;
use crate::github::RateLimitStatus;
use crate::tools::ToolDefinition;

fn rule() -> String {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    "─".repeat(width.0 as usize)
}

pub fn print_header(subtitle: &str) {
    let line = rule();
    println!("{}", line.black().bold());

    let name = "relwatch".yellow().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  📦 {} {}", name, version);
    println!("  {}", subtitle.cyan());

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}

/// Render one turn's answer, optionally followed by the raw tool result
pub fn print_answer(answer: &Answer, show_raw: bool) {
    if answer.is_success() {
        println!("\n{}\n", answer.text);
    } else {
        println!("\n{}\n", answer.text.red());
    }

    if show_raw {
        if let Some(raw) = &answer.raw_tool_result {
            println!("{}", format!("raw {} output:", raw.tool_name()).black().bold());
            println!("{}\n", raw.to_json_pretty().black());
        }
    }
}

pub fn print_tools(definitions: &[ToolDefinition]) {
    for def in definitions {
        println!("  {} {}", def.name.yellow().bold(), def.description);
        if let Ok(params) = serde_json::to_string_pretty(&def.parameters) {
            for line in params.lines() {
                println!("      {}", line.black().bold());
            }
        }
    }
}

/// Usage dashboard: session counters plus the live GitHub quota when known
pub fn print_dashboard(usage: &UsageMetrics, status: Option<&RateLimitStatus>) {
    let line = rule();
    println!("{}", line.black().bold());
    println!("  {}", "Usage".yellow().bold());
    println!("  Turns:            {}", usage.turns);
    println!("  Model calls:      {}", usage.llm_calls);
    println!("  GitHub calls:     {}", usage.github_calls);

    if let Some(status) = status {
        let auth = if status.authenticated { "token" } else { "anonymous" };
        println!("  GitHub quota:     {}/{} remaining ({})", status.remaining, status.limit, auth);
        println!("  Used this window: {}", status.used);
        if let Some(reset) = status.reset {
            let minutes = (reset - Utc::now()).num_minutes().max(0);
            println!(
                "  Resets at:        {} UTC (in {} min)",
                reset.format("%Y-%m-%d %H:%M:%S"),
                minutes
            );
        }
    } else if let Some(rate) = &usage.last_rate_limit {
        let remaining = rate.remaining.map_or("?".to_string(), |r| r.to_string());
        let limit = rate.limit.map_or("?".to_string(), |l| l.to_string());
        println!("  GitHub quota:     {}/{} remaining (last response)", remaining, limit);
        if let Some(reset) = rate.reset {
            println!("  Resets at:        {} UTC", reset.format("%Y-%m-%d %H:%M:%S"));
        }
    } else {
        println!("  GitHub quota:     {}", "unknown".black().bold());
    }
    println!("{}", line.black().bold());
}
