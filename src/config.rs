//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::Result;
use crate::error::Error;

/// How the router decides which tool a query maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Ask the language model, falling back to keywords when it is unavailable
    Model,
    /// Local keyword matching only
    Keyword,
}

impl Default for ClassifierMode {
    fn default() -> Self {
        ClassifierMode::Model
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: String,

    /// GitHub access token (anonymous access when unset)
    #[serde(default)]
    pub github_token: Option<String>,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Timeout applied to every outbound call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub classifier: ClassifierMode,

    /// Lines of a dependency file kept in the tool result
    #[serde(default = "default_max_file_lines")]
    pub max_file_lines: usize,

    /// Page size of the closed pull request listing
    #[serde(default = "default_max_release_prs")]
    pub max_release_prs: u32,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_file_lines() -> usize {
    50
}

fn default_max_release_prs() -> u32 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            github_token: None,
            model: default_model(),
            github_api_url: default_github_api_url(),
            gemini_api_url: default_gemini_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            classifier: ClassifierMode::default(),
            max_file_lines: default_max_file_lines(),
            max_release_prs: default_max_release_prs(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether GitHub calls carry a token
    pub fn has_github_token(&self) -> bool {
        self.github_token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Check that the credentials needed for a turn are present.
    ///
    /// A missing Gemini key is an [`Error::Auth`]; a missing GitHub token only
    /// downgrades to the anonymous quota.
    pub fn validate(&self) -> Result<()> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(Error::Auth(
                "GEMINI_API_KEY is not set. Export it or run 'relwatch onboard'.".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Apply environment overrides on top of file values
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|v| !v.is_empty()) {
            self.gemini_api_key = key;
        }
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|v| !v.is_empty()) {
            self.github_token = Some(token);
        }
        if let Some(model) = lookup("RELWATCH_MODEL").filter(|v| !v.is_empty()) {
            self.model = model;
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relwatch")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from the default location plus environment overrides.
///
/// A missing config file is fine: everything can come from the environment.
pub fn load() -> Result<Config> {
    let mut config = load_from(&config_path())?;
    config.apply_env();
    Ok(config)
}

/// Load configuration from a file, falling back to defaults when it does not exist
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config at {:?}: {}", path, e)))
}

/// Save configuration to file
pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Interactive setup writing `~/.relwatch/config.json`
pub fn onboard() -> Result<()> {
    use crate::ui;
    use inquire::{Confirm, Password, Select, Text};

    ui::print_header("Setup Wizard");
    println!("  I'll store your API credentials for release checks.\n");

    let mut config = load_from(&config_path())?;

    let key = Password::new("Gemini API key:")
        .without_confirmation()
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
    config.gemini_api_key = key;

    let use_token = Confirm::new("Configure a GitHub token? (raises the quota from 60 to 5000 calls/hour)")
        .with_default(true)
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    if use_token {
        let token = Password::new("GitHub token:")
            .without_confirmation()
            .prompt()
            .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
        config.github_token = Some(token).filter(|t| !t.is_empty());
    }

    let modes = vec!["model (Gemini picks the tool)", "keyword (local matching)"];
    let mode = Select::new("How should questions be routed?", modes)
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
    config.classifier = if mode.starts_with("keyword") {
        ClassifierMode::Keyword
    } else {
        ClassifierMode::Model
    };

    let model = Text::new("Model:")
        .with_default(&config.model)
        .prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
    config.model = model;

    ui::print_thinking("Saving configuration");
    save_to(&config, &config_path())?;
    ui::print_success("Setup complete!");

    Ok(())
}
