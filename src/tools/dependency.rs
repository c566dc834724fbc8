//! `get_dependency_file` — contents of a manifest on the default branch

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::github::types::ContentEntry;
use crate::github::GitHubApi;
use crate::Result;

use super::{ToolOutput, ToolResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyFile {
    pub owner: String,
    pub repo: String,
    pub path: String,
    /// First `max_lines` lines of the file
    pub contents: String,
    pub total_lines: usize,
    pub truncated: bool,
}

pub async fn get_dependency_file(
    github: &dyn GitHubApi,
    owner: &str,
    repo: &str,
    path: &str,
    max_lines: usize,
) -> Result<ToolOutput> {
    let path = path.trim_matches('/');
    let api_path = format!("repos/{owner}/{repo}/contents/{path}");

    let response = github.get(&api_path, &[]).await.map_err(|e| match e {
        Error::NotFound(_) => Error::NotFound(format!("file '{path}' in {owner}/{repo}")),
        other => other,
    })?;

    if response.body.is_array() {
        return Err(Error::Decode(format!("'{path}' is a directory, not a file")));
    }

    let entry: ContentEntry = response.parse()?;
    let text = decode_content(&entry)?;
    debug!("Fetched {} ({} bytes) from {}/{}", entry.path, entry.size, owner, repo);

    let total_lines = text.lines().count();
    let contents = text.lines().take(max_lines).collect::<Vec<_>>().join("\n");

    Ok(ToolOutput {
        result: ToolResult::GetDependencyFile(DependencyFile {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: entry.path,
            contents,
            total_lines,
            truncated: total_lines > max_lines,
        }),
        rate_limit: response.rate_limit,
        github_calls: 1,
    })
}

/// Decode the contents API transport encoding into UTF-8 text
fn decode_content(entry: &ContentEntry) -> Result<String> {
    if entry.kind != "file" {
        return Err(Error::Decode(format!(
            "'{}' is a {}, not a file",
            entry.path, entry.kind
        )));
    }

    let raw = entry.content.as_deref().unwrap_or_default();
    match entry.encoding.as_deref() {
        Some("base64") => {
            let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .map_err(|e| Error::Decode(format!("invalid base64 in '{}': {e}", entry.path)))?;
            String::from_utf8(bytes)
                .map_err(|_| Error::Decode(format!("'{}' is not UTF-8 text", entry.path)))
        }
        // Files over 1 MB come back with encoding "none" and no content
        Some("none") if raw.is_empty() && entry.size > 0 => Err(Error::Decode(format!(
            "'{}' is too large for the contents API ({} bytes)",
            entry.path, entry.size
        ))),
        None | Some("") | Some("none") if raw.is_empty() => Ok(String::new()),
        Some(other) => Err(Error::Decode(format!(
            "unsupported content encoding '{other}' for '{}'",
            entry.path
        ))),
        None => Ok(raw.to_string()),
    }
}
