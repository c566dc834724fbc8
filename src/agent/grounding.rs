//! Grounding audit: identifiers in an answer that the tool result never mentioned.
//!
//! This is advisory. The router logs what it finds and still returns the answer.

use crate::tools::ToolResult;

use super::extract::{is_repository_token, tokens};

fn is_version_like(token: &str) -> bool {
    let rest = token.strip_prefix(['v', 'V']).unwrap_or(token);
    let Some((major, tail)) = rest.split_once('.') else {
        return false;
    };
    !major.is_empty()
        && major.chars().all(|c| c.is_ascii_digit())
        && tail.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// `owner/repo` and version tokens in `text` that do not occur in `result`.
pub fn ungrounded_identifiers(text: &str, result: &ToolResult) -> Vec<String> {
    let (owner, repo) = result.repository();
    let haystack = format!(
        "{owner}/{repo} {}",
        serde_json::to_string(result).unwrap_or_default()
    )
    .to_lowercase();

    let mut missing: Vec<String> = Vec::new();
    for token in tokens(text).filter(|t| is_repository_token(t) || is_version_like(t)) {
        if !haystack.contains(&token.to_lowercase()) && !missing.iter().any(|m| m == token) {
            missing.push(token.to_string());
        }
    }
    missing
}
