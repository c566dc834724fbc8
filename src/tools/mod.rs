//! Tools module — the fixed set of GitHub lookups the agent can perform.
//!
//! Tools are a closed set: [`ToolName`] enumerates them, [`ToolCall`] carries
//! each one's statically shaped arguments and [`ToolResult`] its result.
//! Adding a tool means adding a variant to all three.

mod dependency;
mod registry;
mod release;
mod release_prs;

pub use dependency::{get_dependency_file, DependencyFile};
pub use registry::{ToolFailure, ToolOptions, ToolOutput, ToolRegistry};
pub use release::{check_latest_release, ReleaseInfo};
pub use release_prs::{categorize, get_release_prs, PrCategory, PullRequestSummary, ReleaseChanges};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Identifier of a registered tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CheckLatestRelease,
    GetDependencyFile,
    GetReleasePrs,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [
        ToolName::CheckLatestRelease,
        ToolName::GetDependencyFile,
        ToolName::GetReleasePrs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CheckLatestRelease => "check_latest_release",
            ToolName::GetDependencyFile => "get_dependency_file",
            ToolName::GetReleasePrs => "get_release_prs",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::CheckLatestRelease => {
                "Checks the latest published release of a public repository: tag, publish date, release URL, notes and asset names."
            }
            ToolName::GetDependencyFile => {
                "Fetches the content of a dependency manifest (e.g. go.mod, package.json) from the default branch of a repository."
            }
            ToolName::GetReleasePrs => {
                "Analyzes the merged pull requests around a release tag and groups them into bug fixes, enhancements and other changes."
            }
        }
    }

    /// JSON Schema of this tool's arguments
    pub fn parameters(&self) -> Value {
        let mut properties = json!({
            "owner": {"type": "string", "description": "GitHub organization or user (e.g. 'hashicorp')"},
            "repo": {"type": "string", "description": "Repository name (e.g. 'vault')"}
        });
        let mut required = vec!["owner", "repo"];

        match self {
            ToolName::CheckLatestRelease => {}
            ToolName::GetDependencyFile => {
                properties["path"] = json!({
                    "type": "string",
                    "description": "Path of the dependency file (e.g. 'go.mod', 'package.json')"
                });
                required.push("path");
            }
            ToolName::GetReleasePrs => {
                properties["tag"] = json!({
                    "type": "string",
                    "description": "Release tag to analyze (e.g. 'v1.0.0')"
                });
                required.push("tag");
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool definition for the LLM and the `tools` listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Definitions of every registered tool
pub fn definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(|t| t.definition()).collect()
}

/// The router's decision: which tool, with which arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool_name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    CheckLatestRelease {
        owner: String,
        repo: String,
    },
    GetDependencyFile {
        owner: String,
        repo: String,
        path: String,
    },
    GetReleasePrs {
        owner: String,
        repo: String,
        tag: String,
    },
}

impl ToolCall {
    pub fn tool_name(&self) -> ToolName {
        match self {
            ToolCall::CheckLatestRelease { .. } => ToolName::CheckLatestRelease,
            ToolCall::GetDependencyFile { .. } => ToolName::GetDependencyFile,
            ToolCall::GetReleasePrs { .. } => ToolName::GetReleasePrs,
        }
    }

    /// `owner/repo` coordinates shared by all tools
    pub fn repository(&self) -> (&str, &str) {
        match self {
            ToolCall::CheckLatestRelease { owner, repo }
            | ToolCall::GetDependencyFile { owner, repo, .. }
            | ToolCall::GetReleasePrs { owner, repo, .. } => (owner, repo),
        }
    }
}

/// Structured data returned by a tool, tagged with the tool that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolResult {
    CheckLatestRelease(ReleaseInfo),
    GetDependencyFile(DependencyFile),
    GetReleasePrs(ReleaseChanges),
}

impl ToolResult {
    pub fn tool_name(&self) -> ToolName {
        match self {
            ToolResult::CheckLatestRelease(_) => ToolName::CheckLatestRelease,
            ToolResult::GetDependencyFile(_) => ToolName::GetDependencyFile,
            ToolResult::GetReleasePrs(_) => ToolName::GetReleasePrs,
        }
    }

    /// `owner/repo` coordinates the result describes
    pub fn repository(&self) -> (&str, &str) {
        match self {
            ToolResult::CheckLatestRelease(r) => (&r.owner, &r.repo),
            ToolResult::GetDependencyFile(f) => (&f.owner, &f.repo),
            ToolResult::GetReleasePrs(c) => (&c.owner, &c.repo),
        }
    }

    /// Pretty JSON, as handed to the summarizer and shown as raw output
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::parse("none"), None);
    }

    #[test]
    fn test_definitions_declare_required_args() {
        let defs = definitions();
        assert_eq!(defs.len(), 3);

        let dep = defs.iter().find(|d| d.name == "get_dependency_file").unwrap();
        let required = dep.parameters["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "path"));

        let latest = defs.iter().find(|d| d.name == "check_latest_release").unwrap();
        assert_eq!(latest.parameters["required"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_tool_call_serialization() {
        let call = ToolCall::GetReleasePrs {
            owner: "argoproj".to_string(),
            repo: "argo-cd".to_string(),
            tag: "v2.9.0".to_string(),
        };
        let value = serde_json::to_value(&call).unwrap();
        assert_eq!(value["tool_name"], "get_release_prs");
        assert_eq!(value["arguments"]["tag"], "v2.9.0");
        assert_eq!(call.repository(), ("argoproj", "argo-cd"));
        assert_eq!(call.tool_name(), ToolName::GetReleasePrs);
    }
}
