//! Argument extraction — pull `owner/repo`, a file path or a release tag out of a question.

use regex::Regex;

use crate::error::Error;
use crate::tools::{ToolCall, ToolName};
use crate::Result;

/// Dependency manifests recognized without quoting
pub const MANIFEST_FILES: [&str; 24] = [
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "go.mod",
    "go.sum",
    "go.work",
    "Cargo.toml",
    "Cargo.lock",
    "requirements.txt",
    "pyproject.toml",
    "Pipfile",
    "Pipfile.lock",
    "poetry.lock",
    "setup.py",
    "setup.cfg",
    "Gemfile",
    "Gemfile.lock",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "composer.json",
    "mix.exs",
    "Chart.yaml",
];

/// Whether the last segment of `path` names a known dependency manifest
pub fn is_manifest_path(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    MANIFEST_FILES.iter().any(|m| m.eq_ignore_ascii_case(name))
}

const TOKEN_PUNCTUATION: &str = "?!,;:()[]{}<>\"'`*‘’“”";

/// Extensions of file-shaped tokens that are not repository names
const FILE_EXTENSIONS: [&str; 14] = [
    "json", "mod", "sum", "toml", "txt", "lock", "xml", "gradle", "kts", "yaml", "yml", "cfg",
    "exs", "py",
];

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| TOKEN_PUNCTUATION.contains(c))
}

/// Split a question into whitespace tokens stripped of surrounding punctuation
/// and a possessive `'s`.
pub fn tokens(query: &str) -> impl Iterator<Item = &str> {
    query
        .split_whitespace()
        .map(|t| {
            let t = strip_punctuation(t).trim_end_matches('.');
            let t = t
                .strip_suffix("'s")
                .or_else(|| t.strip_suffix("’s"))
                .unwrap_or(t);
            strip_punctuation(t)
        })
        .filter(|t| !t.is_empty())
}

/// Whether a token is a file path such as `ui/package.json` or `go.mod`
pub fn is_file_path(token: &str) -> bool {
    let name = token.rsplit('/').next().unwrap_or(token);
    let by_extension = name.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty() && FILE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
    });
    by_extension || is_manifest_path(token)
}

/// Whether a token is a URL (`https://...` or a bare `github.com/...`)
pub fn is_url(token: &str) -> bool {
    token.contains("://") || token.to_lowercase().starts_with("github.com/")
}

/// Whether a token has the shape of an `owner/repo` pair
pub fn is_repository_token(token: &str) -> bool {
    if is_url(token) || is_file_path(token) {
        return false;
    }
    let Some((owner, repo)) = token.split_once('/') else {
        return false;
    };

    owner.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !repo.is_empty()
        && repo
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Repository coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Builds a [`ToolCall`] for an already-classified question.
pub trait ArgumentExtractor: Send + Sync {
    /// Whether the question names any repository at all
    fn names_repository(&self, query: &str) -> bool;

    fn extract(&self, tool: ToolName, query: &str) -> Result<ToolCall>;
}

/// Fixed-pattern extractor: `owner/repo` token, quoted or bare path, version token.
pub struct PatternExtractor {
    github_url: Regex,
    repo_token: Regex,
    version_token: Regex,
    quoted: Regex,
    file_token: Regex,
}

impl PatternExtractor {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Config(format!("invalid pattern {pattern}: {e}")))
        };

        Ok(Self {
            github_url: compile(r"(?i)github\.com/([A-Za-z0-9][A-Za-z0-9-]*)/([A-Za-z0-9._-]+)")?,
            repo_token: compile(r"^([A-Za-z0-9][A-Za-z0-9-]{0,38})/([A-Za-z0-9._-]+)$")?,
            version_token: compile(r"^[vV]?\d+\.\d+(?:\.\d+)?(?:[-+][0-9A-Za-z.-]+)?$")?,
            quoted: compile(r#"["'`]([^"'`\s]+)["'`]"#)?,
            file_token: compile(
                r"^[\w./-]*[\w-]\.(?:json|mod|sum|toml|txt|lock|xml|gradle|kts|ya?ml|cfg|exs|py)$",
            )?,
        })
    }

    /// First `owner/repo` named in the question, from a GitHub URL or a bare token
    pub fn repository(&self, query: &str) -> Option<RepoRef> {
        if let Some(caps) = self.github_url.captures(query) {
            let repo = caps[2].trim_end_matches('.').trim_end_matches(".git");
            if !repo.is_empty() {
                return Some(RepoRef {
                    owner: caps[1].to_string(),
                    repo: repo.to_string(),
                });
            }
        }

        tokens(query)
            .filter(|t| !t.contains("://") && !is_manifest_path(t) && !self.file_token.is_match(t))
            .find_map(|t| {
                let caps = self.repo_token.captures(t)?;
                Some(RepoRef {
                    owner: caps[1].to_string(),
                    repo: caps[2].to_string(),
                })
            })
    }

    /// Semantic version tag exactly as written (`v2.9.0`, `1.15`)
    pub fn release_tag(&self, query: &str) -> Option<String> {
        tokens(query)
            .find(|t| self.version_token.is_match(t))
            .map(str::to_string)
    }

    /// Dependency file path: quoted first, then a known manifest, then anything file-shaped
    pub fn file_path(&self, query: &str, repo: &RepoRef) -> Option<String> {
        let repo_token = repo.to_string();
        let not_repo = |t: &&str| !t.eq_ignore_ascii_case(&repo_token) && !t.contains("://");

        let quoted = self
            .quoted
            .captures_iter(query)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .filter(not_repo)
            .find(|t| t.contains('.') || is_manifest_path(t));
        if let Some(path) = quoted {
            return Some(path.to_string());
        }

        if let Some(path) = tokens(query).filter(not_repo).find(|t| is_manifest_path(t)) {
            return Some(path.to_string());
        }

        tokens(query)
            .filter(not_repo)
            .find(|t| self.file_token.is_match(t) && !self.version_token.is_match(t))
            .map(str::to_string)
    }

}

impl ArgumentExtractor for PatternExtractor {
    fn names_repository(&self, query: &str) -> bool {
        self.repository(query).is_some()
    }

    fn extract(&self, tool: ToolName, query: &str) -> Result<ToolCall> {
        let RepoRef { owner, repo } = self.repository(query).ok_or_else(|| {
            Error::UnroutableQuery("the question does not name a repository as `owner/repo`".to_string())
        })?;

        match tool {
            ToolName::CheckLatestRelease => Ok(ToolCall::CheckLatestRelease { owner, repo }),
            ToolName::GetDependencyFile => {
                let repo_ref = RepoRef { owner, repo };
                let path = self.file_path(query, &repo_ref).ok_or_else(|| {
                    Error::UnroutableQuery(
                        "the question does not name a dependency file such as `package.json`".to_string(),
                    )
                })?;
                Ok(ToolCall::GetDependencyFile {
                    owner: repo_ref.owner,
                    repo: repo_ref.repo,
                    path,
                })
            }
            ToolName::GetReleasePrs => {
                let tag = self.release_tag(query).ok_or_else(|| {
                    Error::UnroutableQuery(
                        "the question does not name a release tag such as `v2.9.0`".to_string(),
                    )
                })?;
                Ok(ToolCall::GetReleasePrs { owner, repo, tag })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> PatternExtractor {
        PatternExtractor::new().unwrap()
    }

    #[test]
    fn test_repository_from_bare_token() {
        let repo = extractor().repository("What's the latest version of hashicorp/vault?").unwrap();
        assert_eq!(repo.to_string(), "hashicorp/vault");
    }

    #[test]
    fn test_repository_from_url() {
        let repo = extractor()
            .repository("check https://github.com/argoproj/argo-cd.git please")
            .unwrap();
        assert_eq!(repo.owner, "argoproj");
        assert_eq!(repo.repo, "argo-cd");
    }

    #[test]
    fn test_repository_skips_manifest_paths() {
        let repo = extractor()
            .repository("show ui/package.json for grafana/grafana")
            .unwrap();
        assert_eq!(repo.to_string(), "grafana/grafana");
    }

    #[test]
    fn test_repository_skips_file_paths() {
        let repo = extractor()
            .repository("show config/settings.yaml for grafana/grafana")
            .unwrap();
        assert_eq!(repo.to_string(), "grafana/grafana");
    }

    #[test]
    fn test_repository_keeps_dots() {
        let repo = extractor().repository("latest release of socketio/socket.io.").unwrap();
        assert_eq!(repo.repo, "socket.io");
    }

    #[test]
    fn test_repository_from_possessive() {
        let ex = extractor();
        assert!(ex.names_repository("What is hashicorp/vault's latest release?"));
        assert_eq!(
            ex.repository("What is hashicorp/vault’s latest release?").unwrap().to_string(),
            "hashicorp/vault"
        );
        assert_eq!(
            tokens("is 'grafana/grafana's' go.mod current?").collect::<Vec<_>>(),
            vec!["is", "grafana/grafana", "go.mod", "current"]
        );
    }

    #[test]
    fn test_token_shapes() {
        assert!(is_repository_token("argoproj/argo-cd"));
        assert!(is_repository_token("socketio/socket.io"));
        assert!(!is_repository_token("https://github.com/a/b"));
        assert!(!is_repository_token("github.com/a/b"));
        assert!(!is_repository_token("ui/package.json"));
        assert!(!is_repository_token("config/settings.yaml"));
        assert!(!is_repository_token("a/b/c"));
        assert!(is_file_path("Gemfile"));
        assert!(!is_file_path("socket.io"));
    }

    #[test]
    fn test_no_repository() {
        let ex = extractor();
        assert!(ex.repository("what is the latest release?").is_none());
        assert!(!ex.names_repository("Tell me a joke"));
        assert!(ex.names_repository("Tell me a joke about hashicorp/vault"));
    }

    #[test]
    fn test_release_tag() {
        let ex = extractor();
        assert_eq!(ex.release_tag("bug fixes in argoproj/argo-cd v2.9.0").as_deref(), Some("v2.9.0"));
        assert_eq!(ex.release_tag("changes in 1.15.2-rc1?").as_deref(), Some("1.15.2-rc1"));
        assert_eq!(ex.release_tag("changes in argoproj/argo-cd"), None);
    }

    #[test]
    fn test_file_path_variants() {
        let ex = extractor();
        let repo = RepoRef {
            owner: "grafana".to_string(),
            repo: "grafana".to_string(),
        };

        assert_eq!(
            ex.file_path("Show me package.json for grafana/grafana", &repo).as_deref(),
            Some("package.json")
        );
        assert_eq!(
            ex.file_path("show 'tools/deps.txt' in grafana/grafana", &repo).as_deref(),
            Some("tools/deps.txt")
        );
        assert_eq!(
            ex.file_path("contents of go.mod in `grafana/grafana`", &repo).as_deref(),
            Some("go.mod")
        );
        assert_eq!(
            ex.file_path("show Gemfile for grafana/grafana", &repo).as_deref(),
            Some("Gemfile")
        );
        assert_eq!(
            ex.file_path("show config/settings.yaml for grafana/grafana", &repo).as_deref(),
            Some("config/settings.yaml")
        );
        assert_eq!(ex.file_path("dependencies of grafana/grafana", &repo), None);
    }

    #[test]
    fn test_extract_tool_calls() {
        let ex = extractor();

        assert_eq!(
            ex.extract(ToolName::CheckLatestRelease, "What's the latest version of hashicorp/vault?")
                .unwrap(),
            ToolCall::CheckLatestRelease {
                owner: "hashicorp".to_string(),
                repo: "vault".to_string()
            }
        );
        assert_eq!(
            ex.extract(ToolName::GetDependencyFile, "Show me package.json for grafana/grafana")
                .unwrap(),
            ToolCall::GetDependencyFile {
                owner: "grafana".to_string(),
                repo: "grafana".to_string(),
                path: "package.json".to_string()
            }
        );
        assert_eq!(
            ex.extract(ToolName::GetReleasePrs, "bug fixes in argoproj/argo-cd v2.9.0").unwrap(),
            ToolCall::GetReleasePrs {
                owner: "argoproj".to_string(),
                repo: "argo-cd".to_string(),
                tag: "v2.9.0".to_string()
            }
        );
    }

    #[test]
    fn test_missing_arguments_are_unroutable() {
        let ex = extractor();
        assert!(matches!(
            ex.extract(ToolName::CheckLatestRelease, "latest vault release"),
            Err(Error::UnroutableQuery(_))
        ));
        assert!(matches!(
            ex.extract(ToolName::GetReleasePrs, "bug fixes in argoproj/argo-cd"),
            Err(Error::UnroutableQuery(_))
        ));
    }
}
