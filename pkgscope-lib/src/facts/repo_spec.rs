use core::fmt::{Display, Formatter};
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Recognizes the GitHub URL shapes found in npm manifests:
/// `git://`, `git+https://`, `git+ssh://git@`, and plain `https://`, each optionally ending in `.git`.
static GITHUB_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:git(?:\+https|\+ssh)?://(?:git@)?|https://)github\.com/([^/#?\s]+)/([^/#?\s]+)").expect("invalid regex")
});

/// A GitHub repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    owner: Arc<str>,
    repo: Arc<str>,
}

impl RepoSpec {
    /// Build a spec from explicit parts, rejecting empty components.
    #[must_use]
    pub fn new(owner: &str, repo: &str) -> Option<Self> {
        let owner = owner.trim();
        let repo = repo.trim().trim_end_matches(".git");
        if owner.is_empty() || repo.is_empty() {
            return None;
        }

        Some(Self {
            owner: Arc::from(owner),
            repo: Arc::from(repo),
        })
    }

    /// Extract the repository from a single URL-ish string.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let captures = GITHUB_URL_REGEX.captures(text)?;
        Self::new(&captures[1], &captures[2])
    }

    /// Try each candidate in order and return the first one that names a GitHub repository.
    ///
    /// Only the first non-empty candidate is considered, so a manifest whose repository URL
    /// points elsewhere does not fall through to an unrelated homepage.
    pub fn from_candidates<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<Self> {
        let first = candidates.into_iter().flatten().map(str::trim).find(|s| !s.is_empty())?;
        Self::parse(first)
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl Display for RepoSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
