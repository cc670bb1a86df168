use serde::{Deserialize, Serialize};
use url::Url;

/// Base URLs of every upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Upstreams {
    pub registry: Url,
    pub downloads: Url,
    pub bundle: Url,
    pub github: Url,
    pub scorecard: Url,
    pub vulnerability: Url,
}

impl Upstreams {
    /// Point every upstream at the same server, as tests do with a single mock.
    #[must_use]
    pub fn all_at(base: &Url) -> Self {
        let github = base.join("graphql").unwrap_or_else(|_| base.clone());
        Self {
            registry: base.clone(),
            downloads: base.clone(),
            bundle: base.clone(),
            github,
            scorecard: base.clone(),
            vulnerability: base.clone(),
        }
    }

    /// Every configured URL with the name of the upstream it belongs to.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Url)> {
        [
            ("registry", &self.registry),
            ("downloads", &self.downloads),
            ("bundle", &self.bundle),
            ("github", &self.github),
            ("scorecard", &self.scorecard),
            ("vulnerability", &self.vulnerability),
        ]
        .into_iter()
    }
}

impl Default for Upstreams {
    fn default() -> Self {
        let url = |s: &str| Url::parse(s).expect("built-in upstream URL is valid");
        Self {
            registry: url("https://registry.npmjs.org"),
            downloads: url("https://api.npmjs.org"),
            bundle: url("https://bundlephobia.com"),
            github: url("https://api.github.com/graphql"),
            scorecard: url("https://api.securityscorecards.dev"),
            vulnerability: url("https://api.socket.dev"),
        }
    }
}
