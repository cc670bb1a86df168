use serde::{Deserialize, Serialize};

pub const REPOSITORY_QUERY: &str = "query($owner: String!, $name: String!) { \
repository(owner: $owner, name: $name) { \
url name updatedAt forkCount description stargazerCount homepageUrl \
mentionableUsers { totalCount } licenseInfo { spdxId } latestRelease { tagName } \
owner { login avatarUrl } issues(states: OPEN) { totalCount } pullRequests(states: OPEN) { totalCount } \
watchers { totalCount } primaryLanguage { name } \
languages(first: 100) { totalSize edges { size node { name color } } } \
readMe: object(expression: \"HEAD:README.md\") { ... on Blob { text } } \
} }";

#[derive(Debug, Deserialize)]
pub struct RepositoryData {
    pub repository: Option<RawRepository>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRepository {
    pub url: Option<String>,
    pub name: Option<String>,
    pub updated_at: Option<String>,
    pub fork_count: Option<u64>,
    pub description: Option<String>,
    pub stargazer_count: Option<u64>,
    pub homepage_url: Option<String>,
    pub mentionable_users: Option<Count>,
    pub license_info: Option<LicenseInfo>,
    pub latest_release: Option<Release>,
    pub owner: Option<Owner>,
    pub issues: Option<Count>,
    pub pull_requests: Option<Count>,
    pub watchers: Option<Count>,
    pub primary_language: Option<Named>,
    pub languages: Option<Languages>,
    pub read_me: Option<Blob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Count {
    pub total_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LicenseInfo {
    pub spdx_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Release {
    pub tag_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Owner {
    pub login: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Named {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Languages {
    pub total_size: u64,
    pub edges: Vec<LanguageEdge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LanguageEdge {
    pub size: u64,
    pub node: Option<LanguageNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LanguageNode {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Blob {
    pub text: Option<String>,
}

/// Normalized GitHub repository data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubInfo {
    pub url: Option<String>,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub homepage_url: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub issues: u64,
    pub prs: u64,
    pub watchers: u64,
    pub contributors: u64,
    pub updated_at: Option<String>,
    pub primary_language: Option<String>,
    pub languages: Vec<Language>,
    pub version: Option<String>,
    pub read_me: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub name: Option<String>,
    pub color: Option<String>,
    pub size: u64,
    pub size_percentage: f64,
}

impl From<RawRepository> for GitHubInfo {
    fn from(raw: RawRepository) -> Self {
        let count = |c: Option<Count>| c.map_or(0, |c| c.total_count);
        let (owner, avatar) = raw.owner.map_or((None, None), |o| (o.login, o.avatar_url));

        Self {
            url: raw.url,
            name: raw.name,
            owner,
            avatar,
            description: raw.description,
            license: raw.license_info.and_then(|l| l.spdx_id),
            homepage_url: raw.homepage_url.filter(|h| !h.is_empty()),
            stars: raw.stargazer_count.unwrap_or(0),
            forks: raw.fork_count.unwrap_or(0),
            issues: count(raw.issues),
            prs: count(raw.pull_requests),
            watchers: count(raw.watchers),
            contributors: count(raw.mentionable_users),
            updated_at: raw.updated_at,
            primary_language: raw.primary_language.and_then(|l| l.name),
            languages: raw.languages.map(languages).unwrap_or_default(),
            version: raw
                .latest_release
                .and_then(|r| r.tag_name)
                .map(|tag| tag.strip_prefix('v').unwrap_or(&tag).to_string()),
            read_me: raw.read_me.and_then(|b| b.text),
        }
    }
}

#[expect(clippy::cast_precision_loss, reason = "byte counts are far below 2^52")]
fn languages(languages: Languages) -> Vec<Language> {
    let total = languages.total_size;
    languages
        .edges
        .into_iter()
        .map(|edge| {
            let (name, color) = edge.node.map_or((None, None), |n| (n.name, n.color));
            let size_percentage = if total == 0 {
                0.0
            } else {
                (edge.size as f64 / total as f64 * 10_000.0).round() / 100.0
            };
            Language {
                name,
                color,
                size: edge.size,
                size_percentage,
            }
        })
        .collect()
}
