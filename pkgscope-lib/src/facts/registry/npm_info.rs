use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Version manifest as served by the registry. Only the fields we surface are modeled.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub license: Option<serde_json::Value>,
    pub repository: Option<UrlField>,
    pub bugs: Option<UrlField>,
    pub homepage: Option<String>,
    pub types: Option<serde_json::Value>,
    pub typings: Option<serde_json::Value>,
    pub engines: Option<serde_json::Value>,
    pub dependencies: Option<BTreeMap<String, String>>,
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: Option<BTreeMap<String, String>>,
    #[serde(rename = "peerDependencies")]
    pub peer_dependencies: Option<BTreeMap<String, String>>,
    #[serde(rename = "optionalDependencies")]
    pub optional_dependencies: Option<BTreeMap<String, String>>,
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(rename = "_nodeVersion")]
    pub node_version: Option<String>,
    #[serde(rename = "_npmVersion")]
    pub npm_version: Option<String>,
    #[serde(rename = "_npmUser")]
    pub npm_user: Option<RawPerson>,
    pub maintainers: Option<Vec<RawPerson>>,
    pub dist: Option<Dist>,
}

/// npm accepts both `"repository": "url"` and `"repository": { "url": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UrlField {
    Plain(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

impl UrlField {
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Plain(url) => Some(url),
            Self::Object { url } => url.as_deref(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPerson {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dist {
    pub unpacked_size: Option<u64>,
    pub file_count: Option<u64>,
}

/// Normalized registry data for one package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpmInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub repository_url: Option<String>,
    pub homepage: Option<String>,
    pub bugs_url: Option<String>,
    pub types: bool,
    pub min_node_version: Option<String>,
    pub npm_user: Option<Person>,
    pub collaborators: Vec<Person>,
    pub package: PackageDetails,
    pub dependencies: Dependencies,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetails {
    pub id: Option<String>,
    pub node_version: Option<String>,
    pub npm_version: Option<String>,
    pub unpacked_size: Option<u64>,
    pub file_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependencies {
    pub dependencies: Option<DependencySet>,
    pub dev_dependencies: Option<DependencySet>,
    pub peer_dependencies: Option<DependencySet>,
    pub optional_dependencies: Option<DependencySet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySet {
    pub total_count: usize,
    pub data: BTreeMap<String, String>,
}

impl DependencySet {
    fn from_map(map: Option<BTreeMap<String, String>>) -> Option<Self> {
        map.filter(|m| !m.is_empty()).map(|data| Self {
            total_count: data.len(),
            data,
        })
    }
}

impl NpmInfo {
    /// Candidate URLs for locating the source repository, most specific first.
    pub fn repository_candidates(&self) -> impl Iterator<Item = Option<&str>> {
        [self.repository_url.as_deref(), self.homepage.as_deref()].into_iter()
    }
}

impl From<Manifest> for NpmInfo {
    fn from(m: Manifest) -> Self {
        let types = m.types.as_ref().or(m.typings.as_ref()).is_some_and(is_truthy);
        let min_node_version = m
            .engines
            .as_ref()
            .and_then(|e| e.get("node"))
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string);
        let dist = m.dist.unwrap_or_default();

        Self {
            name: m.name,
            version: m.version,
            description: m.description,
            license: m.license.as_ref().and_then(license_name),
            repository_url: m.repository.as_ref().and_then(UrlField::url).map(ToString::to_string),
            homepage: m.homepage,
            bugs_url: m.bugs.as_ref().and_then(UrlField::url).map(ToString::to_string),
            types,
            min_node_version,
            npm_user: m.npm_user.map(Person::from),
            collaborators: m.maintainers.unwrap_or_default().into_iter().map(Person::from).collect(),
            package: PackageDetails {
                id: m.id,
                node_version: m.node_version,
                npm_version: m.npm_version,
                unpacked_size: dist.unpacked_size,
                file_count: dist.file_count,
            },
            dependencies: Dependencies {
                dependencies: DependencySet::from_map(m.dependencies),
                dev_dependencies: DependencySet::from_map(m.dev_dependencies),
                peer_dependencies: DependencySet::from_map(m.peer_dependencies),
                optional_dependencies: DependencySet::from_map(m.optional_dependencies),
            },
        }
    }
}

impl From<RawPerson> for Person {
    fn from(raw: RawPerson) -> Self {
        let url = raw.email.as_deref().and_then(avatar_url);
        Self {
            name: raw.name,
            email: raw.email,
            url,
        }
    }
}

/// Gravatar URL for an email address, or `None` for a blank address.
#[must_use]
pub fn avatar_url(email: &str) -> Option<String> {
    let email = email.trim();
    if email.is_empty() {
        return None;
    }

    let hash = Sha256::digest(email.to_lowercase().as_bytes());
    Some(format!("https://gravatar.com/avatar/{hash:x}"))
}

fn license_name(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(o) => o.get("type").and_then(serde_json::Value::as_str).map(ToString::to_string),
        _ => None,
    }
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
