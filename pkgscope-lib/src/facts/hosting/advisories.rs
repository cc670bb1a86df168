use semver::Version;
use serde::{Deserialize, Serialize};

pub const VULNERABILITIES_QUERY: &str = "query($package: String!) { \
securityVulnerabilities(ecosystem: NPM, package: $package, first: 100) { edges { node { \
vulnerableVersionRange severity firstPatchedVersion { identifier } \
advisory { summary description permalink publishedAt updatedAt cvss { score } \
identifiers { type value } references { url } } \
} } } }";

/// Severity groups in the order they are reported.
pub const SEVERITY_ORDER: [&str; 4] = ["CRITICAL", "HIGH", "MODERATE", "LOW"];

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VulnerabilitiesData {
    pub security_vulnerabilities: Connection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Connection {
    pub edges: Vec<Edge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Edge {
    pub node: RawVulnerability,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawVulnerability {
    pub vulnerable_version_range: Option<String>,
    pub severity: Option<String>,
    pub first_patched_version: Option<PatchedVersion>,
    pub advisory: RawAdvisory,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatchedVersion {
    pub identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAdvisory {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub permalink: Option<String>,
    pub published_at: Option<String>,
    pub updated_at: Option<String>,
    pub cvss: Option<Cvss>,
    pub identifiers: Vec<Identifier>,
    pub references: Vec<Reference>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Cvss {
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Reference {
    pub url: Option<String>,
}

/// One advisory affecting the package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vulnerability {
    pub severity: String,
    pub permalink: Option<String>,
    pub summary: Option<String>,
    pub cvss_score: Option<f64>,
    pub vulnerable_version_range: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub description: Option<String>,
    pub references: Vec<String>,
    pub published_at: Option<String>,
    pub updated_at: Option<String>,
    pub first_patched_version: Option<String>,
}

/// Advisories grouped by severity, most severe first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityGroups {
    #[serde(rename = "CRITICAL", default, skip_serializing_if = "Vec::is_empty")]
    pub critical: Vec<Vulnerability>,
    #[serde(rename = "HIGH", default, skip_serializing_if = "Vec::is_empty")]
    pub high: Vec<Vulnerability>,
    #[serde(rename = "MODERATE", default, skip_serializing_if = "Vec::is_empty")]
    pub moderate: Vec<Vulnerability>,
    #[serde(rename = "LOW", default, skip_serializing_if = "Vec::is_empty")]
    pub low: Vec<Vulnerability>,
}

impl SeverityGroups {
    fn slot(&mut self, severity: &str) -> Option<&mut Vec<Vulnerability>> {
        match severity {
            "CRITICAL" => Some(&mut self.critical),
            "HIGH" => Some(&mut self.high),
            "MODERATE" => Some(&mut self.moderate),
            "LOW" => Some(&mut self.low),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.critical.len() + self.high.len() + self.moderate.len() + self.low.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityReport {
    /// Lowest version that clears every known advisory, starting from the requested version.
    pub stable_version: Option<String>,
    pub sorted_vulnerabilities: SeverityGroups,
}

/// Group advisories by severity and compute the stable version.
#[must_use]
pub fn vulnerability_report(data: VulnerabilitiesData, current_version: &str) -> VulnerabilityReport {
    let nodes: Vec<RawVulnerability> = data.security_vulnerabilities.edges.into_iter().map(|e| e.node).collect();

    let stable_version = stable_version(
        current_version,
        nodes
            .iter()
            .map(|n| (n.first_patched_version.as_ref().and_then(|p| p.identifier.as_deref()), n.vulnerable_version_range.as_deref())),
    );

    let mut groups = SeverityGroups::default();
    for node in nodes {
        let severity = node.severity.unwrap_or_default().to_ascii_uppercase();
        let permalink = node.advisory.permalink;
        let references = node
            .advisory
            .references
            .into_iter()
            .filter_map(|r| r.url)
            .filter(|url| Some(url) != permalink.as_ref())
            .collect();

        let vulnerability = Vulnerability {
            severity: severity.clone(),
            permalink,
            summary: node.advisory.summary,
            cvss_score: node.advisory.cvss.and_then(|c| c.score),
            vulnerable_version_range: node.vulnerable_version_range,
            identifiers: node.advisory.identifiers,
            description: node.advisory.description,
            references,
            published_at: node.advisory.published_at,
            updated_at: node.advisory.updated_at,
            first_patched_version: node.first_patched_version.and_then(|p| p.identifier),
        };

        if let Some(slot) = groups.slot(&severity) {
            slot.push(vulnerability);
        }
    }

    VulnerabilityReport {
        stable_version,
        sorted_vulnerabilities: groups,
    }
}

/// Walk the advisories and raise the running version past each one.
///
/// `advisories` yields `(first_patched_version, vulnerable_version_range)` pairs. A
/// start version that is not semver (for example a dist-tag) is treated as unknown,
/// so the first usable candidate wins.
pub fn stable_version<'a>(start: &str, advisories: impl IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>) -> Option<String> {
    let mut stable: Option<Version> = parse_loose(start);

    for (patched, range) in advisories {
        let candidate = match patched.and_then(parse_loose) {
            Some(v) => Some(v),
            None => range.and_then(next_stable_version),
        };

        if let Some(candidate) = candidate
            && stable.as_ref().is_none_or(|s| candidate > *s)
        {
            stable = Some(candidate);
        }
    }

    stable.map(|v| v.to_string()).or_else(|| Some(start.to_string()).filter(|s| !s.is_empty()))
}

/// The highest upper bound mentioned in a vulnerable range, with its patch component bumped.
///
/// Ranges look like `< 1.2.3`, `>= 1.0.0, <= 1.4.0` or `= 0.9.1`, optionally joined by `||`.
#[must_use]
pub fn next_stable_version(range: &str) -> Option<Version> {
    let mut max: Option<Version> = None;

    for comparator in range.split("||").flat_map(|part| part.split(',')) {
        let comparator = comparator.trim();
        let bound = if let Some(rest) = comparator.strip_prefix("<=") {
            rest
        } else if let Some(rest) = comparator.strip_prefix('<') {
            rest
        } else if let Some(rest) = comparator.strip_prefix('=') {
            rest
        } else {
            continue;
        };

        if let Some(version) = parse_loose(bound)
            && max.as_ref().is_none_or(|m| version > *m)
        {
            max = Some(version);
        }
    }

    max.map(|mut v| {
        v.patch += 1;
        v.pre = semver::Prerelease::EMPTY;
        v.build = semver::BuildMetadata::EMPTY;
        v
    })
}

/// Parse a version, accepting a leading `v` and missing minor/patch components.
fn parse_loose(text: &str) -> Option<Version> {
    let text = text.trim();
    let text = text.strip_prefix('v').unwrap_or(text);
    if let Ok(v) = Version::parse(text) {
        return Some(v);
    }

    let parts: Vec<&str> = text.split('.').collect();
    let padded = match parts.len() {
        1 => format!("{text}.0.0"),
        2 => format!("{text}.0"),
        _ => return None,
    };
    Version::parse(&padded).ok()
}
