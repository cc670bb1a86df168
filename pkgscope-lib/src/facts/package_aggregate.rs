use super::UpstreamResult;
use super::bundle::BundleInfo;
use super::hosting::GitHubInfo;
use super::registry::NpmInfo;
use super::scorecard::ScoreInfo;
use super::vulnerability::VulnInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything known about one package, one field per upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageAggregate {
    pub npm: UpstreamResult<NpmInfo>,
    pub bundle: UpstreamResult<BundleInfo>,
    #[serde(rename = "gitHub")]
    pub github: UpstreamResult<GitHubInfo>,
    pub security_score: UpstreamResult<ScoreInfo>,
    pub vulnerability_score: UpstreamResult<VulnInfo>,
    pub performance: Performance,
}

impl PackageAggregate {
    /// Number of fields that hold data.
    #[must_use]
    pub fn ok_count(&self) -> usize {
        [
            self.npm.is_ok(),
            self.bundle.is_ok(),
            self.github.is_ok(),
            self.security_score.is_ok(),
            self.vulnerability_score.is_ok(),
        ]
        .into_iter()
        .filter(|ok| *ok)
        .count()
    }
}

/// Timing attached to every aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub total_time_ms: u64,
    pub timestamp_iso: String,

    /// Elapsed milliseconds per upstream that was called.
    pub calls: BTreeMap<String, u64>,

    pub soft_deadline_exceeded: bool,
}
