//! Security scorecard service.

use super::resilient_http::{RequestSpec, ResilientClient};
use super::{RepoSpec, UpstreamFailure, UpstreamResult, encode_component, trim_base};
use serde::{Deserialize, Serialize};
use url::Url;

const LOG_TARGET: &str = " scorecard";

/// Maximum score a repository can be awarded.
pub const OVERALL_SCORE: u8 = 10;

pub const OWNER_OR_REPO_MISSING: &str = "Either owner or repo is missing.";
pub const NO_SCORECARD: &str = "No scorecard found for repository";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawScorecard {
    pub date: Option<String>,
    pub score: Option<f64>,
    pub checks: Vec<RawCheck>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCheck {
    pub name: Option<String>,
    pub score: Option<f64>,
    pub reason: Option<String>,
    pub details: Option<Vec<String>>,
    pub documentation: Option<Documentation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Documentation {
    pub short: Option<String>,
    pub url: Option<String>,
}

/// Normalized scorecard data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInfo {
    pub last_scanned: Option<String>,
    pub overall_score: u8,
    pub score: Option<f64>,
    pub checks: Vec<Check>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub name: Option<String>,
    pub score: f64,
    pub reason: Option<String>,
    pub details: Option<Vec<String>>,
    pub description: Option<String>,
}

impl From<RawScorecard> for ScoreInfo {
    fn from(raw: RawScorecard) -> Self {
        // checks the service could not evaluate carry a negative score
        let mut checks: Vec<Check> = raw
            .checks
            .into_iter()
            .filter_map(|c| {
                let score = c.score.filter(|s| *s >= 0.0)?;
                Some(Check {
                    name: c.name,
                    score,
                    reason: c.reason,
                    details: c.details,
                    description: c.documentation.and_then(|d| d.short),
                })
            })
            .collect();
        checks.sort_by(|a, b| b.score.total_cmp(&a.score));

        Self {
            last_scanned: raw.date,
            overall_score: OVERALL_SCORE,
            score: raw.score,
            checks,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScorecardGateway {
    client: ResilientClient,
    base_url: String,
}

impl ScorecardGateway {
    #[must_use]
    pub fn new(client: ResilientClient, base_url: &Url) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
        }
    }

    /// Fetch the scorecard for a GitHub repository.
    ///
    /// Without both an owner and a repository name no call is made.
    pub async fn security_score(&self, owner: &str, repo: &str) -> UpstreamResult<ScoreInfo> {
        let Some(repo_spec) = RepoSpec::new(owner, repo) else {
            return UpstreamFailure::missing_capability(OWNER_OR_REPO_MISSING).into();
        };

        let url = format!(
            "{}/projects/github.com/{}/{}",
            self.base_url,
            encode_component(repo_spec.owner()),
            encode_component(repo_spec.repo())
        );
        let spec = RequestSpec::get("scorecard", url);

        let result = UpstreamResult::from_http(self.client.request_json::<RawScorecard>(&spec).await, NO_SCORECARD).map(ScoreInfo::from);
        if let Some(failure) = result.failure() {
            log::debug!(target: LOG_TARGET, "Could not fetch scorecard for '{repo_spec}': {failure}");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FailureKind;
    use crate::facts::resilient_http::HttpSettings;

    #[test]
    fn test_checks_sorted_and_negative_dropped() {
        let raw: RawScorecard = serde_json::from_str(
            r#"{
                "date": "2024-05-27T00:00:00Z",
                "repo": { "name": "github.com/expressjs/express", "commit": "abc" },
                "score": 7.2,
                "checks": [
                    { "name": "Fuzzing", "score": 0, "reason": "project is not fuzzed", "details": null,
                      "documentation": { "short": "Determines if the project uses fuzzing.", "url": "https://x" } },
                    { "name": "Packaging", "score": -1, "reason": "packaging workflow not detected" },
                    { "name": "Maintained", "score": 10, "reason": "30 commits", "details": ["Info: x"] },
                    { "name": "License", "score": 9, "reason": "license file detected" },
                    { "name": "Unknown" }
                ]
            }"#,
        )
        .unwrap();
        let info = ScoreInfo::from(raw);

        assert_eq!(info.overall_score, 10);
        assert_eq!(info.score, Some(7.2));
        assert_eq!(info.last_scanned.as_deref(), Some("2024-05-27T00:00:00Z"));

        let names: Vec<_> = info.checks.iter().map(|c| c.name.as_deref().unwrap()).collect();
        assert_eq!(names, ["Maintained", "License", "Fuzzing"]);
        assert_eq!(info.checks[2].description.as_deref(), Some("Determines if the project uses fuzzing."));
    }

    #[test]
    fn test_serialized_names() {
        let value = serde_json::to_value(ScoreInfo::from(RawScorecard::default())).unwrap();
        assert_eq!(value["overallScore"], 10);
        assert!(value.get("lastScanned").is_some());
        assert_eq!(value["checks"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_missing_owner_or_repo_short_circuits() {
        let client = ResilientClient::new(HttpSettings::default()).unwrap();
        // unroutable base: any request would fail with a connect error, not missingCapability
        let gateway = ScorecardGateway::new(client, &Url::parse("http://127.0.0.1:9").unwrap());

        for (owner, repo) in [("", "express"), ("expressjs", ""), ("", "")] {
            let result = gateway.security_score(owner, repo).await;
            let failure = result.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::MissingCapability);
            assert_eq!(failure.reason, OWNER_OR_REPO_MISSING);
        }
    }
}
