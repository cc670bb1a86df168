use super::bundle::BundleGateway;
use super::download_stats::DownloadStatsGateway;
use super::hosting::{GitHubGateway, GitHubInfo};
use super::key_selector::KeySelector;
use super::registry::{NpmInfo, RegistryGateway};
use super::resilient_http::ResilientClient;
use super::scorecard::ScorecardGateway;
use super::vulnerability::VulnerabilityGateway;
use super::{PackageAggregate, Performance, RepoSpec, UpstreamFailure, UpstreamResult, Upstreams};
use chrono::{SecondsFormat, Utc};
use core::future::Future;
use core::time::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

const LOG_TARGET: &str = " collector";

pub const NO_REGISTRY_DATA: &str = "Registry data unavailable";
pub const NO_GITHUB_URL: &str = "No GitHub repository URL found in package metadata";
pub const NO_GITHUB_DATA: &str = "No GitHub data";
pub const NO_PACKAGE_VERSION: &str = "No package name and version from registry";

/// Every gateway, built once and shared by all requests.
#[derive(Debug, Clone)]
pub struct Gateways {
    pub registry: RegistryGateway,
    pub downloads: DownloadStatsGateway,
    pub bundle: BundleGateway,
    pub github: GitHubGateway,
    pub scorecard: ScorecardGateway,
    pub vulnerability: VulnerabilityGateway,
}

impl Gateways {
    #[must_use]
    pub fn new(
        client: &ResilientClient,
        upstreams: &Upstreams,
        github_token: Option<&str>,
        api_keys: Arc<dyn KeySelector>,
        max_days_per_request: u32,
    ) -> Self {
        Self {
            registry: RegistryGateway::new(client.clone(), &upstreams.registry),
            downloads: DownloadStatsGateway::new(client.clone(), &upstreams.downloads, max_days_per_request),
            bundle: BundleGateway::new(client.clone(), &upstreams.bundle),
            github: GitHubGateway::new(client.clone(), &upstreams.github, github_token),
            scorecard: ScorecardGateway::new(client.clone(), &upstreams.scorecard),
            vulnerability: VulnerabilityGateway::new(client.clone(), &upstreams.vulnerability, api_keys),
        }
    }
}

/// Result of collecting one package.
#[derive(Debug)]
pub enum PackageOutcome {
    Found(Box<PackageAggregate>),

    /// The registry does not know the package; nothing else was collected.
    NotFound(UpstreamFailure),
}

/// Aggregation orchestrator for package requests.
#[derive(Debug, Clone)]
pub struct Collector {
    gateways: Gateways,
    soft_deadline: Duration,
}

/// Per-upstream elapsed time, recorded only for upstreams that were called.
#[derive(Debug, Default)]
struct CallTimings(BTreeMap<String, u64>);

impl CallTimings {
    fn record(&mut self, upstream: &str, elapsed: Duration) {
        let _ = self.0.insert(upstream.to_string(), millis(elapsed));
    }
}

impl Collector {
    #[must_use]
    pub const fn new(gateways: Gateways, soft_deadline: Duration) -> Self {
        Self { gateways, soft_deadline }
    }

    #[must_use]
    pub const fn gateways(&self) -> &Gateways {
        &self.gateways
    }

    /// Collect everything known about `package`.
    ///
    /// Runs three phases. Phase 1 fetches the registry manifest and the bundle size
    /// concurrently; a registry "not found" returns immediately and drops the pending
    /// bundle call. Phase 2 resolves GitHub facts when the manifest names a GitHub
    /// repository. Phase 3 fetches the scorecard and the vulnerability score
    /// concurrently. Failures of individual upstreams are recorded in their fields.
    pub async fn collect(&self, package: &str) -> PackageOutcome {
        let started = Instant::now();
        let mut timings = CallTimings::default();

        // Phase 1
        let registry = timed(self.gateways.registry.package_info(package, "latest"));
        let bundle = timed(self.gateways.bundle.bundle_info(package));
        tokio::pin!(registry, bundle);

        let ((npm, npm_elapsed), (bundle, bundle_elapsed)) = tokio::select! {
            npm = &mut registry => {
                if npm.0.is_not_found() {
                    log::info!(target: LOG_TARGET, "Package '{package}' not found in registry after {}ms", millis(npm.1));
                    return PackageOutcome::NotFound(not_found_failure(npm.0));
                }
                (npm, bundle.await)
            }
            bundle = &mut bundle => (registry.await, bundle),
        };
        timings.record("registry", npm_elapsed);
        timings.record("bundle", bundle_elapsed);

        if npm.is_not_found() {
            log::info!(target: LOG_TARGET, "Package '{package}' not found in registry");
            return PackageOutcome::NotFound(not_found_failure(npm));
        }

        // Phase 2
        let repo = npm.as_ref().and_then(|info| RepoSpec::from_candidates(info.repository_candidates()));
        let github = match (&npm, &repo) {
            (UpstreamResult::Failed(_), _) => UpstreamFailure::missing_capability(NO_REGISTRY_DATA).into(),
            (UpstreamResult::Ok(_), None) => UpstreamFailure::missing_capability(NO_GITHUB_URL).into(),
            (UpstreamResult::Ok(_), Some(repo)) => {
                let (github, elapsed) = timed(self.gateways.github.repository(repo)).await;
                timings.record("gitHub", elapsed);
                github
            }
        };

        // Phase 3
        let score_target = scorecard_target(&github, repo.as_ref());
        let vuln_target = vulnerability_target(&npm);

        let security = async {
            match &score_target {
                Some((owner, name)) => Some(timed(self.gateways.scorecard.security_score(owner, name)).await),
                None => None,
            }
        };
        let vulnerability = async {
            match &vuln_target {
                Some((name, version)) => Some(timed(self.gateways.vulnerability.vulnerability_score(name, version)).await),
                None => None,
            }
        };
        let (security, vulnerability) = tokio::join!(security, vulnerability);

        let security_score = match security {
            Some((result, elapsed)) => {
                timings.record("securityScore", elapsed);
                result
            }
            None => UpstreamFailure::missing_capability(NO_GITHUB_DATA).into(),
        };
        let vulnerability_score = match vulnerability {
            Some((result, elapsed)) => {
                timings.record("vulnerabilityScore", elapsed);
                result
            }
            None => UpstreamFailure::missing_capability(NO_PACKAGE_VERSION).into(),
        };

        // Composition
        let total = started.elapsed();
        let soft_deadline_exceeded = total > self.soft_deadline;
        if soft_deadline_exceeded {
            log::warn!(
                target: LOG_TARGET,
                "Collecting '{package}' took {}ms, over the {}ms soft deadline; calls: {:?}",
                millis(total),
                millis(self.soft_deadline),
                timings.0,
            );
        }

        let aggregate = PackageAggregate {
            npm,
            bundle,
            github,
            security_score,
            vulnerability_score,
            performance: Performance {
                total_time_ms: millis(total),
                timestamp_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                calls: timings.0,
                soft_deadline_exceeded,
            },
        };

        log::debug!(
            target: LOG_TARGET,
            "Collected '{package}' in {}ms with {}/5 upstreams answering",
            aggregate.performance.total_time_ms,
            aggregate.ok_count(),
        );

        PackageOutcome::Found(Box::new(aggregate))
    }
}

/// Owner and name for the scorecard, taken from a successful GitHub lookup.
fn scorecard_target(github: &UpstreamResult<GitHubInfo>, repo: Option<&RepoSpec>) -> Option<(String, String)> {
    let info = github.as_ref()?;
    let owner = info.owner.as_deref().or_else(|| repo.map(RepoSpec::owner))?;
    let name = info.name.as_deref().or_else(|| repo.map(RepoSpec::repo))?;
    Some((owner.to_string(), name.to_string()))
}

fn vulnerability_target(npm: &UpstreamResult<NpmInfo>) -> Option<(String, String)> {
    let info = npm.as_ref()?;
    Some((info.name.clone()?, info.version.clone()?))
}

fn not_found_failure<T>(result: UpstreamResult<T>) -> UpstreamFailure {
    match result {
        UpstreamResult::Failed(failure) => failure,
        UpstreamResult::Ok(_) => UpstreamFailure::not_found(super::registry::PACKAGE_NOT_FOUND),
    }
}

async fn timed<T>(future: impl Future<Output = T>) -> (T, Duration) {
    let started = Instant::now();
    let output = future.await;
    (output, started.elapsed())
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FailureKind;

    fn github_info(owner: Option<&str>, name: Option<&str>) -> GitHubInfo {
        serde_json::from_value(serde_json::json!({
            "url": null, "name": name, "owner": owner, "avatar": null, "description": null,
            "license": null, "homepageUrl": null, "stars": 0, "forks": 0, "issues": 0, "prs": 0,
            "watchers": 0, "contributors": 0, "updatedAt": null, "primaryLanguage": null,
            "languages": [], "version": null, "readMe": null
        }))
        .unwrap()
    }

    #[test]
    fn test_scorecard_target_prefers_github_names() {
        let repo = RepoSpec::new("old-owner", "old-name");
        let github = UpstreamResult::Ok(github_info(Some("new-owner"), Some("new-name")));

        let target = scorecard_target(&github, repo.as_ref()).unwrap();
        assert_eq!(target, ("new-owner".to_string(), "new-name".to_string()));
    }

    #[test]
    fn test_scorecard_target_falls_back_to_repo_spec() {
        let repo = RepoSpec::new("owner", "name");
        let github = UpstreamResult::Ok(github_info(None, None));

        let target = scorecard_target(&github, repo.as_ref()).unwrap();
        assert_eq!(target, ("owner".to_string(), "name".to_string()));
    }

    #[test]
    fn test_scorecard_target_requires_github_success() {
        let repo = RepoSpec::new("owner", "name");
        let github: UpstreamResult<GitHubInfo> = UpstreamFailure::not_found("gone").into();
        assert!(scorecard_target(&github, repo.as_ref()).is_none());
    }

    #[test]
    fn test_not_found_failure_keeps_reason() {
        let failure = not_found_failure::<()>(UpstreamFailure::not_found("Package not found").into());
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert_eq!(failure.reason, "Package not found");
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(1500)), 1500);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_timed_measures_elapsed() {
        let (value, elapsed) = timed(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            7
        })
        .await;

        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(20));
    }
}
