use super::advisories::{VULNERABILITIES_QUERY, VulnerabilitiesData, VulnerabilityReport, vulnerability_report};
use super::client::{GraphQlClient, GraphQlError, GraphQlOutcome};
use super::github_info::{GitHubInfo, REPOSITORY_QUERY, RepositoryData};
use crate::facts::resilient_http::ResilientClient;
use crate::facts::{RepoSpec, UpstreamFailure, UpstreamResult};
use url::Url;

const LOG_TARGET: &str = "    github";

pub const REPOSITORY_NOT_FOUND: &str = "GitHub repository not found";
pub const NO_GITHUB_TOKEN: &str = "No GitHub token configured";

/// Gateway to GitHub's GraphQL API: repository facts and security advisories.
#[derive(Debug, Clone)]
pub struct GitHubGateway {
    graphql: GraphQlClient,
}

impl GitHubGateway {
    #[must_use]
    pub fn new(client: ResilientClient, endpoint: &Url, token: Option<&str>) -> Self {
        Self {
            graphql: GraphQlClient::new(client, endpoint.as_str(), token),
        }
    }

    /// Fetch repository facts, including the README text.
    ///
    /// An absent `repository` in the response means the repository does not exist.
    pub async fn repository(&self, repo: &RepoSpec) -> UpstreamResult<GitHubInfo> {
        if !self.graphql.has_token() {
            return UpstreamFailure::missing_capability(NO_GITHUB_TOKEN).into();
        }

        let variables = serde_json::json!({ "owner": repo.owner(), "name": repo.repo() });
        let result = match self.graphql.query::<RepositoryData>("github", REPOSITORY_QUERY, variables).await {
            GraphQlOutcome::Data(RepositoryData { repository: Some(raw) }) => UpstreamResult::Ok(GitHubInfo::from(raw)),
            GraphQlOutcome::Data(RepositoryData { repository: None }) => UpstreamFailure::not_found(REPOSITORY_NOT_FOUND).into(),
            GraphQlOutcome::Errors(errors) => graphql_failure(&errors, REPOSITORY_NOT_FOUND).into(),
            GraphQlOutcome::Http(e) => UpstreamResult::from_http(Err(e), REPOSITORY_NOT_FOUND),
        };

        if let Some(failure) = result.failure() {
            log::debug!(target: LOG_TARGET, "Could not fetch repository '{repo}': {failure}");
        }

        result
    }

    /// Fetch advisories for an npm package, grouped by severity.
    pub async fn vulnerabilities(&self, package: &str, version: &str) -> UpstreamResult<VulnerabilityReport> {
        if !self.graphql.has_token() {
            return UpstreamFailure::missing_capability(NO_GITHUB_TOKEN).into();
        }

        let variables = serde_json::json!({ "package": package });
        let result = match self.graphql.query::<VulnerabilitiesData>("github-advisories", VULNERABILITIES_QUERY, variables).await {
            GraphQlOutcome::Data(data) => UpstreamResult::Ok(vulnerability_report(data, version)),
            GraphQlOutcome::Errors(errors) => graphql_failure(&errors, "Package not found").into(),
            GraphQlOutcome::Http(e) => UpstreamResult::from_http(Err(e), "Package not found"),
        };

        if let Some(failure) = result.failure() {
            log::debug!(target: LOG_TARGET, "Could not fetch advisories for '{package}': {failure}");
        }

        result
    }
}

fn graphql_failure(errors: &[GraphQlError], not_found: &str) -> UpstreamFailure {
    if errors.iter().any(|e| e.kind.as_deref() == Some("NOT_FOUND")) {
        return UpstreamFailure::not_found(not_found);
    }

    let reason = errors
        .first()
        .map_or_else(|| "GraphQL response carried neither data nor errors".to_string(), |e| e.message.clone());
    UpstreamFailure::rejected(reason)
}
