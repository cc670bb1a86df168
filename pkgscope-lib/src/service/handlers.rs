use super::ServiceState;
use crate::downloads::download_summary;
use crate::facts::download_stats::{DOWNLOADS_NOT_FOUND, DateRange};
use crate::facts::registry::PACKAGE_NOT_FOUND;
use crate::facts::{PackageOutcome, RepoSpec, UpstreamResult};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const PROJECT_NAME_MISSING: &str = "Project name missing";
pub const EITHER_OWNER_OR_REPO_MISSING: &str = "Either owner or repo is missing.";
pub const SEARCH_QUERY_MISSING: &str = "Search query missing";
pub const SOMETHING_WENT_WRONG: &str = "Something went wrong";
pub const NOT_FOUND_ROUTE: &str = "Not found";

const LATEST: &str = "latest";

type SharedState = State<Arc<ServiceState>>;

#[derive(Debug, Default, Deserialize)]
pub struct PackageQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadsQuery {
    pub package_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub daily_downloads: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NpmQuery {
    project: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BundleQuery {
    package: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OwnerRepoQuery {
    pub owner: Option<String>,
    pub repo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NameVersionQuery {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

/// A `{"message": ...}` body with the given status.
pub fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

/// 404 for a `notFound` failure, 200 for everything else.
fn upstream<T: Serialize>(result: &UpstreamResult<T>) -> Response {
    let status = if result.is_not_found() { StatusCode::NOT_FOUND } else { StatusCode::OK };
    (status, Json(result)).into_response()
}

/// A query value that is present and not blank.
fn required(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn version_or_latest(value: Option<&String>) -> &str {
    required(value).unwrap_or(LATEST)
}

pub async fn package(State(state): SharedState, Query(query): Query<PackageQuery>) -> Response {
    let Some(name) = required(query.q.as_ref()) else {
        return message(StatusCode::NOT_FOUND, PROJECT_NAME_MISSING);
    };

    match state.collector.collect(name).await {
        PackageOutcome::Found(aggregate) => Json(aggregate).into_response(),
        PackageOutcome::NotFound(_) => message(StatusCode::NOT_FOUND, PACKAGE_NOT_FOUND),
    }
}

pub async fn downloads(State(state): SharedState, Query(query): Query<DownloadsQuery>) -> Response {
    let Some(name) = required(query.package_name.as_ref()) else {
        return message(StatusCode::NOT_FOUND, PROJECT_NAME_MISSING);
    };

    let range = DateRange {
        start: query.start_date.unwrap_or(state.first_available_date),
        end: query.end_date.unwrap_or_else(|| Utc::now().date_naive()),
    };

    let gateway = &state.collector.gateways().downloads;
    let result = download_summary(gateway, name, range, query.daily_downloads.unwrap_or(false)).await;
    if result.is_not_found() {
        return message(StatusCode::NOT_FOUND, DOWNLOADS_NOT_FOUND);
    }

    upstream(&result)
}

pub async fn npm(State(state): SharedState, Query(query): Query<NpmQuery>) -> Response {
    let Some(name) = required(query.project.as_ref()) else {
        return message(StatusCode::NOT_FOUND, PROJECT_NAME_MISSING);
    };

    let version = version_or_latest(query.version.as_ref());
    upstream(&state.collector.gateways().registry.package_info(name, version).await)
}

pub async fn bundlephobia(State(state): SharedState, Query(query): Query<BundleQuery>) -> Response {
    let Some(name) = required(query.package.as_ref()) else {
        return message(StatusCode::NOT_FOUND, PROJECT_NAME_MISSING);
    };

    upstream(&state.collector.gateways().bundle.bundle_info(name).await)
}

pub async fn search(State(state): SharedState, Query(query): Query<SearchQuery>) -> Response {
    let Some(text) = required(query.q.as_ref()) else {
        return message(StatusCode::NOT_FOUND, SEARCH_QUERY_MISSING);
    };

    upstream(&state.collector.gateways().registry.search(text, query.size).await)
}

pub async fn github(State(state): SharedState, Query(query): Query<OwnerRepoQuery>) -> Response {
    let Some(repo) = owner_repo(&query) else {
        return message(StatusCode::NOT_FOUND, EITHER_OWNER_OR_REPO_MISSING);
    };

    upstream(&state.collector.gateways().github.repository(&repo).await)
}

pub async fn scan(State(state): SharedState, Query(query): Query<OwnerRepoQuery>) -> Response {
    let Some(repo) = owner_repo(&query) else {
        return message(StatusCode::NOT_FOUND, EITHER_OWNER_OR_REPO_MISSING);
    };

    upstream(&state.collector.gateways().scorecard.security_score(repo.owner(), repo.repo()).await)
}

pub async fn vulnerabilities(State(state): SharedState, Query(query): Query<NameVersionQuery>) -> Response {
    let Some(name) = required(query.name.as_ref()) else {
        return message(StatusCode::NOT_FOUND, PROJECT_NAME_MISSING);
    };

    let version = version_or_latest(query.version.as_ref());
    upstream(&state.collector.gateways().github.vulnerabilities(name, version).await)
}

pub async fn vulnerability_score(State(state): SharedState, Query(query): Query<NameVersionQuery>) -> Response {
    let Some(name) = required(query.name.as_ref()) else {
        return message(StatusCode::NOT_FOUND, PROJECT_NAME_MISSING);
    };

    let version = version_or_latest(query.version.as_ref());
    upstream(&state.collector.gateways().vulnerability.vulnerability_score(name, version).await)
}

pub async fn health(State(state): SharedState) -> Json<impl Serialize> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started.elapsed().as_secs(),
    })
}

pub async fn not_found() -> Response {
    message(StatusCode::NOT_FOUND, NOT_FOUND_ROUTE)
}

fn owner_repo(query: &OwnerRepoQuery) -> Option<RepoSpec> {
    RepoSpec::new(required(query.owner.as_ref())?, required(query.repo.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::UpstreamFailure;

    #[test]
    fn test_required_rejects_blank_values() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some(&String::new())), None);
        assert_eq!(required(Some(&"   ".to_string())), None);
        assert_eq!(required(Some(&" react ".to_string())), Some("react"));
    }

    #[test]
    fn test_version_defaults_to_latest() {
        assert_eq!(version_or_latest(None), "latest");
        assert_eq!(version_or_latest(Some(&"1.2.3".to_string())), "1.2.3");
    }

    #[test]
    fn test_owner_repo_needs_both_parts() {
        let query = OwnerRepoQuery {
            owner: Some("facebook".into()),
            repo: None,
        };
        assert!(owner_repo(&query).is_none());

        let query = OwnerRepoQuery {
            owner: Some("facebook".into()),
            repo: Some("react.git".into()),
        };
        assert_eq!(owner_repo(&query).unwrap().to_string(), "facebook/react");
    }

    #[test]
    fn test_upstream_status_follows_failure_kind() {
        let missing: UpstreamResult<()> = UpstreamFailure::not_found("gone").into();
        assert_eq!(upstream(&missing).status(), StatusCode::NOT_FOUND);

        let capability: UpstreamResult<()> = UpstreamFailure::missing_capability("no token").into();
        assert_eq!(upstream(&capability).status(), StatusCode::OK);

        assert_eq!(upstream(&UpstreamResult::Ok(1)).status(), StatusCode::OK);
    }
}
