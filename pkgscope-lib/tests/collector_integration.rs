//! End-to-end aggregation scenarios with every upstream mocked on one server.

mod common;

use core::time::Duration;
use pkgscope_lib::facts::{
    Collector, FailureKind, NO_GITHUB_DATA, NO_GITHUB_URL, NO_REGISTRY_DATA, PackageAggregate, PackageOutcome,
};
use serde_json::json;
use std::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_registry(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/express/latest"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_bundle(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/size"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::express_bundle()))
        .mount(server)
        .await;
}

async fn mount_dependents(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::express_repository()))
        .expect(expected_calls)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/github.com/expressjs/express"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::express_scorecard()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_vulnerability(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/v0/npm/express/4.19.2/score"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::express_score()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn found(outcome: PackageOutcome) -> PackageAggregate {
    match outcome {
        PackageOutcome::Found(aggregate) => *aggregate,
        PackageOutcome::NotFound(failure) => panic!("unexpected not found: {failure}"),
    }
}

#[tokio::test]
async fn test_all_upstreams_answer() {
    let server = MockServer::start().await;
    mount_registry(&server, 200, common::express_manifest()).await;
    mount_bundle(&server).await;
    mount_dependents(&server, 1).await;
    mount_vulnerability(&server, 1).await;

    let aggregate = found(common::collector(&server).collect("express").await);

    assert_eq!(aggregate.ok_count(), 5);
    let calls: Vec<_> = aggregate.performance.calls.keys().map(String::as_str).collect();
    assert_eq!(calls, ["bundle", "gitHub", "registry", "securityScore", "vulnerabilityScore"]);
    assert!(!aggregate.performance.soft_deadline_exceeded);

    let json = serde_json::to_value(&aggregate).unwrap();
    assert_eq!(json["npm"]["ok"]["name"], "express");
    assert_eq!(json["gitHub"]["ok"]["owner"], "expressjs");
    assert_eq!(json["securityScore"]["ok"]["overallScore"], 10);
    assert_eq!(json["vulnerabilityScore"]["ok"]["overall"], 86);
    assert!(json["performance"]["timestampIso"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_unknown_package_short_circuits() {
    let server = MockServer::start().await;
    mount_registry(&server, 404, json!({ "error": "Not found" })).await;
    Mock::given(method("GET"))
        .and(path("/api/size"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::express_bundle()).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    mount_dependents(&server, 0).await;
    mount_vulnerability(&server, 0).await;

    let started = Instant::now();
    let outcome = common::collector(&server).collect("express").await;

    let PackageOutcome::NotFound(failure) = outcome else {
        panic!("expected not found");
    };
    assert_eq!(failure.kind, FailureKind::NotFound);
    assert!(started.elapsed() < Duration::from_secs(2), "pending bundle call was awaited");
}

#[tokio::test]
async fn test_manifest_without_github_url() {
    let server = MockServer::start().await;
    let mut manifest = common::express_manifest();
    manifest["repository"] = json!({ "type": "git", "url": "https://gitlab.com/someone/express.git" });
    manifest["homepage"] = json!("https://express.example.com");
    mount_registry(&server, 200, manifest).await;
    mount_bundle(&server).await;
    mount_dependents(&server, 0).await;
    mount_vulnerability(&server, 1).await;

    let aggregate = found(common::collector(&server).collect("express").await);

    let github = aggregate.github.failure().unwrap();
    assert_eq!(github.kind, FailureKind::MissingCapability);
    assert_eq!(github.reason, NO_GITHUB_URL);

    let security = aggregate.security_score.failure().unwrap();
    assert_eq!(security.kind, FailureKind::MissingCapability);
    assert_eq!(security.reason, NO_GITHUB_DATA);

    assert!(aggregate.vulnerability_score.is_ok());
    assert!(!aggregate.performance.calls.contains_key("gitHub"));
    assert!(!aggregate.performance.calls.contains_key("securityScore"));
}

#[tokio::test]
async fn test_homepage_is_used_when_repository_is_missing() {
    let server = MockServer::start().await;
    let mut manifest = common::express_manifest();
    manifest["repository"] = serde_json::Value::Null;
    manifest["homepage"] = json!("https://github.com/expressjs/express#readme");
    mount_registry(&server, 200, manifest).await;
    mount_bundle(&server).await;
    mount_dependents(&server, 1).await;
    mount_vulnerability(&server, 1).await;

    let aggregate = found(common::collector(&server).collect("express").await);
    assert!(aggregate.github.is_ok());
    assert!(aggregate.security_score.is_ok());
}

#[tokio::test]
async fn test_every_upstream_failing_still_answers() {
    let server = MockServer::start().await;
    mount_registry(&server, 503, json!({})).await;
    Mock::given(method("GET"))
        .and(path("/api/size"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_dependents(&server, 0).await;
    mount_vulnerability(&server, 0).await;

    let aggregate = found(common::collector(&server).collect("express").await);

    assert_eq!(aggregate.ok_count(), 0);
    assert_eq!(aggregate.npm.failure().unwrap().kind, FailureKind::UpstreamUnavailable);
    assert_eq!(aggregate.bundle.failure().unwrap().kind, FailureKind::UpstreamUnavailable);
    assert_eq!(aggregate.github.failure().unwrap().reason, NO_REGISTRY_DATA);
    assert_eq!(aggregate.security_score.failure().unwrap().kind, FailureKind::MissingCapability);
    assert_eq!(aggregate.vulnerability_score.failure().unwrap().kind, FailureKind::MissingCapability);
}

#[tokio::test]
async fn test_github_failure_skips_scorecard_only() {
    let server = MockServer::start().await;
    mount_registry(&server, 200, common::express_manifest()).await;
    mount_bundle(&server).await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_vulnerability(&server, 1).await;

    let aggregate = found(common::collector(&server).collect("express").await);

    assert_eq!(aggregate.github.failure().unwrap().kind, FailureKind::UpstreamRejected);
    assert_eq!(aggregate.security_score.failure().unwrap().reason, NO_GITHUB_DATA);
    assert!(aggregate.vulnerability_score.is_ok());
}

#[tokio::test]
async fn test_soft_deadline_is_flagged_not_enforced() {
    let server = MockServer::start().await;
    mount_registry(&server, 200, common::express_manifest()).await;
    Mock::given(method("GET"))
        .and(path("/api/size"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::express_bundle()).set_delay(Duration::from_millis(50)))
        .mount(&server)
        .await;
    mount_dependents(&server, 1).await;
    mount_vulnerability(&server, 1).await;

    let collector = Collector::new(common::gateways(&server), Duration::from_millis(10));
    let aggregate = found(collector.collect("express").await);

    assert!(aggregate.performance.soft_deadline_exceeded);
    assert!(aggregate.bundle.is_ok());
    assert!(aggregate.performance.calls["bundle"] >= 50);
}
