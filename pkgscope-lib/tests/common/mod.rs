//! Helpers shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset of helpers")]

use core::time::Duration;
use pkgscope_lib::facts::key_selector::{KeyRotation, key_selector};
use pkgscope_lib::facts::resilient_http::{HttpSettings, ResilientClient, RetryPolicy};
use pkgscope_lib::facts::{Collector, Gateways, Upstreams};
use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

/// Transport settings with millisecond retry delays.
pub fn fast_settings() -> HttpSettings {
    HttpSettings {
        request_timeout: Duration::from_millis(500),
        retry: RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        },
        ..HttpSettings::default()
    }
}

pub fn client() -> ResilientClient {
    ResilientClient::new(fast_settings()).unwrap()
}

pub fn base_url(server: &MockServer) -> Url {
    Url::parse(&server.uri()).unwrap()
}

/// Gateways pointed at one mock server, with a GitHub token and one API key.
pub fn gateways(server: &MockServer) -> Gateways {
    gateways_with(server, Some("test-token"), vec!["test-key".to_string()])
}

pub fn gateways_with(server: &MockServer, github_token: Option<&str>, keys: Vec<String>) -> Gateways {
    Gateways::new(
        &client(),
        &Upstreams::all_at(&base_url(server)),
        github_token,
        key_selector(KeyRotation::RoundRobin, keys),
        365,
    )
}

pub fn collector(server: &MockServer) -> Collector {
    Collector::new(gateways(server), Duration::from_secs(30))
}

pub fn express_manifest() -> Value {
    json!({
        "name": "express",
        "version": "4.19.2",
        "description": "Fast, unopinionated, minimalist web framework",
        "license": "MIT",
        "repository": { "type": "git", "url": "git+https://github.com/expressjs/express.git" },
        "homepage": "http://expressjs.com/",
        "engines": { "node": ">= 0.10.0" },
        "dependencies": { "accepts": "~1.3.8", "body-parser": "1.20.2" },
        "maintainers": [{ "name": "wesleytodd", "email": "wes@wesleytodd.com" }],
        "dist": { "unpackedSize": 220000, "fileCount": 16 }
    })
}

pub fn express_bundle() -> Value {
    json!({
        "name": "express",
        "version": "4.19.2",
        "size": 208_000,
        "gzip": 82_000,
        "dependencyCount": 31,
        "hasJSModule": false,
        "hasJSNext": false,
        "hasSideEffects": true,
        "dependencySizes": [{ "name": "express", "approximateSize": 60_000 }]
    })
}

pub fn express_repository() -> Value {
    json!({
        "data": {
            "repository": {
                "url": "https://github.com/expressjs/express",
                "name": "express",
                "updatedAt": "2024-05-27T10:00:00Z",
                "forkCount": 16000,
                "description": "Fast, unopinionated, minimalist web framework for node.",
                "stargazerCount": 64000,
                "homepageUrl": "https://expressjs.com",
                "mentionableUsers": { "totalCount": 300 },
                "licenseInfo": { "spdxId": "MIT" },
                "latestRelease": { "tagName": "v4.19.2" },
                "owner": { "login": "expressjs", "avatarUrl": "https://avatars.githubusercontent.com/u/5658226" },
                "issues": { "totalCount": 120 },
                "pullRequests": { "totalCount": 60 },
                "watchers": { "totalCount": 1700 },
                "primaryLanguage": { "name": "TypeScript" },
                "languages": { "totalSize": 1000, "edges": [{ "size": 1000, "node": { "name": "TypeScript", "color": "#3178c6" } }] },
                "readMe": { "text": "# Express" }
            }
        }
    })
}

pub fn express_scorecard() -> Value {
    json!({
        "date": "2024-05-27T00:00:00Z",
        "score": 7.2,
        "checks": [
            { "name": "Maintained", "score": 10, "reason": "30 commits", "documentation": { "short": "Is maintained" } },
            { "name": "Fuzzing", "score": -1, "reason": "not evaluated" }
        ]
    })
}

pub fn express_score() -> Value {
    json!({
        "supplyChainRisk": { "score": 0.9 },
        "quality": { "score": 0.8 },
        "maintenance": { "score": 0.7 },
        "vulnerability": { "score": 1.0 },
        "license": { "score": 1.0 },
        "depscore": 0.86
    })
}
