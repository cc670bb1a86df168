//! Vulnerability scoring service.

use super::key_selector::KeySelector;
use super::resilient_http::{RequestSpec, ResilientClient};
use super::{UpstreamFailure, UpstreamResult, encode_component, trim_base};
use reqwest::header::{ACCEPT, HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

const LOG_TARGET: &str = "     vulns";

pub const NO_API_KEY: &str = "No vulnerability API key configured";
pub const NO_SCORE: &str = "No vulnerability score found for package";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawScore {
    pub supply_chain_risk: Option<Component>,
    pub quality: Option<Component>,
    pub maintenance: Option<Component>,
    pub vulnerability: Option<Component>,
    pub license: Option<Component>,
    pub depscore: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Component {
    pub score: Option<f64>,
}

/// Normalized vulnerability scores, each as a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnInfo {
    pub supply_chain: Option<u8>,
    pub quality: Option<u8>,
    pub maintenance: Option<u8>,
    pub vulnerability: Option<u8>,
    pub license: Option<u8>,
    pub overall: Option<u8>,
}

impl From<RawScore> for VulnInfo {
    fn from(raw: RawScore) -> Self {
        let component = |c: Option<Component>| c.and_then(|c| c.score).map(percent);
        Self {
            supply_chain: component(raw.supply_chain_risk),
            quality: component(raw.quality),
            maintenance: component(raw.maintenance),
            vulnerability: component(raw.vulnerability),
            license: component(raw.license),
            overall: raw.depscore.map(percent),
        }
    }
}

/// Convert a 0..=1 fraction into a rounded percentage.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "value is clamped to 0..=100 first")]
fn percent(fraction: f64) -> u8 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone)]
pub struct VulnerabilityGateway {
    client: ResilientClient,
    base_url: String,
    keys: Arc<dyn KeySelector>,
}

impl VulnerabilityGateway {
    #[must_use]
    pub fn new(client: ResilientClient, base_url: &Url, keys: Arc<dyn KeySelector>) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
            keys,
        }
    }

    /// Fetch the score for one package version.
    ///
    /// Each call authenticates with a key chosen by the configured rotation strategy.
    pub async fn vulnerability_score(&self, name: &str, version: &str) -> UpstreamResult<VulnInfo> {
        let Some(key) = self.keys.select() else {
            return UpstreamFailure::missing_capability(NO_API_KEY).into();
        };

        let url = format!(
            "{}/v0/npm/{}/{}/score",
            self.base_url,
            encode_component(name),
            encode_component(version)
        );
        let spec = RequestSpec::get("vulnerability", url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .basic_auth(key, key);

        let result = UpstreamResult::from_http(self.client.request_json::<RawScore>(&spec).await, NO_SCORE).map(VulnInfo::from);
        if let Some(failure) = result.failure() {
            log::debug!(target: LOG_TARGET, "Could not fetch vulnerability score for '{name}@{version}': {failure}");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FailureKind;
    use crate::facts::key_selector::{KeyRotation, key_selector};
    use crate::facts::resilient_http::HttpSettings;

    #[test]
    fn test_score_maps_to_percentages() {
        let raw: RawScore = serde_json::from_str(
            r#"{
                "supplyChainRisk": { "score": 0.912, "components": {} },
                "quality": { "score": 0.5 },
                "maintenance": { "score": 1.0 },
                "vulnerability": { "score": 0.0 },
                "license": {},
                "miscellaneous": { "score": 1 },
                "depscore": 0.795
            }"#,
        )
        .unwrap();
        let info = VulnInfo::from(raw);

        assert_eq!(info.supply_chain, Some(91));
        assert_eq!(info.quality, Some(50));
        assert_eq!(info.maintenance, Some(100));
        assert_eq!(info.vulnerability, Some(0));
        assert_eq!(info.license, None);
        assert_eq!(info.overall, Some(80));
    }

    #[test]
    fn test_percent_clamps() {
        assert_eq!(percent(1.7), 100);
        assert_eq!(percent(-0.2), 0);
    }

    #[tokio::test]
    async fn test_no_keys_is_missing_capability() {
        let client = ResilientClient::new(HttpSettings::default()).unwrap();
        let gateway = VulnerabilityGateway::new(
            client,
            &Url::parse("http://127.0.0.1:9").unwrap(),
            key_selector(KeyRotation::RoundRobin, Vec::new()),
        );

        let result = gateway.vulnerability_score("express", "4.19.2").await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::MissingCapability);
        assert_eq!(failure.reason, NO_API_KEY);
    }
}
