//! Bundle size analyzer.

use super::resilient_http::{RequestSpec, ResilientClient};
use super::{UpstreamFailure, UpstreamResult, trim_base};
use serde::{Deserialize, Serialize};
use url::Url;

const LOG_TARGET: &str = "    bundle";

pub const ESM: &str = "ESM";
pub const CJS: &str = "CommonJS";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawBundle {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub size: Option<u64>,
    pub gzip: Option<u64>,
    pub dependency_count: Option<u64>,
    #[serde(rename = "hasJSModule")]
    pub has_js_module: Option<serde_json::Value>,
    #[serde(rename = "hasJSNext")]
    pub has_js_next: Option<serde_json::Value>,
    pub is_module_type: Option<bool>,
    pub has_side_effects: Option<serde_json::Value>,
    pub dependency_sizes: Vec<DependencySize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DependencySize {
    pub name: String,
    pub approximate_size: u64,
}

/// Normalized bundle size data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub size: Option<u64>,
    pub gzip: Option<u64>,
    pub dependency_count: Option<u64>,
    pub module_format: String,
    pub has_side_effects: bool,
    pub dependency_sizes: Vec<DependencySize>,
}

impl From<RawBundle> for BundleInfo {
    fn from(raw: RawBundle) -> Self {
        let is_esm = raw.has_js_module.as_ref().is_some_and(is_set)
            || raw.has_js_next.as_ref().is_some_and(is_set)
            || raw.is_module_type.unwrap_or(false);

        Self {
            name: raw.name,
            version: raw.version,
            description: raw.description,
            size: raw.size,
            gzip: raw.gzip,
            dependency_count: raw.dependency_count,
            module_format: if is_esm { ESM } else { CJS }.to_string(),
            // the analyzer reports either a flag or the list of files with side effects
            has_side_effects: raw.has_side_effects.as_ref().is_none_or(is_set),
            dependency_sizes: raw.dependency_sizes,
        }
    }
}

fn is_set(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}

/// Shape of the analyzer's error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct BundleGateway {
    client: ResilientClient,
    base_url: String,
}

impl BundleGateway {
    #[must_use]
    pub fn new(client: ResilientClient, base_url: &Url) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
        }
    }

    /// Fetch size data for `package`, which may carry a version (`name@1.2.3`).
    pub async fn bundle_info(&self, package: &str) -> UpstreamResult<BundleInfo> {
        let url = match Url::parse_with_params(&format!("{}/api/size", self.base_url), [("package", package)]) {
            Ok(url) => url,
            Err(e) => return UpstreamFailure::rejected(format!("invalid bundle URL: {e}")).into(),
        };
        let spec = RequestSpec::get("bundle", url.as_str());

        match self.client.request_json::<RawBundle>(&spec).await {
            Ok(raw) => UpstreamResult::Ok(BundleInfo::from(raw)),
            Err(e) => {
                // prefer the analyzer's own explanation when it sent one
                let reason = e
                    .body()
                    .and_then(|body| serde_json::from_str::<ErrorBody>(body).ok())
                    .map_or_else(|| e.to_string(), |body| body.error.message);
                log::debug!(target: LOG_TARGET, "Could not fetch bundle size for '{package}': {reason}");
                UpstreamFailure::from_http(&e, reason).into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_esm_package() {
        let raw: RawBundle = serde_json::from_str(
            r#"{
                "name": "lodash-es", "version": "4.17.21", "size": 650000, "gzip": 90000,
                "dependencyCount": 0, "hasJSModule": "lodash.js", "hasSideEffects": false,
                "dependencySizes": [{ "name": "lodash-es", "approximateSize": 640000 }]
            }"#,
        )
        .unwrap();
        let info = BundleInfo::from(raw);

        assert_eq!(info.module_format, ESM);
        assert!(!info.has_side_effects);
        assert_eq!(info.gzip, Some(90_000));
        assert_eq!(info.dependency_sizes.len(), 1);
    }

    #[test]
    fn test_commonjs_package() {
        let raw: RawBundle = serde_json::from_str(
            r#"{ "name": "lodash", "hasJSModule": false, "hasJSNext": false, "isModuleType": false, "hasSideEffects": true }"#,
        )
        .unwrap();
        let info = BundleInfo::from(raw);

        assert_eq!(info.module_format, CJS);
        assert!(info.has_side_effects);
    }

    #[test]
    fn test_side_effect_file_list() {
        let raw: RawBundle = serde_json::from_str(r#"{ "hasSideEffects": ["./polyfill.js"] }"#).unwrap();
        assert!(BundleInfo::from(raw).has_side_effects);

        let raw: RawBundle = serde_json::from_str(r#"{ "hasSideEffects": [] }"#).unwrap();
        assert!(!BundleInfo::from(raw).has_side_effects);
    }

    #[test]
    fn test_serialized_names() {
        let info = BundleInfo::from(RawBundle::default());
        let value = serde_json::to_value(info).unwrap();
        assert_eq!(value["moduleFormat"], "CommonJS");
        assert!(value.get("dependencyCount").is_some());
    }
}
