use super::{Manifest, NpmInfo, SearchHit, SearchResponse, search_size};
use crate::facts::resilient_http::{RequestSpec, ResilientClient};
use crate::facts::{UpstreamFailure, UpstreamResult, encode_component, trim_base};
use url::Url;

const LOG_TARGET: &str = "  registry";

pub const PACKAGE_NOT_FOUND: &str = "Package not found";
pub const NO_SEARCH_RESULTS: &str = "No package was found with the specified name";

/// Gateway to the npm package registry.
#[derive(Debug, Clone)]
pub struct RegistryGateway {
    client: ResilientClient,
    base_url: String,
}

impl RegistryGateway {
    #[must_use]
    pub fn new(client: ResilientClient, base_url: &Url) -> Self {
        Self {
            client,
            base_url: trim_base(base_url),
        }
    }

    /// Fetch the manifest of one version (or dist-tag such as `latest`).
    pub async fn package_info(&self, name: &str, version: &str) -> UpstreamResult<NpmInfo> {
        let url = format!("{}/{}/{}", self.base_url, encode_component(name), encode_component(version));
        let spec = RequestSpec::get("registry", url);

        let result = UpstreamResult::from_http(self.client.request_json::<Manifest>(&spec).await, PACKAGE_NOT_FOUND).map(NpmInfo::from);
        if let Some(failure) = result.failure() {
            log::debug!(target: LOG_TARGET, "Could not fetch manifest for '{name}@{version}': {failure}");
        }

        result
    }

    /// Full-text search over the registry.
    pub async fn search(&self, text: &str, size: Option<u32>) -> UpstreamResult<Vec<SearchHit>> {
        let size = search_size(size).to_string();
        let url = match Url::parse_with_params(&format!("{}/-/v1/search", self.base_url), [("text", text), ("size", size.as_str())]) {
            Ok(url) => url,
            Err(e) => return UpstreamFailure::rejected(format!("invalid search URL: {e}")).into(),
        };
        let spec = RequestSpec::get("registry-search", url.as_str());

        match UpstreamResult::from_http(self.client.request_json::<SearchResponse>(&spec).await, NO_SEARCH_RESULTS) {
            UpstreamResult::Ok(response) if response.objects.is_empty() => UpstreamFailure::not_found(NO_SEARCH_RESULTS).into(),
            UpstreamResult::Ok(response) => UpstreamResult::Ok(response.objects.into_iter().map(SearchHit::from).collect()),
            UpstreamResult::Failed(failure) => {
                log::debug!(target: LOG_TARGET, "Could not search for '{text}': {failure}");
                UpstreamResult::Failed(failure)
            }
        }
    }
}
