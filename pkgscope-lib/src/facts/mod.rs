//! Upstream data sources and the aggregation of their results.
//!
//! Each upstream is wrapped in a gateway that issues its calls through the
//! shared [`resilient_http::ResilientClient`] and never returns an error to its
//! caller: every outcome, good or bad, is an [`UpstreamResult`]. The
//! [`Collector`] fans out to the gateways in dependency-aware phases and
//! composes a [`PackageAggregate`] from whatever they return.
//!
//! # Implementation Model
//!
//! - **Phase 1**: registry manifest and bundle size, concurrently.
//! - **Phase 2**: GitHub repository facts, when the manifest names a GitHub repository.
//! - **Phase 3**: security scorecard and vulnerability score, concurrently.
//!
//! A registry "not found" ends the request early. Every other failure is recorded
//! in its own field and the remaining phases carry on.

pub mod bundle;
mod collector;
pub mod download_stats;
pub mod hosting;
pub mod key_selector;
mod package_aggregate;
pub mod registry;
mod repo_spec;
pub mod resilient_http;
pub mod scorecard;
mod throttler;
mod upstream_result;
mod upstreams;
pub mod vulnerability;

pub use collector::{Collector, Gateways, NO_GITHUB_DATA, NO_GITHUB_URL, NO_PACKAGE_VERSION, NO_REGISTRY_DATA, PackageOutcome};
pub use package_aggregate::{PackageAggregate, Performance};
pub use repo_spec::RepoSpec;
pub use upstream_result::{FailureKind, UpstreamFailure, UpstreamResult};
pub use upstreams::Upstreams;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Characters left unescaped in a URI component: alphanumerics plus `-_.!~*'()`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Same as [`COMPONENT`] but keeps the separators of scoped package names (`@scope/name`).
const PACKAGE_PATH: &AsciiSet = &COMPONENT.remove(b'@').remove(b'/');

/// Encode a value for use as a single URL path segment.
pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Encode a package name for endpoints that take `@scope/name` literally.
pub(crate) fn encode_package_path(value: &str) -> String {
    utf8_percent_encode(value, PACKAGE_PATH).to_string()
}

/// A base URL without its trailing slash, ready for `format!`-style joining.
pub(crate) fn trim_base(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}
