//! GitHub: repository facts and security advisories over GraphQL.

mod advisories;
mod client;
mod gateway;
mod github_info;

pub use advisories::{Identifier, SEVERITY_ORDER, SeverityGroups, Vulnerability, VulnerabilityReport, next_stable_version, stable_version};
pub use gateway::{GitHubGateway, NO_GITHUB_TOKEN, REPOSITORY_NOT_FOUND};
pub use github_info::{GitHubInfo, Language};
