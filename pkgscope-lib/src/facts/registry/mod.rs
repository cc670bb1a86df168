//! npm registry: version manifests and full-text search.

mod gateway;
mod npm_info;
mod search;

pub use gateway::{NO_SEARCH_RESULTS, PACKAGE_NOT_FOUND, RegistryGateway};
pub use npm_info::{Dependencies, DependencySet, Manifest, NpmInfo, PackageDetails, Person, avatar_url};
pub use search::{DEFAULT_SEARCH_SIZE, MAX_SEARCH_SIZE, ScoreDetails, SearchHit, SearchResponse, SearchScore, search_size};
