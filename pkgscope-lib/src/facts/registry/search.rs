use serde::{Deserialize, Serialize};

pub const DEFAULT_SEARCH_SIZE: u32 = 20;
pub const MAX_SEARCH_SIZE: u32 = 250;

/// Clamp a requested page size to what the registry accepts.
#[must_use]
pub fn search_size(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_SEARCH_SIZE).clamp(1, MAX_SEARCH_SIZE)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub objects: Vec<SearchObject>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchObject {
    pub package: SearchPackage,
    pub score: RawScore,
    pub search_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchPackage {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawScore {
    #[serde(rename = "final")]
    pub final_score: Option<f64>,
    pub detail: ScoreDetails,
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub score: SearchScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchScore {
    pub search_score: Option<f64>,
    #[serde(rename = "final")]
    pub final_score: Option<f64>,
    pub details: ScoreDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreDetails {
    pub quality: Option<f64>,
    pub popularity: Option<f64>,
    pub maintenance: Option<f64>,
}

impl From<SearchObject> for SearchHit {
    fn from(o: SearchObject) -> Self {
        Self {
            name: o.package.name,
            version: o.package.version,
            description: o.package.description,
            date: o.package.date,
            score: SearchScore {
                search_score: o.search_score,
                final_score: o.score.final_score,
                details: o.score.detail,
            },
        }
    }
}
