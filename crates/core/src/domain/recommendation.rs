use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    Personalized,
    Similar,
    Trending,
    OccasionBased,
    PriceBased,
}

impl RecommendationType {
    pub const ALL: [RecommendationType; 5] = [
        Self::Personalized,
        Self::Similar,
        Self::Trending,
        Self::OccasionBased,
        Self::PriceBased,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personalized => "personalized",
            Self::Similar => "similar",
            Self::Trending => "trending",
            Self::OccasionBased => "occasion_based",
            Self::PriceBased => "price_based",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "personalized" => Ok(Self::Personalized),
            "similar" => Ok(Self::Similar),
            "trending" => Ok(Self::Trending),
            "occasion_based" => Ok(Self::OccasionBased),
            "price_based" => Ok(Self::PriceBased),
            other => Err(DomainError::invalid(format!(
                "unknown recommendation type `{other}` \
                 (expected personalized|similar|trending|occasion_based|price_based)"
            ))),
        }
    }
}

/// Label describing which signal produced a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateCategory {
    Collaborative,
    ContentBased,
    Popularity,
    Popular,
    Trending,
    SimilarProducts,
    SameType,
    SimilarPrice,
    OccasionBased,
    PriceBased,
}

impl CandidateCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Collaborative => "collaborative",
            Self::ContentBased => "content_based",
            Self::Popularity => "popularity",
            Self::Popular => "popular",
            Self::Trending => "trending",
            Self::SimilarProducts => "similar_products",
            Self::SameType => "same_type",
            Self::SimilarPrice => "similar_price",
            Self::OccasionBased => "occasion_based",
            Self::PriceBased => "price_based",
        }
    }
}

impl fmt::Display for CandidateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
