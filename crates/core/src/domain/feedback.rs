use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::interaction::UserId;
use super::product::ProductId;
use super::recommendation::RecommendationType;
use crate::errors::DomainError;

pub const ANONYMOUS_USER: &str = "anonymous";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackAction {
    Clicked,
    Purchased,
    Dismissed,
    Liked,
}

impl FeedbackAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clicked => "clicked",
            Self::Purchased => "purchased",
            Self::Dismissed => "dismissed",
            Self::Liked => "liked",
        }
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "clicked" => Ok(Self::Clicked),
            "purchased" => Ok(Self::Purchased),
            "dismissed" => Ok(Self::Dismissed),
            "liked" => Ok(Self::Liked),
            other => Err(DomainError::invalid(format!(
                "unknown feedback action `{other}` (expected clicked|purchased|dismissed|liked)"
            ))),
        }
    }
}

/// Append-only record of how a shopper reacted to a recommendation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationFeedback {
    pub id: Uuid,
    pub user_id: UserId,
    pub session_id: Option<String>,
    pub product_id: ProductId,
    pub recommendation_type: RecommendationType,
    pub action: FeedbackAction,
    pub created_at: DateTime<Utc>,
}

/// Count of feedback events for one (type, action) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackTally {
    pub recommendation_type: RecommendationType,
    pub action: FeedbackAction,
    pub count: u64,
}
