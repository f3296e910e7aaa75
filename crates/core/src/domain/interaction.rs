use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::ProductId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw per-product event counts for one user, as read from the interaction
/// log, completed orders and reviews.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCounts {
    pub product_id: ProductId,
    pub view_count: u32,
    pub cart_adds: u32,
    pub wishlist_adds: u32,
    pub purchase_count: u32,
    pub review_count: u32,
    pub total_rating: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserInteractionSummary {
    pub user_id: UserId,
    pub counts: InteractionCounts,
    pub interaction_score: f64,
}

impl UserInteractionSummary {
    pub fn product_id(&self) -> ProductId {
        self.counts.product_id
    }

    pub fn has_purchases(&self) -> bool {
        self.counts.purchase_count > 0
    }
}

/// Views and purchases observed for one product inside a trend window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodActivity {
    pub view_count: u32,
    pub purchase_count: u32,
}

/// Event kinds accepted into the interaction log. Purchases and reviews come
/// from their own tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    View,
    AddToCart,
    WishlistAdd,
}

impl InteractionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::AddToCart => "add_to_cart",
            Self::WishlistAdd => "wishlist_add",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
}
