use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::ProductId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    Content,
}

impl SimilarityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
        }
    }
}

/// Similarity of an unordered product pair. Construction orders the pair so
/// that `product_a < product_b`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSimilarity {
    pub product_a: ProductId,
    pub product_b: ProductId,
    pub score: f64,
    pub kind: SimilarityKind,
    pub updated_at: DateTime<Utc>,
}

impl ProductSimilarity {
    pub fn new(
        first: ProductId,
        second: ProductId,
        score: f64,
        kind: SimilarityKind,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let (product_a, product_b) = if first <= second { (first, second) } else { (second, first) };
        Self { product_a, product_b, score, kind, updated_at }
    }

    /// The pair member that is not `product`.
    pub fn other(&self, product: ProductId) -> ProductId {
        if self.product_a == product {
            self.product_b
        } else {
            self.product_a
        }
    }
}
