use chrono::{DateTime, Utc};

use crate::domain::product::Product;
use crate::domain::similarity::{ProductSimilarity, SimilarityKind};

use super::scoring::content_similarity;

/// Content similarity of `target` against every other catalog product,
/// keeping only pairs that reach `min_similarity`.
pub fn score_against_catalog(
    target: &Product,
    catalog: &[Product],
    min_similarity: f64,
    now: DateTime<Utc>,
) -> Vec<ProductSimilarity> {
    catalog
        .iter()
        .filter(|other| other.id != target.id)
        .filter_map(|other| {
            let score = content_similarity(target, other);
            (score >= min_similarity).then(|| {
                ProductSimilarity::new(target.id, other.id, score, SimilarityKind::Content, now)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::score_against_catalog;
    use crate::domain::product::{ProductId, ProductStatus};
    use crate::recommend::scoring::tests::product;

    #[test]
    fn self_pairs_and_weak_pairs_are_dropped() {
        let target = product(2, "Rose", 100);
        let mut unrelated = product(3, "Orchid", 1);
        unrelated.status = ProductStatus::LowStock;
        let catalog = vec![product(1, "Rose", 90), target.clone(), unrelated];

        let pairs = score_against_catalog(&target, &catalog, 0.1, Utc::now());

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].product_a, ProductId(1));
        assert_eq!(pairs[0].product_b, ProductId(2));
        assert!(pairs.iter().all(|pair| pair.score >= 0.1 && pair.product_a != pair.product_b));
    }
}
