use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::Row;

use bloom_core::domain::feedback::{FeedbackAction, FeedbackTally, RecommendationFeedback};
use bloom_core::domain::recommendation::RecommendationType;
use bloom_core::store::{FeedbackStore, StoreError, StoreResult};

use super::{decode_error, encode_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlFeedbackRepository {
    pool: DbPool,
}

impl SqlFeedbackRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, feedback: &RecommendationFeedback) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO recommendation_feedback (feedback_id, user_id, session_id, product_id,
                                                  recommendation_type, action, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(feedback.id.to_string())
        .bind(feedback.user_id.as_str())
        .bind(feedback.session_id.as_deref())
        .bind(feedback.product_id.0)
        .bind(feedback.recommendation_type.as_str())
        .bind(feedback.action.as_str())
        .bind(encode_timestamp(feedback.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn tallies(&self, since: DateTime<Utc>) -> Result<Vec<FeedbackTally>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT recommendation_type, action, COUNT(*) AS event_count
             FROM recommendation_feedback
             WHERE created_at >= ?
             GROUP BY recommendation_type, action
             ORDER BY recommendation_type ASC, action ASC",
        )
        .bind(encode_timestamp(since))
        .fetch_all(&self.pool)
        .await?;

        let mut tallies = Vec::with_capacity(rows.len());
        for row in &rows {
            let recommendation_type: String =
                row.try_get("recommendation_type").map_err(decode_error)?;
            let action: String = row.try_get("action").map_err(decode_error)?;
            let count: i64 = row.try_get("event_count").map_err(decode_error)?;

            tallies.push(FeedbackTally {
                recommendation_type: RecommendationType::from_str(&recommendation_type)
                    .map_err(decode_error)?,
                action: FeedbackAction::from_str(&action).map_err(decode_error)?,
                count: u64::try_from(count).map_err(decode_error)?,
            });
        }
        Ok(tallies)
    }
}

#[async_trait::async_trait]
impl FeedbackStore for SqlFeedbackRepository {
    async fn append_feedback(&self, feedback: &RecommendationFeedback) -> StoreResult<()> {
        self.insert(feedback).await.map_err(StoreError::from)
    }

    async fn feedback_tallies(&self, since: DateTime<Utc>) -> StoreResult<Vec<FeedbackTally>> {
        self.tallies(since).await.map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use bloom_core::domain::feedback::{FeedbackAction, FeedbackTally, RecommendationFeedback};
    use bloom_core::domain::interaction::UserId;
    use bloom_core::domain::product::ProductId;
    use bloom_core::domain::recommendation::RecommendationType;
    use bloom_core::store::FeedbackStore;

    use super::SqlFeedbackRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn tallies_group_events_inside_the_window() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlFeedbackRepository::new(pool);
        let now = Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).single().expect("valid timestamp");

        let events = [
            (RecommendationType::Trending, FeedbackAction::Clicked, 1),
            (RecommendationType::Trending, FeedbackAction::Clicked, 2),
            (RecommendationType::Similar, FeedbackAction::Purchased, 3),
            (RecommendationType::Similar, FeedbackAction::Dismissed, 40),
        ];
        for (recommendation_type, action, days_ago) in events {
            repo.append_feedback(&RecommendationFeedback {
                id: Uuid::new_v4(),
                user_id: UserId::new("u1"),
                session_id: Some("s-1".to_string()),
                product_id: ProductId(1),
                recommendation_type,
                action,
                created_at: now - Duration::days(days_ago),
            })
            .await
            .expect("append");
        }

        let tallies = repo.feedback_tallies(now - Duration::days(30)).await.expect("tallies");
        assert_eq!(
            tallies,
            vec![
                FeedbackTally {
                    recommendation_type: RecommendationType::Similar,
                    action: FeedbackAction::Purchased,
                    count: 1,
                },
                FeedbackTally {
                    recommendation_type: RecommendationType::Trending,
                    action: FeedbackAction::Clicked,
                    count: 2,
                },
            ]
        );
    }
}
