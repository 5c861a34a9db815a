// Feedback store: append-only ratings on answered questions

use crate::error::AgentError;
use crate::models::{FeedbackAnalytics, FeedbackRecord, FeedbackRequest};
use crate::redis_client::RedisClient;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

const FEEDBACK_KEY: &str = "math_agent:feedback";

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn append(&self, record: FeedbackRecord) -> Result<(), AgentError>;

    async fn all(&self) -> Result<Vec<FeedbackRecord>, AgentError>;

    async fn analytics(&self) -> Result<FeedbackAnalytics, AgentError> {
        Ok(summarize(&self.all().await?))
    }
}

/// Wraps a request in a record with a fresh id and stores it.
pub async fn submit(store: &dyn FeedbackStore, feedback: FeedbackRequest) -> Result<Uuid, AgentError> {
    if !(1..=5).contains(&feedback.rating) {
        return Err(AgentError::Validation(format!(
            "rating must be between 1 and 5, got {}",
            feedback.rating
        )));
    }
    let record = FeedbackRecord {
        id: Uuid::new_v4(),
        feedback,
        received_at: Utc::now(),
    };
    let id = record.id;
    store.append(record).await?;
    Ok(id)
}

pub fn summarize(records: &[FeedbackRecord]) -> FeedbackAnalytics {
    let mut rating_distribution: BTreeMap<String, usize> =
        (1..=5).map(|r| (r.to_string(), 0)).collect();

    if records.is_empty() {
        return FeedbackAnalytics {
            rating_distribution,
            ..FeedbackAnalytics::default()
        };
    }

    let total = records.len();
    let mut rating_sum = 0u64;
    let mut helpful = 0usize;
    for record in records {
        rating_sum += u64::from(record.feedback.rating);
        if record.feedback.is_helpful {
            helpful += 1;
        }
        *rating_distribution
            .entry(record.feedback.rating.to_string())
            .or_default() += 1;
    }

    FeedbackAnalytics {
        total_feedback: total,
        average_rating: rating_sum as f64 / total as f64,
        helpful_percentage: helpful as f64 / total as f64 * 100.0,
        rating_distribution,
    }
}

#[derive(Default)]
pub struct InMemoryFeedbackStore {
    records: RwLock<HashMap<Uuid, FeedbackRecord>>,
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn append(&self, record: FeedbackRecord) -> Result<(), AgentError> {
        self.records.write().await.insert(record.id, record);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<FeedbackRecord>, AgentError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

pub struct RedisFeedbackStore {
    client: RedisClient,
}

impl RedisFeedbackStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedbackStore for RedisFeedbackStore {
    async fn append(&self, record: FeedbackRecord) -> Result<(), AgentError> {
        self.client
            .hset_json(FEEDBACK_KEY, &record.id.to_string(), &record)
            .await
    }

    async fn all(&self) -> Result<Vec<FeedbackRecord>, AgentError> {
        self.client.hvals_json(FEEDBACK_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn feedback(rating: u8, is_helpful: bool) -> FeedbackRequest {
        FeedbackRequest {
            response_id: "r-1".into(),
            rating,
            feedback_text: None,
            is_helpful,
            suggested_improvement: None,
            question: None,
            solution: None,
        }
    }

    #[tokio::test]
    async fn test_empty_store_analytics() {
        let store = InMemoryFeedbackStore::default();
        let analytics = store.analytics().await.unwrap();
        assert_eq!(analytics.total_feedback, 0);
        assert_eq!(analytics.rating_distribution.len(), 5);
        assert!(analytics.rating_distribution.values().all(|&n| n == 0));
    }

    #[tokio::test]
    async fn test_aggregates_ratings() {
        let store = InMemoryFeedbackStore::default();
        submit(&store, feedback(5, true)).await.unwrap();
        submit(&store, feedback(4, true)).await.unwrap();
        submit(&store, feedback(3, false)).await.unwrap();
        submit(&store, feedback(4, false)).await.unwrap();

        let analytics = store.analytics().await.unwrap();
        assert_eq!(analytics.total_feedback, 4);
        assert_eq!(analytics.average_rating, 4.0);
        assert_eq!(analytics.helpful_percentage, 50.0);
        assert_eq!(analytics.rating_distribution["4"], 2);
        assert_eq!(analytics.rating_distribution["1"], 0);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_rating() {
        let store = InMemoryFeedbackStore::default();
        assert!(matches!(
            submit(&store, feedback(0, true)).await,
            Err(AgentError::Validation(_))
        ));
        assert!(submit(&store, feedback(6, true)).await.is_err());
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_every_record() {
        let store = Arc::new(InMemoryFeedbackStore::default());
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { submit(store.as_ref(), feedback(1 + (i % 5) as u8, true)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.all().await.unwrap().len(), 32);
    }
}
