use std::sync::Arc;

use time::OffsetDateTime;

use crate::application::repos::{AnalyticsRepo, RepoError};
use crate::cache::{CacheAside, CacheKey};
use crate::domain::entities::AnalyticsSummary;

#[derive(Clone)]
pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepo>,
    cache: CacheAside,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn AnalyticsRepo>, cache: CacheAside) -> Self {
        Self { repo, cache }
    }

    /// Cached aggregate; "upcoming" is relative to the UTC date at load time.
    pub async fn summary(&self) -> Result<AnalyticsSummary, RepoError> {
        let repo = Arc::clone(&self.repo);
        self.cache
            .read(CacheKey::AnalyticsSummary, || async move {
                repo.load_summary(OffsetDateTime::now_utc().date()).await
            })
            .await
    }
}
