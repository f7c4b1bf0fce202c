//! Activity logs.

use bazaar_core::ActivityLogId;
use bazaar_core::activity::{ActivityLog, ActivityLogQuery};
use bazaar_core::catalog::Paginated;
use tracing::instrument;

use super::store::PAGE_SIZE;
use super::{ApiError, BackendClient};

impl BackendClient {
    /// A filtered page of activity logs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn activity_logs(
        &self,
        token: &str,
        query: &ActivityLogQuery,
    ) -> Result<Paginated<ActivityLog>, ApiError> {
        let mut params = vec![
            ("page", query.page.unwrap_or(1).to_string()),
            ("limit", PAGE_SIZE.to_string()),
        ];
        if let Some(action) = &query.action {
            params.push(("action", action.clone()));
        }
        if let Some(entity_type) = &query.entity_type {
            params.push(("entity_type", entity_type.clone()));
        }
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        self.get(token, "/api/activity-logs", &params).await
    }

    /// One log entry with its snapshots.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown id.
    #[instrument(skip(self, token))]
    pub async fn activity_log(
        &self,
        token: &str,
        id: ActivityLogId,
    ) -> Result<ActivityLog, ApiError> {
        self.get(token, &format!("/api/activity-logs/{id}"), &[]).await
    }
}
