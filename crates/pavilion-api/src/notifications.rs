//! Notification endpoints.

use reqwest::Method;

use pavilion_shared::events::NotificationPayload;
use pavilion_shared::types::UserId;
use pavilion_sync::models::NotificationRecord;

use crate::client::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// Fetch the newest notifications for a user, newest first.
    ///
    /// The wire payload is deserialized through [`NotificationPayload`] so
    /// sparse server rows get the same defaulting as pushed events.
    pub async fn fetch_notifications(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>> {
        let payloads: Vec<NotificationPayload> = self
            .request_json(
                Method::GET,
                "/api/notifications",
                &[
                    ("userId", user_id.to_string()),
                    ("limit", limit.to_string()),
                ],
                None,
            )
            .await?;
        Ok(payloads.into_iter().map(NotificationRecord::from).collect())
    }

    /// Mark a single notification as read.
    pub async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        self.request(
            Method::PUT,
            &format!("/api/notifications/{notification_id}/read"),
            &[],
            None,
        )
        .await?;
        Ok(())
    }
}
