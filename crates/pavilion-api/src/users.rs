//! User profile endpoint.

use reqwest::Method;

use pavilion_shared::profile::UserProfile;
use pavilion_shared::types::UserId;

use crate::client::ApiClient;
use crate::error::{ApiError, Result};

impl ApiClient {
    /// Fetch a user's profile by id.  An unknown id resolves to `Ok(None)`
    /// rather than an error, so the identity cache can fall back cleanly.
    pub async fn fetch_user_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let result = self
            .request_json::<UserProfile>(
                Method::GET,
                &format!("/api/users/{user_id}"),
                &[],
                None,
            )
            .await;
        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(ApiError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
