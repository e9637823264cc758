use crate::domain::ports::ResponseCacheBox;
use crate::error::{PaymentError, Result};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
struct UserProfile<'a> {
    id: &'a str,
    name: String,
}

/// Read-through user lookups backed by a response cache.
pub struct UserService {
    cache: ResponseCacheBox,
}

impl UserService {
    pub fn new(cache: ResponseCacheBox) -> Self {
        Self { cache }
    }

    /// Returns the JSON profile for `user_id`, rendering and caching it on a miss.
    pub async fn get_user(&self, user_id: &str) -> Result<String> {
        if let Some(cached) = self.cache.get(user_id).await? {
            debug!(user_id, "user cache hit");
            return Ok(cached);
        }

        let profile = UserProfile {
            id: user_id,
            name: format!("User_{user_id}"),
        };
        let rendered =
            serde_json::to_string(&profile).map_err(|e| PaymentError::InternalError(Box::new(e)))?;
        self.cache.set(user_id, rendered.clone()).await?;
        debug!(user_id, "user cache miss, profile cached");
        Ok(rendered)
    }
}
