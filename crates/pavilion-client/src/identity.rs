//! Memoized foreign-user profile lookups.
//!
//! Every consumer that needs to render a display name for a user known
//! only by id goes through this cache.  Entries live for the session and
//! are never invalidated (staleness is an accepted tradeoff); the whole
//! cache is cleared on account switch.  Lookups never fail loudly — any
//! error resolves to `None` and a later call may retry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::debug;

use pavilion_api::{ApiClient, ApiError};
use pavilion_shared::profile::UserProfile;
use pavilion_shared::types::UserId;

/// Pluggable profile source; production wires this to the REST client,
/// tests count invocations.
pub type ProfileFetchFn =
    Arc<dyn Fn(UserId) -> BoxFuture<'static, Result<Option<UserProfile>, ApiError>> + Send + Sync>;

pub struct IdentityCache {
    fetch: ProfileFetchFn,
    entries: Mutex<HashMap<UserId, UserProfile>>,
    /// In-flight lookups; concurrent resolves for the same uncached id
    /// wait on the leader's watch channel instead of issuing duplicates.
    pending: Mutex<HashMap<UserId, watch::Receiver<()>>>,
}

enum Role {
    Leader(watch::Sender<()>),
    Waiter(watch::Receiver<()>),
}

impl IdentityCache {
    pub fn new(fetch: ProfileFetchFn) -> Self {
        Self {
            fetch,
            entries: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Cache backed by the REST profile endpoint.
    pub fn over_api(api: Arc<ApiClient>) -> Self {
        Self::new(Arc::new(move |user_id: UserId| {
            let api = api.clone();
            Box::pin(async move { api.fetch_user_profile(&user_id).await })
        }))
    }

    /// Synchronous cache check, no lookup.
    pub fn peek(&self, user_id: &UserId) -> Option<UserProfile> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(user_id).cloned())
    }

    /// Resolve a profile, fetching at most once across concurrent callers.
    ///
    /// A cache hit returns without touching the network.  On a miss, the
    /// first caller performs the lookup while the rest wait for it; a
    /// failed lookup resolves everyone to `None` without poisoning the
    /// cache.
    pub async fn resolve(&self, user_id: &UserId) -> Option<UserProfile> {
        if let Some(profile) = self.peek(user_id) {
            return Some(profile);
        }

        let role = {
            let mut pending = self.pending.lock().ok()?;
            match pending.get(user_id) {
                Some(rx) => Role::Waiter(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(());
                    pending.insert(user_id.clone(), rx);
                    Role::Leader(tx)
                }
            }
        };

        match role {
            Role::Waiter(mut rx) => {
                let _ = rx.changed().await;
                self.peek(user_id)
            }
            Role::Leader(tx) => {
                let result = match (self.fetch)(user_id.clone()).await {
                    Ok(profile) => profile,
                    Err(e) => {
                        debug!(user = %user_id, error = %e, "Profile lookup failed");
                        None
                    }
                };
                if let Some(ref profile) = result {
                    if let Ok(mut entries) = self.entries.lock() {
                        entries.insert(user_id.clone(), profile.clone());
                    }
                }
                if let Ok(mut pending) = self.pending.lock() {
                    pending.remove(user_id);
                }
                let _ = tx.send(());
                result
            }
        }
    }

    /// Drop every entry. Must be called on account switch so display names
    /// never leak across sessions.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn profile(user_id: &UserId) -> UserProfile {
        UserProfile {
            user_id: user_id.clone(),
            first_name: "Van A".to_string(),
            last_name: "Nguyen".to_string(),
            username: "vana".to_string(),
            avatar_ref: None,
        }
    }

    fn counting_fetch(
        calls: Arc<AtomicUsize>,
        succeed: bool,
        delay: Duration,
    ) -> ProfileFetchFn {
        Arc::new(move |user_id: UserId| {
            let calls = calls.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                if succeed {
                    Ok(Some(profile(&user_id)))
                } else {
                    Ok(None)
                }
            })
        })
    }

    #[tokio::test]
    async fn test_second_resolve_is_a_cache_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = IdentityCache::new(counting_fetch(calls.clone(), true, Duration::ZERO));
        let id = UserId::new("u-1");

        assert!(cache.resolve(&id).await.is_some());
        assert!(cache.resolve(&id).await.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_does_not_poison_the_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = IdentityCache::new(counting_fetch(calls.clone(), false, Duration::ZERO));
        let id = UserId::new("u-1");

        assert!(cache.resolve(&id).await.is_none());
        // The miss was not cached: a later call retries the lookup.
        assert!(cache.resolve(&id).await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_resolves_collapse_to_one_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(IdentityCache::new(counting_fetch(
            calls.clone(),
            true,
            Duration::from_millis(50),
        )));
        let id = UserId::new("u-1");

        let (a, b) = tokio::join!(cache.resolve(&id), cache.resolve(&id));
        assert!(a.is_some());
        assert!(b.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_forces_a_fresh_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = IdentityCache::new(counting_fetch(calls.clone(), true, Duration::ZERO));
        let id = UserId::new("u-1");

        cache.resolve(&id).await;
        cache.clear();
        assert!(cache.peek(&id).is_none());

        cache.resolve(&id).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
