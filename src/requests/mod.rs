use std::fmt::Debug;
use tokio::sync::RwLock;

/// Identifies one in-flight request: the target it was issued for and the
/// generation that was current when it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken<K> {
    pub target: K,
    pub generation: u64,
}

#[derive(Debug)]
struct Slot<K> {
    generation: u64,
    target: Option<K>,
}

/// Tracks the latest request issued for one slot (the native price, the
/// searched token, ...). Starting a new request supersedes every older one,
/// and a response is only applied while its token is still current.
#[derive(Debug)]
pub struct RequestTracker<K> {
    slot: RwLock<Slot<K>>,
}

impl<K: Clone + PartialEq + Debug> RequestTracker<K> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Slot {
                generation: 0,
                target: None,
            }),
        }
    }

    pub async fn begin(&self, target: K) -> RequestToken<K> {
        let mut slot = self.slot.write().await;
        slot.generation += 1;
        slot.target = Some(target.clone());
        RequestToken {
            target,
            generation: slot.generation,
        }
    }

    pub async fn is_current(&self, token: &RequestToken<K>) -> bool {
        let slot = self.slot.read().await;
        slot.generation == token.generation && slot.target.as_ref() == Some(&token.target)
    }

    pub async fn current_target(&self) -> Option<K> {
        self.slot.read().await.target.clone()
    }

    /// Drop the current target; any outstanding response becomes stale.
    pub async fn reset(&self) {
        let mut slot = self.slot.write().await;
        slot.generation += 1;
        slot.target = None;
    }
}

impl<K: Clone + PartialEq + Debug> Default for RequestTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_latest_request_wins() {
        let tracker = RequestTracker::new();
        let first = tracker.begin(56u64).await;
        let second = tracker.begin(1u64).await;

        assert!(!tracker.is_current(&first).await);
        assert!(tracker.is_current(&second).await);
        assert_eq!(tracker.current_target().await, Some(1));
    }

    #[tokio::test]
    async fn test_same_target_reissued() {
        let tracker = RequestTracker::new();
        let first = tracker.begin("0xabc".to_string()).await;
        let second = tracker.begin("0xabc".to_string()).await;

        // Same target, but only the newest generation may publish.
        assert!(!tracker.is_current(&first).await);
        assert!(tracker.is_current(&second).await);
    }

    #[tokio::test]
    async fn test_reset_invalidates() {
        let tracker = RequestTracker::new();
        let token = tracker.begin(56u64).await;
        tracker.reset().await;

        assert!(!tracker.is_current(&token).await);
        assert_eq!(tracker.current_target().await, None);
    }
}
