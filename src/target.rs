//! Delivery targets: where drained envelopes end up
//!
//! A `Target` is the ordering engine's intake. It is shared by every
//! session of a handler and must tolerate concurrent `submit` calls.

use crate::types::Envelope;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Downstream intake for accepted envelopes
///
/// Returning `false` means the target is closed for good: the session's
/// drain loop stops and submits nothing further. The session keeps
/// acknowledging `Success` for envelopes it queues afterwards; those are
/// dropped when the session ends.
#[async_trait]
pub trait Target: Send + Sync {
    /// Hand one envelope to the target, returning false on shutdown
    async fn submit(&self, envelope: Envelope) -> bool;
}

/// In-memory target for development and testing
///
/// Records every accepted envelope in arrival order. Can be configured to
/// refuse after a number of accepts, and can be held so that submissions
/// wait until released.
pub struct MemoryTarget {
    envelopes: Arc<RwLock<Vec<Envelope>>>,
    accept_limit: Option<usize>,
    held: watch::Sender<bool>,
    calls: watch::Sender<usize>,
}

impl MemoryTarget {
    /// Create a target that accepts everything
    pub fn new() -> Self {
        Self {
            envelopes: Arc::new(RwLock::new(Vec::new())),
            accept_limit: None,
            held: watch::Sender::new(false),
            calls: watch::Sender::new(0),
        }
    }

    /// Accept `limit` envelopes, then refuse every further submission
    pub fn refuse_after(limit: usize) -> Self {
        Self {
            accept_limit: Some(limit),
            ..Self::new()
        }
    }

    /// Block submissions until `release` is called
    pub fn hold(&self) {
        self.held.send_replace(true);
    }

    /// Let held and future submissions through
    pub fn release(&self) {
        self.held.send_replace(false);
    }

    /// Snapshot of accepted envelopes in arrival order
    pub async fn envelopes(&self) -> Vec<Envelope> {
        self.envelopes.read().await.clone()
    }

    /// Number of accepted envelopes
    pub async fn len(&self) -> usize {
        self.envelopes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of `submit` calls that completed, accepted or refused
    pub fn submit_calls(&self) -> usize {
        *self.calls.borrow()
    }

    /// Wait until at least `n` submit calls have completed
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.calls.subscribe();
        // Sender is owned by self, so the channel cannot close while we wait.
        let _ = rx.wait_for(|calls| *calls >= n).await;
    }
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Target for MemoryTarget {
    async fn submit(&self, envelope: Envelope) -> bool {
        let mut held = self.held.subscribe();
        let _ = held.wait_for(|held| !*held).await;

        let accepted = {
            let mut envelopes = self.envelopes.write().await;
            match self.accept_limit {
                Some(limit) if envelopes.len() >= limit => false,
                _ => {
                    envelopes.push(envelope);
                    true
                }
            }
        };

        if !accepted {
            tracing::debug!("Memory target refusing submission");
        }
        self.calls.send_modify(|calls| *calls += 1);
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_target_records_in_order() {
        let target = MemoryTarget::new();
        for i in 0..3u8 {
            assert!(target.submit(Envelope::new(vec![i])).await);
        }

        let envelopes = target.envelopes().await;
        assert_eq!(envelopes.len(), 3);
        assert_eq!(envelopes[0].payload.as_ref(), &[0u8]);
        assert_eq!(envelopes[2].payload.as_ref(), &[2u8]);
        assert_eq!(target.submit_calls(), 3);
    }

    #[tokio::test]
    async fn test_refuse_after_limit() {
        let target = MemoryTarget::refuse_after(2);
        assert!(target.submit(Envelope::new(&b"a"[..])).await);
        assert!(target.submit(Envelope::new(&b"b"[..])).await);
        assert!(!target.submit(Envelope::new(&b"c"[..])).await);
        assert!(!target.submit(Envelope::new(&b"d"[..])).await);

        assert_eq!(target.len().await, 2);
        assert_eq!(target.submit_calls(), 4);
    }

    #[tokio::test]
    async fn test_hold_blocks_until_release() {
        let target = Arc::new(MemoryTarget::new());
        target.hold();

        let t = target.clone();
        let pending = tokio::spawn(async move { t.submit(Envelope::new(&b"x"[..])).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(target.is_empty().await);

        target.release();
        assert!(pending.await.unwrap());
        target.wait_for_calls(1).await;
        assert_eq!(target.len().await, 1);
    }
}
