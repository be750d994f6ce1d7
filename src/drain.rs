//! Drain loop: move queued envelopes into the target

use crate::queue::QueueReceiver;
use crate::target::Target;
use tokio_util::sync::CancellationToken;

/// Why a drain loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DrainExit {
    /// Queue closed and fully drained
    QueueClosed,
    /// Target refused a submission
    TargetRefused,
    /// Shutdown token fired
    Shutdown,
}

/// Submit queued envelopes to `target` in FIFO order until the queue is
/// closed and empty, the target refuses, or `shutdown` fires.
///
/// Shutdown wins over pending envelopes. A refusal is final: nothing is
/// submitted after it.
pub(crate) async fn drain(
    session: &str,
    queue: &mut QueueReceiver,
    target: &dyn Target,
    shutdown: CancellationToken,
) -> DrainExit {
    let mut delivered = 0u64;

    let exit = loop {
        let envelope = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break DrainExit::Shutdown,
            next = queue.recv() => match next {
                Some(envelope) => envelope,
                None => break DrainExit::QueueClosed,
            },
        };

        if !target.submit(envelope).await {
            break DrainExit::TargetRefused;
        }
        delivered += 1;
    };

    match exit {
        DrainExit::TargetRefused => tracing::warn!(
            session = %session,
            delivered,
            "Target refused envelope, drain stopped; \
             later acknowledged envelopes will not be delivered"
        ),
        _ => tracing::debug!(
            session = %session,
            delivered,
            reason = ?exit,
            "Drain stopped"
        ),
    }

    exit
}
