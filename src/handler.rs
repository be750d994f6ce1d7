//! Broadcast handler: one receive loop and one drain loop per session
//!
//! `Handler::handle` owns a client connection from hand-off to close.
//! Every envelope read from the stream is classified, queued or refused,
//! and acknowledged before the next one is read. A separate task drains
//! the session queue into the shared target.

use crate::config::HandlerConfig;
use crate::drain::{drain, DrainExit};
use crate::error::{BroadcastError, Result};
use crate::filter::{Action, FilterChain};
use crate::queue::{self, PushError, QueueSender};
use crate::target::Target;
use crate::transport::BroadcastStream;
use crate::types::{BroadcastResponse, Envelope, Status};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Services broadcast connections
#[async_trait]
pub trait Handler: Send + Sync {
    /// Service one client connection until it ends, returning the error
    /// that ended it
    async fn handle(&self, stream: &mut dyn BroadcastStream) -> Result<()>;
}

/// Default `Handler`: bounded per-session queue in front of a shared target
pub struct HandlerImpl {
    config: HandlerConfig,
    target: Arc<dyn Target>,
    filters: Arc<dyn FilterChain>,
    shutdown: CancellationToken,
}

impl HandlerImpl {
    pub fn new(
        config: HandlerConfig,
        target: Arc<dyn Target>,
        filters: Arc<dyn FilterChain>,
    ) -> Self {
        Self {
            config,
            target,
            filters,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Stop the drain loop of every live and future session
    ///
    /// Envelopes still queued are dropped. Receive loops are not affected;
    /// they end when their streams do.
    pub fn shutdown(&self) {
        tracing::info!("Broadcast handler shutting down");
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Classify one envelope and queue it if accepted
    fn dispose(&self, session: &str, queue: &QueueSender, envelope: Envelope) -> Status {
        let action = self.filters.classify(&envelope);
        let status = match action {
            Action::Accept | Action::Reconfigure => match queue.try_push(envelope) {
                Ok(()) => Status::Success,
                Err(PushError::Full(_)) => {
                    tracing::warn!(
                        session = %session,
                        queue_size = queue.capacity(),
                        "Session queue full, envelope dropped"
                    );
                    Status::ServiceUnavailable
                }
                Err(PushError::Closed(_)) => {
                    tracing::warn!(session = %session, "Drain loop gone, envelope dropped");
                    Status::ServiceUnavailable
                }
            },
            Action::Reject | Action::Forward => Status::BadRequest,
        };
        tracing::trace!(
            session = %session,
            action = ?action,
            status = %status,
            "Envelope disposed"
        );
        status
    }

    /// Receive loop: runs until the stream fails in either direction and
    /// returns that failure
    async fn receive(
        &self,
        session: &str,
        queue: &QueueSender,
        stream: &mut dyn BroadcastStream,
    ) -> BroadcastError {
        loop {
            let envelope = match stream.recv().await {
                Ok(envelope) => envelope,
                Err(e) => return e,
            };
            let status = self.dispose(session, queue, envelope);
            if let Err(e) = stream.send(BroadcastResponse::new(status)).await {
                return e;
            }
        }
    }
}

#[async_trait]
impl Handler for HandlerImpl {
    async fn handle(&self, stream: &mut dyn BroadcastStream) -> Result<()> {
        let session = uuid::Uuid::new_v4().to_string();
        let (mut queue, mut consumer) = queue::channel(self.config.queue_size);

        tracing::debug!(
            session = %session,
            queue_size = self.config.queue_size,
            "Broadcast session started"
        );

        // The drain task is not joined. It holds its target reference until
        // the queue is closed, whichever way draining stopped.
        let drain_session = session.clone();
        let target = self.target.clone();
        let shutdown = self.shutdown.child_token();
        tokio::spawn(async move {
            let exit = drain(
                &drain_session,
                &mut consumer,
                target.as_ref(),
                shutdown,
            )
            .await;
            if exit != DrainExit::QueueClosed {
                // Keep the buffer open until the receive loop closes it, so
                // intake still answers Success until the queue fills.
                consumer.closed().await;
            }
        });

        let err = self.receive(&session, &queue, stream).await;
        queue.close();

        if err.is_closed() {
            tracing::debug!(session = %session, "Broadcast session closed by client");
        } else {
            tracing::info!(session = %session, error = %err, "Broadcast session ended");
        }
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptRule, EmptyRejectRule, RuleSet};
    use crate::target::MemoryTarget;
    use crate::transport::ChannelStream;

    fn handler(queue_size: usize, target: Arc<MemoryTarget>) -> HandlerImpl {
        let rules = RuleSet::default()
            .with_rule(EmptyRejectRule)
            .with_rule(AcceptRule);
        HandlerImpl::new(
            HandlerConfig::new(queue_size),
            target,
            Arc::new(rules),
        )
    }

    #[test]
    fn test_dispose_maps_actions() {
        let handler = handler(1, Arc::new(MemoryTarget::new()));
        let (queue, _rx) = queue::channel(1);

        let a = handler.dispose("s", &queue, Envelope::new(&b"a"[..]));
        let b = handler.dispose("s", &queue, Envelope::new(&b"b"[..]));
        let empty = handler.dispose("s", &queue, Envelope::default());
        assert_eq!(a, Status::Success);
        assert_eq!(b, Status::ServiceUnavailable);
        assert_eq!(empty, Status::BadRequest);
    }

    #[test]
    fn test_dispose_after_close_is_unavailable() {
        let handler = handler(4, Arc::new(MemoryTarget::new()));
        let (mut queue, _rx) = queue::channel(4);
        queue.close();
        let status = handler.dispose("s", &queue, Envelope::new(&b"a"[..]));
        assert_eq!(status, Status::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_handle_over_channel_stream() {
        let target = Arc::new(MemoryTarget::new());
        let handler = handler(16, target.clone());
        let (mut stream, mut client) = ChannelStream::pair(16);

        client.send(Envelope::new(&b"one"[..])).await.unwrap();
        client.send(Envelope::default()).await.unwrap();
        client.send(Envelope::new(&b"two"[..])).await.unwrap();
        client.close_send();

        let err = handler.handle(&mut stream).await.unwrap_err();
        assert!(err.is_closed());
        drop(stream);

        let statuses: Vec<_> = client
            .collect_responses()
            .await
            .into_iter()
            .map(|r| r.status)
            .collect();
        assert_eq!(
            statuses,
            vec![Status::Success, Status::BadRequest, Status::Success]
        );

        target.wait_for_calls(2).await;
        let delivered = target.envelopes().await;
        assert_eq!(delivered[0].payload.as_ref(), b"one");
        assert_eq!(delivered[1].payload.as_ref(), b"two");
    }

    #[tokio::test]
    async fn test_shutdown_flag() {
        let handler = handler(1, Arc::new(MemoryTarget::new()));
        assert!(!handler.is_shutdown());
        handler.shutdown();
        assert!(handler.is_shutdown());
        assert_eq!(handler.config().queue_size, 1);
    }
}
