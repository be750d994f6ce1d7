//! Bounded per-session message queue
//!
//! Single producer (the receive loop), single consumer (the drain loop).
//! Pushing never waits: a full queue rejects the envelope. Closing the
//! producer lets the consumer drain what is left and then observe the end.
//!
//! A zero-capacity queue is a rendezvous: a push succeeds only while the
//! consumer is parked in `recv` and nothing is in flight.

use crate::types::Envelope;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Why an envelope could not be queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// The queue holds `capacity` envelopes already
    Full(Envelope),
    /// The queue was closed, or the consumer is gone
    Closed(Envelope),
}

impl PushError {
    /// Recover the envelope that was not queued
    pub fn into_inner(self) -> Envelope {
        match self {
            PushError::Full(envelope) | PushError::Closed(envelope) => envelope,
        }
    }
}

/// Create a queue holding at most `capacity` envelopes
///
/// With a capacity of zero, pushes only hand off to a consumer that is
/// already waiting in `recv`; otherwise they fail as `Full`.
pub fn channel(capacity: usize) -> (QueueSender, QueueReceiver) {
    // tokio's bounded channel needs at least one slot; the rendezvous
    // case uses that slot for the single hand-off in flight.
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (closed_tx, closed_rx) = watch::channel(false);
    let parked = Arc::new(AtomicBool::new(false));
    (
        QueueSender {
            tx: Some(tx),
            capacity,
            closed: closed_tx,
            parked: parked.clone(),
        },
        QueueReceiver {
            rx,
            closed: closed_rx,
            parked,
        },
    )
}

/// Producer half, owned by the receive loop
#[derive(Debug)]
pub struct QueueSender {
    tx: Option<mpsc::Sender<Envelope>>,
    capacity: usize,
    closed: watch::Sender<bool>,
    parked: Arc<AtomicBool>,
}

impl QueueSender {
    /// Queue an envelope without waiting
    pub fn try_push(&self, envelope: Envelope) -> Result<(), PushError> {
        if self.is_closed() {
            return Err(PushError::Closed(envelope));
        }
        let Some(tx) = &self.tx else {
            return Err(PushError::Closed(envelope));
        };
        if self.capacity == 0
            && !(self.parked.load(Ordering::Acquire) && tx.capacity() == tx.max_capacity())
        {
            return Err(PushError::Full(envelope));
        }
        tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(envelope) => PushError::Full(envelope),
            mpsc::error::TrySendError::Closed(envelope) => PushError::Closed(envelope),
        })
    }

    /// Stop accepting envelopes; queued ones stay available to the consumer
    pub fn close(&mut self) {
        self.tx = None;
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tx
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }
}

/// Consumer half, owned by the drain loop
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::Receiver<Envelope>,
    closed: watch::Receiver<bool>,
    parked: Arc<AtomicBool>,
}

/// Marks the consumer as waiting for as long as it lives
struct Parked<'a>(&'a AtomicBool);

impl<'a> Parked<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for Parked<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QueueReceiver {
    /// Next envelope in FIFO order, or `None` once closed and empty
    ///
    /// Cancel safe: dropping the future loses no envelope.
    pub async fn recv(&mut self) -> Option<Envelope> {
        match self.rx.try_recv() {
            Ok(envelope) => return Some(envelope),
            Err(mpsc::error::TryRecvError::Disconnected) => return None,
            Err(mpsc::error::TryRecvError::Empty) => {}
        }
        let _parked = Parked::enter(&self.parked);
        self.rx.recv().await
    }

    /// Wait until the producer closes the queue or goes away, without
    /// consuming anything
    pub async fn closed(&mut self) {
        // An error means the sender was dropped, which also closes the queue.
        let _ = self.closed.wait_for(|closed| *closed).await;
    }
}
