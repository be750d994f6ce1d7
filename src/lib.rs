//! # orderer-broadcast
//!
//! Broadcast ingestion front-end for an ordering service.
//!
//! ## Overview
//!
//! A client opens one long-lived duplex stream and submits envelopes over
//! it. For each envelope the handler asks a `FilterChain` for an `Action`,
//! queues accepted envelopes in a bounded per-session queue, and answers
//! with a `BroadcastResponse` before reading the next one. A drain task
//! moves queued envelopes into the shared `Target` (the ordering engine).
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use orderer_broadcast::{
//!     AcceptRule, ChannelStream, EmptyRejectRule, Envelope, Handler, HandlerConfig,
//!     HandlerImpl, MemoryTarget, RuleSet, Status,
//! };
//!
//! # async fn example() -> orderer_broadcast::Result<()> {
//! let rules = RuleSet::default().with_rule(EmptyRejectRule).with_rule(AcceptRule);
//! let target = Arc::new(MemoryTarget::new());
//! let handler = HandlerImpl::new(HandlerConfig::new(100), target.clone(), Arc::new(rules));
//!
//! let (mut stream, mut client) = ChannelStream::pair(16);
//! client.send(Envelope::new(&b"tx-1"[..])).await?;
//! client.close_send();
//!
//! // Returns once the client's side is finished
//! let _ = handler.handle(&mut stream).await;
//! drop(stream);
//!
//! let acks = client.collect_responses().await;
//! assert_eq!(acks[0].status, Status::Success);
//! # Ok(())
//! # }
//! ```
//!
//! ## Responses
//!
//! - **Success**: accepted into the session queue, not yet delivered
//! - **BadRequest**: refused by the filter chain (`Reject` or `Forward`)
//! - **ServiceUnavailable**: session queue full; the envelope was dropped
//!
//! ## Architecture
//!
//! - **Handler** trait: services one connection per `handle` call
//! - **BroadcastStream** trait: duplex envelope/response stream
//! - **FilterChain** trait / **RuleSet**: envelope classification
//! - **Target** trait: downstream intake shared by all sessions

mod drain;

pub mod config;
pub mod error;
pub mod filter;
pub mod handler;
pub mod queue;
pub mod target;
pub mod transport;
pub mod types;

// Re-export core types
pub use config::HandlerConfig;
pub use error::{BroadcastError, Result};
pub use filter::{AcceptRule, Action, EmptyRejectRule, FilterChain, Rule, RuleSet};
pub use handler::{Handler, HandlerImpl};
pub use queue::{PushError, QueueReceiver, QueueSender};
pub use target::{MemoryTarget, Target};
pub use transport::{BroadcastStream, ChannelClient, ChannelStream, StreamSession};
pub use types::{BroadcastResponse, Envelope, Status};
