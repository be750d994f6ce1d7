//! Broadcast filters: classify envelopes before they are queued
//!
//! A `FilterChain` turns an envelope into an `Action`. The handler only
//! cares which of two groups the action falls in: queued (`Accept`,
//! `Reconfigure`) or refused (`Reject`, `Forward`).

use crate::types::Envelope;

/// Classification result for a single envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Deliver to the target
    Accept,
    /// Deliver to the target; the envelope changes channel configuration
    Reconfigure,
    /// Refuse the envelope
    Reject,
    /// This rule has no opinion; defer to the next rule
    Forward,
}

impl Action {
    /// True for actions whose envelopes go into the session queue
    pub fn is_queued(self) -> bool {
        match self {
            Action::Accept | Action::Reconfigure => true,
            Action::Reject | Action::Forward => false,
        }
    }
}

/// Classifies envelopes for a broadcast handler
///
/// Must not block. There is no error path: a chain that cannot classify
/// an envelope returns `Reject`.
pub trait FilterChain: Send + Sync {
    fn classify(&self, envelope: &Envelope) -> Action;
}

/// A single rule inside a `RuleSet`
pub trait Rule: Send + Sync {
    fn apply(&self, envelope: &Envelope) -> Action;
}

/// Ordered list of rules
///
/// Rules are evaluated in order. `Forward` passes the envelope to the next
/// rule; any other action is final. If every rule forwards, the envelope
/// is rejected.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Append a rule to the end of the chain
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FilterChain for RuleSet {
    fn classify(&self, envelope: &Envelope) -> Action {
        for rule in &self.rules {
            match rule.apply(envelope) {
                Action::Forward => continue,
                action => return action,
            }
        }
        Action::Reject
    }
}

/// Rejects envelopes with an empty payload, forwards everything else
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRejectRule;

impl Rule for EmptyRejectRule {
    fn apply(&self, envelope: &Envelope) -> Action {
        if envelope.is_empty() {
            tracing::debug!("Rejecting envelope with empty payload");
            Action::Reject
        } else {
            Action::Forward
        }
    }
}

/// Accepts every envelope; normally the last rule of a chain
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptRule;

impl Rule for AcceptRule {
    fn apply(&self, _envelope: &Envelope) -> Action {
        Action::Accept
    }
}

impl<F> Rule for F
where
    F: Fn(&Envelope) -> Action + Send + Sync,
{
    fn apply(&self, envelope: &Envelope) -> Action {
        self(envelope)
    }
}
