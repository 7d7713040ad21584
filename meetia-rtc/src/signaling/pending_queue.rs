use meetia_core::{SignalKind, SignalMessage};
use std::collections::VecDeque;

#[derive(Debug)]
struct PendingSignal {
    generation: u64,
    message: SignalMessage,
}

/// FIFO of outbound signals waiting for an open transport.
///
/// A message leaves the queue only after the handoff closure accepted it.
/// Each message remembers the peer connection generation that produced it.
#[derive(Debug, Default)]
pub struct PendingSignalQueue {
    messages: VecDeque<PendingSignal>,
}

impl PendingSignalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, generation: u64, message: SignalMessage) {
        self.messages.push_back(PendingSignal {
            generation,
            message,
        });
    }

    /// Hands messages to `send` in enqueue order until it fails or the
    /// queue is empty. Returns how many were delivered.
    pub fn flush<E>(&mut self, mut send: impl FnMut(&SignalMessage) -> Result<(), E>) -> usize {
        let mut delivered = 0;
        while let Some(next) = self.messages.front() {
            if send(&next.message).is_err() {
                break;
            }
            self.messages.pop_front();
            delivered += 1;
        }
        delivered
    }

    /// Drops offers and answers produced before `generation`. Their peer
    /// connection is gone and the remote side must not answer them.
    /// Candidates keep their place. Returns how many were dropped.
    pub fn drop_negotiation_before(&mut self, generation: u64) -> usize {
        let before = self.messages.len();
        self.messages.retain(|pending| {
            pending.generation >= generation || pending.message.kind == SignalKind::Candidate
        });
        before - self.messages.len()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalMessage> {
        self.messages.iter().map(|pending| &pending.message)
    }
}
