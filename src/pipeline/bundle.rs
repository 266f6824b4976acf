use std::collections::HashSet;

use crate::wire::{Message, MessageType, RelayMessage};

/// The response slot accepts an in-place class change (rapid-commit
/// promotion turns an Advertise into a Reply between `handle` and `post`),
/// so it is modeled as a sum type across concrete message classes rather
/// than a value bound to one concrete class (SPEC_FULL.md §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMessage {
    Advertise(Message),
    Reply(Message),
}

impl ResponseMessage {
    pub fn message(&self) -> &Message {
        match self {
            ResponseMessage::Advertise(m) | ResponseMessage::Reply(m) => m,
        }
    }

    pub fn message_mut(&mut self) -> &mut Message {
        match self {
            ResponseMessage::Advertise(m) | ResponseMessage::Reply(m) => m,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            ResponseMessage::Advertise(m) | ResponseMessage::Reply(m) => m,
        }
    }

    pub fn is_advertise(&self) -> bool {
        matches!(self, ResponseMessage::Advertise(_))
    }

    /// Rewrite the response from Advertise to Reply, keeping its options and
    /// transaction id. A no-op if already a Reply. This is the only place in
    /// the pipeline where the response's concrete class may change after
    /// `handle` (SPEC_FULL.md §4.1 step 7).
    pub fn promote_to_reply(&mut self) {
        if let ResponseMessage::Advertise(m) = self {
            let mut reply = m.clone();
            reply.msg_type = MessageType::Reply;
            *self = ResponseMessage::Reply(reply);
        }
    }
}

/// The mutable per-request state shepherded through the pipeline
/// (SPEC_FULL.md §3). Created when a request is accepted for processing and
/// dropped when the Message Handler returns; never shared across requests.
pub struct TransactionBundle {
    pub request: Message,
    /// Outermost to innermost relay-forward frames the request traversed.
    pub incoming_relay_messages: Vec<RelayMessage>,
    pub response: Option<ResponseMessage>,
    /// Mirrors `incoming_relay_messages` 1:1 once materialized; `None` until
    /// the Message Handler builds the provisional response.
    pub outgoing_relay_messages: Option<Vec<RelayMessage>>,
    pub marks: HashSet<String>,
    pub received_over_multicast: bool,
    pub allow_rapid_commit: bool,
    pub rapid_commit_rejections: bool,
}

impl TransactionBundle {
    pub fn new(
        request: Message,
        incoming_relay_messages: Vec<RelayMessage>,
        marks: HashSet<String>,
        received_over_multicast: bool,
        allow_rapid_commit: bool,
        rapid_commit_rejections: bool,
    ) -> Self {
        TransactionBundle {
            request,
            incoming_relay_messages,
            response: None,
            outgoing_relay_messages: None,
            marks,
            received_over_multicast,
            allow_rapid_commit,
            rapid_commit_rejections,
        }
    }

    /// Materialize the outgoing relay chain, mirroring the inbound chain
    /// 1:1. Enforces invariant 1 of SPEC_FULL.md §3 at construction time.
    pub fn materialize_outgoing_relay_messages(&mut self, frames: Vec<RelayMessage>) {
        debug_assert_eq!(frames.len(), self.incoming_relay_messages.len());
        self.outgoing_relay_messages = Some(frames);
    }

    /// Marks are a set: adding the same mark twice is a no-op on state.
    pub fn mark(&mut self, name: impl Into<String>) {
        self.marks.insert(name.into());
    }

    pub fn has_mark(&self, name: &str) -> bool {
        self.marks.contains(name)
    }

    pub fn response_message(&self) -> Option<&Message> {
        self.response.as_ref().map(ResponseMessage::message)
    }

    pub fn response_message_mut(&mut self) -> Option<&mut Message> {
        self.response.as_mut().map(ResponseMessage::message_mut)
    }
}
