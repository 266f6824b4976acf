use super::bundle::TransactionBundle;
use crate::wire::RelayMessage;

/// Abort-processing signals a handler may raise from `pre`/`handle`/`post`
/// (SPEC_FULL.md §7, class 3). Any other error a handler encounters is its
/// own concern: log it and return `Ok(())`, or fall through to the default
/// protocol-level rejection a later handler or the Message Handler applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerError {
    /// No response should be sent at all.
    CannotRespond,
    /// The client should be told to retry over multicast.
    UseMulticast,
    /// Drop the request silently, as if it had never arrived.
    Ignore,
}

pub type HandlerResult = Result<(), HandlerError>;

/// The three-phase contract every handler implements (SPEC_FULL.md §4.2).
/// All three phases default to a no-op so a handler only overrides the ones
/// it cares about.
pub trait Handler: Send + Sync {
    /// Runs once per worker before any request is processed.
    fn worker_init(&self) {}

    fn pre(&self, _bundle: &mut TransactionBundle) -> HandlerResult {
        Ok(())
    }

    fn handle(&self, _bundle: &mut TransactionBundle) -> HandlerResult {
        Ok(())
    }

    fn post(&self, _bundle: &mut TransactionBundle) -> HandlerResult {
        Ok(())
    }
}

/// A handler whose `handle` phase operates per relay frame rather than once
/// per bundle (SPEC_FULL.md §4.2). Pair inbound/outbound relay frames are
/// presented by index rather than by reference, since Rust cannot hold a
/// shared borrow of `bundle.incoming_relay_messages` alongside the mutable
/// borrow `handle_relay` needs for the outbound side.
pub trait RelayHandler: Send + Sync {
    fn pre(&self, _bundle: &mut TransactionBundle) -> HandlerResult {
        Ok(())
    }

    /// `inbound` is a snapshot of `bundle.incoming_relay_messages[outbound_index]`
    /// taken before the call; the implementation reaches
    /// `bundle.outgoing_relay_messages.as_mut().unwrap()[outbound_index]` for
    /// its mutable half.
    fn handle_relay(
        &self,
        bundle: &mut TransactionBundle,
        inbound: &RelayMessage,
        outbound_index: usize,
    ) -> HandlerResult;

    fn post(&self, _bundle: &mut TransactionBundle) -> HandlerResult {
        Ok(())
    }
}

/// Lifts a [`RelayHandler`] into a plain [`Handler`] by doing the pairwise
/// iteration `handle` requires.
pub struct RelayHandlerAdapter<T>(pub T);

impl<T: RelayHandler> Handler for RelayHandlerAdapter<T> {
    fn pre(&self, bundle: &mut TransactionBundle) -> HandlerResult {
        self.0.pre(bundle)
    }

    fn handle(&self, bundle: &mut TransactionBundle) -> HandlerResult {
        let in_len = bundle.incoming_relay_messages.len();
        let out_len = bundle.outgoing_relay_messages.as_ref().map(Vec::len);
        if out_len != Some(in_len) {
            tracing::error!(
                in_len,
                out_len = ?out_len,
                "relay handler invoked with no matching outgoing relay chain"
            );
            return Ok(());
        }
        let inbound_frames = bundle.incoming_relay_messages.clone();
        for (i, inbound) in inbound_frames.iter().enumerate() {
            self.0.handle_relay(bundle, inbound, i)?;
        }
        Ok(())
    }

    fn post(&self, bundle: &mut TransactionBundle) -> HandlerResult {
        self.0.post(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Message, MessageType};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bundle_with_relays(n: usize) -> TransactionBundle {
        let incoming: Vec<RelayMessage> = (0..n)
            .map(|i| RelayMessage {
                msg_type: MessageType::RelayForw,
                hop_count: i as u8,
                link_addr: "2001:db8::1".parse().unwrap(),
                peer_addr: "fe80::1".parse().unwrap(),
                options: Vec::new(),
            })
            .collect();
        let mut bundle = TransactionBundle::new(
            Message::new(MessageType::Solicit, [0, 0, 1]),
            incoming,
            HashSet::new(),
            true,
            false,
            false,
        );
        let outgoing = bundle
            .incoming_relay_messages
            .iter()
            .map(|r| RelayMessage {
                msg_type: MessageType::RelayRepl,
                hop_count: r.hop_count,
                link_addr: r.link_addr,
                peer_addr: r.peer_addr,
                options: Vec::new(),
            })
            .collect();
        bundle.materialize_outgoing_relay_messages(outgoing);
        bundle
    }

    struct CountingRelayHandler(AtomicUsize);

    impl RelayHandler for CountingRelayHandler {
        fn handle_relay(
            &self,
            bundle: &mut TransactionBundle,
            inbound: &RelayMessage,
            outbound_index: usize,
        ) -> HandlerResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            let outbound = &mut bundle.outgoing_relay_messages.as_mut().unwrap()[outbound_index];
            outbound.hop_count = inbound.hop_count;
            Ok(())
        }
    }

    #[test]
    fn relay_handler_visits_every_pair() {
        let mut bundle = bundle_with_relays(3);
        let adapter = RelayHandlerAdapter(CountingRelayHandler(AtomicUsize::new(0)));
        adapter.handle(&mut bundle).unwrap();
        assert_eq!(adapter.0 .0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn relay_handler_skips_on_length_mismatch() {
        let mut bundle = bundle_with_relays(2);
        bundle.outgoing_relay_messages.as_mut().unwrap().pop();
        let adapter = RelayHandlerAdapter(CountingRelayHandler(AtomicUsize::new(0)));
        adapter.handle(&mut bundle).unwrap();
        assert_eq!(adapter.0 .0.load(Ordering::SeqCst), 0);
    }
}
