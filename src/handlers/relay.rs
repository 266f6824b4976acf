//! Relay-frame bookkeeping handlers (SPEC_FULL.md §4.2, RFC 8415 §21.18).

use crate::pipeline::{HandlerResult, RelayHandler, TransactionBundle};
use crate::wire::{DhcpOption, RelayMessage};

/// Copies each inbound relay frame's Interface-ID option onto the
/// corresponding outbound frame, unchanged, as RFC 8415 §21.18 requires: the
/// server must echo Interface-ID back exactly as the relay sent it.
pub struct InterfaceIdMirrorHandler;

impl RelayHandler for InterfaceIdMirrorHandler {
    fn handle_relay(
        &self,
        bundle: &mut TransactionBundle,
        inbound: &RelayMessage,
        outbound_index: usize,
    ) -> HandlerResult {
        if let Some(interface_id) = inbound.interface_id() {
            let outbound = &mut bundle.outgoing_relay_messages.as_mut().unwrap()[outbound_index];
            outbound
                .options
                .push(DhcpOption::InterfaceId(interface_id.to_vec()));
        }
        Ok(())
    }
}
