//! Small, single-purpose handlers that only set marks or raise abort
//! signals. These are the kind of handler a Filter predicate usually gates
//! (SPEC_FULL.md §4.3): on their own they carry no client-facing semantics.

use std::net::Ipv6Addr;

use crate::pipeline::{Handler, HandlerError, HandlerResult, TransactionBundle};
use crate::wire::DhcpOption;

/// Unconditionally raises [`HandlerError::Ignore`]. Intended to sit behind a
/// Filter node whose predicate recognizes traffic that should be dropped
/// without comment (SPEC_FULL.md §7 class 3).
pub struct IgnoreRequestHandler;

impl Handler for IgnoreRequestHandler {
    fn handle(&self, _bundle: &mut TransactionBundle) -> HandlerResult {
        Err(HandlerError::Ignore)
    }
}

/// Marks the bundle as explicitly permitting a unicast reply, satisfying the
/// multicast policy check the Message Handler applies after the handler tree
/// completes (SPEC_FULL.md §4.1 step 6), and attaches a ServerUnicast option
/// (RFC 8415 §21.6) so the client knows which address to address future
/// unicast requests to (SPEC_FULL.md §8 scenario 3). Place this behind a
/// Filter whose predicate recognizes the clients/links unicast is permitted
/// for.
pub struct AllowUnicastHandler {
    pub address: Ipv6Addr,
}

impl Handler for AllowUnicastHandler {
    fn pre(&self, bundle: &mut TransactionBundle) -> HandlerResult {
        bundle.mark("unicast-ok");
        Ok(())
    }

    fn handle(&self, bundle: &mut TransactionBundle) -> HandlerResult {
        if let Some(response) = bundle.response_message_mut() {
            response
                .options
                .push(DhcpOption::ServerUnicast(self.address));
        }
        Ok(())
    }
}
