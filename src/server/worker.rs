//! Per-listener blocking receive→process→send loop (SPEC_FULL.md §4.9, §5),
//! grounded in the teacher's synchronous `v6::worker::v6_worker` rather than
//! its experimental `tower`/`tokio` transport: one OS thread per listener,
//! a blocking `recv_from`, decode, dispatch to the [`MessageHandler`], encode,
//! send.

use std::io;
use std::time::Duration;

use tracing::{debug, error, trace};

use crate::pipeline::MessageHandler;
use crate::server::socket::Listener;
use crate::wire::DhcpMessage;

const MAX_BACKOFF_MS: u64 = 1000;

/// Runs the receive loop for one bound listener until its socket errors out
/// unrecoverably or the process exits. Intended to be the body of a
/// dedicated OS thread, one per listener (SPEC_FULL.md §5: "this crate models
/// 'worker processes' as OS threads spawned by the master").
pub fn run(listener: Listener, message_handler: &MessageHandler) {
    let Listener { spec, socket } = listener;
    let received_over_multicast = matches!(spec, crate::server::socket::ListenerSpec::Multicast { .. });
    let mut read_buf = [0u8; 2048];
    let mut error_count: u32 = 0;

    loop {
        let (amount, src) = match socket.recv_from(&mut read_buf) {
            Ok(pair) => {
                error_count = 0;
                pair
            }
            Err(err) => {
                match err.kind() {
                    io::ErrorKind::ConnectionReset => {
                        error!(%spec, "sent response to host that replied with ICMP unreachable");
                    }
                    io::ErrorKind::Interrupted => {
                        debug!(%spec, "recv_from interrupted, retrying");
                    }
                    _ => {
                        error!(%spec, %err, "unexpected socket error");
                        error_count = error_count.saturating_add(1);
                        let backoff_ms = std::cmp::min(
                            10_u64.saturating_mul(2_u64.saturating_pow(error_count)),
                            MAX_BACKOFF_MS,
                        );
                        std::thread::sleep(Duration::from_millis(backoff_ms));
                    }
                }
                continue;
            }
        };
        trace!(%spec, amount, %src, "received datagram");

        let message = match DhcpMessage::from_bytes(&read_buf[..amount]) {
            Ok(m) => m,
            Err(e) => {
                debug!(%spec, %src, "failed to decode datagram: {e}");
                continue;
            }
        };

        let Some(response) =
            message_handler.handle(message, received_over_multicast, std::iter::empty())
        else {
            continue;
        };

        match socket.send_to(&response.to_bytes(), src) {
            Ok(sent) => trace!(%spec, %src, sent, "sent response"),
            Err(e) => error!(%spec, %src, "failed to send response: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multicast_listener_is_flagged_as_received_over_multicast() {
        let spec = crate::server::socket::ListenerSpec::Multicast {
            interface: "lo".to_string(),
        };
        assert!(matches!(
            spec,
            crate::server::socket::ListenerSpec::Multicast { .. }
        ));
    }
}
