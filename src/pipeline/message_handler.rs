//! The Message Handler (SPEC_FULL.md §4.1): the root orchestrator that
//! unwraps a relay chain, runs the three handler lists (extension setup,
//! configured tree, extension cleanup) across a `TransactionBundle`, and
//! re-wraps whatever response results before handing it back to the worker
//! for transmission.

use tracing::{debug, info, instrument, warn};

use crate::duid::Duid;
use crate::wire::option::{code, status, StatusCodeOption};
use crate::wire::{DhcpMessage, DhcpOption, Message, MessageType, RelayMessage};

use super::bundle::{ResponseMessage, TransactionBundle};
use super::filter::{run_list, Node};
use super::handler::HandlerError;
use super::registry::ExtensionRegistry;

pub struct MessageHandler {
    pub server_duid: Duid,
    pub tree: Vec<Node>,
    pub extensions: ExtensionRegistry,
    pub allow_rapid_commit: bool,
    pub rapid_commit_rejections: bool,
}

/// Why the unwrap-and-classify steps (SPEC_FULL.md §4.1 steps 1-3) decided
/// not to produce any bundle at all. Distinguishing the two is only useful
/// for logging: both result in silently dropping the datagram.
enum Rejected {
    NotClientToServer,
    EmptyConfirm,
}

impl MessageHandler {
    pub fn new(
        server_duid: Duid,
        tree: Vec<Node>,
        extensions: ExtensionRegistry,
        allow_rapid_commit: bool,
        rapid_commit_rejections: bool,
    ) -> Self {
        MessageHandler {
            server_duid,
            tree,
            extensions,
            allow_rapid_commit,
            rapid_commit_rejections,
        }
    }

    /// Runs once per worker thread before it starts serving requests.
    pub fn worker_init(&self) {
        for node in &self.tree {
            node.worker_init();
        }
        for node in self.extensions.setup_handlers() {
            node.worker_init();
        }
        for node in self.extensions.cleanup_handlers() {
            node.worker_init();
        }
    }

    /// Process one datagram already off the wire. `marks` seeds the bundle's
    /// mark set before any handler runs (SPEC_FULL.md §4.1 step 2) — the
    /// mechanism by which a listener or caller can hand a request to the
    /// filter tree pre-classified (SPEC_FULL.md §8 scenario 3: a request
    /// arriving with `unicast-me` already set opens a `Filter` gated on that
    /// mark). Returns the message ready to transmit back, or `None` if
    /// nothing should be sent.
    #[instrument(skip(self, message, marks))]
    pub fn handle(
        &self,
        message: DhcpMessage,
        received_over_multicast: bool,
        marks: impl IntoIterator<Item = String>,
    ) -> Option<DhcpMessage> {
        let (request, incoming_relay_messages) = match unwrap_relay_chain(message) {
            Ok(pair) => pair,
            Err(reason) => {
                warn!(%reason, "dropping request: could not unwrap relay chain");
                return None;
            }
        };

        if let Some(rejected) = classify(&request) {
            match rejected {
                Rejected::NotClientToServer => {
                    warn!(msg_type = ?request.msg_type, "dropping non-client-to-server message")
                }
                Rejected::EmptyConfirm => {
                    debug!("dropping Confirm with no IA options to confirm")
                }
            }
            return None;
        }

        let mut bundle = TransactionBundle::new(
            request,
            incoming_relay_messages,
            marks.into_iter().collect(),
            received_over_multicast,
            self.allow_rapid_commit,
            self.rapid_commit_rejections,
        );

        self.build_provisional_response(&mut bundle);

        if let Err(err) = self.run_handler_lists(&mut bundle) {
            return self.finalize_abort(&bundle, err);
        }

        self.apply_multicast_policy(&mut bundle);
        self.apply_rapid_commit_promotion(&mut bundle);
        self.apply_confirm_semantics(&mut bundle);
        self.apply_default_deny(&mut bundle);

        Some(self.rewrap(bundle))
    }

    fn build_provisional_response(&self, bundle: &mut TransactionBundle) {
        let response_type = if bundle.request.msg_type == MessageType::Solicit {
            MessageType::Advertise
        } else {
            MessageType::Reply
        };
        let response_msg = self.base_response_message(response_type, &bundle.request);

        bundle.response = Some(if response_type == MessageType::Advertise {
            ResponseMessage::Advertise(response_msg)
        } else {
            ResponseMessage::Reply(response_msg)
        });

        let outgoing = bundle
            .incoming_relay_messages
            .iter()
            .map(|inbound| RelayMessage {
                msg_type: MessageType::RelayRepl,
                hop_count: inbound.hop_count,
                link_addr: inbound.link_addr,
                peer_addr: inbound.peer_addr,
                options: Vec::new(),
            })
            .collect();
        bundle.materialize_outgoing_relay_messages(outgoing);
    }

    /// A fresh response message carrying only the mandatory ClientId (if the
    /// request had one) and this server's ServerId (invariant 3 of
    /// SPEC_FULL.md §3).
    fn base_response_message(&self, response_type: MessageType, request: &Message) -> Message {
        let mut response = Message::new(response_type, request.xid);
        if let Some(DhcpOption::ClientId(id)) = request.get_option(code::CLIENTID) {
            response.options.push(DhcpOption::ClientId(id.clone()));
        }
        response
            .options
            .push(DhcpOption::ServerId(self.server_duid.bytes.clone()));
        response
    }

    fn run_handler_lists(&self, bundle: &mut TransactionBundle) -> Result<(), HandlerError> {
        run_list(&self.extensions.setup_handlers(), bundle)?;
        run_list(&self.tree, bundle)?;
        run_list(&self.extensions.cleanup_handlers(), bundle)?;
        Ok(())
    }

    /// Translate an abort signal raised anywhere in the three handler lists
    /// into the Message Handler's final answer (SPEC_FULL.md §7 class 3).
    fn finalize_abort(
        &self,
        bundle: &TransactionBundle,
        err: HandlerError,
    ) -> Option<DhcpMessage> {
        match err {
            HandlerError::Ignore => {
                info!("request ignored by handler");
                None
            }
            HandlerError::CannotRespond => {
                info!("handler declared no reply possible");
                None
            }
            HandlerError::UseMulticast if bundle.received_over_multicast => {
                tracing::error!(
                    "not telling client to use multicast: request already arrived over multicast"
                );
                None
            }
            HandlerError::UseMulticast => {
                let mut response =
                    self.base_response_message(MessageType::Reply, &bundle.request);
                response.options.push(usemulticast_status_option());
                Some(self.rewrap_message(bundle, response))
            }
        }
    }

    /// Step 6 (SPEC_FULL.md §4.1): requests not received over multicast must
    /// either carry a handler's explicit unicast permission mark, or be
    /// answered with a bare USE_MULTICAST rejection.
    fn apply_multicast_policy(&self, bundle: &mut TransactionBundle) {
        if bundle.received_over_multicast || bundle.has_mark("unicast-ok") {
            return;
        }
        if let Some(response) = bundle.response_message_mut() {
            response
                .options
                .retain(|o| o.code() == code::CLIENTID || o.code() == code::SERVERID);
            response.options.push(usemulticast_status_option());
        }
        if let Some(resp) = bundle.response.as_mut() {
            resp.promote_to_reply();
        }
        bundle.mark("__usemulticast_short_circuit");
    }

    /// Step 7: rapid-commit promotion (SPEC_FULL.md §4.1, §4.6).
    fn apply_rapid_commit_promotion(&self, bundle: &mut TransactionBundle) {
        if bundle.has_mark("__usemulticast_short_circuit") {
            return;
        }
        if !bundle
            .response
            .as_ref()
            .is_some_and(ResponseMessage::is_advertise)
        {
            return;
        }
        if bundle.request.get_option(code::RAPID_COMMIT).is_none() {
            return;
        }
        if !bundle.allow_rapid_commit {
            return;
        }
        if bundle.rapid_commit_rejections {
            if let Some(resp) = bundle.response.as_mut() {
                resp.promote_to_reply();
            }
        }
    }

    /// Step 8: Confirm semantics (SPEC_FULL.md §4.1, RFC 8415 §18.3.5).
    fn apply_confirm_semantics(&self, bundle: &mut TransactionBundle) {
        if bundle.has_mark("__usemulticast_short_circuit") {
            return;
        }
        if bundle.request.msg_type != MessageType::Confirm {
            return;
        }
        if bundle.has_mark("confirmed") {
            return;
        }
        if let Some(response) = bundle.response_message_mut() {
            if crate::wire::option::find_status_code(&response.options).is_some() {
                return;
            }
            warn!("no handler confirmed addresses for this link; replying NotOnLink");
            response.options.push(DhcpOption::StatusCode(
                StatusCodeOption::new(status::NOTONLINK, "no handler confirmed this link"),
            ));
        }
    }

    /// Step 9: default deny for IA containers that reached the response
    /// without an address/prefix sub-option (SPEC_FULL.md §4.1, RFC 8415
    /// §18.3.2/§18.3.3).
    fn apply_default_deny(&self, bundle: &mut TransactionBundle) {
        if bundle.has_mark("__usemulticast_short_circuit") {
            return;
        }
        let Some(response) = bundle.response_message_mut() else {
            return;
        };
        for option in response.options.iter_mut() {
            match option {
                DhcpOption::IaNa(ia) => {
                    deny_if_empty(&mut ia.options, code::IAADDR, status::NOADDRSAVAIL, "no addresses available")
                }
                DhcpOption::IaTa(ia) => {
                    deny_if_empty(&mut ia.options, code::IAADDR, status::NOADDRSAVAIL, "no addresses available")
                }
                DhcpOption::IaPd(ia) => {
                    deny_if_empty(&mut ia.options, code::IAPREFIX, status::NOPREFIXAVAIL, "no prefixes available")
                }
                _ => {}
            }
        }
    }

    /// Step 10: re-wrap the response inside the outgoing relay chain, if
    /// any, innermost first (SPEC_FULL.md §4.1).
    fn rewrap(&self, bundle: TransactionBundle) -> DhcpMessage {
        let response = bundle
            .response
            .clone()
            .expect("response present by step 10")
            .into_message();
        self.rewrap_message(&bundle, response)
    }

    fn rewrap_message(&self, bundle: &TransactionBundle, response: Message) -> DhcpMessage {
        let outgoing = match &bundle.outgoing_relay_messages {
            Some(frames) if !frames.is_empty() => frames.clone(),
            _ => return DhcpMessage::Direct(response),
        };
        let mut payload = response.to_bytes();
        let mut wrapped: Option<RelayMessage> = None;
        for mut frame in outgoing.into_iter().rev() {
            frame.options.push(DhcpOption::RelayMessage(payload));
            payload = frame.to_bytes();
            wrapped = Some(frame);
        }
        DhcpMessage::Relay(wrapped.expect("non-empty outgoing chain"))
    }
}

fn usemulticast_status_option() -> DhcpOption {
    DhcpOption::StatusCode(StatusCodeOption::new(status::USEMULTICAST, "use multicast"))
}

fn deny_if_empty(options: &mut Vec<DhcpOption>, address_code: u16, status: u16, message: &str) {
    let has_address = options.iter().any(|o| o.code() == address_code);
    if !has_address {
        options.push(DhcpOption::StatusCode(StatusCodeOption::new(status, message)));
    }
}

/// Step 1 (SPEC_FULL.md §4.1): peel relay-forward layers until a
/// client/server message is found.
fn unwrap_relay_chain(message: DhcpMessage) -> Result<(Message, Vec<RelayMessage>), String> {
    let mut relays = Vec::new();
    let mut current = message;
    loop {
        match current {
            DhcpMessage::Direct(m) => return Ok((m, relays)),
            DhcpMessage::Relay(r) => {
                if r.msg_type != MessageType::RelayForw {
                    return Err("received a relay-reply at the top level".to_string());
                }
                let payload = match r.relayed_payload() {
                    Some(p) => p.to_vec(),
                    None => {
                        return Err("relay frame carries no inner RelayMessage option".to_string())
                    }
                };
                relays.push(r);
                current = DhcpMessage::from_bytes(&payload)
                    .map_err(|e| format!("failed to decode relayed payload: {e}"))?;
            }
        }
    }
}

/// Step 3 (SPEC_FULL.md §4.1): reject anything that should never reach the
/// handler tree. `MessageType::is_client_to_server` is exhaustive over the
/// wire codec's closed `MessageType` enum, so there is no third "unknown
/// client-to-server type" case to represent here.
fn classify(request: &Message) -> Option<Rejected> {
    if !request.msg_type.is_client_to_server() {
        return Some(Rejected::NotClientToServer);
    }
    if request.msg_type == MessageType::Confirm {
        let has_ia = request.options.iter().any(|o| {
            matches!(
                o,
                DhcpOption::IaNa(_) | DhcpOption::IaTa(_) | DhcpOption::IaPd(_)
            )
        });
        if !has_ia {
            return Some(Rejected::EmptyConfirm);
        }
    }
    None
}
