//! Illustrative reservation-backed allocator (SPEC_FULL.md §4.8). Turns IA_NA
//! and IA_PD requests into bound addresses/prefixes by looking a client up in
//! the [`ReservationDb`] by DUID, then by its relay-supplied Option 18/37
//! identification, then by MAC; address/prefix allocation *policy* beyond
//! this fixed, reservation-based scheme is out of scope.

use std::sync::Arc;
use std::time::Instant;

use advmac::MacAddr6;

use crate::extractors::NamedOption1837Extractor;
use crate::leasedb::LeaseDb;
use crate::pipeline::{Handler, HandlerResult, TransactionBundle};
use crate::reservationdb::ReservationDb;
use crate::wire::option::{
    code, IaAddrOption, IaNaOption, IaPdOption, IaPrefixOption,
};
use crate::wire::{DhcpOption, Message, MessageType, RelayMessage};
use crate::{Duid, LeaseV6, Option1837, Reservation};

const PREFERRED_LIFETIME: u32 = 3600;
const VALID_LIFETIME: u32 = 7200;

pub struct IaAllocationHandler {
    reservations: Arc<ReservationDb>,
    leases: Arc<LeaseDb>,
    option1837_extractors: Vec<NamedOption1837Extractor>,
}

impl IaAllocationHandler {
    pub fn new(
        reservations: Arc<ReservationDb>,
        leases: Arc<LeaseDb>,
        option1837_extractors: Vec<NamedOption1837Extractor>,
    ) -> Self {
        IaAllocationHandler {
            reservations,
            leases,
            option1837_extractors,
        }
    }

    /// DUID, then Option 18/37, then MAC (SPEC_FULL.md §4.8). Unlike the
    /// identification priority this pipeline's DHCPv4 sibling once used,
    /// there is no DHCPv4-lease Option 82 fallback here: Option 82 has no
    /// v6 equivalent beyond Option 18/37, which is already tried.
    fn find_reservation(&self, bundle: &TransactionBundle) -> Option<Arc<Reservation>> {
        if let Some(duid) = duid_from_request(&bundle.request) {
            if let Some(r) = self.reservations.by_duid(&duid) {
                return Some(r);
            }
        }

        if let Some(raw) = option1837_from_relays(&bundle.incoming_relay_messages) {
            for (_, extractor) in &self.option1837_extractors {
                if let Some(extracted) = extractor(&raw) {
                    if let Some(r) = self.reservations.by_option1837(&extracted) {
                        return Some(r);
                    }
                }
            }
        }

        if let Some(mac) = mac_from_request(&bundle.request) {
            if let Some(r) = self.reservations.by_mac(&mac) {
                return Some(r);
            }
        }

        None
    }
}

impl Handler for IaAllocationHandler {
    fn handle(&self, bundle: &mut TransactionBundle) -> HandlerResult {
        let reservation = self.find_reservation(bundle);

        if bundle.request.msg_type == MessageType::Confirm {
            confirm_reservation(bundle, reservation.as_deref());
            return Ok(());
        }

        let wants_na = collect_ia_na_requests(&bundle.request);
        let wants_pd = collect_ia_pd_requests(&bundle.request);
        if wants_na.is_empty() && wants_pd.is_empty() {
            return Ok(());
        }

        let Some(response) = bundle.response_message_mut() else {
            return Ok(());
        };

        for (iaid, t1, t2) in &wants_na {
            let mut ia = IaNaOption {
                iaid: *iaid,
                t1: *t1,
                t2: *t2,
                options: Vec::new(),
            };
            if let Some(r) = &reservation {
                ia.options.push(DhcpOption::IaAddr(IaAddrOption {
                    addr: r.ipv6_na,
                    preferred_lifetime: PREFERRED_LIFETIME,
                    valid_lifetime: VALID_LIFETIME,
                    options: Vec::new(),
                }));
            }
            response.options.push(DhcpOption::IaNa(ia));
        }

        for (iaid, t1, t2) in &wants_pd {
            let mut ia = IaPdOption {
                iaid: *iaid,
                t1: *t1,
                t2: *t2,
                options: Vec::new(),
            };
            if let Some(r) = &reservation {
                ia.options.push(DhcpOption::IaPrefix(IaPrefixOption {
                    preferred_lifetime: PREFERRED_LIFETIME,
                    valid_lifetime: VALID_LIFETIME,
                    prefix_len: r.ipv6_pd.prefix_len(),
                    prefix: r.ipv6_pd.addr(),
                    options: Vec::new(),
                }));
            }
            response.options.push(DhcpOption::IaPd(ia));
        }

        if let Some(r) = reservation {
            if let Some(duid) = duid_from_request(&bundle.request) {
                let now = Instant::now();
                self.leases.leased(
                    &r,
                    LeaseV6 {
                        first_leased: now,
                        last_leased: now,
                        duid,
                        mac: mac_from_request(&bundle.request),
                    },
                );
            }
        }

        Ok(())
    }
}

fn confirm_reservation(bundle: &mut TransactionBundle, reservation: Option<&Reservation>) {
    let Some(reservation) = reservation else {
        return;
    };
    let confirms = bundle.request.options.iter().any(|o| match o {
        DhcpOption::IaNa(ia) => ia.options.iter().any(|sub| {
            matches!(sub, DhcpOption::IaAddr(a) if a.addr == reservation.ipv6_na)
        }),
        _ => false,
    });
    if confirms {
        bundle.mark("confirmed");
    }
}

fn duid_from_request(request: &Message) -> Option<Duid> {
    match request.get_option(code::CLIENTID) {
        Some(DhcpOption::ClientId(bytes)) => Some(Duid::from(bytes.clone())),
        _ => None,
    }
}

fn mac_from_request(request: &Message) -> Option<MacAddr6> {
    match request.get_option(code::CLIENT_LINKLAYER_ADDR) {
        Some(DhcpOption::ClientLinkLayerAddress(c)) if c.address.len() == 6 => {
            let mut bytes = [0u8; 6];
            bytes.copy_from_slice(&c.address);
            Some(MacAddr6::new(bytes))
        }
        _ => None,
    }
}

/// Option 18 (Interface-ID) and Option 37 (Remote-ID) as carried by the
/// relay chain, before any configured extractor narrows them down.
fn option1837_from_relays(relays: &[RelayMessage]) -> Option<Option1837> {
    let mut interface = None;
    let mut remote = None;
    let mut enterprise_number = None;
    for relay in relays {
        if interface.is_none() {
            if let Some(bytes) = relay.interface_id() {
                interface = Some(String::from_utf8_lossy(bytes).to_string().into());
            }
        }
        if remote.is_none() {
            if let Some(DhcpOption::RemoteId(r)) = relay
                .options
                .iter()
                .find(|o| matches!(o, DhcpOption::RemoteId(_)))
            {
                remote = Some(String::from_utf8_lossy(&r.remote_id).to_string().into());
                enterprise_number = Some(r.enterprise_number);
            }
        }
    }
    if interface.is_none() && remote.is_none() {
        return None;
    }
    Some(Option1837 {
        interface,
        remote,
        enterprise_number,
    })
}

fn collect_ia_na_requests(request: &Message) -> Vec<(u32, u32, u32)> {
    request
        .get_options(code::IA_NA)
        .filter_map(|o| match o {
            DhcpOption::IaNa(ia) => Some((ia.iaid, ia.t1, ia.t2)),
            _ => None,
        })
        .collect()
}

fn collect_ia_pd_requests(request: &Message) -> Vec<(u32, u32, u32)> {
    request
        .get_options(code::IA_PD)
        .filter_map(|o| match o {
            DhcpOption::IaPd(ia) => Some((ia.iaid, ia.t1, ia.t2)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::MessageType;
    use std::collections::HashSet;

    fn reservation() -> Reservation {
        Reservation {
            ipv6_na: "2001:db8::1".parse().unwrap(),
            ipv6_pd: "2001:db8:1::/56".parse().unwrap(),
            mac: None,
            duid: Some(Duid::from(vec![1, 2, 3])),
            option1837: None,
        }
    }

    fn handler() -> (IaAllocationHandler, Arc<ReservationDb>) {
        let reservations = Arc::new(ReservationDb::new());
        reservations.insert(reservation());
        let leases = Arc::new(LeaseDb::new());
        (
            IaAllocationHandler::new(reservations.clone(), leases, Vec::new()),
            reservations,
        )
    }

    #[test]
    fn assigns_the_reserved_address_for_a_known_duid() {
        let (handler, _) = handler();
        let mut request = Message::new(MessageType::Solicit, [0, 0, 1]);
        request
            .options
            .push(DhcpOption::ClientId(vec![1, 2, 3]));
        request.options.push(DhcpOption::IaNa(IaNaOption {
            iaid: 7,
            t1: 0,
            t2: 0,
            options: Vec::new(),
        }));

        let mut bundle = TransactionBundle::new(
            request,
            Vec::new(),
            HashSet::new(),
            true,
            false,
            false,
        );
        bundle.response = Some(crate::pipeline::ResponseMessage::Advertise(Message::new(
            MessageType::Advertise,
            [0, 0, 1],
        )));

        handler.handle(&mut bundle).unwrap();

        let response = bundle.response_message().unwrap();
        let ia = response.get_option(code::IA_NA).unwrap();
        match ia {
            DhcpOption::IaNa(ia) => {
                assert_eq!(ia.iaid, 7);
                let addr = ia.options.iter().find_map(|o| match o {
                    DhcpOption::IaAddr(a) => Some(a.addr),
                    _ => None,
                });
                assert_eq!(addr, Some("2001:db8::1".parse().unwrap()));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn unknown_client_gets_an_empty_ia_na_for_default_deny_to_fill() {
        let (handler, _) = handler();
        let mut request = Message::new(MessageType::Solicit, [0, 0, 1]);
        request.options.push(DhcpOption::ClientId(vec![9, 9, 9]));
        request.options.push(DhcpOption::IaNa(IaNaOption {
            iaid: 1,
            t1: 0,
            t2: 0,
            options: Vec::new(),
        }));
        let mut bundle = TransactionBundle::new(
            request,
            Vec::new(),
            HashSet::new(),
            true,
            false,
            false,
        );
        bundle.response = Some(crate::pipeline::ResponseMessage::Advertise(Message::new(
            MessageType::Advertise,
            [0, 0, 1],
        )));

        handler.handle(&mut bundle).unwrap();

        let response = bundle.response_message().unwrap();
        match response.get_option(code::IA_NA).unwrap() {
            DhcpOption::IaNa(ia) => assert!(ia.options.is_empty()),
            _ => panic!(),
        }
    }

    #[test]
    fn confirm_marks_confirmed_when_address_matches_the_reservation() {
        let (handler, _) = handler();
        let mut confirm = Message::new(MessageType::Confirm, [0, 0, 1]);
        confirm.options.push(DhcpOption::ClientId(vec![1, 2, 3]));
        confirm.options.push(DhcpOption::IaNa(IaNaOption {
            iaid: 1,
            t1: 0,
            t2: 0,
            options: vec![DhcpOption::IaAddr(IaAddrOption {
                addr: "2001:db8::1".parse().unwrap(),
                preferred_lifetime: 0,
                valid_lifetime: 0,
                options: Vec::new(),
            })],
        }));
        let mut bundle = TransactionBundle::new(
            confirm,
            Vec::new(),
            HashSet::new(),
            true,
            false,
            false,
        );
        bundle.response = Some(crate::pipeline::ResponseMessage::Reply(Message::new(
            MessageType::Reply,
            [0, 0, 1],
        )));

        handler.handle(&mut bundle).unwrap();
        assert!(bundle.has_mark("confirmed"));
    }
}
