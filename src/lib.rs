use std::net::Ipv6Addr;
use std::time::Instant;

use advmac::MacAddr6;
use compact_str::CompactString;
use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod duid;
pub mod extractors;
pub mod handlers;
pub mod leasedb;
pub mod logging;
pub mod pipeline;
pub mod reservationdb;
pub mod server;
pub mod wire;

pub use duid::{Duid, DuidParseError};

/// A configured binding between a client identity and the addresses/prefixes
/// it should receive. The example allocation handler (§4.8 of SPEC_FULL.md)
/// is the only consumer; address/prefix allocation *policy* is out of scope.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Reservation {
    /// Address handed out in an IA_NA.
    pub ipv6_na: Ipv6Addr,
    /// Prefix handed out in an IA_PD.
    pub ipv6_pd: Ipv6Net,
    /// Overrides relay-supplied identification when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddr6>,
    /// Overrides relay-supplied identification and `mac` when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duid: Option<Duid>,
    /// DHCPv6 relay-supplied options 18 (Interface-ID) and 37 (Remote-ID),
    /// the v6 equivalent of DHCPv4's Option 82, used when neither `duid` nor
    /// `mac` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option1837: Option<Option1837>,
}

#[derive(Debug, Clone)]
pub struct LeaseV6 {
    pub first_leased: Instant,
    pub last_leased: Instant,
    pub duid: Duid,
    pub mac: Option<MacAddr6>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct Option1837 {
    /// Option 18 Interface-ID field.
    pub interface: Option<CompactString>,
    /// Option 37 remote-id field.
    pub remote: Option<CompactString>,
    /// Option 37 enterprise-number field.
    pub enterprise_number: Option<u32>,
}
