//! DHCPv6 option type codes and the `DhcpOption` value type (RFC 8415 §21 and
//! the RFC 3646 DNS option extensions this pipeline ships with).

use std::net::Ipv6Addr;

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::error::{DecodeError, DecodeResult};

pub mod code {
    pub const CLIENTID: u16 = 1;
    pub const SERVERID: u16 = 2;
    pub const IA_NA: u16 = 3;
    pub const IA_TA: u16 = 4;
    pub const IAADDR: u16 = 5;
    pub const ORO: u16 = 6;
    pub const PREFERENCE: u16 = 7;
    pub const ELAPSED_TIME: u16 = 8;
    pub const RELAY_MSG: u16 = 9;
    pub const SERVER_UNICAST: u16 = 12;
    pub const STATUS_CODE: u16 = 13;
    pub const RAPID_COMMIT: u16 = 14;
    pub const INTERFACE_ID: u16 = 18;
    pub const RECONF_MSG: u16 = 19;
    pub const DNS_SERVERS: u16 = 23;
    pub const DOMAIN_LIST: u16 = 24;
    pub const IA_PD: u16 = 25;
    pub const IAPREFIX: u16 = 26;
    pub const REMOTE_ID: u16 = 37;
    pub const CLIENT_LINKLAYER_ADDR: u16 = 79;
}

/// Status codes used by the core pipeline (RFC 8415 §21.13).
pub mod status {
    pub const SUCCESS: u16 = 0;
    pub const UNSPEC_FAIL: u16 = 1;
    pub const NOADDRSAVAIL: u16 = 2;
    pub const NOBINDING: u16 = 3;
    pub const NOTONLINK: u16 = 4;
    pub const USEMULTICAST: u16 = 5;
    pub const NOPREFIXAVAIL: u16 = 6;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCodeOption {
    pub code: u16,
    pub message: String,
}

impl StatusCodeOption {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        StatusCodeOption {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaNaOption {
    pub iaid: u32,
    pub t1: u32,
    pub t2: u32,
    pub options: Vec<DhcpOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaTaOption {
    pub iaid: u32,
    pub options: Vec<DhcpOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaPdOption {
    pub iaid: u32,
    pub t1: u32,
    pub t2: u32,
    pub options: Vec<DhcpOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaAddrOption {
    pub addr: Ipv6Addr,
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
    pub options: Vec<DhcpOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IaPrefixOption {
    pub preferred_lifetime: u32,
    pub valid_lifetime: u32,
    pub prefix_len: u8,
    pub prefix: Ipv6Addr,
    pub options: Vec<DhcpOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIdOption {
    pub enterprise_number: u32,
    pub remote_id: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLinkLayerAddressOption {
    pub link_layer_type: u16,
    pub address: Vec<u8>,
}

/// A single DHCPv6 option. `Unknown` is the escape hatch for option types this
/// pipeline neither inspects nor synthesizes, so they still round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpOption {
    ClientId(Vec<u8>),
    ServerId(Vec<u8>),
    IaNa(IaNaOption),
    IaTa(IaTaOption),
    IaPd(IaPdOption),
    IaAddr(IaAddrOption),
    IaPrefix(IaPrefixOption),
    OptionRequest(Vec<u16>),
    Preference(u8),
    ElapsedTime(u16),
    RelayMessage(Vec<u8>),
    InterfaceId(Vec<u8>),
    ReconfigureMessage(u8),
    RecursiveNameServers(Vec<Ipv6Addr>),
    DomainSearchList(Vec<String>),
    /// RFC 8415 §21.6: the address a client may address future unicast
    /// requests to, once the server has granted it permission (SPEC_FULL.md
    /// §4.1 step 6, §8 scenario 3).
    ServerUnicast(Ipv6Addr),
    StatusCode(StatusCodeOption),
    RapidCommit,
    RemoteId(RemoteIdOption),
    ClientLinkLayerAddress(ClientLinkLayerAddressOption),
    Unknown { code: u16, data: Vec<u8> },
}

impl DhcpOption {
    pub fn code(&self) -> u16 {
        use code::*;
        match self {
            DhcpOption::ClientId(_) => CLIENTID,
            DhcpOption::ServerId(_) => SERVERID,
            DhcpOption::IaNa(_) => IA_NA,
            DhcpOption::IaTa(_) => IA_TA,
            DhcpOption::IaPd(_) => IA_PD,
            DhcpOption::IaAddr(_) => IAADDR,
            DhcpOption::IaPrefix(_) => IAPREFIX,
            DhcpOption::OptionRequest(_) => ORO,
            DhcpOption::Preference(_) => PREFERENCE,
            DhcpOption::ElapsedTime(_) => ELAPSED_TIME,
            DhcpOption::RelayMessage(_) => RELAY_MSG,
            DhcpOption::InterfaceId(_) => INTERFACE_ID,
            DhcpOption::ReconfigureMessage(_) => RECONF_MSG,
            DhcpOption::RecursiveNameServers(_) => DNS_SERVERS,
            DhcpOption::DomainSearchList(_) => DOMAIN_LIST,
            DhcpOption::ServerUnicast(_) => SERVER_UNICAST,
            DhcpOption::StatusCode(_) => STATUS_CODE,
            DhcpOption::RapidCommit => RAPID_COMMIT,
            DhcpOption::RemoteId(_) => REMOTE_ID,
            DhcpOption::ClientLinkLayerAddress(_) => CLIENT_LINKLAYER_ADDR,
            DhcpOption::Unknown { code, .. } => *code,
        }
    }

    pub fn encode(&self, enc: &mut Encoder) {
        enc.write_u16(self.code());
        enc.write_length_prefixed(|enc| self.encode_payload(enc));
    }

    fn encode_payload(&self, enc: &mut Encoder) {
        match self {
            DhcpOption::ClientId(duid) | DhcpOption::ServerId(duid) => enc.write_slice(duid),
            DhcpOption::IaNa(ia) => {
                enc.write_u32(ia.iaid);
                enc.write_u32(ia.t1);
                enc.write_u32(ia.t2);
                encode_options(&ia.options, enc);
            }
            DhcpOption::IaTa(ia) => {
                enc.write_u32(ia.iaid);
                encode_options(&ia.options, enc);
            }
            DhcpOption::IaPd(ia) => {
                enc.write_u32(ia.iaid);
                enc.write_u32(ia.t1);
                enc.write_u32(ia.t2);
                encode_options(&ia.options, enc);
            }
            DhcpOption::IaAddr(a) => {
                enc.write_ipv6(a.addr);
                enc.write_u32(a.preferred_lifetime);
                enc.write_u32(a.valid_lifetime);
                encode_options(&a.options, enc);
            }
            DhcpOption::IaPrefix(p) => {
                enc.write_u32(p.preferred_lifetime);
                enc.write_u32(p.valid_lifetime);
                enc.write_u8(p.prefix_len);
                enc.write_ipv6(p.prefix);
                encode_options(&p.options, enc);
            }
            DhcpOption::OptionRequest(codes) => {
                for c in codes {
                    enc.write_u16(*c);
                }
            }
            DhcpOption::Preference(p) => enc.write_u8(*p),
            DhcpOption::ElapsedTime(t) => enc.write_u16(*t),
            DhcpOption::RelayMessage(bytes) => enc.write_slice(bytes),
            DhcpOption::InterfaceId(bytes) => enc.write_slice(bytes),
            DhcpOption::ReconfigureMessage(t) => enc.write_u8(*t),
            DhcpOption::RecursiveNameServers(addrs) => {
                for a in addrs {
                    enc.write_ipv6(*a);
                }
            }
            DhcpOption::DomainSearchList(names) => {
                super::domain::encode_domain_list(enc, names).ok();
            }
            DhcpOption::ServerUnicast(addr) => enc.write_ipv6(*addr),
            DhcpOption::StatusCode(s) => {
                enc.write_u16(s.code);
                enc.write_slice(s.message.as_bytes());
            }
            DhcpOption::RapidCommit => {}
            DhcpOption::RemoteId(r) => {
                enc.write_u32(r.enterprise_number);
                enc.write_slice(&r.remote_id);
            }
            DhcpOption::ClientLinkLayerAddress(c) => {
                enc.write_u16(c.link_layer_type);
                enc.write_slice(&c.address);
            }
            DhcpOption::Unknown { data, .. } => enc.write_slice(data),
        }
    }
}

fn decode_one(dec: &mut Decoder) -> DecodeResult<DhcpOption> {
    let code = dec.read_u16()?;
    let len = dec.read_u16()? as usize;
    let mut body = dec.sub_decoder(len)?;

    use code as c;
    let opt = match code {
        c::CLIENTID => DhcpOption::ClientId(body.rest().to_vec()),
        c::SERVERID => DhcpOption::ServerId(body.rest().to_vec()),
        c::IA_NA => {
            if len < 12 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let iaid = body.read_u32()?;
            let t1 = body.read_u32()?;
            let t2 = body.read_u32()?;
            let options = decode_options(&mut body)?;
            DhcpOption::IaNa(IaNaOption {
                iaid,
                t1,
                t2,
                options,
            })
        }
        c::IA_TA => {
            if len < 4 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let iaid = body.read_u32()?;
            let options = decode_options(&mut body)?;
            DhcpOption::IaTa(IaTaOption { iaid, options })
        }
        c::IA_PD => {
            if len < 12 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let iaid = body.read_u32()?;
            let t1 = body.read_u32()?;
            let t2 = body.read_u32()?;
            let options = decode_options(&mut body)?;
            DhcpOption::IaPd(IaPdOption {
                iaid,
                t1,
                t2,
                options,
            })
        }
        c::IAADDR => {
            if len < 24 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let addr = body.read_ipv6()?;
            let preferred_lifetime = body.read_u32()?;
            let valid_lifetime = body.read_u32()?;
            let options = decode_options(&mut body)?;
            DhcpOption::IaAddr(IaAddrOption {
                addr,
                preferred_lifetime,
                valid_lifetime,
                options,
            })
        }
        c::IAPREFIX => {
            if len < 25 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let preferred_lifetime = body.read_u32()?;
            let valid_lifetime = body.read_u32()?;
            let prefix_len = body.read_u8()?;
            let prefix = body.read_ipv6()?;
            let options = decode_options(&mut body)?;
            DhcpOption::IaPrefix(IaPrefixOption {
                preferred_lifetime,
                valid_lifetime,
                prefix_len,
                prefix,
                options,
            })
        }
        c::ORO => {
            if len % 2 != 0 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let mut codes = Vec::with_capacity(len / 2);
            while body.has_remaining() {
                codes.push(body.read_u16()?);
            }
            DhcpOption::OptionRequest(codes)
        }
        c::PREFERENCE => {
            if len != 1 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            DhcpOption::Preference(body.read_u8()?)
        }
        c::ELAPSED_TIME => {
            if len != 2 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            DhcpOption::ElapsedTime(body.read_u16()?)
        }
        c::RELAY_MSG => DhcpOption::RelayMessage(body.rest().to_vec()),
        c::INTERFACE_ID => DhcpOption::InterfaceId(body.rest().to_vec()),
        c::RECONF_MSG => {
            if len != 1 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            DhcpOption::ReconfigureMessage(body.read_u8()?)
        }
        c::DNS_SERVERS => {
            if len % 16 != 0 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let mut addrs = Vec::with_capacity(len / 16);
            while body.has_remaining() {
                addrs.push(body.read_ipv6()?);
            }
            DhcpOption::RecursiveNameServers(addrs)
        }
        c::DOMAIN_LIST => {
            let names = super::domain::decode_domain_list(&mut body)?;
            DhcpOption::DomainSearchList(names)
        }
        c::SERVER_UNICAST => {
            if len != 16 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            DhcpOption::ServerUnicast(body.read_ipv6()?)
        }
        c::STATUS_CODE => {
            if len < 2 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let status = body.read_u16()?;
            let message = String::from_utf8_lossy(body.rest()).to_string();
            DhcpOption::StatusCode(StatusCodeOption {
                code: status,
                message,
            })
        }
        c::RAPID_COMMIT => {
            if len != 0 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            DhcpOption::RapidCommit
        }
        c::REMOTE_ID => {
            if len < 4 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let enterprise_number = body.read_u32()?;
            let remote_id = body.rest().to_vec();
            DhcpOption::RemoteId(RemoteIdOption {
                enterprise_number,
                remote_id,
            })
        }
        c::CLIENT_LINKLAYER_ADDR => {
            if len < 2 {
                return Err(DecodeError::InvalidLength { code, len });
            }
            let link_layer_type = body.read_u16()?;
            let address = body.rest().to_vec();
            DhcpOption::ClientLinkLayerAddress(ClientLinkLayerAddressOption {
                link_layer_type,
                address,
            })
        }
        other => DhcpOption::Unknown {
            code: other,
            data: body.rest().to_vec(),
        },
    };
    Ok(opt)
}

/// Decode every option in `dec` until the buffer is exhausted. Used both for
/// a message's top-level option list and for an IA container's sub-options.
pub fn decode_options(dec: &mut Decoder) -> DecodeResult<Vec<DhcpOption>> {
    let mut out = Vec::new();
    while dec.has_remaining() {
        out.push(decode_one(dec)?);
    }
    Ok(out)
}

pub fn encode_options(options: &[DhcpOption], enc: &mut Encoder) {
    for opt in options {
        opt.encode(enc);
    }
}

/// Find the first option of a given shape. Handlers use this via
/// `TransactionBundle`/`Message` helpers rather than matching directly.
pub fn find_status_code(options: &[DhcpOption]) -> Option<&StatusCodeOption> {
    options.iter().find_map(|o| match o {
        DhcpOption::StatusCode(s) => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_client_id() {
        let opt = DhcpOption::ClientId(vec![0x00, 0x01, 0x02, 0x03]);
        let mut enc = Encoder::new();
        opt.encode(&mut enc);
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        let decoded = decode_options(&mut dec).unwrap();
        assert_eq!(decoded, vec![opt]);
    }

    #[test]
    fn round_trips_nested_ia_na_with_status() {
        let opt = DhcpOption::IaNa(IaNaOption {
            iaid: 42,
            t1: 3600,
            t2: 5400,
            options: vec![DhcpOption::StatusCode(StatusCodeOption::new(
                status::NOADDRSAVAIL,
                "no addresses available",
            ))],
        });
        let mut enc = Encoder::new();
        opt.encode(&mut enc);
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        let decoded = decode_options(&mut dec).unwrap();
        assert_eq!(decoded, vec![opt]);
    }

    #[test]
    fn rejects_length_outside_window() {
        // PREFERENCE declares exactly 1 byte of payload.
        let mut enc = Encoder::new();
        enc.write_u16(code::PREFERENCE);
        enc.write_u16(2);
        enc.write_slice(&[0x00, 0x01]);
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(
            decode_options(&mut dec),
            Err(DecodeError::InvalidLength {
                code: code::PREFERENCE,
                len: 2
            })
        );
    }

    #[test]
    fn server_unicast_round_trips() {
        let opt = DhcpOption::ServerUnicast("2001:db8::1".parse().unwrap());
        let mut enc = Encoder::new();
        opt.encode(&mut enc);
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        let decoded = decode_options(&mut dec).unwrap();
        assert_eq!(decoded, vec![opt]);
    }

    #[test]
    fn server_unicast_rejects_wrong_length() {
        let mut enc = Encoder::new();
        enc.write_u16(code::SERVER_UNICAST);
        enc.write_u16(4);
        enc.write_slice(&[0, 0, 0, 0]);
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(
            decode_options(&mut dec),
            Err(DecodeError::InvalidLength {
                code: code::SERVER_UNICAST,
                len: 4
            })
        );
    }

    #[test]
    fn unknown_option_round_trips_as_opaque_bytes() {
        let mut enc = Encoder::new();
        enc.write_u16(9999);
        enc.write_u16(3);
        enc.write_slice(&[1, 2, 3]);
        let bytes = enc.finish();
        let mut dec = Decoder::new(&bytes);
        let decoded = decode_options(&mut dec).unwrap();
        assert_eq!(
            decoded,
            vec![DhcpOption::Unknown {
                code: 9999,
                data: vec![1, 2, 3]
            }]
        );
    }
}
