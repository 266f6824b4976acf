//! Top-level DHCPv6 message framing: client/server messages and relay frames
//! (RFC 8415 §8, §9).

use std::net::Ipv6Addr;

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::error::{DecodeError, DecodeResult};
use super::option::{decode_options, encode_options, DhcpOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Solicit,
    Advertise,
    Request,
    Confirm,
    Renew,
    Rebind,
    Reply,
    Release,
    Decline,
    Reconfigure,
    InformationRequest,
    RelayForw,
    RelayRepl,
}

impl MessageType {
    pub fn from_u8(v: u8) -> DecodeResult<Self> {
        use MessageType::*;
        Ok(match v {
            1 => Solicit,
            2 => Advertise,
            3 => Request,
            4 => Confirm,
            5 => Renew,
            6 => Rebind,
            7 => Reply,
            8 => Release,
            9 => Decline,
            10 => Reconfigure,
            11 => InformationRequest,
            12 => RelayForw,
            13 => RelayRepl,
            other => return Err(DecodeError::UnknownMessageType(other)),
        })
    }

    pub fn to_u8(self) -> u8 {
        use MessageType::*;
        match self {
            Solicit => 1,
            Advertise => 2,
            Request => 3,
            Confirm => 4,
            Renew => 5,
            Rebind => 6,
            Reply => 7,
            Release => 8,
            Decline => 9,
            Reconfigure => 10,
            InformationRequest => 11,
            RelayForw => 12,
            RelayRepl => 13,
        }
    }

    /// `true` for message types a client sends toward a server.
    pub fn is_client_to_server(self) -> bool {
        use MessageType::*;
        matches!(
            self,
            Solicit | Request | Confirm | Renew | Rebind | Release | Decline | InformationRequest
        )
    }

    pub fn is_relay(self) -> bool {
        matches!(self, MessageType::RelayForw | MessageType::RelayRepl)
    }
}

/// A client/server message: transaction id plus options (RFC 8415 §8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: MessageType,
    pub xid: [u8; 3],
    pub options: Vec<DhcpOption>,
}

impl Message {
    pub fn new(msg_type: MessageType, xid: [u8; 3]) -> Self {
        Message {
            msg_type,
            xid,
            options: Vec::new(),
        }
    }

    pub fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let msg_type = MessageType::from_u8(dec.read_u8()?)?;
        let xid_bytes = dec.read_slice(3)?;
        let xid = [xid_bytes[0], xid_bytes[1], xid_bytes[2]];
        let options = decode_options(dec)?;
        Ok(Message {
            msg_type,
            xid,
            options,
        })
    }

    pub fn encode(&self, enc: &mut Encoder) {
        enc.write_u8(self.msg_type.to_u8());
        enc.write_slice(&self.xid);
        encode_options(&self.options, enc);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.encode(&mut enc);
        enc.finish()
    }

    pub fn get_option(&self, code: u16) -> Option<&DhcpOption> {
        self.options.iter().find(|o| o.code() == code)
    }

    pub fn get_options(&self, code: u16) -> impl Iterator<Item = &DhcpOption> {
        self.options.iter().filter(move |o| o.code() == code)
    }
}

/// A relay-forward or relay-reply frame (RFC 8415 §9): hop count, link and
/// peer addresses, and an option list carrying the relayed message as a
/// `RelayMessage` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayMessage {
    pub msg_type: MessageType,
    pub hop_count: u8,
    pub link_addr: Ipv6Addr,
    pub peer_addr: Ipv6Addr,
    pub options: Vec<DhcpOption>,
}

impl RelayMessage {
    pub fn decode(dec: &mut Decoder) -> DecodeResult<Self> {
        let msg_type = MessageType::from_u8(dec.read_u8()?)?;
        let hop_count = dec.read_u8()?;
        let link_addr = dec.read_ipv6()?;
        let peer_addr = dec.read_ipv6()?;
        let options = decode_options(dec)?;
        Ok(RelayMessage {
            msg_type,
            hop_count,
            link_addr,
            peer_addr,
            options,
        })
    }

    pub fn encode(&self, enc: &mut Encoder) {
        enc.write_u8(self.msg_type.to_u8());
        enc.write_u8(self.hop_count);
        enc.write_ipv6(self.link_addr);
        enc.write_ipv6(self.peer_addr);
        encode_options(&self.options, enc);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.encode(&mut enc);
        enc.finish()
    }

    /// The `RelayMessage` option's payload, i.e. the bytes of the next layer in.
    pub fn relayed_payload(&self) -> Option<&[u8]> {
        self.options.iter().find_map(|o| match o {
            DhcpOption::RelayMessage(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn interface_id(&self) -> Option<&[u8]> {
        self.options.iter().find_map(|o| match o {
            DhcpOption::InterfaceId(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
    }
}

/// Either a direct client/server message or a relay frame, as read straight
/// off the wire before the pipeline has unwrapped any relay layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpMessage {
    Direct(Message),
    Relay(RelayMessage),
}

impl DhcpMessage {
    pub fn from_bytes(bytes: &[u8]) -> DecodeResult<Self> {
        if bytes.is_empty() {
            return Err(DecodeError::TooShort);
        }
        let msg_type = MessageType::from_u8(bytes[0])?;
        let mut dec = Decoder::new(bytes);
        if msg_type.is_relay() {
            Ok(DhcpMessage::Relay(RelayMessage::decode(&mut dec)?))
        } else {
            Ok(DhcpMessage::Direct(Message::decode(&mut dec)?))
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            DhcpMessage::Direct(m) => m.to_bytes(),
            DhcpMessage::Relay(r) => r.to_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::option::StatusCodeOption;

    #[test]
    fn round_trips_a_solicit() {
        let mut msg = Message::new(MessageType::Solicit, [0x01, 0x02, 0x03]);
        msg.options.push(DhcpOption::ClientId(vec![1, 2, 3, 4]));
        msg.options.push(DhcpOption::RapidCommit);
        let bytes = msg.to_bytes();
        let decoded = match DhcpMessage::from_bytes(&bytes).unwrap() {
            DhcpMessage::Direct(m) => m,
            DhcpMessage::Relay(_) => panic!("expected direct message"),
        };
        assert_eq!(decoded, msg);
    }

    #[test]
    fn round_trips_a_relay_forward_carrying_a_solicit() {
        let inner = Message::new(MessageType::Solicit, [0xaa, 0xbb, 0xcc]);
        let relay = RelayMessage {
            msg_type: MessageType::RelayForw,
            hop_count: 0,
            link_addr: "2001:db8::1".parse().unwrap(),
            peer_addr: "fe80::1".parse().unwrap(),
            options: vec![DhcpOption::RelayMessage(inner.to_bytes())],
        };
        let bytes = relay.to_bytes();
        let decoded = match DhcpMessage::from_bytes(&bytes).unwrap() {
            DhcpMessage::Relay(r) => r,
            DhcpMessage::Direct(_) => panic!("expected relay message"),
        };
        assert_eq!(decoded.relayed_payload(), Some(inner.to_bytes().as_slice()));
        let inner_decoded = match DhcpMessage::from_bytes(decoded.relayed_payload().unwrap())
            .unwrap()
        {
            DhcpMessage::Direct(m) => m,
            DhcpMessage::Relay(_) => panic!("expected direct inner message"),
        };
        assert_eq!(inner_decoded, inner);
    }

    #[test]
    fn status_code_option_round_trips() {
        let opt = DhcpOption::StatusCode(StatusCodeOption::new(5, "use multicast"));
        let mut msg = Message::new(MessageType::Reply, [0, 0, 1]);
        msg.options.push(opt.clone());
        let bytes = msg.to_bytes();
        let decoded = match DhcpMessage::from_bytes(&bytes).unwrap() {
            DhcpMessage::Direct(m) => m,
            _ => panic!(),
        };
        assert_eq!(decoded.get_option(13), Some(&opt));
    }
}
