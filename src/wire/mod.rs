//! Wire-format codec for DHCPv6 messages and options.
//!
//! This module stands in for the external codec collaborator the pipeline
//! assumes exists and is correct; it is authored in the `Decoder`/`Encoder`
//! idiom used elsewhere in this codebase rather than layered on an unvendored
//! external crate, so its option surface is exactly what the pipeline above
//! it needs.

pub mod decoder;
pub mod domain;
pub mod encoder;
pub mod error;
pub mod message;
pub mod option;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use message::{DhcpMessage, Message, MessageType, RelayMessage};
pub use option::{
    code, status, ClientLinkLayerAddressOption, DhcpOption, IaAddrOption, IaNaOption, IaPdOption,
    IaPrefixOption, IaTaOption, RemoteIdOption, StatusCodeOption,
};
