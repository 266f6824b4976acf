//! RFC 1035 domain name label encoding, as used by RFC 3646 DNS options.

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};

const MAX_LABEL_LEN: usize = 63;
const MAX_ENCODED_LEN: usize = 255;

/// Encode a domain name as a sequence of length-prefixed labels terminated by
/// a zero-length label, per RFC 1035 section 3.1.
pub fn encode_domain(name: &str) -> EncodeResult<Vec<u8>> {
    let mut enc = Encoder::new();
    write_domain(&mut enc, name)?;
    Ok(enc.finish())
}

pub fn write_domain(enc: &mut Encoder, name: &str) -> EncodeResult<()> {
    let mut total = 0usize;
    for label in name.split('.').filter(|l| !l.is_empty()) {
        if label.len() > MAX_LABEL_LEN {
            return Err(EncodeError::LabelTooLong);
        }
        total += 1 + label.len();
        if total > MAX_ENCODED_LEN - 1 {
            return Err(EncodeError::DomainTooLong);
        }
        enc.write_u8(label.len() as u8);
        enc.write_slice(label.as_bytes());
    }
    enc.write_u8(0);
    Ok(())
}

/// Decode a single domain name, advancing the decoder past its terminating
/// zero-length label.
pub fn decode_domain(dec: &mut Decoder) -> DecodeResult<String> {
    let mut labels: Vec<String> = Vec::new();
    let mut encoded_len = 0usize;

    loop {
        if !dec.has_remaining() {
            return Err(DecodeError::MissingTerminator);
        }
        let len = dec.read_u8()? as usize;
        encoded_len += 1;
        if len == 0 {
            break;
        }
        if len > MAX_LABEL_LEN {
            return Err(DecodeError::InvalidDomainLabel);
        }
        encoded_len += len;
        if encoded_len > MAX_ENCODED_LEN {
            return Err(DecodeError::DomainTooLong);
        }
        let bytes = dec.read_slice(len)?;
        let label = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidDomainLabel)?;
        labels.push(label.to_string());
    }

    if labels.is_empty() && encoded_len == 1 {
        // A lone root label decodes to the empty string; still a valid domain.
    }

    Ok(labels.join("."))
}

/// Decode consecutive domain names until the decoder is exhausted, as used by
/// DomainSearchListOption.
pub fn decode_domain_list(dec: &mut Decoder) -> DecodeResult<Vec<String>> {
    let mut out = Vec::new();
    while dec.has_remaining() {
        out.push(decode_domain(dec)?);
    }
    Ok(out)
}

pub fn encode_domain_list(enc: &mut Encoder, names: &[String]) -> EncodeResult<()> {
    for name in names {
        write_domain(enc, name)?;
    }
    Ok(())
}
