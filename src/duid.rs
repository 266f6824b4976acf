use std::fmt;

use serde::de::Visitor;
use serde::{Deserialize, Serialize};

/// Maximum DUID length per RFC 8415 §11.1.
pub const MAX_DUID_LEN: usize = 130;

/// A DHCP Unique Identifier, carried opaque on the wire inside ClientId and
/// ServerId options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Duid {
    pub bytes: Vec<u8>,
}

impl Duid {
    /// Construct a DUID, rejecting anything over `MAX_DUID_LEN`.
    pub fn new(bytes: Vec<u8>) -> Option<Self> {
        if bytes.len() > MAX_DUID_LEN {
            return None;
        }
        Some(Duid { bytes })
    }
}

impl fmt::Display for Duid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl Serialize for Duid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DuidVisitor;
        impl<'de> Visitor<'de> for DuidVisitor {
            type Value = Duid;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str(r#"colon or dash separated hex "00:11:22" or "00-11-22""#)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Duid::try_from(v).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(DuidVisitor)
    }
}

impl From<Vec<u8>> for Duid {
    fn from(value: Vec<u8>) -> Self {
        Duid { bytes: value }
    }
}

impl From<&[u8]> for Duid {
    fn from(value: &[u8]) -> Self {
        Duid {
            bytes: value.to_vec(),
        }
    }
}

#[derive(Debug)]
pub struct DuidParseError {
    pub message: &'static str,
}

impl std::error::Error for DuidParseError {}

impl fmt::Display for DuidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl Default for DuidParseError {
    fn default() -> Self {
        Self {
            message: "Invalid DUID format",
        }
    }
}

impl TryFrom<&str> for Duid {
    type Error = DuidParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let bytes = match value.trim().as_bytes().get(2) {
            Some(&b':') => value
                .trim()
                .split(':')
                .map(|hex| u8::from_str_radix(hex, 16))
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|_| DuidParseError::default())?,
            Some(&b'-') => value
                .trim()
                .split('-')
                .map(|hex| u8::from_str_radix(hex, 16))
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|_| DuidParseError::default())?,
            _ => return Err(DuidParseError::default()),
        };
        if bytes.len() > MAX_DUID_LEN {
            return Err(DuidParseError {
                message: "DUID exceeds maximum length of 130 bytes",
            });
        }
        Ok(Duid { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duid() {
        let duid_str_colon = "29:30:31:32:33:34:35:36:37:38:39:40:41:42:43:44";
        let duid_str_dash = "29-30-31-32-33-34-35-36-37-38-39-40-41-42-43-44";
        let duid = Duid::from(vec![
            0x29, 0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x40, 0x41, 0x42,
            0x43, 0x44,
        ]);

        let duid_parsed_colon = Duid::try_from(duid_str_colon).unwrap();
        assert_eq!(duid_parsed_colon, duid);
        let duid_parsed_dash = Duid::try_from(duid_str_dash).unwrap();
        assert_eq!(duid_parsed_dash, duid);
        assert_eq!(duid_parsed_colon.to_string(), duid_str_colon);

        #[derive(Deserialize)]
        struct DuidJson {
            duid: Duid,
        }
        let json = r#"{"duid": "29:30:31:32:33:34:35:36:37:38:39:40:41:42:43:44"}"#;
        let parsed_json: DuidJson = serde_json::from_str(json).unwrap();

        assert_eq!(parsed_json.duid, duid);
    }

    #[test]
    fn rejects_oversized_duid() {
        let too_long = vec![0u8; MAX_DUID_LEN + 1];
        assert!(Duid::new(too_long).is_none());
    }
}
