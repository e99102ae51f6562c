//! Opaque BSON-derived values appearing in heartbeat replies.
//!
//! Encoding and decoding BSON is an external collaborator's concern. This
//! crate only stores and compares these values, e.g. election-id ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// An uninterpreted document, e.g. `opTime` or `topologyVersion`.
pub type Document = serde_json::Value;

/// A 12-byte object identifier, parsed from its 24-character hex form.
///
/// Ordering is byte-wise, which is what backs the election-id tiebreak when
/// competing primary claims are compared.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

#[derive(Debug, thiserror::Error)]
#[error("Object id must be 24 hex characters: {0}")]
pub struct ParseObjectIdError(String);

impl ObjectId {
    pub fn parse_str(hex: &str) -> Result<Self, ParseObjectIdError> {
        if hex.len() != 24 {
            return Err(ParseObjectIdError(hex.to_string()));
        }
        let mut bytes = [0u8; 12];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let hi = hex_digit(chunk[0]).ok_or_else(|| ParseObjectIdError(hex.to_string()))?;
            let lo = hex_digit(chunk[1]).ok_or_else(|| ParseObjectIdError(hex.to_string()))?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        ObjectId::parse_str(&hex).map_err(serde::de::Error::custom)
    }
}
