//! Byte codecs used on the wire.
//!
//! Binary fields cross the transport as standard base64. Human-facing
//! secrets use Crockford base32 so they survive being read aloud or typed
//! in by hand.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{CryptoError, Result};

/// Crockford base32 alphabet (no I, L, O, U).
const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Encode bytes as padded standard base64.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode padded standard base64.
pub fn from_base64(s: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| CryptoError::Encoding(format!("invalid base64: {}", e)))
}

/// Encode bytes as unpadded Crockford base32.
pub fn to_base32(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8 + 4) / 5);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(CROCKFORD[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        out.push(CROCKFORD[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}

/// Decode Crockford base32.
///
/// Case-insensitive; `O` reads as `0`, `I` and `L` read as `1`, and
/// hyphens are ignored. Trailing bits that do not fill a byte are dropped.
pub fn from_base32(s: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for c in s.chars() {
        if c == '-' {
            continue;
        }
        let value = crockford_value(c)
            .ok_or_else(|| CryptoError::Encoding(format!("invalid base32 character {:?}", c)))?;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(out)
}

fn crockford_value(c: char) -> Option<u32> {
    let c = c.to_ascii_uppercase();
    match c {
        'O' => Some(0),
        'I' | 'L' => Some(1),
        _ => CROCKFORD
            .iter()
            .position(|&a| a as char == c)
            .map(|p| p as u32),
    }
}

/// Interpret decrypted or received bytes as UTF-8.
pub fn utf8_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| CryptoError::Encoding(format!("invalid UTF-8: {}", e)))
}

/// Serde adapter: `Vec<u8>` as a base64 string.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter: fixed-size byte arrays as a base64 string.
pub mod base64_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = super::from_base64(&s).map_err(serde::de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {} bytes, got {}", N, len)))
    }
}
