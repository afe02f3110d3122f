//! Wire encoding
//!
//! Field elements cross two boundaries, both as strings:
//!
//! - **Chain submission**: each element is a `0x`-prefixed, 32-byte
//!   big-endian, lowercase hex word, the format the external contract's
//!   transaction arguments expect.
//! - **Vault snapshots**: the same words inside a self-describing JSON
//!   blob, so any persistence backend round-trips records byte-for-byte.
//!
//! Decoding accepts shorter-than-32-byte hex and reduces anything wider
//! than the modulus mod p (the canonical domain convention); it rejects
//! missing prefixes, non-hex digits, and over-long strings.

#![forbid(unsafe_code)]

use ark_ff::{BigInteger, PrimeField};
use thiserror::Error;

use crate::F;

/// Errors decoding a single hex word.
#[derive(Debug, Error)]
pub enum HexError {
    /// The word does not start with `0x`.
    #[error("missing 0x prefix")]
    MissingPrefix,
    /// The word encodes more than 32 bytes.
    #[error("hex word too long: {0} digits (max 64)")]
    TooLong(usize),
    /// A digit is not valid hexadecimal.
    #[error("invalid hex: {0}")]
    Digit(#[from] hex::FromHexError),
}

/// Errors decoding proof-artifact calldata.
#[derive(Debug, Error)]
pub enum CalldataError {
    /// Wrong number of words (an artifact is exactly 8).
    #[error("expected 8 calldata words, got {0}")]
    Shape(usize),
    /// A word failed to decode.
    #[error(transparent)]
    Word(#[from] HexError),
}

/// Encode a field element as `0x` + 64 lowercase hex chars (big-endian).
pub fn fe_to_hex(x: &F) -> String {
    format!("0x{}", hex::encode(x.into_bigint().to_bytes_be()))
}

/// Decode a `0x`-prefixed hex word into a field element, reducing mod p.
pub fn fe_from_hex(s: &str) -> Result<F, HexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(HexError::MissingPrefix)?;
    if digits.len() > 64 {
        return Err(HexError::TooLong(digits.len()));
    }
    let bytes = if digits.len() % 2 == 0 {
        hex::decode(digits)?
    } else {
        hex::decode(format!("0{digits}"))?
    };
    Ok(F::from_be_bytes_mod_order(&bytes))
}

/// Serde adapter for a single field element (`#[serde(with = "wire::fe")]`).
pub mod fe {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{fe_from_hex, fe_to_hex};
    use crate::F;

    /// Serialize as a hex word.
    pub fn serialize<S: Serializer>(x: &F, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&fe_to_hex(x))
    }

    /// Deserialize from a hex word.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<F, D::Error> {
        let raw = String::deserialize(d)?;
        fe_from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Vec<F>` (`#[serde(with = "wire::fe_vec")]`).
pub mod fe_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{fe_from_hex, fe_to_hex};
    use crate::F;

    /// Serialize as a sequence of hex words.
    pub fn serialize<S: Serializer>(v: &[F], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(v.iter().map(fe_to_hex))
    }

    /// Deserialize from a sequence of hex words.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<F>, D::Error> {
        let raw = Vec::<String>::deserialize(d)?;
        raw.iter()
            .map(|s| fe_from_hex(s).map_err(serde::de::Error::custom))
            .collect()
    }
}

/// Serde adapter for `Option<Vec<F>>` (`#[serde(with = "wire::fe_opt_vec")]`).
pub mod fe_opt_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{fe_from_hex, fe_to_hex};
    use crate::F;

    /// Serialize as `null` or a sequence of hex words.
    pub fn serialize<S: Serializer>(v: &Option<Vec<F>>, s: S) -> Result<S::Ok, S::Error> {
        v.as_ref()
            .map(|vals| vals.iter().map(fe_to_hex).collect::<Vec<_>>())
            .serialize(s)
    }

    /// Deserialize from `null` or a sequence of hex words.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<F>>, D::Error> {
        let raw = Option::<Vec<String>>::deserialize(d)?;
        raw.map(|v| {
            v.iter()
                .map(|s| fe_from_hex(s).map_err(serde::de::Error::custom))
                .collect()
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        for v in [0u64, 1, 255, u64::MAX] {
            let x = F::from(v);
            let s = fe_to_hex(&x);
            assert_eq!(s.len(), 2 + 64);
            assert_eq!(fe_from_hex(&s).expect("decode"), x);
        }
    }

    #[test]
    fn short_hex_is_accepted() {
        assert_eq!(fe_from_hex("0x0a").expect("decode"), F::from(10u64));
        assert_eq!(fe_from_hex("0xa").expect("decode"), F::from(10u64));
    }

    #[test]
    fn oversized_hex_reduces_mod_p() {
        // 2^256 - 1 is far above the modulus; decoding must reduce, not fail.
        let all_ff = format!("0x{}", "f".repeat(64));
        let reduced = fe_from_hex(&all_ff).expect("decode");
        assert_eq!(fe_from_hex(&fe_to_hex(&reduced)).expect("decode"), reduced);
    }

    #[test]
    fn malformed_words_are_rejected() {
        assert!(matches!(fe_from_hex("123"), Err(HexError::MissingPrefix)));
        assert!(matches!(fe_from_hex("0xzz"), Err(HexError::Digit(_))));
        assert!(matches!(
            fe_from_hex(&format!("0x{}", "1".repeat(65))),
            Err(HexError::TooLong(65))
        ));
    }
}
