//! Per-bet secrets
//!
//! Every bet is backed by three independent field elements: the `secret`
//! (the hiding randomness of the commitment), the `nullifier` (revealed in
//! hashed form to prevent reuse), and the `salt` (binds the commitment to
//! nothing else). Contracts honored here:
//!
//! - Secrets come from a cryptographically secure source only, drawn as
//!   64-byte strings (wider than the modulus, so the reduction is uniform)
//!   and reduced mod p. They are **never** derived from public bet
//!   parameters; doing so would make commitments linkable and guessable.
//! - Each generation draws fresh bytes; no two calls share a stream seed,
//!   and a retried bet regenerates from scratch.
//! - Intermediate byte buffers are wiped after reduction. The `Debug` impl
//!   is redacted so secrets cannot leak through logging.

#![forbid(unsafe_code)]

use ark_ff::PrimeField;
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::F;

/// The three per-bet secrets. Generated once per bet, stored only in the
/// bettor's local vault, transmitted nowhere in the clear.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetSecrets {
    /// Hiding randomness bound into the commitment.
    #[serde(with = "crate::wire::fe")]
    pub secret: F,
    /// Reuse-prevention secret; only its hash ever leaves the device.
    #[serde(with = "crate::wire::fe")]
    pub nullifier: F,
    /// Commitment salt.
    #[serde(with = "crate::wire::fe")]
    pub salt: F,
}

impl BetSecrets {
    /// Generate fresh secrets from the supplied CSPRNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            secret: draw_field(rng),
            nullifier: draw_field(rng),
            salt: draw_field(rng),
        }
    }

    /// Generate fresh secrets from the operating system's entropy source.
    pub fn random() -> Self {
        Self::generate(&mut OsRng)
    }
}

impl std::fmt::Debug for BetSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BetSecrets(<redacted>)")
    }
}

/// Draw one uniform field element: 64 random bytes reduced mod p, buffer
/// wiped afterwards.
fn draw_field<R: RngCore + CryptoRng>(rng: &mut R) -> F {
    let mut buf = [0u8; 64];
    rng.fill_bytes(&mut buf);
    let out = F::from_be_bytes_mod_order(&buf);
    buf.zeroize();
    out
}
