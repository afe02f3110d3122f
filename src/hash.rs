//! Field hash engine
//!
//! Deterministic, position-sensitive compression over the BN254 scalar
//! field. The permutation is Poseidon-shaped: a width-2 state absorbs the
//! two inputs, then each round adds fixed constants to both words, applies
//! the low-degree sbox `x^5`, and mixes the words through the invertible
//! linear map `(s0, s1) -> (s0 + s1, s0 + 2*s1)`.
//!
//! Contracts honored here:
//! - Identical inputs produce identical output across processes and
//!   machines: the round constants are derived once from a fixed
//!   domain-separation tag (BLAKE3 XOF, 64-byte chunks reduced via
//!   `from_le_bytes_mod_order`), never from ambient state.
//! - [`hash5`] chains four [`hash2`] calls left-associatively; this is the
//!   commitment formula's shape and is part of the public contract.
//! - The round count is a single parameter ([`ROUNDS`]); raising it
//!   re-derives the constant schedule. A production deployment targeting a
//!   specific security level swaps in a standard full Poseidon parameter
//!   set behind the same `hash2`/`hash5` signatures.
//!
//! Byte-level inputs wider than the modulus reduce mod p on entry; that is
//! the canonical domain convention for every integer this crate absorbs.

#![forbid(unsafe_code)]

use ark_ff::{Field, PrimeField, Zero};
use blake3::Hasher;
use std::io::Read;
use std::sync::OnceLock;

use crate::{secrets::BetSecrets, F};

/// Number of full rounds applied by the width-2 permutation.
pub const ROUNDS: usize = 8;

/// Two additive constants per round, one per state word.
const RC_COUNT: usize = 2 * ROUNDS;

/// Domain-separation tag pinning the round-constant schedule.
const RC_DST: &[u8] = b"fortuna.hash.v1:rc";

/// Lazily derive the round-constant schedule from the fixed DST.
///
/// Each constant is one 64-byte XOF chunk reduced modulo the field order,
/// so the schedule is a pure function of `RC_DST` and [`ROUNDS`].
fn round_constants() -> &'static [F; RC_COUNT] {
    static RC: OnceLock<[F; RC_COUNT]> = OnceLock::new();
    RC.get_or_init(|| {
        let mut h = Hasher::new();
        h.update(RC_DST);
        h.update(b":count:");
        h.update(&(RC_COUNT as u64).to_be_bytes());
        let mut xof = h.finalize_xof();
        let mut buf = [0u8; 64];
        let mut out = [F::zero(); RC_COUNT];
        for slot in out.iter_mut() {
            let _ = xof.read(&mut buf);
            *slot = F::from_le_bytes_mod_order(&buf);
        }
        out
    })
}

/// The low-degree permutation sbox `x^5 mod p`.
#[inline]
fn sbox(x: F) -> F {
    let x2 = x.square();
    let x4 = x2.square();
    x4 * x
}

/// Compress two field elements into one.
///
/// Non-linear and position-sensitive: `hash2(a, b) != hash2(b, a)` except
/// with negligible probability.
pub fn hash2(a: F, b: F) -> F {
    let rc = round_constants();
    let mut s0 = a;
    let mut s1 = b;
    for r in 0..ROUNDS {
        s0 += rc[2 * r];
        s1 += rc[2 * r + 1];
        s0 = sbox(s0);
        s1 = sbox(s1);
        // Mix: (s0, s1) <- (s0 + s1, s0 + 2*s1). det = 1, so invertible.
        let t0 = s0 + s1;
        let t1 = s0 + s1.double();
        s0 = t0;
        s1 = t1;
    }
    s0 + s1
}

/// Compress five field elements by chaining [`hash2`] left-associatively:
/// `H2(H2(H2(H2(a, b), c), d), e)`.
pub fn hash5(a: F, b: F, c: F, d: F, e: F) -> F {
    let h1 = hash2(a, b);
    let h2 = hash2(h1, c);
    let h3 = hash2(h2, d);
    hash2(h3, e)
}

/// Bet commitment: `H5(secret, nullifier, item_id, token_amount, salt)`.
pub fn commitment(secrets: &BetSecrets, item_id: u64, token_amount: u64) -> F {
    hash5(
        secrets.secret,
        secrets.nullifier,
        F::from(item_id),
        F::from(token_amount),
        secrets.salt,
    )
}

/// Bet nullifier hash: `H2(nullifier, lottery_id)`. Revealing it on-chain
/// prevents the same secret from backing a second bet.
pub fn nullifier_hash(nullifier: F, lottery_id: u64) -> F {
    hash2(nullifier, F::from(lottery_id))
}

/// Claim nullifier hash: `H2(H2(nullifier, lottery_id), item_id)`. Unique
/// per `(lottery, item, nullifier)`, which is what prevents double-claiming
/// a win; derived on demand, never stored.
pub fn claim_nullifier_hash(nullifier: F, lottery_id: u64, item_id: u64) -> F {
    hash2(hash2(nullifier, F::from(lottery_id)), F::from(item_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn hash2_is_deterministic() {
        let a = F::from(17u64);
        let b = F::from(4242u64);
        assert_eq!(hash2(a, b), hash2(a, b));
    }

    #[test]
    fn hash2_is_position_sensitive() {
        let a = F::from(1u64);
        let b = F::from(2u64);
        assert_ne!(hash2(a, b), hash2(b, a));
    }

    #[test]
    fn hash2_has_no_observed_collisions() {
        // 2000 random pairs; any collision here would indicate a broken
        // permutation, not bad luck.
        let mut rng = StdRng::from_seed([42u8; 32]);
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            let a = F::rand(&mut rng);
            let b = F::rand(&mut rng);
            assert!(seen.insert(hash2(a, b)), "collision for inputs ({a}, {b})");
        }
    }

    #[test]
    fn hash5_chains_left_associatively() {
        let vals = [1u64, 2, 3, 4, 5].map(F::from);
        let chained = hash2(hash2(hash2(hash2(vals[0], vals[1]), vals[2]), vals[3]), vals[4]);
        assert_eq!(hash5(vals[0], vals[1], vals[2], vals[3], vals[4]), chained);
    }

    #[test]
    fn commitment_is_deterministic() {
        let secrets = BetSecrets {
            secret: F::from(1u64),
            nullifier: F::from(2u64),
            salt: F::from(3u64),
        };
        let first = commitment(&secrets, 5, 10);
        let second = commitment(&secrets, 5, 10);
        assert_eq!(first, second);
        assert_eq!(first, hash5(F::from(1u64), F::from(2u64), F::from(5u64), F::from(10u64), F::from(3u64)));
    }

    #[test]
    fn claim_nullifier_binds_item() {
        let nullifier = F::from(7u64);
        assert_ne!(
            claim_nullifier_hash(nullifier, 1, 2),
            claim_nullifier_hash(nullifier, 1, 3)
        );
        assert_eq!(
            claim_nullifier_hash(nullifier, 1, 2),
            hash2(nullifier_hash(nullifier, 1), F::from(2u64))
        );
    }
}
