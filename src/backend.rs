//! Proof backend capability
//!
//! Proof generation is a pluggable capability behind [`ProofBackend`]: a
//! deterministic stub for integration against permissive verifiers, and a
//! real succinct-proof implementation in production. Swapping variants
//! never changes any other component's contract; both return the same
//! 8-limb [`ProofArtifact`] shape, so downstream code never special-cases
//! the stub.
//!
//! What an artifact attests (the contract a real backend must satisfy):
//! - `prove_bet_commitment`: knowledge of secrets with
//!   `commitment = H5(secret, nullifier, item_id, token_amount, salt)` and
//!   `nullifier_hash = H2(nullifier, lottery_id)` for the supplied publics.
//! - `prove_winner_claim`: knowledge of secrets reproducing the committed
//!   leaf, inclusion of that leaf under the supplied Merkle root, that the
//!   winning position falls inside the bet's ticket range, that the claim
//!   nullifier hash is correctly derived, and that the payout recipient is
//!   the one bound into the publics.
//!
//! The stub derives its limbs from the *public* inputs only (BLAKE3 with
//! length-delimited item framing, XOF reduced to field elements), so stub
//! artifacts are reproducible across processes and reveal nothing about
//! the secrets they nominally attest to.

#![forbid(unsafe_code)]

use ark_ff::{BigInteger, PrimeField, Zero};
use blake3::Hasher;
use std::io::Read;
use thiserror::Error;

use crate::{bet::MerkleProof, secrets::BetSecrets, F, ProofArtifact};

/// Domain-separation tag for stub artifact derivation.
const STUB_DST: &[u8] = b"fortuna.stub.v1";

/// Errors a proving backend may report. Both are per-attempt and
/// recoverable; the caller retries (with fresh secrets for a bet proof).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend failed to produce an artifact.
    #[error("proving failed: {0}")]
    Proving(String),
    /// The attempt was cancelled before completion.
    #[error("proving cancelled")]
    Cancelled,
}

/// Public inputs of a bet-commitment proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BetPublics {
    /// Lottery the bet belongs to.
    pub lottery_id: u64,
    /// Item the tokens are committed to.
    pub item_id: u64,
    /// Tokens committed.
    pub token_amount: u64,
    /// The bet commitment submitted on-chain.
    pub commitment: F,
    /// The bet nullifier hash submitted on-chain.
    pub nullifier_hash: F,
}

/// Public inputs of a winner-claim proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimPublics {
    /// Lottery the claimed bet belongs to.
    pub lottery_id: u64,
    /// Item the claimed bet was placed on.
    pub item_id: u64,
    /// Tokens the claimed bet committed.
    pub token_amount: u64,
    /// Commitment-tree root the inclusion proof authenticates against.
    pub merkle_root: F,
    /// The publicly drawn winning position.
    pub winning_position: u64,
    /// Start of the claimed bet's ticket range.
    pub ticket_start: u64,
    /// `H2(H2(nullifier, lottery_id), item_id)`; prevents double claims.
    pub claim_nullifier_hash: F,
    /// Payout address bound into the proof so the claim transaction cannot
    /// be replayed toward a different recipient.
    pub recipient: [u8; 20],
}

/// The proving capability this crate is polymorphic over.
pub trait ProofBackend {
    /// Produce an artifact attesting commitment validity for a new bet.
    fn prove_bet_commitment(
        &self,
        secrets: &BetSecrets,
        publics: &BetPublics,
    ) -> Result<ProofArtifact, BackendError>;

    /// Produce an artifact attesting winning-claim validity for a stored,
    /// tree-included bet.
    fn prove_winner_claim(
        &self,
        secrets: &BetSecrets,
        inclusion: &MerkleProof,
        publics: &ClaimPublics,
    ) -> Result<ProofArtifact, BackendError>;
}

/// Deterministic stub backend: correctly shaped artifacts, stable across
/// processes, accepted by permissive verifiers in non-production
/// configurations.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubBackend;

impl ProofBackend for StubBackend {
    fn prove_bet_commitment(
        &self,
        _secrets: &BetSecrets,
        publics: &BetPublics,
    ) -> Result<ProofArtifact, BackendError> {
        let mut h = Hasher::new();
        h.update(STUB_DST);
        h.update(b":bet");
        absorb_u64(&mut h, "lottery_id", publics.lottery_id);
        absorb_u64(&mut h, "item_id", publics.item_id);
        absorb_u64(&mut h, "token_amount", publics.token_amount);
        absorb_fe(&mut h, "commitment", &publics.commitment);
        absorb_fe(&mut h, "nullifier_hash", &publics.nullifier_hash);
        Ok(artifact_from(h))
    }

    fn prove_winner_claim(
        &self,
        _secrets: &BetSecrets,
        _inclusion: &MerkleProof,
        publics: &ClaimPublics,
    ) -> Result<ProofArtifact, BackendError> {
        let mut h = Hasher::new();
        h.update(STUB_DST);
        h.update(b":claim");
        absorb_u64(&mut h, "lottery_id", publics.lottery_id);
        absorb_u64(&mut h, "item_id", publics.item_id);
        absorb_u64(&mut h, "token_amount", publics.token_amount);
        absorb_fe(&mut h, "merkle_root", &publics.merkle_root);
        absorb_u64(&mut h, "winning_position", publics.winning_position);
        absorb_u64(&mut h, "ticket_start", publics.ticket_start);
        absorb_fe(&mut h, "claim_nullifier_hash", &publics.claim_nullifier_hash);
        absorb_bytes(&mut h, "recipient", &publics.recipient);
        Ok(artifact_from(h))
    }
}

// ----------------------- Internals -----------------------

/// Absorb arbitrary bytes with an item label (length-delimited) to pin the
/// derivation's identity.
fn absorb_bytes(h: &mut Hasher, label: &str, bytes: &[u8]) {
    h.update(b"item:");
    h.update(label.as_bytes());
    h.update(b":len:");
    h.update(&(bytes.len() as u64).to_be_bytes());
    h.update(b":data:");
    h.update(bytes);
}

fn absorb_u64(h: &mut Hasher, label: &str, v: u64) {
    absorb_bytes(h, label, &v.to_be_bytes());
}

fn absorb_fe(h: &mut Hasher, label: &str, x: &F) {
    absorb_bytes(h, label, &x.into_bigint().to_bytes_be());
}

/// XOF the absorbed state into 8 field limbs (64-byte chunks, reduced).
fn artifact_from(h: Hasher) -> ProofArtifact {
    let mut xof = h.finalize_xof();
    let mut buf = [0u8; 64];
    let mut limbs = [F::zero(); 8];
    for slot in limbs.iter_mut() {
        let _ = xof.read(&mut buf);
        *slot = F::from_le_bytes_mod_order(&buf);
    }
    ProofArtifact(limbs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;

    fn publics() -> BetPublics {
        let secrets = BetSecrets::random();
        BetPublics {
            lottery_id: 1,
            item_id: 2,
            token_amount: 10,
            commitment: hash::commitment(&secrets, 2, 10),
            nullifier_hash: hash::nullifier_hash(secrets.nullifier, 1),
        }
    }

    #[test]
    fn stub_is_deterministic_over_publics() {
        let p = publics();
        let secrets_a = BetSecrets::random();
        let secrets_b = BetSecrets::random();
        let first = StubBackend.prove_bet_commitment(&secrets_a, &p).expect("prove");
        let second = StubBackend.prove_bet_commitment(&secrets_b, &p).expect("prove");
        assert_eq!(first, second);
    }

    #[test]
    fn stub_is_sensitive_to_publics() {
        let p = publics();
        let mut q = p.clone();
        q.token_amount += 1;
        let secrets = BetSecrets::random();
        let first = StubBackend.prove_bet_commitment(&secrets, &p).expect("prove");
        let second = StubBackend.prove_bet_commitment(&secrets, &q).expect("prove");
        assert_ne!(first, second);
    }

    #[test]
    fn claim_artifact_binds_recipient() {
        let secrets = BetSecrets::random();
        let inclusion = MerkleProof {
            path_elements: vec![F::from(5u64)],
            path_indices: vec![0],
            root: F::from(9u64),
        };
        let p = ClaimPublics {
            lottery_id: 1,
            item_id: 2,
            token_amount: 10,
            merkle_root: F::from(9u64),
            winning_position: 4,
            ticket_start: 0,
            claim_nullifier_hash: hash::claim_nullifier_hash(secrets.nullifier, 1, 2),
            recipient: [0xaa; 20],
        };
        let mut q = p.clone();
        q.recipient = [0xbb; 20];
        let first = StubBackend.prove_winner_claim(&secrets, &inclusion, &p).expect("prove");
        let second = StubBackend.prove_winner_claim(&secrets, &inclusion, &q).expect("prove");
        assert_ne!(first, second);
    }
}
