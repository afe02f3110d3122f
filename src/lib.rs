//! Public surface & core types
//!
//! This crate is the client-side core of a privacy-preserving, weighted,
//! ticket-range lottery. A bettor commits tokens to an item without revealing
//! identity or amount, and later proves knowledge of the winning ticket
//! without re-exposing the original commitment. The crate covers the
//! commitment/nullifier/proof subsystem only:
//!
//! - [`hash`]: deterministic compression over the BN254 scalar field,
//! - [`secrets`]: unlinkable per-bet randomness,
//! - [`builder`]: commitment & winner-claim derivation,
//! - [`vault`]: durable local custody of the bettor's own bets,
//! - [`backend`]: the pluggable proving capability,
//! - [`resolver`]: drawn-position to local-bet lookup,
//! - [`wire`]: 32-byte big-endian hex encoding for chain submission.
//!
//! On-chain contract logic, the REST/indexing services, and all presentation
//! layers are external collaborators: this crate only *produces* the values
//! they submit (`commitment`, `nullifier_hash`, `claim_nullifier_hash`,
//! [`ProofArtifact`] calldata) and *consumes* the values they supply (token
//! totals, Merkle roots/paths, the drawn winning position).
//!
//! ## Data flow (public contract)
//!
//! ```text
//!   secrets ──► commitment/nullifier ──► vault (merkle_index = -1)
//!                                          │  on-chain inclusion (external)
//!                                          ▼
//!                              vault (path attached, immutable)
//!                                          │  draw (external)
//!                                          ▼
//!                        resolver ──► winner claim ──► backend proof
//! ```
//!
//! Exactly one vault write happens per placed bet, and only after the proof
//! backend has returned; a failed or cancelled attempt leaves the vault
//! untouched and a retry regenerates fresh secrets.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Proof backend capability (trait + deterministic stub variant).
pub mod backend;
/// Bet records, ticket ranges, and Merkle-proof inputs.
pub mod bet;
/// Commitment builder: bet placement and winner-claim operations.
pub mod builder;
/// Field hash engine (two-input compression, five-input chaining).
pub mod hash;
/// Winner resolver (drawn position → locally held bet).
pub mod resolver;
/// Per-bet secret generation and custody.
pub mod secrets;
/// Local bet vault with an injected store backend.
pub mod vault;
/// Hex / calldata encoding at the chain and persistence boundaries.
pub mod wire;

pub use backend::{BackendError, BetPublics, ClaimPublics, ProofBackend, StubBackend};
pub use bet::{MerkleProof, StoredBet, TicketRange, UNCONFIRMED};
pub use builder::{claim_winner, place_bet, BetRequest, BuildError, PlacedBet, WinnerClaim};
pub use resolver::{find_winning_bet, resolve};
pub use secrets::BetSecrets;
pub use vault::{BetVault, MemStore, VaultError, VaultStore};

/// Scalar field used across the crate: BN254 `Fr`, the field every
/// commitment, nullifier, and proof limb lives in. Out-of-range integer
/// inputs are reduced modulo the field order before any arithmetic; that is
/// the canonical domain convention, not an error.
pub type F = ark_bn254::Fr;

/// A succinct proof artifact: exactly eight field elements, laid out as a
/// pairing-based proof triple `(A, B, C)` with 2, 4, and 2 limbs
/// respectively. The crate treats the limbs as opaque beyond this shape;
/// producing them is the [`backend::ProofBackend`]'s job and verifying them
/// is the chain's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofArtifact(pub [F; 8]);

impl ProofArtifact {
    /// Number of field-element limbs in every artifact.
    pub const LIMBS: usize = 8;

    /// Component `A` (2 limbs).
    #[inline]
    pub fn a(&self) -> &[F] {
        &self.0[0..2]
    }

    /// Component `B` (4 limbs).
    #[inline]
    pub fn b(&self) -> &[F] {
        &self.0[2..6]
    }

    /// Component `C` (2 limbs).
    #[inline]
    pub fn c(&self) -> &[F] {
        &self.0[6..8]
    }

    /// Encode the artifact for chain submission: eight `0x`-prefixed
    /// 32-byte big-endian hex words, limb order `[a0, a1, b00, b01, b10,
    /// b11, c0, c1]`.
    pub fn calldata(&self) -> [String; 8] {
        self.0.map(|limb| wire::fe_to_hex(&limb))
    }

    /// Decode calldata words back into an artifact, validating the shape
    /// (exactly eight words) and each word's encoding.
    pub fn from_calldata<S: AsRef<str>>(words: &[S]) -> Result<Self, wire::CalldataError> {
        if words.len() != Self::LIMBS {
            return Err(wire::CalldataError::Shape(words.len()));
        }
        let mut limbs = [<F as ark_ff::Zero>::zero(); 8];
        for (slot, word) in limbs.iter_mut().zip(words) {
            *slot = wire::fe_from_hex(word.as_ref())?;
        }
        Ok(Self(limbs))
    }
}
