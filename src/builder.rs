//! Commitment builder
//!
//! Wires the secrets generator, hash engine, proof backend, and vault into
//! the two operations a bettor performs: placing a bet and claiming a win.
//! The components are injected by the caller; nothing here reaches into
//! another component's internals or any ambient state.
//!
//! Contracts honored here:
//! - [`place_bet`] performs **exactly one** vault write, and only after the
//!   proof backend has returned. A backend failure or cancellation aborts
//!   the attempt with the vault untouched; because secrets are generated
//!   inside the call, a retry necessarily starts from fresh secrets and a
//!   discarded attempt's artifacts are never resumable.
//! - [`claim_winner`] never mutates the vault. It is the caller's job to
//!   invoke it with a position inside the bet's range; a miss is reported
//!   as [`BuildError::RangeMismatch`], a claim against an unconfirmed bet
//!   as [`BuildError::IncompleteBet`].

#![forbid(unsafe_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    backend::{BackendError, BetPublics, ClaimPublics, ProofBackend},
    bet::{StoredBet, TicketRange, UNCONFIRMED},
    hash,
    secrets::BetSecrets,
    vault::{BetVault, VaultError, VaultStore},
    wire, F, ProofArtifact,
};

/// Parameters of a new bet. `total_tokens_before` is the cumulative token
/// total already placed on the item, supplied by the external indexing
/// collaborator; this crate never fabricates it.
#[derive(Clone, Copy, Debug)]
pub struct BetRequest {
    /// Lottery to bet in.
    pub lottery_id: u64,
    /// Item to commit tokens to.
    pub item_id: u64,
    /// Tokens to commit (one ticket each).
    pub token_amount: u64,
    /// Tokens placed on the item strictly before this bet.
    pub total_tokens_before: u64,
}

/// Everything the caller needs to submit a placed bet on-chain.
#[derive(Clone, Debug)]
pub struct PlacedBet {
    /// Artifact attesting commitment validity.
    pub proof: ProofArtifact,
    /// The commitment submitted on-chain (also the vault key).
    pub commitment: F,
    /// The nullifier hash submitted on-chain.
    pub nullifier_hash: F,
    /// The freshly generated secrets (already persisted in the vault).
    pub secrets: BetSecrets,
    /// Tickets the bet occupies.
    pub ticket_range: TicketRange,
}

/// Everything the caller needs to submit a winner claim on-chain.
#[derive(Clone, Debug)]
pub struct WinnerClaim {
    /// Artifact attesting winning-claim validity.
    pub proof: ProofArtifact,
    /// The claim nullifier hash submitted on-chain.
    pub claim_nullifier_hash: F,
}

/// Errors from the builder operations.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Claim requested before the bet's Merkle inclusion is confirmed.
    #[error("bet inclusion not yet confirmed")]
    IncompleteBet,
    /// The drawn position is outside the claimed bet's ticket range.
    #[error("winning position {position} outside ticket range [{start}, {end})")]
    RangeMismatch {
        /// The drawn position.
        position: u64,
        /// Claimed range start.
        start: u64,
        /// Claimed range end.
        end: u64,
    },
    /// The proof backend failed or was cancelled.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The vault write failed.
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Place a bet: generate fresh secrets, derive commitment and nullifier
/// hash, compute the ticket range, obtain a commitment proof, and persist
/// the [`StoredBet`] (unconfirmed) into the vault.
pub fn place_bet<P: ProofBackend, S: VaultStore>(
    backend: &P,
    vault: &mut BetVault<S>,
    req: &BetRequest,
) -> Result<PlacedBet, BuildError> {
    let secrets = BetSecrets::random();
    let commitment = hash::commitment(&secrets, req.item_id, req.token_amount);
    let nullifier_hash = hash::nullifier_hash(secrets.nullifier, req.lottery_id);
    let ticket_range = TicketRange {
        start: req.total_tokens_before,
        end: req.total_tokens_before + req.token_amount,
    };

    let publics = BetPublics {
        lottery_id: req.lottery_id,
        item_id: req.item_id,
        token_amount: req.token_amount,
        commitment,
        nullifier_hash,
    };
    let proof = backend.prove_bet_commitment(&secrets, &publics)?;

    // The single vault write, after proving succeeded.
    vault.put(StoredBet {
        lottery_id: req.lottery_id,
        item_id: req.item_id,
        token_amount: req.token_amount,
        commitment,
        nullifier_hash,
        secrets: secrets.clone(),
        ticket_range,
        merkle_index: UNCONFIRMED,
        merkle_path: None,
        merkle_path_indices: None,
        created_at: now_millis(),
    })?;

    info!(
        lottery_id = req.lottery_id,
        item_id = req.item_id,
        commitment = %wire::fe_to_hex(&commitment),
        "bet placed"
    );
    Ok(PlacedBet { proof, commitment, nullifier_hash, secrets, ticket_range })
}

/// Build a winner claim for a stored bet whose ticket range covers the
/// drawn `winning_position`.
pub fn claim_winner<P: ProofBackend>(
    backend: &P,
    bet: &StoredBet,
    winning_position: u64,
    merkle_root: F,
    recipient: [u8; 20],
) -> Result<WinnerClaim, BuildError> {
    let inclusion = bet
        .inclusion_proof(merkle_root)
        .ok_or(BuildError::IncompleteBet)?;
    if !bet.ticket_range.contains(winning_position) {
        return Err(BuildError::RangeMismatch {
            position: winning_position,
            start: bet.ticket_range.start,
            end: bet.ticket_range.end,
        });
    }

    let claim_nullifier_hash =
        hash::claim_nullifier_hash(bet.secrets.nullifier, bet.lottery_id, bet.item_id);
    debug!(
        lottery_id = bet.lottery_id,
        item_id = bet.item_id,
        winning_position,
        "building winner claim"
    );

    let publics = ClaimPublics {
        lottery_id: bet.lottery_id,
        item_id: bet.item_id,
        token_amount: bet.token_amount,
        merkle_root,
        winning_position,
        ticket_start: bet.ticket_range.start,
        claim_nullifier_hash,
        recipient,
    };
    let proof = backend.prove_winner_claim(&bet.secrets, &inclusion, &publics)?;

    info!(
        lottery_id = bet.lottery_id,
        item_id = bet.item_id,
        claim_nullifier_hash = %wire::fe_to_hex(&claim_nullifier_hash),
        "winner claim built"
    );
    Ok(WinnerClaim { proof, claim_nullifier_hash })
}

/// Milliseconds since the Unix epoch (0 if the clock is before the epoch).
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::StubBackend, vault::MemStore};

    struct DeadBackend;

    impl ProofBackend for DeadBackend {
        fn prove_bet_commitment(
            &self,
            _secrets: &BetSecrets,
            _publics: &BetPublics,
        ) -> Result<ProofArtifact, BackendError> {
            Err(BackendError::Cancelled)
        }

        fn prove_winner_claim(
            &self,
            _secrets: &BetSecrets,
            _inclusion: &crate::bet::MerkleProof,
            _publics: &ClaimPublics,
        ) -> Result<ProofArtifact, BackendError> {
            Err(BackendError::Cancelled)
        }
    }

    fn open_vault() -> BetVault<MemStore> {
        BetVault::open(MemStore::new()).expect("open")
    }

    fn request(token_amount: u64, total_before: u64) -> BetRequest {
        BetRequest { lottery_id: 1, item_id: 7, token_amount, total_tokens_before: total_before }
    }

    #[test]
    fn sequential_bets_tile_the_draw_space() {
        let mut vault = open_vault();
        let mut total = 0;
        let mut ranges = Vec::new();
        for amount in [10u64, 20, 5] {
            let placed =
                place_bet(&StubBackend, &mut vault, &request(amount, total)).expect("place");
            total += amount;
            ranges.push(placed.ticket_range);
        }
        assert_eq!(ranges[0], TicketRange { start: 0, end: 10 });
        assert_eq!(ranges[1], TicketRange { start: 10, end: 30 });
        assert_eq!(ranges[2], TicketRange { start: 30, end: 35 });
        assert_eq!(vault.len(), 3);
    }

    #[test]
    fn placed_bet_is_persisted_and_well_formed() {
        let mut vault = open_vault();
        let placed = place_bet(&StubBackend, &mut vault, &request(10, 0)).expect("place");

        let stored = vault.get(&placed.commitment).expect("stored");
        stored.check_invariants().expect("invariants");
        assert_eq!(stored.merkle_index, UNCONFIRMED);
        assert_eq!(stored.nullifier_hash, placed.nullifier_hash);
        assert_eq!(stored.secrets, placed.secrets);
        assert_eq!(
            placed.commitment,
            hash::commitment(&placed.secrets, 7, 10)
        );
    }

    #[test]
    fn repeated_requests_are_unlinkable() {
        let mut vault = open_vault();
        let first = place_bet(&StubBackend, &mut vault, &request(10, 0)).expect("place");
        let second = place_bet(&StubBackend, &mut vault, &request(10, 10)).expect("place");
        assert_ne!(first.commitment, second.commitment);
        assert_ne!(first.nullifier_hash, second.nullifier_hash);
        assert_ne!(first.secrets, second.secrets);
    }

    #[test]
    fn backend_failure_leaves_vault_untouched() {
        let mut vault = open_vault();
        assert!(matches!(
            place_bet(&DeadBackend, &mut vault, &request(10, 0)),
            Err(BuildError::Backend(BackendError::Cancelled))
        ));
        assert!(vault.is_empty());
    }

    #[test]
    fn claim_before_inclusion_is_incomplete() {
        let mut vault = open_vault();
        let placed = place_bet(&StubBackend, &mut vault, &request(10, 0)).expect("place");
        let bet = vault.get(&placed.commitment).expect("stored").clone();

        assert!(matches!(
            claim_winner(&StubBackend, &bet, 5, F::from(1u64), [0u8; 20]),
            Err(BuildError::IncompleteBet)
        ));
    }

    #[test]
    fn claim_outside_range_is_a_mismatch() {
        let mut vault = open_vault();
        let placed = place_bet(&StubBackend, &mut vault, &request(10, 0)).expect("place");
        vault
            .attach_merkle_path(&placed.commitment, 0, vec![F::from(2u64)], vec![0])
            .expect("attach");
        let bet = vault.get(&placed.commitment).expect("stored").clone();

        assert!(matches!(
            claim_winner(&StubBackend, &bet, 10, F::from(1u64), [0u8; 20]),
            Err(BuildError::RangeMismatch { position: 10, start: 0, end: 10 })
        ));
    }

    #[test]
    fn claim_derives_the_claim_nullifier() {
        let mut vault = open_vault();
        let placed = place_bet(&StubBackend, &mut vault, &request(10, 0)).expect("place");
        vault
            .attach_merkle_path(&placed.commitment, 4, vec![F::from(2u64)], vec![1])
            .expect("attach");
        let bet = vault.get(&placed.commitment).expect("stored").clone();

        let claim =
            claim_winner(&StubBackend, &bet, 9, F::from(42u64), [0x11; 20]).expect("claim");
        assert_eq!(
            claim.claim_nullifier_hash,
            hash::claim_nullifier_hash(bet.secrets.nullifier, 1, 7)
        );
    }
}
