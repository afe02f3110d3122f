//! Bet records & ticket ranges
//!
//! The durable unit of this crate is the [`StoredBet`]: everything the
//! bettor's own device must remember to later prove a win. The chain only
//! ever sees the `commitment` and `nullifier_hash`; the secrets and ticket
//! bookkeeping stay local.
//!
//! Lifecycle: created at bet placement with `merkle_index == -1`, updated
//! exactly once when the chain confirms inclusion of the commitment (index
//! and Merkle path attached, immutable afterwards), read-only until the
//! owner clears it.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{hash, secrets::BetSecrets, F};

/// Sentinel `merkle_index` of a bet whose on-chain inclusion is not yet
/// confirmed.
pub const UNCONFIRMED: i64 = -1;

/// Half-open interval `[start, end)` of the weighted draw space occupied by
/// one bet: one ticket per token, zero-indexed, `start` equal to the
/// cumulative token total placed on the item strictly before the bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRange {
    /// First ticket owned by the bet.
    pub start: u64,
    /// One past the last ticket owned by the bet.
    pub end: u64,
}

impl TicketRange {
    /// Whether the drawn `position` falls inside this range.
    #[inline]
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.end
    }

    /// Number of tickets in the range (equals the bet's token amount).
    #[inline]
    pub fn width(&self) -> u64 {
        self.end - self.start
    }
}

/// A Merkle inclusion proof, consumed (never produced) by this crate: the
/// external indexing collaborator derives it from the on-chain commitment
/// tree once inclusion is confirmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    /// Sibling hashes from the leaf up to the root.
    pub path_elements: Vec<F>,
    /// Left/right indicator per level (0 = leaf side is left).
    pub path_indices: Vec<u8>,
    /// Root the path authenticates against.
    pub root: F,
}

/// A bettor's locally stored bet, keyed in the vault by `commitment`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBet {
    /// Lottery the bet belongs to.
    pub lottery_id: u64,
    /// Item within the lottery the tokens were committed to.
    pub item_id: u64,
    /// Tokens committed (one ticket each).
    pub token_amount: u64,
    /// `H5(secret, nullifier, item_id, token_amount, salt)`.
    #[serde(with = "crate::wire::fe")]
    pub commitment: F,
    /// `H2(nullifier, lottery_id)`.
    #[serde(with = "crate::wire::fe")]
    pub nullifier_hash: F,
    /// The per-bet secrets backing the commitment.
    pub secrets: BetSecrets,
    /// Tickets owned by this bet.
    pub ticket_range: TicketRange,
    /// Leaf index in the on-chain commitment tree, [`UNCONFIRMED`] until
    /// inclusion is confirmed, fixed forever afterwards.
    pub merkle_index: i64,
    /// Sibling hashes for the leaf, populated with `merkle_index`.
    #[serde(with = "crate::wire::fe_opt_vec")]
    pub merkle_path: Option<Vec<F>>,
    /// Left/right indicators for the path, populated with `merkle_index`.
    pub merkle_path_indices: Option<Vec<u8>>,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
}

/// Why a bet record failed validation during snapshot import.
#[derive(Debug, Error)]
pub enum InvariantError {
    /// `end - start` does not equal the token amount.
    #[error("ticket range [{start}, {end}) does not span {token_amount} tokens")]
    RangeWidth {
        /// Range start.
        start: u64,
        /// Range end.
        end: u64,
        /// Claimed token amount.
        token_amount: u64,
    },
    /// The stored commitment is not `H5` of the stored secrets and publics.
    #[error("commitment does not match secrets")]
    CommitmentMismatch,
    /// The stored nullifier hash is not `H2(nullifier, lottery_id)`.
    #[error("nullifier hash does not match secrets")]
    NullifierMismatch,
    /// Merkle fields are inconsistent (index vs path presence/length).
    #[error("inconsistent merkle inclusion state")]
    MerkleState,
}

impl StoredBet {
    /// Whether on-chain inclusion has been confirmed for this bet.
    #[inline]
    pub fn is_included(&self) -> bool {
        self.merkle_index >= 0
    }

    /// Assemble the stored path into a [`MerkleProof`] against the supplied
    /// root, or `None` while inclusion is unconfirmed.
    pub fn inclusion_proof(&self, root: F) -> Option<MerkleProof> {
        if !self.is_included() {
            return None;
        }
        match (&self.merkle_path, &self.merkle_path_indices) {
            (Some(path), Some(indices)) => Some(MerkleProof {
                path_elements: path.clone(),
                path_indices: indices.clone(),
                root,
            }),
            _ => None,
        }
    }

    /// Check the record's internal invariants. Used to vet every record of
    /// an imported snapshot before the vault commits to it.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.ticket_range.end < self.ticket_range.start
            || self.ticket_range.width() != self.token_amount
        {
            return Err(InvariantError::RangeWidth {
                start: self.ticket_range.start,
                end: self.ticket_range.end,
                token_amount: self.token_amount,
            });
        }
        if hash::commitment(&self.secrets, self.item_id, self.token_amount) != self.commitment {
            return Err(InvariantError::CommitmentMismatch);
        }
        if hash::nullifier_hash(self.secrets.nullifier, self.lottery_id) != self.nullifier_hash {
            return Err(InvariantError::NullifierMismatch);
        }
        match (self.merkle_index, &self.merkle_path, &self.merkle_path_indices) {
            (UNCONFIRMED, None, None) => Ok(()),
            (idx, Some(path), Some(indices)) if idx >= 0 && path.len() == indices.len() => Ok(()),
            _ => Err(InvariantError::MerkleState),
        }
    }
}

/// Build a well-formed unconfirmed bet with fresh secrets (test helper).
#[cfg(test)]
pub(crate) fn sample_bet(lottery_id: u64, item_id: u64, token_amount: u64, start: u64) -> StoredBet {
    let secrets = BetSecrets::random();
    StoredBet {
        lottery_id,
        item_id,
        token_amount,
        commitment: hash::commitment(&secrets, item_id, token_amount),
        nullifier_hash: hash::nullifier_hash(secrets.nullifier, lottery_id),
        secrets,
        ticket_range: TicketRange { start, end: start + token_amount },
        merkle_index: UNCONFIRMED,
        merkle_path: None,
        merkle_path_indices: None,
        created_at: 1_700_000_000_000,
    }
}
