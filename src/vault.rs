//! Bet vault
//!
//! A keyed store (`commitment -> StoredBet`) scoped to one bettor's local
//! device. The vault holds the only copy of the secrets backing each bet,
//! so its mutation discipline is strict:
//!
//! - `put` is append-only; a duplicate commitment is rejected and nothing
//!   changes.
//! - `attach_merkle_path` is the sole mutation after creation, applied once
//!   when the chain confirms inclusion; re-attaching identical data is
//!   idempotent, anything conflicting is rejected.
//! - Snapshot import validates the entire payload (decode + per-record
//!   invariants) before committing; failure leaves the vault unmodified,
//!   never a partial merge.
//! - Every mutation persists through the injected [`VaultStore`]; if
//!   persistence fails, the in-memory state is rolled back so memory and
//!   store never diverge.
//!
//! There is no internal locking: the vault is single-owner state and all
//! mutations take `&mut self`, so callers serialize access by ownership.
//! The store backend is a trait so tests run against [`MemStore`] while
//! production wires an encrypted persistent store, with no ambient global
//! state anywhere.

#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::io;

use thiserror::Error;
use tracing::{debug, info};

use crate::{bet::StoredBet, wire, F};

/// Persistence backend the vault writes its snapshot blob through.
///
/// Implementations may keep the blob in memory, on disk, or behind an
/// encryption layer; the vault does not care, as long as `restore` returns
/// the bytes most recently passed to `persist` (or `None` on first open).
pub trait VaultStore {
    /// Durably record the snapshot blob, replacing any previous one.
    fn persist(&mut self, blob: &[u8]) -> io::Result<()>;

    /// Fetch the most recently persisted blob, if any.
    fn restore(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Trivial in-memory [`VaultStore`] for tests and ephemeral sessions.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    blob: Option<Vec<u8>>,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaultStore for MemStore {
    fn persist(&mut self, blob: &[u8]) -> io::Result<()> {
        self.blob = Some(blob.to_vec());
        Ok(())
    }

    fn restore(&mut self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.blob.clone())
    }
}

/// Errors from vault operations. All are recoverable and every error path
/// leaves the vault exactly as it was.
#[derive(Debug, Error)]
pub enum VaultError {
    /// `put` with a commitment key that already exists.
    #[error("duplicate commitment {0}")]
    DuplicateCommitment(String),
    /// `attach_merkle_path` conflicting with already-attached inclusion data.
    #[error("merkle inclusion for {0} is immutable once attached")]
    ImmutableField(String),
    /// No bet stored under the given commitment.
    #[error("unknown commitment {0}")]
    UnknownCommitment(String),
    /// A snapshot payload failed to decode or validate.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    /// The injected store failed to persist or restore.
    #[error("store error: {0}")]
    Store(#[from] io::Error),
}

/// The bettor's local vault of own bets, backed by an injected store.
pub struct BetVault<S: VaultStore> {
    store: S,
    bets: Vec<StoredBet>,
}

impl<S: VaultStore> BetVault<S> {
    /// Open the vault, loading any snapshot the store has persisted.
    ///
    /// A persisted blob that fails validation is an error: the vault never
    /// silently discards records it cannot vouch for.
    pub fn open(mut store: S) -> Result<Self, VaultError> {
        let bets = match store.restore()? {
            Some(blob) => decode_snapshot(&blob)?,
            None => Vec::new(),
        };
        debug!(bets = bets.len(), "vault opened");
        Ok(Self { store, bets })
    }

    /// Flush and return the underlying store.
    pub fn close(mut self) -> Result<S, VaultError> {
        self.flush()?;
        debug!(bets = self.bets.len(), "vault closed");
        Ok(self.store)
    }

    /// Number of stored bets.
    #[inline]
    pub fn len(&self) -> usize {
        self.bets.len()
    }

    /// Whether the vault holds no bets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }

    /// Look up a bet by its commitment key.
    pub fn get(&self, commitment: &F) -> Option<&StoredBet> {
        self.bets.iter().find(|b| b.commitment == *commitment)
    }

    /// Append a new bet. Fails if the commitment key already exists.
    pub fn put(&mut self, bet: StoredBet) -> Result<(), VaultError> {
        if self.get(&bet.commitment).is_some() {
            return Err(VaultError::DuplicateCommitment(wire::fe_to_hex(&bet.commitment)));
        }
        let key = wire::fe_to_hex(&bet.commitment);
        let (lottery_id, item_id) = (bet.lottery_id, bet.item_id);
        self.bets.push(bet);
        if let Err(e) = self.flush() {
            self.bets.pop();
            return Err(e);
        }
        debug!(commitment = %key, lottery_id, item_id, "bet stored");
        Ok(())
    }

    /// All stored bets, in insertion order.
    pub fn list_all(&self) -> impl Iterator<Item = &StoredBet> {
        self.bets.iter()
    }

    /// Bets belonging to one lottery, in insertion order.
    pub fn list_by_lottery(&self, lottery_id: u64) -> impl Iterator<Item = &StoredBet> {
        self.bets.iter().filter(move |b| b.lottery_id == lottery_id)
    }

    /// Bets placed on one item of one lottery, in insertion order.
    pub fn list_by_item(&self, lottery_id: u64, item_id: u64) -> impl Iterator<Item = &StoredBet> {
        self.bets
            .iter()
            .filter(move |b| b.lottery_id == lottery_id && b.item_id == item_id)
    }

    /// Attach confirmed Merkle inclusion data to a bet. The one mutation a
    /// stored bet ever receives: idempotent for identical arguments,
    /// rejected for anything conflicting with already-attached data.
    ///
    /// `merkle_index` must be a confirmed (non-negative) leaf index and the
    /// path vectors must have equal length; those are caller contracts, not
    /// runtime conditions.
    pub fn attach_merkle_path(
        &mut self,
        commitment: &F,
        merkle_index: i64,
        path: Vec<F>,
        path_indices: Vec<u8>,
    ) -> Result<(), VaultError> {
        assert!(merkle_index >= 0, "merkle_index must be a confirmed leaf index");
        assert_eq!(path.len(), path_indices.len(), "path/indices length mismatch");

        let key = wire::fe_to_hex(commitment);
        let pos = self
            .bets
            .iter()
            .position(|b| b.commitment == *commitment)
            .ok_or_else(|| VaultError::UnknownCommitment(key.clone()))?;

        let bet = &self.bets[pos];
        if bet.is_included() {
            let identical = bet.merkle_index == merkle_index
                && bet.merkle_path.as_deref() == Some(path.as_slice())
                && bet.merkle_path_indices.as_deref() == Some(path_indices.as_slice());
            return if identical {
                Ok(())
            } else {
                Err(VaultError::ImmutableField(key))
            };
        }

        let bet = &mut self.bets[pos];
        bet.merkle_index = merkle_index;
        bet.merkle_path = Some(path);
        bet.merkle_path_indices = Some(path_indices);
        if let Err(e) = self.flush() {
            let bet = &mut self.bets[pos];
            bet.merkle_index = crate::bet::UNCONFIRMED;
            bet.merkle_path = None;
            bet.merkle_path_indices = None;
            return Err(e);
        }
        debug!(commitment = %key, merkle_index, "merkle inclusion attached");
        Ok(())
    }

    /// Irreversibly delete every stored bet.
    pub fn clear_all(&mut self) -> Result<(), VaultError> {
        let removed = std::mem::take(&mut self.bets);
        if let Err(e) = self.flush() {
            self.bets = removed;
            return Err(e);
        }
        info!(removed = removed.len(), "vault cleared");
        Ok(())
    }

    /// Irreversibly delete the bets of one lottery.
    pub fn clear_by_lottery(&mut self, lottery_id: u64) -> Result<(), VaultError> {
        let kept: Vec<StoredBet> = self
            .bets
            .iter()
            .filter(|b| b.lottery_id != lottery_id)
            .cloned()
            .collect();
        let removed = self.bets.len() - kept.len();
        let previous = std::mem::replace(&mut self.bets, kept);
        if let Err(e) = self.flush() {
            self.bets = previous;
            return Err(e);
        }
        info!(lottery_id, removed, "lottery bets cleared");
        Ok(())
    }

    /// Encode all stored bets as a self-describing snapshot blob.
    pub fn export_snapshot(&self) -> Result<Vec<u8>, VaultError> {
        encode_snapshot(&self.bets)
    }

    /// Replace the vault contents with a previously exported snapshot.
    ///
    /// The payload is fully decoded and every record validated before
    /// anything is committed; on any failure the vault is left unmodified.
    /// Returns the number of records imported.
    pub fn import_snapshot(&mut self, blob: &[u8]) -> Result<usize, VaultError> {
        let incoming = decode_snapshot(blob)?;
        let count = incoming.len();
        let previous = std::mem::replace(&mut self.bets, incoming);
        if let Err(e) = self.flush() {
            self.bets = previous;
            return Err(e);
        }
        info!(records = count, "snapshot imported");
        Ok(count)
    }

    fn flush(&mut self) -> Result<(), VaultError> {
        let blob = encode_snapshot(&self.bets)?;
        self.store.persist(&blob)?;
        Ok(())
    }
}

fn encode_snapshot(bets: &[StoredBet]) -> Result<Vec<u8>, VaultError> {
    serde_json::to_vec(bets).map_err(|e| VaultError::MalformedSnapshot(e.to_string()))
}

/// Decode and fully validate a snapshot payload.
fn decode_snapshot(blob: &[u8]) -> Result<Vec<StoredBet>, VaultError> {
    let bets: Vec<StoredBet> = serde_json::from_slice(blob)
        .map_err(|e| VaultError::MalformedSnapshot(e.to_string()))?;
    let mut keys = HashSet::with_capacity(bets.len());
    for bet in &bets {
        bet.check_invariants()
            .map_err(|e| VaultError::MalformedSnapshot(e.to_string()))?;
        if !keys.insert(bet.commitment) {
            return Err(VaultError::MalformedSnapshot(format!(
                "duplicate commitment {}",
                wire::fe_to_hex(&bet.commitment)
            )));
        }
    }
    Ok(bets)
}
