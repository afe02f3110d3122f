//! Winner resolver
//!
//! Maps a publicly drawn winning position to the locally held bet (if any)
//! whose ticket range covers it. Ranges on one item are contiguous and
//! disjoint by construction, so at most one bet can match. The resolver
//! only ever sees the bettor's own bets: no match means "no local winning
//! bet", never "no winner exists".

#![forbid(unsafe_code)]

use crate::{
    bet::StoredBet,
    vault::{BetVault, VaultStore},
};

/// Find the bet whose ticket range contains `position` among `bets`
/// (expected to all belong to a single lottery item).
pub fn resolve<'a, I>(position: u64, bets: I) -> Option<&'a StoredBet>
where
    I: IntoIterator<Item = &'a StoredBet>,
{
    let mut winner = None;
    for bet in bets {
        if bet.ticket_range.contains(position) {
            debug_assert!(
                winner.is_none(),
                "overlapping ticket ranges for position {position}"
            );
            winner.get_or_insert(bet);
        }
    }
    winner
}

/// Check the vault for a bet winning `position` on one lottery item.
pub fn find_winning_bet<S: VaultStore>(
    vault: &BetVault<S>,
    lottery_id: u64,
    item_id: u64,
    position: u64,
) -> Option<&StoredBet> {
    resolve(position, vault.list_by_item(lottery_id, item_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bet::sample_bet, vault::MemStore};
    use test_case::test_case;

    fn fixture() -> Vec<StoredBet> {
        // Three sequential bets of 10/20/5 tokens: [0,10), [10,30), [30,35).
        vec![
            sample_bet(1, 7, 10, 0),
            sample_bet(1, 7, 20, 10),
            sample_bet(1, 7, 5, 30),
        ]
    }

    #[test_case(9 => Some(0))]
    #[test_case(25 => Some(1))]
    #[test_case(30 => Some(2))]
    #[test_case(34 => Some(2))]
    #[test_case(35 => None)]
    fn positions_resolve_to_the_covering_bet(position: u64) -> Option<usize> {
        let bets = fixture();
        resolve(position, &bets).map(|w| bets.iter().position(|b| b == w).expect("fixture bet"))
    }

    #[test]
    fn subset_of_bets_resolves_correctly() {
        // Holding only the middle bet: positions outside it are simply not
        // ours, even though some other bettor holds them.
        let bets = fixture();
        let mine = &bets[1..2];
        assert!(resolve(5, mine.iter()).is_none());
        assert_eq!(resolve(25, mine.iter()), Some(&bets[1]));
    }

    #[test]
    fn vault_lookup_scopes_to_the_item() {
        let mut vault = crate::vault::BetVault::open(MemStore::new()).expect("open");
        vault.put(sample_bet(1, 7, 10, 0)).expect("put");
        vault.put(sample_bet(1, 8, 10, 0)).expect("put");

        let hit = find_winning_bet(&vault, 1, 7, 5).expect("winning bet");
        assert_eq!(hit.item_id, 7);
        assert!(find_winning_bet(&vault, 1, 9, 5).is_none());
        assert!(find_winning_bet(&vault, 2, 7, 5).is_none());
    }
}
