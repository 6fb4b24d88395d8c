use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::player::PlayerId;

/// One pot. Index 0 of a pot vector is the main pot; the rest are side
/// pots in ascending all-in-level order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pot {
    pub amount: u32,
    /// Players who can win this pot: contributed at least its level and
    /// did not fold. Folded chips stay in `amount` regardless.
    pub eligible: Vec<PlayerId>,
    pub is_main: bool,
}

/// What one player put into the hand, and whether they are still in it.
/// Players who left mid-hand are carried as folded contributions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub player_id: PlayerId,
    pub amount: u32,
    pub folded: bool,
}

/// One line of a pot distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub player_id: PlayerId,
    pub amount: u32,
}

/// Partition the committed chips into main and side pots.
///
/// Contributions are walked from the lowest total to the highest; each
/// distinct level L closes a pot of (L - previous) chips per contributor
/// at or above L, eligible to the non-folded among them.
pub fn build_pots(contributions: &[Contribution]) -> Vec<Pot> {
    let mut entries: Vec<&Contribution> =
        contributions.iter().filter(|c| c.amount > 0).collect();
    if entries.is_empty() {
        return Vec::new();
    }
    entries.sort_by(|a, b| a.amount.cmp(&b.amount).then(a.player_id.cmp(&b.player_id)));

    let mut pots = Vec::new();
    let mut previous_level = 0u32;
    for entry in &entries {
        let level = entry.amount;
        if level == previous_level {
            continue;
        }
        let at_or_above: Vec<&&Contribution> =
            entries.iter().filter(|c| c.amount >= level).collect();
        let amount = (level - previous_level) * at_or_above.len() as u32;
        let eligible: Vec<PlayerId> = at_or_above
            .iter()
            .filter(|c| !c.folded)
            .map(|c| c.player_id.clone())
            .collect();
        pots.push(Pot {
            amount,
            eligible,
            is_main: pots.is_empty(),
        });
        previous_level = level;
    }
    pots
}

/// A player's standing at showdown: rank 0 is the best hand, ties share
/// a rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPlayer {
    pub player_id: PlayerId,
    pub rank: u32,
}

/// Split every pot among the best-ranked players eligible for it.
///
/// Each pot goes to its minimum-rank eligible players in even shares.
/// The integer remainder is handed out one chip at a time in the frozen
/// canonical order: rank first, then player id ascending. A pot none of
/// the ranked players can win (unreachable under the table invariants)
/// falls back to an even split across its eligible set.
pub fn distribute(pots: &[Pot], rankings: &[RankedPlayer]) -> Result<Vec<Payout>, EngineError> {
    let mut order: Vec<&RankedPlayer> = rankings.iter().collect();
    order.sort_by(|a, b| a.rank.cmp(&b.rank).then(a.player_id.cmp(&b.player_id)));

    let mut totals: Vec<Payout> = Vec::new();
    let mut credit = |player_id: &PlayerId, amount: u32| {
        if amount == 0 {
            return;
        }
        match totals.iter_mut().find(|p| p.player_id == *player_id) {
            Some(p) => p.amount += amount,
            None => totals.push(Payout {
                player_id: player_id.clone(),
                amount,
            }),
        }
    };

    for pot in pots {
        let in_contention: Vec<&&RankedPlayer> = order
            .iter()
            .filter(|r| pot.eligible.contains(&r.player_id))
            .collect();

        let winners: Vec<PlayerId> = if let Some(best) = in_contention.first() {
            in_contention
                .iter()
                .take_while(|r| r.rank == best.rank)
                .map(|r| r.player_id.clone())
                .collect()
        } else {
            if pot.eligible.is_empty() {
                return Err(EngineError::NoEligibleWinner);
            }
            let mut fallback = pot.eligible.clone();
            fallback.sort();
            fallback
        };

        let share = pot.amount / winners.len() as u32;
        let remainder = pot.amount % winners.len() as u32;
        for (i, winner) in winners.iter().enumerate() {
            let extra = if (i as u32) < remainder { 1 } else { 0 };
            credit(winner, share + extra);
        }
    }
    Ok(totals)
}

/// Chip-conservation predicate: the pots carry exactly the committed
/// chips, no more and no less.
pub fn validate_pots(contributions: &[Contribution], pots: &[Pot]) -> bool {
    let committed: u64 = contributions.iter().map(|c| c.amount as u64).sum();
    let pot_total: u64 = pots.iter().map(|p| p.amount as u64).sum();
    committed == pot_total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(id: &str, amount: u32, folded: bool) -> Contribution {
        Contribution {
            player_id: id.to_string(),
            amount,
            folded,
        }
    }

    fn ranked(id: &str, rank: u32) -> RankedPlayer {
        RankedPlayer {
            player_id: id.to_string(),
            rank,
        }
    }

    #[test]
    fn equal_contributions_make_a_single_main_pot() {
        let pots = build_pots(&[
            contribution("a", 100, false),
            contribution("b", 100, false),
        ]);
        assert_eq!(pots.len(), 1);
        assert!(pots[0].is_main);
        assert_eq!(pots[0].amount, 200);
        assert_eq!(pots[0].eligible.len(), 2);
    }

    #[test]
    fn three_way_all_in_builds_main_and_two_sides() {
        // A all-in for 100, B all-in for 150, C covers with 200
        let contributions = [
            contribution("a", 100, false),
            contribution("b", 150, false),
            contribution("c", 200, false),
        ];
        let pots = build_pots(&contributions);
        assert_eq!(pots.len(), 3);

        assert_eq!(pots[0].amount, 300);
        assert!(pots[0].is_main);
        assert_eq!(pots[0].eligible, vec!["a", "b", "c"]);

        assert_eq!(pots[1].amount, 100);
        assert!(!pots[1].is_main);
        assert_eq!(pots[1].eligible, vec!["b", "c"]);

        assert_eq!(pots[2].amount, 50);
        assert_eq!(pots[2].eligible, vec!["c"]);

        assert!(validate_pots(&contributions, &pots));
    }

    #[test]
    fn covering_player_scoops_everything_when_best() {
        let pots = build_pots(&[
            contribution("a", 100, false),
            contribution("b", 150, false),
            contribution("c", 200, false),
        ]);
        let payouts =
            distribute(&pots, &[ranked("c", 0), ranked("a", 1), ranked("b", 2)]).unwrap();
        assert_eq!(payouts, vec![Payout { player_id: "c".into(), amount: 450 }]);
    }

    #[test]
    fn short_stack_winner_takes_only_the_main_pot() {
        let pots = build_pots(&[
            contribution("a", 100, false),
            contribution("b", 150, false),
            contribution("c", 200, false),
        ]);
        // A has the best hand but is only in the main pot; B beats C
        let payouts =
            distribute(&pots, &[ranked("a", 0), ranked("b", 1), ranked("c", 2)]).unwrap();
        let get = |id: &str| {
            payouts
                .iter()
                .find(|p| p.player_id == id)
                .map(|p| p.amount)
                .unwrap_or(0)
        };
        assert_eq!(get("a"), 300);
        assert_eq!(get("b"), 100);
        assert_eq!(get("c"), 50);
    }

    #[test]
    fn folded_chips_stay_in_the_pot_but_not_in_eligibility() {
        let contributions = [
            contribution("a", 30, true),
            contribution("b", 100, false),
            contribution("c", 100, false),
        ];
        let pots = build_pots(&contributions);
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 90);
        assert_eq!(pots[0].eligible, vec!["b", "c"]);
        assert_eq!(pots[1].amount, 140);
        assert!(validate_pots(&contributions, &pots));

        let payouts = distribute(&pots, &[ranked("b", 0), ranked("c", 1)]).unwrap();
        assert_eq!(payouts, vec![Payout { player_id: "b".into(), amount: 230 }]);
    }

    #[test]
    fn odd_chip_goes_to_the_first_winner_in_canonical_order() {
        let pots = vec![Pot {
            amount: 301,
            eligible: vec!["alice".to_string(), "bob".to_string()],
            is_main: true,
        }];
        let payouts = distribute(&pots, &[ranked("bob", 0), ranked("alice", 0)]).unwrap();
        // tie on rank, so player id decides: alice is first in canonical order
        let get = |id: &str| payouts.iter().find(|p| p.player_id == id).unwrap().amount;
        assert_eq!(get("alice"), 151);
        assert_eq!(get("bob"), 150);
    }

    #[test]
    fn three_way_tie_spreads_the_remainder_across_the_first_two() {
        let pots = vec![Pot {
            amount: 200,
            eligible: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            is_main: true,
        }];
        let payouts =
            distribute(&pots, &[ranked("a", 0), ranked("b", 0), ranked("c", 0)]).unwrap();
        let get = |id: &str| payouts.iter().find(|p| p.player_id == id).unwrap().amount;
        assert_eq!(get("a"), 67);
        assert_eq!(get("b"), 67);
        assert_eq!(get("c"), 66);
    }

    #[test]
    fn distribution_conserves_chips() {
        let contributions = [
            contribution("a", 75, false),
            contribution("b", 220, false),
            contribution("c", 220, false),
            contribution("d", 40, true),
        ];
        let pots = build_pots(&contributions);
        assert!(validate_pots(&contributions, &pots));
        let payouts =
            distribute(&pots, &[ranked("a", 0), ranked("b", 0), ranked("c", 1)]).unwrap();
        let paid: u64 = payouts.iter().map(|p| p.amount as u64).sum();
        let committed: u64 = contributions.iter().map(|c| c.amount as u64).sum();
        assert_eq!(paid, committed);
    }

    #[test]
    fn pot_with_no_ranked_winner_splits_across_eligibles() {
        let pots = vec![Pot {
            amount: 100,
            eligible: vec!["x".to_string(), "y".to_string()],
            is_main: true,
        }];
        let payouts = distribute(&pots, &[ranked("z", 0)]).unwrap();
        let get = |id: &str| payouts.iter().find(|p| p.player_id == id).unwrap().amount;
        assert_eq!(get("x"), 50);
        assert_eq!(get("y"), 50);
    }

    #[test]
    fn pot_with_nobody_at_all_is_an_invariant_violation() {
        let pots = vec![Pot {
            amount: 100,
            eligible: vec![],
            is_main: true,
        }];
        assert_eq!(
            distribute(&pots, &[]),
            Err(EngineError::NoEligibleWinner)
        );
    }
}
