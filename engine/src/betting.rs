use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::player::{Action, Player, PlayerId};

/// One applied action, as appended to the round log. `amount` is the
/// number of chips actually moved by the action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub player_id: PlayerId,
    pub seat: usize,
    pub action: Action,
    pub amount: u32,
}

/// Per-stage betting scratch state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BettingRound {
    /// Highest individual bet this round; the amount everyone must match.
    pub current_bet: u32,
    /// Size of the last full raise, the minimum increment for the next one.
    pub last_raise_amount: u32,
    pub actions: Vec<ActionRecord>,
    pub last_raiser: Option<usize>,
    /// Seats whose raising rights are closed until the next full raise.
    /// A short all-in raises the bet without reopening action for players
    /// who have already acted; they may only call or fold.
    no_raise_seats: Vec<usize>,
}

impl BettingRound {
    pub fn new(current_bet: u32, last_raise_amount: u32) -> Self {
        Self {
            current_bet,
            last_raise_amount,
            ..Self::default()
        }
    }

    pub fn has_acted(&self, seat: usize) -> bool {
        self.actions.iter().any(|r| r.seat == seat)
    }

    fn may_raise(&self, seat: usize) -> bool {
        !self.no_raise_seats.contains(&seat)
    }
}

/// The legal moves for one player, as advertised in action requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BettingOptions {
    pub can_check: bool,
    pub can_call: bool,
    pub can_bet: bool,
    pub can_raise: bool,
    pub min_bet: u32,
    /// Minimum raise, as a delta from the player's current round bet.
    pub min_raise: u32,
    pub max_bet: u32,
    pub call_amount: u32,
}

/// Compute the legal moves for `player` against the round state.
pub fn betting_options(player: &Player, round: &BettingRound, big_blind: u32) -> BettingOptions {
    if player.all_in || player.folded || !player.active {
        return BettingOptions::default();
    }
    let stack = player.chips;
    if round.current_bet == 0 {
        return BettingOptions {
            can_check: true,
            can_bet: stack > 0,
            min_bet: big_blind.min(stack),
            max_bet: stack,
            ..BettingOptions::default()
        };
    }

    let to_call = round.current_bet.saturating_sub(player.current_bet);
    let full_raise = round.last_raise_amount.max(big_blind);
    let can_raise = stack > 0
        && round.may_raise(player.seat)
        && stack + player.current_bet >= round.current_bet + full_raise;
    BettingOptions {
        can_check: to_call == 0,
        can_call: to_call > 0 && stack > 0,
        can_raise,
        min_raise: (round.current_bet - player.current_bet + full_raise).min(stack),
        max_bet: stack,
        call_amount: to_call.min(stack),
        ..BettingOptions::default()
    }
}

/// Apply one action for `player`, updating the player and the round.
/// Returns the chips moved. Rule violations leave both untouched.
pub fn apply_action(
    player: &mut Player,
    action: Action,
    round: &mut BettingRound,
    big_blind: u32,
) -> Result<u32, EngineError> {
    if player.folded {
        return Err(EngineError::AlreadyFolded);
    }
    let options = betting_options(player, round, big_blind);

    let moved = match action {
        Action::Fold => {
            player.folded = true;
            0
        }
        Action::Check => {
            if !options.can_check {
                return Err(EngineError::CannotCheck);
            }
            0
        }
        Action::Call => {
            if !options.can_call {
                return Err(EngineError::NothingToCall);
            }
            player.commit(options.call_amount)
        }
        Action::Bet(amount) => {
            if !options.can_bet {
                return Err(EngineError::BetNotAllowed);
            }
            if amount > player.chips {
                return Err(EngineError::InsufficientChips);
            }
            if amount < options.min_bet {
                return Err(EngineError::BetBelowMinimum {
                    amount,
                    minimum: options.min_bet,
                });
            }
            let moved = player.commit(amount);
            register_aggression(player, round, big_blind);
            moved
        }
        Action::Raise(amount) => {
            if !options.can_raise {
                return Err(EngineError::RaiseNotAllowed);
            }
            if amount > player.chips {
                return Err(EngineError::InsufficientChips);
            }
            if amount < options.min_raise {
                return Err(EngineError::RaiseBelowMinimum {
                    amount,
                    minimum: options.min_raise,
                });
            }
            let moved = player.commit(amount);
            register_aggression(player, round, big_blind);
            moved
        }
        Action::AllIn => {
            if player.chips == 0 {
                return Err(EngineError::InsufficientChips);
            }
            let moved = player.commit(player.chips);
            // counts as a bet/raise only if it pushes the price up;
            // otherwise it is an under-sized call
            register_aggression(player, round, big_blind);
            moved
        }
    };

    player.last_action = Some(action);
    round.actions.push(ActionRecord {
        player_id: player.id.clone(),
        seat: player.seat,
        action,
        amount: moved,
    });
    Ok(moved)
}

/// After chips moved, fold the player's new round bet into the round
/// state. Only an increment of at least the previous full raise reopens
/// action; a short all-in closes raising for everyone who already acted.
fn register_aggression(player: &Player, round: &mut BettingRound, big_blind: u32) {
    if player.current_bet <= round.current_bet {
        return;
    }
    let increment = player.current_bet - round.current_bet;
    let full_raise = round.last_raise_amount.max(big_blind);
    if increment >= full_raise {
        round.last_raise_amount = increment;
        round.no_raise_seats.clear();
    } else {
        let acted: Vec<usize> = round
            .actions
            .iter()
            .map(|r| r.seat)
            .filter(|&s| s != player.seat)
            .collect();
        for seat in acted {
            if !round.no_raise_seats.contains(&seat) {
                round.no_raise_seats.push(seat);
            }
        }
    }
    round.current_bet = player.current_bet;
    round.last_raiser = Some(player.seat);
}

/// A round is complete when at most one contender remains, or when every
/// contender who can still act has acted and matched the current bet.
pub fn is_round_complete(seats: &[Option<Player>], round: &BettingRound) -> bool {
    let contenders: Vec<&Player> = seats.iter().flatten().filter(|p| p.in_hand()).collect();
    if contenders.len() <= 1 {
        return true;
    }
    contenders
        .iter()
        .filter(|p| !p.all_in)
        .all(|p| round.has_acted(p.seat) && p.current_bet == round.current_bet)
}

/// Walk clockwise from `from + 1`, skipping empty, inactive, folded and
/// all-in seats, and stop at the first player who still owes an action:
/// either they have not acted this round or their bet is short.
pub fn next_to_act(
    seats: &[Option<Player>],
    from: usize,
    round: &BettingRound,
) -> Option<usize> {
    let n = seats.len();
    for offset in 1..=n {
        let seat = (from + offset) % n;
        let Some(player) = seats[seat].as_ref() else {
            continue;
        };
        if !player.can_act() {
            continue;
        }
        if !round.has_acted(seat) || player.current_bet < round.current_bet {
            return Some(seat);
        }
    }
    None
}

/// Reset the round for the next stage. Between streets everything is
/// zeroed; at preflop the blinds already posted stay in place and only
/// the action log is cleared.
pub fn reset_for_next_stage(
    round: &mut BettingRound,
    seats: &mut [Option<Player>],
    is_preflop: bool,
) {
    round.actions.clear();
    round.last_raiser = None;
    round.no_raise_seats.clear();
    if is_preflop {
        return;
    }
    round.current_bet = 0;
    round.last_raise_amount = 0;
    for player in seats.iter_mut().flatten() {
        if player.active {
            player.current_bet = 0;
            player.last_action = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(seat: usize, chips: u32) -> Player {
        let mut p = Player::new(format!("p{seat}"), format!("player{seat}"), chips, seat);
        p.active = true;
        p
    }

    const BB: u32 = 10;

    #[test]
    fn no_bet_offers_check_and_bet() {
        let round = BettingRound::default();
        let p = player(0, 500);
        let opts = betting_options(&p, &round, BB);
        assert!(opts.can_check && opts.can_bet);
        assert!(!opts.can_call && !opts.can_raise);
        assert_eq!(opts.min_bet, BB);
        assert_eq!(opts.max_bet, 500);
    }

    #[test]
    fn min_bet_is_capped_by_a_short_stack() {
        let round = BettingRound::default();
        let p = player(0, 4);
        let opts = betting_options(&p, &round, BB);
        assert_eq!(opts.min_bet, 4);
    }

    #[test]
    fn facing_a_bet_offers_call_and_raise() {
        let round = BettingRound::new(BB, BB);
        let p = player(2, 500);
        let opts = betting_options(&p, &round, BB);
        assert!(!opts.can_check && opts.can_call && !opts.can_bet && opts.can_raise);
        assert_eq!(opts.call_amount, 10);
        // call the 10 and raise by at least another big blind
        assert_eq!(opts.min_raise, 20);
    }

    #[test]
    fn call_for_less_becomes_all_in() {
        let mut round = BettingRound::new(100, 100);
        let mut p = player(1, 60);
        let moved = apply_action(&mut p, Action::Call, &mut round, BB).unwrap();
        assert_eq!(moved, 60);
        assert!(p.all_in);
        assert_eq!(p.current_bet, 60);
        // an under-call never moves the price
        assert_eq!(round.current_bet, 100);
    }

    #[test]
    fn full_raise_updates_the_minimum_increment() {
        let mut round = BettingRound::new(BB, BB);
        let mut raiser = player(2, 500);
        apply_action(&mut raiser, Action::Raise(40), &mut round, BB).unwrap();
        assert_eq!(round.current_bet, 40);
        assert_eq!(round.last_raise_amount, 30);
        assert_eq!(round.last_raiser, Some(2));
    }

    #[test]
    fn short_all_in_does_not_reopen_action() {
        // preflop, BB = 10: seat 2 raises to 40, seat 1's all-in to 55 is
        // a short raise (a full re-raise would be to 70), so seat 2 may
        // only call the 15 or fold
        let mut round = BettingRound::new(BB, BB);
        let mut raiser = player(2, 1000);
        let mut shover = player(1, 55);
        shover.commit(10); // big blind already posted

        apply_action(&mut raiser, Action::Raise(40), &mut round, BB).unwrap();
        assert_eq!(round.last_raise_amount, 30);

        apply_action(&mut shover, Action::AllIn, &mut round, BB).unwrap();
        assert_eq!(round.current_bet, 55);
        // the short raise does not reset the full-raise increment
        assert_eq!(round.last_raise_amount, 30);

        let opts = betting_options(&raiser, &round, BB);
        assert!(opts.can_call);
        assert_eq!(opts.call_amount, 15);
        assert!(!opts.can_raise);
        assert!(matches!(
            apply_action(&mut raiser, Action::Raise(45), &mut round, BB),
            Err(EngineError::RaiseNotAllowed)
        ));
    }

    #[test]
    fn full_all_in_reopens_action() {
        let mut round = BettingRound::new(BB, BB);
        let mut raiser = player(2, 1000);
        let mut shover = player(1, 80);
        shover.commit(10);

        apply_action(&mut raiser, Action::Raise(40), &mut round, BB).unwrap();
        // all-in to 80 is a raise of 40 >= the last full raise of 30
        apply_action(&mut shover, Action::AllIn, &mut round, BB).unwrap();
        assert_eq!(round.current_bet, 80);
        assert_eq!(round.last_raise_amount, 40);

        let opts = betting_options(&raiser, &round, BB);
        assert!(opts.can_raise);
        assert_eq!(opts.min_raise, 80 - 40 + 40);
    }

    #[test]
    fn check_facing_a_bet_is_rejected() {
        let mut round = BettingRound::new(50, 50);
        let mut p = player(0, 500);
        assert_eq!(
            apply_action(&mut p, Action::Check, &mut round, BB),
            Err(EngineError::CannotCheck)
        );
        assert_eq!(p.chips, 500);
        assert!(round.actions.is_empty());
    }

    #[test]
    fn bet_below_minimum_is_rejected() {
        let mut round = BettingRound::default();
        let mut p = player(0, 500);
        assert_eq!(
            apply_action(&mut p, Action::Bet(5), &mut round, BB),
            Err(EngineError::BetBelowMinimum {
                amount: 5,
                minimum: BB
            })
        );
    }

    #[test]
    fn round_completes_when_everyone_matches() {
        let mut seats: Vec<Option<Player>> = vec![
            Some(player(0, 500)),
            Some(player(1, 500)),
            None,
            None,
            None,
        ];
        let mut round = BettingRound::default();
        assert!(!is_round_complete(&seats, &round));

        {
            let p0 = seats[0].as_mut().unwrap();
            apply_action(p0, Action::Bet(20), &mut round, BB).unwrap();
        }
        assert!(!is_round_complete(&seats, &round));
        {
            let p1 = seats[1].as_mut().unwrap();
            apply_action(p1, Action::Call, &mut round, BB).unwrap();
        }
        assert!(is_round_complete(&seats, &round));
    }

    #[test]
    fn round_completes_immediately_with_one_contender() {
        let mut seats: Vec<Option<Player>> = vec![Some(player(0, 500)), Some(player(1, 500))];
        seats[1].as_mut().unwrap().folded = true;
        let round = BettingRound::default();
        assert!(is_round_complete(&seats, &round));
    }

    #[test]
    fn big_blind_gets_an_option_before_the_round_closes() {
        // everyone limps; the big blind has matched but not acted
        let mut seats: Vec<Option<Player>> =
            vec![Some(player(0, 500)), Some(player(1, 500)), Some(player(2, 500))];
        seats[1].as_mut().unwrap().commit(10); // big blind
        seats[1].as_mut().unwrap().is_big_blind = true;
        let mut round = BettingRound::new(BB, BB);
        {
            let p2 = seats[2].as_mut().unwrap();
            apply_action(p2, Action::Call, &mut round, BB).unwrap();
        }
        {
            let p0 = seats[0].as_mut().unwrap();
            apply_action(p0, Action::Call, &mut round, BB).unwrap();
        }
        assert!(!is_round_complete(&seats, &round));
        assert_eq!(next_to_act(&seats, 0, &round), Some(1));
        {
            let p1 = seats[1].as_mut().unwrap();
            apply_action(p1, Action::Check, &mut round, BB).unwrap();
        }
        assert!(is_round_complete(&seats, &round));
    }

    #[test]
    fn next_to_act_skips_folded_and_all_in_seats() {
        let mut seats: Vec<Option<Player>> = vec![
            Some(player(0, 500)),
            Some(player(1, 500)),
            Some(player(2, 500)),
            None,
            Some(player(4, 500)),
        ];
        seats[1].as_mut().unwrap().folded = true;
        seats[2].as_mut().unwrap().all_in = true;
        let round = BettingRound::default();
        assert_eq!(next_to_act(&seats, 0, &round), Some(4));
        assert_eq!(next_to_act(&seats, 4, &round), Some(0));
    }

    #[test]
    fn reset_between_streets_zeroes_round_bets() {
        let mut seats: Vec<Option<Player>> = vec![Some(player(0, 500)), Some(player(1, 500))];
        let mut round = BettingRound::new(BB, BB);
        {
            let p0 = seats[0].as_mut().unwrap();
            apply_action(p0, Action::Raise(40), &mut round, BB).unwrap();
        }
        reset_for_next_stage(&mut round, &mut seats, false);
        assert_eq!(round.current_bet, 0);
        assert_eq!(round.last_raise_amount, 0);
        assert!(round.actions.is_empty());
        let p0 = seats[0].as_ref().unwrap();
        assert_eq!(p0.current_bet, 0);
        assert_eq!(p0.total_bet, 40, "hand total survives the street reset");
    }

    #[test]
    fn preflop_reset_keeps_posted_blinds() {
        let mut seats: Vec<Option<Player>> = vec![Some(player(0, 500)), Some(player(1, 500))];
        seats[0].as_mut().unwrap().commit(5);
        seats[1].as_mut().unwrap().commit(10);
        let mut round = BettingRound::new(BB, BB);
        reset_for_next_stage(&mut round, &mut seats, true);
        assert_eq!(round.current_bet, BB);
        assert_eq!(seats[0].as_ref().unwrap().current_bet, 5);
        assert_eq!(seats[1].as_ref().unwrap().current_bet, 10);
    }
}
