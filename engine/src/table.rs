use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::betting::{self, ActionRecord, BettingOptions, BettingRound};
use crate::cards::Card;
use crate::deck::Deck;
use crate::errors::EngineError;
use crate::hand::{self, HandCategory};
use crate::player::{Action, Player, PlayerId};
use crate::pot::{build_pots, distribute, validate_pots, Contribution, Pot, RankedPlayer};
use crate::view::{self, TableView};

/// Hand lifecycle states. Preflop through river are the action stages.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStage {
    WaitingForPlayers,
    StartingHand,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    Payouts,
    HandCleanup,
}

impl GameStage {
    pub fn is_action_stage(self) -> bool {
        matches!(
            self,
            GameStage::Preflop | GameStage::Flop | GameStage::Turn | GameStage::River
        )
    }
}

/// The scheduled events a table asks its owner to deliver back later.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Auto-fold the current player when their clock runs out.
    ActionTimeout,
    /// Hold the winners on screen before cleaning up.
    PayoutDisplay,
    /// Pause between one hand's cleanup and the next deal.
    InterHand,
}

/// Table parameters. The defaults describe the standard five-seat table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub max_players: usize,
    pub small_blind: u32,
    pub big_blind: u32,
    pub starting_stack: u32,
    pub action_timeout: Duration,
    pub payout_display: Duration,
    pub inter_hand_delay: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_players: 5,
            small_blind: 5,
            big_blind: 10,
            starting_stack: 1000,
            action_timeout: Duration::from_secs(20),
            payout_display: Duration::from_secs(3),
            inter_hand_delay: Duration::from_secs(2),
        }
    }
}

/// How a hand was won, as shown in the winners view. Fold wins carry an
/// explicit marker instead of a fabricated hand rank; cards are revealed
/// only for hands that actually reached showdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WinOutcome {
    Showdown {
        category: HandCategory,
        best_five: Vec<Card>,
    },
    FoldWin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandWinner {
    pub player_id: PlayerId,
    pub amount: u32,
    pub outcome: WinOutcome,
}

/// Outbound effects, drained by the table's owner after every entry
/// point. The queue form keeps observers from reentering the state
/// machine mid-mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    StateChanged,
    ActionRequest {
        player_id: PlayerId,
        seat: usize,
        options: BettingOptions,
        time_left: Duration,
    },
    ActionResult {
        player_id: PlayerId,
        action: Action,
        amount: u32,
    },
    StageDealt {
        stage: GameStage,
        community: Vec<Card>,
    },
    ShowdownResult {
        winners: Vec<HandWinner>,
    },
    PotUpdate {
        main_pot: u32,
        side_pots: Vec<u32>,
        total_pot: u32,
    },
    PlayerJoined {
        player_id: PlayerId,
        name: String,
        seat: usize,
    },
    PlayerLeft {
        player_id: PlayerId,
        seat: usize,
    },
    /// Ask the owner to deliver `handle_timer(kind, generation)` after
    /// `delay`. A generation mismatch at delivery means the timer was
    /// cancelled in the meantime and the delivery is a no-op.
    Schedule {
        kind: TimerKind,
        delay: Duration,
        generation: u64,
    },
    HandAborted {
        reason: String,
    },
}

/// A single table: authoritative state plus the deterministic state
/// machine that drives a hand from deal to payout.
///
/// The table never talks to a transport. External inputs arrive through
/// the entry points (`add_player`, `remove_player`, `apply_player_action`,
/// `handle_timer`); everything the outside world should learn comes back
/// out of [`Table::drain_events`].
#[derive(Debug)]
pub struct Table {
    pub(crate) id: String,
    pub(crate) config: TableConfig,
    pub(crate) stage: GameStage,
    pub(crate) seats: Vec<Option<Player>>,
    pub(crate) community: Vec<Card>,
    pub(crate) pots: Vec<Pot>,
    pub(crate) dealer_seat: Option<usize>,
    pub(crate) small_blind_seat: Option<usize>,
    pub(crate) big_blind_seat: Option<usize>,
    pub(crate) current_seat: Option<usize>,
    pub(crate) round: BettingRound,
    pub(crate) hand_number: u64,
    pub(crate) hand_active: bool,
    pub(crate) last_action: Option<ActionRecord>,
    pub(crate) winners: Option<Vec<HandWinner>>,
    /// Chips committed by players who left mid-hand; they stay in the
    /// pot amounts but never in an eligibility set.
    departed: Vec<Contribution>,
    deck: Deck,
    shuffle_seed: Option<u64>,
    next_deck: Option<Deck>,
    timer_generation: u64,
    events: Vec<TableEvent>,
}

impl Table {
    /// A production table: every hand is shuffled from OS entropy.
    pub fn new(id: impl Into<String>, config: TableConfig) -> Self {
        Self::build(id.into(), config, None)
    }

    /// A deterministic table: hand N is shuffled with `seed + N`.
    pub fn with_seed(id: impl Into<String>, config: TableConfig, seed: u64) -> Self {
        Self::build(id.into(), config, Some(seed))
    }

    fn build(id: String, config: TableConfig, shuffle_seed: Option<u64>) -> Self {
        let seats = (0..config.max_players).map(|_| None).collect();
        Self {
            id,
            config,
            stage: GameStage::WaitingForPlayers,
            seats,
            community: Vec::new(),
            pots: Vec::new(),
            dealer_seat: None,
            small_blind_seat: None,
            big_blind_seat: None,
            current_seat: None,
            round: BettingRound::default(),
            hand_number: 0,
            hand_active: false,
            last_action: None,
            winners: None,
            departed: Vec::new(),
            deck: Deck::new(),
            shuffle_seed,
            next_deck: None,
            timer_generation: 0,
            events: Vec::new(),
        }
    }

    /// Use `deck` for the next hand instead of shuffling. Lets tests
    /// deal a chosen board through the real lifecycle.
    pub fn preload_deck(&mut self, deck: Deck) {
        self.next_deck = Some(deck);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(&self) -> GameStage {
        self.stage
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn hand_number(&self) -> u64 {
        self.hand_number
    }

    pub fn hand_active(&self) -> bool {
        self.hand_active
    }

    pub fn seated_count(&self) -> usize {
        self.seats.iter().flatten().count()
    }

    pub fn community_cards(&self) -> &[Card] {
        &self.community
    }

    pub fn pots(&self) -> &[Pot] {
        &self.pots
    }

    pub fn winners(&self) -> Option<&[HandWinner]> {
        self.winners.as_deref()
    }

    pub fn current_seat(&self) -> Option<usize> {
        self.current_seat
    }

    pub fn find_player(&self, player_id: &str) -> Option<&Player> {
        self.seats
            .iter()
            .flatten()
            .find(|p| p.id == player_id)
    }

    pub fn is_seated(&self, player_id: &str) -> bool {
        self.find_player(player_id).is_some()
    }

    /// The authoritative view, all hole cards included. Pass it through
    /// [`crate::view::sanitize`] before it leaves the server.
    pub fn full_view(&self) -> TableView {
        view::full_view(self)
    }

    /// The sanitized projection for one observer.
    pub fn view_for(&self, observer_id: &str) -> TableView {
        view::sanitize(&self.full_view(), observer_id)
    }

    /// Take everything emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<TableEvent> {
        std::mem::take(&mut self.events)
    }

    // --- entry points ---

    /// Seat a new player. Starts the first hand once two players sit.
    pub fn add_player(&mut self, name: &str) -> Result<(PlayerId, usize), EngineError> {
        let result = self.add_player_inner(name);
        self.guard(result)
    }

    /// Remove a player. Mid-hand their committed chips stay in the pot;
    /// dealer and blind markers move on to the next active seat.
    pub fn remove_player(&mut self, player_id: &str) -> Result<(), EngineError> {
        let result = self.remove_player_inner(player_id);
        self.guard(result)
    }

    /// Apply one action for the player whose turn it is.
    pub fn apply_player_action(
        &mut self,
        player_id: &str,
        action: Action,
    ) -> Result<(), EngineError> {
        let result = self.apply_action_inner(player_id, action);
        self.guard(result)
    }

    /// Deliver a previously scheduled timer. Stale generations are
    /// no-ops: a cancelled timer must never fire an effect.
    pub fn handle_timer(&mut self, kind: TimerKind, generation: u64) -> Result<(), EngineError> {
        if generation != self.timer_generation {
            return Ok(());
        }
        match kind {
            TimerKind::ActionTimeout => {
                let current_id = self
                    .current_seat
                    .and_then(|seat| self.seats[seat].as_ref())
                    .map(|p| p.id.clone());
                match current_id {
                    Some(id) => self.apply_player_action(&id, Action::Fold),
                    None => Ok(()),
                }
            }
            TimerKind::PayoutDisplay => {
                self.cleanup_hand();
                Ok(())
            }
            TimerKind::InterHand => {
                let result = self.try_start_hand();
                self.guard(result)
            }
        }
    }

    // --- internals ---

    /// Invariant violations are fatal for the hand: terminate it instead
    /// of continuing in an undefined state. Rule violations pass through
    /// untouched.
    fn guard<T>(&mut self, result: Result<T, EngineError>) -> Result<T, EngineError> {
        if let Err(err) = &result {
            if err.is_invariant_violation() {
                self.abort_hand(err.clone());
            }
        }
        result
    }

    fn emit(&mut self, event: TableEvent) {
        self.events.push(event);
    }

    fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        self.timer_generation += 1;
        let generation = self.timer_generation;
        self.emit(TableEvent::Schedule {
            kind,
            delay,
            generation,
        });
    }

    /// Invalidate any outstanding timer without scheduling a new one.
    fn cancel_timers(&mut self) {
        self.timer_generation += 1;
    }

    fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.seats
            .iter()
            .flatten()
            .find(|p| p.id == player_id)
            .map(|p| p.seat)
    }

    fn contender_seats(&self) -> Vec<usize> {
        self.seats
            .iter()
            .flatten()
            .filter(|p| p.in_hand())
            .map(|p| p.seat)
            .collect()
    }

    fn active_count(&self) -> usize {
        self.seats.iter().flatten().filter(|p| p.active).count()
    }

    fn next_active_seat_after(&self, from: usize) -> Option<usize> {
        let n = self.seats.len();
        (1..=n)
            .map(|offset| (from + offset) % n)
            .find(|&seat| self.seats[seat].as_ref().is_some_and(|p| p.active))
    }

    /// Active seats in clockwise deal order, starting left of `from`.
    fn active_seats_from(&self, from: usize) -> Vec<usize> {
        let n = self.seats.len();
        (1..=n)
            .map(|offset| (from + offset) % n)
            .filter(|&seat| self.seats[seat].as_ref().is_some_and(|p| p.active))
            .collect()
    }

    fn contributions(&self) -> Vec<Contribution> {
        let mut out = self.departed.clone();
        for p in self.seats.iter().flatten() {
            if p.total_bet > 0 {
                out.push(Contribution {
                    player_id: p.id.clone(),
                    amount: p.total_bet,
                    folded: !p.in_hand(),
                });
            }
        }
        out
    }

    fn committed_total(&self) -> u32 {
        self.contributions().iter().map(|c| c.amount).sum()
    }

    fn emit_pot_update(&mut self) {
        let (main_pot, side_pots): (u32, Vec<u32>) = if self.pots.is_empty() {
            (self.committed_total(), Vec::new())
        } else {
            let main = self
                .pots
                .iter()
                .find(|p| p.is_main)
                .map(|p| p.amount)
                .unwrap_or(0);
            let sides = self
                .pots
                .iter()
                .filter(|p| !p.is_main)
                .map(|p| p.amount)
                .collect();
            (main, sides)
        };
        let total_pot = main_pot + side_pots.iter().sum::<u32>();
        self.emit(TableEvent::PotUpdate {
            main_pot,
            side_pots,
            total_pot,
        });
    }

    fn add_player_inner(&mut self, name: &str) -> Result<(PlayerId, usize), EngineError> {
        let seat = self
            .seats
            .iter()
            .position(|s| s.is_none())
            .ok_or(EngineError::TableFull)?;
        let id = Uuid::new_v4().to_string();
        let player = Player::new(id.clone(), name, self.config.starting_stack, seat);
        self.seats[seat] = Some(player);
        self.emit(TableEvent::PlayerJoined {
            player_id: id.clone(),
            name: name.to_string(),
            seat,
        });
        self.emit(TableEvent::StateChanged);
        if self.stage == GameStage::WaitingForPlayers && self.seated_count() >= 2 {
            self.try_start_hand()?;
        }
        Ok((id, seat))
    }

    fn remove_player_inner(&mut self, player_id: &str) -> Result<(), EngineError> {
        let seat = self
            .seat_of(player_id)
            .ok_or_else(|| EngineError::NotSeated(player_id.to_string()))?;
        let Some(player) = self.seats[seat].take() else {
            return Err(EngineError::NotSeated(player_id.to_string()));
        };
        let was_current = self.current_seat == Some(seat);
        let was_contender = player.in_hand();
        let pot_still_open = self.hand_active && self.stage.is_action_stage();

        if pot_still_open && player.total_bet > 0 {
            self.departed.push(Contribution {
                player_id: player.id.clone(),
                amount: player.total_bet,
                folded: true,
            });
        }
        self.emit(TableEvent::PlayerLeft {
            player_id: player.id.clone(),
            seat,
        });

        // markers pass to the next active seat; the hand itself goes on
        if self.hand_active {
            if self.dealer_seat == Some(seat) {
                self.dealer_seat = self.next_active_seat_after(seat);
            }
            if self.small_blind_seat == Some(seat) {
                self.small_blind_seat = self.next_active_seat_after(seat);
            }
            if self.big_blind_seat == Some(seat) {
                self.big_blind_seat = self.next_active_seat_after(seat);
            }
        }

        if pot_still_open && was_contender {
            if was_current {
                self.cancel_timers();
                self.current_seat = None;
            }
            self.progress_after_departure(seat, was_current)?;
        }

        if !self.hand_active && self.seated_count() < 2 {
            self.stage = GameStage::WaitingForPlayers;
            self.cancel_timers();
        }
        self.emit(TableEvent::StateChanged);
        Ok(())
    }

    fn progress_after_departure(
        &mut self,
        seat: usize,
        was_current: bool,
    ) -> Result<(), EngineError> {
        let contenders = self.contender_seats();
        match contenders.len() {
            0 => {
                // everyone in the hand is gone; nothing left to award
                self.emit(TableEvent::HandAborted {
                    reason: "all players left the hand".to_string(),
                });
                self.cancel_timers();
                self.cleanup_hand();
                Ok(())
            }
            1 => self.finish_by_fold(),
            _ => {
                let all_all_in = contenders
                    .iter()
                    .all(|&s| self.seats[s].as_ref().is_some_and(|p| p.all_in));
                if all_all_in {
                    self.fast_forward_to_showdown()
                } else if betting::is_round_complete(&self.seats, &self.round) {
                    self.advance_stage()
                } else if was_current {
                    match betting::next_to_act(&self.seats, seat, &self.round) {
                        Some(next) => {
                            self.set_current(next);
                            Ok(())
                        }
                        None => self.advance_stage(),
                    }
                } else {
                    Ok(())
                }
            }
        }
    }

    fn apply_action_inner(&mut self, player_id: &str, action: Action) -> Result<(), EngineError> {
        if !self.hand_active || !self.stage.is_action_stage() {
            return Err(EngineError::HandNotActive);
        }
        let seat = self
            .seat_of(player_id)
            .ok_or_else(|| EngineError::NotSeated(player_id.to_string()))?;
        if self.current_seat != Some(seat) {
            return Err(EngineError::NotYourTurn(player_id.to_string()));
        }
        let big_blind = self.config.big_blind;
        let player = self.seats[seat]
            .as_mut()
            .ok_or_else(|| EngineError::NotSeated(player_id.to_string()))?;
        let moved = betting::apply_action(player, action, &mut self.round, big_blind)?;

        self.cancel_timers();
        self.last_action = self.round.actions.last().cloned();
        self.emit(TableEvent::ActionResult {
            player_id: player_id.to_string(),
            action,
            amount: moved,
        });
        self.emit_pot_update();
        self.emit(TableEvent::StateChanged);
        self.progress_after_action(seat)
    }

    fn progress_after_action(&mut self, from_seat: usize) -> Result<(), EngineError> {
        let contenders = self.contender_seats();
        if contenders.len() < 2 {
            return self.finish_by_fold();
        }
        let all_all_in = contenders
            .iter()
            .all(|&s| self.seats[s].as_ref().is_some_and(|p| p.all_in));
        if all_all_in {
            return self.fast_forward_to_showdown();
        }
        if betting::is_round_complete(&self.seats, &self.round) {
            return self.advance_stage();
        }
        match betting::next_to_act(&self.seats, from_seat, &self.round) {
            Some(next) => {
                self.set_current(next);
                Ok(())
            }
            None => self.advance_stage(),
        }
    }

    fn set_current(&mut self, seat: usize) {
        self.current_seat = Some(seat);
        let Some((player_id, options)) = self.seats[seat]
            .as_ref()
            .map(|p| (p.id.clone(), betting::betting_options(p, &self.round, self.config.big_blind)))
        else {
            return;
        };
        let time_left = self.config.action_timeout;
        self.emit(TableEvent::ActionRequest {
            player_id,
            seat,
            options,
            time_left,
        });
        self.schedule(TimerKind::ActionTimeout, time_left);
    }

    fn try_start_hand(&mut self) -> Result<(), EngineError> {
        if self.hand_active {
            return Ok(());
        }
        let funded = self
            .seats
            .iter()
            .flatten()
            .filter(|p| p.chips > 0)
            .count();
        if funded < 2 {
            self.stage = GameStage::WaitingForPlayers;
            self.emit(TableEvent::StateChanged);
            return Ok(());
        }
        self.start_hand()
    }

    fn start_hand(&mut self) -> Result<(), EngineError> {
        self.stage = GameStage::StartingHand;
        self.hand_number += 1;
        self.hand_active = true;
        self.community.clear();
        self.pots.clear();
        self.departed.clear();
        self.winners = None;
        self.last_action = None;

        for p in self.seats.iter_mut().flatten() {
            p.reset_for_new_hand();
            p.active = p.chips > 0;
        }

        // button moves to the next active seat clockwise
        let from = self.dealer_seat.unwrap_or(self.seats.len() - 1);
        let Some(dealer) = self.next_active_seat_after(from) else {
            self.hand_active = false;
            self.stage = GameStage::WaitingForPlayers;
            self.emit(TableEvent::StateChanged);
            return Ok(());
        };
        self.dealer_seat = Some(dealer);

        // heads-up the dealer posts the small blind; otherwise the two
        // seats after the button do
        let (sb_seat, bb_seat) = if self.active_count() == 2 {
            let other = self.next_active_seat_after(dealer).unwrap_or(dealer);
            (dealer, other)
        } else {
            let sb = self.next_active_seat_after(dealer).unwrap_or(dealer);
            let bb = self.next_active_seat_after(sb).unwrap_or(sb);
            (sb, bb)
        };
        self.small_blind_seat = Some(sb_seat);
        self.big_blind_seat = Some(bb_seat);
        if let Some(p) = self.seats[dealer].as_mut() {
            p.is_dealer = true;
        }
        if let Some(p) = self.seats[sb_seat].as_mut() {
            p.is_small_blind = true;
        }
        if let Some(p) = self.seats[bb_seat].as_mut() {
            p.is_big_blind = true;
        }

        match self.next_deck.take() {
            Some(deck) => self.deck = deck,
            None => match self.shuffle_seed {
                Some(seed) => self.deck.shuffle_seeded(seed.wrapping_add(self.hand_number)),
                None => self.deck.shuffle_random(),
            },
        }

        // two passes, starting left of the button
        let order = self.active_seats_from(dealer);
        for _ in 0..2 {
            for &seat in &order {
                let card = self.deck.deal()?;
                if let Some(p) = self.seats[seat].as_mut() {
                    p.hole_cards.push(card);
                }
            }
        }

        // post blinds; a short stack posts what it has and is all-in
        let small_blind = self.config.small_blind;
        let big_blind = self.config.big_blind;
        if let Some(p) = self.seats[sb_seat].as_mut() {
            p.commit(small_blind);
        }
        if let Some(p) = self.seats[bb_seat].as_mut() {
            p.commit(big_blind);
        }
        self.round = BettingRound::new(big_blind, big_blind);

        self.stage = GameStage::Preflop;
        self.emit(TableEvent::StateChanged);
        self.emit_pot_update();

        // first to act sits left of the big blind, which in heads-up is
        // the dealer
        match betting::next_to_act(&self.seats, bb_seat, &self.round) {
            Some(seat) => {
                self.set_current(seat);
                Ok(())
            }
            None => self.progress_after_action(bb_seat),
        }
    }

    fn advance_stage(&mut self) -> Result<(), EngineError> {
        self.current_seat = None;
        self.cancel_timers();
        match self.stage {
            GameStage::Preflop => self.begin_street(GameStage::Flop, 3),
            GameStage::Flop => self.begin_street(GameStage::Turn, 1),
            GameStage::Turn => self.begin_street(GameStage::River, 1),
            GameStage::River => self.showdown(),
            _ => Ok(()),
        }
    }

    fn begin_street(&mut self, stage: GameStage, cards: usize) -> Result<(), EngineError> {
        betting::reset_for_next_stage(&mut self.round, &mut self.seats, false);
        self.deck.deal()?; // burn
        let mut dealt = self.deck.deal_many(cards)?;
        self.community.append(&mut dealt);
        self.stage = stage;
        self.emit(TableEvent::StageDealt {
            stage,
            community: self.community.clone(),
        });
        self.emit(TableEvent::StateChanged);

        let from = self.dealer_seat.unwrap_or(0);
        match betting::next_to_act(&self.seats, from, &self.round) {
            Some(seat) => {
                self.set_current(seat);
                Ok(())
            }
            None => self.advance_stage(),
        }
    }

    /// Everyone left is all-in: run the board out with no more betting.
    fn fast_forward_to_showdown(&mut self) -> Result<(), EngineError> {
        self.current_seat = None;
        self.cancel_timers();
        while self.community.len() < 5 {
            self.deck.deal()?; // burn
            let cards = if self.community.is_empty() { 3 } else { 1 };
            let mut dealt = self.deck.deal_many(cards)?;
            self.community.append(&mut dealt);
            let stage = match self.community.len() {
                3 => GameStage::Flop,
                4 => GameStage::Turn,
                _ => GameStage::River,
            };
            self.stage = stage;
            self.emit(TableEvent::StageDealt {
                stage,
                community: self.community.clone(),
            });
        }
        self.showdown()
    }

    fn showdown(&mut self) -> Result<(), EngineError> {
        self.stage = GameStage::Showdown;
        self.current_seat = None;
        self.cancel_timers();

        let mut evaluated = Vec::new();
        for seat in self.contender_seats() {
            let Some(p) = self.seats[seat].as_ref() else {
                continue;
            };
            let value = hand::evaluate_with_board(&p.hole_cards, &self.community)?;
            evaluated.push((p.id.clone(), value));
        }
        evaluated.sort_by(|a, b| b.1.score.cmp(&a.1.score).then(a.0.cmp(&b.0)));

        let mut rankings = Vec::with_capacity(evaluated.len());
        let mut rank = 0u32;
        let mut previous_score = None;
        for (id, value) in &evaluated {
            if let Some(prev) = previous_score {
                if prev != value.score {
                    rank += 1;
                }
            }
            previous_score = Some(value.score);
            rankings.push(RankedPlayer {
                player_id: id.clone(),
                rank,
            });
        }

        let contributions = self.contributions();
        self.pots = build_pots(&contributions);
        if !validate_pots(&contributions, &self.pots) {
            return Err(EngineError::PotMismatch {
                pot_total: self.pots.iter().map(|p| p.amount as u64).sum(),
                committed: contributions.iter().map(|c| c.amount as u64).sum(),
            });
        }
        let payouts = distribute(&self.pots, &rankings)?;

        // broadcast the final pot partition before the chips move
        self.emit_pot_update();

        let mut winners = Vec::with_capacity(payouts.len());
        for payout in &payouts {
            if let Some(seat) = self.seat_of(&payout.player_id) {
                if let Some(p) = self.seats[seat].as_mut() {
                    p.chips += payout.amount;
                }
            }
            let outcome = match evaluated.iter().find(|(id, _)| *id == payout.player_id) {
                Some((_, value)) => WinOutcome::Showdown {
                    category: value.category,
                    best_five: value.best_five.to_vec(),
                },
                None => WinOutcome::FoldWin,
            };
            winners.push(HandWinner {
                player_id: payout.player_id.clone(),
                amount: payout.amount,
                outcome,
            });
        }
        self.winners = Some(winners.clone());
        self.emit(TableEvent::ShowdownResult { winners });
        self.settle_hand_accounts();
        self.stage = GameStage::Payouts;
        self.emit(TableEvent::StateChanged);
        self.schedule(TimerKind::PayoutDisplay, self.config.payout_display);
        Ok(())
    }

    /// All but one player folded (or left): the survivor takes the whole
    /// pot, folded contributions included, and nothing is revealed.
    fn finish_by_fold(&mut self) -> Result<(), EngineError> {
        self.cancel_timers();
        self.current_seat = None;
        let total = self.committed_total();
        let winner_seat = self.contender_seats().into_iter().next();
        match winner_seat {
            Some(seat) => {
                if let Some(p) = self.seats[seat].as_mut() {
                    p.chips += total;
                    let winner = HandWinner {
                        player_id: p.id.clone(),
                        amount: total,
                        outcome: WinOutcome::FoldWin,
                    };
                    self.winners = Some(vec![winner.clone()]);
                    self.emit(TableEvent::ShowdownResult {
                        winners: vec![winner],
                    });
                }
            }
            None => {
                self.emit(TableEvent::HandAborted {
                    reason: "no players left in the hand".to_string(),
                });
            }
        }
        self.settle_hand_accounts();
        self.stage = GameStage::Payouts;
        self.emit(TableEvent::StateChanged);
        self.schedule(TimerKind::PayoutDisplay, self.config.payout_display);
        Ok(())
    }

    /// Once winners are credited the committed chips live in stacks;
    /// the per-player totals and the pot vector must stop counting
    /// them, or every snapshot until cleanup double-counts the award.
    fn settle_hand_accounts(&mut self) {
        for p in self.seats.iter_mut().flatten() {
            p.total_bet = 0;
            p.current_bet = 0;
        }
        self.departed.clear();
        self.pots.clear();
    }

    fn cleanup_hand(&mut self) {
        self.stage = GameStage::HandCleanup;
        self.winners = None;
        self.hand_active = false;
        self.current_seat = None;
        self.community.clear();
        self.pots.clear();
        self.departed.clear();
        self.round = BettingRound::default();
        self.last_action = None;

        for p in self.seats.iter_mut().flatten() {
            p.reset_for_new_hand();
        }
        let mut evicted = Vec::new();
        for slot in self.seats.iter_mut() {
            if let Some(p) = slot {
                if p.chips == 0 {
                    evicted.push((p.id.clone(), p.seat));
                    *slot = None;
                }
            }
        }
        for (player_id, seat) in evicted {
            self.emit(TableEvent::PlayerLeft { player_id, seat });
        }

        if self.seated_count() >= 2 {
            self.schedule(TimerKind::InterHand, self.config.inter_hand_delay);
        } else {
            self.stage = GameStage::WaitingForPlayers;
        }
        self.emit(TableEvent::StateChanged);
    }

    /// Terminate a hand after an invariant violation: refund what every
    /// seated player committed and move on. Chips committed by players
    /// who already left leave the table with them.
    fn abort_hand(&mut self, err: EngineError) {
        if !self.hand_active {
            return;
        }
        self.cancel_timers();
        self.emit(TableEvent::HandAborted {
            reason: err.to_string(),
        });
        for p in self.seats.iter_mut().flatten() {
            p.chips += p.total_bet;
            p.total_bet = 0;
            p.current_bet = 0;
        }
        self.pots.clear();
        self.winners = None;
        self.cleanup_hand();
    }
}
