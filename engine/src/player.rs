use serde::{Deserialize, Serialize};

use crate::cards::Card;

pub type PlayerId = String;

/// A player action during a betting round. Bet and raise amounts are
/// deltas from the player's current bet in the round, not totals.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Fold,
    Check,
    Call,
    Bet(u32),
    Raise(u32),
    AllIn,
}

impl Action {
    /// Wire label for broadcasts.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Fold => "fold",
            Action::Check => "check",
            Action::Call => "call",
            Action::Bet(_) => "bet",
            Action::Raise(_) => "raise",
            Action::AllIn => "all_in",
        }
    }
}

/// A seat-resident participant.
///
/// Created on join, mutated only by the betting engine and pot
/// distribution, reset at hand cleanup. A player whose stack reaches zero
/// is evicted from the seat after the hand ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub chips: u32,
    /// Hole cards; empty between hands, two during one.
    pub hole_cards: Vec<Card>,
    /// Chips committed in the current betting round.
    pub current_bet: u32,
    /// Chips committed over the whole hand.
    pub total_bet: u32,
    pub folded: bool,
    pub all_in: bool,
    /// Dealt into the current hand.
    pub active: bool,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub last_action: Option<Action>,
    pub seat: usize,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, chips: u32, seat: usize) -> Self {
        Self {
            id,
            name: name.into(),
            chips,
            hole_cards: Vec::new(),
            current_bet: 0,
            total_bet: 0,
            folded: false,
            all_in: false,
            active: false,
            is_dealer: false,
            is_small_blind: false,
            is_big_blind: false,
            last_action: None,
            seat,
        }
    }

    /// Move up to `amount` chips from the stack into the current bet,
    /// capped at the stack. Returns the amount actually moved; hitting
    /// zero chips marks the player all-in.
    pub fn commit(&mut self, amount: u32) -> u32 {
        let moved = amount.min(self.chips);
        self.chips -= moved;
        self.current_bet += moved;
        self.total_bet += moved;
        if self.chips == 0 && moved > 0 {
            self.all_in = true;
        }
        moved
    }

    /// Still contending for the pot: dealt in and not folded.
    pub fn in_hand(&self) -> bool {
        self.active && !self.folded
    }

    /// Able to take an action this round.
    pub fn can_act(&self) -> bool {
        self.in_hand() && !self.all_in
    }

    pub fn has_cards(&self) -> bool {
        !self.hole_cards.is_empty()
    }

    /// Clear everything that belongs to a single hand.
    pub fn reset_for_new_hand(&mut self) {
        self.hole_cards.clear();
        self.current_bet = 0;
        self.total_bet = 0;
        self.folded = false;
        self.all_in = false;
        self.active = false;
        self.is_dealer = false;
        self.is_small_blind = false;
        self.is_big_blind = false;
        self.last_action = None;
    }
}
