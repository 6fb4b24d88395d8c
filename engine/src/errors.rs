use thiserror::Error;

/// Errors surfaced by the core engine.
///
/// Two families share this enum. Rule violations are ordinary outcomes of
/// illegal player input: the table state is untouched and the message goes
/// back to the caller alone. Invariant violations mean the engine itself is
/// in a state that should be unreachable; the current hand is terminated
/// rather than continued undefined.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    // --- rule violations ---
    #[error("table is full")]
    TableFull,
    #[error("player {0} is not seated at this table")]
    NotSeated(String),
    #[error("no hand in progress")]
    HandNotActive,
    #[error("it is not player {0}'s turn")]
    NotYourTurn(String),
    #[error("player has already folded")]
    AlreadyFolded,
    #[error("cannot check while facing a bet")]
    CannotCheck,
    #[error("there is no bet to call")]
    NothingToCall,
    #[error("betting is not open; raise instead")]
    BetNotAllowed,
    #[error("raising is not available")]
    RaiseNotAllowed,
    #[error("bet of {amount} is below the minimum of {minimum}")]
    BetBelowMinimum { amount: u32, minimum: u32 },
    #[error("raise of {amount} is below the minimum of {minimum}")]
    RaiseBelowMinimum { amount: u32, minimum: u32 },
    #[error("insufficient chips for that action")]
    InsufficientChips,

    // --- invariant violations (fatal for the hand) ---
    #[error("dealt from an empty deck")]
    EmptyDeck,
    #[error("hand evaluation takes 5 to 7 cards, got {0}")]
    WrongCardCount(usize),
    #[error("pot total {pot_total} does not match committed chips {committed}")]
    PotMismatch { pot_total: u64, committed: u64 },
    #[error("pot has no eligible winner")]
    NoEligibleWinner,
}

impl EngineError {
    /// True for programmer-error conditions that terminate the hand.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            EngineError::EmptyDeck
                | EngineError::WrongCardCount(_)
                | EngineError::PotMismatch { .. }
                | EngineError::NoEligibleWinner
        )
    }
}
