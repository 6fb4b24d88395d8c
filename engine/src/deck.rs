use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::cards::{full_deck, Card};
use crate::errors::EngineError;

/// An ordered 52-card deck with a deal cursor.
///
/// The shuffle source is injected so tests can reproduce every deal; the
/// table reseeds from OS entropy for each production hand. Burns are not
/// modelled here: a burn is a normal deal whose card the caller discards.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    position: usize,
}

impl Deck {
    /// A fresh deck in canonical order. Call a shuffle before dealing.
    pub fn new() -> Self {
        Self {
            cards: full_deck(),
            position: 0,
        }
    }

    /// A deck that deals exactly `cards` in the given order, for tests that
    /// need a known board. Part of the engine's testability contract.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards, position: 0 }
    }

    /// Fisher-Yates over a fresh 52-card order using the supplied rng.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards = full_deck();
        self.cards.shuffle(rng);
        self.position = 0;
    }

    /// Deterministic shuffle from a seed (ChaCha20).
    pub fn shuffle_seeded(&mut self, seed: u64) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        self.shuffle(&mut rng);
    }

    /// Shuffle from OS entropy; used for each production hand.
    pub fn shuffle_random(&mut self) {
        let mut rng = ChaCha20Rng::from_entropy();
        self.shuffle(&mut rng);
    }

    /// Deal the next card. An empty deck is a programmer error: a legal
    /// hand consumes at most 2 * players + 3 burns + 5 board = 22 cards.
    pub fn deal(&mut self) -> Result<Card, EngineError> {
        let card = self
            .cards
            .get(self.position)
            .copied()
            .ok_or(EngineError::EmptyDeck)?;
        self.position += 1;
        Ok(card)
    }

    pub fn deal_many(&mut self, n: usize) -> Result<Vec<Card>, EngineError> {
        (0..n).map(|_| self.deal()).collect()
    }

    /// Rewind the cursor without reordering.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.position)
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}
