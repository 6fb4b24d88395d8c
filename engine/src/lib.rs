//! # holdem-engine: server-authoritative Texas Hold'em core
//!
//! The deterministic heart of a multiplayer no-limit hold'em table:
//! given player inputs, a shuffle source and a clock, it drives one
//! table's hand lifecycle and tells the owner what to broadcast. It has
//! no opinion about transports; the surrounding server wires its event
//! queue to whatever fan-out it likes.
//!
//! ## Modules
//!
//! - [`cards`] - Suit, Rank, Card and the 52-card universe
//! - [`deck`] - seeded Fisher-Yates deck with a deal cursor
//! - [`hand`] - 5-7 card evaluator with a totally ordered score
//! - [`player`] - seat-resident player state and actions
//! - [`betting`] - action legality, application and round bookkeeping
//! - [`pot`] - main/side pot partition and ranked distribution
//! - [`table`] - the per-table state machine and its outbound events
//! - [`view`] - per-observer sanitized projections
//! - [`errors`] - rule violations vs. invariant violations
//!
//! ## A hand in three lines
//!
//! ```
//! use holdem_engine::table::{Table, TableConfig};
//!
//! let mut table = Table::with_seed("demo", TableConfig::default(), 7);
//! let (alice, _) = table.add_player("alice").unwrap();
//! let (_bob, _) = table.add_player("bob").unwrap();
//! // two seats filled: the first hand deals itself and asks the
//! // current player to act
//! assert!(table.hand_active());
//! assert_eq!(table.view_for(&alice).seats.len(), 5);
//! ```

pub mod betting;
pub mod cards;
pub mod deck;
pub mod errors;
pub mod hand;
pub mod player;
pub mod pot;
pub mod table;
pub mod view;

pub use errors::EngineError;
