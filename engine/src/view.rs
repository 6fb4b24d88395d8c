use serde::{Deserialize, Serialize};

use crate::betting::ActionRecord;
use crate::cards::Card;
use crate::player::{Action, PlayerId};
use crate::table::{GameStage, HandWinner, Table};

/// One seat as an observer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatView {
    pub player_id: PlayerId,
    pub name: String,
    pub chips: u32,
    pub seat: usize,
    /// Only the observer's own cards survive sanitization.
    pub hole_cards: Vec<Card>,
    /// Whether the seat holds cards at all, visible to everyone.
    pub has_cards: bool,
    pub current_bet: u32,
    pub total_bet: u32,
    pub folded: bool,
    pub all_in: bool,
    pub active: bool,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub last_action: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotView {
    pub amount: u32,
    pub eligible: Vec<PlayerId>,
    pub is_main: bool,
}

/// A projection of the table for one observer. Seat indices that have no
/// holder use -1, the empty-marker the clients expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableView {
    pub table_id: String,
    pub stage: GameStage,
    pub hand_number: u64,
    pub max_players: usize,
    pub small_blind: u32,
    pub big_blind: u32,
    pub community_cards: Vec<Card>,
    pub pots: Vec<PotView>,
    pub total_pot: u32,
    pub seats: Vec<Option<SeatView>>,
    pub dealer_seat: i32,
    pub small_blind_seat: i32,
    pub big_blind_seat: i32,
    pub current_seat: i32,
    pub hand_active: bool,
    pub last_action: Option<ActionRecord>,
    pub winners: Option<Vec<HandWinner>>,
}

fn seat_marker(seat: Option<usize>) -> i32 {
    seat.map(|s| s as i32).unwrap_or(-1)
}

/// The authoritative projection with every hole card present. Never send
/// this to a client; it exists so [`sanitize`] can be a pure function
/// over serializable state. The deck is absent by construction.
pub(crate) fn full_view(table: &Table) -> TableView {
    let seats = table
        .seats
        .iter()
        .map(|slot| {
            slot.as_ref().map(|p| SeatView {
                player_id: p.id.clone(),
                name: p.name.clone(),
                chips: p.chips,
                seat: p.seat,
                hole_cards: p.hole_cards.clone(),
                has_cards: p.has_cards(),
                current_bet: p.current_bet,
                total_bet: p.total_bet,
                folded: p.folded,
                all_in: p.all_in,
                active: p.active,
                is_dealer: p.is_dealer,
                is_small_blind: p.is_small_blind,
                is_big_blind: p.is_big_blind,
                last_action: p.last_action,
            })
        })
        .collect();
    let pots: Vec<PotView> = table
        .pots
        .iter()
        .map(|p| PotView {
            amount: p.amount,
            eligible: p.eligible.clone(),
            is_main: p.is_main,
        })
        .collect();
    let total_pot = pots.iter().map(|p| p.amount).sum();

    TableView {
        table_id: table.id.clone(),
        stage: table.stage,
        hand_number: table.hand_number,
        max_players: table.config.max_players,
        small_blind: table.config.small_blind,
        big_blind: table.config.big_blind,
        community_cards: table.community.clone(),
        pots,
        total_pot,
        seats,
        dealer_seat: seat_marker(table.dealer_seat),
        small_blind_seat: seat_marker(table.small_blind_seat),
        big_blind_seat: seat_marker(table.big_blind_seat),
        current_seat: seat_marker(table.current_seat),
        hand_active: table.hand_active,
        last_action: table.last_action.clone(),
        winners: table.winners.clone(),
    }
}

/// Hide everything `observer_id` must not see: other players' hole cards
/// are dropped, leaving only the fact that the seat holds cards. Winner
/// entries pass through untouched, since they only ever carry cards for
/// hands that were revealed at showdown. Pure and idempotent.
pub fn sanitize(view: &TableView, observer_id: &str) -> TableView {
    let mut out = view.clone();
    for seat in out.seats.iter_mut().flatten() {
        if seat.player_id != observer_id {
            seat.hole_cards.clear();
        }
    }
    out
}
