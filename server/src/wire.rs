use chrono::{SecondsFormat, Utc};
use holdem_engine::cards::Card;
use holdem_engine::table::{GameStage, HandWinner};
use holdem_engine::view::TableView;
use serde::{Deserialize, Serialize};

/// Room broadcasts, as serialized onto the event channel. `table_state`
/// is personalized per recipient; everything else is identical for the
/// whole room and clients filter by `player_id` where relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    TableState {
        state: TableView,
    },
    ActionRequest {
        player_id: String,
        min_bet: u32,
        min_raise: u32,
        max_bet: u32,
        can_check: bool,
        can_call: bool,
        can_bet: bool,
        can_raise: bool,
        call_amount: u32,
        time_left_ms: u64,
    },
    ActionResult {
        player_id: String,
        action: String,
        amount: u32,
        timestamp: String,
    },
    HandStage {
        stage: GameStage,
        community_cards: Vec<Card>,
    },
    HandShowdown {
        winners: Vec<HandWinner>,
    },
    PotUpdate {
        main_pot: u32,
        side_pots: Vec<u32>,
        total_pot: u32,
    },
    PlayerJoined {
        player_id: String,
        name: String,
        seat: usize,
    },
    PlayerLeft {
        player_id: String,
        seat: usize,
    },
    ChatNew {
        player_id: String,
        message: String,
        timestamp: String,
    },
}

impl WireEvent {
    /// The `type` tag, used as the SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            WireEvent::TableState { .. } => "table_state",
            WireEvent::ActionRequest { .. } => "action_request",
            WireEvent::ActionResult { .. } => "action_result",
            WireEvent::HandStage { .. } => "hand_stage",
            WireEvent::HandShowdown { .. } => "hand_showdown",
            WireEvent::PotUpdate { .. } => "pot_update",
            WireEvent::PlayerJoined { .. } => "player_joined",
            WireEvent::PlayerLeft { .. } => "player_left",
            WireEvent::ChatNew { .. } => "chat_new",
        }
    }
}

pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
