use std::sync::Arc;

use holdem_engine::player::Action;
use holdem_engine::table::{GameStage, Table, TableConfig, TableEvent, TimerKind};
use holdem_engine::view::{self, TableView};
use holdem_engine::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::events::EventBus;
use crate::wire::{self, WireEvent};

const COMMAND_BUFFER: usize = 64;

/// Failure of a call into a table worker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableCallError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("table no longer exists")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReply {
    pub player_id: String,
    pub seat: usize,
}

/// Discovery and reaper snapshot of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStatus {
    pub table_id: String,
    pub seated: usize,
    pub max_players: usize,
    pub stage: GameStage,
    pub hand_active: bool,
    pub small_blind: u32,
    pub big_blind: u32,
}

/// Inbound mailbox messages for a table worker. Commands are processed
/// strictly in arrival order; each reply reflects the post-command
/// authoritative state.
#[derive(Debug)]
pub enum TableCommand {
    Join {
        name: String,
        reply: oneshot::Sender<Result<JoinReply, EngineError>>,
    },
    Leave {
        player_id: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Act {
        player_id: String,
        action: Action,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Chat {
        player_id: String,
        message: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Snapshot {
        observer: Option<String>,
        reply: oneshot::Sender<TableView>,
    },
    Status {
        reply: oneshot::Sender<TableStatus>,
    },
    /// A scheduled delivery requested by the engine. Stale generations
    /// are discarded inside the engine, so a fired-but-cancelled timer
    /// is a no-op here.
    TimerFired { kind: TimerKind, generation: u64 },
    Shutdown,
}

/// Cheap cloneable address of one table worker.
#[derive(Debug, Clone)]
pub struct TableHandle {
    pub id: String,
    tx: mpsc::Sender<TableCommand>,
}

impl TableHandle {
    pub async fn join(&self, name: String) -> Result<JoinReply, TableCallError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Join { name, reply }).await?;
        Ok(rx.await.map_err(|_| TableCallError::Closed)??)
    }

    pub async fn leave(&self, player_id: String) -> Result<(), TableCallError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Leave { player_id, reply }).await?;
        Ok(rx.await.map_err(|_| TableCallError::Closed)??)
    }

    pub async fn act(&self, player_id: String, action: Action) -> Result<(), TableCallError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Act {
            player_id,
            action,
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| TableCallError::Closed)??)
    }

    pub async fn chat(&self, player_id: String, message: String) -> Result<(), TableCallError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Chat {
            player_id,
            message,
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| TableCallError::Closed)??)
    }

    pub async fn snapshot(&self, observer: Option<String>) -> Result<TableView, TableCallError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Snapshot { observer, reply }).await?;
        rx.await.map_err(|_| TableCallError::Closed)
    }

    pub async fn status(&self) -> Result<TableStatus, TableCallError> {
        let (reply, rx) = oneshot::channel();
        self.send(TableCommand::Status { reply }).await?;
        rx.await.map_err(|_| TableCallError::Closed)
    }

    /// Ask the worker to stop. Queued commands ahead of this still run.
    pub fn shutdown(&self) {
        let _ = self.tx.try_send(TableCommand::Shutdown);
    }

    async fn send(&self, command: TableCommand) -> Result<(), TableCallError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| TableCallError::Closed)
    }
}

/// Start the owning task for one table. All mutation of the table state
/// happens on this task, so engine invariants never cross an await.
pub fn spawn_table(id: String, config: TableConfig, bus: Arc<EventBus>) -> TableHandle {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let handle = TableHandle {
        id: id.clone(),
        tx: tx.clone(),
    };
    tokio::spawn(run_table(id, config, bus, tx, rx));
    handle
}

async fn run_table(
    id: String,
    config: TableConfig,
    bus: Arc<EventBus>,
    self_tx: mpsc::Sender<TableCommand>,
    mut rx: mpsc::Receiver<TableCommand>,
) {
    let mut table = Table::new(id.clone(), config);
    tracing::info!(table_id = %id, "table worker started");

    while let Some(command) = rx.recv().await {
        match command {
            TableCommand::Join { name, reply } => {
                let result = table.add_player(&name).map(|(player_id, seat)| {
                    tracing::info!(table_id = %id, player_id = %player_id, seat, "player joined");
                    JoinReply { player_id, seat }
                });
                let _ = reply.send(result);
            }
            TableCommand::Leave { player_id, reply } => {
                let result = table.remove_player(&player_id);
                if result.is_ok() {
                    tracing::info!(table_id = %id, player_id = %player_id, "player left");
                }
                let _ = reply.send(result);
            }
            TableCommand::Act {
                player_id,
                action,
                reply,
            } => {
                let result = table.apply_player_action(&player_id, action);
                tracing::debug!(
                    table_id = %id,
                    player_id = %player_id,
                    action = ?action,
                    ok = result.is_ok(),
                    "action processed"
                );
                let _ = reply.send(result);
            }
            TableCommand::Chat {
                player_id,
                message,
                reply,
            } => {
                let result = if table.is_seated(&player_id) {
                    bus.broadcast(
                        &id,
                        WireEvent::ChatNew {
                            player_id,
                            message,
                            timestamp: wire::timestamp_now(),
                        },
                    );
                    Ok(())
                } else {
                    Err(EngineError::NotSeated(player_id))
                };
                let _ = reply.send(result);
            }
            TableCommand::Snapshot { observer, reply } => {
                let view = match observer.as_deref() {
                    Some(observer_id) => table.view_for(observer_id),
                    None => table.view_for(""),
                };
                let _ = reply.send(view);
            }
            TableCommand::Status { reply } => {
                let _ = reply.send(TableStatus {
                    table_id: id.clone(),
                    seated: table.seated_count(),
                    max_players: table.config().max_players,
                    stage: table.stage(),
                    hand_active: table.hand_active(),
                    small_blind: table.config().small_blind,
                    big_blind: table.config().big_blind,
                });
            }
            TableCommand::TimerFired { kind, generation } => {
                if let Err(err) = table.handle_timer(kind, generation) {
                    tracing::error!(table_id = %id, error = %err, "timer handling failed");
                }
            }
            TableCommand::Shutdown => break,
        }
        dispatch_events(&id, &mut table, &bus, &self_tx);
    }

    tracing::info!(table_id = %id, "table worker stopped");
}

/// Drain the engine's outbound queue and turn it into room broadcasts
/// and timer tasks. `table_state` is sanitized per subscriber; redundant
/// state-change markers within one batch collapse into a single
/// broadcast of the final state.
fn dispatch_events(
    id: &str,
    table: &mut Table,
    bus: &EventBus,
    self_tx: &mpsc::Sender<TableCommand>,
) {
    let events = table.drain_events();
    let last_state_change = events
        .iter()
        .rposition(|e| matches!(e, TableEvent::StateChanged));

    for (index, event) in events.into_iter().enumerate() {
        match event {
            TableEvent::StateChanged => {
                if Some(index) == last_state_change {
                    let full = table.full_view();
                    bus.broadcast_personalized(id, |observer| WireEvent::TableState {
                        state: view::sanitize(&full, observer.unwrap_or("")),
                    });
                }
            }
            TableEvent::ActionRequest {
                player_id,
                options,
                time_left,
                ..
            } => {
                bus.broadcast(
                    id,
                    WireEvent::ActionRequest {
                        player_id,
                        min_bet: options.min_bet,
                        min_raise: options.min_raise,
                        max_bet: options.max_bet,
                        can_check: options.can_check,
                        can_call: options.can_call,
                        can_bet: options.can_bet,
                        can_raise: options.can_raise,
                        call_amount: options.call_amount,
                        time_left_ms: time_left.as_millis() as u64,
                    },
                );
            }
            TableEvent::ActionResult {
                player_id,
                action,
                amount,
            } => {
                bus.broadcast(
                    id,
                    WireEvent::ActionResult {
                        player_id,
                        action: action.label().to_string(),
                        amount,
                        timestamp: wire::timestamp_now(),
                    },
                );
            }
            TableEvent::StageDealt { stage, community } => {
                bus.broadcast(
                    id,
                    WireEvent::HandStage {
                        stage,
                        community_cards: community,
                    },
                );
            }
            TableEvent::ShowdownResult { winners } => {
                bus.broadcast(id, WireEvent::HandShowdown { winners });
            }
            TableEvent::PotUpdate {
                main_pot,
                side_pots,
                total_pot,
            } => {
                bus.broadcast(
                    id,
                    WireEvent::PotUpdate {
                        main_pot,
                        side_pots,
                        total_pot,
                    },
                );
            }
            TableEvent::PlayerJoined {
                player_id,
                name,
                seat,
            } => {
                bus.broadcast(
                    id,
                    WireEvent::PlayerJoined {
                        player_id,
                        name,
                        seat,
                    },
                );
            }
            TableEvent::PlayerLeft { player_id, seat } => {
                bus.broadcast(id, WireEvent::PlayerLeft { player_id, seat });
            }
            TableEvent::Schedule {
                kind,
                delay,
                generation,
            } => {
                let tx = self_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(TableCommand::TimerFired { kind, generation }).await;
                });
            }
            TableEvent::HandAborted { reason } => {
                tracing::error!(table_id = %id, reason = %reason, "hand aborted");
            }
        }
    }
}
