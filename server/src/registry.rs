use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use holdem_engine::table::{GameStage, TableConfig};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::events::EventBus;
use crate::runtime::{spawn_table, TableHandle, TableStatus};

/// The only process-wide mutable state: table id to worker handle.
/// Creation, lookup and removal are serialized through the lock; the
/// reaper's emptiness check runs under the same write lock so it cannot
/// race a concurrent join.
#[derive(Debug)]
pub struct TableRegistry {
    tables: RwLock<HashMap<String, TableHandle>>,
    bus: Arc<EventBus>,
}

impl TableRegistry {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            bus,
        }
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub async fn create_table(&self, config: TableConfig) -> TableHandle {
        let id = Uuid::new_v4().to_string();
        let handle = spawn_table(id.clone(), config, Arc::clone(&self.bus));
        self.tables.write().await.insert(id.clone(), handle.clone());
        tracing::info!(table_id = %id, "table created");
        handle
    }

    pub async fn get(&self, table_id: &str) -> Option<TableHandle> {
        self.tables.read().await.get(table_id).cloned()
    }

    pub async fn remove(&self, table_id: &str) -> bool {
        let removed = self.tables.write().await.remove(table_id);
        match removed {
            Some(handle) => {
                handle.shutdown();
                self.bus.drop_room(table_id);
                tracing::info!(table_id = %table_id, "table removed");
                true
            }
            None => false,
        }
    }

    pub async fn count(&self) -> usize {
        self.tables.read().await.len()
    }

    /// Status of every table, for the discovery listing.
    pub async fn list_status(&self) -> Vec<TableStatus> {
        let handles: Vec<TableHandle> = self.tables.read().await.values().cloned().collect();
        let mut statuses = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(status) = handle.status().await {
                statuses.push(status);
            }
        }
        statuses.sort_by(|a, b| a.table_id.cmp(&b.table_id));
        statuses
    }

    /// Remove tables that are empty and idle. Holding the write lock
    /// across the status check is what makes join-then-reap impossible:
    /// a join either completed before the sweep (the table is not empty)
    /// or will fail to find the table afterwards.
    pub async fn reap_empty(&self) -> usize {
        let mut tables = self.tables.write().await;
        let mut doomed = Vec::new();
        for (id, handle) in tables.iter() {
            if let Ok(status) = handle.status().await {
                if status.seated == 0
                    && !status.hand_active
                    && status.stage == GameStage::WaitingForPlayers
                {
                    doomed.push(id.clone());
                }
            }
        }
        for id in &doomed {
            if let Some(handle) = tables.remove(id) {
                handle.shutdown();
                self.bus.drop_room(id);
                tracing::info!(table_id = %id, "reaped empty table");
            }
        }
        doomed.len()
    }
}

/// Run the empty-table reaper on a fixed interval until aborted.
pub fn spawn_reaper(registry: Arc<TableRegistry>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // the first tick is immediate; skip it
        loop {
            ticker.tick().await;
            let reaped = registry.reap_empty().await;
            if reaped > 0 {
                tracing::info!(count = reaped, "reaper removed empty tables");
            }
        }
    })
}
