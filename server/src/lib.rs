//! # holdem-server: the process around the hold'em engine
//!
//! One tokio task owns each table, so every mutation of a table's state
//! is serialized through its mailbox and the engine's invariants never
//! have to survive an interleaving. Timers are scheduled events posted
//! back into the same mailbox; broadcasts fan out through a per-table
//! event bus with sanitized, per-observer `table_state` projections; the
//! HTTP/SSE surface is the only way in or out.
//!
//! - [`runtime`] - per-table worker, mailbox commands, timer delivery
//! - [`registry`] - table id to worker map plus the empty-table reaper
//! - [`events`] - room fan-out with bounded per-subscriber channels
//! - [`wire`] - the broadcast event vocabulary
//! - [`http`] - warp routes, CORS, SSE streams, graceful shutdown
//! - [`validation`] - name/chat/amount schema checks
//! - [`config`] - server and table configuration
//! - [`logging`] - tracing bootstrap and a capturing test layer

pub mod config;
pub mod events;
pub mod http;
pub mod logging;
pub mod registry;
pub mod runtime;
pub mod validation;
pub mod wire;

pub use config::{ServerConfig, TableOptions};
pub use events::EventBus;
pub use http::{AppContext, ErrorBody, ServerError, ServerHandle, WebServer};
pub use logging::init_logging;
pub use registry::TableRegistry;
pub use runtime::{TableCallError, TableHandle, TableStatus};
pub use wire::WireEvent;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_wires_shared_components() {
        let context = AppContext::new_for_tests();
        assert_eq!(context.event_bus().subscriber_count(), 0);
        assert_eq!(context.registry().count().await, 0);
    }
}
