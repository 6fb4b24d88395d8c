use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use holdem_engine::player::Action;
use holdem_engine::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::{self, Reply, Response};
use warp::{Filter, Rejection};

use crate::config::{self, ServerConfig, TableOptions};
use crate::events::{EventBus, RoomSubscription};
use crate::registry::{spawn_reaper, TableRegistry};
use crate::runtime::{TableCallError, TableHandle, TableStatus};
use crate::validation;
use crate::wire::WireEvent;

/// Error envelope shared by every endpoint: `{ success: false, error }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        success: false,
        error: message.into(),
    };
    reply::with_status(reply::json(&body), status).into_response()
}

fn engine_error_reply(err: &EngineError) -> Response {
    let status = if err.is_invariant_violation() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    };
    error_reply(status, err.to_string())
}

fn call_error_reply(err: TableCallError) -> Response {
    match err {
        TableCallError::Engine(engine_err) => engine_error_reply(&engine_err),
        TableCallError::Closed => error_reply(StatusCode::NOT_FOUND, "table not found"),
    }
}

// --- request/response bodies ---

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaveRequest {
    pub player_id: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionBody {
    pub player_id: String,
    pub action: ActionKind,
    #[serde(default)]
    pub amount: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub player_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct EventsQuery {
    #[serde(default)]
    player_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct CreateTableResponse {
    success: bool,
    table_id: String,
}

#[derive(Debug, Clone, Serialize)]
struct ListTablesResponse {
    success: bool,
    tables: Vec<TableStatus>,
}

#[derive(Debug, Clone, Serialize)]
struct JoinResponse {
    success: bool,
    player_id: String,
    seat: usize,
}

#[derive(Debug, Clone, Serialize)]
struct OkResponse {
    success: bool,
}

const OK: OkResponse = OkResponse { success: true };

// --- handlers ---

async fn create_table(registry: Arc<TableRegistry>, options: TableOptions) -> Response {
    match config::table_config_from(&options) {
        Ok(table_config) => {
            let handle = registry.create_table(table_config).await;
            reply::json(&CreateTableResponse {
                success: true,
                table_id: handle.id,
            })
            .into_response()
        }
        Err(err) => error_reply(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

async fn list_tables(registry: Arc<TableRegistry>) -> Response {
    let tables = registry.list_status().await;
    reply::json(&ListTablesResponse {
        success: true,
        tables,
    })
    .into_response()
}

async fn join_table(registry: Arc<TableRegistry>, table_id: String, request: JoinRequest) -> Response {
    if let Err(err) = validation::player_name(&request.name) {
        return error_reply(StatusCode::BAD_REQUEST, err.to_string());
    }
    let Some(handle) = registry.get(&table_id).await else {
        return error_reply(StatusCode::NOT_FOUND, "table not found");
    };
    match handle.join(request.name).await {
        Ok(joined) => reply::json(&JoinResponse {
            success: true,
            player_id: joined.player_id,
            seat: joined.seat,
        })
        .into_response(),
        Err(err) => call_error_reply(err),
    }
}

async fn leave_table(
    registry: Arc<TableRegistry>,
    table_id: String,
    request: LeaveRequest,
) -> Response {
    let Some(handle) = registry.get(&table_id).await else {
        return error_reply(StatusCode::NOT_FOUND, "table not found");
    };
    match handle.leave(request.player_id).await {
        Ok(()) => reply::json(&OK).into_response(),
        Err(err) => call_error_reply(err),
    }
}

async fn player_action(
    registry: Arc<TableRegistry>,
    table_id: String,
    request: ActionBody,
) -> Response {
    let action = match request.action {
        ActionKind::Fold => Action::Fold,
        ActionKind::Check => Action::Check,
        ActionKind::Call => Action::Call,
        ActionKind::AllIn => Action::AllIn,
        ActionKind::Bet | ActionKind::Raise => {
            let amount = match validation::bet_amount(request.amount.unwrap_or(0)) {
                Ok(amount) => amount,
                Err(err) => return error_reply(StatusCode::BAD_REQUEST, err.to_string()),
            };
            if request.action == ActionKind::Bet {
                Action::Bet(amount)
            } else {
                Action::Raise(amount)
            }
        }
    };
    let Some(handle) = registry.get(&table_id).await else {
        return error_reply(StatusCode::NOT_FOUND, "table not found");
    };
    match handle.act(request.player_id, action).await {
        Ok(()) => reply::json(&OK).into_response(),
        Err(err) => call_error_reply(err),
    }
}

async fn chat_send(registry: Arc<TableRegistry>, table_id: String, request: ChatRequest) -> Response {
    let message = match validation::chat_message(&request.message) {
        Ok(message) => message,
        Err(err) => return error_reply(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let Some(handle) = registry.get(&table_id).await else {
        return error_reply(StatusCode::NOT_FOUND, "table not found");
    };
    match handle.chat(request.player_id, message).await {
        Ok(()) => reply::json(&OK).into_response(),
        Err(err) => call_error_reply(err),
    }
}

/// Keeps the room subscription alive for the lifetime of an SSE stream
/// and applies leave semantics when a seated subscriber disconnects.
struct SseGuard {
    _subscription: RoomSubscription,
    table: TableHandle,
    player_id: Option<String>,
}

impl Drop for SseGuard {
    fn drop(&mut self) {
        if let Some(player_id) = self.player_id.take() {
            let table = self.table.clone();
            tokio::spawn(async move {
                if table.leave(player_id.clone()).await.is_ok() {
                    tracing::info!(player_id = %player_id, "removed disconnected player");
                }
            });
        }
    }
}

fn sse_event(event: &WireEvent) -> warp::sse::Event {
    warp::sse::Event::default()
        .event(event.kind())
        .json_data(event)
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to serialize outbound event");
            warp::sse::Event::default().comment("serialization failure")
        })
}

async fn stream_events(
    registry: Arc<TableRegistry>,
    bus: Arc<EventBus>,
    table_id: String,
    query: EventsQuery,
) -> Response {
    let Some(handle) = registry.get(&table_id).await else {
        return error_reply(StatusCode::NOT_FOUND, "table not found");
    };
    let observer = query.player_id;

    // subscribe before the snapshot so nothing can slip in between
    let mut subscription = bus.subscribe(table_id.clone(), observer.clone());
    let Some(receiver) = subscription.take_receiver() else {
        return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "subscription failure");
    };
    let initial = match handle.snapshot(observer.clone()).await {
        Ok(state) => WireEvent::TableState { state },
        Err(err) => return call_error_reply(err),
    };

    let guard = SseGuard {
        _subscription: subscription,
        table: handle,
        player_id: observer,
    };
    let stream = tokio_stream::once(initial)
        .chain(ReceiverStream::new(receiver))
        .map(move |event| {
            let _keep_alive = &guard;
            Ok::<_, Infallible>(sse_event(&event))
        });

    warp::sse::reply(warp::sse::keep_alive().stream(stream)).into_response()
}

// --- server plumbing ---

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Shared components behind every route.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    bus: Arc<EventBus>,
    registry: Arc<TableRegistry>,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        let bus = Arc::new(EventBus::new());
        let registry = Arc::new(TableRegistry::new(Arc::clone(&bus)));
        Self {
            config,
            bus,
            registry,
        }
    }

    pub fn new_for_tests() -> Self {
        Self::new(ServerConfig::for_tests())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub fn registry(&self) -> Arc<TableRegistry> {
        Arc::clone(&self.registry)
    }
}

/// The full route tree, CORS and rejection handling included.
pub fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let api = health_route()
        .or(table_routes(context))
        .unify()
        .or(event_routes(context))
        .unify()
        .recover(handle_rejection);

    let cors = match context.config().client_origin.as_deref() {
        Some(origin) => warp::cors()
            .allow_origin(origin)
            .allow_methods(vec!["GET", "POST"])
            .allow_headers(vec!["content-type"]),
        None => warp::cors()
            .allow_any_origin()
            .allow_methods(vec!["GET", "POST"])
            .allow_headers(vec!["content-type"]),
    };

    api.with(cors)
        .map(|reply| warp::reply::Reply::into_response(reply))
        .boxed()
}

fn health_route() -> BoxedFilter<(Response,)> {
    warp::path!("health")
        .and(warp::get())
        .map(|| reply::json(&OK).into_response())
        .boxed()
}

fn table_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let registry = context.registry();

    let list = warp::path!("api" / "tables")
        .and(warp::get())
        .and(with_registry(registry.clone()))
        .then(list_tables);

    let create = warp::path!("api" / "tables")
        .and(warp::post())
        .and(with_registry(registry.clone()))
        .and(warp::body::json())
        .then(create_table);

    let join = warp::path!("api" / "tables" / String / "join")
        .and(warp::post())
        .and(with_registry(registry.clone()))
        .and(warp::body::json())
        .then(|table_id, registry, request| join_table(registry, table_id, request));

    let leave = warp::path!("api" / "tables" / String / "leave")
        .and(warp::post())
        .and(with_registry(registry.clone()))
        .and(warp::body::json())
        .then(|table_id, registry, request| leave_table(registry, table_id, request));

    let actions = warp::path!("api" / "tables" / String / "actions")
        .and(warp::post())
        .and(with_registry(registry.clone()))
        .and(warp::body::json())
        .then(|table_id, registry, request| player_action(registry, table_id, request));

    let chat = warp::path!("api" / "tables" / String / "chat")
        .and(warp::post())
        .and(with_registry(registry))
        .and(warp::body::json())
        .then(|table_id, registry, request| chat_send(registry, table_id, request));

    list.or(create)
        .unify()
        .or(join)
        .unify()
        .or(leave)
        .unify()
        .or(actions)
        .unify()
        .or(chat)
        .unify()
        .boxed()
}

fn event_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
    let registry = context.registry();
    let bus = context.event_bus();

    warp::path!("api" / "tables" / String / "events")
        .and(warp::get())
        .and(with_registry(registry))
        .and(with_bus(bus))
        .and(warp::query::<EventsQuery>())
        .then(|table_id, registry, bus, query| stream_events(registry, bus, table_id, query))
        .boxed()
}

fn with_registry(
    registry: Arc<TableRegistry>,
) -> impl Filter<Extract = (Arc<TableRegistry>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&registry))
}

fn with_bus(bus: Arc<EventBus>) -> impl Filter<Extract = (Arc<EventBus>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&bus))
}

/// Schema failures and unknown routes come back in the same envelope as
/// user errors; the core is never entered.
async fn handle_rejection(rejection: Rejection) -> Result<Response, Rejection> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if let Some(err) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        return Err(rejection);
    };
    Ok(error_reply(status, message))
}

/// A running server plus its background reaper; dropping it shuts both
/// down.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    reaper: Option<JoinHandle<()>>,
    context: AppContext,
}

impl ServerHandle {
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|err| ServerError::ConfigError(format!("server task join error: {err}")))?;
        }
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            context: AppContext::new(config),
        }
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let bind_addr = Self::bind_addr(context.config())?;
        let route_tree = routes(&context);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };
        let (addr, server_future) = warp::serve(route_tree)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(|err| ServerError::ConfigError(err.to_string()))?;

        tracing::info!(address = %addr, "table server listening");

        let reaper = spawn_reaper(context.registry(), context.config().reap_interval);
        let task = tokio::spawn(server_future);

        Ok(ServerHandle {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            reaper: Some(reaper),
            context,
        })
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = &config.host;
        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port));
        }
        let candidate = format!("{}:{}", host, config.port);
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;
        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }
}
