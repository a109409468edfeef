use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use tokio::sync::Mutex;

use std::sync::Arc;

use crate::{accounts, settlements, statistics, transactions};
use engine::{Engine, SqlStore};

/// Username and password a client must present with HTTP basic auth.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct ServerState {
    /// Single writer: every request holds the lock for the whole operation.
    pub engine: Arc<Mutex<Engine<SqlStore>>>,
    pub credentials: Option<Arc<Credentials>>,
}

impl ServerState {
    pub fn new(engine: Engine<SqlStore>, credentials: Option<Credentials>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            credentials: credentials.map(Arc::new),
        }
    }
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.credentials.as_deref() else {
        return Ok(next.run(request).await);
    };

    let Some(TypedHeader(Authorization(basic))) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if basic.username() != expected.username || basic.password() != expected.password {
        tracing::warn!(username = basic.username(), "rejected credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", get(accounts::list))
        .route("/accounts/{id}/balance", put(accounts::set_balance))
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{id}",
            axum::routing::patch(transactions::update).delete(transactions::delete),
        )
        .route("/transfers", post(transactions::transfer_new))
        .route("/deposits", post(transactions::deposit_new))
        .route("/debt", get(settlements::debt))
        .route("/bill", get(settlements::bill))
        .route("/settlements", post(settlements::settle))
        .route(
            "/settlements/{id}",
            get(settlements::view_settlement).delete(settlements::reopen),
        )
        .route("/stats", get(statistics::get_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine<SqlStore>,
    credentials: Option<Credentials>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);
    if credentials.is_none() {
        tracing::warn!("no credentials configured, the API is open");
    }

    axum::serve(listener, router(ServerState::new(engine, credentials))).await
}
