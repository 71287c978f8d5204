use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};

use crate::application::TabService;
use crate::storage::TabRepository;

use super::tabs;

pub struct ServerState<R> {
    pub service: Arc<TabService<R>>,
}

impl<R> Clone for ServerState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

/// Log every request with its outcome.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "handled request"
    );
    response
}

async fn health() -> &'static str {
    "ok"
}

pub fn router<R: TabRepository + 'static>(service: Arc<TabService<R>>) -> Router {
    let state = ServerState { service };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/tabs", post(tabs::new_tab::<R>))
        .route("/api/tabs/{id}", get(tabs::get::<R>).delete(tabs::delete::<R>))
        .route("/api/tabs/{id}/transaction", post(tabs::transaction_new::<R>))
        .route("/api/tabs/{id}/transactions", get(tabs::transactions::<R>))
        .route("/api/tabs/{id}/split", post(tabs::split_new::<R>))
        .route("/api/tabs/{id}/users", post(tabs::participant_new::<R>))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

pub async fn run_with_listener<R: TabRepository + 'static>(
    service: Arc<TabService<R>>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(service)).await
}
