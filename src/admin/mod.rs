//! Read-only admin API.
//!
//! # Routes
//! - `GET /admin/status`: process summary
//! - `GET /admin/ranking`: full ranking, best first
//! - `GET /admin/candidates/{tag}`: one candidate
//! - `GET /admin/best`: currently held best
//!
//! Every route requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::lifecycle::Observatory;
use self::auth::admin_auth_middleware;
use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub observatory: Observatory,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(observatory: Observatory, api_key: &str) -> Router {
    let state = AdminState {
        observatory,
        api_key: Arc::from(api_key),
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/ranking", get(get_ranking))
        .route("/admin/candidates/{tag}", get(get_candidate))
        .route("/admin/best", get(get_best))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API until the observatory shuts down.
pub async fn serve_admin(observatory: Observatory, listener: TcpListener) -> std::io::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    let mut shutdown = observatory.subscribe_shutdown();
    let app = setup_admin_router(observatory.clone(), &observatory.config().admin.api_key);

    tracing::info!(address = %addr, "Admin API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
