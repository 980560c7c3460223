//! HTTP handlers and routers for the actor REST surface.

pub mod actor;
pub mod auth;
pub mod factory;
pub mod handlers;
pub mod health;
pub mod meta;
pub mod oauth;
pub mod trust;

use axum::routing::{get, post};
use axum::Router;

use crate::State;

/// Build the actor-facing router. Transport-level layers (trace, cors)
/// are applied by the binary that serves this.
pub fn router(state: State) -> Router {
    Router::new()
        .route("/", post(factory::handler))
        .route("/healthz", get(health::handler))
        .route(
            "/:actor_id",
            get(actor::get_handler).delete(actor::delete_handler),
        )
        .route("/:actor_id/meta", get(meta::handler))
        .route("/:actor_id/meta/:key", get(meta::key_handler))
        .route("/:actor_id/oauth", get(oauth::handler))
        .route(
            "/:actor_id/trust",
            get(trust::list::handler).post(trust::initiate::handler),
        )
        .route("/:actor_id/trust/:relationship", post(trust::incoming::handler))
        .route(
            "/:actor_id/trust/:relationship/:peer_id",
            get(trust::resource::get_handler)
                .put(trust::resource::put_handler)
                .post(trust::resource::post_handler)
                .delete(trust::resource::delete_handler),
        )
        .fallback(handlers::not_found_handler)
        .with_state(state)
}
