//! HTTP surface: one JSON endpoint per store operation.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRequest;
use axum::{routing::get, routing::post, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::AppError;

mod auth;
mod notes;
mod projects;

pub use auth::CurrentUser;

/// JSON request body. Rejections (bad syntax, unknown enum values, wrong
/// types) surface as 400 with the usual `{"error": ...}` body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Shared per-process state. Holds no connection: `CurrentUser` opens one
/// per request.
#[derive(Clone)]
pub struct AppState {
    pub db_path: PathBuf,
    pub auth_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            db_path: config.db_path.clone(),
            auth_secret: config.auth_secret.as_deref().map(Arc::from),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/auth/session",
            post(auth::sign_in)
                .get(auth::current_session)
                .delete(auth::sign_out),
        )
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/api/projects/:id/tasks", post(projects::add_task))
        .route(
            "/api/tasks/:id",
            get(projects::get_task)
                .put(projects::update_task)
                .delete(projects::delete_task),
        )
        .route("/api/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/api/notes/:id",
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}
