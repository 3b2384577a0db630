use axum::extract::Path;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::{success, CurrentUser, JsonBody};
use crate::error::Result;
use crate::models::{Note, NotePatch};

#[derive(Deserialize)]
pub struct NewNoteRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

pub async fn list_notes(current: CurrentUser) -> Result<Json<Vec<Note>>> {
    Ok(Json(current.db.list_notes(&current.user.id)?))
}

pub async fn create_note(
    current: CurrentUser,
    JsonBody(request): JsonBody<NewNoteRequest>,
) -> Result<Json<Note>> {
    let note = current
        .db
        .create_note(&current.user.id, &request.title, &request.content)?;
    Ok(Json(note))
}

pub async fn get_note(current: CurrentUser, Path(id): Path<String>) -> Result<Json<Note>> {
    Ok(Json(current.db.owned_note(&current.user.id, &id)?))
}

pub async fn update_note(
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<NotePatch>,
) -> Result<Json<Note>> {
    Ok(Json(current.db.update_note(&current.user.id, &id, &patch)?))
}

pub async fn delete_note(current: CurrentUser, Path(id): Path<String>) -> Result<Json<Value>> {
    current.db.delete_note(&current.user.id, &id)?;
    Ok(success())
}
