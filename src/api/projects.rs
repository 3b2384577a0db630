use axum::extract::Path;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::{success, CurrentUser, JsonBody};
use crate::error::Result;
use crate::models::{NewProject, Project, ProjectPatch, ProjectWithTasks, Task, TaskPatch};

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    project: NewProject,
    #[serde(default)]
    tasks: Vec<String>,
}

#[derive(Deserialize)]
pub struct NewTaskRequest {
    #[serde(default)]
    description: String,
}

pub async fn list_projects(current: CurrentUser) -> Result<Json<Vec<Project>>> {
    Ok(Json(current.db.list_projects(&current.user.id)?))
}

pub async fn create_project(
    current: CurrentUser,
    JsonBody(request): JsonBody<CreateProjectRequest>,
) -> Result<Json<ProjectWithTasks>> {
    let created = current
        .db
        .create_project(&current.user.id, request.project, &request.tasks)?;
    Ok(Json(created))
}

pub async fn get_project(
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectWithTasks>> {
    Ok(Json(current.db.project_with_tasks(&current.user.id, &id)?))
}

pub async fn update_project(
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<ProjectPatch>,
) -> Result<Json<Project>> {
    Ok(Json(current.db.update_project(&current.user.id, &id, &patch)?))
}

pub async fn delete_project(current: CurrentUser, Path(id): Path<String>) -> Result<Json<Value>> {
    current.db.delete_project(&current.user.id, &id)?;
    Ok(success())
}

pub async fn add_task(
    current: CurrentUser,
    Path(project_id): Path<String>,
    JsonBody(request): JsonBody<NewTaskRequest>,
) -> Result<Json<Task>> {
    let task = current
        .db
        .add_task(&current.user.id, &project_id, &request.description)?;
    Ok(Json(task))
}

pub async fn get_task(current: CurrentUser, Path(id): Path<String>) -> Result<Json<Task>> {
    Ok(Json(current.db.task(&current.user.id, &id)?))
}

pub async fn update_task(
    current: CurrentUser,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<TaskPatch>,
) -> Result<Json<Task>> {
    Ok(Json(current.db.update_task(&current.user.id, &id, &patch)?))
}

pub async fn delete_task(current: CurrentUser, Path(id): Path<String>) -> Result<Json<Value>> {
    current.db.delete_task(&current.user.id, &id)?;
    Ok(success())
}
