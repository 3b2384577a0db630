//! Ownership checks. A record owned by someone else is reported exactly like a
//! missing one.

use rusqlite::{params, OptionalExtension};

use super::{note_from_row, project_from_row, task_from_row, Database, NOTE_COLUMNS, PROJECT_COLUMNS};
use crate::error::{AppError, Result};
use crate::models::{Note, Project, Task};

impl Database {
    pub fn owned_project(&self, user_id: &str, project_id: &str) -> Result<Project> {
        self.conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1 AND user_id = ?2"),
                params![project_id, user_id],
                project_from_row,
            )
            .optional()?
            .ok_or(AppError::NotFound("project"))
    }

    /// Resolves the task through its parent project so the owner check is a
    /// join, not a second lookup.
    pub fn owned_task(&self, user_id: &str, task_id: &str) -> Result<Task> {
        self.conn
            .query_row(
                "SELECT t.id, t.project_id, t.description, t.status, t.position,
                        t.created_at, t.completed_at
                 FROM tasks t JOIN projects p ON t.project_id = p.id
                 WHERE t.id = ?1 AND p.user_id = ?2",
                params![task_id, user_id],
                task_from_row,
            )
            .optional()?
            .ok_or(AppError::NotFound("task"))
    }

    pub fn owned_note(&self, user_id: &str, note_id: &str) -> Result<Note> {
        self.conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1 AND user_id = ?2"),
                params![note_id, user_id],
                note_from_row,
            )
            .optional()?
            .ok_or(AppError::NotFound("note"))
    }
}
