use chrono::Utc;
use rusqlite::params;

use super::{new_id, note_from_row, timestamp, Assignment, Database, NOTE_COLUMNS};
use crate::error::{AppError, Result};
use crate::models::{Note, NotePatch};

impl Database {
    pub fn create_note(&self, user_id: &str, title: &str, content: &str) -> Result<Note> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("note title is required"));
        }

        let id = new_id("note");
        let now = timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO notes (id, user_id, title, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, user_id, title, content, now],
        )?;
        tracing::debug!(note_id = %id, "created note");
        self.owned_note(user_id, &id)
    }

    /// Most recently edited first.
    pub fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?1
             ORDER BY updated_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], note_from_row)?;

        let mut notes = Vec::new();
        for note in rows {
            notes.push(note?);
        }
        Ok(notes)
    }

    pub fn update_note(&self, user_id: &str, note_id: &str, patch: &NotePatch) -> Result<Note> {
        self.owned_note(user_id, note_id)?;

        let mut assignments: Vec<Assignment> = Vec::new();
        if let Some(title) = &patch.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::validation("note title cannot be empty"));
            }
            assignments.push(("title", Box::new(title.to_string())));
        }
        if let Some(content) = &patch.content {
            assignments.push(("content", Box::new(content.clone())));
        }
        if assignments.is_empty() {
            return Err(AppError::validation("no valid fields to update"));
        }

        self.apply_assignments(
            "notes",
            assignments,
            true,
            "id = ? AND user_id = ?",
            &[note_id, user_id],
        )?;
        self.owned_note(user_id, note_id)
    }

    pub fn delete_note(&self, user_id: &str, note_id: &str) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
            params![note_id, user_id],
        )?;
        if deleted == 0 {
            return Err(AppError::NotFound("note"));
        }
        tracing::debug!(note_id, "deleted note");
        Ok(())
    }
}
