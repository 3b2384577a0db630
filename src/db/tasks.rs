use chrono::Utc;
use rusqlite::params;

use super::{new_id, timestamp, Assignment, Database};
use crate::error::{AppError, Result};
use crate::models::{Task, TaskPatch, TaskStatus};

impl Database {
    pub fn task(&self, user_id: &str, task_id: &str) -> Result<Task> {
        self.owned_task(user_id, task_id)
    }

    /// Appends a pending task after the project's last position.
    pub fn add_task(&self, user_id: &str, project_id: &str, description: &str) -> Result<Task> {
        self.owned_project(user_id, project_id)?;
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::validation("task description is required"));
        }

        let id = new_id("task");
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO tasks (id, project_id, description, position, status, created_at)
             SELECT ?1, ?2, ?3, COALESCE(MAX(position) + 1, 0), 'pending', ?4
             FROM tasks WHERE project_id = ?2",
            params![id, project_id, description, timestamp(Utc::now())],
        )?;
        self.recompute_progress(project_id)?;
        tx.commit()?;

        tracing::debug!(task_id = %id, project_id, "added task");
        self.owned_task(user_id, &id)
    }

    /// Applies status and description changes. Any patch carrying a status
    /// recomputes the parent project's progress, changed or not.
    pub fn update_task(&self, user_id: &str, task_id: &str, patch: &TaskPatch) -> Result<Task> {
        let task = self.owned_task(user_id, task_id)?;

        let mut assignments: Vec<Assignment> = Vec::new();
        if let Some(status) = patch.status {
            assignments.push(("status", Box::new(status)));
            match status {
                TaskStatus::Completed if task.status != TaskStatus::Completed => {
                    assignments.push(("completed_at", Box::new(timestamp(Utc::now()))));
                }
                TaskStatus::Completed => {}
                TaskStatus::Pending => {
                    assignments.push(("completed_at", Box::new(None::<String>)));
                }
            }
        }
        if let Some(description) = &patch.description {
            let description = description.trim();
            if description.is_empty() {
                return Err(AppError::validation("task description cannot be empty"));
            }
            assignments.push(("description", Box::new(description.to_string())));
        }
        if assignments.is_empty() {
            return Err(AppError::validation("no valid fields to update"));
        }

        let tx = self.conn.unchecked_transaction()?;
        self.apply_assignments("tasks", assignments, false, "id = ?", &[task_id])?;
        if patch.status.is_some() {
            self.recompute_progress(&task.project_id)?;
        }
        tx.commit()?;

        tracing::debug!(task_id, "updated task");
        self.owned_task(user_id, task_id)
    }

    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<()> {
        let task = self.owned_task(user_id, task_id)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        self.recompute_progress(&task.project_id)?;
        tx.commit()?;

        tracing::debug!(task_id, "deleted task");
        Ok(())
    }
}
