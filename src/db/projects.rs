use chrono::Utc;
use rusqlite::params;

use super::{
    new_id, project_from_row, task_from_row, timestamp, Assignment, Database, PROJECT_COLUMNS,
    TASK_COLUMNS,
};
use crate::error::{AppError, Result};
use crate::models::{NewProject, Project, ProjectPatch, ProjectWithTasks, Task};
use crate::progress::progress;

impl Database {
    /// Inserts the project and its tasks, positioned in the order given.
    pub fn create_project(
        &self,
        user_id: &str,
        project: NewProject,
        tasks: &[String],
    ) -> Result<ProjectWithTasks> {
        let name = project.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("project name is required"));
        }
        let descriptions = tasks
            .iter()
            .map(|task| task.trim())
            .collect::<Vec<_>>();
        if descriptions.iter().any(|task| task.is_empty()) {
            return Err(AppError::validation("task description is required"));
        }

        let id = new_id("proj");
        let now = timestamp(Utc::now());
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO projects (
                id, user_id, name, due_date, goal, needs_reminder,
                reminder_frequency, tone, suggestion, progress, status, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 'active', ?10, ?10)",
            params![
                id,
                user_id,
                name,
                project.due_date.map(|date| date.to_string()),
                project.goal,
                project.needs_reminder,
                project.reminder_frequency,
                project.tone,
                project.suggestion,
                now
            ],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO tasks (id, project_id, description, position, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
            )?;
            for (position, description) in descriptions.iter().enumerate() {
                insert.execute(params![new_id("task"), id, description, position as i64, now])?;
            }
        }
        tx.commit()?;

        tracing::debug!(project_id = %id, tasks = descriptions.len(), "created project");
        self.project_with_tasks(user_id, &id)
    }

    /// Newest first.
    pub fn list_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], project_from_row)?;

        let mut projects = Vec::new();
        for project in rows {
            projects.push(project?);
        }
        Ok(projects)
    }

    pub fn project_with_tasks(&self, user_id: &str, project_id: &str) -> Result<ProjectWithTasks> {
        let project = self.owned_project(user_id, project_id)?;
        let tasks = self.project_tasks(project_id)?;
        Ok(ProjectWithTasks { project, tasks })
    }

    pub fn update_project(
        &self,
        user_id: &str,
        project_id: &str,
        patch: &ProjectPatch,
    ) -> Result<Project> {
        self.owned_project(user_id, project_id)?;

        let assignments = project_assignments(patch)?;
        if assignments.is_empty() {
            return Err(AppError::validation("no valid fields to update"));
        }

        self.apply_assignments(
            "projects",
            assignments,
            true,
            "id = ? AND user_id = ?",
            &[project_id, user_id],
        )?;
        tracing::debug!(project_id, "updated project");
        self.owned_project(user_id, project_id)
    }

    /// Tasks go with it through the foreign key cascade.
    pub fn delete_project(&self, user_id: &str, project_id: &str) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM projects WHERE id = ?1 AND user_id = ?2",
            params![project_id, user_id],
        )?;
        if deleted == 0 {
            return Err(AppError::NotFound("project"));
        }
        tracing::debug!(project_id, "deleted project");
        Ok(())
    }

    pub(crate) fn project_tasks(&self, project_id: &str) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY position, rowid"
        ))?;
        let rows = stmt.query_map(params![project_id], task_from_row)?;

        let mut tasks = Vec::new();
        for task in rows {
            tasks.push(task?);
        }
        Ok(tasks)
    }

    /// Recounts the project's tasks and stores the derived percentage.
    pub(crate) fn recompute_progress(&self, project_id: &str) -> Result<u8> {
        let (total, completed): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(status = 'completed'), 0)
             FROM tasks WHERE project_id = ?1",
            params![project_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let value = progress(completed as u64, total as u64);
        self.conn.execute(
            "UPDATE projects SET progress = ?1, updated_at = ?2 WHERE id = ?3",
            params![value, timestamp(Utc::now()), project_id],
        )?;
        tracing::debug!(project_id, progress = value, "recomputed progress");
        Ok(value)
    }
}

/// Maps every field present in the patch onto its column. Progress is not
/// among them.
fn project_assignments(patch: &ProjectPatch) -> Result<Vec<Assignment>> {
    let mut assignments: Vec<Assignment> = Vec::new();

    if let Some(name) = &patch.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("project name cannot be empty"));
        }
        assignments.push(("name", Box::new(name.to_string())));
    }
    if let Some(due_date) = patch.due_date {
        assignments.push(("due_date", Box::new(due_date.map(|date| date.to_string()))));
    }
    if let Some(goal) = &patch.goal {
        assignments.push(("goal", Box::new(goal.clone())));
    }
    if let Some(needs_reminder) = patch.needs_reminder {
        assignments.push(("needs_reminder", Box::new(needs_reminder)));
    }
    if let Some(frequency) = patch.reminder_frequency {
        assignments.push(("reminder_frequency", Box::new(frequency)));
    }
    if let Some(tone) = patch.tone {
        assignments.push(("tone", Box::new(tone)));
    }
    if let Some(suggestion) = &patch.suggestion {
        assignments.push(("suggestion", Box::new(suggestion.clone())));
    }
    if let Some(status) = patch.status {
        assignments.push(("status", Box::new(status)));
    }

    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::sign_in;
    use crate::models::{ProjectStatus, ReminderFrequency, Tone};
    use chrono::NaiveDate;

    fn launch(db: &Database, user_id: &str) -> ProjectWithTasks {
        db.create_project(
            user_id,
            NewProject {
                name: "Launch".into(),
                goal: Some("Ship v1".into()),
                ..Default::default()
            },
            &["Write spec".to_string(), "Review".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn create_positions_tasks_in_order() {
        let db = Database::in_memory().unwrap();
        let user = sign_in(&db, "ada@example.com");
        let created = launch(&db, &user.id);

        assert_eq!(created.project.progress, 0);
        assert_eq!(created.project.status, ProjectStatus::Active);
        assert_eq!(created.project.tone, Tone::Encouraging);
        let tasks: Vec<_> = created
            .tasks
            .iter()
            .map(|task| (task.position, task.description.as_str()))
            .collect();
        assert_eq!(tasks, vec![(0, "Write spec"), (1, "Review")]);
    }

    #[test]
    fn create_requires_a_name() {
        let db = Database::in_memory().unwrap();
        let user = sign_in(&db, "ada@example.com");
        let err = db
            .create_project(&user.id, NewProject::default(), &[])
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(db.list_projects(&user.id).unwrap().is_empty());
    }

    #[test]
    fn create_rejects_blank_task_descriptions() {
        let db = Database::in_memory().unwrap();
        let user = sign_in(&db, "ada@example.com");
        let err = db
            .create_project(
                &user.id,
                NewProject {
                    name: "Launch".into(),
                    ..Default::default()
                },
                &["Write spec".to_string(), "   ".to_string()],
            )
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(db.list_projects(&user.id).unwrap().is_empty());
    }

    #[test]
    fn list_is_newest_first_and_scoped_to_owner() {
        let db = Database::in_memory().unwrap();
        let ada = sign_in(&db, "ada@example.com");
        let bob = sign_in(&db, "bob@example.com");
        let first = launch(&db, &ada.id);
        let second = launch(&db, &ada.id);
        launch(&db, &bob.id);

        let ids: Vec<_> = db
            .list_projects(&ada.id)
            .unwrap()
            .into_iter()
            .map(|project| project.id)
            .collect();
        assert_eq!(ids, vec![second.project.id, first.project.id]);
    }

    #[test]
    fn update_touches_only_present_fields() {
        let db = Database::in_memory().unwrap();
        let user = sign_in(&db, "ada@example.com");
        let created = launch(&db, &user.id);

        let patch = ProjectPatch {
            due_date: Some(NaiveDate::from_ymd_opt(2026, 12, 1)),
            reminder_frequency: Some(ReminderFrequency::Daily),
            goal: Some(None),
            ..Default::default()
        };
        let updated = db
            .update_project(&user.id, &created.project.id, &patch)
            .unwrap();

        assert_eq!(updated.name, "Launch");
        assert_eq!(updated.due_date, NaiveDate::from_ymd_opt(2026, 12, 1));
        assert_eq!(updated.reminder_frequency, ReminderFrequency::Daily);
        assert_eq!(updated.goal, None);
        assert!(updated.updated_at >= created.project.updated_at);
    }

    #[test]
    fn empty_patch_is_rejected_and_row_unchanged() {
        let db = Database::in_memory().unwrap();
        let user = sign_in(&db, "ada@example.com");
        let created = launch(&db, &user.id);

        let err = db
            .update_project(&user.id, &created.project.id, &ProjectPatch::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let stored = db.owned_project(&user.id, &created.project.id).unwrap();
        assert_eq!(stored.updated_at, created.project.updated_at);
        assert_eq!(stored.goal.as_deref(), Some("Ship v1"));
    }

    #[test]
    fn foreign_update_is_not_found() {
        let db = Database::in_memory().unwrap();
        let ada = sign_in(&db, "ada@example.com");
        let bob = sign_in(&db, "bob@example.com");
        let created = launch(&db, &ada.id);

        let patch = ProjectPatch {
            name: Some("Hijacked".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_project(&bob.id, &created.project.id, &patch),
            Err(AppError::NotFound("project"))
        ));
        assert!(matches!(
            db.delete_project(&bob.id, &created.project.id),
            Err(AppError::NotFound("project"))
        ));
        assert_eq!(db.owned_project(&ada.id, &created.project.id).unwrap().name, "Launch");
    }

    #[test]
    fn delete_cascades_to_tasks() {
        let db = Database::in_memory().unwrap();
        let user = sign_in(&db, "ada@example.com");
        let created = launch(&db, &user.id);

        db.delete_project(&user.id, &created.project.id).unwrap();

        let orphans: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(
            db.owned_task(&user.id, &created.tasks[0].id),
            Err(AppError::NotFound("task"))
        ));
    }
}
