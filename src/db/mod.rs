use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::Error::FromSqlConversionFailure;
use rusqlite::{params_from_iter, Connection, Row};

use crate::error::Result;
use crate::models::{Note, Project, Task, User};

mod access;
mod notes;
mod projects;
mod tasks;
mod users;

/// One connection per request. Dropped when the request finishes.
pub struct Database {
    conn: Connection,
}

/// Column name paired with the value it is set to. Column names are always
/// static strings, values are always bound.
type Assignment = (&'static str, Box<dyn ToSql>);

const USER_COLUMNS: &str = "id, email, name, image, auth_provider, created_at";
const PROJECT_COLUMNS: &str = "id, user_id, name, due_date, goal, needs_reminder, \
     reminder_frequency, tone, suggestion, progress, status, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, project_id, description, status, position, created_at, completed_at";
const NOTE_COLUMNS: &str = "id, user_id, title, content, created_at, updated_at";

impl Database {
    pub fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).inspect_err(|err| {
            tracing::error!(path = %path.as_ref().display(), error = %err, "opening database");
        })?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                image TEXT,
                auth_provider TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                due_date TEXT,
                goal TEXT,
                needs_reminder INTEGER NOT NULL DEFAULT 0,
                reminder_frequency TEXT NOT NULL DEFAULT 'weekly',
                tone TEXT NOT NULL DEFAULT 'encouraging',
                suggestion TEXT,
                progress INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'active',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id, created_at);
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                position INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                completed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, position);
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Runs `UPDATE <table> SET <assignments>, updated_at = ? WHERE <filter>`.
    /// Returns the number of rows touched.
    fn apply_assignments(
        &self,
        table: &str,
        assignments: Vec<Assignment>,
        touch_updated_at: bool,
        filter: &str,
        filter_values: &[&str],
    ) -> Result<usize> {
        let mut columns: Vec<String> = Vec::with_capacity(assignments.len() + 1);
        let mut values: Vec<Box<dyn ToSql>> = Vec::with_capacity(assignments.len() + 3);
        for (column, value) in assignments {
            columns.push(format!("{column} = ?"));
            values.push(value);
        }
        if touch_updated_at {
            columns.push("updated_at = ?".to_string());
            values.push(Box::new(timestamp(Utc::now())));
        }
        for value in filter_values {
            values.push(Box::new(value.to_string()));
        }

        let sql = format!("UPDATE {table} SET {} WHERE {filter}", columns.join(", "));
        let updated = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(updated)
    }
}

pub(crate) fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Stored timestamps that fail to parse are reported as conversion errors on
/// their column.
fn parse_datetime(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    parse_datetime(idx, &value)
}

fn optional_datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value.map(|value| parse_datetime(idx, &value)).transpose()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|value| {
            NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                .map_err(|err| FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
        })
        .transpose()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        image: row.get(3)?,
        auth_provider: row.get(4)?,
        created_at: datetime_column(row, 5)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        due_date: date_column(row, 3)?,
        goal: row.get(4)?,
        needs_reminder: row.get(5)?,
        reminder_frequency: row.get(6)?,
        tone: row.get(7)?,
        suggestion: row.get(8)?,
        progress: row.get(9)?,
        status: row.get(10)?,
        created_at: datetime_column(row, 11)?,
        updated_at: datetime_column(row, 12)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        position: row.get(4)?,
        created_at: datetime_column(row, 5)?,
        completed_at: optional_datetime_column(row, 6)?,
    })
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        created_at: datetime_column(row, 4)?,
        updated_at: datetime_column(row, 5)?,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_as_text() {
        let early = Utc::now();
        let late = early + chrono::Duration::milliseconds(1);
        assert!(timestamp(early) < timestamp(late));
        assert_eq!(timestamp(early).len(), timestamp(late).len());
    }

    #[test]
    fn ids_carry_their_prefix() {
        let id = new_id("proj");
        assert!(id.starts_with("proj_"));
        assert_ne!(id, new_id("proj"));
    }

    #[test]
    fn corrupt_timestamps_surface_as_store_errors() {
        let db = Database::in_memory().unwrap();
        let user = test_support::sign_in(&db, "ada@example.com");
        let created = db
            .create_project(
                &user.id,
                crate::models::NewProject {
                    name: "Launch".into(),
                    ..Default::default()
                },
                &["Write spec".to_string()],
            )
            .unwrap();
        let task_id = &created.tasks[0].id;

        db.conn
            .execute(
                "UPDATE tasks SET created_at = 'yesterday' WHERE id = ?1",
                [task_id],
            )
            .unwrap();
        let err = db.owned_task(&user.id, task_id).unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Store(FromSqlConversionFailure(5, Type::Text, _))
        ));

        db.conn
            .execute(
                "UPDATE projects SET due_date = 'someday' WHERE id = ?1",
                [&created.project.id],
            )
            .unwrap();
        assert!(db.owned_project(&user.id, &created.project.id).is_err());
    }

    #[test]
    fn migrate_is_idempotent() {
        let db = Database::in_memory().unwrap();
        db.migrate().unwrap();
    }
}
