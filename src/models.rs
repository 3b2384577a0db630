use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Closed set of lowercase string values stored as TEXT columns.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|err| FromSqlError::Other(Box::new(err)))
            }
        }
    };
}

text_enum!(ReminderFrequency {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
});

text_enum!(
    /// Voice used when nudging the user about a project.
    Tone {
        Encouraging => "encouraging",
        Gentle => "gentle",
        Firm => "firm",
        Humorous => "humorous",
    }
);

text_enum!(ProjectStatus {
    Active => "active",
    Paused => "paused",
    Completed => "completed",
    Archived => "archived",
});

text_enum!(TaskStatus {
    Pending => "pending",
    Completed => "completed",
});

impl Default for ReminderFrequency {
    fn default() -> Self {
        Self::Weekly
    }
}

impl Default for Tone {
    fn default() -> Self {
        Self::Encouraging
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub auth_provider: String,
    pub created_at: DateTime<Utc>,
}

/// Identity handed over by the external provider once sign-in completed.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub due_date: Option<NaiveDate>,
    pub goal: Option<String>,
    pub needs_reminder: bool,
    pub reminder_frequency: ReminderFrequency,
    pub tone: Tone,
    pub suggestion: Option<String>,
    pub progress: u8,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub description: String,
    pub status: TaskStatus,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithTasks {
    pub project: Project,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub needs_reminder: bool,
    #[serde(default)]
    pub reminder_frequency: ReminderFrequency,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// Partial project update. Absent fields keep their stored value; for the
/// nullable columns an explicit `null` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "present")]
    pub goal: Option<Option<String>>,
    #[serde(default)]
    pub needs_reminder: Option<bool>,
    #[serde(default)]
    pub reminder_frequency: Option<ReminderFrequency>,
    #[serde(default)]
    pub tone: Option<Tone>,
    #[serde(default, deserialize_with = "present")]
    pub suggestion: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Distinguishes a field sent as `null` (`Some(None)`) from one that was
/// never sent (`None`, via `#[serde(default)]`).
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
