//! goaltrack: projects with goals, due dates and tasks, plus free-form notes,
//! served as a JSON API over SQLite.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod progress;
