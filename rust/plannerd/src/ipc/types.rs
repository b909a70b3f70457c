use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::engine::WeekNumberCache;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Cleared on workspace switch and on every calendar event mutation.
    pub week_numbers: WeekNumberCache,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            week_numbers: WeekNumberCache::new(),
        }
    }
}
