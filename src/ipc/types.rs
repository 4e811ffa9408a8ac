use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::{Config, SessionBackend};
use crate::table::MemorySessionStore;

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
    pub default_per_page: usize,
    pub session_backend: SessionBackend,
    pub memory_sessions: MemorySessionStore,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            workspace: None,
            db: None,
            default_per_page: config.default_per_page as usize,
            session_backend: config.session_store,
            memory_sessions: MemorySessionStore::new(),
        }
    }
}
