use std::collections::HashMap;

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};

use super::session::SessionState;

/// Per-user table state, one entry per `(user_id, table_id)`.
///
/// Writes are plain overwrites: concurrent requests from the same user race and
/// the last save wins.
pub trait SessionStore {
    fn load(&self, user_id: &str, table_id: &str) -> anyhow::Result<Option<SessionState>>;

    fn save(&mut self, user_id: &str, table_id: &str, state: &SessionState)
        -> anyhow::Result<()>;

    /// Drops every table state of one user. Returns how many were removed.
    fn evict_user(&mut self, user_id: &str) -> anyhow::Result<usize>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    states: HashMap<(String, String), SessionState>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, user_id: &str, table_id: &str) -> anyhow::Result<Option<SessionState>> {
        Ok(self
            .states
            .get(&(user_id.to_string(), table_id.to_string()))
            .cloned())
    }

    fn save(
        &mut self,
        user_id: &str,
        table_id: &str,
        state: &SessionState,
    ) -> anyhow::Result<()> {
        self.states
            .insert((user_id.to_string(), table_id.to_string()), state.clone());
        Ok(())
    }

    fn evict_user(&mut self, user_id: &str) -> anyhow::Result<usize> {
        let before = self.states.len();
        self.states.retain(|(user, _), _| user != user_id);
        Ok(before - self.states.len())
    }
}

/// Stores state as JSON in the workspace database (`table_sessions`).
pub struct SqliteSessionStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteSessionStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl SessionStore for SqliteSessionStore<'_> {
    fn load(&self, user_id: &str, table_id: &str) -> anyhow::Result<Option<SessionState>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM table_sessions WHERE user_id = ? AND table_id = ?",
                (user_id, table_id),
                |r| r.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let state = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt session state for table {table_id}"))?;
        Ok(Some(state))
    }

    fn save(
        &mut self,
        user_id: &str,
        table_id: &str,
        state: &SessionState,
    ) -> anyhow::Result<()> {
        let raw = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT INTO table_sessions(user_id, table_id, state_json, updated_at)
             VALUES(?, ?, ?, strftime('%Y-%m-%dT%H:%M:%SZ','now'))
             ON CONFLICT(user_id, table_id) DO UPDATE SET
               state_json = excluded.state_json,
               updated_at = excluded.updated_at",
            (user_id, table_id, &raw),
        )?;
        Ok(())
    }

    fn evict_user(&mut self, user_id: &str) -> anyhow::Result<usize> {
        let n = self
            .conn
            .execute("DELETE FROM table_sessions WHERE user_id = ?", [user_id])?;
        Ok(n)
    }
}
