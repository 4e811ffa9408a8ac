use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "filtertable.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    create_schema(&conn)?;
    Ok(conn)
}

pub fn create_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignment_admins(
            assignment_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY(assignment_id, user_id),
            FOREIGN KEY(assignment_id) REFERENCES assignments(id),
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignment_groups(
            id TEXT PRIMARY KEY,
            assignment_id TEXT NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            status INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(assignment_id) REFERENCES assignments(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignment_groups_assignment ON assignment_groups(assignment_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS group_candidates(
            group_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY(group_id, user_id),
            FOREIGN KEY(group_id) REFERENCES assignment_groups(id),
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS group_examiners(
            group_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY(group_id, user_id),
            FOREIGN KEY(group_id) REFERENCES assignment_groups(id),
            FOREIGN KEY(user_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_group_examiners_user ON group_examiners(user_id)",
        [],
    )?;

    // Keyed by the host's user id, not tied to `users`.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS table_sessions(
            user_id TEXT NOT NULL,
            table_id TEXT NOT NULL,
            state_json TEXT NOT NULL,
            PRIMARY KEY(user_id, table_id)
        )",
        [],
    )?;
    ensure_table_sessions_updated_at(conn)?;

    Ok(())
}

pub fn user_id_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM users WHERE username = ?",
        [username],
        |r| r.get(0),
    )
    .optional()
}

// Early workspaces stored session state without a timestamp.
fn ensure_table_sessions_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "table_sessions", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE table_sessions ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
