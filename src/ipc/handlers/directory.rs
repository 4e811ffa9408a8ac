use crate::db;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{param_str, param_str_list};
use crate::ipc::types::{AppState, Request};
use crate::tables::assignment_groups::STATUS_LABELS;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn db_err(code: &'static str, table: &str, e: rusqlite::Error) -> HandlerErr {
    HandlerErr::new(code, e.to_string()).with_details(json!({ "table": table }))
}

fn resolve_usernames(conn: &Connection, usernames: &[String]) -> Result<Vec<String>, HandlerErr> {
    usernames
        .iter()
        .map(|name| {
            db::user_id_by_username(conn, name)
                .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?
                .ok_or_else(|| {
                    HandlerErr::new("not_found", "user not found")
                        .with_details(json!({ "username": name }))
                })
        })
        .collect()
}

fn handle_users_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let username = match param_str(&req.params, "username") {
        Ok(v) => v.trim().to_string(),
        Err(e) => return e.response(&req.id),
    };
    if username.is_empty() {
        return err(&req.id, "bad_params", "username must not be empty", None);
    }

    let user_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO users(id, username) VALUES(?, ?)",
        (&user_id, &username),
    ) {
        return db_err("db_insert_failed", "users", e).response(&req.id);
    }

    ok(&req.id, json!({ "userId": user_id, "username": username }))
}

fn create_assignment(conn: &Connection, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let name = param_str(&req.params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::new("bad_params", "name must not be empty"));
    }
    let admins = resolve_usernames(conn, &param_str_list(&req.params, "admins")?)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    let assignment_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO assignments(id, name) VALUES(?, ?)",
        (&assignment_id, &name),
    )
    .map_err(|e| db_err("db_insert_failed", "assignments", e))?;
    for user_id in &admins {
        tx.execute(
            "INSERT OR IGNORE INTO assignment_admins(assignment_id, user_id) VALUES(?, ?)",
            (&assignment_id, user_id),
        )
        .map_err(|e| db_err("db_insert_failed", "assignment_admins", e))?;
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    Ok(json!({ "assignmentId": assignment_id, "name": name }))
}

fn create_group(conn: &Connection, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = param_str(&req.params, "assignmentId")?;
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    let status = match req.params.get("status") {
        None => 0,
        Some(v) => match v.as_i64() {
            Some(s) if (0..STATUS_LABELS.len() as i64).contains(&s) => s,
            _ => {
                return Err(HandlerErr::new(
                    "bad_params",
                    format!("status must be an integer in 0..{}", STATUS_LABELS.len()),
                )
                .with_details(json!({ "status": v })))
            }
        },
    };

    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM assignments WHERE id = ?",
            [&assignment_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    if exists.is_none() {
        return Err(HandlerErr::new("not_found", "assignment not found")
            .with_details(json!({ "assignmentId": assignment_id })));
    }

    let candidates = resolve_usernames(conn, &param_str_list(&req.params, "candidates")?)?;
    let examiners = resolve_usernames(conn, &param_str_list(&req.params, "examiners")?)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    let group_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO assignment_groups(id, assignment_id, name, status) VALUES(?, ?, ?, ?)",
        (&group_id, &assignment_id, &name, status),
    )
    .map_err(|e| db_err("db_insert_failed", "assignment_groups", e))?;
    for (table, members) in [
        ("group_candidates", &candidates),
        ("group_examiners", &examiners),
    ] {
        let sql = format!("INSERT OR IGNORE INTO {table}(group_id, user_id) VALUES(?, ?)");
        for user_id in members {
            tx.execute(&sql, (&group_id, user_id))
                .map_err(|e| db_err("db_insert_failed", table, e))?;
        }
    }
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;

    Ok(json!({ "groupId": group_id }))
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match create_assignment(conn, req) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_groups_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match create_group(conn, req) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.create" => Some(handle_users_create(state, req)),
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "groups.create" => Some(handle_groups_create(state, req)),
        _ => None,
    }
}
