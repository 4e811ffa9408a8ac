use crate::config::SessionBackend;
use crate::ipc::error::{err, ok, table_err, HandlerErr};
use crate::ipc::helpers::param_str;
use crate::ipc::types::{AppState, Request};
use crate::table::{RequestQuery, SessionStore, SqliteSessionStore};
use crate::tables::assignment_groups::{self, GroupsContext, TABLE_ID};
use serde_json::json;

/// Checks `params.table` names a table this sidecar serves.
fn table_param(req: &Request) -> Result<String, HandlerErr> {
    let table = param_str(&req.params, "table")?;
    if table != TABLE_ID {
        return Err(HandlerErr::new("unknown_table", format!("unknown table: {table}"))
            .with_details(json!({ "table": table })));
    }
    Ok(table)
}

/// `(userId, assignmentId)` of a request against the assignment groups table.
fn assignment_scope(req: &Request) -> Result<(String, String), HandlerErr> {
    table_param(req)?;
    let user_id = param_str(&req.params, "userId")?;
    let assignment_id = param_str(&req.params, "assignmentId")?;
    Ok((user_id, assignment_id))
}

fn handle_table_fetch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        db,
        default_per_page,
        session_backend,
        memory_sessions,
        ..
    } = state;
    let Some(conn) = db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let (user_id, assignment_id) = match assignment_scope(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let ctx = match GroupsContext::open(conn, &assignment_id, &user_id) {
        Ok(ctx) => ctx,
        Err(e) => return table_err(&req.id, &e),
    };
    let query = match RequestQuery::from_params(&req.params, "query") {
        Ok(q) => q,
        Err(e) => return table_err(&req.id, &e),
    };

    let table = assignment_groups::table(conn, *default_per_page);
    let mut sqlite_store;
    let store: &mut dyn SessionStore = match session_backend {
        SessionBackend::Sqlite => {
            sqlite_store = SqliteSessionStore::new(conn);
            &mut sqlite_store
        }
        SessionBackend::Memory => memory_sessions,
    };

    match table.produce_response(&ctx, &query, store, &user_id) {
        Ok(envelope) => ok(&req.id, json!(envelope)),
        Err(e) => table_err(&req.id, &e),
    }
}

fn handle_table_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        db,
        default_per_page,
        session_backend,
        memory_sessions,
        ..
    } = state;
    let Some(conn) = db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let user_id = match table_param(req).and_then(|_| param_str(&req.params, "userId")) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let table = assignment_groups::table(conn, *default_per_page);
    let sqlite_store = SqliteSessionStore::new(conn);
    let store: &dyn SessionStore = match session_backend {
        SessionBackend::Sqlite => &sqlite_store,
        SessionBackend::Memory => &*memory_sessions,
    };
    match table.session(store, &user_id) {
        Ok(session) => ok(&req.id, json!({ "table": TABLE_ID, "session": session })),
        Err(e) => table_err(&req.id, &e),
    }
}

fn handle_table_bootstrap(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (user_id, assignment_id) = match assignment_scope(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let ctx = match GroupsContext::open(conn, &assignment_id, &user_id) {
        Ok(ctx) => ctx,
        Err(e) => return table_err(&req.id, &e),
    };
    let table = assignment_groups::table(conn, state.default_per_page);
    ok(
        &req.id,
        json!({
            "id": table.id,
            "jsonUrl": ctx.json_url(),
            "checkboxName": table.checkbox_name(),
        }),
    )
}

fn handle_table_selection(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (user_id, assignment_id) = match assignment_scope(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let ctx = match GroupsContext::open(conn, &assignment_id, &user_id) {
        Ok(ctx) => ctx,
        Err(e) => return table_err(&req.id, &e),
    };
    let table = assignment_groups::table(conn, state.default_per_page);
    let ids = match RequestQuery::from_params(&req.params, "query")
        .and_then(|q| table.selected_ids(&q))
    {
        Ok(ids) => ids,
        Err(e) => return table_err(&req.id, &e),
    };

    match assignment_groups::selected_groups(&ctx, &ids) {
        Ok(groups) => ok(&req.id, json!({ "groups": groups })),
        Err(e) => table_err(&req.id, &e),
    }
}

fn handle_sessions_evict(state: &mut AppState, req: &Request) -> serde_json::Value {
    let user_id = match param_str(&req.params, "userId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let evicted = match state.session_backend {
        SessionBackend::Memory => state.memory_sessions.evict_user(&user_id),
        SessionBackend::Sqlite => {
            let Some(conn) = state.db.as_ref() else {
                return err(&req.id, "no_workspace", "select a workspace first", None);
            };
            SqliteSessionStore::new(conn).evict_user(&user_id)
        }
    };
    match evicted {
        Ok(n) => ok(&req.id, json!({ "evicted": n })),
        Err(e) => err(&req.id, "session_store_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "table.fetch" => Some(handle_table_fetch(state, req)),
        "table.session" => Some(handle_table_session(state, req)),
        "table.bootstrap" => Some(handle_table_bootstrap(state, req)),
        "table.selection" => Some(handle_table_selection(state, req)),
        "sessions.evict" => Some(handle_sessions_evict(state, req)),
        _ => None,
    }
}
