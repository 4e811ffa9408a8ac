mod config;
mod db;
mod ipc;
mod logging;
mod query;
mod table;
mod tables;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::{debug, warn};

use config::Config;

fn main() -> ExitCode {
    let config = Config::parse();
    if let Err(e) = logging::init(&config.log_level, config.log_format) {
        eprintln!("filtertabled: {e:#}");
        return ExitCode::FAILURE;
    }

    let mut state = ipc::AppState::new(&config);
    if let Some(path) = config.workspace.clone() {
        if let Err(e) = ipc::open_workspace(&mut state, path) {
            eprintln!("filtertabled: {e:#}");
            return ExitCode::FAILURE;
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                warn!("bad request line: {e}");
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    ExitCode::SUCCESS
}
