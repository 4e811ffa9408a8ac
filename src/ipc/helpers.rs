use serde_json::Value;

use super::error::HandlerErr;

pub fn param_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    match params.get(key).and_then(|v| v.as_str()) {
        Some(v) => Ok(v.to_string()),
        None => Err(HandlerErr::new("bad_params", format!("missing {key}"))),
    }
}

pub fn param_str_list(params: &Value, key: &str) -> Result<Vec<String>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    HandlerErr::new("bad_params", format!("{key} must be a list of strings"))
                })
            })
            .collect(),
        Some(_) => Err(HandlerErr::new(
            "bad_params",
            format!("{key} must be a list of strings"),
        )),
    }
}
