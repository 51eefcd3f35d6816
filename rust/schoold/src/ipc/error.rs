use crate::notify::Notification;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Every envelope carries the notifications raised while serving it, even
/// when there are none.
pub fn attach_notifications(mut resp: serde_json::Value, notes: Vec<Notification>) -> serde_json::Value {
    if let Some(obj) = resp.as_object_mut() {
        obj.insert("notifications".to_string(), json!(notes));
    }
    resp
}
