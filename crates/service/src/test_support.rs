#![cfg(test)]
use serde_json::{json, Value};

use crate::gitea::webhook::Webhook;

pub fn pull_request_payload() -> Value {
    json!({
        "id": 41,
        "number": 3,
        "title": "Add widget polishing",
        "body": "Polishes widgets.\nAlso buffs them.",
        "comments": 0,
        "user": {"email": "alice@noreply.example", "username": "alice"},
        "html_url": "https://git.example.com/acme/widgets/pulls/3",
        "state": "open",
        "merged": false
    })
}

/// A pull request event with `extra` merged into the top level.
pub fn webhook_json(action: &str, extra: Value) -> String {
    let mut body = json!({
        "action": action,
        "number": 3,
        "pull_request": pull_request_payload(),
        "sender": {"email": "alice@noreply.example", "username": "alice"},
        "repository": {"full_name": "acme/widgets"},
    });
    if let (Some(obj), Value::Object(extra)) = (body.as_object_mut(), extra) {
        obj.extend(extra);
    }
    body.to_string()
}

pub fn webhook(action: &str, extra: Value) -> Webhook {
    Webhook::from_slice(webhook_json(action, extra).as_bytes()).expect("valid webhook fixture")
}
