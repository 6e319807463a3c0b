//! Schema conversion between the ShareGPT-style `conversations` layout
//! (`from`/`value` pairs) and the chat `messages` layout (`role`/`content`),
//! plus the flattening pass for datasets whose message payloads arrived
//! nested or JSON-encoded.

use anyhow::{anyhow, bail, Result};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::{ROLE_ASSISTANT, ROLE_SYSTEM, ROLE_USER};

static ROLE_MAPPING: Lazy<HashMap<&str, &str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("system", ROLE_SYSTEM);
    m.insert("human", ROLE_USER);
    m.insert("gpt", ROLE_ASSISTANT);
    m
});

fn map_role(from: &str) -> String {
    // Unrecognized speakers pass through unchanged
    ROLE_MAPPING.get(from).copied().unwrap_or(from).to_string()
}

/// Convert one `conversations` entry to a `{role, content}` object. Accepts
/// the usual `{"from": ..., "value": ...}` map as well as the two-element
/// `[from, value]` array some exports use.
pub fn convert_entry(entry: &Value) -> Result<Value> {
    match entry {
        Value::Array(items) => {
            let from = items.first().and_then(Value::as_str).unwrap_or_default();
            let content = items.get(1).cloned().unwrap_or(Value::Null);
            Ok(json!({ "role": map_role(from), "content": content }))
        }
        Value::Object(obj) => {
            let from = obj.get("from").and_then(Value::as_str).unwrap_or_default();
            let content = obj.get("value").cloned().unwrap_or(Value::Null);
            Ok(json!({ "role": map_role(from), "content": content }))
        }
        other => bail!("unexpected conversation entry: {other}"),
    }
}

/// Recursively rename `conversations` to `messages` anywhere inside a row.
/// Objects without a `conversations` key recurse into their values; arrays
/// recurse into their elements; scalars pass through.
pub fn process_row(value: Value) -> Result<Value> {
    match value {
        Value::Object(mut obj) => {
            if let Some(entries) = obj.remove("conversations") {
                let Value::Array(entries) = entries else {
                    bail!("'conversations' is not a list");
                };
                let messages = entries
                    .iter()
                    .map(convert_entry)
                    .collect::<Result<Vec<_>>>()?;
                obj.insert("messages".to_string(), Value::Array(messages));
                Ok(Value::Object(obj))
            } else {
                let mut out = Map::new();
                for (key, inner) in obj {
                    out.insert(key, process_row(inner)?);
                }
                Ok(Value::Object(out))
            }
        }
        Value::Array(items) => Ok(Value::Array(
            items.into_iter().map(process_row).collect::<Result<Vec<_>>>()?,
        )),
        other => Ok(other),
    }
}

/// Unwrap the nested `{"messages": {"messages": [...]}}` shape (the inner
/// value may itself be a JSON-encoded string) and reorder the turns so that
/// the first system message, when present, leads the conversation. Later
/// system messages are dropped. The result carries only `messages`.
pub fn normalize_nested(row: &Value) -> Result<Value> {
    let raw = row
        .get("messages")
        .ok_or_else(|| anyhow!("row has no 'messages' field"))?;
    let unwrapped: Value = match raw {
        Value::String(s) => serde_json::from_str(s)?,
        other => other.clone(),
    };
    let inner = match &unwrapped {
        Value::Object(obj) => obj
            .get("messages")
            .cloned()
            .ok_or_else(|| anyhow!("nested 'messages' object has no 'messages' list"))?,
        other => other.clone(),
    };
    let Value::Array(messages) = inner else {
        bail!("'messages' did not resolve to a list");
    };

    let role_of = |msg: &Value| -> Option<String> {
        msg.get("role").and_then(Value::as_str).map(str::to_string)
    };

    let mut ordered = Vec::with_capacity(messages.len());
    if let Some(system) = messages
        .iter()
        .find(|m| role_of(m).as_deref() == Some(ROLE_SYSTEM))
    {
        ordered.push(system.clone());
    }
    for msg in &messages {
        if role_of(msg).as_deref() != Some(ROLE_SYSTEM) {
            ordered.push(msg.clone());
        }
    }
    Ok(json!({ "messages": ordered }))
}

/// Drop the record's final message when its role is `user`. Returns true if a
/// message was removed. Everything else in the row is left untouched.
pub fn strip_trailing_user(row: &mut Value) -> bool {
    let Some(messages) = row.get_mut("messages").and_then(Value::as_array_mut) else {
        return false;
    };
    let last_is_user = messages
        .last()
        .and_then(|m| m.get("role"))
        .and_then(Value::as_str)
        == Some(ROLE_USER);
    if last_is_user {
        messages.pop();
    }
    last_is_user
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_from_map() {
        let entry = json!({"from": "human", "value": "Hello"});
        assert_eq!(
            convert_entry(&entry).unwrap(),
            json!({"role": "user", "content": "Hello"})
        );
    }

    #[test]
    fn entry_from_pair_array() {
        let entry = json!(["gpt", "Hi there!"]);
        assert_eq!(
            convert_entry(&entry).unwrap(),
            json!({"role": "assistant", "content": "Hi there!"})
        );
    }

    #[test]
    fn unknown_speaker_passes_through() {
        let entry = json!({"from": "observer", "value": "..."});
        assert_eq!(
            convert_entry(&entry).unwrap()["role"],
            json!("observer")
        );
    }

    #[test]
    fn row_conversion_replaces_conversations() {
        let row = json!({
            "id": 1,
            "conversations": [
                {"from": "human", "value": "Hello"},
                {"from": "gpt", "value": "Hi there!"}
            ]
        });
        let out = process_row(row).unwrap();
        assert!(out.get("conversations").is_none());
        assert_eq!(
            out["messages"],
            json!([
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Hi there!"}
            ])
        );
        assert_eq!(out["id"], json!(1));
    }

    #[test]
    fn row_conversion_recurses_into_nested_values() {
        let row = json!({
            "wrapper": {"conversations": [["human", "hi"]]}
        });
        let out = process_row(row).unwrap();
        assert_eq!(
            out["wrapper"]["messages"],
            json!([{"role": "user", "content": "hi"}])
        );
    }

    #[test]
    fn normalize_unwraps_json_encoded_payload() {
        let row = json!({
            "conv_id": "1",
            "messages": "{\"messages\": [{\"role\": \"user\", \"content\": \"Hello\"}, {\"role\": \"system\", \"content\": \"Be helpful\"}]}"
        });
        let out = normalize_nested(&row).unwrap();
        let roles: Vec<&str> = out["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user"], "system turn moves first");
        assert!(out.get("conv_id").is_none(), "only messages survive");
    }

    #[test]
    fn normalize_accepts_plain_message_lists() {
        let row = json!({"messages": [{"role": "user", "content": "hi"}]});
        let out = normalize_nested(&row).unwrap();
        assert_eq!(out["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn normalize_rejects_scalar_messages() {
        let row = json!({"messages": 7});
        assert!(normalize_nested(&row).is_err());
    }

    #[test]
    fn strip_removes_only_trailing_user_turn() {
        let mut row = json!({"messages": [
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"},
            {"role": "user", "content": "dangling"}
        ]});
        assert!(strip_trailing_user(&mut row));
        assert_eq!(row["messages"].as_array().unwrap().len(), 2);

        // Second application changes nothing: the tail is now an assistant turn
        assert!(!strip_trailing_user(&mut row));
        assert_eq!(row["messages"].as_array().unwrap().len(), 2);
    }
}
