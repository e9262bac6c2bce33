//! Normalization of Acumulus responses.
//!
//! The web service is loose about shapes, especially in XML where a list
//! with one element is indistinguishable from a single element and an empty
//! list is an empty string. Everything is normalized here so the rest of the
//! crate sees one shape only.

use serde_json::{Map, Value};

use crate::result::{AcumulusResult, ApiStatus, Message, Severity};

/// Where the main response sits in the decoded body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKey {
    /// Everything except status, errors and warnings.
    Whole,
    /// A single structure under `key`.
    Key(&'static str),
    /// A list of `item` elements under `key`.
    List { key: &'static str, item: &'static str },
}

fn status_of(value: Option<&Value>) -> Option<ApiStatus> {
    let code = match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    u8::try_from(code).ok().and_then(ApiStatus::from_code)
}

/// `x`, `[x, y]`, `""` or nothing, as a list.
fn one_or_many(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

/// Messages from an `errors`/`warnings` block: missing, `""`, `{error: x}`,
/// `{error: [x, y]}` or a bare list.
fn messages_of(block: Option<Value>, item: &str, severity: Severity) -> Vec<Message> {
    let items = match block {
        Some(Value::Object(mut map)) => one_or_many(map.remove(item)),
        other => one_or_many(other),
    };
    items.iter().map(|v| Message::from_api(v, severity)).collect()
}

/// Turn a decoded response body into a result.
///
/// The result's response holds what remains after removing status, errors,
/// warnings and `count_*` fields.
pub fn normalize(body: Value) -> AcumulusResult {
    let mut result = AcumulusResult::new();
    let mut map = match body {
        Value::Object(map) => map,
        other => {
            result.add_message(Message::tagged(
                Severity::Exception,
                "response-shape",
                format!("response is not a structure: {other}"),
            ));
            return result;
        }
    };

    match status_of(map.get("status")) {
        Some(status) => {
            result.set_api_status(status);
        }
        None => {
            result.add_message(Message::tagged(
                Severity::Exception,
                "response-status",
                "response contains no valid status",
            ));
        }
    }
    map.remove("status");

    result.add_messages(messages_of(map.remove("errors"), "error", Severity::Error));
    result.add_messages(messages_of(map.remove("warnings"), "warning", Severity::Warning));
    map.retain(|key, _| !key.starts_with("count_"));

    result.set_response(Value::Object(map));
    result
}

/// Narrow the response of `result` down to the part under `key`.
pub fn extract(result: &mut AcumulusResult, key: ResponseKey) {
    let Some(Value::Object(map)) = result.response() else {
        return;
    };
    let main = match key {
        ResponseKey::Whole => return,
        ResponseKey::Key(key) => map.get(key).cloned().unwrap_or(Value::Null),
        ResponseKey::List { key, item } => {
            let list = match map.get(key) {
                Some(Value::Object(inner)) => one_or_many(inner.get(item).cloned()),
                other => one_or_many(other.cloned()),
            };
            Value::Array(list.into_iter().map(strip_counts).collect())
        }
    };
    result.set_response(strip_counts(main));
}

fn strip_counts(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| !k.starts_with("count_"))
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}
