//! The part of every request that identifies the shop: format, test mode,
//! credentials and connector info.

use serde_json::{Map, Value, json};

use crate::config::Config;

/// Replaces the password in logged and stored requests.
pub const PASSWORD_MASK: &str = "REMOVED FOR SECURITY";

fn optional(value: Option<&str>) -> Value {
    value
        .filter(|v| !v.is_empty())
        .map_or(Value::Null, |v| Value::String(v.to_string()))
}

/// Envelope fields for a call. The contract is only included when the call
/// needs authentication.
pub fn envelope(config: &Config, needs_contract: bool) -> Map<String, Value> {
    let env = &config.environment;
    let mut map = Map::new();
    map.insert("format".into(), json!(env.response_format.as_str()));
    map.insert("testmode".into(), json!(u8::from(env.test_mode)));
    map.insert("lang".into(), json!(env.lang));

    if needs_contract {
        let contract = &config.contract;
        map.insert(
            "contract".into(),
            json!({
                "contractcode": contract.contract_code,
                "username": contract.user_name,
                "password": contract.password,
                "emailonerror": optional(contract.email_on_error.as_deref()),
                "emailonwarning": optional(contract.email_on_warning.as_deref()),
            }),
        );
    }

    let connector = &config.connector;
    map.insert(
        "connector".into(),
        json!({
            "application": connector.application,
            "webkit": connector.webkit,
            "development": connector.development,
            "remark": optional(connector.remark.as_deref()),
            "sourceuri": optional(connector.source_uri.as_deref()),
        }),
    );
    map
}

/// Full request: the envelope with the message fields merged in. Message
/// fields win on a name clash.
pub fn build_request(config: &Config, message: Value, needs_contract: bool) -> Value {
    let mut request = envelope(config, needs_contract);
    if let Value::Object(fields) = message {
        request.extend(fields);
    }
    Value::Object(request)
}

/// Copy of `request` that is safe to log.
pub fn masked(request: &Value) -> Value {
    let mut copy = request.clone();
    if let Some(password) = copy.pointer_mut("/contract/password") {
        *password = Value::String(PASSWORD_MASK.to_string());
    }
    copy
}
