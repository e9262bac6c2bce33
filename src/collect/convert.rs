//! Lenient conversions of collected JSON values into typed fields.
//!
//! Shops deliver numbers as strings, booleans as "1"/"yes", and timestamps
//! where dates are expected.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use super::token::render;

/// Non-empty, trimmed text.
pub fn to_text(value: &Value) -> Option<String> {
    let text = render(value);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Decimal from a JSON number or a numeric string. A decimal comma is
/// accepted when there is no decimal point.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| {
            (!text.contains('.') && text.matches(',').count() == 1)
                .then(|| Decimal::from_str(&text.replace(',', ".")).ok())
                .flatten()
        })
}

/// Boolean from true/false, 1/0, yes/no (any case).
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" | "on" => Some(true),
            "0" | "false" | "no" | "n" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Date from a value starting with `YYYY-MM-DD` (time parts are ignored).
pub fn to_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    let prefix = text.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Small integer code (1, "2", "3.0").
pub fn to_code(value: &Value) -> Option<u8> {
    let decimal = to_decimal(value)?;
    if decimal.fract().is_zero() {
        decimal.to_u8()
    } else {
        None
    }
}
