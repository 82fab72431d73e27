//! Flattening of extracted parameter values into display strings.
//!
//! The NLU service returns each parameter as a JSON value (null, bool,
//! number, string, list or object). Callers only ever see one string per
//! parameter, so every shape is reduced by [`flatten_value`]:
//!
//! - strings are returned unchanged
//! - numbers use fixed-point notation with six fractional digits
//! - booleans become `true` / `false`
//! - objects keep only the composite-entity keys in [`COMPOSITE_KEYS`],
//!   concatenated in that order
//! - lists contribute their first element only; an empty list is `""`
//! - null is `""`

use serde_json::{Map, Value};

/// Object keys that contribute to a flattened composite entity, in
/// concatenation order. Other keys are ignored.
pub const COMPOSITE_KEYS: [&str; 3] = ["amount", "unit", "date_time"];

const FRACTION_DIGITS: usize = 6;

pub fn flatten_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => format_number(number.as_f64().unwrap_or_default()),
        Value::Bool(flag) => flag.to_string(),
        Value::Object(fields) => flatten_composite(fields),
        // Only the first element is surfaced; the rest are dropped.
        Value::Array(items) => items.first().map(flatten_value).unwrap_or_default(),
        Value::Null => String::new(),
    }
}

/// Fixed-point rendering with six fractional digits. Never uses exponent
/// notation, however large or small the value.
pub fn format_number(number: f64) -> String {
    format!("{:.*}", FRACTION_DIGITS, number)
}

fn flatten_composite(fields: &Map<String, Value>) -> String {
    let mut flattened = String::new();

    for key in COMPOSITE_KEYS {
        let Some(field) = fields.get(key) else {
            continue;
        };
        match key {
            "amount" => flattened.push_str(&format_number(field.as_f64().unwrap_or_default())),
            _ => flattened.push_str(field.as_str().unwrap_or_default()),
        }
    }

    flattened
}
