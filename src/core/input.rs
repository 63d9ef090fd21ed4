use std::collections::HashMap;

use serde_json::Value;

use super::types::Unit;

/// Converts form-field text to a number the way a browser number coercion does:
/// blank text is zero, anything unparseable is NaN.
pub fn coerce_str(raw: &str) -> f64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0.0;
    }

    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    if let Some(value) = parse_radix_literal(text) {
        return value;
    }

    let is_decimal_literal = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !is_decimal_literal {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn coerce_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => coerce_str(s),
        Value::Bool(true) => 1.0,
        Value::Bool(false) | Value::Null => 0.0,
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Builds a unit from a loosely-typed host payload. Returns `None` unless the
/// price coerces to a finite positive number.
pub fn normalize_unit(payload: &Value) -> Option<Unit> {
    let fields = payload.as_object()?;
    let price = fields.get("price").map_or(f64::NAN, coerce_value);
    let unit = Unit {
        price,
        tax_rate: first_present(fields, &["taxRate", "tax_rate"])
            .map(coerce_value)
            .filter(|rate| rate.is_finite()),
        unit_id: first_present(fields, &["unit_id", "unitId"])
            .map(text_of)
            .unwrap_or_default(),
        plan: fields.get("plan").map(text_of).unwrap_or_default(),
    };
    unit.is_usable().then_some(unit)
}

/// Decodes `price`, `unit_id`/`unitId`, `plan` and `taxRate`/`tax_rate` from
/// URL query parameters.
pub fn unit_from_query(params: &HashMap<String, String>) -> Option<Unit> {
    let price = params.get("price").filter(|p| !p.is_empty())?;
    let unit = Unit {
        price: coerce_str(price),
        tax_rate: first_param(params, &["taxRate", "tax_rate"])
            .map(coerce_str)
            .filter(|rate| rate.is_finite()),
        unit_id: first_param(params, &["unit_id", "unitId"])
            .map(str::to_string)
            .unwrap_or_default(),
        plan: first_param(params, &["plan"])
            .map(str::to_string)
            .unwrap_or_default(),
    };
    unit.is_usable().then_some(unit)
}

fn first_param<'a>(params: &'a HashMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| params.get(*key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

fn parse_radix_literal(text: &str) -> Option<f64> {
    let lower = text.get(..2)?.to_ascii_lowercase();
    let radix = match lower.as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Some(f64::NAN);
    }
    Some(
        digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * radix as f64 + d as f64),
    )
}

fn first_present<'a>(
    fields: &'a serde_json::Map<String, Value>,
    keys: &[&str],
) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !is_blank(value))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other if is_blank(other) => String::new(),
        other => other.to_string(),
    }
}
