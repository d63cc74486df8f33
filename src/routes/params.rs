//! Numeric input parsing shared by the route handlers.
//!
//! Clients send ids and measurements either as JSON numbers or as strings.
//! Both are accepted; anything else is a validation error naming the field.

use std::{borrow::Cow, str::FromStr};

use axum::{extract::rejection::JsonRejection, Json};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::ApiError;

// ---

fn invalid(field: &str) -> ApiError {
    ApiError::validation(format!("Invalid {field}: expected a number"))
}

/// Text form of a numeric JSON value, if it has one.
fn numeric_text<'a>(field: &str, value: Option<&'a Value>) -> Result<Cow<'a, str>, ApiError> {
    // ---
    match value {
        Some(Value::Number(n)) => Ok(n.to_string().into()),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().into()),
        _ => Err(invalid(field)),
    }
}

/// Unwrap a JSON request body that must be an object.
pub fn body_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    // ---
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(_) => Err(ApiError::validation("Request body must be a JSON object")),
        Err(rejection) => Err(ApiError::validation(rejection.body_text())),
    }
}

/// Parse an integer id such as `silo_id`.
///
/// A JSON float is accepted only when it is integral (`42.0`).
pub fn parse_id(field: &str, value: Option<&Value>) -> Result<i32, ApiError> {
    // ---
    if let Some(Value::Number(n)) = value {
        if n.is_f64() {
            return n
                .as_f64()
                .filter(|f| f.fract() == 0.0)
                .filter(|f| (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(f))
                .map(|f| f as i32)
                .ok_or_else(|| invalid(field));
        }
    }

    let text = numeric_text(field, value)?;
    i32::from_str(&text).map_err(|_| invalid(field))
}

/// Parse a path segment id.
pub fn parse_path_id(field: &str, raw: &str) -> Result<i32, ApiError> {
    raw.trim().parse::<i32>().map_err(|_| invalid(field))
}

/// Parse a measurement such as `level_value` into a fixed-point decimal.
///
/// Plain (`12.5`) and scientific (`1.25e1`) notation only. Digit
/// separators are refused, and so is any value that would have to be
/// rounded to fit a `Decimal`.
pub fn parse_decimal(field: &str, value: Option<&Value>) -> Result<Decimal, ApiError> {
    // ---
    let text = numeric_text(field, value)?;
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
    if !text.chars().all(allowed) {
        return Err(invalid(field));
    }

    match text.find(|c| c == 'e' || c == 'E') {
        None => exact_decimal(&text).ok_or_else(|| invalid(field)),
        Some(pos) => {
            exact_decimal(&text[..pos]).ok_or_else(|| invalid(field))?;
            Decimal::from_scientific(&text).map_err(|_| invalid(field))
        }
    }
}

/// Parse plain decimal text; `None` if malformed or if parsing rounded it.
fn exact_decimal(text: &str) -> Option<Decimal> {
    // ---
    let parsed = Decimal::from_str(text).ok()?;
    let fraction_digits = text.split_once('.').map_or(0, |(_, frac)| frac.len());
    (parsed.scale() as usize == fraction_digits).then_some(parsed)
}

/// Read an optional string field, rejecting non-string values.
pub fn optional_string(field: &str, value: Option<&Value>) -> Result<Option<String>, ApiError> {
    // ---
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ApiError::validation(format!(
            "Invalid {field}: expected a string"
        ))),
    }
}

/// Read a required string field.
pub fn required_string(field: &str, value: Option<&Value>) -> Result<String, ApiError> {
    optional_string(field, value)?
        .ok_or_else(|| ApiError::validation(format!("Missing {field}")))
}
