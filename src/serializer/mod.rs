//! Validation of incoming JSON bodies and the outgoing representation of
//! every entity.
//!
//! Validation collects every problem before failing, so a client gets all
//! field errors for a payload at once.

mod owned_person;
mod person;
mod position;
mod team;

pub use owned_person::owned_person_draft;
pub use person::person_draft;
pub use position::position_draft;
pub use team::team_draft;

use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field name to the list of problems found with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

/// Outgoing JSON shape of a stored record.
pub trait Represent {
    fn represent(&self) -> Value;
}

pub fn represent_all<T: Represent>(rows: &[T]) -> Value {
    Value::Array(rows.iter().map(Represent::represent).collect())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Reads typed fields out of a JSON object body, recording errors as it goes.
///
/// Each reader returns `None` when the field failed validation. Fields not
/// read are ignored, which is how read-only fields like `id` get dropped.
pub struct Fields<'a> {
    body: &'a Map<String, Value>,
    errors: FieldErrors,
}

impl<'a> Fields<'a> {
    pub fn new(body: &'a Value) -> Result<Self, FieldErrors> {
        match body {
            Value::Object(body) => Ok(Self { body, errors: FieldErrors::default() }),
            other => {
                let mut errors = FieldErrors::default();
                errors.add(
                    NON_FIELD_ERRORS,
                    format!("Invalid data. Expected a dictionary, but got {}.", json_type(other)),
                );
                Err(errors)
            }
        }
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.has(field)
    }

    /// Required, non-blank string of at most `max_len` characters.
    pub fn required_str(&mut self, field: &str, max_len: usize) -> Option<String> {
        match self.body.get(field) {
            None => {
                self.error(field, "This field is required.");
                None
            }
            Some(Value::Null) => {
                self.error(field, "This field may not be null.");
                None
            }
            Some(value) => self.string_value(field, value, max_len, false),
        }
    }

    /// Optional string that may be null or blank. Missing keeps `current`.
    pub fn optional_str(&mut self, field: &str, current: Option<String>) -> Option<Option<String>> {
        match self.body.get(field) {
            None => Some(current),
            Some(Value::Null) => Some(None),
            Some(value) => self.string_value(field, value, usize::MAX, true).map(Some),
        }
    }

    fn string_value(&mut self, field: &str, value: &Value, max_len: usize, allow_blank: bool) -> Option<String> {
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.error(field, "Not a valid string.");
                return None;
            }
        };
        if text.is_empty() && !allow_blank {
            self.error(field, "This field may not be blank.");
            return None;
        }
        if text.chars().count() > max_len {
            self.error(field, format!("Ensure this field has no more than {} characters.", max_len));
            return None;
        }
        Some(text)
    }

    /// Enumerated string. Missing falls back to `default`; no default makes it required.
    pub fn choice<T>(&mut self, field: &str, parse: fn(&str) -> Option<T>, default: Option<T>) -> Option<T> {
        match (self.body.get(field), default) {
            (None, Some(default)) => Some(default),
            (None, None) => {
                self.error(field, "This field is required.");
                None
            }
            (Some(Value::Null), _) => {
                self.error(field, "This field may not be null.");
                None
            }
            (Some(value), _) => {
                let raw = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let parsed = parse(&raw);
                if parsed.is_none() {
                    self.error(field, format!("\"{}\" is not a valid choice.", raw));
                }
                parsed
            }
        }
    }

    /// Integer within `min..=max`. Missing falls back to `default`.
    pub fn integer(&mut self, field: &str, min: i32, max: i32, default: i32) -> Option<i32> {
        let value = match self.body.get(field) {
            None => return Some(default),
            Some(Value::Null) => {
                self.error(field, "This field may not be null.");
                return None;
            }
            Some(value) => value,
        };

        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        let Some(number) = parsed else {
            self.error(field, "A valid integer is required.");
            return None;
        };
        if number < i64::from(min) {
            self.error(field, format!("Ensure this value is greater than or equal to {}.", min));
            return None;
        }
        if number > i64::from(max) {
            self.error(field, format!("Ensure this value is less than or equal to {}.", max));
            return None;
        }
        i32::try_from(number).ok()
    }

    /// Nullable primary-key reference. Missing keeps `current`.
    pub fn optional_pk(&mut self, field: &str, current: Option<i64>) -> Option<Option<i64>> {
        match self.body.get(field) {
            None => Some(current),
            Some(Value::Null) => Some(None),
            Some(Value::Number(n)) if n.as_i64().is_some() => Some(n.as_i64()),
            Some(Value::String(s)) if s.trim().parse::<i64>().is_ok() => Some(s.trim().parse().ok()),
            Some(other) => {
                self.error(
                    field,
                    format!("Incorrect type. Expected pk value, received {}.", json_type(other)),
                );
                None
            }
        }
    }

    pub fn missing_reference(&mut self, field: &str, pk: i64) {
        self.error(field, format!("Invalid pk \"{}\" - object does not exist.", pk));
    }

    /// Build the validated value, or return every error collected.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> Result<T, FieldErrors> {
        if !self.errors.is_empty() {
            return Err(self.errors);
        }
        let mut errors = self.errors;
        build().ok_or_else(|| {
            errors.add(NON_FIELD_ERRORS, "Invalid data.");
            errors
        })
    }
}
