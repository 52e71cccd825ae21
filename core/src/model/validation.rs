// FleetDocs
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Field-by-field validation of untrusted input.
//!
//! Request payloads, query strings and path parameters arrive as untyped JSON values.  A `Fields`
//! accumulator walks over them one field at a time, converting each into its typed counterpart
//! and recording a `FieldViolation` for every field that does not satisfy its constraints.  The
//! caller only obtains the typed value once every field has been checked, so a failure always
//! reports all offending fields at once and never yields a partially-built value.
//!
//! Fields that are absent and fields that are explicitly `null` are distinguished via `Patch`,
//! which is what partial updates need to tell "leave unchanged" apart from "clear".

use crate::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use url::Url;

/// A single constraint violation on a named field.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Name of the field that failed validation, as it appears in the input.
    pub field: String,

    /// Human-readable description of the violated constraint.
    pub message: String,
}

/// Collection of all the violations found while validating one input.
#[derive(Clone, Debug, Default, PartialEq, thiserror::Error)]
#[error("Validation error")]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    /// Creates a collection with a single violation of `field`.
    pub fn single<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self(vec![FieldViolation { field: field.into(), message: message.into() }])
    }

    /// Records a new violation of `field`.
    pub fn push<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.0.push(FieldViolation { field: field.into(), message: message.into() });
    }

    /// Returns true if no violations have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `field` has at least one recorded violation.
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }

    /// Returns the recorded violations in the order they were found.
    pub fn as_slice(&self) -> &[FieldViolation] {
        &self.0
    }

    /// Consumes the collection and returns the recorded violations.
    pub fn into_inner(self) -> Vec<FieldViolation> {
        self.0
    }
}

/// The outcome of looking up an optional field in an input.
#[derive(Clone, Debug, PartialEq)]
pub enum Patch<T> {
    /// The field was not present.
    Keep,

    /// The field was present and explicitly set to `null`.
    Clear,

    /// The field was present with a valid value.
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    /// Returns the value if one was set, discarding the difference between absent and `null`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Keep | Patch::Clear => None,
        }
    }

    /// Returns true if the field was absent.
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Applies this patch on top of the `current` value of a nullable attribute.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }

    /// Transforms the value, if any, with `f`.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Patch<U> {
        match self {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(f(value)),
        }
    }
}

/// Returns the name of the JSON type of `value` for use in error messages.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Array(_) => "array",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
        Value::Number(_) => "number",
        Value::Object(_) => "object",
        Value::String(_) => "string",
    }
}

/// Converts the key/value pairs of a query string into a JSON object so that they can be
/// validated with `Fields`.
pub fn query_object(query: HashMap<String, String>) -> Value {
    Value::Object(query.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
}

/// Accumulator of violations over the fields of one JSON object.
pub struct Fields<'a> {
    /// The object being validated, or none if the input was not an object at all.
    object: Option<&'a Map<String, Value>>,

    /// Violations found so far.
    violations: Violations,
}

impl<'a> Fields<'a> {
    /// Starts validating `input`, which is expected to be a JSON object.
    pub fn new(input: &'a Value) -> Self {
        let mut violations = Violations::default();
        let object = match input {
            Value::Object(map) => Some(map),
            other => {
                violations.push("body", format!("Expected object, received {}", type_name(other)));
                None
            }
        };
        Self { object, violations }
    }

    /// Looks up the raw value of field `name`.
    fn lookup(&self, name: &str) -> Patch<&'a Value> {
        match self.object.and_then(|object| object.get(name)) {
            None => Patch::Keep,
            Some(Value::Null) => Patch::Clear,
            Some(value) => Patch::Set(value),
        }
    }

    /// Records a violation of field `name`.
    pub fn reject<M: Into<String>>(&mut self, name: &str, message: M) {
        self.violations.push(name, message);
    }

    /// Extracts field `name` as a string.
    pub fn string(&mut self, name: &str) -> Patch<String> {
        match self.lookup(name) {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(Value::String(s)) => Patch::Set(s.clone()),
            Patch::Set(other) => {
                self.reject(name, format!("Expected string, received {}", type_name(other)));
                Patch::Keep
            }
        }
    }

    /// Extracts field `name` as a string that must not be empty, reporting `message` otherwise.
    pub fn non_empty(&mut self, name: &str, message: &str) -> Patch<String> {
        match self.string(name) {
            Patch::Set(s) if s.is_empty() => {
                self.reject(name, message);
                Patch::Keep
            }
            other => other,
        }
    }

    /// Extracts field `name` as a string and converts it to `T` with `parse`.
    pub fn parsed<T, F>(&mut self, name: &str, parse: F) -> Patch<T>
    where
        F: FnOnce(String) -> ModelResult<T>,
    {
        match self.string(name) {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(s) => match parse(s) {
                Ok(value) => Patch::Set(value),
                Err(e) => {
                    self.reject(name, e.0);
                    Patch::Keep
                }
            },
        }
    }

    /// Extracts field `name` as a string and converts it to `T` with `parse`, which reports all
    /// the rules the string breaks.
    pub fn parsed_all<T, F>(&mut self, name: &str, parse: F) -> Patch<T>
    where
        F: FnOnce(String) -> Result<T, Vec<ModelError>>,
    {
        match self.string(name) {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(s) => match parse(s) {
                Ok(value) => Patch::Set(value),
                Err(errors) => {
                    for e in errors {
                        self.reject(name, e.0);
                    }
                    Patch::Keep
                }
            },
        }
    }

    /// Extracts field `name` as a JSON integer.
    pub fn integer(&mut self, name: &str) -> Patch<i64> {
        match self.lookup(name) {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(Value::Number(n)) => match n.as_i64() {
                Some(i) => Patch::Set(i),
                None => {
                    self.reject(name, "Expected integer, received float");
                    Patch::Keep
                }
            },
            Patch::Set(other) => {
                self.reject(name, format!("Expected number, received {}", type_name(other)));
                Patch::Keep
            }
        }
    }

    /// Extracts field `name` as a string made only of decimal digits, as found in query strings
    /// and path parameters, and converts it to a number.
    pub fn digits(&mut self, name: &str, message: &str) -> Patch<u64> {
        match self.string(name) {
            Patch::Set(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                match s.parse::<u64>() {
                    Ok(n) => Patch::Set(n),
                    Err(_) => {
                        self.reject(name, "Number is too large");
                        Patch::Keep
                    }
                }
            }
            Patch::Set(_) => {
                self.reject(name, message);
                Patch::Keep
            }
            other => other.map(|_| 0),
        }
    }

    /// Extracts field `name` as an RFC 3339 timestamp.
    pub fn datetime(&mut self, name: &str) -> Patch<OffsetDateTime> {
        self.parsed(name, parse_datetime)
    }

    /// Extracts field `name` as an absolute URL.
    pub fn url(&mut self, name: &str, message: &str) -> Patch<String> {
        match self.string(name) {
            Patch::Set(s) if Url::parse(&s).is_err() => {
                self.reject(name, message);
                Patch::Keep
            }
            other => other,
        }
    }

    /// Checks that `value` was provided, recording `message` as a violation of `name` otherwise.
    ///
    /// No violation is recorded if the field already failed validation for another reason.
    pub fn required<T>(&mut self, name: &str, value: Patch<T>, message: &str) -> Option<T> {
        match value {
            Patch::Set(value) => Some(value),
            Patch::Keep | Patch::Clear => {
                if !self.violations.contains(name) {
                    self.reject(name, message);
                }
                None
            }
        }
    }

    /// Accepts an optional `value` for a field that cannot be cleared, rejecting explicit nulls.
    pub fn not_null<T>(&mut self, name: &str, value: Patch<T>) -> Option<T> {
        match value {
            Patch::Keep => None,
            Patch::Clear => {
                self.reject(name, "Field cannot be null");
                None
            }
            Patch::Set(value) => Some(value),
        }
    }

    /// Finishes validation and returns the value constructed by `build` if no violations were
    /// found.
    ///
    /// `build` returns an `Option` so that it can consume the optional outputs of `required`
    /// with `?`.  These are all guaranteed to be present when no violations were recorded.
    pub fn finish<T, F>(mut self, build: F) -> Result<T, Violations>
    where
        F: FnOnce() -> Option<T>,
    {
        if !self.violations.is_empty() {
            return Err(self.violations);
        }
        match build() {
            Some(value) => Ok(value),
            None => {
                self.violations.push("body", "Invalid input");
                Err(self.violations)
            }
        }
    }
}

/// Parses an RFC 3339 timestamp, normalizing it to UTC with microsecond precision.
pub fn parse_datetime(s: String) -> ModelResult<OffsetDateTime> {
    let ts = OffsetDateTime::parse(&s, &Rfc3339)
        .map_err(|_| ModelError("Invalid datetime".to_owned()))?;
    Ok(crate::clocks::truncate_to_micros(ts.to_offset(UtcOffset::UTC)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_patch_apply() {
        assert_eq!(Some(1), Patch::Keep.apply(Some(1)));
        assert_eq!(None, Patch::<i32>::Clear.apply(Some(1)));
        assert_eq!(Some(2), Patch::Set(2).apply(Some(1)));
        assert_eq!(Some(2), Patch::Set(2).apply(None));
    }

    #[test]
    fn test_fields_not_an_object() {
        let input = json!([1, 2]);
        let fields = Fields::new(&input);
        let err = fields.finish(|| Some(())).unwrap_err();
        assert_eq!(Violations::single("body", "Expected object, received array"), err);
    }

    #[test]
    fn test_fields_reports_every_violation() {
        let input = json!({"name": "", "count": "three", "when": "yesterday"});
        let mut fields = Fields::new(&input);
        let name = fields.non_empty("name", "Name is required");
        let name = fields.required("name", name, "Name is required");
        let count = fields.integer("count");
        let when = fields.datetime("when");
        let missing = fields.string("missing");
        let missing = fields.required("missing", missing, "Required");
        let err = fields.finish(|| Some((name?, count, when, missing?))).unwrap_err();

        assert_eq!(
            vec![
                FieldViolation { field: "name".to_owned(), message: "Name is required".to_owned() },
                FieldViolation {
                    field: "count".to_owned(),
                    message: "Expected number, received string".to_owned()
                },
                FieldViolation {
                    field: "when".to_owned(),
                    message: "Invalid datetime".to_owned()
                },
                FieldViolation { field: "missing".to_owned(), message: "Required".to_owned() },
            ],
            err.into_inner()
        );
    }

    #[test]
    fn test_fields_null_vs_absent() {
        let input = json!({"cleared": null});
        let mut fields = Fields::new(&input);
        assert_eq!(Patch::Clear, fields.string("cleared"));
        assert_eq!(Patch::Keep, fields.string("absent"));
        fields.finish(|| Some(())).unwrap();
    }

    #[test]
    fn test_fields_not_null() {
        let input = json!({"name": null, "other": "x"});
        let mut fields = Fields::new(&input);
        let name = fields.string("name");
        assert_eq!(None, fields.not_null("name", name));
        let other = fields.string("other");
        assert_eq!(Some("x".to_owned()), fields.not_null("other", other));
        let absent = fields.string("absent");
        assert_eq!(None, fields.not_null("absent", absent));
        assert_eq!(
            Violations::single("name", "Field cannot be null"),
            fields.finish(|| Some(())).unwrap_err()
        );
    }

    #[test]
    fn test_fields_integer() {
        let input = json!({"a": 2020, "b": 20.5, "c": "2020"});
        let mut fields = Fields::new(&input);
        assert_eq!(Patch::Set(2020), fields.integer("a"));
        assert_eq!(Patch::Keep, fields.integer("b"));
        assert_eq!(Patch::Keep, fields.integer("c"));
        let err = fields.finish(|| Some(())).unwrap_err();
        assert_eq!(
            vec!["Expected integer, received float", "Expected number, received string"],
            err.as_slice().iter().map(|v| v.message.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_fields_digits() {
        let input = query_object(HashMap::from([
            ("ok".to_owned(), "25".to_owned()),
            ("zero".to_owned(), "0".to_owned()),
            ("negative".to_owned(), "-1".to_owned()),
            ("empty".to_owned(), "".to_owned()),
            ("huge".to_owned(), "99999999999999999999999".to_owned()),
        ]));
        let mut fields = Fields::new(&input);
        assert_eq!(Patch::Set(25), fields.digits("ok", "Bad"));
        assert_eq!(Patch::Set(0), fields.digits("zero", "Bad"));
        assert_eq!(Patch::Keep, fields.digits("negative", "Bad"));
        assert_eq!(Patch::Keep, fields.digits("empty", "Bad"));
        assert_eq!(Patch::Keep, fields.digits("huge", "Bad"));
        assert_eq!(Patch::Keep, fields.digits("absent", "Bad"));
        let err = fields.finish(|| Some(())).unwrap_err();
        assert_eq!(
            vec!["Bad", "Bad", "Number is too large"],
            err.as_slice().iter().map(|v| v.message.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_fields_url() {
        let input = json!({"good": "https://files.example.com/a.pdf", "bad": "not a url"});
        let mut fields = Fields::new(&input);
        assert_eq!(
            Patch::Set("https://files.example.com/a.pdf".to_owned()),
            fields.url("good", "Bad URL")
        );
        assert_eq!(Patch::Keep, fields.url("bad", "Bad URL"));
        let err = fields.finish(|| Some(())).unwrap_err();
        assert_eq!(Violations::single("bad", "Bad URL"), err);
    }

    #[test]
    fn test_fields_parsed() {
        let input = json!({"word": "hello", "number": "x"});
        let mut fields = Fields::new(&input);
        let word = fields.parsed("word", |s| Ok(s.len()));
        let number = fields.parsed("number", |s| {
            s.parse::<u8>().map_err(|_| ModelError("Not a number".to_owned()))
        });
        assert_eq!(Patch::Set(5), word);
        assert_eq!(Patch::Keep, number);
        assert_eq!(
            Violations::single("number", "Not a number"),
            fields.finish(|| Some(())).unwrap_err()
        );
    }

    #[test]
    fn test_fields_parsed_all() {
        let input = json!({"ok": "abc", "bad": "x"});
        let mut fields = Fields::new(&input);
        let ok = fields.parsed_all("ok", |s| Ok::<_, Vec<ModelError>>(s.len()));
        let bad = fields.parsed_all("bad", |_| -> Result<usize, Vec<ModelError>> {
            Err(vec![ModelError("Too short".to_owned()), ModelError("Not a word".to_owned())])
        });
        assert_eq!(Patch::Set(3), ok);
        assert_eq!(Patch::Keep, bad);

        let mut exp = Violations::single("bad", "Too short");
        exp.push("bad", "Not a word");
        assert_eq!(exp, fields.finish(|| Some(())).unwrap_err());
    }

    #[test]
    fn test_parse_datetime() {
        assert_eq!(
            datetime!(2025-01-01 00:00:00 UTC),
            parse_datetime("2025-01-01T05:30:00+05:30".to_owned()).unwrap()
        );
        assert_eq!(
            datetime!(2025-01-01 00:00:00.123456 UTC),
            parse_datetime("2025-01-01T00:00:00.123456789Z".to_owned()).unwrap()
        );
        assert_eq!(
            ModelError("Invalid datetime".to_owned()),
            parse_datetime("2025-01-01".to_owned()).unwrap_err()
        );
    }
}
