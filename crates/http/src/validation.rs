//! Field-level validation of JSON request bodies.
//!
//! A [`Validator`] walks a request object field by field, applying a small set
//! of form-request style [`Rule`]s, and accumulates failures into
//! [`ValidationErrors`]. [`Validator::finish`] turns the accumulated state into
//! a tagged result: the caller's payload or the full list of field errors.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Ordered mapping of field name to error messages.
///
/// Fields keep the order in which they were first reported so the summary
/// message names the first rule that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.fields.push((field.to_string(), vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total number of messages across all fields.
    pub fn count(&self) -> usize {
        self.fields.iter().map(|(_, messages)| messages.len()).sum()
    }

    /// Messages recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Summary line: the first message plus a count of the rest.
    pub fn message(&self) -> String {
        let Some(first) = self
            .fields
            .first()
            .and_then(|(_, messages)| messages.first())
        else {
            return "The given data was invalid.".to_string();
        };

        match self.count() - 1 {
            0 => first.clone(),
            1 => format!("{} (and 1 more error)", first),
            rest => format!("{} (and {} more errors)", first, rest),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// A single validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The field must be present and non-empty.
    Required,
    /// If the key is present, its value must be non-empty.
    Filled,
    /// The value must be a JSON string.
    String,
    /// The value must be a JSON string or an integer; integers are
    /// normalized to their decimal representation.
    StringOrInteger,
    /// At most this many characters.
    Max(usize),
}

/// Error key for problems with the body as a whole.
pub const BODY_FIELD: &str = "body";

/// Accumulating validator over a JSON request body.
pub struct Validator<'a> {
    input: Option<&'a Map<String, Value>>,
    errors: ValidationErrors,
}

impl<'a> Validator<'a> {
    /// Validate `body`. `null` and `[]` validate as an empty object; any other
    /// non-object body is reported under the `body` key, and its fields
    /// validate as missing.
    pub fn new(body: &'a Value) -> Self {
        let mut errors = ValidationErrors::new();
        match body {
            Value::Object(_) | Value::Null => {}
            Value::Array(items) if items.is_empty() => {}
            _ => errors.add(BODY_FIELD, "The request body must be a JSON object."),
        }

        Self {
            input: body.as_object(),
            errors,
        }
    }

    /// Apply `rules` to `field`, returning its normalized (trimmed) value when
    /// present and valid. Evaluation of a field stops at its first failure.
    pub fn field(&mut self, field: &str, rules: &[Rule]) -> Option<String> {
        let raw = self.input.and_then(|input| input.get(field));

        let value = match raw {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(other) => Some(other),
        };

        let Some(value) = value else {
            if rules.contains(&Rule::Required) {
                self.errors
                    .add(field, format!("The {} field is required.", field));
            } else if raw.is_some() && rules.contains(&Rule::Filled) {
                self.errors
                    .add(field, format!("The {} field must have a value.", field));
            }
            return None;
        };

        let mut normalized = None;
        for rule in rules {
            match rule {
                Rule::Required | Rule::Filled => {}
                Rule::String => match value {
                    Value::String(s) => normalized = Some(s.trim().to_string()),
                    _ => {
                        self.errors
                            .add(field, format!("The {} field must be a string.", field));
                        return None;
                    }
                },
                Rule::StringOrInteger => match value {
                    Value::String(s) => normalized = Some(s.trim().to_string()),
                    Value::Number(n) if n.is_i64() || n.is_u64() => {
                        normalized = Some(n.to_string())
                    }
                    _ => {
                        self.errors.add(
                            field,
                            format!("The {} field must be a string or an integer.", field),
                        );
                        return None;
                    }
                },
                Rule::Max(max) => {
                    let len = normalized
                        .as_deref()
                        .map(|s| s.chars().count())
                        .unwrap_or_default();
                    if len > *max {
                        self.errors.add(
                            field,
                            format!(
                                "The {} field must not be greater than {} characters.",
                                field, max
                            ),
                        );
                        return None;
                    }
                }
            }
        }

        normalized
    }

    /// Errors accumulated so far.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Produce the payload if every rule passed, or the accumulated errors.
    pub fn finish<T>(self, build: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(build())
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NAME: &[Rule] = &[Rule::Required, Rule::String, Rule::Max(5)];

    #[test]
    fn missing_required_field_is_reported() {
        let body = json!({});
        let mut validator = Validator::new(&body);
        assert_eq!(validator.field("name", NAME), None);
        assert_eq!(
            validator.errors().get("name").unwrap(),
            &["The name field is required.".to_string()]
        );
    }

    #[test]
    fn blank_string_counts_as_missing() {
        let body = json!({"name": "   "});
        let mut validator = Validator::new(&body);
        validator.field("name", NAME);
        assert_eq!(
            validator.errors().get("name").unwrap()[0],
            "The name field is required."
        );
    }

    #[test]
    fn values_are_trimmed() {
        let body = json!({"name": "  abc "});
        let mut validator = Validator::new(&body);
        assert_eq!(validator.field("name", NAME).as_deref(), Some("abc"));
        assert!(validator.errors().is_empty());
    }

    #[test]
    fn wrong_type_is_reported() {
        let body = json!({"name": 12});
        let mut validator = Validator::new(&body);
        validator.field("name", NAME);
        assert_eq!(
            validator.errors().get("name").unwrap()[0],
            "The name field must be a string."
        );
    }

    #[test]
    fn integers_normalize_to_strings() {
        let body = json!({"code": 1234567890u64});
        let mut validator = Validator::new(&body);
        let code = validator.field("code", &[Rule::Required, Rule::StringOrInteger]);
        assert_eq!(code.as_deref(), Some("1234567890"));
    }

    #[test]
    fn floats_are_not_integers() {
        let body = json!({"code": 1.5});
        let mut validator = Validator::new(&body);
        validator.field("code", &[Rule::Required, Rule::StringOrInteger]);
        assert_eq!(
            validator.errors().get("code").unwrap()[0],
            "The code field must be a string or an integer."
        );
    }

    #[test]
    fn max_counts_characters() {
        let body = json!({"name": "ééééé", "other": "abcdef"});
        let mut validator = Validator::new(&body);
        assert!(validator.field("name", NAME).is_some());
        assert!(validator.field("other", NAME).is_none());
        assert_eq!(
            validator.errors().get("other").unwrap()[0],
            "The other field must not be greater than 5 characters."
        );
    }

    #[test]
    fn filled_only_applies_when_key_present() {
        let rules = &[Rule::Filled, Rule::String];

        let absent = json!({});
        let mut validator = Validator::new(&absent);
        assert_eq!(validator.field("name", rules), None);
        assert!(validator.errors().is_empty());

        let null = json!({"name": null});
        let mut validator = Validator::new(&null);
        assert_eq!(validator.field("name", rules), None);
        assert_eq!(
            validator.errors().get("name").unwrap()[0],
            "The name field must have a value."
        );
    }

    #[test]
    fn empty_array_and_null_validate_as_empty_object() {
        for body in [json!([]), json!(null)] {
            let mut validator = Validator::new(&body);
            validator.field("name", NAME);
            let errors = validator.finish(|| ()).unwrap_err();
            assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["name"]);
        }
    }

    #[test]
    fn scalar_body_is_rejected_even_without_required_fields() {
        for body in [json!("abc"), json!(42), json!(true), json!([1])] {
            let mut validator = Validator::new(&body);
            assert_eq!(validator.field("name", &[Rule::Filled, Rule::String]), None);
            let errors = validator.finish(|| ()).unwrap_err();
            assert_eq!(
                errors.get(BODY_FIELD).unwrap()[0],
                "The request body must be a JSON object."
            );
        }
    }

    #[test]
    fn summary_message_counts_remaining_errors() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "The title field is required.");
        assert_eq!(errors.message(), "The title field is required.");

        errors.add("isbn", "The isbn field is required.");
        assert_eq!(
            errors.message(),
            "The title field is required. (and 1 more error)"
        );

        errors.add("isbn", "Another problem.");
        assert_eq!(
            errors.message(),
            "The title field is required. (and 2 more errors)"
        );
    }

    #[test]
    fn errors_serialize_as_ordered_map() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "a");
        errors.add("isbn", "b");
        errors.add("title", "c");

        let rendered = serde_json::to_string(&errors).unwrap();
        assert_eq!(rendered, r#"{"title":["a","c"],"isbn":["b"]}"#);
    }
}
