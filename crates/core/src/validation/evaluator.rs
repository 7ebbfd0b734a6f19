//! Per-field evaluator. Pure logic, no database access.

use std::collections::BTreeMap;

use serde_json::Value;
use validator::{ValidateEmail, ValidateUrl};

use crate::catalog::{FieldType, InputField};
use crate::inputs::{is_blank, SubmittedInputs};

/// Field name to the first error message reported for that field.
/// Empty means the inputs are valid.
pub type InputErrors = BTreeMap<String, String>;

/// Check `inputs` against `fields`.
///
/// Every field is checked independently, in declaration order; one failing
/// field never stops the others from being reported. Keys in `inputs`
/// that no field declares are ignored.
pub fn validate_inputs(inputs: &SubmittedInputs, fields: &[InputField]) -> InputErrors {
    let mut errors = InputErrors::new();

    for field in fields {
        let value = inputs.get(&field.name);

        if is_blank(value) {
            if field.required {
                errors.insert(
                    field.name.clone(),
                    format!("The {} field is required.", field.name),
                );
            }
            continue;
        }

        if let Some(value) = value {
            if let Some(message) = check_type(field, value) {
                errors.insert(field.name.clone(), message);
            }
        }
    }

    errors
}

fn check_type(field: &InputField, value: &Value) -> Option<String> {
    let name = &field.name;
    match field.field_type {
        FieldType::Select => {
            (!field.has_option(value)).then(|| format!("Invalid option selected for {name}."))
        }
        FieldType::Multiselect => match value {
            Value::Array(items) => items
                .iter()
                .any(|item| !field.has_option(item))
                .then(|| format!("Invalid option selected for {name}.")),
            _ => Some(format!("The {name} field must be an array.")),
        },
        FieldType::Number => check_number(field, value),
        FieldType::Email => {
            let ok = value.as_str().is_some_and(|s| s.validate_email());
            (!ok).then(|| format!("The {name} field must be a valid email address."))
        }
        FieldType::Url => {
            let ok = value.as_str().is_some_and(|s| s.validate_url());
            (!ok).then(|| format!("The {name} field must be a valid URL."))
        }
        _ => None,
    }
}

fn check_number(field: &InputField, value: &Value) -> Option<String> {
    let name = &field.name;
    let Some(number) = parse_number(value) else {
        return Some(format!("The {name} field must be a number."));
    };

    // Bounds are inclusive. When both fail (min > max) the max message wins.
    let mut error = None;
    if let Some(min) = field.min {
        if number < min {
            error = Some(format!(
                "The {name} field must be at least {}.",
                format_bound(min)
            ));
        }
    }
    if let Some(max) = field.max {
        if number > max {
            error = Some(format!(
                "The {name} field must not be greater than {}.",
                format_bound(max)
            ));
        }
    }
    error
}

/// Numbers, or strings that parse as a finite number.
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.abs() < 1e15 {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn inputs(value: Value) -> SubmittedInputs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn missing_required_field_is_keyed_by_name() {
        let fields = vec![
            InputField::new("message", FieldType::Text).required(),
            InputField::new("retry", FieldType::Number),
        ];
        let errors = validate_inputs(&inputs(json!({})), &fields);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["message"], "The message field is required.");
    }

    #[test]
    fn empty_string_counts_as_missing() {
        let fields = vec![InputField::new("message", FieldType::Text).required()];
        let errors = validate_inputs(&inputs(json!({"message": ""})), &fields);
        assert!(errors.contains_key("message"));
    }

    #[test]
    fn required_error_skips_type_checks() {
        let fields = vec![InputField::new("env", FieldType::Select)
            .with_options(["prod"])
            .required()];
        let errors = validate_inputs(&inputs(json!({"env": null})), &fields);
        assert_eq!(errors["env"], "The env field is required.");
    }

    #[test]
    fn errors_accumulate_across_fields() {
        let fields = vec![
            InputField::new("a", FieldType::Text).required(),
            InputField::new("b", FieldType::Number),
            InputField::new("c", FieldType::Select).with_options(["x"]),
        ];
        let errors = validate_inputs(&inputs(json!({"b": "abc", "c": "y"})), &fields);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let fields = vec![InputField::new("a", FieldType::Text)];
        let errors = validate_inputs(&inputs(json!({"zzz": [1, 2, 3]})), &fields);
        assert!(errors.is_empty());
    }

    #[test]
    fn number_bounds_are_inclusive() {
        let fields = vec![InputField::new("n", FieldType::Number).with_bounds(Some(1.0), Some(10.0))];

        for ok in [json!(1), json!(10), json!("5"), json!(" 7 ")] {
            let errors = validate_inputs(&inputs(json!({ "n": ok })), &fields);
            assert!(errors.is_empty(), "{ok} should be accepted");
        }

        let below = validate_inputs(&inputs(json!({"n": 0})), &fields);
        assert_eq!(below["n"], "The n field must be at least 1.");

        let above = validate_inputs(&inputs(json!({"n": 10.5})), &fields);
        assert_eq!(above["n"], "The n field must not be greater than 10.");
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let fields = vec![InputField::new("n", FieldType::Number)];
        for bad in [json!("abc"), json!(true), json!([1]), json!("inf")] {
            let errors = validate_inputs(&inputs(json!({ "n": bad })), &fields);
            assert_eq!(errors["n"], "The n field must be a number.", "{bad}");
        }
    }

    #[test]
    fn select_requires_declared_option() {
        let fields = vec![InputField::new("env", FieldType::Select).with_options(["staging", "prod"])];
        assert!(validate_inputs(&inputs(json!({"env": "prod"})), &fields).is_empty());
        let errors = validate_inputs(&inputs(json!({"env": "dev"})), &fields);
        assert_eq!(errors["env"], "Invalid option selected for env.");
    }

    #[test]
    fn multiselect_requires_list_of_declared_options() {
        let fields =
            vec![InputField::new("tags", FieldType::Multiselect).with_options(["a", "b"])];

        assert!(validate_inputs(&inputs(json!({"tags": ["a", "b"]})), &fields).is_empty());

        let not_list = validate_inputs(&inputs(json!({"tags": "a"})), &fields);
        assert_eq!(not_list["tags"], "The tags field must be an array.");

        let bad_item = validate_inputs(&inputs(json!({"tags": ["a", "c"]})), &fields);
        assert_eq!(bad_item["tags"], "Invalid option selected for tags.");
    }

    #[test]
    fn email_and_url_syntax() {
        let fields = vec![
            InputField::new("mail", FieldType::Email),
            InputField::new("site", FieldType::Url),
        ];
        let ok = validate_inputs(
            &inputs(json!({"mail": "ops@example.com", "site": "https://example.com/x"})),
            &fields,
        );
        assert!(ok.is_empty());

        let bad = validate_inputs(
            &inputs(json!({"mail": "not-an-email", "site": "not a url"})),
            &fields,
        );
        assert_eq!(bad["mail"], "The mail field must be a valid email address.");
        assert_eq!(bad["site"], "The site field must be a valid URL.");
    }

    #[test]
    fn free_form_types_are_not_checked() {
        let fields = vec![
            InputField::new("when", FieldType::Datepicker),
            InputField::new("upload", FieldType::File),
            InputField::new("note", FieldType::Textarea),
        ];
        let errors = validate_inputs(
            &inputs(json!({"when": "whenever", "upload": {"x": 1}, "note": 42})),
            &fields,
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn validation_is_idempotent() {
        let fields = vec![
            InputField::new("a", FieldType::Text).required(),
            InputField::new("n", FieldType::Number).with_bounds(Some(5.0), None),
        ];
        let submitted = inputs(json!({"n": 2}));
        assert_eq!(
            validate_inputs(&submitted, &fields),
            validate_inputs(&submitted, &fields)
        );
    }
}
