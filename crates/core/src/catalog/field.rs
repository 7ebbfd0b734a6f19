//! Input field declarations attached to a command definition.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of input a field collects. Drives both validation and how the
/// value is turned into executor arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    Number,
    Select,
    Multiselect,
    Checkbox,
    Boolean,
    Datepicker,
    Tags,
    File,
    ResourceSelect,
    Email,
    Url,
}

impl FieldType {
    /// Flag-style types become a bare `--name` switch for scripted commands.
    pub fn is_flag(self) -> bool {
        matches!(self, Self::Boolean | Self::Checkbox)
    }

    /// List-style types become a repeated option for scripted commands.
    pub fn is_list(self) -> bool {
        matches!(self, Self::Multiselect | Self::Tags)
    }

    /// Types that must declare a non-empty `options` list.
    pub fn requires_options(self) -> bool {
        matches!(self, Self::Select | Self::Multiselect)
    }
}

/// One selectable choice for `select` / `multiselect` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    #[serde(default)]
    pub label: String,
}

/// Declaration of a single input a command accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Submitted as `--name value` rather than a positional argument.
    #[serde(default)]
    pub is_option: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl InputField {
    /// Build a minimal field of the given type. Mostly useful for tests and
    /// programmatic catalogs.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            field_type,
            required: false,
            is_option: false,
            min: None,
            max: None,
            options: Vec::new(),
            placeholder: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn as_option(mut self) -> Self {
        self.is_option = true;
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_options<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.options = values
            .into_iter()
            .map(|v| {
                let value = v.into();
                let label = match &value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                SelectOption { value, label }
            })
            .collect();
        self
    }

    /// Token replaced by this field's value inside a shell template: the
    /// declared `placeholder` when set, otherwise `{{name}}`.
    pub fn shell_token(&self) -> String {
        match &self.placeholder {
            Some(token) if !token.is_empty() => token.clone(),
            _ => format!("{{{{{}}}}}", self.name),
        }
    }

    /// Whether `value` equals one of the declared option values.
    ///
    /// Scalars compare by their textual form so `"1"` matches `1`.
    pub fn has_option(&self, value: &Value) -> bool {
        self.options.iter().any(|opt| scalar_eq(&opt.value, value))
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (scalar_text(a), scalar_text(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn field_type_defaults_to_text() {
        let field: InputField = serde_json::from_value(json!({"name": "message"})).unwrap();
        assert_eq!(field.field_type, FieldType::Text);
        assert!(!field.required);
        assert!(!field.is_option);
    }

    #[test]
    fn resource_select_uses_kebab_case() {
        let field: InputField =
            serde_json::from_value(json!({"name": "user", "type": "resource-select"})).unwrap();
        assert_eq!(field.field_type, FieldType::ResourceSelect);
    }

    #[test]
    fn shell_token_wraps_name_in_double_braces() {
        assert_eq!(InputField::new("name", FieldType::Text).shell_token(), "{{name}}");
    }

    #[test]
    fn shell_token_prefers_declared_placeholder() {
        let mut field = InputField::new("target", FieldType::Text);
        field.placeholder = Some("%TARGET%".into());
        assert_eq!(field.shell_token(), "%TARGET%");
    }

    #[test]
    fn has_option_compares_scalars_textually() {
        let field = InputField::new("level", FieldType::Select).with_options(["1", "2"]);
        assert!(field.has_option(&json!(1)));
        assert!(field.has_option(&json!("2")));
        assert!(!field.has_option(&json!(3)));
        assert!(!field.has_option(&json!(["1"])));
    }
}
