//! Turning submitted inputs into host command arguments.

use serde_json::Value;

use crate::catalog::InputField;
use crate::inputs::{flatten_to_string, is_blank, is_truthy, SubmittedInputs};

/// One argument passed to a scripted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArgument {
    /// `--name`
    Flag(String),
    /// `--name value`, passed as two argv entries.
    Option { name: String, value: String },
    Positional(String),
}

impl CommandArgument {
    fn push_tokens(&self, argv: &mut Vec<String>) {
        match self {
            Self::Flag(name) => argv.push(format!("--{name}")),
            Self::Option { name, value } => {
                argv.push(format!("--{name}"));
                argv.push(value.clone());
            }
            Self::Positional(value) => argv.push(value.clone()),
        }
    }
}

/// Map each declared field to zero or more arguments, in declaration order.
///
/// - boolean / checkbox: `--name` when truthy, nothing otherwise
/// - multiselect / tags: one `--name value` per non-blank item
/// - anything else: skipped when blank, `--name value` for option fields,
///   positional otherwise
pub fn prepare_arguments(fields: &[InputField], inputs: &SubmittedInputs) -> Vec<CommandArgument> {
    let mut args = Vec::new();

    for field in fields {
        let value = inputs.get(&field.name);
        let ty = field.field_type;

        if ty.is_flag() {
            if value.is_some_and(is_truthy) {
                args.push(CommandArgument::Flag(field.name.clone()));
            }
            continue;
        }

        if is_blank(value) {
            continue;
        }
        let Some(value) = value else { continue };

        if ty.is_list() {
            let items = match value {
                Value::Array(items) => items.iter().collect::<Vec<_>>(),
                single => vec![single],
            };
            args.extend(
                items
                    .into_iter()
                    .filter(|item| !is_blank(Some(*item)))
                    .map(|item| CommandArgument::Option {
                        name: field.name.clone(),
                        value: flatten_to_string(item),
                    }),
            );
        } else if field.is_option {
            args.push(CommandArgument::Option {
                name: field.name.clone(),
                value: flatten_to_string(value),
            });
        } else {
            args.push(CommandArgument::Positional(flatten_to_string(value)));
        }
    }

    args
}

pub fn to_argv(args: &[CommandArgument]) -> Vec<String> {
    let mut argv = Vec::with_capacity(args.len() * 2);
    for arg in args {
        arg.push_tokens(&mut argv);
    }
    argv
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::FieldType;

    fn inputs(value: Value) -> SubmittedInputs {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn truthy_checkbox_becomes_bare_flag() {
        let fields = vec![InputField::new("force", FieldType::Checkbox).as_option()];
        let args = prepare_arguments(&fields, &inputs(json!({"force": true})));
        assert_eq!(to_argv(&args), ["--force"]);
    }

    #[test]
    fn falsy_flags_are_omitted() {
        let fields = vec![
            InputField::new("force", FieldType::Checkbox),
            InputField::new("pretend", FieldType::Boolean),
        ];
        let args = prepare_arguments(&fields, &inputs(json!({"force": false, "pretend": "0"})));
        assert!(args.is_empty());
    }

    #[test]
    fn list_fields_repeat_the_option() {
        let fields = vec![InputField::new("tag", FieldType::Tags)];
        let args = prepare_arguments(&fields, &inputs(json!({"tag": ["a", "", "b"]})));
        assert_eq!(to_argv(&args), ["--tag", "a", "--tag", "b"]);

        let empty = prepare_arguments(&fields, &inputs(json!({"tag": []})));
        assert!(empty.is_empty());
    }

    #[test]
    fn options_and_positionals_keep_declaration_order() {
        let fields = vec![
            InputField::new("name", FieldType::Text),
            InputField::new("retry", FieldType::Number).as_option(),
            InputField::new("message", FieldType::Textarea).as_option(),
        ];
        let args = prepare_arguments(
            &fields,
            &inputs(json!({"message": "back soon", "retry": 60, "name": "web"})),
        );
        assert_eq!(
            args,
            vec![
                CommandArgument::Positional("web".into()),
                CommandArgument::Option {
                    name: "retry".into(),
                    value: "60".into()
                },
                CommandArgument::Option {
                    name: "message".into(),
                    value: "back soon".into()
                },
            ]
        );
    }

    #[test]
    fn option_values_are_separate_argv_entries() {
        let fields = vec![
            InputField::new("message", FieldType::Textarea).as_option(),
            InputField::new("name", FieldType::Text),
        ];
        let args = prepare_arguments(
            &fields,
            &inputs(json!({"message": "back soon", "name": "web"})),
        );
        assert_eq!(to_argv(&args), ["--message", "back soon", "web"]);
    }

    #[test]
    fn blank_and_undeclared_values_are_skipped() {
        let fields = vec![InputField::new("class", FieldType::Text).as_option()];
        let args = prepare_arguments(&fields, &inputs(json!({"class": "", "other": "x"})));
        assert!(args.is_empty());
    }
}
