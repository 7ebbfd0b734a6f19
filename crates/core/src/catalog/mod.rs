//! Command catalog: categories of runnable command definitions.
//!
//! The catalog is static data loaded once at startup (from JSON or the
//! built-in defaults) and shared read-only between invocations.

pub mod command;
pub mod field;

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub use command::{CommandAction, CommandDefinition, ExecutorType, DEFAULT_SERVICE_METHOD};
pub use field::{FieldType, InputField, SelectOption};

/// Catalog shipped with the crate, used when no catalog file is configured.
const BUILTIN_CATALOG: &str = include_str!("default_catalog.json");

/// A named group of commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
}

impl Category {
    pub fn new(name: impl Into<String>, commands: Vec<CommandDefinition>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            icon: None,
            commands,
        }
    }
}

/// Registry of categories keyed by category key, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    categories: IndexMap<String, Category>,
}

impl Catalog {
    /// Build a catalog from already-constructed categories, checking the
    /// same invariants as [`Catalog::from_json`].
    pub fn new<I, K>(categories: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (K, Category)>,
        K: Into<String>,
    {
        let catalog = Self {
            categories: categories
                .into_iter()
                .map(|(key, category)| (key.into(), category))
                .collect(),
        };
        catalog.check()?;
        Ok(catalog)
    }

    /// Parse and check a JSON catalog document.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidConfiguration(format!("catalog is not valid: {e}")))?;
        catalog.check()?;
        Ok(catalog)
    }

    /// Read a JSON catalog from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::InvalidConfiguration(format!(
                "cannot read catalog {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    /// The catalog bundled with the crate.
    pub fn builtin() -> Result<Self, CoreError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Look up a command by category key and slug.
    ///
    /// Category is a direct key lookup; the slug is a linear scan over
    /// that category's commands. A miss is a normal outcome.
    pub fn find(&self, category: &str, slug: &str) -> Option<&CommandDefinition> {
        self.categories
            .get(category)?
            .commands
            .iter()
            .find(|c| c.slug == slug)
    }

    pub fn categories(&self) -> &IndexMap<String, Category> {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(|c| c.commands.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), CoreError> {
        for (key, category) in &self.categories {
            let mut slugs = HashSet::new();
            for command in &category.commands {
                if !slugs.insert(command.slug.as_str()) {
                    return Err(CoreError::Validation(format!(
                        "duplicate slug '{}' in category '{key}'",
                        command.slug
                    )));
                }
                check_fields(key, command)?;
            }
        }
        Ok(())
    }
}

fn check_fields(category: &str, command: &CommandDefinition) -> Result<(), CoreError> {
    let mut names = HashSet::new();
    for field in &command.inputs {
        if !names.insert(field.name.as_str()) {
            return Err(CoreError::Validation(format!(
                "duplicate input '{}' on {category}/{}",
                field.name, command.slug
            )));
        }
        if field.field_type.requires_options() && field.options.is_empty() {
            return Err(CoreError::Validation(format!(
                "input '{}' on {category}/{} needs at least one option",
                field.name, command.slug
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
