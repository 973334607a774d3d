//! Issue templates, their field schemas and the catalog they are served from.

use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::render::{self, FieldValue, FieldValues};

const BUILTINS: &str = include_str!("builtin.toml");

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Textarea,
    Select,
    Checkbox,
}

/// A single fillable input slot of a [`Template`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

fn default_required() -> bool {
    true
}

impl Field {
    /// The value this field starts out with when its template is selected.
    pub fn initial_value(&self) -> FieldValue {
        let default = self.default_value.as_deref().unwrap_or_default();

        match self.kind {
            FieldKind::Checkbox => FieldValue::Flag(parse_flag(default)),
            _ => FieldValue::Text(default.to_owned()),
        }
    }

    /// Converts raw user input (a CLI argument, say) into a value of the right shape.
    pub fn parse_input(&self, raw: &str) -> FieldValue {
        match self.kind {
            FieldKind::Checkbox => FieldValue::Flag(parse_flag(raw)),
            _ => FieldValue::Text(raw.to_owned()),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "y" | "on" | "1"
    )
}

/// A named, reusable issue skeleton.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub is_public: bool,
}

impl Template {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Builds the starting [`FieldValues`] for this template from field defaults.
    pub fn initial_values(&self) -> FieldValues {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.initial_value()))
            .collect()
    }

    /// Substitutes `values` into the template body.
    pub fn populate(&self, values: &FieldValues) -> String {
        render::substitute(&self.body, values).into_owned()
    }

    /// Placeholder tokens in the body that don't correspond to any declared field.
    /// These are left verbatim by substitution.
    pub fn undeclared_placeholders(&self) -> Vec<&str> {
        render::placeholders(&self.body)
            .into_iter()
            .filter(|name| self.field(name).is_none())
            .collect()
    }

    fn matches_category(&self, category: &str) -> bool {
        let category = category.to_lowercase();

        self.name.to_lowercase().contains(&category)
            || self.description.to_lowercase().contains(&category)
    }
}

/// Somewhere templates can be fetched from.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn list(&self) -> Result<Vec<Template>>;

    async fn get(&self, name: &str) -> Result<Option<Template>>;
}

/// An in-process, read-only set of templates with unique names.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: Vec<Template>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "template", default)]
    templates: Vec<Template>,
}

impl Catalog {
    /// Loads the templates that ship with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTINS).wrap_err("Failed to load the built-in template catalog.")
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(source)?;
        Self::new(file.templates)
    }

    pub fn new(templates: Vec<Template>) -> Result<Self> {
        if let Some(name) = templates.iter().map(|t| &t.name).duplicates().next() {
            bail!("Template name '{name}' is declared more than once.")
        }

        for template in &templates {
            if let Some(name) = template.fields.iter().map(|f| &f.name).duplicates().next() {
                bail!(
                    "Template '{}' declares field '{name}' more than once.",
                    template.name
                )
            }

            let undeclared = template.undeclared_placeholders();
            if !undeclared.is_empty() {
                debug!(
                    "Template '{}' has placeholders with no matching field: {}",
                    template.name,
                    undeclared.iter().join(", ")
                );
            }
        }

        Ok(Self { templates })
    }

    /// All templates, optionally narrowed to those whose name or description
    /// contains `category` (case-insensitive).
    pub fn list(&self, category: Option<&str>) -> Vec<&Template> {
        match category {
            Some(category) => self
                .templates
                .iter()
                .filter(|t| t.matches_category(category))
                .collect(),
            None => self.templates.iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn fields(&self, name: &str) -> Option<&[Field]> {
        self.get(name).map(|t| t.fields.as_slice())
    }
}

#[async_trait]
impl TemplateSource for Catalog {
    async fn list(&self) -> Result<Vec<Template>> {
        Ok(self.templates.clone())
    }

    async fn get(&self, name: &str) -> Result<Option<Template>> {
        Ok(Catalog::get(self, name).cloned())
    }
}
