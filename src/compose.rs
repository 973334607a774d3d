//! The issue composition session: template selection, field editing, preview and submission.

use crate::github::{CreatedIssue, Credentials, IssueTracker, NewIssue};
use crate::prelude::*;
use crate::render::{self, FieldValue, FieldValues};
use crate::template::{FieldKind, Template, TemplateSource};

/// Everything the user has entered so far.
///
/// A session is single-owner state; each preview is recomputed from scratch from whatever
/// it currently holds, so edits never need to be ordered or merged.
#[derive(Debug, Default)]
pub struct Session {
    credentials: Option<Credentials>,
    template: Option<Template>,
    title: String,
    body: String,
    labels: Vec<String>,
    values: FieldValues,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches `name` from `source` and resets the form from it.
    pub async fn select_template<S>(&mut self, source: &S, name: &str) -> Result<&Template>
    where
        S: TemplateSource + ?Sized,
    {
        let Some(template) = source.get(name).await? else {
            bail!("Template '{name}' not found.")
        };

        debug!("Selected template '{}' ({} fields)", template.name, template.fields.len());

        self.title = template.title.clone();
        self.body = template.body.clone();
        self.labels = template.labels.clone();
        self.values = template.initial_values();

        Ok(self.template.insert(template))
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_labels(&mut self, labels: Vec<String>) {
        self.labels = labels;
    }

    pub fn add_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Sets a field from raw text, coerced according to the selected template's schema.
    /// Fields the template doesn't declare are kept as text.
    pub fn set_input(&mut self, name: &str, raw: &str) {
        let value = match self.template.as_ref().and_then(|t| t.field(name)) {
            Some(field) => field.parse_input(raw),
            None => FieldValue::Text(raw.to_owned()),
        };

        self.values.insert(name.to_owned(), value);
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    /// Discards the template and everything entered, keeping credentials.
    pub fn clear(&mut self) {
        self.template = None;
        self.title.clear();
        self.body.clear();
        self.labels.clear();
        self.values.clear();
    }

    /// Renders the current body, with placeholders substituted, as HTML.
    pub fn preview(&self) -> String {
        render::preview(&self.body, &self.values)
    }

    /// Validates the form and builds the issue that would be submitted.
    ///
    /// Placeholders are substituted into the raw Markdown body - the rendered preview is never sent.
    pub fn draft(&self) -> Result<NewIssue> {
        if self.title.trim().is_empty() {
            bail!("The issue title is empty.")
        }

        if self.credentials.is_none() {
            bail!("No repository credentials have been provided.")
        }

        if let Some(template) = &self.template {
            for field in template.fields.iter().filter(|f| f.required) {
                if field.kind == FieldKind::Checkbox {
                    continue;
                }

                let blank = self.values.get(&field.name).map_or(true, FieldValue::is_blank);
                if blank {
                    bail!("Field '{}' is required.", field.label)
                }
            }
        }

        Ok(NewIssue {
            title: self.title.trim().to_owned(),
            body: render::substitute(&self.body, &self.values).into_owned(),
            labels: self.labels.clone(),
            assignees: vec![],
        })
    }

    /// Drafts the issue and files it with `tracker`.
    pub async fn submit<T>(&self, tracker: &T) -> Result<CreatedIssue>
    where
        T: IssueTracker + ?Sized,
    {
        let issue = self.draft()?;
        let credentials = self
            .credentials
            .as_ref()
            .wrap_err("No repository credentials have been provided.")?;

        let created = tracker.create_issue(credentials, &issue).await?;

        info!("Submitted issue #{} to {}", created.number, credentials.slug());
        Ok(created)
    }
}
