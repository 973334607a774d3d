//! Client for a running issuesmith server, so the CLI can go through the proxy instead of GitHub.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::github::{CreatedIssue, Credentials, IssueTracker, NewIssue};
use crate::prelude::*;
use crate::template::{Field, Template, TemplateSource};

#[derive(Debug, Clone)]
pub struct Remote {
    http: reqwest::Client,
    base: String,
}

/// Servers have answered `templates` both as a list and as a name-keyed map.
#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateList {
    Sequence(Vec<Template>),
    Mapping(BTreeMap<String, Template>),
}

impl TemplateList {
    fn into_vec(self) -> Vec<Template> {
        match self {
            Self::Sequence(templates) => templates,
            Self::Mapping(templates) => templates.into_values().collect(),
        }
    }
}

#[derive(Deserialize)]
struct TemplatesResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    templates: TemplateList,
}

#[derive(Deserialize)]
struct TemplateResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: TemplateData,
}

#[derive(Deserialize)]
struct TemplateData {
    template: Template,
    #[serde(default)]
    fields: Vec<Field>,
}

#[derive(Serialize)]
struct CreateRequest<'a> {
    title: &'a str,
    body: &'a str,
    token: &'a str,
    username: &'a str,
    repo_name: &'a str,
    labels: &'a [String],
    assignees: &'a [String],
}

#[derive(Deserialize)]
struct CreateResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    issue_url: Option<String>,
    data: Option<CreateData>,
}

#[derive(Deserialize)]
struct CreateData {
    issue_number: Option<u64>,
}

/// The failure body; older servers put the message under `detail`.
#[derive(Deserialize)]
struct Failure {
    message: Option<String>,
    detail: Option<String>,
}

impl Remote {
    /// `base` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(base: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("issuesmith/{VERSION}"))
            .build()
            .wrap_err("Failed to build HTTP client.")?;

        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_owned(),
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let url = response.url().to_string();

        if !status.is_success() {
            let message = response
                .json::<Failure>()
                .await
                .ok()
                .and_then(|f| f.message.or(f.detail))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

            warn!("{url} answered {status}: {message}");
            bail!("{message}")
        }

        response
            .json()
            .await
            .wrap_err_with(|| format!("Malformed response from {url}."))
    }
}

#[async_trait]
impl TemplateSource for Remote {
    async fn list(&self) -> Result<Vec<Template>> {
        let response = self
            .http
            .get(format!("{}/templates", self.base))
            .send()
            .await
            .wrap_err("Could not reach the issuesmith server.")
            .suggestion("Check that `issuesmith serve` is running and that --proxy points at its /api root.")?;

        let list: TemplatesResponse = self.decode(response).await?;
        if !list.success {
            bail!("{}", list.message.unwrap_or_else(|| "Failed to list templates".into()))
        }

        Ok(list.templates.into_vec())
    }

    async fn get(&self, name: &str) -> Result<Option<Template>> {
        let response = self
            .http
            .get(format!("{}/template/{name}", self.base))
            .send()
            .await
            .wrap_err("Could not reach the issuesmith server.")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let found: TemplateResponse = self.decode(response).await?;
        if !found.success {
            bail!("{}", found.message.unwrap_or_else(|| "Failed to fetch template".into()))
        }

        let TemplateData { mut template, fields } = found.data;
        if template.fields.is_empty() {
            template.fields = fields;
        }

        Ok(Some(template))
    }
}

#[async_trait]
impl IssueTracker for Remote {
    async fn create_issue(&self, creds: &Credentials, issue: &NewIssue) -> Result<CreatedIssue> {
        let request = CreateRequest {
            title: &issue.title,
            body: &issue.body,
            token: &creds.token,
            username: &creds.username,
            repo_name: &creds.repo_name,
            labels: &issue.labels,
            assignees: &issue.assignees,
        };

        debug!("Submitting issue for {} via {}", creds.slug(), self.base);

        let response = self
            .http
            .post(format!("{}/issues/create", self.base))
            .json(&request)
            .send()
            .await
            .wrap_err("Could not reach the issuesmith server.")?;

        let created: CreateResponse = self.decode(response).await?;
        if !created.success {
            bail!("{}", created.message.unwrap_or_else(|| "Failed to create issue".into()))
        }

        let number = created
            .data
            .and_then(|d| d.issue_number)
            .wrap_err("Response is missing the issue number.")?;

        Ok(CreatedIssue {
            number,
            html_url: created.issue_url.unwrap_or_default(),
        })
    }
}
