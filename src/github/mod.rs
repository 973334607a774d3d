//! A minimal GitHub REST client: credential/repository verification and issue creation.

mod error;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

pub use error::Error;

use crate::common::GitHub as Settings;
use crate::prelude::*;

/// A personal access token plus the repository it should act on.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub username: String,
    pub repo_name: String,
}

impl Credentials {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.username, self.repo_name)
    }

    /// Stable cache key for these credentials. The token itself is never stored.
    pub fn fingerprint(&self) -> u64 {
        let mut buf = Vec::with_capacity(self.token.len() + self.username.len() + self.repo_name.len() + 2);
        buf.extend_from_slice(self.token.as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.username.as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.repo_name.as_bytes());
        seahash::hash(&buf)
    }
}

// Hand-rolled so tokens can't leak into logs via `{:?}`.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("repo_name", &self.repo_name)
            .finish()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    pub number: u64,
    pub html_url: String,
}

/// Repository details as reported back to clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RepoData {
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub default_branch: Option<String>,
    pub owner: Option<String>,
    pub html_url: Option<String>,
}

/// Repository details as GitHub sends them.
#[derive(Deserialize)]
struct RepositoryPayload {
    name: String,
    full_name: String,
    #[serde(default)]
    private: bool,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    default_branch: Option<String>,
    owner: Option<OwnerPayload>,
    html_url: Option<String>,
}

#[derive(Deserialize)]
struct OwnerPayload {
    login: String,
}

impl From<RepositoryPayload> for RepoData {
    fn from(repo: RepositoryPayload) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            private: repo.private,
            description: repo.description,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            open_issues: repo.open_issues_count,
            default_branch: repo.default_branch,
            owner: repo.owner.map(|o| o.login),
            html_url: repo.html_url,
        }
    }
}

#[derive(Deserialize)]
struct UserPayload {
    login: Option<String>,
}

/// Outcome of checking a token and repository.
///
/// `valid` describes the token; `repo_exists` whether the repository could be read with it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub repo_exists: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_data: Option<RepoData>,
}

impl Verification {
    fn rejected(valid: bool, message: impl Into<String>) -> Self {
        Self {
            valid,
            repo_exists: false,
            message: message.into(),
            repo_data: None,
        }
    }
}

/// Something that can file issues.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, creds: &Credentials, issue: &NewIssue) -> Result<CreatedIssue>;
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_url: String,
    api_version: String,
    create_timeout: Duration,
}

impl Client {
    pub fn new(settings: &Settings) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(&settings.user_agent)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_owned(),
            api_version: settings.api_version.clone(),
            create_timeout: Duration::from_secs(settings.create_timeout_secs),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_url))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", &self.api_version)
    }

    /// Checks that the token is accepted by GitHub, then that it can see the repository.
    ///
    /// Never fails outright; every failure mode is folded into the returned [`Verification`].
    pub async fn verify(&self, creds: &Credentials) -> Verification {
        debug!("Verifying token for user {}", creds.username);

        let user = self.request(Method::GET, "/user", &creds.token).send().await;

        match user {
            Ok(response) if response.status() == StatusCode::OK => {
                if let Ok(user) = response.json::<UserPayload>().await {
                    debug!("Token accepted for login {:?}", user.login);
                }
            }
            Ok(response) => {
                let status = response.status();
                warn!("Token rejected by GitHub (HTTP {})", status.as_u16());
                return Verification::rejected(
                    false,
                    format!("Invalid token (HTTP {})", status.as_u16()),
                );
            }
            Err(err) => {
                error!("Error checking token: {err}");
                return Verification::rejected(false, format!("Network error: {err}"));
            }
        }

        match self.repository(creds).await {
            Ok(repo) => {
                info!("Repository found: {}", repo.full_name);
                Verification {
                    valid: true,
                    repo_exists: true,
                    message: "Token and repository are valid".into(),
                    repo_data: Some(repo),
                }
            }
            Err(Error::Api { status, .. }) if status == StatusCode::NOT_FOUND => {
                warn!("Repository not found: {}", creds.slug());
                Verification::rejected(
                    true,
                    format!(
                        "Repository '{}' not found for user '{}'",
                        creds.repo_name, creds.username
                    ),
                )
            }
            Err(Error::Api { status, message }) if status == StatusCode::FORBIDDEN => {
                warn!("Access to {} forbidden: {message}", creds.slug());
                Verification::rejected(true, format!("Access forbidden: {message}"))
            }
            Err(err) => {
                warn!("Could not read repository {}: {err}", creds.slug());
                Verification::rejected(true, err.to_string())
            }
        }
    }

    pub async fn repository(&self, creds: &Credentials) -> Result<RepoData, Error> {
        let path = format!("/repos/{}/{}", creds.username, creds.repo_name);
        let response = self.request(Method::GET, &path, &creds.token).send().await?;

        debug!("Repository check for {} returned {}", creds.slug(), response.status());

        if response.status() != StatusCode::OK {
            return Err(Error::from_response(response).await);
        }

        let repo: RepositoryPayload = response
            .json()
            .await
            .map_err(|e| Error::Malformed(e.to_string()))?;

        Ok(repo.into())
    }

    pub async fn create_issue(&self, creds: &Credentials, issue: &NewIssue) -> Result<CreatedIssue, Error> {
        let path = format!("/repos/{}/{}/issues", creds.username, creds.repo_name);

        info!("Creating issue in {}: {:?}", creds.slug(), issue.title);
        if !issue.labels.is_empty() {
            debug!("Labels: {:?}", issue.labels);
        }

        let response = self
            .request(Method::POST, &path, &creds.token)
            .timeout(self.create_timeout)
            .json(issue)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            let err = Error::from_response(response).await;
            error!("Issue creation in {} failed: {err}", creds.slug());
            return Err(err);
        }

        let created: CreatedIssue = response
            .json()
            .await
            .map_err(|e| Error::Malformed(e.to_string()))?;

        info!("Issue created: #{} ({})", created.number, created.html_url);
        Ok(created)
    }
}

#[async_trait]
impl IssueTracker for Client {
    async fn create_issue(&self, creds: &Credentials, issue: &NewIssue) -> Result<CreatedIssue> {
        Ok(Client::create_issue(self, creds, issue).await?)
    }
}
