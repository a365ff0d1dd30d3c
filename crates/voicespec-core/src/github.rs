//! GitHub REST v3 client for the two calls provisioning needs.

use crate::config::GitHubConfig;
use crate::error::{Result, VoicespecError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("voicespec/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub owner: GitHubUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRepository<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub private: bool,
    /// Start empty; the context document is the first commit.
    pub auto_init: bool,
}

pub struct GitHubClient {
    http: Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, config: &GitHubConfig) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            http,
            token: token.into(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    /// `GET /user`: the account the token belongs to.
    pub fn authenticated_user(&self) -> Result<GitHubUser> {
        let resp = self.request(Method::GET, "/user").send()?;
        Ok(check(resp, None)?.json()?)
    }

    /// `POST /user/repos`.
    pub fn create_repository(&self, repo: &CreateRepository<'_>) -> Result<Repository> {
        let resp = self.request(Method::POST, "/user/repos").json(repo).send()?;
        let created: Repository = check(resp, Some(repo.name))?.json()?;
        tracing::info!(repo = %created.full_name, "created GitHub repository");
        Ok(created)
    }
}

/// 401 is an auth failure; 422 on create is a name collision.
fn check(resp: Response, creating: Option<&str>) -> Result<Response> {
    let status = resp.status().as_u16();
    if resp.status().is_success() {
        return Ok(resp);
    }

    let body = resp.text().unwrap_or_default();
    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v["message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"));

    match (status, creating) {
        (401, _) => Err(VoicespecError::Unauthorized),
        (422, Some(name)) if mentions_existing(parsed.as_ref()) => {
            Err(VoicespecError::RepoExists(name.to_string()))
        }
        _ => Err(VoicespecError::GitHub { status, message }),
    }
}

/// GitHub reports collisions as `errors[].message = "name already exists on this account"`.
fn mentions_existing(body: Option<&serde_json::Value>) -> bool {
    let Some(errors) = body.and_then(|v| v["errors"].as_array()) else {
        return true;
    };
    errors.is_empty()
        || errors.iter().any(|e| {
            e["message"]
                .as_str()
                .map(|m| m.contains("already exists"))
                .unwrap_or(false)
        })
}
