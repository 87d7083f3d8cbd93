use anyhow::{bail, Context, Result};
use serde::Deserialize;

use super::GitHub;

const API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
pub struct RestIssue {
    pub number: u64,
    pub body: Option<String>,
}

fn issues_url(repo: &str) -> String {
    format!("{API_BASE}/repos/{repo}/issues")
}

fn issue_url(repo: &str, number: u64) -> String {
    format!("{API_BASE}/repos/{repo}/issues/{number}")
}

async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    bail!("{what} failed: HTTP {status}: {text}");
}

impl GitHub {
    fn request(&self, method: reqwest::Method, url: &str) -> Result<reqwest::RequestBuilder> {
        let token = self.token()?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "boardsync"))
    }

    pub(super) async fn rest_get_issue(&self, repo: &str, number: u64) -> Result<RestIssue> {
        let resp = self
            .request(reqwest::Method::GET, &issue_url(repo, number))?
            .send()
            .await
            .context("GitHub API request failed")?;
        let resp = check(resp, "Fetching issue").await?;
        resp.json().await.context("Failed to parse GitHub issue")
    }

    pub(super) async fn rest_create_issue(
        &self,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<RestIssue> {
        let payload = serde_json::json!({ "title": title, "body": body });
        let resp = self
            .request(reqwest::Method::POST, &issues_url(repo))?
            .json(&payload)
            .send()
            .await
            .context("GitHub API request failed")?;
        let resp = check(resp, "Creating issue").await?;
        resp.json().await.context("Failed to parse created issue")
    }

    pub(super) async fn rest_update_issue_body(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<()> {
        let payload = serde_json::json!({ "body": body });
        let resp = self
            .request(reqwest::Method::PATCH, &issue_url(repo, number))?
            .json(&payload)
            .send()
            .await
            .context("GitHub API request failed")?;
        check(resp, "Updating issue").await?;
        Ok(())
    }
}
