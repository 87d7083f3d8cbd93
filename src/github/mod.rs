pub mod gh;
pub mod graphql;
pub mod rest;

#[cfg(test)]
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::GitHubConfig;
use crate::model::project::{Field, FieldType, FieldValue, ProjectItem, ProjectRef, SelectOption};

/// Read side of a project board, plus the one field-level write the
/// synchronizer needs.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Resolve a project number to the node id used by item mutations.
    async fn project_node_id(&self, project: &str) -> Result<String>;
    /// Fields of the board identified by its node id.
    async fn list_fields(&self, project_node_id: &str) -> Result<Vec<Field>>;
    async fn list_items(&self, project: &str) -> Result<Vec<ProjectItem>>;
    /// Replace a single-select field's option list with `options` and return
    /// the updated list, ids included. Options without an id are created.
    async fn replace_select_options(
        &self,
        field_id: &str,
        options: &[SelectOption],
    ) -> Result<Vec<SelectOption>>;
}

#[async_trait]
pub trait ItemMutator: Send + Sync {
    async fn set_field_value(
        &self,
        project_node_id: &str,
        item_id: &str,
        field_id: &str,
        value: &FieldValue,
    ) -> Result<()>;
}

/// Board creation and population, used when building projects from scratch.
#[async_trait]
pub trait ProjectAdmin: Send + Sync {
    async fn create_project(&self, title: &str) -> Result<ProjectRef>;
    async fn create_field(
        &self,
        project_number: u64,
        name: &str,
        data_type: FieldType,
        options: &[String],
    ) -> Result<()>;
    async fn list_open_issues(&self, repo: &str) -> Result<Vec<u64>>;
    /// Add an issue (by URL) to a project. Returns the new item id.
    async fn add_item(&self, project_number: u64, url: &str) -> Result<String>;
}

#[async_trait]
pub trait IssueService: Send + Sync {
    async fn issue_body(&self, repo: &str, number: u64) -> Result<Option<String>>;
    /// Create an issue and return its number.
    async fn create_issue(&self, repo: &str, title: &str, body: &str) -> Result<u64>;
    async fn update_issue_body(&self, repo: &str, number: u64, body: &str) -> Result<()>;
}

/// GitHub backend. Project boards go through the `gh` CLI, field listing and
/// option-set updates through GraphQL, and issue edits through the REST API.
pub struct GitHub {
    owner: Option<String>,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHub {
    pub fn new(owner: Option<String>, token: Option<String>) -> Self {
        Self {
            owner,
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &GitHubConfig) -> Self {
        Self::new(config.owner.clone(), config.token.clone())
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow::anyhow!("GITHUB_TOKEN is not set"))
    }
}

#[async_trait]
impl ProjectDirectory for GitHub {
    async fn project_node_id(&self, project: &str) -> Result<String> {
        self.gh_project_node_id(project).await
    }

    async fn list_fields(&self, project_node_id: &str) -> Result<Vec<Field>> {
        self.list_project_fields(project_node_id).await
    }

    async fn list_items(&self, project: &str) -> Result<Vec<ProjectItem>> {
        self.gh_item_list(project).await
    }

    async fn replace_select_options(
        &self,
        field_id: &str,
        options: &[SelectOption],
    ) -> Result<Vec<SelectOption>> {
        self.update_single_select_options(field_id, options).await
    }
}

#[async_trait]
impl ItemMutator for GitHub {
    async fn set_field_value(
        &self,
        project_node_id: &str,
        item_id: &str,
        field_id: &str,
        value: &FieldValue,
    ) -> Result<()> {
        self.gh_item_edit(project_node_id, item_id, field_id, value)
            .await
    }
}

#[async_trait]
impl ProjectAdmin for GitHub {
    async fn create_project(&self, title: &str) -> Result<ProjectRef> {
        self.gh_project_create(title).await
    }

    async fn create_field(
        &self,
        project_number: u64,
        name: &str,
        data_type: FieldType,
        options: &[String],
    ) -> Result<()> {
        self.gh_field_create(project_number, name, data_type, options)
            .await
    }

    async fn list_open_issues(&self, repo: &str) -> Result<Vec<u64>> {
        self.gh_issue_list(repo).await
    }

    async fn add_item(&self, project_number: u64, url: &str) -> Result<String> {
        self.gh_item_add(project_number, url).await
    }
}

#[async_trait]
impl IssueService for GitHub {
    async fn issue_body(&self, repo: &str, number: u64) -> Result<Option<String>> {
        self.rest_get_issue(repo, number).await.map(|i| i.body)
    }

    async fn create_issue(&self, repo: &str, title: &str, body: &str) -> Result<u64> {
        self.rest_create_issue(repo, title, body)
            .await
            .map(|i| i.number)
    }

    async fn update_issue_body(&self, repo: &str, number: u64, body: &str) -> Result<()> {
        self.rest_update_issue_body(repo, number, body).await
    }
}
