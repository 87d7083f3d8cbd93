use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use super::GitHub;
use crate::model::project::{FieldType, FieldValue, ProjectItem, ProjectRef};

/// Upper bound passed to `gh` list commands.
const LIST_LIMIT: &str = "500";

#[derive(Deserialize)]
struct GhProject {
    id: String,
    #[serde(default)]
    number: u64,
}

#[derive(Deserialize)]
struct GhItemList {
    #[serde(default)]
    items: Vec<GhItem>,
}

#[derive(Deserialize)]
struct GhItem {
    id: String,
    content: Option<GhContent>,
}

#[derive(Deserialize)]
struct GhContent {
    number: Option<u64>,
}

#[derive(Deserialize)]
struct GhItemId {
    id: String,
}

#[derive(Deserialize)]
struct GhIssueNumber {
    number: u64,
}

/// Run `gh` with the given arguments and return its stdout.
async fn run_gh(args: &[String]) -> Result<Vec<u8>> {
    debug!(args = ?args, "gh");
    let output = tokio::process::Command::new("gh")
        .args(args)
        .output()
        .await
        .context("Failed to run gh CLI")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let command = args.iter().take(2).cloned().collect::<Vec<_>>().join(" ");
        bail!("gh {command} failed: {}", stderr.trim());
    }

    Ok(output.stdout)
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn issue_numbers(issues: Vec<GhIssueNumber>) -> Vec<u64> {
    issues.into_iter().map(|i| i.number).collect()
}

fn items_by_issue(list: GhItemList) -> Vec<ProjectItem> {
    list.items
        .into_iter()
        .filter_map(|item| {
            let number = item.content.and_then(|c| c.number)?;
            Some(ProjectItem {
                id: item.id,
                issue_number: number,
            })
        })
        .collect()
}

impl GitHub {
    fn push_owner(&self, args: &mut Vec<String>) {
        if let Some(owner) = &self.owner {
            args.push("--owner".into());
            args.push(owner.clone());
        }
    }

    pub(super) async fn gh_project_node_id(&self, project: &str) -> Result<String> {
        let mut args = to_args(&["project", "view", project, "--format", "json"]);
        self.push_owner(&mut args);
        let stdout = run_gh(&args).await?;
        let view: GhProject =
            serde_json::from_slice(&stdout).context("Failed to parse gh project view output")?;
        Ok(view.id)
    }

    pub(super) async fn gh_item_list(&self, project: &str) -> Result<Vec<ProjectItem>> {
        let mut args = to_args(&[
            "project",
            "item-list",
            project,
            "--limit",
            LIST_LIMIT,
            "--format",
            "json",
        ]);
        self.push_owner(&mut args);
        let stdout = run_gh(&args).await?;
        let list: GhItemList =
            serde_json::from_slice(&stdout).context("Failed to parse gh item-list output")?;
        Ok(items_by_issue(list))
    }

    pub(super) async fn gh_item_edit(
        &self,
        project_node_id: &str,
        item_id: &str,
        field_id: &str,
        value: &FieldValue,
    ) -> Result<()> {
        let flag = match value {
            FieldValue::Text(_) => "--text",
            FieldValue::Date(_) => "--date",
            FieldValue::SingleSelectOption(_) => "--single-select-option-id",
        };
        let args = to_args(&[
            "project",
            "item-edit",
            "--id",
            item_id,
            "--project-id",
            project_node_id,
            "--field-id",
            field_id,
            flag,
            value.as_str(),
        ]);
        run_gh(&args).await?;
        Ok(())
    }

    pub(super) async fn gh_project_create(&self, title: &str) -> Result<ProjectRef> {
        let mut args = to_args(&["project", "create", "--title", title, "--format", "json"]);
        self.push_owner(&mut args);
        let stdout = run_gh(&args).await?;
        let project: GhProject =
            serde_json::from_slice(&stdout).context("Failed to parse gh project create output")?;
        Ok(ProjectRef {
            number: project.number,
            node_id: project.id,
        })
    }

    pub(super) async fn gh_field_create(
        &self,
        project_number: u64,
        name: &str,
        data_type: FieldType,
        options: &[String],
    ) -> Result<()> {
        let number = project_number.to_string();
        let mut args = to_args(&[
            "project",
            "field-create",
            &number,
            "--name",
            name,
            "--data-type",
            data_type.as_str(),
        ]);
        self.push_owner(&mut args);
        if data_type == FieldType::SingleSelect {
            args.push("--single-select-options".into());
            args.push(options.join(","));
        }
        run_gh(&args).await?;
        Ok(())
    }

    pub(super) async fn gh_issue_list(&self, repo: &str) -> Result<Vec<u64>> {
        let args = to_args(&[
            "issue", "list", "-R", repo, "--json", "number", "--limit", LIST_LIMIT,
        ]);
        let stdout = run_gh(&args).await?;
        let issues: Vec<GhIssueNumber> =
            serde_json::from_slice(&stdout).context("Failed to parse gh issue list output")?;
        Ok(issue_numbers(issues))
    }

    pub(super) async fn gh_item_add(&self, project_number: u64, url: &str) -> Result<String> {
        let number = project_number.to_string();
        let mut args = to_args(&[
            "project", "item-add", &number, "--url", url, "--format", "json",
        ]);
        self.push_owner(&mut args);
        let stdout = run_gh(&args).await?;
        let item: GhItemId =
            serde_json::from_slice(&stdout).context("Failed to parse gh item-add output")?;
        Ok(item.id)
    }
}
