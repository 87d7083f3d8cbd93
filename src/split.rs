//! Turns a `;`-delimited issue body into sub-issues linked from the parent.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::github::IssueService;

pub const DELIMITER: char = ';';

/// Trimmed, non-empty parts of an issue body.
pub fn sub_issue_titles(body: &str) -> Vec<String> {
    body.split(DELIMITER)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

pub fn sub_issue_body(parent: u64) -> String {
    format!("This task was auto-generated from parent issue #{parent}.")
}

/// Markdown appended to the parent body, one unchecked task per sub-issue.
pub fn task_list(numbers: &[u64]) -> String {
    let mut markdown = String::from("\n\n### Auto-Generated Sub-issues\n");
    for n in numbers {
        markdown.push_str(&format!("- [ ] #{n}\n"));
    }
    markdown
}

/// Create one issue per part of the parent's body and link them back.
///
/// Only fetching the parent is fatal. Returns the numbers of the issues
/// that were created.
pub async fn split_issue(issues: &dyn IssueService, repo: &str, parent: u64) -> Result<Vec<u64>> {
    let body = issues
        .issue_body(repo, parent)
        .await
        .with_context(|| format!("Failed to fetch issue #{parent} from '{repo}'"))?
        .unwrap_or_default();
    info!("Found parent issue #{parent} in '{repo}'");

    if body.trim().is_empty() {
        info!("Issue body is empty. No sub-issues to create.");
        return Ok(Vec::new());
    }

    let titles = sub_issue_titles(&body);
    if titles.is_empty() {
        info!("No non-empty parts found after splitting the issue body. Nothing to create.");
        return Ok(Vec::new());
    }

    info!("Found {} sub-issues to create", titles.len());
    let child_body = sub_issue_body(parent);
    let mut created = Vec::new();
    for title in &titles {
        match issues.create_issue(repo, title, &child_body).await {
            Ok(number) => {
                info!("Created sub-issue '{title}' -> #{number}");
                created.push(number);
            }
            Err(e) => warn!("Failed to create issue for '{title}': {e:#}"),
        }
    }

    if created.is_empty() {
        warn!("No sub-issues were successfully created.");
        return Ok(created);
    }

    info!("Linking {} sub-issues to parent issue #{parent}", created.len());
    let updated = format!("{body}{}", task_list(&created));
    match issues.update_issue_body(repo, parent, &updated).await {
        Ok(()) => info!("Parent issue updated with sub-issue list"),
        Err(e) => error!("Failed to update parent issue #{parent}: {e:#}"),
    }

    Ok(created)
}
