//! Builds new project boards from TSV files: one project per file, fields
//! inferred from the `PROJECT_FIELD_*` columns, every open issue of the
//! repository added as an item, then populated through the field sync.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::github::{ItemMutator, ProjectAdmin, ProjectDirectory};
use crate::model::project::{field_name_from_header, FieldType};
use crate::sync::{SyncConfig, SyncReport, Synchronizer};
use crate::util::tsv::{self, Table};

/// Column whose first-row value names the project.
pub const TITLE_COLUMN: &str = "PROJECT_TITLE";
/// Join column used when populating a freshly built project.
pub const ISSUE_COLUMN: &str = "issue_number";
/// A column with more distinct values than this stays TEXT.
const MAX_SELECT_OPTIONS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    pub name: String,
    pub data_type: FieldType,
    pub options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectPlan {
    pub title: String,
    pub fields: Vec<FieldPlan>,
    pub table: Table,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Repository whose open issues are added, as `owner/name`.
    pub repo: String,
    pub pacing: Duration,
}

fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn infer_field(name: &str, values: &[&str]) -> FieldPlan {
    let distinct: BTreeSet<&str> = values.iter().copied().collect();
    let data_type = if values.first().is_some_and(|v| is_iso_date(v)) {
        FieldType::Date
    } else if (2..=MAX_SELECT_OPTIONS).contains(&distinct.len()) {
        FieldType::SingleSelect
    } else {
        FieldType::Text
    };
    let options = if data_type == FieldType::SingleSelect {
        distinct.into_iter().map(String::from).collect()
    } else {
        Vec::new()
    };
    FieldPlan {
        name: name.to_string(),
        data_type,
        options,
    }
}

/// Work out the title and field definitions for one TSV.
pub fn analyze(file_name: &str, table: Table) -> ProjectPlan {
    let title = table
        .rows
        .first()
        .and_then(|r| r.get(TITLE_COLUMN))
        .filter(|t| !t.trim().is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("Project from {file_name}"));

    let fields = table
        .headers
        .iter()
        .filter_map(|header| {
            let name = field_name_from_header(header)?;
            let values: Vec<&str> = table
                .rows
                .iter()
                .filter_map(|r| r.get(header))
                .filter(|v| !v.is_empty())
                .collect();
            if values.is_empty() {
                return None;
            }
            Some(infer_field(name, &values))
        })
        .collect();

    ProjectPlan {
        title,
        fields,
        table,
    }
}

async fn pause(pacing: Duration) {
    if !pacing.is_zero() {
        tokio::time::sleep(pacing).await;
    }
}

/// Create, fill and populate one project. Fails only if the project itself
/// cannot be created or its directories cannot be read back.
pub async fn build_project(
    admin: &dyn ProjectAdmin,
    directory: &dyn ProjectDirectory,
    mutator: &dyn ItemMutator,
    config: &BuildConfig,
    plan: &ProjectPlan,
) -> Result<SyncReport> {
    info!("Creating project '{}'", plan.title);
    let project = admin
        .create_project(&plan.title)
        .await
        .with_context(|| format!("Failed to create project '{}'", plan.title))?;
    info!("Created project #{} ({})", project.number, project.node_id);
    pause(config.pacing).await;

    for field in &plan.fields {
        info!(
            "  Creating field '{}' of type '{}'",
            field.name, field.data_type
        );
        if let Err(e) = admin
            .create_field(project.number, &field.name, field.data_type, &field.options)
            .await
        {
            warn!("  Failed to create field '{}': {e:#}", field.name);
        }
        pause(config.pacing).await;
    }

    info!("Importing open issues from '{}'", config.repo);
    let issues = match admin.list_open_issues(&config.repo).await {
        Ok(issues) => issues,
        Err(e) => {
            warn!("Failed to list issues for '{}': {e:#}", config.repo);
            Vec::new()
        }
    };
    for number in issues {
        let url = format!("https://github.com/{}/issues/{number}", config.repo);
        info!("  Adding issue #{number}");
        if let Err(e) = admin.add_item(project.number, &url).await {
            warn!("  Failed to add issue #{number}: {e:#}");
        }
        pause(config.pacing).await;
    }

    info!("Populating project fields");
    let sync_config = SyncConfig {
        project: project.number.to_string(),
        issue_column: ISSUE_COLUMN.to_string(),
        pacing: config.pacing,
    };
    let mut sync = Synchronizer::connect(directory, mutator, sync_config).await?;
    Ok(sync.run(&plan.table.rows).await)
}

/// `.tsv` files directly inside `dir`, sorted by name.
pub fn tsv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Directory '{}' not found", dir.display());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "tsv"))
        .collect();
    files.sort();
    Ok(files)
}

/// Build one project per TSV in `dir`. Returns how many were built.
pub async fn build_all(
    admin: &dyn ProjectAdmin,
    directory: &dyn ProjectDirectory,
    mutator: &dyn ItemMutator,
    config: &BuildConfig,
    dir: &Path,
) -> Result<usize> {
    let files = tsv_files(dir)?;
    if files.is_empty() {
        info!("No .tsv files found in '{}'. Nothing to do.", dir.display());
        return Ok(0);
    }

    info!("Found {} TSV files to process", files.len());
    let mut built = 0;
    for path in files {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        info!("Analyzing TSV file: {}", path.display());
        let table = match tsv::read_file(&path) {
            Ok(table) => table,
            Err(e) => {
                error!("{e:#}");
                continue;
            }
        };
        let plan = analyze(&file_name, table);
        match build_project(admin, directory, mutator, config, &plan).await {
            Ok(_) => built += 1,
            Err(e) => error!("Skipping '{file_name}': {e:#}"),
        }
    }
    Ok(built)
}
