//! Field sync: applies `PROJECT_FIELD_*` columns of a TSV to the project
//! items linked to each row's issue.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::github::{ItemMutator, ProjectDirectory};
use crate::model::project::{field_name_from_header, Field, FieldType, FieldValue, SelectOption};
use crate::util::tsv::Row;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Project number as understood by `gh project`.
    pub project: String,
    /// Column holding the issue number each row is joined on.
    pub issue_column: String,
    /// Delay after every row that touched an item.
    pub pacing: Duration,
}

/// Setup failures. Nothing has been written when one of these is returned.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not resolve project {project}: {error:#}")]
    ProjectLookup {
        project: String,
        error: anyhow::Error,
    },
    #[error("could not fetch project fields: {0:#}")]
    FieldDirectory(anyhow::Error),
    #[error("could not fetch project items: {0:#}")]
    ItemDirectory(anyhow::Error),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub rows_seen: usize,
    pub rows_applied: usize,
    pub rows_skipped: usize,
    pub values_set: usize,
    pub values_failed: usize,
    pub options_created: usize,
    pub warnings: Vec<String>,
}

impl SyncReport {
    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Fields and items of the project, fetched once per run.
struct Directory {
    project_node_id: String,
    fields: HashMap<String, Field>,
    items: HashMap<u64, String>,
}

pub struct Synchronizer<'a> {
    directory: &'a dyn ProjectDirectory,
    mutator: &'a dyn ItemMutator,
    config: SyncConfig,
    cache: Directory,
}

impl<'a> Synchronizer<'a> {
    /// Fetch the field and item directories. Any failure here aborts the run.
    pub async fn connect(
        directory: &'a dyn ProjectDirectory,
        mutator: &'a dyn ItemMutator,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        info!(project = %config.project, "Fetching project data");

        let project_node_id = directory
            .project_node_id(&config.project)
            .await
            .map_err(|error| SyncError::ProjectLookup {
                project: config.project.clone(),
                error,
            })?;

        let fields = directory
            .list_fields(&project_node_id)
            .await
            .map_err(SyncError::FieldDirectory)?
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect::<HashMap<_, _>>();

        let items = directory
            .list_items(&config.project)
            .await
            .map_err(SyncError::ItemDirectory)?
            .into_iter()
            .map(|i| (i.issue_number, i.id))
            .collect::<HashMap<_, _>>();

        info!(
            fields = fields.len(),
            items = items.len(),
            "Built project lookup maps"
        );

        Ok(Self {
            directory,
            mutator,
            config,
            cache: Directory {
                project_node_id,
                fields,
                items,
            },
        })
    }

    /// Cached view of a field, including options created during this run.
    #[cfg(test)]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.cache.fields.get(name)
    }

    /// Apply every row in order, pacing between rows that matched an item.
    pub async fn run(&mut self, rows: &[Row]) -> SyncReport {
        let mut report = SyncReport::default();
        for row in rows {
            report.rows_seen += 1;
            if self.apply_row(row, &mut report).await {
                report.rows_applied += 1;
                if !self.config.pacing.is_zero() {
                    tokio::time::sleep(self.config.pacing).await;
                }
            } else {
                report.rows_skipped += 1;
            }
        }
        info!(
            applied = report.rows_applied,
            skipped = report.rows_skipped,
            values = report.values_set,
            failed = report.values_failed,
            "Processing complete"
        );
        report
    }

    /// Returns false when the row has no usable issue number or no item.
    pub async fn apply_row(&mut self, row: &Row, report: &mut SyncReport) -> bool {
        let Some(issue_number) = row
            .get(&self.config.issue_column)
            .and_then(|v| v.trim().parse::<u64>().ok())
        else {
            return false;
        };
        let Some(item_id) = self.cache.items.get(&issue_number).cloned() else {
            debug!(issue = issue_number, "No project item for issue");
            return false;
        };

        info!("Processing issue #{issue_number}");

        for (header, raw) in row.iter() {
            let Some(field_name) = field_name_from_header(header) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }

            let Some(field) = self.cache.fields.get(field_name) else {
                report.warn(format!("Field '{field_name}' not found. Skipping."));
                continue;
            };
            let field_id = field.id.clone();
            let data_type = field.data_type;

            let value = match data_type {
                FieldType::SingleSelect => {
                    match self.resolve_option(field_name, raw, report).await {
                        Some(option_id) => FieldValue::SingleSelectOption(option_id),
                        None => continue,
                    }
                }
                FieldType::Date => FieldValue::Date(raw.to_string()),
                FieldType::Text | FieldType::Number => FieldValue::Text(raw.to_string()),
            };

            info!("  Setting '{field_name}' to '{raw}'");
            match self
                .mutator
                .set_field_value(&self.cache.project_node_id, &item_id, &field_id, &value)
                .await
            {
                Ok(()) => report.values_set += 1,
                Err(e) => {
                    report.values_failed += 1;
                    report.warn(format!(
                        "Failed to set '{field_name}' on issue #{issue_number}: {e:#}"
                    ));
                }
            }
        }

        true
    }

    /// Find the option id for `name`, creating the option when it is missing.
    ///
    /// A new option is added by rewriting the field's whole option list, so a
    /// concurrent run extending the same field can drop this addition or have
    /// its own dropped. Existing options are sent back with the colour and
    /// description read at setup.
    async fn resolve_option(
        &mut self,
        field_name: &str,
        name: &str,
        report: &mut SyncReport,
    ) -> Option<String> {
        let field = self.cache.fields.get_mut(field_name)?;
        if let Some(id) = field.option_id(name) {
            return Some(id.to_string());
        }

        info!("  Option '{name}' not found for field '{field_name}'. Creating it");
        let mut desired = field.options.clone();
        desired.push(SelectOption::unsaved(name));

        let updated = match self
            .directory
            .replace_select_options(&field.id, &desired)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                report.warn(format!(
                    "Failed to create option '{name}' for field '{field_name}': {e:#}"
                ));
                return None;
            }
        };

        match updated.into_iter().find(|o| o.name == name) {
            Some(option) => {
                let id = option.id.clone();
                field.options.push(option);
                report.options_created += 1;
                info!("  Created option '{name}'");
                Some(id)
            }
            None => {
                report.warn(format!(
                    "Option '{name}' missing from updated field '{field_name}'"
                ));
                None
            }
        }
    }
}
