//! In-memory GitHub used by tests. Records every write in call order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{IssueService, ItemMutator, ProjectAdmin, ProjectDirectory};
use crate::model::project::{
    Field, FieldType, FieldValue, ProjectItem, ProjectRef, SelectOption,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetValue {
        item_id: String,
        field_id: String,
        value: FieldValue,
    },
    ReplaceOptions {
        field_id: String,
        options: Vec<String>,
    },
    CreateProject(String),
    CreateField {
        name: String,
        data_type: FieldType,
        options: Vec<String>,
    },
    AddItem(String),
    CreateIssue {
        title: String,
        body: String,
    },
    UpdateBody {
        number: u64,
        body: String,
    },
}

#[derive(Default)]
pub struct MockGitHub {
    pub fields: Mutex<Vec<Field>>,
    pub items: Mutex<Vec<ProjectItem>>,
    pub open_issues: Vec<u64>,
    pub bodies: Mutex<HashMap<u64, String>>,
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub fail_project_lookup: bool,
    pub fail_fields: bool,
    pub fail_items: bool,
    pub fail_options: bool,
    /// Echo the option list back without the newly requested names.
    pub drop_new_options: bool,
    pub fail_set_field_ids: Vec<String>,
    pub fail_issue_titles: Vec<String>,
    pub fail_create_project: bool,
    pub fail_body_update: bool,
    sent_options: Mutex<Vec<Vec<SelectOption>>>,
    counter: Mutex<u64>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self {
            counter: Mutex::new(100),
            ..Default::default()
        }
    }

    pub fn with_fields(self, fields: Vec<Field>) -> Self {
        *self.fields.lock().unwrap() = fields;
        self
    }

    pub fn with_items(self, items: &[(u64, &str)]) -> Self {
        *self.items.lock().unwrap() = items
            .iter()
            .map(|(n, id)| ProjectItem {
                id: id.to_string(),
                issue_number: *n,
            })
            .collect();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_values(&self) -> Vec<(String, String, FieldValue)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SetValue {
                    item_id,
                    field_id,
                    value,
                } => Some((item_id, field_id, value)),
                _ => None,
            })
            .collect()
    }

    /// Full option lists sent to `replace_select_options`, in call order.
    pub fn sent_options(&self) -> Vec<Vec<SelectOption>> {
        self.sent_options.lock().unwrap().clone()
    }

    pub fn option_replacements(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::ReplaceOptions { .. }))
            .count()
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut n = self.counter.lock().unwrap();
        *n += 1;
        format!("{prefix}{n}")
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn text_field(id: &str, name: &str) -> Field {
    Field {
        id: id.into(),
        name: name.into(),
        data_type: FieldType::Text,
        options: vec![],
    }
}

pub fn date_field(id: &str, name: &str) -> Field {
    Field {
        data_type: FieldType::Date,
        ..text_field(id, name)
    }
}

pub fn select_field(id: &str, name: &str, options: &[(&str, &str)]) -> Field {
    Field {
        id: id.into(),
        name: name.into(),
        data_type: FieldType::SingleSelect,
        options: options
            .iter()
            .map(|(oid, oname)| SelectOption::new(oid, oname))
            .collect(),
    }
}

#[async_trait]
impl ProjectDirectory for MockGitHub {
    async fn project_node_id(&self, project: &str) -> Result<String> {
        if self.fail_project_lookup {
            bail!("project {project} not found");
        }
        Ok(format!("PVT_{project}"))
    }

    async fn list_fields(&self, _project_node_id: &str) -> Result<Vec<Field>> {
        if self.fail_fields {
            bail!("fields query unavailable");
        }
        Ok(self.fields.lock().unwrap().clone())
    }

    async fn list_items(&self, _project: &str) -> Result<Vec<ProjectItem>> {
        if self.fail_items {
            bail!("item-list unavailable");
        }
        Ok(self.items.lock().unwrap().clone())
    }

    async fn replace_select_options(
        &self,
        field_id: &str,
        options: &[SelectOption],
    ) -> Result<Vec<SelectOption>> {
        self.record(Call::ReplaceOptions {
            field_id: field_id.into(),
            options: options.iter().map(|o| o.name.clone()).collect(),
        });
        self.sent_options.lock().unwrap().push(options.to_vec());
        if self.fail_options {
            bail!("updateProjectV2Field rejected");
        }

        let mut fields = self.fields.lock().unwrap();
        let Some(field) = fields.iter_mut().find(|f| f.id == field_id) else {
            bail!("unknown field {field_id}");
        };
        let mut updated = Vec::new();
        for option in options {
            match field.options.iter().find(|o| o.name == option.name) {
                Some(existing) => updated.push(SelectOption {
                    id: existing.id.clone(),
                    ..option.clone()
                }),
                None if self.drop_new_options => {}
                None => updated.push(SelectOption {
                    id: self.next_id("OPT"),
                    color: Some(option.color.clone().unwrap_or_else(|| "GRAY".into())),
                    ..option.clone()
                }),
            }
        }
        field.options = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl ItemMutator for MockGitHub {
    async fn set_field_value(
        &self,
        _project_node_id: &str,
        item_id: &str,
        field_id: &str,
        value: &FieldValue,
    ) -> Result<()> {
        self.record(Call::SetValue {
            item_id: item_id.into(),
            field_id: field_id.into(),
            value: value.clone(),
        });
        if self.fail_set_field_ids.iter().any(|f| f == field_id) {
            bail!("item-edit rejected value");
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectAdmin for MockGitHub {
    async fn create_project(&self, title: &str) -> Result<ProjectRef> {
        self.record(Call::CreateProject(title.into()));
        if self.fail_create_project {
            bail!("project create failed");
        }
        Ok(ProjectRef {
            number: 7,
            node_id: "PVT_7".into(),
        })
    }

    async fn create_field(
        &self,
        _project_number: u64,
        name: &str,
        data_type: FieldType,
        options: &[String],
    ) -> Result<()> {
        self.record(Call::CreateField {
            name: name.into(),
            data_type,
            options: options.to_vec(),
        });
        let field = Field {
            id: self.next_id("FLD"),
            name: name.into(),
            data_type,
            options: options
                .iter()
                .map(|o| SelectOption::new(&self.next_id("OPT"), o))
                .collect(),
        };
        self.fields.lock().unwrap().push(field);
        Ok(())
    }

    async fn list_open_issues(&self, _repo: &str) -> Result<Vec<u64>> {
        Ok(self.open_issues.clone())
    }

    async fn add_item(&self, _project_number: u64, url: &str) -> Result<String> {
        self.record(Call::AddItem(url.into()));
        let number: u64 = url
            .rsplit('/')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or_default();
        let id = self.next_id("ITEM");
        self.items.lock().unwrap().push(ProjectItem {
            id: id.clone(),
            issue_number: number,
        });
        Ok(id)
    }
}

#[async_trait]
impl IssueService for MockGitHub {
    async fn issue_body(&self, _repo: &str, number: u64) -> Result<Option<String>> {
        match self.bodies.lock().unwrap().get(&number) {
            Some(body) => Ok(Some(body.clone())),
            None => bail!("issue #{number} not found"),
        }
    }

    async fn create_issue(&self, _repo: &str, title: &str, body: &str) -> Result<u64> {
        self.record(Call::CreateIssue {
            title: title.into(),
            body: body.into(),
        });
        if self.fail_issue_titles.iter().any(|t| t == title) {
            bail!("issue create failed");
        }
        let mut n = self.counter.lock().unwrap();
        *n += 1;
        Ok(*n)
    }

    async fn update_issue_body(&self, _repo: &str, number: u64, body: &str) -> Result<()> {
        self.record(Call::UpdateBody {
            number,
            body: body.into(),
        });
        if self.fail_body_update {
            bail!("issue update failed");
        }
        self.bodies.lock().unwrap().insert(number, body.into());
        Ok(())
    }
}
