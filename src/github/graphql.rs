use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::GitHub;
use crate::model::project::{Field, FieldType, SelectOption};

const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Colour given to options that do not have one yet.
const DEFAULT_OPTION_COLOR: &str = "GRAY";

const LIST_FIELDS: &str = r#"query($projectId: ID!, $cursor: String) {
  node(id: $projectId) {
    ... on ProjectV2 {
      fields(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          ... on ProjectV2FieldCommon { id name dataType }
          ... on ProjectV2SingleSelectField { options { id name color description } }
        }
      }
    }
  }
}"#;

const UPDATE_OPTIONS: &str = r#"mutation($fieldId: ID!, $options: [ProjectV2SingleSelectFieldOptionInput!]) {
  updateProjectV2Field(input: { fieldId: $fieldId, singleSelectOptions: $options }) {
    projectV2Field {
      ... on ProjectV2SingleSelectField {
        id
        options { id name color description }
      }
    }
  }
}"#;

#[derive(Deserialize)]
struct GqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Deserialize)]
struct FieldsData {
    node: Option<ProjectNode>,
}

#[derive(Deserialize)]
struct ProjectNode {
    fields: Option<FieldConnection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldConnection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<FieldNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

/// Any member of the field configuration union. Members outside the
/// fragments come back as `{}`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldNode {
    id: Option<String>,
    name: Option<String>,
    data_type: Option<String>,
    #[serde(default)]
    options: Vec<SelectOption>,
}

#[derive(Deserialize)]
struct UpdateData {
    #[serde(rename = "updateProjectV2Field")]
    update: UpdatePayload,
}

#[derive(Deserialize)]
struct UpdatePayload {
    #[serde(rename = "projectV2Field")]
    field: Option<UpdatedField>,
}

#[derive(Deserialize)]
struct UpdatedField {
    #[serde(default)]
    options: Vec<SelectOption>,
}

fn response_data<T>(resp: GqlResponse<T>) -> Result<T> {
    if let Some(err) = resp.errors.first() {
        bail!("GraphQL error: {}", err.message);
    }
    resp.data.context("No data in GraphQL response")
}

impl FieldNode {
    fn into_field(self) -> Option<Field> {
        Some(Field {
            id: self.id?,
            name: self.name?,
            data_type: self
                .data_type
                .as_deref()
                .map(FieldType::parse)
                .unwrap_or(FieldType::Text),
            options: self.options,
        })
    }
}

/// One page of fields plus the cursor of the next page, if any.
fn field_page(data: FieldsData) -> Result<(Vec<Field>, Option<String>)> {
    let connection = data
        .node
        .and_then(|n| n.fields)
        .context("Project not found or not a ProjectV2 board")?;
    let fields = connection
        .nodes
        .into_iter()
        .flatten()
        .filter_map(FieldNode::into_field)
        .collect();
    let next = if connection.page_info.has_next_page {
        connection.page_info.end_cursor
    } else {
        None
    };
    Ok((fields, next))
}

/// Option inputs for the rewrite. Existing options keep their colour and
/// description; new ones get the default colour and no description.
fn option_inputs(options: &[SelectOption]) -> Vec<serde_json::Value> {
    options
        .iter()
        .map(|o| {
            serde_json::json!({
                "name": o.name,
                "color": o.color.as_deref().unwrap_or(DEFAULT_OPTION_COLOR),
                "description": o.description.as_deref().unwrap_or_default(),
            })
        })
        .collect()
}

fn updated_options(data: UpdateData) -> Result<Vec<SelectOption>> {
    let field = data
        .update
        .field
        .context("Updated field is not a single-select field")?;
    Ok(field.options)
}

impl GitHub {
    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let token = self.token()?;
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let resp = self
            .client
            .post(GRAPHQL_URL)
            .bearer_auth(token)
            .header("User-Agent", "boardsync")
            .json(&body)
            .send()
            .await
            .context("GitHub GraphQL request failed")?;

        if !resp.status().is_success() {
            bail!("GitHub GraphQL request failed: HTTP {}", resp.status());
        }

        let gql: GqlResponse<T> = resp
            .json()
            .await
            .context("Failed to parse GitHub GraphQL response")?;
        response_data(gql)
    }

    /// All fields of a project with their data types and select options.
    pub(super) async fn list_project_fields(&self, project_node_id: &str) -> Result<Vec<Field>> {
        let mut fields = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let data: FieldsData = self
                .graphql(
                    LIST_FIELDS,
                    serde_json::json!({ "projectId": project_node_id, "cursor": cursor }),
                )
                .await?;
            let (page, next) = field_page(data)?;
            fields.extend(page);
            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(fields)
    }

    /// Overwrite the option list of a single-select field.
    ///
    /// The list sent is the whole desired set. Two writers extending the same
    /// field at once can lose one side's addition.
    pub(super) async fn update_single_select_options(
        &self,
        field_id: &str,
        options: &[SelectOption],
    ) -> Result<Vec<SelectOption>> {
        let data: UpdateData = self
            .graphql(
                UPDATE_OPTIONS,
                serde_json::json!({
                    "fieldId": field_id,
                    "options": option_inputs(options),
                }),
            )
            .await?;
        updated_options(data)
    }
}
