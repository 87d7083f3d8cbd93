use serde::Deserialize;
use std::fmt;

/// Column prefix that marks a TSV column as a project field.
pub const FIELD_PREFIX: &str = "PROJECT_FIELD_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Date,
    SingleSelect,
    Number,
}

impl FieldType {
    /// Parse a GraphQL `ProjectV2FieldType`. Anything unrecognized is TEXT.
    pub fn parse(s: &str) -> Self {
        match s {
            "DATE" => FieldType::Date,
            "SINGLE_SELECT" => FieldType::SingleSelect,
            "NUMBER" => FieldType::Number,
            _ => FieldType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Date => "DATE",
            FieldType::SingleSelect => "SINGLE_SELECT",
            FieldType::Number => "NUMBER",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// `ProjectV2SingleSelectFieldOptionColor` as set on the board.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl SelectOption {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: None,
            description: None,
        }
    }

    /// An option that does not exist on the board yet.
    pub fn unsaved(name: &str) -> Self {
        Self::new("", name)
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub data_type: FieldType,
    /// Only populated for single-select fields.
    pub options: Vec<SelectOption>,
}

impl Field {
    pub fn option_id(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectItem {
    pub id: String,
    pub issue_number: u64,
}

/// A project created by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub number: u64,
    pub node_id: String,
}

/// Value written to an item field, already resolved against the field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(String),
    SingleSelectOption(String),
}

impl FieldValue {
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Text(s) | FieldValue::Date(s) | FieldValue::SingleSelectOption(s) => s,
        }
    }
}

/// Strip the field prefix from a column header. Returns None for non-field columns.
pub fn field_name_from_header(header: &str) -> Option<&str> {
    header.strip_prefix(FIELD_PREFIX)
}
