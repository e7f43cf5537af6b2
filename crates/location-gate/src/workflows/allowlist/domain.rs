use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a form in the host's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(pub u64);

/// Identifier of a field within a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u64);

/// Identifier assigned to a persisted entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two location rules the gate knows how to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Zip,
    State,
}

impl RuleKind {
    pub const ALL: [RuleKind; 2] = [RuleKind::Zip, RuleKind::State];

    /// Lowercase label fragments that mark a field as carrying this kind of value.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            RuleKind::Zip => &["zip", "postal", "post code", "postcode"],
            RuleKind::State => &["state", "province"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuleKind::Zip => "ZIP",
            RuleKind::State => "State",
        }
    }
}

/// Form summary supplied by the schema provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub id: FormId,
    pub name: String,
}

/// Field summary supplied by the schema provider. `name` is the human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub name: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
}

fn default_field_type() -> String {
    "text".to_string()
}

/// A posted value: either a scalar or the list a multi-input field produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

impl FieldValue {
    /// Scalar used for checks; the first element of a list.
    pub fn first(&self) -> &str {
        match self {
            FieldValue::Single(value) => value,
            FieldValue::Multiple(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

/// One request's posted data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(default)]
    pub form_id: Option<FormId>,
    #[serde(default)]
    pub field_values: BTreeMap<FieldId, FieldValue>,
}

impl SubmissionPayload {
    pub fn new(form_id: FormId) -> Self {
        Self {
            form_id: Some(form_id),
            field_values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: FieldId, value: impl Into<FieldValue>) -> Self {
        self.field_values.insert(field, value.into());
        self
    }

    /// Form id, treating `0` the same as an absent id.
    pub fn target_form(&self) -> Option<FormId> {
        self.form_id.filter(|id| id.0 != 0)
    }

    pub fn is_present(&self, field: FieldId) -> bool {
        self.field_values.contains_key(&field)
    }

    pub fn value_of(&self, field: FieldId) -> Option<&str> {
        self.field_values.get(&field).map(FieldValue::first)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Single(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::Multiple(values)
    }
}

pub const FORM_ERROR_KEY: &str = "form";

/// Error messages keyed by `"form"` or `"field<id>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_key(field: FieldId) -> String {
        format!("field{}", field.0)
    }

    /// Attach a form-level message, space-separated from any existing one.
    pub fn append_form(&mut self, message: &str) {
        self.0
            .entry(FORM_ERROR_KEY.to_string())
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(message);
            })
            .or_insert_with(|| message.to_string());
    }

    pub fn insert_field(&mut self, field: FieldId, message: &str) {
        self.0.insert(Self::field_key(field), message.to_string());
    }

    pub fn insert(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.insert(key.into(), message.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, msg)| (key.as_str(), msg.as_str()))
    }
}

/// Where in the host's persistence lifecycle the gate is being consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePoint {
    Create,
    Update,
}

impl LifecyclePoint {
    pub fn label(self) -> &'static str {
        match self {
            LifecyclePoint::Create => "create",
            LifecyclePoint::Update => "update",
        }
    }
}

/// Ambient request facts the gate uses to tell real submissions from admin renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionContext {
    pub admin: bool,
    pub ajax: bool,
}

impl SubmissionContext {
    pub fn public() -> Self {
        Self::default()
    }

    /// Server-side administrative access with no posted submission underway.
    pub fn is_admin_render(&self) -> bool {
        self.admin && !self.ajax
    }
}

/// Entry persisted by the host once the gate lets it through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub entry_id: EntryId,
    pub form_id: FormId,
    pub field_values: BTreeMap<FieldId, FieldValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
