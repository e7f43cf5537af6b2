use super::domain::{EntryId, EntryRecord, FieldDescriptor, FormDescriptor, FormId};
use super::settings::RuleConfig;

/// Read access to the host's form schema.
pub trait FormSchemaProvider: Send + Sync {
    fn list_forms(&self) -> Result<Vec<FormDescriptor>, ProviderError>;
    fn list_fields(&self, form_id: FormId) -> Result<Vec<FieldDescriptor>, ProviderError>;
}

/// Source of the current rule configuration; `replace` is the save path.
pub trait SettingsProvider: Send + Sync {
    fn current(&self) -> Result<RuleConfig, ProviderError>;
    fn replace(&self, config: RuleConfig) -> Result<(), ProviderError>;
}

/// Host persistence whose create and update points are guarded by the gate.
pub trait EntryRepository: Send + Sync {
    fn insert(&self, record: EntryRecord) -> Result<EntryRecord, ProviderError>;
    fn update(&self, record: EntryRecord) -> Result<(), ProviderError>;
    fn fetch(&self, id: &EntryId) -> Result<Option<EntryRecord>, ProviderError>;
}

/// Failure reported by any external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
