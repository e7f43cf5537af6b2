use location_gate::error::AppError;
use location_gate::workflows::allowlist::{
    EntryId, EntryRecord, EntryRepository, FieldDescriptor, FormDescriptor, FormId,
    FormSchemaProvider, ProviderError, RuleConfig, RuleSettings, SettingsProvider,
    SubmissionPayload,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// `GATE_SCHEMA_PATH` document: every form the host knows, with its fields in order.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SchemaDocument {
    #[serde(default)]
    pub(crate) forms: Vec<SchemaForm>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SchemaForm {
    pub(crate) id: FormId,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct InMemorySchemaProvider {
    forms: Vec<SchemaForm>,
}

impl InMemorySchemaProvider {
    pub(crate) fn from_document(document: SchemaDocument) -> Self {
        Self {
            forms: document.forms,
        }
    }
}

impl FormSchemaProvider for InMemorySchemaProvider {
    fn list_forms(&self) -> Result<Vec<FormDescriptor>, ProviderError> {
        Ok(self
            .forms
            .iter()
            .map(|form| FormDescriptor {
                id: form.id,
                name: form.name.clone(),
            })
            .collect())
    }

    fn list_fields(&self, form_id: FormId) -> Result<Vec<FieldDescriptor>, ProviderError> {
        Ok(self
            .forms
            .iter()
            .find(|form| form.id == form_id)
            .map(|form| form.fields.clone())
            .unwrap_or_default())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySettingsStore {
    config: Arc<Mutex<RuleConfig>>,
}

impl SettingsProvider for InMemorySettingsStore {
    fn current(&self) -> Result<RuleConfig, ProviderError> {
        let guard = self
            .config
            .lock()
            .map_err(|_| ProviderError::Unavailable("settings store poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn replace(&self, config: RuleConfig) -> Result<(), ProviderError> {
        let mut guard = self
            .config
            .lock()
            .map_err(|_| ProviderError::Unavailable("settings store poisoned".to_string()))?;
        *guard = config;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEntryRepository {
    records: Arc<Mutex<HashMap<EntryId, EntryRecord>>>,
}

impl InMemoryEntryRepository {
    fn poisoned() -> ProviderError {
        ProviderError::Unavailable("entry repository poisoned".to_string())
    }
}

impl EntryRepository for InMemoryEntryRepository {
    fn insert(&self, record: EntryRecord) -> Result<EntryRecord, ProviderError> {
        let mut guard = self.records.lock().map_err(|_| Self::poisoned())?;
        if guard.contains_key(&record.entry_id) {
            return Err(ProviderError::Conflict);
        }
        guard.insert(record.entry_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: EntryRecord) -> Result<(), ProviderError> {
        let mut guard = self.records.lock().map_err(|_| Self::poisoned())?;
        if guard.contains_key(&record.entry_id) {
            guard.insert(record.entry_id.clone(), record);
            Ok(())
        } else {
            Err(ProviderError::NotFound)
        }
    }

    fn fetch(&self, id: &EntryId) -> Result<Option<EntryRecord>, ProviderError> {
        let guard = self.records.lock().map_err(|_| Self::poisoned())?;
        Ok(guard.get(id).cloned())
    }
}

pub(crate) fn load_settings(path: &Path) -> Result<RuleSettings, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn load_schema(path: &Path) -> Result<InMemorySchemaProvider, AppError> {
    let raw = std::fs::read_to_string(path)?;
    let document: SchemaDocument = serde_json::from_str(&raw)?;
    Ok(InMemorySchemaProvider::from_document(document))
}

pub(crate) fn load_submission(path: &Path) -> Result<SubmissionPayload, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
