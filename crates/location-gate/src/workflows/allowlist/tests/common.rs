use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::allowlist::domain::{
    EntryId, EntryRecord, FieldDescriptor, FieldId, FormDescriptor, FormId, SubmissionPayload,
};
use crate::workflows::allowlist::providers::{
    EntryRepository, FormSchemaProvider, ProviderError, SettingsProvider,
};
use crate::workflows::allowlist::settings::{LocationRule, RuleConfig};
use crate::workflows::allowlist::{location_gate_router, LocationGateService};

pub(super) const CONTACT_FORM: FormId = FormId(3);
pub(super) const SURVEY_FORM: FormId = FormId(8);
pub(super) const ZIP_FIELD: FieldId = FieldId(12);
pub(super) const STATE_FIELD: FieldId = FieldId(14);
pub(super) const SHIPPING_ZIP_FIELD: FieldId = FieldId(16);

pub(super) fn field(id: u64, name: &str) -> FieldDescriptor {
    FieldDescriptor {
        id: FieldId(id),
        name: name.to_string(),
        field_type: "text".to_string(),
    }
}

pub(super) fn contact_fields() -> Vec<FieldDescriptor> {
    vec![
        field(10, "Full Name"),
        field(12, "Zip Code"),
        field(14, "State"),
        field(16, "Shipping ZIP"),
    ]
}

pub(super) fn survey_fields() -> Vec<FieldDescriptor> {
    vec![field(20, "Favorite color"), field(21, "Comments")]
}

pub(super) fn schema() -> MemorySchema {
    MemorySchema::new(vec![
        (CONTACT_FORM, "Contact", contact_fields()),
        (SURVEY_FORM, "Survey", survey_fields()),
    ])
}

pub(super) fn rule(enabled: bool, allowed: &[&str], message: &str) -> LocationRule {
    LocationRule {
        enabled,
        allowed: allowed.iter().map(|value| value.to_string()).collect(),
        error_message: message.to_string(),
    }
}

pub(super) fn zip_config(allowed: &[&str]) -> RuleConfig {
    RuleConfig {
        selected_form_ids: BTreeSet::from([CONTACT_FORM, SURVEY_FORM]),
        zip: rule(true, allowed, "ZIP not served."),
        ..RuleConfig::default()
    }
}

pub(super) fn state_config(allowed: &[&str]) -> RuleConfig {
    RuleConfig {
        selected_form_ids: BTreeSet::from([CONTACT_FORM, SURVEY_FORM]),
        state: rule(true, allowed, "State not served."),
        ..RuleConfig::default()
    }
}

pub(super) fn both_config() -> RuleConfig {
    RuleConfig {
        selected_form_ids: BTreeSet::from([CONTACT_FORM, SURVEY_FORM]),
        zip: rule(true, &["02134", "02139"], "ZIP not served."),
        state: rule(true, &["MA", "NH"], "State not served."),
        ..RuleConfig::default()
    }
}

pub(super) fn contact(values: &[(FieldId, &str)]) -> SubmissionPayload {
    values
        .iter()
        .fold(SubmissionPayload::new(CONTACT_FORM), |payload, (id, value)| {
            payload.with_value(*id, *value)
        })
}

pub(super) struct MemorySchema {
    forms: Vec<FormDescriptor>,
    fields: HashMap<FormId, Vec<FieldDescriptor>>,
    field_calls: AtomicUsize,
    form_calls: AtomicUsize,
}

impl MemorySchema {
    pub(super) fn new(forms: Vec<(FormId, &str, Vec<FieldDescriptor>)>) -> Self {
        let mut descriptors = Vec::new();
        let mut fields = HashMap::new();
        for (id, name, form_fields) in forms {
            descriptors.push(FormDescriptor {
                id,
                name: name.to_string(),
            });
            fields.insert(id, form_fields);
        }
        Self {
            forms: descriptors,
            fields,
            field_calls: AtomicUsize::new(0),
            form_calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn field_calls(&self) -> usize {
        self.field_calls.load(Ordering::SeqCst)
    }

    pub(super) fn form_calls(&self) -> usize {
        self.form_calls.load(Ordering::SeqCst)
    }
}

impl FormSchemaProvider for MemorySchema {
    fn list_forms(&self) -> Result<Vec<FormDescriptor>, ProviderError> {
        self.form_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.forms.clone())
    }

    fn list_fields(&self, form_id: FormId) -> Result<Vec<FieldDescriptor>, ProviderError> {
        self.field_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fields.get(&form_id).cloned().unwrap_or_default())
    }
}

pub(super) struct OfflineSchema;

impl FormSchemaProvider for OfflineSchema {
    fn list_forms(&self) -> Result<Vec<FormDescriptor>, ProviderError> {
        Err(ProviderError::Unavailable("schema offline".to_string()))
    }

    fn list_fields(&self, _form_id: FormId) -> Result<Vec<FieldDescriptor>, ProviderError> {
        Err(ProviderError::Unavailable("schema offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemorySettings {
    config: Mutex<RuleConfig>,
}

impl MemorySettings {
    pub(super) fn with(config: RuleConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }
}

impl SettingsProvider for MemorySettings {
    fn current(&self) -> Result<RuleConfig, ProviderError> {
        Ok(self.config.lock().expect("settings mutex poisoned").clone())
    }

    fn replace(&self, config: RuleConfig) -> Result<(), ProviderError> {
        *self.config.lock().expect("settings mutex poisoned") = config;
        Ok(())
    }
}

/// Settings store whose answer changes after the first read, as if an operator saved
/// new rules while a request was in flight.
pub(super) struct ShiftingSettings {
    first: RuleConfig,
    later: RuleConfig,
    reads: AtomicUsize,
}

impl ShiftingSettings {
    pub(super) fn new(first: RuleConfig, later: RuleConfig) -> Self {
        Self {
            first,
            later,
            reads: AtomicUsize::new(0),
        }
    }

    pub(super) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SettingsProvider for ShiftingSettings {
    fn current(&self) -> Result<RuleConfig, ProviderError> {
        if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(self.first.clone())
        } else {
            Ok(self.later.clone())
        }
    }

    fn replace(&self, _config: RuleConfig) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryEntries {
    pub(super) records: Arc<Mutex<HashMap<EntryId, EntryRecord>>>,
}

impl MemoryEntries {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("entries mutex poisoned").len()
    }
}

impl EntryRepository for MemoryEntries {
    fn insert(&self, record: EntryRecord) -> Result<EntryRecord, ProviderError> {
        let mut guard = self.records.lock().expect("entries mutex poisoned");
        if guard.contains_key(&record.entry_id) {
            return Err(ProviderError::Conflict);
        }
        guard.insert(record.entry_id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: EntryRecord) -> Result<(), ProviderError> {
        let mut guard = self.records.lock().expect("entries mutex poisoned");
        guard.insert(record.entry_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &EntryId) -> Result<Option<EntryRecord>, ProviderError> {
        let guard = self.records.lock().expect("entries mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) type MemoryService = LocationGateService<MemorySettings, MemorySchema, MemoryEntries>;

pub(super) fn build_service(config: RuleConfig) -> (MemoryService, Arc<MemorySchema>, Arc<MemoryEntries>) {
    let schema = Arc::new(schema());
    let entries = Arc::new(MemoryEntries::default());
    let service = LocationGateService::new(
        Arc::new(MemorySettings::with(config)),
        schema.clone(),
        entries.clone(),
    );
    (service, schema, entries)
}

pub(super) type ShiftingService =
    LocationGateService<ShiftingSettings, MemorySchema, MemoryEntries>;

pub(super) fn build_shifting_service(
    first: RuleConfig,
    later: RuleConfig,
) -> (ShiftingService, Arc<ShiftingSettings>, Arc<MemoryEntries>) {
    let settings = Arc::new(ShiftingSettings::new(first, later));
    let entries = Arc::new(MemoryEntries::default());
    let service =
        LocationGateService::new(settings.clone(), Arc::new(schema()), entries.clone());
    (service, settings, entries)
}

pub(super) fn router_with_service(service: MemoryService) -> axum::Router {
    location_gate_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
