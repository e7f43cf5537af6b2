use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    EntryId, EntryRecord, FormDescriptor, LifecyclePoint, SubmissionContext, SubmissionPayload,
    ValidationErrors,
};
use super::enforcement::{EnforcementError, EnforcementGate};
use super::providers::{EntryRepository, FormSchemaProvider, ProviderError, SettingsProvider};
use super::settings::{RuleConfig, RuleSettings};
use super::validator::LocationValidator;

/// Service composing the settings, schema and entry collaborators with the soft
/// validator and the hard enforcement gate.
pub struct LocationGateService<S, F, E> {
    settings: Arc<S>,
    schema: Arc<F>,
    entries: Arc<E>,
    validator: LocationValidator<F>,
    gate: EnforcementGate<F>,
}

static ENTRY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_entry_id() -> EntryId {
    let id = ENTRY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EntryId(format!("entry-{id:06}"))
}

impl<S, F, E> LocationGateService<S, F, E>
where
    S: SettingsProvider + 'static,
    F: FormSchemaProvider + 'static,
    E: EntryRepository + 'static,
{
    pub fn new(settings: Arc<S>, schema: Arc<F>, entries: Arc<E>) -> Self {
        Self {
            validator: LocationValidator::new(schema.clone()),
            gate: EnforcementGate::new(schema.clone()),
            settings,
            schema,
            entries,
        }
    }

    /// Soft validation against a fresh settings snapshot.
    pub fn validate(
        &self,
        submission: &SubmissionPayload,
    ) -> Result<ValidationErrors, GateServiceError> {
        let config = self.settings.current()?;
        let errors = self
            .validator
            .validate(&config, submission, ValidationErrors::new())?;
        Ok(errors)
    }

    /// Full request flow for a new entry against one settings snapshot: soft validation
    /// first, then the gate re-derives its own result from the same payload.
    pub fn submit_entry(
        &self,
        submission: SubmissionPayload,
        context: SubmissionContext,
    ) -> Result<SubmitOutcome, GateServiceError> {
        let config = self.settings.current()?;
        let errors = self
            .validator
            .validate(&config, &submission, ValidationErrors::new())?;
        if !errors.is_empty() {
            return Ok(SubmitOutcome::Invalid(errors));
        }

        self.create_with(&config, submission, context)
            .map(SubmitOutcome::Stored)
    }

    /// Same as [`Self::submit_entry`] for an edit. The stored entry's form id wins over
    /// whatever the request carried.
    pub fn resubmit_entry(
        &self,
        entry_id: &EntryId,
        submission: SubmissionPayload,
        context: SubmissionContext,
    ) -> Result<SubmitOutcome, GateServiceError> {
        let record = self.stored(entry_id)?;
        let payload = SubmissionPayload {
            form_id: Some(record.form_id),
            field_values: submission.field_values,
        };

        let config = self.settings.current()?;
        let errors = self
            .validator
            .validate(&config, &payload, ValidationErrors::new())?;
        if !errors.is_empty() {
            return Ok(SubmitOutcome::Invalid(errors));
        }

        self.update_with(&config, record, payload, context)
            .map(SubmitOutcome::Stored)
    }

    /// Persist a new entry once the gate lets it through.
    pub fn create_entry(
        &self,
        submission: SubmissionPayload,
        context: SubmissionContext,
    ) -> Result<EntryRecord, GateServiceError> {
        let config = self.settings.current()?;
        self.create_with(&config, submission, context)
    }

    /// Replace an entry's values once the gate lets the update through.
    pub fn update_entry(
        &self,
        entry_id: &EntryId,
        submission: SubmissionPayload,
        context: SubmissionContext,
    ) -> Result<EntryRecord, GateServiceError> {
        let record = self.stored(entry_id)?;
        let payload = SubmissionPayload {
            form_id: Some(record.form_id),
            field_values: submission.field_values,
        };

        let config = self.settings.current()?;
        self.update_with(&config, record, payload, context)
    }

    fn stored(&self, entry_id: &EntryId) -> Result<EntryRecord, GateServiceError> {
        Ok(self
            .entries
            .fetch(entry_id)?
            .ok_or(ProviderError::NotFound)?)
    }

    fn create_with(
        &self,
        config: &RuleConfig,
        submission: SubmissionPayload,
        context: SubmissionContext,
    ) -> Result<EntryRecord, GateServiceError> {
        self.gate
            .enforce(config, &submission, &context, LifecyclePoint::Create)?;

        let form_id = submission
            .target_form()
            .ok_or(GateServiceError::MissingFormId)?;
        let now = Utc::now();
        let record = EntryRecord {
            entry_id: next_entry_id(),
            form_id,
            field_values: submission.field_values,
            created_at: now,
            updated_at: now,
        };

        let stored = self.entries.insert(record)?;
        Ok(stored)
    }

    fn update_with(
        &self,
        config: &RuleConfig,
        mut record: EntryRecord,
        payload: SubmissionPayload,
        context: SubmissionContext,
    ) -> Result<EntryRecord, GateServiceError> {
        self.gate
            .enforce(config, &payload, &context, LifecyclePoint::Update)?;

        record.field_values = payload.field_values;
        record.updated_at = Utc::now();
        self.entries.update(record.clone())?;
        Ok(record)
    }

    pub fn forms(&self) -> Result<Vec<FormDescriptor>, GateServiceError> {
        Ok(self.schema.list_forms()?)
    }

    pub fn settings(&self) -> Result<RuleConfig, GateServiceError> {
        Ok(self.settings.current()?)
    }

    /// Migrate, sanitize and store an operator settings document.
    pub fn save_settings(&self, settings: RuleSettings) -> Result<RuleConfig, GateServiceError> {
        let config = RuleConfig::from_settings(&settings.migrate());
        self.settings.replace(config.clone())?;
        info!(
            apply_all_forms = config.apply_all_forms,
            selected_forms = config.selected_form_ids.len(),
            zip_entries = config.zip.allowed.len(),
            state_entries = config.state.allowed.len(),
            "location rules saved"
        );
        Ok(config)
    }
}

/// Result of a submission that ran the soft path and, when clean, the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Soft validation produced messages; nothing was persisted.
    Invalid(ValidationErrors),
    Stored(EntryRecord),
}

/// Error raised by the gate service.
#[derive(Debug, thiserror::Error)]
pub enum GateServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Enforcement(#[from] EnforcementError),
    #[error("submission does not name a form")]
    MissingFormId,
}
