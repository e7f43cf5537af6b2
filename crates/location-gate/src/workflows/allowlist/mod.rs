//! ZIP and state allowlist gate for form submissions.
//!
//! Submissions are checked twice. The soft path (`LocationValidator`) annotates
//! field-level messages for the host's inline feedback; the hard path
//! (`EnforcementGate`) re-derives the same result at persistence time and aborts with a
//! 403 when anything is rejected.

pub mod discovery;
pub mod domain;
pub mod enforcement;
pub mod import;
pub mod matcher;
pub mod normalizer;
pub mod providers;
pub mod router;
pub mod service;
pub mod settings;
pub mod validator;

#[cfg(test)]
mod tests;

pub use discovery::discover;
pub use domain::{
    EntryId, EntryRecord, FieldDescriptor, FieldId, FieldValue, FormDescriptor, FormId,
    LifecyclePoint, RuleKind, SubmissionContext, SubmissionPayload, ValidationErrors,
};
pub use enforcement::{Enforcement, EnforcementError, EnforcementGate, BLOCK_MESSAGE};
pub use import::{ImportSummary, SettingsImportError, ZipListImporter};
pub use matcher::is_allowed;
pub use normalizer::normalize;
pub use providers::{EntryRepository, FormSchemaProvider, ProviderError, SettingsProvider};
pub use router::location_gate_router;
pub use service::{GateServiceError, LocationGateService, SubmitOutcome};
pub use settings::{
    AllowlistInput, LocationRule, RuleConfig, RuleSettings, SettingsVersion, SETTINGS_VERSION,
};
pub use validator::{evaluate_rule, LocationValidator, Rejection, RuleOutcome, SkipReason};
