use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::discovery::discover;
use super::domain::{FieldDescriptor, FieldId, FormId, RuleKind, SubmissionPayload, ValidationErrors};
use super::matcher::is_allowed;
use super::normalizer::normalize;
use super::providers::{FormSchemaProvider, ProviderError};
use super::settings::RuleConfig;

/// Why a rule kind produced no error for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Rule disabled or allowlist empty.
    RuleNotConfigured,
    /// None of the candidate fields were posted on this step.
    StepMismatch,
    /// Candidate fields were posted but all empty.
    ValueMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    ValueInvalid,
    ValueNotAllowed,
}

/// Terminal state of one rule kind for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RuleOutcome {
    Skipped { reason: SkipReason },
    /// No schema field matched the kind's keywords.
    FormLevelError,
    FieldLevelError { field: FieldId, reason: Rejection },
    Accepted { field: FieldId },
}

impl RuleOutcome {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            RuleOutcome::FormLevelError | RuleOutcome::FieldLevelError { .. }
        )
    }
}

/// Walks one rule kind through discovery, step presence, value selection,
/// normalization and the allowlist.
pub fn evaluate_rule(
    kind: RuleKind,
    config: &RuleConfig,
    fields: &[FieldDescriptor],
    submission: &SubmissionPayload,
) -> RuleOutcome {
    if !config.rule(kind).is_configured() {
        return RuleOutcome::Skipped {
            reason: SkipReason::RuleNotConfigured,
        };
    }

    let candidates = discover(kind, fields);
    if candidates.is_empty() {
        return RuleOutcome::FormLevelError;
    }

    if !candidates.iter().any(|id| submission.is_present(*id)) {
        return RuleOutcome::Skipped {
            reason: SkipReason::StepMismatch,
        };
    }

    let selected = candidates.iter().find_map(|id| {
        submission
            .value_of(*id)
            .filter(|value| !value.is_empty())
            .map(|value| (*id, value))
    });
    let Some((field, value)) = selected else {
        return RuleOutcome::Skipped {
            reason: SkipReason::ValueMissing,
        };
    };

    let normalized = normalize(kind, value);
    if normalized.is_empty() {
        return RuleOutcome::FieldLevelError {
            field,
            reason: Rejection::ValueInvalid,
        };
    }
    if !is_allowed(kind, &normalized, config) {
        return RuleOutcome::FieldLevelError {
            field,
            reason: Rejection::ValueNotAllowed,
        };
    }

    RuleOutcome::Accepted { field }
}

/// Soft validation: annotates a submission with field- and form-level messages.
pub struct LocationValidator<F> {
    schema: Arc<F>,
}

impl<F> LocationValidator<F>
where
    F: FormSchemaProvider,
{
    pub fn new(schema: Arc<F>) -> Self {
        Self { schema }
    }

    /// Returns `existing` extended with any ZIP and state rejections for this submission.
    pub fn validate(
        &self,
        config: &RuleConfig,
        submission: &SubmissionPayload,
        existing: ValidationErrors,
    ) -> Result<ValidationErrors, ProviderError> {
        let Some(form_id) = submission.target_form() else {
            return Ok(existing);
        };
        if !self.is_target(config, form_id)? {
            debug!(form_id = form_id.0, "form not targeted by location rules");
            return Ok(existing);
        }
        if !RuleKind::ALL
            .iter()
            .any(|kind| config.rule(*kind).is_configured())
        {
            return Ok(existing);
        }

        let fields = self.schema.list_fields(form_id)?;
        let mut errors = existing;

        for kind in RuleKind::ALL {
            let outcome = evaluate_rule(kind, config, &fields, submission);
            debug!(form_id = form_id.0, rule = kind.label(), ?outcome, "location rule evaluated");

            let message = &config.rule(kind).error_message;
            match outcome {
                RuleOutcome::FormLevelError => errors.append_form(message),
                RuleOutcome::FieldLevelError { field, .. } => errors.insert_field(field, message),
                RuleOutcome::Skipped { .. } | RuleOutcome::Accepted { .. } => {}
            }
        }

        Ok(errors)
    }

    /// Per-kind outcomes for diagnostics; `None` when the form is not targeted.
    pub fn explain(
        &self,
        config: &RuleConfig,
        submission: &SubmissionPayload,
    ) -> Result<Option<Vec<(RuleKind, RuleOutcome)>>, ProviderError> {
        let Some(form_id) = submission.target_form() else {
            return Ok(None);
        };
        if !self.is_target(config, form_id)? {
            return Ok(None);
        }

        let fields = self.schema.list_fields(form_id)?;
        Ok(Some(
            RuleKind::ALL
                .into_iter()
                .map(|kind| (kind, evaluate_rule(kind, config, &fields, submission)))
                .collect(),
        ))
    }

    fn is_target(&self, config: &RuleConfig, form_id: FormId) -> Result<bool, ProviderError> {
        if config.apply_all_forms {
            let forms = self.schema.list_forms()?;
            Ok(forms.iter().any(|form| form.id == form_id))
        } else {
            Ok(config.selected_form_ids.contains(&form_id))
        }
    }
}
