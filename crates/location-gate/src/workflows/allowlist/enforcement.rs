use std::sync::Arc;

use axum::http::StatusCode;
use tracing::{debug, warn};

use super::domain::{LifecyclePoint, SubmissionContext, SubmissionPayload, ValidationErrors};
use super::providers::{FormSchemaProvider, ProviderError};
use super::settings::RuleConfig;
use super::validator::LocationValidator;

pub const BLOCK_MESSAGE: &str = "Submission blocked by ZIP/State rules.";

/// Result of a gate check that did not abort persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcement {
    Allowed,
    /// Administrative render with no submission underway.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnforcementError {
    #[error("{message}")]
    Forbidden { message: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl EnforcementError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EnforcementError::Forbidden { .. } => StatusCode::FORBIDDEN,
            EnforcementError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Hard enforcement run at persistence time. It owns its own validator so a caller
/// that skipped soft validation cannot skip this check.
pub struct EnforcementGate<F> {
    validator: LocationValidator<F>,
}

impl<F> EnforcementGate<F>
where
    F: FormSchemaProvider,
{
    pub fn new(schema: Arc<F>) -> Self {
        Self {
            validator: LocationValidator::new(schema),
        }
    }

    pub fn enforce(
        &self,
        config: &RuleConfig,
        submission: &SubmissionPayload,
        context: &SubmissionContext,
        point: LifecyclePoint,
    ) -> Result<Enforcement, EnforcementError> {
        if context.is_admin_render() {
            debug!(lifecycle = point.label(), "admin render, enforcement skipped");
            return Ok(Enforcement::Skipped);
        }

        let errors = self
            .validator
            .validate(config, submission, ValidationErrors::new())?;

        if errors.is_empty() {
            return Ok(Enforcement::Allowed);
        }

        warn!(
            lifecycle = point.label(),
            form_id = ?submission.target_form(),
            error_keys = ?errors.iter().map(|(key, _)| key).collect::<Vec<_>>(),
            "persistence blocked by location rules"
        );
        Err(EnforcementError::Forbidden {
            message: BLOCK_MESSAGE.to_string(),
        })
    }
}
