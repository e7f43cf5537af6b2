use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;

use super::domain::{EntryId, SubmissionContext, SubmissionPayload};
use super::providers::{EntryRepository, FormSchemaProvider, ProviderError, SettingsProvider};
use super::service::{GateServiceError, LocationGateService, SubmitOutcome};
use super::settings::RuleSettings;

pub const REQUEST_CONTEXT_HEADER: &str = "x-request-context";
pub const REQUESTED_WITH_HEADER: &str = "x-requested-with";

type SharedService<S, F, E> = Arc<LocationGateService<S, F, E>>;

/// Router builder exposing soft validation, guarded entry persistence and settings.
pub fn location_gate_router<S, F, E>(service: SharedService<S, F, E>) -> Router
where
    S: SettingsProvider + 'static,
    F: FormSchemaProvider + 'static,
    E: EntryRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/submissions/validate",
            post(validate_handler::<S, F, E>),
        )
        .route("/api/v1/entries", post(create_handler::<S, F, E>))
        .route("/api/v1/entries/:entry_id", put(update_handler::<S, F, E>))
        .route("/api/v1/forms", get(forms_handler::<S, F, E>))
        .route(
            "/api/v1/settings",
            get(settings_handler::<S, F, E>).put(save_settings_handler::<S, F, E>),
        )
        .with_state(service)
}

/// Reads the admin and ajax markers a host forwards with each request.
pub fn submission_context(headers: &HeaderMap) -> SubmissionContext {
    let admin = headers
        .get(REQUEST_CONTEXT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("admin"))
        .unwrap_or(false);
    let ajax = headers
        .get(REQUESTED_WITH_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case("xmlhttprequest"))
        .unwrap_or(false);

    SubmissionContext { admin, ajax }
}

pub(crate) async fn validate_handler<S, F, E>(
    State(service): State<SharedService<S, F, E>>,
    Json(submission): Json<SubmissionPayload>,
) -> Response
where
    S: SettingsProvider + 'static,
    F: FormSchemaProvider + 'static,
    E: EntryRepository + 'static,
{
    match service.validate(&submission) {
        Ok(errors) => {
            let payload = json!({
                "valid": errors.is_empty(),
                "errors": errors,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_handler<S, F, E>(
    State(service): State<SharedService<S, F, E>>,
    headers: HeaderMap,
    Json(submission): Json<SubmissionPayload>,
) -> Response
where
    S: SettingsProvider + 'static,
    F: FormSchemaProvider + 'static,
    E: EntryRepository + 'static,
{
    match service.submit_entry(submission, submission_context(&headers)) {
        Ok(outcome) => outcome_response(outcome, StatusCode::CREATED),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<S, F, E>(
    State(service): State<SharedService<S, F, E>>,
    Path(entry_id): Path<String>,
    headers: HeaderMap,
    Json(submission): Json<SubmissionPayload>,
) -> Response
where
    S: SettingsProvider + 'static,
    F: FormSchemaProvider + 'static,
    E: EntryRepository + 'static,
{
    let entry_id = EntryId(entry_id);
    match service.resubmit_entry(&entry_id, submission, submission_context(&headers)) {
        Ok(outcome) => outcome_response(outcome, StatusCode::OK),
        Err(error) => error_response(error),
    }
}

fn outcome_response(outcome: SubmitOutcome, stored: StatusCode) -> Response {
    match outcome {
        SubmitOutcome::Invalid(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": errors })),
        )
            .into_response(),
        SubmitOutcome::Stored(record) => (stored, Json(record)).into_response(),
    }
}

pub(crate) async fn forms_handler<S, F, E>(
    State(service): State<SharedService<S, F, E>>,
) -> Response
where
    S: SettingsProvider + 'static,
    F: FormSchemaProvider + 'static,
    E: EntryRepository + 'static,
{
    match service.forms() {
        Ok(forms) => (StatusCode::OK, Json(forms)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn settings_handler<S, F, E>(
    State(service): State<SharedService<S, F, E>>,
) -> Response
where
    S: SettingsProvider + 'static,
    F: FormSchemaProvider + 'static,
    E: EntryRepository + 'static,
{
    match service.settings() {
        Ok(config) => (StatusCode::OK, Json(config)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn save_settings_handler<S, F, E>(
    State(service): State<SharedService<S, F, E>>,
    Json(settings): Json<RuleSettings>,
) -> Response
where
    S: SettingsProvider + 'static,
    F: FormSchemaProvider + 'static,
    E: EntryRepository + 'static,
{
    match service.save_settings(settings) {
        Ok(config) => (StatusCode::OK, Json(config)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: GateServiceError) -> Response {
    let status = match &error {
        GateServiceError::Enforcement(enforcement) => enforcement.status_code(),
        GateServiceError::MissingFormId => StatusCode::BAD_REQUEST,
        GateServiceError::Provider(ProviderError::NotFound) => StatusCode::NOT_FOUND,
        GateServiceError::Provider(ProviderError::Conflict) => StatusCode::CONFLICT,
        GateServiceError::Provider(ProviderError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    (status, Json(json!({ "error": error.to_string() }))).into_response()
}
