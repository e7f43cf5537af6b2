use crate::infra::{load_schema, load_settings, load_submission};
use clap::{Args, ValueEnum};
use location_gate::error::AppError;
use location_gate::workflows::allowlist::{
    normalize, Enforcement, EnforcementError, EnforcementGate, FormSchemaProvider,
    GateServiceError, ImportSummary, LifecyclePoint, LocationValidator, RuleConfig, RuleKind,
    RuleOutcome, SubmissionContext, SubmissionPayload, ValidationErrors, ZipListImporter,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Settings document (JSON) holding the allowlists
    #[arg(long)]
    pub(crate) settings: PathBuf,
    /// Form schema document (JSON)
    #[arg(long)]
    pub(crate) schema: PathBuf,
    /// Submission payload (JSON) to check
    #[arg(long)]
    pub(crate) submission: PathBuf,
    /// Treat the request as server-side administrative access
    #[arg(long)]
    pub(crate) admin: bool,
    /// Treat the request as an asynchronous submission
    #[arg(long)]
    pub(crate) ajax: bool,
    /// Run the gate at the entry-update point instead of entry creation
    #[arg(long)]
    pub(crate) update: bool,
}

#[derive(Args, Debug)]
pub(crate) struct NormalizeArgs {
    /// Which rule's normalization to apply
    #[arg(long, value_enum)]
    pub(crate) kind: KindArg,
    /// Raw value as a user would type it
    pub(crate) value: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum KindArg {
    Zip,
    State,
}

impl From<KindArg> for RuleKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Zip => RuleKind::Zip,
            KindArg::State => RuleKind::State,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ImportZipsArgs {
    /// Settings document (JSON) to rewrite in place
    #[arg(long)]
    pub(crate) settings: PathBuf,
    /// CSV export whose first column holds ZIP codes
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

/// Everything a `check` run learned about one submission.
#[derive(Debug)]
pub(crate) struct CheckReport {
    pub(crate) outcomes: Option<Vec<(RuleKind, RuleOutcome)>>,
    pub(crate) errors: ValidationErrors,
    pub(crate) decision: Result<Enforcement, String>,
}

pub(crate) fn run_check(args: CheckArgs) -> Result<(), AppError> {
    let CheckArgs {
        settings,
        schema,
        submission,
        admin,
        ajax,
        update,
    } = args;

    let config = RuleConfig::from_settings(&load_settings(&settings)?.migrate());
    let schema = Arc::new(load_schema(&schema)?);
    let submission = load_submission(&submission)?;
    let point = if update {
        LifecyclePoint::Update
    } else {
        LifecyclePoint::Create
    };

    let report = evaluate(
        &config,
        schema,
        &submission,
        SubmissionContext { admin, ajax },
        point,
    )?;
    print!("{}", render_report(&report, point));
    Ok(())
}

pub(crate) fn evaluate<F>(
    config: &RuleConfig,
    schema: Arc<F>,
    submission: &SubmissionPayload,
    context: SubmissionContext,
    point: LifecyclePoint,
) -> Result<CheckReport, AppError>
where
    F: FormSchemaProvider,
{
    let validator = LocationValidator::new(schema.clone());
    let outcomes = validator
        .explain(config, submission)
        .map_err(GateServiceError::from)?;
    let errors = validator
        .validate(config, submission, ValidationErrors::new())
        .map_err(GateServiceError::from)?;

    let gate = EnforcementGate::new(schema);
    let decision = match gate.enforce(config, submission, &context, point) {
        Ok(enforcement) => Ok(enforcement),
        Err(EnforcementError::Forbidden { message }) => Err(message),
        Err(other) => return Err(GateServiceError::from(other).into()),
    };

    Ok(CheckReport {
        outcomes,
        errors,
        decision,
    })
}

pub(crate) fn render_report(report: &CheckReport, point: LifecyclePoint) -> String {
    let mut out = String::from("Location rule check\n");

    match &report.outcomes {
        None => out.push_str("- form is not targeted by location rules\n"),
        Some(outcomes) => {
            for (kind, outcome) in outcomes {
                out.push_str(&format!("- {}: {}\n", kind.label(), describe(outcome)));
            }
        }
    }

    if report.errors.is_empty() {
        out.push_str("Soft validation: no errors\n");
    } else {
        out.push_str("Soft validation errors:\n");
        for (key, message) in report.errors.iter() {
            out.push_str(&format!("  {key}: {message}\n"));
        }
    }

    let decision = match &report.decision {
        Ok(Enforcement::Allowed) => "allowed".to_string(),
        Ok(Enforcement::Skipped) => "skipped (administrative render)".to_string(),
        Err(message) => format!("blocked (403): {message}"),
    };
    out.push_str(&format!("Gate on {}: {decision}\n", point.label()));
    out
}

fn describe(outcome: &RuleOutcome) -> String {
    match outcome {
        RuleOutcome::Skipped { reason } => format!("skipped ({reason:?})"),
        RuleOutcome::FormLevelError => "no matching field on the form".to_string(),
        RuleOutcome::FieldLevelError { field, reason } => {
            format!("field {field} rejected ({reason:?})")
        }
        RuleOutcome::Accepted { field } => format!("field {field} accepted"),
    }
}

pub(crate) fn run_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let kind = RuleKind::from(args.kind);
    let normalized = normalize(kind, &args.value);
    if normalized.is_empty() {
        println!("(rejected: not a recognizable {} value)", kind.label());
    } else {
        println!("{normalized}");
    }
    Ok(())
}

pub(crate) fn run_import_zips(args: ImportZipsArgs) -> Result<(), AppError> {
    let mut settings = load_settings(&args.settings)?;
    let summary = ZipListImporter::from_path(&args.csv, &mut settings)?;

    let canonical = RuleConfig::from_settings(&settings.migrate()).to_settings();
    std::fs::write(&args.settings, serde_json::to_string_pretty(&canonical)?)?;

    print!("{}", render_import(&summary));
    Ok(())
}

fn render_import(summary: &ImportSummary) -> String {
    let mut out = format!("Imported {} ZIP entries\n", summary.accepted);
    if !summary.rejected.is_empty() {
        out.push_str(&format!(
            "Skipped {} rows: {}\n",
            summary.rejected.len(),
            summary.rejected.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{InMemorySchemaProvider, SchemaDocument};
    use location_gate::workflows::allowlist::{
        AllowlistInput, FieldId, FormId, RuleSettings, BLOCK_MESSAGE, SETTINGS_VERSION,
    };

    fn schema() -> Arc<InMemorySchemaProvider> {
        let document: SchemaDocument = serde_json::from_str(
            r#"{ "forms": [ { "id": 3, "name": "Contact", "fields": [
                { "id": 12, "name": "Zip Code" }
            ] } ] }"#,
        )
        .expect("schema parses");
        Arc::new(InMemorySchemaProvider::from_document(document))
    }

    fn config() -> RuleConfig {
        RuleConfig::from_settings(&RuleSettings {
            version: SETTINGS_VERSION,
            apply_all_forms: true,
            enable_zip_validation: true,
            allowed_zips: AllowlistInput::Text("02134".to_string()),
            ..RuleSettings::default()
        })
    }

    #[test]
    fn blocked_submission_reports_field_error_and_gate_block() {
        let submission = SubmissionPayload::new(FormId(3)).with_value(FieldId(12), "90210");
        let report = evaluate(
            &config(),
            schema(),
            &submission,
            SubmissionContext::public(),
            LifecyclePoint::Create,
        )
        .expect("check runs");

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.decision, Err(BLOCK_MESSAGE.to_string()));

        let rendered = render_report(&report, LifecyclePoint::Create);
        assert!(rendered.contains("field12: Sorry, we don't service this ZIP."));
        assert!(rendered.contains("Gate on create: blocked (403)"));
    }

    #[test]
    fn admin_render_is_reported_as_skipped() {
        let submission = SubmissionPayload::new(FormId(3)).with_value(FieldId(12), "90210");
        let report = evaluate(
            &config(),
            schema(),
            &submission,
            SubmissionContext {
                admin: true,
                ajax: false,
            },
            LifecyclePoint::Update,
        )
        .expect("check runs");

        assert_eq!(report.decision, Ok(Enforcement::Skipped));
        assert!(render_report(&report, LifecyclePoint::Update)
            .contains("Gate on update: skipped"));
    }

    #[test]
    fn untargeted_form_is_called_out() {
        let submission = SubmissionPayload::new(FormId(42)).with_value(FieldId(1), "x");
        let report = evaluate(
            &config(),
            schema(),
            &submission,
            SubmissionContext::public(),
            LifecyclePoint::Create,
        )
        .expect("check runs");

        assert!(report.outcomes.is_none());
        assert_eq!(report.decision, Ok(Enforcement::Allowed));
    }

    #[test]
    fn import_summary_lists_skipped_rows() {
        let summary = ImportSummary {
            accepted: 2,
            rejected: vec!["nope".to_string()],
        };
        assert_eq!(
            render_import(&summary),
            "Imported 2 ZIP entries\nSkipped 1 rows: nope\n"
        );
    }
}
