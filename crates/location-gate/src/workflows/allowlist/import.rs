use std::io::Read;
use std::path::Path;

use super::domain::RuleKind;
use super::normalizer::normalize;
use super::settings::RuleSettings;

#[derive(Debug, thiserror::Error)]
pub enum SettingsImportError {
    #[error("failed to read allowlist export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid allowlist CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Summary of a merge so operators can see what was discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub accepted: usize,
    pub rejected: Vec<String>,
}

/// Reads ZIP allowlist exports (first column of each row) into a settings document so
/// the entries go through the same save-time normalization as typed ones.
pub struct ZipListImporter;

impl ZipListImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        settings: &mut RuleSettings,
    ) -> Result<ImportSummary, SettingsImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, settings)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        settings: &mut RuleSettings,
    ) -> Result<ImportSummary, SettingsImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut summary = ImportSummary::default();
        let mut entries = Vec::new();

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let Some(raw) = record.get(0) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }

            if normalize(RuleKind::Zip, raw).is_empty() {
                // A non-ZIP first row is treated as a header.
                if index > 0 {
                    summary.rejected.push(raw.to_string());
                }
                continue;
            }

            summary.accepted += 1;
            entries.push(raw.to_string());
        }

        settings.allowed_zips.extend(entries);
        tracing::debug!(
            accepted = summary.accepted,
            rejected = summary.rejected.len(),
            "merged ZIP allowlist export"
        );
        Ok(summary)
    }
}
