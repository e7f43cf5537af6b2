use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::domain::{FormId, RuleKind};
use super::normalizer::normalize;

pub const DEFAULT_ZIP_ERROR: &str = "Sorry, we don't service this ZIP.";
pub const DEFAULT_STATE_ERROR: &str = "Sorry, we only serve selected states.";

/// Settings documents older than this predate field auto-detection.
pub const SETTINGS_VERSION: SettingsVersion = SettingsVersion::new(2, 0, 0);

/// Dotted `major.minor.patch` stamp carried in `_version`. Older documents wrote it
/// as a string such as `"1.10.22"`; a bare integer is read as the major part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SettingsVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SettingsVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Lenient parse: missing parts are zero, and each part keeps only its leading
    /// digits, so `"1.2.0-beta"` reads as 1.2.0 and garbage reads as 0.0.0.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.trim().trim_start_matches(['v', 'V']).split('.').map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().unwrap_or(0)
        });
        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        }
    }
}

impl fmt::Display for SettingsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for SettingsVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SettingsVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(major) => {
                SettingsVersion::new(u32::try_from(major).unwrap_or(u32::MAX), 0, 0)
            }
            Raw::Text(text) => SettingsVersion::parse(&text),
        })
    }
}

/// Switches were saved as `0`/`1` (sometimes as strings) before they were booleans.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Number(i64),
        Text(String),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(value) => value,
        Raw::Number(value) => value != 0,
        Raw::Text(text) => !matches!(text.trim(), "" | "0" | "false"),
        Raw::Null(()) => false,
    })
}

/// Form ids as integers or numeric strings; anything else reads as `0` and is dropped
/// when the settings are sanitized.
fn form_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<FormId>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    let raw = Option::<Vec<Raw>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .map(|id| match id {
            Raw::Number(value) => FormId(value),
            Raw::Text(text) => FormId(text.trim().parse().unwrap_or(0)),
        })
        .collect())
}

/// One rule kind's switch, canonical allowlist and rejection message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRule {
    pub enabled: bool,
    pub allowed: IndexSet<String>,
    pub error_message: String,
}

impl LocationRule {
    fn disabled(error_message: &str) -> Self {
        Self {
            enabled: false,
            allowed: IndexSet::new(),
            error_message: error_message.to_string(),
        }
    }

    /// Enabled with at least one allowlist entry.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.allowed.is_empty()
    }
}

/// Canonical rule configuration the engine reads. Allowlist entries are normalized
/// once, when settings are saved, and are not re-checked when submissions are matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub apply_all_forms: bool,
    pub selected_form_ids: BTreeSet<FormId>,
    pub zip: LocationRule,
    pub state: LocationRule,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            apply_all_forms: false,
            selected_form_ids: BTreeSet::new(),
            zip: LocationRule::disabled(DEFAULT_ZIP_ERROR),
            state: LocationRule::disabled(DEFAULT_STATE_ERROR),
        }
    }
}

impl RuleConfig {
    pub fn rule(&self, kind: RuleKind) -> &LocationRule {
        match kind {
            RuleKind::Zip => &self.zip,
            RuleKind::State => &self.state,
        }
    }

    /// Sanitize an operator settings document into canonical form.
    pub fn from_settings(settings: &RuleSettings) -> Self {
        let selected_form_ids = settings
            .selected_form_ids
            .iter()
            .copied()
            .filter(|id| id.0 != 0)
            .collect();

        Self {
            apply_all_forms: settings.apply_all_forms,
            selected_form_ids,
            zip: LocationRule {
                enabled: settings.enable_zip_validation,
                allowed: normalize_list(RuleKind::Zip, settings.allowed_zips.items()),
                error_message: message_or_default(&settings.zip_error_msg, DEFAULT_ZIP_ERROR),
            },
            state: LocationRule {
                enabled: settings.enable_state_validation,
                allowed: normalize_list(RuleKind::State, settings.allowed_states.items()),
                error_message: message_or_default(
                    &settings.state_error_msg,
                    DEFAULT_STATE_ERROR,
                ),
            },
        }
    }

    pub fn to_settings(&self) -> RuleSettings {
        RuleSettings {
            version: SETTINGS_VERSION,
            apply_all_forms: self.apply_all_forms,
            selected_form_ids: self.selected_form_ids.iter().copied().collect(),
            enable_zip_validation: self.zip.enabled,
            allowed_zips: AllowlistInput::Text(
                self.zip.allowed.iter().cloned().collect::<Vec<_>>().join("\n"),
            ),
            zip_error_msg: Some(self.zip.error_message.clone()),
            enable_state_validation: self.state.enabled,
            allowed_states: AllowlistInput::Text(
                self.state.allowed.iter().cloned().collect::<Vec<_>>().join(", "),
            ),
            state_error_msg: Some(self.state.error_message.clone()),
            zip_field_map: None,
            state_field_map: None,
        }
    }
}

/// Normalized, de-duplicated, in the operator's order.
fn normalize_list(kind: RuleKind, items: Vec<String>) -> IndexSet<String> {
    items
        .iter()
        .map(|item| normalize(kind, item))
        .filter(|value| !value.is_empty())
        .collect()
}

fn message_or_default(message: &Option<String>, default: &str) -> String {
    match message.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => default.to_string(),
    }
}

/// Allowlist as typed by an operator: a free-text blob or a JSON list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowlistInput {
    Text(String),
    Items(Vec<String>),
}

impl Default for AllowlistInput {
    fn default() -> Self {
        AllowlistInput::Text(String::new())
    }
}

impl AllowlistInput {
    /// Raw entries split on line breaks and commas.
    pub fn items(&self) -> Vec<String> {
        let split = |text: &str| -> Vec<String> {
            text.lines()
                .flat_map(|line| line.split(','))
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        };

        match self {
            AllowlistInput::Text(text) => split(text),
            AllowlistInput::Items(items) => items.iter().flat_map(|item| split(item)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn extend(&mut self, extra: impl IntoIterator<Item = String>) {
        let mut items = self.items();
        items.extend(extra);
        *self = AllowlistInput::Items(items);
    }
}

/// Operator-facing settings document, as saved by an admin surface or a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    #[serde(rename = "_version")]
    pub version: SettingsVersion,
    #[serde(deserialize_with = "flag")]
    pub apply_all_forms: bool,
    #[serde(deserialize_with = "form_ids")]
    pub selected_form_ids: Vec<FormId>,
    #[serde(deserialize_with = "flag")]
    pub enable_zip_validation: bool,
    pub allowed_zips: AllowlistInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_error_msg: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub enable_state_validation: bool,
    pub allowed_states: AllowlistInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_error_msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_field_map: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_field_map: Option<serde_json::Value>,
}

impl RuleSettings {
    /// Upgrade documents written when fields were mapped by hand: a rule that had both a
    /// field map and an allowlist is switched on, and the maps are dropped.
    pub fn migrate(mut self) -> Self {
        if self.version >= SETTINGS_VERSION {
            return self;
        }

        if !self.enable_zip_validation
            && has_entries(&self.zip_field_map)
            && !self.allowed_zips.is_empty()
        {
            self.enable_zip_validation = true;
        }
        if !self.enable_state_validation
            && has_entries(&self.state_field_map)
            && !self.allowed_states.is_empty()
        {
            self.enable_state_validation = true;
        }

        self.zip_field_map = None;
        self.state_field_map = None;
        self.version = SETTINGS_VERSION;
        self
    }
}

fn has_entries(map: &Option<serde_json::Value>) -> bool {
    match map {
        Some(serde_json::Value::Object(entries)) => !entries.is_empty(),
        Some(serde_json::Value::Array(entries)) => !entries.is_empty(),
        _ => false,
    }
}
