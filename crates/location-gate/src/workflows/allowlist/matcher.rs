use super::domain::RuleKind;
use super::settings::RuleConfig;

/// Exact membership of an already-normalized value in the kind's allowlist.
pub fn is_allowed(kind: RuleKind, normalized: &str, config: &RuleConfig) -> bool {
    if normalized.is_empty() {
        return false;
    }
    config.rule(kind).allowed.contains(normalized)
}
