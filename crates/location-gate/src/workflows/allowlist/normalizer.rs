//! Canonicalization of submitted ZIP and state values.
//!
//! Every value passes through the same hardening steps before it is compared with an
//! allowlist: invisible code points are removed, a fixed table of fullwidth digits and
//! dash look-alikes is folded to ASCII, whitespace is collapsed and the result is
//! uppercased. Anything that does not then look like a canonical ZIP or a known state
//! normalizes to the empty string.

use super::domain::RuleKind;

const INVISIBLE: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

const FULLWIDTH_DIGITS: [(char, char); 10] = [
    ('\u{FF10}', '0'),
    ('\u{FF11}', '1'),
    ('\u{FF12}', '2'),
    ('\u{FF13}', '3'),
    ('\u{FF14}', '4'),
    ('\u{FF15}', '5'),
    ('\u{FF16}', '6'),
    ('\u{FF17}', '7'),
    ('\u{FF18}', '8'),
    ('\u{FF19}', '9'),
];

const DASH_VARIANTS: [char; 8] = [
    '\u{FF0D}', // fullwidth hyphen-minus
    '\u{2014}', // em dash
    '\u{2013}', // en dash
    '\u{2010}', // hyphen
    '\u{2011}', // non-breaking hyphen
    '\u{2012}', // figure dash
    '\u{FE63}', // small hyphen-minus
    '\u{2212}', // minus sign
];

/// Two-letter codes accepted as-is: the 50 states, DC and the inhabited territories.
pub const VALID_STATE_CODES: [&str; 56] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY", "PR", "GU", "AS", "MP", "VI",
];

const STATE_NAMES: [(&str, &str); 57] = [
    ("ALABAMA", "AL"),
    ("ALASKA", "AK"),
    ("ARIZONA", "AZ"),
    ("ARKANSAS", "AR"),
    ("CALIFORNIA", "CA"),
    ("COLORADO", "CO"),
    ("CONNECTICUT", "CT"),
    ("DELAWARE", "DE"),
    ("DISTRICT OF COLUMBIA", "DC"),
    ("WASHINGTON DC", "DC"),
    ("FLORIDA", "FL"),
    ("GEORGIA", "GA"),
    ("HAWAII", "HI"),
    ("IDAHO", "ID"),
    ("ILLINOIS", "IL"),
    ("INDIANA", "IN"),
    ("IOWA", "IA"),
    ("KANSAS", "KS"),
    ("KENTUCKY", "KY"),
    ("LOUISIANA", "LA"),
    ("MAINE", "ME"),
    ("MARYLAND", "MD"),
    ("MASSACHUSETTS", "MA"),
    ("MICHIGAN", "MI"),
    ("MINNESOTA", "MN"),
    ("MISSISSIPPI", "MS"),
    ("MISSOURI", "MO"),
    ("MONTANA", "MT"),
    ("NEBRASKA", "NE"),
    ("NEVADA", "NV"),
    ("NEW HAMPSHIRE", "NH"),
    ("NEW JERSEY", "NJ"),
    ("NEW MEXICO", "NM"),
    ("NEW YORK", "NY"),
    ("NORTH CAROLINA", "NC"),
    ("NORTH DAKOTA", "ND"),
    ("OHIO", "OH"),
    ("OKLAHOMA", "OK"),
    ("OREGON", "OR"),
    ("PENNSYLVANIA", "PA"),
    ("RHODE ISLAND", "RI"),
    ("SOUTH CAROLINA", "SC"),
    ("SOUTH DAKOTA", "SD"),
    ("TENNESSEE", "TN"),
    ("TEXAS", "TX"),
    ("UTAH", "UT"),
    ("VERMONT", "VT"),
    ("VIRGINIA", "VA"),
    ("WASHINGTON", "WA"),
    ("WEST VIRGINIA", "WV"),
    ("WISCONSIN", "WI"),
    ("WYOMING", "WY"),
    ("PUERTO RICO", "PR"),
    ("GUAM", "GU"),
    ("AMERICAN SAMOA", "AS"),
    ("NORTHERN MARIANA ISLANDS", "MP"),
    ("U.S. VIRGIN ISLANDS", "VI"),
];

/// Canonical form of `raw` for the given kind, or an empty string when it is not a
/// recognizable ZIP or state.
pub fn normalize(kind: RuleKind, raw: &str) -> String {
    let cleaned = harden(raw);
    match kind {
        RuleKind::Zip => {
            if is_canonical_zip(&cleaned) {
                cleaned
            } else {
                String::new()
            }
        }
        RuleKind::State => state_code(&cleaned)
            .map(str::to_string)
            .unwrap_or_default(),
    }
}

/// Steps shared by both kinds: strip invisibles, fold the lookalike table, collapse
/// whitespace and uppercase.
pub(crate) fn harden(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .filter(|ch| !INVISIBLE.contains(ch))
        .map(fold_lookalike)
        .collect();

    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

fn fold_lookalike(ch: char) -> char {
    if let Some((_, ascii)) = FULLWIDTH_DIGITS.iter().find(|(wide, _)| *wide == ch) {
        return *ascii;
    }
    if DASH_VARIANTS.contains(&ch) {
        return '-';
    }
    ch
}

/// `^\d{5}(-\d{4})?$` over ASCII digits.
pub fn is_canonical_zip(value: &str) -> bool {
    let bytes = value.as_bytes();
    let digits = |slice: &[u8]| slice.iter().all(u8::is_ascii_digit);
    match bytes.len() {
        5 => digits(bytes),
        10 => digits(&bytes[..5]) && bytes[5] == b'-' && digits(&bytes[6..]),
        _ => false,
    }
}

pub fn is_valid_state_code(value: &str) -> bool {
    value.len() == 2
        && value.bytes().all(|b| b.is_ascii_uppercase())
        && VALID_STATE_CODES.contains(&value)
}

fn state_code(cleaned: &str) -> Option<&'static str> {
    if is_valid_state_code(cleaned) {
        return VALID_STATE_CODES
            .iter()
            .copied()
            .find(|code| *code == cleaned);
    }

    STATE_NAMES
        .iter()
        .find(|(name, _)| *name == cleaned)
        .map(|(_, code)| *code)
}
