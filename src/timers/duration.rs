use regex::Regex;
use serde::Serialize;

/// Fallback used when a named entity is projected onto the map.
pub const MARKER_FALLBACK_MINUTES: u32 = 30;
/// Fallback used when estimating the respawn progress shadow.
pub const PROGRESS_FALLBACK_MINUTES: u32 = 15;

const UNKNOWN_DURATION_TEXT: &str = "Unknown";

lazy_static::lazy_static! {
    static ref RANGE_PATTERN: Regex =
        Regex::new(r"(\d+)\s*-\s*(\d+)").expect("valid range pattern");
    static ref NUMBER_PATTERN: Regex = Regex::new(r"(\d+)").expect("valid number pattern");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDuration {
    pub min_minutes: u32,
    pub display_text: String,
}

impl ParsedDuration {
    pub fn min_seconds(&self) -> i64 {
        i64::from(self.min_minutes) * 60
    }

    fn fallback(fallback_minutes: u32) -> Self {
        Self {
            min_minutes: fallback_minutes,
            display_text: UNKNOWN_DURATION_TEXT.to_string(),
        }
    }
}

/// Parses free-form respawn text such as `"30-45 minutes"`, `"900 seconds"`
/// or `"20 minutes"` into the minimum duration in whole minutes.
///
/// Ranges resolve to their lower bound. Text mentioning seconds is converted
/// with ceiling rounding. Anything without a usable number resolves to
/// `fallback_minutes` with an `"Unknown"` label.
pub fn parse_respawn_duration(text: Option<&str>, fallback_minutes: u32) -> ParsedDuration {
    let Some(raw_text) = text.map(str::trim).filter(|value| !value.is_empty()) else {
        return ParsedDuration::fallback(fallback_minutes);
    };

    let counts_seconds = raw_text.to_ascii_lowercase().contains("second");

    let range_lower_bound = RANGE_PATTERN
        .captures(raw_text)
        .and_then(|captures| captures.get(1))
        .and_then(|value| parse_number(value.as_str()));
    if let Some(lower_bound) = range_lower_bound {
        return ParsedDuration {
            min_minutes: to_minutes(lower_bound, counts_seconds),
            display_text: raw_text.to_string(),
        };
    }

    let Some(number) = NUMBER_PATTERN
        .captures(raw_text)
        .and_then(|captures| captures.get(1))
        .and_then(|value| parse_number(value.as_str()))
    else {
        tracing::debug!(respawn_text = raw_text, "No duration found in respawn text");
        return ParsedDuration::fallback(fallback_minutes);
    };

    if counts_seconds {
        let min_minutes = to_minutes(number, true);
        return ParsedDuration {
            min_minutes,
            display_text: format!("{min_minutes} minutes (from {number} seconds)"),
        };
    }

    ParsedDuration {
        min_minutes: to_minutes(number, false),
        display_text: format!("{number} minutes"),
    }
}

fn parse_number(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok()
}

fn to_minutes(value: u64, counts_seconds: bool) -> u32 {
    let minutes = if counts_seconds {
        value.div_ceil(60)
    } else {
        value
    };

    u32::try_from(minutes).unwrap_or(u32::MAX)
}
