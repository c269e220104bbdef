//! Legacy "no date" placeholders written by MySQL in place of NULL.

use model::core::value::Value;

pub const ZERO_DATE_SENTINELS: &[&str] = &[
    "0000-00-00",
    "0000-00-00 00:00:00",
    "0000-00-00T00:00:00",
    "0000-00-00T00:00:00Z",
    "00/00/0000",
];

/// Exact match against a known sentinel.
pub fn is_zero_date_sentinel(text: &str) -> bool {
    ZERO_DATE_SENTINELS.contains(&text.trim())
}

/// Looser match used when scrubbing a rejected row: also catches sentinels
/// with fractional seconds or offsets (`0000-00-00 00:00:00.000000`).
pub fn looks_like_zero_date(text: &str) -> bool {
    let text = text.trim();
    is_zero_date_sentinel(text) || text.starts_with("0000-00-00")
}

pub fn is_zero_date_value(value: &Value) -> bool {
    match value {
        Value::String(s) | Value::Raw(s) => looks_like_zero_date(s),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sentinels() {
        for sentinel in ZERO_DATE_SENTINELS {
            assert!(is_zero_date_sentinel(sentinel), "{sentinel}");
        }
        assert!(!is_zero_date_sentinel("0000-00-00 00:00:00.000"));
        assert!(!is_zero_date_sentinel("2020-00-00"));
    }

    #[test]
    fn test_loose_match() {
        assert!(looks_like_zero_date("0000-00-00 00:00:00.000000"));
        assert!(is_zero_date_value(&Value::Raw("0000-00-00".into())));
        assert!(!is_zero_date_value(&Value::Int(0)));
        assert!(!looks_like_zero_date("2021-01-01"));
    }
}
