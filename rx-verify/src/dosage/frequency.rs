//! Dosing Frequency Interpretation

use regex::Regex;
use std::sync::LazyLock;

/// "q6h", "q 8 hr", "every 12 hours", "q4-6h"
static INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:q|every\s+)(\d{1,2})(?:\s*-\s*(\d{1,2}))?\s*(?:h|hr|hrs|hours?)\b")
        .expect("valid regex")
});

/// "2 times", "3x"
static COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:x|times)\b").expect("valid regex")
});

/// Period words that make a schedule something other than per day
const NON_DAILY_PERIODS: &[&str] = &["week", "weeks", "weekly", "month", "months", "monthly", "other"];

/// Interpreted dosing frequency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frequency {
    /// Administrations per day
    pub times_per_day: f64,
}

impl Frequency {
    /// Interpret common prescription frequency notations.
    ///
    /// Recognises Latin abbreviations (`qd`, `bid`, `tid`, `qid`, `q6h`),
    /// interval ranges (`q4-6h`, read at the shorter interval) and English
    /// forms (`twice daily`, `3 times a day`, `every 8 hours`). Counted forms
    /// need a daily qualifier. Returns `None` for as-needed, weekly or
    /// otherwise unrecognised schedules.
    pub fn parse(text: &str) -> Option<Frequency> {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }

        if let Some(caps) = INTERVAL.captures(&lower) {
            let mut hours: f64 = caps[1].parse().ok()?;
            if let Some(upper) = caps.get(2) {
                hours = hours.min(upper.as_str().parse().ok()?);
            }
            if hours <= 0.0 || hours > 24.0 {
                return None;
            }
            return Some(Frequency {
                times_per_day: 24.0 / hours,
            });
        }

        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |w: &str| words.contains(&w);

        if has("prn") || lower.contains("as needed") {
            return None;
        }
        if NON_DAILY_PERIODS.iter().any(|w| has(*w)) {
            return None;
        }

        let times = if has("qd") || has("od") || has("qhs") {
            1.0
        } else if has("bid") {
            2.0
        } else if has("tid") {
            3.0
        } else if has("qid") {
            4.0
        } else if has("daily") || has("day") {
            if let Some(caps) = COUNT.captures(&lower) {
                caps[1].parse().ok().filter(|n: &f64| *n > 0.0)?
            } else if has("twice") {
                2.0
            } else if lower.contains("three times") {
                3.0
            } else if lower.contains("four times") {
                4.0
            } else {
                1.0
            }
        } else {
            return None;
        };

        Some(Frequency { times_per_day: times })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn per_day(text: &str) -> Option<f64> {
        Frequency::parse(text).map(|f| f.times_per_day)
    }

    #[test]
    fn test_latin_abbreviations() {
        assert_eq!(per_day("qd"), Some(1.0));
        assert_eq!(per_day("BID"), Some(2.0));
        assert_eq!(per_day("tid"), Some(3.0));
        assert_eq!(per_day("qid"), Some(4.0));
    }

    #[test]
    fn test_interval_forms() {
        assert_eq!(per_day("q6h"), Some(4.0));
        assert_eq!(per_day("q8h"), Some(3.0));
        assert_eq!(per_day("every 12 hours"), Some(2.0));
        assert_eq!(per_day("q0h"), None);
    }

    #[test]
    fn test_interval_range_uses_shorter_interval() {
        assert_eq!(per_day("q4-6h"), Some(6.0));
        assert_eq!(per_day("q6-8h"), Some(4.0));
        assert_eq!(per_day("every 8-12 hours"), Some(3.0));
    }

    #[test]
    fn test_english_forms() {
        assert_eq!(per_day("twice daily"), Some(2.0));
        assert_eq!(per_day("three times daily"), Some(3.0));
        assert_eq!(per_day("once daily with food"), Some(1.0));
        assert_eq!(per_day("daily"), Some(1.0));
        assert_eq!(per_day("four times a day"), Some(4.0));
        assert_eq!(per_day("2 times per day"), Some(2.0));
        assert_eq!(per_day("3x daily"), Some(3.0));
    }

    #[test]
    fn test_counts_need_a_daily_period() {
        assert_eq!(per_day("three times a week"), None);
        assert_eq!(per_day("twice weekly"), None);
        assert_eq!(per_day("once a month"), None);
        assert_eq!(per_day("every other day"), None);
        assert_eq!(per_day("three times"), None);
    }

    #[test]
    fn test_unrecognised_and_prn() {
        assert_eq!(per_day("prn"), None);
        assert_eq!(per_day("as needed for pain"), None);
        assert_eq!(per_day("whenever"), None);
        assert_eq!(per_day(""), None);
    }
}
