//! Date and period mentions: quarters, halves, months, fiscal years, years,
//! and relative phrases.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use dnav_core::{TimeCue, TimePrecision};

struct CuePattern {
    precision: TimePrecision,
    re: Regex,
    bucket: fn(&Captures) -> Option<String>,
}

static PATTERNS: Lazy<Vec<CuePattern>> = Lazy::new(|| {
    let re = |p: &str| Regex::new(p).expect("time cue regex");
    vec![
        CuePattern {
            precision: TimePrecision::Quarter,
            re: re(r"(?i)\bQ([1-4])(?:\s*(?:FY\s*)?'?((?:19|20)\d{2}|\d{2}))?\b"),
            bucket: |c| Some(with_year(c.get(2).map(|m| m.as_str()), &format!("Q{}", &c[1]))),
        },
        CuePattern {
            precision: TimePrecision::Quarter,
            re: re(r"(?i)\b(first|second|third|fourth|1st|2nd|3rd|4th)[- ]quarter(?:\s+of)?(?:\s+(?:fiscal\s+)?((?:19|20)\d{2}))?\b"),
            bucket: |c| {
                let q = ordinal(&c[1]);
                Some(with_year(c.get(2).map(|m| m.as_str()), &format!("Q{q}")))
            },
        },
        CuePattern {
            precision: TimePrecision::HalfYear,
            re: re(r"(?i)\bH([12])(?:\s*(?:FY\s*)?'?((?:19|20)\d{2}|\d{2}))?\b"),
            bucket: |c| Some(with_year(c.get(2).map(|m| m.as_str()), &format!("H{}", &c[1]))),
        },
        CuePattern {
            precision: TimePrecision::HalfYear,
            re: re(r"(?i)\b(first|second)\s+half(?:\s+of)?(?:\s+((?:19|20)\d{2}))?\b"),
            bucket: |c| {
                let h = ordinal(&c[1]);
                Some(with_year(c.get(2).map(|m| m.as_str()), &format!("H{h}")))
            },
        },
        CuePattern {
            precision: TimePrecision::MonthDay,
            re: re(r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?(?:\s+\d{1,2}(?:st|nd|rd|th)?,?)?\s+((?:19|20)\d{2})\b"),
            bucket: |c| Some(format!("{}-{:02}", &c[2], month_number(&c[1]))),
        },
        CuePattern {
            precision: TimePrecision::MonthDay,
            re: re(r"\b(\d{1,2})/\d{1,2}/((?:19|20)\d{2})\b"),
            bucket: |c| {
                let m: u32 = c[1].parse().unwrap_or(1);
                Some(format!("{}-{:02}", &c[2], m.clamp(1, 12)))
            },
        },
        CuePattern {
            precision: TimePrecision::FiscalYear,
            re: re(r"(?i)\b(?:FY\s*'?((?:19|20)\d{2}|\d{2})|fiscal(?:\s+year)?\s+((?:19|20)\d{2}))\b"),
            bucket: |c| {
                let y = c.get(1).or_else(|| c.get(2)).map(|m| m.as_str()).unwrap_or("");
                Some(format!("FY{}", full_year(y)))
            },
        },
        CuePattern {
            precision: TimePrecision::Year,
            re: re(r"\b((?:19|20)\d{2})\b"),
            bucket: |c| Some(c[1].to_string()),
        },
        CuePattern {
            precision: TimePrecision::Relative,
            re: re(r"(?i)\b(?:(?:next|this|coming|following)\s+(?:fiscal\s+year|quarter|year|month|few\s+(?:months|quarters|years))|later\s+this\s+(?:year|quarter)|by\s+year[- ]end|(?:the\s+)?end\s+of\s+(?:the|this)\s+(?:year|quarter)|in\s+the\s+coming\s+(?:months|quarters|years)|near[- ]term|over\s+the\s+next\s+\w+\s+(?:months|quarters|years))\b"),
            bucket: |_| None,
        },
    ]
});

fn with_year(year: Option<&str>, period: &str) -> String {
    match year {
        Some(y) => format!("{}-{period}", full_year(y)),
        None => period.to_string(),
    }
}

fn full_year(y: &str) -> String {
    if y.len() == 2 {
        format!("20{y}")
    } else {
        y.to_string()
    }
}

fn ordinal(word: &str) -> u8 {
    match word.to_lowercase().as_str() {
        "first" | "1st" => 1,
        "second" | "2nd" => 2,
        "third" | "3rd" => 3,
        _ => 4,
    }
}

fn month_number(name: &str) -> u32 {
    let lower = name.to_lowercase();
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
        .unwrap_or(1)
}

/// Finds time cues in a text unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCueExtractor;

impl TimeCueExtractor {
    /// All non-overlapping cues, in text order. Where two mentions overlap the
    /// more precise one wins (`Q2 2026` hides the bare `2026`).
    pub fn find_all(&self, text: &str) -> Vec<TimeCue> {
        let mut found: Vec<(usize, usize, TimeCue)> = Vec::new();
        for pattern in PATTERNS.iter() {
            for caps in pattern.re.captures_iter(text) {
                let m = match caps.get(0) {
                    Some(m) => m,
                    None => continue,
                };
                let overlaps = found
                    .iter()
                    .any(|(s, e, _)| m.start() < *e && *s < m.end());
                if overlaps {
                    continue;
                }
                found.push((
                    m.start(),
                    m.end(),
                    TimeCue {
                        text: m.as_str().to_string(),
                        precision: pattern.precision,
                        bucket: (pattern.bucket)(&caps),
                        confidence: pattern.precision.confidence(),
                        start: m.start(),
                    },
                ));
            }
        }
        found.sort_by_key(|(s, _, _)| *s);
        found.into_iter().map(|(_, _, cue)| cue).collect()
    }

    /// Most precise cue; the earliest one among equals.
    pub fn best<'a>(&self, cues: &'a [TimeCue]) -> Option<&'a TimeCue> {
        cues.iter().min_by_key(|c| (c.precision, c.start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cues(text: &str) -> Vec<TimeCue> {
        TimeCueExtractor.find_all(text)
    }

    #[test]
    fn test_quarter_hides_year() {
        let c = cues("volume production in Q2 2026.");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].text, "Q2 2026");
        assert_eq!(c[0].precision, TimePrecision::Quarter);
        assert_eq!(c[0].bucket.as_deref(), Some("2026-Q2"));
        assert_eq!(c[0].confidence, 1.0);
    }

    #[test]
    fn test_precision_preference() {
        let text = "Beginning in 2025 and finishing in the second half of 2026, then next quarter.";
        let c = cues(text);
        let best = TimeCueExtractor.best(&c).unwrap();
        assert_eq!(best.precision, TimePrecision::HalfYear);
        assert_eq!(best.bucket.as_deref(), Some("2026-H2"));
        assert_eq!(c.len(), 3);
        assert_eq!(c[0].text, "2025");
    }

    #[test]
    fn test_month_and_fiscal_year() {
        let c = cues("Signed on March 15, 2025 with deliveries in FY27.");
        assert_eq!(c[0].precision, TimePrecision::MonthDay);
        assert_eq!(c[0].bucket.as_deref(), Some("2025-03"));
        assert_eq!(c[1].precision, TimePrecision::FiscalYear);
        assert_eq!(c[1].bucket.as_deref(), Some("FY2027"));
    }

    #[test]
    fn test_relative_has_no_bucket() {
        let c = cues("We will open the plant next year.");
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].precision, TimePrecision::Relative);
        assert!(c[0].bucket.is_none());
        assert_eq!(c[0].confidence, 0.5);
    }

    #[test]
    fn test_no_cues() {
        assert!(cues("We will expand the charging network.").is_empty());
    }
}
