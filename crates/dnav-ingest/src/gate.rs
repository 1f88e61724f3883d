//! Noise/commitment gate. Scores one unit's commitment strength and
//! constraint signals, filters structural noise, and assigns a triage bin.
//!
//! Scoring is a small rule engine: an ordered list of `(matcher, signal,
//! weight)` rules and an ordered list of noise predicates, each evaluated
//! once per unit. The optionality formula lives in one place
//! ([`Gate::optionality`]) and the whole gate is a pure function of the text.

use once_cell::sync::Lazy;
use regex::{Match, Regex};

use dnav_core::text::{fragment_regex, phrase_regex};
use dnav_core::{ConstraintSignals, ExtractionConfig, GateResult, Lexicon, TriageBin};

use crate::timecue::TimeCueExtractor;

/// Weight of the commitment strength in the optionality score.
const COMMITMENT_WEIGHT: f64 = 0.35;

const STRONG: f64 = 1.0;
const WEAK: f64 = 0.8;
const HEDGED: f64 = 0.45;

static DAY_OR_YEAR_AFTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s+(?:\d{1,2}(?:st|nd|rd|th)?|\d{4})\b").expect("day/year regex")
});
static MONTH_PREPOSITION_BEFORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:in|by|until|since|through|during|early|late|mid-?)\s*$")
        .expect("month preposition regex")
});

/// `May` used as the month: followed by a day or year, or preceded by a
/// time preposition.
fn is_month_may(text: &str, m: &Match<'_>) -> bool {
    m.as_str() == "May"
        && (DAY_OR_YEAR_AFTER.is_match(&text[m.end()..])
            || MONTH_PREPOSITION_BEFORE.is_match(&text[..m.start()]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Time,
    Capital,
    Exposure,
    Dependency,
    ReversalCost,
}

impl Signal {
    fn name(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Capital => "capital",
            Self::Exposure => "exposure",
            Self::Dependency => "dependency",
            Self::ReversalCost => "reversal-cost",
        }
    }
}

enum Matcher {
    Phrases(Regex),
    TimeCue,
}

struct SignalRule {
    signal: Signal,
    weight: f64,
    matcher: Matcher,
}

/// Cheap per-unit measurements the noise predicates read.
struct Features {
    letters: usize,
    digit_ratio: f64,
    commas: usize,
    separators: usize,
    all_caps_header: bool,
    boilerplate: bool,
    metric: bool,
    has_commitment: bool,
}

struct NoiseRule {
    tag: &'static str,
    /// Structural noise is always rejected; non-structural noise may still be evidence.
    structural: bool,
    predicate: fn(&Features) -> bool,
}

const NOISE_RULES: &[NoiseRule] = &[
    NoiseRule {
        tag: "numeric-only",
        structural: true,
        predicate: |f| f.letters == 0 && f.digit_ratio > 0.28,
    },
    NoiseRule {
        tag: "all-caps-header",
        structural: true,
        predicate: |f| f.all_caps_header,
    },
    NoiseRule {
        tag: "table-row",
        structural: true,
        predicate: |f| (f.commas >= 4 && f.digit_ratio > 0.18) || f.separators >= 4,
    },
    NoiseRule {
        tag: "boilerplate",
        structural: true,
        predicate: |f| f.boilerplate,
    },
    NoiseRule {
        tag: "metric-recitation",
        structural: false,
        predicate: |f| f.metric && !f.has_commitment,
    },
];

/// Heuristic classifier for a single statement unit.
pub struct Gate {
    strong_re: Regex,
    weak_re: Regex,
    hedge_re: Regex,
    metric_re: Regex,
    boilerplate_re: Option<Regex>,
    rules: Vec<SignalRule>,
    timecues: TimeCueExtractor,
    decision_threshold: f64,
    maybe_threshold: f64,
}

impl Gate {
    pub fn new(lexicon: &'static Lexicon, config: &ExtractionConfig) -> Self {
        let rules = vec![
            SignalRule {
                signal: Signal::Time,
                weight: 0.2,
                matcher: Matcher::TimeCue,
            },
            SignalRule {
                signal: Signal::Capital,
                weight: 0.2,
                matcher: Matcher::Phrases(phrase_regex(lexicon.capital_cues, true)),
            },
            SignalRule {
                signal: Signal::Exposure,
                weight: 0.1,
                matcher: Matcher::Phrases(phrase_regex(lexicon.exposure_cues, true)),
            },
            SignalRule {
                signal: Signal::Dependency,
                weight: 0.1,
                matcher: Matcher::Phrases(phrase_regex(lexicon.dependency_cues, true)),
            },
            SignalRule {
                signal: Signal::ReversalCost,
                weight: 0.1,
                matcher: Matcher::Phrases(phrase_regex(lexicon.reversal_cues, true)),
            },
        ];

        Self {
            strong_re: phrase_regex(lexicon.strong_commitments, true),
            weak_re: phrase_regex(lexicon.weak_commitments, true),
            hedge_re: phrase_regex(lexicon.hedges, true),
            metric_re: phrase_regex(lexicon.metric_terms, true),
            boilerplate_re: fragment_regex(lexicon.boilerplate),
            rules,
            timecues: TimeCueExtractor,
            decision_threshold: config.decision_threshold,
            maybe_threshold: config.maybe_threshold,
        }
    }

    /// Earliest commitment phrase and its strength. On equal positions the
    /// stronger list wins.
    pub fn commitment(&self, text: &str) -> Option<(String, f64)> {
        let hedge = self
            .hedge_re
            .find_iter(text)
            .find(|m| !is_month_may(text, m));
        [
            (self.strong_re.find(text), STRONG),
            (self.weak_re.find(text), WEAK),
            (hedge, HEDGED),
        ]
        .into_iter()
        .filter_map(|(m, strength)| m.map(|m| (m, strength)))
        .min_by(|(a, sa), (b, sb)| {
            a.start()
                .cmp(&b.start())
                .then(sb.partial_cmp(sa).unwrap_or(std::cmp::Ordering::Equal))
        })
        .map(|(m, strength)| (m.as_str().to_lowercase(), strength))
    }

    /// `0.35·commitment + Σ weight·signal`, clamped to [0, 1].
    pub fn optionality(&self, commitment_strength: f64, signals: &ConstraintSignals) -> f64 {
        let mut score = COMMITMENT_WEIGHT * commitment_strength;
        for rule in &self.rules {
            if signal_value(signals, rule.signal) {
                score += rule.weight;
            }
        }
        score.clamp(0.0, 1.0)
    }

    pub fn evaluate(&self, text: &str) -> GateResult {
        let mut included = Vec::new();
        let mut excluded = Vec::new();

        let commitment = self.commitment(text);
        let commitment_strength = commitment.as_ref().map_or(0.0, |(_, s)| *s);
        match &commitment {
            Some((verb, strength)) => included.push(format!("commitment:{verb} ({strength:.2})")),
            None => excluded.push("no commitment verb".to_string()),
        }

        let mut signals = ConstraintSignals::default();
        for rule in &self.rules {
            let hit = match &rule.matcher {
                Matcher::Phrases(re) => re.find(text).map(|m| m.as_str().to_string()),
                Matcher::TimeCue => {
                    let cues = self.timecues.find_all(text);
                    self.timecues.best(&cues).map(|c| c.text.clone())
                }
            };
            if let Some(hit) = hit {
                set_signal(&mut signals, rule.signal);
                included.push(format!("signal:{}({hit})", rule.signal.name()));
            }
        }
        signals.optionality_score = self.optionality(commitment_strength, &signals);

        let features = self.features(text, commitment.is_some());
        let mut structural_noise = false;
        let mut is_noise = false;
        for rule in NOISE_RULES {
            if (rule.predicate)(&features) {
                is_noise = true;
                structural_noise |= rule.structural;
                excluded.push(format!("noise:{}", rule.tag));
            }
        }

        let opt = signals.optionality_score;
        let implied_action =
            signals.reversal_cost && (signals.capital || signals.time) && commitment_strength == 0.0;
        if implied_action {
            included.push("reversal cost implies executed action".to_string());
        }

        let bin = if structural_noise {
            TriageBin::Rejected
        } else if (commitment_strength > 0.0 || implied_action) && opt >= self.decision_threshold {
            TriageBin::Decision
        } else if (commitment_strength > 0.0 || implied_action) && opt >= self.maybe_threshold {
            TriageBin::MaybeDecision
        } else if features.metric && commitment.is_none() {
            TriageBin::EvidenceOnly
        } else {
            if commitment_strength > 0.0 || implied_action {
                excluded.push(format!(
                    "optionality {opt:.2} below {:.2}",
                    self.maybe_threshold
                ));
            }
            TriageBin::Rejected
        };

        GateResult {
            bin,
            optionality_score: opt,
            commitment_verb: commitment.map(|(v, _)| v),
            commitment_strength,
            signals,
            is_noise,
            reasons_included: included,
            reasons_excluded: excluded,
        }
    }

    fn features(&self, text: &str, has_commitment: bool) -> Features {
        let mut letters = 0usize;
        let mut digits = 0usize;
        let mut non_ws = 0usize;
        let mut commas = 0usize;
        let mut separators = 0usize;
        for c in text.chars() {
            if c.is_whitespace() {
                continue;
            }
            non_ws += 1;
            if c.is_alphabetic() {
                letters += 1;
            } else if c.is_ascii_digit() {
                digits += 1;
            }
            match c {
                ',' => commas += 1,
                '|' | '•' | '·' | '▪' | '●' => separators += 1,
                _ => {}
            }
        }
        let digit_ratio = if non_ws == 0 {
            0.0
        } else {
            digits as f64 / non_ws as f64
        };

        let trimmed = text.trim();
        let all_caps_header = trimmed.chars().count() >= 8
            && trimmed.chars().any(char::is_alphabetic)
            && trimmed
                .chars()
                .all(|c| c.is_uppercase() || c == ' ' || c == '&' || c == '-');

        Features {
            letters,
            digit_ratio,
            commas,
            separators,
            all_caps_header,
            boilerplate: self
                .boilerplate_re
                .as_ref()
                .is_some_and(|re| re.is_match(text)),
            metric: self.metric_re.is_match(text),
            has_commitment,
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(Lexicon::standard(), &ExtractionConfig::default())
    }
}

fn signal_value(s: &ConstraintSignals, signal: Signal) -> bool {
    match signal {
        Signal::Time => s.time,
        Signal::Capital => s.capital,
        Signal::Exposure => s.exposure,
        Signal::Dependency => s.dependency,
        Signal::ReversalCost => s.reversal_cost,
    }
}

fn set_signal(s: &mut ConstraintSignals, signal: Signal) {
    match signal {
        Signal::Time => s.time = true,
        Signal::Capital => s.capital = true,
        Signal::Exposure => s.exposure = true,
        Signal::Dependency => s.dependency = true,
        Signal::ReversalCost => s.reversal_cost = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> Gate {
        Gate::default()
    }

    #[test]
    fn test_volume_production_is_decision() {
        let r = gate().evaluate("Tesla will begin volume production of the new platform in Q2 2026.");
        assert_eq!(r.bin, TriageBin::Decision);
        assert_eq!(r.commitment_verb.as_deref(), Some("will"));
        assert_eq!(r.commitment_strength, 1.0);
        assert!(r.signals.time);
        assert!(r.optionality_score >= 0.55);
        assert!(!r.is_noise);
    }

    #[test]
    fn test_metric_statement_is_not_decision() {
        let r = gate().evaluate("Revenue grew 12% year-over-year to $25.2B.");
        assert!(r.commitment_verb.is_none());
        assert_ne!(r.bin, TriageBin::Decision);
        assert_eq!(r.bin, TriageBin::EvidenceOnly);
        assert!(r.reasons_excluded.iter().any(|e| e == "noise:metric-recitation"));
    }

    #[test]
    fn test_numeric_row_rejected() {
        let r = gate().evaluate("12,450 18,200 9,330 4,120");
        assert_eq!(r.bin, TriageBin::Rejected);
        assert!(r.is_noise);
    }

    #[test]
    fn test_all_caps_header_rejected() {
        let r = gate().evaluate("CAPITAL EXPENDITURES & OUTLOOK");
        assert_eq!(r.bin, TriageBin::Rejected);
        assert!(r.reasons_excluded.iter().any(|e| e == "noise:all-caps-header"));
    }

    #[test]
    fn test_table_row_rejected() {
        let r = gate().evaluate("Model 3 | 12,000 | 14,500 | 16,200 | will ramp");
        assert_eq!(r.bin, TriageBin::Rejected);
    }

    #[test]
    fn test_boilerplate_rejected() {
        let r = gate().evaluate(
            "This release contains forward-looking statements and actual results may differ materially.",
        );
        assert_eq!(r.bin, TriageBin::Rejected);
    }

    #[test]
    fn test_earliest_commitment_wins() {
        let g = gate();
        let (verb, s) = g.commitment("We plan to launch the product next year").unwrap();
        assert_eq!(verb, "plan to");
        assert_eq!(s, 0.8);
        let (verb, s) = g.commitment("We might launch the product").unwrap();
        assert_eq!(verb, "might");
        assert_eq!(s, 0.45);
    }

    #[test]
    fn test_month_may_is_not_hedge() {
        let g = gate();
        assert!(g.commitment("Deliveries resumed in May 2025 at the plant").is_none());
        assert!(g.commitment("The Austin line restarts May 15 after the retool").is_none());
        assert!(g.commitment("Deliveries resumed in May at the plant").is_none());
        let (verb, _) = g.commitment("May expand the Austin line if demand holds").unwrap();
        assert_eq!(verb, "may");
    }

    #[test]
    fn test_sentence_initial_hedge() {
        let r = gate().evaluate("Could expand the Berlin plant capacity in 2026 if demand holds.");
        assert_eq!(r.commitment_verb.as_deref(), Some("could"));
        assert_eq!(r.commitment_strength, 0.45);
        assert!(r.bin.is_admitted());
    }

    #[test]
    fn test_optionality_formula() {
        let g = gate();
        let signals = ConstraintSignals {
            time: true,
            capital: true,
            exposure: false,
            dependency: true,
            reversal_cost: false,
            optionality_score: 0.0,
        };
        let opt = g.optionality(0.8, &signals);
        assert!((opt - (0.28 + 0.2 + 0.2 + 0.1)).abs() < 1e-9);
        let all = ConstraintSignals {
            time: true,
            capital: true,
            exposure: true,
            dependency: true,
            reversal_cost: true,
            optionality_score: 0.0,
        };
        assert_eq!(g.optionality(1.0, &all), 1.0);
    }

    #[test]
    fn test_hedged_low_signal_rejected() {
        let r = gate().evaluate("We might look at other opportunities with our partners.");
        assert_eq!(r.bin, TriageBin::Rejected);
    }

    #[test]
    fn test_gate_is_pure() {
        let g = gate();
        let text = "We plan to expand Megafactory capacity in 2026.";
        assert_eq!(g.evaluate(text), g.evaluate(text));
    }
}
