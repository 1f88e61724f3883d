//! Turns canonical decisions into user-facing candidates.

use regex::Regex;

use dnav_core::text::{capitalize, clamp_with_ellipsis, phrase_regex};
use dnav_core::{
    CandidateEvidence, CanonicalDecision, Category, ConstraintScore, Constraints,
    DecisionCandidate, Lexicon, RawCandidate, Strength, TimePrecision, TriageBin,
};
use dnav_ingest::TimeCueExtractor;

const DECISION_CHARS: usize = 240;
const FALLBACK_RATIONALE: &str = "Stated as a commitment in the source document.";

/// Scores the local path's candidates from gate signals and merge provenance.
pub struct CandidateScorer {
    categories: Vec<(Category, Regex)>,
    timecues: TimeCueExtractor,
}

impl CandidateScorer {
    pub fn new(lexicon: &'static Lexicon) -> Self {
        let categories = lexicon
            .category_rules
            .iter()
            .filter(|(_, words)| !words.is_empty())
            .map(|(category, words)| (*category, phrase_regex(words, true)))
            .collect();
        Self {
            categories,
            timecues: TimeCueExtractor,
        }
    }

    /// Category with the most keyword hits; rule order breaks ties.
    pub fn category(&self, text: &str) -> Category {
        let mut best = (Category::Other, 0);
        for (category, re) in &self.categories {
            let hits = re.find_iter(text).count();
            if hits > best.1 {
                best = (*category, hits);
            }
        }
        best.0
    }

    /// Hard when the gate put the unit in `Decision` and the commitment is
    /// strong or already executed.
    pub fn strength(&self, rep: &RawCandidate) -> Strength {
        let gate = &rep.gate;
        if gate.bin == TriageBin::Decision
            && (gate.commitment_strength >= 1.0 || gate.signals.reversal_cost)
        {
            Strength::Hard
        } else {
            Strength::Soft
        }
    }

    /// Build the candidate for `decision`, whose representative unit is `rep`.
    pub fn score(&self, decision: &CanonicalDecision, rep: &RawCandidate) -> DecisionCandidate {
        let signals = &rep.gate.signals;
        let merged = decision.sources.candidate_ids.len() > 1;

        let anchor = decision.evidence.first().or_else(|| rep.evidence.first());
        let evidence = CandidateEvidence {
            page: anchor.map_or(rep.page, |a| a.page),
            quote: anchor.map(|a| a.excerpt.clone()).unwrap_or_default(),
            location_hint: rep.section_hint.clone(),
        };

        let mut tags: Vec<String> = signals.active().into_iter().map(str::to_string).collect();
        if merged {
            tags.push("merged".into());
        }

        DecisionCandidate {
            id: decision.id.clone(),
            title: decision.title.clone(),
            strength: self.strength(rep),
            category: self.category(&format!("{} {}", decision.title, rep.raw_text)),
            decision: clamp_with_ellipsis(&rep.raw_text, DECISION_CHARS),
            rationale: rationale(rep),
            constraints: self.constraints(decision, rep),
            evidence,
            tags,
        }
    }

    fn constraints(&self, decision: &CanonicalDecision, rep: &RawCandidate) -> Constraints {
        let s = &rep.gate.signals;
        let merged = decision.sources.candidate_ids.len() > 1;

        let impact = 4 + 3 * u8::from(s.capital) + 2 * u8::from(s.exposure) + u8::from(merged);
        let impact_why = match (s.capital, s.exposure) {
            (true, true) => "capital commitment with public exposure",
            (true, false) => "commits capital or operating capacity",
            (false, true) => "publicly stated target",
            (false, false) => "no capital or exposure cue",
        };

        let (cost, cost_why) = if s.capital {
            (7, "capital or operational spend implied")
        } else {
            (3, "no spend cue")
        };

        let risk = 3 + 3 * u8::from(s.dependency) + 2 * u8::from(s.reversal_cost);
        let risk_why = match (s.dependency, s.reversal_cost) {
            (true, true) => "dependent on other events and costly to reverse",
            (true, false) => "dependent on other events",
            (false, true) => "costly to reverse",
            (false, false) => "no dependency or reversal cue",
        };

        let cues = self.timecues.find_all(&rep.raw_text);
        let (urgency, urgency_why) = match self.timecues.best(&cues) {
            Some(cue) => (urgency_for(cue.precision), format!("timeline: {}", cue.text)),
            None => (3, "no stated timeline".to_string()),
        };

        let merge_confidence = decision.sources.merge_confidence.clamp(0.0, 1.0);
        let confidence =
            (10.0 * (0.6 * rep.gate.commitment_strength + 0.4 * merge_confidence)).round() as u8;
        let confidence_why = match &rep.gate.commitment_verb {
            Some(verb) => format!("commitment \"{verb}\", merge confidence {merge_confidence:.2}"),
            None => format!("no explicit commitment verb, merge confidence {merge_confidence:.2}"),
        };

        Constraints {
            impact: ConstraintScore::new(impact, impact_why),
            cost: ConstraintScore::new(cost, cost_why),
            risk: ConstraintScore::new(risk, risk_why),
            urgency: ConstraintScore::new(urgency, urgency_why),
            confidence: ConstraintScore::new(confidence, confidence_why),
        }
    }
}

impl Default for CandidateScorer {
    fn default() -> Self {
        Self::new(Lexicon::standard())
    }
}

fn urgency_for(precision: TimePrecision) -> u8 {
    match precision {
        TimePrecision::Quarter => 9,
        TimePrecision::HalfYear | TimePrecision::MonthDay => 8,
        TimePrecision::FiscalYear => 7,
        TimePrecision::Year => 6,
        TimePrecision::Relative => 5,
    }
}

fn rationale(rep: &RawCandidate) -> String {
    let s = &rep.gate.signals;
    let mut parts = Vec::new();
    if s.capital {
        parts.push("commits capital or operating capacity");
    }
    if s.time {
        parts.push("on a stated timeline");
    }
    if s.exposure {
        parts.push("with public exposure");
    }
    if s.dependency {
        parts.push("contingent on other events");
    }
    if s.reversal_cost {
        parts.push("already underway or contracted");
    }
    if parts.is_empty() {
        return FALLBACK_RATIONALE.to_string();
    }
    format!("{}.", capitalize(&parts.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnav_consolidate::Clusterer;
    use dnav_core::{Document, PageText};
    use dnav_ingest::Ingester;

    fn scored(text: &str) -> Vec<DecisionCandidate> {
        let doc = Document::new(
            "deck.pdf",
            1,
            vec![PageText {
                page: 2,
                text: text.to_string(),
            }],
        );
        let ingester = Ingester::default();
        let raw = ingester.ingest_pages(&doc, &[2]);
        let units = ingester.canonicalize(&raw);
        let clustering = Clusterer::default().cluster(&units);
        let scorer = CandidateScorer::default();
        clustering
            .decisions
            .iter()
            .map(|d| {
                let rep = raw.iter().find(|r| r.id == d.representative_id).unwrap();
                scorer.score(d, rep)
            })
            .collect()
    }

    #[test]
    fn test_volume_production_scenario() {
        let text = "Tesla will begin volume production of the new platform in Q2 2026.";
        let out = scored(text);
        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!(c.strength, Strength::Hard);
        assert_eq!(c.title, "Begin volume production of the new platform (Q2 2026)");
        assert_eq!(c.evidence.page, 2);
        assert!(text.contains(&c.evidence.quote));
        assert_eq!(c.constraints.urgency.score, 9);
        assert!(c.constraints.urgency.evidence.contains("Q2 2026"));
        assert!(c.tags.contains(&"time".to_string()));
        assert!(!c.tags.contains(&"merged".to_string()));
        for s in [
            &c.constraints.impact,
            &c.constraints.cost,
            &c.constraints.risk,
            &c.constraints.urgency,
            &c.constraints.confidence,
        ] {
            assert!((1..=10).contains(&s.score));
        }
    }

    #[test]
    fn test_merged_pair_tagged() {
        let out = scored(
            "We plan to expand Megafactory capacity in 2026. The company will expand Megafactory Shanghai capacity by 2026.",
        );
        assert_eq!(out.len(), 1);
        assert!(out[0].tags.contains(&"merged".to_string()));
        assert_eq!(out[0].category, Category::Operations);
    }

    #[test]
    fn test_category_rules() {
        let scorer = CandidateScorer::default();
        assert_eq!(scorer.category("Hire 500 engineers for the workforce"), Category::People);
        assert_eq!(scorer.category("Sign a joint venture agreement with a supplier"), Category::Partnership);
        assert_eq!(scorer.category("Hold the annual meeting"), Category::Other);
    }

    #[test]
    fn test_soft_for_weak_commitment() {
        let out = scored("We aim to open a new distribution facility in Texas next quarter.");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].strength, Strength::Soft);
    }
}
