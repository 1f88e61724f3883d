//! Duplicate detection and resolution for user-facing candidates.

use dnav_core::text::{normalize_title, TokenNormalizer};
use dnav_core::{Category, DecisionCandidate, ExtractionConfig, Lexicon};
use dnav_ingest::TimeCueExtractor;

use crate::types::MergeScope;

/// Decides whether two candidates are duplicates and, if so, which one wins.
pub struct MergeResolver {
    normalizer: TokenNormalizer,
    timecues: TimeCueExtractor,
    threshold: f64,
}

impl MergeResolver {
    pub fn new(lexicon: &'static Lexicon, threshold: f64) -> Self {
        Self {
            normalizer: TokenNormalizer::new(lexicon),
            timecues: TimeCueExtractor,
            threshold,
        }
    }

    /// Resolver with the threshold the config assigns to `scope`.
    pub fn for_scope(scope: MergeScope, config: &ExtractionConfig) -> Self {
        let threshold = match scope {
            MergeScope::Local => config.local_merge_similarity,
            MergeScope::Cross => config.cross_merge_similarity,
        };
        Self::new(Lexicon::standard(), threshold)
    }

    /// Exact normalized-title match, or title+decision Jaccard at or above the
    /// threshold. Candidates whose evidence resolves to different time buckets
    /// are never duplicates.
    pub fn is_duplicate(&self, a: &DecisionCandidate, b: &DecisionCandidate) -> bool {
        if let (Some(ba), Some(bb)) = (self.time_bucket(a), self.time_bucket(b)) {
            if ba != bb {
                return false;
            }
        }
        let ta = normalize_title(&a.title);
        if !ta.is_empty() && ta == normalize_title(&b.title) {
            return true;
        }
        let sa = format!("{} {}", a.title, a.decision);
        let sb = format!("{} {}", b.title, b.decision);
        self.normalizer.similarity(&sa, &sb) >= self.threshold
    }

    /// Bucket of the most precise time cue in the quote, else in the title.
    fn time_bucket(&self, c: &DecisionCandidate) -> Option<String> {
        [c.evidence.quote.as_str(), c.title.as_str()]
            .into_iter()
            .find_map(|text| {
                let cues = self.timecues.find_all(text);
                self.timecues.best(&cues).and_then(|cue| cue.bucket.clone())
            })
    }

    /// Combine two duplicates. The preferred side (higher
    /// `strength weight × 10 + confidence`, first operand on ties) keeps its
    /// fields; empty text falls back to the other side, evidence comes from the
    /// more confident side and tags are the union of both.
    pub fn resolve(&self, a: &DecisionCandidate, b: &DecisionCandidate) -> DecisionCandidate {
        let (preferred, other) = if b.preference_score() > a.preference_score() {
            (b, a)
        } else {
            (a, b)
        };
        let mut merged = preferred.clone();

        if merged.decision.trim().is_empty() {
            merged.decision = other.decision.clone();
        }
        if merged.rationale.trim().is_empty() {
            merged.rationale = other.rationale.clone();
        }
        if merged.category == Category::Other {
            merged.category = other.category;
        }
        if other.constraints.confidence.score > preferred.constraints.confidence.score {
            merged.evidence = other.evidence.clone();
        }

        let mut tags: Vec<String> = a.tags.iter().chain(&b.tags).cloned().collect();
        tags.sort();
        tags.dedup();
        merged.tags = tags;

        merged
    }

    /// Fold `incoming` into `base`: a duplicate replaces the first existing
    /// candidate it matches, anything else is appended.
    pub fn merge_into(
        &self,
        base: Vec<DecisionCandidate>,
        incoming: Vec<DecisionCandidate>,
    ) -> Vec<DecisionCandidate> {
        let mut out = base;
        for cand in incoming {
            match out.iter().position(|existing| self.is_duplicate(existing, &cand)) {
                Some(i) => out[i] = self.resolve(&out[i], &cand),
                None => out.push(cand),
            }
        }
        out
    }

    /// Collapse duplicates within one list, keeping first-seen order.
    pub fn dedupe(&self, candidates: Vec<DecisionCandidate>) -> Vec<DecisionCandidate> {
        self.merge_into(Vec::new(), candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnav_core::{CandidateEvidence, ConstraintScore, Constraints, Strength};

    fn cand(id: &str, title: &str, strength: Strength, confidence: u8, tags: &[&str]) -> DecisionCandidate {
        let score = |s: u8| ConstraintScore::new(s, "");
        DecisionCandidate {
            id: id.into(),
            title: title.into(),
            strength,
            category: Category::Operations,
            decision: title.into(),
            rationale: "Commits capital to capacity.".into(),
            constraints: Constraints {
                impact: score(6),
                cost: score(6),
                risk: score(4),
                urgency: score(5),
                confidence: score(confidence),
            },
            evidence: CandidateEvidence {
                page: 1,
                quote: format!("quote for {id}"),
                location_hint: None,
            },
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn local() -> MergeResolver {
        MergeResolver::for_scope(MergeScope::Local, &ExtractionConfig::default())
    }

    #[test]
    fn test_exact_title_is_duplicate() {
        let a = cand("a", "Expand Megafactory capacity (2026)", Strength::Hard, 7, &[]);
        let mut b = cand("b", "expand megafactory capacity 2026", Strength::Soft, 5, &[]);
        b.decision = "Something unrelated entirely".into();
        assert!(local().is_duplicate(&a, &b));
    }

    #[test]
    fn test_threshold_depends_on_scope() {
        // 3 shared tokens of 5 => 0.6, between the cross (0.55) and local (0.65) thresholds.
        let a = cand("a", "Expand Megafactory capacity Lathrop", Strength::Hard, 7, &[]);
        let b = cand("b", "Expand Megafactory output Lathrop", Strength::Hard, 7, &[]);
        let cross = MergeResolver::for_scope(MergeScope::Cross, &ExtractionConfig::default());
        assert!(cross.is_duplicate(&a, &b));
        assert!(!local().is_duplicate(&a, &b));
        let strict = MergeResolver::new(Lexicon::standard(), 0.7);
        assert!(!strict.is_duplicate(&a, &b));
    }

    #[test]
    fn test_different_years_are_not_duplicates() {
        let mut a = cand("a", "Expand Megafactory Shanghai capacity", Strength::Hard, 7, &[]);
        a.evidence.quote = "We will expand Megafactory Shanghai capacity in 2026.".into();
        let mut b = cand("b", "Expand Megafactory Shanghai capacity", Strength::Hard, 7, &[]);
        b.evidence.quote = "We will expand Megafactory Shanghai capacity in 2027.".into();
        assert!(!local().is_duplicate(&a, &b));
        assert_eq!(local().dedupe(vec![a.clone(), b]).len(), 2);

        // A cue on one side only does not block the merge.
        let mut c = cand("c", "Expand Megafactory Shanghai capacity", Strength::Soft, 5, &[]);
        c.evidence.quote = "We will expand Megafactory Shanghai capacity.".into();
        assert!(local().is_duplicate(&a, &c));
    }

    #[test]
    fn test_preferred_by_strength_then_confidence() {
        let soft = cand("soft", "Launch the Semi", Strength::Soft, 9, &[]);
        let hard = cand("hard", "Launch the Semi", Strength::Hard, 3, &[]);
        let merged = local().resolve(&soft, &hard);
        assert_eq!(merged.id, "hard");
        // Evidence comes from the more confident side.
        assert_eq!(merged.evidence.quote, "quote for soft");
    }

    #[test]
    fn test_tie_goes_to_first_operand() {
        let a = cand("a", "Launch the Semi", Strength::Hard, 6, &[]);
        let b = cand("b", "Launch the Semi", Strength::Hard, 6, &[]);
        assert_eq!(local().resolve(&a, &b).id, "a");
        assert_eq!(local().resolve(&b, &a).id, "b");
    }

    #[test]
    fn test_tags_union_independent_of_order() {
        let a = cand("a", "Launch the Semi", Strength::Hard, 6, &["time", "capital"]);
        let b = cand("b", "Launch the Semi", Strength::Soft, 6, &["capital", "merged"]);
        let r = local();
        let ab = r.resolve(&a, &b).tags;
        let ba = r.resolve(&b, &a).tags;
        assert_eq!(ab, ba);
        assert_eq!(ab, vec!["capital", "merged", "time"]);
    }

    #[test]
    fn test_empty_fields_fall_back() {
        let mut a = cand("a", "Launch the Semi", Strength::Hard, 8, &[]);
        a.decision = String::new();
        a.category = Category::Other;
        let mut b = cand("b", "Launch the Semi", Strength::Soft, 4, &[]);
        b.category = Category::Product;
        let merged = local().resolve(&a, &b);
        assert_eq!(merged.id, "a");
        assert_eq!(merged.decision, "Launch the Semi");
        assert_eq!(merged.category, Category::Product);
    }

    #[test]
    fn test_merge_into_appends_and_replaces() {
        let base = vec![cand("a", "Launch the Semi", Strength::Soft, 5, &["time"])];
        let incoming = vec![
            cand("b", "Launch the Semi", Strength::Hard, 8, &["model"]),
            cand("c", "Hire two thousand engineers", Strength::Hard, 8, &[]),
        ];
        let out = local().merge_into(base, incoming);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "b");
        assert_eq!(out[0].tags, vec!["model", "time"]);
        assert_eq!(out[1].id, "c");
    }
}
