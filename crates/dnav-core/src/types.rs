//! Pipeline data model, from raw page text to user-facing decision candidates.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum length (chars) of any evidence quote leaving the pipeline.
pub const MAX_QUOTE_CHARS: usize = 280;

/// One page of extracted text, as delivered by the text-extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub page: u32,
    pub text: String,
}

/// A validated document ready for extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub doc_id: String,
    pub name: String,
    pub page_count: u32,
    pub pages: Vec<PageText>,
}

impl Document {
    /// Build a document, deriving a stable id from its name.
    pub fn new(name: impl Into<String>, page_count: u32, pages: Vec<PageText>) -> Self {
        let name = name.into();
        Self {
            doc_id: short_hash(&name),
            name,
            page_count,
            pages,
        }
    }

    pub fn total_chars(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }

    pub fn page_text(&self, page: u32) -> Option<&str> {
        self.pages
            .iter()
            .find(|p| p.page == page)
            .map(|p| p.text.as_str())
    }
}

/// First 12 hex chars of the SHA-256 of `input`.
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..12].to_string()
}

/// The snippets of one page sent to the external model in extraction mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnippets {
    pub page: u32,
    pub snippets: Vec<String>,
}

/// Pointer back to the literal source text. `excerpt` is always a verbatim
/// slice of the page text it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceAnchor {
    pub doc_id: String,
    pub file_name: String,
    pub page: u32,
    pub excerpt: String,
}

/// Boolean constraint cues found in one unit plus the derived optionality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSignals {
    pub time: bool,
    pub capital: bool,
    pub exposure: bool,
    pub dependency: bool,
    pub reversal_cost: bool,
    pub optionality_score: f64,
}

impl ConstraintSignals {
    /// Names of the active signals, in a fixed order.
    pub fn active(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.time {
            out.push("time");
        }
        if self.capital {
            out.push("capital");
        }
        if self.exposure {
            out.push("exposure");
        }
        if self.dependency {
            out.push("dependency");
        }
        if self.reversal_cost {
            out.push("reversal-cost");
        }
        out
    }
}

/// Gate classification of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriageBin {
    Decision,
    MaybeDecision,
    EvidenceOnly,
    Rejected,
}

impl TriageBin {
    /// Whether units in this bin continue to canonicalization.
    pub fn is_admitted(self) -> bool {
        matches!(self, Self::Decision | Self::MaybeDecision)
    }
}

/// Output of the noise/commitment gate. Never mutated; re-gating yields a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResult {
    pub bin: TriageBin,
    pub optionality_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment_verb: Option<String>,
    pub commitment_strength: f64,
    pub signals: ConstraintSignals,
    pub is_noise: bool,
    pub reasons_included: Vec<String>,
    pub reasons_excluded: Vec<String>,
}

/// One segmented, gated text unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    pub id: String,
    pub doc_id: String,
    pub page: u32,
    /// Whitespace-normalized unit text.
    pub raw_text: String,
    /// The paragraph the unit was cut from.
    pub context_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_hint: Option<String>,
    pub is_table_noise: bool,
    pub extraction_score: f64,
    pub date_mentions: Vec<String>,
    pub evidence: Vec<EvidenceAnchor>,
    pub gate: GateResult,
}

/// Precision of a time cue, most precise first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimePrecision {
    Quarter,
    HalfYear,
    MonthDay,
    FiscalYear,
    Year,
    Relative,
}

impl TimePrecision {
    pub fn confidence(self) -> f64 {
        match self {
            Self::Quarter => 1.0,
            Self::HalfYear => 0.9,
            Self::MonthDay => 0.85,
            Self::FiscalYear => 0.75,
            Self::Year => 0.65,
            Self::Relative => 0.5,
        }
    }
}

/// A date or period mention found in a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeCue {
    /// Verbatim mention, e.g. `Q2 2026`.
    pub text: String,
    pub precision: TimePrecision,
    /// Normalized clustering bucket (`2026-Q2`, `FY2026`, ...). `None` for relative phrases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    pub confidence: f64,
    /// Byte offset of the mention in the unit text.
    #[serde(skip)]
    pub start: usize,
}

/// Normalized `Action + Object (+Time)` form of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalForm {
    pub title: String,
    pub action_verb: String,
    pub object_phrase: String,
    pub object_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_cue: Option<TimeCue>,
}

/// A gated candidate together with its canonical form; the clusterer's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalUnit {
    pub candidate: RawCandidate,
    pub form: CanonicalForm,
}

/// Provenance of a canonical decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSources {
    pub candidate_ids: Vec<String>,
    pub merge_confidence: f64,
    pub merge_reason: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_merge_ids: Option<Vec<String>>,
}

/// Deduplicated representation of one or more near-duplicate statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDecision {
    pub id: String,
    pub doc_id: String,
    pub title: String,
    pub action_verb: String,
    pub object_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_bucket: Option<String>,
    pub evidence: Vec<EvidenceAnchor>,
    pub sources: MergeSources,
    /// Id of the member whose text and gate result represent the cluster.
    pub representative_id: String,
}

/// Hard = explicit commitment or executed action; soft = lower-confidence signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Hard,
    Soft,
}

impl Strength {
    pub fn weight(self) -> f64 {
        match self {
            Self::Hard => 2.0,
            Self::Soft => 1.0,
        }
    }
}

/// Fixed decision category set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Product,
    Operations,
    Capital,
    Financial,
    People,
    Partnership,
    Regulatory,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Product,
        Self::Operations,
        Self::Capital,
        Self::Financial,
        Self::People,
        Self::Partnership,
        Self::Regulatory,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Operations => "Operations",
            Self::Capital => "Capital",
            Self::Financial => "Financial",
            Self::People => "People",
            Self::Partnership => "Partnership",
            Self::Regulatory => "Regulatory",
            Self::Other => "Other",
        }
    }

    /// Case-insensitive lookup; anything unknown is `Other`.
    pub fn parse_or_other(s: &str) -> Self {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .unwrap_or(Self::Other)
    }
}

/// A 1..10 score with the text that justifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintScore {
    pub score: u8,
    pub evidence: String,
}

impl ConstraintScore {
    pub fn new(score: u8, evidence: impl Into<String>) -> Self {
        Self {
            score: score.clamp(1, 10),
            evidence: evidence.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    pub impact: ConstraintScore,
    pub cost: ConstraintScore,
    pub risk: ConstraintScore,
    pub urgency: ConstraintScore,
    pub confidence: ConstraintScore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEvidence {
    pub page: u32,
    /// At most [`MAX_QUOTE_CHARS`] characters.
    pub quote: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
}

/// User-facing candidate, produced locally or normalized from model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionCandidate {
    pub id: String,
    pub title: String,
    pub strength: Strength,
    pub category: Category,
    pub decision: String,
    pub rationale: String,
    pub constraints: Constraints,
    pub evidence: CandidateEvidence,
    pub tags: Vec<String>,
}

impl DecisionCandidate {
    /// Ranking score used when two duplicates compete.
    pub fn preference_score(&self) -> f64 {
        self.strength.weight() * 10.0 + f64::from(self.constraints.confidence.score)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocSummary {
    pub name: String,
    pub page_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMeta {
    pub pages_received: usize,
    pub total_chars: usize,
    pub mode: crate::ExtractionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

/// Response body returned to the calling UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub doc: DocSummary,
    pub candidates: Vec<DecisionCandidate>,
    pub meta: ExtractionMeta,
}

/// Insertion-ordered, deduplicated warning list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings(Vec<String>);

impl Warnings {
    pub fn push(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.0.contains(&warning) {
            self.0.push(warning);
        }
    }

    pub fn extend(&mut self, other: Warnings) {
        for w in other.0 {
            self.push(w);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// `None` when empty, so the field is omitted from responses.
    pub fn into_option(self) -> Option<Vec<String>> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash_stable() {
        assert_eq!(short_hash("report.pdf"), short_hash("report.pdf"));
        assert_eq!(short_hash("report.pdf").len(), 12);
        assert_ne!(short_hash("a"), short_hash("b"));
    }

    #[test]
    fn test_category_fallback() {
        assert_eq!(Category::parse_or_other("capital"), Category::Capital);
        assert_eq!(Category::parse_or_other("Marketing"), Category::Other);
    }

    #[test]
    fn test_warnings_dedup() {
        let mut w = Warnings::default();
        w.push("timeout");
        w.push("timeout");
        w.push("no key");
        assert_eq!(w.as_slice().len(), 2);
        assert_eq!(Warnings::default().into_option(), None);
    }

    #[test]
    fn test_candidate_serializes_lowercase_strength() {
        let c = DecisionCandidate {
            id: "x".into(),
            title: "Launch Semi".into(),
            strength: Strength::Hard,
            category: Category::Product,
            decision: "Launch Semi".into(),
            rationale: "r".into(),
            constraints: Constraints {
                impact: ConstraintScore::new(5, ""),
                cost: ConstraintScore::new(5, ""),
                risk: ConstraintScore::new(5, ""),
                urgency: ConstraintScore::new(5, ""),
                confidence: ConstraintScore::new(12, ""),
            },
            evidence: CandidateEvidence {
                page: 3,
                quote: "q".into(),
                location_hint: None,
            },
            tags: vec![],
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["strength"], "hard");
        assert_eq!(v["category"], "Product");
        assert_eq!(v["constraints"]["confidence"]["score"], 10);
        assert!(v["evidence"].get("locationHint").is_none());
        assert_eq!(c.preference_score(), 30.0);
    }
}
