//! Normalization of raw model objects into [`DecisionCandidate`]s.
//!
//! Each object is validated on its own; one bad item never aborts the batch.

use serde_json::Value;

use dnav_core::text::{clamp_with_ellipsis, first_words};
use dnav_core::{
    CandidateEvidence, Category, ConstraintScore, Constraints, DecisionCandidate, PageSnippets,
    Strength, MAX_QUOTE_CHARS,
};

use crate::types::CommitmentPass;

/// Words taken from the quote when a title is missing.
const TITLE_WORDS: usize = 8;
/// Length of a decision synthesized from the quote.
const DECISION_CHARS: usize = 160;
const DEFAULT_SCORE: u8 = 5;
/// Marks a candidate whose quote is not verbatim page text.
pub const UNVERIFIED_QUOTE_TAG: &str = "unverified-quote";
pub const GENERIC_RATIONALE: &str =
    "Stated in the source document as a commitment with material business consequences.";

/// Why a model object was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotAnObject,
    NoEvidence,
    UnknownPage,
}

/// Round and clamp a score to 1..=10; accepts numbers and numeric strings.
pub fn clamp_score(v: &Value) -> Option<u8> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(1.0, 10.0) as u8)
}

fn text_field<'a>(obj: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn page_field(v: Option<&Value>) -> Option<u32> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n >= 1.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX)).then_some(n as u32)
}

fn constraint(obj: &Value, name: &str) -> ConstraintScore {
    match obj.get("constraints").and_then(|c| c.get(name)) {
        Some(Value::Object(m)) => {
            let score = m.get("score").and_then(clamp_score).unwrap_or(DEFAULT_SCORE);
            let evidence = m
                .get("evidence")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim();
            ConstraintScore::new(score, evidence)
        }
        Some(v) => ConstraintScore::new(clamp_score(v).unwrap_or(DEFAULT_SCORE), ""),
        None => ConstraintScore::new(DEFAULT_SCORE, ""),
    }
}

fn tags(obj: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in obj
        .get("tags")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(|t| t.trim().to_lowercase())
    {
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Page whose snippets contain `quote`, compared whitespace-insensitively.
fn locate_page(quote: &str, pages: &[PageSnippets]) -> Option<u32> {
    let needle = squash(quote);
    pages
        .iter()
        .find(|p| p.snippets.iter().any(|s| squash(s).contains(&needle)))
        .map(|p| p.page)
}

fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Normalize one object from an extraction response.
///
/// Fallbacks: a missing title is the first words of the quote, a missing
/// decision is the clamped quote, a missing rationale is a generic sentence.
/// A missing page is recovered from the snippets the quote came from. A page
/// without a quote keeps the decision text as its quote, tagged
/// [`UNVERIFIED_QUOTE_TAG`]. An object with neither is dropped.
pub fn normalize_candidate(
    obj: &Value,
    id: String,
    pass: CommitmentPass,
    pages: &[PageSnippets],
    max_title_chars: usize,
) -> Result<DecisionCandidate, Rejection> {
    if !obj.is_object() {
        return Err(Rejection::NotAnObject);
    }
    let evidence = obj.get("evidence").filter(|e| e.is_object());
    let quote = evidence
        .and_then(|e| text_field(e, &["quote", "excerpt", "text"]))
        .or_else(|| text_field(obj, &["quote", "excerpt"]));
    let page = page_field(evidence.and_then(|e| e.get("page")))
        .or_else(|| page_field(obj.get("page")));

    let title_raw = text_field(obj, &["title"]);
    let decision_raw = text_field(obj, &["decision"]);

    let (quote, page, verbatim) = match (quote, page) {
        (None, None) => return Err(Rejection::NoEvidence),
        (Some(q), Some(p)) => (clamp_with_ellipsis(q, MAX_QUOTE_CHARS), p, true),
        (Some(q), None) => {
            let p = locate_page(q, pages).ok_or(Rejection::UnknownPage)?;
            (clamp_with_ellipsis(q, MAX_QUOTE_CHARS), p, true)
        }
        (None, Some(p)) => {
            let stand_in = decision_raw.or(title_raw).ok_or(Rejection::NoEvidence)?;
            (clamp_with_ellipsis(stand_in, MAX_QUOTE_CHARS), p, false)
        }
    };

    let title = match title_raw {
        Some(t) => clamp_with_ellipsis(t, max_title_chars),
        None => first_words(&quote, TITLE_WORDS),
    };
    let decision = match decision_raw {
        Some(d) => d.to_string(),
        None => clamp_with_ellipsis(&quote, DECISION_CHARS),
    };
    let rationale = text_field(obj, &["rationale"])
        .unwrap_or(GENERIC_RATIONALE)
        .to_string();

    let strength = match text_field(obj, &["strength"]).map(str::to_lowercase).as_deref() {
        Some("hard") => Strength::Hard,
        Some("soft") => Strength::Soft,
        _ => match pass {
            CommitmentPass::Hard => Strength::Hard,
            CommitmentPass::Soft => Strength::Soft,
        },
    };
    let category = text_field(obj, &["category"])
        .map(Category::parse_or_other)
        .unwrap_or(Category::Other);

    let mut tags = tags(obj);
    if !verbatim && !tags.iter().any(|t| t == UNVERIFIED_QUOTE_TAG) {
        tags.push(UNVERIFIED_QUOTE_TAG.to_string());
    }

    let location_hint = evidence
        .and_then(|e| text_field(e, &["locationHint", "location_hint", "section"]))
        .or_else(|| text_field(obj, &["locationHint"]))
        .map(str::to_string);

    Ok(DecisionCandidate {
        id,
        title,
        strength,
        category,
        decision,
        rationale,
        constraints: Constraints {
            impact: constraint(obj, "impact"),
            cost: constraint(obj, "cost"),
            risk: constraint(obj, "risk"),
            urgency: constraint(obj, "urgency"),
            confidence: constraint(obj, "confidence"),
        },
        evidence: CandidateEvidence {
            page,
            quote,
            location_hint,
        },
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TITLE_LIMIT: usize = 96;

    fn pages() -> Vec<PageSnippets> {
        vec![PageSnippets {
            page: 4,
            snippets: vec!["We will begin volume production of the new platform in Q2 2026.".into()],
        }]
    }

    #[test]
    fn test_full_object() {
        let obj = json!({
            "title": "Begin volume production (Q2 2026)",
            "strength": "HARD",
            "category": "operations",
            "decision": "Begin volume production of the new platform in Q2 2026.",
            "rationale": "Capacity commitment.",
            "constraints": {
                "impact": {"score": 8.6, "evidence": "new platform"},
                "cost": {"score": 14, "evidence": "factory"},
                "risk": {"score": -3},
                "urgency": "7",
                "confidence": {"evidence": "explicit will"}
            },
            "evidence": {"page": 4, "quote": "  We will begin volume production of the new platform in Q2 2026. ", "locationHint": "Outlook"},
            "tags": ["Capital", "capital", " time "]
        });
        let c = normalize_candidate(&obj, "m-1".into(), CommitmentPass::Soft, &pages(), TITLE_LIMIT).unwrap();
        assert_eq!(c.strength, Strength::Hard);
        assert_eq!(c.category, Category::Operations);
        assert_eq!(c.constraints.impact.score, 9);
        assert_eq!(c.constraints.cost.score, 10);
        assert_eq!(c.constraints.risk.score, 1);
        assert_eq!(c.constraints.urgency.score, 7);
        assert_eq!(c.constraints.confidence.score, 5);
        assert_eq!(c.evidence.quote, "We will begin volume production of the new platform in Q2 2026.");
        assert_eq!(c.evidence.location_hint.as_deref(), Some("Outlook"));
        assert_eq!(c.tags, vec!["capital", "time"]);
    }

    #[test]
    fn test_fallbacks_from_quote() {
        let long_quote = format!("We will expand Megafactory capacity {}", "across every region ".repeat(20));
        let obj = json!({"category": "Marketing", "evidence": {"page": 2, "quote": long_quote}});
        let c = normalize_candidate(&obj, "m-2".into(), CommitmentPass::Soft, &[], TITLE_LIMIT).unwrap();
        assert_eq!(c.title, "We will expand Megafactory capacity across every region");
        assert!(c.decision.chars().count() <= 160);
        assert!(c.decision.ends_with('…'));
        assert!(c.evidence.quote.chars().count() <= 280);
        assert_eq!(c.rationale, GENERIC_RATIONALE);
        assert_eq!(c.category, Category::Other);
        assert_eq!(c.strength, Strength::Soft);
    }

    #[test]
    fn test_no_quote_no_page_dropped() {
        let obj = json!({"title": "Launch Semi", "decision": "Launch the Semi"});
        assert_eq!(
            normalize_candidate(&obj, "x".into(), CommitmentPass::Hard, &pages(), TITLE_LIMIT),
            Err(Rejection::NoEvidence)
        );
        assert_eq!(
            normalize_candidate(&json!("just text"), "x".into(), CommitmentPass::Hard, &pages(), TITLE_LIMIT),
            Err(Rejection::NotAnObject)
        );
    }

    #[test]
    fn test_missing_page_recovered_from_snippets() {
        let obj = json!({"quote": "begin volume production of the new   platform"});
        let c = normalize_candidate(&obj, "m-3".into(), CommitmentPass::Hard, &pages(), TITLE_LIMIT).unwrap();
        assert_eq!(c.evidence.page, 4);
        let orphan = json!({"quote": "text that appears nowhere"});
        assert_eq!(
            normalize_candidate(&orphan, "m-4".into(), CommitmentPass::Hard, &pages(), TITLE_LIMIT),
            Err(Rejection::UnknownPage)
        );
    }

    #[test]
    fn test_page_without_quote_is_flagged() {
        let obj = json!({
            "title": "Open the Berlin service hub",
            "decision": "Open a Berlin service hub in 2026.",
            "evidence": {"page": 4},
            "tags": ["capital"]
        });
        let c = normalize_candidate(&obj, "m-5".into(), CommitmentPass::Soft, &pages(), TITLE_LIMIT).unwrap();
        assert_eq!(c.evidence.page, 4);
        assert_eq!(c.evidence.quote, "Open a Berlin service hub in 2026.");
        assert_eq!(c.tags, vec!["capital", UNVERIFIED_QUOTE_TAG]);

        // A real quote carries no flag.
        let quoted = json!({"evidence": {"page": 4, "quote": "We will begin volume production"}});
        let c = normalize_candidate(&quoted, "m-6".into(), CommitmentPass::Soft, &pages(), TITLE_LIMIT).unwrap();
        assert!(c.tags.is_empty());
    }

    #[test]
    fn test_title_limit_is_configurable() {
        let obj = json!({
            "title": "Expand Megafactory Shanghai capacity with a second assembly hall",
            "evidence": {"page": 4, "quote": "We will begin volume production"}
        });
        let c = normalize_candidate(&obj, "m-7".into(), CommitmentPass::Hard, &pages(), 24).unwrap();
        assert!(c.title.chars().count() <= 24);
        assert!(c.title.ends_with('…'));
    }

    #[test]
    fn test_clamp_score_rejects_garbage() {
        assert_eq!(clamp_score(&json!("high")), None);
        assert_eq!(clamp_score(&json!(null)), None);
        assert_eq!(clamp_score(&json!(0.4)), Some(1));
    }
}
