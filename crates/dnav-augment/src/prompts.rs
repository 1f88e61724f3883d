//! Prompt text for the extraction, refinement and repair calls.

use serde_json::json;

use dnav_core::{Category, DecisionCandidate, PageSnippets};

use crate::types::CommitmentPass;

pub const SYSTEM_PROMPT: &str = r#"You extract business decisions from document text.

RULES:
- Use ONLY the text supplied in the user message as evidence. Never invent facts, numbers, dates or quotes.
- A decision is a committed or executed action (launch, build, hire, invest, close, ...), not a metric, a result or an aspiration.
- Every quote must be copied verbatim from the supplied text, at most 280 characters.
- Page numbers must be the page the quote was taken from.
- Respond with exactly one JSON object. No markdown, no commentary outside the JSON."#;

const CANDIDATE_SCHEMA: &str = r#"{
  "candidates": [
    {
      "title": "Action + object (+ time), at most 12 words",
      "strength": "hard | soft",
      "category": "Product | Operations | Capital | Financial | People | Partnership | Regulatory | Other",
      "decision": "One sentence stating what was decided",
      "rationale": "One sentence on why it matters",
      "constraints": {
        "impact": {"score": 1-10, "evidence": "short reason"},
        "cost": {"score": 1-10, "evidence": "short reason"},
        "risk": {"score": 1-10, "evidence": "short reason"},
        "urgency": {"score": 1-10, "evidence": "short reason"},
        "confidence": {"score": 1-10, "evidence": "short reason"}
      },
      "evidence": {"page": 1, "quote": "verbatim text from that page", "locationHint": "optional section name"},
      "tags": ["short", "labels"]
    }
  ]
}"#;

const REFINE_SCHEMA: &str = r#"{
  "kept_candidates": [
    {
      "id": "id of an input candidate",
      "rewrittenDecision": "clearer one-sentence decision",
      "reasonKeep": "optional short reason",
      "mergedFromIds": ["ids of input duplicates folded into this one"],
      "title": "optional improved title",
      "category": "optional category from the fixed list",
      "tags": ["optional", "labels"]
    }
  ],
  "drop_ids": ["ids of input candidates that are not real decisions"],
  "notes": "optional"
}"#;

fn pass_focus(pass: CommitmentPass) -> &'static str {
    match pass {
        CommitmentPass::Hard => {
            "Extract HARD commitments only: explicit decisions already taken or executed (signed, completed, approved, will begin, launched). Use strength \"hard\"."
        }
        CommitmentPass::Soft => {
            "Extract SOFT commitments only: plans, targets and intentions that are stated but not yet binding (plan to, aim to, expect to, target). Use strength \"soft\"."
        }
    }
}

/// User message for an extraction call over page snippets.
pub fn extraction_prompt(pass: CommitmentPass, pages: &[PageSnippets], per_page_cap: usize) -> String {
    let pages_json = serde_json::to_string_pretty(pages).unwrap_or_else(|_| "[]".into());
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    format!(
        "TASK: {focus}\n\
         Return at most {per_page_cap} candidates per page. Skip pages with no decisions.\n\
         Allowed categories: {categories}.\n\n\
         PAGES (JSON array of {{page, snippets}}):\n{pages_json}\n\n\
         RESPONSE SCHEMA:\n{CANDIDATE_SCHEMA}\n\n\
         Respond with valid JSON only, matching the schema above.",
        focus = pass_focus(pass),
        categories = categories.join(", "),
    )
}

/// User message for a refinement call over locally extracted candidates.
pub fn refinement_prompt(candidates: &[DecisionCandidate], min_keep: usize) -> String {
    let items: Vec<serde_json::Value> = candidates
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "title": c.title,
                "decision": c.decision,
                "category": c.category.as_str(),
                "strength": c.strength,
                "tags": c.tags,
                "page": c.evidence.page,
                "quote": c.evidence.quote,
            })
        })
        .collect();
    let items_json = serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".into());
    format!(
        "TASK: Review these locally extracted decision candidates. Keep the real decisions, \
         rewrite each kept decision as one clear sentence, improve titles, categories and tags, \
         and fold duplicates into one kept entry via mergedFromIds.\n\
         You must NOT change quotes or page numbers, and you must NOT add candidates: \
         only ids from the input are valid.\n\
         Keep at least {min_keep} candidates.\n\n\
         CANDIDATES:\n{items_json}\n\n\
         RESPONSE SCHEMA:\n{REFINE_SCHEMA}\n\n\
         Respond with valid JSON only, matching the schema above."
    )
}

/// User message for the single repair attempt.
pub fn repair_prompt(broken: &str) -> String {
    format!(
        "The following text was supposed to be one JSON object but does not parse. \
         Fix it to valid JSON only, same fields, no commentary:\n\n{broken}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_carries_pages_and_cap() {
        let pages = vec![PageSnippets {
            page: 7,
            snippets: vec!["We will begin volume production in Q2 2026.".into()],
        }];
        let p = extraction_prompt(CommitmentPass::Hard, &pages, 4);
        assert!(p.contains("HARD commitments"));
        assert!(p.contains("at most 4 candidates per page"));
        assert!(p.contains("\"page\": 7"));
        assert!(p.contains("Regulatory"));
        assert!(p.contains("\"candidates\""));
    }

    #[test]
    fn test_refinement_prompt_lists_ids() {
        let p = refinement_prompt(&[], 3);
        assert!(p.contains("at least 3"));
        assert!(p.contains("kept_candidates"));
        assert!(p.contains("mergedFromIds"));
    }
}
