//! Extraction and refinement calls against the configured model.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use dnav_core::text::clamp_with_ellipsis;
use dnav_core::{Category, DecisionCandidate, ExtractionConfig, PageSnippets};

use crate::config::LLMConfig;
use crate::error::AugmentError;
use crate::json::{parse_model_json, parse_repaired, ParseOutcome};
use crate::normalize::normalize_candidate;
use crate::prompts::{extraction_prompt, refinement_prompt, repair_prompt, SYSTEM_PROMPT};
use crate::providers::{HttpLlmClient, LlmClient};
use crate::types::{ChatMessage, CommitmentPass, Extraction, KeptCandidate, RefineResponse, Refinement};

/// Runs model calls under the timeout and JSON contract.
#[derive(Clone)]
pub struct Augmentor {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
    per_page_cap: usize,
    min_keep: usize,
    max_title_chars: usize,
}

impl Augmentor {
    pub fn new(client: Arc<dyn LlmClient>, config: &ExtractionConfig) -> Self {
        Self {
            client,
            timeout: config.model_timeout,
            per_page_cap: config.per_page_candidate_cap.max(1),
            min_keep: config.min_keep,
            max_title_chars: config.max_title_chars,
        }
    }

    /// HTTP-backed augmentor for the resolved provider, or `NotConfigured`.
    pub fn from_config(llm: &LLMConfig, config: &ExtractionConfig) -> Result<Self, AugmentError> {
        let selection = llm.resolve_provider().ok_or(AugmentError::NotConfigured)?;
        Ok(Self::new(Arc::new(HttpLlmClient::new(selection)), config))
    }

    pub fn describe(&self) -> String {
        self.client.describe()
    }

    /// Ask the model for candidates of one commitment pass over `pages`.
    pub async fn extract(
        &self,
        pages: &[PageSnippets],
        pass: CommitmentPass,
    ) -> Result<Extraction, AugmentError> {
        if pages.is_empty() {
            return Ok(Extraction::default());
        }
        let value = self
            .call_json(extraction_prompt(pass, pages, self.per_page_cap))
            .await?;

        let items = match &value {
            Value::Array(items) => items,
            Value::Object(_) => value
                .get("candidates")
                .and_then(Value::as_array)
                .ok_or_else(|| AugmentError::Schema("missing `candidates` array".into()))?,
            _ => return Err(AugmentError::Schema("top level is not an object".into())),
        };

        let mut out = Extraction::default();
        let mut per_page: HashMap<u32, usize> = HashMap::new();
        for (idx, item) in items.iter().enumerate() {
            let id = format!("llm-{}-{}", pass, idx + 1);
            match normalize_candidate(item, id, pass, pages, self.max_title_chars) {
                Ok(candidate) => {
                    let count = per_page.entry(candidate.evidence.page).or_default();
                    if *count >= self.per_page_cap {
                        out.dropped += 1;
                        continue;
                    }
                    *count += 1;
                    out.candidates.push(candidate);
                }
                Err(reason) => {
                    debug!("Dropping {} candidate #{}: {:?}", pass, idx + 1, reason);
                    out.dropped += 1;
                }
            }
        }

        info!(
            "Model {} pass: {} candidates, {} dropped",
            pass,
            out.candidates.len(),
            out.dropped
        );
        Ok(out)
    }

    /// Ask the model to refine locally extracted candidates.
    ///
    /// Evidence and page always stay as they were. Output keeps the input
    /// order.
    pub async fn refine(&self, candidates: &[DecisionCandidate]) -> Result<Refinement, AugmentError> {
        if candidates.is_empty() {
            return Ok(Refinement::default());
        }
        let value = self
            .call_json(refinement_prompt(candidates, self.min_keep))
            .await?;
        let response: RefineResponse = serde_json::from_value(value)
            .map_err(|e| AugmentError::Schema(e.to_string()))?;

        let refinement = apply_refinement(candidates, response, self.max_title_chars);
        let required = self.min_keep.min(candidates.len());
        if refinement.candidates.len() < required {
            return Err(AugmentError::Insufficient {
                kept: refinement.candidates.len(),
                required,
            });
        }
        if refinement.unknown_ids > 0 {
            warn!("Refinement referenced {} unknown ids", refinement.unknown_ids);
        }
        info!(
            "Model refinement: kept {}, dropped {}",
            refinement.candidates.len(),
            refinement.dropped
        );
        Ok(refinement)
    }

    /// One call plus at most one repair call, each under the timeout.
    async fn call_json(&self, user_prompt: String) -> Result<Value, AugmentError> {
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt)];
        let raw = self.timed_complete(&messages).await?;

        match parse_model_json(&raw) {
            ParseOutcome::Parsed(v) => Ok(v),
            ParseOutcome::Failed(reason) => Err(AugmentError::Malformed(reason)),
            ParseOutcome::NeedsRepair(broken) => {
                warn!("Model output is not valid JSON; issuing one repair call");
                let repair = vec![
                    ChatMessage::system(SYSTEM_PROMPT),
                    ChatMessage::user(repair_prompt(&broken)),
                ];
                let repaired = self.timed_complete(&repair).await?;
                match parse_repaired(&repaired) {
                    ParseOutcome::Parsed(v) => Ok(v),
                    ParseOutcome::Failed(reason) | ParseOutcome::NeedsRepair(reason) => {
                        Err(AugmentError::Malformed(reason))
                    }
                }
            }
        }
    }

    async fn timed_complete(&self, messages: &[ChatMessage]) -> Result<String, AugmentError> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.client.complete(messages)).await;
        let elapsed = started.elapsed();
        match result {
            Ok(Ok(text)) => {
                info!(
                    "Model call {} ok in {}ms ({} chars)",
                    self.client.describe(),
                    elapsed.as_millis(),
                    text.len()
                );
                Ok(text)
            }
            Ok(Err(e)) => {
                warn!(
                    "Model call {} failed in {}ms: {}",
                    self.client.describe(),
                    elapsed.as_millis(),
                    e
                );
                Err(e)
            }
            Err(_) => {
                warn!(
                    "Model call {} timed out after {}ms",
                    self.client.describe(),
                    elapsed.as_millis()
                );
                Err(AugmentError::Timeout(self.timeout))
            }
        }
    }
}

/// Apply a refinement response to `input`, discarding ids the input lacks.
fn apply_refinement(
    input: &[DecisionCandidate],
    response: RefineResponse,
    max_title_chars: usize,
) -> Refinement {
    let index: HashMap<&str, usize> = input
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        .collect();

    let mut unknown_ids = 0;
    let mut keepers: HashMap<usize, DecisionCandidate> = HashMap::new();
    let mut merged_away: HashSet<usize> = HashSet::new();

    for kept in response.kept_candidates {
        let Some(&idx) = index.get(kept.id.as_str()) else {
            unknown_ids += 1;
            continue;
        };
        if keepers.contains_key(&idx) || merged_away.contains(&idx) {
            continue;
        }
        let mut candidate = input[idx].clone();
        for merged_id in &kept.merged_from_ids {
            match index.get(merged_id.as_str()) {
                Some(&m) if m != idx => {
                    if merged_away.insert(m) {
                        fold_tags(&mut candidate.tags, &input[m].tags);
                    }
                }
                Some(_) => {}
                None => unknown_ids += 1,
            }
        }
        apply_kept(&mut candidate, &kept, max_title_chars);
        keepers.insert(idx, candidate);
    }

    unknown_ids += response
        .drop_ids
        .iter()
        .filter(|id| !index.contains_key(id.as_str()))
        .count();

    let candidates: Vec<DecisionCandidate> = (0..input.len())
        .filter(|i| !merged_away.contains(i))
        .filter_map(|i| keepers.remove(&i))
        .collect();

    Refinement {
        dropped: input.len() - candidates.len(),
        candidates,
        unknown_ids,
        notes: response.notes.filter(|n| !n.trim().is_empty()),
    }
}

fn apply_kept(candidate: &mut DecisionCandidate, kept: &KeptCandidate, max_title_chars: usize) {
    let non_empty = |s: &Option<String>| {
        s.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    if let Some(decision) = non_empty(&kept.rewritten_decision) {
        candidate.decision = decision;
    }
    if let Some(reason) = non_empty(&kept.reason_keep) {
        candidate.rationale = reason;
    }
    if let Some(title) = non_empty(&kept.title) {
        candidate.title = clamp_with_ellipsis(&title, max_title_chars);
    }
    // Unknown category names leave the local category in place.
    if let Some(name) = non_empty(&kept.category) {
        let parsed = Category::parse_or_other(&name);
        if parsed != Category::Other || name.eq_ignore_ascii_case("other") {
            candidate.category = parsed;
        }
    }
    let tags: Vec<String> = kept.tags.iter().map(|t| t.trim().to_lowercase()).collect();
    fold_tags(&mut candidate.tags, &tags);
}

fn fold_tags(into: &mut Vec<String>, from: &[String]) {
    for tag in from {
        if !tag.is_empty() && !into.contains(tag) {
            into.push(tag.clone());
        }
    }
}
