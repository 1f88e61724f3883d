//! The three interchangeable extraction strategies.
//!
//! All of them share the local core (ingester, clusterer, scorer, merge
//! resolver). The model strategies start from the local result and only
//! replace or extend it when the external call succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use dnav_augment::normalize::UNVERIFIED_QUOTE_TAG;
use dnav_augment::{AugmentError, Augmentor, CommitmentPass};
use dnav_consolidate::{Clusterer, MergeResolver, MergeScope};
use dnav_core::{
    DecisionCandidate, Document, ExtractionConfig, ExtractionMode, Lexicon, RawCandidate, Warnings,
};
use dnav_ingest::{Ingester, PageSelector};

use crate::scoring::CandidateScorer;

/// One pass over a page selection.
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    pub doc: &'a Document,
    pub pages: &'a [u32],
    /// Gated units of `pages`, in page then unit order.
    pub raw: &'a [RawCandidate],
}

#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    pub candidates: Vec<DecisionCandidate>,
    pub warnings: Warnings,
}

impl PassOutput {
    fn local(candidates: Vec<DecisionCandidate>) -> Self {
        Self {
            candidates,
            warnings: Warnings::default(),
        }
    }
}

#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn mode(&self) -> ExtractionMode;

    /// Never fails: external problems come back as warnings.
    async fn run(&self, input: PassInput<'_>) -> PassOutput;
}

/// Heuristic pipeline only.
pub struct LocalHeuristic {
    ingester: Arc<Ingester>,
    clusterer: Clusterer,
    scorer: CandidateScorer,
    resolver: MergeResolver,
}

impl LocalHeuristic {
    pub fn new(ingester: Arc<Ingester>, lexicon: &'static Lexicon, config: &ExtractionConfig) -> Self {
        Self {
            ingester,
            clusterer: Clusterer::new(lexicon, config),
            scorer: CandidateScorer::new(lexicon),
            resolver: MergeResolver::new(lexicon, config.local_merge_similarity),
        }
    }

    /// Canonicalize, cluster, score and dedupe the pass's units.
    pub fn candidates(&self, input: &PassInput<'_>) -> Vec<DecisionCandidate> {
        let units = self.ingester.canonicalize(input.raw);
        let clustering = self.clusterer.cluster(&units);
        let by_id: HashMap<&str, &RawCandidate> =
            input.raw.iter().map(|r| (r.id.as_str(), r)).collect();

        let scored: Vec<DecisionCandidate> = clustering
            .decisions
            .iter()
            .filter_map(|d| {
                by_id
                    .get(d.representative_id.as_str())
                    .map(|rep| self.scorer.score(d, rep))
            })
            .collect();
        let candidates = self.resolver.dedupe(scored);
        debug!(
            units = units.len(),
            decisions = clustering.decisions.len(),
            candidates = candidates.len(),
            "Local pass"
        );
        candidates
    }
}

#[async_trait]
impl ExtractionStrategy for LocalHeuristic {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Local
    }

    async fn run(&self, input: PassInput<'_>) -> PassOutput {
        PassOutput::local(self.candidates(&input))
    }
}

/// Page snippets go to the model for a hard and a soft pass, issued
/// concurrently; the results are merged with the local candidates.
pub struct ModelExtraction {
    local: Arc<LocalHeuristic>,
    augmentor: Option<Augmentor>,
    selector: PageSelector,
    model_resolver: MergeResolver,
    cross_resolver: MergeResolver,
}

impl ModelExtraction {
    pub fn new(
        local: Arc<LocalHeuristic>,
        augmentor: Option<Augmentor>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            local,
            augmentor,
            selector: PageSelector::new(config),
            model_resolver: MergeResolver::for_scope(MergeScope::Local, config),
            cross_resolver: MergeResolver::for_scope(MergeScope::Cross, config),
        }
    }
}

#[async_trait]
impl ExtractionStrategy for ModelExtraction {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Extract
    }

    async fn run(&self, input: PassInput<'_>) -> PassOutput {
        let mut out = PassOutput::local(self.local.candidates(&input));
        let Some(augmentor) = &self.augmentor else {
            out.warnings.push(AugmentError::NotConfigured.to_string());
            return out;
        };

        let snippets = self.selector.snippets(input.raw, input.pages);
        if snippets.is_empty() {
            debug!("No snippets for pages {:?}; skipping model extraction", input.pages);
            return out;
        }

        let (hard, soft) = futures::join!(
            augmentor.extract(&snippets, CommitmentPass::Hard),
            augmentor.extract(&snippets, CommitmentPass::Soft),
        );

        let mut model = Vec::new();
        for result in [hard, soft] {
            match result {
                Ok(extraction) => model.extend(extraction.candidates),
                Err(e) => out.warnings.push(e.to_string()),
            }
        }
        if model.is_empty() {
            return out;
        }

        let unverified = verify_quotes(input.doc, &mut model);
        if unverified > 0 {
            warn!("{} model quotes not found in their cited page", unverified);
            out.warnings.push(format!(
                "{unverified} model quote(s) could not be verified against the page text"
            ));
        }

        let model = self.model_resolver.dedupe(model);
        let local_count = out.candidates.len();
        let model_count = model.len();
        out.candidates = self
            .cross_resolver
            .merge_into(std::mem::take(&mut out.candidates), model);
        info!(
            local = local_count,
            model = model_count,
            merged = out.candidates.len(),
            "Model extraction merged"
        );
        out
    }
}

/// Local candidates go to the model, which keeps, rewrites and merges them.
pub struct ModelRefinement {
    local: Arc<LocalHeuristic>,
    augmentor: Option<Augmentor>,
}

impl ModelRefinement {
    pub fn new(local: Arc<LocalHeuristic>, augmentor: Option<Augmentor>) -> Self {
        Self { local, augmentor }
    }
}

#[async_trait]
impl ExtractionStrategy for ModelRefinement {
    fn mode(&self) -> ExtractionMode {
        ExtractionMode::Refine
    }

    async fn run(&self, input: PassInput<'_>) -> PassOutput {
        let mut out = PassOutput::local(self.local.candidates(&input));
        let Some(augmentor) = &self.augmentor else {
            out.warnings.push(AugmentError::NotConfigured.to_string());
            return out;
        };
        if out.candidates.is_empty() {
            return out;
        }

        match augmentor.refine(&out.candidates).await {
            Ok(refinement) => {
                if refinement.unknown_ids > 0 {
                    out.warnings.push(format!(
                        "Refinement referenced {} unknown candidate id(s); ignored",
                        refinement.unknown_ids
                    ));
                }
                out.candidates = refinement.candidates;
            }
            Err(e) => out.warnings.push(e.to_string()),
        }
        out
    }
}

/// Tag model candidates whose quote does not occur in the page they cite.
/// Returns how many were tagged.
pub fn verify_quotes(doc: &Document, candidates: &mut [DecisionCandidate]) -> usize {
    let mut unverified = 0;
    for c in candidates.iter_mut() {
        let found = doc
            .page_text(c.evidence.page)
            .is_some_and(|text| quote_in_text(&c.evidence.quote, text));
        if !found {
            unverified += 1;
            if !c.tags.iter().any(|t| t == UNVERIFIED_QUOTE_TAG) {
                c.tags.push(UNVERIFIED_QUOTE_TAG.to_string());
            }
        }
    }
    unverified
}

/// Whitespace- and case-insensitive containment. A quote clamped with an
/// ellipsis is checked without it.
fn quote_in_text(quote: &str, text: &str) -> bool {
    let squash = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let needle = squash(quote.trim_end_matches('…'));
    !needle.is_empty() && squash(text).contains(&needle)
}
