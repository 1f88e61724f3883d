//! End-to-end extraction run: ingest every page, select pages, run the
//! strategy over the primary selection, fall back to the secondary
//! selection when the primary pass finds nothing, then rank and cap.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use dnav_augment::{Augmentor, LLMConfig};
use dnav_core::{
    DecisionCandidate, DocSummary, Document, ExtractionConfig, ExtractionMeta, ExtractionMode,
    ExtractionOutput, Lexicon, RawCandidate, Strength, Warnings,
};
use dnav_ingest::{BinCounts, Ingester, PageSelector};

use crate::strategy::{
    ExtractionStrategy, LocalHeuristic, ModelExtraction, ModelRefinement, PassInput, PassOutput,
};

/// Owns the three strategies and runs one request through the selected one.
pub struct Extractor {
    config: ExtractionConfig,
    ingester: Arc<Ingester>,
    selector: PageSelector,
    local: Arc<LocalHeuristic>,
    extraction: ModelExtraction,
    refinement: ModelRefinement,
    model: Option<String>,
}

impl Extractor {
    /// `augmentor` is `None` when no model is configured; model modes then
    /// run locally with a warning.
    pub fn new(config: ExtractionConfig, augmentor: Option<Augmentor>) -> Self {
        let lexicon = Lexicon::standard();
        let ingester = Arc::new(Ingester::new(lexicon, &config));
        let local = Arc::new(LocalHeuristic::new(ingester.clone(), lexicon, &config));
        let model = augmentor.as_ref().map(Augmentor::describe);
        Self {
            selector: PageSelector::new(&config),
            extraction: ModelExtraction::new(local.clone(), augmentor.clone(), &config),
            refinement: ModelRefinement::new(local.clone(), augmentor),
            local,
            ingester,
            config,
            model,
        }
    }

    /// Extractor over the HTTP provider resolved from `llm`, if any.
    pub fn from_llm_config(config: ExtractionConfig, llm: &LLMConfig) -> Self {
        let augmentor = Augmentor::from_config(llm, &config).ok();
        Self::new(config, augmentor)
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// `provider/model` of the configured augmentor.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn strategy(&self, mode: ExtractionMode) -> &dyn ExtractionStrategy {
        match mode {
            ExtractionMode::Local => self.local.as_ref(),
            ExtractionMode::Extract => &self.extraction,
            ExtractionMode::Refine => &self.refinement,
        }
    }

    /// Run one extraction. Never fails: degraded results carry warnings.
    pub async fn extract(&self, doc: &Document, mode: Option<ExtractionMode>) -> ExtractionOutput {
        let started = Instant::now();
        let mode = mode.unwrap_or(self.config.default_mode);
        let strategy = self.strategy(mode);
        let total_chars = doc.total_chars();
        info!(
            doc = %doc.name,
            pages = doc.pages.len(),
            chars = total_chars,
            %mode,
            "Extraction accepted"
        );

        let all_pages: Vec<u32> = doc.pages.iter().map(|p| p.page).collect();
        let raw = self.ingester.ingest_pages(doc, &all_pages);
        let counts = BinCounts::tally(&raw);
        let selection = self.selector.select(&raw);
        info!(
            units = raw.len(),
            admitted = counts.admitted(),
            evidence_only = counts.evidence_only,
            rejected = counts.rejected,
            primary = selection.primary.len(),
            secondary = selection.secondary.len(),
            "Pages selected"
        );

        let mut warnings = Warnings::default();
        let mut output = self.run_pass(strategy, doc, &raw, &selection.primary).await;
        warnings.extend(std::mem::take(&mut output.warnings));

        if output.candidates.is_empty() && !selection.secondary.is_empty() {
            warn!(
                "Primary pass found no candidates; running secondary pass over {} pages",
                selection.secondary.len()
            );
            let mut secondary = self.run_pass(strategy, doc, &raw, &selection.secondary).await;
            warnings.extend(std::mem::take(&mut secondary.warnings));
            output.candidates = secondary.candidates;
        }

        let candidates = rank_and_cap(output.candidates, self.config.max_candidates);
        info!(
            doc = %doc.name,
            candidates = candidates.len(),
            warnings = warnings.as_slice().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extraction finished"
        );

        ExtractionOutput {
            doc: DocSummary {
                name: doc.name.clone(),
                page_count: doc.page_count,
            },
            candidates,
            meta: ExtractionMeta {
                pages_received: doc.pages.len(),
                total_chars,
                mode: strategy.mode(),
                warnings: warnings.into_option(),
            },
        }
    }

    async fn run_pass(
        &self,
        strategy: &dyn ExtractionStrategy,
        doc: &Document,
        raw: &[RawCandidate],
        pages: &[u32],
    ) -> PassOutput {
        if pages.is_empty() {
            return PassOutput::default();
        }
        let pass_raw: Vec<RawCandidate> = raw
            .iter()
            .filter(|r| pages.contains(&r.page))
            .cloned()
            .collect();
        strategy
            .run(PassInput {
                doc,
                pages,
                raw: &pass_raw,
            })
            .await
    }
}

/// Hard before soft, then higher confidence, then earlier page; stable.
pub fn rank_and_cap(mut candidates: Vec<DecisionCandidate>, max: usize) -> Vec<DecisionCandidate> {
    let strength_rank = |s: Strength| match s {
        Strength::Hard => 0,
        Strength::Soft => 1,
    };
    candidates.sort_by(|a, b| {
        strength_rank(a.strength)
            .cmp(&strength_rank(b.strength))
            .then_with(|| {
                b.constraints
                    .confidence
                    .score
                    .cmp(&a.constraints.confidence.score)
            })
            .then_with(|| a.evidence.page.cmp(&b.evidence.page))
    });
    candidates.truncate(max);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use dnav_augment::{AugmentError, ChatMessage, LlmClient};
    use dnav_core::PageText;

    struct Fixed(String);

    #[async_trait]
    impl LlmClient for Fixed {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, AugmentError> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fake/fixed".into()
        }
    }

    struct Slow;

    #[async_trait]
    impl LlmClient for Slow {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, AugmentError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".into())
        }

        fn describe(&self) -> String {
            "fake/slow".into()
        }
    }

    fn doc(pages: &[(u32, &str)]) -> Document {
        Document::new(
            "q2-letter.pdf",
            pages.len() as u32,
            pages
                .iter()
                .map(|(page, text)| PageText {
                    page: *page,
                    text: text.to_string(),
                })
                .collect(),
        )
    }

    fn letter() -> Document {
        doc(&[
            (1, "Revenue grew 12% year-over-year to $25.2B."),
            (
                2,
                "Tesla will begin volume production of the new platform in Q2 2026.\n\
                 We plan to expand Megafactory capacity in 2026.",
            ),
            (3, "12,450 18,200 9,330 4,120"),
            (
                4,
                "The company will expand Megafactory Shanghai capacity by 2026.\n\
                 We aim to open a new distribution facility in Texas next quarter.",
            ),
        ])
    }

    #[tokio::test]
    async fn test_local_run() {
        let extractor = Extractor::new(ExtractionConfig::default(), None);
        let d = letter();
        let out = extractor.extract(&d, None).await;

        assert_eq!(out.doc.name, "q2-letter.pdf");
        assert_eq!(out.doc.page_count, 4);
        assert_eq!(out.meta.pages_received, 4);
        assert_eq!(out.meta.total_chars, d.total_chars());
        assert_eq!(out.meta.mode, ExtractionMode::Local);
        assert!(out.meta.warnings.is_none());

        // Megafactory statements on pages 2 and 4 merge into one decision.
        assert_eq!(out.candidates.len(), 3);
        let mega = out
            .candidates
            .iter()
            .filter(|c| c.title.contains("Megafactory"))
            .count();
        assert_eq!(mega, 1);
        assert_eq!(out.candidates[0].strength, Strength::Hard);
        assert_eq!(out.candidates.last().map(|c| c.strength), Some(Strength::Soft));

        for c in &out.candidates {
            assert!(c.evidence.quote.chars().count() <= 280);
            let page = d.page_text(c.evidence.page).unwrap();
            assert!(page.contains(&c.evidence.quote));
        }
    }

    #[tokio::test]
    async fn test_model_timeout_degrades_to_local() {
        let config = ExtractionConfig {
            model_timeout: Duration::from_millis(30),
            ..ExtractionConfig::default()
        };
        let augmentor = Augmentor::new(Arc::new(Slow), &config);
        let extractor = Extractor::new(config, Some(augmentor));
        assert_eq!(extractor.model(), Some("fake/slow"));

        let local = Extractor::new(ExtractionConfig::default(), None)
            .extract(&letter(), Some(ExtractionMode::Local))
            .await;
        let out = extractor
            .extract(&letter(), Some(ExtractionMode::Extract))
            .await;

        assert_eq!(out.meta.mode, ExtractionMode::Extract);
        let titles = |o: &ExtractionOutput| -> Vec<String> {
            o.candidates.iter().map(|c| c.title.clone()).collect()
        };
        assert_eq!(titles(&out), titles(&local));
        let warnings = out.meta.warnings.unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("timeout"));
    }

    #[tokio::test]
    async fn test_missing_key_warns_once() {
        let extractor = Extractor::new(ExtractionConfig::default(), None);
        let out = extractor
            .extract(&letter(), Some(ExtractionMode::Refine))
            .await;
        assert_eq!(out.candidates.len(), 3);
        assert_eq!(
            out.meta.warnings,
            Some(vec![AugmentError::NotConfigured.to_string()])
        );
    }

    #[tokio::test]
    async fn test_secondary_pass_when_primary_empty() {
        // Nothing passes the gate, so the primary selection is empty and the
        // model sees the secondary pages.
        let reply = r#"{"candidates": [{"title": "Review the plan of record", "strength": "soft",
            "evidence": {"page": 1, "quote": "The board met in Austin to review the quarterly plan of record."}}]}"#;
        let config = ExtractionConfig::default();
        let augmentor = Augmentor::new(Arc::new(Fixed(reply.to_string())), &config);
        let d = doc(&[
            (1, "The board met in Austin to review the quarterly plan of record."),
            (2, "Revenue grew 12% year-over-year to $25.2B."),
        ]);

        let local = Extractor::new(config.clone(), None).extract(&d, None).await;
        assert!(local.candidates.is_empty());
        assert!(local.meta.warnings.is_none());

        let out = Extractor::new(config, Some(augmentor))
            .extract(&d, Some(ExtractionMode::Extract))
            .await;
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].evidence.page, 1);
        assert!(out.meta.warnings.is_none());
    }

    #[test]
    fn test_rank_and_cap() {
        use dnav_core::{CandidateEvidence, Category, ConstraintScore, Constraints};
        let cand = |id: &str, strength, confidence, page| {
            let s = |n| ConstraintScore::new(n, "");
            DecisionCandidate {
                id: id.into(),
                title: id.into(),
                strength,
                category: Category::Other,
                decision: id.into(),
                rationale: String::new(),
                constraints: Constraints {
                    impact: s(5),
                    cost: s(5),
                    risk: s(5),
                    urgency: s(5),
                    confidence: s(confidence),
                },
                evidence: CandidateEvidence {
                    page,
                    quote: String::new(),
                    location_hint: None,
                },
                tags: vec![],
            }
        };
        let ranked = rank_and_cap(
            vec![
                cand("soft-high", Strength::Soft, 9, 1),
                cand("hard-low-p5", Strength::Hard, 6, 5),
                cand("hard-high", Strength::Hard, 9, 7),
                cand("hard-low-p2", Strength::Hard, 6, 2),
            ],
            3,
        );
        let ids: Vec<&str> = ranked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["hard-high", "hard-low-p2", "hard-low-p5"]);
    }
}
