//! Per-page ingestion: segment, gate and anchor every unit, then
//! canonicalize the admitted ones.

use tracing::debug;

use dnav_core::text::truncate_verbatim;
use dnav_core::{
    CanonicalUnit, Document, EvidenceAnchor, ExtractionConfig, Lexicon, PageText, RawCandidate,
    TriageBin, MAX_QUOTE_CHARS,
};

use crate::canonical::Canonicalizer;
use crate::gate::Gate;
use crate::segment::Segmenter;
use crate::timecue::TimeCueExtractor;

/// Bin counts for one ingestion pass, used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinCounts {
    pub decision: usize,
    pub maybe: usize,
    pub evidence_only: usize,
    pub rejected: usize,
}

impl BinCounts {
    pub fn tally(candidates: &[RawCandidate]) -> Self {
        let mut counts = Self::default();
        for c in candidates {
            match c.gate.bin {
                TriageBin::Decision => counts.decision += 1,
                TriageBin::MaybeDecision => counts.maybe += 1,
                TriageBin::EvidenceOnly => counts.evidence_only += 1,
                TriageBin::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    pub fn admitted(&self) -> usize {
        self.decision + self.maybe
    }
}

/// Turns document pages into gated raw candidates and canonical units.
pub struct Ingester {
    segmenter: Segmenter,
    gate: Gate,
    canonicalizer: Canonicalizer,
    timecues: TimeCueExtractor,
}

impl Ingester {
    pub fn new(lexicon: &'static Lexicon, config: &ExtractionConfig) -> Self {
        Self {
            segmenter: Segmenter::new(config),
            gate: Gate::new(lexicon, config),
            canonicalizer: Canonicalizer::new(lexicon, config),
            timecues: TimeCueExtractor,
        }
    }

    /// Every unit of one page, gated, in unit order.
    pub fn ingest_page(&self, doc: &Document, page: &PageText) -> Vec<RawCandidate> {
        self.segmenter
            .segment(&page.text)
            .into_iter()
            .enumerate()
            .map(|(index, segment)| {
                let gate = self.gate.evaluate(&segment.text);
                let excerpt = truncate_verbatim(segment.excerpt(&page.text), MAX_QUOTE_CHARS);
                let date_mentions = self
                    .timecues
                    .find_all(&segment.text)
                    .into_iter()
                    .map(|c| c.text)
                    .collect();
                RawCandidate {
                    id: format!("{}-p{}-u{}", doc.doc_id, page.page, index),
                    doc_id: doc.doc_id.clone(),
                    page: page.page,
                    raw_text: segment.text,
                    context_text: segment.paragraph,
                    section_hint: segment.section_hint,
                    is_table_noise: gate.is_noise,
                    extraction_score: gate.optionality_score,
                    date_mentions,
                    evidence: vec![EvidenceAnchor {
                        doc_id: doc.doc_id.clone(),
                        file_name: doc.name.clone(),
                        page: page.page,
                        excerpt: excerpt.to_string(),
                    }],
                    gate,
                }
            })
            .collect()
    }

    /// Raw candidates for the given pages, in page order then unit order.
    pub fn ingest_pages(&self, doc: &Document, pages: &[u32]) -> Vec<RawCandidate> {
        let candidates: Vec<RawCandidate> = doc
            .pages
            .iter()
            .filter(|p| pages.contains(&p.page))
            .flat_map(|p| self.ingest_page(doc, p))
            .collect();
        let counts = BinCounts::tally(&candidates);
        debug!(
            doc = %doc.name,
            pages = pages.len(),
            units = candidates.len(),
            decision = counts.decision,
            maybe = counts.maybe,
            evidence_only = counts.evidence_only,
            rejected = counts.rejected,
            "Gated units"
        );
        candidates
    }

    /// Canonical forms for the admitted candidates; the rest are skipped.
    pub fn canonicalize(&self, candidates: &[RawCandidate]) -> Vec<CanonicalUnit> {
        candidates
            .iter()
            .filter(|c| c.gate.bin.is_admitted())
            .map(|c| CanonicalUnit {
                form: self.canonicalizer.canonicalize(&c.raw_text),
                candidate: c.clone(),
            })
            .collect()
    }
}

impl Default for Ingester {
    fn default() -> Self {
        Self::new(Lexicon::standard(), &ExtractionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pages: &[(u32, &str)]) -> Document {
        Document::new(
            "q4-update.pdf",
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

    #[test]
    fn test_ids_and_verbatim_evidence() {
        let raw = "Tesla will begin volume production of the new\nplatform in Q2 2026. Revenue grew 12% year-over-year to $25.2B.";
        let d = doc(&[(3, raw)]);
        let ingester = Ingester::default();
        let cands = ingester.ingest_page(&d, &d.pages[0]);
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0].id, format!("{}-p3-u0", d.doc_id));
        assert_eq!(cands[1].id, format!("{}-p3-u1", d.doc_id));
        assert_eq!(cands[0].gate.bin, TriageBin::Decision);
        assert_ne!(cands[1].gate.bin, TriageBin::Decision);
        for c in &cands {
            assert!(raw.contains(&c.evidence[0].excerpt));
            assert!(c.evidence[0].excerpt.chars().count() <= MAX_QUOTE_CHARS);
            assert_eq!(c.evidence[0].file_name, "q4-update.pdf");
        }
        assert!(cands[0].evidence[0].excerpt.contains('\n'));
        assert_eq!(cands[0].date_mentions, vec!["Q2 2026".to_string()]);
    }

    #[test]
    fn test_canonicalize_only_admitted() {
        let d = doc(&[(
            1,
            "We plan to expand Megafactory capacity in 2026. Gross margin was 18.2% in the quarter.",
        )]);
        let ingester = Ingester::default();
        let cands = ingester.ingest_pages(&d, &[1]);
        let units = ingester.canonicalize(&cands);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].form.object_key, "megafactory");
        assert_eq!(units[0].candidate.page, 1);
    }

    #[test]
    fn test_ingest_pages_respects_selection() {
        let d = doc(&[
            (1, "We will open a new service center in Berlin in 2026."),
            (2, "We will hire two thousand engineers for the Austin site in 2025."),
        ]);
        let cands = Ingester::default().ingest_pages(&d, &[2]);
        assert!(!cands.is_empty());
        assert!(cands.iter().all(|c| c.page == 2));
    }

    #[test]
    fn test_bin_counts() {
        let d = doc(&[(1, "We will build a new plant in Texas in 2026. Revenue was $25.2B for the year.")]);
        let cands = Ingester::default().ingest_pages(&d, &[1]);
        let counts = BinCounts::tally(&cands);
        assert_eq!(counts.admitted(), 1);
        assert_eq!(counts.decision + counts.maybe + counts.evidence_only + counts.rejected, 2);
    }
}
