//! Page selection for the primary and secondary passes, and the per-page
//! snippets handed to the external model.

use std::collections::BTreeMap;

use dnav_core::{ExtractionConfig, PageSnippets, RawCandidate};

/// Pages chosen for each pass, both in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    pub primary: Vec<u32>,
    pub secondary: Vec<u32>,
}

#[derive(Debug, Default, Clone, Copy)]
struct PageStats {
    admitted: usize,
    non_noise: usize,
}

#[derive(Debug, Clone)]
pub struct PageSelector {
    primary_limit: usize,
    secondary_limit: usize,
    snippets_per_page: usize,
}

impl PageSelector {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            primary_limit: config.primary_page_limit,
            secondary_limit: config.secondary_page_limit,
            snippets_per_page: config.snippets_per_page,
        }
    }

    /// Rank pages by admitted-unit count. The primary set is the top pages with
    /// at least one admitted unit; the secondary set is every other page that
    /// has a non-noise unit.
    pub fn select(&self, candidates: &[RawCandidate]) -> PageSelection {
        let mut stats: BTreeMap<u32, PageStats> = BTreeMap::new();
        for c in candidates {
            let s = stats.entry(c.page).or_default();
            if c.gate.bin.is_admitted() {
                s.admitted += 1;
            }
            if !c.is_table_noise {
                s.non_noise += 1;
            }
        }

        let mut ranked: Vec<(u32, usize)> = stats
            .iter()
            .filter(|(_, s)| s.admitted > 0)
            .map(|(page, s)| (*page, s.admitted))
            .collect();
        // Stable sort keeps earlier pages first among equal counts.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let mut primary: Vec<u32> = ranked
            .into_iter()
            .take(self.primary_limit)
            .map(|(page, _)| page)
            .collect();
        primary.sort_unstable();

        let secondary = stats
            .iter()
            .filter(|(page, s)| s.non_noise > 0 && !primary.contains(page))
            .map(|(page, _)| *page)
            .take(self.secondary_limit)
            .collect();

        PageSelection { primary, secondary }
    }

    /// Up to `snippets_per_page` of the highest-scoring non-noise units of
    /// each selected page, in unit order. Pages without any are left out.
    pub fn snippets(&self, candidates: &[RawCandidate], pages: &[u32]) -> Vec<PageSnippets> {
        pages
            .iter()
            .filter_map(|&page| {
                let mut units: Vec<(usize, &RawCandidate)> = candidates
                    .iter()
                    .filter(|c| c.page == page && !c.is_table_noise)
                    .enumerate()
                    .collect();
                if units.is_empty() {
                    return None;
                }
                units.sort_by(|(_, a), (_, b)| b.extraction_score.total_cmp(&a.extraction_score));
                units.truncate(self.snippets_per_page);
                units.sort_by_key(|(i, _)| *i);
                Some(PageSnippets {
                    page,
                    snippets: units.into_iter().map(|(_, c)| c.raw_text.clone()).collect(),
                })
            })
            .collect()
    }
}

impl Default for PageSelector {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}
