//! Greedy first-fit clustering of canonical units.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use tracing::info;

use dnav_core::text::{jaccard, TokenNormalizer};
use dnav_core::{
    short_hash, CanonicalDecision, CanonicalUnit, EvidenceAnchor, ExtractionConfig, Lexicon,
    MergeSources,
};

use crate::types::{ClusterReport, Clustering};

/// Bonus added to the merge confidence when the cluster has a time bucket.
const TIME_BUCKET_BONUS: f64 = 0.1;

type GroupKey = (String, String, Option<String>);

struct Cluster {
    /// Indices into the unit slice, in input order.
    members: Vec<usize>,
}

/// Groups units by `(verb, object key, time bucket)`, then splits each group
/// into clusters by token-set similarity of their titles.
pub struct Clusterer {
    normalizer: TokenNormalizer,
    join_similarity: f64,
    suggest_floor: f64,
}

impl Clusterer {
    pub fn new(lexicon: &'static Lexicon, config: &ExtractionConfig) -> Self {
        Self {
            normalizer: TokenNormalizer::new(lexicon),
            join_similarity: config.cluster_join_similarity,
            suggest_floor: config.suggest_merge_floor,
        }
    }

    pub fn cluster(&self, units: &[CanonicalUnit]) -> Clustering {
        let tokens: Vec<BTreeSet<String>> = units
            .iter()
            .map(|u| self.normalizer.tokens(&u.form.title))
            .collect();

        // Key groups in order of first appearance.
        let mut group_index: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, unit) in units.iter().enumerate() {
            let key = (
                unit.form.action_verb.clone(),
                unit.form.object_key.clone(),
                unit.form.time_bucket.clone(),
            );
            let g = *group_index.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[g].push(i);
        }

        let mut report = ClusterReport {
            units: units.len(),
            key_groups: groups.len(),
            ..ClusterReport::default()
        };
        let mut decisions: Vec<(usize, CanonicalDecision)> = Vec::new();

        for group in &groups {
            let mut clusters: Vec<Cluster> = Vec::new();
            for &i in group {
                let home = clusters.iter_mut().find(|c| {
                    jaccard(&tokens[c.members[0]], &tokens[i]) >= self.join_similarity
                });
                match home {
                    Some(c) => c.members.push(i),
                    None => clusters.push(Cluster { members: vec![i] }),
                }
            }

            let start = decisions.len();
            let mut reps = Vec::with_capacity(clusters.len());
            for cluster in &clusters {
                let rep = representative(units, &cluster.members);
                reps.push(rep);
                decisions.push((cluster.members[0], self.build(units, &tokens, cluster, rep)));
            }

            // Clusters of the same key that came close to joining.
            for a in 0..clusters.len() {
                for b in (a + 1)..clusters.len() {
                    let sim = jaccard(&tokens[reps[a]], &tokens[reps[b]]);
                    if sim >= self.suggest_floor && sim < self.join_similarity {
                        let id_a = decisions[start + a].1.id.clone();
                        let id_b = decisions[start + b].1.id.clone();
                        suggest(&mut decisions[start + a].1.sources, id_b);
                        suggest(&mut decisions[start + b].1.sources, id_a);
                        report.suggested_pairs += 1;
                    }
                }
            }
        }

        decisions.sort_by_key(|(first, _)| *first);
        let decisions: Vec<CanonicalDecision> = decisions.into_iter().map(|(_, d)| d).collect();
        report.decisions = decisions.len();
        report.merged_decisions = decisions
            .iter()
            .filter(|d| d.sources.candidate_ids.len() > 1)
            .count();

        info!(
            "Clustered {} units into {} decisions ({} merged, {} suggested pairs)",
            report.units, report.decisions, report.merged_decisions, report.suggested_pairs
        );

        Clustering { decisions, report }
    }

    fn build(
        &self,
        units: &[CanonicalUnit],
        tokens: &[BTreeSet<String>],
        cluster: &Cluster,
        rep: usize,
    ) -> CanonicalDecision {
        let first = &units[cluster.members[0]];
        let rep_unit = &units[rep];
        let doc_id = first.candidate.doc_id.clone();

        let (merge_confidence, merge_reason) = if cluster.members.len() == 1 {
            (1.0, vec!["single candidate".to_string()])
        } else {
            let others: Vec<f64> = cluster
                .members
                .iter()
                .filter(|&&m| m != rep)
                .map(|&m| jaccard(&tokens[m], &tokens[rep]))
                .collect();
            let avg = others.iter().sum::<f64>() / others.len() as f64;
            let mut reasons = vec![
                format!(
                    "same key {}/{}",
                    rep_unit.form.action_verb, rep_unit.form.object_key
                ),
                format!("title similarity {avg:.2}"),
            ];
            let mut confidence = avg;
            if let Some(bucket) = &rep_unit.form.time_bucket {
                confidence += TIME_BUCKET_BONUS;
                reasons.push(format!("time bucket {bucket}"));
            }
            (confidence.clamp(0.0, 1.0), reasons)
        };

        let mut evidence: Vec<EvidenceAnchor> = Vec::new();
        for &m in &cluster.members {
            for anchor in &units[m].candidate.evidence {
                let seen = evidence
                    .iter()
                    .any(|e| e.page == anchor.page && e.excerpt == anchor.excerpt);
                if !seen {
                    evidence.push(anchor.clone());
                }
            }
        }

        CanonicalDecision {
            id: format!("cd-{}", short_hash(&format!("{doc_id}{}", first.candidate.id))),
            doc_id,
            title: rep_unit.form.title.clone(),
            action_verb: rep_unit.form.action_verb.clone(),
            object_key: rep_unit.form.object_key.clone(),
            time_bucket: rep_unit.form.time_bucket.clone(),
            evidence,
            sources: MergeSources {
                candidate_ids: cluster
                    .members
                    .iter()
                    .map(|&m| units[m].candidate.id.clone())
                    .collect(),
                merge_confidence,
                merge_reason,
                suggested_merge_ids: None,
            },
            representative_id: rep_unit.candidate.id.clone(),
        }
    }
}

impl Default for Clusterer {
    fn default() -> Self {
        Self::new(Lexicon::standard(), &ExtractionConfig::default())
    }
}

/// Best member: has a time bucket, then shorter title, then higher
/// extraction score. Earlier members win full ties.
fn representative(units: &[CanonicalUnit], members: &[usize]) -> usize {
    let mut best = members[0];
    for &m in &members[1..] {
        if prefer(&units[m], &units[best]) == Ordering::Greater {
            best = m;
        }
    }
    best
}

fn prefer(a: &CanonicalUnit, b: &CanonicalUnit) -> Ordering {
    a.form
        .time_bucket
        .is_some()
        .cmp(&b.form.time_bucket.is_some())
        .then_with(|| {
            b.form
                .title
                .chars()
                .count()
                .cmp(&a.form.title.chars().count())
        })
        .then_with(|| {
            a.candidate
                .extraction_score
                .total_cmp(&b.candidate.extraction_score)
        })
}

fn suggest(sources: &mut MergeSources, id: String) {
    let ids = sources.suggested_merge_ids.get_or_insert_with(Vec::new);
    if !ids.contains(&id) {
        ids.push(id);
    }
}
