//! Canonicalization: a gated unit becomes `Action + Object (+Time)`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use dnav_core::text::{capitalize, phrase_regex, squash_whitespace, truncate_verbatim, TokenNormalizer};
use dnav_core::{CanonicalForm, ExtractionConfig, Lexicon};

use crate::timecue::TimeCueExtractor;

/// Auxiliaries stripped after a subject ("The company will", "We plan to").
const AUXILIARIES: &str = r"is planning to|are planning to|remains on track to|is on track to|on track to|is set to|are set to|is committed to|committed to|decided to|continues to|continue to|plans to|plan to|planned to|intends to|intend to|intended to|expects to|expect to|expected to|aims to|aim to|targets to|will|shall|would|is|are|was|were|has|have|had|already|also|currently|now|successfully|recently|formally|officially|to|be";

/// Words dropped when they dangle before a removed time phrase or end the object.
const DANGLING: &[&str] = &[
    "in", "by", "during", "from", "through", "until", "before", "after", "within", "for", "over",
    "of", "at", "on", "starting", "beginning", "early", "late", "mid", "the", "end", "around",
    "as", "to", "and", "later", "approximately", "roughly",
];

/// Boundaries used to shorten an object phrase that does not fit the title.
const CLAUSE_BOUNDARIES: &[&str] = &[
    " and ", " including ", " which ", " that ", " while ", " with ", " as well as ",
];

static TRAILING_CLAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;](?:\s|$)").expect("clause regex"));
static PARENTHETICAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("parenthetical regex"));

/// Maps an admitted unit to its normalized title and clustering keys.
pub struct Canonicalizer {
    normalizer: TokenNormalizer,
    verb_re: Regex,
    verb_forms: HashMap<String, &'static str>,
    subject_re: Option<Regex>,
    object_keys: Vec<(Regex, &'static str)>,
    noun_forms: HashMap<&'static str, &'static str>,
    timecues: TimeCueExtractor,
    max_title_chars: usize,
}

impl Canonicalizer {
    pub fn new(lexicon: &'static Lexicon, config: &ExtractionConfig) -> Self {
        let mut verb_forms = HashMap::new();
        for verb in lexicon.action_verbs {
            for form in verb.forms() {
                verb_forms.insert(form, verb.canonical);
            }
        }
        let forms: Vec<&str> = verb_forms.keys().map(String::as_str).collect();
        let verb_re = phrase_regex(&forms, true);

        let subject_re = if lexicon.subject_prefixes.is_empty() {
            None
        } else {
            let subjects = lexicon.subject_prefixes.join("|");
            Regex::new(&format!(
                r"^\s*(?:{subjects})(?:'s)?\s+(?:(?i:{AUXILIARIES})\s+)+"
            ))
            .ok()
        };

        let object_keys = lexicon
            .object_keys
            .iter()
            .filter_map(|(pattern, key)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (re, *key))
            })
            .collect();

        Self {
            normalizer: TokenNormalizer::new(lexicon),
            verb_re,
            verb_forms,
            subject_re,
            object_keys,
            noun_forms: lexicon.noun_forms.iter().copied().collect(),
            timecues: TimeCueExtractor,
            max_title_chars: config.max_title_chars,
        }
    }

    pub fn canonicalize(&self, text: &str) -> CanonicalForm {
        let sentence = text
            .trim()
            .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ';' | ':'));
        let cues = self.timecues.find_all(sentence);
        let best_cue = self.timecues.best(&cues).cloned();

        let body = match &self.subject_re {
            Some(re) => match re.find(sentence) {
                Some(m) => &sentence[m.end()..],
                None => sentence,
            },
            None => sentence,
        };

        let (action_verb, rest) = match self.verb_re.find(body) {
            Some(m) => {
                let form = m.as_str().to_lowercase();
                let canonical = self.verb_forms.get(&form).copied().unwrap_or("act");
                (canonical.to_string(), &body[m.end()..])
            }
            None => fallback_verb(body),
        };

        let object_phrase = self.object_phrase(rest);
        let object_key = self.object_key(&object_phrase);

        let verb_display = capitalize(&action_verb);
        let suffix = best_cue
            .as_ref()
            .map(|c| format!(" ({})", c.text))
            .unwrap_or_default();
        let budget = self
            .max_title_chars
            .saturating_sub(verb_display.chars().count() + 1 + suffix.chars().count());
        let fitted = fit_object(&object_phrase, budget);
        let title = if fitted.is_empty() {
            format!("{verb_display}{suffix}")
        } else {
            format!("{verb_display} {fitted}{suffix}")
        };

        CanonicalForm {
            title,
            action_verb,
            object_phrase,
            object_key,
            time_bucket: best_cue.as_ref().and_then(|c| c.bucket.clone()),
            time_cue: best_cue,
        }
    }

    /// Text after the verb, minus a leading "to", trailing clauses and time phrases.
    fn object_phrase(&self, rest: &str) -> String {
        let mut object = rest.trim_start();
        if let Some(stripped) = object
            .strip_prefix("to ")
            .or_else(|| object.strip_prefix("To "))
        {
            object = stripped;
        }
        if let Some(m) = TRAILING_CLAUSE_RE.find(object) {
            object = &object[..m.start()];
        }

        let mut out = String::new();
        let mut last = 0;
        for cue in self.timecues.find_all(object) {
            out.push_str(&object[last..cue.start]);
            trim_dangling(&mut out);
            out.push(' ');
            last = cue.start + cue.text.len();
        }
        out.push_str(&object[last..]);

        let mut out = squash_whitespace(&out);
        trim_dangling(&mut out);
        let out = out.trim_matches(|c: char| !(c.is_alphanumeric() || c == ')' || c == '%'));
        self.normalize_nouns(out)
    }

    fn normalize_nouns(&self, phrase: &str) -> String {
        phrase
            .split(' ')
            .map(|word| {
                let core = word.trim_matches(|c: char| !(c.is_alphanumeric() || c == '&'));
                match self.noun_forms.get(core.to_lowercase().as_str()) {
                    Some(display) if !core.is_empty() => word.replacen(core, display, 1),
                    _ => word.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Curated key when a domain term is present, else the first two content tokens.
    fn object_key(&self, object_phrase: &str) -> String {
        if let Some((_, key)) = self.object_keys.iter().find(|(re, _)| re.is_match(object_phrase)) {
            return (*key).to_string();
        }
        let tokens = self.normalizer.token_list(object_phrase);
        if tokens.is_empty() {
            return "general".to_string();
        }
        tokens.into_iter().take(2).collect::<Vec<_>>().join("-")
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(Lexicon::standard(), &ExtractionConfig::default())
    }
}

/// No known action verb: the first word of the body stands in for it.
fn fallback_verb(body: &str) -> (String, &str) {
    let body = body.trim_start();
    match body.split_once(' ') {
        Some((word, rest)) => (word.to_lowercase(), rest),
        None => (body.to_lowercase(), ""),
    }
}

fn trim_dangling(s: &mut String) {
    loop {
        let trimmed_len = s.trim_end().len();
        s.truncate(trimmed_len);
        let last_word_start = s.rfind(' ').map_or(0, |i| i + 1);
        let last = s[last_word_start..].to_lowercase();
        if !last.is_empty() && DANGLING.contains(&last.as_str()) {
            s.truncate(last_word_start);
        } else {
            break;
        }
    }
}

/// Shorten an object phrase to `budget` chars: drop parentheticals, then cut
/// at the first clause boundary, then truncate at a word boundary.
fn fit_object(object: &str, budget: usize) -> String {
    if object.chars().count() <= budget {
        return object.to_string();
    }
    let without_parens = squash_whitespace(&PARENTHETICAL_RE.replace_all(object, ""));
    if without_parens.chars().count() <= budget {
        return without_parens;
    }
    let clause_cut = CLAUSE_BOUNDARIES
        .iter()
        .filter_map(|b| without_parens.find(b))
        .filter(|i| *i > 0)
        .min()
        .map(|i| without_parens[..i].to_string());
    if let Some(cut) = clause_cut {
        if cut.chars().count() <= budget {
            return cut;
        }
    }
    truncate_verbatim(&without_parens, budget).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon() -> Canonicalizer {
        Canonicalizer::default()
    }

    #[test]
    fn test_volume_production_title() {
        let f = canon().canonicalize("Tesla will begin volume production of the new platform in Q2 2026.");
        assert_eq!(f.title, "Begin volume production of the new platform (Q2 2026)");
        assert_eq!(f.action_verb, "begin");
        assert_eq!(f.time_bucket.as_deref(), Some("2026-Q2"));
        assert_eq!(f.object_key, "volume-production");
    }

    #[test]
    fn test_megafactory_statements_share_key() {
        let c = canon();
        let a = c.canonicalize("We plan to expand Megafactory capacity in 2026.");
        let b = c.canonicalize("The company will expand Megafactory Shanghai capacity by 2026.");
        assert_eq!(a.title, "Expand Megafactory capacity (2026)");
        assert_eq!(b.title, "Expand Megafactory Shanghai capacity (2026)");
        assert_eq!(
            (a.action_verb.as_str(), a.object_key.as_str(), a.time_bucket.as_deref()),
            (b.action_verb.as_str(), b.object_key.as_str(), b.time_bucket.as_deref())
        );
        assert_eq!(a.object_key, "megafactory");
    }

    #[test]
    fn test_synonym_maps_to_canonical_verb() {
        let f = canon().canonicalize("We rolled out the Cybertruck to European customers, starting with Norway.");
        assert_eq!(f.action_verb, "launch");
        assert_eq!(f.title, "Launch the Cybertruck to European customers");
        assert_eq!(f.object_key, "cybertruck");
        assert!(f.time_bucket.is_none());
    }

    #[test]
    fn test_nouns_normalized() {
        let f = canon().canonicalize("We will deploy fsd and ai training clusters at the texas gigafactory.");
        assert!(f.title.contains("FSD"));
        assert!(f.title.contains("AI"));
        assert!(f.title.contains("Gigafactory"));
    }

    #[test]
    fn test_long_title_keeps_verb() {
        let text = "We will build a new cathode refinery (the first of its kind in North America) and a lithium processing plant with integrated recycling and storage for regional suppliers in Q4 2025.";
        let f = canon().canonicalize(text);
        assert!(f.title.starts_with("Build "));
        assert!(f.title.ends_with("(Q4 2025)"));
        assert!(f.title.chars().count() <= 96);
        assert!(!f.title.contains("first of its kind"));
    }

    #[test]
    fn test_fallback_verb_when_unknown() {
        let f = canon().canonicalize("We will prioritize cost discipline across every vehicle program.");
        assert_eq!(f.action_verb, "prioritize");
        assert!(f.title.starts_with("Prioritize cost discipline"));
    }

    #[test]
    fn test_relative_time_suffix_without_bucket() {
        let f = canon().canonicalize("The company will open a new service center next quarter.");
        assert_eq!(f.title, "Open a new service center (next quarter)");
        assert!(f.time_bucket.is_none());
        assert!(f.time_cue.is_some());
    }
}
