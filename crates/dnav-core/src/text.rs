//! Tokenization, similarity and truncation helpers.

use std::collections::{BTreeSet, HashMap};

use regex::{Regex, RegexBuilder};

use crate::lexicon::Lexicon;

/// Compile a word-bounded alternation of literal phrases.
///
/// Longer phrases are tried first so `plan to` wins over `plan`.
pub fn phrase_regex(phrases: &[&str], case_insensitive: bool) -> Regex {
    let mut sorted: Vec<&str> = phrases.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation = sorted
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(case_insensitive)
        .build()
        .expect("escaped phrase alternation is a valid regex")
}

/// Compile a case-insensitive alternation of regex fragments.
pub fn fragment_regex(fragments: &[&str]) -> Option<Regex> {
    if fragments.is_empty() {
        return None;
    }
    let alternation = fragments
        .iter()
        .map(|f| format!("(?:{f})"))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .ok()
}

/// Lower-cases, strips punctuation, drops stopwords and maps verb synonyms
/// to their canonical verb, producing the token set used for Jaccard similarity.
pub struct TokenNormalizer {
    lexicon: &'static Lexicon,
    phrase_re: Option<Regex>,
    phrase_map: HashMap<String, &'static str>,
    word_map: HashMap<String, &'static str>,
}

impl TokenNormalizer {
    pub fn new(lexicon: &'static Lexicon) -> Self {
        let mut phrase_map = HashMap::new();
        let mut word_map = HashMap::new();
        for verb in lexicon.action_verbs {
            for form in verb.forms() {
                if form.contains(' ') {
                    phrase_map.insert(form, verb.canonical);
                } else {
                    word_map.insert(form, verb.canonical);
                }
            }
        }
        let phrases: Vec<&str> = phrase_map.keys().map(String::as_str).collect();
        let phrase_re = if phrases.is_empty() {
            None
        } else {
            Some(phrase_regex(&phrases, true))
        };
        Self {
            lexicon,
            phrase_re,
            phrase_map,
            word_map,
        }
    }

    pub fn tokens(&self, text: &str) -> BTreeSet<String> {
        self.token_list(text).into_iter().collect()
    }

    /// Normalized tokens in text order (duplicates kept).
    pub fn token_list(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let replaced = match &self.phrase_re {
            Some(re) => re
                .replace_all(&lower, |caps: &regex::Captures| {
                    self.phrase_map
                        .get(&caps[0])
                        .map(|c| (*c).to_string())
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned(),
            None => lower,
        };

        replaced
            .split(|c: char| !(c.is_alphanumeric() || c == '&'))
            .filter(|w| !w.is_empty())
            .filter(|w| !self.lexicon.is_stopword(w))
            .map(|w| {
                self.word_map
                    .get(w)
                    .map(|c| (*c).to_string())
                    .unwrap_or_else(|| w.to_string())
            })
            .collect()
    }

    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        jaccard(&self.tokens(a), &self.tokens(b))
    }
}

/// Jaccard similarity of two token sets; two empty sets are dissimilar.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Lower-case alphanumeric form used for exact title comparison.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Byte index of the char boundary after `max_chars` characters.
fn char_boundary(text: &str, max_chars: usize) -> usize {
    text.char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Prefix of `text` of at most `max_chars` chars, cut at the last word
/// boundary. The result is always a verbatim prefix of `text`.
pub fn truncate_verbatim(text: &str, max_chars: usize) -> &str {
    if text.chars().count() <= max_chars {
        return text;
    }
    let end = char_boundary(text, max_chars);
    let head = &text[..end];
    match head.rfind(char::is_whitespace) {
        Some(ws) if ws > 0 => head[..ws].trim_end(),
        _ => head,
    }
}

/// Trim and clamp to `max_chars` chars, ending in `…` when truncated.
/// Words are never severed unless a single word exceeds the limit.
pub fn clamp_with_ellipsis(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let budget = max_chars.saturating_sub(1);
    let head = truncate_verbatim(text, budget);
    let head = head.trim_end_matches(|c: char| c == ',' || c == ';' || c == ':');
    format!("{head}…")
}

/// First `n` whitespace-separated words.
pub fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// Upper-case the first character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Collapse all whitespace runs to single spaces.
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
