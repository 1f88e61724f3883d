//! Page segmentation: raw page text to ordered, bounded-length statement units.
//!
//! Whitespace is collapsed and line-wrapped words are de-hyphenated, but a
//! byte map back to the raw page is kept so every unit can hand out the
//! verbatim raw slice it came from.

use once_cell::sync::Lazy;
use regex::Regex;

use dnav_core::text::truncate_verbatim;
use dnav_core::ExtractionConfig;

/// Longest paragraph text kept as unit context.
const MAX_CONTEXT_CHARS: usize = 600;

static BULLET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[•●▪◦‣·*\-–—]|\(?\d{1,2}[.)]|\(?[a-z][.)])\s+").expect("bullet regex")
});

const ABBREVIATIONS: &[&str] = &[
    "inc", "corp", "co", "ltd", "llc", "no", "vs", "approx", "e.g", "i.e", "u.s", "mr", "ms",
    "dr", "st", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov",
    "dec", "est", "fig",
];

/// Separators that end a unit without sentence punctuation.
const CLAUSE_SEPARATORS: &[&str] = &[" - ", " – ", " — "];

/// Words that, ending a line, mean the next line continues the sentence.
const CONNECTORS: &[&str] = &[
    "and", "or", "the", "of", "to", "in", "by", "for", "with", "a", "an", "our", "its", "on",
    "at", "from", "that", "which",
];

/// One statement unit cut from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Whitespace-normalized unit text.
    pub text: String,
    /// Normalized text of the paragraph the unit belongs to.
    pub paragraph: String,
    /// Byte span of the unit in the raw page text.
    pub raw_start: usize,
    pub raw_end: usize,
    /// Most recent heading seen above the unit.
    pub section_hint: Option<String>,
}

impl Segment {
    /// The verbatim raw slice this unit was drawn from.
    pub fn excerpt<'a>(&self, raw: &'a str) -> &'a str {
        raw.get(self.raw_start..self.raw_end).unwrap_or("")
    }
}

/// Normalized page text plus, for every byte, the raw byte it came from.
struct Normalized {
    text: String,
    map: Vec<usize>,
}

impl Normalized {
    fn push_char(&mut self, c: char, raw_at: usize) {
        for k in 0..c.len_utf8() {
            self.map.push(raw_at + k);
        }
        self.text.push(c);
    }

    fn raw_span(&self, start: usize, end: usize) -> (usize, usize) {
        (self.map[start], self.map[end - 1] + 1)
    }
}

struct Paragraph {
    start: usize,
    end: usize,
    section_hint: Option<String>,
}

/// Splits page text into statement units.
#[derive(Debug, Clone)]
pub struct Segmenter {
    min_chars: usize,
    max_chars: usize,
    chunk_chars: usize,
}

impl Segmenter {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            min_chars: config.min_unit_chars,
            max_chars: config.max_unit_chars,
            chunk_chars: config.hard_chunk_chars.min(config.max_unit_chars),
        }
    }

    /// Segment one page. Identical input always yields the identical list.
    pub fn segment(&self, raw: &str) -> Vec<Segment> {
        let norm = normalize(raw);
        let mut units = Vec::new();

        for para in paragraphs(&norm.text) {
            // Lines are joined with '\n'; a space has the same byte length,
            // so paragraph offsets stay aligned with the byte map.
            let para_text = norm.text[para.start..para.end].replace('\n', " ");
            let context = truncate_verbatim(&para_text, MAX_CONTEXT_CHARS).to_string();

            for (s, e) in sentence_spans(&para_text) {
                for (cs, ce) in self.bound(&para_text, s, e) {
                    let (raw_start, raw_end) = norm.raw_span(para.start + cs, para.start + ce);
                    units.push(Segment {
                        text: para_text[cs..ce].to_string(),
                        paragraph: context.clone(),
                        raw_start,
                        raw_end,
                        section_hint: para.section_hint.clone(),
                    });
                }
            }
        }

        units
    }

    /// Apply the length bounds to one sentence span, chunking it on word
    /// boundaries when it is too long.
    fn bound(&self, text: &str, s: usize, e: usize) -> Vec<(usize, usize)> {
        let len = text[s..e].chars().count();
        let pieces = if len > self.max_chars {
            chunk_words(text, s, e, self.chunk_chars, self.min_chars)
        } else {
            vec![(s, e)]
        };
        pieces
            .into_iter()
            .filter(|(a, b)| {
                let n = text[*a..*b].chars().count();
                n >= self.min_chars && n <= self.max_chars
            })
            .collect()
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

fn normalize(raw: &str) -> Normalized {
    let mut out = Normalized {
        text: String::with_capacity(raw.len()),
        map: Vec::with_capacity(raw.len()),
    };
    let mut pending_space: Option<usize> = None;
    let mut i = 0;

    while let Some(c) = raw[i..].chars().next() {
        let len = c.len_utf8();

        if c == '\r' && raw[i + 1..].starts_with('\n') {
            i += 1;
            continue;
        }
        if c == '\n' || c == '\r' {
            pending_space = None;
            out.push_char('\n', i);
            i += len;
            continue;
        }
        if c.is_whitespace() {
            let at_line_start = out.text.is_empty() || out.text.ends_with('\n');
            if !at_line_start && pending_space.is_none() {
                pending_space = Some(i);
            }
            i += len;
            continue;
        }
        if c == '-'
            && pending_space.is_none()
            && out.text.chars().last().is_some_and(char::is_alphabetic)
        {
            if let Some(resume) = hyphen_wrap_resume(raw, i + len) {
                i = resume;
                continue;
            }
        }

        if let Some(at) = pending_space.take() {
            out.push_char(' ', at);
        }
        out.push_char(c, i);
        i += len;
    }

    out
}

/// For a hyphen that ends a line and is followed by a lower-case word on the
/// next line, the raw offset where that word starts.
fn hyphen_wrap_resume(raw: &str, after: usize) -> Option<usize> {
    let is_blank = |c: char| c == ' ' || c == '\t';
    let rest = raw[after..].trim_start_matches(is_blank);
    let next_line = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;
    let word = next_line.trim_start_matches(is_blank);
    if word.chars().next()?.is_lowercase() {
        Some(raw.len() - word.len())
    } else {
        None
    }
}

fn paragraphs(text: &str) -> Vec<Paragraph> {
    let mut out = Vec::new();
    let mut section: Option<String> = None;
    let mut current: Option<(usize, usize)> = None;

    let mut flush = |current: &mut Option<(usize, usize)>, section: &Option<String>| {
        if let Some((start, end)) = current.take() {
            out.push(Paragraph {
                start,
                end,
                section_hint: section.clone(),
            });
        }
    };

    for (ls, le) in line_spans(text) {
        let line = &text[ls..le];
        if line.is_empty() {
            flush(&mut current, &section);
            continue;
        }
        if let Some(marker) = BULLET_RE.find(line) {
            flush(&mut current, &section);
            current = Some((ls + marker.end(), le));
            continue;
        }
        match current {
            Some((s, e)) if continues(&text[s..e], line) => current = Some((s, le)),
            _ => {
                flush(&mut current, &section);
                if is_heading(line) {
                    section = Some(line.to_string());
                    continue;
                }
                current = Some((ls, le));
            }
        }
    }
    flush(&mut current, &section);

    out
}

fn line_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            spans.push((start, i));
            start = i + 1;
        }
    }
    spans.push((start, text.len()));
    spans
}

/// Whether `next` continues the paragraph collected so far.
fn continues(buffer: &str, next: &str) -> bool {
    let tail = buffer.trim_end_matches(|c: char| c == '"' || c == '\'' || c == ')' || c == '”');
    if tail.ends_with(|c: char| c == '.' || c == '!' || c == '?') {
        return false;
    }
    if next.chars().next().is_some_and(char::is_lowercase) {
        return true;
    }
    if buffer.ends_with(',') {
        return true;
    }
    let last_word = buffer.rsplit(' ').next().unwrap_or("").to_lowercase();
    CONNECTORS.contains(&last_word.as_str())
}

/// ALL-CAPS lines, or short title-case lines without terminal punctuation.
fn is_heading(line: &str) -> bool {
    let len = line.chars().count();
    if !(3..=80).contains(&len) {
        return false;
    }
    if line.ends_with(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':')) {
        return false;
    }
    let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() < 3 {
        return false;
    }
    if letters.iter().all(|c| c.is_uppercase()) {
        return true;
    }
    let minor = ["and", "of", "the", "for", "in", "to", "on", "&", "a", "an", "vs"];
    let words: Vec<&str> = line.split_whitespace().collect();
    len <= 60
        && words.len() <= 8
        && words.iter().all(|w| {
            minor.contains(w)
                || w.chars()
                    .next()
                    .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
        })
}

/// Sentence and clause spans of a single-line paragraph, trimmed.
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut raw_spans = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let next_is_ws = bytes.get(i + 1).is_some_and(|n| n.is_ascii_whitespace());
        match bytes[i] {
            b'!' | b'?' if next_is_ws => {
                raw_spans.push((start, i + 1));
                start = i + 1;
            }
            b'.' if next_is_ws && !is_abbreviation(&text[start..i]) => {
                raw_spans.push((start, i + 1));
                start = i + 1;
            }
            b';' => {
                raw_spans.push((start, i));
                start = i + 1;
            }
            b':' if next_is_ws => {
                raw_spans.push((start, i));
                start = i + 1;
            }
            b' ' => {
                if let Some(sep) = CLAUSE_SEPARATORS.iter().find(|s| text[i..].starts_with(**s)) {
                    raw_spans.push((start, i));
                    start = i + sep.len();
                    i = start;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    raw_spans.push((start, bytes.len()));

    raw_spans
        .into_iter()
        .filter_map(|(s, e)| trim_span(text, s, e))
        .collect()
}

fn trim_span(text: &str, s: usize, e: usize) -> Option<(usize, usize)> {
    let slice = &text[s..e];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    if lead + trail >= slice.len() {
        return None;
    }
    Some((s + lead, e - trail))
}

fn is_abbreviation(before_dot: &str) -> bool {
    let word = before_dot.rsplit(' ').next().unwrap_or("");
    let lower = word.to_lowercase();
    (word.chars().count() == 1 && word.chars().all(|c| c.is_uppercase()))
        || ABBREVIATIONS.contains(&lower.as_str())
}

/// Greedy word-boundary chunks of `text[s..e]`, each at most `limit` chars
/// unless a single word is longer. Every word lands in some chunk.
fn chunk_words(text: &str, s: usize, e: usize, limit: usize, min: usize) -> Vec<(usize, usize)> {
    let mut chunks: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut pos = s;

    for word in text[s..e].split(' ') {
        let (ws, we) = (pos, pos + word.len());
        pos = we + 1;
        if word.is_empty() {
            continue;
        }
        match chunks.last_mut() {
            Some(chunk) if text[chunk[0].0..we].chars().count() <= limit => chunk.push((ws, we)),
            _ => chunks.push(vec![(ws, we)]),
        }
    }

    // A short tail borrows words from the chunk before it.
    while let [.., prev, last] = chunks.as_mut_slice() {
        let last_len = text[last[0].0..last[last.len() - 1].1].chars().count();
        if last_len >= min || prev.len() < 2 {
            break;
        }
        let moved = prev[prev.len() - 1];
        if text[moved.0..last[last.len() - 1].1].chars().count() > limit {
            break;
        }
        prev.pop();
        last.insert(0, moved);
    }

    chunks
        .into_iter()
        .filter_map(|c| Some((c.first()?.0, c.last()?.1)))
        .collect()
}
