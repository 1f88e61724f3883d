//! Keyword, verb and stopword tables shared by every pipeline stage.
//!
//! All tables are immutable process-wide data. Components receive a
//! `&'static Lexicon` at construction instead of reaching for globals, so a
//! test can hand in its own tables.

use once_cell::sync::Lazy;

use crate::types::Category;

/// A canonical action verb and the base forms (including synonyms) that map to it.
#[derive(Debug, Clone, Copy)]
pub struct VerbEntry {
    pub canonical: &'static str,
    /// Base forms; regular inflections are generated by [`VerbEntry::forms`].
    pub bases: &'static [&'static str],
    /// Irregular inflected forms not produced by the regular rules.
    pub irregular: &'static [&'static str],
}

impl VerbEntry {
    /// Every surface form of this verb: bases, their regular inflections and
    /// the irregular forms. Multi-word bases inflect their first word.
    pub fn forms(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for base in self.bases {
            let (head, tail) = match base.split_once(' ') {
                Some((h, t)) => (h, format!(" {t}")),
                None => (*base, String::new()),
            };
            for inflected in inflect(head) {
                let form = format!("{inflected}{tail}");
                if !out.contains(&form) {
                    out.push(form);
                }
            }
        }
        for irr in self.irregular {
            if !out.iter().any(|f| f == irr) {
                out.push((*irr).to_string());
            }
        }
        out
    }
}

/// Regular English inflections of a verb head: base, -s, -ed, -ing.
fn inflect(head: &str) -> Vec<String> {
    let bytes = head.as_bytes();
    let last = bytes.last().copied().unwrap_or(b' ');
    let before_last = if bytes.len() >= 2 { bytes[bytes.len() - 2] } else { b' ' };
    let is_vowel = |b: u8| matches!(b, b'a' | b'e' | b'i' | b'o' | b'u');

    let third = if head.ends_with('s')
        || head.ends_with("sh")
        || head.ends_with("ch")
        || head.ends_with('x')
        || head.ends_with('z')
    {
        format!("{head}es")
    } else if last == b'y' && !is_vowel(before_last) {
        format!("{}ies", &head[..head.len() - 1])
    } else {
        format!("{head}s")
    };

    let past = if last == b'e' {
        format!("{head}d")
    } else if last == b'y' && !is_vowel(before_last) {
        format!("{}ied", &head[..head.len() - 1])
    } else {
        format!("{head}ed")
    };

    let gerund = if last == b'e' && before_last != b'e' {
        format!("{}ing", &head[..head.len() - 1])
    } else {
        format!("{head}ing")
    };

    vec![head.to_string(), third, past, gerund]
}

/// The full set of lexical tables consumed by the gate, canonicalizer and clusterer.
#[derive(Debug)]
pub struct Lexicon {
    pub stopwords: &'static [&'static str],
    /// Commitment phrases scoring 1.0.
    pub strong_commitments: &'static [&'static str],
    /// Commitment phrases scoring 0.8.
    pub weak_commitments: &'static [&'static str],
    /// Modal hedges scoring 0.45. The month "May" is told apart by its context.
    pub hedges: &'static [&'static str],
    pub capital_cues: &'static [&'static str],
    pub exposure_cues: &'static [&'static str],
    pub dependency_cues: &'static [&'static str],
    pub reversal_cues: &'static [&'static str],
    /// Financial-statement field names.
    pub metric_terms: &'static [&'static str],
    /// Regex fragments for disclaimers and page furniture.
    pub boilerplate: &'static [&'static str],
    /// Regex fragments for sentence subjects; stripped together with the
    /// auxiliaries that follow them ("The company will", "We plan to").
    pub subject_prefixes: &'static [&'static str],
    pub action_verbs: &'static [VerbEntry],
    /// `(regex fragment, key)` pairs, checked in order.
    pub object_keys: &'static [(&'static str, &'static str)],
    /// `(lowercase word, display form)` pairs.
    pub noun_forms: &'static [(&'static str, &'static str)],
    pub category_rules: &'static [(Category, &'static [&'static str])],
}

static STANDARD: Lazy<Lexicon> = Lazy::new(|| Lexicon {
    stopwords: STOPWORDS,
    strong_commitments: &[
        "will", "shall", "committed to", "commit to", "decided to", "approved", "signed",
        "completed", "launched", "launch", "begin", "began", "begun", "commenced",
        "started", "broke ground", "ramp", "ramped", "ramping", "roll out", "rolled out",
    ],
    weak_commitments: &[
        "plan to", "plans to", "planned", "planning to", "intend to", "intends to",
        "aim to", "aims to", "target", "targets", "targeting", "targeted", "expect to",
        "expects to", "on track to", "seek to", "seeks to", "prepare to", "preparing to",
        "scheduled to", "set to", "poised to",
    ],
    hedges: &[
        "may", "might", "could", "consider", "considering", "exploring", "evaluate",
        "evaluating", "potentially", "possibly",
    ],
    capital_cues: &[
        "factory", "factories", "plant", "plants", "facility", "facilities", "capex",
        "capital expenditure", "capital expenditures", "invest", "investment", "investing",
        "hiring", "hire", "headcount", "pricing", "price", "prices", "ramp", "ramping",
        "production", "capacity", "manufacturing", "construction", "supply chain",
        "acquisition", "acquire", "budget", "spend", "spending", "expand", "expansion",
        "launch", "line", "lines",
    ],
    exposure_cues: &[
        "guidance", "outlook", "forecast", "forecasts", "target", "targets", "will",
        "projected", "publicly", "commitment",
    ],
    dependency_cues: &[
        "requires", "require", "required", "contingent on", "contingent upon", "subject to",
        "depends on", "dependent on", "after", "before", "once", "pending", "upon approval",
    ],
    reversal_cues: &[
        "completed", "signed", "already underway", "underway", "finalized", "executed",
        "broke ground", "commenced", "contracted", "irrevocable", "closed the acquisition",
    ],
    metric_terms: &[
        "revenue", "revenues", "eps", "earnings per share", "gross margin", "operating margin",
        "net margin", "operating income", "net income", "ebitda", "free cash flow",
        "operating cash flow", "gross profit", "total assets", "total liabilities",
        "diluted", "basis points", "year-over-year", "yoy", "sales",
    ],
    boilerplate: &[
        r"forward[- ]looking statements?",
        r"safe harbor",
        r"actual results (?:may|could) differ",
        r"all rights reserved",
        r"copyright",
        r"©",
        r"\bpage \d+ of \d+\b",
        r"table of contents",
        r"not a guarantee of future",
        r"should not be relied upon",
        r"see accompanying notes",
    ],
    subject_prefixes: &[
        r"(?i:the company|the group|the board|management|our company|our team|the team|we|it|they)",
        r"(?:[A-Z][\w&.'-]*(?:\s+[A-Z][\w&.'-]*){0,2})",
    ],
    action_verbs: ACTION_VERBS,
    object_keys: &[
        (r"megafactor(?:y|ies)", "megafactory"),
        (r"gigafactor(?:y|ies)", "gigafactory"),
        (r"robotaxis?|cybercab", "robotaxi"),
        (r"cybertruck", "cybertruck"),
        (r"\bsemi\b", "semi"),
        (r"optimus", "optimus"),
        (r"megapacks?", "megapack"),
        (r"powerwalls?", "powerwall"),
        (r"superchargers?|charging network", "charging"),
        (r"buy ?backs?|repurchases?", "buyback"),
        (r"dividends?", "dividend"),
        (r"capex|capital expenditures?", "capex"),
        (r"headcount|hiring|workforce|employees", "workforce"),
        (r"data ?cent(?:er|re)s?", "datacenter"),
        (r"pric(?:e|es|ing)", "pricing"),
        (r"debt|credit facility|notes offering", "debt"),
        (r"batter(?:y|ies)|cells?", "battery"),
    ],
    noun_forms: &[
        ("ai", "AI"), ("ev", "EV"), ("evs", "EVs"), ("fsd", "FSD"), ("ceo", "CEO"),
        ("cfo", "CFO"), ("r&d", "R&D"), ("api", "API"), ("saas", "SaaS"), ("llm", "LLM"),
        ("megafactory", "Megafactory"), ("gigafactory", "Gigafactory"),
        ("cybertruck", "Cybertruck"), ("cybercab", "Cybercab"), ("powerwall", "Powerwall"),
        ("megapack", "Megapack"), ("robotaxi", "Robotaxi"), ("optimus", "Optimus"),
        ("dojo", "Dojo"), ("shanghai", "Shanghai"), ("berlin", "Berlin"), ("texas", "Texas"),
    ],
    category_rules: &[
        (Category::Product, &[
            "launch", "product", "model", "platform", "vehicle", "software", "feature",
            "robotaxi", "cybertruck", "semi", "fsd", "ai", "release",
        ]),
        (Category::Operations, &[
            "factory", "production", "capacity", "plant", "manufacturing", "supply",
            "ramp", "facility", "megafactory", "gigafactory", "logistics", "line",
        ]),
        (Category::Capital, &[
            "capex", "capital expenditure", "invest", "investment", "acquire", "acquisition",
            "buyback", "repurchase", "dividend", "divest",
        ]),
        (Category::Financial, &[
            "pricing", "price", "margin", "cost", "debt", "financing", "guidance", "cash",
        ]),
        (Category::People, &[
            "hire", "hiring", "headcount", "workforce", "employees", "layoff", "talent",
            "leadership", "ceo",
        ]),
        (Category::Partnership, &[
            "partner", "partnership", "agreement", "joint venture", "collaboration",
            "supplier", "contract",
        ]),
        (Category::Regulatory, &[
            "regulatory", "approval", "permit", "compliance", "regulator", "license",
            "certification",
        ]),
    ],
});

impl Lexicon {
    /// The built-in tables.
    pub fn standard() -> &'static Lexicon {
        &STANDARD
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(&word)
    }
}

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "for", "by", "with",
    "at", "as", "from", "into", "onto", "over", "under", "about", "than", "then", "this",
    "that", "these", "those", "it", "its", "our", "we", "us", "they", "their", "them",
    "he", "she", "his", "her", "be", "been", "being", "is", "are", "was", "were", "am",
    "will", "shall", "would", "should", "can", "could", "may", "might", "must", "do",
    "does", "did", "has", "have", "had", "so", "such", "also", "which", "who", "whom",
    "what", "when", "where", "while", "company", "group", "plan", "plans", "expect",
    "expects", "intend", "intends", "further", "additional", "all", "any", "each", "more",
    "most", "other", "some", "very", "up", "out", "per", "via",
];

const ACTION_VERBS: &[VerbEntry] = &[
    VerbEntry { canonical: "launch", bases: &["launch", "roll out", "unveil", "introduce", "debut"], irregular: &[] },
    VerbEntry { canonical: "begin", bases: &["begin", "start", "commence", "kick off", "initiate"], irregular: &["began", "begun", "beginning", "broke ground", "break ground"] },
    VerbEntry { canonical: "ramp", bases: &["ramp", "ramp up", "scale up"], irregular: &[] },
    VerbEntry { canonical: "expand", bases: &["expand", "extend", "enlarge", "broaden"], irregular: &[] },
    VerbEntry { canonical: "build", bases: &["build", "construct", "establish", "set up"], irregular: &["built", "setting up"] },
    VerbEntry { canonical: "open", bases: &["open"], irregular: &[] },
    VerbEntry { canonical: "complete", bases: &["complete", "finish", "finalize", "conclude"], irregular: &[] },
    VerbEntry { canonical: "sign", bases: &["sign", "ink"], irregular: &[] },
    VerbEntry { canonical: "acquire", bases: &["acquire", "purchase", "take over"], irregular: &["took over", "taken over", "buy", "buys", "bought", "buying"] },
    VerbEntry { canonical: "invest", bases: &["invest", "allocate"], irregular: &[] },
    VerbEntry { canonical: "hire", bases: &["hire", "recruit", "onboard"], irregular: &[] },
    VerbEntry { canonical: "reduce", bases: &["reduce", "lower", "decrease"], irregular: &["cut", "cuts", "cutting"] },
    VerbEntry { canonical: "increase", bases: &["increase", "raise", "boost"], irregular: &[] },
    VerbEntry { canonical: "close", bases: &["close", "shut down", "shutter", "exit", "wind down"], irregular: &["shutting down", "wound down"] },
    VerbEntry { canonical: "divest", bases: &["divest", "dispose of", "spin off"], irregular: &["sell", "sells", "sold", "selling", "spun off", "spinning off"] },
    VerbEntry { canonical: "deploy", bases: &["deploy", "implement", "install"], irregular: &[] },
    VerbEntry { canonical: "deliver", bases: &["deliver"], irregular: &["ship", "ships", "shipped", "shipping"] },
    VerbEntry { canonical: "develop", bases: &["develop", "design", "engineer"], irregular: &[] },
    VerbEntry { canonical: "repurchase", bases: &["repurchase", "buy back"], irregular: &["bought back", "buying back"] },
    VerbEntry { canonical: "pay", bases: &["pay", "distribute"], irregular: &["paid"] },
    VerbEntry { canonical: "restructure", bases: &["restructure", "reorganize", "consolidate"], irregular: &[] },
    VerbEntry { canonical: "relocate", bases: &["relocate"], irregular: &[] },
    VerbEntry { canonical: "partner", bases: &["partner", "collaborate", "team up"], irregular: &["teamed up", "teaming up"] },
    VerbEntry { canonical: "enter", bases: &["enter"], irregular: &[] },
    VerbEntry { canonical: "discontinue", bases: &["discontinue", "phase out", "retire"], irregular: &[] },
    VerbEntry { canonical: "upgrade", bases: &["upgrade", "modernize", "retool"], irregular: &[] },
    VerbEntry { canonical: "migrate", bases: &["migrate", "transition"], irregular: &[] },
    VerbEntry { canonical: "produce", bases: &["produce", "manufacture"], irregular: &[] },
];
