//! Rule tables driving detection, validation and synthesis.
//!
//! Everything heuristic lives here as data: the ordered `(kind, pattern)`
//! list of the pattern detector, the stop-word and denylist sets, the curated
//! first-name list and the organization pools. [`RuleSet`] is the
//! serializable form (TOML); [`CompiledRules`] is what detectors consume.

use super::span::EntityKind;
use crate::error::{AnonymizerError, AnonymizerResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// One detection rule: every match of `pattern` is a candidate of `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub kind: EntityKind,
    pub pattern: String,
}

impl PatternRule {
    pub fn new(kind: EntityKind, pattern: &str) -> Self {
        Self {
            kind,
            pattern: pattern.to_string(),
        }
    }
}

/// Serializable rule tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Tokens that disqualify a two-token PERSON candidate.
    pub stop_words: Vec<String>,
    /// Terms that disqualify a model PERSON candidate (whole word, any case).
    pub denylist: Vec<String>,
    /// Given names recognized as single-token persons.
    pub first_names: Vec<String>,
    /// Inclusive range of plausible ages.
    pub age_range: (u32, u32),
    /// Supplemental age pattern run after the model pass.
    pub age_context_pattern: String,
    /// Single capitalized token, checked against `first_names`.
    pub first_name_pattern: String,
    /// Shape an externally reported PERSON must start with.
    pub person_shape: String,
    /// Shape an externally reported EMAIL must match entirely.
    pub email_shape: String,
    /// Bare words rejected as externally reported organizations.
    pub organization_stop_words: Vec<String>,
    /// Labels that are prompt echoes rather than entity kinds.
    pub label_placeholders: Vec<String>,
    pub tech_keywords: Vec<String>,
    pub consulting_keywords: Vec<String>,
    pub tech_companies: Vec<String>,
    pub consulting_firms: Vec<String>,
    /// Ordered detection rules; earlier rules win overlaps.
    pub patterns: Vec<PatternRule>,
}

const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
const PERSON_PAIR_PATTERN: &str = r"\b\p{Lu}\p{Ll}+ \p{Lu}\p{Ll}+\b";
// Horizontal whitespace only: documents are detected on blocks joined by
// newlines and an age must stay inside one block.
const AGE_PATTERN: &str =
    r"(?i)(?:\bâgée?[ \t]+de[ \t]+)?\b([0-9]{1,2})[ \t]+ans?\b|\b([0-9]{1,2})[ \t]+years?[ \t]+old\b";

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "from", "into", "about", "contact", "dear",
    "hello", "hi", "thanks", "regards", "please", "call", "meet", "email", "mr", "mrs", "ms",
    "dr", "le", "la", "les", "de", "du", "des", "et", "pour", "avec", "dans", "sur", "par",
    "une", "un", "ce", "cette", "bonjour", "cher", "chère", "merci", "cordialement", "monsieur",
    "madame", "mademoiselle", "contacter", "appeler",
];

const DENYLIST: &[&str] = &[
    "entreprise", "company", "corp", "ltd", "inc", "sa", "sarl", "sas",
    "pour", "for", "et", "and", "ou", "or", "le", "la", "les", "the", "de", "du", "des", "of",
    "intelligence", "artificielle", "artificial", "technology", "tech",
    "chef", "manager", "director", "president", "ceo", "cto", "cfo",
    "site", "web", "website", "internet", "email", "mail",
    "technopark", "parc", "park", "centre", "center", "bureau", "office",
    "casablanca", "rabat", "morocco", "maroc", "france", "paris",
    "adresse", "address", "rue", "street", "avenue", "boulevard",
    "université", "university", "école", "school", "institut",
    "stage", "internship", "convention", "contrat", "contract",
    "projet", "project", "développement", "development",
];

const FIRST_NAMES: &[&str] = &[
    "albert", "marie", "jean", "pierre", "paul", "michel", "robert", "bernard", "jacques",
    "louis", "claire", "sophie", "camille", "nicolas", "julien", "isabelle", "nathalie", "john",
    "mary", "james", "patricia", "michael", "linda", "william", "elizabeth", "david", "barbara",
    "richard", "susan", "joseph", "jessica", "thomas", "sarah", "charles", "karen",
    "christopher", "nancy", "daniel", "lisa", "matthew", "betty", "anthony", "helen", "mark",
    "sandra", "donald", "donna", "steven", "carol", "ruth", "andrew", "sharon", "joshua",
    "michelle", "kenneth", "laura", "kevin", "brian", "kimberly", "george", "deborah",
    "edward", "dorothy", "ronald", "tim", "jason", "jeffrey", "ryan", "jacob", "youssef",
    "fatima", "mohamed", "amina", "omar", "leila",
];

const TECH_KEYWORDS: &[&str] = &[
    "tech", "digital", "software", "data", "ai", "intelligence", "cloud", "cyber", "logiciel",
    "numérique", "systems",
];

const CONSULTING_KEYWORDS: &[&str] = &["consulting", "conseil", "advisory", "partners", "associates"];

const TECH_COMPANIES: &[&str] = &[
    "Nimbus Dataworks", "Quantix Labs", "Cobalt Software Group", "Helix Cloud Systems",
    "Vectorline Analytics", "Brightbyte Technologies", "Orbital Code Works", "Lumen Data Corp",
    "Polaris Digital", "Ferrite Systems", "Arcadia Compute", "Northwind Logic",
];

const CONSULTING_FIRMS: &[&str] = &[
    "Meridian Advisory Partners", "Keystone Strategy Group", "Harbor & Vale Consulting",
    "Summit Growth Associates", "Clearpath Advisory", "Ridgeway Performance Partners",
    "Atlas Transformation Group", "Beacon Strategy Consulting",
];

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            patterns: vec![
                PatternRule::new(EntityKind::Email, EMAIL_PATTERN),
                PatternRule::new(EntityKind::Person, PERSON_PAIR_PATTERN),
                PatternRule::new(EntityKind::Age, AGE_PATTERN),
            ],
            stop_words: owned(STOP_WORDS),
            denylist: owned(DENYLIST),
            first_names: owned(FIRST_NAMES),
            age_range: (16, 99),
            age_context_pattern: r"(?i)\b(?:1[6-9]|[2-9][0-9])[ \t]+(?:ans?|years?)\b".to_string(),
            first_name_pattern: r"\b\p{Lu}\p{Ll}{2,}\b".to_string(),
            person_shape: r"^\p{Lu}\p{Ll}+ \p{Lu}\p{Ll}+".to_string(),
            email_shape: r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$".to_string(),
            organization_stop_words: owned(&["the", "and", "for", "with"]),
            label_placeholders: owned(&["UNKNOWN", "text", "label", "start", "end"]),
            tech_keywords: owned(TECH_KEYWORDS),
            consulting_keywords: owned(CONSULTING_KEYWORDS),
            tech_companies: owned(TECH_COMPANIES),
            consulting_firms: owned(CONSULTING_FIRMS),
        }
    }
}

impl RuleSet {
    /// Loads rule tables from a TOML file; missing tables keep their defaults.
    pub fn load(path: &Path) -> AnonymizerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AnonymizerError::io(path, e))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> AnonymizerResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml(&self) -> AnonymizerResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Compiles every pattern, reporting the first one that fails.
    pub fn compile(&self) -> AnonymizerResult<CompiledRules> {
        let patterns = self
            .patterns
            .iter()
            .map(|rule| Ok((rule.kind.clone(), compile(&rule.pattern)?)))
            .collect::<AnonymizerResult<Vec<_>>>()?;

        let denylist = if self.denylist.is_empty() {
            None
        } else {
            let alternation = self
                .denylist
                .iter()
                .map(|term| regex::escape(term))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile(&format!(r"(?i)\b(?:{alternation})\b"))?)
        };

        Ok(CompiledRules {
            patterns,
            stop_words: lowercase_set(&self.stop_words),
            denylist,
            first_names: lowercase_set(&self.first_names),
            age_range: self.age_range,
            age_context: compile(&self.age_context_pattern)?,
            first_name_token: compile(&self.first_name_pattern)?,
            person_shape: compile(&self.person_shape)?,
            email_shape: compile(&self.email_shape)?,
            organization_stop_words: lowercase_set(&self.organization_stop_words),
            label_placeholders: self.label_placeholders.iter().cloned().collect(),
            tech_keywords: lowercase_vec(&self.tech_keywords),
            consulting_keywords: lowercase_vec(&self.consulting_keywords),
            tech_companies: self.tech_companies.clone(),
            consulting_firms: self.consulting_firms.clone(),
        })
    }
}

fn compile(pattern: &str) -> AnonymizerResult<Regex> {
    Regex::new(pattern).map_err(|e| AnonymizerError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn lowercase_set(words: &[String]) -> HashSet<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

fn lowercase_vec(words: &[String]) -> Vec<String> {
    words.iter().map(|w| w.to_lowercase()).collect()
}

/// Rule tables with every pattern compiled, shared read-only between detectors.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    patterns: Vec<(EntityKind, Regex)>,
    stop_words: HashSet<String>,
    denylist: Option<Regex>,
    first_names: HashSet<String>,
    age_range: (u32, u32),
    age_context: Regex,
    first_name_token: Regex,
    person_shape: Regex,
    email_shape: Regex,
    organization_stop_words: HashSet<String>,
    label_placeholders: HashSet<String>,
    tech_keywords: Vec<String>,
    consulting_keywords: Vec<String>,
    tech_companies: Vec<String>,
    consulting_firms: Vec<String>,
}

static DEFAULT_RULES: Lazy<Arc<CompiledRules>> = Lazy::new(|| {
    Arc::new(
        RuleSet::default()
            .compile()
            .expect("Built-in rule tables compile"),
    )
});

impl CompiledRules {
    /// Shared handle to the built-in rule tables.
    pub fn builtin() -> Arc<CompiledRules> {
        Arc::clone(&DEFAULT_RULES)
    }

    pub fn patterns(&self) -> &[(EntityKind, Regex)] {
        &self.patterns
    }

    /// Detection rules of one kind, in table order.
    pub fn patterns_for<'a>(&'a self, kind: &'a EntityKind) -> impl Iterator<Item = &'a Regex> + 'a {
        self.patterns
            .iter()
            .filter(move |(k, _)| k == kind)
            .map(|(_, regex)| regex)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }

    pub fn hits_denylist(&self, text: &str) -> bool {
        self.denylist.as_ref().is_some_and(|re| re.is_match(text))
    }

    pub fn is_first_name(&self, word: &str) -> bool {
        self.first_names.contains(&word.to_lowercase())
    }

    pub fn age_range(&self) -> (u32, u32) {
        self.age_range
    }

    pub fn age_context(&self) -> &Regex {
        &self.age_context
    }

    pub fn first_name_token(&self) -> &Regex {
        &self.first_name_token
    }

    pub fn person_shape(&self) -> &Regex {
        &self.person_shape
    }

    pub fn email_shape(&self) -> &Regex {
        &self.email_shape
    }

    pub fn is_organization_stop_word(&self, text: &str) -> bool {
        self.organization_stop_words.contains(&text.to_lowercase())
    }

    pub fn is_label_placeholder(&self, label: &str) -> bool {
        self.label_placeholders.contains(label)
    }

    pub fn is_tech_organization(&self, text: &str) -> bool {
        contains_keyword(text, &self.tech_keywords)
    }

    pub fn is_consulting_organization(&self, text: &str) -> bool {
        contains_keyword(text, &self.consulting_keywords)
    }

    pub fn tech_companies(&self) -> &[String] {
        &self.tech_companies
    }

    pub fn consulting_firms(&self) -> &[String] {
        &self.consulting_firms
    }
}

/// Short keywords (`ai`) must be a whole token; longer ones may be substrings.
fn contains_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|keyword| {
        if keyword.chars().count() <= 2 {
            lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| token == keyword)
        } else {
            lower.contains(keyword.as_str())
        }
    })
}
