//! Per-run replacement registry and synthetic value generation.

use crate::config::Locale;
use crate::domain::validation::find_number;
use crate::domain::{CompiledRules, EntityKind};
use fake::faker::company::raw::CompanyName;
use fake::faker::internet::raw::SafeEmail;
use fake::faker::name::raw::Name;
use fake::locales::{EN, FR_FR};
use fake::Fake;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Synthesized ages are clamped into this range.
pub const AGE_BOUNDS: (i64, i64) = (18, 65);

/// Replacement for an age without any digits.
pub const DEFAULT_AGE: &str = "25 ans";

const MAX_REDRAWS: usize = 8;

/// One original with its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub original: String,
    pub replacement: String,
    pub kind: EntityKind,
}

/// Generates synthetic replacement values.
#[derive(Debug)]
pub struct Synthesizer {
    rng: StdRng,
    locale: Locale,
    rules: Arc<CompiledRules>,
}

impl Synthesizer {
    pub fn new(rules: Arc<CompiledRules>, locale: Locale, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, locale, rules }
    }

    /// Produces a replacement for `original`, never equal to it when a
    /// different value can be drawn.
    pub fn synthesize(&mut self, original: &str, kind: &EntityKind) -> String {
        let mut candidate = self.draw(original, kind);
        for _ in 0..MAX_REDRAWS {
            if candidate != original {
                break;
            }
            candidate = self.draw(original, kind);
        }
        candidate
    }

    fn draw(&mut self, original: &str, kind: &EntityKind) -> String {
        match kind {
            EntityKind::Person => self.person(),
            EntityKind::Organization => self.organization(original),
            EntityKind::Email => SafeEmail(EN).fake_with_rng(&mut self.rng),
            EntityKind::Age => self.age(original),
            EntityKind::Other(label) => format!("[REDACTED_{label}]"),
        }
    }

    fn french(&mut self) -> bool {
        match self.locale {
            Locale::En => false,
            Locale::Fr => true,
            Locale::Mixed => self.rng.gen_bool(0.5),
        }
    }

    fn person(&mut self) -> String {
        if self.french() {
            Name(FR_FR).fake_with_rng(&mut self.rng)
        } else {
            Name(EN).fake_with_rng(&mut self.rng)
        }
    }

    fn organization(&mut self, original: &str) -> String {
        let pool: &[String] = if self.rules.is_tech_organization(original) {
            self.rules.tech_companies()
        } else if self.rules.is_consulting_organization(original) {
            self.rules.consulting_firms()
        } else {
            &[]
        };

        if let Some(name) = pool.choose(&mut self.rng) {
            return name.clone();
        }
        if self.french() {
            CompanyName(FR_FR).fake_with_rng(&mut self.rng)
        } else {
            CompanyName(EN).fake_with_rng(&mut self.rng)
        }
    }

    /// Shifts the embedded number by up to five years, keeping the text in
    /// front of it and the `ans` / `years old` unit.
    fn age(&mut self, original: &str) -> String {
        let Some((position, age)) = find_number(original)
            .and_then(|(position, n)| Some((position, i64::try_from(n).ok()?)))
        else {
            return DEFAULT_AGE.to_string();
        };

        let (min, max) = AGE_BOUNDS;
        let mut shifted = (age + self.rng.gen_range(-5..=5)).clamp(min, max);
        if shifted == age {
            shifted = if shifted < max { shifted + 1 } else { shifted - 1 };
        }

        let lower = original.to_lowercase();
        let unit = if lower.contains("ans") {
            " ans"
        } else if lower.contains("years old") {
            " years old"
        } else {
            ""
        };
        format!("{}{shifted}{unit}", &original[..position])
    }
}

/// Original → replacement map for one run.
///
/// Keyed by value: every occurrence of the same original string shares one
/// replacement, whatever its position. Entries keep insertion order.
#[derive(Debug)]
pub struct ReplacementRegistry {
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
    synthesizer: Synthesizer,
}

impl ReplacementRegistry {
    pub fn new(synthesizer: Synthesizer) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            synthesizer,
        }
    }

    /// Registry using the built-in rules, English names and a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Synthesizer::new(
            CompiledRules::builtin(),
            Locale::En,
            Some(seed),
        ))
    }

    /// Returns the replacement for `original`, synthesizing it on first sight.
    ///
    /// The kind of the first resolution sticks.
    pub fn resolve(&mut self, original: &str, kind: &EntityKind) -> &str {
        let idx = match self.index.get(original) {
            Some(&idx) => idx,
            None => {
                let replacement = self.synthesizer.synthesize(original, kind);
                self.entries.push(RegistryEntry {
                    original: original.to_string(),
                    replacement,
                    kind: kind.clone(),
                });
                self.index.insert(original.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &self.entries[idx].replacement
    }

    pub fn get(&self, original: &str) -> Option<&RegistryEntry> {
        self.index.get(original).map(|&idx| &self.entries[idx])
    }

    /// Snapshot of all entries in insertion order.
    pub fn export(&self) -> Vec<RegistryEntry> {
        self.entries.clone()
    }

    /// `(original, replacement)` pairs in insertion order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.original.as_str(), entry.replacement.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
