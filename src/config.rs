//! Runtime configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working pattern-only setup. The CLI overlays its flags on top.

use crate::detection::DetectorKind;
use crate::domain::{CompiledRules, RuleSet};
use crate::error::{AnonymizerError, AnonymizerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Locale of synthesized person names and companies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
    /// Picks English or French per registry entry.
    Mixed,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::Mixed => "mixed",
        })
    }
}

impl FromStr for Locale {
    type Err = AnonymizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en_us" | "english" => Ok(Self::En),
            "fr" | "fr_fr" | "french" => Ok(Self::Fr),
            "mixed" => Ok(Self::Mixed),
            other => Err(AnonymizerError::Config(format!(
                "unknown locale '{other}' (expected en, fr or mixed)"
            ))),
        }
    }
}

/// Settings of the external detection process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    pub program: String,
    /// Arguments; empty means `run <model>`.
    pub args: Vec<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            program: "ollama".to_string(),
            args: Vec::new(),
            model: "mistral".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ExternalConfig {
    pub fn command_args(&self) -> Vec<String> {
        if self.args.is_empty() {
            vec!["run".to_string(), self.model.clone()]
        } else {
            self.args.clone()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration file.
///
/// ```toml
/// detector = "model"
/// locale = "fr"
/// seed = 7
/// model_dir = "/opt/anonymizer/models"
/// rules = "rules.toml"
///
/// [external]
/// model = "mistral"
/// timeout_secs = 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizerConfig {
    pub detector: DetectorKind,
    pub locale: Locale,
    /// Seed for reproducible replacements; random when unset.
    pub seed: Option<u64>,
    /// Directory holding `fr.toml` / `en.toml` NER models.
    pub model_dir: Option<PathBuf>,
    /// Rule-table file replacing the built-in tables.
    pub rules: Option<PathBuf>,
    pub external: ExternalConfig,
}

impl AnonymizerConfig {
    pub fn load(path: &Path) -> AnonymizerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AnonymizerError::io(path, e))?;
        Ok(toml::from_str(&raw)?)
    }

    /// Compiles the configured rule tables, or hands out the built-in ones.
    pub fn load_rules(&self) -> AnonymizerResult<Arc<CompiledRules>> {
        match &self.rules {
            Some(path) => Ok(Arc::new(RuleSet::load(path)?.compile()?)),
            None => Ok(CompiledRules::builtin()),
        }
    }
}
