//! PII anonymization CLI.
//!
//! Anonymizes inline text or a document and prints the anonymized text, a
//! summary, or the full JSON report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use anonymizer::{
    AnonymizationResult, AnonymizerConfig, DetectorKind, DocumentProcessor, Locale, Pipeline,
    RuleSet,
};

/// PII Anonymizer
///
/// Replaces names, emails, organizations and ages with consistent synthetic
/// values. Anonymizes --text or --input by default; use 'extract' to inspect
/// the text of a document.
#[derive(Parser)]
#[command(name = "anonymizer")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Text to anonymize
    #[arg(short, long, value_name = "TEXT", conflicts_with = "input")]
    text: Option<String>,

    /// Input document (.txt, .docx, .pdf)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output document path (defaults to <stem>_anonymized.<ext>)
    #[arg(short, long, value_name = "FILE", requires = "input")]
    output: Option<PathBuf>,

    /// Detector: pattern, model (spacy) or external (llm)
    #[arg(short, long, value_name = "KIND")]
    detector: Option<DetectorKind>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rule tables file (TOML), see the 'rules' subcommand
    #[arg(long, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// Directory with fr.toml / en.toml NER models
    #[arg(long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Locale of synthetic names: en, fr or mixed
    #[arg(long, value_name = "LOCALE")]
    locale: Option<Locale>,

    /// Seed for reproducible replacements
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from a document (for debugging and verification)
    Extract {
        /// Input document path
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Output text file (optional, defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print the built-in rule tables as TOML
    Rules,
}

impl Cli {
    /// Loads the configuration file, then applies flag overrides.
    fn config(&self) -> Result<AnonymizerConfig> {
        let mut config = match &self.config {
            Some(path) => AnonymizerConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AnonymizerConfig::default(),
        };

        if let Some(detector) = self.detector {
            config.detector = detector;
        }
        if let Some(locale) = self.locale {
            config.locale = locale;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(rules) = &self.rules {
            config.rules = Some(rules.clone());
        }
        if let Some(model_dir) = &self.model_dir {
            config.model_dir = Some(model_dir.clone());
        }
        Ok(config)
    }
}

/// Anonymization command handler.
struct AnonymizeHandler {
    processor: DocumentProcessor,
    json: bool,
    verbose: bool,
}

impl AnonymizeHandler {
    fn new(config: &AnonymizerConfig, json: bool, verbose: bool) -> Result<Self> {
        let pipeline = Pipeline::from_config(config).context("Invalid configuration")?;
        Ok(Self {
            processor: DocumentProcessor::new(pipeline),
            json,
            verbose,
        })
    }

    fn text(&self, text: &str) -> Result<()> {
        let result = self.processor.pipeline().anonymize(text);
        self.report(&result)?;
        if !self.json {
            println!("{}", result.anonymized_text);
        }
        ensure_success(&result)
    }

    fn document(&self, input: &Path, output: Option<&Path>) -> Result<()> {
        let outcome = self.processor.process(input, output);
        self.report(&outcome.result)?;

        if !self.json {
            if let Some(path) = &outcome.output {
                println!(
                    "✓ Anonymized {} entit{} → {}",
                    outcome.result.statistics.entities_anonymized,
                    if outcome.result.statistics.entities_anonymized == 1 {
                        "y"
                    } else {
                        "ies"
                    },
                    path.display()
                );
            }
        }
        ensure_success(&outcome.result)
    }

    fn report(&self, result: &AnonymizationResult) -> Result<()> {
        if self.json {
            println!("{}", result.to_json().context("Failed to serialize result")?);
            return Ok(());
        }

        if self.verbose && result.success {
            eprintln!("Detector: {}", result.statistics.detector_used);
            eprintln!("Workflow: {}", result.workflow);
            for entry in &result.replacements {
                eprintln!("  [{}] {} → {}", entry.kind, entry.original, entry.replacement);
            }
        }
        Ok(())
    }

    fn extract(&self, input: &Path, output: Option<&Path>) -> Result<()> {
        let text = self
            .processor
            .extract_text(input)
            .with_context(|| "Text extraction failed")?;

        if let Some(output_path) = output {
            std::fs::write(output_path, &text)
                .with_context(|| format!("Failed to write to {}", output_path.display()))?;
            println!(
                "✓ Extracted {} characters → {}",
                text.chars().count(),
                output_path.display()
            );
        } else {
            println!("{}", text);
        }

        Ok(())
    }
}

fn ensure_success(result: &AnonymizationResult) -> Result<()> {
    if result.success {
        Ok(())
    } else {
        anyhow::bail!(
            "Anonymization failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Some(Commands::Rules) => {
            print!("{}", RuleSet::default().to_toml()?);
        }
        Some(Commands::Extract { input, output }) => {
            let handler = AnonymizeHandler::new(&cli.config()?, cli.json, cli.verbose)?;
            handler.extract(input, output.as_deref())?;
        }
        None => {
            let handler = AnonymizeHandler::new(&cli.config()?, cli.json, cli.verbose)?;
            match (&cli.text, &cli.input) {
                (Some(text), _) => handler.text(text)?,
                (None, Some(input)) => handler.document(input, cli.output.as_deref())?,
                (None, None) => anyhow::bail!("Either --text or --input is required"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "anonymizer",
            "--text",
            "hi",
            "--detector",
            "llm",
            "--seed",
            "3",
            "--locale",
            "fr",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.detector, DetectorKind::External);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.locale, Locale::Fr);
    }

    #[test]
    fn test_text_conflicts_with_input() {
        assert!(Cli::try_parse_from(["anonymizer", "-t", "x", "-i", "a.txt"]).is_err());
        assert!(Cli::try_parse_from(["anonymizer", "-t", "x", "-o", "b.txt"]).is_err());
    }
}
