//! Detector backed by an external text-generation process.
//!
//! The text is embedded in an instruction prompt and written to the process's
//! stdin; the reply must contain a JSON array of `{text, label, start, end}`
//! objects. Every failure (spawn, exit status, timeout, unusable reply) falls
//! back to [`PatternDetector`].

use super::pattern::PatternDetector;
use super::{Detection, Detector, DetectorKind, DetectorUsed};
use crate::domain::validation::is_valid_reported_entity;
use crate::domain::{resolve_overlaps, CharOffsets, CompiledRules, EntityKind, Span};
use crate::error::{AnonymizerError, AnonymizerResult};
use serde_json::Value;
use std::fmt;
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default bound on one completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const DETECTOR: &str = "external";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One blocking prompt/response exchange with a text-generation backend.
pub trait CompletionClient: Send + Sync + fmt::Debug {
    /// Model name, reported in `detector_used`.
    fn model(&self) -> &str;

    /// Sends `prompt` and returns the raw reply, giving up after `timeout`.
    fn complete(&self, prompt: &str, timeout: Duration) -> AnonymizerResult<String>;
}

/// Runs a local program per request, prompt on stdin, reply on stdout.
#[derive(Debug, Clone)]
pub struct ProcessClient {
    program: String,
    args: Vec<String>,
    model: String,
}

impl ProcessClient {
    pub fn new(program: &str, args: Vec<String>, model: &str) -> Self {
        Self {
            program: program.to_string(),
            args,
            model: model.to_string(),
        }
    }

    /// `ollama run <model>`.
    pub fn ollama(model: &str) -> Self {
        Self::new("ollama", vec!["run".to_string(), model.to_string()], model)
    }

    fn spawn(&self) -> AnonymizerResult<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AnonymizerError::DetectorUnavailable {
                detector: DETECTOR.to_string(),
                reason: format!("cannot start '{}': {e}", self.program),
            })
    }
}

fn protocol(reason: impl Into<String>) -> AnonymizerError {
    AnonymizerError::DetectorProtocol {
        detector: DETECTOR.to_string(),
        reason: reason.into(),
    }
}

/// Reads `reader` to the end on a detached thread.
///
/// The thread is never joined. After a timeout kill it lingers until every
/// holder of the pipe exits, which includes grandchildren a wrapper script
/// left running; `complete` returns without waiting for it.
fn drain<R: Read + Send + 'static>(mut reader: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            debug!(error = %e, "reading process output failed");
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(error = %e, "failed to kill external process");
    }
    let _ = child.wait();
}

fn wait_until(child: &mut Child, deadline: Instant) -> AnonymizerResult<Option<ExitStatus>> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) if Instant::now() >= deadline => return Ok(None),
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => return Err(protocol(format!("wait failed: {e}"))),
        }
    }
}

impl CompletionClient for ProcessClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn complete(&self, prompt: &str, timeout: Duration) -> AnonymizerResult<String> {
        let deadline = Instant::now() + timeout;
        let mut child = self.spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            let prompt = prompt.to_string();
            thread::spawn(move || {
                // A process may exit without reading its input.
                if let Err(e) = stdin.write_all(prompt.as_bytes()) {
                    debug!(error = %e, "writing prompt failed");
                }
            });
        }
        let stdout = child
            .stdout
            .take()
            .map(drain)
            .ok_or_else(|| protocol("stdout not captured"))?;
        let stderr = child.stderr.take().map(drain);

        let remaining = deadline.saturating_duration_since(Instant::now());
        let output = match stdout.recv_timeout(remaining) {
            Ok(output) => output,
            Err(_) => {
                kill(&mut child);
                return Err(protocol(format!("timed out after {}s", timeout.as_secs_f32())));
            }
        };

        let Some(status) = wait_until(&mut child, deadline)? else {
            kill(&mut child);
            return Err(protocol(format!("timed out after {}s", timeout.as_secs_f32())));
        };

        if !status.success() {
            let message = stderr
                .and_then(|rx| rx.recv_timeout(POLL_INTERVAL).ok())
                .unwrap_or_default();
            return Err(protocol(format!("{status}: {}", message.trim())));
        }

        Ok(output)
    }
}

/// Builds the instruction prompt for `text`.
pub fn build_prompt(text: &str) -> String {
    format!(
        "You identify sensitive personal information in text. Report ONLY real entities \
         of these types:\n\
         - PERSON: full names of real people (first and last name)\n\
         - EMAIL: email addresses\n\
         - ORGANIZATION: company or organization names\n\
         - AGE: statements of a person's age\n\n\
         Answer with a JSON array and nothing else. Every element must have the keys \
         text, label, start and end, where start and end are character offsets.\n\n\
         Example:\n\
         [{{\"text\": \"John Smith\", \"label\": \"PERSON\", \"start\": 0, \"end\": 10}}]\n\n\
         Text:\n{text}\n\nJSON:"
    )
}

/// Extracts and parses the JSON array between the first `[` and the last `]`.
pub fn parse_entities(output: &str) -> AnonymizerResult<Vec<Value>> {
    let (Some(start), Some(end)) = (output.find('['), output.rfind(']')) else {
        return Err(protocol("no JSON array in reply"));
    };
    if end < start {
        return Err(protocol("no JSON array in reply"));
    }
    serde_json::from_str(&output[start..=end])
        .map_err(|e| protocol(format!("malformed JSON array: {e}")))
}

fn field_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Detector delegating to a [`CompletionClient`].
#[derive(Debug)]
pub struct ExternalModelDetector {
    client: Box<dyn CompletionClient>,
    rules: Arc<CompiledRules>,
    timeout: Duration,
    fallback: PatternDetector,
}

impl ExternalModelDetector {
    pub fn new(client: Box<dyn CompletionClient>, rules: Arc<CompiledRules>) -> Self {
        Self {
            client,
            fallback: PatternDetector::new(Arc::clone(&rules)),
            rules,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks one reported entity and anchors it in `text`.
    ///
    /// Reported offsets are kept when they address the entity text; otherwise
    /// the first literal occurrence is used. Entities not present in `text`
    /// yield `None`.
    fn validate(&self, entity: &Value, text: &str, offsets: &CharOffsets) -> Option<Span> {
        let object = entity.as_object()?;
        let (Some(raw_text), Some(raw_label), Some(start), Some(end)) = (
            object.get("text"),
            object.get("label"),
            object.get("start"),
            object.get("end"),
        ) else {
            return None;
        };

        let entity_text = field_string(raw_text);
        let entity_text = entity_text.trim();
        let label = field_string(raw_label);
        let label = label.trim();

        if entity_text.chars().count() < 2 || self.rules.is_label_placeholder(label) {
            return None;
        }
        let kind = EntityKind::from_label(label);
        if !is_valid_reported_entity(entity_text, &kind, &self.rules) {
            return None;
        }

        let reported = start
            .as_u64()
            .zip(end.as_u64())
            .and_then(|(s, e)| Some((usize::try_from(s).ok()?, usize::try_from(e).ok()?)));
        if let Some((start, end)) = reported {
            if offsets.slice(text, start, end) == Some(entity_text) {
                return Some(Span::new(entity_text, kind, start, end));
            }
        }

        let byte = text.find(entity_text)?;
        debug!(entity = entity_text, "re-anchored external entity");
        Some(offsets.span(text, kind, byte, byte + entity_text.len()))
    }

    fn try_detect(&self, text: &str) -> AnonymizerResult<Vec<Span>> {
        let reply = self.client.complete(&build_prompt(text), self.timeout)?;
        let entities = parse_entities(&reply)?;

        let offsets = CharOffsets::new(text);
        let spans: Vec<Span> = entities
            .iter()
            .filter_map(|entity| self.validate(entity, text, &offsets))
            .collect();

        if spans.is_empty() {
            return Err(protocol(format!(
                "none of {} reported entities passed validation",
                entities.len()
            )));
        }
        Ok(resolve_overlaps(spans).into_vec())
    }
}

impl Detector for ExternalModelDetector {
    fn detect_with_source(&self, text: &str) -> Detection {
        match self.try_detect(text) {
            Ok(spans) => {
                debug!(spans = spans.len(), model = self.client.model(), "external detection finished");
                Detection {
                    spans,
                    detector_used: DetectorUsed::External {
                        model: self.client.model().to_string(),
                    },
                }
            }
            Err(e) => {
                warn!(error = %e, "external detector failed, falling back to pattern detection");
                Detection {
                    spans: self.fallback.detect(text),
                    detector_used: DetectorUsed::Fallback {
                        from: DetectorKind::External,
                    },
                }
            }
        }
    }

    fn name(&self) -> &str {
        "external"
    }
}
