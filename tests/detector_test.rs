//! Detector selection, model lexicons and the external process protocol.

mod common;

use anonymizer::config::ExternalConfig;
use anonymizer::detection::{Detector, DetectorBackend, LexiconModel, ModelDetector, NerModel};
use anonymizer::domain::CompiledRules;
use anonymizer::{AnonymizerConfig, DetectorKind, EntityKind, Pipeline};
use common::*;
use std::fs;
use std::time::{Duration, Instant};

mod model {
    use super::*;

    #[test]
    fn test_english_model_when_no_french() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("en.toml"),
            "[[entries]]\ntext = \"Initech\"\nlabel = \"ORG\"\n",
        )
        .unwrap();

        let detector = ModelDetector::load(Some(dir.path()), CompiledRules::builtin());
        assert_eq!(detector.language(), Some("en"));

        let detection = detector.detect_with_source("Peter Gibbons works at Initech.");
        assert_eq!(detection.detector_used.to_string(), "model:en");
        assert!(detection
            .spans
            .iter()
            .any(|s| s.text() == "Initech" && s.kind() == &EntityKind::Organization));
    }

    #[test]
    fn test_broken_french_model_falls_through_to_english() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fr.toml"), "[[entries]]\nlabel = \"PER\"\n").unwrap();
        fs::write(dir.path().join("en.toml"), "language = \"en\"\n").unwrap();

        let detector = ModelDetector::load(Some(dir.path()), CompiledRules::builtin());
        assert_eq!(detector.language(), Some("en"));
    }

    #[test]
    fn test_model_ages_and_first_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = AnonymizerConfig {
            detector: DetectorKind::Model,
            model_dir: Some(create_model_dir(dir.path()).unwrap()),
            seed: Some(2),
            ..AnonymizerConfig::default()
        };
        let pipeline = Pipeline::from_config(&config).unwrap();
        let mut registry = pipeline.new_registry();
        let output = pipeline
            .run("Sarah, âgée de 31 ans, écrit à sarah@holokia.ma.", &mut registry)
            .unwrap();

        let found: Vec<(&str, &EntityKind)> =
            output.spans.iter().map(|s| (s.text(), s.kind())).collect();
        assert!(found.contains(&("Sarah", &EntityKind::Person)));
        assert!(found.contains(&("sarah@holokia.ma", &EntityKind::Email)));
        assert!(found
            .iter()
            .any(|(text, kind)| text.contains("31 ans") && **kind == EntityKind::Age));
        assert_non_overlapping(&output.spans);
    }

    #[test]
    fn test_lexicon_reports_char_offsets() {
        let model = LexiconModel::from_toml(
            "[[entries]]\ntext = \"Zoé Durand\"\nlabel = \"PER\"\n",
            "fr",
        )
        .unwrap();
        let entities = model.entities("Élodie et Zoé Durand");
        assert_eq!(entities.len(), 1);
        assert_eq!((entities[0].start, entities[0].end), (10, 20));
    }

    #[test]
    fn test_invalid_lexicon_pattern() {
        let err = LexiconModel::from_toml("[[patterns]]\npattern = \"(\"\nlabel = \"PER\"\n", "fr")
            .unwrap_err();
        assert!(err.to_string().contains("Pattern error"));
    }
}

#[cfg(unix)]
mod external {
    use super::*;

    fn external_config(script: &str, timeout_secs: u64) -> AnonymizerConfig {
        AnonymizerConfig {
            detector: DetectorKind::External,
            seed: Some(6),
            external: ExternalConfig {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
                model: "test-model".to_string(),
                timeout_secs,
            },
            ..AnonymizerConfig::default()
        }
    }

    #[test]
    fn test_reply_with_prose_around_json() {
        let script = r#"cat > /dev/null; printf '%s\n' 'Sure! [{"text": "Jean Dupont", "label": "PERSON", "start": 3, "end": 9}] Hope this helps.'"#;
        let pipeline = Pipeline::from_config(&external_config(script, 10)).unwrap();
        let mut registry = pipeline.new_registry();
        let output = pipeline.run(CONTACT_TEXT, &mut registry).unwrap();

        assert_eq!(output.detector_used.to_string(), "external:test-model");
        assert_eq!(output.spans.len(), 1);
        // wrong offsets are re-anchored on the literal text
        assert_eq!((output.spans[0].start(), output.spans[0].end()), (8, 19));
        assert!(!output.anonymized_text.contains("Jean Dupont"));
        // only what the process reported is replaced
        assert!(output.anonymized_text.contains("jean.dupont@example.com"));
    }

    #[test]
    fn test_invalid_entities_are_dropped() {
        let script = r#"cat > /dev/null; echo '[{"text": "Jean Dupont", "label": "PERSON", "start": 8, "end": 19}, {"text": "x", "label": "PERSON", "start": 0, "end": 1}, {"text": "Ghost Person", "label": "PERSON", "start": 0, "end": 12}, {"text": "Contact", "label": "label", "start": 0, "end": 7}, {"label": "EMAIL"}]'"#;
        let result = Pipeline::from_config(&external_config(script, 10))
            .unwrap()
            .anonymize(CONTACT_TEXT);

        assert!(result.success);
        assert_eq!(result.statistics.detector_used, "external:test-model");
        assert_eq!(result.mapping.keys().collect::<Vec<_>>(), vec!["Jean Dupont"]);
    }

    #[test]
    fn test_failing_process_falls_back() {
        let script = "cat > /dev/null; echo 'model not found' >&2; exit 3";
        let result = Pipeline::from_config(&external_config(script, 10))
            .unwrap()
            .anonymize(CONTACT_TEXT);

        assert_eq!(result.statistics.detector_used, "pattern (fallback from external)");
        assert_eq!(result.statistics.entities_found, 3);
        assert_fully_anonymized(&result);
    }

    #[test]
    fn test_reply_without_json_falls_back() {
        let script = "cat > /dev/null; echo 'I cannot help with that.'";
        let result = Pipeline::from_config(&external_config(script, 10))
            .unwrap()
            .anonymize(CONTACT_TEXT);

        assert_eq!(result.statistics.detector_used, "pattern (fallback from external)");
        assert!(result.mapping.contains_key("jean.dupont@example.com"));
    }

    #[test]
    fn test_timeout_falls_back() {
        let started = Instant::now();
        let result = Pipeline::from_config(&external_config("exec sleep 20", 1))
            .unwrap()
            .anonymize(CONTACT_TEXT);

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(result.success);
        assert_eq!(result.statistics.detector_used, "pattern (fallback from external)");
        assert_eq!(result.statistics.entities_found, 3);
    }

    #[test]
    fn test_timeout_does_not_wait_for_grandchildren() {
        // the shell forks `sleep`, which keeps stdout open after the shell is killed
        let started = Instant::now();
        let result = Pipeline::from_config(&external_config("sleep 20; echo '[]'", 1))
            .unwrap()
            .anonymize(CONTACT_TEXT);

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(result.statistics.detector_used, "pattern (fallback from external)");
    }

    #[test]
    fn test_backend_carries_configured_timeout() {
        let config = external_config("true", 7);
        match DetectorBackend::from_config(&config, CompiledRules::builtin()) {
            DetectorBackend::External(detector) => {
                assert_eq!(detector.timeout(), Duration::from_secs(7));
                assert_eq!(detector.name(), "external");
            }
            other => panic!("expected external backend, got {other:?}"),
        }
    }
}
