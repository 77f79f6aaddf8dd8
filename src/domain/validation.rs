//! Kind-specific validity predicates for candidate spans.
//!
//! Each detector applies the predicate matching its reliability: the pattern
//! detector only rejects stop-word pairs, model output goes through the full
//! person-name filter, and entities reported by an external process are
//! checked for shape.

use super::rules::CompiledRules;
use super::span::EntityKind;
use once_cell::sync::Lazy;
use regex::Regex;

fn digit_run() -> &'static Regex {
    static PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("Valid regex"));
    &PATTERN
}

/// Byte offset and value of the first run of ASCII digits in `text`.
pub fn find_number(text: &str) -> Option<(usize, u64)> {
    let found = digit_run().find(text)?;
    Some((found.start(), found.as_str().parse().ok()?))
}

/// First run of ASCII digits in `text`, parsed.
pub fn embedded_number(text: &str) -> Option<u64> {
    find_number(text).map(|(_, value)| value)
}

/// Conservative two-token person check: neither token may be a stop-word.
pub fn is_conservative_person(text: &str, rules: &CompiledRules) -> bool {
    !text.split_whitespace().any(|token| rules.is_stop_word(token))
}

/// The embedded age lies inside the configured plausible range.
pub fn is_plausible_age(text: &str, rules: &CompiledRules) -> bool {
    let (min, max) = rules.age_range();
    embedded_number(text).is_some_and(|age| (u64::from(min)..=u64::from(max)).contains(&age))
}

/// Post-filter for PERSON candidates produced by a statistical model.
pub fn is_valid_person_name(text: &str, rules: &CompiledRules) -> bool {
    let text = text.trim();
    let length = text.chars().count();

    if !(2..=50).contains(&length) {
        return false;
    }
    if text.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if rules.hits_denylist(text) {
        return false;
    }
    if length >= 3 && text.chars().all(|c| c.is_uppercase()) {
        return false;
    }
    if !text.chars().any(char::is_alphabetic) {
        return false;
    }

    let tokens: Vec<&str> = text.split_whitespace().collect();
    match tokens.as_slice() {
        [single] => single.chars().count() >= 3 && starts_uppercase(single),
        many => many
            .iter()
            .all(|token| starts_uppercase(token) && token.chars().count() >= 2),
    }
}

fn starts_uppercase(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

/// Shape check for an entity reported by an external detection process.
pub fn is_valid_reported_entity(text: &str, kind: &EntityKind, rules: &CompiledRules) -> bool {
    let text = text.trim();
    match kind {
        EntityKind::Person => {
            text.split_whitespace().count() >= 2 && rules.person_shape().is_match(text)
        }
        EntityKind::Email => rules.email_shape().is_match(text),
        EntityKind::Organization => {
            text.chars().count() > 2 && !rules.is_organization_stop_word(text)
        }
        EntityKind::Age => digit_run().is_match(text),
        EntityKind::Other(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_number() {
        assert_eq!(find_number("âgé de 34 ans"), Some((9, 34)));
        assert_eq!(find_number("no digits"), None);
        assert_eq!(embedded_number("aged 7 and 9"), Some(7));
    }

    #[test]
    fn test_person_name_filter() {
        let rules = CompiledRules::builtin();
        assert!(is_valid_person_name("Jean Dupont", &rules));
        assert!(is_valid_person_name("Albert", &rules));
        assert!(is_valid_person_name("Émile Zola", &rules));

        assert!(!is_valid_person_name("Al", &rules));
        assert!(!is_valid_person_name("NASA", &rules));
        assert!(!is_valid_person_name("Agent 007", &rules));
        assert!(!is_valid_person_name("Technopark Casablanca", &rules));
        assert!(!is_valid_person_name("Chef de Projet", &rules));
        assert!(!is_valid_person_name("jean dupont", &rules));
        assert!(!is_valid_person_name("Jean D", &rules));
        assert!(!is_valid_person_name(&"Abcdefghij ".repeat(6), &rules));
    }

    #[test]
    fn test_conservative_person() {
        let rules = CompiledRules::builtin();
        assert!(is_conservative_person("Jean Dupont", &rules));
        assert!(!is_conservative_person("Contact Jean", &rules));
        assert!(!is_conservative_person("The Company", &rules));
    }

    #[test]
    fn test_age_range() {
        let rules = CompiledRules::builtin();
        assert!(is_plausible_age("34 ans", &rules));
        assert!(is_plausible_age("âgé de 16 ans", &rules));
        assert!(!is_plausible_age("12 ans", &rules));
        assert!(!is_plausible_age("ans", &rules));
    }

    #[test]
    fn test_reported_entity_shapes() {
        let rules = CompiledRules::builtin();
        assert!(is_valid_reported_entity("Jean Dupont", &EntityKind::Person, &rules));
        assert!(!is_valid_reported_entity("Jean", &EntityKind::Person, &rules));
        assert!(is_valid_reported_entity("a.b@example.org", &EntityKind::Email, &rules));
        assert!(!is_valid_reported_entity("a.b@example", &EntityKind::Email, &rules));
        assert!(is_valid_reported_entity("Holokia", &EntityKind::Organization, &rules));
        assert!(!is_valid_reported_entity("The", &EntityKind::Organization, &rules));
        assert!(is_valid_reported_entity("34 ans", &EntityKind::Age, &rules));
        assert!(!is_valid_reported_entity("trente", &EntityKind::Age, &rules));
        assert!(!is_valid_reported_entity(
            "Paris",
            &EntityKind::Other("GPE".to_string()),
            &rules
        ));
    }
}
