//! Component location (front/rear/upper/lower) and side (right/left).
//!
//! The two are separate record fields with separate vocabularies, even
//! though the knowledge base stores both in `component_locations`.

use crate::record::{Extracted, ExtractionMethod};
use crate::rules::{FieldKind, RuleSet};

use super::ExtractInput;

const LOCATIONS: &[&str] = &["Front", "Rear", "Upper", "Lower"];

const LOCATION_TERMS: &[(&str, &str)] = &[
    ("קדמי", "Front"),
    ("אחורי", "Rear"),
    ("עליון", "Upper"),
    ("תחתון", "Lower"),
    ("front", "Front"),
    ("rear", "Rear"),
    ("upper", "Upper"),
    ("lower", "Lower"),
];

const SIDE_TERMS: &[(&str, &str)] = &[
    ("ימין", "Right"),
    ("שמאל", "Left"),
    ("right", "Right"),
    ("left", "Left"),
];

pub(crate) fn extract(
    input: &ExtractInput<'_>,
    rules: &mut RuleSet,
) -> (Option<Extracted<String>>, Option<Extracted<String>>) {
    let mut location = None;

    for rule in rules.iter_mut() {
        let FieldKind::Location { location: loc } = &rule.kind else {
            continue;
        };
        // Right/Left live in the same knowledge-base section but are side
        // values, not locations.
        if !LOCATIONS.contains(&loc.as_str()) {
            continue;
        }
        let loc = loc.clone();
        if rule
            .try_match(input.normalized, input.kb, input.indexes)
            .is_some()
        {
            location = Some(Extracted::new(loc, 0.8, ExtractionMethod::PatternMatch));
            break;
        }
    }

    if location.is_none() {
        for (term, loc) in LOCATION_TERMS {
            if input.normalized.contains(term) {
                location = Some(Extracted::new(
                    loc.to_string(),
                    0.8,
                    ExtractionMethod::DirectTextMatch,
                ));
                break;
            }
        }
    }

    let mut side = None;
    for (term, value) in SIDE_TERMS {
        if input.normalized.contains(term) {
            side = Some(Extracted::direct(value.to_string()));
            break;
        }
    }

    (location, side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::Capabilities;
    use crate::kb::index::Indexes;
    use crate::kb::KnowledgeBase;
    use crate::normalize::TextNormalizer;

    fn run(raw: &str) -> (Option<Extracted<String>>, Option<Extracted<String>>) {
        let kb = KnowledgeBase::seed();
        let normalizer = TextNormalizer::new(&kb);
        let indexes = Indexes::build(&kb, &normalizer, None);
        let mut rules = RuleSet::compile(&kb);
        let caps = Capabilities::none();
        let normalized = normalizer.normalize(raw, None);
        let input = ExtractInput {
            raw,
            normalized: &normalized,
            kb: &kb,
            indexes: &indexes,
            caps: &caps,
        };
        extract(&input, &mut rules)
    }

    #[test]
    fn front_right() {
        let (location, side) = run("בולם קדמי ימין מזדה 3");
        assert_eq!(location.unwrap().value, "Front");
        assert_eq!(side.unwrap().value, "Right");
    }

    #[test]
    fn rear_left() {
        let (location, side) = run("בולם אחורי שמאל");
        assert_eq!(location.unwrap().value, "Rear");
        assert_eq!(side.unwrap().value, "Left");
    }

    #[test]
    fn side_alone_is_not_a_location() {
        let (location, side) = run("מראה ימין");
        assert!(location.is_none());
        assert_eq!(side.unwrap().value, "Right");
    }

    #[test]
    fn english_terms() {
        let (location, side) = run("shock front left");
        assert_eq!(location.unwrap().value, "Front");
        assert_eq!(side.unwrap().value, "Left");
    }

    #[test]
    fn upper_lower() {
        let (location, _) = run("משולש עליון");
        assert_eq!(location.unwrap().value, "Upper");
    }
}
