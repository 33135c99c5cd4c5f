//! Part category extraction.
//!
//! The filter abbreviations (`פ.שמן` and friends) are checked on the raw
//! line before anything else: normalization expands the `פ.` shorthand
//! away, and the abbreviated form is the single strongest category signal
//! these listings carry.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::caps::{self, CLASSIFIER_PROBABILITY_THRESHOLD};
use crate::record::{Extracted, ExtractionMethod};
use crate::rules::{FieldKind, RuleSet};

use super::{phrase_windows, ExtractInput};

/// Category plus the optional subcategory recognized alongside it.
pub(crate) struct CategoryMatch {
    pub category: Extracted<String>,
    pub specific: Option<String>,
}

impl CategoryMatch {
    fn plain(category: Extracted<String>) -> Self {
        Self {
            category,
            specific: None,
        }
    }
}

static FILTER_ABBREVIATIONS: &[(&str, &str)] = &[
    (r"פ\.אויר", "Air Filter"),
    (r"פ\.שמן", "Oil Filter"),
    (r"פ\.דלק", "Fuel Filter"),
    (r"פ\.מזגן", "AC Filter"),
    (r"פ\.סולר", "Diesel Filter"),
];

static FILTER_REGEXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    FILTER_ABBREVIATIONS
        .iter()
        .map(|(pattern, category)| {
            (
                Regex::new(pattern).expect("filter abbreviation regex"),
                *category,
            )
        })
        .collect()
});

static SUSPENSION_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(בולם|קפיץ|משולש|זרוע|מייצב)\b").expect("suspension group regex"));
static BRAKES_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(רפידות|דסקיות|צלחות|קליפר)\b").expect("brakes group regex"));
static ENGINE_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(אטם|טיימינג|שרשרת|רצועת|מסנן שמן|מנוע)\b").expect("engine group regex")
});
static HVAC_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(מזגן|מעבה|מאייד|מפוח)\b").expect("hvac group regex"));

pub(crate) fn extract(input: &ExtractInput<'_>, rules: &mut RuleSet) -> Option<CategoryMatch> {
    for (re, category) in FILTER_REGEXES.iter() {
        if re.is_match(input.raw) {
            return Some(CategoryMatch::plain(Extracted::new(
                category.to_string(),
                0.95,
                ExtractionMethod::AbbreviationPattern,
            )));
        }
    }

    for token in input.tokens() {
        let Some(category) = input.indexes.categories.get(token) else {
            continue;
        };
        // A lexicon hit may come with a subcategory term elsewhere in the
        // line ("פילטר אויר").
        for entry in input.kb.part_categories.values() {
            if &entry.english != category {
                continue;
            }
            for sub in &entry.subcategories {
                if input.normalized.contains(&sub.to_lowercase()) {
                    return Some(CategoryMatch {
                        category: Extracted::new(
                            category.clone(),
                            0.9,
                            ExtractionMethod::DirectLookupWithSubcategory,
                        ),
                        specific: Some(sub.clone()),
                    });
                }
            }
        }
        return Some(CategoryMatch::plain(Extracted::new(
            category.clone(),
            0.9,
            ExtractionMethod::DirectLookup,
        )));
    }

    for rule in rules.iter_mut() {
        let FieldKind::Category {
            category,
            subcategory,
        } = rule.kind.clone()
        else {
            continue;
        };
        if rule.try_match(input.raw, input.kb, input.indexes).is_none() {
            continue;
        }
        let confidence = 0.9 * rule.precision();
        return Some(match subcategory {
            Some(sub) => CategoryMatch {
                category: Extracted::new(
                    category,
                    confidence,
                    ExtractionMethod::PatternMatchWithSpecific,
                ),
                specific: Some(sub),
            },
            None => CategoryMatch::plain(Extracted::new(
                category,
                confidence,
                ExtractionMethod::PatternMatch,
            )),
        });
    }

    for (re, group) in [
        (&*SUSPENSION_GROUP, "Suspension"),
        (&*BRAKES_GROUP, "Brakes"),
        (&*ENGINE_GROUP, "Engine"),
        (&*HVAC_GROUP, "Air Conditioning"),
    ] {
        if re.is_match(input.normalized) {
            return Some(CategoryMatch::plain(Extracted::new(
                group.to_string(),
                0.85,
                ExtractionMethod::ComponentGroupMatch,
            )));
        }
    }

    let tokens = input.tokens();
    for phrase in phrase_windows(&tokens, 3) {
        if let Some(category) = input.indexes.categories.get(&phrase) {
            return Some(CategoryMatch::plain(Extracted::new(
                category.clone(),
                0.8,
                ExtractionMethod::PhraseMatch,
            )));
        }
    }

    if let Some(classifier) = input.caps.classifier.as_deref() {
        if let Some((category, probability)) = classifier.classify(input.normalized) {
            if probability > CLASSIFIER_PROBABILITY_THRESHOLD {
                return Some(CategoryMatch::plain(Extracted::new(
                    category,
                    probability,
                    ExtractionMethod::MlClassification,
                )));
            }
        }
    }

    if let Some(embedder) = input.caps.embedder.as_deref() {
        let mut candidates: Vec<(&str, &str)> = input
            .indexes
            .categories
            .iter()
            .map(|(term, category)| (term.as_str(), category.as_str()))
            .collect();
        candidates.sort_unstable();
        if let Some((category, sim)) =
            caps::best_by_similarity(embedder, &tokens, candidates.into_iter())
        {
            return Some(CategoryMatch::plain(Extracted::new(
                category.to_string(),
                sim * 0.8,
                ExtractionMethod::WordEmbedding,
            )));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::{Capabilities, CategoryClassifier};
    use crate::kb::index::Indexes;
    use crate::kb::KnowledgeBase;
    use crate::normalize::TextNormalizer;

    struct Fixture {
        kb: KnowledgeBase,
        indexes: Indexes,
        rules: RuleSet,
        caps: Capabilities,
        normalizer: TextNormalizer,
    }

    fn fixture() -> Fixture {
        let kb = KnowledgeBase::seed();
        let normalizer = TextNormalizer::new(&kb);
        let indexes = Indexes::build(&kb, &normalizer, None);
        let rules = RuleSet::compile(&kb);
        Fixture {
            kb,
            indexes,
            rules,
            caps: Capabilities::none(),
            normalizer,
        }
    }

    fn run(f: &mut Fixture, raw: &str) -> Option<CategoryMatch> {
        let normalized = f.normalizer.normalize(raw, None);
        let input = ExtractInput {
            raw,
            normalized: &normalized,
            kb: &f.kb,
            indexes: &f.indexes,
            caps: &f.caps,
        };
        extract(&input, &mut f.rules)
    }

    #[test]
    fn filter_abbreviation_beats_everything() {
        let mut f = fixture();
        let got = run(&mut f, "פ.שמן טויוטה קורולה").unwrap();
        assert_eq!(got.category.value, "Oil Filter");
        assert_eq!(got.category.method, ExtractionMethod::AbbreviationPattern);
        assert!((got.category.confidence.get() - 0.95).abs() < 1e-10);
    }

    #[test]
    fn all_filter_abbreviations() {
        let mut f = fixture();
        for (raw, expected) in [
            ("פ.אויר", "Air Filter"),
            ("פ.דלק", "Fuel Filter"),
            ("פ.מזגן", "AC Filter"),
            ("פ.סולר", "Diesel Filter"),
        ] {
            let got = run(&mut f, raw).unwrap();
            assert_eq!(got.category.value, expected, "for {raw}");
        }
    }

    #[test]
    fn direct_lookup() {
        let mut f = fixture();
        let got = run(&mut f, "בולם קדמי ימין מזדה 3").unwrap();
        assert_eq!(got.category.value, "Shock Absorber");
        assert_eq!(got.category.method, ExtractionMethod::DirectLookup);
    }

    #[test]
    fn lookup_with_subcategory() {
        let mut f = fixture();
        let got = run(&mut f, "פילטר אויר יונדאי").unwrap();
        assert_eq!(got.category.value, "Filter");
        assert_eq!(got.specific.as_deref(), Some("אויר"));
        assert_eq!(
            got.category.method,
            ExtractionMethod::DirectLookupWithSubcategory
        );
    }

    #[test]
    fn component_group_fallback() {
        let mut f = fixture();
        // "קליפר" is not a lexicon category but belongs to the brakes group.
        let got = run(&mut f, "קליפר שמאל").unwrap();
        assert_eq!(got.category.value, "Brakes");
        assert_eq!(got.category.method, ExtractionMethod::ComponentGroupMatch);
    }

    #[test]
    fn classifier_gated_by_threshold() {
        struct Always(f64);
        impl CategoryClassifier for Always {
            fn classify(&self, _text: &str) -> Option<(String, f64)> {
                Some(("Radiator".to_string(), self.0))
            }
        }

        let mut f = fixture();
        f.caps = Capabilities::none().with_classifier(Box::new(Always(0.5)));
        assert!(run(&mut f, "abcdef").is_none());

        f.caps = Capabilities::none().with_classifier(Box::new(Always(0.8)));
        let got = run(&mut f, "abcdef").unwrap();
        assert_eq!(got.category.value, "Radiator");
        assert_eq!(got.category.method, ExtractionMethod::MlClassification);
    }

    #[test]
    fn nothing_recognized() {
        let mut f = fixture();
        assert!(run(&mut f, "xyz qwerty").is_none());
    }
}
