//! Car make extraction.
//!
//! Ladder: exact token lookup, whole-string lookup, phrase windows, make
//! pattern rules, inference from a matched make+model pattern, inference
//! from a model term in the text, and finally the optional embedding
//! fallback.

use crate::caps;
use crate::record::{Extracted, ExtractionMethod};
use crate::rules::{FieldKind, RuleSet};

use super::{phrase_windows, ExtractInput};

pub(crate) fn extract(input: &ExtractInput<'_>, rules: &mut RuleSet) -> Option<Extracted<String>> {
    let tokens = input.tokens();

    for token in &tokens {
        if let Some(make) = input.indexes.makes.get(*token) {
            return Some(Extracted::new(make.clone(), 0.95, ExtractionMethod::ExactMatch));
        }
    }

    if let Some(make) = input.indexes.makes.get(input.normalized) {
        return Some(Extracted::new(make.clone(), 0.9, ExtractionMethod::ExactMatch));
    }

    for phrase in phrase_windows(&tokens, 3) {
        if let Some(make) = input.indexes.makes.get(&phrase) {
            return Some(Extracted::new(make.clone(), 0.85, ExtractionMethod::PhraseMatch));
        }
    }

    for rule in rules.iter_mut() {
        let FieldKind::Make { make } = &rule.kind else {
            continue;
        };
        let make = make.clone();
        if rule.try_match(input.raw, input.kb, input.indexes).is_some() {
            return Some(Extracted::new(make, 0.9, ExtractionMethod::PatternMatch));
        }
    }

    // A make+model pattern carries the make even when no make spelling
    // appears on its own.
    for rule in rules.iter_mut() {
        let FieldKind::ModelForMake { make, .. } = &rule.kind else {
            continue;
        };
        let make = make.clone();
        if rule.try_match(input.raw, input.kb, input.indexes).is_some() {
            return Some(Extracted::new(make, 0.8, ExtractionMethod::InferredFromModel));
        }
    }

    // A bare model term still pins down its make.
    let mut model_terms: Vec<(&String, &String)> = input.indexes.models.iter().collect();
    model_terms.sort_unstable();
    for (term, model) in model_terms {
        if !input.normalized.contains(term.as_str()) {
            continue;
        }
        let make = input
            .kb
            .car_models
            .values()
            .find(|entry| &entry.english == model)
            .and_then(|entry| entry.make.clone());
        if let Some(make) = make {
            return Some(Extracted::new(
                make,
                0.75,
                ExtractionMethod::InferredFromModelMatch,
            ));
        }
    }

    if let Some(embedder) = input.caps.embedder.as_deref() {
        let mut candidates: Vec<(&str, &str)> = input
            .indexes
            .makes
            .iter()
            .map(|(term, make)| (term.as_str(), make.as_str()))
            .collect();
        candidates.sort_unstable();
        if let Some((make, sim)) =
            caps::best_by_similarity(embedder, &tokens, candidates.into_iter())
        {
            return Some(Extracted::new(
                make.to_string(),
                sim * 0.8,
                ExtractionMethod::WordEmbedding,
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::Capabilities;
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

    fn run(f: &mut Fixture, raw: &str) -> Option<Extracted<String>> {
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
    fn exact_token() {
        let mut f = fixture();
        let got = run(&mut f, "בולם קדמי מזדה 3").unwrap();
        assert_eq!(got.value, "Mazda");
        assert_eq!(got.method, ExtractionMethod::ExactMatch);
        assert!((got.confidence.get() - 0.95).abs() < 1e-10);
    }

    #[test]
    fn alias_token() {
        let mut f = fixture();
        let got = run(&mut f, "רדיאטור mazda").unwrap();
        assert_eq!(got.value, "Mazda");
        assert_eq!(got.method, ExtractionMethod::ExactMatch);
    }

    #[test]
    fn multi_word_make_via_phrase() {
        let mut f = fixture();
        let got = run(&mut f, "בולם לנד רובר").unwrap();
        assert_eq!(got.value, "Land Rover");
        assert_eq!(got.method, ExtractionMethod::PhraseMatch);
    }

    #[test]
    fn inferred_from_model_term() {
        let mut f = fixture();
        let got = run(&mut f, "i20").unwrap();
        assert_eq!(got.value, "Hyundai");
        assert_eq!(got.method, ExtractionMethod::InferredFromModelMatch);
        assert!((got.confidence.get() - 0.75).abs() < 1e-10);
    }

    #[test]
    fn no_match() {
        let mut f = fixture();
        assert!(run(&mut f, "בולם קדמי").is_none());
    }
}
