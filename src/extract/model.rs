//! Car model extraction.
//!
//! The only extractor with a cross-field dependency: when the make is
//! already known, lookups are restricted to models actually linked to
//! that make, and an unverifiable hit falls through to the next tier
//! instead of being reported.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::caps;
use crate::record::{Extracted, ExtractionMethod};
use crate::rules::{FieldKind, RuleSet};

use super::{phrase_windows, ExtractInput};

static I_MODEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[Ii](\d{1,2})\b").expect("i-model regex"));

pub(crate) fn extract(
    input: &ExtractInput<'_>,
    rules: &mut RuleSet,
    car_make: Option<&str>,
) -> Option<Extracted<String>> {
    // Pattern rules first: the make+model sequences are the most specific
    // evidence a line can carry.
    for rule in rules.iter_mut() {
        match rule.kind.clone() {
            FieldKind::ModelForMake { make, model } => {
                if rule.try_match(input.raw, input.kb, input.indexes).is_some()
                    && car_make.map_or(true, |m| m == make)
                {
                    return Some(Extracted::new(
                        model,
                        0.9,
                        ExtractionMethod::PatternMatchWithMake,
                    ));
                }
            }
            FieldKind::Model { model } => {
                if rule.try_match(input.raw, input.kb, input.indexes).is_none() {
                    continue;
                }
                match car_make {
                    None => {
                        return Some(Extracted::new(model, 0.85, ExtractionMethod::PatternMatch))
                    }
                    Some(make) if input.indexes.model_belongs_to_make(make, &model) => {
                        return Some(Extracted::new(
                            model,
                            0.9,
                            ExtractionMethod::PatternMatchVerified,
                        ))
                    }
                    Some(_) => continue,
                }
            }
            _ => continue,
        }
    }

    // Hyundai i-model shorthand.
    if car_make.map_or(true, |m| m == "Hyundai") {
        if let Some(number) = I_MODEL
            .captures(input.raw)
            .and_then(|caps| caps.get(1)?.as_str().parse::<i32>().ok())
        {
            if (10..=40).contains(&number) {
                return Some(Extracted::new(
                    format!("i{number}"),
                    0.95,
                    ExtractionMethod::IModelPattern,
                ));
            }
        }
    }

    let tokens = input.tokens();

    for token in &tokens {
        let Some(model) = input.indexes.models.get(*token) else {
            continue;
        };
        match car_make {
            None => {
                return Some(Extracted::new(
                    model.clone(),
                    0.8,
                    ExtractionMethod::DirectLookup,
                ))
            }
            Some(make) if input.indexes.model_belongs_to_make(make, model) => {
                return Some(Extracted::new(
                    model.clone(),
                    0.9,
                    ExtractionMethod::DirectLookupVerified,
                ))
            }
            Some(_) => continue,
        }
    }

    // Bare digits after the make's spelling ("מזדה 3").
    if let Some(make) = car_make {
        if let Some(spelling) = input.kb.make_spelling(make) {
            let pattern = format!(r"{}\s*(\d+)", regex::escape(spelling));
            if let Ok(re) = Regex::new(&pattern) {
                if let Some(caps) = re.captures(input.raw) {
                    return Some(Extracted::new(
                        caps[1].to_string(),
                        0.85,
                        ExtractionMethod::NumericModelMatch,
                    ));
                }
            }
        }
    }

    for phrase in phrase_windows(&tokens, 3) {
        let Some(model) = input.indexes.models.get(&phrase) else {
            continue;
        };
        match car_make {
            None => {
                return Some(Extracted::new(
                    model.clone(),
                    0.8,
                    ExtractionMethod::PhraseMatch,
                ))
            }
            Some(make) if input.indexes.model_belongs_to_make(make, model) => {
                return Some(Extracted::new(
                    model.clone(),
                    0.9,
                    ExtractionMethod::PhraseMatchVerified,
                ))
            }
            Some(_) => continue,
        }
    }

    // Embedding fallback, restricted to the known make's models.
    if let (Some(make), Some(embedder)) = (car_make, input.caps.embedder.as_deref()) {
        if let Some(models) = input.indexes.make_to_models.get(make) {
            let mut candidates: Vec<(String, &str)> = Vec::new();
            for info in models {
                candidates.push((info.name.to_lowercase(), info.name.as_str()));
                candidates.push((info.spelling.to_lowercase(), info.name.as_str()));
            }
            let borrowed = candidates.iter().map(|(t, v)| (t.as_str(), *v));
            if let Some((model, sim)) = caps::best_by_similarity(embedder, &tokens, borrowed) {
                return Some(Extracted::new(
                    model.to_string(),
                    sim * 0.8,
                    ExtractionMethod::WordEmbedding,
                ));
            }
        }
    }

    // Last resort: the make's first known model, clearly tagged as a
    // default so callers can ignore it.
    if let Some(make) = car_make {
        if let Some(info) = input.indexes.default_model_for_make(make) {
            return Some(Extracted::new(
                info.name.clone(),
                0.3,
                ExtractionMethod::DefaultForMake,
            ));
        }
    }

    None
}
