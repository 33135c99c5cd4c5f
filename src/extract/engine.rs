//! Engine code and displacement extraction.
//!
//! Codes are matched against the raw line (they are written in Latin
//! uppercase; the normalized line is lowercased). A recognized code with
//! no written displacement pulls the displacement from the code's
//! knowledge-base entry.

use crate::record::{Extracted, ExtractionMethod};
use crate::rules::{FieldKind, RuleSet};

use super::ExtractInput;

pub(crate) fn extract(
    input: &ExtractInput<'_>,
    rules: &mut RuleSet,
) -> (Option<Extracted<String>>, Option<Extracted<String>>) {
    let mut code: Option<Extracted<String>> = None;

    for rule in rules.iter_mut() {
        let FieldKind::EngineCode { code: c } = &rule.kind else {
            continue;
        };
        let c = c.clone();
        if rule.try_match(input.raw, input.kb, input.indexes).is_some() {
            code = Some(Extracted::new(c, 0.8, ExtractionMethod::PatternMatch));
            break;
        }
    }

    if code.is_none() {
        let upper = input.raw.to_uppercase();
        for known in input.kb.engine_codes.keys() {
            if upper.contains(known.as_str()) {
                code = Some(Extracted::new(
                    known.clone(),
                    0.8,
                    ExtractionMethod::DirectTextMatch,
                ));
                break;
            }
        }
    }

    // The displacement template carries the [0.6, 8.0] liter validator;
    // a textual match outside that range is treated as no match.
    let mut displacement: Option<Extracted<String>> = None;
    for rule in rules.iter_mut() {
        if !matches!(rule.kind, FieldKind::Displacement) {
            continue;
        }
        if let Some(caps) = rule.try_match(input.normalized, input.kb, input.indexes) {
            if let Some(value) = caps.get(1) {
                displacement = Some(Extracted::direct(value.as_str().to_string()));
            }
        }
        break;
    }

    if displacement.is_none() {
        if let Some(extracted_code) = &mut code {
            if let Some(entry) = input.kb.engine_codes.get(&extracted_code.value) {
                displacement = Some(Extracted::direct(entry.displacement.clone()));
                extracted_code.method = ExtractionMethod::InferredFromCode;
            }
        }
    }

    (code, displacement)
}
