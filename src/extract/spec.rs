//! Technical specification fields: drive type, dimensions, part number.
//!
//! Pure pattern extraction, no lexicon involvement.

use crate::record::{Extracted, ExtractionMethod};
use crate::rules::{FieldKind, RuleSet};

use super::ExtractInput;

pub(crate) fn drive_type(
    input: &ExtractInput<'_>,
    rules: &mut RuleSet,
) -> Option<Extracted<String>> {
    for rule in rules.iter_mut() {
        if !matches!(rule.kind, FieldKind::DriveType) {
            continue;
        }
        let caps = rule.try_match(input.raw, input.kb, input.indexes)?;
        let value = caps.get(1)?.as_str().to_uppercase();
        return Some(Extracted::new(
            value,
            0.8,
            ExtractionMethod::DirectTextMatch,
        ));
    }
    None
}

pub(crate) fn dimensions(
    input: &ExtractInput<'_>,
    rules: &mut RuleSet,
    drive_type: Option<&str>,
) -> Option<Extracted<String>> {
    for rule in rules.iter_mut() {
        if !matches!(rule.kind, FieldKind::Dimensions) {
            continue;
        }
        let caps = rule.try_match(input.raw, input.kb, input.indexes)?;
        let value = match caps.get(3) {
            Some(depth) => format!("{}x{}x{}", &caps[1], &caps[2], depth.as_str()),
            None => format!("{}x{}", &caps[1], &caps[2]),
        };
        // "4x4" satisfies this pattern too; a match that is just the drive
        // type literal is not a dimension.
        if drive_type.is_some_and(|d| d.eq_ignore_ascii_case(&value)) {
            return None;
        }
        return Some(Extracted::new(
            value,
            0.8,
            ExtractionMethod::DirectTextMatch,
        ));
    }
    None
}

pub(crate) fn part_number(
    input: &ExtractInput<'_>,
    rules: &mut RuleSet,
) -> Option<Extracted<String>> {
    for rule in rules.iter_mut() {
        if !matches!(rule.kind, FieldKind::PartNumber) {
            continue;
        }
        let caps = rule.try_match(input.raw, input.kb, input.indexes)?;
        return Some(Extracted::new(
            caps.get(1)?.as_str().to_string(),
            0.8,
            ExtractionMethod::PatternMatch,
        ));
    }
    None
}
