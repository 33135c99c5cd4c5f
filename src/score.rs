//! Overall confidence scoring with an explainable breakdown.
//!
//! The score combines three ingredients:
//!
//! | ingredient | source |
//! |---|---|
//! | per-field confidence | assigned by the extraction tier that fired |
//! | method reliability | fixed multiplier per extraction method |
//! | cross-field compatibility | make↔model, model↔year, model↔engine |
//!
//! Weighted field scores are normalized by the total weight, the
//! compatibility adjustments are applied to that normalized value, the
//! result is clamped to [0, 1] and averaged with a fixed 0.7 base, then
//! rounded to two decimals. The full breakdown is emitted as
//! [`ConfidenceFactors`] so the UI and the feedback loop can see exactly
//! why a record scored the way it did.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extract::Extraction;
use crate::kb::index::Indexes;

const BASE_SCORE: f64 = 0.7;

/// Field weights; higher means the field matters more to the overall
/// score when present.
const WEIGHTS: &[(&str, f64)] = &[
    ("car_make", 0.6),
    ("car_model", 0.5),
    ("year_from", 0.4),
    ("year_to", 0.3),
    ("category", 0.5),
    ("category_specific", 0.4),
    ("engine_code", 0.4),
    ("engine_displacement", 0.3),
    ("location", 0.3),
    ("side", 0.2),
    ("drive_type", 0.3),
    ("part_number", 0.5),
    ("dimensions", 0.3),
];

/// Per-field entry in the score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFactor {
    /// The extracted value.
    pub value: serde_json::Value,
    /// Which tier produced it.
    pub extraction_method: String,
    /// Tier-assigned confidence.
    pub confidence: f64,
    /// The field's fixed weight.
    pub weight: f64,
    /// This field's share of the normalized score.
    pub score_contribution: f64,
}

/// One cross-field plausibility check and its effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityCheck {
    /// Check name ("make_model_compatibility", ...).
    pub check: String,
    /// Whether the pair was found compatible.
    pub result: bool,
    /// Score bonus applied on a compatible pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus: Option<f64>,
    /// Score penalty applied on an incompatible pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<f64>,
}

/// The full score explanation stored with every record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    /// Per-field breakdown, keyed by record field name.
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldFactor>,
    /// The compatibility checks performed, in order.
    #[serde(default)]
    pub compatibility_checks: Vec<CompatibilityCheck>,
}

/// Score an extraction. Returns the final score in [0, 1] rounded to two
/// decimals, plus the breakdown.
#[must_use]
pub fn score(extraction: &Extraction, indexes: &Indexes) -> (f64, ConfidenceFactors) {
    let total_weight: f64 = WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut weighted = 0.0;
    let mut factors = ConfidenceFactors::default();

    for (name, weight) in WEIGHTS.iter().copied() {
        let Some((value, confidence, method)) = extraction.field(name) else {
            continue;
        };
        let field_score = weight * confidence * method.multiplier();
        weighted += field_score;
        factors.fields.insert(
            name.to_string(),
            FieldFactor {
                value,
                extraction_method: method.as_str().to_string(),
                confidence,
                weight,
                score_contribution: field_score / total_weight,
            },
        );
    }

    let mut bonus = 0.0;
    let mut penalty = 0.0;

    let make = extraction.car_make.as_ref().map(|e| e.value.as_str());
    let model = extraction.car_model.as_ref().map(|e| e.value.as_str());

    if let (Some(make), Some(model)) = (make, model) {
        if indexes.model_belongs_to_make(make, model) {
            bonus += 0.1;
            factors.compatibility_checks.push(CompatibilityCheck {
                check: "make_model_compatibility".into(),
                result: true,
                bonus: Some(0.1),
                penalty: None,
            });
        } else {
            penalty += 0.2;
            factors.compatibility_checks.push(CompatibilityCheck {
                check: "make_model_compatibility".into(),
                result: false,
                bonus: None,
                penalty: Some(0.2),
            });
        }
    }

    if let (Some(make), Some(model), Some(year)) =
        (make, model, extraction.year_from.as_ref().map(|e| e.value))
    {
        if let Some(&(min, max)) = indexes
            .model_years
            .get(&(make.to_string(), model.to_string()))
        {
            if (min..=max).contains(&year) {
                bonus += 0.1;
                factors.compatibility_checks.push(CompatibilityCheck {
                    check: "year_model_compatibility".into(),
                    result: true,
                    bonus: Some(0.1),
                    penalty: None,
                });
            } else {
                penalty += 0.1;
                factors.compatibility_checks.push(CompatibilityCheck {
                    check: "year_model_compatibility".into(),
                    result: false,
                    bonus: None,
                    penalty: Some(0.1),
                });
            }
        }
    }

    if let (Some(make), Some(model), Some(displacement)) = (
        make,
        model,
        extraction
            .engine_displacement
            .as_ref()
            .map(|e| e.value.as_str()),
    ) {
        if let Some(engines) = indexes
            .model_engines
            .get(&(make.to_string(), model.to_string()))
        {
            if engines.iter().any(|e| e == displacement) {
                bonus += 0.1;
                factors.compatibility_checks.push(CompatibilityCheck {
                    check: "engine_model_compatibility".into(),
                    result: true,
                    bonus: Some(0.1),
                    penalty: None,
                });
            } else {
                penalty += 0.1;
                factors.compatibility_checks.push(CompatibilityCheck {
                    check: "engine_model_compatibility".into(),
                    result: false,
                    bonus: None,
                    penalty: Some(0.1),
                });
            }
        }
    }

    let normalized = (weighted / total_weight).min(1.0);
    let adjusted = (normalized + bonus - penalty).clamp(0.0, 1.0);
    let final_score = ((BASE_SCORE + adjusted) / 2.0 * 100.0).round() / 100.0;

    (final_score, factors)
}
