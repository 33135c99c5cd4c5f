//! Parsed record and extraction-method tagging.

use serde::{Deserialize, Serialize};

use crate::types::Confidence;

/// Which strategy tier produced an extracted field.
///
/// Every extracted value carries one of these tags. They serve two
/// purposes: the scorer maps each tag to a reliability multiplier, and the
/// feedback loop uses the tag to decide which pattern rules to penalize
/// when a correction disproves a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Normalized token found verbatim in the lexicon.
    ExactMatch,
    /// Matched via a lexicon alias.
    AliasMatch,
    /// A compiled pattern rule fired.
    PatternMatch,
    /// Pattern rule fired and agreed with an already-known make.
    PatternMatchWithMake,
    /// Standalone model pattern cross-checked against the known make.
    PatternMatchVerified,
    /// Category pattern fired with a subcategory capture.
    PatternMatchWithSpecific,
    /// Literal substring found in the text.
    DirectTextMatch,
    /// Whole term found in the lexicon.
    DirectLookup,
    /// Lexicon hit cross-checked against the known make.
    DirectLookupVerified,
    /// Lexicon hit plus a subcategory term in the text.
    DirectLookupWithSubcategory,
    /// Hyundai i-model shorthand (i10..i40).
    IModelPattern,
    /// Bare digits following a make name ("מזדה 3").
    NumericModelMatch,
    /// 1-3 token window hit the lexicon.
    PhraseMatch,
    /// Window hit cross-checked against the known make.
    PhraseMatchVerified,
    /// One of the fixed component-group patterns fired.
    ComponentGroupMatch,
    /// Optional classifier capability above its probability threshold.
    MlClassification,
    /// Optional embedding capability above its similarity threshold.
    WordEmbedding,
    /// Fell back to the make's first known model.
    DefaultForMake,
    /// Make inferred from a matched make+model pattern.
    InferredFromModel,
    /// Make inferred from a model term found in the text.
    InferredFromModelMatch,
    /// Displacement taken from the engine code's lexicon entry.
    InferredFromCode,
    /// Filter abbreviation shorthand ("פ.שמן").
    AbbreviationPattern,
    /// Value present without a graded tier (years, side).
    Direct,
    /// Value set by a user correction through the feedback loop.
    ManualCorrection,
    /// Nothing matched.
    NoMatch,
}

impl ExtractionMethod {
    /// Reliability multiplier applied by the confidence scorer.
    #[must_use]
    pub fn multiplier(self) -> f64 {
        use ExtractionMethod::*;
        match self {
            ExactMatch | Direct | ManualCorrection => 1.0,
            AliasMatch
            | PatternMatchWithMake
            | PatternMatchVerified
            | PatternMatchWithSpecific
            | DirectLookupVerified
            | DirectLookupWithSubcategory
            | IModelPattern
            | PhraseMatchVerified
            | AbbreviationPattern => 0.95,
            PatternMatch | DirectTextMatch | DirectLookup | NumericModelMatch
            | MlClassification => 0.9,
            PhraseMatch | ComponentGroupMatch | WordEmbedding | InferredFromCode => 0.85,
            InferredFromModelMatch => 0.8,
            InferredFromModel => 0.75,
            DefaultForMake => 0.7,
            NoMatch => 0.0,
        }
    }

    /// Tag string as stored in `confidence_factors`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        use ExtractionMethod::*;
        match self {
            ExactMatch => "exact_match",
            AliasMatch => "alias_match",
            PatternMatch => "pattern_match",
            PatternMatchWithMake => "pattern_match_with_make",
            PatternMatchVerified => "pattern_match_verified",
            PatternMatchWithSpecific => "pattern_match_with_specific",
            DirectTextMatch => "direct_text_match",
            DirectLookup => "direct_lookup",
            DirectLookupVerified => "direct_lookup_verified",
            DirectLookupWithSubcategory => "direct_lookup_with_subcategory",
            IModelPattern => "i_model_pattern",
            NumericModelMatch => "numeric_model_match",
            PhraseMatch => "phrase_match",
            PhraseMatchVerified => "phrase_match_verified",
            ComponentGroupMatch => "component_group_match",
            MlClassification => "ml_classification",
            WordEmbedding => "word_embedding",
            DefaultForMake => "default_for_make",
            InferredFromModel => "inferred_from_model",
            InferredFromModelMatch => "inferred_from_model_match",
            InferredFromCode => "inferred_from_code",
            AbbreviationPattern => "abbreviation_pattern",
            Direct => "direct",
            ManualCorrection => "manual_correction",
            NoMatch => "no_match",
        }
    }

    /// Parse a tag string back into a method (used when re-reading stored
    /// `confidence_factors` during feedback).
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        use ExtractionMethod::*;
        Some(match tag {
            "exact_match" => ExactMatch,
            "alias_match" => AliasMatch,
            "pattern_match" => PatternMatch,
            "pattern_match_with_make" => PatternMatchWithMake,
            "pattern_match_verified" => PatternMatchVerified,
            "pattern_match_with_specific" => PatternMatchWithSpecific,
            "direct_text_match" => DirectTextMatch,
            "direct_lookup" => DirectLookup,
            "direct_lookup_verified" => DirectLookupVerified,
            "direct_lookup_with_subcategory" => DirectLookupWithSubcategory,
            "i_model_pattern" => IModelPattern,
            "numeric_model_match" => NumericModelMatch,
            "phrase_match" => PhraseMatch,
            "phrase_match_verified" => PhraseMatchVerified,
            "component_group_match" => ComponentGroupMatch,
            "ml_classification" => MlClassification,
            "word_embedding" => WordEmbedding,
            "default_for_make" => DefaultForMake,
            "inferred_from_model" => InferredFromModel,
            "inferred_from_model_match" => InferredFromModelMatch,
            "inferred_from_code" => InferredFromCode,
            "abbreviation_pattern" => AbbreviationPattern,
            "direct" => Direct,
            "manual_correction" => ManualCorrection,
            "no_match" => NoMatch,
            _ => return None,
        })
    }

    /// True for the pattern-rule family of tiers. The feedback loop only
    /// penalizes rules for values these tiers produced.
    #[must_use]
    pub fn is_pattern_based(self) -> bool {
        matches!(
            self,
            ExtractionMethod::PatternMatch
                | ExtractionMethod::PatternMatchWithMake
                | ExtractionMethod::PatternMatchVerified
                | ExtractionMethod::PatternMatchWithSpecific
        )
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single extracted field value with its confidence and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    /// The extracted value.
    pub value: T,
    /// Tier-assigned confidence.
    pub confidence: Confidence,
    /// Which tier produced the value.
    pub method: ExtractionMethod,
}

impl<T> Extracted<T> {
    /// Create an extracted value, clamping the confidence.
    pub fn new(value: T, confidence: f64, method: ExtractionMethod) -> Self {
        Self {
            value,
            confidence: Confidence::saturating(confidence),
            method,
        }
    }

    /// A value with no graded tier (full confidence, `direct` method).
    pub fn direct(value: T) -> Self {
        Self::new(value, 1.0, ExtractionMethod::Direct)
    }
}

/// One fully parsed part description line.
///
/// Field set matches the surrounding application's storage row one-to-one;
/// `technical_specs` and `confidence_factors` are serialized JSON so the
/// record round-trips through a flat store unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    /// Original input line, trimmed.
    pub part_name: String,
    /// Canonicalized input (see `TextNormalizer`).
    pub part_name_normalized: String,
    /// Car make (English canonical name).
    pub car_make: Option<String>,
    /// Car model (English canonical name).
    pub car_model: Option<String>,
    /// First model year the part fits.
    pub year_from: Option<i32>,
    /// Last model year the part fits.
    pub year_to: Option<i32>,
    /// Part category (English canonical name).
    pub category: Option<String>,
    /// More specific subcategory, when one was recognized.
    pub category_specific: Option<String>,
    /// Manufacturer engine code (e.g. "CBZ").
    pub engine_code: Option<String>,
    /// Engine displacement in liters, as written ("1.6").
    pub engine_displacement: Option<String>,
    /// Component location: Front/Rear/Upper/Lower.
    pub location: Option<String>,
    /// Component side: Right/Left.
    pub side: Option<String>,
    /// Drive type: 4X4/4X2/2X4/AWD/RWD/FWD.
    pub drive_type: Option<String>,
    /// Numeric dimensions ("120x45x30").
    pub dimensions: Option<String>,
    /// Alphanumeric part/reference number.
    pub part_number: Option<String>,
    /// JSON object of the numeric/technical subset.
    pub technical_specs: Option<String>,
    /// Residual text after stripping recognized surface forms.
    pub additional_info: Option<String>,
    /// Overall confidence in [0, 1], rounded to 2 decimals.
    pub confidence_score: f64,
    /// JSON explanation of the score (see `ConfidenceFactors`).
    pub confidence_factors: String,
    /// Record-level extraction tag.
    pub extraction_method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_tag_roundtrip() {
        let methods = [
            ExtractionMethod::ExactMatch,
            ExtractionMethod::PatternMatchWithMake,
            ExtractionMethod::IModelPattern,
            ExtractionMethod::DefaultForMake,
            ExtractionMethod::ManualCorrection,
            ExtractionMethod::NoMatch,
        ];
        for m in methods {
            assert_eq!(ExtractionMethod::parse(m.as_str()), Some(m));
        }
        assert_eq!(ExtractionMethod::parse("not_a_method"), None);
    }

    #[test]
    fn multipliers_bounded() {
        let all = [
            ExtractionMethod::ExactMatch,
            ExtractionMethod::AliasMatch,
            ExtractionMethod::PatternMatch,
            ExtractionMethod::PhraseMatch,
            ExtractionMethod::WordEmbedding,
            ExtractionMethod::DefaultForMake,
            ExtractionMethod::NoMatch,
        ];
        for m in all {
            assert!((0.0..=1.0).contains(&m.multiplier()));
        }
        assert_eq!(ExtractionMethod::ExactMatch.multiplier(), 1.0);
        assert_eq!(ExtractionMethod::NoMatch.multiplier(), 0.0);
    }

    #[test]
    fn extracted_clamps_confidence() {
        let e = Extracted::new("Mazda", 1.5, ExtractionMethod::ExactMatch);
        assert_eq!(e.confidence.get(), 1.0);
    }
}
