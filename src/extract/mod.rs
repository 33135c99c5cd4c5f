//! Per-field extractors.
//!
//! Each extractor walks a fixed ladder of strategies and stops at the
//! first tier that produces a value:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ 1. Exact / alias lookup          conf 0.90-0.95     │
//! ├─────────────────────────────────────────────────────┤
//! │ 2. Compiled pattern rules        conf 0.85-0.95     │
//! ├─────────────────────────────────────────────────────┤
//! │ 3. Phrase window (1-3 tokens)    conf 0.80-0.85     │
//! ├─────────────────────────────────────────────────────┤
//! │ 4. Cross-field inference         conf 0.30-0.80     │
//! ├─────────────────────────────────────────────────────┤
//! │ 5. Embedding / classifier        gated by threshold │
//! ├─────────────────────────────────────────────────────┤
//! │ 6. No match                                         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The exact tier order varies slightly per field (model patterns run
//! before lookups, category abbreviations run before everything); each
//! module documents its own ladder. Tier 5 only exists when the matching
//! capability was injected - its absence changes nothing else.

pub mod category;
pub mod engine;
pub mod location;
pub mod make;
pub mod model;
pub mod spec;
pub mod year;

use crate::caps::Capabilities;
use crate::kb::index::Indexes;
use crate::kb::KnowledgeBase;
use crate::record::Extracted;

/// Shared read-only inputs for one extraction pass.
pub(crate) struct ExtractInput<'a> {
    /// The raw line as received (trimmed).
    pub raw: &'a str,
    /// The normalized line.
    pub normalized: &'a str,
    pub kb: &'a KnowledgeBase,
    pub indexes: &'a Indexes,
    pub caps: &'a Capabilities,
}

impl ExtractInput<'_> {
    pub(crate) fn tokens(&self) -> Vec<&str> {
        self.normalized.split_whitespace().collect()
    }
}

/// The intermediate extraction context, filled field by field in the
/// orchestrator's fixed pipeline order. Later extractors read earlier
/// results from here (model extraction consults `car_make`), which makes
/// the ordering dependency explicit in one place.
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)] // Field meanings are documented on `ParsedRecord`.
pub struct Extraction {
    pub year_from: Option<Extracted<i32>>,
    pub year_to: Option<Extracted<i32>>,
    pub car_make: Option<Extracted<String>>,
    pub car_model: Option<Extracted<String>>,
    pub category: Option<Extracted<String>>,
    pub category_specific: Option<Extracted<String>>,
    pub engine_code: Option<Extracted<String>>,
    pub engine_displacement: Option<Extracted<String>>,
    pub location: Option<Extracted<String>>,
    pub side: Option<Extracted<String>>,
    pub drive_type: Option<Extracted<String>>,
    pub dimensions: Option<Extracted<String>>,
    pub part_number: Option<Extracted<String>>,
}

impl Extraction {
    /// Look up a weighted field by its record name, for scoring.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<(serde_json::Value, f64, crate::record::ExtractionMethod)> {
        fn text(e: &Option<Extracted<String>>) -> Option<(serde_json::Value, f64, crate::record::ExtractionMethod)> {
            e.as_ref()
                .map(|x| (x.value.clone().into(), x.confidence.get(), x.method))
        }
        fn num(e: &Option<Extracted<i32>>) -> Option<(serde_json::Value, f64, crate::record::ExtractionMethod)> {
            e.as_ref()
                .map(|x| (x.value.into(), x.confidence.get(), x.method))
        }
        match name {
            "car_make" => text(&self.car_make),
            "car_model" => text(&self.car_model),
            "year_from" => num(&self.year_from),
            "year_to" => num(&self.year_to),
            "category" => text(&self.category),
            "category_specific" => text(&self.category_specific),
            "engine_code" => text(&self.engine_code),
            "engine_displacement" => text(&self.engine_displacement),
            "location" => text(&self.location),
            "side" => text(&self.side),
            "drive_type" => text(&self.drive_type),
            "dimensions" => text(&self.dimensions),
            "part_number" => text(&self.part_number),
            _ => None,
        }
    }
}

/// All 1- to `max_len`-token windows over `words`, in scan order.
pub(crate) fn phrase_windows(words: &[&str], max_len: usize) -> Vec<String> {
    let mut phrases = Vec::new();
    for i in 0..words.len() {
        for j in (i + 1)..=(i + max_len).min(words.len()) {
            phrases.push(words[i..j].join(" "));
        }
    }
    phrases
}
