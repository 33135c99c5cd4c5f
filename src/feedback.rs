//! The feedback loop: user corrections flow back into storage and the
//! knowledge base.
//!
//! The parser does not own a database; the surrounding application's
//! storage sits behind [`RecordStore`]. Ordering is the contract here:
//! the storage write happens first, and only a confirmed write is
//! followed by knowledge-base mutation. A storage failure therefore
//! leaves the knowledge base untouched, and a knowledge-base save failure
//! is logged without corrupting the in-memory state already in use.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::parser::PartsParser;
use crate::record::{ExtractionMethod, ParsedRecord};
use crate::score::ConfidenceFactors;

/// Identifier of a stored record.
pub type RecordId = i64;

/// A correction set: record field name -> corrected value. Field names
/// are the `ParsedRecord` field names; unknown fields are ignored.
pub type Corrections = BTreeMap<String, String>;

/// Fields a correction may touch.
pub const CORRECTABLE_FIELDS: &[&str] = &[
    "car_make",
    "car_model",
    "category",
    "category_specific",
    "year_from",
    "year_to",
    "engine_code",
    "engine_displacement",
    "location",
    "side",
    "drive_type",
    "dimensions",
    "part_number",
];

/// One audit entry recorded per corrected field.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Record field that was corrected.
    pub field: String,
    /// Value before the correction.
    pub original: Option<String>,
    /// Value after the correction.
    pub corrected: String,
}

/// The update a store must apply atomically: field values, audit trail,
/// and the confidence/method stamp for a manual correction.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionUpdate {
    /// (field, new value) pairs to write.
    pub fields: Vec<(String, String)>,
    /// Audit entries to append.
    pub audit: Vec<AuditEntry>,
    /// New stored confidence (1.0 for manual corrections).
    pub confidence_score: f64,
    /// New record-level extraction tag ("manual_correction").
    pub extraction_method: String,
}

/// The surrounding application's record storage, as seen by the
/// feedback loop.
pub trait RecordStore {
    /// Load a stored record by id.
    fn load(&self, id: RecordId) -> Result<Option<ParsedRecord>>;

    /// Apply a correction update atomically. An `Err` must leave the
    /// stored record unchanged.
    fn apply(&mut self, id: RecordId, update: &CorrectionUpdate) -> Result<()>;
}

/// In-memory [`RecordStore`] used by tests and the CLI.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<RecordId, ParsedRecord>,
    audit: Vec<(RecordId, AuditEntry)>,
    next_id: RecordId,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning its id.
    pub fn insert(&mut self, record: ParsedRecord) -> RecordId {
        self.next_id += 1;
        self.records.insert(self.next_id, record);
        self.next_id
    }

    /// The stored record, if present.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&ParsedRecord> {
        self.records.get(&id)
    }

    /// All audit entries recorded so far.
    #[must_use]
    pub fn audit_log(&self) -> &[(RecordId, AuditEntry)] {
        &self.audit
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, id: RecordId) -> Result<Option<ParsedRecord>> {
        Ok(self.records.get(&id).cloned())
    }

    fn apply(&mut self, id: RecordId, update: &CorrectionUpdate) -> Result<()> {
        // Stage on a clone so a bad field value leaves the record as-is.
        let mut staged = self
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::store(format!("no record {id}")))?;
        for (field, value) in &update.fields {
            set_record_field(&mut staged, field, value)?;
        }
        staged.confidence_score = update.confidence_score;
        staged.extraction_method = update.extraction_method.clone();
        self.records.insert(id, staged);
        self.audit
            .extend(update.audit.iter().map(|entry| (id, entry.clone())));
        Ok(())
    }
}

impl PartsParser {
    /// Apply user corrections to a stored record and reconcile the
    /// knowledge base.
    ///
    /// Returns `true` when the storage update succeeded; the extraction
    /// cache is cleared exactly then. A storage failure aborts before any
    /// knowledge-base mutation and returns `false`.
    pub fn apply_feedback(
        &mut self,
        store: &mut dyn RecordStore,
        id: RecordId,
        corrections: &Corrections,
    ) -> bool {
        let original = match store.load(id) {
            Ok(Some(record)) => record,
            Ok(None) => return false,
            Err(e) => {
                log::error!("failed to load record {}: {}", id, e);
                return false;
            }
        };

        let accepted: Vec<(&str, &str)> = CORRECTABLE_FIELDS
            .iter()
            .filter_map(|field| {
                corrections
                    .get(*field)
                    .map(|value| (*field, value.as_str()))
            })
            .collect();
        if accepted.is_empty() {
            return false;
        }

        let update = CorrectionUpdate {
            fields: accepted
                .iter()
                .map(|(f, v)| ((*f).to_string(), (*v).to_string()))
                .collect(),
            audit: accepted
                .iter()
                .map(|(field, value)| AuditEntry {
                    field: (*field).to_string(),
                    original: record_field(&original, field),
                    corrected: (*value).to_string(),
                })
                .collect(),
            confidence_score: 1.0,
            extraction_method: ExtractionMethod::ManualCorrection.as_str().to_string(),
        };

        if let Err(e) = store.apply(id, &update) {
            log::error!("correction for record {} failed, rolling back: {}", id, e);
            return false;
        }

        self.reconcile_kb(&original, corrections);
        self.cache.clear();
        log::info!("applied corrections to record {}", id);
        true
    }

    fn reconcile_kb(&mut self, original: &ParsedRecord, corrections: &Corrections) {
        let mut updated = false;

        if let Some(make) = non_empty(corrections.get("car_make")) {
            self.kb.learn_make(make);
            updated = true;
        }

        if let (Some(make), Some(model)) = (
            non_empty(corrections.get("car_make")),
            non_empty(corrections.get("car_model")),
        ) {
            self.kb.learn_model(make, model);
            updated = true;
        }

        if let Some(category) = non_empty(corrections.get("category")) {
            self.kb
                .learn_category(category, non_empty(corrections.get("category_specific")));
            updated = true;
        }

        updated |= self.record_false_positives(original, corrections);

        if updated {
            if let Some(path) = self.kb_path.clone() {
                if let Err(e) = self.kb.save(&path) {
                    log::error!("knowledge base save failed (memory state kept): {}", e);
                }
            }
            self.rebuild();
        }
    }

    /// Penalize rules whose pattern-derived value a correction disproved.
    fn record_false_positives(
        &mut self,
        original: &ParsedRecord,
        corrections: &Corrections,
    ) -> bool {
        let factors: ConfidenceFactors =
            serde_json::from_str(&original.confidence_factors).unwrap_or_default();

        let mut any = false;
        for field in ["car_make", "car_model", "category"] {
            let Some(corrected) = non_empty(corrections.get(field)) else {
                continue;
            };
            let Some(factor) = factors.fields.get(field) else {
                continue;
            };
            let was_pattern = ExtractionMethod::parse(&factor.extraction_method)
                .is_some_and(ExtractionMethod::is_pattern_based);
            let old_value = factor.value.as_str().unwrap_or_default();
            if !was_pattern || old_value.is_empty() || old_value == corrected {
                continue;
            }
            for rule in self.rules.iter_mut() {
                if rule.kind.asserted_value() == Some((field, old_value)) {
                    rule.false_positive_count += 1;
                    any = true;
                }
            }
        }
        any
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

fn record_field(record: &ParsedRecord, field: &str) -> Option<String> {
    match field {
        "car_make" => record.car_make.clone(),
        "car_model" => record.car_model.clone(),
        "category" => record.category.clone(),
        "category_specific" => record.category_specific.clone(),
        "year_from" => record.year_from.map(|y| y.to_string()),
        "year_to" => record.year_to.map(|y| y.to_string()),
        "engine_code" => record.engine_code.clone(),
        "engine_displacement" => record.engine_displacement.clone(),
        "location" => record.location.clone(),
        "side" => record.side.clone(),
        "drive_type" => record.drive_type.clone(),
        "dimensions" => record.dimensions.clone(),
        "part_number" => record.part_number.clone(),
        _ => None,
    }
}

fn set_record_field(record: &mut ParsedRecord, field: &str, value: &str) -> Result<()> {
    let owned = || Some(value.to_string());
    match field {
        "car_make" => record.car_make = owned(),
        "car_model" => record.car_model = owned(),
        "category" => record.category = owned(),
        "category_specific" => record.category_specific = owned(),
        "year_from" => {
            record.year_from = Some(value.parse().map_err(|_| {
                Error::invalid_input(format!("year_from must be a year, got {value:?}"))
            })?)
        }
        "year_to" => {
            record.year_to = Some(value.parse().map_err(|_| {
                Error::invalid_input(format!("year_to must be a year, got {value:?}"))
            })?)
        }
        "engine_code" => record.engine_code = owned(),
        "engine_displacement" => record.engine_displacement = owned(),
        "location" => record.location = owned(),
        "side" => record.side = owned(),
        "drive_type" => record.drive_type = owned(),
        "dimensions" => record.dimensions = owned(),
        "part_number" => record.part_number = owned(),
        other => return Err(Error::invalid_input(format!("unknown field {other:?}"))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrections(pairs: &[(&str, &str)]) -> Corrections {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn correction_updates_record_and_audit() {
        let mut parser = PartsParser::new();
        let mut store = MemoryStore::new();
        let record = parser.parse_line("בולם קדמי ימין מזדה 3").unwrap();
        let id = store.insert(record);

        let applied = parser.apply_feedback(
            &mut store,
            id,
            &corrections(&[("car_model", "323"), ("car_make", "Mazda")]),
        );
        assert!(applied);

        let stored = store.get(id).unwrap();
        assert_eq!(stored.car_model.as_deref(), Some("323"));
        assert!((stored.confidence_score - 1.0).abs() < 1e-10);
        assert_eq!(stored.extraction_method, "manual_correction");
        assert_eq!(store.audit_log().len(), 2);
    }

    #[test]
    fn unknown_record_is_false() {
        let mut parser = PartsParser::new();
        let mut store = MemoryStore::new();
        assert!(!parser.apply_feedback(&mut store, 42, &corrections(&[("car_make", "Kia")])));
    }

    #[test]
    fn empty_corrections_are_false() {
        let mut parser = PartsParser::new();
        let mut store = MemoryStore::new();
        let record = parser.parse_line("בולם קדמי").unwrap();
        let id = store.insert(record);
        assert!(!parser.apply_feedback(&mut store, id, &corrections(&[])));
        assert!(!parser.apply_feedback(&mut store, id, &corrections(&[("nonsense", "x")])));
    }

    #[test]
    fn store_failure_leaves_kb_untouched() {
        struct FailingStore(MemoryStore);
        impl RecordStore for FailingStore {
            fn load(&self, id: RecordId) -> Result<Option<ParsedRecord>> {
                self.0.load(id)
            }
            fn apply(&mut self, _id: RecordId, _update: &CorrectionUpdate) -> Result<()> {
                Err(Error::store("disk on fire"))
            }
        }

        let mut parser = PartsParser::new();
        let mut inner = MemoryStore::new();
        let record = parser.parse_line("בולם קדמי").unwrap();
        let id = inner.insert(record);
        let mut store = FailingStore(inner);

        let makes_before = parser.kb().car_makes.len();
        let cached_before = parser.cache_len();
        let applied =
            parser.apply_feedback(&mut store, id, &corrections(&[("car_make", "Dacia")]));

        assert!(!applied);
        assert_eq!(parser.kb().car_makes.len(), makes_before);
        // Cache only clears on success.
        assert_eq!(parser.cache_len(), cached_before);
    }

    #[test]
    fn new_make_becomes_extractable() {
        let mut parser = PartsParser::new();
        let mut store = MemoryStore::new();
        let record = parser.parse_line("דלת dacia").unwrap();
        assert_eq!(record.car_make, None);
        let id = store.insert(record);

        assert!(parser.apply_feedback(&mut store, id, &corrections(&[("car_make", "Dacia")])));
        assert_eq!(parser.cache_len(), 0);

        let reparsed = parser.parse_line("דלת dacia").unwrap();
        assert_eq!(reparsed.car_make.as_deref(), Some("Dacia"));
    }

    #[test]
    fn subcategory_appended_to_category() {
        let mut parser = PartsParser::new();
        let mut store = MemoryStore::new();
        let record = parser.parse_line("בולם גז קדמי").unwrap();
        let id = store.insert(record);

        assert!(parser.apply_feedback(
            &mut store,
            id,
            &corrections(&[("category", "Shock Absorber"), ("category_specific", "גז")]),
        ));
        let shock = &parser.kb().part_categories["בולם"];
        assert!(shock.subcategories.iter().any(|s| s == "גז"));
    }

    #[test]
    fn disproven_pattern_value_counts_false_positive() {
        let mut parser = PartsParser::new();
        let mut store = MemoryStore::new();
        // Force a stored record whose make came from a pattern rule.
        let mut record = parser.parse_line("בולם מזדה").unwrap();
        record.confidence_factors = serde_json::json!({
            "car_make": {
                "value": "Mazda",
                "extraction_method": "pattern_match",
                "confidence": 0.9,
                "weight": 0.6,
                "score_contribution": 0.1
            },
            "compatibility_checks": []
        })
        .to_string();
        let id = store.insert(record);

        assert!(parser.apply_feedback(&mut store, id, &corrections(&[("car_make", "Kia")])));

        let fp: u64 = parser
            .rules()
            .iter()
            .filter(|r| r.name.starts_with("make_Mazda") || r.name == "make_eng_Mazda")
            .map(|r| r.false_positive_count)
            .sum();
        assert!(fp >= 1);
    }

    #[test]
    fn agreeing_correction_does_not_penalize() {
        let mut parser = PartsParser::new();
        let mut store = MemoryStore::new();
        let mut record = parser.parse_line("בולם מזדה").unwrap();
        record.confidence_factors = serde_json::json!({
            "car_make": {
                "value": "Mazda",
                "extraction_method": "pattern_match",
                "confidence": 0.9,
                "weight": 0.6,
                "score_contribution": 0.1
            },
            "compatibility_checks": []
        })
        .to_string();
        let id = store.insert(record);

        assert!(parser.apply_feedback(&mut store, id, &corrections(&[("car_make", "Mazda")])));
        let fp: u64 = parser
            .rules()
            .iter()
            .filter(|r| r.name == "make_Mazda")
            .map(|r| r.false_positive_count)
            .sum();
        assert_eq!(fp, 0);
    }
}
