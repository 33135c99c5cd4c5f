//! The extraction orchestrator.
//!
//! One [`PartsParser`] owns the knowledge base, the derived indexes, the
//! compiled rule set, the normalizer and the injected capabilities, plus
//! an in-memory cache keyed by the exact raw input string.
//!
//! ```text
//! raw line ──► normalize ──► year ──► make ──► model(make) ──► category
//!                 │                                               │
//!                 ▼                                               ▼
//!          part_name_normalized                    location/side ──► engine
//!                                                                     │
//!                                                                     ▼
//!                             drive type ──► dimensions ──► part number
//!                                                                     │
//!              technical_specs + additional_info + confidence  ◄──────┘
//! ```
//!
//! The extractors run in that fixed order because later fields depend on
//! earlier ones (model extraction narrows by make, dimensions discards
//! the drive-type literal). The [`Extraction`] context carries the
//! intermediate state through the pipeline.
//!
//! Single-threaded by design: matching mutates rule statistics and the
//! cache, so the engine is `&mut self` throughout. Confine a parser to
//! one thread, or wrap it in a mutex; read-only parallelism across lines
//! requires separate parser instances.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::Serialize;

use crate::caps::Capabilities;
use crate::extract::{self, ExtractInput, Extraction};
use crate::kb::index::Indexes;
use crate::kb::KnowledgeBase;
use crate::normalize::TextNormalizer;
use crate::record::{Extracted, ParsedRecord};
use crate::rules::RuleSet;
use crate::score;

/// Record-level tag for machine-parsed records. Feedback replaces it with
/// `manual_correction`.
pub const EXTRACTION_TAG: &str = "layered_extraction";

/// Outcome of a bulk import.
#[derive(Debug, Default)]
pub struct ImportSummary {
    /// Successfully parsed records, in input order.
    pub records: Vec<ParsedRecord>,
    /// Lines that produced no record (empty/whitespace).
    pub skipped: usize,
}

/// The Hebrew car-parts description parser.
pub struct PartsParser {
    pub(crate) kb: KnowledgeBase,
    pub(crate) kb_path: Option<PathBuf>,
    pub(crate) normalizer: TextNormalizer,
    pub(crate) indexes: Indexes,
    pub(crate) rules: RuleSet,
    pub(crate) caps: Capabilities,
    pub(crate) cache: HashMap<String, ParsedRecord>,
}

impl PartsParser {
    /// Parser over the bundled seed knowledge base, no optional
    /// capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::from_kb(KnowledgeBase::seed())
    }

    /// Parser over an explicit knowledge base.
    #[must_use]
    pub fn from_kb(kb: KnowledgeBase) -> Self {
        let caps = Capabilities::none();
        let normalizer = TextNormalizer::new(&kb);
        let indexes = Indexes::build(&kb, &normalizer, None);
        let rules = RuleSet::compile(&kb);
        let parser = Self {
            kb,
            kb_path: None,
            normalizer,
            indexes,
            rules,
            caps,
            cache: HashMap::new(),
        };
        parser.log_startup();
        parser
    }

    /// Parser over a knowledge-base file. A missing or corrupt file falls
    /// back to the seed (which is then written out); the path is
    /// remembered so feedback mutations persist to it.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut parser = Self::from_kb(KnowledgeBase::load(path));
        parser.kb_path = Some(path.to_path_buf());
        parser
    }

    /// Attach optional capabilities. Rebuilds the derived state so lookup
    /// keys pass through the injected tokenizer exactly like input lines.
    #[must_use]
    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self.rebuild();
        self
    }

    /// The knowledge base currently in use.
    #[must_use]
    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// The compiled rule set (for statistics inspection).
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Number of cached extraction results.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop all cached extraction results.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Rebuild normalizer, indexes and rules from the current knowledge
    /// base. Called after construction-time capability changes and after
    /// every feedback mutation; rule statistics carry over.
    pub(crate) fn rebuild(&mut self) {
        self.normalizer = TextNormalizer::new(&self.kb);
        self.indexes = Indexes::build(&self.kb, &self.normalizer, self.caps.tokenizer.as_deref());
        self.rules.rebuild(&self.kb);
    }

    fn log_startup(&self) {
        log::info!(
            "parser initialized with {} car makes, {} car models, {} part categories, {} rules",
            self.kb.car_makes.len(),
            self.kb.car_models.len(),
            self.kb.part_categories.len(),
            self.rules.len(),
        );
        log::info!("optional capabilities: {:?}", self.caps);
    }

    /// Parse one part description line.
    ///
    /// Empty or whitespace-only input returns `None`. Identical raw input
    /// returns the cached record until a feedback mutation clears the
    /// cache.
    pub fn parse_line(&mut self, line: &str) -> Option<ParsedRecord> {
        let raw = line.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(cached) = self.cache.get(raw) {
            return Some(cached.clone());
        }

        let normalized = self
            .normalizer
            .normalize(raw, self.caps.tokenizer.as_deref());
        let current_year = chrono::Utc::now().year();

        let mut extraction = Extraction::default();

        let (year_from, year_to) = extract::year::extract(raw, current_year);
        extraction.year_from = year_from.map(Extracted::direct);
        extraction.year_to = year_to.map(Extracted::direct);

        let input = ExtractInput {
            raw,
            normalized: &normalized,
            kb: &self.kb,
            indexes: &self.indexes,
            caps: &self.caps,
        };

        extraction.car_make = extract::make::extract(&input, &mut self.rules);
        extraction.car_model = extract::model::extract(
            &input,
            &mut self.rules,
            extraction.car_make.as_ref().map(|e| e.value.as_str()),
        );

        if let Some(category) = extract::category::extract(&input, &mut self.rules) {
            extraction.category_specific = category.specific.map(Extracted::direct);
            extraction.category = Some(category.category);
        }

        let (location, side) = extract::location::extract(&input, &mut self.rules);
        extraction.location = location;
        extraction.side = side;

        let (engine_code, engine_displacement) = extract::engine::extract(&input, &mut self.rules);
        extraction.engine_code = engine_code;
        extraction.engine_displacement = engine_displacement;

        extraction.drive_type = extract::spec::drive_type(&input, &mut self.rules);
        extraction.dimensions = extract::spec::dimensions(
            &input,
            &mut self.rules,
            extraction.drive_type.as_ref().map(|e| e.value.as_str()),
        );
        extraction.part_number = extract::spec::part_number(&input, &mut self.rules);

        let technical_specs = technical_specs_json(&extraction);
        let (confidence_score, factors) = score::score(&extraction, &self.indexes);
        let confidence_factors =
            serde_json::to_string(&factors).unwrap_or_else(|_| "{}".to_string());
        let additional_info = self.residual_info(raw, &extraction);

        let record = ParsedRecord {
            part_name: raw.to_string(),
            part_name_normalized: normalized,
            car_make: extraction.car_make.map(|e| e.value),
            car_model: extraction.car_model.map(|e| e.value),
            year_from: extraction.year_from.map(|e| e.value),
            year_to: extraction.year_to.map(|e| e.value),
            category: extraction.category.map(|e| e.value),
            category_specific: extraction.category_specific.map(|e| e.value),
            engine_code: extraction.engine_code.map(|e| e.value),
            engine_displacement: extraction.engine_displacement.map(|e| e.value),
            location: extraction.location.map(|e| e.value),
            side: extraction.side.map(|e| e.value),
            drive_type: extraction.drive_type.map(|e| e.value),
            dimensions: extraction.dimensions.map(|e| e.value),
            part_number: extraction.part_number.map(|e| e.value),
            technical_specs,
            additional_info,
            confidence_score,
            confidence_factors,
            extraction_method: EXTRACTION_TAG.to_string(),
        };

        self.cache.insert(raw.to_string(), record.clone());
        Some(record)
    }

    /// Parse many lines sequentially (bulk import). Blank lines count as
    /// skipped.
    pub fn parse_many<I, S>(&mut self, lines: I) -> ImportSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut summary = ImportSummary::default();
        for line in lines {
            match self.parse_line(line.as_ref()) {
                Some(record) => summary.records.push(record),
                None => summary.skipped += 1,
            }
        }
        log::info!(
            "imported {} part lines, skipped {}",
            summary.records.len(),
            summary.skipped
        );
        summary
    }

    /// Residual text: the raw line minus every surface form of every
    /// recognized field value, plus the synthesized year tokens.
    fn residual_info(&self, raw: &str, extraction: &Extraction) -> Option<String> {
        let mut forms: Vec<String> = Vec::new();

        if let Some(make) = &extraction.car_make {
            forms.extend(
                self.kb
                    .make_surface_forms(&make.value)
                    .into_iter()
                    .map(str::to_string),
            );
        }
        if let Some(model) = &extraction.car_model {
            forms.extend(
                self.kb
                    .model_surface_forms(&model.value)
                    .into_iter()
                    .map(str::to_string),
            );
        }
        if let Some(category) = &extraction.category {
            forms.extend(
                self.kb
                    .category_surface_forms(&category.value)
                    .into_iter()
                    .map(str::to_string),
            );
        }
        for field in [&extraction.location, &extraction.side] {
            if let Some(value) = field {
                for (spelling, mapped) in &self.kb.component_locations {
                    if mapped == &value.value {
                        forms.push(spelling.clone());
                    }
                }
            }
        }
        if let Some(code) = &extraction.engine_code {
            forms.push(code.value.clone());
            forms.push(code.value.to_lowercase());
        }
        if let Some(drive) = &extraction.drive_type {
            forms.push(drive.value.clone());
            forms.push(drive.value.to_lowercase());
        }
        if let Some(year) = &extraction.year_from {
            forms.push(format!("מ{:02}", year.value % 100));
        }
        if let Some(year) = &extraction.year_to {
            forms.push(format!("עד {:02}", year.value % 100));
            forms.push(format!("עד{:02}", year.value % 100));
        }

        let mut residual = raw.to_string();
        for form in &forms {
            if !form.is_empty() {
                residual = residual.replace(form.as_str(), "");
            }
        }

        let collapsed = residual.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            None
        } else {
            Some(collapsed)
        }
    }
}

impl Default for PartsParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct TechnicalSpecs<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    displacement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    drive_type: Option<&'a str>,
}

fn technical_specs_json(extraction: &Extraction) -> Option<String> {
    let specs = TechnicalSpecs {
        displacement: extraction
            .engine_displacement
            .as_ref()
            .map(|e| format!("{}L", e.value)),
        dimensions: extraction.dimensions.as_ref().map(|e| e.value.as_str()),
        drive_type: extraction.drive_type.as_ref().map(|e| e.value.as_str()),
    };
    if specs.displacement.is_none() && specs.dimensions.is_none() && specs.drive_type.is_none() {
        return None;
    }
    serde_json::to_string(&specs).ok()
}
