//! The knowledge base: persisted automotive domain facts.
//!
//! A single JSON document holds everything the extractors consult: car
//! makes, models (with make linkage and year/engine data), part categories
//! (with aliases and subcategories), engine codes, abbreviation expansions,
//! typo corrections, declarative special patterns, component locations and
//! the descriptive systems taxonomy.
//!
//! The on-disk shape is a compatibility contract with knowledge-base files
//! produced by earlier versions of the application: key names (`"english"`,
//! `"confidence"`, `"aliases"`, ...), nesting, and the two-element
//! `[min, max]` array convention for year ranges are all preserved.
//! Unknown keys in an existing file are tolerated on load.
//!
//! The document is mutable at runtime, but only through the feedback loop;
//! every mutation is followed by a full re-serialization and a rebuild of
//! the derived indexes (see [`index::Indexes`]).

pub mod index;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::Result;

const SEED_JSON: &str = include_str!("seed.json");

static SEED: Lazy<KnowledgeBase> = Lazy::new(|| {
    serde_json::from_str(SEED_JSON).expect("bundled seed knowledge base is invalid")
});

/// A car make entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeEntry {
    /// Canonical English name; the cross-reference key used by models.
    pub english: String,
    /// How reliable this entry is considered.
    pub confidence: f64,
    /// Alternate spellings (Hebrew variants, Latin forms).
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Corporate parent, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_company: Option<String>,
    /// Country of origin, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Set on entries learned through user corrections.
    #[serde(default, skip_serializing_if = "is_false")]
    pub added_from_feedback: bool,
}

/// A car model entry, linked to its make by English name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Canonical English name.
    pub english: String,
    /// How reliable this entry is considered.
    pub confidence: f64,
    /// English name of the parent make. Models without a make cannot take
    /// part in compatibility checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    /// Alternate spellings.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Body styles this model shipped as.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_styles: Vec<String>,
    /// `[min, max]` production year range, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popular_years: Option<(i32, i32)>,
    /// Displacements this model commonly shipped with ("1.6").
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_engines: Vec<String>,
    /// Set on entries learned through user corrections.
    #[serde(default, skip_serializing_if = "is_false")]
    pub added_from_feedback: bool,
}

/// A part category entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Canonical English name.
    pub english: String,
    /// How reliable this entry is considered.
    pub confidence: f64,
    /// Alternate spellings.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Finer-grained variants ("אויר", "שמן") recognized alongside the
    /// category.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<String>,
    /// Broader category this one specializes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_category: Option<String>,
    /// Part systems this category belongs to. Descriptive only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_systems: Vec<String>,
    /// True for shorthand entries like "פ.".
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_abbreviation: bool,
    /// Set on entries learned through user corrections.
    #[serde(default, skip_serializing_if = "is_false")]
    pub added_from_feedback: bool,
}

/// A manufacturer engine code entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineCodeEntry {
    /// English make name.
    pub make: String,
    /// Displacement in liters as written ("1.6", "Various").
    pub displacement: String,
    /// Petrol/Diesel.
    pub fuel_type: String,
    /// `[min, max]` production year range.
    pub years: (i32, i32),
}

/// A declarative pattern template compiled into the rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialPattern {
    /// Template name; selects the validator.
    pub name: String,
    /// The regex source, compiled at rule-set build time.
    pub regex: String,
    /// Human-readable description.
    pub description: String,
}

/// The persisted knowledge base document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Canonical spelling -> make entry.
    pub car_makes: BTreeMap<String, MakeEntry>,
    /// Canonical spelling -> model entry.
    pub car_models: BTreeMap<String, ModelEntry>,
    /// Canonical spelling -> category entry.
    pub part_categories: BTreeMap<String, CategoryEntry>,
    /// Code string -> engine code entry.
    pub engine_codes: BTreeMap<String, EngineCodeEntry>,
    /// Short form -> expansion ("פ." -> "פילטר").
    pub abbreviations: BTreeMap<String, String>,
    /// Misspelling -> correction.
    #[serde(default)]
    pub common_mistakes: BTreeMap<String, String>,
    /// Mistake/correction pairs grouped by error type, "mistake/correction".
    /// Legacy section; merged with `common_mistakes` when normalizing.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub error_patterns: BTreeMap<String, Vec<String>>,
    /// Declarative pattern templates (year, displacement, drive type, ...).
    pub special_patterns: Vec<SpecialPattern>,
    /// Hebrew spelling -> Front/Rear/Right/Left/Upper/Lower.
    pub component_locations: BTreeMap<String, String>,
    /// Part system -> subsystems. Descriptive only, not used in matching.
    pub systems_hierarchy: BTreeMap<String, Vec<String>>,
}

fn is_false(v: &bool) -> bool {
    !v
}

impl KnowledgeBase {
    /// The bundled seed knowledge base.
    #[must_use]
    pub fn seed() -> Self {
        SEED.clone()
    }

    /// Load a knowledge base from disk.
    ///
    /// A missing or unreadable file falls back to the seed and writes it
    /// out best-effort; this never fails startup.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(kb) => kb,
                Err(e) => {
                    log::warn!(
                        "knowledge base at {} is corrupt ({}), regenerating from seed",
                        path.display(),
                        e
                    );
                    let kb = Self::seed();
                    if let Err(e) = kb.save(path) {
                        log::error!("failed to write seed knowledge base: {}", e);
                    }
                    kb
                }
            },
            Err(_) => {
                log::info!(
                    "no knowledge base at {}, creating from seed",
                    path.display()
                );
                let kb = Self::seed();
                if let Err(e) = kb.save(path) {
                    log::error!("failed to write seed knowledge base: {}", e);
                }
                kb
            }
        }
    }

    /// Serialize the document to disk, human-readable.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("knowledge base saved to {}", path.display());
        Ok(())
    }

    /// All (mistake, correction) pairs: the explicit map plus the legacy
    /// slash-separated `error_patterns` section.
    #[must_use]
    pub fn mistake_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .common_mistakes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for entries in self.error_patterns.values() {
            for pair in entries {
                if let Some((mistake, correction)) = pair.split_once('/') {
                    pairs.push((mistake.to_string(), correction.to_string()));
                }
            }
        }
        pairs
    }

    /// Hebrew canonical spelling of a make, by English name.
    #[must_use]
    pub fn make_spelling(&self, english: &str) -> Option<&str> {
        self.car_makes
            .iter()
            .find(|(_, entry)| entry.english == english)
            .map(|(spelling, _)| spelling.as_str())
    }

    /// Every surface form (canonical spelling + aliases) of a make.
    #[must_use]
    pub fn make_surface_forms(&self, english: &str) -> Vec<&str> {
        surface_forms(self.car_makes.iter(), english, |e| (&e.english, &e.aliases))
    }

    /// Every surface form of a model.
    #[must_use]
    pub fn model_surface_forms(&self, english: &str) -> Vec<&str> {
        surface_forms(self.car_models.iter(), english, |e| (&e.english, &e.aliases))
    }

    /// Every surface form of a category.
    #[must_use]
    pub fn category_surface_forms(&self, english: &str) -> Vec<&str> {
        surface_forms(self.part_categories.iter(), english, |e| {
            (&e.english, &e.aliases)
        })
    }

    /// Reinforce or learn a make from a user correction. Existing entries
    /// get a +0.05 confidence bump (capped at 1.0); unknown makes are added
    /// keyed by their English name with a lowercase alias.
    pub fn learn_make(&mut self, english: &str) {
        for entry in self.car_makes.values_mut() {
            if entry.english == english {
                entry.confidence = (entry.confidence + 0.05).min(1.0);
                return;
            }
        }
        self.car_makes.insert(
            english.to_string(),
            MakeEntry {
                english: english.to_string(),
                confidence: 0.9,
                aliases: vec![english.to_lowercase()],
                parent_company: None,
                country: None,
                added_from_feedback: true,
            },
        );
        log::info!("learned new car make from feedback: {}", english);
    }

    /// Reinforce or learn a model under `make`.
    pub fn learn_model(&mut self, make: &str, model: &str) {
        for entry in self.car_models.values_mut() {
            if entry.english == model && entry.make.as_deref() == Some(make) {
                entry.confidence = (entry.confidence + 0.05).min(1.0);
                return;
            }
        }
        self.car_models.insert(
            model.to_string(),
            ModelEntry {
                english: model.to_string(),
                confidence: 0.9,
                make: Some(make.to_string()),
                aliases: vec![model.to_lowercase()],
                body_styles: Vec::new(),
                popular_years: None,
                common_engines: Vec::new(),
                added_from_feedback: true,
            },
        );
        log::info!("learned new car model from feedback: {} {}", make, model);
    }

    /// Reinforce or learn a category, appending the subcategory if given.
    pub fn learn_category(&mut self, category: &str, specific: Option<&str>) {
        for entry in self.part_categories.values_mut() {
            if entry.english == category {
                entry.confidence = (entry.confidence + 0.05).min(1.0);
                if let Some(sub) = specific {
                    if !entry.subcategories.iter().any(|s| s == sub) {
                        entry.subcategories.push(sub.to_string());
                        log::info!("learned subcategory {} under {}", sub, category);
                    }
                }
                return;
            }
        }
        self.part_categories.insert(
            category.to_string(),
            CategoryEntry {
                english: category.to_string(),
                confidence: 0.9,
                aliases: vec![category.to_lowercase()],
                subcategories: specific.map(|s| vec![s.to_string()]).unwrap_or_default(),
                parent_category: None,
                related_systems: Vec::new(),
                is_abbreviation: false,
                added_from_feedback: true,
            },
        );
        log::info!("learned new part category from feedback: {}", category);
    }
}

fn surface_forms<'a, E: 'a>(
    entries: impl Iterator<Item = (&'a String, &'a E)>,
    english: &str,
    project: impl Fn(&'a E) -> (&'a String, &'a Vec<String>),
) -> Vec<&'a str> {
    let mut forms = Vec::new();
    for (spelling, entry) in entries {
        let (name, aliases) = project(entry);
        if name == english {
            forms.push(spelling.as_str());
            forms.extend(aliases.iter().map(String::as_str));
        }
    }
    forms
}
