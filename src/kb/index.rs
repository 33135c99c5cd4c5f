//! Materialized view over the knowledge base.
//!
//! The extractors never walk the raw document; they consult these derived
//! maps. Everything here is rebuilt by one pure function from the current
//! knowledge base and normalizer, so a feedback mutation is followed by a
//! single [`Indexes::build`] call and nothing can go stale piecemeal.

use std::collections::HashMap;

use crate::caps::Tokenizer;
use crate::kb::KnowledgeBase;
use crate::normalize::TextNormalizer;

/// A model as seen from its make in `make_to_models`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// English model name.
    pub name: String,
    /// Canonical spelling (the knowledge base key).
    pub spelling: String,
    /// `[min, max]` production years, when known.
    pub popular_years: Option<(i32, i32)>,
    /// Common displacements for this model.
    pub common_engines: Vec<String>,
}

/// Derived lookup maps, rebuilt wholesale after every mutation.
#[derive(Debug, Default)]
pub struct Indexes {
    /// Normalized spelling/alias -> English make name.
    pub makes: HashMap<String, String>,
    /// Normalized spelling/alias -> English model name.
    pub models: HashMap<String, String>,
    /// Normalized spelling/alias -> English category name.
    pub categories: HashMap<String, String>,
    /// English make name -> its models.
    pub make_to_models: HashMap<String, Vec<ModelInfo>>,
    /// (make, model) -> known year range.
    pub model_years: HashMap<(String, String), (i32, i32)>,
    /// (make, model) -> common displacements.
    pub model_engines: HashMap<(String, String), Vec<String>>,
}

impl Indexes {
    /// Build the whole view from the current knowledge base. Lookup keys
    /// are normalized through the same pipeline as input lines, including
    /// the injected tokenizer when one is present.
    #[must_use]
    pub fn build(
        kb: &KnowledgeBase,
        normalizer: &TextNormalizer,
        tokenizer: Option<&dyn Tokenizer>,
    ) -> Self {
        let mut idx = Self::default();

        for (spelling, entry) in &kb.car_makes {
            insert_lookup(&mut idx.makes, normalizer, tokenizer, spelling, &entry.english);
            for alias in &entry.aliases {
                insert_lookup(&mut idx.makes, normalizer, tokenizer, alias, &entry.english);
            }
        }

        for (spelling, entry) in &kb.car_models {
            insert_lookup(&mut idx.models, normalizer, tokenizer, spelling, &entry.english);
            for alias in &entry.aliases {
                insert_lookup(&mut idx.models, normalizer, tokenizer, alias, &entry.english);
            }

            if let Some(make) = &entry.make {
                idx.make_to_models
                    .entry(make.clone())
                    .or_default()
                    .push(ModelInfo {
                        name: entry.english.clone(),
                        spelling: spelling.clone(),
                        popular_years: entry.popular_years,
                        common_engines: entry.common_engines.clone(),
                    });

                if let Some(range) = entry.popular_years {
                    let key = (make.clone(), entry.english.clone());
                    idx.model_years
                        .insert(key, (range.0.min(range.1), range.0.max(range.1)));
                }
                if !entry.common_engines.is_empty() {
                    idx.model_engines.insert(
                        (make.clone(), entry.english.clone()),
                        entry.common_engines.clone(),
                    );
                }
            }
        }

        for (spelling, entry) in &kb.part_categories {
            insert_lookup(&mut idx.categories, normalizer, tokenizer, spelling, &entry.english);
            for alias in &entry.aliases {
                insert_lookup(&mut idx.categories, normalizer, tokenizer, alias, &entry.english);
            }
        }

        idx
    }

    /// Whether `model` is a known model of `make`.
    #[must_use]
    pub fn model_belongs_to_make(&self, make: &str, model: &str) -> bool {
        self.make_to_models
            .get(make)
            .is_some_and(|models| models.iter().any(|m| m.name == model))
    }

    /// The make's first associated model, the low-confidence fallback.
    #[must_use]
    pub fn default_model_for_make(&self, make: &str) -> Option<&ModelInfo> {
        self.make_to_models.get(make).and_then(|m| m.first())
    }
}

fn insert_lookup(
    map: &mut HashMap<String, String>,
    normalizer: &TextNormalizer,
    tokenizer: Option<&dyn Tokenizer>,
    surface: &str,
    english: &str,
) {
    let key = normalizer.normalize(surface, tokenizer);
    if !key.is_empty() {
        map.insert(key, english.to_string());
    }
}
