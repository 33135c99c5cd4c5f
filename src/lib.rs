//! # partlex
//!
//! Rule-based extraction of structured fields from free-text Hebrew car
//! parts listings.
//!
//! A line like `"בולם קדמי ימין מזדה 3"` (front-right shock absorber,
//! Mazda 3) decomposes into make, model, year range, category, location,
//! side, engine data, drive type, dimensions and part number, with an
//! overall confidence score and a per-field explanation of how each value
//! was obtained.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ PartsParser (orchestrator, per-line cache)              │
//! │                                                         │
//! │  normalize ─► field extractors ─► scorer ─► record      │
//! │                    │    │                               │
//! │        ┌───────────┘    └──────────┐                    │
//! │        ▼                           ▼                    │
//! │  KnowledgeBase ◄─── Indexes   RuleSet (per-entry rules) │
//! │        ▲                                                │
//! │        └── feedback loop (corrections mutate the KB)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The knowledge base is a JSON document of automotive facts that grows
//! through user corrections: a correction updates the stored record,
//! reinforces or adds knowledge-base entries, penalizes the pattern rules
//! it disproves, and clears the extraction cache.
//!
//! ## Quick start
//!
//! ```rust
//! use partlex::PartsParser;
//!
//! let mut parser = PartsParser::new();
//! let record = parser.parse_line("פ.שמן טויוטה קורולה מ05 עד10").unwrap();
//! assert_eq!(record.category.as_deref(), Some("Oil Filter"));
//! assert_eq!(record.car_make.as_deref(), Some("Toyota"));
//! assert_eq!(record.year_from, Some(2005));
//! ```
//!
//! ## Optional capabilities
//!
//! Tokenization, word embeddings and a trained category classifier are
//! injection points ([`Capabilities`]), not dependencies. Each absent
//! capability removes exactly one fallback tier; exact, pattern and
//! phrase matching always behave the same.
//!
//! ## Concurrency
//!
//! A parser is single-threaded mutable state (matching updates rule
//! statistics, parsing fills the cache). Confine an instance to one
//! thread; feedback mutations must be serialized by the caller.

#![warn(missing_docs)]

pub mod caps;
mod error;
pub mod extract;
pub mod feedback;
pub mod kb;
mod normalize;
mod parser;
mod record;
pub mod rules;
pub mod score;
pub mod types;

pub use caps::{Capabilities, CategoryClassifier, Tokenizer, WordEmbedder};
pub use error::{Error, Result};
pub use feedback::{Corrections, MemoryStore, RecordId, RecordStore};
pub use kb::KnowledgeBase;
pub use normalize::TextNormalizer;
pub use parser::{ImportSummary, PartsParser, EXTRACTION_TAG};
pub use record::{Extracted, ExtractionMethod, ParsedRecord};
pub use types::Confidence;
