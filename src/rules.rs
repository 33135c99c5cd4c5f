//! Pattern rules: named, prioritized, validated regex matchers.
//!
//! The rule set is built once from static templates plus one rule per
//! knowledge-base entry (every make, model, category, engine code and
//! location gets its own compiled rule), so the set scales with the
//! knowledge base. Each rule keeps running match and false-positive
//! counters; `precision` derives from them and is reported for
//! diagnostics, but ranking stays fixed at the construction-time
//! priority.
//!
//! Rules carry their payload in [`FieldKind`] (which make, which
//! model, which category the rule recognizes) and their semantic check in
//! [`Validator`] - plain data, not closures, so a rule is inspectable and
//! a validator is testable in isolation.

use chrono::Datelike;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::kb::index::Indexes;
use crate::kb::KnowledgeBase;

/// What a rule recognizes, with the recognized value as payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// A car make; payload is the English name reported on match.
    Make { make: String },
    /// A "make model" sequence ("מזדה 3"-shaped).
    ModelForMake { make: String, model: String },
    /// A standalone model spelling.
    Model { model: String },
    /// A part category, optionally with a bound subcategory.
    Category {
        category: String,
        subcategory: Option<String>,
    },
    /// A manufacturer engine code.
    EngineCode { code: String },
    /// A component location (Front/Rear/Right/Left/Upper/Lower).
    Location { location: String },
    /// Year markers.
    Year,
    /// Engine displacement in liters.
    Displacement,
    /// Drive type literals.
    DriveType,
    /// 2- or 3-axis numeric dimensions.
    Dimensions,
    /// Alphanumeric part/reference numbers.
    PartNumber,
    /// Declarative templates not consulted by a specific extractor.
    Special,
}

impl FieldKind {
    /// The (record field, value) pair this rule asserts when it matches.
    /// Used by the feedback loop to find rules disproven by a correction.
    #[must_use]
    pub fn asserted_value(&self) -> Option<(&'static str, &str)> {
        match self {
            FieldKind::Make { make } => Some(("car_make", make)),
            FieldKind::ModelForMake { model, .. } | FieldKind::Model { model } => {
                Some(("car_model", model))
            }
            FieldKind::Category { category, .. } => Some(("category", category)),
            _ => None,
        }
    }
}

/// Semantic check applied on top of a regex match.
///
/// Validators are pure predicates over the capture groups; a failed parse
/// inside a validator means "does not validate", never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Validator {
    /// Two-group year range: plausible, ordered, not in the far future.
    YearRange,
    /// Single year in [1930, current year + 5] after two-digit expansion.
    SingleYear,
    /// Displacement in [0.6, 8.0] liters.
    Displacement,
    /// Model code: 3-10 chars, uppercase alphanumeric.
    ModelCode,
    /// Drive type literal set.
    DriveType,
    /// Brake disc diameter in [220, 405] mm.
    BrakeDiscSize,
    /// Hyundai i-model number in [10, 40] (second capture group).
    HyundaiIModel,
    /// The pair must exist in the make->models index.
    MakeModelPair { make: String, model: String },
    /// The code must exist in the knowledge base.
    KnownEngineCode { code: String },
}

/// Expand a two-digit year: below 50 means 2000s, otherwise 1900s.
#[must_use]
pub fn expand_two_digit_year(year: i32) -> i32 {
    if year < 100 {
        if year < 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}

fn current_year() -> i32 {
    chrono::Utc::now().year()
}

impl Validator {
    /// Apply the check to a regex match.
    #[must_use]
    pub fn validate(&self, caps: &Captures<'_>, kb: &KnowledgeBase, indexes: &Indexes) -> bool {
        match self {
            Validator::YearRange => {
                let Some(year1) = group_i32(caps, 1).map(expand_two_digit_year) else {
                    return false;
                };
                let year2 = group_i32(caps, 2).map(expand_two_digit_year);
                let max = current_year() + 5;
                if year1 < 1930 || year1 > max {
                    return false;
                }
                match year2 {
                    Some(y2) => y2 >= year1 && y2 <= max,
                    None => true,
                }
            }
            Validator::SingleYear => {
                let Some(year) = group_i32(caps, 1).map(expand_two_digit_year) else {
                    return false;
                };
                (1930..=current_year() + 5).contains(&year)
            }
            Validator::Displacement => group_f64(caps, 1)
                .is_some_and(|d| (0.6..=8.0).contains(&d)),
            Validator::ModelCode => caps.get(1).is_some_and(|m| {
                let code = m.as_str();
                (3..=10).contains(&code.len())
                    && code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            }),
            Validator::DriveType => caps.get(1).is_some_and(|m| {
                matches!(
                    m.as_str().to_uppercase().as_str(),
                    "4X4" | "4X2" | "2X4" | "AWD" | "RWD" | "FWD"
                )
            }),
            Validator::BrakeDiscSize => {
                group_i32(caps, 1).is_some_and(|size| (220..=405).contains(&size))
            }
            Validator::HyundaiIModel => {
                group_i32(caps, 2).is_some_and(|n| (10..=40).contains(&n))
            }
            Validator::MakeModelPair { make, model } => {
                indexes.model_belongs_to_make(make, model)
            }
            Validator::KnownEngineCode { code } => kb.engine_codes.contains_key(code),
        }
    }
}

fn group_i32(caps: &Captures<'_>, index: usize) -> Option<i32> {
    caps.get(index)?.as_str().parse().ok()
}

fn group_f64(caps: &Captures<'_>, index: usize) -> Option<f64> {
    caps.get(index)?.as_str().parse().ok()
}

/// A single named extraction rule with usage statistics.
#[derive(Debug)]
pub struct PatternRule {
    /// Unique rule name ("make_Mazda", "category_Filter_שמן", ...).
    pub name: String,
    /// What the rule recognizes.
    pub kind: FieldKind,
    regex: Regex,
    /// Construction-time priority; higher means more specific. Tie-break
    /// hint only, ranking never changes at runtime.
    pub priority: u8,
    /// Optional semantic check.
    pub validator: Option<Validator>,
    /// Successful (validated) matches so far.
    pub match_count: u64,
    /// Matches later disproven through feedback.
    pub false_positive_count: u64,
}

impl PatternRule {
    fn compile(
        name: impl Into<String>,
        kind: FieldKind,
        pattern: &str,
        priority: u8,
        validator: Option<Validator>,
    ) -> Option<Self> {
        let name = name.into();
        match Regex::new(pattern) {
            Ok(regex) => Some(Self {
                name,
                kind,
                regex,
                priority,
                validator,
                match_count: 0,
                false_positive_count: 0,
            }),
            Err(e) => {
                log::warn!("skipping rule {} with unusable pattern: {}", name, e);
                None
            }
        }
    }

    /// Search `text`; on a validated hit, bump the match counter and
    /// return the captures.
    pub fn try_match<'t>(
        &mut self,
        text: &'t str,
        kb: &KnowledgeBase,
        indexes: &Indexes,
    ) -> Option<Captures<'t>> {
        let caps = self.regex.captures(text)?;
        if let Some(validator) = &self.validator {
            if !validator.validate(&caps, kb, indexes) {
                return None;
            }
        }
        self.match_count += 1;
        Some(caps)
    }

    /// Running precision: (matches - false positives) / matches, 0.5
    /// before any match has been seen.
    #[must_use]
    pub fn precision(&self) -> f64 {
        if self.match_count == 0 {
            0.5
        } else {
            (self.match_count - self.false_positive_count.min(self.match_count)) as f64
                / self.match_count as f64
        }
    }
}

/// The full compiled rule list, in construction order.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<PatternRule>,
}

impl RuleSet {
    /// Compile the rule set from the knowledge base: declarative special
    /// patterns, year/displacement templates, then one rule per make,
    /// make+model pair, model, engine code, category, subcategory and
    /// location, plus the technical-spec templates.
    #[must_use]
    pub fn compile(kb: &KnowledgeBase) -> Self {
        let mut rules = Vec::new();
        let mut push = |rule: Option<PatternRule>| {
            if let Some(rule) = rule {
                rules.push(rule);
            }
        };

        for sp in &kb.special_patterns {
            push(PatternRule::compile(
                sp.name.clone(),
                FieldKind::Special,
                &sp.regex,
                7,
                special_validator(&sp.name),
            ));
        }

        push(PatternRule::compile(
            "year_from_to",
            FieldKind::Year,
            r"(?:מ|מודל|משנת)[-\s]?(\d{2,4})[-\s]?(?:עד|ו|-)[-\s]?(?:שנת)?(\d{2,4})?",
            8,
            Some(Validator::YearRange),
        ));
        push(PatternRule::compile(
            "year_from",
            FieldKind::Year,
            r"מ(\d{2})",
            8,
            Some(Validator::SingleYear),
        ));
        push(PatternRule::compile(
            "year_to",
            FieldKind::Year,
            r"עד[-\s]?(\d{2})",
            8,
            Some(Validator::SingleYear),
        ));

        push(PatternRule::compile(
            "engine_displacement",
            FieldKind::Displacement,
            r"(?:נפח\s*)?(\d+\.\d+)(?:\s*ליטר)?",
            7,
            Some(Validator::Displacement),
        ));

        for (make_spelling, make_entry) in &kb.car_makes {
            let make = &make_entry.english;
            push(PatternRule::compile(
                format!("make_{make}"),
                FieldKind::Make { make: make.clone() },
                &format!(r"\b{}\b", regex::escape(make_spelling)),
                6,
                None,
            ));
            push(PatternRule::compile(
                format!("make_eng_{make}"),
                FieldKind::Make { make: make.clone() },
                &format!(r"\b{}\b", regex::escape(&make.to_lowercase())),
                6,
                None,
            ));

            for (model_spelling, model_entry) in &kb.car_models {
                if model_entry.make.as_deref() != Some(make.as_str()) {
                    continue;
                }
                let model = &model_entry.english;
                push(PatternRule::compile(
                    format!("model_{make}_{model}"),
                    FieldKind::ModelForMake {
                        make: make.clone(),
                        model: model.clone(),
                    },
                    &format!(
                        r"\b{}\s*\d*\s*{}\b",
                        regex::escape(make_spelling),
                        regex::escape(model_spelling)
                    ),
                    7,
                    Some(Validator::MakeModelPair {
                        make: make.clone(),
                        model: model.clone(),
                    }),
                ));
                push(PatternRule::compile(
                    format!("model_{model}"),
                    FieldKind::Model {
                        model: model.clone(),
                    },
                    &format!(r"\b{}\b", regex::escape(model_spelling)),
                    5,
                    None,
                ));
            }
        }

        for code in kb.engine_codes.keys() {
            push(PatternRule::compile(
                format!("engine_code_{code}"),
                FieldKind::EngineCode { code: code.clone() },
                &format!(r"(?i)\b{}\b", regex::escape(code)),
                7,
                Some(Validator::KnownEngineCode { code: code.clone() }),
            ));
        }

        for (cat_spelling, cat_entry) in &kb.part_categories {
            let category = &cat_entry.english;
            push(PatternRule::compile(
                format!("category_{category}"),
                FieldKind::Category {
                    category: category.clone(),
                    subcategory: None,
                },
                &format!(r"\b{}\b", regex::escape(cat_spelling)),
                6,
                None,
            ));
            for sub in &cat_entry.subcategories {
                push(PatternRule::compile(
                    format!("category_{category}_{sub}"),
                    FieldKind::Category {
                        category: category.clone(),
                        subcategory: Some(sub.clone()),
                    },
                    &format!(
                        r"\b{}\s+{}\b",
                        regex::escape(cat_spelling),
                        regex::escape(sub)
                    ),
                    7,
                    None,
                ));
            }
        }

        push(PatternRule::compile(
            "drive_type",
            FieldKind::DriveType,
            r"(?i)\b(4x4|4x2|2x4|AWD|RWD|FWD)\b",
            6,
            None,
        ));

        for (loc_spelling, loc) in &kb.component_locations {
            push(PatternRule::compile(
                format!("location_{loc}"),
                FieldKind::Location {
                    location: loc.clone(),
                },
                &format!(r"\b{}\b", regex::escape(loc_spelling)),
                5,
                None,
            ));
        }

        push(PatternRule::compile(
            "hyundai_i_models",
            FieldKind::Special,
            r"\b(I|i)(\d{1,2})\b",
            7,
            Some(Validator::HyundaiIModel),
        ));
        push(PatternRule::compile(
            "filter_abbreviation",
            FieldKind::Special,
            r"\bפ\.(אויר|שמן|דלק|מזגן|סולר)\b",
            7,
            None,
        ));
        push(PatternRule::compile(
            "brake_components",
            FieldKind::Special,
            r"\b(רפידות|דסקיות|צלחות|בלמים)\b",
            5,
            None,
        ));
        push(PatternRule::compile(
            "engine_components",
            FieldKind::Special,
            r"\b(אטם ראש|טיימינג|שרשרת|רצועת|מסנן שמן|מנוע)\b",
            5,
            None,
        ));
        push(PatternRule::compile(
            "suspension_components",
            FieldKind::Special,
            r"\b(בולם|קפיץ|משולש|זרוע|מייצב|תומך)\b",
            5,
            None,
        ));

        push(PatternRule::compile(
            "dimensions",
            FieldKind::Dimensions,
            r"(\d+(?:\.\d+)?)[\s]*[xX×][\s]*(\d+(?:\.\d+)?)(?:[\s]*[xX×][\s]*(\d+(?:\.\d+)?))?",
            6,
            None,
        ));
        push(PatternRule::compile(
            "part_number",
            FieldKind::PartNumber,
            r"\b([A-Z0-9]{3,}[-]?[A-Z0-9]{3,})\b",
            6,
            None,
        ));

        Self { rules }
    }

    /// Recompile against a mutated knowledge base, carrying match and
    /// false-positive counters over by rule name so learned statistics
    /// survive the rebuild.
    pub fn rebuild(&mut self, kb: &KnowledgeBase) {
        let mut fresh = Self::compile(kb);
        let old: std::collections::HashMap<&str, (u64, u64)> = self
            .rules
            .iter()
            .map(|r| (r.name.as_str(), (r.match_count, r.false_positive_count)))
            .collect();
        for rule in &mut fresh.rules {
            if let Some(&(matches, fps)) = old.get(rule.name.as_str()) {
                rule.match_count = matches;
                rule.false_positive_count = fps;
            }
        }
        *self = fresh;
    }

    /// Number of compiled rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in construction order.
    pub fn iter(&self) -> impl Iterator<Item = &PatternRule> {
        self.rules.iter()
    }

    /// Mutable rules in construction order (matching mutates counters).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PatternRule> {
        self.rules.iter_mut()
    }
}

fn special_validator(name: &str) -> Option<Validator> {
    match name {
        "year_range" => Some(Validator::YearRange),
        "single_year" => Some(Validator::SingleYear),
        "displacement" => Some(Validator::Displacement),
        "specific_model" => Some(Validator::ModelCode),
        "wheel_drive" => Some(Validator::DriveType),
        "brake_disc_size" => Some(Validator::BrakeDiscSize),
        _ => None,
    }
}
