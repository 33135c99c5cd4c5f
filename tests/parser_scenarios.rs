//! End-to-end extraction scenarios over the seed knowledge base.

use partlex::score::ConfidenceFactors;
use partlex::{PartsParser, EXTRACTION_TAG};

fn factors(record: &partlex::ParsedRecord) -> ConfidenceFactors {
    serde_json::from_str(&record.confidence_factors).unwrap()
}

#[test]
fn front_right_shock_absorber_mazda() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("בולם קדמי ימין מזדה 3").unwrap();

    assert!(
        record.category.as_deref() == Some("Shock Absorber")
            || record.category.as_deref() == Some("Front Shock Absorber"),
        "unexpected category: {:?}",
        record.category
    );
    assert_eq!(record.location.as_deref(), Some("Front"));
    assert_eq!(record.side.as_deref(), Some("Right"));
    assert_eq!(record.car_make.as_deref(), Some("Mazda"));
    assert_eq!(record.extraction_method, EXTRACTION_TAG);
}

#[test]
fn oil_filter_corolla_with_year_range() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("פ.שמן טויוטה קורולה מ05 עד10").unwrap();

    assert_eq!(record.category.as_deref(), Some("Oil Filter"));
    assert_eq!(record.car_make.as_deref(), Some("Toyota"));
    assert_eq!(record.car_model.as_deref(), Some("Corolla"));
    assert_eq!(record.year_from, Some(2005));
    assert_eq!(record.year_to, Some(2010));

    let factors = factors(&record);
    let category = &factors.fields["category"];
    assert_eq!(category.extraction_method, "abbreviation_pattern");
    assert!((category.confidence - 0.95).abs() < 1e-10);
}

#[test]
fn bare_i_model_infers_hyundai() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("I20").unwrap();

    assert_eq!(record.car_model.as_deref(), Some("i20"));
    assert_eq!(record.car_make.as_deref(), Some("Hyundai"));

    let factors = factors(&record);
    assert_eq!(
        factors.fields["car_make"].extraction_method,
        "inferred_from_model_match"
    );
}

#[test]
fn undersized_displacement_is_rejected() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("נפח 0.5").unwrap();
    assert_eq!(record.engine_displacement, None);
}

#[test]
fn displacement_within_range_is_kept() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("נפח 1.6").unwrap();
    assert_eq!(record.engine_displacement.as_deref(), Some("1.6"));
}

#[test]
fn compatible_make_model_bonus_reported() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("פ.שמן טויוטה קורולה מ05 עד10").unwrap();

    let factors = factors(&record);
    let check = factors
        .compatibility_checks
        .iter()
        .find(|c| c.check == "make_model_compatibility")
        .expect("make/model check must run when both fields are set");
    assert!(check.result);
    assert_eq!(check.bonus, Some(0.1));
}

#[test]
fn confidence_bounded_and_rounded_across_inputs() {
    let mut parser = PartsParser::new();
    for line in [
        "בולם קדמי ימין מזדה 3",
        "פ.שמן טויוטה קורולה מ05 עד10",
        "I20",
        "נפח 0.5",
        "רדיאטור 4x4 נפח 1.6",
        "משהו לא מזוהה לגמרי",
        "x",
        "1K0413031",
    ] {
        let record = parser.parse_line(line).unwrap();
        let score = record.confidence_score;
        assert!((0.0..=1.0).contains(&score), "score {score} for {line:?}");
        assert!(
            (score * 100.0 - (score * 100.0).round()).abs() < 1e-9,
            "score {score} not rounded to 2 decimals for {line:?}"
        );
    }
}

#[test]
fn cache_returns_identical_record() {
    let mut parser = PartsParser::new();
    let first = parser.parse_line("בולם קדמי ימין מזדה 3").unwrap();
    let second = parser.parse_line("בולם קדמי ימין מזדה 3").unwrap();
    assert_eq!(first, second);
}

#[test]
fn two_digit_year_expansion_rule() {
    for y in 0..100 {
        let expanded = partlex::rules::expand_two_digit_year(y);
        if y < 50 {
            assert_eq!(expanded, 2000 + y);
        } else {
            assert_eq!(expanded, 1900 + y);
        }
    }
}

#[test]
fn engine_code_pulls_displacement() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("אטם ראש CBZ").unwrap();
    assert_eq!(record.engine_code.as_deref(), Some("CBZ"));
    assert_eq!(record.engine_displacement.as_deref(), Some("1.2"));

    let factors = factors(&record);
    assert_eq!(
        factors.fields["engine_code"].extraction_method,
        "inferred_from_code"
    );
}

#[test]
fn technical_specs_collects_numeric_fields() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("דסקיות 280x22 נפח 2.0 4x4").unwrap();
    let specs: serde_json::Value =
        serde_json::from_str(record.technical_specs.as_deref().unwrap()).unwrap();
    assert_eq!(specs["displacement"], "2.0L");
    assert_eq!(specs["dimensions"], "280x22");
    assert_eq!(specs["drive_type"], "4X4");
}

#[test]
fn residual_text_survives_as_additional_info() {
    let mut parser = PartsParser::new();
    let record = parser.parse_line("בולם קדמי ימין מזדה 3").unwrap();
    assert_eq!(record.additional_info.as_deref(), Some("3"));

    // A fully recognized line leaves no residue.
    let clean = parser.parse_line("פ.שמן טויוטה קורולה מ05 עד10").unwrap();
    assert_eq!(clean.additional_info, None);
}

#[test]
fn whitespace_only_lines_yield_nothing() {
    let mut parser = PartsParser::new();
    assert!(parser.parse_line("").is_none());
    assert!(parser.parse_line("   ").is_none());
    assert!(parser.parse_line("\t\n").is_none());
}
