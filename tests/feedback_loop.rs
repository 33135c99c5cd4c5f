//! Feedback loop end-to-end: corrections reach storage, the knowledge
//! base, and future parses.

use partlex::{Corrections, MemoryStore, PartsParser};

fn corrections(pairs: &[(&str, &str)]) -> Corrections {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn learned_spelling_found_by_lookup_after_feedback() {
    let mut parser = PartsParser::new();
    let mut store = MemoryStore::new();

    // "dacia" is not a seed make; the first parse cannot attribute it.
    let record = parser.parse_line("משאבת מים dacia").unwrap();
    assert_eq!(record.car_make, None);
    let id = store.insert(record);

    let applied = parser.apply_feedback(&mut store, id, &corrections(&[("car_make", "Dacia")]));
    assert!(applied);

    // Cache was cleared; a fresh parse of the same spelling now resolves
    // through the lexicon.
    let reparsed = parser.parse_line("משאבת מים dacia").unwrap();
    assert_eq!(reparsed.car_make.as_deref(), Some("Dacia"));
    let factors: partlex::score::ConfidenceFactors =
        serde_json::from_str(&reparsed.confidence_factors).unwrap();
    assert_eq!(factors.fields["car_make"].extraction_method, "exact_match");
}

#[test]
fn cached_record_differs_after_feedback() {
    let mut parser = PartsParser::new();
    let mut store = MemoryStore::new();

    let first = parser.parse_line("משאבת מים dacia").unwrap();
    let second = parser.parse_line("משאבת מים dacia").unwrap();
    assert_eq!(first, second);

    let id = store.insert(first.clone());
    assert!(parser.apply_feedback(&mut store, id, &corrections(&[("car_make", "Dacia")])));

    let third = parser.parse_line("משאבת מים dacia").unwrap();
    assert_ne!(first, third);
}

#[test]
fn model_correction_links_to_make() {
    let mut parser = PartsParser::new();
    let mut store = MemoryStore::new();
    let record = parser.parse_line("בולם duster").unwrap();
    let id = store.insert(record);

    assert!(parser.apply_feedback(
        &mut store,
        id,
        &corrections(&[("car_make", "Dacia"), ("car_model", "Duster")]),
    ));

    let entry = &parser.kb().car_models["Duster"];
    assert_eq!(entry.make.as_deref(), Some("Dacia"));
    assert!(entry.added_from_feedback);

    // The learned pair participates in compatibility checks right away.
    let reparsed = parser.parse_line("בולם duster dacia").unwrap();
    assert_eq!(reparsed.car_make.as_deref(), Some("Dacia"));
    assert_eq!(reparsed.car_model.as_deref(), Some("Duster"));
    let factors: partlex::score::ConfidenceFactors =
        serde_json::from_str(&reparsed.confidence_factors).unwrap();
    let check = factors
        .compatibility_checks
        .iter()
        .find(|c| c.check == "make_model_compatibility")
        .unwrap();
    assert!(check.result);
}

#[test]
fn existing_make_confidence_bumped() {
    let mut parser = PartsParser::new();
    let mut store = MemoryStore::new();
    let record = parser.parse_line("בולם קדמי").unwrap();
    let id = store.insert(record);

    let before = parser.kb().car_makes["קיה"].confidence;
    assert!(parser.apply_feedback(&mut store, id, &corrections(&[("car_make", "Kia")])));
    let after = parser.kb().car_makes["קיה"].confidence;
    assert!((after - (before + 0.05).min(1.0)).abs() < 1e-10);
}

#[test]
fn year_corrections_parse_into_integers() {
    let mut parser = PartsParser::new();
    let mut store = MemoryStore::new();
    let record = parser.parse_line("בולם קדמי").unwrap();
    let id = store.insert(record);

    assert!(parser.apply_feedback(
        &mut store,
        id,
        &corrections(&[("year_from", "2008"), ("year_to", "2013")]),
    ));
    let stored = store.get(id).unwrap();
    assert_eq!(stored.year_from, Some(2008));
    assert_eq!(stored.year_to, Some(2013));
}

#[test]
fn malformed_year_correction_fails_atomically() {
    let mut parser = PartsParser::new();
    let mut store = MemoryStore::new();
    let record = parser.parse_line("בולם קדמי מזדה").unwrap();
    let id = store.insert(record.clone());
    let makes_before = parser.kb().car_makes.len();

    // The store rejects the unparseable year, so the whole correction is
    // dropped: no record change, no knowledge-base change.
    let applied = parser.apply_feedback(
        &mut store,
        id,
        &corrections(&[("year_from", "not-a-year"), ("car_make", "Dacia")]),
    );
    assert!(!applied);
    assert_eq!(store.get(id).unwrap(), &record);
    assert_eq!(parser.kb().car_makes.len(), makes_before);
}

#[test]
fn audit_trail_keeps_original_values() {
    let mut parser = PartsParser::new();
    let mut store = MemoryStore::new();
    let record = parser.parse_line("בולם קדמי ימין מזדה 3").unwrap();
    let id = store.insert(record);

    assert!(parser.apply_feedback(&mut store, id, &corrections(&[("car_make", "Kia")])));

    let (entry_id, entry) = &store.audit_log()[0];
    assert_eq!(*entry_id, id);
    assert_eq!(entry.field, "car_make");
    assert_eq!(entry.original.as_deref(), Some("Mazda"));
    assert_eq!(entry.corrected, "Kia");
}
