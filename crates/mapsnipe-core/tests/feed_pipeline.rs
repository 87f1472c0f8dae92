//! Integration tests for the feed -> filter -> selector pipeline.

use mapsnipe_core::feed::parse_response;
use mapsnipe_core::filter::FilterContext;
use mapsnipe_core::{
    CandidateFilter, DedupLedger, FeedMode, FilterCriteria, Position, Rejection, SelectionMode,
    SpeciesTable, TargetSelector,
};
use std::fs;
use tempfile::TempDir;

const NOW: i64 = 1_700_000_000;

/// Map server body with coordinates `north_m` meters north of (0, 0)
fn body(items: &[(u32, f64, Option<&str>)]) -> String {
    let pokemons: Vec<_> = items
        .iter()
        .map(|(id, north_m, encounter)| {
            serde_json::json!({
                "pokemon_id": id,
                "latitude": north_m / 111_195.0,
                "longitude": 0.0,
                "disappear_time": ((NOW + 900) * 1000) as f64,
                "encounter_id": encounter,
                "spawnpoint_id": "",
            })
        })
        .collect();
    serde_json::json!({ "pokemons": pokemons }).to_string()
}

#[test]
fn test_pull_body_to_ranked_targets() {
    // "MTIz" is base64 for "123"
    let raw = body(&[
        (16, 100.0, None),
        (143, 400.0, Some("MTIz")),
        (25, 200.0, Some("not base64!")),
        (131, 300.0, None),
    ]);
    let items = parse_response(&raw).expect("Failed to parse body");
    assert_eq!(items.len(), 4);

    let sightings: Vec<_> = items.into_iter().filter_map(Result::ok).collect();
    assert_eq!(sightings.len(), 3);
    assert_eq!(sightings[1].encounter_id, Some(123));
    assert_eq!(sightings[0].spawn_point_id, None);

    let filter = CandidateFilter::new(
        FilterCriteria::new()
            .with_catch("Pidgey", 1)
            .with_catch("Snorlax", 500)
            .with_vip("Lapras")
            .with_distances(5_000.0, 1_000.0)
            .with_walk_speed(3.0),
    );
    let species = SpeciesTable::builtin();
    let ledger = DedupLedger::new();
    let ctx = FilterContext {
        mode: FeedMode::Pull,
        position: Position::new(0.0, 0.0),
        now: NOW,
        ledger: &ledger,
        species: &species,
    };
    let mut report = filter.filter(&sightings, &ctx);
    assert!(report.rejected.is_empty());

    let selector = TargetSelector::new(SelectionMode::Priority, true);
    selector.rank(&mut report.candidates);
    let names: Vec<_> = report.candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Lapras", "Snorlax", "Pidgey"]);
}

#[test]
fn test_custom_species_table() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("pokemon.json");
    fs::write(
        &path,
        r#"[{"Number": "002", "Name": "Ivysaur"}, {"Number": "001", "Name": "Bulbasaur"}]"#,
    )
    .expect("Failed to write species file");

    let species = SpeciesTable::from_json_file(&path).expect("Failed to load species");
    let raw = body(&[(2, 50.0, None), (25, 50.0, None)]);
    let sightings: Vec<_> = parse_response(&raw)
        .unwrap()
        .into_iter()
        .filter_map(Result::ok)
        .collect();

    let filter = CandidateFilter::new(
        FilterCriteria::new()
            .with_catch("Ivysaur", 5)
            .with_catch("Pikachu", 5)
            .with_distances(5_000.0, 1_000.0)
            .with_walk_speed(3.0),
    );
    let ledger = DedupLedger::new();
    let ctx = FilterContext {
        mode: FeedMode::Push,
        position: Position::new(0.0, 0.0),
        now: NOW,
        ledger: &ledger,
        species: &species,
    };
    let report = filter.filter(&sightings, &ctx);
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.candidates[0].name, "Ivysaur");
    assert_eq!(report.rejected[0].reason, Rejection::UnknownSpecies(25));
}

#[test]
fn test_malformed_bodies_fail_as_a_whole() {
    assert!(parse_response("<html>").is_err());
    assert!(parse_response(r#"{"gyms": []}"#).is_err());
    assert!(parse_response(r#"{"pokemons": []}"#).unwrap().is_empty());
}
