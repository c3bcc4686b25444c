use anyhow::Result;
use phasmo_companion::ghost::filter::{evidence_combinations, possible_ghosts};
use phasmo_companion::ghost::{
    CatalogSource, CatalogStore, DifficultyMode, Evidence, FilterSelection, FilterState, InclusionState,
};

const CATALOG: &str = r#"[
  {
    "id": "spirit", "name": "Spirit", "description": "A common ghost",
    "evidences": ["EMF", "SpiritBox", "GhostWriting"],
    "strengths": "None", "weaknesses": "Smudge sticks last longer",
    "behaviors": [], "huntThreshold": 50, "speedRange": {"min": 1.7, "max": 1.7},
    "hasLOS": true, "speedDetails": {"baseSpeed": 1.7, "losMultiplier": 1.65, "description": "Normal"}
  },
  {
    "id": "mimic", "name": "The Mimic", "description": "Copies other ghosts",
    "evidences": ["EMF", "SpiritBox", "GhostOrb"], "guaranteedEvidences": ["GhostOrb"],
    "strengths": "Mimics traits", "weaknesses": "Shows orbs",
    "behaviors": [], "huntThreshold": 50, "speedRange": {"min": 1.0, "max": 2.8},
    "hasLOS": true, "speedDetails": {"baseSpeed": 1.7, "description": "Varies", "variableSpeed": true}
  },
  {
    "id": "shade", "name": "Shade", "description": "Shy ghost",
    "evidences": ["EMF", "GhostWriting", "FreezingTemps"],
    "strengths": "Hard to find", "weaknesses": "Won't hunt near groups",
    "behaviors": [], "huntThreshold": 35, "speedRange": {"min": 1.7, "max": 1.7},
    "hasLOS": true, "speedDetails": {"baseSpeed": 1.7, "losMultiplier": 1.65, "description": "Normal"}
  },
  {
    "id": "revenant", "name": "Revenant", "description": "Violent ghost",
    "evidences": ["GhostOrb", "GhostWriting", "FreezingTemps"],
    "strengths": "Very fast when chasing", "weaknesses": "Slow when roaming",
    "behaviors": [], "huntThreshold": 50, "speedRange": {"min": 1.0, "max": 3.0},
    "hasLOS": false, "speedDetails": {"baseSpeed": 1.0, "description": "Slow, fast with LoS"}
  }
]"#;

struct FixedSource;

impl CatalogSource for FixedSource {
    fn fetch(&self) -> Result<String> {
        Ok(CATALOG.to_string())
    }
}

fn catalog() -> CatalogStore {
    let mut store = CatalogStore::new(Box::new(FixedSource), None);
    assert_eq!(store.refresh().unwrap(), 4);
    store
}

fn ids(filters: &FilterState, store: &CatalogStore) -> Vec<String> {
    filters
        .possible_ghosts(store.catalog().iter())
        .into_iter()
        .map(|g| g.id.clone())
        .collect()
}

#[test]
fn test_neutral_selection_keeps_every_ghost_in_every_mode() {
    let store = catalog();
    let mut filters = FilterState::new();
    filters.toggle_evidence(Evidence::Emf);
    filters.toggle_los();
    filters.set_hunt_threshold(Some(40.0), None);
    filters.reset_filters();

    for mode in DifficultyMode::ALL {
        filters.set_mode(mode);
        assert_eq!(ids(&filters, &store).len(), 4, "mode {}", mode);
    }
}

#[test]
fn test_results_sorted_by_name() {
    let store = catalog();
    let names: Vec<String> = possible_ghosts(store.catalog().iter(), DifficultyMode::Amateur, &FilterSelection::default())
        .into_iter()
        .map(|g| g.name.clone())
        .collect();
    assert_eq!(names, vec!["Revenant", "Shade", "Spirit", "The Mimic"]);
}

#[test]
fn test_professional_include_and_exclude() {
    let store = catalog();
    let mut filters = FilterState::new();

    filters.toggle_evidence(Evidence::GhostWriting);
    assert_eq!(ids(&filters, &store), vec!["revenant", "shade", "spirit"]);

    // Include -> Exclude
    filters.toggle_evidence(Evidence::GhostWriting);
    assert_eq!(ids(&filters, &store), vec!["mimic"]);
}

#[test]
fn test_excluded_emf_removes_emf_ghosts_in_professional() {
    let store = catalog();
    let mut filters = FilterState::new();
    filters.selection.set_evidence_state(Evidence::Emf, InclusionState::Exclude);
    assert_eq!(ids(&filters, &store), vec!["revenant"]);
}

#[test]
fn test_nightmare_exclusion_keeps_ghosts_that_can_hide_it() {
    let store = catalog();
    let mut filters = FilterState::new();
    filters.set_mode(DifficultyMode::Nightmare);
    filters.selection.set_evidence_state(Evidence::Emf, InclusionState::Exclude);

    // Each EMF ghost has a combination without EMF
    assert_eq!(ids(&filters, &store), vec!["revenant", "shade", "spirit", "mimic"]);

    // A guaranteed evidence can never be hidden
    filters.reset_filters();
    filters.set_mode(DifficultyMode::Insanity);
    filters.selection.set_evidence_state(Evidence::GhostOrb, InclusionState::Exclude);
    assert_eq!(ids(&filters, &store), vec!["revenant", "shade", "spirit"]);
}

#[test]
fn test_mimic_combinations() {
    let store = catalog();
    let mimic = store.get("mimic").unwrap();

    assert_eq!(
        evidence_combinations(mimic, DifficultyMode::Nightmare),
        vec![
            vec![Evidence::GhostOrb, Evidence::Emf],
            vec![Evidence::GhostOrb, Evidence::SpiritBox],
        ]
    );
    assert_eq!(
        evidence_combinations(mimic, DifficultyMode::Insanity),
        vec![vec![Evidence::GhostOrb]]
    );
    assert_eq!(
        evidence_combinations(mimic, DifficultyMode::Professional),
        vec![vec![Evidence::Emf, Evidence::SpiritBox, Evidence::GhostOrb]]
    );
}

#[test]
fn test_line_of_sight_and_hunt_threshold() {
    let store = catalog();
    let mut filters = FilterState::new();

    assert_eq!(filters.toggle_los(), InclusionState::Include);
    assert_eq!(ids(&filters, &store), vec!["shade", "spirit", "mimic"]);
    assert_eq!(filters.toggle_los(), InclusionState::Exclude);
    assert_eq!(ids(&filters, &store), vec!["revenant"]);
    assert_eq!(filters.toggle_los(), InclusionState::Neutral);

    filters.set_hunt_threshold(None, Some(40.0));
    assert_eq!(ids(&filters, &store), vec!["shade"]);
}

#[test]
fn test_speed_range_filter() {
    let store = catalog();
    let mut filters = FilterState::new();

    // Fast ghosts only: ranges reaching 2.5 m/s
    filters.set_speed_range(Some(2.5), None);
    assert_eq!(ids(&filters, &store), vec!["revenant", "mimic"]);
}
