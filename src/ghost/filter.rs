//! Evidence filter engine
//!
//! Everything here is pure: the possible-ghost list is derived from
//! (catalog, difficulty, selection) whenever it is read.

use crate::ghost::model::{DifficultyMode, Evidence, Ghost};
use crate::ghost::speed::SpeedCategory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tri-state filter toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InclusionState {
    Include,
    Exclude,
    #[default]
    Neutral,
}

impl InclusionState {
    /// neutral -> include -> exclude -> neutral
    pub fn next(self) -> Self {
        match self {
            InclusionState::Neutral => InclusionState::Include,
            InclusionState::Include => InclusionState::Exclude,
            InclusionState::Exclude => InclusionState::Neutral,
        }
    }
}

/// Optional closed interval; a `None` bound is unbounded on that side
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpeedFilter {
    /// m/s window the ghost's speed range must overlap
    Range(Bounds),
    /// Categories the ghost must share at least one of
    Categories(BTreeSet<SpeedCategory>),
}

impl Default for SpeedFilter {
    fn default() -> Self {
        SpeedFilter::Range(Bounds::default())
    }
}

impl SpeedFilter {
    pub fn is_active(&self) -> bool {
        match self {
            SpeedFilter::Range(bounds) => !bounds.is_unbounded(),
            SpeedFilter::Categories(categories) => !categories.is_empty(),
        }
    }

    fn admits(&self, ghost: &Ghost) -> bool {
        match self {
            SpeedFilter::Range(bounds) => {
                if bounds.min.is_some_and(|min| ghost.speed_range.max < min) {
                    return false;
                }
                !bounds.max.is_some_and(|max| ghost.speed_range.min > max)
            }
            SpeedFilter::Categories(selected) => {
                selected.is_empty()
                    || SpeedCategory::of_range(ghost.speed_range)
                        .intersection(selected)
                        .next()
                        .is_some()
            }
        }
    }
}

/// User's current filter choices (session-only, never persisted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub evidence: BTreeMap<Evidence, InclusionState>,
    pub speed: SpeedFilter,
    pub line_of_sight: InclusionState,
    pub hunt_threshold: Bounds,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            evidence: Evidence::ALL
                .into_iter()
                .map(|e| (e, InclusionState::Neutral))
                .collect(),
            speed: SpeedFilter::default(),
            line_of_sight: InclusionState::Neutral,
            hunt_threshold: Bounds::default(),
        }
    }
}

impl FilterSelection {
    pub fn evidence_state(&self, evidence: Evidence) -> InclusionState {
        self.evidence.get(&evidence).copied().unwrap_or_default()
    }

    pub fn set_evidence_state(&mut self, evidence: Evidence, state: InclusionState) {
        self.evidence.insert(evidence, state);
    }

    /// True when no filter can exclude anything
    pub fn is_neutral(&self) -> bool {
        self.evidence.values().all(|s| *s == InclusionState::Neutral)
            && !self.speed.is_active()
            && self.line_of_sight == InclusionState::Neutral
            && self.hunt_threshold.is_unbounded()
    }
}

/// Evidence sets a ghost may plausibly show in the given difficulty
///
/// Without hiding this is the single full evidence list. In Nightmare and
/// Insanity, guaranteed evidences always show and the remaining slots are
/// filled by every combination of the other evidences.
pub fn evidence_combinations(ghost: &Ghost, mode: DifficultyMode) -> Vec<Vec<Evidence>> {
    let Some(visible_total) = mode.visible_evidence_total() else {
        return vec![ghost.evidences.clone()];
    };

    let guaranteed = &ghost.guaranteed_evidences;
    let normal: Vec<Evidence> = ghost
        .evidences
        .iter()
        .copied()
        .filter(|e| !guaranteed.contains(e))
        .collect();
    let slots = visible_total.saturating_sub(guaranteed.len());

    if normal.len() <= slots {
        let mut all = guaranteed.clone();
        all.extend(normal);
        return vec![all];
    }

    let mut combinations = Vec::new();
    let mut current = Vec::with_capacity(slots);
    collect_combinations(&normal, slots, 0, &mut current, guaranteed, &mut combinations);
    combinations
}

fn collect_combinations(
    normal: &[Evidence],
    size: usize,
    start: usize,
    current: &mut Vec<Evidence>,
    prefix: &[Evidence],
    out: &mut Vec<Vec<Evidence>>,
) {
    if current.len() == size {
        let mut combo = prefix.to_vec();
        combo.extend_from_slice(current);
        out.push(combo);
        return;
    }
    for i in start..normal.len() {
        current.push(normal[i]);
        collect_combinations(normal, size, i + 1, current, prefix, out);
        current.pop();
    }
}

pub fn is_guaranteed_evidence(ghost: &Ghost, evidence: Evidence) -> bool {
    ghost.is_guaranteed(evidence)
}

/// Whether the ghost survives every active filter
pub fn is_ghost_possible(ghost: &Ghost, mode: DifficultyMode, selection: &FilterSelection) -> bool {
    let hides = mode.hides_evidence();
    let combos = if hides {
        evidence_combinations(ghost, mode)
    } else {
        Vec::new()
    };

    for (&evidence, &state) in &selection.evidence {
        match state {
            InclusionState::Include => {
                if !ghost.has_evidence(evidence) {
                    return false;
                }
                if hides
                    && !is_guaranteed_evidence(ghost, evidence)
                    && !combos.iter().any(|combo| combo.contains(&evidence))
                {
                    return false;
                }
            }
            InclusionState::Exclude => {
                if is_guaranteed_evidence(ghost, evidence) {
                    return false;
                }
                if ghost.evidences.contains(&evidence) {
                    if !hides {
                        return false;
                    }
                    if combos.iter().all(|combo| combo.contains(&evidence)) {
                        return false;
                    }
                }
            }
            InclusionState::Neutral => {}
        }
    }

    if !selection.hunt_threshold.contains(ghost.hunt_threshold) {
        return false;
    }

    if selection.speed.is_active() && !selection.speed.admits(ghost) {
        return false;
    }

    match selection.line_of_sight {
        InclusionState::Include if !ghost.has_los => false,
        InclusionState::Exclude if ghost.has_los => false,
        _ => true,
    }
}

/// Ghosts surviving the filters, sorted by name
pub fn possible_ghosts<'a, I>(ghosts: I, mode: DifficultyMode, selection: &FilterSelection) -> Vec<&'a Ghost>
where
    I: IntoIterator<Item = &'a Ghost>,
{
    let mut possible: Vec<&Ghost> = ghosts
        .into_iter()
        .filter(|ghost| is_ghost_possible(ghost, mode, selection))
        .collect();
    possible.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    possible
}

/// Difficulty, filter selection and the ghost the user picked
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub mode: DifficultyMode,
    pub selection: FilterSelection,
    pub selected_ghost: Option<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_evidence(&mut self, evidence: Evidence) -> InclusionState {
        let next = self.selection.evidence_state(evidence).next();
        self.selection.set_evidence_state(evidence, next);
        log::debug!("Evidence {} -> {:?}", evidence, next);
        next
    }

    pub fn toggle_los(&mut self) -> InclusionState {
        self.selection.line_of_sight = self.selection.line_of_sight.next();
        self.selection.line_of_sight
    }

    pub fn set_speed_range(&mut self, min: Option<f64>, max: Option<f64>) {
        self.selection.speed = SpeedFilter::Range(Bounds::new(min, max));
    }

    pub fn set_speed_categories(&mut self, categories: BTreeSet<SpeedCategory>) {
        self.selection.speed = SpeedFilter::Categories(categories);
    }

    pub fn set_hunt_threshold(&mut self, min: Option<f64>, max: Option<f64>) {
        self.selection.hunt_threshold = Bounds::new(min, max);
    }

    pub fn set_mode(&mut self, mode: DifficultyMode) {
        self.mode = mode;
    }

    pub fn select_ghost(&mut self, id: Option<String>) {
        self.selected_ghost = id;
    }

    /// Back to all-neutral; difficulty and selected ghost are kept
    pub fn reset_filters(&mut self) {
        self.selection = FilterSelection::default();
    }

    pub fn possible_ghosts<'a, I>(&self, ghosts: I) -> Vec<&'a Ghost>
    where
        I: IntoIterator<Item = &'a Ghost>,
    {
        possible_ghosts(ghosts, self.mode, &self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ghost::model::tests::ghost;
    use crate::ghost::model::SpeedRange;
    use Evidence::*;

    fn mimic() -> Ghost {
        ghost("mimic", &[Emf, SpiritBox, GhostOrb], &[GhostOrb])
    }

    #[test]
    fn test_no_hiding_returns_all_evidences() {
        let g = ghost("spirit", &[Emf, SpiritBox, GhostWriting], &[]);
        for mode in [DifficultyMode::Amateur, DifficultyMode::Intermediate, DifficultyMode::Professional] {
            assert_eq!(evidence_combinations(&g, mode), vec![vec![Emf, SpiritBox, GhostWriting]]);
        }
    }

    #[test]
    fn test_nightmare_with_guaranteed_evidence() {
        assert_eq!(
            evidence_combinations(&mimic(), DifficultyMode::Nightmare),
            vec![vec![GhostOrb, Emf], vec![GhostOrb, SpiritBox]]
        );
    }

    #[test]
    fn test_insanity_with_guaranteed_evidence() {
        assert_eq!(
            evidence_combinations(&mimic(), DifficultyMode::Insanity),
            vec![vec![GhostOrb]]
        );
    }

    #[test]
    fn test_nightmare_three_normal_evidences() {
        let g = ghost("banshee", &[Fingerprints, GhostOrb, DotsProjector], &[]);
        assert_eq!(
            evidence_combinations(&g, DifficultyMode::Nightmare),
            vec![
                vec![Fingerprints, GhostOrb],
                vec![Fingerprints, DotsProjector],
                vec![GhostOrb, DotsProjector],
            ]
        );
        assert_eq!(evidence_combinations(&g, DifficultyMode::Insanity).len(), 3);
    }

    #[test]
    fn test_too_few_normal_evidences_shows_everything() {
        let g = ghost("odd", &[Emf, GhostOrb], &[GhostOrb]);
        assert_eq!(
            evidence_combinations(&g, DifficultyMode::Nightmare),
            vec![vec![GhostOrb, Emf]]
        );
        let single = ghost("single", &[Emf], &[]);
        assert_eq!(evidence_combinations(&single, DifficultyMode::Nightmare), vec![vec![Emf]]);
    }

    #[test]
    fn test_combinations_are_distinct_and_sized() {
        let ghosts = vec![
            ghost("a", &[Emf, SpiritBox, GhostOrb], &[]),
            ghost("b", &[Emf, SpiritBox, Fingerprints, GhostWriting], &[]),
            mimic(),
            ghost("c", &[Emf], &[]),
        ];
        for g in &ghosts {
            for mode in DifficultyMode::ALL {
                let combos = evidence_combinations(g, mode);
                let expected = mode
                    .visible_evidence_total()
                    .map_or(g.evidences.len(), |v| v.min(g.evidences.len()));
                for (i, combo) in combos.iter().enumerate() {
                    assert_eq!(combo.len(), expected, "{} in {}", g.id, mode);
                    let set: BTreeSet<_> = combo.iter().collect();
                    for other in &combos[i + 1..] {
                        let other_set: BTreeSet<_> = other.iter().collect();
                        assert_ne!(set, other_set);
                    }
                }
            }
        }
    }

    #[test]
    fn test_toggle_cycles_back_after_three_steps() {
        let mut state = FilterState::new();
        assert_eq!(state.toggle_evidence(Emf), InclusionState::Include);
        assert_eq!(state.toggle_evidence(Emf), InclusionState::Exclude);
        assert_eq!(state.toggle_evidence(Emf), InclusionState::Neutral);

        state.toggle_los();
        state.toggle_los();
        state.toggle_los();
        assert_eq!(state.selection.line_of_sight, InclusionState::Neutral);
    }

    #[test]
    fn test_excluded_evidence_removes_ghost_in_professional() {
        let g = ghost("spirit", &[Emf, SpiritBox, GhostWriting], &[]);
        let mut selection = FilterSelection::default();
        selection.set_evidence_state(Emf, InclusionState::Exclude);
        assert!(!is_ghost_possible(&g, DifficultyMode::Professional, &selection));
    }

    #[test]
    fn test_excluded_evidence_can_be_hidden_in_nightmare() {
        let g = ghost("spirit", &[Emf, SpiritBox, GhostWriting], &[]);
        let mut selection = FilterSelection::default();
        selection.set_evidence_state(Emf, InclusionState::Exclude);
        assert!(is_ghost_possible(&g, DifficultyMode::Nightmare, &selection));
    }

    #[test]
    fn test_excluding_guaranteed_evidence_removes_ghost() {
        let mut selection = FilterSelection::default();
        selection.set_evidence_state(GhostOrb, InclusionState::Exclude);
        for mode in DifficultyMode::ALL {
            assert!(!is_ghost_possible(&mimic(), mode, &selection));
        }
    }

    #[test]
    fn test_exclude_unavoidable_evidence_in_nightmare() {
        // Two normal evidences and two slots: both are always visible
        let g = ghost("pair", &[Emf, SpiritBox], &[]);
        let mut selection = FilterSelection::default();
        selection.set_evidence_state(Emf, InclusionState::Exclude);
        assert!(!is_ghost_possible(&g, DifficultyMode::Nightmare, &selection));
    }

    #[test]
    fn test_include_requires_showable_evidence() {
        let mut selection = FilterSelection::default();
        selection.set_evidence_state(Emf, InclusionState::Include);
        assert!(is_ghost_possible(&mimic(), DifficultyMode::Nightmare, &selection));
        // Insanity leaves no slot next to the guaranteed orb
        assert!(!is_ghost_possible(&mimic(), DifficultyMode::Insanity, &selection));

        selection.set_evidence_state(Emf, InclusionState::Neutral);
        selection.set_evidence_state(Fingerprints, InclusionState::Include);
        assert!(!is_ghost_possible(&mimic(), DifficultyMode::Professional, &selection));
    }

    #[test]
    fn test_included_guaranteed_evidence_always_matches() {
        let mut selection = FilterSelection::default();
        selection.set_evidence_state(GhostOrb, InclusionState::Include);
        assert!(is_guaranteed_evidence(&mimic(), GhostOrb));
        assert!(!is_guaranteed_evidence(&mimic(), SpiritBox));
        assert!(is_ghost_possible(&mimic(), DifficultyMode::Insanity, &selection));
    }

    #[test]
    fn test_hunt_threshold_window() {
        let mut g = ghost("demon", &[Emf], &[]);
        g.hunt_threshold = 70.0;
        let mut selection = FilterSelection::default();

        selection.hunt_threshold = Bounds::new(Some(60.0), None);
        assert!(is_ghost_possible(&g, DifficultyMode::Professional, &selection));
        selection.hunt_threshold = Bounds::new(None, Some(50.0));
        assert!(!is_ghost_possible(&g, DifficultyMode::Professional, &selection));
        selection.hunt_threshold = Bounds::new(Some(70.0), Some(70.0));
        assert!(is_ghost_possible(&g, DifficultyMode::Professional, &selection));
    }

    #[test]
    fn test_speed_range_filter() {
        let mut g = ghost("revenant", &[Emf], &[]);
        g.speed_range = SpeedRange { min: 1.0, max: 3.0 };
        let mut state = FilterState::new();

        state.set_speed_range(Some(2.5), None);
        assert_eq!(state.possible_ghosts([&g]).len(), 1);
        state.set_speed_range(Some(3.5), None);
        assert!(state.possible_ghosts([&g]).is_empty());
        state.set_speed_range(None, Some(0.5));
        assert!(state.possible_ghosts([&g]).is_empty());
        state.set_speed_range(None, None);
        assert_eq!(state.possible_ghosts([&g]).len(), 1);
    }

    #[test]
    fn test_speed_category_filter() {
        let slow = {
            let mut g = ghost("slow", &[Emf], &[]);
            g.speed_range = SpeedRange { min: 1.0, max: 1.0 };
            g
        };
        let normal = ghost("normal", &[Emf], &[]);
        let mut state = FilterState::new();

        state.set_speed_categories([SpeedCategory::Slow].into_iter().collect());
        let names: Vec<_> = state.possible_ghosts([&slow, &normal]).into_iter().map(|g| g.id.clone()).collect();
        assert_eq!(names, vec!["slow".to_string()]);

        state.set_speed_categories(BTreeSet::new());
        assert_eq!(state.possible_ghosts([&slow, &normal]).len(), 2);
    }

    #[test]
    fn test_line_of_sight_filter() {
        let mut no_los = ghost("no_los", &[Emf], &[]);
        no_los.has_los = false;
        let los = ghost("los", &[Emf], &[]);
        let mut state = FilterState::new();

        state.toggle_los();
        let ids: Vec<_> = state.possible_ghosts([&no_los, &los]).into_iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["los"]);

        state.toggle_los();
        let ids: Vec<_> = state.possible_ghosts([&no_los, &los]).into_iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["no_los"]);
    }

    #[test]
    fn test_reset_makes_every_ghost_possible() {
        let ghosts = vec![
            mimic(),
            ghost("a", &[Emf, SpiritBox, GhostWriting], &[]),
            ghost("b", &[FreezingTemps, DotsProjector, Fingerprints], &[]),
        ];
        let mut state = FilterState::new();
        state.toggle_evidence(Emf);
        state.toggle_evidence(GhostOrb);
        state.toggle_evidence(GhostOrb);
        state.toggle_los();
        state.set_hunt_threshold(Some(90.0), None);
        state.set_speed_range(Some(5.0), None);
        state.select_ghost(Some("a".to_string()));

        state.reset_filters();
        assert!(state.selection.is_neutral());
        assert_eq!(state.selected_ghost.as_deref(), Some("a"));
        for mode in DifficultyMode::ALL {
            state.set_mode(mode);
            assert_eq!(state.possible_ghosts(&ghosts).len(), ghosts.len());
        }
    }

    #[test]
    fn test_possible_ghosts_sorted_by_name() {
        let mut b = ghost("b", &[Emf], &[]);
        b.name = "Banshee".to_string();
        let mut a = ghost("a", &[Emf], &[]);
        a.name = "Yurei".to_string();
        let names: Vec<_> = possible_ghosts([&a, &b], DifficultyMode::Professional, &FilterSelection::default())
            .into_iter()
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(names, vec!["Banshee", "Yurei"]);
    }

    #[test]
    fn test_inclusion_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&InclusionState::Include).unwrap(), "\"include\"");
    }
}
