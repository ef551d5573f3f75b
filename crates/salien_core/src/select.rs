//! Target selection policy.
//!
//! Pure functions over planet snapshots so every policy decision is
//! deterministic and testable without a coordinator or a network. Ties are
//! broken by scan order: planet list order, then zone order within a
//! planet.

use std::fmt;

use salien_proto::{Difficulty, Planet, Zone, ZONE_KIND_BOSS};

#[derive(Debug, Clone, PartialEq)]
pub struct SelectPolicy {
    /// Zones need engagement history; capture progress must exceed this.
    pub min_progress: f64,
    /// Zones at or past this progress are about to flip and not worth
    /// starting on. Boss zones bypass this filter entirely.
    pub abandon_threshold: f64,
}

impl Default for SelectPolicy {
    fn default() -> Self {
        Self {
            min_progress: 0.0,
            abandon_threshold: 0.90,
        }
    }
}

/// Identifying slice of the planet a target lives on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanetRef {
    pub id: String,
    pub name: String,
}

impl PlanetRef {
    fn of(planet: &Planet) -> Self {
        Self {
            id: planet.id.clone(),
            name: planet.state.name.clone(),
        }
    }
}

/// The one place every worker attacks. Immutable once published; a change
/// of mind is a new `Target`, never an edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Ordinary { planet: PlanetRef, zone: Zone },
    Boss { planet: PlanetRef, zone: Zone },
}

impl Target {
    pub fn planet(&self) -> &PlanetRef {
        match self {
            Target::Ordinary { planet, .. } | Target::Boss { planet, .. } => planet,
        }
    }

    pub fn zone(&self) -> &Zone {
        match self {
            Target::Ordinary { zone, .. } | Target::Boss { zone, .. } => zone,
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self, Target::Boss { .. })
    }

    pub fn key(&self) -> TargetKey {
        TargetKey {
            planet_id: self.planet().id.clone(),
            zone_position: self.zone().zone_position,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_boss() { "boss" } else { "zone" };
        write!(
            f,
            "planet {} ({}), {} {}",
            self.planet().id,
            self.planet().name,
            kind,
            self.zone().zone_position
        )
    }
}

/// Identity of a target for change detection, compared by ids rather than
/// by snapshot contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetKey {
    pub planet_id: String,
    pub zone_position: u32,
}

/// Picks the best zone across all planet snapshots.
///
/// An active boss anywhere preempts everything. Otherwise tiers are walked
/// hardest first and the first zone inside the progress window wins.
/// Returns `None` when nothing qualifies; the caller keeps whatever target
/// it already had.
pub fn select_target(planets: &[Planet], policy: &SelectPolicy) -> Option<Target> {
    for planet in planets {
        for zone in &planet.zones {
            if zone.boss_active {
                return Some(Target::Boss {
                    planet: PlanetRef::of(planet),
                    zone: zone.clone(),
                });
            }
        }
    }

    for difficulty in Difficulty::DESCENDING {
        for planet in planets {
            for zone in &planet.zones {
                if ordinary_candidate(zone, difficulty, policy) {
                    return Some(Target::Ordinary {
                        planet: PlanetRef::of(planet),
                        zone: zone.clone(),
                    });
                }
            }
        }
        tracing::info!(difficulty = %difficulty, "no eligible zone at this difficulty");
    }
    None
}

fn ordinary_candidate(zone: &Zone, difficulty: Difficulty, policy: &SelectPolicy) -> bool {
    if zone.captured || zone.kind == ZONE_KIND_BOSS {
        return false;
    }
    if Difficulty::from_raw(zone.difficulty) != Some(difficulty) {
        return false;
    }
    zone.capture_progress > policy.min_progress && zone.capture_progress < policy.abandon_threshold
}

/// Revalidation check against a fresh snapshot of the target's own planet.
/// An ordinary target holds as long as its zone is still uncaptured; a boss
/// target holds as long as the encounter is still active.
pub fn target_still_valid(target: &Target, planet: &Planet) -> bool {
    let Some(zone) = planet
        .zones
        .iter()
        .find(|zone| zone.zone_position == target.zone().zone_position)
    else {
        return false;
    };
    match target {
        Target::Boss { .. } => zone.boss_active,
        Target::Ordinary { .. } => !zone.captured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{planet, zone};

    #[test]
    fn boss_preempts_ordinary_selection() {
        let planets = vec![
            planet("1", "alpha", &[zone(0, 3, 0.5, false)]),
            planet("2", "beta", &[zone(1, 1, 0.1, false), zone(2, 2, 0.3, true)]),
        ];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");
        assert!(target.is_boss());
        assert_eq!(target.planet().id, "2");
        assert_eq!(target.zone().zone_position, 2);
    }

    #[test]
    fn hardest_tier_wins_within_progress_window() {
        let planets = vec![planet(
            "1",
            "alpha",
            &[zone(0, 1, 0.2, false), zone(1, 3, 0.4, false), zone(2, 2, 0.3, false)],
        )];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");
        assert_eq!(target.zone().zone_position, 1);
        assert!(!target.is_boss());
    }

    #[test]
    fn nearly_captured_and_untouched_zones_are_skipped() {
        let planets = vec![planet(
            "1",
            "alpha",
            &[
                zone(0, 3, 0.95, false), // past the abandonment threshold
                zone(1, 3, 0.0, false),  // no engagement history
                zone(2, 3, 0.90, false), // exactly at the threshold, excluded
                zone(3, 2, 0.5, false),
            ],
        )];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");
        assert_eq!(target.zone().zone_position, 3);
    }

    #[test]
    fn captured_zones_never_selected() {
        let mut captured = zone(0, 3, 0.5, false);
        captured.captured = true;
        let planets = vec![planet("1", "alpha", &[captured, zone(1, 1, 0.5, false)])];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");
        assert_eq!(target.zone().zone_position, 1);
    }

    #[test]
    fn inactive_boss_zone_is_not_an_ordinary_candidate() {
        let mut dormant_boss = zone(0, 3, 0.5, false);
        dormant_boss.kind = ZONE_KIND_BOSS;
        let planets = vec![planet("1", "alpha", &[dormant_boss, zone(1, 1, 0.5, false)])];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");
        assert_eq!(target.zone().zone_position, 1);
    }

    #[test]
    fn scan_order_breaks_ties() {
        let planets = vec![
            planet("1", "alpha", &[zone(5, 2, 0.4, false)]),
            planet("2", "beta", &[zone(0, 2, 0.1, false)]),
        ];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");
        assert_eq!(target.planet().id, "1");
        assert_eq!(target.zone().zone_position, 5);
    }

    #[test]
    fn selection_is_deterministic_on_identical_snapshots() {
        let planets = vec![
            planet("1", "alpha", &[zone(0, 2, 0.4, false), zone(1, 2, 0.4, false)]),
            planet("2", "beta", &[zone(0, 3, 0.95, false), zone(3, 2, 0.4, false)]),
        ];
        let first = select_target(&planets, &SelectPolicy::default());
        for _ in 0..10 {
            assert_eq!(select_target(&planets, &SelectPolicy::default()), first);
        }
    }

    #[test]
    fn empty_selection_returns_none() {
        let planets = vec![planet("1", "alpha", &[zone(0, 3, 0.95, false)])];
        assert_eq!(select_target(&planets, &SelectPolicy::default()), None);
        assert_eq!(select_target(&[], &SelectPolicy::default()), None);
    }

    #[test]
    fn unknown_difficulty_tier_is_ignored() {
        let mut odd = zone(0, 2, 0.4, false);
        odd.difficulty = 7;
        let planets = vec![planet("1", "alpha", &[odd, zone(1, 1, 0.4, false)])];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");
        assert_eq!(target.zone().zone_position, 1);
    }

    #[test]
    fn ordinary_target_valid_until_captured() {
        let planets = vec![planet("1", "alpha", &[zone(0, 2, 0.4, false)])];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");

        let still_open = planet("1", "alpha", &[zone(0, 2, 0.97, false)]);
        assert!(target_still_valid(&target, &still_open));

        let mut flipped_zone = zone(0, 2, 1.0, false);
        flipped_zone.captured = true;
        let flipped = planet("1", "alpha", &[flipped_zone]);
        assert!(!target_still_valid(&target, &flipped));

        let vanished = planet("1", "alpha", &[zone(9, 2, 0.4, false)]);
        assert!(!target_still_valid(&target, &vanished));
    }

    #[test]
    fn boss_target_valid_only_while_active() {
        let planets = vec![planet("1", "alpha", &[zone(4, 3, 0.0, true)])];
        let target = select_target(&planets, &SelectPolicy::default()).expect("target");
        assert!(target.is_boss());

        assert!(target_still_valid(
            &target,
            &planet("1", "alpha", &[zone(4, 3, 0.0, true)])
        ));
        assert!(!target_still_valid(
            &target,
            &planet("1", "alpha", &[zone(4, 3, 0.0, false)])
        ));
    }

    #[test]
    fn target_key_compares_by_ids() {
        let a = select_target(
            &[planet("1", "alpha", &[zone(0, 2, 0.4, false)])],
            &SelectPolicy::default(),
        )
        .expect("target");
        let b = select_target(
            &[planet("1", "alpha", &[zone(0, 2, 0.7, false)])],
            &SelectPolicy::default(),
        )
        .expect("target");
        // Different snapshots of the same zone share a key.
        assert_ne!(a, b);
        assert_eq!(a.key(), b.key());
    }
}
