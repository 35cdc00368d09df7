mod common;

use std::sync::atomic::Ordering;

use common::*;
use flagwar::config::WarConfig;
use flagwar::war::{AttackOutcome, TimerState};

fn roomy() -> WarConfig {
    WarConfig {
        max_player_chunk_attacks: 3,
        ..manual_settings()
    }
}

// ============================================================================
// Plain cells
// ============================================================================

#[tokio::test]
async fn finishing_on_enemy_cell_captures_it() {
    let h = Harness::new(manual_settings());
    let contest = h.attack(ALICE, ATTACKERS, 2).await.unwrap();

    h.run_to_end(&contest).await;

    assert_eq!(
        h.hooks.last_outcome(),
        Some(AttackOutcome::CellCaptured {
            coord: at(2),
            from: Some(DEFENDERS),
            by: ATTACKERS,
        })
    );
    let (cell_occupier, owner) = h
        .war
        .with_map(|map| {
            (
                map.cell(at(2)).unwrap().occupier,
                map.territory(FRONTIER).unwrap().town,
            )
        })
        .await;
    assert_eq!(cell_occupier, Some(ATTACKERS));
    assert_eq!(owner, Some(DEFENDERS));
    assert_eq!(h.war.occupied_cells().await, vec![at(2)]);
}

#[tokio::test]
async fn owner_retaking_a_held_cell_defends_it() {
    let h = Harness::new(manual_settings());
    let taken = h.attack(ALICE, ATTACKERS, 2).await.unwrap();
    h.run_to_end(&taken).await;

    let retake = h.attack(BOB, DEFENDERS, 2).await.unwrap();
    let outcome = h.war.finish_attack(&retake).await.unwrap();

    assert_eq!(
        outcome,
        AttackOutcome::CellDefended {
            coord: at(2),
            against: Some(ATTACKERS),
        }
    );
    assert!(h.war.with_map(|map| map.cell(at(2)).unwrap().occupier.is_none()).await);
    assert!(h.war.occupied_cells().await.is_empty());
}

#[tokio::test]
async fn owner_retaking_a_cell_in_occupied_territory_liberates_it() {
    let h = Harness::new(manual_settings());
    h.war
        .with_map_mut(|map| map.capture_territory(FRONTIER, ATTACKERS))
        .await;

    let contest = h.attack(BOB, DEFENDERS, 2).await.unwrap();
    let outcome = h.war.finish_attack(&contest).await.unwrap();

    assert_eq!(
        outcome,
        AttackOutcome::CellLiberated {
            coord: at(2),
            from: ATTACKERS,
        }
    );
    assert_eq!(
        h.war.with_map(|map| map.cell(at(2)).unwrap().occupier).await,
        Some(DEFENDERS)
    );
    assert_eq!(h.war.occupied_cells().await, vec![at(2)]);
}

#[tokio::test]
async fn occupier_clearing_an_enemy_cell_defends_it() {
    let h = Harness::new(manual_settings());
    h.war
        .with_map_mut(|map| {
            map.capture_territory(FRONTIER, ATTACKERS);
            map.cell_mut(at(2)).unwrap().occupier = Some(DEFENDERS);
        })
        .await;

    let contest = h.attack(ALICE, ATTACKERS, 2).await.unwrap();
    let outcome = h.war.finish_attack(&contest).await.unwrap();

    assert_eq!(
        outcome,
        AttackOutcome::CellDefended {
            coord: at(2),
            against: Some(DEFENDERS),
        }
    );
    assert!(h.war.with_map(|map| map.cell(at(2)).unwrap().occupier.is_none()).await);
}

// ============================================================================
// Core cells
// ============================================================================

#[tokio::test]
async fn core_capture_cascades_over_the_territory() {
    let h = Harness::new(roomy());

    let edge = h.attack(ALICE, ATTACKERS, 4).await.unwrap();
    h.war.finish_attack(&edge).await.unwrap();
    assert_eq!(h.war.occupied_cells().await, vec![at(4)]);

    let sibling = h.attack(ALICE, ATTACKERS, 2).await.unwrap();
    let core = h.attack(ALICE, ATTACKERS, 3).await.unwrap();
    h.war.attack_tick(&sibling).await;

    let outcome = h.war.finish_attack(&core).await.unwrap();

    assert_eq!(
        outcome,
        AttackOutcome::TerritoryCaptured {
            territory: FRONTIER,
            from: Some(DEFENDERS),
            by: ATTACKERS,
        }
    );
    assert!(outcome.changed_hands());

    // the sibling contest went down with the territory
    assert_eq!(sibling.state(), TimerState::Cancelled);
    assert_eq!(h.hooks.cancelled_ids(), vec![sibling.id()]);
    assert_eq!(h.war.active_count().await, 0);
    assert!(h.war.contests_by(ALICE).await.is_empty());

    let (territory, stale) = h
        .war
        .with_map(|map| {
            let territory = map.territory(FRONTIER).unwrap().clone();
            let stale = territory
                .cells
                .iter()
                .filter_map(|c| map.cell(*c))
                .any(|cell| cell.occupier.is_some() || cell.attack.is_some());
            (territory, stale)
        })
        .await;
    assert_eq!(territory.occupier, Some(ATTACKERS));
    assert_eq!(territory.town, Some(DEFENDERS));
    assert!(!stale, "no cell may keep war state after a core capture");
    assert!(h.war.occupied_cells().await.is_empty());

    // a late tick on the cancelled sibling is harmless
    h.war.attack_tick(&sibling).await;
    assert_eq!(h.war.with_map(|map| map.controller(FRONTIER)).await, Some(ATTACKERS));
}

#[tokio::test]
async fn owner_retaking_the_core_liberates_the_territory() {
    let h = Harness::new(manual_settings());
    h.war
        .with_map_mut(|map| map.capture_territory(FRONTIER, ATTACKERS))
        .await;

    let contest = h.attack(BOB, DEFENDERS, 3).await.unwrap();
    let outcome = h.war.finish_attack(&contest).await.unwrap();

    assert_eq!(
        outcome,
        AttackOutcome::TerritoryLiberated {
            territory: FRONTIER,
            from: Some(ATTACKERS),
        }
    );
    let territory = h.war.with_map(|map| map.territory(FRONTIER).unwrap().clone()).await;
    assert!(territory.occupier.is_none());
    assert_eq!(territory.town, Some(DEFENDERS));
}

#[tokio::test]
async fn ally_of_the_owner_liberates_instead_of_capturing() {
    let h = Harness::new(manual_settings());
    h.war
        .with_map_mut(|map| {
            map.declare_war(ALLIES, ATTACKERS);
            map.form_alliance(ALLIES, DEFENDERS);
            map.capture_territory(FRONTIER, ATTACKERS);
        })
        .await;

    let contest = h.attack(CAROL, ALLIES, 3).await.unwrap();
    let outcome = h.war.finish_attack(&contest).await.unwrap();

    assert!(matches!(outcome, AttackOutcome::TerritoryLiberated { .. }));
    assert_eq!(h.war.with_map(|map| map.controller(FRONTIER)).await, Some(DEFENDERS));
}

#[tokio::test]
async fn nation_mate_of_the_owner_liberates() {
    use flagwar::model::{Nation, NationId};

    let h = Harness::new(manual_settings());
    h.war
        .with_map_mut(|map| {
            map.insert_nation(Nation {
                id: NationId(1),
                name: "League".into(),
            });
            map.town_mut(ALLIES).unwrap().nation = Some(NationId(1));
            map.town_mut(DEFENDERS).unwrap().nation = Some(NationId(1));
            map.declare_war(ALLIES, ATTACKERS);
            map.capture_territory(FRONTIER, ATTACKERS);
        })
        .await;

    let contest = h.attack(CAROL, ALLIES, 3).await.unwrap();
    let outcome = h.war.finish_attack(&contest).await.unwrap();

    assert_eq!(
        outcome,
        AttackOutcome::TerritoryLiberated {
            territory: FRONTIER,
            from: Some(ATTACKERS),
        }
    );
}

// ============================================================================
// Vetoes
// ============================================================================

#[tokio::test]
async fn finish_veto_leaves_ownership_alone() {
    let h = Harness::new(manual_settings());
    h.hooks.deny_finish.store(true, Ordering::SeqCst);

    let contest = h.attack(ALICE, ATTACKERS, 3).await.unwrap();
    h.run_to_end(&contest).await;

    assert_eq!(
        h.hooks.last_outcome(),
        Some(AttackOutcome::Vetoed { coord: at(3) })
    );
    assert_eq!(h.war.active_count().await, 0);
    assert_eq!(h.war.with_map(|map| map.controller(FRONTIER)).await, Some(DEFENDERS));
    assert!(h.war.occupied_cells().await.is_empty());
    assert_eq!(h.world.removed_count(), 1);
}

#[tokio::test]
async fn finishing_twice_resolves_once() {
    let h = Harness::new(manual_settings());
    let contest = h.attack(ALICE, ATTACKERS, 2).await.unwrap();

    assert!(h.war.finish_attack(&contest).await.is_some());
    assert!(h.war.finish_attack(&contest).await.is_none());
    assert_eq!(h.hooks.finished.lock().unwrap().len(), 1);
    // a forced finish does not move the clock
    assert_eq!(contest.state(), TimerState::Finished);
    assert_eq!(contest.progress(), 0);
}
