mod common;

use std::time::Duration;

use common::*;
use flagwar::config::WarConfig;
use flagwar::war::{AttackOutcome, TimerState};

fn ticking() -> WarConfig {
    WarConfig {
        tick_interval: Duration::from_secs(1),
        ..manual_settings()
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ============================================================================
// Tickers
// ============================================================================

#[tokio::test(start_paused = true)]
async fn contest_finishes_after_five_firings() {
    let h = Harness::new(ticking());
    let contest = h.attack(ALICE, ATTACKERS, 2).await.unwrap();

    sleep_ms(4_500).await;
    assert_eq!(contest.progress(), 80);
    assert!(contest.is_active());
    assert_eq!(h.war.active_count().await, 1);

    sleep_ms(1_000).await;
    assert_eq!(contest.state(), TimerState::Finished);
    assert_eq!(h.war.active_count().await, 0);
    assert!(h.war.contest_at(at(2)).await.is_none());
    assert!(matches!(
        h.hooks.last_outcome(),
        Some(AttackOutcome::CellCaptured { by: ATTACKERS, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn first_firing_waits_one_interval() {
    let h = Harness::new(ticking());
    let contest = h.attack(ALICE, ATTACKERS, 2).await.unwrap();

    sleep_ms(900).await;
    assert_eq!(contest.progress(), 0);
    sleep_ms(200).await;
    assert_eq!(contest.progress(), 20);
}

#[tokio::test(start_paused = true)]
async fn cancelled_contest_stops_ticking() {
    let h = Harness::new(ticking());
    let contest = h.attack(ALICE, ATTACKERS, 2).await.unwrap();

    sleep_ms(2_500).await;
    assert_eq!(contest.progress(), 40);
    assert!(h.war.cancel_attack(&contest).await);

    sleep_ms(10_000).await;
    assert_eq!(contest.progress(), 40);
    assert_eq!(contest.state(), TimerState::Cancelled);
    assert!(h.hooks.finished.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_war_stops_its_tickers() {
    let h = Harness::new(ticking());
    let contest = h.attack(ALICE, ATTACKERS, 2).await.unwrap();
    drop(h);

    sleep_ms(10_000).await;
    assert_eq!(contest.progress(), 0);
    assert!(contest.is_active());
}

#[tokio::test(start_paused = true)]
async fn contests_tick_independently() {
    let h = Harness::new(WarConfig {
        max_player_chunk_attacks: 2,
        ..ticking()
    });
    let early = h.attack(ALICE, ATTACKERS, 2).await.unwrap();
    sleep_ms(2_500).await;
    let late = h.attack(ALICE, ATTACKERS, 4).await.unwrap();

    sleep_ms(2_800).await;
    assert_eq!(early.state(), TimerState::Finished);
    assert_eq!(late.progress(), 40);
    assert_eq!(h.war.active_count().await, 1);
}

// ============================================================================
// Save loop and teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn save_loop_writes_only_dirty_state() {
    let h = Harness::new(WarConfig {
        save_interval: Duration::from_secs(1),
        ..manual_settings()
    });
    let save_loop = h.war.spawn_save_loop();

    sleep_ms(1_500).await;
    assert_eq!(h.store.save_count(), 0);

    let contest = h.attack(ALICE, ATTACKERS, 2).await.unwrap();
    sleep_ms(1_000).await;
    let (saved, forced) = h.store.last_save().unwrap();
    assert_eq!(h.store.save_count(), 1);
    assert!(!forced);
    assert_eq!(saved.attacks.len(), 1);
    assert_eq!(saved.attacks[0].coord, at(2));
    assert!(!h.war.is_dirty());

    sleep_ms(3_000).await;
    assert_eq!(h.store.save_count(), 1);

    h.war.cancel_attack(&contest).await;
    sleep_ms(1_000).await;
    assert_eq!(h.store.save_count(), 2);
    assert!(h.store.last_save().unwrap().0.attacks.is_empty());

    h.war.shutdown().await.unwrap();
    save_loop.await.unwrap();
    let (_, forced) = h.store.last_save().unwrap();
    assert!(forced);
}

#[tokio::test(start_paused = true)]
async fn shutdown_persists_then_stops_everything() {
    let h = Harness::new(WarConfig {
        max_player_chunk_attacks: 2,
        ..ticking()
    });
    let captured = h.attack(ALICE, ATTACKERS, 4).await.unwrap();
    h.war.finish_attack(&captured).await.unwrap();
    let running = h.attack(ALICE, ATTACKERS, 2).await.unwrap();
    sleep_ms(1_500).await;

    h.war.shutdown().await.unwrap();

    let (saved, forced) = h.store.last_save().unwrap();
    assert!(forced);
    assert_eq!(saved.attacks.len(), 1);
    assert_eq!(saved.attacks[0].progress, 20);
    assert_eq!(saved.occupied.get(&ATTACKERS), Some(&vec![at(4)]));

    assert_eq!(h.war.active_count().await, 0);
    assert_eq!(running.state(), TimerState::Cancelled);
    assert!(!h.war.is_dirty());

    // occupation stays on the map
    assert_eq!(
        h.war.with_map(|map| map.cell(at(4)).unwrap().occupier).await,
        Some(ATTACKERS)
    );

    sleep_ms(10_000).await;
    assert_eq!(running.progress(), 20);
}

#[tokio::test]
async fn disable_clears_all_war_state() {
    let h = Harness::new(WarConfig {
        max_player_chunk_attacks: 2,
        ..manual_settings()
    });
    let captured = h.attack(ALICE, ATTACKERS, 4).await.unwrap();
    h.war.finish_attack(&captured).await.unwrap();
    let running = h.attack(ALICE, ATTACKERS, 2).await.unwrap();

    h.war.disable().await.unwrap();

    assert_eq!(running.state(), TimerState::Cancelled);
    assert_eq!(h.hooks.cancelled_ids(), vec![running.id()]);
    assert_eq!(h.war.active_count().await, 0);
    assert!(h.war.occupied_cells().await.is_empty());
    let clean = h
        .war
        .with_map(|map| {
            map.cells()
                .all(|cell| cell.occupier.is_none() && cell.attack.is_none())
        })
        .await;
    assert!(clean);

    let (saved, forced) = h.store.last_save().unwrap();
    assert!(forced);
    assert!(saved.is_empty());
}
