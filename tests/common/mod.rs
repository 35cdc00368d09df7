#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flagwar::config::WarConfig;
use flagwar::error::{PersistError, ServiceError};
use flagwar::model::{
    BlockPos, Coord, Resident, ResidentId, Territory, TerritoryId, TerritoryMap, Town, TownId,
};
use flagwar::services::{
    AttackAttempt, ContestDisplay, SavedWar, Verdict, WarHooks, WarPersistence, WorldSurface,
};
use flagwar::war::{AttackOutcome, Contest, ContestId, FlagWar, TickStatus};
use uuid::Uuid;

pub const ATTACKERS: TownId = TownId(1);
pub const DEFENDERS: TownId = TownId(2);
pub const ALLIES: TownId = TownId(3);

pub const ATTACKER_HOME: TerritoryId = TerritoryId(1);
pub const FRONTIER: TerritoryId = TerritoryId(2);
pub const DEFENDER_HOME: TerritoryId = TerritoryId(3);

pub const ALICE: ResidentId = ResidentId(Uuid::from_u128(0xa1));
pub const BOB: ResidentId = ResidentId(Uuid::from_u128(0xb0));
pub const CAROL: ResidentId = ResidentId(Uuid::from_u128(0xc0));
pub const DRIFTER: ResidentId = ResidentId(Uuid::from_u128(0xd0));

/// A one-row front line along z = 0, wilderness everywhere else:
///
/// ```text
/// x:  0  1 | 2  3* 4 | 5  6*
///   attacker  frontier   defender home
/// ```
///
/// `*` marks a core cell. Attackers are at war with defenders and allied
/// with the third town, which owns nothing.
pub fn front_map() -> TerritoryMap {
    let mut map = TerritoryMap::new();

    let mut attackers = Town::new(ATTACKERS, "Attackers");
    attackers.home = Some(ATTACKER_HOME);
    map.insert_town(attackers);

    let mut defenders = Town::new(DEFENDERS, "Defenders");
    defenders.home = Some(DEFENDER_HOME);
    map.insert_town(defenders);

    map.insert_town(Town::new(ALLIES, "Allies"));
    map.declare_war(ATTACKERS, DEFENDERS);
    map.form_alliance(ATTACKERS, ALLIES);

    map.insert_territory(
        Territory::new(ATTACKER_HOME, Coord::new(0, 0), [Coord::new(1, 0)]).owned_by(ATTACKERS),
    );
    map.insert_territory(
        Territory::new(FRONTIER, Coord::new(3, 0), [Coord::new(2, 0), Coord::new(4, 0)])
            .owned_by(DEFENDERS),
    );
    map.insert_territory(
        Territory::new(DEFENDER_HOME, Coord::new(6, 0), [Coord::new(5, 0)]).owned_by(DEFENDERS),
    );
    map.recompute_adjacency();

    for (id, name, town) in [
        (ALICE, "alice", Some(ATTACKERS)),
        (BOB, "bob", Some(DEFENDERS)),
        (CAROL, "carol", Some(ALLIES)),
        (DRIFTER, "drifter", None),
    ] {
        map.insert_resident(Resident {
            id,
            name: name.into(),
            town,
        });
    }
    map
}

/// Settings for tests that drive ticks by hand: 100-tick contests in
/// 20-tick steps, with the background ticker parked far in the future.
pub fn manual_settings() -> WarConfig {
    WarConfig {
        chunk_attack_time: 100,
        tick_size: 20,
        tick_interval: Duration::from_secs(3600),
        save_interval: Duration::from_secs(3600),
        progress_tiers: 5,
        ..WarConfig::default()
    }
}

pub fn flag(x: i32, z: i32) -> BlockPos {
    BlockPos::new("world", x, 64, z)
}

pub fn at(x: i32) -> Coord {
    Coord::new(x, 0)
}

/// War over [`front_map`] with recording collaborators.
pub struct Harness {
    pub war: FlagWar,
    pub world: Arc<RecordingWorld>,
    pub display: Arc<RecordingDisplay>,
    pub hooks: Arc<RecordingHooks>,
    pub store: Arc<MemoryPersistence>,
}

impl Harness {
    pub fn new(settings: WarConfig) -> Self {
        Self::with_map(settings, front_map())
    }

    pub fn with_map(settings: WarConfig, map: TerritoryMap) -> Self {
        Self::build(settings, map, SavedWar::default())
    }

    /// Harness whose store starts out holding `seed`.
    pub fn seeded(settings: WarConfig, seed: SavedWar) -> Self {
        Self::build(settings, front_map(), seed)
    }

    fn build(settings: WarConfig, map: TerritoryMap, seed: SavedWar) -> Self {
        let world = Arc::new(RecordingWorld::default());
        let display = Arc::new(RecordingDisplay::default());
        let hooks = Arc::new(RecordingHooks::default());
        let store = Arc::new(MemoryPersistence::seeded(seed));
        let war = FlagWar::builder(settings, map)
            .world(world.clone())
            .display(display.clone())
            .hooks(hooks.clone())
            .persistence(store.clone())
            .build();
        Self {
            war,
            world,
            display,
            hooks,
            store,
        }
    }

    /// Starts an attack by `attacker` for `town` on `(x, 0)`.
    pub async fn attack(
        &self,
        attacker: ResidentId,
        town: TownId,
        x: i32,
    ) -> Result<Arc<Contest>, flagwar::error::AttackError> {
        self.war.begin_attack(attacker, town, at(x), flag(x, 0)).await
    }

    /// Ticks a contest until it stops, returning the number of ticks.
    pub async fn run_to_end(&self, contest: &Contest) -> usize {
        let mut ticks = 1;
        while self.war.attack_tick(contest).await == TickStatus::Running {
            ticks += 1;
            assert!(ticks < 10_000, "contest never finished");
        }
        ticks
    }
}

// ============================================================================
// Recording collaborators
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingWorld {
    pub placed: Mutex<Vec<BlockPos>>,
    pub removed: Mutex<Vec<BlockPos>>,
    pub broken: Mutex<HashSet<BlockPos>>,
    pub sky_blocked: AtomicBool,
    pub failing: AtomicBool,
}

impl RecordingWorld {
    pub fn removed_count(&self) -> usize {
        self.removed.lock().unwrap().len()
    }
}

impl WorldSurface for RecordingWorld {
    fn place_marker(&self, flag: &BlockPos, _town: TownId) -> Result<(), ServiceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::new("world", "marker placement refused"));
        }
        self.placed.lock().unwrap().push(flag.clone());
        Ok(())
    }

    fn remove_marker(&self, flag: &BlockPos) -> Result<(), ServiceError> {
        self.removed.lock().unwrap().push(flag.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::new("world", "marker removal refused"));
        }
        Ok(())
    }

    fn marker_intact(&self, flag: &BlockPos) -> bool {
        !self.broken.lock().unwrap().contains(flag)
    }

    fn has_unobstructed_sky_above(&self, _flag: &BlockPos) -> bool {
        !self.sky_blocked.load(Ordering::SeqCst)
    }

    fn max_build_height(&self, _world: &str) -> i32 {
        320
    }
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub created: Mutex<Vec<ContestId>>,
    pub tiers: Mutex<Vec<usize>>,
    pub progress: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<ContestId>>,
    pub failing: AtomicBool,
}

impl RecordingDisplay {
    fn result(&self) -> Result<(), ServiceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ServiceError::new("display", "boss bar unavailable"))
        } else {
            Ok(())
        }
    }
}

impl ContestDisplay for RecordingDisplay {
    fn on_contest_created(&self, contest: &Contest, _town: &Town) -> Result<(), ServiceError> {
        self.created.lock().unwrap().push(contest.id());
        self.result()
    }

    fn on_tier_changed(&self, _contest: &Contest, tier: usize) -> Result<(), ServiceError> {
        self.tiers.lock().unwrap().push(tier);
        self.result()
    }

    fn on_progress(&self, _contest: &Contest, time_remaining: &str) -> Result<(), ServiceError> {
        self.progress.lock().unwrap().push(time_remaining.to_string());
        self.result()
    }

    fn on_contest_removed(&self, contest: &Contest) -> Result<(), ServiceError> {
        self.removed.lock().unwrap().push(contest.id());
        self.result()
    }
}

#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub deny_start: AtomicBool,
    pub deny_finish: AtomicBool,
    pub attempts: Mutex<Vec<(ResidentId, Coord, Option<TownId>)>>,
    pub cancelled: Mutex<Vec<ContestId>>,
    pub finished: Mutex<Vec<AttackOutcome>>,
}

impl RecordingHooks {
    pub fn last_outcome(&self) -> Option<AttackOutcome> {
        self.finished.lock().unwrap().last().copied()
    }

    pub fn cancelled_ids(&self) -> Vec<ContestId> {
        self.cancelled.lock().unwrap().clone()
    }
}

impl WarHooks for RecordingHooks {
    fn on_attack_starting(&self, attempt: &AttackAttempt<'_>) -> Verdict {
        self.attempts
            .lock()
            .unwrap()
            .push((attempt.attacker, attempt.coord, attempt.defender));
        if self.deny_start.load(Ordering::SeqCst) {
            Verdict::Deny
        } else {
            Verdict::Allow
        }
    }

    fn on_attack_cancelled(&self, contest: &Contest) {
        self.cancelled.lock().unwrap().push(contest.id());
    }

    fn on_attack_finishing(&self, _contest: &Contest) -> Verdict {
        if self.deny_finish.load(Ordering::SeqCst) {
            Verdict::Deny
        } else {
            Verdict::Allow
        }
    }

    fn on_attack_finished(&self, _contest: &Contest, outcome: &AttackOutcome) {
        self.finished.lock().unwrap().push(*outcome);
    }
}

/// Keeps every snapshot in memory; `load_all` returns the seeded state.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    pub seed: Mutex<SavedWar>,
    pub saves: Mutex<Vec<(SavedWar, bool)>>,
}

impl MemoryPersistence {
    pub fn seeded(seed: SavedWar) -> Self {
        Self {
            seed: Mutex::new(seed),
            saves: Mutex::default(),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_save(&self) -> Option<(SavedWar, bool)> {
        self.saves.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl WarPersistence for MemoryPersistence {
    async fn load_all(&self) -> Result<SavedWar, PersistError> {
        Ok(self.seed.lock().unwrap().clone())
    }

    async fn save(&self, snapshot: &SavedWar, force_sync: bool) -> Result<(), PersistError> {
        self.saves.lock().unwrap().push((snapshot.clone(), force_sync));
        Ok(())
    }
}
