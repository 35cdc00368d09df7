//! Contest registry and orchestration.
//!
//! [`FlagWar`] owns the map and every contest registry behind one tokio
//! mutex. Validation, creation, cancellation and outcome resolution all
//! run inside that critical section; tickers only touch their contest's
//! atomics until they need to finish it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::contest::{Contest, ContestId, FlagSummary, SavedContest};
use super::outcome::AttackOutcome;
use super::predicates::{
    chunk_already_captured, chunk_is_at_edge, chunk_is_enemy, is_border_territory,
};
use super::scheduler;
use super::timer::{Advance, ContestTimer, TimerState, format_time_remaining};
use crate::config::WarConfig;
use crate::error::{AttackError, PersistError, ServiceError};
use crate::model::{
    ActiveAttack, BlockPos, Coord, ResidentId, Territory, TerritoryMap, Town, TownId,
};
use crate::observability::metrics;
use crate::services::{
    AllowAll, AttackAttempt, ContestDisplay, NoDisplay, NoPersistence, OpenSky, SavedWar,
    WarHooks, WarPersistence, WorldSurface,
};

/// Whether a ticker should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// The contest is still active
    Running,
    /// The contest finished, was cancelled, or was never active
    Stopped,
}

/// Counts of what [`FlagWar::restore`] brought back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Occupied cells restored
    pub occupied_cells: usize,
    /// Contests resumed
    pub contests: usize,
}

// ============================================================================
// State
// ============================================================================

/// Everything guarded by the war lock.
struct WarState {
    map: TerritoryMap,
    by_cell: HashMap<Coord, Arc<Contest>>,
    by_attacker: HashMap<ResidentId, Vec<Arc<Contest>>>,
    by_marker: HashMap<BlockPos, Coord>,
    occupied: HashSet<Coord>,
}

impl WarState {
    fn new(map: TerritoryMap) -> Self {
        Self {
            map,
            by_cell: HashMap::new(),
            by_attacker: HashMap::new(),
            by_marker: HashMap::new(),
            occupied: HashSet::new(),
        }
    }

    fn is_registered(&self, contest: &Contest) -> bool {
        self.by_cell
            .get(&contest.coord())
            .is_some_and(|current| current.id() == contest.id())
    }

    fn attacks_by(&self, attacker: ResidentId) -> usize {
        self.by_attacker.get(&attacker).map_or(0, Vec::len)
    }

    /// Drops a contest from every registry and clears its cell marker.
    fn unregister(&mut self, contest: &Contest) {
        let coord = contest.coord();
        let id = contest.id();

        self.by_cell.remove(&coord);

        let now_empty = self
            .by_attacker
            .get_mut(&contest.attacker())
            .is_some_and(|list| {
                list.retain(|c| c.id() != id);
                list.is_empty()
            });
        if now_empty {
            self.by_attacker.remove(&contest.attacker());
        }

        if self.by_marker.get(contest.flag()) == Some(&coord) {
            self.by_marker.remove(contest.flag());
        }

        if let Some(cell) = self.map.cell_mut(coord) {
            if cell.attack.is_some_and(|attack| attack.contest == id) {
                cell.attack = None;
            }
        }
    }

    /// Stops every contest and empties every registry.
    fn clear_registries(&mut self) {
        for contest in self.by_cell.values() {
            contest.timer().cancel();
            contest.stop_ticker();
        }
        for (coord, _) in self.by_cell.drain() {
            if let Some(cell) = self.map.cell_mut(coord) {
                cell.attack = None;
            }
        }
        self.by_attacker.clear();
        self.by_marker.clear();
        self.occupied.clear();
    }

    fn snapshot(&self) -> SavedWar {
        let mut occupied: BTreeMap<TownId, Vec<Coord>> = BTreeMap::new();
        for coord in &self.occupied {
            if let Some(town) = self.map.cell(*coord).and_then(|cell| cell.occupier) {
                occupied.entry(town).or_default().push(*coord);
            }
        }
        for coords in occupied.values_mut() {
            coords.sort_unstable();
        }

        let mut attacks: Vec<SavedContest> = self
            .by_cell
            .values()
            .map(|contest| SavedContest::from(contest.as_ref()))
            .collect();
        attacks.sort_by_key(|attack| attack.coord);

        SavedWar { occupied, attacks }
    }

    fn publish_gauges(&self) {
        metrics::set_active_contests(self.by_cell.len());
        metrics::set_occupied_cells(self.occupied.len());
    }
}

// ============================================================================
// Shared core
// ============================================================================

/// State shared between [`FlagWar`] handles and background tasks.
pub(crate) struct Shared {
    settings: WarConfig,
    state: Mutex<WarState>,
    world: Arc<dyn WorldSurface>,
    display: Arc<dyn ContestDisplay>,
    hooks: Arc<dyn WarHooks>,
    persistence: Arc<dyn WarPersistence>,
    /// Orders snapshot writes. Taken before `state`, never after.
    save_lock: Mutex<()>,
    dirty: AtomicBool,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

impl Shared {
    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Contest length in game ticks for a cell of `territory`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn attack_duration(&self, map: &TerritoryMap, territory: &Territory) -> u64 {
        let mut ticks = self.settings.chunk_attack_time as f64;
        if territory.borders_wilderness {
            ticks *= self.settings.attack_from_wilderness_multiplier;
        }
        if map.is_home(territory) {
            ticks *= self.settings.home_attack_multiplier;
        }
        ticks.round().max(0.0) as u64
    }

    /// Runs every check in order; the first failure wins.
    fn validate(
        &self,
        state: &WarState,
        attacker: ResidentId,
        town: TownId,
        coord: Coord,
        flag: &BlockPos,
    ) -> Result<(Town, u64), AttackError> {
        let settings = &self.settings;
        let map = &state.map;

        let (cell, territory) = map.cell_with_territory(coord).ok_or(AttackError::NotEnemy)?;
        let attacking = map.town(town).ok_or(AttackError::NotEnemy)?;
        let defender = territory
            .town
            .and_then(|id| map.town(id))
            .ok_or(AttackError::NotEnemy)?;

        if settings.use_blacklist && settings.is_blacklisted(&defender.name) {
            return Err(AttackError::TownBlacklisted);
        }

        if settings.use_whitelist
            && (!settings.is_whitelisted(&defender.name)
                || (settings.only_whitelist_can_claim && !settings.is_whitelisted(&attacking.name)))
        {
            return Err(AttackError::TownNotWhitelisted);
        }

        if cell.attack.is_some() || state.by_cell.contains_key(&coord) {
            return Err(AttackError::AlreadyUnderAttack);
        }

        if chunk_already_captured(cell, territory, attacking) {
            return Err(AttackError::AlreadyCaptured);
        }

        if !chunk_is_enemy(map, cell, territory, attacking) {
            return Err(AttackError::NotEnemy);
        }

        if settings.can_only_attack_borders && !is_border_territory(map, territory) {
            return Err(AttackError::NotBorderTerritory);
        }

        if !chunk_is_at_edge(map, cell, attacking) {
            return Err(AttackError::ChunkNotEdge);
        }

        if flag.y >= self.world.max_build_height(&flag.world) - 2 {
            return Err(AttackError::FlagTooHigh);
        }
        if !self.world.has_unobstructed_sky_above(flag) {
            return Err(AttackError::SkyBlocked);
        }

        if state.attacks_by(attacker) >= settings.max_player_chunk_attacks {
            return Err(AttackError::TooManyAttacks);
        }

        let attempt = AttackAttempt {
            attacker,
            town,
            coord,
            territory: territory.id,
            defender: territory.town,
            flag,
        };
        if self.hooks.on_attack_starting(&attempt).is_denied() {
            return Err(AttackError::AttackCustomCancel);
        }

        Ok((attacking.clone(), self.attack_duration(map, territory)))
    }

    /// Creates, registers and starts a contest. Performs no checks.
    #[allow(clippy::too_many_arguments)]
    fn register(
        self: &Arc<Self>,
        state: &mut WarState,
        attacker: ResidentId,
        town: &Town,
        coord: Coord,
        flag: BlockPos,
        total: u64,
        progress: u64,
    ) -> Arc<Contest> {
        let id = ContestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let timer = ContestTimer::new(total, progress, self.settings.progress_tiers);
        let contest = Arc::new(Contest::new(id, attacker, town.id, coord, flag, timer));

        if let Some(cell) = state.map.cell_mut(coord) {
            cell.attack = Some(ActiveAttack {
                contest: id,
                town: town.id,
            });
        }
        state.by_cell.insert(coord, Arc::clone(&contest));
        state
            .by_attacker
            .entry(attacker)
            .or_default()
            .push(Arc::clone(&contest));
        state.by_marker.insert(contest.flag().clone(), coord);

        report(
            self.display.on_contest_created(&contest, town),
            &contest,
            "display create",
        );

        scheduler::spawn_ticker(
            Arc::downgrade(self),
            Arc::clone(&contest),
            self.settings.tick_interval,
        );
        self.mark_dirty();
        state.publish_gauges();
        contest
    }

    fn begin(
        self: &Arc<Self>,
        state: &mut WarState,
        attacker: ResidentId,
        town: TownId,
        coord: Coord,
        flag: BlockPos,
    ) -> Result<Arc<Contest>, AttackError> {
        let (attacking, total) = self.validate(state, attacker, town, coord, &flag)?;

        if let Err(e) = self.world.place_marker(&flag, town) {
            warn!(%coord, error = %e, "flag marker placement failed");
        }
        let contest = self.register(state, attacker, &attacking, coord, flag, total, 0);
        info!(
            contest = %contest.id(),
            %attacker,
            town = %attacking.name,
            %coord,
            ticks = total,
            "attack started"
        );
        Ok(contest)
    }

    fn load_contest(
        self: &Arc<Self>,
        state: &mut WarState,
        saved: SavedContest,
    ) -> Option<Arc<Contest>> {
        let Some(resident) = state.map.resident(saved.attacker) else {
            warn!(attacker = %saved.attacker, coord = %saved.coord, "saved attack skipped: unknown resident");
            return None;
        };
        let Some(town) = resident.town.and_then(|id| state.map.town(id)).cloned() else {
            warn!(attacker = %saved.attacker, coord = %saved.coord, "saved attack skipped: attacker has no town");
            return None;
        };
        let Some(total) = state
            .map
            .cell_with_territory(saved.coord)
            .map(|(_, territory)| self.attack_duration(&state.map, territory))
        else {
            warn!(coord = %saved.coord, "saved attack skipped: unknown cell");
            return None;
        };
        if state.by_cell.contains_key(&saved.coord) {
            warn!(coord = %saved.coord, "saved attack skipped: cell already contested");
            return None;
        }
        if !self.world.marker_intact(&saved.flag) {
            warn!(coord = %saved.coord, flag = %saved.flag, "saved attack skipped: flag marker gone");
            if let Err(e) = self.world.remove_marker(&saved.flag) {
                debug!(error = %e, "leftover flag marker removal failed");
            }
            return None;
        }

        let contest = self.register(
            state,
            saved.attacker,
            &town,
            saved.coord,
            saved.flag,
            total,
            saved.progress,
        );
        debug!(contest = %contest.id(), coord = %contest.coord(), progress = contest.progress(), "attack resumed");
        Some(contest)
    }

    fn load_occupied_cell(state: &mut WarState, town: TownId, coord: Coord) -> bool {
        if state.map.town(town).is_none() {
            return false;
        }
        let Some(cell) = state.map.cell_mut(coord) else {
            return false;
        };
        cell.occupier = Some(town);
        state.occupied.insert(coord);
        true
    }

    /// Cancels a contest unless it already left the registry or its timer
    /// ran out and the finish is pending.
    fn cancel(&self, state: &mut WarState, contest: &Contest) -> bool {
        if contest.state() == TimerState::Finished {
            return false;
        }
        self.force_cancel(state, contest)
    }

    /// Cancels a registered contest whatever its timer says.
    fn force_cancel(&self, state: &mut WarState, contest: &Contest) -> bool {
        if !state.is_registered(contest) {
            return false;
        }

        contest.timer().cancel();
        contest.stop_ticker();
        state.unregister(contest);

        if let Err(e) = self.world.remove_marker(contest.flag()) {
            warn!(contest = %contest.id(), error = %e, "flag marker removal failed");
        }
        report(
            self.display.on_contest_removed(contest),
            contest,
            "display removal",
        );
        self.mark_dirty();
        self.hooks.on_attack_cancelled(contest);

        metrics::record_attack_cancelled();
        state.publish_gauges();
        info!(contest = %contest.id(), coord = %contest.coord(), progress = contest.progress(), "attack cancelled");
        true
    }

    fn finish(&self, state: &mut WarState, contest: &Contest) -> Option<AttackOutcome> {
        if !state.is_registered(contest) {
            return None;
        }

        contest.timer().finish();
        contest.stop_ticker();
        state.unregister(contest);

        if let Err(e) = self.world.remove_marker(contest.flag()) {
            warn!(contest = %contest.id(), error = %e, "flag marker removal failed");
        }
        report(
            self.display.on_contest_removed(contest),
            contest,
            "display removal",
        );
        self.mark_dirty();

        let outcome = if self.hooks.on_attack_finishing(contest).is_denied() {
            AttackOutcome::Vetoed {
                coord: contest.coord(),
            }
        } else {
            self.resolve(state, contest)
        };

        self.hooks.on_attack_finished(contest, &outcome);
        metrics::record_attack_finished(outcome.label());
        state.publish_gauges();
        info!(
            contest = %contest.id(),
            coord = %contest.coord(),
            outcome = outcome.label(),
            "attack finished"
        );
        Some(outcome)
    }

    /// Applies ownership changes for a completed contest.
    fn resolve(&self, state: &mut WarState, contest: &Contest) -> AttackOutcome {
        let coord = contest.coord();
        let by = contest.town();

        let Some((_, territory)) = state.map.cell_with_territory(coord) else {
            warn!(%coord, "finished contest on a cell that no longer exists");
            return AttackOutcome::Vetoed { coord };
        };
        let territory_id = territory.id;
        let owner = territory.town;
        let occupier = territory.occupier;

        if territory.core == coord {
            let cells: Vec<Coord> = territory.cells.iter().copied().collect();
            let liberating = liberates(&state.map, by, owner);

            for member in cells {
                if let Some(other) = state.by_cell.get(&member).cloned() {
                    self.force_cancel(state, &other);
                }
                if let Some(cell) = state.map.cell_mut(member) {
                    cell.clear_war_state();
                }
                state.occupied.remove(&member);
            }

            return if liberating {
                let from = state.map.release_territory(territory_id);
                AttackOutcome::TerritoryLiberated {
                    territory: territory_id,
                    from,
                }
            } else {
                state.map.capture_territory(territory_id, by);
                AttackOutcome::TerritoryCaptured {
                    territory: territory_id,
                    from: owner,
                    by,
                }
            };
        }

        let Some(cell) = state.map.cell_mut(coord) else {
            return AttackOutcome::Vetoed { coord };
        };
        let held_by = cell.occupier;

        if owner == Some(by) {
            if let Some(from) = occupier {
                cell.occupier = owner;
                state.occupied.insert(coord);
                AttackOutcome::CellLiberated { coord, from }
            } else {
                cell.occupier = None;
                state.occupied.remove(&coord);
                AttackOutcome::CellDefended {
                    coord,
                    against: held_by,
                }
            }
        } else if occupier == Some(by) && held_by.is_some() {
            cell.occupier = None;
            state.occupied.remove(&coord);
            AttackOutcome::CellDefended {
                coord,
                against: held_by,
            }
        } else {
            cell.occupier = Some(by);
            state.occupied.insert(coord);
            AttackOutcome::CellCaptured {
                coord,
                from: owner,
                by,
            }
        }
    }
}

/// Whether taking a core cell frees the territory instead of occupying it:
/// the attacker is the owner, shares its nation, or lists it as an ally.
fn liberates(map: &TerritoryMap, by: TownId, owner: Option<TownId>) -> bool {
    if owner == Some(by) {
        return true;
    }
    let Some(attacking) = map.town(by) else {
        return false;
    };
    let same_nation = attacking.nation.is_some() && attacking.nation == map.nation_of(owner);
    same_nation || attacking.is_ally(owner)
}

fn report(result: Result<(), ServiceError>, contest: &Contest, action: &str) {
    if let Err(e) = result {
        warn!(contest = %contest.id(), error = %e, "{action} failed");
    }
}

// ============================================================================
// Public handle
// ============================================================================

/// Handle to a running flag war. Cheap to clone.
#[derive(Clone)]
pub struct FlagWar {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for FlagWar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagWar")
            .field("settings", &self.shared.settings)
            .field("dirty", &self.shared.dirty.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl FlagWar {
    /// Starts building a war over `map`.
    #[must_use]
    pub fn builder(settings: WarConfig, map: TerritoryMap) -> FlagWarBuilder {
        FlagWarBuilder::new(settings, map)
    }

    pub(crate) const fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &WarConfig {
        &self.shared.settings
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Validates and starts an attack on `coord` with the flag at `flag`.
    ///
    /// # Errors
    ///
    /// Returns the first failed check, in this order: unowned target,
    /// blacklist, whitelist, cell already contested, already captured,
    /// not an enemy, not a border territory, not at an edge, flag height,
    /// sky access, attacker at the contest cap, hook veto.
    pub async fn begin_attack(
        &self,
        attacker: ResidentId,
        town: TownId,
        coord: Coord,
        flag: BlockPos,
    ) -> Result<Arc<Contest>, AttackError> {
        let result = {
            let mut state = self.shared.state.lock().await;
            self.shared.begin(&mut state, attacker, town, coord, flag)
        };
        match &result {
            Ok(_) => metrics::record_attack_started(),
            Err(e) => {
                debug!(%attacker, %coord, reason = e.code(), "attack rejected");
                metrics::record_attack_rejected(e.code());
            }
        }
        result
    }

    /// Rebuilds a saved contest without eligibility checks.
    ///
    /// Returns `None` (after logging why) when the attacker, their town or
    /// the cell cannot be resolved, when the cell is already contested, or
    /// when the flag marker is gone.
    pub async fn load_contest(&self, saved: SavedContest) -> Option<Arc<Contest>> {
        let mut state = self.shared.state.lock().await;
        self.shared.load_contest(&mut state, saved)
    }

    /// Marks a saved occupied cell. Unknown towns or cells are skipped.
    pub async fn load_occupied_cell(&self, town: TownId, coord: Coord) -> bool {
        let mut state = self.shared.state.lock().await;
        let loaded = Shared::load_occupied_cell(&mut state, town, coord);
        state.publish_gauges();
        loaded
    }

    /// Replaces all war state with what the persistence service holds.
    ///
    /// # Errors
    ///
    /// Returns an error if saved state cannot be read. Individual entries
    /// that cannot be restored are logged and skipped.
    pub async fn restore(&self) -> Result<RestoreSummary, PersistError> {
        let saved = self.shared.persistence.load_all().await?;

        let mut state = self.shared.state.lock().await;
        state.clear_registries();

        let mut summary = RestoreSummary::default();
        for (town, coords) in saved.occupied {
            for coord in coords {
                if Shared::load_occupied_cell(&mut state, town, coord) {
                    summary.occupied_cells += 1;
                }
            }
        }
        for attack in saved.attacks {
            if self.shared.load_contest(&mut state, attack).is_some() {
                summary.contests += 1;
            }
        }

        state.publish_gauges();
        info!(
            occupied = summary.occupied_cells,
            contests = summary.contests,
            "war state restored"
        );
        Ok(summary)
    }

    /// Cancels a running contest.
    ///
    /// Returns `false` if it already left the registry or its timer has
    /// run out.
    pub async fn cancel_attack(&self, contest: &Contest) -> bool {
        let mut state = self.shared.state.lock().await;
        self.shared.cancel(&mut state, contest)
    }

    /// Cancels the contest whose flag stands at `flag` (a broken flag).
    pub async fn cancel_attack_at(&self, flag: &BlockPos) -> bool {
        let mut state = self.shared.state.lock().await;
        let Some(contest) = state
            .by_marker
            .get(flag)
            .and_then(|coord| state.by_cell.get(coord))
            .cloned()
        else {
            return false;
        };
        self.shared.cancel(&mut state, &contest)
    }

    /// Completes a contest and applies its outcome.
    ///
    /// Returns `None` if the contest is no longer registered.
    pub async fn finish_attack(&self, contest: &Contest) -> Option<AttackOutcome> {
        let mut state = self.shared.state.lock().await;
        self.shared.finish(&mut state, contest)
    }

    /// Advances a contest by one tick.
    ///
    /// A no-op once the contest has left the active state.
    pub async fn attack_tick(&self, contest: &Contest) -> TickStatus {
        match contest.timer().advance(self.shared.settings.tick_size) {
            Advance::Inactive => TickStatus::Stopped,
            Advance::Finished => {
                self.finish_attack(contest).await;
                TickStatus::Stopped
            }
            Advance::Progressed { tier_changed, .. } => {
                let display = &self.shared.display;
                if let Some(tier) = tier_changed {
                    report(display.on_tier_changed(contest, tier), contest, "tier update");
                }
                let remaining = format_time_remaining(contest.timer().remaining());
                report(
                    display.on_progress(contest, &remaining),
                    contest,
                    "progress update",
                );
                TickStatus::Running
            }
        }
    }

    /// Persists state, stops every background task and empties the
    /// registries. Occupation is kept in the map.
    ///
    /// # Errors
    ///
    /// Returns the save error, if any. Registries are cleared regardless.
    pub async fn shutdown(&self) -> Result<(), PersistError> {
        let _writing = self.shared.save_lock.lock().await;
        let mut state = self.shared.state.lock().await;

        let snapshot = state.snapshot();
        let started = Instant::now();
        let saved = self.shared.persistence.save(&snapshot, true).await;
        metrics::record_save(started.elapsed(), saved.is_ok());

        self.shared.shutdown.cancel();
        state.clear_registries();
        self.shared.dirty.store(false, Ordering::Release);
        state.publish_gauges();
        info!(contests = snapshot.attacks.len(), "war shut down");
        saved
    }

    /// Ends the war: cancels every contest, clears all occupation and
    /// persists the empty state.
    ///
    /// # Errors
    ///
    /// Returns the save error, if any.
    pub async fn disable(&self) -> Result<(), PersistError> {
        let _writing = self.shared.save_lock.lock().await;
        let mut state = self.shared.state.lock().await;

        let contests: Vec<Arc<Contest>> = state.by_cell.values().cloned().collect();
        for contest in contests {
            self.shared.force_cancel(&mut state, &contest);
            if let Some(cell) = state.map.cell_mut(contest.coord()) {
                cell.clear_war_state();
            }
        }

        let occupied: Vec<Coord> = state.occupied.drain().collect();
        for coord in occupied {
            if let Some(cell) = state.map.cell_mut(coord) {
                cell.clear_war_state();
            }
        }
        state.clear_registries();

        self.shared.shutdown.cancel();
        self.shared.dirty.store(false, Ordering::Release);
        state.publish_gauges();

        let started = Instant::now();
        let saved = self.shared.persistence.save(&SavedWar::default(), true).await;
        metrics::record_save(started.elapsed(), saved.is_ok());
        info!("war disabled");
        saved
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Starts the periodic dirty-state save loop.
    #[must_use = "the handle is the only way to await the loop after shutdown"]
    pub fn spawn_save_loop(&self) -> JoinHandle<()> {
        scheduler::spawn_save_loop(&self.shared, self.shared.settings.save_interval)
    }

    /// Saves a snapshot if anything changed since the last save.
    ///
    /// Returns whether a save happened. Saves never overlap, and once
    /// [`shutdown`](Self::shutdown) or [`disable`](Self::disable) has
    /// written the final state this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the save error; the dirty flag is restored so the next
    /// round retries.
    pub async fn save_if_dirty(&self) -> Result<bool, PersistError> {
        let _writing = self.shared.save_lock.lock().await;
        if self.shared.shutdown.is_cancelled() {
            return Ok(false);
        }
        if !self.shared.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        let snapshot = self.snapshot().await;

        let started = Instant::now();
        let result = self.shared.persistence.save(&snapshot, false).await;
        metrics::record_save(started.elapsed(), result.is_ok());

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                self.shared.mark_dirty();
                Err(e)
            }
        }
    }

    /// Serializable copy of occupation and running contests.
    pub async fn snapshot(&self) -> SavedWar {
        self.shared.state.lock().await.snapshot()
    }

    /// Whether state changed since the last save.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Contest running on `coord`.
    pub async fn contest_at(&self, coord: Coord) -> Option<Arc<Contest>> {
        self.shared.state.lock().await.by_cell.get(&coord).cloned()
    }

    /// Contests started by `attacker`, e.g. to resend progress displays
    /// when they rejoin.
    pub async fn contests_by(&self, attacker: ResidentId) -> Vec<Arc<Contest>> {
        self.shared
            .state
            .lock()
            .await
            .by_attacker
            .get(&attacker)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of running contests.
    pub async fn active_count(&self) -> usize {
        self.shared.state.lock().await.by_cell.len()
    }

    /// Map-friendly view of every running contest, ordered by id.
    pub async fn active_flags(&self) -> Vec<FlagSummary> {
        let state = self.shared.state.lock().await;
        let mut flags: Vec<FlagSummary> = state
            .by_cell
            .values()
            .map(|contest| {
                let town = state.map.town(contest.town());
                let coord = contest.coord();
                FlagSummary {
                    id: format!("{}_{}", coord.x, coord.z),
                    flag: contest.flag().clone(),
                    town_name: town.map_or_else(|| contest.town().to_string(), |t| t.name.clone()),
                    nation_name: town
                        .and_then(|t| t.nation)
                        .and_then(|id| state.map.nation(id))
                        .map(|nation| nation.name.clone()),
                    progress: contest.timer().normalized(),
                    time_remaining: format_time_remaining(contest.timer().remaining()),
                }
            })
            .collect();
        flags.sort_by(|a, b| a.id.cmp(&b.id));
        flags
    }

    /// Cells currently held by an occupier through the war, sorted.
    pub async fn occupied_cells(&self) -> Vec<Coord> {
        let state = self.shared.state.lock().await;
        let mut cells: Vec<Coord> = state.occupied.iter().copied().collect();
        cells.sort_unstable();
        cells
    }

    /// Runs `f` against the map inside the critical section.
    pub async fn with_map<R>(&self, f: impl FnOnce(&TerritoryMap) -> R) -> R {
        f(&self.shared.state.lock().await.map)
    }

    /// Mutates the map inside the critical section (declaring war, moving
    /// residents). Callers must not touch cell attack markers.
    pub async fn with_map_mut<R>(&self, f: impl FnOnce(&mut TerritoryMap) -> R) -> R {
        f(&mut self.shared.state.lock().await.map)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`FlagWar`] from settings, a map and collaborators.
///
/// Unset collaborators default to [`OpenSky`] (using the configured build
/// height), [`NoDisplay`], [`AllowAll`] and [`NoPersistence`].
pub struct FlagWarBuilder {
    settings: WarConfig,
    map: TerritoryMap,
    world: Option<Arc<dyn WorldSurface>>,
    display: Arc<dyn ContestDisplay>,
    hooks: Arc<dyn WarHooks>,
    persistence: Arc<dyn WarPersistence>,
}

impl FlagWarBuilder {
    fn new(settings: WarConfig, map: TerritoryMap) -> Self {
        Self {
            settings,
            map,
            world: None,
            display: Arc::new(NoDisplay),
            hooks: Arc::new(AllowAll),
            persistence: Arc::new(NoPersistence),
        }
    }

    /// World surface collaborator.
    #[must_use]
    pub fn world(mut self, world: Arc<dyn WorldSurface>) -> Self {
        self.world = Some(world);
        self
    }

    /// Progress display collaborator.
    #[must_use]
    pub fn display(mut self, display: Arc<dyn ContestDisplay>) -> Self {
        self.display = display;
        self
    }

    /// Lifecycle hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: Arc<dyn WarHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Persistence backend.
    #[must_use]
    pub fn persistence(mut self, persistence: Arc<dyn WarPersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    /// Finishes the engine. No background task runs until a contest is
    /// created or [`FlagWar::spawn_save_loop`] is called.
    #[must_use]
    pub fn build(self) -> FlagWar {
        let world = self
            .world
            .unwrap_or_else(|| Arc::new(OpenSky::new(self.settings.max_build_height)));
        FlagWar::from_shared(Arc::new(Shared {
            settings: self.settings,
            state: Mutex::new(WarState::new(self.map)),
            world,
            display: self.display,
            hooks: self.hooks,
            persistence: self.persistence,
            save_lock: Mutex::new(()),
            dirty: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
        }))
    }
}
