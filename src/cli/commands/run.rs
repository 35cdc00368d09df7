//! `flagwar run`: play a scenario to completion.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::{AttackDef, ConfigLoader, ScenarioWorld, build_world};
use crate::error::FlagWarError;
use crate::model::{BlockPos, Coord, ResidentId, TerritoryId, TerritoryMap, TownId};
use crate::observability::{Event, EventEmitter, StopReason, init_metrics};
use crate::services::{EventHooks, JsonFilePersistence, NoPersistence, WarPersistence};
use crate::war::{FlagWar, RestoreSummary};

/// Loads the scenario, runs every scripted attack and prints the result.
///
/// # Errors
///
/// Returns an error if the scenario is invalid, saved state cannot be
/// read, or the final save fails.
pub async fn run(args: &RunArgs) -> Result<(), FlagWarError> {
    let loaded = ConfigLoader::default().load(&args.scenario)?;
    for warning in &loaded.warnings {
        warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    let scenario = loaded.scenario;
    let scenario_name = scenario
        .name
        .clone()
        .unwrap_or_else(|| args.scenario.display().to_string());

    let ScenarioWorld {
        map,
        residents,
        territory_names,
    } = build_world(&scenario)?;
    let territory_count = territory_names.len();

    if args.metrics_port.is_some() {
        init_metrics(args.metrics_port)?;
    }

    let emitter = Arc::new(match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    });
    let hooks = Arc::new(EventHooks::new(Arc::clone(&emitter)));
    let persistence: Arc<dyn WarPersistence> = match &args.state {
        Some(path) => Arc::new(JsonFilePersistence::new(path)),
        None => Arc::new(NoPersistence),
    };

    let war = FlagWar::builder(scenario.war.clone(), map)
        .display(hooks.clone())
        .hooks(hooks)
        .persistence(persistence)
        .build();

    // Reset skips the restore; the final save overwrites the old state
    let restored = if args.state.is_some() && !args.reset {
        war.restore().await?
    } else {
        RestoreSummary::default()
    };

    emitter.emit(Event::WarStarted {
        timestamp: Utc::now(),
        scenario: scenario_name.clone(),
        territories: territory_count,
        resumed_contests: restored.contests,
    });
    info!(
        scenario = %scenario_name,
        territories = territory_count,
        attacks = scenario.attacks.len(),
        "war started"
    );

    let save_loop = war.spawn_save_loop();

    let mut launches = JoinSet::new();
    for attack in scenario.attacks {
        let Some(&attacker) = residents.get(&attack.attacker) else {
            warn!(attacker = %attack.attacker, "scripted attack skipped: unknown resident");
            continue;
        };
        launches.spawn(launch(war.clone(), Arc::clone(&emitter), attacker, attack));
    }

    let reason = tokio::select! {
        () = wait_until_quiet(&war, &mut launches) => StopReason::Completed,
        reason = shutdown_signal() => reason,
    };
    launches.abort_all();

    let occupied = war.occupied_cells().await.len();
    let report = summarize(&war, &territory_names).await;
    let saved = war.shutdown().await;
    if let Err(e) = save_loop.await {
        warn!(error = %e, "save loop ended abnormally");
    }

    emitter.emit(Event::WarStopped {
        timestamp: Utc::now(),
        reason,
        occupied_cells: occupied,
    });
    info!(?reason, occupied, "war stopped");

    print_report(&report, args.format)?;
    saved?;
    Ok(())
}

/// Places one scripted flag after its delay.
async fn launch(war: FlagWar, emitter: Arc<EventEmitter>, attacker: ResidentId, attack: AttackDef) {
    if let Some(delay) = attack.delay {
        tokio::time::sleep(delay).await;
    }

    let flag = BlockPos::new(attack.world, attack.x, attack.y, attack.z);
    let coord = flag.coord();

    let Some(town) = war
        .with_map(|map| map.resident(attacker).and_then(|r| r.town))
        .await
    else {
        warn!(%attacker, "scripted attack skipped: attacker has no town");
        return;
    };

    if let Err(e) = war.begin_attack(attacker, town, coord, flag).await {
        warn!(%attacker, %coord, reason = e.code(), "attack rejected: {e}");
        emitter.emit(Event::AttackRejected {
            timestamp: Utc::now(),
            attacker,
            coord,
            reason: e.code().to_string(),
        });
    }
}

/// Resolves once every launch has run and no contest is left.
async fn wait_until_quiet(war: &FlagWar, launches: &mut JoinSet<()>) {
    while launches.join_next().await.is_some() {}

    let period = war.settings().tick_interval.max(Duration::from_millis(1));
    let mut poll = tokio::time::interval(period);
    loop {
        poll.tick().await;
        if war.active_count().await == 0 {
            break;
        }
    }
}

async fn shutdown_signal() -> StopReason {
    let mut sigterm =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
                return StopReason::Interrupted;
            }
        };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => StopReason::Interrupted,
        _ = sigterm.recv() => StopReason::Terminated,
    }
}

// ============================================================================
// Summary
// ============================================================================

#[derive(Debug, Serialize)]
struct TerritoryReport {
    name: String,
    owner: Option<String>,
    occupier: Option<String>,
    occupied_cells: Vec<CellReport>,
}

#[derive(Debug, Serialize)]
struct CellReport {
    coord: Coord,
    occupier: String,
}

async fn summarize(
    war: &FlagWar,
    names: &BTreeMap<TerritoryId, String>,
) -> Vec<TerritoryReport> {
    war.with_map(|map| {
        names
            .iter()
            .filter_map(|(id, name)| {
                let territory = map.territory(*id)?;
                let mut occupied_cells: Vec<CellReport> = territory
                    .cells
                    .iter()
                    .filter_map(|coord| {
                        let occupier = map.cell(*coord)?.occupier?;
                        Some(CellReport {
                            coord: *coord,
                            occupier: town_name(map, occupier),
                        })
                    })
                    .collect();
                occupied_cells.sort_by_key(|cell| cell.coord);
                Some(TerritoryReport {
                    name: name.clone(),
                    owner: territory.town.map(|id| town_name(map, id)),
                    occupier: territory.occupier.map(|id| town_name(map, id)),
                    occupied_cells,
                })
            })
            .collect()
    })
    .await
}

fn town_name(map: &TerritoryMap, id: TownId) -> String {
    map.town(id).map_or_else(|| id.to_string(), |town| town.name.clone())
}

fn print_report(report: &[TerritoryReport], format: OutputFormat) -> Result<(), FlagWarError> {
    match format {
        OutputFormat::Human => {
            for territory in report {
                println!(
                    "{}: owner {}, occupier {}",
                    territory.name,
                    territory.owner.as_deref().unwrap_or("-"),
                    territory.occupier.as_deref().unwrap_or("-"),
                );
                for cell in &territory.occupied_cells {
                    println!("  {} held by {}", cell.coord, cell.occupier);
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}
