//! Scenario and settings validation.
//!
//! Runs on fully deserialized documents and collects every issue rather
//! than stopping at the first one.

use std::collections::{HashMap, HashSet};

use crate::config::loader::ConfigLimits;
use crate::config::schema::{ScenarioConfig, WarConfig};
use crate::error::{Severity, ValidationIssue};
use crate::model::{BlockPos, Coord};

// ============================================================================
// Public API
// ============================================================================

/// Result of validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates war settings on their own.
    pub fn validate_war(&mut self, config: &WarConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();
        self.check_war(config, "war");
        self.take()
    }

    /// Validates a whole scenario.
    pub fn validate(&mut self, scenario: &ScenarioConfig, limits: &ConfigLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.check_war(&scenario.war, "war");
        self.check_limits(scenario, limits);

        let nations = self.unique_names(scenario.nations.iter().map(|n| n.name.as_str()), "nations");
        let towns = self.unique_names(scenario.towns.iter().map(|t| t.name.as_str()), "towns");
        let residents =
            self.unique_names(scenario.residents.iter().map(|r| r.name.as_str()), "residents");
        let territories =
            self.unique_names(scenario.territories.iter().map(|t| t.name.as_str()), "territories");

        self.check_towns(scenario, &nations, &towns, &territories);
        self.check_residents(scenario, &towns);
        let cell_owner = self.check_territories(scenario, &towns);
        self.check_attacks(scenario, &residents, &cell_owner);
        self.check_lists(scenario, &towns);

        self.take()
    }

    // ------------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------------

    fn check_war(&mut self, config: &WarConfig, prefix: &str) {
        if config.tick_size == 0 {
            self.error(format!("{prefix}.tick_size"), "must be greater than zero");
        }
        if config.progress_tiers == 0 {
            self.error(format!("{prefix}.progress_tiers"), "must be greater than zero");
        }
        if config.chunk_attack_time == 0 {
            self.error(format!("{prefix}.chunk_attack_time"), "must be greater than zero");
        }
        if config.max_player_chunk_attacks == 0 {
            self.error(
                format!("{prefix}.max_player_chunk_attacks"),
                "must allow at least one attack",
            );
        }
        for (field, value) in [
            (
                "attack_from_wilderness_multiplier",
                config.attack_from_wilderness_multiplier,
            ),
            ("home_attack_multiplier", config.home_attack_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                self.error(
                    format!("{prefix}.{field}"),
                    format!("must be a positive number, got {value}"),
                );
            }
        }
        if config.tick_interval.is_zero() {
            self.error(format!("{prefix}.tick_interval"), "must be greater than zero");
        }
        if config.save_interval.is_zero() {
            self.error(format!("{prefix}.save_interval"), "must be greater than zero");
        }
        if config.use_whitelist && config.whitelist.is_empty() {
            self.warning(
                format!("{prefix}.whitelist"),
                "whitelist is enabled but empty; no town can be attacked",
            );
        }
    }

    fn check_limits(&mut self, scenario: &ScenarioConfig, limits: &ConfigLimits) {
        if scenario.territories.len() > limits.max_territories {
            self.error(
                "territories",
                format!(
                    "{} territories exceed the limit of {}",
                    scenario.territories.len(),
                    limits.max_territories
                ),
            );
        }
        if scenario.attacks.len() > limits.max_attacks {
            self.error(
                "attacks",
                format!(
                    "{} attacks exceed the limit of {}",
                    scenario.attacks.len(),
                    limits.max_attacks
                ),
            );
        }
    }

    fn check_towns(
        &mut self,
        scenario: &ScenarioConfig,
        nations: &HashSet<&str>,
        towns: &HashSet<&str>,
        territories: &HashSet<&str>,
    ) {
        let owners: HashMap<&str, Option<&str>> = scenario
            .territories
            .iter()
            .map(|t| (t.name.as_str(), t.town.as_deref()))
            .collect();

        for (i, town) in scenario.towns.iter().enumerate() {
            let path = format!("towns[{i}]");

            if let Some(nation) = &town.nation {
                if !nations.contains(nation.as_str()) {
                    self.error(format!("{path}.nation"), format!("unknown nation '{nation}'"));
                }
            }

            if let Some(home) = &town.home {
                if !territories.contains(home.as_str()) {
                    self.error(format!("{path}.home"), format!("unknown territory '{home}'"));
                } else if owners.get(home.as_str()).copied().flatten() != Some(town.name.as_str()) {
                    self.warning(
                        format!("{path}.home"),
                        format!("home territory '{home}' is not owned by '{}'", town.name),
                    );
                }
            }

            for (field, list) in [("allies", &town.allies), ("enemies", &town.enemies)] {
                for (j, other) in list.iter().enumerate() {
                    let item = format!("{path}.{field}[{j}]");
                    if !towns.contains(other.as_str()) {
                        self.error(item, format!("unknown town '{other}'"));
                    } else if *other == town.name {
                        self.warning(item, "a town cannot list itself");
                    }
                }
            }

            if let Some(both) = town.allies.iter().find(|a| town.enemies.contains(a)) {
                self.warning(
                    path,
                    format!("'{both}' is listed as both ally and enemy"),
                );
            }
        }
    }

    fn check_residents(&mut self, scenario: &ScenarioConfig, towns: &HashSet<&str>) {
        for (i, resident) in scenario.residents.iter().enumerate() {
            if let Some(town) = &resident.town {
                if !towns.contains(town.as_str()) {
                    self.error(format!("residents[{i}].town"), format!("unknown town '{town}'"));
                }
            }
        }
    }

    /// Returns the territory index owning each listed cell.
    fn check_territories(
        &mut self,
        scenario: &ScenarioConfig,
        towns: &HashSet<&str>,
    ) -> HashMap<Coord, usize> {
        let mut cell_owner: HashMap<Coord, usize> = HashMap::new();

        for (i, territory) in scenario.territories.iter().enumerate() {
            let path = format!("territories[{i}]");

            if let Some(town) = &territory.town {
                if !towns.contains(town.as_str()) {
                    self.error(format!("{path}.town"), format!("unknown town '{town}'"));
                }
            }

            let mut cells: Vec<Coord> = territory.cells.clone();
            if !cells.contains(&territory.core) {
                cells.push(territory.core);
            }
            for coord in cells {
                if let Some(&other) = cell_owner.get(&coord) {
                    if other != i {
                        self.error(
                            format!("{path}.cells"),
                            format!(
                                "cell {coord} already belongs to '{}'",
                                scenario.territories[other].name
                            ),
                        );
                    }
                } else {
                    cell_owner.insert(coord, i);
                }
            }
        }

        cell_owner
    }

    fn check_attacks(
        &mut self,
        scenario: &ScenarioConfig,
        residents: &HashSet<&str>,
        cell_owner: &HashMap<Coord, usize>,
    ) {
        for (i, attack) in scenario.attacks.iter().enumerate() {
            let path = format!("attacks[{i}]");

            if residents.contains(attack.attacker.as_str()) {
                let has_town = scenario
                    .residents
                    .iter()
                    .find(|r| r.name == attack.attacker)
                    .is_some_and(|r| r.town.is_some());
                if !has_town {
                    self.error(
                        format!("{path}.attacker"),
                        format!("'{}' does not belong to a town", attack.attacker),
                    );
                }
            } else {
                self.error(
                    format!("{path}.attacker"),
                    format!("unknown resident '{}'", attack.attacker),
                );
            }

            let coord = BlockPos::new(attack.world.as_str(), attack.x, attack.y, attack.z).coord();
            if !cell_owner.contains_key(&coord) {
                self.warning(
                    path,
                    format!("flag lands in cell {coord}, which belongs to no territory"),
                );
            }
        }
    }

    fn check_lists(&mut self, scenario: &ScenarioConfig, towns: &HashSet<&str>) {
        let war = &scenario.war;
        for (field, enabled, list) in [
            ("blacklist", war.use_blacklist, &war.blacklist),
            ("whitelist", war.use_whitelist, &war.whitelist),
        ] {
            if !enabled {
                continue;
            }
            for (j, name) in list.iter().enumerate() {
                if !towns.contains(name.as_str()) {
                    self.warning(
                        format!("war.{field}[{j}]"),
                        format!("'{name}' does not name a town in this scenario"),
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn unique_names<'a>(
        &mut self,
        names: impl Iterator<Item = &'a str>,
        section: &str,
    ) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        for (i, name) in names.enumerate() {
            if name.trim().is_empty() {
                self.error(format!("{section}[{i}].name"), "name must not be empty");
            } else if !seen.insert(name) {
                self.error(format!("{section}[{i}].name"), format!("duplicate name '{name}'"));
            }
        }
        seen
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Error,
        });
    }

    fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
            severity: Severity::Warning,
        });
    }

    fn take(&mut self) -> ValidationResult {
        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
