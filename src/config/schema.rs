//! Configuration schema types.
//!
//! `WarConfig` holds the tunables of the war engine itself. A
//! `ScenarioConfig` wraps it together with a small world description and a
//! script of attacks for the command-line runner.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::Coord;

// ============================================================================
// War Settings
// ============================================================================

/// Tunables of the flag war engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WarConfig {
    /// Only territories touching another town or the wilderness are attackable
    pub can_only_attack_borders: bool,

    /// Reject attacks on blacklisted towns
    pub use_blacklist: bool,

    /// Town names that cannot be attacked
    pub blacklist: Vec<String>,

    /// Only whitelisted towns can be attacked
    pub use_whitelist: bool,

    /// Town names that can be attacked
    pub whitelist: Vec<String>,

    /// With the whitelist on, the attacking town must be whitelisted too
    pub only_whitelist_can_claim: bool,

    /// Concurrent contests a single player may run
    pub max_player_chunk_attacks: usize,

    /// Base contest duration in game ticks
    pub chunk_attack_time: u64,

    /// Duration multiplier for territories bordering wilderness
    pub attack_from_wilderness_multiplier: f64,

    /// Duration multiplier for a town's home territory
    pub home_attack_multiplier: f64,

    /// Game ticks added to a contest per ticker firing
    pub tick_size: u64,

    /// Wall-clock time between ticker firings
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Number of progress tiers reported to the display
    pub progress_tiers: usize,

    /// Wall-clock time between dirty-state saves
    #[serde(with = "humantime_serde")]
    pub save_interval: Duration,

    /// World build height used by the default world surface
    pub max_build_height: i32,
}

impl Default for WarConfig {
    fn default() -> Self {
        Self {
            can_only_attack_borders: false,
            use_blacklist: false,
            blacklist: Vec::new(),
            use_whitelist: false,
            whitelist: Vec::new(),
            only_whitelist_can_claim: false,
            max_player_chunk_attacks: 1,
            chunk_attack_time: 12_000,
            attack_from_wilderness_multiplier: 1.0,
            home_attack_multiplier: 1.0,
            tick_size: 20,
            tick_interval: Duration::from_secs(1),
            progress_tiers: 6,
            save_interval: Duration::from_secs(1),
            max_build_height: 320,
        }
    }
}

impl WarConfig {
    /// Whether a town name is on the blacklist.
    #[must_use]
    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.iter().any(|entry| entry == name)
    }

    /// Whether a town name is on the whitelist.
    #[must_use]
    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.whitelist.iter().any(|entry| entry == name)
    }
}

/// Serde adapter for `Duration` fields written as `"1s"`, `"500ms"`, `"2m"`.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Scenario Documents
// ============================================================================

/// A runnable scenario: war settings, a world and a script of attacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScenarioConfig {
    /// Scenario name shown in logs and summaries
    #[serde(default)]
    pub name: Option<String>,

    /// War engine settings
    #[serde(default)]
    pub war: WarConfig,

    /// Nations
    #[serde(default)]
    pub nations: Vec<NationDef>,

    /// Towns
    #[serde(default)]
    pub towns: Vec<TownDef>,

    /// Players
    #[serde(default)]
    pub residents: Vec<ResidentDef>,

    /// Territories and their cells
    #[serde(default)]
    pub territories: Vec<TerritoryDef>,

    /// Scripted attacks
    #[serde(default)]
    pub attacks: Vec<AttackDef>,
}

/// A nation entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NationDef {
    /// Unique nation name
    pub name: String,
}

/// A town entry. Relationships refer to other towns by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TownDef {
    /// Unique town name
    pub name: String,

    /// Nation name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nation: Option<String>,

    /// Name of the home territory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,

    /// Towns this town considers allies
    #[serde(default)]
    pub allies: Vec<String>,

    /// Towns this town is at war with
    #[serde(default)]
    pub enemies: Vec<String>,
}

/// A player entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentDef {
    /// Unique player name
    pub name: String,

    /// Stable player id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<uuid::Uuid>,

    /// Town name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
}

/// A territory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritoryDef {
    /// Unique territory name
    pub name: String,

    /// Owning town name; wilderness when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,

    /// Core cell
    pub core: Coord,

    /// Member cells (the core is added implicitly)
    #[serde(default)]
    pub cells: Vec<Coord>,
}

/// A scripted attack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackDef {
    /// Attacking player name
    pub attacker: String,

    /// World the flag is placed in
    #[serde(default = "default_world")]
    pub world: String,

    /// Flag block x
    pub x: i32,

    /// Flag block y
    #[serde(default = "default_flag_height")]
    pub y: i32,

    /// Flag block z
    pub z: i32,

    /// Wait before placing the flag
    #[serde(default, with = "humantime_serde_opt", skip_serializing_if = "Option::is_none")]
    pub delay: Option<Duration>,
}

fn default_world() -> String {
    "world".to_string()
}

const fn default_flag_height() -> i32 {
    64
}

mod humantime_serde_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                serializer.serialize_str(&humantime::format_duration(*duration).to_string())
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: WarConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, WarConfig::default());
        assert_eq!(config.chunk_attack_time, 12_000);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn durations_parse_humantime() {
        let yaml = "tick_interval: 250ms\nsave_interval: 2m\n";
        let config: WarConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.save_interval, Duration::from_secs(120));
    }

    #[test]
    fn bad_duration_is_rejected() {
        let result: Result<WarConfig, _> = serde_yaml::from_str("tick_interval: soon\n");
        assert!(result.is_err());
    }

    #[test]
    fn list_membership() {
        let config = WarConfig {
            blacklist: vec!["Spawn".into()],
            whitelist: vec!["Rome".into()],
            ..WarConfig::default()
        };
        assert!(config.is_blacklisted("Spawn"));
        assert!(!config.is_blacklisted("Rome"));
        assert!(config.is_whitelisted("Rome"));
    }

    #[test]
    fn scenario_attack_defaults() {
        let yaml = r"
towns:
  - name: Rome
territories:
  - name: rome-core
    town: Rome
    core: { x: 0, z: 0 }
attacks:
  - attacker: alice
    x: 20
    z: 4
    delay: 3s
";
        let scenario: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        let attack = &scenario.attacks[0];
        assert_eq!(attack.world, "world");
        assert_eq!(attack.y, 64);
        assert_eq!(attack.delay, Some(Duration::from_secs(3)));
        assert!(scenario.territories[0].cells.is_empty());
    }
}
