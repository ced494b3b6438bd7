//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Peer connection settings.
    pub network: NetworkConfig,
    /// Ballistics, weapon heat and damage tuning.
    pub combat: CombatConfig,
    /// State reconciliation and interpolation tuning.
    pub sync: SyncConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Peer connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host of the authoritative peer.
    pub server_address: String,
    /// Port of the authoritative peer.
    pub server_port: u16,
    /// Request path appended to the derived WebSocket URL.
    pub path: String,
    /// Callsign announced in `init`. Generated when absent.
    pub callsign: Option<String>,
    /// Maximum outbound state updates per second.
    pub update_rate_hz: u32,
}

/// Ballistics, weapon heat and damage tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CombatConfig {
    /// Number of projectile slots shared by every weapon.
    pub projectile_pool_size: usize,
    /// Projectile speed relative to the firing vehicle (units/s).
    pub muzzle_speed: f32,
    /// Projectile lifetime in seconds.
    pub projectile_ttl_secs: f32,
    /// Hit distance between projectile and vehicle centre.
    pub collision_radius: f32,
    /// Minimum delay between two volleys of the same weapon.
    pub fire_cooldown_secs: f32,
    /// Distance ahead of the vehicle where both gun streams cross.
    pub convergence_distance: f32,
    /// Right-hand gun mount in vehicle space. The left mount mirrors X.
    pub mount_offset: [f32; 3],
    /// Heat added per volley.
    pub heat_per_shot: f32,
    /// Heat level that triggers the overheat lockout.
    pub max_heat: f32,
    /// Duration of the overheat lockout in seconds.
    pub overheat_lockout_secs: f32,
    /// Heat shed per second while the trigger is released.
    pub heat_decay_per_sec: f32,
    /// Damage dealt by a single projectile.
    pub damage_per_hit: f32,
    /// Health of a freshly spawned vehicle.
    pub max_health: f32,
    /// Downward acceleration applied to destroyed vehicles (units/s^2).
    pub gravity: f32,
    /// Height of the ground plane.
    pub ground_height: f32,
    /// Per-tick velocity multiplier once a wreck touches the ground.
    pub ground_damping: f32,
}

/// State reconciliation and interpolation tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Fraction of the remaining distance to the target covered per frame.
    pub interpolation_factor: f32,
    /// Delays after a local respawn at which the respawn state is re-sent.
    pub respawn_resend_delays_ms: Vec<u64>,
    /// Seconds a destroyed vehicle stays in the world before removal.
    pub removal_delay_secs: f32,
    /// Upper bound for inferred or reported remote speeds (units/s).
    pub max_speed: f32,
    /// Maximum number of simultaneously visible hit effects.
    pub hit_effect_capacity: usize,
    /// Lifetime of one hit effect in seconds.
    pub hit_effect_lifetime_secs: f32,
    /// Hold the `init_ack` roster until the scene reports ready.
    pub defer_roster_until_scene_ready: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            server_port: 8080,
            path: "/".to_string(),
            callsign: None,
            update_rate_hz: 50,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            projectile_pool_size: 200,
            muzzle_speed: 600.0,
            projectile_ttl_secs: 2.0,
            collision_radius: 8.0,
            fire_cooldown_secs: 0.1,
            convergence_distance: 300.0,
            mount_offset: [4.0, -0.5, -2.0],
            heat_per_shot: 4.0,
            max_heat: 100.0,
            overheat_lockout_secs: 3.0,
            heat_decay_per_sec: 25.0,
            damage_per_hit: 10.0,
            max_health: 100.0,
            gravity: 9.81,
            ground_height: 0.0,
            ground_damping: 0.9,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interpolation_factor: 0.2,
            respawn_resend_delays_ms: vec![100, 500, 1000, 2000, 5000],
            removal_delay_secs: 10.0,
            max_speed: 400.0,
            hit_effect_capacity: 32,
            hit_effect_lifetime_secs: 0.5,
            defer_roster_until_scene_ready: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Seconds from the config file as a [`Duration`]. Negative values clamp to
/// zero. NaN, infinite or overflowing values fall back to `default_secs`.
fn secs_or_default(field: &str, secs: f32, default_secs: f32) -> Duration {
    if secs.is_finite() && secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(secs).unwrap_or_else(|_| {
        log::warn!("{field} = {secs} is not a usable duration, using {default_secs}s");
        Duration::from_secs_f32(default_secs)
    })
}

impl CombatConfig {
    /// Lifetime of one projectile.
    pub fn projectile_ttl(&self) -> Duration {
        let default = Self::default().projectile_ttl_secs;
        secs_or_default("combat.projectile_ttl_secs", self.projectile_ttl_secs, default)
    }

    /// Minimum delay between two volleys.
    pub fn fire_cooldown(&self) -> Duration {
        let default = Self::default().fire_cooldown_secs;
        secs_or_default("combat.fire_cooldown_secs", self.fire_cooldown_secs, default)
    }

    /// Length of the overheat lockout.
    pub fn overheat_lockout(&self) -> Duration {
        let default = Self::default().overheat_lockout_secs;
        secs_or_default("combat.overheat_lockout_secs", self.overheat_lockout_secs, default)
    }
}

impl SyncConfig {
    /// How long a wreck stays before removal.
    pub fn removal_delay(&self) -> Duration {
        let default = Self::default().removal_delay_secs;
        secs_or_default("sync.removal_delay_secs", self.removal_delay_secs, default)
    }

    pub fn hit_effect_lifetime(&self) -> Duration {
        let default = Self::default().hit_effect_lifetime_secs;
        secs_or_default("sync.hit_effect_lifetime_secs", self.hit_effect_lifetime_secs, default)
    }
}

impl NetworkConfig {
    /// WebSocket URL derived from host, port and path.
    pub fn server_url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("ws://{}:{}{}", self.server_address, self.server_port, path)
    }
}

/// Platform configuration directory for the client (`<config_dir>/dogfight`).
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("dogfight"))
        .ok_or(ConfigError::NoConfigDir)
}

// --- Load / Save / Reload ---

const CONFIG_FILE: &str = "config.ron";

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Wrote default dogfight config to {}", path.display());
            return Ok(config);
        }
        let config = read_config(&path)?;
        log::info!("Loaded dogfight config from {}", path.display());
        Ok(config)
    }

    /// Write this config to `config_dir/config.ron`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_err)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&path, serialized).map_err(write_err)
    }

    /// Re-read the file. `Some` only when its contents differ from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_config(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Dogfight config changed on disk");
        Ok(Some(fresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("server_port: 8080"));
        assert!(ron_str.contains("projectile_pool_size: 200"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.network.callsign = Some("Maverick".to_string());
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(network: (server_port: 9000))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.network.server_port, 9000);
        assert_eq!(config.network.server_address, "127.0.0.1");
        assert_eq!(config.combat, CombatConfig::default());
        assert_eq!(config.sync, SyncConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_default_resend_schedule() {
        let sync = SyncConfig::default();
        assert_eq!(sync.respawn_resend_delays_ms, vec![100, 500, 1000, 2000, 5000]);
        assert!((sync.interpolation_factor - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unusable_durations_fall_back_to_defaults() {
        let mut config = Config::default();
        config.sync.removal_delay_secs = 1e30;
        config.sync.hit_effect_lifetime_secs = f32::NAN;
        config.combat.projectile_ttl_secs = f32::INFINITY;
        config.combat.fire_cooldown_secs = -1.0;
        config.combat.overheat_lockout_secs = 1.5;

        assert_eq!(config.sync.removal_delay(), Duration::from_secs(10));
        assert_eq!(config.sync.hit_effect_lifetime(), Duration::from_millis(500));
        assert_eq!(config.combat.projectile_ttl(), Duration::from_secs(2));
        assert_eq!(config.combat.fire_cooldown(), Duration::ZERO);
        assert_eq!(config.combat.overheat_lockout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_server_url_derivation() {
        let mut network = NetworkConfig::default();
        assert_eq!(network.server_url(), "ws://127.0.0.1:8080/");

        network.server_address = "game.example.net".to_string();
        network.server_port = 443;
        network.path = "arena".to_string();
        assert_eq!(network.server_url(), "ws://game.example.net:443/arena");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.network.server_address = "10.0.0.1".to_string();
        config.combat.muzzle_speed = 750.0;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.sync.interpolation_factor = 0.5;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert!((result.unwrap().sync.interpolation_factor - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();

        let err = Config::load_or_create(dir.path()).unwrap_err();
        let ConfigError::Parse { path, .. } = &err else {
            panic!("expected a parse error, got {err:?}");
        };
        assert!(path.ends_with("config.ron"));
        assert!(err.to_string().contains("config.ron"));
    }

    #[test]
    fn test_reload_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::default().reload(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
