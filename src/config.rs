/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    pub tick_rate_ms: u64,
    /// None: play the embedded level.
    pub level_file: Option<PathBuf>,
}

/// Movement tuning, in world pixels per tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub tile_size: f32,
    pub movement_speed: f32,
    pub gravity: f32,
    pub jump_speed: f32,
    pub jump_tolerance: f32,   // ground probe used when a jump is requested
    pub ground_tolerance: f32, // ground probe used for the per-tick HUD flag
}

#[derive(Clone, Debug, PartialEq)]
pub struct RulesConfig {
    pub start_score: i32,
    pub spike_penalty: i32,
    /// Spawn tile (col, row from the bottom) for levels without a 'P'.
    pub spawn: (usize, usize),
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub reset: Vec<String>,
    pub quit: Vec<String>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        TomlPhysics::default().into()
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            start_score: default_start_score(),
            spike_penalty: default_spike_penalty(),
            spawn: (default_spawn_x(), default_spawn_y()),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_tile_size")]
    tile_size: f32,
    #[serde(default = "default_movement_speed")]
    movement_speed: f32,
    #[serde(default = "default_gravity")]
    gravity: f32,
    #[serde(default = "default_jump_speed")]
    jump_speed: f32,
    #[serde(default = "default_jump_tolerance")]
    jump_tolerance: f32,
    #[serde(default = "default_ground_tolerance")]
    ground_tolerance: f32,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_start_score")]
    start_score: i32,
    #[serde(default = "default_spike_penalty")]
    spike_penalty: i32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_jump")]
    jump: Vec<String>,
    #[serde(default = "default_pad_reset")]
    reset: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default)]
    level_file: String,
    #[serde(default = "default_spawn_x")]
    spawn_x: usize,
    #[serde(default = "default_spawn_y")]
    spawn_y: usize,
}

// ── Defaults ──

fn default_tile_size() -> f32 { 128.0 }
fn default_movement_speed() -> f32 { 10.0 }
fn default_gravity() -> f32 { 1.4 }
fn default_jump_speed() -> f32 { 25.0 }
fn default_jump_tolerance() -> f32 { 10.0 }
fn default_ground_tolerance() -> f32 { 5.0 }
fn default_start_score() -> i32 { 1000 }
fn default_spike_penalty() -> i32 { 50 }
fn default_pad_jump() -> Vec<String> { vec!["A".into()] }
fn default_pad_reset() -> Vec<String> { vec!["Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }
fn default_tick_rate() -> u64 { 16 } // ~60 ticks/s
fn default_spawn_x() -> usize { 2 }
fn default_spawn_y() -> usize { 1 }

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            tile_size: default_tile_size(),
            movement_speed: default_movement_speed(),
            gravity: default_gravity(),
            jump_speed: default_jump_speed(),
            jump_tolerance: default_jump_tolerance(),
            ground_tolerance: default_ground_tolerance(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            start_score: default_start_score(),
            spike_penalty: default_spike_penalty(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_pad_jump(),
            reset: default_pad_reset(),
            quit: default_pad_quit(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tick_rate_ms: default_tick_rate(),
            level_file: String::new(),
            spawn_x: default_spawn_x(),
            spawn_y: default_spawn_y(),
        }
    }
}

impl From<TomlPhysics> for PhysicsConfig {
    fn from(t: TomlPhysics) -> Self {
        PhysicsConfig {
            // A zero tile would divide by zero in every tile lookup
            tile_size: if t.tile_size > 0.0 { t.tile_size } else { default_tile_size() },
            movement_speed: t.movement_speed,
            gravity: t.gravity,
            jump_speed: t.jump_speed,
            jump_tolerance: t.jump_tolerance,
            ground_tolerance: t.ground_tolerance,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Parse config text directly (no file search for the level path).
    #[cfg(test)]
    fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(cfg, &[]))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let level_file = resolve_level_file(&toml_cfg.general.level_file, search_dirs);

        GameConfig {
            physics: toml_cfg.physics.into(),
            rules: RulesConfig {
                start_score: toml_cfg.rules.start_score,
                spike_penalty: toml_cfg.rules.spike_penalty,
                spawn: (toml_cfg.general.spawn_x, toml_cfg.general.spawn_y),
            },
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                reset: toml_cfg.gamepad.reset,
                quit: toml_cfg.gamepad.quit,
            },
            tick_rate_ms: toml_cfg.general.tick_rate_ms.max(1),
            level_file,
        }
    }
}

/// Relative level paths are looked up in the candidate dirs, then left
/// relative to CWD so the load error names the path the user wrote.
fn resolve_level_file(raw: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Some(path);
    }
    Some(
        search_dirs.iter()
            .map(|d| d.join(&path))
            .find(|p| p.is_file())
            .unwrap_or(path),
    )
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() { continue; }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => {
                    info!(path = %path.display(), "loaded config");
                    return cfg;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config.toml parse error; using defaults");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read config.toml");
            }
        }
    }
    TomlConfig::default()
}
