/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD), or from
/// an explicit `--config` path. Falls back to sensible defaults if the
/// file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub layout: LayoutConfig,
    pub gamepad: GamepadConfig,
    pub sound_enabled: bool,
    pub levels_dir: PathBuf,
    pub levels: Vec<LevelConfig>,
    pub log_file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct SpeedConfig {
    pub tick_rate_ms: u64,
}

/// Logical pixel space plus how it maps onto terminal cells.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LayoutConfig {
    pub window_width: i32,
    pub window_height: i32,
    /// Edge length of one tile, in pixels.
    pub dot_size: i32,
    pub px_per_col: i32,
    pub px_per_row: i32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub sprint: Vec<String>,
    pub cycle: Vec<String>,
    pub confirm: Vec<String>,
    pub back: Vec<String>,
    pub restart: Vec<String>,
}

/// Explicit main-menu entry.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub path: PathBuf,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    layout: TomlLayout,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    levels: Vec<LevelConfig>,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlLayout {
    #[serde(default = "default_window_width")]
    window_width: i32,
    #[serde(default = "default_window_height")]
    window_height: i32,
    #[serde(default = "default_dot_size")]
    dot_size: i32,
    #[serde(default = "default_px_per_col")]
    px_per_col: i32,
    #[serde(default = "default_px_per_row")]
    px_per_row: i32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_sprint")]
    sprint: Vec<String>,
    #[serde(default = "default_cycle")]
    cycle: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_back")]
    back: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_true")]
    enabled: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default)]
    log_file: Option<PathBuf>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }     // ~60 FPS

fn default_window_width() -> i32 { 1000 }
fn default_window_height() -> i32 { 800 }
fn default_dot_size() -> i32 { 64 }
fn default_px_per_col() -> i32 { 16 }
fn default_px_per_row() -> i32 { 32 }

fn default_sprint() -> Vec<String> { vec!["RB".into(), "R2".into()] }
fn default_cycle() -> Vec<String> { vec!["Y".into(), "LB".into()] }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_back() -> Vec<String> { vec!["B".into(), "Select".into()] }
fn default_restart() -> Vec<String> { vec!["X".into()] }

fn default_true() -> bool { true }
fn default_levels_dir() -> String { "levels".into() }

fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("gatekeeper.log")
}

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed { tick_rate_ms: default_tick_rate() }
    }
}

impl Default for TomlLayout {
    fn default() -> Self {
        TomlLayout {
            window_width: default_window_width(),
            window_height: default_window_height(),
            dot_size: default_dot_size(),
            px_per_col: default_px_per_col(),
            px_per_row: default_px_per_row(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            sprint: default_sprint(),
            cycle: default_cycle(),
            confirm: default_confirm(),
            back: default_back(),
            restart: default_restart(),
        }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound { enabled: true }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { levels_dir: default_levels_dir(), log_file: None }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        TomlLayout::default().into()
    }
}

impl From<TomlLayout> for LayoutConfig {
    fn from(t: TomlLayout) -> Self {
        // Zero or negative scales would divide by zero in the presenter.
        LayoutConfig {
            window_width: t.window_width.max(1),
            window_height: t.window_height.max(1),
            dot_size: t.dot_size.max(1),
            px_per_col: t.px_per_col.max(1),
            px_per_row: t.px_per_row.max(1),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) XDG data dir, (4) /usr/share. An explicit path skips the search.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let search_dirs = candidate_dirs();

        let toml_cfg = match explicit {
            Some(path) => read_toml(path).unwrap_or_default(),
            None => load_toml(&search_dirs),
        };

        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly, bypassing the directory search.
    #[cfg(test)]
    pub fn parse(text: &str) -> Self {
        match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => GameConfig::from_toml(cfg, &[]),
            Err(e) => {
                log::warn!("config parse error: {e}; using default settings");
                GameConfig::default()
            }
        }
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        GameConfig {
            speed: SpeedConfig {
                tick_rate_ms: toml_cfg.speed.tick_rate_ms.max(1),
            },
            layout: toml_cfg.layout.into(),
            gamepad: GamepadConfig {
                sprint: toml_cfg.gamepad.sprint,
                cycle: toml_cfg.gamepad.cycle,
                confirm: toml_cfg.gamepad.confirm,
                back: toml_cfg.gamepad.back,
                restart: toml_cfg.gamepad.restart,
            },
            sound_enabled: toml_cfg.sound.enabled,
            levels_dir,
            levels: toml_cfg.levels,
            log_file: toml_cfg.general.log_file.unwrap_or_else(default_log_file),
        }
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/gatekeeper)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/gatekeeper");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/gatekeeper)
    let sys = PathBuf::from("/usr/share/gatekeeper");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    search_dirs
        .iter()
        .map(|dir| dir.join("config.toml"))
        .find(|path| path.exists())
        .and_then(|path| read_toml(&path))
        .unwrap_or_default()
}

fn read_toml(path: &Path) -> Option<TomlConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("could not read {}: {e}", path.display());
            return None;
        }
    };
    match toml::from_str::<TomlConfig>(&text) {
        Ok(cfg) => {
            log::info!("loaded config from {}", path.display());
            Some(cfg)
        }
        Err(e) => {
            log::warn!("{} parse error: {e}; using default settings", path.display());
            None
        }
    }
}
