/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory, the CWD or the
/// per-user / system data directories, first hit wins. Missing file or
/// missing keys fall back to defaults; a file that does not parse is
/// reported and ignored.
///
/// ```toml
/// [timing]
/// tick_rate = 60            # loop ticks per second
/// walking_target_fps = 30   # reference rate the walk/sprint speeds are tuned for
///
/// [movement]
/// walk_speed = 4.0          # pixels per reference frame
/// sprint_speed = 6.0
///
/// [screen]
/// width = 1300
/// height = 900
///
/// [actor]
/// width = 40
/// height = 60
/// start_x = 0
/// start_y = 200
///
/// [general]
/// data_dir = "data"
/// initial_mode = "playing"  # playing | menu | map | inventory
/// debug_overlay = false
///
/// [gamepad]
/// pause = ["Start"]
/// map = ["Y"]
/// inventory = ["X"]
/// sprint = ["B", "R1"]
/// quit = ["Select"]
/// ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::entity::SpeedModel;
use crate::domain::mode::GameMode;
use crate::domain::rect::{Rect, Viewport};

const CONFIG_FILE: &str = "config.toml";
const APP_DIR: &str = "generic-rpg";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub movement: MovementConfig,
    pub screen: Viewport,
    pub actor: Rect,
    pub gamepad: GamepadConfig,
    pub data_dir: PathBuf,
    pub initial_mode: GameMode,
    pub debug_overlay: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct TimingConfig {
    pub tick_rate: u32,
    pub walking_target_fps: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct MovementConfig {
    pub walk_speed: f32,
    pub sprint_speed: f32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub pause: Vec<String>,
    pub map: Vec<String>,
    pub inventory: Vec<String>,
    pub sprint: Vec<String>,
    pub quit: Vec<String>,
}

impl GameConfig {
    pub fn speed_model(&self) -> SpeedModel {
        SpeedModel::new(
            self.movement.walk_speed,
            self.movement.sprint_speed,
            self.timing.tick_rate,
            self.timing.walking_target_fps,
        )
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    movement: TomlMovement,
    #[serde(default)]
    screen: TomlScreen,
    #[serde(default)]
    actor: TomlActor,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate: u32,
    #[serde(default = "default_walking_target_fps")]
    walking_target_fps: u32,
}

#[derive(Deserialize, Debug)]
struct TomlMovement {
    #[serde(default = "default_walk_speed")]
    walk_speed: f32,
    #[serde(default = "default_sprint_speed")]
    sprint_speed: f32,
}

#[derive(Deserialize, Debug)]
struct TomlScreen {
    #[serde(default = "default_screen_width")]
    width: u32,
    #[serde(default = "default_screen_height")]
    height: u32,
}

#[derive(Deserialize, Debug)]
struct TomlActor {
    #[serde(default = "default_actor_width")]
    width: u32,
    #[serde(default = "default_actor_height")]
    height: u32,
    #[serde(default)]
    start_x: i32,
    #[serde(default = "default_start_y")]
    start_y: i32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_data_dir")]
    data_dir: String,
    #[serde(default = "default_initial_mode")]
    initial_mode: GameMode,
    #[serde(default)]
    debug_overlay: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_map")]
    map: Vec<String>,
    #[serde(default = "default_inventory")]
    inventory: Vec<String>,
    #[serde(default = "default_sprint")]
    sprint: Vec<String>,
    #[serde(default = "default_quit")]
    quit: Vec<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u32 { 60 }
fn default_walking_target_fps() -> u32 { 30 }
fn default_walk_speed() -> f32 { 4.0 }
fn default_sprint_speed() -> f32 { 6.0 }
fn default_screen_width() -> u32 { 1300 }
fn default_screen_height() -> u32 { 900 }
fn default_actor_width() -> u32 { 40 }
fn default_actor_height() -> u32 { 60 }
fn default_start_y() -> i32 { 200 }
fn default_data_dir() -> String { "data".into() }
fn default_initial_mode() -> GameMode { GameMode::Playing }

fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_map() -> Vec<String> { vec!["Y".into()] }
fn default_inventory() -> Vec<String> { vec!["X".into()] }
fn default_sprint() -> Vec<String> { vec!["B".into(), "R1".into()] }
fn default_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate: default_tick_rate(),
            walking_target_fps: default_walking_target_fps(),
        }
    }
}

impl Default for TomlMovement {
    fn default() -> Self {
        TomlMovement {
            walk_speed: default_walk_speed(),
            sprint_speed: default_sprint_speed(),
        }
    }
}

impl Default for TomlScreen {
    fn default() -> Self {
        TomlScreen {
            width: default_screen_width(),
            height: default_screen_height(),
        }
    }
}

impl Default for TomlActor {
    fn default() -> Self {
        TomlActor {
            width: default_actor_width(),
            height: default_actor_height(),
            start_x: 0,
            start_y: default_start_y(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            data_dir: default_data_dir(),
            initial_mode: default_initial_mode(),
            debug_overlay: false,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            pause: default_pause(),
            map: default_map(),
            inventory: default_inventory(),
            sprint: default_sprint(),
            quit: default_quit(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, CWD, ~/.local/share/generic-rpg,
    /// /usr/share/generic-rpg.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        let data_dir = resolve_data_dir(&toml_cfg.general.data_dir, &search_dirs);
        GameConfig::from_toml(toml_cfg, data_dir)
    }

    /// Parse a config document; unparsable text yields the defaults.
    #[cfg(test)]
    fn parse(text: &str) -> Self {
        let toml_cfg = parse_toml(text, Path::new(CONFIG_FILE));
        let data_dir = PathBuf::from(&toml_cfg.general.data_dir);
        GameConfig::from_toml(toml_cfg, data_dir)
    }

    fn from_toml(cfg: TomlConfig, data_dir: PathBuf) -> Self {
        let mut screen = Viewport::new(cfg.screen.width as f32, cfg.screen.height as f32);
        if screen.width <= 0.0 || screen.height <= 0.0 {
            log::warn!("screen size {}x{} is empty, using defaults", cfg.screen.width, cfg.screen.height);
            screen = Viewport::new(default_screen_width() as f32, default_screen_height() as f32);
        }

        let mut actor = Rect::new(
            cfg.actor.start_x as f32,
            cfg.actor.start_y as f32,
            cfg.actor.width as f32,
            cfg.actor.height as f32,
        );
        // the actor has to fit; clamp the start position into the screen
        actor.w = actor.w.min(screen.width);
        actor.h = actor.h.min(screen.height);
        actor.x = actor.x.clamp(0.0, screen.width - actor.w);
        actor.y = actor.y.clamp(0.0, screen.height - actor.h);

        GameConfig {
            timing: TimingConfig {
                tick_rate: cfg.timing.tick_rate.max(1),
                walking_target_fps: cfg.timing.walking_target_fps.max(1),
            },
            movement: MovementConfig {
                walk_speed: checked_speed("walk_speed", cfg.movement.walk_speed, default_walk_speed()),
                sprint_speed: checked_speed("sprint_speed", cfg.movement.sprint_speed, default_sprint_speed()),
            },
            screen,
            actor,
            gamepad: GamepadConfig {
                pause: cfg.gamepad.pause,
                map: cfg.gamepad.map,
                inventory: cfg.gamepad.inventory,
                sprint: cfg.gamepad.sprint,
                quit: cfg.gamepad.quit,
            },
            data_dir,
            initial_mode: cfg.general.initial_mode,
            debug_overlay: cfg.general.debug_overlay,
        }
    }
}

/// Speeds must be finite and not negative, or the boundary test looks at
/// the wrong edge.
fn checked_speed(key: &str, value: f32, default: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        log::warn!("movement.{key} = {value} is not usable, using {default}");
        default
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so an installed link still finds data next to
        // the real binary.
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

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    let sys = PathBuf::from("/usr/share").join(APP_DIR);
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Absolute paths are used as is; relative ones are looked up in the
/// candidate directories, falling back to the CWD.
fn resolve_data_dir(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(name))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::info!("using {}", path.display());
                return parse_toml(&text, &path);
            }
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                eprintln!("Warning: could not read {}: {e}", path.display());
            }
        }
    }
    log::info!("no {CONFIG_FILE} found, using defaults");
    TomlConfig::default()
}

fn parse_toml(text: &str, path: &Path) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("{} parse error: {e}", path.display());
            eprintln!("Warning: {} parse error: {e}", path.display());
            eprintln!("Using default settings.");
            TomlConfig::default()
        }
    }
}
