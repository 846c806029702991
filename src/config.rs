/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD, or
/// `~/.local/share/blockrunners`). Falls back to documented defaults if
/// the file is missing, malformed, or holds values that make no sense.
///
/// Every numeric key is lenient: integers, floats and numeric strings
/// are all accepted. Anything non-numeric, NaN, infinite or out of range
/// falls back to the default for that key with a `warn!` in the log.
/// A bad config never reaches the player, and never reaches the sim.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::Value;

use crate::domain::entity::MAX_RUNNERS;
use crate::domain::physics::Physics;

// ── Errors ──

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config.toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Enumerated settings ──

/// Base drop interval presets.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum SpeedPreset {
    Slow,
    Medium,
    Fast,
    VeryFast,
    Insane,
}

impl SpeedPreset {
    pub const ALL: [SpeedPreset; 5] = [
        SpeedPreset::Slow,
        SpeedPreset::Medium,
        SpeedPreset::Fast,
        SpeedPreset::VeryFast,
        SpeedPreset::Insane,
    ];

    pub fn drop_interval_ms(self) -> u32 {
        match self {
            SpeedPreset::Slow => 800,
            SpeedPreset::Medium => 500,
            SpeedPreset::Fast => 300,
            SpeedPreset::VeryFast => 150,
            SpeedPreset::Insane => 50,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpeedPreset::Slow => "slow",
            SpeedPreset::Medium => "medium",
            SpeedPreset::Fast => "fast",
            SpeedPreset::VeryFast => "very-fast",
            SpeedPreset::Insane => "insane",
        }
    }

    /// Case-insensitive; `very-fast`, `very_fast` and `veryfast` all work.
    pub fn from_name(s: &str) -> Option<Self> {
        let key: String = s.trim().to_ascii_lowercase().chars().filter(|c| c.is_ascii_alphabetic()).collect();
        match key.as_str() {
            "slow" => Some(SpeedPreset::Slow),
            "medium" => Some(SpeedPreset::Medium),
            "fast" => Some(SpeedPreset::Fast),
            "veryfast" => Some(SpeedPreset::VeryFast),
            "insane" => Some(SpeedPreset::Insane),
            _ => None,
        }
    }

    /// Next preset, wrapping. Used by the menu.
    pub fn cycle(self) -> Self {
        let i = Self::ALL.iter().position(|&p| p == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

/// How spent ammo comes back.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum RechargePolicy {
    /// Timer starts when ammo hits 0; on expiry ammo is restored to max.
    AllOrNothing,
    /// Timer runs whenever ammo is below max; each expiry returns one shot.
    PerShot,
}

impl RechargePolicy {
    pub fn from_name(s: &str) -> Option<Self> {
        let key: String = s.trim().to_ascii_lowercase().chars().filter(|c| c.is_ascii_alphabetic()).collect();
        match key.as_str() {
            "allornothing" | "all" => Some(RechargePolicy::AllOrNothing),
            "pershot" | "gradual" => Some(RechargePolicy::PerShot),
            _ => None,
        }
    }
}

// ── Public Config Structs ──

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchConfig {
    /// 1..=MAX_RUNNERS
    pub runner_count: usize,
    /// The last `bot_runners` runners are driven by `domain::ai`.
    pub bot_runners: usize,
    pub lines_to_win: u32,
    pub max_shots: u32,
    pub recharge_ms: u32,
    pub recharge_policy: RechargePolicy,
    pub speed: SpeedPreset,
    pub match_duration_ms: u64,
    pub countdown_ms: u32,
    /// Piece sequence seed. `None` picks one from the clock at match start.
    pub seed: Option<u64>,
    pub tuning: Tuning,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Tuning {
    pub cell_size: f32,
    pub gravity: f32,
    pub jump_strength: f32,
    pub projectile_speed: f32,
    pub move_repeat_ms: u32,
    pub speed_ramp_ms: u32,
    /// In (0, 1].
    pub speed_ramp_factor: f32,
    pub min_drop_interval_ms: u32,
    /// Nominal frame that per-frame physics constants are tuned for.
    pub frame_ms: u32,
    pub shoot_digs_below: bool,
}

/// Raw menu inputs, exactly as typed.
#[derive(Clone, Debug, Default)]
pub struct FormValues {
    pub runner_count: String,
    pub lines_to_win: String,
    pub max_shots: String,
    pub recharge_secs: String,
    pub speed: String,
    pub duration_mins: String,
}

// ── Defaults ──

fn default_runner_count() -> usize { 1 }
fn default_bot_runners() -> usize { 0 }
fn default_lines_to_win() -> u32 { 5 }
fn default_max_shots() -> u32 { 7 }
fn default_recharge_secs() -> f64 { 30.0 }
fn default_duration_mins() -> f64 { 5.0 }
fn default_countdown_secs() -> f64 { 3.0 }

fn default_cell_size() -> f32 { 30.0 }
fn default_gravity() -> f32 { 0.5 }
fn default_jump_strength() -> f32 { 10.0 }
fn default_projectile_speed() -> f32 { 10.0 }
fn default_move_repeat_ms() -> u32 { 50 }
fn default_speed_ramp_secs() -> f64 { 60.0 }
fn default_speed_ramp_factor() -> f32 { 0.7 }
fn default_min_drop_interval_ms() -> u32 { 100 }
fn default_frame_ms() -> u32 { 16 }

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            runner_count: default_runner_count(),
            bot_runners: default_bot_runners(),
            lines_to_win: default_lines_to_win(),
            max_shots: default_max_shots(),
            recharge_ms: secs_to_ms(default_recharge_secs()),
            recharge_policy: RechargePolicy::AllOrNothing,
            speed: SpeedPreset::Medium,
            match_duration_ms: (default_duration_mins() * 60_000.0) as u64,
            countdown_ms: secs_to_ms(default_countdown_secs()),
            seed: None,
            tuning: Tuning::default(),
        }
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            cell_size: default_cell_size(),
            gravity: default_gravity(),
            jump_strength: default_jump_strength(),
            projectile_speed: default_projectile_speed(),
            move_repeat_ms: default_move_repeat_ms(),
            speed_ramp_ms: secs_to_ms(default_speed_ramp_secs()),
            speed_ramp_factor: default_speed_ramp_factor(),
            min_drop_interval_ms: default_min_drop_interval_ms(),
            frame_ms: default_frame_ms(),
            shoot_digs_below: false,
        }
    }
}

// ── TOML Schema ──
//
// Every leaf is a raw `toml::Value` so that `"7"`, `7` and `7.0` all
// deserialize; validation happens in `resolve_*` below.

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default, rename = "match")]
    match_: TomlMatch,
    #[serde(default)]
    tuning: TomlTuning,
}

#[derive(Deserialize, Debug, Default)]
struct TomlMatch {
    runner_count: Option<Value>,
    bot_runners: Option<Value>,
    lines_to_win: Option<Value>,
    max_shots: Option<Value>,
    recharge_secs: Option<Value>,
    recharge_policy: Option<Value>,
    speed: Option<Value>,
    duration_mins: Option<Value>,
    countdown_secs: Option<Value>,
    seed: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlTuning {
    cell_size: Option<Value>,
    gravity: Option<Value>,
    jump_strength: Option<Value>,
    projectile_speed: Option<Value>,
    move_repeat_ms: Option<Value>,
    speed_ramp_secs: Option<Value>,
    speed_ramp_factor: Option<Value>,
    min_drop_interval_ms: Option<Value>,
    frame_ms: Option<Value>,
    shoot_digs_below: Option<Value>,
}

// ── Lenient value readers ──

fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn as_text(v: &Value) -> Option<&str> {
    match v {
        Value::String(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Strictly positive real, or the default.
fn positive(key: &str, v: Option<&Value>, default: f64) -> f64 {
    let Some(v) = v else { return default };
    match as_number(v) {
        Some(n) if n > 0.0 => n,
        _ => {
            warn!("config: {key} = {v} is not a positive number; using {default}");
            default
        }
    }
}

/// Strictly positive and representable as `f32`, or the default.
fn positive_f32(key: &str, v: Option<&Value>, default: f32) -> f32 {
    let Some(v) = v else { return default };
    match as_number(v).map(|n| n as f32) {
        Some(n) if n.is_finite() && n > 0.0 => n,
        _ => {
            warn!("config: {key} = {v} is not a usable positive number; using {default}");
            default
        }
    }
}

/// Zero or positive real, or the default.
fn non_negative(key: &str, v: Option<&Value>, default: f64) -> f64 {
    let Some(v) = v else { return default };
    match as_number(v) {
        Some(n) if n >= 0.0 => n,
        _ => {
            warn!("config: {key} = {v} is not a non-negative number; using {default}");
            default
        }
    }
}

/// Whole number >= 1 (fractions are truncated), or the default.
fn count(key: &str, v: Option<&Value>, default: u32) -> u32 {
    let Some(v) = v else { return default };
    match as_number(v) {
        Some(n) if n >= 1.0 => n.floor().min(u32::MAX as f64) as u32,
        _ => {
            warn!("config: {key} = {v} is not a whole number >= 1; using {default}");
            default
        }
    }
}

fn flag(key: &str, v: Option<&Value>, default: bool) -> bool {
    match v {
        None => default,
        Some(Value::Boolean(b)) => *b,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("false") => false,
        Some(other) => {
            warn!("config: {key} = {other} is not a boolean; using {default}");
            default
        }
    }
}

fn secs_to_ms(secs: f64) -> u32 {
    (secs * 1000.0).round().min(u32::MAX as f64) as u32
}

// ── Resolution ──

fn resolve_match(t: &TomlMatch, tuning: Tuning) -> MatchConfig {
    let runner_count = (count("runner_count", t.runner_count.as_ref(), default_runner_count() as u32) as usize)
        .clamp(1, MAX_RUNNERS);

    let bot_runners = non_negative("bot_runners", t.bot_runners.as_ref(), default_bot_runners() as f64)
        .floor()
        .min(runner_count as f64) as usize;

    let speed = match t.speed.as_ref() {
        None => SpeedPreset::Medium,
        Some(v) => match as_text(v).and_then(SpeedPreset::from_name) {
            Some(p) => p,
            None => {
                warn!("config: speed = {v} is not a known preset; using medium");
                SpeedPreset::Medium
            }
        },
    };

    let recharge_policy = match t.recharge_policy.as_ref() {
        None => RechargePolicy::AllOrNothing,
        Some(v) => match as_text(v).and_then(RechargePolicy::from_name) {
            Some(p) => p,
            None => {
                warn!("config: recharge_policy = {v} is not known; using all-or-nothing");
                RechargePolicy::AllOrNothing
            }
        },
    };

    let seed = t.seed.as_ref().and_then(|v| match as_number(v) {
        Some(n) if n >= 0.0 => Some(n as u64),
        _ => {
            warn!("config: seed = {v} is not a non-negative integer; using a random seed");
            None
        }
    });

    let duration_mins = positive("duration_mins", t.duration_mins.as_ref(), default_duration_mins());

    MatchConfig {
        runner_count,
        bot_runners,
        lines_to_win: count("lines_to_win", t.lines_to_win.as_ref(), default_lines_to_win()),
        max_shots: count("max_shots", t.max_shots.as_ref(), default_max_shots()),
        recharge_ms: secs_to_ms(positive("recharge_secs", t.recharge_secs.as_ref(), default_recharge_secs())).max(1),
        recharge_policy,
        speed,
        match_duration_ms: ((duration_mins * 60_000.0).round() as u64).max(1),
        countdown_ms: secs_to_ms(non_negative("countdown_secs", t.countdown_secs.as_ref(), default_countdown_secs())),
        seed,
        tuning,
    }
}

fn resolve_tuning(t: &TomlTuning) -> Tuning {
    let factor = match t.speed_ramp_factor.as_ref() {
        None => default_speed_ramp_factor(),
        Some(v) => match as_number(v) {
            Some(n) if n > 0.0 && n <= 1.0 => n as f32,
            _ => {
                warn!("config: speed_ramp_factor = {v} is not in (0, 1]; using {}", default_speed_ramp_factor());
                default_speed_ramp_factor()
            }
        },
    };

    Tuning {
        cell_size: positive_f32("cell_size", t.cell_size.as_ref(), default_cell_size()),
        gravity: positive_f32("gravity", t.gravity.as_ref(), default_gravity()),
        jump_strength: positive_f32("jump_strength", t.jump_strength.as_ref(), default_jump_strength()),
        projectile_speed: positive_f32("projectile_speed", t.projectile_speed.as_ref(), default_projectile_speed()),
        move_repeat_ms: count("move_repeat_ms", t.move_repeat_ms.as_ref(), default_move_repeat_ms()),
        speed_ramp_ms: secs_to_ms(positive("speed_ramp_secs", t.speed_ramp_secs.as_ref(), default_speed_ramp_secs()))
            .max(1),
        speed_ramp_factor: factor,
        min_drop_interval_ms: count(
            "min_drop_interval_ms",
            t.min_drop_interval_ms.as_ref(),
            default_min_drop_interval_ms(),
        ),
        frame_ms: count("frame_ms", t.frame_ms.as_ref(), default_frame_ms()),
        shoot_digs_below: flag("shoot_digs_below", t.shoot_digs_below.as_ref(), false),
    }
}

// ── Loading ──

impl MatchConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/blockrunners`.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let toml_cfg = load_toml(&candidate_dirs());
        let tuning = resolve_tuning(&toml_cfg.tuning);
        resolve_match(&toml_cfg.match_, tuning)
    }

    /// Parse a config document. Bad values fall back per key; only a
    /// syntactically broken document is an error.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let toml_cfg: TomlConfig = toml::from_str(text)?;
        let tuning = resolve_tuning(&toml_cfg.tuning);
        Ok(resolve_match(&toml_cfg.match_, tuning))
    }

    /// Apply menu inputs on top of `self`. Blank fields keep the current
    /// value; invalid ones fall back to the documented default.
    pub fn from_form(&self, form: &FormValues) -> Self {
        let raw = |s: &str| (!s.trim().is_empty()).then(|| Value::String(s.trim().to_string()));
        let fields = TomlMatch {
            runner_count: raw(&form.runner_count),
            bot_runners: None,
            lines_to_win: raw(&form.lines_to_win),
            max_shots: raw(&form.max_shots),
            recharge_secs: raw(&form.recharge_secs),
            recharge_policy: None,
            speed: raw(&form.speed),
            duration_mins: raw(&form.duration_mins),
            countdown_secs: None,
            seed: None,
        };
        let parsed = resolve_match(&fields, self.tuning.clone());
        let runner_count = if fields.runner_count.is_some() { parsed.runner_count } else { self.runner_count };
        MatchConfig {
            runner_count,
            bot_runners: self.bot_runners.min(runner_count),
            lines_to_win: if fields.lines_to_win.is_some() { parsed.lines_to_win } else { self.lines_to_win },
            max_shots: if fields.max_shots.is_some() { parsed.max_shots } else { self.max_shots },
            recharge_ms: if fields.recharge_secs.is_some() { parsed.recharge_ms } else { self.recharge_ms },
            recharge_policy: self.recharge_policy,
            speed: if fields.speed.is_some() { parsed.speed } else { self.speed },
            match_duration_ms: if fields.duration_mins.is_some() {
                parsed.match_duration_ms
            } else {
                self.match_duration_ms
            },
            countdown_ms: self.countdown_ms,
            seed: self.seed,
            tuning: self.tuning.clone(),
        }
    }

    pub fn drop_interval_ms(&self) -> u32 {
        self.speed.drop_interval_ms()
    }

    pub fn physics(&self) -> Physics {
        Physics {
            cell: self.tuning.cell_size,
            gravity: self.tuning.gravity,
            jump_strength: self.tuning.jump_strength,
            projectile_speed: self.tuning.projectile_speed,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data home (deduplicated).
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

    // 3. ~/.local/share/blockrunners
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/blockrunners");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn read_config(path: &Path) -> Result<TomlConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str::<TomlConfig>(&text)?)
}

/// First readable config.toml in the candidate directories wins.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match read_config(&path) {
            Ok(cfg) => {
                info!("config: loaded {}", path.display());
                return cfg;
            }
            Err(e @ ConfigError::Parse(_)) => {
                warn!("{e}; using default settings");
                return TomlConfig::default();
            }
            Err(e) => warn!("{e}"),
        }
    }
    TomlConfig::default()
}
