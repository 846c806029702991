/// Match: the complete state of one game, owned by the tick loop.
///
/// ## Ownership
///
/// Grid, Block, Runners and Projectiles all live here and nowhere else.
/// `step::tick` is the only mutator during play; the renderer gets an
/// owned `Snapshot` and cannot reach back in.
///
/// ## Phases
///
/// ```text
///   Menu ──init──▶ Countdown ──▶ Running ⇄ Paused
///                                   │
///                                   ▼
///   Menu ◀──return_to_menu── GameOver
/// ```
///
/// `return_to_menu` is valid from any phase and drops every timer and
/// entity, so nothing from a torn-down match can fire later.

use log::info;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::config::MatchConfig;
use crate::domain::cell::ShapeKind;
use crate::domain::entity::{Block, Projectile, Runner};
use crate::domain::grid::{Grid, COLS};
use crate::domain::physics::Physics;
use crate::domain::shape::random_kind;
use super::clock::Clock;
use super::event::Outcome;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Phase {
    Menu,
    Countdown,
    Running,
    Paused,
    GameOver,
}

pub struct Match {
    pub config: MatchConfig,
    pub phys: Physics,

    // ── Entities ──
    pub grid: Grid,
    pub block: Block,
    pub next_kind: ShapeKind,
    pub runners: Vec<Runner>,
    pub projectiles: Vec<Projectile>,

    // ── Tracking ──
    pub phase: Phase,
    pub outcome: Option<Outcome>,
    pub score: u32,
    pub lines_cleared: u32,
    pub lines_remaining: u32,
    /// Set by a solidify that would have written outside the grid.
    pub escaped: bool,

    // ── Time ──
    pub clock: Clock,
    pub tick: u64,

    rng: Pcg32,
    next_projectile_id: u64,
}

/// Read-only copy of everything a renderer needs.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub outcome: Option<Outcome>,
    pub grid: Grid,
    /// `None` outside of a match.
    pub block: Option<Block>,
    pub next_kind: ShapeKind,
    pub runners: Vec<Runner>,
    pub projectiles: Vec<Projectile>,
    pub score: u32,
    pub lines_cleared: u32,
    pub lines_remaining: u32,
    pub time_left_ms: u64,
    pub countdown_left_ms: u32,
    pub drop_interval_ms: u32,
    pub max_shots: u32,
    pub recharge_ms: u32,
    pub cell_size: f32,
}

// ── Construction ──

impl Match {
    /// An idle match sitting in the menu.
    pub fn new(config: MatchConfig) -> Self {
        let mut rng = Pcg32::seed_from_u64(config.seed.unwrap_or(0));
        let next_kind = random_kind(&mut rng);
        Match {
            phys: config.physics(),
            clock: Clock::new(&config),
            lines_remaining: config.lines_to_win,
            config,
            grid: Grid::new(),
            block: Block::spawn(next_kind),
            next_kind,
            runners: vec![],
            projectiles: vec![],
            phase: Phase::Menu,
            outcome: None,
            score: 0,
            lines_cleared: 0,
            escaped: false,
            tick: 0,
            rng,
            next_projectile_id: 0,
        }
    }

    /// Reset everything and start a new match (countdown first).
    pub fn init(&mut self, config: MatchConfig) {
        let seed = config.seed.unwrap_or_else(rand::random);
        self.rng = Pcg32::seed_from_u64(seed);
        self.phys = config.physics();
        self.clock = Clock::new(&config);
        self.grid = Grid::new();
        self.projectiles.clear();
        self.next_projectile_id = 0;
        self.score = 0;
        self.lines_cleared = 0;
        self.lines_remaining = config.lines_to_win;
        self.escaped = false;
        self.outcome = None;
        self.tick = 0;

        let floor = self.phys.floor_px();
        let cell = self.phys.cell;
        let first_bot = config.runner_count - config.bot_runners.min(config.runner_count);
        self.runners = (0..config.runner_count)
            .map(|i| {
                let col = COLS as i32 / 2 - 2 + 2 * i as i32;
                let mut r = Runner::new(i, col, cell, floor, config.max_shots);
                r.standing = true;
                r.bot = i >= first_bot;
                r
            })
            .collect();

        self.next_kind = random_kind(&mut self.rng);
        self.spawn_block();

        self.phase = if config.countdown_ms == 0 { Phase::Running } else { Phase::Countdown };
        info!(
            "match start: {} runner(s), {} bot(s), {} lines to win, speed {}, seed {seed}",
            config.runner_count,
            config.bot_runners,
            config.lines_to_win,
            config.speed.name()
        );
        self.config = config;
    }
}

// ── Phase control ──

impl Match {
    pub fn pause(&mut self) -> bool {
        if self.phase != Phase::Running {
            return false;
        }
        self.phase = Phase::Paused;
        info!("paused");
        true
    }

    /// Back to Running. The next tick's delta is discarded so the time
    /// spent paused never reaches the timers.
    pub fn resume(&mut self) -> bool {
        if self.phase != Phase::Paused {
            return false;
        }
        self.phase = Phase::Running;
        self.clock.rebaseline();
        info!("resumed");
        true
    }

    pub fn return_to_menu(&mut self) {
        self.phase = Phase::Menu;
        self.outcome = None;
        self.runners.clear();
        self.projectiles.clear();
        self.grid = Grid::new();
        self.clock = Clock::new(&self.config);
        self.escaped = false;
        info!("back to menu");
    }

    /// Game over straight into a new match, by way of the menu.
    pub fn restart(&mut self, config: MatchConfig) {
        self.return_to_menu();
        self.init(config);
    }

    pub fn finish(&mut self, outcome: Outcome) {
        self.phase = Phase::GameOver;
        self.outcome = Some(outcome);
        info!(
            "match end: {outcome:?} ({:?} win), score {}, lines {}",
            outcome.winner(),
            self.score,
            self.lines_cleared
        );
    }
}

// ── Helpers used by the resolver ──

impl Match {
    /// Promote the preview piece and draw a new preview.
    pub fn spawn_block(&mut self) -> ShapeKind {
        let kind = self.next_kind;
        self.block = Block::spawn(kind);
        self.next_kind = random_kind(&mut self.rng);
        kind
    }

    pub fn alloc_projectile_id(&mut self) -> u64 {
        self.next_projectile_id += 1;
        self.next_projectile_id
    }

    pub fn active_runners(&self) -> usize {
        self.runners.iter().filter(|r| r.is_active()).count()
    }

    /// A terminal condition that arose mid-tick (everything but the timer),
    /// in precedence order.
    pub fn pending_outcome(&self) -> Option<Outcome> {
        if self.lines_remaining == 0 {
            Some(Outcome::LineQuotaReached)
        } else if self.active_runners() == 0 {
            Some(Outcome::AllRunnersEliminated)
        } else if self.escaped {
            Some(Outcome::BlockEscaped)
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let in_match = self.phase != Phase::Menu;
        Snapshot {
            phase: self.phase,
            outcome: self.outcome,
            grid: self.grid.clone(),
            block: in_match.then(|| self.block.clone()),
            next_kind: self.next_kind,
            runners: self.runners.clone(),
            projectiles: self.projectiles.clone(),
            score: self.score,
            lines_cleared: self.lines_cleared,
            lines_remaining: self.lines_remaining,
            time_left_ms: self.clock.match_left_ms,
            countdown_left_ms: self.clock.countdown_left_ms,
            drop_interval_ms: self.clock.drop_interval_ms,
            max_shots: self.config.max_shots,
            recharge_ms: self.config.recharge_ms,
            cell_size: self.phys.cell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(runners: usize) -> MatchConfig {
        MatchConfig { runner_count: runners, seed: Some(1), ..MatchConfig::default() }
    }

    #[test]
    fn new_match_waits_in_menu() {
        let m = Match::new(cfg(1));
        assert_eq!(m.phase, Phase::Menu);
        assert!(m.runners.is_empty());
        assert!(m.snapshot().block.is_none());
    }

    #[test]
    fn restart_after_game_over_resets_match() {
        let mut m = Match::new(cfg(2));
        m.init(cfg(2));
        m.score = 40;
        m.grid.occupy(19, 0, ShapeKind::I);
        m.runners[1].eliminate();
        m.finish(Outcome::BlockEscaped);
        m.restart(cfg(2));
        assert_eq!(m.phase, Phase::Countdown);
        assert_eq!(m.outcome, None);
        assert_eq!(m.score, 0);
        assert_eq!(m.grid.occupied_count(), 0);
        assert!(m.runners.iter().all(|r| !r.eliminated));
    }

    #[test]
    fn snapshot_serialises_match_state() {
        let mut m = Match::new(cfg(1));
        m.init(cfg(1));
        m.grid.occupy(19, 2, ShapeKind::Z);
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["phase"], "Countdown");
        assert_eq!(json["outcome"], serde_json::Value::Null);
        assert_eq!(json["lines_remaining"], 5);
        assert_eq!(json["runners"][0]["shots_remaining"], 7);
        assert_eq!(json["grid"]["cells"][19][2]["Filled"], "Z");
        assert_eq!(json["grid"]["cells"][0][0], "Empty");
        assert!(json["block"].is_object());
    }

    #[test]
    fn init_places_runners_on_floor() {
        let mut m = Match::new(cfg(3));
        m.init(cfg(3));
        assert_eq!(m.phase, Phase::Countdown);
        let cols: Vec<i32> = m.runners.iter().map(|r| r.col).collect();
        assert_eq!(cols, vec![3, 5, 7]);
        for r in &m.runners {
            assert_eq!(r.y, 570.0);
            assert_eq!(r.x, r.col as f32 * 30.0);
            assert_eq!(r.shots_remaining, 7);
            assert!(r.standing);
        }
        assert_eq!(m.lines_remaining, 5);
        assert!(m.block.y < 0);
    }

    #[test]
    fn last_runners_are_bots() {
        let mut m = Match::new(cfg(3));
        m.init(MatchConfig { bot_runners: 2, ..cfg(3) });
        let bots: Vec<bool> = m.runners.iter().map(|r| r.bot).collect();
        assert_eq!(bots, vec![false, true, true]);
    }

    #[test]
    fn seeded_piece_sequence_repeats() {
        let mut a = Match::new(cfg(1));
        let mut b = Match::new(cfg(1));
        a.init(cfg(1));
        b.init(cfg(1));
        for _ in 0..10 {
            assert_eq!(a.spawn_block(), b.spawn_block());
        }
    }

    #[test]
    fn pause_only_from_running() {
        let mut m = Match::new(cfg(1));
        m.init(cfg(1));
        assert!(!m.pause()); // still counting down
        m.phase = Phase::Running;
        assert!(m.pause());
        assert_eq!(m.phase, Phase::Paused);
        assert!(!m.pause());
        assert!(m.resume());
        assert_eq!(m.phase, Phase::Running);
        assert_eq!(m.clock.take_delta(5_000), 0);
    }

    #[test]
    fn return_to_menu_drops_everything() {
        let mut m = Match::new(cfg(2));
        m.init(cfg(2));
        m.phase = Phase::Running;
        m.clock.match_left_ms = 10;
        m.return_to_menu();
        assert_eq!(m.phase, Phase::Menu);
        assert!(m.runners.is_empty());
        assert!(m.projectiles.is_empty());
        assert_eq!(m.clock.match_left_ms, m.config.match_duration_ms);
    }

    #[test]
    fn pending_outcome_precedence() {
        let mut m = Match::new(cfg(1));
        m.init(cfg(1));
        assert_eq!(m.pending_outcome(), None);
        m.escaped = true;
        assert_eq!(m.pending_outcome(), Some(Outcome::BlockEscaped));
        m.runners[0].eliminate();
        assert_eq!(m.pending_outcome(), Some(Outcome::AllRunnersEliminated));
        m.lines_remaining = 0;
        assert_eq!(m.pending_outcome(), Some(Outcome::LineQuotaReached));
    }
}
