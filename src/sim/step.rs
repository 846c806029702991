/// The tick function: advances a match by one frame's worth of time.
///
/// Processing order (Running only):
///   1. Auto-drop timer → block descends (crush) or solidifies
///   2. Input: rotate (edge), held moves on the repeat timer
///      (controller shift / soft drop, then runners), jump and shoot (edge)
///   3. Runner gravity frames: head strike, landing, fell-out
///   4. Projectile frames: flight and impact
///   5. Ammo recharge timers
///   6. Speed ramp and match timer, then win evaluation
///
/// As soon as a terminal condition is pending (line quota reached, every
/// runner eliminated, block escaped) the remaining stages are skipped and
/// the tick goes straight to evaluation.
///
/// Win precedence, first match wins:
/// ┌───┬──────────────────────────┬────────────┐
/// │ # │ Condition                 │ Winner     │
/// ├───┼──────────────────────────┼────────────┤
/// │ 1 │ lines_remaining == 0      │ Controller │
/// │ 2 │ no active runners         │ Controller │
/// │ 3 │ block escaped on solidify │ Runners    │
/// │ 4 │ match timer at zero       │ Runners    │
/// └───┴──────────────────────────┴────────────┘

use log::info;

use crate::domain::ai;
use crate::domain::entity::{Intents, MAX_RUNNERS};
use crate::domain::grid::COLS;
use super::event::{GameEvent, Outcome};
use super::resolve;
use super::world::{Match, Phase};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn tick(m: &mut Match, delta_ms: u32, intents: &Intents) -> Vec<GameEvent> {
    let mut events: Vec<GameEvent> = Vec::new();

    if intents.toggle_pause {
        if m.pause() {
            events.push(GameEvent::Paused);
            return events;
        }
        if m.resume() {
            events.push(GameEvent::Resumed);
            return events;
        }
    }

    match m.phase {
        Phase::Countdown => {
            let dt = m.clock.take_delta(delta_ms);
            if m.clock.run_countdown(dt) {
                m.phase = Phase::Running;
                info!("countdown finished");
                events.push(GameEvent::CountdownFinished);
            }
            return events;
        }
        Phase::Running => {}
        Phase::Menu | Phase::Paused | Phase::GameOver => return events,
    }

    let dt = m.clock.take_delta(delta_ms);
    m.tick += 1;
    let intents = with_bot_intents(m, intents);
    let frames = m.clock.physics_frames(dt, m.config.tuning.frame_ms);

    resolve_drop(m, dt, &mut events);
    if !halted(m) { resolve_input(m, dt, &intents, &mut events); }
    for _ in 0..frames {
        if halted(m) { break; }
        resolve::runner_frame(m, &mut events);
    }
    for _ in 0..frames {
        if halted(m) { break; }
        resolve::projectile_frame(m, &mut events);
    }
    if !halted(m) { resolve::recharge(m, dt, &mut events); }
    if !halted(m) { resolve_timers(m, dt, &mut events); }
    resolve_win(m, &mut events);

    events
}

fn halted(m: &Match) -> bool {
    m.pending_outcome().is_some()
}

// ══════════════════════════════════════════════════════════════
// Bots
// ══════════════════════════════════════════════════════════════

/// Replace the intents of bot-driven runners with the bot's choice.
fn with_bot_intents(m: &Match, intents: &Intents) -> Intents {
    let mut out = *intents;
    for (i, r) in m.runners.iter().enumerate().take(MAX_RUNNERS) {
        if !r.bot {
            continue;
        }
        let in_flight = m.projectiles.iter().any(|p| p.owner == i);
        let home = COLS as i32 / 2 - 2 + 2 * i as i32;
        out.runners[i] = ai::decide(&m.grid, &m.block, r, home, in_flight, m.phys.cell);
    }
    out
}

// ══════════════════════════════════════════════════════════════
// Stages
// ══════════════════════════════════════════════════════════════

fn resolve_drop(m: &mut Match, dt: u32, events: &mut Vec<GameEvent>) {
    if m.clock.drop_due(dt) {
        resolve::drop_block(m, events);
    }
}

fn resolve_input(m: &mut Match, dt: u32, intents: &Intents, events: &mut Vec<GameEvent>) {
    let c = intents.controller;
    if c.rotate {
        resolve::rotate_block(m, events);
    }

    let runner_count = m.runners.len().min(MAX_RUNNERS);

    // ── held: repeat timer ──
    if m.clock.move_due(dt, m.config.tuning.move_repeat_ms) {
        if c.left {
            resolve::shift_block(m, -1, events);
        }
        if c.right && !halted(m) {
            resolve::shift_block(m, 1, events);
        }
        if c.soft_drop && !halted(m) {
            resolve::drop_block(m, events);
        }
        if halted(m) {
            return;
        }
        for i in 0..runner_count {
            let r = intents.runners[i];
            if r.left {
                resolve::move_runner(m, i, -1, events);
            }
            if r.right {
                resolve::move_runner(m, i, 1, events);
            }
        }
    }

    // ── edge ──
    for i in 0..runner_count {
        let r = intents.runners[i];
        if r.jump {
            resolve::jump(m, i, events);
        }
        if r.shoot {
            resolve::shoot(m, i, events);
        }
    }
}

fn resolve_timers(m: &mut Match, dt: u32, events: &mut Vec<GameEvent>) {
    let t = &m.config.tuning;
    if let Some(ms) = m.clock.ramp(dt, t.speed_ramp_ms, t.speed_ramp_factor, t.min_drop_interval_ms) {
        info!("speed up: drop interval {ms} ms");
        events.push(GameEvent::SpeedIncreased { drop_interval_ms: ms });
    }
    m.clock.run_match_timer(dt);
}

fn resolve_win(m: &mut Match, events: &mut Vec<GameEvent>) {
    let outcome = m
        .pending_outcome()
        .or_else(|| (m.clock.match_left_ms == 0).then_some(Outcome::TimeExpired));
    if let Some(outcome) = outcome {
        m.finish(outcome);
        events.push(GameEvent::MatchEnded { outcome });
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchConfig;
    use crate::domain::cell::ShapeKind;
    use crate::domain::entity::{Block, ControllerIntent, RunnerIntent};
    use crate::domain::grid::tests::grid_from;
    use crate::domain::shape::Shape;
    use crate::sim::event::{EliminationCause, Side};

    const CELL: f32 = 30.0;
    const FRAME: u32 = 16;

    fn cfg(runners: usize) -> MatchConfig {
        MatchConfig { runner_count: runners, seed: Some(11), countdown_ms: 0, ..MatchConfig::default() }
    }

    fn running(c: MatchConfig) -> Match {
        let mut m = Match::new(c.clone());
        m.init(c);
        assert_eq!(m.phase, Phase::Running);
        m
    }

    fn place_block(m: &mut Match, rows: &[&str], x: i32, y: i32) {
        m.block = Block { kind: ShapeKind::L, shape: Shape::from_rows(rows), x, y };
    }

    fn put_runner(m: &mut Match, i: usize, col: i32, row: i32, standing: bool) {
        let r = &mut m.runners[i];
        r.set_col(col, CELL);
        r.y = row as f32 * CELL;
        r.standing = standing;
        r.velocity_y = 0.0;
    }

    fn idle() -> Intents {
        Intents::default()
    }

    /// One tick in which the auto-drop fires and nothing else has time to.
    fn drop_now(m: &mut Match) -> Vec<GameEvent> {
        m.clock.drop_interval_ms = 1;
        tick(m, 1, &idle())
    }

    #[test]
    fn countdown_then_running() {
        let c = MatchConfig { countdown_ms: 100, ..cfg(1) };
        let mut m = Match::new(c.clone());
        m.init(c);
        assert_eq!(m.phase, Phase::Countdown);
        assert!(tick(&mut m, 60, &idle()).is_empty());
        assert_eq!(tick(&mut m, 60, &idle()), vec![GameEvent::CountdownFinished]);
        assert_eq!(m.phase, Phase::Running);
    }

    #[test]
    fn menu_ticks_do_nothing() {
        let mut m = Match::new(cfg(1));
        assert!(tick(&mut m, 16, &idle()).is_empty());
        assert_eq!(m.tick, 0);
    }

    #[test]
    fn standing_runner_crushed_ends_match_for_controller() {
        let mut m = running(cfg(1));
        place_block(&mut m, &["...", "###", "..."], 3, 17);
        put_runner(&mut m, 0, 4, 19, true);
        let ev = drop_now(&mut m);
        assert!(ev.contains(&GameEvent::RunnerEliminated { runner: 0, cause: EliminationCause::Crushed }));
        assert_eq!(m.phase, Phase::GameOver);
        assert_eq!(m.outcome, Some(Outcome::AllRunnersEliminated));
        assert_eq!(m.outcome.map(Outcome::winner), Some(Side::Controller));
    }

    #[test]
    fn crush_with_survivor_keeps_running() {
        let mut m = running(cfg(2));
        place_block(&mut m, &["...", "###", "..."], 3, 17);
        put_runner(&mut m, 0, 4, 19, true);
        put_runner(&mut m, 1, 8, 19, true);
        drop_now(&mut m);
        assert!(m.runners[0].eliminated);
        assert_eq!(m.phase, Phase::Running);
        assert_eq!(m.block.y, 18);
    }

    #[test]
    fn elimination_beats_timer_in_same_tick() {
        let mut m = running(cfg(1));
        place_block(&mut m, &["...", "###", "..."], 3, 17);
        put_runner(&mut m, 0, 4, 19, true);
        m.clock.match_left_ms = 1;
        drop_now(&mut m);
        assert_eq!(m.outcome, Some(Outcome::AllRunnersEliminated));
    }

    #[test]
    fn line_quota_beats_elimination_in_same_tick() {
        let mut m = running(MatchConfig { lines_to_win: 1, ..cfg(1) });
        m.grid = grid_from(&["####..####"]);
        place_block(&mut m, &["##"], 4, 19);
        // airborne inside the footprint: buried on solidify
        put_runner(&mut m, 0, 4, 19, false);
        drop_now(&mut m);
        assert!(m.runners[0].eliminated);
        assert_eq!(m.lines_remaining, 0);
        assert_eq!(m.outcome, Some(Outcome::LineQuotaReached));
    }

    #[test]
    fn escaped_block_gives_runners_the_win() {
        let mut m = running(cfg(1));
        m.grid = grid_from(&["....#....."; 20]);
        place_block(&mut m, &["##", "##"], 4, -2);
        put_runner(&mut m, 0, 0, 19, true);
        drop_now(&mut m);
        assert_eq!(m.outcome, Some(Outcome::BlockEscaped));
        assert_eq!(m.outcome.map(Outcome::winner), Some(Side::Runners));
    }

    #[test]
    fn timer_expiry_gives_runners_the_win() {
        let mut m = running(cfg(1));
        m.clock.match_left_ms = 10;
        let ev = tick(&mut m, FRAME, &idle());
        assert_eq!(m.outcome, Some(Outcome::TimeExpired));
        assert_eq!(ev.last(), Some(&GameEvent::MatchEnded { outcome: Outcome::TimeExpired }));
    }

    #[test]
    fn pause_freezes_timers_and_resume_rebaselines() {
        let mut m = running(cfg(1));
        let toggle = Intents { toggle_pause: true, ..idle() };
        assert_eq!(tick(&mut m, FRAME, &toggle), vec![GameEvent::Paused]);
        let before = m.clock.match_left_ms;
        tick(&mut m, 200, &idle());
        assert_eq!(m.clock.match_left_ms, before);
        assert_eq!(tick(&mut m, FRAME, &toggle), vec![GameEvent::Resumed]);
        // the wall-clock gap across the pause is discarded
        tick(&mut m, 60_000, &idle());
        assert_eq!(m.clock.match_left_ms, before);
        tick(&mut m, FRAME, &idle());
        assert_eq!(m.clock.match_left_ms, before - u64::from(FRAME));
    }

    #[test]
    fn huge_delta_is_clamped() {
        let mut m = running(cfg(1));
        let before = m.clock.match_left_ms;
        tick(&mut m, 10_000, &idle());
        assert_eq!(m.clock.match_left_ms, before - 250);
    }

    #[test]
    fn speed_ramp_emits_event() {
        let mut c = cfg(1);
        c.tuning.speed_ramp_ms = 200;
        let mut m = running(c);
        let ev = tick(&mut m, 200, &idle());
        assert!(ev.contains(&GameEvent::SpeedIncreased { drop_interval_ms: 350 }));
        assert_eq!(m.snapshot().drop_interval_ms, 350);
    }

    #[test]
    fn controller_moves_on_repeat_timer() {
        let mut m = running(cfg(1));
        place_block(&mut m, &["##", "##"], 4, 5);
        let left = Intents { controller: ControllerIntent { left: true, ..Default::default() }, ..idle() };
        tick(&mut m, 30, &left);
        assert_eq!(m.block.x, 4);
        tick(&mut m, 20, &left);
        assert_eq!(m.block.x, 3);
    }

    #[test]
    fn shot_destroys_last_cell_and_respawns_in_one_tick() {
        let mut m = running(cfg(1));
        place_block(&mut m, &["#"], 4, 18);
        put_runner(&mut m, 0, 4, 19, true);
        let next = m.next_kind;
        let mut shoot = idle();
        shoot.runners[0] = RunnerIntent { shoot: true, ..Default::default() };
        let ev = tick(&mut m, FRAME, &shoot);
        assert!(ev.contains(&GameEvent::BlockDestroyed));
        assert_eq!(m.block.kind, next);
        assert_eq!(m.score, 1);
        assert_eq!(m.runners[0].shots_remaining, 6);
    }

    #[test]
    fn jump_and_land_back_on_floor() {
        let mut m = running(cfg(1));
        let mut jump = idle();
        jump.runners[0] = RunnerIntent { jump: true, ..Default::default() };
        tick(&mut m, FRAME, &jump);
        assert!(!m.runners[0].standing);
        for _ in 0..60 {
            tick(&mut m, FRAME, &idle());
        }
        assert!(m.runners[0].standing);
        assert_eq!(m.runners[0].y, 570.0);
    }

    #[test]
    fn bot_flees_and_fires() {
        let mut m = running(MatchConfig { bot_runners: 1, ..cfg(1) });
        assert!(m.runners[0].bot);
        place_block(&mut m, &["##", "##"], 4, 12);
        put_runner(&mut m, 0, 4, 19, true);
        let ev = tick(&mut m, 50, &idle());
        assert_eq!(m.runners[0].col, 3);
        assert!(ev.iter().any(|e| matches!(e, GameEvent::ShotFired { runner: 0, .. })));
    }

    #[test]
    fn game_over_is_frozen() {
        let mut m = running(cfg(1));
        m.clock.match_left_ms = 1;
        tick(&mut m, FRAME, &idle());
        assert_eq!(m.phase, Phase::GameOver);
        let snapshot_tick = m.tick;
        assert!(tick(&mut m, FRAME, &idle()).is_empty());
        assert_eq!(m.tick, snapshot_tick);
    }
}
