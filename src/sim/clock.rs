/// Every time accumulator in a match, in one place.
///
/// The sim never reads wall-clock time: `step::tick` hands the clock a
/// delta in milliseconds and the clock answers "is X due?". That keeps
/// ticks deterministic and makes pausing trivial (no ticks, no time).
///
/// ┌──────────────┬──────────────────────────────┬──────────────────────┐
/// │ Accumulator  │ Fires                        │ Reset on fire        │
/// ├──────────────┼──────────────────────────────┼──────────────────────┤
/// │ drop         │ acc >= drop_interval         │ to 0                 │
/// │ move repeat  │ acc >= move_repeat           │ to 0                 │
/// │ frame        │ once per whole frame_ms      │ keeps the remainder  │
/// │ speed ramp   │ acc >= speed_ramp            │ keeps the remainder  │
/// │ match        │ counts down to 0, then stays │ never                │
/// │ countdown    │ counts down to 0, then stays │ never                │
/// └──────────────┴──────────────────────────────┴──────────────────────┘

use serde::Serialize;

use crate::config::MatchConfig;

/// Deltas above this are clamped (a stalled terminal, a debugger stop).
pub const MAX_DELTA_MS: u32 = 250;

/// Upper bound on physics frames per tick, so a clamped delta can't
/// turn into a burst of catch-up frames.
pub const MAX_FRAMES_PER_TICK: u32 = 16;

#[derive(Clone, Debug, Serialize)]
pub struct Clock {
    pub drop_interval_ms: u32,
    drop_acc_ms: u32,
    move_acc_ms: u32,
    frame_acc_ms: u32,
    ramp_acc_ms: u32,
    pub match_left_ms: u64,
    pub countdown_left_ms: u32,
    /// Total Running time.
    pub elapsed_ms: u64,
    rebaseline: bool,
}

impl Clock {
    pub fn new(cfg: &MatchConfig) -> Self {
        Clock {
            drop_interval_ms: cfg.drop_interval_ms(),
            drop_acc_ms: 0,
            move_acc_ms: 0,
            frame_acc_ms: 0,
            ramp_acc_ms: 0,
            match_left_ms: cfg.match_duration_ms,
            countdown_left_ms: cfg.countdown_ms,
            elapsed_ms: 0,
            rebaseline: false,
        }
    }

    /// Sanitise an incoming delta. After `rebaseline` the next delta is
    /// dropped entirely: it spans the pause, not play.
    pub fn take_delta(&mut self, delta_ms: u32) -> u32 {
        if self.rebaseline {
            self.rebaseline = false;
            return 0;
        }
        delta_ms.min(MAX_DELTA_MS)
    }

    pub fn rebaseline(&mut self) {
        self.rebaseline = true;
    }

    pub fn drop_due(&mut self, dt: u32) -> bool {
        self.drop_acc_ms += dt;
        if self.drop_acc_ms >= self.drop_interval_ms {
            self.drop_acc_ms = 0;
            return true;
        }
        false
    }

    pub fn move_due(&mut self, dt: u32, repeat_ms: u32) -> bool {
        self.move_acc_ms += dt;
        if self.move_acc_ms >= repeat_ms {
            self.move_acc_ms = 0;
            return true;
        }
        false
    }

    /// Whole physics frames elapsed; the remainder carries over.
    pub fn physics_frames(&mut self, dt: u32, frame_ms: u32) -> u32 {
        let frame_ms = frame_ms.max(1);
        self.frame_acc_ms += dt;
        let frames = self.frame_acc_ms / frame_ms;
        self.frame_acc_ms %= frame_ms;
        frames.min(MAX_FRAMES_PER_TICK)
    }

    /// Advance the speed ramp. Returns the new drop interval when it changes.
    pub fn ramp(&mut self, dt: u32, ramp_ms: u32, factor: f32, min_interval_ms: u32) -> Option<u32> {
        self.elapsed_ms += u64::from(dt);
        self.ramp_acc_ms += dt;
        let ramp_ms = ramp_ms.max(1);
        let mut changed = None;
        while self.ramp_acc_ms >= ramp_ms {
            self.ramp_acc_ms -= ramp_ms;
            let next = ((self.drop_interval_ms as f32 * factor).round() as u32).max(min_interval_ms);
            if next != self.drop_interval_ms {
                self.drop_interval_ms = next;
                changed = Some(next);
            }
        }
        changed
    }

    /// Count the match timer down. True once it has hit zero.
    pub fn run_match_timer(&mut self, dt: u32) -> bool {
        self.match_left_ms = self.match_left_ms.saturating_sub(u64::from(dt));
        self.match_left_ms == 0
    }

    /// Count the pre-match countdown down. True once it has hit zero.
    pub fn run_countdown(&mut self, dt: u32) -> bool {
        self.countdown_left_ms = self.countdown_left_ms.saturating_sub(dt);
        self.countdown_left_ms == 0
    }
}
