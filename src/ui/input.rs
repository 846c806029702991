/// Keyboard state and the key → intent mapping.
///
/// Held keys drive continuous actions (block shift, soft drop, runner
/// walk); fresh presses drive one-shot actions (rotate, jump, shoot).
///
/// ┌────────────┬──────────┬─────────┬────────┬─────────┐
/// │ Seat       │ Left     │ Right   │ Jump   │ Shoot   │
/// ├────────────┼──────────┼─────────┼────────┼─────────┤
/// │ Runner 1   │ ←        │ →       │ ↑      │ ↓       │
/// │ Runner 2   │ F        │ H       │ T      │ G       │
/// │ Runner 3   │ J        │ L       │ I      │ K       │
/// └────────────┴──────────┴─────────┴────────┴─────────┘
///
/// The controller uses A/D to shift, W to rotate and S to soft-drop.
/// P toggles pause.
///
/// Release events are honoured when the terminal reports them;
/// otherwise a key counts as released `HOLD_TIMEOUT` after its last
/// Press/Repeat.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::{ControllerIntent, Intents, RunnerIntent, MAX_RUNNERS};

/// After this duration without a Press/Repeat event, consider the key released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

// ── Bindings ──

pub const KEYS_CTRL_LEFT: &[KeyCode] = &[KeyCode::Char('a'), KeyCode::Char('A')];
pub const KEYS_CTRL_RIGHT: &[KeyCode] = &[KeyCode::Char('d'), KeyCode::Char('D')];
pub const KEYS_CTRL_ROTATE: &[KeyCode] = &[KeyCode::Char('w'), KeyCode::Char('W')];
pub const KEYS_CTRL_DROP: &[KeyCode] = &[KeyCode::Char('s'), KeyCode::Char('S')];
pub const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P')];

/// Left, right, jump, shoot for one runner seat.
pub struct RunnerKeys {
    pub left: &'static [KeyCode],
    pub right: &'static [KeyCode],
    pub jump: &'static [KeyCode],
    pub shoot: &'static [KeyCode],
}

pub const RUNNER_KEYS: [RunnerKeys; MAX_RUNNERS] = [
    RunnerKeys {
        left: &[KeyCode::Left],
        right: &[KeyCode::Right],
        jump: &[KeyCode::Up],
        shoot: &[KeyCode::Down],
    },
    RunnerKeys {
        left: &[KeyCode::Char('f'), KeyCode::Char('F')],
        right: &[KeyCode::Char('h'), KeyCode::Char('H')],
        jump: &[KeyCode::Char('t'), KeyCode::Char('T')],
        shoot: &[KeyCode::Char('g'), KeyCode::Char('G')],
    },
    RunnerKeys {
        left: &[KeyCode::Char('j'), KeyCode::Char('J')],
        right: &[KeyCode::Char('l'), KeyCode::Char('L')],
        jump: &[KeyCode::Char('i'), KeyCode::Char('I')],
        shoot: &[KeyCode::Char('k'), KeyCode::Char('K')],
    },
];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most
    /// recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for menu/meta handling.
    pub raw_events: Vec<KeyEvent>,

    /// Only true when keyboard enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(32),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call once per frame, before the simulation tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                self.apply(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    pub(crate) fn apply(&mut self, key: KeyEvent, now: Instant) {
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Release without confirmed enhancement: rely on the timeout.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Freshly pressed this frame (edge trigger).
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Snapshot the keyboard as per-seat intents for one tick.
    pub fn intents(&self) -> Intents {
        let controller = ControllerIntent {
            left: self.any_held(KEYS_CTRL_LEFT),
            right: self.any_held(KEYS_CTRL_RIGHT),
            soft_drop: self.any_held(KEYS_CTRL_DROP),
            rotate: self.any_pressed(KEYS_CTRL_ROTATE),
        };
        let mut runners = [RunnerIntent::default(); MAX_RUNNERS];
        for (intent, keys) in runners.iter_mut().zip(RUNNER_KEYS.iter()) {
            *intent = RunnerIntent {
                left: self.any_held(keys.left),
                right: self.any_held(keys.right),
                jump: self.any_pressed(keys.jump),
                shoot: self.any_pressed(keys.shoot),
            };
        }
        Intents {
            controller,
            runners,
            toggle_pause: self.any_pressed(KEYS_PAUSE),
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
