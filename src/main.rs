/// Entry point and game loop.

mod ui;

use std::fs::File;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::{execute, terminal};
use log::{info, warn};

use blockrunners::config::{self, FormValues, MatchConfig};
use blockrunners::domain::{self, entity::MAX_RUNNERS};
use blockrunners::sim::{self, event::GameEvent, step, world::{Match, Phase}};

use ui::input::InputState;
use ui::renderer::{describe, Renderer};
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// How long a status-line message stays up.
const STATUS_MS: u32 = 3000;

const LOG_FILE: &str = "blockrunners.log";

fn main() {
    init_logging();
    let settings = MatchConfig::load();

    let mut m = Match::new(settings.clone());
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }
    let enhanced = enable_key_release();

    let sound = SoundEngine::new();
    if sound.is_none() {
        warn!("no audio output; continuing silently");
    }

    let result = game_loop(&mut m, settings, &mut renderer, sound.as_ref(), enhanced);

    if enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Block Runners!");
    if let Some(outcome) = m.outcome {
        println!("Last match: {outcome:?} ({:?} win), score {}", outcome.winner(), m.score);
    }
}

/// Logs go to a file: the terminal is in raw mode on the alternate screen.
fn init_logging() {
    let file = match File::create(LOG_FILE) {
        Ok(f) => f,
        Err(_) => return,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

/// Ask for Release events so several players can hold keys at once.
fn enable_key_release() -> bool {
    if !matches!(terminal::supports_keyboard_enhancement(), Ok(true)) {
        return false;
    }
    execute!(
        io::stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )
    .is_ok()
}

fn game_loop(
    m: &mut Match,
    mut settings: MatchConfig,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    honor_release: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = honor_release;
    let mut last_tick = Instant::now();
    let mut status = String::new();
    let mut status_left_ms: u32 = 0;
    let mut last_count: Option<u32> = None;

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() {
            break;
        }

        match handle_meta(m, &mut settings, &kb) {
            Meta::Quit => break,
            Meta::Started => {
                status.clear();
                last_count = None;
            }
            Meta::None => {}
        }

        let now = Instant::now();
        let delta_ms = u32::try_from(now.duration_since(last_tick).as_millis()).unwrap_or(u32::MAX);
        last_tick = now;

        let events = step::tick(m, delta_ms, &kb.intents());
        process_sound_events(sound, &events);

        if m.phase == Phase::Countdown {
            let secs = m.clock.countdown_left_ms.div_ceil(1000);
            if last_count != Some(secs) {
                if let Some(sfx) = sound {
                    sfx.play_tick(secs);
                }
                last_count = Some(secs);
            }
        }

        if let Some(text) = events.iter().rev().find_map(describe) {
            status = text;
            status_left_ms = STATUS_MS;
        } else if m.phase != Phase::Paused {
            status_left_ms = status_left_ms.saturating_sub(delta_ms);
            if status_left_ms == 0 {
                status.clear();
            }
        }

        renderer.render(&m.snapshot(), &settings, &status)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for event in events {
        match event {
            GameEvent::CountdownFinished => sfx.play_go(),
            GameEvent::ShotFired { .. } => sfx.play_shot(),
            GameEvent::BlockCellShot { .. } | GameEvent::GridCellShot { .. } => sfx.play_hit(),
            GameEvent::BlockSolidified { .. } => sfx.play_land(),
            GameEvent::LinesCleared { .. } => sfx.play_lines(),
            GameEvent::RunnerEliminated { .. } => sfx.play_eliminated(),
            GameEvent::BlockEscaped | GameEvent::BlockDestroyed => sfx.play_escape(),
            GameEvent::MatchEnded { .. } => sfx.play_end(),
            _ => {}
        }
    }
}

// ── Menu and meta keys ──

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_BOTS: &[KeyCode] = &[KeyCode::Char('b'), KeyCode::Char('B')];
const KEYS_SPEED: &[KeyCode] = &[KeyCode::Char('v'), KeyCode::Char('V')];

enum Meta {
    None,
    Started,
    Quit,
}

/// Keys that act outside the tick: menu choices, start, back, quit.
fn handle_meta(m: &mut Match, settings: &mut MatchConfig, kb: &InputState) -> Meta {
    let esc = kb.was_pressed(KeyCode::Esc);

    match m.phase {
        Phase::Menu => {
            if kb.any_pressed(KEYS_QUIT) {
                return Meta::Quit;
            }
            if kb.any_pressed(KEYS_CONFIRM) {
                m.init(settings.clone());
                return Meta::Started;
            }
            let presses = kb.raw_events.iter().filter(|k| k.kind == KeyEventKind::Press);
            for code in presses.map(|k| k.code) {
                if let Some(next) = menu_choice(settings, code) {
                    *settings = next;
                }
            }
        }
        Phase::GameOver => {
            if kb.any_pressed(KEYS_CONFIRM) {
                m.restart(settings.clone());
                return Meta::Started;
            }
            if esc {
                m.return_to_menu();
            }
        }
        Phase::Countdown | Phase::Running | Phase::Paused => {
            if esc {
                info!("match abandoned");
                m.return_to_menu();
            }
        }
    }
    Meta::None
}

/// Apply one menu key to the settings. Values go through the same
/// lenient form parsing a typed-in menu would use.
fn menu_choice(settings: &MatchConfig, code: KeyCode) -> Option<MatchConfig> {
    match code {
        KeyCode::Char(c @ '1'..='3') => {
            let form = FormValues { runner_count: c.to_string(), ..FormValues::default() };
            Some(settings.from_form(&form))
        }
        KeyCode::Char(c) if KEYS_SPEED.contains(&KeyCode::Char(c)) => {
            let form = FormValues { speed: settings.speed.cycle().name().to_string(), ..FormValues::default() };
            Some(settings.from_form(&form))
        }
        KeyCode::Char(c) if KEYS_BOTS.contains(&KeyCode::Char(c)) => {
            let limit = settings.runner_count.min(MAX_RUNNERS);
            let bot_runners = if settings.bot_runners >= limit { 0 } else { settings.bot_runners + 1 };
            Some(MatchConfig { bot_runners, ..settings.clone() })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockrunners::config::SpeedPreset;
    use blockrunners::sim::event::Outcome;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn pressed(code: KeyCode) -> InputState {
        let mut kb = InputState::new();
        kb.apply(KeyEvent::new(code, KeyModifiers::NONE), Instant::now());
        kb
    }

    #[test]
    fn enter_after_game_over_starts_fresh_match() {
        let mut settings = MatchConfig { seed: Some(9), ..MatchConfig::default() };
        let mut m = Match::new(settings.clone());
        m.init(settings.clone());
        m.score = 12;
        m.finish(Outcome::AllRunnersEliminated);
        assert!(matches!(handle_meta(&mut m, &mut settings, &pressed(KeyCode::Enter)), Meta::Started));
        assert_eq!(m.phase, Phase::Countdown);
        assert_eq!(m.outcome, None);
        assert_eq!(m.score, 0);
        assert_eq!(m.runners.len(), settings.runner_count);
    }

    #[test]
    fn esc_after_game_over_goes_to_menu() {
        let mut settings = MatchConfig::default();
        let mut m = Match::new(settings.clone());
        m.init(settings.clone());
        m.finish(Outcome::AllRunnersEliminated);
        assert!(matches!(handle_meta(&mut m, &mut settings, &pressed(KeyCode::Esc)), Meta::None));
        assert_eq!(m.phase, Phase::Menu);
    }

    #[test]
    fn digit_sets_runner_count() {
        let s = MatchConfig::default();
        let next = menu_choice(&s, KeyCode::Char('3')).map(|c| c.runner_count);
        assert_eq!(next, Some(3));
        assert!(menu_choice(&s, KeyCode::Char('4')).is_none());
    }

    #[test]
    fn speed_key_cycles_presets() {
        let s = MatchConfig { speed: SpeedPreset::Medium, ..MatchConfig::default() };
        let next = menu_choice(&s, KeyCode::Char('v')).map(|c| c.speed);
        assert_eq!(next, Some(SpeedPreset::Medium.cycle()));
    }

    #[test]
    fn bots_wrap_at_runner_count() {
        let s = MatchConfig { runner_count: 2, bot_runners: 2, ..MatchConfig::default() };
        assert_eq!(menu_choice(&s, KeyCode::Char('b')).map(|c| c.bot_runners), Some(0));
        let s = MatchConfig { runner_count: 2, bot_runners: 1, ..MatchConfig::default() };
        assert_eq!(menu_choice(&s, KeyCode::Char('B')).map(|c| c.bot_runners), Some(2));
    }

    #[test]
    fn fewer_runners_trims_bots() {
        let s = MatchConfig { runner_count: 3, bot_runners: 3, ..MatchConfig::default() };
        let next = menu_choice(&s, KeyCode::Char('1'));
        assert_eq!(next.map(|c| (c.runner_count, c.bot_runners)), Some((1, 1)));
    }
}
