/// Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use tracing::{error, info};

use config::GameConfig;
use domain::controls::Key;
use sim::level::LevelDef;
use sim::session::Session;
use ui::gamepad::GamepadState;
use ui::input::{KeyTransitions, KeyboardState};
use ui::renderer::{self, Renderer};
use ui::sound::{process_sound_events, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    // Leave the alternate screen before the panic is reported
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        renderer::restore_terminal();
        default_hook(info);
    }));

    let config = GameConfig::load();

    let def = match &config.level_file {
        Some(path) => match LevelDef::from_file(path) {
            Ok(def) => def,
            Err(e) => {
                error!(error = %e, "could not load level");
                return Err(e.into());
            }
        },
        None => LevelDef::embedded(),
    };
    info!(level = %def.name, "starting");

    let mut session = Session::new(def, config.physics.clone(), config.rules.clone());
    let mut renderer = Renderer::new();

    let honor_release = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            error!(error = %e, "terminal init failed");
            let _ = renderer.cleanup();
            return Err(e.into());
        }
    };

    let sound = SoundEngine::new();

    let result = game_loop(&mut session, &mut renderer, &sound, &config, honor_release);

    if let Err(e) = renderer.cleanup() {
        error!(error = %e, "terminal cleanup failed");
    }

    if let Err(e) = &result {
        error!(error = %e, "game loop aborted");
    }

    info!(score = session.score, outcome = ?session.outcome, "exiting");
    println!();
    println!("Thanks for playing Jump It!");
    println!("Final Score: {}", session.score);

    result
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: &Option<SoundEngine>,
    config: &GameConfig,
    honor_release: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = KeyboardState::new(honor_release);
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut transitions = KeyTransitions::new();

    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.quit_pressed() || gp.quit_pressed() {
            break;
        }

        let held = |key: Key| kb.key_held(key) || gp.key_held(key);
        for (key, down) in transitions.update(held) {
            let events = if down {
                session.handle_key_down(key)
            } else {
                session.handle_key_up(key)
            };
            process_sound_events(sound, &events);
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            last_tick = Instant::now();
            let events = session.tick(elapsed.as_secs_f32());
            process_sound_events(sound, &events);
        }

        renderer.render(session, gp.connected)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}
