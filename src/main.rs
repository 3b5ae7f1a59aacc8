/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;

use simplelog::{LevelFilter, WriteLogger};

use config::GameConfig;
use domain::entity::Actor;
use sim::data::DataStore;
use sim::frame::{FrameContext, Pacer, Session, SessionSettings, TickOutcome};
use sim::world::World;
use ui::gamepad::GamepadState;
use ui::input::TerminalInput;
use ui::renderer::TerminalRenderer;
use ui::sound::SoundEngine;

const LOG_FILE: &str = "debug.log";

fn main() {
    setup_logging();
    let config = GameConfig::load();

    // Everything that can fail before the terminal is taken over.
    let data = match DataStore::load(&config.data_dir) {
        Ok(data) => data,
        Err(e) => {
            log::error!("data load failed: {e}");
            eprintln!("Could not load game data: {e}");
            std::process::exit(1);
        }
    };
    let world = match World::reference() {
        Ok(world) => world,
        Err(e) => {
            log::error!("world build failed: {e}");
            eprintln!("Could not build the world: {e}");
            std::process::exit(1);
        }
    };

    let settings = SessionSettings {
        speeds: config.speed_model(),
        viewport: config.screen,
        debug_overlay: config.debug_overlay,
    };
    let mut session = Session::new(world, Actor::new(config.actor), data, config.initial_mode, settings);

    let mut renderer = TerminalRenderer::new(config.screen);
    let honor_release = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            // raw mode may already be on
            let _ = renderer.cleanup();
            return;
        }
    };

    let mut gamepad = GamepadState::new();
    gamepad.load_button_config(&config.gamepad);
    let mut input = TerminalInput::new(renderer.scale(), gamepad);
    input.honor_release = honor_release;
    let mut sound = SoundEngine::new();

    let result = game_loop(&mut session, &mut input, &mut renderer, &mut sound, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    let pos = session.actor().rect;
    println!(
        "Left the world in [{}] at ({:.0}, {:.0}).",
        session.world().current_stage().name(), pos.x, pos.y
    );
}

fn game_loop(
    session: &mut Session,
    input: &mut TerminalInput,
    renderer: &mut TerminalRenderer,
    sound: &mut SoundEngine,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = FrameContext { input, renderer, sound };
    let mut pacer = Pacer::new(config.timing.tick_rate);
    log::info!(
        "starting in {:?} at {} ticks/s ({:?} per tick)",
        session.mode(), config.timing.tick_rate, pacer.period()
    );

    loop {
        session.set_fps(pacer.fps());
        if session.tick(&mut ctx)? == TickOutcome::Quit {
            break;
        }
        pacer.wait();
    }

    Ok(())
}

// Logs go to a file: the terminal is in raw mode while the game runs.
fn setup_logging() {
    if !std::env::args().any(|arg| arg == "--debug") {
        return;
    }
    let file = match File::create(LOG_FILE) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Could not create {LOG_FILE}: {e}");
            return;
        }
    };
    let logger_config = simplelog::ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .build();
    if let Err(e) = WriteLogger::init(LevelFilter::Debug, logger_config, file) {
        eprintln!("Could not install logger: {e}");
    }
}
