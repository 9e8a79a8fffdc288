/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use crossterm::event::{
    KeyCode, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{execute, terminal};
use env_logger::{Env, Target};

use config::GameConfig;
use sim::level::{self, LevelEntry};
use sim::scene::{SceneKind, SceneManager};
use sim::step::FrameInput;
use ui::gamepad::GamepadState;
use ui::input::{InputState, KEYS_BACK, KEYS_CONFIRM, KEYS_CYCLE, KEYS_QUIT_MENU, KEYS_RESTART};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

#[derive(Parser, Debug)]
#[command(name = "gatekeeper", about = "Cooperative gate-and-button puzzles in the terminal")]
struct Cli {
    /// Read settings from this TOML file instead of searching for config.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the menu and start this binary level file.
    #[arg(long)]
    level: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a hex text level into the binary level format.
    Convert { input: PathBuf, output: PathBuf },
    /// Print a binary level as hex text.
    Dump { level: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    if let Some(command) = &cli.command {
        if let Err(e) = run_tool(command) {
            eprintln!("{e}");
            std::process::exit(1);
        }
        return;
    }

    let config = GameConfig::load(cli.config.as_deref());
    init_logging(&config);

    let mut manager = SceneManager::new(level::catalog(&config), config.layout);
    if let Some(path) = &cli.level {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        manager.start_level(LevelEntry::file(name, path.clone()), Instant::now());
    }

    let mut renderer = Renderer::new(config.layout);
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }
    let enhanced = enable_key_release();

    let sound = if config.sound_enabled { SoundEngine::new() } else { None };

    let result = game_loop(&mut manager, &mut renderer, sound.as_ref(), &config, enhanced);

    if enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        log::error!("game loop aborted: {e}");
        eprintln!("Game error: {e}");
    }
}

/// Level file utilities; no terminal UI.
fn run_tool(command: &Command) -> error::Result<()> {
    match command {
        Command::Convert { input, output } => {
            let grid = level::convert_text_to_binary(input, output)?;
            println!(
                "Wrote {} ({}x{}, {} players)",
                output.display(),
                grid.width(),
                grid.height(),
                grid.number_players()
            );
        }
        Command::Dump { level: path } => {
            print!("{}", level::load_file(path)?.to_text());
        }
    }
    Ok(())
}

/// Log to a file; the terminal belongs to the renderer. `RUST_LOG` overrides
/// the default `info` filter.
fn init_logging(config: &GameConfig) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    match File::create(&config.log_file) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", config.log_file.display());
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    // A second init (tests, embedding) is harmless.
    let _ = builder.try_init();
}

/// Ask the terminal for Release events. Without them, held keys fall back to
/// a timeout in `InputState`.
fn enable_key_release() -> bool {
    if !terminal::supports_keyboard_enhancement().unwrap_or(false) {
        log::info!("keyboard enhancement unavailable; using key-hold timeout");
        return false;
    }
    let flags = KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES;
    match execute!(io::stdout(), PushKeyboardEnhancementFlags(flags)) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("keyboard enhancement rejected: {e}");
            false
        }
    }
}

fn game_loop(
    manager: &mut SceneManager,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    enhanced: bool,
) -> io::Result<()> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let tick_rate = Duration::from_millis(config.speed.tick_rate_ms.max(1));
    let mut shown = manager.scene().kind();

    loop {
        let frame_start = Instant::now();

        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() || kb.any_pressed(&[KeyCode::Esc]) {
            break;
        }
        if shown == SceneKind::MainMenu && kb.any_pressed(KEYS_QUIT_MENU) {
            break;
        }

        let input = FrameInput {
            movement: kb.movement().union(gp.movement()),
            cycle_held: kb.any_held(KEYS_CYCLE) || gp.cycle_held(),
            click: kb.click(&config.layout, renderer.origin()),
            restart: kb.any_pressed(KEYS_RESTART) || gp.restart_pressed(),
            confirm: kb.any_pressed(KEYS_CONFIRM) || gp.confirm_pressed(),
            back: kb.any_pressed(KEYS_BACK) || gp.back_pressed(),
            now: frame_start,
        };

        let events = manager.update(&input);
        if let Some(sfx) = sound {
            sfx.play_events(&events);
        }

        let kind = manager.scene().kind();
        if kind != shown {
            renderer.invalidate();
            shown = kind;
        }

        renderer.render(&manager.scene().appearances(), manager.status())?;

        if let Some(rest) = tick_rate.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    Ok(())
}
