mod cli;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use crossbeam_channel::{select, unbounded, Receiver};
use thiserror::Error;

use joymap_logical::{encode, PlayerEvent, TemplateStore, AGGREGATE_PLAYER};
use joymapd::{
    logging, parse_script, print_debug, print_error, print_info, ConfigError, Engine, Settings,
    Step, Workspace,
};

use crate::cli::{Cli, Command};

#[derive(Debug, Error)]
enum AppError {
    #[error("unable to set up logger: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("failed to set Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Input(#[from] joymap_input::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    logging::setup(cli.verbose, cli.no_color)?;

    let workspace = Workspace::new(cli.workspace.as_deref())?;
    print_debug!("workspace: {}", workspace.path().display());

    if let Command::Templates { clear } = cli.command {
        show_templates(&workspace, clear);
        return Ok(());
    }

    let settings = workspace.load_settings()?;
    let mut engine = build_engine(&workspace, &settings);

    let (stop_tx, stop_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })?;

    match cli.command {
        Command::Replay { script } => replay(&mut engine, &script, &stop_rx),
        Command::Templates { .. } => Ok(()),
        #[cfg(feature = "sdl2")]
        Command::Run => run_live(&mut engine, &stop_rx),
    }
}

fn build_engine(workspace: &Workspace, settings: &Settings) -> Engine {
    let store = TemplateStore::new(workspace.file_store());
    print_debug!("loaded {} stored templates", store.len());
    let mut engine = Engine::new(settings.mapper.clone(), store);
    engine.set_multi_touch(settings.multi_touch);
    engine.set_keyboard_enabled_with(settings.keyboard, report);
    engine.set_touch_enabled_with(settings.touch, report);
    engine
}

fn report(event: &PlayerEvent) {
    let who = if event.player == AGGREGATE_PLAYER {
        "any".to_string()
    } else {
        format!("player {}", event.player)
    };
    let phase = if event.value { "down" } else { "up" };
    print_info!(
        "{who}: {:#06x} {phase} (state {:#06x})",
        event.button,
        event.state
    );
}

fn apply_step(engine: &mut Engine, step: &Step) {
    match step {
        Step::Event(event) => engine.handle_event_with(event, report),
        Step::Keyboard(enabled) => engine.set_keyboard_enabled_with(*enabled, report),
        Step::TouchScreen(enabled) => engine.set_touch_enabled_with(*enabled, report),
        Step::MultiTouch(enabled) => engine.set_multi_touch(*enabled),
        Step::Players(count) => {
            let applied = engine.set_player_count_with(*count, report);
            print_debug!("player count set to {applied}");
        }
    }
}

fn replay(engine: &mut Engine, path: &Path, stop_rx: &Receiver<()>) -> Result<(), AppError> {
    let input = std::fs::read_to_string(path)?;
    let steps = parse_script(&input)?;
    print_info!("replaying {} steps from {}", steps.len(), path.display());

    let (step_tx, step_rx) = unbounded::<Step>();
    let reader = std::thread::spawn(move || {
        for step in steps {
            if step_tx.send(step).is_err() {
                break;
            }
        }
    });

    loop {
        select! {
            recv(stop_rx) -> _ => {
                print_info!("replay interrupted");
                break;
            }
            recv(step_rx) -> msg => {
                match msg {
                    Ok(step) => apply_step(engine, &step),
                    Err(_) => break,
                }
            }
        }
    }

    drop(step_rx);
    if let Err(e) = reader.join() {
        print_error!("script reader error: {e:?}");
    }
    Ok(())
}

fn show_templates(workspace: &Workspace, clear: bool) {
    let mut store = TemplateStore::new(workspace.file_store());
    if clear {
        let removed = store.len();
        store.clear();
        print_info!("removed {removed} templates");
        return;
    }
    if store.is_empty() {
        print_info!("no stored templates");
        return;
    }
    print_info!("{}", encode(store.templates()).trim_end());
}

#[cfg(feature = "sdl2")]
fn run_live(engine: &mut Engine, stop_rx: &Receiver<()>) -> Result<(), AppError> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use joymap_input::{spawn_sdl_feed, PlatformEvent};

    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = unbounded::<PlatformEvent>();
    let feed = spawn_sdl_feed(tx, Arc::clone(&stop))?;
    let mut backlog = rx.clone();

    print_info!("joymapd started. Listening for input devices.");
    loop {
        select! {
            recv(stop_rx) -> _ => {
                break;
            }
            recv(rx) -> msg => {
                match msg {
                    Ok(event) => {
                        engine.handle_event_with(&event, report);
                        engine.pump_with(&mut backlog, report);
                    }
                    Err(err) => {
                        print_error!("event channel closed: {err}");
                        break;
                    }
                }
            }
        }
    }

    stop.store(true, Ordering::Relaxed);
    if let Err(e) = feed.join() {
        print_error!("input thread error: {e:?}");
    }
    Ok(())
}
