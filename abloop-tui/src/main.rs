use std::io;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    crossterm::{
        event::{self, DisableMouseCapture, EnableMouseCapture, Event},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
};

use abloop_core::{
    EngineCommand, EngineHandle, PlayerCommand, PlayerEngine, TrackGeometry,
    backend::{MediaBackend, MediaSource, RodioBackend, SimulatedBackend},
};

mod cli;
mod keymap;
mod router;
mod routes;
mod state;
mod ui;

use cli::Cli;
use keymap::{Action, Key};
use router::Router;
use state::AppState;

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

fn main() -> anyhow::Result<()> {
    // Initialize tui_logger for the Log tab
    tui_logger::init_logger(log::LevelFilter::Debug)
        .map_err(|e| anyhow::anyhow!("Failed to init tui_logger: {:?}", e))?;
    tui_logger::set_default_level(log::LevelFilter::Debug);

    let cli = Cli::parse();
    let config = cli.player_config()?;
    log::info!("Starting abloop");

    // The backend is built on the engine thread; rodio streams cannot move across threads
    let simulate = cli.simulate;
    let (engine_thread, handle) = PlayerEngine::spawn(config.clone(), move || {
        let backend: Box<dyn MediaBackend> = match simulate {
            Some(seconds) => {
                log::info!("Using simulated backend ({:.0}s track)", seconds);
                Box::new(SimulatedBackend::new(seconds))
            }
            None => Box::new(
                RodioBackend::try_new_default()
                    .context("No audio output available (try --simulate <SECONDS>)")?,
            ),
        };
        Ok(backend)
    })?;

    let initial = match (&cli.file, simulate) {
        (Some(path), _) => Some(MediaSource::file(path)),
        (None, Some(_)) => Some(MediaSource::Url("simulated://tone".to_string())),
        (None, None) => None,
    };
    if let Some(source) = initial {
        handle.send(PlayerCommand::Load(source))?;
        handle.send(PlayerCommand::Play)?;
    }

    let result = run_tui(&handle, AppState::new(config));

    // Ensure clean shutdown
    let _ = handle.send(EngineCommand::Quit);
    if engine_thread.join().is_err() {
        log::error!("Playback engine thread panicked");
    }
    result
}

fn run_tui(handle: &EngineHandle, state: AppState) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, handle, state);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn event_loop(terminal: &mut Tui, handle: &EngineHandle, mut state: AppState) -> anyhow::Result<()> {
    let mut router = Router::new(state.active_tab);
    let mut last_geometry: Option<TrackGeometry> = None;

    loop {
        // Handle engine events
        while let Ok(event) = handle.resp_rx.try_recv() {
            state.handle_event(event);
        }

        terminal.draw(|f| ui::draw(f, &state, &router))?;

        // Keep the reconciler's view of the gauge in sync with the layout
        if let Some(geometry) = router.current().track_geometry() {
            if last_geometry != Some(geometry) {
                handle.send(EngineCommand::SetTrackGeometry(geometry))?;
                last_geometry = Some(geometry);
            }
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    let Some(key) = Key::normalize(key) else {
                        continue;
                    };
                    if handle_key(key, &mut state, handle, &mut router)? {
                        break;
                    }
                }
                Event::Mouse(mouse) => router.handle_mouse(mouse, &mut state, handle)?,
                _ => {}
            }
        }
    }

    Ok(())
}

/// Handle global keys and delegate the rest to the current route.
/// Returns `true` when the app should quit.
fn handle_key(
    key: Key,
    state: &mut AppState,
    handle: &EngineHandle,
    router: &mut Router,
) -> anyhow::Result<bool> {
    if let Some(action) = Action::global(key) {
        match action {
            Action::Quit => return Ok(true),
            Action::NextTab => {
                let next = state.active_tab.next();
                router.switch_to(next, state, handle)?;
            }
            other => {
                if let Some(command) = other.command(&state.config) {
                    handle.send(command)?;
                }
            }
        }
        return Ok(false);
    }

    let action = router.current_mut().handle_input(key, state, handle)?;
    router.execute_action(action, state, handle)?;
    Ok(false)
}
