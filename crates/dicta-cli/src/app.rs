//! Interactive dictation view.
//!
//! Raw-mode terminal loop that renders the session state bundle and feeds
//! key commands and engine events into the controller from a single thread,
//! so commands and event handling never race on the state.

use std::io::{Write, stdout};
use std::thread;

use anyhow::{Context, Result};
use console::style;
use crossbeam_channel::{Receiver, unbounded};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode};
use crossterm::{cursor, execute};
use dicta_core::{
    CapabilityError, DeepgramLiveEngine, EngineEvent, SessionController, SessionState, Settings,
    Snapshot, check_capabilities, copy_to_clipboard,
};

pub fn run(language: Option<String>, device: Option<String>) -> Result<()> {
    let settings = Settings::load();
    let language = language.unwrap_or_else(|| settings.language.clone());
    let device = device.or_else(|| settings.microphone_device.clone());

    let (engine_tx, engine_rx) = unbounded();
    let engine = DeepgramLiveEngine::new(settings.api_key(), device, engine_tx)?;

    // Capability failures are terminal: no session can start.
    if let Err(err) = check_capabilities(&engine) {
        eprintln!("{err}");
        if err == CapabilityError::Unsupported {
            eprintln!("\nSet a Deepgram API key with:");
            eprintln!("  dicta config --api-key YOUR_KEY\n");
            eprintln!("Or set the DEEPGRAM_API_KEY environment variable.");
        }
        std::process::exit(1);
    }

    let mut controller = SessionController::new(engine, language);
    let keys = spawn_key_reader();

    enable_raw_mode().context("Failed to enable raw terminal mode")?;
    let result = event_loop(&mut controller, &keys, &engine_rx);
    disable_raw_mode().context("Failed to restore the terminal")?;

    if controller.listening() {
        controller.stop();
    }
    result
}

/// Keys are read on their own thread; the main loop stays free to select
/// over keys and engine events together.
fn spawn_key_reader() -> Receiver<KeyCode> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    if tx.send(key.code).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });
    rx
}

enum Action {
    Continue,
    Quit,
}

fn event_loop(
    controller: &mut SessionController<DeepgramLiveEngine>,
    keys: &Receiver<KeyCode>,
    engine_events: &Receiver<EngineEvent>,
) -> Result<()> {
    let mut status: Option<String> = None;
    render(&controller.snapshot(), &status)?;

    loop {
        crossbeam_channel::select! {
            recv(keys) -> key => match key {
                Ok(code) => {
                    if let Action::Quit = handle_key(code, controller, &mut status) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(engine_events) -> event => match event {
                Ok(event) => controller.handle_event(event),
                Err(_) => break,
            },
        }
        render(&controller.snapshot(), &status)?;
    }
    Ok(())
}

fn handle_key(
    code: KeyCode,
    controller: &mut SessionController<DeepgramLiveEngine>,
    status: &mut Option<String>,
) -> Action {
    match code {
        KeyCode::Char('s') => {
            if controller.listening() {
                *status = Some("Already listening.".to_string());
            } else {
                *status = None;
                controller.start();
            }
        }
        KeyCode::Char('t') => {
            if !controller.listening() {
                *status = Some("Not listening.".to_string());
            } else {
                *status = None;
                controller.stop();
            }
        }
        KeyCode::Char('r') => {
            *status = None;
            controller.reset();
        }
        KeyCode::Char('c') => {
            let transcript = controller.transcript();
            if transcript.is_empty() {
                *status = Some("Nothing to copy yet.".to_string());
            } else {
                // Copy failures land on the status line, never out of the loop.
                *status = Some(match copy_to_clipboard(&transcript) {
                    Ok(()) => "Transcript copied to clipboard.".to_string(),
                    Err(err) => err.to_string(),
                });
            }
        }
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        _ => {}
    }
    Action::Continue
}

fn render(snapshot: &Snapshot, status: &Option<String>) -> Result<()> {
    let mut out = stdout();
    execute!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;

    write!(
        out,
        "{}\r\n\r\n",
        style("dicta | s start, t stop, r reset, c copy, q quit").dim()
    )?;

    let mic = if snapshot.state == SessionState::Listening {
        style("on").green().bold()
    } else {
        style("off").dim()
    };
    write!(out, "Microphone: {mic}\r\n\r\n")?;

    if snapshot.transcript.is_empty() {
        write!(out, "{}\r\n", style("(nothing recognized yet)").dim())?;
    } else {
        write!(out, "{}\r\n", snapshot.transcript)?;
    }

    if let Some(error) = &snapshot.error {
        write!(out, "\r\n{}\r\n", style(error).red())?;
    }
    if let Some(status) = status {
        write!(out, "\r\n{}\r\n", style(status).cyan())?;
    }

    out.flush()?;
    Ok(())
}
