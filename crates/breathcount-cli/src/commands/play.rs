//! Foreground playback of a preset.
//!
//! Runs the engine on a single-threaded runtime. Events are printed to
//! stdout as JSON lines; the countdown goes to stderr when it is a terminal.
//!
//! Controls, one per line on stdin: `p` pause, `r` resume, `g` start again
//! after a stop, `l` reload the preset from storage, `s` stop, `q` quit.
//! Ctrl+C stops and quits. `g` reloads the preset before starting, so edits
//! made from another shell while stopped take effect.
//!
//! Once stdin is closed the session ends as soon as the timer stops ticking.

use std::io::{IsTerminal, Write};

use breathcount_core::audio::{AudioCueLibrary, CuePlayer};
use breathcount_core::storage::{Config, PresetStore};
use breathcount_core::{format_remaining, CoreError, Event, TimerEngine};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{error::TryRecvError, Receiver};
use tracing::{debug, warn};

use super::preset::not_found;
use super::{open_store, CliResult};

enum Input {
    Tick,
    Line(Option<String>),
    Interrupt,
}

pub fn run(preset_id: &str, no_audio: bool) -> CliResult {
    let config = Config::load_or_default();
    let store = open_store()?;
    let preset = store.get(preset_id)?.ok_or_else(|| not_found(preset_id))?;

    let player: Box<dyn CuePlayer> = if no_audio || !config.audio.enabled {
        Box::new(AudioCueLibrary::silent())
    } else {
        let cue_dir = config.audio.resolve_cue_dir()?;
        let library = AudioCueLibrary::from_config(&config.audio, &cue_dir);
        // Detached; the first cues stream from disk until decoding lands.
        let _ = library.preload_all();
        Box::new(library)
    };

    let mut engine = TimerEngine::new(player, &config.timer);
    engine.initialize(&preset);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(drive(engine, &store, preset_id));
    // A stdin read may still be parked on a blocking thread.
    runtime.shutdown_background();
    result
}

async fn drive(mut engine: TimerEngine, store: &PresetStore, preset_id: &str) -> CliResult {
    let mut events = engine.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let countdown = std::io::stderr().is_terminal();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    engine.start().map_err(CoreError::from)?;
    print_events(&mut events)?;

    loop {
        let input = tokio::select! {
            _ = engine.wait_tick() => Input::Tick,
            line = lines.next_line(), if stdin_open => Input::Line(line?),
            _ = &mut ctrl_c => Input::Interrupt,
        };

        match input {
            Input::Tick => {}
            Input::Line(None) => {
                debug!("stdin closed, controls disabled");
                stdin_open = false;
            }
            Input::Line(Some(line)) => {
                if !control(&mut engine, store, preset_id, line.trim()) {
                    engine.stop();
                    print_events(&mut events)?;
                    break;
                }
            }
            Input::Interrupt => {
                engine.stop();
                print_events(&mut events)?;
                break;
            }
        }

        print_events(&mut events)?;
        if countdown {
            let snap = engine.snapshot();
            eprint!(
                "\r{:<10} {}  pass {}/{} ",
                snap.segment_name,
                format_remaining(snap.remaining_ms),
                snap.repeat_index + 1,
                snap.repeat_count
            );
        }

        if engine.is_finished() {
            break;
        }
        // Stopped or paused with no way to resume.
        if !stdin_open && !engine.is_ticking() {
            debug!("no more input and timer idle, leaving");
            break;
        }
    }

    if countdown {
        eprintln!();
    }
    Ok(())
}

/// Apply one control line. Returns false to quit.
fn control(engine: &mut TimerEngine, store: &PresetStore, preset_id: &str, command: &str) -> bool {
    let result = match command {
        "p" | "pause" => engine.pause(),
        "r" | "resume" => engine.resume(),
        "g" | "go" | "start" => {
            reload(engine, store, preset_id);
            engine.start()
        }
        "l" | "reload" => {
            reload(engine, store, preset_id);
            Ok(())
        }
        "s" | "stop" => {
            engine.stop();
            Ok(())
        }
        "q" | "quit" => return false,
        "" => Ok(()),
        other => {
            eprintln!("unknown command: {other} (p, r, g, l, s, q)");
            Ok(())
        }
    };
    if let Err(e) = result {
        eprintln!("error: {e} ({})", e.code());
    }
    true
}

/// Pull the stored copy of the loaded preset into the engine.
fn reload(engine: &mut TimerEngine, store: &PresetStore, preset_id: &str) {
    match store.get(preset_id) {
        Ok(Some(preset)) => {
            engine.reload_preset(&preset);
        }
        Ok(None) => eprintln!("preset {preset_id} was deleted, keeping the loaded copy"),
        Err(e) => warn!(preset = preset_id, "could not reload preset: {e}"),
    }
}

fn print_events(events: &mut Receiver<Event>) -> CliResult {
    let mut stdout = std::io::stdout().lock();
    loop {
        match events.try_recv() {
            Ok(event) => writeln!(stdout, "{}", serde_json::to_string(&event)?)?,
            Err(TryRecvError::Lagged(skipped)) => debug!(skipped, "event output lagged"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    stdout.flush()?;
    Ok(())
}
