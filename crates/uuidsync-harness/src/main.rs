#![forbid(unsafe_code)]

//! uuidsync reference host
//!
//! Wires the hex, halves, array and player views into one engine, reads
//! commands from stdin and prints every view after each command.
//!
//! # Running
//!
//! ```sh
//! cargo run -p uuidsync-harness
//! ```
//!
//! # Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `UUIDSYNC_LOG` | tracing filter, default `warn` (logs go to stderr) |
//! | `UUIDSYNC_PLAYERS` | file of `name uuid` lines for the player view |
//! | `UUIDSYNC_FRAGMENT` | fragment to load at start-up (default: random) |
//! | `UUIDSYNC_RANDOM_DIRECTIVE` | fragment text that requests a random value |
//! | `UUIDSYNC_LOOKUP_DEBOUNCE_MS` | player lookup debounce |
//! | `UUIDSYNC_LOOKUP_TRACE` | retained lookup trace events |

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use uuidsync_core::config::env_string;
use uuidsync_core::views::{ArrayView, HalvesView, HexView};
use uuidsync_core::{Engine, EngineConfig, UuidValue};
use uuidsync_harness::{App, Command, CommandError, Flow};
use uuidsync_lookup::{Directory, LookupConfig, PlayerView, ThreadDispatcher};

const ENV_LOG: &str = "UUIDSYNC_LOG";
const ENV_PLAYERS: &str = "UUIDSYNC_PLAYERS";
const ENV_FRAGMENT: &str = "UUIDSYNC_FRAGMENT";

fn init_logging() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn demo_directory() -> Directory {
    Directory::new()
        .with_player(
            "Notch",
            UuidValue::from_u64_pair(0x069a_79f4_44e9_4726, 0xa5be_fca9_0e38_aaf5),
        )
        .with_player(
            "jeb_",
            UuidValue::from_u64_pair(0x853c_80ef_3c37_49fd, 0xaa49_9382_6c70_1d8b),
        )
        .with_latency(Duration::from_millis(150))
}

fn load_directory() -> io::Result<Directory> {
    let Some(path) = env_string(ENV_PLAYERS) else {
        return Ok(demo_directory());
    };
    let listing = std::fs::read_to_string(&path)?;
    let directory = Directory::parse(&listing)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, format!("{path}: {err}")))?;
    tracing::info!(path = %path, players = directory.len(), "player directory loaded");
    Ok(directory)
}

fn build_engine(directory: Directory) -> Engine {
    let mut engine = Engine::new(EngineConfig::from_env());
    let player = PlayerView::new(
        Arc::new(directory),
        Box::new(ThreadDispatcher::new()),
        LookupConfig::from_env(),
    );
    let registered = engine
        .register(HexView::new())
        .and_then(|()| engine.register(HalvesView::new()))
        .and_then(|()| engine.register(ArrayView::new()))
        .and_then(|()| engine.register(player));
    if let Err(err) = registered {
        tracing::error!(error = %err, "view registration failed");
    }
    engine
}

fn main() -> io::Result<()> {
    init_logging();

    let directory = load_directory()?;
    let mut app = App::new(build_engine(directory));
    app.start(env_string(ENV_FRAGMENT).as_deref());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    app.render(&mut out)?;
    out.flush()?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        let flow = match Command::parse(&line) {
            Ok(command) => app.execute(command, &mut out)?,
            Err(CommandError::Empty) => Flow::Continue,
            Err(err) => {
                writeln!(out, "error: {err}")?;
                Flow::Continue
            }
        };
        out.flush()?;
        if flow == Flow::Quit {
            break;
        }
    }
    Ok(())
}
