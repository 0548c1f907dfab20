#![forbid(unsafe_code)]

//! Executes harness commands against one engine and prints the result.

use std::io::{self, Write};
use std::thread;

use uuidsync_core::{
    Engine, FragmentOutcome, FragmentStore, MemoryFragment, Notice, PasteOutcome,
};

use crate::command::{Command, HELP_TEXT};

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    engine: Engine,
    fragment: MemoryFragment,
}

impl App {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            fragment: MemoryFragment::default(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The fragment as last written back after a command.
    #[must_use]
    pub fn fragment(&self) -> String {
        self.fragment.read()
    }

    /// Load the start-up fragment, or a random value when there is none.
    pub fn start(&mut self, fragment: Option<&str>) {
        let outcome = match fragment {
            Some(text) => self.engine.load_fragment(text),
            None => FragmentOutcome::Empty,
        };
        if outcome == FragmentOutcome::Empty {
            self.engine.randomize();
        }
        tracing::debug!(?outcome, "start-up fragment applied");
        self.settle();
    }

    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<Flow> {
        match command {
            Command::Show => {}
            Command::Edit { view, field, text } => {
                if let Err(err) = self.engine.edit(&view, field, &text) {
                    writeln!(out, "error: {err}")?;
                }
            }
            Command::Commit { view, field, text } => {
                if let Err(err) = self.engine.commit(&view, field, &text) {
                    writeln!(out, "error: {err}")?;
                }
            }
            Command::Paste { view, text } => match self.engine.paste(&view, &text) {
                Ok(PasteOutcome::Applied) => {}
                Ok(PasteOutcome::Ignored) => writeln!(out, "paste ignored")?,
                Err(err) => writeln!(out, "error: {err}")?,
            },
            Command::Hash(None) => {
                writeln!(out, "#{}", self.engine.fragment())?;
                return Ok(Flow::Continue);
            }
            Command::Hash(Some(text)) => {
                let outcome = self.engine.load_fragment(&text);
                if outcome == FragmentOutcome::Empty {
                    writeln!(out, "empty fragment")?;
                }
            }
            Command::Rand => self.engine.randomize(),
            Command::Export(view) => {
                match self.engine.export_text(&view) {
                    Ok(Some(text)) => writeln!(out, "{text}")?,
                    Ok(None) => writeln!(out, "{view} has no export text")?,
                    Err(err) => writeln!(out, "error: {err}")?,
                }
                return Ok(Flow::Continue);
            }
            Command::Wait(duration) => thread::sleep(duration),
            Command::Help => {
                writeln!(out, "{HELP_TEXT}")?;
                return Ok(Flow::Continue);
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        self.settle();
        self.render(out)?;
        Ok(Flow::Continue)
    }

    /// Print every view, pending notices and the fragment.
    pub fn render<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let keys: Vec<String> = self
            .engine
            .view_keys()
            .into_iter()
            .map(str::to_owned)
            .collect();
        let width = keys.iter().map(String::len).max().unwrap_or(0);
        for key in &keys {
            let Some(view) = self.engine.view(key) else {
                continue;
            };
            let cells: Vec<String> = view
                .fields()
                .iter()
                .map(|field| match field.validity().error() {
                    Some(err) => format!("{} (! {})", field.text(), err.message),
                    None => field.text().to_owned(),
                })
                .collect();
            writeln!(out, "{key:>width$}: {}", cells.join(" | "))?;
        }
        for notice in self.engine.take_notices() {
            match notice {
                Notice::Loaded { name, id, .. } => writeln!(out, "loaded {name} ({id})")?,
                Notice::Error { key, message, .. } => writeln!(out, "error {key}: {message}")?,
            }
        }
        writeln!(out, "#{}", self.fragment.read())
    }

    /// Apply finished lookups and write the fragment back.
    fn settle(&mut self) {
        self.engine.tick();
        self.engine.pump();
        self.engine.sync_fragment(&mut self.fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use uuidsync_core::UuidValue;
    use uuidsync_core::views::{ArrayView, HalvesView, HexView};
    use uuidsync_lookup::{Directory, InlineDispatcher, LookupConfig, PlayerView};

    fn app() -> App {
        let directory =
            Directory::new().with_player("Steve", UuidValue::from_u64_pair(0, 0x5745_5645));
        let mut engine = Engine::default();
        engine.register(HexView::new()).unwrap();
        engine.register(HalvesView::new()).unwrap();
        engine.register(ArrayView::new()).unwrap();
        engine
            .register(PlayerView::new(
                Arc::new(directory),
                Box::new(InlineDispatcher),
                LookupConfig::default(),
            ))
            .unwrap();
        App::new(engine)
    }

    fn run(app: &mut App, line: &str) -> String {
        let mut out = Vec::new();
        let command = Command::parse(line).unwrap();
        app.execute(command, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn commit_player_prints_all_views() {
        let mut app = app();
        app.start(Some("#0,0,0,0"));
        assert_eq!(
            run(&mut app, "commit player 0 steve"),
            "   hex: 00000000-0000-0000-0000-000057455645\n\
             halves: 0 | 1464161861\n \
             array: 0 | 0 | 0 | 1464161861\n\
             player: Steve\n\
             loaded Steve (00000000-0000-0000-0000-000057455645)\n\
             #00000000-0000-0000-0000-000057455645\n"
        );
    }

    #[test]
    fn failed_commit_marks_the_field() {
        let mut app = app();
        app.start(Some("0,0,0,0"));
        let out = run(&mut app, "commit player 0 nobody");
        assert!(out.contains("player: nobody (! player not found)"));
        assert!(out.contains("error nobody: player not found"));
    }

    #[test]
    fn fragment_tracks_active_view() {
        let mut app = app();
        app.start(Some("1,2,3,4"));
        assert_eq!(app.fragment(), "1,2,3,4");
        run(&mut app, "paste halves Most:5L,Least:-6L");
        assert_eq!(app.fragment(), "5,-6");
        assert_eq!(run(&mut app, "hash"), "#5,-6\n");
    }

    #[test]
    fn export_and_ignored_paste() {
        let mut app = app();
        app.start(Some("1,2,3,4"));
        assert_eq!(run(&mut app, "export array"), "[I;1,2,3,4]\n");
        assert_eq!(run(&mut app, "export player"), "player has no export text\n");
        assert!(run(&mut app, "paste array 1 2").starts_with("paste ignored\n"));
        assert!(run(&mut app, "edit nope 0 x").starts_with("error: unknown view: nope\n"));
    }

    #[test]
    fn start_without_fragment_randomizes() {
        let mut app = app();
        app.start(None);
        assert_eq!(app.engine().value().as_bytes()[6] >> 4, 4);
        assert_eq!(run(&mut app, "quit"), "");
    }
}
