// SPDX-License-Identifier: GPL-3.0-only
use std::io::{self, Stdout, Write};
use tracing::error;

use crate::manager::{Engine, ReloadCommand};

/// Engine that writes server commands as lines to a console stream.
///
/// The dedicated server wrapper feeds stdout into the game's console, so
/// nothing but commands may be written there; logs go to stderr.
pub struct ConsoleEngine<W: Write> {
    out: W,
}

impl ConsoleEngine<Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleEngine<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Engine for ConsoleEngine<W> {
    fn reload_map(&mut self, command: &ReloadCommand) {
        let result = writeln!(self.out, "{command}").and_then(|()| self.out.flush());
        if let Err(e) = result {
            error!(error = %e, command = %command, "Failed to send command to the server console");
        }
    }
}
