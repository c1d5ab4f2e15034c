use std::io::{self, Write};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};

use crate::error::{ListboxError, Result};

use super::ListboxRuntime;

/// Terminal driver owning a [`ListboxRuntime`]: raw mode, alternate screen,
/// mouse capture and focus reporting are switched on for the duration of
/// the live loop and restored afterwards, even when the loop fails.
pub struct CliDriver {
    runtime: ListboxRuntime,
}

impl CliDriver {
    pub fn new(runtime: ListboxRuntime) -> Self {
        Self { runtime }
    }

    /// Run until Ctrl-C, then hand the runtime back for inspection.
    pub fn run(mut self) -> Result<ListboxRuntime> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.runtime.run();
        self.exit(&mut stdout);
        result.map(|_| self.runtime)
    }

    fn enter(&self, stdout: &mut impl Write) -> Result<()> {
        terminal::enable_raw_mode().map_err(|err| ListboxError::Backend(err.to_string()))?;
        execute!(
            stdout,
            EnterAlternateScreen,
            Hide,
            Clear(ClearType::All),
            EnableMouseCapture,
            EnableFocusChange
        )?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(
            stdout,
            DisableFocusChange,
            DisableMouseCapture,
            Show,
            LeaveAlternateScreen
        )
        .ok();
        terminal::disable_raw_mode().ok();
    }
}
