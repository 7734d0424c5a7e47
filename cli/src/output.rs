use std::io::{self, Write};

use tracing::error;
use treewatch_core::{EventSink, WatchEvent};

/// Writes activity reports to stdout, one line per event.
pub struct StdoutSink {
    json: bool,
}

impl StdoutSink {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn render(&self, event: &WatchEvent) -> String {
        if self.json {
            match event.to_json() {
                Ok(line) => return line,
                Err(e) => error!("Failed to serialize event: {e}"),
            }
        }
        event.to_string()
    }
}

impl EventSink for StdoutSink {
    fn report(&mut self, event: WatchEvent) {
        let line = self.render(&event);
        let mut stdout = io::stdout().lock();
        // Line-buffered even when stdout is a pipe.
        if let Err(e) = writeln!(stdout, "{line}").and_then(|()| stdout.flush()) {
            error!("Failed to write event: {e}");
        }
    }
}
