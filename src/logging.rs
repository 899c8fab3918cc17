//! Logging setup plus a bounded in-memory copy of recent log lines.

use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default size of the console buffer in bytes.
pub const DEFAULT_CONSOLE_CAPACITY: usize = 8 * 1024;

/// Recent formatted log output, trimmed from the front a whole line at a time.
#[derive(Debug, Clone)]
pub struct ConsoleBuffer {
    text: Arc<Mutex<String>>,
    capacity: usize,
}

impl Default for ConsoleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CONSOLE_CAPACITY)
    }
}

impl ConsoleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            text: Arc::new(Mutex::new(String::with_capacity(capacity))),
            capacity,
        }
    }

    /// Current buffer contents, oldest line first.
    pub fn contents(&self) -> String {
        self.text.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn append(&self, chunk: &str) {
        let mut text = self.text.lock().unwrap_or_else(|e| e.into_inner());
        text.push_str(chunk);

        if text.len() > self.capacity {
            let excess = text.len() - self.capacity;
            // Cut after the first newline past the excess so no partial line remains.
            let cut = text.as_bytes()[excess..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(text.len(), |pos| excess + pos + 1);
            text.drain(..cut);
        }
    }
}

/// Writer handed out to the fmt layer for each event.
pub struct ConsoleWriter {
    buffer: ConsoleBuffer,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.append(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for ConsoleBuffer {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            buffer: self.clone(),
        }
    }
}

/// Install the global subscriber: stdout, `console`, and an env filter that
/// defaults to `vigil=info`.
pub fn init(console: ConsoleBuffer) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(console),
        )
        .with(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .try_init()?;
    Ok(())
}
