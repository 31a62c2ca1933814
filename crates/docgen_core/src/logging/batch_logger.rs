//! The log of one batch run.
//!
//! Every line goes to `<logs>/<batch>.log` and, when a console callback is
//! set, to the terminal as well. Converter output is held in a short tail
//! buffer and only written out when a conversion fails (compact mode).

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{ConsoleCallback, LogConfig, LogLevel};
use crate::naming;

/// Line decorations used in batch logs.
#[derive(Debug, Clone, Copy)]
enum Marker {
    Phase,
    Section,
    Command,
    Success,
    Warning,
    Error,
}

impl Marker {
    fn apply(self, message: &str) -> String {
        match self {
            Marker::Phase => format!("=== {} ===", message),
            Marker::Section => format!("--- {} ---", message),
            Marker::Command => format!("$ {}", message),
            Marker::Success => format!("[SUCCESS] {}", message),
            Marker::Warning => format!("[WARNING] {}", message),
            Marker::Error => format!("[ERROR] {}", message),
        }
    }
}

/// Where formatted lines end up.
struct Sink {
    file: BufWriter<File>,
    console: Option<ConsoleCallback>,
}

impl Sink {
    fn write(&mut self, line: &str) {
        // A failing log write must not abort the batch.
        let _ = writeln!(self.file, "{}", line);
        if let Some(console) = &self.console {
            console(line);
        }
    }
}

pub struct BatchLogger {
    path: PathBuf,
    config: LogConfig,
    sink: Mutex<Sink>,
    tail: Mutex<VecDeque<String>>,
    /// Last progress bucket written in compact mode.
    progress_bucket: Mutex<u32>,
}

impl BatchLogger {
    /// Create `<log_dir>/<name>.log`, creating the directory if needed.
    pub fn new(
        name: &str,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        console: Option<ConsoleCallback>,
    ) -> io::Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;
        let path = log_dir.join(format!("{}.log", naming::sanitize(name)));
        let file = BufWriter::new(File::create(&path)?);

        Ok(Self {
            path,
            tail: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
            sink: Mutex::new(Sink { file, console }),
            progress_bucket: Mutex::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, None, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, None, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, Some(Marker::Warning), message);
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, Some(Marker::Error), message);
    }

    /// `$ <command line>` of an external tool about to run.
    pub fn command(&self, command: &str) {
        self.emit(LogLevel::Info, Some(Marker::Command), command);
    }

    pub fn phase(&self, name: &str) {
        self.emit(LogLevel::Info, Some(Marker::Phase), name);
    }

    pub fn section(&self, name: &str) {
        self.emit(LogLevel::Info, Some(Marker::Section), name);
    }

    pub fn success(&self, message: &str) {
        self.emit(LogLevel::Info, Some(Marker::Success), message);
    }

    /// Report that `done` of `total` items are finished.
    ///
    /// In compact mode a line is written only when the percentage enters a
    /// new `progress_step` bucket or the work is complete. Returns whether a
    /// line was written.
    pub fn progress(&self, done: usize, total: usize) -> bool {
        let percent = if total == 0 {
            100
        } else {
            (done.min(total) * 100 / total) as u32
        };

        if self.config.compact {
            let bucket = percent / self.config.progress_step.max(1);
            let mut last = self.progress_bucket.lock();
            if bucket <= *last && percent < 100 {
                return false;
            }
            *last = bucket;
        }

        self.info(&format!("Progress: {}/{} ({}%)", done, total, percent));
        true
    }

    /// One line of converter output. Kept in the tail buffer; written
    /// straight away only outside compact mode.
    pub fn converter_line(&self, line: &str, is_stderr: bool) {
        {
            let mut tail = self.tail.lock();
            if tail.len() >= self.config.error_tail.max(1) {
                tail.pop_front();
            }
            tail.push_back(line.to_string());
        }

        if !self.config.compact {
            let line = if is_stderr {
                format!("[stderr] {}", line)
            } else {
                line.to_string()
            };
            self.emit(LogLevel::Info, None, &line);
        }
    }

    /// Write out the buffered converter lines under a `[label/tail]` header.
    pub fn dump_tail(&self, label: &str) {
        let lines: Vec<String> = self.tail.lock().drain(..).collect();
        if lines.is_empty() {
            return;
        }
        self.emit(LogLevel::Error, None, &format!("[{}/tail]", label));
        for line in &lines {
            self.emit(LogLevel::Error, None, line);
        }
    }

    pub fn reset_tail(&self) {
        self.tail.lock().clear();
    }

    pub fn flush(&self) {
        let _ = self.sink.lock().file.flush();
    }

    #[cfg(test)]
    fn tail(&self) -> Vec<String> {
        self.tail.lock().iter().cloned().collect()
    }

    fn emit(&self, level: LogLevel, marker: Option<Marker>, message: &str) {
        if level < self.config.level {
            return;
        }
        let body = match marker {
            Some(marker) => marker.apply(message),
            None => message.to_string(),
        };
        let line = if self.config.timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), body)
        } else {
            body
        };
        self.sink.lock().write(&line);
    }
}

impl Drop for BatchLogger {
    fn drop(&mut self) {
        self.flush();
    }
}
