//! Log setup: human-readable lines on stderr plus a CSV file with one row
//! per event (`Timestamp,Logger,Level,Message`).
//!
//! The CSV file is opened once in `main` and stays open for as long as the
//! returned [`CsvLogGuard`] lives; dropping the guard flushes it.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILE: &str = "./logs/flow_logs.csv";

const HEADER: [&str; 4] = ["Timestamp", "Logger", "Level", "Message"];

type SharedWriter = Arc<Mutex<csv::Writer<File>>>;

pub struct CsvLogLayer {
    writer: SharedWriter,
}

#[must_use = "dropping the guard flushes and releases the CSV log"]
pub struct CsvLogGuard {
    writer: SharedWriter,
}

impl CsvLogLayer {
    /// Opens `path` for appending, creating parent directories, and writes
    /// the header row if the file is empty.
    pub fn open(path: &Path) -> io::Result<(Self, CsvLogGuard)> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        let writer = Arc::new(Mutex::new(writer));
        Ok((
            Self {
                writer: Arc::clone(&writer),
            },
            CsvLogGuard { writer },
        ))
    }
}

impl<S: Subscriber> Layer<S> for CsvLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f").to_string();
        let level = metadata.level().to_string();
        let message = visitor.finish();

        // A failing log sink has nowhere to report to.
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if writer
            .write_record([timestamp.as_str(), metadata.target(), level.as_str(), message.as_str()])
            .is_ok()
        {
            let _ = writer.flush();
        }
    }
}

impl Drop for CsvLogGuard {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

/// Collects the event message followed by its other fields as `name=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {}", self.message, fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init(log_file: &Path) -> anyhow::Result<CsvLogGuard> {
    let (csv_layer, guard) = CsvLogLayer::open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(csv_layer)
        .try_init()
        .context("failed to install the tracing subscriber")?;

    Ok(guard)
}
