use bronze_config::Environment;
use std::io::Error;
use std::io::Write;
use std::sync::OnceLock;
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::PanicHookInfo,
    sync::Once,
};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, InitError},
};
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt, layer::SubscriberExt};

/// JSON field naming the destination project of a log line.
const PROJECT_KEY_IN_LOG: &str = "project";
/// JSON field naming the sync run of a log line.
const RUN_ID_KEY_IN_LOG: &str = "run_id";

/// Directory rotated log files are written to in production.
const LOG_DIR: &str = "logs";
const MAX_LOG_FILES: usize = 5;

/// Errors that can occur during tracing initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("an io error occurred: {0}")]
    Io(#[from] Error),
}

/// Keeps buffered log lines alive until dropped.
///
/// Hold it for the whole run, dropping it flushes pending file writes.
#[must_use]
pub enum LogFlusher {
    Flusher(WorkerGuard),
    NullFlusher,
}

/// Fields injected at the top level of every JSON log line.
#[derive(Debug, Clone, Default)]
pub struct TopLevelFields {
    pub project: Option<String>,
    pub run_id: Option<String>,
}

static TOP_LEVEL_FIELDS: OnceLock<TopLevelFields> = OnceLock::new();

static INIT_TEST_TRACING: Once = Once::new();

/// Initializes tracing for tests.
///
/// Output is only enabled when `ENABLE_TRACING` is set:
/// ```bash
/// ENABLE_TRACING=1 cargo test sync_isolates_failures
/// ```
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Without an explicit environment tracing defaults to prod and writes to files.
            Environment::Dev.set();
            let _log_flusher =
                init_tracing("test").expect("Failed to initialize tracing for tests");
        }
    });
}

fn top_level_fields() -> Option<&'static TopLevelFields> {
    TOP_LEVEL_FIELDS.get()
}

/// Writer wrapper adding [`TopLevelFields`] to JSON log entries that lack them.
struct FieldInjectingWriter<W> {
    inner: W,
}

impl<W> FieldInjectingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W> Write for FieldInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(fields) = top_level_fields()
            && let Some(output) = inject_fields(buf, fields)
        {
            self.inner.write_all(output.as_bytes())?;
            return Ok(buf.len());
        }

        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Returns the JSON line with the missing top level fields added, or `None` when nothing changed.
fn inject_fields(buf: &[u8], fields: &TopLevelFields) -> Option<String> {
    let json_str = std::str::from_utf8(buf).ok()?;
    let serde_json::Value::Object(mut map) = serde_json::from_str(json_str).ok()? else {
        return None;
    };

    let mut modified = false;
    for (key, value) in [
        (PROJECT_KEY_IN_LOG, &fields.project),
        (RUN_ID_KEY_IN_LOG, &fields.run_id),
    ] {
        if let Some(value) = value
            && !map.contains_key(key)
        {
            map.insert(key.to_string(), serde_json::Value::String(value.clone()));
            modified = true;
        }
    }

    if !modified {
        return None;
    }

    let modified = serde_json::to_string(&map).ok()?;
    if json_str.ends_with('\n') {
        Some(format!("{modified}\n"))
    } else {
        Some(modified)
    }
}

/// Initializes tracing for the application.
///
/// Production environments log JSON to rotating files, development pretty prints to the console.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_top_level_fields(app_name, TopLevelFields::default())
}

/// Like [`init_tracing`] but tags every production log line with `fields`.
pub fn init_tracing_with_top_level_fields(
    app_name: &str,
    fields: TopLevelFields,
) -> Result<LogFlusher, TracingError> {
    let _ = TOP_LEVEL_FIELDS.set(fields);

    // Forward records emitted through the `log` crate by dependencies.
    LogTracer::init()?;

    let is_prod = Environment::load()?.is_prod();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if is_prod {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix("log")
        .rotation(rolling::Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .build(LOG_DIR)?;

    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let format = fmt::format()
        .with_level(true)
        .with_ansi(false)
        .with_target(false);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || FieldInjectingWriter::new(file_appender.make_writer()))
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let format = fmt::format()
        .with_level(true)
        .with_ansi(true)
        .pretty()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    // Stdout carries the run summary.
    let subscriber = FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Routes panics through `tracing` before running the previous hook.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_hook(info);
        prev_hook(info);
    }));
}

fn panic_hook(panic_info: &PanicHookInfo) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        BacktraceStatus::Unsupported => {
            (None, Some("backtraces are not supported on this platform"))
        }
        _ => (None, Some("backtrace status is unknown")),
    };

    let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    };

    let location = panic_info.location().map(|location| location.to_string());

    tracing::error!(
        panic.payload = payload,
        payload.location = location,
        panic.backtrace = backtrace.map(tracing::field::display),
        panic.note = note,
        "a panic occurred",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> TopLevelFields {
        TopLevelFields {
            project: Some("acme".to_string()),
            run_id: Some("run-1".to_string()),
        }
    }

    #[test]
    fn missing_fields_are_injected_keeping_the_newline() {
        let output = inject_fields(b"{\"message\":\"synced\"}\n", &fields()).unwrap();

        assert!(output.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(output.trim_end()).unwrap();
        assert_eq!(value["project"], "acme");
        assert_eq!(value["run_id"], "run-1");
        assert_eq!(value["message"], "synced");
    }

    #[test]
    fn existing_fields_are_left_alone() {
        let line = br#"{"project":"other","run_id":"run-0"}"#;

        assert_eq!(inject_fields(line, &fields()), None);
    }

    #[test]
    fn non_json_lines_are_not_touched() {
        assert_eq!(inject_fields(b"plain text line", &fields()), None);
    }
}
