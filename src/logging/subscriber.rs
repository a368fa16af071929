//! Where `npm-exports` messages go: coloured console lines and the
//! per-command log file.
//!
//! The [`Logger`](super::Logger) tags stage headers, successes and the export
//! summary with dedicated targets. Both sinks key their layout on those
//! targets.
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::Level;

use super::logger::{STAGE_TARGET, SUCCESS_TARGET, SUMMARY_TARGET};
use super::types::LogLevel;
use super::utils::{Stamp, log_file_path, strip_ansi};

/// Pulls the formatted `message` field out of an event.
#[derive(Default)]
struct MessageExtractor {
    message: String,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn message_of(event: &tracing::Event<'_>) -> String {
    let mut extractor = MessageExtractor::default();
    event.record(&mut extractor);
    extractor.message
}

/// Plain-text body of one log file line, without the time stamp.
///
/// Stage headers are framed so the phases of a run stand out. Summary rows
/// are kept verbatim.
fn file_line(level: Level, target: &str, msg: &str) -> String {
    let tag = match (level, target) {
        (Level::INFO, STAGE_TARGET) => return format!("== {msg} =="),
        (Level::INFO, SUMMARY_TARGET) => return msg.to_string(),
        (Level::INFO, SUCCESS_TARGET) => "ok",
        (Level::ERROR, _) => "error",
        (Level::WARN, _) => "warn",
        (Level::DEBUG | Level::TRACE, _) => "debug",
        _ => "",
    };
    format!("{tag:<6}{msg}")
}

/// Layer writing every event to `$XDG_CACHE_HOME/npm-exports/<command>.log`.
///
/// Debug detail such as per-file writes always reaches the file, whatever
/// the console shows.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log file for `command` and start it with a run header
    /// naming the version, the command and the working directory.
    ///
    /// Returns `None` if the cache directory or the file is unavailable.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version = option_env!("NPM_EXPORTS_VERSION")
            .unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let cwd = std::env::current_dir()
            .map_or_else(|_| String::new(), |dir| dir.display().to_string());
        let header = format!(
            "# npm-exports {version} {command}\n# started {}\n# in {cwd}\n",
            Stamp::Header.now(),
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let msg = strip_ansi(&message_of(event));
        let body = file_line(*metadata.level(), metadata.target(), &msg);
        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "[{}] {body}", Stamp::Line.now()).ok();
        }
    }
}

/// Console layout: coloured level labels, `==>` stage headers and
/// unindented summary rows.
struct ExportsFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ExportsFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let msg = message_of(event);
        match (*metadata.level(), metadata.target()) {
            (Level::ERROR, _) => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            (Level::WARN, _) => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            (Level::INFO, STAGE_TARGET) => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            (Level::INFO, SUCCESS_TARGET) => writeln!(writer, "\x1b[32mOK\x1b[0m    {msg}"),
            (Level::INFO, SUMMARY_TARGET) => writeln!(writer, "{msg}"),
            (Level::INFO, _) => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Install the process-wide subscriber for one `npm-exports` command.
///
/// Warnings and errors go to stderr and the rest to stdout. The command's
/// log file receives every event. `--log-level` is
/// applied by the [`Logger`](super::Logger); here it only decides whether
/// debug lines reach the console. Call once, before the first message.
pub fn init_subscriber(min_level: LogLevel, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if min_level == LogLevel::Debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ExportsFormatter)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
