//! Log sinks for firmware that has a console but no `std`.
//!
//! The parser only emits records through the `log` facade. These let a
//! consumer without `std` route them to whatever `core::fmt::Write` it has,
//! such as the serial port this crate just told it about.

use core::fmt::Write;

use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Formats records at or above `level` onto a console, one line each:
///
/// ```text
/// ERROR lbparse::v2: Parse error: 'mem=0;4096,1': unexpected ';' after value 0
/// ```
pub struct LogSink<W> {
    console: Mutex<W>,
    level: LevelFilter,
}

impl<W> LogSink<W> {
    pub const fn new(console: W, level: LevelFilter) -> Self {
        LogSink {
            console: Mutex::new(console),
            level,
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// True while a record is being written. A panic that started inside
    /// `log` leaves the sink busy forever; a panic handler must not log
    /// through it then.
    pub fn is_busy(&self) -> bool {
        self.console.is_locked()
    }

    pub fn into_inner(self) -> W {
        self.console.into_inner()
    }
}

impl<W: Write + Send> Log for LogSink<W> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut console = self.console.lock();
        // A console that fails mid-record has nowhere to report it.
        let _ = writeln!(
            console,
            "{:>5} {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Sends every record to both loggers, first then second.
pub struct LogTee<A, B>(pub A, pub B);

impl<A: Log, B: Log> Log for LogTee<A, B> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.0.enabled(metadata) || self.1.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.0.log(record);
        self.1.log(record);
    }

    fn flush(&self) {
        self.0.flush();
        self.1.flush();
    }
}

/// Process-wide test logger. Records go to the harness's captured output and
/// to a buffer private to the logging thread, so tests running in parallel
/// can each inspect what they logged.
#[cfg(test)]
pub(crate) mod capture {
    use core::cell::RefCell;
    use core::fmt;
    use std::string::String;
    use std::sync::OnceLock;

    use log::LevelFilter;

    use super::{LogSink, LogTee};

    std::thread_local! {
        static CAPTURED: RefCell<String> = RefCell::new(String::new());
    }

    struct ThreadBuffer;

    impl fmt::Write for ThreadBuffer {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            CAPTURED.with(|c| c.borrow_mut().push_str(s));
            Ok(())
        }
    }

    static LOGGER: OnceLock<LogTee<env_logger::Logger, LogSink<ThreadBuffer>>> = OnceLock::new();

    pub(crate) fn init() {
        let logger = LOGGER.get_or_init(|| {
            LogTee(
                env_logger::Builder::from_default_env().is_test(true).build(),
                LogSink::new(ThreadBuffer, LevelFilter::Trace),
            )
        });
        if log::set_logger(logger).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    }

    /// Runs `f`, returning its result and everything it logged.
    pub(crate) fn capture<T>(f: impl FnOnce() -> T) -> (T, String) {
        init();
        CAPTURED.with(|c| c.borrow_mut().clear());
        let result = f();
        (result, CAPTURED.with(|c| c.take()))
    }
}
