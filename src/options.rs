//! Process-wide detector configuration.
//!
//! Options live in a single global record guarded by a reader-writer lock so
//! that acquisition paths, watchdogs, and report rendering always observe a
//! coherent snapshot. Options may be changed at any point during operation
//! via [`write_locked`]; hot paths clone a snapshot under the read lock and
//! never hold the options lock across a blocking acquire.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};

/// Callback invoked on every detected potential deadlock.
///
/// The callback decides policy: count, log, abort, anything. It must not
/// touch any instrumented lock. It may run while the detector's internal
/// table lock is held, and re-entering the engine from there self-deadlocks.
pub type DeadlockCallback = Arc<dyn Fn() + Send + Sync>;

/// Shared handle to the report sink.
pub type LogSink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Tunables controlling how deadlock detection behaves.
///
/// The defaults are a 30 second acquisition timeout, a 65536-entry ordering
/// map, and reports written to standard error.
#[derive(Clone)]
pub struct Options {
    /// Waiting on a lock for longer than this is reported as a potential
    /// deadlock. A zero duration disables the watchdog entirely.
    pub deadlock_timeout: Duration,
    /// Maximum number of (happened-before, happened-after) lock pairs kept
    /// by the ordering table. The table is cleared wholesale when the bound
    /// is reached. Zero disables lock-order tracking.
    pub max_map_size: usize,
    /// Also dump every known thread's stack into timeout reports.
    pub print_all_threads: bool,
    /// Invoked on each detection. When unset, a detection panics instead.
    pub on_potential_deadlock: Option<DeadlockCallback>,
    /// Where reports are written. `None` discards them silently.
    pub log_buf: Option<LogSink>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            deadlock_timeout: Duration::from_secs(30),
            max_map_size: 1024 * 64,
            print_all_threads: false,
            on_potential_deadlock: None,
            log_buf: Some(Options::sink(io::stderr())),
        }
    }
}

impl Options {
    /// Wrap a writer for use as the report sink.
    ///
    /// # Example
    ///
    /// ```rust
    /// use lockup::{write_locked, Options};
    ///
    /// write_locked(|opts| {
    ///     opts.log_buf = Some(Options::sink(Vec::new()));
    /// });
    /// ```
    pub fn sink<W: Write + Send + 'static>(writer: W) -> LogSink {
        Arc::new(Mutex::new(Box::new(writer)))
    }
}

#[cfg(deadlock_detection)]
impl Options {
    pub(crate) fn ordering_enabled(&self) -> bool {
        self.max_map_size > 0
    }

    pub(crate) fn watchdog_enabled(&self) -> bool {
        !self.deadlock_timeout.is_zero()
    }

    /// Run `f` against the configured sink and flush afterwards.
    ///
    /// Report I/O is best-effort: write and flush errors must never disturb
    /// the program being diagnosed, so they are discarded here and callers
    /// use `let _ = write!(..)` throughout.
    pub(crate) fn with_sink<F: FnOnce(&mut dyn Write)>(&self, f: F) {
        if let Some(sink) = &self.log_buf {
            let mut writer = sink.lock();
            f(&mut **writer);
            let _ = writer.flush();
        }
    }

    /// Dispatch a detection to the configured callback, or panic when none
    /// is installed.
    pub(crate) fn potential_deadlock(&self) {
        match &self.on_potential_deadlock {
            Some(callback) => callback(),
            None => panic!("potential deadlock detected"),
        }
    }
}

lazy_static! {
    static ref OPTS: RwLock<Options> = RwLock::new(Options::default());
}

/// Call `f` with the global options locked for reading.
pub fn read_locked<R>(f: impl FnOnce(&Options) -> R) -> R {
    f(&OPTS.read())
}

/// Call `f` with the global options locked for writing.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// lockup::write_locked(|opts| {
///     opts.deadlock_timeout = Duration::from_secs(5);
/// });
/// ```
pub fn write_locked<R>(f: impl FnOnce(&mut Options) -> R) -> R {
    f(&mut OPTS.write())
}

/// Clone the current options under the read lock.
#[cfg(deadlock_detection)]
pub(crate) fn snapshot() -> Options {
    OPTS.read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documentation() {
        let opts = Options::default();
        assert_eq!(opts.deadlock_timeout, Duration::from_secs(30));
        assert_eq!(opts.max_map_size, 1024 * 64);
        assert!(!opts.print_all_threads);
        assert!(opts.on_potential_deadlock.is_none());
        assert!(opts.log_buf.is_some());
    }

    #[test]
    fn sink_accepts_any_writer() {
        let sink = Options::sink(Vec::new());
        let _ = sink.lock().write_all(b"report line\n");
    }

    #[cfg(deadlock_detection)]
    #[test]
    fn missing_sink_discards_reports() {
        let opts = Options {
            log_buf: None,
            ..Options::default()
        };
        // Must be a silent no-op rather than an error.
        opts.with_sink(|w| {
            let _ = writeln!(w, "never rendered");
        });
    }

    #[cfg(deadlock_detection)]
    #[test]
    #[should_panic(expected = "potential deadlock detected")]
    fn missing_callback_panics() {
        let opts = Options {
            on_potential_deadlock: None,
            ..Options::default()
        };
        opts.potential_deadlock();
    }
}
