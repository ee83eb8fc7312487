//! Shared harness for the detection scenarios.
//!
//! Each scenario lives in its own integration-test file so that every
//! scenario gets a fresh process and therefore fresh global detector state.

#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread;
use std::time::Duration;

use lockup::{write_locked, Options};

/// Counting callback plus captured report output.
pub struct Harness {
    pub deadlocks: Arc<AtomicU32>,
    pub log: LogCapture,
}

/// A cloneable writer collecting report bytes for assertions.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<StdMutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install a counting callback and a capturing sink, then let the scenario
/// adjust the remaining options.
pub fn install(configure: impl FnOnce(&mut Options)) -> Harness {
    let deadlocks = Arc::new(AtomicU32::new(0));
    let log = LogCapture::default();
    let counter = Arc::clone(&deadlocks);
    let sink = log.clone();
    write_locked(|opts| {
        opts.on_potential_deadlock = Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        opts.log_buf = Some(Options::sink(sink));
        configure(opts);
    });
    Harness { deadlocks, log }
}

/// Poll until the detection counter reaches `want`, then assert that it
/// settles there.
pub fn spin_wait(counter: &AtomicU32, want: u32) {
    for _ in 0..1000 {
        if counter.load(Ordering::SeqCst) == want {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(10));
    assert_eq!(
        counter.load(Ordering::SeqCst),
        want,
        "unexpected number of reported potential deadlocks"
    );
}
