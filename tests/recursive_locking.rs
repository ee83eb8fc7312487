//! Re-acquiring a lock on the thread that already holds it is reported
//! before the acquisition blocks.

#![cfg(deadlock_detection)]

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lockup::Mutex;

#[test]
fn relocking_on_the_same_thread_is_reported() {
    let harness = common::install(|opts| {
        opts.deadlock_timeout = Duration::ZERO;
    });

    let m = Arc::new(Mutex::new(0u32));
    let m2 = Arc::clone(&m);
    // The report fires from the pre-acquire check; the thread then blocks
    // on itself forever and is intentionally leaked.
    thread::spawn(move || {
        let _first = m2.lock();
        let _second = m2.lock();
    });

    common::spin_wait(&harness.deadlocks, 1);

    let log = harness.log.contents();
    assert!(
        log.contains("POTENTIAL DEADLOCK: Recursive locking:"),
        "report missing category tag:\n{log}"
    );
    assert!(
        log.contains("Previous place where the lock was grabbed (same thread)"),
        "{log}"
    );
}
