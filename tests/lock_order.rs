//! AB/BA detection: one thread establishes a-before-b, a later thread takes
//! the locks in the opposite order, and exactly one report fires with both
//! witness stacks.

#![cfg(deadlock_detection)]

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lockup::{Mutex, RwLock};

#[test]
fn opposing_order_across_threads_is_reported() {
    let harness = common::install(|opts| {
        opts.deadlock_timeout = Duration::ZERO;
    });

    let a = Arc::new(RwLock::new(()));
    let b = Arc::new(Mutex::new(()));

    // First thread records a-before-b; joining it is the barrier that
    // guarantees the edge exists before the opposing order is attempted.
    let (a1, b1) = (Arc::clone(&a), Arc::clone(&b));
    thread::spawn(move || {
        let _a = a1.write();
        let _b = b1.lock();
    })
    .join()
    .unwrap();
    assert_eq!(harness.deadlocks.load(Ordering::SeqCst), 0);

    // Second thread takes b, then a shared a: the opposite order.
    let (a2, b2) = (Arc::clone(&a), Arc::clone(&b));
    thread::spawn(move || {
        let _b = b2.lock();
        let _a = a2.read();
    })
    .join()
    .unwrap();

    common::spin_wait(&harness.deadlocks, 1);

    let log = harness.log.contents();
    assert!(
        log.contains("POTENTIAL DEADLOCK: Inconsistent locking:"),
        "report missing category tag:\n{log}"
    );
    assert!(log.contains("saw this ordering in one thread:"), "{log}");
    assert!(log.contains("happened before"), "{log}");
    assert!(log.contains("in another thread: happened before"), "{log}");
    assert!(log.contains("happened after"), "{log}");
}
