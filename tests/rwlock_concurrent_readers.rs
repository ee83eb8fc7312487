//! Known tracking limitation: the holder table keeps only the latest
//! observed holder per lock, so concurrent shared holders overwrite one
//! another and the first shared release clears the slot. A timeout report
//! for a writer blocked on the surviving reader therefore lacks the
//! holder's stack. This test documents the gap and is ignored until
//! per-lock holder sets are tracked.

#![cfg(deadlock_detection)]

mod common;

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use lockup::RwLock;

#[test]
#[ignore = "known tracking limitation: concurrent shared holders overwrite the holder record"]
fn surviving_reader_appears_in_timeout_report() {
    let harness = common::install(|opts| {
        opts.max_map_size = 0;
        opts.deadlock_timeout = Duration::from_millis(5);
    });

    let rw = Arc::new(RwLock::new(()));

    let (first_locked_tx, first_locked_rx) = mpsc::channel();
    let (second_locked_tx, second_locked_rx) = mpsc::channel();
    let (first_unlocked_tx, first_unlocked_rx) = mpsc::channel();
    let (release_second_tx, release_second_rx) = mpsc::channel::<()>();

    let rw1 = Arc::clone(&rw);
    thread::spawn(move || {
        let guard = rw1.read();
        let _ = first_locked_tx.send(());
        let _ = second_locked_rx.recv();
        drop(guard);
        let _ = first_unlocked_tx.send(());
    });
    first_locked_rx.recv().unwrap();

    let rw2 = Arc::clone(&rw);
    let second_locked_probe = mpsc::channel::<()>();
    let second_locked_probe_tx = second_locked_probe.0;
    thread::spawn(move || {
        let guard = rw2.read();
        let _ = second_locked_tx.send(());
        let _ = second_locked_probe_tx.send(());
        let _ = release_second_rx.recv();
        drop(guard);
    });
    second_locked_probe.1.recv().unwrap();
    first_unlocked_rx.recv().unwrap();

    // The second reader still holds the lock shared, but its holder record
    // was wiped by the first reader's release.
    let (writer_done_tx, writer_done_rx) = mpsc::channel();
    let rw3 = Arc::clone(&rw);
    thread::spawn(move || {
        let guard = rw3.write();
        drop(guard);
        let _ = writer_done_tx.send(());
    });

    common::spin_wait(&harness.deadlocks, 1);

    drop(release_second_tx);
    writer_done_rx
        .recv_timeout(Duration::from_millis(100))
        .expect("writer should complete once the reader releases");

    // With full shared-holder tracking this would pass; today the holder
    // slot is empty and the report omits the section.
    let log = harness.log.contents();
    assert!(log.contains("previously locked it from:"), "{log}");
}
