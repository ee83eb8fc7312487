//! Shared/exclusive contention timeouts: a writer stuck behind a shared
//! holder is reported, and so is a reader queued behind that waiting
//! writer. Both complete once the shared holder releases.

#![cfg(deadlock_detection)]

mod common;

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use lockup::RwLock;

#[test]
fn writer_and_queued_reader_time_out_behind_shared_holder() {
    let harness = common::install(|opts| {
        opts.deadlock_timeout = Duration::from_millis(20);
    });

    let rw = Arc::new(RwLock::new(()));
    let held = rw.read();

    let (writer_tx, writer_rx) = mpsc::channel();
    let rw_writer = Arc::clone(&rw);
    thread::spawn(move || {
        let guard = rw_writer.write();
        drop(guard);
        let _ = writer_tx.send(());
    });
    common::spin_wait(&harness.deadlocks, 1);

    // The underlying lock is fair: with a writer parked, a fresh shared
    // acquisition queues behind it and times out as well.
    let (reader_tx, reader_rx) = mpsc::channel();
    let rw_reader = Arc::clone(&rw);
    thread::spawn(move || {
        let locker = rw_reader.read_locker();
        let guard = locker.lock();
        drop(guard);
        let _ = reader_tx.send(());
    });
    common::spin_wait(&harness.deadlocks, 2);

    drop(held);
    writer_rx
        .recv_timeout(Duration::from_millis(200))
        .expect("writer should complete once the shared holder releases");
    reader_rx
        .recv_timeout(Duration::from_millis(200))
        .expect("reader should complete once the writer is through");
}
