//! Whole-tree lifecycle scenarios on the hosted platform: every test
//! boots its own kernel, runs a process tree to completion, and checks
//! that no descriptor or address space survives it.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use kestrel::host::{boot, spawn_init};
use kestrel::{task, wait_status};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn wait_after_child_already_exited() {
    init_logger();
    let kernel = boot();
    let (tx, rx) = mpsc::channel();

    spawn_init(&kernel, move || {
        let pid = task::fork(|| task::exit(0)).unwrap();
        // let the child become a zombie before waiting
        thread::sleep(Duration::from_millis(50));
        let (reaped, status) = task::waitpid(pid, 0).unwrap();
        assert_eq!(reaped, pid);
        tx.send(status).unwrap();
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(rx.recv().unwrap(), wait_status(0));
    assert_eq!(kernel.table.len(), 0);
    assert_eq!(kernel.platform.space_count(), 0);
    assert_eq!(kernel.platform.process_count(), 0);
}

#[test]
fn wait_blocks_until_child_exits() {
    init_logger();
    let kernel = boot();
    let (tx, rx) = mpsc::channel();

    spawn_init(&kernel, move || {
        let pid = task::fork(|| {
            thread::sleep(Duration::from_millis(100));
            task::exit(5);
        })
        .unwrap();
        // the child is still sleeping; this blocks until it exits
        let (reaped, status) = task::waitpid(pid, 0).unwrap();
        assert_eq!(reaped, pid);
        tx.send(status).unwrap();
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(rx.recv().unwrap(), wait_status(5));
    assert_eq!(kernel.table.len(), 0);
    assert_eq!(kernel.platform.space_count(), 0);
}

#[test]
fn child_sees_parent_and_own_identity() {
    init_logger();
    let kernel = boot();

    spawn_init(&kernel, || {
        let me = task::getpid().unwrap();
        let pid = task::fork(move || {
            assert_ne!(task::getpid().unwrap(), me);
            assert_eq!(task::getppid().unwrap(), me);
            task::exit(0);
        })
        .unwrap();
        assert_ne!(pid, me);
        task::waitpid(pid, 0).unwrap();
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(kernel.table.len(), 0);
}

#[test]
fn a_child_can_only_be_reaped_once() {
    init_logger();
    let kernel = boot();

    spawn_init(&kernel, || {
        let pid = task::fork(|| task::exit(1)).unwrap();
        assert_eq!(task::waitpid(pid, 0).unwrap(), (pid, wait_status(1)));
        // the pid was consumed by the first wait
        assert_eq!(task::waitpid(pid, 0), Err(kestrel::LinuxError::ECHILD));
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(kernel.table.len(), 0);
}

#[test]
fn parent_exit_disposes_zombie_and_orphans_runner() {
    init_logger();
    let kernel = boot();

    spawn_init(&kernel, || {
        // A exits immediately and is never reaped
        task::fork(|| task::exit(3)).unwrap();
        // B outlives the parent
        task::fork(|| {
            thread::sleep(Duration::from_millis(150));
            // the parent is long gone
            assert_eq!(task::getppid().unwrap(), 0);
            task::exit(9);
        })
        .unwrap();
        // let A become a zombie, then exit without reaping either child
        thread::sleep(Duration::from_millis(50));
        task::exit(0);
    });

    kernel.platform.join_all();
    // A was destroyed by the parent's exit, B destroyed itself
    assert_eq!(kernel.table.len(), 0);
    assert_eq!(kernel.platform.space_count(), 0);
    assert_eq!(kernel.platform.process_count(), 0);
}

#[test]
fn many_children_reaped_in_any_order() {
    init_logger();
    let kernel = boot();

    spawn_init(&kernel, || {
        let pids: Vec<_> = (0..16i32)
            .map(|code| {
                task::fork(move || {
                    thread::sleep(Duration::from_millis((code as u64 % 4) * 20));
                    task::exit(code);
                })
                .unwrap()
            })
            .collect();
        // reap in reverse creation order: some are zombies by now, some
        // are still running
        for (code, pid) in pids.iter().enumerate().rev() {
            let (reaped, status) = task::waitpid(*pid, 0).unwrap();
            assert_eq!(reaped, *pid);
            assert_eq!(status, wait_status(code as i32));
        }
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(kernel.table.len(), 0);
    assert_eq!(kernel.platform.space_count(), 0);
}

#[test]
fn grandchildren_are_reaped_bottom_up() {
    init_logger();
    let kernel = boot();
    let (tx, rx) = mpsc::channel();

    spawn_init(&kernel, move || {
        let child = task::fork(|| {
            let grandchild = task::fork(|| task::exit(2)).unwrap();
            let (_, status) = task::waitpid(grandchild, 0).unwrap();
            // forward the grandchild's code as our own
            task::exit(status >> 8);
        })
        .unwrap();
        let (_, status) = task::waitpid(child, 0).unwrap();
        tx.send(status).unwrap();
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(rx.recv().unwrap(), wait_status(2));
    assert_eq!(kernel.table.len(), 0);
    assert_eq!(kernel.platform.space_count(), 0);
}

#[test]
fn status_is_identical_for_both_wait_orderings() {
    init_logger();
    let kernel = boot();
    let (tx, rx) = mpsc::channel();

    spawn_init(&kernel, move || {
        // exits before the wait
        let early = task::fork(|| task::exit(11)).unwrap();
        thread::sleep(Duration::from_millis(50));
        let (_, early_status) = task::waitpid(early, 0).unwrap();

        // exits after the wait started
        let late = task::fork(|| {
            thread::sleep(Duration::from_millis(80));
            task::exit(11);
        })
        .unwrap();
        let (_, late_status) = task::waitpid(late, 0).unwrap();

        tx.send((early_status, late_status)).unwrap();
        task::exit(0);
    });

    kernel.platform.join_all();
    let (early_status, late_status) = rx.recv().unwrap();
    assert_eq!(early_status, late_status);
    assert_eq!(early_status, wait_status(11));
}
