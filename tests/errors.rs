//! Error paths: wait validation and lookup errors, and fork rollback on
//! resource exhaustion.

use std::thread;
use std::time::Duration;

use kestrel::host::{HostConfig, boot, boot_with, spawn_init};
use kestrel::{LinuxError, task, wait_status};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn nonzero_options_are_rejected_without_touching_state() {
    init_logger();
    let kernel = boot();

    spawn_init(&kernel, || {
        let pid = task::fork(|| {
            thread::sleep(Duration::from_millis(50));
            task::exit(4);
        })
        .unwrap();
        // rejected before any state is inspected
        assert_eq!(task::waitpid(pid, 1), Err(LinuxError::EINVAL));
        assert_eq!(task::waitpid(pid, 0x40000000), Err(LinuxError::EINVAL));
        // the child is untouched and still waitable
        assert_eq!(task::waitpid(pid, 0).unwrap(), (pid, wait_status(4)));
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(kernel.table.len(), 0);
}

#[test]
fn waiting_on_a_non_child_fails() {
    init_logger();
    let kernel = boot();

    spawn_init(&kernel, || {
        let me = task::getpid().unwrap();
        // never existed
        assert_eq!(task::waitpid(me + 1000, 0), Err(LinuxError::ECHILD));
        // the caller itself is not one of its own children
        assert_eq!(task::waitpid(me, 0), Err(LinuxError::ECHILD));
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(kernel.table.len(), 0);
}

#[test]
fn a_grandchild_is_not_waitable() {
    init_logger();
    let kernel = boot();

    spawn_init(&kernel, || {
        let child = task::fork(|| {
            let grandchild = task::fork(|| {
                thread::sleep(Duration::from_millis(100));
                task::exit(0)
            })
            .unwrap();
            task::waitpid(grandchild, 0).unwrap();
            task::exit(grandchild as i32);
        })
        .unwrap();
        // the grandchild's pid is the child's pid + 1 on a fresh kernel;
        // whichever pid it got, it is not a child of init
        let (_, status) = task::waitpid(child, 0).unwrap();
        let grandchild = (status >> 8) as u32;
        assert_eq!(task::waitpid(grandchild, 0), Err(LinuxError::ECHILD));
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(kernel.table.len(), 0);
}

#[test]
fn fork_fails_cleanly_when_memory_is_exhausted() {
    init_logger();
    // room for the init image (0x1000) but not for a duplicate
    let kernel = boot_with(HostConfig {
        memory_limit: 0x1800,
        init_space_size: 0x1000,
        ..HostConfig::default()
    });

    spawn_init(&kernel, || {
        assert_eq!(task::fork(|| task::exit(0)), Err(LinuxError::ENOMEM));
        // the rollback left no child behind
        assert_eq!(task::waitpid(2, 0), Err(LinuxError::ECHILD));
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(kernel.table.len(), 0);
    assert_eq!(kernel.platform.space_count(), 0);
}

#[test]
fn fork_fails_cleanly_when_process_slots_run_out() {
    init_logger();
    let kernel = boot_with(HostConfig {
        process_limit: 2,
        ..HostConfig::default()
    });

    spawn_init(&kernel, || {
        let pid = task::fork(|| {
            thread::sleep(Duration::from_millis(200));
            task::exit(0);
        })
        .unwrap();
        // two processes are live; the next fork is refused after the
        // address space was already duplicated, exercising the rollback
        // of both the registration and the duplicated space
        assert_eq!(task::fork(|| task::exit(0)), Err(LinuxError::EAGAIN));
        // the surviving child is unaffected
        assert_eq!(task::waitpid(pid, 0).unwrap(), (pid, wait_status(0)));
        task::exit(0);
    });

    kernel.platform.join_all();
    assert_eq!(kernel.table.len(), 0);
    assert_eq!(kernel.platform.space_count(), 0);
}
