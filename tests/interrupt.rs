#![cfg(not(loom))]
use staged_lock::{Interrupt, Interrupted, LockStrategy, RawStageLock};
use std::{
    thread,
    time::{Duration, Instant},
};

mod support;
use support::{trace_init, two_stages};

const STRATEGIES: [LockStrategy; 2] = [LockStrategy::Passthrough, LockStrategy::Exclusive];

#[test]
fn interrupt_wakes_every_waiter() {
    let _trace = trace_init();
    for strategy in STRATEGIES {
        let lock = two_stages(strategy);
        let interrupt = Interrupt::new();
        lock.get_lock(&"a").unwrap().lock();

        thread::scope(|s| {
            let waiters = (0..4)
                .map(|_| s.spawn(|| lock.get_lock(&"b").unwrap().lock_interruptibly(&interrupt)))
                .collect::<Vec<_>>();
            thread::sleep(Duration::from_millis(20));
            interrupt.interrupt();
            for waiter in waiters {
                let res = waiter.join().unwrap();
                assert!(matches!(res, Err(Interrupted { .. })), "{strategy}: {res:?}");
            }
        });

        // a cancelled acquisition leaves no trace
        let b = lock.get_lock(&"b").unwrap();
        assert!(!b.is_locked());
        assert_eq!(lock.active_stage(), Some("a"));

        // the interrupt stays triggered until cleared
        lock.get_lock(&"a").unwrap().unlock();
        assert!(b.lock_interruptibly(&interrupt).is_err());
        assert_eq!(lock.active_stage(), None);

        interrupt.clear();
        assert_eq!(b.lock_interruptibly(&interrupt), Ok(()));
        assert_eq!(lock.active_stage(), Some("b"));
        b.unlock();
    }
}

#[test]
fn interrupt_only_cancels_its_own_waiters() {
    let _trace = trace_init();
    let lock = two_stages(LockStrategy::Passthrough);
    let (cancelled, other) = (Interrupt::new(), Interrupt::new());
    lock.get_lock(&"a").unwrap().lock();

    thread::scope(|s| {
        let b = lock.get_lock(&"b").unwrap();
        let t1 = s.spawn(|| b.lock_interruptibly(&cancelled));
        let t2 = s.spawn(|| b.lock_interruptibly(&other));
        thread::sleep(Duration::from_millis(20));

        cancelled.interrupt();
        assert!(t1.join().unwrap().is_err());
        assert!(!t2.is_finished());

        lock.get_lock(&"a").unwrap().unlock();
        assert_eq!(t2.join().unwrap(), Ok(()));
        assert_eq!(lock.active_stage(), Some("b"));
        b.unlock();
    });
}

#[test]
fn timeout_bounds_wait() {
    let _trace = trace_init();
    for strategy in STRATEGIES {
        let lock = two_stages(strategy);
        let (a, b) = (lock.get_lock(&"a").unwrap(), lock.get_lock(&"b").unwrap());
        a.lock();

        let start = Instant::now();
        assert!(!b.try_lock_for(Duration::from_millis(50)));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50), "{strategy}: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "{strategy}: {elapsed:?}");

        // a zero timeout is a probe
        let start = Instant::now();
        assert!(!b.try_lock_for(Duration::ZERO));
        assert!(start.elapsed() < Duration::from_secs(1));

        a.unlock();
        assert!(b.try_lock_for(Duration::ZERO));
        b.unlock();
    }
}

#[test]
fn timed_lock_acquires_once_released() {
    let _trace = trace_init();
    for strategy in STRATEGIES {
        let lock = two_stages(strategy);
        let a = lock.get_lock(&"a").unwrap();
        a.lock();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                lock.get_lock(&"b")
                    .unwrap()
                    .try_lock_for(Duration::from_secs(30))
            });
            thread::sleep(Duration::from_millis(20));
            a.unlock();
            assert!(waiter.join().unwrap(), "{strategy}");
        });

        assert_eq!(lock.active_stage(), Some("b"));
        lock.get_lock(&"b").unwrap().unlock();
    }
}

#[test]
fn timed_interruptible_lock() {
    let _trace = trace_init();
    for strategy in STRATEGIES {
        let lock = two_stages(strategy);
        let (a, b) = (lock.get_lock(&"a").unwrap(), lock.get_lock(&"b").unwrap());
        let interrupt = Interrupt::new();
        a.lock();

        // times out
        assert_eq!(
            b.try_lock_for_interruptibly(Duration::from_millis(20), &interrupt),
            Ok(false)
        );

        // interrupted long before the timeout
        thread::scope(|s| {
            let start = Instant::now();
            let waiter =
                s.spawn(|| b.try_lock_for_interruptibly(Duration::from_secs(30), &interrupt));
            thread::sleep(Duration::from_millis(20));
            interrupt.interrupt();
            assert!(waiter.join().unwrap().is_err());
            assert!(start.elapsed() < Duration::from_secs(30));
        });
        assert!(!b.is_locked());

        // acquired
        interrupt.clear();
        a.unlock();
        assert_eq!(
            b.try_lock_for_interruptibly(Duration::from_millis(20), &interrupt),
            Ok(true)
        );
        b.unlock();
        assert_eq!(lock.active_stage(), None);
    }
}
