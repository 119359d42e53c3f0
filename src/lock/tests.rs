use super::*;
use crate::{
    gate::StageGate,
    loom::{self, thread},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum Phase {
    Read,
    Write,
}

fn locks() -> (StageGate<Phase>, StageLock<Phase>, StageLock<Phase>) {
    let gate = StageGate::new();
    let read = LockStrategy::Passthrough.build(gate.bind(Phase::Read));
    let write = LockStrategy::Exclusive.build(gate.bind(Phase::Write));
    (gate, read, write)
}

#[test]
fn stage_lock_is_send_and_sync() {
    crate::util::test::assert_send_sync::<StageLock<Phase>>();
}

#[test]
#[cfg(not(loom))]
fn build_picks_adapter() {
    let (_, read, write) = locks();
    assert!(matches!(read, StageLock::Passthrough(_)));
    assert_eq!(read.strategy(), LockStrategy::Passthrough);
    assert_eq!(read.stage(), &Phase::Read);

    assert!(matches!(write, StageLock::Exclusive(_)));
    assert_eq!(write.strategy(), LockStrategy::Exclusive);
    assert_eq!(write.stage(), &Phase::Write);
}

#[test]
fn strategy_from_str() {
    assert_eq!("passthrough".parse(), Ok(LockStrategy::Passthrough));
    assert_eq!("Exclusive".parse(), Ok(LockStrategy::Exclusive));
    assert_eq!(" EXCLUSIVE\n".parse(), Ok(LockStrategy::Exclusive));
    assert_eq!(
        "shared".parse::<LockStrategy>(),
        Err(ConfigError::UnknownStrategy("shared".to_owned()))
    );
}

#[test]
fn strategy_display() {
    for strategy in [LockStrategy::Passthrough, LockStrategy::Exclusive] {
        assert_eq!(strategy.to_string().parse(), Ok(strategy));
    }
    assert_eq!(format!("[{:>12}]", LockStrategy::Exclusive), "[   exclusive]");
}

#[test]
fn guard_unlocks_on_drop() {
    loom::model(|| {
        let (gate, read, write) = locks();
        {
            let _r1 = read.guard();
            let r2 = read.try_guard().expect("passthrough admits a second holder");
            assert_eq!(r2.stage(), &Phase::Read);
            assert!(write.try_guard().is_none());
        }
        assert!(!read.is_locked());
        assert!(gate.is_idle());

        let w = write.guard();
        assert!(write.try_guard().is_none(), "exclusive admits one holder");
        assert!(read.try_guard().is_none());
        drop(w);
        assert!(gate.is_idle());
    });
}

#[test]
fn failed_try_guard_keeps_existing_hold() {
    loom::model(|| {
        let (gate, read, write) = locks();

        // the same stage, held by someone else
        write.lock();
        assert!(write.try_guard().is_none());
        assert!(write.is_locked(), "a failed try_guard must not release the write hold");
        assert_eq!(gate.active_stage(), Some(Phase::Write));

        // another stage, with nothing of its own to release
        assert!(read.try_guard().is_none());
        assert!(!read.is_locked());
        assert_eq!(gate.active_stage(), Some(Phase::Write));

        write.unlock();
        assert!(gate.is_idle());
    });
}

#[test]
#[cfg(not(loom))]
fn failed_try_guard_for_keeps_existing_hold() {
    let _trace = crate::util::test::trace_init();
    let (gate, read, write) = locks();
    read.lock();
    read.lock();

    assert!(write.try_guard_for(Duration::from_millis(10)).is_none());
    assert!(!write.is_locked());
    match &read {
        StageLock::Passthrough(lock) => assert_eq!(lock.holders(), 2),
        StageLock::Exclusive(_) => unreachable!("read is a passthrough stage"),
    }

    write.lock();
    assert!(write.try_guard_for(Duration::from_millis(10)).is_none());
    assert!(write.is_locked());
    write.unlock();

    read.unlock();
    read.unlock();
    assert!(gate.is_idle());
}

#[test]
fn guard_moves_between_stages() {
    loom::model(|| {
        let (gate, read, write) = locks();
        let r = read.guard();

        let t1 = thread::spawn({
            let write = write.clone();
            let gate = gate.clone();
            move || {
                let _w = write.guard();
                assert_eq!(gate.active_stage(), Some(Phase::Write));
            }
        });

        drop(r);
        t1.join().unwrap();
        assert!(gate.is_idle());
    });
}

#[test]
fn delegates_interruptible_lock() {
    loom::model(|| {
        let (gate, read, write) = locks();
        let interrupt = Interrupt::new();
        assert_eq!(write.lock_interruptibly(&interrupt), Ok(()));

        interrupt.interrupt();
        assert_eq!(read.lock_interruptibly(&interrupt), Err(Interrupted(())));
        assert!(!read.is_locked());

        write.unlock();
        assert!(gate.is_idle());
    });
}

#[test]
#[cfg(not(loom))]
fn try_guard_for_times_out() {
    let _trace = crate::util::test::trace_init();
    let (gate, read, write) = locks();
    let _r = read.guard();

    let start = std::time::Instant::now();
    assert!(write.try_guard_for(Duration::from_millis(30)).is_none());
    assert!(start.elapsed() >= Duration::from_millis(30));
    assert_eq!(gate.active_stage(), Some(Phase::Read));
}

#[test]
#[cfg(not(loom))]
fn debug_output() {
    let (_, read, write) = locks();
    let _r = read.guard();
    let read = format!("{read:?}");
    assert!(read.contains("PassthroughLock"), "{read}");
    assert!(read.contains("holders: 1"), "{read}");
    let write = format!("{write:?}");
    assert!(write.contains("ExclusiveLock"), "{write}");
    assert!(write.contains("Write"), "{write}");
}
