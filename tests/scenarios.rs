//! Integration coverage for the seed scenarios the runtime's design notes
//! enumerate as testable properties: yield fairness, sleep, gather,
//! wait_for timeout, and cancellation cascade through both gather and
//! fawait.

mod support;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use corolite::{
    fawait, gather, run_until_complete, sleep, vgather, wait_for, yield_now, CoroError,
    EventLoop, TaskBuilder,
};
use support::FakeClock;

fn fresh_loop() {
    let _ = env_logger::builder().is_test(true).try_init();
    corolite::set_event_loop(Rc::new(RefCell::new(EventLoop::new())));
}

/// S1 — yield fairness: two bodies each loop i in 0..3, recording (tag, i),
/// yielding once per iteration. Scheduled in order A, B. Expected trace:
/// (A,0), (B,0), (A,1), (B,1), (A,2), (B,2).
#[test]
fn s1_yield_fairness_interleaves_in_schedule_order() {
    fresh_loop();
    let log = Rc::new(RefCell::new(Vec::new()));

    async fn looper(tag: char, log: Rc<RefCell<Vec<(char, u32)>>>) {
        for i in 0..3u32 {
            log.borrow_mut().push((tag, i));
            yield_now().await;
        }
    }

    let a = corolite::create_task("a", looper('A', log.clone()));
    let b = corolite::create_task("b", looper('B', log.clone()));

    corolite::run_forever(&corolite::get_event_loop());

    assert!(a.done());
    assert!(b.done());
    assert_eq!(
        *log.borrow(),
        vec![
            ('A', 0),
            ('B', 0),
            ('A', 1),
            ('B', 1),
            ('A', 2),
            ('B', 2),
        ]
    );
}

/// A minimal body publishing `42` into its own args slot once `delay` has
/// elapsed on the real system clock — the integration-test counterpart to
/// the sleep combinator, written directly against the public `Body`
/// contract so the test can observe the state's `args` slot afterwards.
struct SleepThenRecord {
    delay: Duration,
    start: Option<Instant>,
}

impl corolite::Body for SleepThenRecord {
    fn resume(&mut self, state: &corolite::CoroState) -> corolite::Cursor {
        let now = Instant::now();
        let start = *self.start.get_or_insert(now);
        if now.saturating_duration_since(start) >= self.delay {
            state.set_args(42i32);
            corolite::Cursor::Done
        } else {
            corolite::Cursor::Cont
        }
    }
}

/// S2 — sleep: a single coroutine sleeps 0.05s, then publishes 42 into its
/// args slot. After `run_until_complete`, args reads back 42 and at least
/// 0.05s of real wall time elapsed.
#[test]
fn s2_sleep_then_publish_result() {
    fresh_loop();
    let main = TaskBuilder::new().build(Box::new(SleepThenRecord {
        delay: Duration::from_millis(50),
        start: None,
    }));

    let began = Instant::now();
    run_until_complete(&main);
    let elapsed = began.elapsed();

    assert!(main.done());
    assert_eq!(main.args::<i32>(), Some(42));
    assert!(elapsed >= Duration::from_millis(50));
}

/// S3 — gather: three sleepers (10ms, 20ms, 30ms) gathered; the gatherer
/// completes only once all three are done, and releases the refcount share
/// it took on each.
#[test]
fn s3_gather_waits_for_every_child() {
    fresh_loop();
    let clock = FakeClock::new(Duration::from_millis(1));
    let children: Vec<_> = [10u64, 20, 30]
        .iter()
        .map(|ms| corolite::sleep_with_clock(Duration::from_millis(*ms), clock.clone()))
        .collect();
    let g = gather(&children);

    run_until_complete(&g);

    assert!(g.done());
    for child in &children {
        assert!(child.done());
        // Each child is born self-owning (refcount 1); `gather` incref'd it
        // to 2 on entry, its own Done transition released that
        // self-reference back to 1, and `gather` noticing it `done()`
        // released the remaining share down to 0, its reapable value.
        assert_eq!(child.refcount(), 0);
    }
}

/// S6 — gather of zero: completes immediately, in one pass.
#[test]
fn s6_gather_of_zero_completes_immediately() {
    fresh_loop();
    let g = gather(&[]);
    assert!(!g.done());
    run_until_complete(&g);
    assert!(g.done());
}

/// Exercises the owning variant too: `vgather` takes the backing `Vec` and
/// registers it with the arena, releasing it at the gatherer's own
/// destruction rather than leaving it to the caller.
#[test]
fn vgather_of_owned_children_completes() {
    fresh_loop();
    let children = vec![sleep(Duration::ZERO), sleep(Duration::ZERO)];
    let g = vgather(children);
    run_until_complete(&g);
    assert!(g.done());
}

/// S4 — wait_for timeout: child sleeps far longer than the timeout; after
/// the loop completes, the parent's error is `ECanceled` and the child has
/// been cancelled.
#[test]
fn s4_wait_for_timeout_cancels_the_child() {
    fresh_loop();
    let clock = FakeClock::new(Duration::from_millis(1));
    let child = corolite::sleep_with_clock(Duration::from_secs(10), clock.clone());
    let parent =
        corolite::wait_for_with_clock(child.clone(), Duration::from_millis(5), clock.clone());

    run_until_complete(&parent);

    assert!(parent.done());
    assert_eq!(parent.err(), CoroError::ECanceled);
    assert!(child.cancelled());
}

/// S5 — cancel cascade: a parent holds a child via `fawait`; external
/// cancellation of the parent must, on the loop's next pass, finalize the
/// parent as `Done`/`ECanceled` and cancel the child in turn.
#[test]
fn s5_external_cancel_cascades_through_fawait() {
    fresh_loop();
    let loop_handle = corolite::get_event_loop();

    let child = sleep(Duration::from_secs(10));
    let parent = fawait(child.clone());
    loop_handle.borrow_mut().add_task(Some(parent.clone()));

    // One pass: parent resumes (Init -> Cont), child not yet done.
    corolite::step(&loop_handle);
    assert!(!parent.done());

    corolite::cancel(&parent);
    corolite::step(&loop_handle);

    assert!(parent.done());
    assert_eq!(parent.err(), CoroError::ECanceled);
    assert!(child.cancelled());
}
