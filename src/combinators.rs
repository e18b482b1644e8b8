// The MIT License (MIT)

// Copyright (c) 2015 Rustcc Developers

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! `yield_once`, `sleep`, `gather`/`vgather`, `wait_for` and `fawait` — all
//! ordinary coroutines built on top of [`crate::state`] and
//! [`crate::scheduler`], exactly as the runtime's design notes describe:
//! each one is a small [`Body`] implementation that schedules and holds
//! references to child states, with no privileged access to the loop
//! beyond what [`crate::environment::get_event_loop`] already exposes to
//! any caller.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use crate::builder::TaskBuilder;
use crate::clock::{elapsed_at_least, Clock, SystemClock};
use crate::environment;
use crate::error::CoroError;
use crate::state::{Body, CoroState, Cursor, Handle};

/// Resumes, suspends once, then completes.
struct YieldOnce {
    polled: bool,
}

impl Body for YieldOnce {
    fn resume(&mut self, _state: &CoroState) -> Cursor {
        if self.polled {
            Cursor::Done
        } else {
            self.polled = true;
            Cursor::Cont
        }
    }
}

/// A coroutine that suspends exactly once, then completes.
pub fn yield_once() -> Handle {
    TaskBuilder::new().build(Box::new(YieldOnce { polled: false }))
}

/// A future that is `Pending` exactly once, then `Ready`. The in-body
/// counterpart to [`yield_once`]'s standalone-handle form: `.await`ing one
/// inside an `async` body hands control back to the loop for the rest of
/// the current pass without spawning a separate coroutine.
pub struct YieldNow {
    polled: bool,
}

impl Future for YieldNow {
    type Output = ();
    fn poll(mut self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<()> {
        if self.polled {
            Poll::Ready(())
        } else {
            self.polled = true;
            Poll::Pending
        }
    }
}

/// Suspend the current `async` body for one pass of the loop.
pub fn yield_now() -> YieldNow {
    YieldNow { polled: false }
}

/// Samples the clock on first resume; completes once at least `delay` has
/// elapsed. `delay == Duration::ZERO` is equivalent to [`yield_once`].
struct Sleep {
    delay: Duration,
    start: Option<std::time::Instant>,
    clock: Rc<dyn Clock>,
}

impl Body for Sleep {
    fn resume(&mut self, _state: &CoroState) -> Cursor {
        let now = self.clock.now();
        let start = *self.start.get_or_insert(now);
        if elapsed_at_least(start, now, self.delay) {
            Cursor::Done
        } else {
            Cursor::Cont
        }
    }
}

/// Sleep for `delay`, sampling [`SystemClock`].
pub fn sleep(delay: Duration) -> Handle {
    sleep_with_clock(delay, Rc::new(SystemClock))
}

/// Sleep for `delay`, sampling a caller-supplied [`Clock`] — the injection
/// point tests use to avoid real wall-clock delay.
pub fn sleep_with_clock(delay: Duration, clock: Rc<dyn Clock>) -> Handle {
    if delay.is_zero() {
        return yield_once();
    }
    TaskBuilder::new().build(Box::new(Sleep {
        delay,
        start: None,
        clock,
    }))
}

/// Scans its owned list of children each resume; any child that is `Done`
/// is removed and has its refcount decremented. Completes once the list is
/// empty.
struct Gather {
    children: Rc<RefCell<Vec<Handle>>>,
}

impl Body for Gather {
    fn resume(&mut self, _state: &CoroState) -> Cursor {
        let mut children = self.children.borrow_mut();
        children.retain(|child| {
            if child.done() {
                child.decref();
                false
            } else {
                true
            }
        });
        if children.is_empty() {
            Cursor::Done
        } else {
            Cursor::Cont
        }
    }
}

fn build_gather(children: Vec<Handle>, register_with_arena: bool) -> Handle {
    let shared = Rc::new(RefCell::new(children));
    {
        let loop_handle = environment::get_event_loop();
        let list = shared.borrow();
        for child in list.iter() {
            loop_handle.borrow_mut().add_task(Some(child.clone()));
            child.incref();
        }
    }

    let hook_children = shared.clone();
    let state = TaskBuilder::new()
        .on_cancel(move || {
            // Every child still in the shared list at this point is, by
            // construction, not yet `Done` (resume() already pruned and
            // decref'd the finished ones) — decref and cancel each exactly
            // once, per the gatherer's cancel-hook contract.
            let mut remaining = hook_children.borrow_mut();
            for child in remaining.drain(..) {
                child.decref();
                child.cancel();
            }
        })
        .build(Box::new(Gather {
            children: shared.clone(),
        }));

    if register_with_arena {
        // The variadic form owns its backing storage and registers it with
        // the arena so destruction frees it — demonstrated here even
        // though `Rc`'s own drop would already release `shared` once every
        // clone (this one, the cancel hook's, and the `Gather` body's) is
        // gone; the explicit registration is what makes that ownership an
        // auditable part of the state's arena rather than an implicit
        // side effect of closures capturing `Rc`s.
        state.arena().free_later(Box::new(shared));
    }

    state
}

/// Gather on caller-owned storage: `children` is borrowed just long enough
/// to build this crate's own internal list; the caller's slice/`Vec` is
/// never freed by this crate (open question 1 in the runtime's design
/// notes — presumed intentional, the caller keeps ownership).
pub fn gather(children: &[Handle]) -> Handle {
    build_gather(children.to_vec(), false)
}

/// Gather taking ownership of `children`'s backing storage, registering it
/// with the arena so it is released at this gatherer's own destruction.
pub fn vgather(children: Vec<Handle>) -> Handle {
    build_gather(children, true)
}

/// Schedules `child`, samples the clock on first resume, and resumes until
/// either `child` is `Done` or `timeout` elapses.
struct WaitFor {
    child: Handle,
    timeout: Duration,
    start: Option<std::time::Instant>,
    clock: Rc<dyn Clock>,
}

impl Body for WaitFor {
    fn resume(&mut self, state: &CoroState) -> Cursor {
        if self.child.done() {
            self.child.decref();
            state.clear_child();
            return Cursor::Done;
        }
        let now = self.clock.now();
        let start = *self.start.get_or_insert(now);
        if elapsed_at_least(start, now, self.timeout) {
            state.set_err(CoroError::ECanceled);
            self.child.cancel();
            self.child.decref();
            state.clear_child();
            return Cursor::Done;
        }
        Cursor::Cont
    }
}

/// Wait for `child` to finish, up to `timeout`, sampling [`SystemClock`].
pub fn wait_for(child: Handle, timeout: Duration) -> Handle {
    wait_for_with_clock(child, timeout, Rc::new(SystemClock))
}

/// Wait for `child`, sampling a caller-supplied [`Clock`].
///
/// Takes ownership of `child` in the sense that it `INCREF`s it
/// immediately; per open question 2 in the runtime's design notes, callers
/// must not assume exclusive ownership of `child` afterwards beyond what
/// that refcount already reflects.
pub fn wait_for_with_clock(child: Handle, timeout: Duration, clock: Rc<dyn Clock>) -> Handle {
    environment::get_event_loop()
        .borrow_mut()
        .add_task(Some(child.clone()));
    child.incref();

    let cancel_child = child.clone();
    let state = TaskBuilder::new()
        .on_cancel(move || {
            if !cancel_child.done() {
                cancel_child.cancel();
            }
        })
        .build(Box::new(WaitFor {
            child: child.clone(),
            timeout,
            start: None,
            clock,
        }));
    state.set_child(&child);
    state
}

/// Suspend until `child` is `Done` (`fawait`, with no timeout). Schedules
/// `child` and wires the child link so the loop's generic cancellation
/// cascade (rule 3) reaches it if this state itself is cancelled.
struct Fawait {
    child: Handle,
}

impl Body for Fawait {
    fn resume(&mut self, state: &CoroState) -> Cursor {
        if self.child.done() {
            self.child.decref();
            state.clear_child();
            Cursor::Done
        } else {
            Cursor::Cont
        }
    }
}

/// Suspend until `child` finishes, with no timeout.
pub fn fawait(child: Handle) -> Handle {
    environment::get_event_loop()
        .borrow_mut()
        .add_task(Some(child.clone()));
    child.incref();

    let cancel_child = child.clone();
    let state = TaskBuilder::new()
        .on_cancel(move || {
            if !cancel_child.done() {
                cancel_child.cancel();
            }
        })
        .build(Box::new(Fawait {
            child: child.clone(),
        }));
    state.set_child(&child);
    state
}
