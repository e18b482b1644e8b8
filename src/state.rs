// The MIT License (MIT)

// Copyright (c) 2015 Rustcc developers

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

//! The coroutine state: the central entity of the runtime.
//!
//! A state is a (resume function, progress cursor, refcount, arena) record
//! plus the bookkeeping the loop needs to reap and cancel it. It is always
//! handled through [`Handle`], a reference-counted pointer; the `refcount`
//! field tracked here is a *separate*, explicit count from `Rc`'s own strong
//! count, because the loop defers reaping to its next pass rather than
//! freeing the instant the count reaches zero (see [`crate::scheduler`]).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context as TaskContext, Poll};

use crate::arena::Arena;
use crate::error::CoroError;

/// A state's progress cursor. A freshly constructed state begins at `Init`;
/// `Done` is terminal and the state never resumes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Init,
    Cont,
    Done,
}

/// The resume contract: advance the coroutine once, running until the next
/// suspension point or completion, and report the resulting cursor.
///
/// Implementors store whatever must live across suspensions as their own
/// struct fields — this is the Rust realization of the source system's
/// scratch-arena-backed locals frame (see `crate::arena`): the struct
/// implementing `Body` *is* the frame, and its address is stable for the
/// state's lifetime because it is boxed once at construction.
pub trait Body {
    fn resume(&mut self, state: &CoroState) -> Cursor;
}

/// Adapts an ordinary [`Future`] into a [`Body`], the native-coroutine
/// realization of the suspension mechanism described in the runtime's
/// design notes: `.await` is the suspension point, and the compiler-built
/// future struct is the boxed frame. Polled with a no-op waker, since this
/// runtime is a polling scheduler, not a reactor — it never parks on a
/// waker wakeup and instead revisits every scheduled slot each pass.
pub struct FutureBody<F> {
    future: Pin<Box<F>>,
}

impl<F: Future<Output = ()>> FutureBody<F> {
    pub fn new(future: F) -> Self {
        FutureBody {
            future: Box::pin(future),
        }
    }
}

impl<F: Future<Output = ()>> Body for FutureBody<F> {
    fn resume(&mut self, _state: &CoroState) -> Cursor {
        let waker = noop_waker();
        let mut cx = TaskContext::from_waker(&waker);
        match self.future.as_mut().poll(&mut cx) {
            Poll::Pending => Cursor::Cont,
            Poll::Ready(()) => Cursor::Done,
        }
    }
}

fn noop_waker() -> std::task::Waker {
    use std::task::{RawWaker, RawWakerVTable, Waker};

    const VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake, drop_fn);

    unsafe fn clone(_: *const ()) -> RawWaker {
        RawWaker::new(std::ptr::null(), &VTABLE)
    }
    unsafe fn wake(_: *const ()) {}
    unsafe fn drop_fn(_: *const ()) {}

    unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
}

const SCHEDULED: u8 = 1 << 0;

/// A reference-counted handle to a coroutine state. This is the only way
/// callers hold a state; the state itself never exposes `&mut` access to
/// its fields from the outside, matching invariant I1 (one table, one slot).
pub type Handle = Rc<CoroState>;

/// The central per-task record. See the module doc comment.
pub struct CoroState {
    body: RefCell<Option<Box<dyn Body>>>,
    cursor: Cell<Cursor>,
    flags: Cell<u8>,
    refcount: Cell<i64>,
    err: Cell<CoroError>,
    cancel_requested: Cell<bool>,
    cancel_hook: RefCell<Option<Box<dyn FnMut()>>>,
    child: RefCell<Option<Weak<CoroState>>>,
    arena: Arena,
    args: RefCell<Option<Box<dyn Any>>>,
    name: RefCell<Option<String>>,
}

impl fmt::Debug for CoroState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoroState")
            .field("name", &self.name.borrow())
            .field("cursor", &self.cursor.get())
            .field("refcount", &self.refcount.get())
            .field("err", &self.err.get())
            .field("scheduled", &self.is_scheduled())
            .finish()
    }
}

impl CoroState {
    /// Construct a state with refcount 1, cursor `Init`, no flags, no
    /// error, an empty arena, and no cancel hook or child link — the
    /// contract of `new_coro` in the source system, minus the raw
    /// frame-offset arithmetic a boxed `Body` makes unnecessary.
    pub fn new(body: Box<dyn Body>) -> Handle {
        Rc::new(CoroState {
            body: RefCell::new(Some(body)),
            cursor: Cell::new(Cursor::Init),
            flags: Cell::new(0),
            refcount: Cell::new(1),
            err: Cell::new(CoroError::Ok),
            cancel_requested: Cell::new(false),
            cancel_hook: RefCell::new(None),
            child: RefCell::new(None),
            arena: Arena::new(),
            args: RefCell::new(None),
            name: RefCell::new(None),
        })
    }

    pub(crate) fn set_name(&self, name: Option<String>) {
        *self.name.borrow_mut() = name;
    }

    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor.get()
    }

    pub(crate) fn set_cursor(&self, cursor: Cursor) {
        self.cursor.set(cursor);
    }

    /// True iff the cursor has reached `Done`.
    pub fn done(&self) -> bool {
        self.cursor.get() == Cursor::Done
    }

    pub fn is_scheduled(&self) -> bool {
        self.flags.get() & SCHEDULED != 0
    }

    pub(crate) fn set_scheduled(&self, scheduled: bool) {
        let flags = self.flags.get();
        self.flags
            .set(if scheduled { flags | SCHEDULED } else { flags & !SCHEDULED });
    }

    pub fn err(&self) -> CoroError {
        self.err.get()
    }

    pub fn set_err(&self, err: CoroError) {
        self.err.set(err);
    }

    pub fn refcount(&self) -> i64 {
        self.refcount.get()
    }

    /// Increment the refcount. No other side effects.
    pub fn incref(&self) {
        self.refcount.set(self.refcount.get() + 1);
    }

    /// Decrement the refcount. No other side effects — in particular this
    /// does *not* free the state; it only marks it reapable for the loop's
    /// next visit (invariant I2).
    pub fn decref(&self) {
        self.refcount.set(self.refcount.get() - 1);
    }

    /// Request cancellation. A request, not an action: the loop observes it
    /// on the next visit. Idempotent — cancelling an already-cancelled or
    /// already-`ECanceled` state is a no-op, matching property 7.
    pub fn cancel(&self) {
        self.cancel_requested.set(true);
    }

    /// True when cancellation has been requested but not yet finalized:
    /// "externally signalled to cancel OR `err == ECanceled`."
    pub fn cancelled(&self) -> bool {
        self.cancel_requested.get() || self.err.get() == CoroError::ECanceled
    }

    pub(crate) fn install_cancel_hook(&self, hook: Box<dyn FnMut()>) {
        *self.cancel_hook.borrow_mut() = Some(hook);
    }

    /// Run the cancel hook, if present. Invariant I4: never called while
    /// `Done`; callers (the loop) are responsible for that check.
    pub(crate) fn run_cancel_hook(&self) {
        if let Some(mut hook) = self.cancel_hook.borrow_mut().take() {
            hook();
        }
    }

    pub(crate) fn set_child(&self, child: &Handle) {
        *self.child.borrow_mut() = Some(Rc::downgrade(child));
    }

    pub(crate) fn child(&self) -> Option<Handle> {
        self.child.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn clear_child(&self) {
        *self.child.borrow_mut() = None;
    }

    /// The state's scratch arena (C3): a registry of heap blocks whose
    /// cleanup is tied to this state's own destruction.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Set the caller-provided argument/result slot. Callable from a
    /// [`Body`] implementation's own `resume` to publish a result the
    /// scheduling side reads back via [`CoroState::args`] once `done()`.
    pub fn set_args<T: Any>(&self, value: T) {
        *self.args.borrow_mut() = Some(Box::new(value));
    }

    /// Read back the caller-provided argument, if it was set and is of type
    /// `T`.
    pub fn args<T: Any + Clone>(&self) -> Option<T> {
        self.args
            .borrow()
            .as_ref()
            .and_then(|b| b.downcast_ref::<T>())
            .cloned()
    }

    /// Resume the body once. Must not be called once `done()` (invariant
    /// I3); the loop enforces this, not this method.
    pub(crate) fn resume(self: &Rc<Self>) {
        let mut body = self.body.borrow_mut();
        if let Some(b) = body.as_mut() {
            let cursor = b.resume(self);
            self.cursor.set(cursor);
            if cursor == Cursor::Done {
                *body = None;
                // The refcount of 1 a state is born with (spec.md §3)
                // represents the body's ownership of itself until it
                // terminates; release that self-reference on the
                // Init/Cont -> Done transition so a table-scheduled state
                // becomes reapable (rule 2) and a directly-driven `main`
                // (`run_until_complete`) reaches refcount 0 as the spec's
                // termination check expects.
                self.decref();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountToThree {
        n: u32,
    }

    impl Body for CountToThree {
        fn resume(&mut self, _state: &CoroState) -> Cursor {
            self.n += 1;
            if self.n >= 3 {
                Cursor::Done
            } else {
                Cursor::Cont
            }
        }
    }

    #[test]
    fn new_state_starts_at_init_with_refcount_one() {
        let s = CoroState::new(Box::new(CountToThree { n: 0 }));
        assert_eq!(s.cursor(), Cursor::Init);
        assert_eq!(s.refcount(), 1);
        assert_eq!(s.err(), CoroError::Ok);
        assert!(!s.done());
        assert!(!s.is_scheduled());
    }

    #[test]
    fn resume_runs_to_done() {
        let s = CoroState::new(Box::new(CountToThree { n: 0 }));
        s.resume();
        assert_eq!(s.cursor(), Cursor::Cont);
        s.resume();
        assert_eq!(s.cursor(), Cursor::Cont);
        s.resume();
        assert_eq!(s.cursor(), Cursor::Done);
        assert!(s.done());
    }

    #[test]
    fn incref_decref_is_a_noop_on_lifecycle() {
        let s = CoroState::new(Box::new(CountToThree { n: 0 }));
        s.incref();
        assert_eq!(s.refcount(), 2);
        s.decref();
        assert_eq!(s.refcount(), 1);
        // Reaching back to 1 does not change cursor/err/schedule state.
        assert_eq!(s.cursor(), Cursor::Init);
        assert!(!s.is_scheduled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let s = CoroState::new(Box::new(CountToThree { n: 0 }));
        s.cancel();
        s.cancel();
        assert!(s.cancelled());
    }

    #[test]
    fn future_body_maps_pending_and_ready() {
        use std::cell::RefCell as StdRefCell;
        let polls = Rc::new(StdRefCell::new(0));
        let polls2 = polls.clone();
        let fut = async move {
            *polls2.borrow_mut() += 1;
            Yield::default().await;
            *polls2.borrow_mut() += 1;
        };
        let s = CoroState::new(Box::new(FutureBody::new(fut)));
        s.resume();
        assert_eq!(s.cursor(), Cursor::Cont);
        s.resume();
        assert_eq!(s.cursor(), Cursor::Done);
        assert_eq!(*polls.borrow(), 2);
    }

    // A minimal yield-once future used only to exercise `FutureBody` here;
    // the crate's real `yield_once` lives in `crate::combinators`.
    #[derive(Default)]
    struct Yield {
        polled: bool,
    }

    impl Future for Yield {
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

    #[test]
    fn args_round_trip() {
        let s = CoroState::new(Box::new(CountToThree { n: 0 }));
        s.set_args(42i32);
        assert_eq!(s.args::<i32>(), Some(42));
        assert_eq!(s.args::<String>(), None);
    }
}
