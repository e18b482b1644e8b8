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

//! A cooperative, single-threaded coroutine runtime.
//!
//! A coroutine is a [`Body`] wrapped in a [`CoroState`], installed into the
//! process-wide [`EventLoop`] and driven one step at a time by
//! [`run_forever`]/[`run_until_complete`]. Nothing here spawns an OS thread
//! or preempts a running body — a coroutine only ever yields control back
//! to the loop at an `.await` point (or, for hand-written [`Body`] impls,
//! by returning [`Cursor::Cont`]).
//!
//! ```
//! use corolite::{run_until_complete, TaskBuilder};
//!
//! let main = TaskBuilder::new().name("main").spawn(async {
//!     // an ordinary async body; suspension happens at its own `.await`s
//! });
//! run_until_complete(&main);
//! assert!(main.done());
//! ```

mod arena;
mod builder;
mod clock;
mod combinators;
mod environment;
mod error;
mod options;
mod scheduler;
mod state;

pub use arena::{Arena, ArenaHandle};
pub use builder::TaskBuilder;
pub use clock::{Clock, SystemClock};
pub use combinators::{
    fawait, gather, sleep, sleep_with_clock, vgather, wait_for, wait_for_with_clock, yield_now,
    yield_once, YieldNow,
};
pub use environment::{get_event_loop, set_event_loop};
pub use error::{error_message, CoroError};
pub use options::Options;
pub use scheduler::EventLoop;
pub use state::{Body, CoroState, Cursor, FutureBody, Handle};

use std::future::Future;

/// Build and schedule a named `async` coroutine on the installed loop's
/// table in one step.
///
/// Intended for fire-and-forget child tasks driven by [`run_forever`]
/// alongside others, not for the root coroutine passed to
/// [`run_until_complete`]: that one is driven directly by its caller and
/// must not also occupy a table slot, or it is resumed twice per pass.
pub fn create_task<S: Into<String>, F: Future<Output = ()> + 'static>(name: S, body: F) -> Handle {
    let state = TaskBuilder::new().name(name).spawn(body);
    get_event_loop().borrow_mut().add_task(Some(state.clone()));
    state
}

/// Schedule every already-built state in `states` on the installed loop in
/// one batch, reserving table capacity once rather than per task.
pub fn create_tasks(states: Vec<Handle>) -> bool {
    get_event_loop().borrow_mut().add_tasks(states)
}

/// Request cancellation of `state`. A request, not an action — see
/// [`CoroState::cancel`].
pub fn cancel(state: &Handle) {
    state.cancel();
}

/// True once `state`'s cursor has reached [`Cursor::Done`].
pub fn done(state: &Handle) -> bool {
    state.done()
}

/// True once cancellation has been requested for `state`, whether or not
/// the loop has finalized it yet.
pub fn cancelled(state: &Handle) -> bool {
    state.cancelled()
}

/// Run the installed loop until no occupied slot remains.
pub fn run_forever(loop_handle: &std::rc::Rc<std::cell::RefCell<EventLoop>>) {
    scheduler::run_forever(loop_handle)
}

/// Visit every slot in `loop_handle` exactly once. The building block
/// `run_forever`/`run_until_complete` are built from, exposed directly for
/// callers that drive the loop from their own outer loop (an embedding
/// event source, or a test advancing a fake clock between passes).
pub fn step(loop_handle: &std::rc::Rc<std::cell::RefCell<EventLoop>>) {
    scheduler::run_pass(loop_handle, scheduler::Mode::Normal)
}

/// Run the installed loop, directly resuming `main` each pass, until `main`
/// reaches [`Cursor::Done`].
pub fn run_until_complete(main: &Handle) {
    let loop_handle = get_event_loop();
    scheduler::run_until_complete(&loop_handle, main)
}

/// Force every task remaining on the installed loop through cancellation
/// and reaping, then empty the table.
pub fn destroy() {
    let loop_handle = get_event_loop();
    scheduler::destroy(&loop_handle)
}
