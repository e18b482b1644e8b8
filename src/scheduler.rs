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

//! The slotted task table and the pass over it.
//!
//! `EventLoop` itself only ever holds the table — a `Vec<Option<Handle>>`
//! (events queue) plus a `Vec<usize>` free-list of vacant indices (vacant
//! queue). The actual per-slot decision (reap / finalize cancellation /
//! resume) lives in the free function [`visit_slot`] below rather than as a
//! method taking `&mut EventLoop`, because resuming a body can re-enter this
//! module (a combinator's body schedules further tasks on the same
//! process-wide loop). Holding a `RefCell` borrow across that re-entrant
//! call would panic; every borrow here is therefore scoped to a single
//! table read or write, never held across a call into a body.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace};

use crate::error::CoroError;
use crate::state::{Cursor, Handle};

/// A process-wide-installable event loop: a slotted task table with a
/// vacancy free-list, per `spec.md` §4.4 / C4.
#[derive(Default)]
pub struct EventLoop {
    events: Vec<Option<Handle>>,
    vacant: Vec<usize>,
}

impl EventLoop {
    /// Initializes both task tables to empty. Idempotent on a freshly
    /// constructed loop.
    pub fn new() -> EventLoop {
        EventLoop {
            events: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// `add_task` — install `state` into a slot. Returns `None` if `state`
    /// is `None`, returns `state` unchanged if already scheduled.
    pub fn add_task(&mut self, state: Option<Handle>) -> Option<Handle> {
        let state = state?;
        if state.is_scheduled() {
            return Some(state);
        }

        if let Some(idx) = self.vacant.pop() {
            self.events[idx] = Some(state.clone());
        } else {
            // `Vec::push` aborts the process on allocation failure rather
            // than returning an error, so the source system's "on failure
            // free the state and return null" path has no reachable
            // analogue here — see SPEC_FULL.md §4.4.
            self.events.push(Some(state.clone()));
        }
        state.set_scheduled(true);
        trace!("task {:?} installed", state.name());
        Some(state)
    }

    /// `add_tasks` — reserve once for `states.len()` new slots, then
    /// install every not-yet-scheduled state via push.
    pub fn add_tasks(&mut self, states: Vec<Handle>) -> bool {
        self.events.reserve(states.len());
        for state in states {
            if !state.is_scheduled() {
                self.events.push(Some(state.clone()));
                state.set_scheduled(true);
            }
        }
        true
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.events.len()
    }

    /// `events_queue.length > vacant_queue.length`, i.e. at least one
    /// occupied slot exists.
    fn has_occupied_slot(&self) -> bool {
        self.events.len() > self.vacant.len()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Normal,
    Destroy,
}

/// One visit to slot `idx`, implementing the per-slot rules of `spec.md`
/// §4.4. Never holds a table borrow across `state.resume()` — see the
/// module doc comment.
pub(crate) fn visit_slot(loop_handle: &Rc<RefCell<EventLoop>>, idx: usize, mode: Mode) {
    let state = {
        let table = loop_handle.borrow();
        match table.events.get(idx) {
            Some(Some(s)) => s.clone(),
            _ => return, // vacant: I7, iteration skips nulls
        }
    };

    // Rule 2: refcount has reached zero — reap.
    if state.refcount() <= 0 {
        if !state.done() {
            state.run_cancel_hook();
        }
        let mut table = loop_handle.borrow_mut();
        table.events[idx] = None;
        table.vacant.push(idx);
        debug!("task {:?} reaped", state.name());
        return;
    }

    // Rule 3: cancellation requested but not yet finalized.
    if state.cancelled() && state.err() != CoroError::ECanceled {
        if !state.done() {
            state.decref();
            state.run_cancel_hook();
        }
        if let Some(child) = state.child() {
            child.decref();
            child.cancel();
        }
        state.set_err(CoroError::ECanceled);
        state.set_cursor(Cursor::Done);
        debug!("task {:?} cancellation finalized", state.name());
        return;
    }

    let child_ready = state.child().map(|c| c.done()).unwrap_or(true);

    // Rule 4 (normal mode) / destroy-mode equivalent.
    if !state.done() && child_ready {
        match mode {
            Mode::Normal => {
                trace!("task {:?} resumed", state.name());
                state.resume();
            }
            Mode::Destroy => {
                // Destroy mode never resumes a body; it force-cancels so
                // the state is revisited under rule 3 on a later pass.
                state.cancel();
            }
        }
    }
}

/// Run a single pass over every slot currently in the table.
pub(crate) fn run_pass(loop_handle: &Rc<RefCell<EventLoop>>, mode: Mode) {
    let len = loop_handle.borrow().slot_count();
    for idx in 0..len {
        visit_slot(loop_handle, idx, mode);
    }
}

/// `run_forever` — loop while at least one occupied slot exists.
pub fn run_forever(loop_handle: &Rc<RefCell<EventLoop>>) {
    loop {
        if !loop_handle.borrow().has_occupied_slot() {
            break;
        }
        run_pass(loop_handle, Mode::Normal);
    }
}

/// `run_until_complete` — directly resume `main` once per pass, then visit
/// every slot, until `main` reaches `Done`. Re-entrant across calls.
pub fn run_until_complete(loop_handle: &Rc<RefCell<EventLoop>>, main: &Handle) {
    while !main.done() {
        main.resume();
        run_pass(loop_handle, Mode::Normal);
    }
    // If `main.refcount() == 0` the source system frees it here; in this
    // realization the caller's `Handle` (an `Rc`) is dropped by Rust's own
    // ownership machinery once it goes out of scope, so there is nothing
    // further to do.
}

/// `destroy` — force every remaining task through cancellation and
/// reaping, then release both queues. Realized as repeated full passes
/// until no slot is occupied, rather than in-pass index retraction; per
/// the runtime's design notes either strategy preserves invariants I1–I7.
pub fn destroy(loop_handle: &Rc<RefCell<EventLoop>>) {
    loop {
        let len = loop_handle.borrow().slot_count();
        let any_occupied = (0..len).any(|idx| loop_handle.borrow().events[idx].is_some());
        for idx in 0..len {
            visit_slot(loop_handle, idx, Mode::Destroy);
        }
        if !any_occupied {
            break;
        }
    }
    let mut table = loop_handle.borrow_mut();
    table.events.clear();
    table.vacant.clear();
}
