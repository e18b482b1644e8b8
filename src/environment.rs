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

//! The process-wide installed event loop.
//!
//! Mirrors the teacher's `thread_local!` "current environment" pointer:
//! exactly one [`EventLoop`] is installed per thread at a time, swappable
//! between `init`/`destroy` cycles via [`set_event_loop`]. Replacing it
//! mid-run is undefined, same as the source system.

use std::cell::RefCell;
use std::rc::Rc;

use crate::scheduler::EventLoop;

thread_local! {
    static CURRENT_LOOP: RefCell<Rc<RefCell<EventLoop>>> =
        RefCell::new(Rc::new(RefCell::new(EventLoop::new())));
}

/// Fetch the process-wide installed loop (cheap: clones an `Rc`).
pub fn get_event_loop() -> Rc<RefCell<EventLoop>> {
    CURRENT_LOOP.with(|cell| cell.borrow().clone())
}

/// Install `loop_` as the process-wide loop, replacing whatever was there.
/// Intended for custom loop implementations satisfying the same contract;
/// only safe to call between `init`/`destroy` cycles, never mid-run.
pub fn set_event_loop(loop_: Rc<RefCell<EventLoop>>) {
    CURRENT_LOOP.with(|cell| *cell.borrow_mut() = loop_);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_loop_is_installed() {
        let l = get_event_loop();
        assert_eq!(Rc::strong_count(&l) >= 1, true);
    }

    #[test]
    fn set_event_loop_replaces_the_installed_loop() {
        let fresh = Rc::new(RefCell::new(EventLoop::new()));
        set_event_loop(fresh.clone());
        let fetched = get_event_loop();
        assert!(Rc::ptr_eq(&fresh, &fetched));
        // restore a clean loop so later tests in this thread are unaffected
        set_event_loop(Rc::new(RefCell::new(EventLoop::new())));
    }
}
