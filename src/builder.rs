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

use std::future::Future;

use crate::options::Options;
use crate::state::{Body, FutureBody, Handle};

/// Coroutine configuration. Provides detailed control over the properties
/// of a new coroutine state before it is ever scheduled.
///
/// ```
/// use corolite::TaskBuilder;
///
/// let handle = TaskBuilder::new()
///     .name("worker #1")
///     .spawn(async move {
///         // ...
///     });
/// ```
pub struct TaskBuilder {
    opts: Options,
}

impl TaskBuilder {
    /// Generate the base configuration for building a coroutine state, from
    /// which configuration methods can be chained.
    pub fn new() -> TaskBuilder {
        TaskBuilder {
            opts: Options::default(),
        }
    }

    /// Name the coroutine-to-be.
    pub fn name<S: Into<String>>(mut self, name: S) -> TaskBuilder {
        self.opts.name = Some(name.into());
        self
    }

    /// Attach a cancel hook, run if the loop cancels this coroutine before
    /// it reaches `Done`.
    pub fn on_cancel<H: FnMut() + 'static>(mut self, hook: H) -> TaskBuilder {
        self.opts.cancel_hook = Some(Box::new(hook));
        self
    }

    /// Build a state from an already-boxed [`Body`] — the low-level entry
    /// point other combinators in this crate use.
    pub fn build(self, body: Box<dyn Body>) -> Handle {
        let state = crate::state::CoroState::new(body);
        state.set_name(self.opts.name);
        if let Some(hook) = self.opts.cancel_hook {
            state.install_cancel_hook(hook);
        }
        state
    }

    /// Build a state from an `async` body — the native-coroutine
    /// authoring path (see the runtime's design notes on suspension).
    pub fn spawn<F: Future<Output = ()> + 'static>(self, body: F) -> Handle {
        self.build(Box::new(FutureBody::new(body)))
    }
}

impl Default for TaskBuilder {
    fn default() -> TaskBuilder {
        TaskBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Cursor;

    #[test]
    fn builder_sets_name_and_cancel_hook() {
        let handle = TaskBuilder::new()
            .name("worker")
            .on_cancel(|| {})
            .spawn(async {});
        assert_eq!(handle.name().as_deref(), Some("worker"));
        assert_eq!(handle.cursor(), Cursor::Init);
    }

    #[test]
    fn default_builder_has_no_name() {
        let handle = TaskBuilder::default().spawn(async {});
        assert_eq!(handle.name(), None);
    }
}
