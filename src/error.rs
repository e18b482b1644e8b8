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

//! Closed error taxonomy for the runtime.
//!
//! `CoroError` never grows a new variant at the call site: every fallible
//! operation in this crate maps onto one of the four values below, the same
//! way the loop itself never aborts the process on a coroutine's error.

use thiserror::Error;

/// The runtime's closed error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
pub enum CoroError {
    /// No error.
    #[default]
    #[error("no error")]
    Ok,
    /// Allocation failed inside a combinator or the arena.
    #[error("allocation failed")]
    ENoMem,
    /// The coroutine was cancelled, externally or by a timeout.
    #[error("coroutine was cancelled")]
    ECanceled,
    /// A state passed to an operation was in an invalid state.
    #[error("state passed to an operation was invalid")]
    EInvalidState,
}

/// Pure mapping from an error value to a human-readable string.
///
/// Kept as a standalone function, not just a `Display` impl, for parity with
/// the spec's description of `strerror` as a pure total function distinct
/// from any particular trait.
pub fn error_message(err: CoroError) -> &'static str {
    match err {
        CoroError::Ok => "no error",
        CoroError::ENoMem => "allocation failed",
        CoroError::ECanceled => "coroutine was cancelled",
        CoroError::EInvalidState => "state passed to an operation was invalid",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_ok() {
        assert_eq!(CoroError::default(), CoroError::Ok);
    }

    #[test]
    fn display_matches_error_message() {
        for err in [
            CoroError::Ok,
            CoroError::ENoMem,
            CoroError::ECanceled,
            CoroError::EInvalidState,
        ] {
            assert_eq!(err.to_string(), error_message(err));
        }
    }
}
