//! Typed errors for channel operations.
//!
//! Kept hand-rolled and allocation-free, the way `crossbeam-channel`'s own
//! `err.rs` does it, rather than reaching for `thiserror`/`anyhow`: these
//! types sit on the hot send/receive path and callers match on them
//! directly.

use std::error::Error;
use std::fmt;

/// The tagged status values from the channel's external interface,
/// carrying the legacy numeric encoding alongside the idiomatic variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Full,
    Empty,
    GenericError,
    Closed,
    DestroyOnOpenError,
}

impl Status {
    /// The numeric encoding observed by callers doing integer comparison:
    /// `success = 1`, `full`/`empty = 0`, `generic_error = -1`,
    /// `closed = -2`, `destroy_on_open_error = -3`.
    pub fn as_code(self) -> i32 {
        match self {
            Status::Success => 1,
            Status::Full | Status::Empty => 0,
            Status::GenericError => -1,
            Status::Closed => -2,
            Status::DestroyOnOpenError => -3,
        }
    }
}

/// A blocking send failed because the channel is closed. Hands the
/// message back so the caller doesn't lose it.
pub struct SendError<T>(pub T);

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SendError(..)")
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sending on a closed channel")
    }
}

impl<T> Error for SendError<T> {}

impl<T> SendError<T> {
    pub fn status(&self) -> Status {
        Status::Closed
    }
}

/// A blocking receive failed because the channel is closed and empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvError;

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("receiving on a closed channel")
    }
}

impl Error for RecvError {}

impl RecvError {
    pub fn status(&self) -> Status {
        Status::Closed
    }
}

/// A non-blocking send could not commit.
pub enum TrySendError<T> {
    /// The channel is open but has no room (or no waiting receiver, for a
    /// zero-capacity channel).
    Full(T),
    /// The channel is closed.
    Closed(T),
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.write_str("TrySendError::Full(..)"),
            TrySendError::Closed(_) => f.write_str("TrySendError::Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.write_str("sending on a full channel"),
            TrySendError::Closed(_) => f.write_str("sending on a closed channel"),
        }
    }
}

impl<T> Error for TrySendError<T> {}

impl<T> TrySendError<T> {
    pub fn status(&self) -> Status {
        match self {
            TrySendError::Full(_) => Status::Full,
            TrySendError::Closed(_) => Status::Closed,
        }
    }
}

/// A non-blocking receive could not commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    /// The channel is open but has nothing ready to deliver.
    Empty,
    /// The channel is closed.
    Closed,
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryRecvError::Empty => f.write_str("receiving on an empty channel"),
            TryRecvError::Closed => f.write_str("receiving on a closed channel"),
        }
    }
}

impl Error for TryRecvError {}

impl TryRecvError {
    pub fn status(&self) -> Status {
        match self {
            TryRecvError::Empty => Status::Empty,
            TryRecvError::Closed => Status::Closed,
        }
    }
}

/// `destroy` was called on a channel that was still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyError;

impl fmt::Display for DestroyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("destroy called on an open channel")
    }
}

impl Error for DestroyError {}

impl DestroyError {
    pub fn status(&self) -> Status {
        Status::DestroyOnOpenError
    }
}
