//! Multi-way `select` over a mix of send and receive operations.
//!
//! Resolution happens in two phases: first every op is tried without
//! registering anything (so an already-ready op commits immediately,
//! first-listed-wins on ties), and only if nothing was ready does the
//! call register every op against one shared [`SelectState`] and block.
//! A channel that closes while a registration is pending resolves the
//! whole call with the index of the first channel observed closed.

use std::sync::Arc;

use crate::channel::{
    self, park, resolve_closed_single, ParkOutcome, RecvAttempt, SelectState, SendAttempt,
};
use crate::{Receiver, Sender};

/// One operation offered to [`select`].
pub enum SelectOp<'a, T> {
    Send(&'a Sender<T>, Option<T>),
    Recv(&'a Receiver<T>),
}

impl<'a, T> SelectOp<'a, T> {
    /// An offer to send `value` on `sender`.
    pub fn send(sender: &'a Sender<T>, value: T) -> Self {
        SelectOp::Send(sender, Some(value))
    }

    /// An offer to receive from `receiver`.
    pub fn recv(receiver: &'a Receiver<T>) -> Self {
        SelectOp::Recv(receiver)
    }
}

/// The operation `select` committed to, identified by its index in the
/// slice passed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selected<T> {
    Sent(usize),
    Received(usize, T),
}

/// `select` resolved because the channel at `index` was (or became)
/// closed before any operation could complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectClosed {
    pub index: usize,
}

pub type SelectResult<T> = Result<Selected<T>, SelectClosed>;

enum Once<T> {
    Sent,
    Received(T),
    Closed,
    WouldBlock,
}

/// Tries one op without registering anything.
fn try_once<T>(op: &mut SelectOp<'_, T>) -> Once<T> {
    match op {
        SelectOp::Send(sender, slot) => {
            let value = slot
                .take()
                .expect("a send op's value is only taken once it commits");
            match sender.channel.attempt_send(value, None) {
                SendAttempt::Sent => Once::Sent,
                SendAttempt::Closed(v) => {
                    *slot = Some(v);
                    Once::Closed
                }
                SendAttempt::WouldBlock(v) => {
                    *slot = Some(v);
                    Once::WouldBlock
                }
                SendAttempt::Registered(_) | SendAttempt::AlreadyResolved(_) => {
                    unreachable!("non-blocking attempts never register")
                }
            }
        }
        SelectOp::Recv(receiver) => match receiver.channel.attempt_recv(None) {
            RecvAttempt::Received(v) => Once::Received(v),
            RecvAttempt::Closed => Once::Closed,
            RecvAttempt::WouldBlock => Once::WouldBlock,
            RecvAttempt::Registered | RecvAttempt::AlreadyResolved => {
                unreachable!("non-blocking attempts never register")
            }
        },
    }
}

/// The outcome of trying to register one op: either it is now parked
/// waiting for a counterpart, or it resolved synchronously (its value, if
/// any, flows straight back through this return rather than through the
/// shared state — `SelectState::value` is only ever written by a
/// *different* thread delivering into an already-parked registration).
enum Register<T> {
    StillPending,
    /// This call's shared state was already resolved through a different,
    /// earlier-registered op by the time this one was attempted.
    AlreadyResolved,
    Sent,
    Received(T),
    Closed,
}

fn register_once<T>(
    op: &mut SelectOp<'_, T>,
    state: &Arc<SelectState<T>>,
    index: usize,
) -> Register<T> {
    match op {
        SelectOp::Send(sender, slot) => {
            let value = slot
                .take()
                .expect("a send op's value is only taken once it commits");
            match channel::select_register(&sender.channel, value, state.clone(), index) {
                SendAttempt::Sent => Register::Sent,
                SendAttempt::Closed(v) => {
                    *slot = Some(v);
                    Register::Closed
                }
                SendAttempt::AlreadyResolved(v) => {
                    *slot = Some(v);
                    Register::AlreadyResolved
                }
                SendAttempt::WouldBlock(_) => unreachable!("registration was requested"),
                SendAttempt::Registered(_) => Register::StillPending,
            }
        }
        SelectOp::Recv(receiver) => {
            match channel::select_register_recv(&receiver.channel, state.clone(), index) {
                RecvAttempt::Received(v) => Register::Received(v),
                RecvAttempt::Closed => Register::Closed,
                RecvAttempt::AlreadyResolved => Register::AlreadyResolved,
                RecvAttempt::WouldBlock => unreachable!("registration was requested"),
                RecvAttempt::Registered => Register::StillPending,
            }
        }
    }
}

/// Commits to exactly one of `ops`, blocking until one is ready. Ties
/// (multiple operations ready at once) resolve in favor of whichever
/// appears first in `ops`.
pub fn select<T>(ops: &mut [SelectOp<'_, T>]) -> SelectResult<T> {
    assert!(!ops.is_empty(), "select requires at least one operation");

    for (index, op) in ops.iter_mut().enumerate() {
        match try_once(op) {
            Once::Sent => return Ok(Selected::Sent(index)),
            Once::Received(v) => return Ok(Selected::Received(index, v)),
            Once::Closed => return Err(SelectClosed { index }),
            Once::WouldBlock => continue,
        }
    }

    let state = channel::new_select_state();
    for (index, op) in ops.iter_mut().enumerate() {
        match register_once(op, &state, index) {
            Register::StillPending => continue,
            Register::AlreadyResolved => break,
            Register::Sent => return Ok(Selected::Sent(index)),
            Register::Received(v) => return Ok(Selected::Received(index, v)),
            Register::Closed => {
                // Earlier ops in this loop may already be sitting in their
                // channels' waiter queues, still `Waiting`. Claim the
                // shared state as closed right here so any of those
                // leftover registrations are seen as stale (and skipped)
                // by whoever finds them next, instead of being paired
                // against and silently swallowing a value nobody is
                // parked to receive.
                resolve_closed_single(&state, index);
                return Err(SelectClosed { index });
            }
        }
    }

    match park(&state) {
        ParkOutcome::Done(index, Some(value)) => Ok(Selected::Received(index, value)),
        ParkOutcome::Done(index, None) => Ok(Selected::Sent(index)),
        ParkOutcome::Closed(index) => Err(SelectClosed { index }),
    }
}
