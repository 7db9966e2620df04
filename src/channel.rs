//! The channel itself: a ring buffer plus two waiter queues, guarded by one
//! mutex per channel. Blocking sends/receives and multi-way `select` share
//! a single registration/claim path (`SelectState`) so that a value can
//! never be claimed twice, whether the competing claimants are two plain
//! blocking calls, a blocking call racing a `select`, or two `select`s on
//! different channels.
//!
//! Suspension always goes through `Condvar::wait`, never a spin loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::err::{RecvError, SendError, Status, TryRecvError, TrySendError};
use crate::ring_buffer::RingBuffer;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// The terminal state of one registration: still pending, committed to a
/// particular operation index, or resolved as closed at that index.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Waiting,
    Done(usize),
    Closed(usize),
}

/// Shared between every op of a single blocking call or `select`
/// invocation. Exactly one registered op is ever allowed to move this out
/// of `Waiting`; every other registration on the same call is left to be
/// garbage-collected the next time something looks at it.
pub(crate) struct SelectState<T> {
    inner: Mutex<SelectInner<T>>,
    condvar: Condvar,
}

struct SelectInner<T> {
    outcome: Outcome,
    /// Populated only when a *different* thread delivers a value into a
    /// parked receive (direct sends and local buffer pops return their
    /// value straight to the caller instead).
    value: Option<T>,
}

impl<T> SelectState<T> {
    fn new() -> Self {
        SelectState {
            inner: Mutex::new(SelectInner {
                outcome: Outcome::Waiting,
                value: None,
            }),
            condvar: Condvar::new(),
        }
    }
}

/// Locks two distinct select states in a pointer-address order, so two
/// threads pairing the same two states from opposite directions can never
/// deadlock against each other.
fn lock_pair<'a, T>(
    a: &'a SelectState<T>,
    b: &'a SelectState<T>,
) -> (
    MutexGuard<'a, SelectInner<T>>,
    MutexGuard<'a, SelectInner<T>>,
) {
    let pa = a as *const SelectState<T> as usize;
    let pb = b as *const SelectState<T> as usize;
    if pa < pb {
        let ga = a.inner.lock().unwrap();
        let gb = b.inner.lock().unwrap();
        (ga, gb)
    } else if pa > pb {
        let gb = b.inner.lock().unwrap();
        let ga = a.inner.lock().unwrap();
        (ga, gb)
    } else {
        unreachable!("a call never pairs with its own registration")
    }
}

/// A registered blocking or `select`-registered sender, still holding the
/// value it wants to hand off.
struct SendWaiter<T> {
    #[allow(dead_code)]
    id: u64,
    index: usize,
    state: Arc<SelectState<T>>,
    value: Mutex<Option<T>>,
}

/// A registered blocking or `select`-registered receiver.
struct RecvWaiter<T> {
    #[allow(dead_code)]
    id: u64,
    index: usize,
    state: Arc<SelectState<T>>,
}

struct Inner<T> {
    buffer: RingBuffer<T>,
    closed: bool,
    send_waiters: VecDeque<Arc<SendWaiter<T>>>,
    recv_waiters: VecDeque<Arc<RecvWaiter<T>>>,
}

/// A bounded (or zero-capacity) FIFO channel shared by `Sender`/`Receiver`
/// handles.
pub struct Channel<T> {
    inner: Mutex<Inner<T>>,
}

pub(crate) enum SendAttempt<T> {
    Sent,
    Closed(T),
    Registered(Arc<SendWaiterHandle<T>>),
    WouldBlock(T),
    /// Only possible when registering on behalf of a `select`: this op's
    /// shared state already resolved through a different channel.
    AlreadyResolved(T),
}

pub(crate) enum RecvAttempt<T> {
    Received(T),
    Closed,
    Registered,
    WouldBlock,
    AlreadyResolved,
}

/// Opaque handle `Sender::send` keeps so it can reclaim its value back out
/// of the channel's waiter queue if the channel closes before anyone
/// claims it.
pub(crate) struct SendWaiterHandle<T>(Arc<SendWaiter<T>>);

pub(crate) enum ParkOutcome<T> {
    Done(usize, Option<T>),
    Closed(usize),
}

/// Blocks the calling thread until `state` leaves `Waiting`.
pub(crate) fn park<T>(state: &SelectState<T>) -> ParkOutcome<T> {
    let mut guard = state.inner.lock().unwrap();
    while guard.outcome == Outcome::Waiting {
        guard = state.condvar.wait(guard).unwrap();
    }
    match guard.outcome {
        Outcome::Done(index) => ParkOutcome::Done(index, guard.value.take()),
        Outcome::Closed(index) => ParkOutcome::Closed(index),
        Outcome::Waiting => unreachable!(),
    }
}

/// Single-party claim used when completing against the plain ring buffer
/// (no counterpart thread is involved, so there is nothing to pair with).
fn claim_local<T>(state: &SelectState<T>, index: usize) -> bool {
    let mut guard = state.inner.lock().unwrap();
    if guard.outcome == Outcome::Waiting {
        guard.outcome = Outcome::Done(index);
        true
    } else {
        false
    }
}

pub(crate) fn resolve_closed_single<T>(state: &SelectState<T>, index: usize) {
    let mut guard = state.inner.lock().unwrap();
    if guard.outcome == Outcome::Waiting {
        guard.outcome = Outcome::Closed(index);
        drop(guard);
        state.condvar.notify_all();
    }
}

enum SendPairResult<T> {
    Paired,
    NoCounterpart(T),
    OwnAlreadyResolved(T),
}

/// An active send meets an already-registered receiver. When `own` is
/// `Some`, the active call's own state and the candidate's state are
/// locked together so a concurrent commit on either side can never cause
/// the value to be both delivered here and consumed elsewhere.
fn try_pair_with_receiver<T>(
    inner: &mut Inner<T>,
    own: Option<&(Arc<SelectState<T>>, usize)>,
    mut value: T,
) -> SendPairResult<T> {
    loop {
        let waiter = match inner.recv_waiters.pop_front() {
            Some(w) => w,
            None => return SendPairResult::NoCounterpart(value),
        };
        match own {
            None => {
                let mut g = waiter.state.inner.lock().unwrap();
                if g.outcome == Outcome::Waiting {
                    g.outcome = Outcome::Done(waiter.index);
                    g.value = Some(value);
                    drop(g);
                    waiter.state.condvar.notify_all();
                    return SendPairResult::Paired;
                }
                // Stale registration (resolved via a different channel in
                // its own select): drop it and try the next one.
                continue;
            }
            Some((state, index)) => {
                let (mut ga, mut gb) = lock_pair(state, &waiter.state);
                if ga.outcome != Outcome::Waiting {
                    return SendPairResult::OwnAlreadyResolved(value);
                }
                if gb.outcome != Outcome::Waiting {
                    drop(ga);
                    drop(gb);
                    continue;
                }
                ga.outcome = Outcome::Done(*index);
                gb.outcome = Outcome::Done(waiter.index);
                gb.value = Some(value);
                drop(ga);
                drop(gb);
                waiter.state.condvar.notify_all();
                return SendPairResult::Paired;
            }
        }
    }
}

enum RecvPairResult<T> {
    Paired(T),
    NoCounterpart,
    OwnAlreadyResolved,
}

/// An active receive meets an already-registered sender (this is the only
/// path a zero-capacity rendezvous ever completes through).
fn try_pair_with_sender<T>(
    inner: &mut Inner<T>,
    own: Option<&(Arc<SelectState<T>>, usize)>,
) -> RecvPairResult<T> {
    loop {
        let waiter = match inner.send_waiters.pop_front() {
            Some(w) => w,
            None => return RecvPairResult::NoCounterpart,
        };
        match own {
            None => {
                let mut g = waiter.state.inner.lock().unwrap();
                if g.outcome == Outcome::Waiting {
                    g.outcome = Outcome::Done(waiter.index);
                    drop(g);
                    waiter.state.condvar.notify_all();
                    let value = waiter
                        .value
                        .lock()
                        .unwrap()
                        .take()
                        .expect("registered sender carries a value until claimed");
                    return RecvPairResult::Paired(value);
                }
                continue;
            }
            Some((state, index)) => {
                let (mut ga, mut gb) = lock_pair(state, &waiter.state);
                if ga.outcome != Outcome::Waiting {
                    return RecvPairResult::OwnAlreadyResolved;
                }
                if gb.outcome != Outcome::Waiting {
                    drop(ga);
                    drop(gb);
                    continue;
                }
                ga.outcome = Outcome::Done(*index);
                gb.outcome = Outcome::Done(waiter.index);
                drop(ga);
                drop(gb);
                waiter.state.condvar.notify_all();
                let value = waiter
                    .value
                    .lock()
                    .unwrap()
                    .take()
                    .expect("registered sender carries a value until claimed");
                return RecvPairResult::Paired(value);
            }
        }
    }
}

/// After a receive frees a buffer slot, pull one registered sender's value
/// into it so earlier-queued senders keep making progress in order. The
/// symmetric promotion (pulling a registered receiver after a send fills
/// the buffer) never needs to exist: `attempt_send` always tries a direct
/// hand-off to a waiting receiver before it ever touches the buffer, so a
/// receiver is never left registered while the buffer holds room.
fn promote_sender_into_buffer<T>(inner: &mut Inner<T>) {
    if inner.buffer.is_full() {
        return;
    }
    loop {
        let waiter = match inner.send_waiters.pop_front() {
            Some(w) => w,
            None => return,
        };
        let mut g = waiter.state.inner.lock().unwrap();
        if g.outcome == Outcome::Waiting {
            g.outcome = Outcome::Done(waiter.index);
            drop(g);
            waiter.state.condvar.notify_all();
            let value = waiter
                .value
                .lock()
                .unwrap()
                .take()
                .expect("registered sender carries a value until claimed");
            inner
                .buffer
                .push(value)
                .unwrap_or_else(|_| unreachable!("just confirmed room in the buffer"));
            return;
        }
        // Stale: keep scanning for a live sender.
    }
}

impl<T> Channel<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Channel {
            inner: Mutex::new(Inner {
                buffer: RingBuffer::new(capacity),
                closed: false,
                send_waiters: VecDeque::new(),
                recv_waiters: VecDeque::new(),
            }),
        }
    }

    /// Tries to send `value` right now; if that is not possible and
    /// `register` is `Some`, atomically registers it as a waiter instead.
    pub(crate) fn attempt_send(
        &self,
        value: T,
        register: Option<(Arc<SelectState<T>>, usize)>,
    ) -> SendAttempt<T> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return SendAttempt::Closed(value);
        }

        if !inner.recv_waiters.is_empty() {
            match try_pair_with_receiver(&mut inner, register.as_ref(), value) {
                SendPairResult::Paired => return SendAttempt::Sent,
                SendPairResult::OwnAlreadyResolved(v) => return SendAttempt::AlreadyResolved(v),
                SendPairResult::NoCounterpart(v) => {
                    // Every queued receiver turned out to be stale; fall
                    // through to the buffer/registration path below.
                    return self.attempt_send_via_buffer(inner, v, register);
                }
            }
        }

        self.attempt_send_via_buffer(inner, value, register)
    }

    fn attempt_send_via_buffer(
        &self,
        mut inner: MutexGuard<'_, Inner<T>>,
        value: T,
        register: Option<(Arc<SelectState<T>>, usize)>,
    ) -> SendAttempt<T> {
        if !inner.buffer.is_full() {
            if let Some((state, index)) = &register {
                if !claim_local(state, *index) {
                    return SendAttempt::AlreadyResolved(value);
                }
            }
            inner
                .buffer
                .push(value)
                .unwrap_or_else(|_| unreachable!("just checked is_full"));
            return SendAttempt::Sent;
        }

        match register {
            Some((state, index)) => {
                let waiter = Arc::new(SendWaiter {
                    id: next_id(),
                    index,
                    state,
                    value: Mutex::new(Some(value)),
                });
                inner.send_waiters.push_back(waiter.clone());
                SendAttempt::Registered(Arc::new(SendWaiterHandle(waiter)))
            }
            None => SendAttempt::WouldBlock(value),
        }
    }

    /// Tries to receive right now; if nothing is available and `register`
    /// is `Some`, atomically registers as a waiter instead.
    pub(crate) fn attempt_recv(
        &self,
        register: Option<(Arc<SelectState<T>>, usize)>,
    ) -> RecvAttempt<T> {
        let mut inner = self.inner.lock().unwrap();

        if inner.closed {
            return RecvAttempt::Closed;
        }

        if !inner.buffer.is_empty() {
            if let Some((state, index)) = &register {
                if !claim_local(state, *index) {
                    return RecvAttempt::AlreadyResolved;
                }
            }
            let value = inner
                .buffer
                .pop()
                .expect("just checked the buffer is non-empty");
            promote_sender_into_buffer(&mut inner);
            return RecvAttempt::Received(value);
        }

        if !inner.send_waiters.is_empty() {
            match try_pair_with_sender(&mut inner, register.as_ref()) {
                RecvPairResult::Paired(v) => return RecvAttempt::Received(v),
                RecvPairResult::OwnAlreadyResolved => return RecvAttempt::AlreadyResolved,
                RecvPairResult::NoCounterpart => {}
            }
        }

        match register {
            Some((state, index)) => {
                let waiter = Arc::new(RecvWaiter {
                    id: next_id(),
                    index,
                    state,
                });
                inner.recv_waiters.push_back(waiter);
                RecvAttempt::Registered
            }
            None => RecvAttempt::WouldBlock,
        }
    }

    pub(crate) fn close(&self) -> Status {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Status::Closed;
        }
        inner.closed = true;
        for w in inner.send_waiters.drain(..) {
            resolve_closed_single(&w.state, w.index);
        }
        for w in inner.recv_waiters.drain(..) {
            resolve_closed_single(&w.state, w.index);
        }
        Status::Success
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Consumes the channel; fails unless it has already been closed,
    /// matching the destroy-on-open-channel error from the external
    /// interface contract.
    pub fn destroy(self) -> Result<(), crate::err::DestroyError> {
        let inner = self.inner.into_inner().unwrap();
        if inner.closed {
            Ok(())
        } else {
            Err(crate::err::DestroyError)
        }
    }
}

/// Blocking send, implemented as a one-operation `select`: it shares the
/// exact registration and claim path a multi-way `select` uses, so a
/// direct blocking sender can never race a select-committed operation for
/// the same buffer slot.
pub(crate) fn send_blocking<T>(channel: &Channel<T>, value: T) -> Result<(), SendError<T>> {
    let state = Arc::new(SelectState::new());
    match channel.attempt_send(value, Some((state.clone(), 0))) {
        SendAttempt::Sent => Ok(()),
        SendAttempt::Closed(v) => Err(SendError(v)),
        SendAttempt::AlreadyResolved(_) => unreachable!("a fresh state has no other claimant"),
        SendAttempt::WouldBlock(_) => unreachable!("registration was requested"),
        SendAttempt::Registered(handle) => match park(&state) {
            ParkOutcome::Done(_, _) => Ok(()),
            ParkOutcome::Closed(_) => {
                let v = handle
                    .0
                    .value
                    .lock()
                    .unwrap()
                    .take()
                    .expect("closing never claims a waiter's value");
                Err(SendError(v))
            }
        },
    }
}

pub(crate) fn try_send<T>(channel: &Channel<T>, value: T) -> Result<(), TrySendError<T>> {
    match channel.attempt_send(value, None) {
        SendAttempt::Sent => Ok(()),
        SendAttempt::Closed(v) => Err(TrySendError::Closed(v)),
        SendAttempt::WouldBlock(v) => Err(TrySendError::Full(v)),
        SendAttempt::Registered(_) | SendAttempt::AlreadyResolved(_) => {
            unreachable!("non-blocking attempts never register")
        }
    }
}

pub(crate) fn recv_blocking<T>(channel: &Channel<T>) -> Result<T, RecvError> {
    let state = Arc::new(SelectState::new());
    match channel.attempt_recv(Some((state.clone(), 0))) {
        RecvAttempt::Received(v) => Ok(v),
        RecvAttempt::Closed => Err(RecvError),
        RecvAttempt::AlreadyResolved => unreachable!("a fresh state has no other claimant"),
        RecvAttempt::WouldBlock => unreachable!("registration was requested"),
        RecvAttempt::Registered => match park(&state) {
            ParkOutcome::Done(_, v) => Ok(v.expect("a claimed receive always carries a value")),
            ParkOutcome::Closed(_) => Err(RecvError),
        },
    }
}

pub(crate) fn try_recv<T>(channel: &Channel<T>) -> Result<T, TryRecvError> {
    match channel.attempt_recv(None) {
        RecvAttempt::Received(v) => Ok(v),
        RecvAttempt::Closed => Err(TryRecvError::Closed),
        RecvAttempt::WouldBlock => Err(TryRecvError::Empty),
        RecvAttempt::Registered | RecvAttempt::AlreadyResolved => {
            unreachable!("non-blocking attempts never register")
        }
    }
}

/// A clonable handle for sending on a channel.
pub struct Sender<T> {
    pub(crate) channel: Arc<Channel<T>>,
}

impl<T> Sender<T> {
    /// Blocks until the message is delivered (to the buffer or directly to
    /// a waiting receiver) or the channel is closed.
    pub fn send(&self, msg: T) -> Result<(), SendError<T>> {
        send_blocking(&self.channel, msg)
    }

    /// Sends without blocking, failing immediately if the channel has no
    /// room right now.
    pub fn try_send(&self, msg: T) -> Result<(), TrySendError<T>> {
        try_send(&self.channel, msg)
    }

    /// Closes the channel. Idempotent: closing an already-closed channel
    /// reports `Status::Closed` rather than panicking.
    pub fn close(&self) -> Status {
        self.channel.close()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Sender {
            channel: self.channel.clone(),
        }
    }
}

/// A clonable handle for receiving from a channel.
pub struct Receiver<T> {
    pub(crate) channel: Arc<Channel<T>>,
}

impl<T> Receiver<T> {
    /// Blocks until a message is available or the channel is closed with
    /// nothing left to deliver.
    pub fn recv(&self) -> Result<T, RecvError> {
        recv_blocking(&self.channel)
    }

    /// Receives without blocking, failing immediately if nothing is ready.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        try_recv(&self.channel)
    }

    pub fn close(&self) -> Status {
        self.channel.close()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Receiver {
            channel: self.channel.clone(),
        }
    }
}

/// Creates a channel with room for `capacity` buffered messages.
/// `capacity == 0` is a zero-capacity rendezvous channel: every send
/// blocks until a receiver is directly waiting for it, and vice versa.
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let channel = Arc::new(Channel::new(capacity));
    (
        Sender {
            channel: channel.clone(),
        },
        Receiver { channel },
    )
}

pub(crate) fn select_register<T>(
    channel: &Channel<T>,
    value: T,
    state: Arc<SelectState<T>>,
    index: usize,
) -> SendAttempt<T> {
    channel.attempt_send(value, Some((state, index)))
}

pub(crate) fn select_register_recv<T>(
    channel: &Channel<T>,
    state: Arc<SelectState<T>>,
    index: usize,
) -> RecvAttempt<T> {
    channel.attempt_recv(Some((state, index)))
}

pub(crate) fn new_select_state<T>() -> Arc<SelectState<T>> {
    Arc::new(SelectState::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_refuses_an_open_channel() {
        let channel = Channel::<i32>::new(1);
        assert!(channel.destroy().is_err());
    }

    #[test]
    fn destroy_accepts_a_closed_channel() {
        let channel = Channel::<i32>::new(1);
        channel.close();
        assert!(channel.destroy().is_ok());
    }

    #[test]
    fn zero_capacity_send_waits_for_a_receiver() {
        let channel = Arc::new(Channel::<i32>::new(0));
        let sender = channel.clone();
        let handle = std::thread::spawn(move || send_blocking(&sender, 9));
        // Give the sender a moment to park before the receive arrives.
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(recv_blocking(&channel), Ok(9));
        handle.join().unwrap().unwrap();
    }
}
