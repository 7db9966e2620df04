//! Bounded and zero-capacity multi-producer multi-consumer channels for
//! communicating between OS threads, plus a multi-way `select` over a mix
//! of sends and receives.
//!
//! ```
//! use threadchan::bounded;
//!
//! let (tx, rx) = bounded(1);
//! tx.send(7).unwrap();
//! assert_eq!(rx.recv(), Ok(7));
//! ```
//!
//! A channel created with `bounded(0)` is a rendezvous channel: `send`
//! blocks until a receiver is directly waiting for it, never buffering a
//! value in between.

mod channel;
mod err;
mod ring_buffer;
mod select;

pub use channel::{bounded, Channel, Receiver, Sender};
pub use err::{DestroyError, RecvError, SendError, Status, TryRecvError, TrySendError};
pub use select::{select, SelectClosed, SelectOp, Selected, SelectResult};
