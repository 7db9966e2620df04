//! Rendezvous-channel coverage, grounded in `test_unbuffered` and
//! `test_non_blocking_unbuffered`: a zero-capacity channel never buffers a
//! value, so every send must find a receiver already waiting (or vice
//! versa) to complete.

use std::thread;
use std::time::Duration;

use crossbeam_utils::thread::scope;
use rand::{thread_rng, Rng};
use threadchan::{bounded, TryRecvError, TrySendError};

#[test]
fn send_with_no_receiver_does_not_buffer() {
    let (tx, _rx) = bounded(0);
    assert_eq!(tx.try_send(1), Err(TrySendError::Full(1)));
}

#[test]
fn receive_with_no_sender_does_not_buffer() {
    let (_tx, rx) = bounded::<i32>(0);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn send_hands_off_directly_to_a_waiting_receiver() {
    let (tx, rx) = bounded(0);
    scope(|s| {
        let receiver = s.spawn(|_| rx.recv());
        thread::sleep(Duration::from_millis(20));
        tx.send(42).unwrap();
        assert_eq!(receiver.join().unwrap(), Ok(42));
    })
    .unwrap();
}

#[test]
fn many_rendezvous_round_trips_preserve_order_per_sender() {
    let (tx, rx) = bounded(0);
    let mut rng = thread_rng();
    let jitter_ms: u64 = rng.gen_range(1..5);

    scope(|s| {
        let producer = s.spawn(move |_| {
            for i in 0..50 {
                thread::sleep(Duration::from_micros(jitter_ms));
                tx.send(i).unwrap();
            }
        });
        for expected in 0..50 {
            assert_eq!(rx.recv(), Ok(expected));
        }
        producer.join().unwrap();
    })
    .unwrap();
}
