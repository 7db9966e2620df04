//! Ring-passing stress harness: `num_threads` workers each own a channel,
//! pass tagged messages around the ring, and redirect them back to a
//! shared completion channel once a `done` flag flips. Ported from the
//! original `run_stress_send_recv` stress harness; exercises sustained
//! multi-producer multi-consumer traffic rather than testing any one
//! operation in isolation.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use threadchan::{bounded, Receiver, Sender};

/// `None` is the sentinel carried by the C original's `NULL` data pointer:
/// on the main channel it marks "the start burst is over", on a worker's
/// own channel it marks "shut down".
type Msg = Option<u64>;

fn worker(
    index: usize,
    next: Sender<Msg>,
    my_channel: Receiver<Msg>,
    main_tx: Sender<Msg>,
    main_rx: Receiver<Msg>,
    done: Arc<AtomicBool>,
) {
    let _ = index;
    let mut started = false;
    loop {
        let data = if !started {
            match main_rx.recv().expect("main channel closed early") {
                None => {
                    started = true;
                    continue;
                }
                Some(v) => v,
            }
        } else {
            match my_channel.recv().expect("worker channel closed early") {
                None => break,
                Some(v) => v,
            }
        };

        if done.load(Ordering::SeqCst) {
            main_tx.send(Some(data)).expect("main channel accepts completions");
        } else {
            next.send(Some(data)).expect("ring channel accepts forwards");
        }
    }
}

fn run(buffer_size: usize, num_threads: usize, load: f64, duration: Duration) {
    let done = Arc::new(AtomicBool::new(false));
    let num_msgs = ((num_threads * (buffer_size + 1)) as f64 * load) as u64;

    let mut channels = Vec::with_capacity(num_threads);
    for _ in 0..num_threads {
        channels.push(bounded::<Msg>(buffer_size));
    }
    let (main_tx, main_rx) = bounded::<Msg>(buffer_size);

    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let next_index = (i + 1) % num_threads;
            let next_tx = channels[next_index].0.clone();
            let my_rx = channels[i].1.clone();
            let main_tx = main_tx.clone();
            let main_rx = main_rx.clone();
            let done = done.clone();
            thread::spawn(move || worker(i, next_tx, my_rx, main_tx, main_rx, done))
        })
        .collect();

    for msg in 1..=num_msgs {
        main_tx.send(Some(msg)).unwrap();
    }
    for _ in 0..num_threads {
        main_tx.send(None).unwrap();
    }

    thread::sleep(duration);
    done.store(true, Ordering::SeqCst);

    let mut seen = vec![false; (num_msgs + 1) as usize];
    for _ in 1..=num_msgs {
        let data = main_rx.recv().unwrap().expect("completions always carry data");
        assert!((1..=num_msgs).contains(&data));
        assert!(!seen[data as usize], "message {data} was delivered twice");
        seen[data as usize] = true;
    }

    for (tx, _) in &channels {
        tx.send(None).unwrap();
    }
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    main_tx.close();
    main_rx.close();
    for (tx, rx) in &channels {
        tx.close();
        rx.close();
    }

    println!("ring_pass: {num_msgs} messages through {num_threads} workers, no duplicates or drops");
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let buffer_size: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(4);
    let num_threads: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(8);
    let load: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(2.0);
    let duration_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(200);

    run(buffer_size, num_threads, load, Duration::from_millis(duration_ms));
}
