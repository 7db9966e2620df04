//! Multi-way `select` coverage, grounded in `test_select`,
//! `test_select_response_time`, `test_select_close`,
//! `test_select_with_same_channel`, `test_select_with_duplicate_channel`,
//! and `test_select_and_non_blocking_send`/`_receive` from the original
//! test suite.

use std::thread;
use std::time::Duration;

use crossbeam_utils::thread::scope;
use threadchan::{bounded, select, SelectClosed, SelectOp, Selected};

#[test]
fn select_picks_the_only_ready_receive() {
    let (tx, rx) = bounded(1);
    tx.send(1).unwrap();

    let mut ops = [SelectOp::recv(&rx)];
    assert_eq!(select(&mut ops), Ok(Selected::Received(0, 1)));
}

#[test]
fn select_first_listed_wins_when_several_ops_are_ready() {
    let (tx_a, rx_a) = bounded(1);
    let (tx_b, rx_b) = bounded(1);
    tx_a.send("a").unwrap();
    tx_b.send("b").unwrap();

    let mut ops = [SelectOp::recv(&rx_a), SelectOp::recv(&rx_b)];
    match select(&mut ops) {
        Ok(Selected::Received(0, v)) => assert_eq!(v, "a"),
        _ => panic!("expected the first-listed ready op to win"),
    }
    // The losing op's channel is untouched.
    assert_eq!(rx_b.recv(), Ok("b"));
}

#[test]
fn select_blocks_until_a_send_arrives() {
    let (tx, rx) = bounded(0);
    scope(|s| {
        s.spawn(|_| {
            thread::sleep(Duration::from_millis(20));
            tx.send(99).unwrap();
        });
        let mut ops = [SelectOp::recv(&rx)];
        match select(&mut ops) {
            Ok(Selected::Received(0, v)) => assert_eq!(v, 99),
            _ => panic!("expected a delivered receive"),
        }
    })
    .unwrap();
}

#[test]
fn select_offering_a_send_and_a_receive_picks_whichever_is_ready() {
    let (tx1, rx1) = bounded::<i32>(0);
    let (tx2, rx2) = bounded::<i32>(1);
    tx2.send(5).unwrap();

    let mut ops = [SelectOp::send(&tx1, 1), SelectOp::recv(&rx2)];
    match select(&mut ops) {
        Ok(Selected::Received(1, v)) => assert_eq!(v, 5),
        _ => panic!("expected the already-ready receive to win"),
    }
    drop(rx1);
}

#[test]
fn select_reports_the_first_closed_channel() {
    let (tx1, rx1) = bounded::<i32>(0);
    let (_tx2, rx2) = bounded::<i32>(0);
    rx1.close();

    let mut ops = [SelectOp::recv(&rx1), SelectOp::recv(&rx2)];
    assert_eq!(select(&mut ops), Err(SelectClosed { index: 0 }));
    drop(tx1);
}

#[test]
fn select_wakes_when_a_registered_channel_closes() {
    let (tx, rx) = bounded::<i32>(0);
    scope(|s| {
        s.spawn(|_| {
            thread::sleep(Duration::from_millis(20));
            tx.close();
        });
        let mut ops = [SelectOp::recv(&rx)];
        assert_eq!(select(&mut ops), Err(SelectClosed { index: 0 }));
    })
    .unwrap();
}

#[test]
fn select_with_two_ops_on_the_same_channel_only_commits_one() {
    let (tx, rx) = bounded(1);
    tx.send(1).unwrap();

    let mut ops = [SelectOp::recv(&rx), SelectOp::recv(&rx)];
    let first = select(&mut ops);
    assert!(matches!(first, Ok(Selected::Received(0, 1))));
}

#[test]
fn concurrent_selects_each_receive_exactly_one_message() {
    let (tx, rx) = bounded::<i32>(0);
    let rx2 = rx.clone();

    scope(|s| {
        let a = s.spawn(move |_| {
            let mut ops = [SelectOp::recv(&rx)];
            select(&mut ops)
        });
        let b = s.spawn(move |_| {
            let mut ops = [SelectOp::recv(&rx2)];
            select(&mut ops)
        });

        thread::sleep(Duration::from_millis(10));
        tx.send(1).unwrap();
        tx.send(2).unwrap();

        let mut results: Vec<i32> = [a.join().unwrap(), b.join().unwrap()]
            .into_iter()
            .map(|r| match r {
                Ok(Selected::Received(_, v)) => v,
                _ => panic!("expected both selects to receive a value"),
            })
            .collect();
        results.sort_unstable();
        assert_eq!(results, vec![1, 2]);
    })
    .unwrap();
}
