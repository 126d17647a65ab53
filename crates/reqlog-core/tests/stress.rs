//! Stress tests for the log store
//!
//! These tests hammer a shared store from many threads to verify that
//! insertion plus eviction stays atomic and the capacity bound holds.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;

use reqlog_core::{CAPACITY, LogFilter, LogStore, RequestMeta};
use serde_json::json;

/// Concurrent appends never leave the store over capacity
#[test]
fn test_concurrent_appends_respect_capacity() {
    const NUM_THREADS: usize = 16;
    const ITERATIONS: usize = 200;

    let store = Arc::new(LogStore::new());
    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let mut handles = vec![];

    let start = Instant::now();

    for thread_id in 0..NUM_THREADS {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);

        let handle = thread::spawn(move || {
            barrier.wait();

            for i in 0..ITERATIONS {
                store.append(
                    Some(json!({ "senderId": format!("t{thread_id}"), "n": i })),
                    RequestMeta::new("POST"),
                );
                assert!(store.len() <= CAPACITY);
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), CAPACITY);

    let ids: HashSet<_> = store.snapshot().into_iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), CAPACITY);

    let elapsed = start.elapsed();
    println!(
        "Completed {} appends across {} threads in {:?}",
        NUM_THREADS * ITERATIONS,
        NUM_THREADS,
        elapsed
    );
}

/// Each thread's surviving events keep their insertion order
#[test]
fn test_per_thread_order_preserved() {
    const NUM_THREADS: usize = 4;
    const ITERATIONS: usize = 50;

    let store = Arc::new(LogStore::new());
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|thread_id| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..ITERATIONS {
                    store.append(
                        Some(json!({ "senderId": format!("t{thread_id}"), "n": i })),
                        RequestMeta::new("POST"),
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for thread_id in 0..NUM_THREADS {
        let events = store.query(&LogFilter::new().sender_id(format!("t{thread_id}")));
        assert_eq!(events.len(), ITERATIONS);

        let seq: Vec<u64> = events
            .iter()
            .map(|e| e.raw_body.as_ref().unwrap()["n"].as_u64().unwrap())
            .collect();
        let expected: Vec<u64> = (0..ITERATIONS as u64).rev().collect();
        assert_eq!(seq, expected);
    }
}

/// Readers running during writes never observe an over-capacity store
#[test]
fn test_queries_during_appends() {
    const WRITERS: usize = 4;
    const READERS: usize = 4;
    const ITERATIONS: usize = 500;

    let store = Arc::new(LogStore::new());
    let barrier = Arc::new(Barrier::new(WRITERS + READERS));
    let mut handles = vec![];

    for _ in 0..WRITERS {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 0..ITERATIONS {
                store.append(Some(json!({ "source": "feed", "n": i })), RequestMeta::new("POST"));
                if i % 100 == 99 {
                    store.clear();
                }
            }
        }));
    }

    for _ in 0..READERS {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..ITERATIONS {
                let results = store.query(&LogFilter::new().is_scraper(true));
                assert!(results.len() <= CAPACITY);
                assert!(results.iter().all(|e| e.is_scraper));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(store.len() <= CAPACITY);
}

/// Rapid append/clear cycles
#[test]
fn test_rapid_clear_cycles() {
    const CYCLES: usize = 1_000;

    let store = LogStore::new();
    let start = Instant::now();

    for i in 0..CYCLES {
        store.append(Some(json!({ "n": i })), RequestMeta::new("POST"));
        store.append(None, RequestMeta::new("PUT"));
        assert_eq!(store.clear(), 2);
    }

    assert!(store.is_empty());
    println!("Completed {} clear cycles in {:?}", CYCLES, start.elapsed());
}
