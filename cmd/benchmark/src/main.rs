//! Log queue timing report
//!
//! Wall-clock numbers for the uncontended path and for concurrent
//! producers. For statistical benchmarks use the criterion bench in
//! ember-core (`cargo bench -p ember-core`).

use ember::{LogEntryQueue, Thread};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

fn main() {
    println!("=== Ember Log Queue Benchmark ===\n");

    let iterations: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(1_000_000);

    single_thread(iterations);
    contended(iterations, 4);

    println!("\n=== Benchmark Complete ===");
}

fn single_thread(iterations: usize) {
    let queue = LogEntryQueue::new();
    let record = [0x5Au8; 64];
    let mut dest = [0u8; 512];

    let start = Instant::now();
    for _ in 0..iterations {
        queue.enqueue(&record);
        queue.dequeue(&mut dest);
    }
    let elapsed = start.elapsed();

    println!("--- Single thread: {} enqueue+dequeue pairs ---", iterations);
    println!("Elapsed:    {:?}", elapsed);
    println!(
        "Per pair:   {:.1} ns",
        elapsed.as_nanos() as f64 / iterations as f64
    );
    println!(
        "Throughput: {:.2} M pairs/sec\n",
        iterations as f64 / elapsed.as_secs_f64() / 1e6
    );
}

fn contended(iterations: usize, num_producers: usize) {
    let queue = Arc::new(LogEntryQueue::new());
    let finished = Arc::new(AtomicUsize::new(0));
    let per_producer = iterations / num_producers;
    let record = [0xA5u8; 64];

    let start = Instant::now();
    let mut producers = Vec::new();
    for _ in 0..num_producers {
        let queue = Arc::clone(&queue);
        let finished = Arc::clone(&finished);
        producers.push(Thread::spawn(move || {
            let mut sent = 0usize;
            while sent < per_producer {
                if queue.enqueue(&record) {
                    sent += 1;
                } else {
                    std::thread::yield_now();
                }
            }
            finished.fetch_add(1, Ordering::Release);
        }));
    }

    let mut dest = [0u8; 512];
    let mut received = 0usize;
    loop {
        if queue.dequeue(&mut dest) > 0 {
            received += 1;
        } else if finished.load(Ordering::Acquire) == num_producers && queue.is_empty() {
            break;
        } else {
            ember::this_thread::yield_now();
        }
    }

    for producer in &mut producers {
        producer.join();
    }
    let elapsed = start.elapsed();

    println!(
        "--- {} producers + 1 consumer: {} records ---",
        num_producers, received
    );
    println!("Elapsed:    {:?}", elapsed);
    println!(
        "Throughput: {:.2} M records/sec",
        received as f64 / elapsed.as_secs_f64() / 1e6
    );
}
