//! Log queue stress test
//!
//! Many producer threads push uniquely tagged, checksummed records
//! through one `LogEntryQueue` while this thread drains continuously.
//! Every received record must be intact and unique; drops under
//! saturation are counted but acceptable.

use ember::{LogEntryQueue, Thread};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

fn checksum(producer: usize, seq: usize) -> usize {
    producer.wrapping_mul(31).wrapping_add(seq.wrapping_mul(17))
}

fn main() {
    println!("=== Ember Log Queue Stress Test ===\n");

    let mut args = std::env::args().skip(1);
    let num_producers: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(4);
    let per_producer: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(100_000);

    println!(
        "Producers: {}  Records per producer: {}\n",
        num_producers, per_producer
    );

    let queue = Arc::new(LogEntryQueue::new());
    let finished = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let mut producers = Vec::new();
    for producer in 0..num_producers {
        let queue = Arc::clone(&queue);
        let finished = Arc::clone(&finished);
        let dropped = Arc::clone(&dropped);
        producers.push(Thread::spawn(move || {
            for seq in 0..per_producer {
                let record =
                    format!("{:02}:{:08}:{:016x}", producer, seq, checksum(producer, seq));
                if !queue.enqueue(record.as_bytes()) {
                    // Saturated: the engine would drop this log line too.
                    dropped.fetch_add(1, Ordering::Relaxed);
                    std::thread::yield_now();
                }
            }
            finished.fetch_add(1, Ordering::Release);
        }));
    }

    // Consume on this thread until all producers finished and the
    // queue is dry.
    let mut seen = HashSet::new();
    let mut received = 0usize;
    let mut corrupted = 0usize;
    let mut duplicated = 0usize;
    let mut dest = [0u8; 512];
    loop {
        let copied = queue.dequeue(&mut dest);
        if copied == 0 {
            if finished.load(Ordering::Acquire) == num_producers && queue.is_empty() {
                break;
            }
            ember::this_thread::yield_now();
            continue;
        }

        match parse_record(&dest[..copied]) {
            Some((producer, seq, sum)) if sum == checksum(producer, seq) => {
                if seen.insert((producer, seq)) {
                    received += 1;
                } else {
                    duplicated += 1;
                }
            }
            _ => corrupted += 1,
        }
    }

    for producer in &mut producers {
        producer.join();
    }
    let elapsed = start.elapsed();

    let total = num_producers * per_producer;
    let dropped = dropped.load(Ordering::Relaxed);
    println!("=== Results ===");
    println!("Records sent:     {}", total);
    println!("Records received: {}", received);
    println!("Records dropped:  {}", dropped);
    println!("Corrupted:        {}", corrupted);
    println!("Duplicated:       {}", duplicated);
    println!("Elapsed:          {:?}", elapsed);
    println!(
        "Throughput:       {:.0} records/sec",
        received as f64 / elapsed.as_secs_f64()
    );

    if corrupted == 0 && duplicated == 0 && received + dropped == total {
        println!("\n=== Stress Test PASSED ===");
    } else {
        println!("\n=== Stress Test FAILED ===");
        std::process::exit(1);
    }
}

fn parse_record(bytes: &[u8]) -> Option<(usize, usize, usize)> {
    let text = std::str::from_utf8(bytes).ok()?;
    let mut parts = text.split(':');
    let producer = parts.next()?.parse().ok()?;
    let seq = parts.next()?.parse().ok()?;
    let sum = usize::from_str_radix(parts.next()?, 16).ok()?;
    parts.next().is_none().then_some((producer, seq, sum))
}
