//! Basic ember example
//!
//! Starts the asynchronous logger and drives a few worker threads with
//! names, priorities and affinity applied.
//!
//! # Environment Variables
//!
//! - `EMBER_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `EMBER_LOG_FILE=/tmp/ember.log` - Write records to a file instead of stderr

use ember::{cdebug, cinfo, start_logging, LogLevel, LoggerConfig, Thread, ThreadPriority};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// EMBER_LOG_LEVEL=debug cargo run -p ember-basic
fn main() {
    println!("=== Ember Basic Example ===\n");

    let logger = start_logging(LoggerConfig::from_env().level(LogLevel::Debug))
        .expect("failed to start log thread");

    cinfo!("main thread id: {}", ember::this_thread::thread_id());
    let mask = ember::this_thread::affinity_mask();
    cinfo!(
        "main thread may run on {} of the first 64 CPUs",
        (0..64).filter(|&cpu| mask.is_set(cpu)).count()
    );

    let completed = Arc::new(AtomicUsize::new(0));
    let mut workers = Vec::new();

    for i in 0..3usize {
        let completed = Arc::clone(&completed);
        let worker = Thread::spawn(move || {
            ember::this_thread::set_name(&format!("ember-worker-{}", i));
            cdebug!(
                "[worker {}] online, thread id {}",
                i,
                ember::this_thread::thread_id()
            );

            for frame in 0..3 {
                cdebug!("[worker {}] simulating frame {}", i, frame);
                ember::this_thread::yield_now();
            }

            completed.fetch_add(1, Ordering::SeqCst);
        });

        // Background workers drop below the engine's frame loop.
        let priority = if i == 0 {
            ThreadPriority::Normal
        } else {
            ThreadPriority::Lowest
        };
        if !worker.set_priority(priority) {
            cdebug!("[worker {}] priority change refused by the OS", i);
        }
        workers.push(worker);
    }

    for (i, worker) in workers.iter_mut().enumerate() {
        if worker.join() {
            println!("Worker {} joined", i);
        }
    }
    cinfo!("{} worker(s) completed", completed.load(Ordering::SeqCst));

    logger.shutdown();
    println!("\n=== Example Complete ===");
}
