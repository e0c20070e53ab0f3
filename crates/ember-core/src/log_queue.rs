//! `LogEntryQueue`: lock-free multi-producer single-consumer log ring.
//!
//! Arbitrary engine and game threads hand formatted log lines to the
//! single logging thread without blocking. Records are variable-length:
//! a 2-byte little-endian length header followed by the raw payload,
//! packed into one fixed byte array. A record may straddle the physical
//! end of the array (at most two-chunk copies on both sides).
//!
//! # Thread safety
//!
//! - **Producers:** CAS-advance `reserve_pos` to claim a byte range,
//!   write header + payload into the claimed range, then commit
//!   `write_pos` in reservation order. Multiple producers are safe.
//! - **Consumer:** sole reader, advances `read_pos` after copying a
//!   record out. Single consumer only; concurrent dequeuers are NOT
//!   protected against each other.
//!
//! # Cursors
//!
//! `reserve_pos`, `write_pos` and `read_pos` are u32 positions in the
//! logical (unbounded) byte stream; the physical index is
//! `pos % LOG_BUFFER_LENGTH`. The capacity is a power of two, so the
//! modulo stays consistent when the u32 counters wrap. The queue is
//! empty when `read_pos == write_pos`; reservation refuses to consume
//! the last free byte, so that equality never means "full".
//!
//! # Atomics
//!
//! Producers read `read_pos` with Acquire (to see the consumer's latest
//! progress before judging free space) and publish `write_pos` with
//! Release. The consumer reads `write_pos` with Acquire and publishes
//! `read_pos` with Release. `write_pos` is committed strictly in
//! reservation order: a producer publishes only after its predecessor
//! has, so the watermark never covers bytes that are still being
//! written. Commit is lock-free, not wait-free: a producer may briefly
//! spin on a slower predecessor's copy.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::constants::{LENGTH_HEADER_SIZE, LOG_BUFFER_LENGTH, MAX_ENTRY_LENGTH};

const BUFFER_LEN: u32 = LOG_BUFFER_LENGTH as u32;
const HEADER_LEN: u32 = LENGTH_HEADER_SIZE as u32;

// Cursor arithmetic relies on the capacity dividing 2^32.
const _: () = assert!(LOG_BUFFER_LENGTH.is_power_of_two());
// The length header must be able to represent any payload.
const _: () = assert!(MAX_ENTRY_LENGTH - 1 <= u16::MAX as usize);
// A maximum-size record must leave free space behind it.
const _: () = assert!(LENGTH_HEADER_SIZE + MAX_ENTRY_LENGTH < LOG_BUFFER_LENGTH);

/// Fixed-capacity MPSC byte ring for framed log records
pub struct LogEntryQueue {
    /// Physical ring storage, zero-filled at construction
    buffer: UnsafeCell<Box<[u8]>>,

    /// Producer claim cursor (CAS to reserve a byte range)
    reserve_pos: AtomicU32,

    /// Published watermark; committed in reservation order
    write_pos: AtomicU32,

    /// Consumer cursor
    read_pos: AtomicU32,
}

// Safety: producers only touch byte ranges they have exclusively claimed
// via the reserve_pos CAS, and the consumer only reads ranges at or below
// the committed write_pos watermark. All cursor hand-off is Acquire/Release.
unsafe impl Send for LogEntryQueue {}
unsafe impl Sync for LogEntryQueue {}

impl LogEntryQueue {
    /// Create an empty queue with all cursors at zero
    pub fn new() -> Self {
        Self {
            buffer: UnsafeCell::new(vec![0u8; LOG_BUFFER_LENGTH].into_boxed_slice()),
            reserve_pos: AtomicU32::new(0),
            write_pos: AtomicU32::new(0),
            read_pos: AtomicU32::new(0),
        }
    }

    /// Try to append one record to the ring.
    ///
    /// This is the hot path, called from any thread. It never blocks and
    /// never allocates. Returns `false` for empty input, for payloads
    /// larger than `MAX_ENTRY_LENGTH - 1` bytes, and when the ring does
    /// not have room; a full queue is a normal outcome (the caller drops
    /// the line), not an error.
    pub fn enqueue(&self, entry: &[u8]) -> bool {
        let len = entry.len();
        if len == 0 || len > MAX_ENTRY_LENGTH - 1 {
            return false;
        }
        let needed = HEADER_LEN + len as u32;

        // 1. Claim a byte range. The free-space check and the claim are
        //    one CAS step, so racing producers cannot jointly over-reserve.
        let mut reserved = self.reserve_pos.load(Ordering::Relaxed);
        loop {
            let read = self.read_pos.load(Ordering::Acquire);
            let used = reserved.wrapping_sub(read);
            if BUFFER_LEN - used <= needed {
                return false;
            }
            match self.reserve_pos.compare_exchange_weak(
                reserved,
                reserved.wrapping_add(needed),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => {
                    reserved = actual;
                    std::hint::spin_loop();
                }
            }
        }

        // 2. Fill the claimed range: header then payload, wrap-aware.
        //    No other producer writes here; the claim is exclusive.
        let header = (len as u16).to_le_bytes();
        unsafe {
            self.write_at(reserved, &header);
            self.write_at(reserved.wrapping_add(HEADER_LEN), entry);
        }

        // 3. Commit in reservation order. The CAS succeeds only once the
        //    predecessor's commit has landed, so the consumer never sees
        //    the watermark pass over bytes that are still in flight.
        let next = reserved.wrapping_add(needed);
        while self
            .write_pos
            .compare_exchange_weak(reserved, next, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
        true
    }

    /// Copy the oldest record into `dest`.
    ///
    /// Single consumer only. Returns 0 when the queue is empty or `dest`
    /// is zero-sized, leaving `dest` and the cursors untouched. Otherwise
    /// copies at most `dest.len() - 1` payload bytes, writes a NUL
    /// terminator after them, and returns the copied count. Truncation is
    /// silent: the cursor still advances past the whole original record.
    pub fn dequeue(&self, dest: &mut [u8]) -> usize {
        if dest.is_empty() {
            return 0;
        }
        let read = self.read_pos.load(Ordering::Relaxed);
        let write = self.write_pos.load(Ordering::Acquire);
        if read == write {
            return 0;
        }

        let mut header = [0u8; LENGTH_HEADER_SIZE];
        unsafe { self.read_at(read, &mut header) };
        let record_len = u16::from_le_bytes(header) as usize;
        debug_assert!(record_len >= 1 && record_len <= MAX_ENTRY_LENGTH - 1);

        let copied = record_len.min(dest.len() - 1);
        unsafe { self.read_at(read.wrapping_add(HEADER_LEN), &mut dest[..copied]) };
        dest[copied] = 0;

        // Skip the full original record, not just the copied prefix.
        let next = read.wrapping_add(HEADER_LEN + record_len as u32);
        self.read_pos.store(next, Ordering::Release);
        copied
    }

    /// True when no committed record is waiting
    #[inline]
    pub fn is_empty(&self) -> bool {
        let read = self.read_pos.load(Ordering::Relaxed);
        let write = self.write_pos.load(Ordering::Acquire);
        read == write
    }

    /// Committed bytes currently in flight (headers included)
    #[inline]
    pub fn used_bytes(&self) -> usize {
        let read = self.read_pos.load(Ordering::Relaxed);
        let write = self.write_pos.load(Ordering::Acquire);
        write.wrapping_sub(read) as usize
    }

    /// Physical capacity in bytes
    #[inline]
    pub const fn capacity(&self) -> usize {
        LOG_BUFFER_LENGTH
    }

    // ── Internal wrap-aware copies ──

    /// Copy `src` into the ring starting at logical position `pos`.
    ///
    /// # Safety
    ///
    /// The byte range `[pos, pos + src.len())` must be exclusively
    /// claimed by the caller and `src.len()` must not exceed capacity.
    unsafe fn write_at(&self, pos: u32, src: &[u8]) {
        let buf = (*self.buffer.get()).as_mut_ptr();
        let start = (pos % BUFFER_LEN) as usize;
        let first = src.len().min(LOG_BUFFER_LENGTH - start);
        ptr::copy_nonoverlapping(src.as_ptr(), buf.add(start), first);
        if first < src.len() {
            ptr::copy_nonoverlapping(src.as_ptr().add(first), buf, src.len() - first);
        }
    }

    /// Copy `dst.len()` bytes out of the ring starting at `pos`.
    ///
    /// # Safety
    ///
    /// The byte range must lie between `read_pos` and the committed
    /// `write_pos` watermark.
    unsafe fn read_at(&self, pos: u32, dst: &mut [u8]) {
        let buf = (*self.buffer.get()).as_ptr();
        let start = (pos % BUFFER_LEN) as usize;
        let first = dst.len().min(LOG_BUFFER_LENGTH - start);
        ptr::copy_nonoverlapping(buf.add(start), dst.as_mut_ptr(), first);
        if first < dst.len() {
            ptr::copy_nonoverlapping(buf, dst.as_mut_ptr().add(first), dst.len() - first);
        }
    }
}

impl Default for LogEntryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_round_trip() {
        let queue = LogEntryQueue::new();

        for len in [1usize, 7, 255, MAX_ENTRY_LENGTH - 1] {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            assert!(queue.enqueue(&data), "enqueue of {} bytes failed", len);

            let mut dest = vec![0xAAu8; len + 1];
            let n = queue.dequeue(&mut dest);
            assert_eq!(n, len);
            assert_eq!(&dest[..len], &data[..]);
            assert_eq!(dest[len], 0);
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_capacity_fullness() {
        let queue = LogEntryQueue::new();
        let record = [0x55u8; 30]; // 32 bytes framed

        let mut count = 0usize;
        while queue.enqueue(&record) {
            count += 1;
        }
        // 8192-byte ring, 32 bytes per framed record, last free byte
        // never consumed: exactly 255 records fit.
        assert_eq!(count, 255);

        // Draining one record makes room again.
        let mut dest = [0u8; 64];
        assert_eq!(queue.dequeue(&mut dest), 30);
        assert!(queue.enqueue(&record));
        assert!(!queue.enqueue(&record));
    }

    #[test]
    fn test_wraparound() {
        let queue = LogEntryQueue::new();
        let mut dest = [0u8; MAX_ENTRY_LENGTH];

        // Cumulative traffic of ~30 KiB crosses the 8 KiB boundary
        // several times; every record must come back intact.
        for i in 0..300usize {
            let len = 1 + (i * 37) % 200;
            let data: Vec<u8> = (0..len).map(|j| ((i + j) % 256) as u8).collect();
            assert!(queue.enqueue(&data), "enqueue failed at iteration {}", i);

            let n = queue.dequeue(&mut dest);
            assert_eq!(n, len, "length mismatch at iteration {}", i);
            assert_eq!(&dest[..n], &data[..], "content mismatch at iteration {}", i);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_queue_idempotence() {
        let queue = LogEntryQueue::new();
        let mut dest = [0xEEu8; 16];

        for _ in 0..3 {
            assert_eq!(queue.dequeue(&mut dest), 0);
            assert_eq!(dest, [0xEEu8; 16]);
        }
        assert_eq!(queue.used_bytes(), 0);
    }

    #[test]
    fn test_truncation_skips_whole_record() {
        let queue = LogEntryQueue::new();
        let first: Vec<u8> = (0..100u8).collect();
        let second = b"second record";
        assert!(queue.enqueue(&first));
        assert!(queue.enqueue(second));

        // Destination fits only 50 payload bytes + NUL.
        let mut small = [0u8; 51];
        let n = queue.dequeue(&mut small);
        assert_eq!(n, 50);
        assert_eq!(&small[..50], &first[..50]);
        assert_eq!(small[50], 0);

        // The truncated read skipped all 100 bytes; the next dequeue
        // must return the second record, not the tail of the first.
        let mut dest = [0u8; 64];
        let n = queue.dequeue(&mut dest);
        assert_eq!(n, second.len());
        assert_eq!(&dest[..n], second);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let queue = LogEntryQueue::new();

        assert!(!queue.enqueue(&[]));
        assert!(!queue.enqueue(&[0u8; MAX_ENTRY_LENGTH]));
        assert!(!queue.enqueue(&vec![0u8; MAX_ENTRY_LENGTH * 2]));

        assert!(queue.is_empty());
        assert_eq!(queue.used_bytes(), 0);
    }

    #[test]
    fn test_zero_sized_dest() {
        let queue = LogEntryQueue::new();
        assert!(queue.enqueue(b"still here"));

        let mut empty: [u8; 0] = [];
        assert_eq!(queue.dequeue(&mut empty), 0);

        // Nothing was consumed.
        let mut dest = [0u8; 32];
        assert_eq!(queue.dequeue(&mut dest), 10);
        assert_eq!(&dest[..10], b"still here");
    }

    /// Encode producer id + sequence + checksum into a record
    fn stress_record(producer: usize, seq: usize) -> Vec<u8> {
        let checksum = producer.wrapping_mul(31).wrapping_add(seq.wrapping_mul(17));
        format!("{:02}:{:06}:{:08x}", producer, seq, checksum).into_bytes()
    }

    #[test]
    fn test_concurrent_producers_single_consumer() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 2000;

        let queue = Arc::new(LogEntryQueue::new());
        let mut handles = vec![];

        for t in 0..PRODUCERS {
            let queue = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                let mut dropped = 0usize;
                for i in 0..PER_PRODUCER {
                    let record = stress_record(t, i);
                    if !queue.enqueue(&record) {
                        // Saturation drops are acceptable; corruption is not.
                        dropped += 1;
                        thread::yield_now();
                    }
                }
                dropped
            }));
        }

        // Drain on this thread until all producers finished and the
        // queue is dry. Every received record must be intact and unique.
        let mut seen = std::collections::HashSet::new();
        let mut received = 0usize;
        let mut dest = [0u8; MAX_ENTRY_LENGTH];
        loop {
            let n = queue.dequeue(&mut dest);
            if n == 0 {
                if handles.iter().all(|h| h.is_finished()) && queue.is_empty() {
                    break;
                }
                thread::yield_now();
                continue;
            }

            let text = std::str::from_utf8(&dest[..n]).expect("corrupted record");
            let mut parts = text.split(':');
            let producer: usize = parts.next().unwrap().parse().expect("bad producer tag");
            let seq: usize = parts.next().unwrap().parse().expect("bad sequence");
            let checksum =
                usize::from_str_radix(parts.next().unwrap(), 16).expect("bad checksum");
            assert!(parts.next().is_none());
            assert!(producer < PRODUCERS && seq < PER_PRODUCER);
            assert_eq!(
                checksum,
                producer.wrapping_mul(31).wrapping_add(seq.wrapping_mul(17)),
                "checksum mismatch in {:?}",
                text
            );
            assert!(seen.insert((producer, seq)), "duplicate record {:?}", text);
            received += 1;
        }

        let mut dropped = 0usize;
        for h in handles {
            dropped += h.join().unwrap();
        }

        assert!(received <= PRODUCERS * PER_PRODUCER);
        assert_eq!(received + dropped, PRODUCERS * PER_PRODUCER);
        assert!(received > 0);
    }

    #[test]
    fn test_fill_drain_reuse() {
        let queue = LogEntryQueue::new();
        let mut dest = [0u8; 64];

        for round in 0..3 {
            let mut stored = 0usize;
            while queue.enqueue(format!("round {} entry {}", round, stored).as_bytes()) {
                stored += 1;
            }
            assert!(stored > 0);

            let mut drained = 0usize;
            while queue.dequeue(&mut dest) > 0 {
                drained += 1;
            }
            assert_eq!(drained, stored);
            assert!(queue.is_empty());
        }
    }
}
