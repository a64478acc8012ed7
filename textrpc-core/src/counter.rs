//! Process-wide call counter.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counts calls routed to a registered function.
///
/// Shared by every connection; increments are atomic.
#[derive(Debug, Default)]
pub struct CallCounter {
    count: AtomicU64,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call and returns the count including it.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the number of calls recorded so far.
    pub fn current(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_zero() {
        let counter = CallCounter::new();
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn test_increment_returns_new_count() {
        let counter = CallCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn test_concurrent_increments() {
        let counter = Arc::new(CallCounter::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(counter.current(), 8000);
    }
}
