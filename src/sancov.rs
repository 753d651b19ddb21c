//! Per-thread state for SanitizerCoverage features we do not support yet.

use std::cell::Cell;

thread_local! {
    /// Lowest stack pointer observed on this thread, for `-fsanitize-coverage=stack-depth`.
    /// Starts at 0 on every thread and is not written by anything yet.
    static LOWEST_STACK: Cell<usize> = const { Cell::new(0) };
}

/// The lowest stack pointer recorded for the calling thread, 0 if none was recorded.
pub fn lowest_stack() -> usize {
    LOWEST_STACK.with(Cell::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_stack_starts_at_zero() {
        assert_eq!(lowest_stack(), 0);
        let other = std::thread::spawn(lowest_stack).join().unwrap();
        assert_eq!(other, 0);
    }
}
