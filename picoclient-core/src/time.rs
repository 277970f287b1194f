//! Time abstraction for different platforms

/// Time source trait
///
/// Abstracts a monotonic millisecond clock for both std and embedded
/// platforms. Used to stamp pending requests for timeout tracking.
pub trait TimeSource {
    /// Current time in milliseconds.
    fn now_millis(&self) -> u64;
}

/// Default time source for no_std (returns 0)
#[derive(Debug, Clone, Copy)]
pub struct DummyTimeSource;

impl TimeSource for DummyTimeSource {
    fn now_millis(&self) -> u64 {
        0
    }
}
