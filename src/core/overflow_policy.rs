//! Overflow policies for the push sink's bounded queue
//!
//! When the queue feeding the push worker is full, these policies decide
//! whether the producer waits or the record is dropped.

use std::fmt;
use std::time::Duration;

/// Policy for handling a full push queue
///
/// # Example
///
/// ```
/// use rust_log_generator::OverflowPolicy;
/// use std::time::Duration;
///
/// let policy = OverflowPolicy::default();
/// assert_eq!(policy, OverflowPolicy::DropNewest);
///
/// let policy = OverflowPolicy::BlockWithTimeout(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Reject the new record with a `QueueFull` error
    #[default]
    DropNewest,

    /// Block the producer until space is available
    Block,

    /// Block up to the timeout, then reject with `QueueFull`
    BlockWithTimeout(Duration),
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
        }
    }
}
